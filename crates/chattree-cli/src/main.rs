mod backend;
mod command;
mod remote;
mod render;
mod repl;
mod server;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use backend::LlmBackend;
use chattree_app::Config;
use chattree_core::Conversation;
use clap::{Args, Parser, Subcommand};
use remote::HttpUpstream;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "chattree", version, about = "Chat that files every exchange into a topic tree")]
struct Cli {
    /// Config file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve /chat and /update-graph on top of a language model.
    Serve {
        /// Address to listen on.
        #[arg(long)]
        bind: Option<String>,

        #[command(flatten)]
        llm: LlmArgs,
    },
    /// Start an interactive session.
    Chat {
        /// Backend URL (a running `chattree serve`).
        #[arg(long, conflicts_with = "local")]
        server: Option<String>,

        /// Call the language model from this process instead of a backend.
        #[arg(long)]
        local: bool,

        #[command(flatten)]
        llm: LlmArgs,
    },
}

#[derive(Args)]
struct LlmArgs {
    /// Model that answers questions and names topics.
    #[arg(long)]
    chat_model: Option<String>,

    /// Model that places new topics in the tree.
    #[arg(long)]
    resolver_model: Option<String>,

    /// Model calls per request while the output stays empty.
    #[arg(long)]
    max_attempts: Option<u32>,
}

impl LlmArgs {
    fn apply(self, config: &mut Config) {
        if let Some(model) = self.chat_model {
            config.llm.chat_model = model;
        }
        if let Some(model) = self.resolver_model {
            config.llm.resolver_model = model;
        }
        if let Some(attempts) = self.max_attempts {
            config.llm.max_attempts = attempts;
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let _ = dotenvy::dotenv();
    init_tracing();

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind, llm } => {
            llm.apply(&mut config);
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
            let backend = Arc::new(LlmBackend::openai(&config.llm));
            server::serve(listener, backend).await?;
        }
        Command::Chat { server, local, llm } => {
            llm.apply(&mut config);
            if local {
                let mut conversation = Conversation::new(LlmBackend::openai(&config.llm));
                repl::run(&mut conversation).await?;
            } else {
                let upstream = HttpUpstream::new(&server.unwrap_or(config.client.server_url))?;
                tracing::info!(url = %upstream.base_url(), "using remote backend");
                let mut conversation = Conversation::new(upstream);
                repl::run(&mut conversation).await?;
            }
        }
    }

    Ok(())
}
