use std::io::{self, Write};

use chattree_core::{Conversation, NodeId, Upstream};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;

use crate::command::{self, Command, HELP, Input};
use crate::render;

/// Read lines from stdin until EOF or `/quit`.
pub async fn run<U: Upstream>(conversation: &mut Conversation<U>) -> io::Result<()> {
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    println!("chattree: type a message, or /help for commands.");
    prompt()?;
    while let Some(line) = lines.next().await {
        let line = line?;
        match command::parse(&line) {
            Ok(Input::Empty) => {}
            Ok(Input::Message(message)) => send(conversation, &message).await,
            Ok(Input::Command(Command::Quit)) => break,
            Ok(Input::Command(command)) => apply(conversation, command),
            Err(err) => eprintln!("{err}"),
        }
        prompt()?;
    }
    Ok(())
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

async fn send<U: Upstream>(conversation: &mut Conversation<U>, message: &str) {
    match conversation.send(message).await {
        Ok(outcome) => {
            println!("{}", outcome.reply);
            match (&outcome.node_id, outcome.local_index) {
                (Some(node_id), Some(index)) => {
                    let verb = if outcome.created_node { "new topic" } else { "topic" };
                    let keyword = conversation
                        .state()
                        .graph()
                        .get(node_id.as_str())
                        .map(|node| node.keyword.as_str())
                        .unwrap_or_default();
                    println!(
                        "  [{verb} {node_id} \"{keyword}\", exchange {index}, turns {}-{}]",
                        outcome.turns.question, outcome.turns.answer
                    );
                }
                _ => println!("  [no topic, turns {}-{}]", outcome.turns.question, outcome.turns.answer),
            }
            show_view(conversation);
        }
        Err(err) => {
            eprintln!("turn failed: {err}");
            if let Some(pending) = conversation.state().pending_input() {
                eprintln!("  (unsent: {pending})");
            }
        }
    }
}

fn apply<U: Upstream>(conversation: &mut Conversation<U>, command: Command) {
    let state = conversation.state_mut();
    let result = match command {
        Command::Help => {
            println!("{HELP}");
            return;
        }
        Command::Nodes => {
            print!("{}", render::tree(state));
            return;
        }
        Command::History => {
            print!("{}", render::linear(state));
            return;
        }
        Command::Snapshot => {
            match serde_json::to_string_pretty(&state.snapshot()) {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("cannot encode snapshot: {err}"),
            }
            return;
        }
        Command::Toggle(ids) => state.toggle_nodes(ids.iter().map(String::as_str)),
        Command::Path(id) => state.toggle_path(&id),
        Command::Pair(question) => {
            if !state.toggle_dialog_pair(question) {
                eprintln!("turn {question} is not an answered question");
            }
            Ok(())
        }
        Command::Hover(ids) => {
            state.set_hover(ids.into_iter().map(NodeId::from));
            Ok(())
        }
        Command::Unhover => {
            state.clear_hover();
            Ok(())
        }
        Command::Context => {
            state.toggle_context_mode();
            Ok(())
        }
        Command::Linear => {
            state.toggle_linear_mode();
            Ok(())
        }
        Command::Tree => {
            state.toggle_tree_mode();
            Ok(())
        }
        Command::Reset => {
            state.reset();
            Ok(())
        }
        Command::Quit => Ok(()),
    };

    match result {
        Ok(()) => {
            println!("{}", render::status(conversation.state()));
            show_view(conversation);
        }
        Err(err) => eprintln!("{err}"),
    }
}

fn show_view<U: Upstream>(conversation: &Conversation<U>) {
    if let Some(view) = render::view(conversation.state()) {
        print!("{view}");
    }
}
