use chattree_core::TurnNumber;

pub const HELP: &str = "\
Type a message to chat. Commands:
  /help              show this help
  /nodes             show the topic tree
  /history           show every turn with its number
  /toggle <id>...    toggle nodes in or out of the context
  /path <id>         toggle a node together with all its ancestors
  /pair <n>          toggle the exchange whose question is turn n
  /hover <id>...     highlight nodes
  /unhover           clear highlights
  /context           toggle context mode (send only active turns)
  /linear            toggle the linear view
  /tree              toggle the tree view
  /snapshot          print the session as JSON
  /reset             start over with an empty tree
  /quit              leave";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Message(String),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Nodes,
    History,
    Toggle(Vec<String>),
    Path(String),
    Pair(TurnNumber),
    Hover(Vec<String>),
    Unhover,
    Context,
    Linear,
    Tree,
    Snapshot,
    Reset,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command /{0}, try /help")]
    Unknown(String),

    #[error("/{0} needs {1}")]
    MissingArgument(&'static str, &'static str),

    #[error("not a turn number: {0}")]
    InvalidNumber(String),
}

pub fn parse(line: &str) -> Result<Input, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Input::Message(line.to_string()));
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<String> = words.map(str::to_string).collect();

    let command = match name {
        "help" | "?" => Command::Help,
        "nodes" => Command::Nodes,
        "history" => Command::History,
        "toggle" => Command::Toggle(non_empty(args, "toggle", "at least one node id")?),
        "path" => Command::Path(first(args, "path", "a node id")?),
        "pair" => {
            let number = first(args, "pair", "a turn number")?;
            Command::Pair(number.parse().map_err(|_| ParseError::InvalidNumber(number))?)
        }
        "hover" => Command::Hover(non_empty(args, "hover", "at least one node id")?),
        "unhover" => Command::Unhover,
        "context" => Command::Context,
        "linear" => Command::Linear,
        "tree" => Command::Tree,
        "snapshot" => Command::Snapshot,
        "reset" => Command::Reset,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Input::Command(command))
}

fn non_empty(
    args: Vec<String>,
    command: &'static str,
    what: &'static str,
) -> Result<Vec<String>, ParseError> {
    if args.is_empty() {
        Err(ParseError::MissingArgument(command, what))
    } else {
        Ok(args)
    }
}

fn first(args: Vec<String>, command: &'static str, what: &'static str) -> Result<String, ParseError> {
    args.into_iter()
        .next()
        .ok_or(ParseError::MissingArgument(command, what))
}
