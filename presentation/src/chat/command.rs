//! Slash commands typed into the chat console

use horo_domain::{DomainError, Review, RoomId};
use thiserror::Error;

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Plain text: post it to the active room
    Say(String),
    /// `/rooms`
    Rooms,
    /// `/join <room>`
    Join(RoomId),
    /// `/order`: re-fetch the active room's order
    Order,
    /// `/create`
    Create,
    /// `/pay`
    Pay,
    /// `/done`
    Done,
    /// `/review <score> <title> | <text>`
    Review(Review),
    /// `/status`
    Status,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (type /help for available commands)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    InvalidReview(#[from] DomainError),
}

const JOIN_USAGE: &str = "/join <room-id>";
const REVIEW_USAGE: &str = "/review <1-5> <title> | <text>";

impl ChatCommand {
    /// Parse a console line. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Result<ChatCommand, CommandError>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Ok(ChatCommand::Say(line.to_string())));
        };

        let (name, args) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, args)| (name, args.trim()));

        Some(match name {
            "rooms" | "r" => Ok(ChatCommand::Rooms),
            "join" | "j" => parse_join(args),
            "order" | "o" => Ok(ChatCommand::Order),
            "create" => Ok(ChatCommand::Create),
            "pay" => Ok(ChatCommand::Pay),
            "done" => Ok(ChatCommand::Done),
            "review" => parse_review(args),
            "status" | "s" => Ok(ChatCommand::Status),
            "help" | "h" | "?" => Ok(ChatCommand::Help),
            "quit" | "exit" | "q" => Ok(ChatCommand::Quit),
            // `//text` escapes a message that starts with a slash
            _ if command.starts_with('/') => Ok(ChatCommand::Say(command.to_string())),
            other => Err(CommandError::Unknown(format!("/{other}"))),
        })
    }
}

fn parse_join(args: &str) -> Result<ChatCommand, CommandError> {
    match args.split_whitespace().collect::<Vec<_>>().as_slice() {
        [room] => Ok(ChatCommand::Join(RoomId::from(*room))),
        _ => Err(CommandError::Usage(JOIN_USAGE)),
    }
}

fn parse_review(args: &str) -> Result<ChatCommand, CommandError> {
    let (score, rest) = args
        .split_once(char::is_whitespace)
        .ok_or(CommandError::Usage(REVIEW_USAGE))?;
    let score: u8 = score.parse().map_err(|_| CommandError::Usage(REVIEW_USAGE))?;
    let (title, description) = rest.split_once('|').unwrap_or((rest, ""));
    Ok(ChatCommand::Review(Review::new(score, title, description)?))
}

pub const HELP: &str = "\
Commands:
  /rooms, /r              - List your rooms
  /join <room>, /j        - Open a room
  /status, /s             - Show the room, order and what you can do
  /order, /o              - Re-fetch the order
  /create                 - Create an order (customer)
  /pay                    - Pay for the order (customer)
  /done                   - Mark the session done
  /review <1-5> <title> | <text>
                          - Review the course (customer, after completion)
  /help, /h, /?           - Show this help
  /quit, /exit, /q        - Exit
Anything else is sent to the room. Start with // to send a leading slash.";
