use std::str::FromStr;

use shared_types::{Coordinate, CoordinateError, TransportMode, UnknownTransportMode};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  click LON LAT          set origin / destination / restart
  mode PROFILE           driving | walking | cycling | driving-traffic
  search TEXT            type into the search box
  select N               pick search result N (1-based)
  dismiss                hide search results
  close                  close the place card
  locate LON LAT         report the device position
  move LON LAT ZOOM      pan the map
  directions             route to the focused place
  fav add [NOTES]        save the focused place
  fav go ID              route to a favorite
  fav rename ID NAME     rename a favorite
  fav note ID NOTES      change a favorite's notes
  fav rm ID              delete a favorite
  saved                  reload recent searches and favorites
  login TOKEN            sign in with a JWT
  logout                 sign out
  show                   print the current state
  help                   this text
  quit                   exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Click(Coordinate),
    Mode(TransportMode),
    Search(String),
    /// Zero-based index into the visible results.
    Select(usize),
    Dismiss,
    Close,
    Locate(Coordinate),
    Move { center: Coordinate, zoom: f64 },
    Directions,
    FavAdd(Option<String>),
    FavGo(String),
    FavRename { id: String, name: String },
    FavNote { id: String, notes: String },
    FavRm(String),
    Saved,
    Login(String),
    Logout,
    Show,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command {0:?}, type `help` for a list")]
    Unknown(String),

    #[error("`{command}` needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Not a number: {0:?}")]
    InvalidNumber(String),

    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),

    #[error(transparent)]
    InvalidMode(#[from] UnknownTransportMode),
}

/// Splits off the first whitespace-delimited word.
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

fn number<T: FromStr>(raw: &str) -> Result<T, CommandError> {
    raw.parse().map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}

fn coordinate(command: &'static str, args: &str) -> Result<Coordinate, CommandError> {
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(lon), Some(lat)) => Ok(Coordinate::new(number(lon)?, number(lat)?)?),
        _ => Err(CommandError::MissingArgument {
            command,
            argument: "LON LAT",
        }),
    }
}

fn required<'a>(command: &'static str, argument: &'static str, value: &'a str) -> Result<&'a str, CommandError> {
    if value.is_empty() {
        Err(CommandError::MissingArgument { command, argument })
    } else {
        Ok(value)
    }
}

fn parse_fav(args: &str) -> Result<Command, CommandError> {
    let (sub, rest) = split_word(args);
    match sub {
        "add" => Ok(Command::FavAdd((!rest.is_empty()).then(|| rest.to_string()))),
        "go" => Ok(Command::FavGo(required("fav go", "ID", rest)?.to_string())),
        "rm" => Ok(Command::FavRm(required("fav rm", "ID", rest)?.to_string())),
        "rename" => {
            let (id, name) = split_word(rest);
            Ok(Command::FavRename {
                id: required("fav rename", "ID", id)?.to_string(),
                name: required("fav rename", "NAME", name)?.to_string(),
            })
        }
        "note" => {
            let (id, notes) = split_word(rest);
            Ok(Command::FavNote {
                id: required("fav note", "ID", id)?.to_string(),
                notes: required("fav note", "NOTES", notes)?.to_string(),
            })
        }
        "" => Err(CommandError::MissingArgument {
            command: "fav",
            argument: "add | go | rename | note | rm",
        }),
        other => Err(CommandError::Unknown(format!("fav {}", other))),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (word, args) = split_word(line);
        match word.to_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "click" => coordinate("click", args).map(Command::Click),
            "locate" => coordinate("locate", args).map(Command::Locate),
            "move" => {
                let mut parts = args.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(lon), Some(lat), Some(zoom)) => Ok(Command::Move {
                        center: Coordinate::new(number(lon)?, number(lat)?)?,
                        zoom: number(zoom)?,
                    }),
                    _ => Err(CommandError::MissingArgument {
                        command: "move",
                        argument: "LON LAT ZOOM",
                    }),
                }
            }
            "mode" => Ok(Command::Mode(required("mode", "PROFILE", args)?.parse()?)),
            // The raw text is kept, the search session decides what counts as too short
            "search" => Ok(Command::Search(args.to_string())),
            "select" => {
                let n: usize = number(required("select", "N", args)?)?;
                match n.checked_sub(1) {
                    Some(index) => Ok(Command::Select(index)),
                    None => Err(CommandError::InvalidNumber(args.to_string())),
                }
            }
            "dismiss" => Ok(Command::Dismiss),
            "close" => Ok(Command::Close),
            "directions" => Ok(Command::Directions),
            "fav" => parse_fav(args),
            "saved" => Ok(Command::Saved),
            "login" => Ok(Command::Login(required("login", "TOKEN", args)?.to_string())),
            "logout" => Ok(Command::Logout),
            "show" => Ok(Command::Show),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}
