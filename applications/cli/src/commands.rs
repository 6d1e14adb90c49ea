//! Interactive shell commands

use cadence_playback::RepeatMode;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Which tracks `load` puts in the primary playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistSource {
    /// The whole catalog
    Catalog,

    /// A saved user playlist
    Saved(String),
}

/// One line typed at the prompt
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Play(Option<String>),
    Pause,
    Toggle,
    Next,
    Previous,
    Seek(Duration),
    Queue(String),
    PlayNext(String),
    ClearQueue,
    Unqueue(usize),
    Like,
    Shuffle,
    Repeat(Option<RepeatMode>),
    Status,
    List,
    Open(String),
    Load {
        source: PlaylistSource,
        index: usize,
    },
    Help,
    Quit,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{0}' needs an argument: {1}")]
    MissingArgument(&'static str, &'static str),

    #[error("invalid argument '{value}' for '{command}'")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },
}

pub const HELP: &str = "\
commands:
  play [track-id]          resume, or play a catalog track
  pause | toggle           pause, or toggle play/pause
  next | prev              skip forward / back
  seek <seconds>           jump within the current track
  queue <track-id>         append to the queue
  playnext <track-id>      put a track at the front of the queue
  unqueue <n>              remove queue entry n (from 1)
  clearqueue               empty the queue
  like                     toggle like on the current track
  shuffle                  toggle shuffle
  repeat [off|all|one]     set or cycle the repeat mode
  open <track-id>          open a track with the catalog as playlist
  load <playlist|all> [n]  load a saved playlist (or the catalog) at track n
  list                     show the catalog
  status                   show the session
  quit";

fn parse_repeat(value: &str) -> Result<RepeatMode, ParseError> {
    match value.to_ascii_lowercase().as_str() {
        "off" => Ok(RepeatMode::Off),
        "all" => Ok(RepeatMode::All),
        "one" => Ok(RepeatMode::One),
        _ => Err(ParseError::InvalidArgument {
            command: "repeat",
            value: value.to_string(),
        }),
    }
}

fn required<'a>(
    arg: Option<&'a str>,
    command: &'static str,
    what: &'static str,
) -> Result<&'a str, ParseError> {
    arg.ok_or(ParseError::MissingArgument(command, what))
}

impl FromStr for ShellCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(ParseError::Empty)?.to_ascii_lowercase();
        let arg = words.next();

        let command = match name.as_str() {
            "play" | "p" => Self::Play(arg.map(str::to_string)),
            "pause" => Self::Pause,
            "toggle" | "t" => Self::Toggle,
            "next" | "n" => Self::Next,
            "prev" | "previous" => Self::Previous,
            "seek" => {
                let value = required(arg, "seek", "seconds")?;
                let position = value
                    .parse::<f64>()
                    .ok()
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                    .ok_or_else(|| ParseError::InvalidArgument {
                        command: "seek",
                        value: value.to_string(),
                    })?;
                Self::Seek(position)
            }
            "queue" | "q" => Self::Queue(required(arg, "queue", "track id")?.to_string()),
            "playnext" => Self::PlayNext(required(arg, "playnext", "track id")?.to_string()),
            "clearqueue" => Self::ClearQueue,
            "unqueue" => {
                let value = required(arg, "unqueue", "queue position")?;
                let position = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ParseError::InvalidArgument {
                        command: "unqueue",
                        value: value.to_string(),
                    })?;
                Self::Unqueue(position - 1)
            }
            "like" => Self::Like,
            "shuffle" => Self::Shuffle,
            "repeat" => Self::Repeat(arg.map(parse_repeat).transpose()?),
            "status" | "s" => Self::Status,
            "list" | "ls" => Self::List,
            "open" => Self::Open(required(arg, "open", "track id")?.to_string()),
            "load" => {
                let target = required(arg, "load", "playlist id or 'all'")?;
                let source = if target.eq_ignore_ascii_case("all") {
                    PlaylistSource::Catalog
                } else {
                    PlaylistSource::Saved(target.to_string())
                };
                let index = match words.next() {
                    None => 0,
                    Some(value) => value
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .ok_or_else(|| ParseError::InvalidArgument {
                            command: "load",
                            value: value.to_string(),
                        })?,
                };
                Self::Load { source, index }
            }
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}
