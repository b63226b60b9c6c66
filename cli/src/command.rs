//! Hand-rolled argument parsing; the surface is four verbs.

use thiserror::Error;

pub const USAGE: &str = "\
usage: steward <command>

commands:
  config                   print the resolved configuration
  sweep                    delete expired inbox records now
  ack <session> <seq>      print a stored acknowledgement
  take <session> <request> consume and print a screenshot payload
  help                     show this message
  version                  show the version";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Config,
    Sweep,
    Ack { session: String, seq: u64 },
    Take { session: String, request: String },
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("missing <{0}>")]
    Missing(&'static str),
    #[error("<seq> must be a non-negative integer, got '{0}'")]
    BadSeq(String),
    #[error("unexpected argument '{0}'")]
    Extra(String),
}

impl Command {
    /// Parse everything after the program name.
    pub fn parse<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let Some(verb) = args.next() else {
            return Ok(Self::Help);
        };

        let command = match verb.as_str() {
            "config" => Self::Config,
            "sweep" => Self::Sweep,
            "ack" => {
                let session = args.next().ok_or(UsageError::Missing("session"))?;
                let raw = args.next().ok_or(UsageError::Missing("seq"))?;
                let seq = raw.parse().map_err(|_| UsageError::BadSeq(raw))?;
                Self::Ack { session, seq }
            }
            "take" => {
                let session = args.next().ok_or(UsageError::Missing("session"))?;
                let request = args.next().ok_or(UsageError::Missing("request"))?;
                Self::Take { session, request }
            }
            "help" | "-h" | "--help" => Self::Help,
            "version" | "-V" | "--version" => Self::Version,
            _ => return Err(UsageError::Unknown(verb)),
        };

        match args.next() {
            Some(extra) => Err(UsageError::Extra(extra)),
            None => Ok(command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, UsageError};

    fn parse(args: &[&str]) -> Result<Command, UsageError> {
        Command::parse(args.iter().map(ToString::to_string))
    }

    #[test]
    fn no_arguments_is_help() {
        assert_eq!(parse(&[]), Ok(Command::Help));
    }

    #[test]
    fn parses_each_verb() {
        assert_eq!(parse(&["config"]), Ok(Command::Config));
        assert_eq!(parse(&["sweep"]), Ok(Command::Sweep));
        assert_eq!(
            parse(&["ack", "room-1", "12"]),
            Ok(Command::Ack {
                session: "room-1".to_string(),
                seq: 12
            })
        );
        assert_eq!(
            parse(&["take", "room-1", "req-9"]),
            Ok(Command::Take {
                session: "room-1".to_string(),
                request: "req-9".to_string()
            })
        );
        assert_eq!(parse(&["--version"]), Ok(Command::Version));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse(&["ack", "room-1"]), Err(UsageError::Missing("seq")));
        assert_eq!(
            parse(&["ack", "room-1", "-3"]),
            Err(UsageError::BadSeq("-3".to_string()))
        );
        assert_eq!(
            parse(&["sweep", "now"]),
            Err(UsageError::Extra("now".to_string()))
        );
        assert_eq!(
            parse(&["purge"]),
            Err(UsageError::Unknown("purge".to_string()))
        );
    }

    #[test]
    fn usage_errors_read_as_messages() {
        assert_eq!(UsageError::Missing("seq").to_string(), "missing <seq>");
        assert_eq!(
            UsageError::BadSeq("-3".to_string()).to_string(),
            "<seq> must be a non-negative integer, got '-3'"
        );
        assert_eq!(
            UsageError::Unknown("purge".to_string()).to_string(),
            "unknown command 'purge'"
        );
    }
}
