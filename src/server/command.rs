//! Line protocol commands and replies
//!
//! One request per line, whitespace separated, verb case-insensitive:
//!
//! ```text
//! UPDATE <customer_id> <delta>          -> {"score":"<new absolute>"}
//! RANGE <start> <end>                   -> [{"customer_id":..,"score":"..","rank":..}, ..]
//! NEIGHBORS <customer_id> [high] [low]  -> [...]
//! PING                                  -> "PONG"
//! ```
//!
//! Failures reply `{"error":"<message>"}`.

use crate::leaderboard::LeaderboardService;
use crate::ranking::{CustomerId, LeaderboardEntry};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Update {
        customer_id: CustomerId,
        delta: Decimal,
    },
    Range {
        start: usize,
        end: usize,
    },
    Neighbors {
        customer_id: CustomerId,
        high: usize,
        low: usize,
    },
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| "empty command".to_string())?;
        let args: Vec<&str> = parts.collect();

        match verb.to_ascii_uppercase().as_str() {
            "PING" => {
                expect_arity("PING", &args, 0, 0)?;
                Ok(Command::Ping)
            }
            "UPDATE" => {
                expect_arity("UPDATE", &args, 2, 2)?;
                Ok(Command::Update {
                    customer_id: parse_arg("customer_id", args[0])?,
                    delta: parse_arg("delta", args[1])?,
                })
            }
            "RANGE" => {
                expect_arity("RANGE", &args, 2, 2)?;
                Ok(Command::Range {
                    start: parse_arg("start", args[0])?,
                    end: parse_arg("end", args[1])?,
                })
            }
            "NEIGHBORS" => {
                expect_arity("NEIGHBORS", &args, 1, 3)?;
                Ok(Command::Neighbors {
                    customer_id: parse_arg("customer_id", args[0])?,
                    high: args.get(1).map_or(Ok(0), |v| parse_arg("high", v))?,
                    low: args.get(2).map_or(Ok(0), |v| parse_arg("low", v))?,
                })
            }
            other => Err(format!("unknown command '{}'", other)),
        }
    }

    /// Run against the service. Never fails; errors become [`Reply::Error`].
    pub fn execute(&self, service: &LeaderboardService) -> Reply {
        match *self {
            Command::Ping => Reply::Pong("PONG"),
            Command::Update { customer_id, delta } => match service.update_score(customer_id, delta) {
                Ok(score) => Reply::Score { score },
                Err(e) => Reply::error(e),
            },
            Command::Range { start, end } => Reply::Entries(service.get_by_rank_range(start, end)),
            Command::Neighbors {
                customer_id,
                high,
                low,
            } => Reply::Entries(service.get_neighbors(customer_id, high, low)),
        }
    }
}

fn expect_arity(verb: &str, args: &[&str], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        return Err(format!("wrong number of arguments for '{}'", verb));
    }
    Ok(())
}

fn parse_arg<T: FromStr>(name: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {} '{}'", name, value))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Pong(&'static str),
    Score { score: Decimal },
    Entries(Vec<LeaderboardEntry>),
    Error { error: String },
}

impl Reply {
    pub fn error(message: impl ToString) -> Reply {
        Reply::Error {
            error: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error { .. })
    }

    /// One JSON document, no trailing newline
    pub fn encode(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"failed to encode reply: {}"}}"#, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RankedSkipList;
    use std::time::Duration;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("ping"), Ok(Command::Ping));
        assert_eq!(
            Command::parse("UPDATE 42 -12.5"),
            Ok(Command::Update {
                customer_id: 42,
                delta: Decimal::new(-125, 1)
            })
        );
        assert_eq!(Command::parse("range 1 10"), Ok(Command::Range { start: 1, end: 10 }));
        assert_eq!(
            Command::parse("NEIGHBORS 7 2"),
            Ok(Command::Neighbors {
                customer_id: 7,
                high: 2,
                low: 0
            })
        );
        assert_eq!(
            Command::parse("  Neighbors   7 1 3 "),
            Ok(Command::Neighbors {
                customer_id: 7,
                high: 1,
                low: 3
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse(""), Err("empty command".to_string()));
        assert!(Command::parse("FLY 1").unwrap_err().contains("unknown command"));
        assert!(Command::parse("UPDATE 1").unwrap_err().contains("wrong number"));
        assert!(Command::parse("UPDATE x 1").unwrap_err().contains("customer_id"));
        assert!(Command::parse("RANGE 1 ten").unwrap_err().contains("end"));
        assert!(Command::parse("NEIGHBORS 1 -1").unwrap_err().contains("high"));
        assert!(Command::parse("PING now").is_err());
    }

    #[test]
    fn test_reply_encoding() {
        assert_eq!(Reply::Pong("PONG").encode(), r#""PONG""#);
        assert_eq!(
            Reply::Score {
                score: Decimal::from(40)
            }
            .encode(),
            r#"{"score":"40"}"#
        );
        assert_eq!(Reply::Entries(vec![]).encode(), "[]");
        assert_eq!(Reply::error("nope").encode(), r#"{"error":"nope"}"#);
    }

    #[test]
    fn test_execute_update_rejects_out_of_range() {
        let service = LeaderboardService::with_skiplist(
            RankedSkipList::with_params(16, 0.5, Some(1)),
            Duration::from_secs(30),
            16,
        );
        let reply = Command::parse("UPDATE 1 1001").unwrap().execute(&service);
        assert!(reply.is_error());
        assert_eq!(service.batcher().pending_len(), 0);

        let reply = Command::parse("UPDATE 1 1000").unwrap().execute(&service);
        assert_eq!(
            reply,
            Reply::Score {
                score: Decimal::from(1000)
            }
        );
    }
}
