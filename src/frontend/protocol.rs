//! The client line protocol.
//!
//! Requests are single spaces between tokens: `PUT <key> <value>`, `GET <key>`, `DEL <key>`.
//! Responses are `PUT <key> <value>`, `GET KEY: <key> VAL: <value>` (`[NULL]` when absent),
//! `DEL <key>`, or `ERROR`.

use crate::api::KeyValueStore;
use std::fmt;
use std::str::FromStr;

pub const MAX_TOKEN_LENGTH: usize = 25;
const NULL_VALUE: &str = "[NULL]";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    Put { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    Put { key: String, value: String },
    Get { key: String, value: Option<String> },
    Delete { key: String },
    Error,
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Token '{0}' exceeds {max} characters", max = MAX_TOKEN_LENGTH)]
    TokenTooLong(String),
    #[error("Unknown instruction '{0}'")]
    UnknownInstruction(String),
    #[error("Wrong number of arguments for {0}")]
    WrongArgumentCount(&'static str),
}

/// Which transport a front end (or the client) speaks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FrontEndProtocol {
    Tcp,
    Udp,
}

impl FromStr for FrontEndProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" | "t" => Ok(FrontEndProtocol::Tcp),
            "udp" | "u" => Ok(FrontEndProtocol::Udp),
            _ => Err(format!("Unsupported protocol '{}'. Specify TCP [T] or UDP [U]", s)),
        }
    }
}

/// True if `token` may be sent as a key or value.
pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty() && token.len() <= MAX_TOKEN_LENGTH && !token.chars().any(char::is_whitespace)
}

impl FromStr for Request {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split(' ').collect();
        if let Some(token) = tokens.iter().find(|token| token.len() > MAX_TOKEN_LENGTH) {
            return Err(ProtocolError::TokenTooLong(token.to_string()));
        }

        match tokens[0] {
            "PUT" => match tokens.as_slice() {
                [_, key, value] => Ok(Request::Put {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
                _ => Err(ProtocolError::WrongArgumentCount("PUT")),
            },
            "GET" => match tokens.as_slice() {
                [_, key] => Ok(Request::Get { key: key.to_string() }),
                _ => Err(ProtocolError::WrongArgumentCount("GET")),
            },
            "DEL" => match tokens.as_slice() {
                [_, key] => Ok(Request::Delete { key: key.to_string() }),
                _ => Err(ProtocolError::WrongArgumentCount("DEL")),
            },
            other => Err(ProtocolError::UnknownInstruction(other.to_string())),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Put { key, value } => write!(f, "PUT {} {}", key, value),
            Request::Get { key } => write!(f, "GET {}", key),
            Request::Delete { key } => write!(f, "DEL {}", key),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Put { key, value } => write!(f, "PUT {} {}", key, value),
            Response::Get { key, value } => {
                write!(f, "GET KEY: {} VAL: {}", key, value.as_deref().unwrap_or(NULL_VALUE))
            }
            Response::Delete { key } => write!(f, "DEL {}", key),
            Response::Error => write!(f, "ERROR"),
        }
    }
}

impl Request {
    /// Check that `line` is the success response to this request. For a GET, returns the value.
    pub fn parse_response(&self, line: &str) -> Option<Response> {
        let tokens: Vec<&str> = line.split(' ').collect();
        match (self, tokens.as_slice()) {
            (Request::Put { key, value }, ["PUT", k, v]) if *k == key.as_str() && *v == value.as_str() => {
                Some(Response::Put {
                    key: key.clone(),
                    value: value.clone(),
                })
            }
            (Request::Get { key }, ["GET", "KEY:", k, "VAL:", v]) if *k == key.as_str() => Some(Response::Get {
                key: key.clone(),
                value: if *v == NULL_VALUE { None } else { Some(v.to_string()) },
            }),
            (Request::Delete { key }, ["DEL", k]) if *k == key.as_str() => {
                Some(Response::Delete { key: key.clone() })
            }
            _ => None,
        }
    }
}

/// Serve one request line against `store`. Puts and deletes block until agreed by the cluster.
pub async fn handle_request_line(logger: &slog::Logger, store: &dyn KeyValueStore, line: &str) -> Response {
    let request = match line.parse::<Request>() {
        Ok(request) => request,
        Err(e) => {
            slog::warn!(logger, "Dropping request '{}': {}", line, e);
            return Response::Error;
        }
    };

    match request {
        Request::Put { key, value } => match store.put(key.clone(), value.clone()).await {
            Ok(()) => {
                slog::info!(logger, "Put key={} value={}", key, value);
                Response::Put { key, value }
            }
            Err(e) => {
                slog::error!(logger, "Put key={} failed: {}", key, e);
                Response::Error
            }
        },
        Request::Get { key } => {
            let value = store.get(&key);
            slog::info!(logger, "Returned value={:?} for key={}", value, key);
            Response::Get { key, value }
        }
        Request::Delete { key } => match store.delete(key.clone()).await {
            Ok(()) => {
                slog::info!(logger, "Deleted key={}", key);
                Response::Delete { key }
            }
            Err(e) => {
                slog::error!(logger, "Delete key={} failed: {}", key, e);
                Response::Error
            }
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::StoreError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Unreplicated store for exercising the front ends.
    #[derive(Default)]
    pub(crate) struct MapStore {
        map: Mutex<HashMap<String, String>>,
    }

    #[async_trait::async_trait]
    impl KeyValueStore for MapStore {
        async fn put(&self, key: String, value: String) -> Result<(), StoreError> {
            self.map.lock().unwrap().insert(key, value);
            Ok(())
        }

        fn get(&self, key: &str) -> Option<String> {
            self.map.lock().unwrap().get(key).cloned()
        }

        async fn delete(&self, key: String) -> Result<(), StoreError> {
            self.map.lock().unwrap().remove(&key);
            Ok(())
        }
    }

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn parses_well_formed_requests() {
        assert_eq!(
            "PUT k v".parse::<Request>(),
            Ok(Request::Put {
                key: "k".into(),
                value: "v".into()
            })
        );
        assert_eq!("GET k".parse::<Request>(), Ok(Request::Get { key: "k".into() }));
        assert_eq!("DEL k".parse::<Request>(), Ok(Request::Delete { key: "k".into() }));
    }

    #[test]
    fn rejects_malformed_requests() {
        let long = "x".repeat(MAX_TOKEN_LENGTH + 1);
        assert_eq!(
            format!("PUT {} v", long).parse::<Request>(),
            Err(ProtocolError::TokenTooLong(long.clone()))
        );
        assert!(format!("PUT k {}", "y".repeat(MAX_TOKEN_LENGTH)).parse::<Request>().is_ok());

        assert_eq!("PUT k".parse::<Request>(), Err(ProtocolError::WrongArgumentCount("PUT")));
        assert_eq!("GET k v".parse::<Request>(), Err(ProtocolError::WrongArgumentCount("GET")));
        assert_eq!("DEL".parse::<Request>(), Err(ProtocolError::WrongArgumentCount("DEL")));
        // Single-space delimited, so a double space is an empty token.
        assert_eq!("GET  k".parse::<Request>(), Err(ProtocolError::WrongArgumentCount("GET")));
        assert_eq!(
            "put k v".parse::<Request>(),
            Err(ProtocolError::UnknownInstruction("put".into()))
        );
        assert_eq!("".parse::<Request>(), Err(ProtocolError::UnknownInstruction("".into())));
    }

    #[test]
    fn formats_responses() {
        let get = Response::Get {
            key: "k".into(),
            value: None,
        };
        assert_eq!(get.to_string(), "GET KEY: k VAL: [NULL]");
        let get = Response::Get {
            key: "k".into(),
            value: Some("v".into()),
        };
        assert_eq!(get.to_string(), "GET KEY: k VAL: v");
        assert_eq!(Response::Delete { key: "k".into() }.to_string(), "DEL k");
        assert_eq!(Response::Error.to_string(), "ERROR");
    }

    #[test]
    fn validates_responses_against_request() {
        let put = Request::Put {
            key: "k".into(),
            value: "v".into(),
        };
        assert!(put.parse_response("PUT k v").is_some());
        assert!(put.parse_response("PUT k w").is_none());
        assert!(put.parse_response("ERROR").is_none());

        let get = Request::Get { key: "k".into() };
        assert_eq!(
            get.parse_response("GET KEY: k VAL: [NULL]"),
            Some(Response::Get {
                key: "k".into(),
                value: None
            })
        );
        assert!(get.parse_response("GET KEY: other VAL: v").is_none());

        let del = Request::Delete { key: "k".into() };
        assert!(del.parse_response("DEL k").is_some());
        assert!(del.parse_response("DEL k extra").is_none());
    }

    #[test]
    fn token_validation() {
        assert!(is_valid_token("abc"));
        assert!(!is_valid_token(""));
        assert!(!is_valid_token("a b"));
        assert!(!is_valid_token("a\tb"));
        assert!(!is_valid_token(&"z".repeat(MAX_TOKEN_LENGTH + 1)));
    }

    #[test]
    fn protocol_names() {
        assert_eq!("TCP".parse::<FrontEndProtocol>(), Ok(FrontEndProtocol::Tcp));
        assert_eq!("u".parse::<FrontEndProtocol>(), Ok(FrontEndProtocol::Udp));
        assert!("rpc".parse::<FrontEndProtocol>().is_err());
    }

    #[tokio::test]
    async fn serves_requests_from_store() {
        let store = MapStore::default();
        let logger = logger();

        assert_eq!(
            handle_request_line(&logger, &store, "GET x").await.to_string(),
            "GET KEY: x VAL: [NULL]"
        );
        assert_eq!(handle_request_line(&logger, &store, "PUT x 1").await.to_string(), "PUT x 1");
        assert_eq!(
            handle_request_line(&logger, &store, "GET x").await.to_string(),
            "GET KEY: x VAL: 1"
        );
        assert_eq!(handle_request_line(&logger, &store, "DEL x").await.to_string(), "DEL x");
        assert_eq!(
            handle_request_line(&logger, &store, "GET x").await.to_string(),
            "GET KEY: x VAL: [NULL]"
        );
        assert_eq!(handle_request_line(&logger, &store, "NOPE").await, Response::Error);
    }
}
