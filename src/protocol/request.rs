//! Request Line Grammar
//!
//! A request is a single line of whitespace-separated tokens. The first
//! token names the command (case-insensitive):
//!
//! ```text
//! INIT
//! PUT    <handle> <name> <city> <country>
//! GET    <handle> <field>
//! DELETE <handle>
//! GETALL <secret>
//! ```
//!
//! Any other keyword parses to [`Request::Unknown`] so that the server can
//! answer it. A known keyword with the wrong number of arguments or a handle
//! that is not an integer is a [`RequestError`]. Tokens are separated by
//! ASCII whitespace only.

use crate::storage::Handle;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors for request lines that cannot be served at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("wrong number of arguments for '{command}': expected {expected}, got {got}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid handle: {0:?}")]
    InvalidHandle(String),
}

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Init,
    Put {
        handle: Handle,
        name: String,
        city: String,
        country: String,
    },
    /// The field is kept verbatim; an unrecognized name is answered, not rejected.
    Get {
        handle: Handle,
        field: String,
    },
    Delete {
        handle: Handle,
    },
    GetAll {
        secret: String,
    },
    /// Any keyword not listed above (including an empty line)
    Unknown(String),
}

impl Request {
    /// Parses a request line.
    ///
    /// # Example
    ///
    /// ```
    /// use recstore::protocol::Request;
    ///
    /// let req = Request::parse("get 7 City").unwrap();
    /// assert_eq!(req, Request::Get { handle: 7, field: "City".to_string() });
    /// ```
    pub fn parse(line: &str) -> Result<Self, RequestError> {
        let mut tokens = line.split_ascii_whitespace();
        let keyword = match tokens.next() {
            Some(k) => k.to_ascii_uppercase(),
            None => return Ok(Request::Unknown(String::new())),
        };
        let args: Vec<&str> = tokens.collect();

        match keyword.as_str() {
            "INIT" => {
                expect_arity("INIT", &args, 0)?;
                Ok(Request::Init)
            }
            "PUT" => {
                expect_arity("PUT", &args, 4)?;
                Ok(Request::Put {
                    handle: parse_handle(args[0])?,
                    name: args[1].to_string(),
                    city: args[2].to_string(),
                    country: args[3].to_string(),
                })
            }
            "GET" => {
                expect_arity("GET", &args, 2)?;
                Ok(Request::Get {
                    handle: parse_handle(args[0])?,
                    field: args[1].to_string(),
                })
            }
            "DELETE" => {
                expect_arity("DELETE", &args, 1)?;
                Ok(Request::Delete {
                    handle: parse_handle(args[0])?,
                })
            }
            "GETALL" => {
                expect_arity("GETALL", &args, 1)?;
                Ok(Request::GetAll {
                    secret: args[0].to_string(),
                })
            }
            _ => Ok(Request::Unknown(keyword)),
        }
    }

    /// Returns the uppercase command keyword.
    pub fn name(&self) -> &str {
        match self {
            Request::Init => "INIT",
            Request::Put { .. } => "PUT",
            Request::Get { .. } => "GET",
            Request::Delete { .. } => "DELETE",
            Request::GetAll { .. } => "GETALL",
            Request::Unknown(keyword) => keyword,
        }
    }
}

impl FromStr for Request {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Request::parse(s)
    }
}

/// Renders the canonical request line. The secret of GETALL is not masked.
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Init => write!(f, "INIT"),
            Request::Put {
                handle,
                name,
                city,
                country,
            } => write!(f, "PUT {} {} {} {}", handle, name, city, country),
            Request::Get { handle, field } => write!(f, "GET {} {}", handle, field),
            Request::Delete { handle } => write!(f, "DELETE {}", handle),
            Request::GetAll { secret } => write!(f, "GETALL {}", secret),
            Request::Unknown(keyword) => f.write_str(keyword),
        }
    }
}

fn expect_arity(
    command: &'static str,
    args: &[&str],
    expected: usize,
) -> Result<(), RequestError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RequestError::WrongArity {
            command,
            expected,
            got: args.len(),
        })
    }
}

fn parse_handle(token: &str) -> Result<Handle, RequestError> {
    token
        .parse::<Handle>()
        .map_err(|_| RequestError::InvalidHandle(token.to_string()))
}
