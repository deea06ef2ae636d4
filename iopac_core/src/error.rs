//! Errors of a refresh cycle.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The portal answered with its login failure page.
    #[error("login failed for account {username}")]
    Authentication { username: String },

    /// The portal answered with a non-success status code.
    #[error("portal answered {status} for {url}")]
    Http { status: u16, url: String },

    /// The portal did not answer within the configured timeout.
    #[error("portal request to {url} timed out")]
    Timeout { url: String },

    #[error("portal request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("could not decode portal response: {0}")]
    Decode(String),

    #[error("could not parse loan table: {0}")]
    Parse(#[from] ParseError),

    #[error("configuration error for account {account}: {message}")]
    Config { account: String, message: String },

    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("could not read calendar: {0}")]
    Calendar(#[from] ical::parser::ParserError),

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a configuration error for a single account.
    pub fn config(account: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            account: account.into(),
            message: message.into(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        let url = error
            .url()
            .map(ToString::to_string)
            .unwrap_or_default();
        if error.is_timeout() {
            Self::Timeout { url }
        } else if let Some(status) = error.status() {
            Self::Http {
                status: status.as_u16(),
                url,
            }
        } else {
            Self::Request(error)
        }
    }
}

/// Problems with a single loan table or one of its rows.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("no date in due date column {0:?}")]
    NoDueDate(String),

    #[error("invalid date {0:?}")]
    InvalidDate(String),

    #[error("loan table has no {0:?} column")]
    MissingColumn(&'static str),

    #[error("row has {found} cells, expected at least {expected}")]
    ShortRow { found: usize, expected: usize },
}
