use std::fmt;

use colored::Colorize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nothing usable in the credentials file.
    Configuration,
    /// The service rejected the session token.
    Authentication,
    NotFound,
    /// A local file could not be read, written or parsed.
    LocalIo,
    /// The request did not complete, or the response made no sense.
    Network,
    /// The service answered, but refused the request.
    Remote,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Authentication => "authentication error",
            ErrorKind::NotFound => "not found",
            ErrorKind::LocalIo => "file error",
            ErrorKind::Network => "network error",
            ErrorKind::Remote => "remote error",
        };
        f.write_str(label)
    }
}

pub struct CliError {
    pub(crate) kind: ErrorKind,
    pub(crate) msg: String,
}

impl CliError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        CliError {
            kind,
            msg: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {}: {:#?}",
            "ERROR".red().bold(),
            self.kind,
            self.msg.red()
        )
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            "ERROR".red().bold(),
            self.kind,
            self.msg.red()
        )
    }
}

impl From<reqwest::Error> for CliError {
    fn from(e: reqwest::Error) -> Self {
        CliError::new(ErrorKind::Network, e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::new(ErrorKind::LocalIo, e.to_string())
    }
}
