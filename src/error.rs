//! Error types for imapfs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No node exists at the requested path.
    #[error("no such entry")]
    PathAbsent,

    /// A node exists but is not the kind the operation expects
    /// (a folder where a file was needed, or vice versa). Surfaced to
    /// the dispatcher the same way as [`Error::PathAbsent`].
    #[error("entry kind does not match the operation")]
    KindMismatch,

    /// The server rejected or failed a command that was not a
    /// classification probe (create/delete/append/fetch/list).
    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),
}

pub type Result<T> = std::result::Result<T, Error>;
