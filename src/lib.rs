//! IMAP-backed filesystem core
//!
//! Presents a remote IMAP mail store as a filesystem tree: every IMAP
//! folder is a directory, and a folder holding exactly one message is a
//! file whose content is that message's payload.
//!
//! The crate is the translation layer only. [`ImapFs`] exposes the
//! POSIX-style, path-based operation surface a filesystem dispatcher
//! calls into; the optional `mount` feature adds a `fuser`-based kernel
//! adapter and the `imapfs` binary on top of it. All protocol traffic
//! goes through a single [`MailStore`] session, one logical operation
//! at a time.

mod config;
mod connection;
mod error;
mod fs;
mod message;
mod node;
mod path;
mod session;

#[cfg(feature = "mount")]
pub mod fuse;

pub use config::ImapConfig;
pub use error::{Error, Result};
pub use fs::{AccessMode, ImapFs, NodeAttr};
pub use node::{NodeKind, classify};
pub use path::{PathResolver, ResolvedName};
pub use session::{MailStore, StoreSession};
