//! Path-based filesystem operations over the mail store
//!
//! [`ImapFs`] is the surface a filesystem dispatcher calls into: one
//! method per POSIX-style callback, taking dispatcher paths and
//! returning the crate's error taxonomy. Every method that touches the
//! store acquires the session once, classifies the path fresh, and
//! performs the protocol exchange under that one guard. Nothing is
//! cached between calls.

use crate::error::{Error, Result};
use crate::message;
use crate::node::{self, NodeKind};
use crate::path::PathResolver;
use crate::session::MailStore;
use tracing::debug;

/// How a file is being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

/// The fixed attribute set reported for a node.
///
/// The store keeps no per-node metadata, so directories and files each
/// get one constant shape: mode `0o777`/`0o666`, link count 2/1, and a
/// nominal size of 4096 bytes regardless of content length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAttr {
    pub kind: NodeKind,
    pub perm: u16,
    pub nlink: u32,
    pub size: u64,
}

impl NodeAttr {
    pub(crate) const fn container() -> Self {
        Self {
            kind: NodeKind::Container,
            perm: 0o777,
            nlink: 2,
            size: 4096,
        }
    }

    pub(crate) const fn leaf() -> Self {
        Self {
            kind: NodeKind::Leaf,
            perm: 0o666,
            nlink: 1,
            size: 4096,
        }
    }
}

/// The translation core: mail folders as directories, single-message
/// folders as files.
pub struct ImapFs {
    store: MailStore,
    resolver: PathResolver,
}

impl ImapFs {
    #[must_use]
    pub const fn new(store: MailStore, resolver: PathResolver) -> Self {
        Self { store, resolver }
    }

    /// Attribute lookup.
    ///
    /// # Errors
    ///
    /// [`Error::PathAbsent`] when nothing exists at `path`; protocol
    /// faults propagate.
    pub async fn getattr(&self, path: &str) -> Result<NodeAttr> {
        debug!("getattr({path})");
        let name = self.resolver.resolve(path);
        let mut session = self.store.session().await;
        match node::classify(&mut session, &name).await? {
            NodeKind::Container => Ok(NodeAttr::container()),
            NodeKind::Leaf => Ok(NodeAttr::leaf()),
            NodeKind::Absent => Err(Error::PathAbsent),
        }
    }

    /// Enumerate the immediate children of the directory at `path`,
    /// followed by the synthetic `.` and `..` entries.
    ///
    /// The server's listing covers every descendant depth; only names
    /// exactly one segment deeper than `path` survive, each reduced to
    /// its final segment. A path that is not a directory yields an
    /// empty sequence. Entry order within the real children is the
    /// server's.
    ///
    /// # Errors
    ///
    /// Protocol faults propagate.
    pub async fn readdir(&self, path: &str) -> Result<Vec<String>> {
        debug!("readdir({path})");
        let name = self.resolver.resolve(path);
        let mut session = self.store.session().await;
        if !node::classify(&mut session, &name).await?.is_container() {
            return Ok(Vec::new());
        }

        let depth = name.depth();
        let mut entries: Vec<String> = Vec::new();
        for descendant in session.list(&name).await? {
            let segments: Vec<&str> = descendant.split('/').collect();
            if segments.len() == depth + 1 {
                let child = segments[depth].to_string();
                if !entries.contains(&child) {
                    entries.push(child);
                }
            }
        }
        entries.push(".".to_string());
        entries.push("..".to_string());
        Ok(entries)
    }

    /// Open the node at `path` for the given access mode.
    ///
    /// Read-only and write-only opens require a file; opening
    /// read-write succeeds without probing the store.
    ///
    /// # Errors
    ///
    /// [`Error::PathAbsent`] / [`Error::KindMismatch`] when the path is
    /// missing or is a directory.
    pub async fn open(&self, path: &str, mode: AccessMode) -> Result<()> {
        debug!("open({path}, {mode:?})");
        match mode {
            AccessMode::ReadWrite => Ok(()),
            AccessMode::Read | AccessMode::Write => {
                let name = self.resolver.resolve(path);
                let mut session = self.store.session().await;
                match node::classify(&mut session, &name).await? {
                    NodeKind::Leaf => Ok(()),
                    NodeKind::Container => Err(Error::KindMismatch),
                    NodeKind::Absent => Err(Error::PathAbsent),
                }
            }
        }
    }

    /// Read a byte range of the file at `path`.
    ///
    /// The whole message body is fetched from the server on every call
    /// and the requested slice cut locally; repeated reads of the same
    /// file each cost one full transfer. A range past the end of
    /// content returns fewer bytes than requested, never an error.
    ///
    /// # Errors
    ///
    /// [`Error::PathAbsent`] / [`Error::KindMismatch`] when the path is
    /// missing or is a directory; protocol faults propagate.
    pub async fn read(&self, path: &str, size: u32, offset: u64) -> Result<Vec<u8>> {
        debug!("read({path}, {size}, {offset})");
        let name = self.resolver.resolve(path);
        let mut session = self.store.session().await;
        match node::classify(&mut session, &name).await? {
            NodeKind::Leaf => {}
            NodeKind::Container => return Err(Error::KindMismatch),
            NodeKind::Absent => return Err(Error::PathAbsent),
        }

        // classify left the folder selected; message one is the content
        let raw = session.fetch_first().await?;
        let payload = message::unwrap(&raw)?;
        Ok(clip(&payload, size, offset).to_vec())
    }

    /// Replace the file at `path` with `data`.
    ///
    /// Whole-object replacement: any existing folder at the path is
    /// deleted, the folder recreated, and a single new message holding
    /// `data` appended. `offset` is accepted for interface
    /// compatibility but is not a patch position — a write at a
    /// nonzero offset still discards the prior content entirely. Known
    /// limitation of the store mapping.
    ///
    /// If a step fails after the delete, the path is left absent and
    /// the error surfaces; there is no rollback.
    ///
    /// # Errors
    ///
    /// Protocol faults from delete/create/append propagate.
    pub async fn write(&self, path: &str, data: &[u8], offset: u64) -> Result<usize> {
        debug!("write({path}, {} bytes, offset {offset})", data.len());
        let name = self.resolver.resolve(path);
        let mut session = self.store.session().await;
        if node::classify(&mut session, &name).await?.exists() {
            session.delete(&name).await?;
        }
        session.create(&name).await?;
        session.append(&name, &message::wrap(data)).await?;
        Ok(data.len())
    }

    /// Create the directory at `path`. A node already there, of either
    /// kind, makes this a silent no-op.
    ///
    /// # Errors
    ///
    /// Protocol faults propagate.
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        debug!("mkdir({path})");
        let name = self.resolver.resolve(path);
        let mut session = self.store.session().await;
        if !node::classify(&mut session, &name).await?.exists() {
            session.create(&name).await?;
        }
        Ok(())
    }

    /// Remove the directory at `path`. Anything but a directory there
    /// makes this a silent no-op.
    ///
    /// # Errors
    ///
    /// Protocol faults propagate.
    pub async fn rmdir(&self, path: &str) -> Result<()> {
        debug!("rmdir({path})");
        let name = self.resolver.resolve(path);
        let mut session = self.store.session().await;
        if node::classify(&mut session, &name).await?.is_container() {
            session.delete(&name).await?;
        }
        Ok(())
    }

    /// Remove the file at `path`, deleting the whole one-message
    /// folder that represents it. Anything but a file there makes this
    /// a silent no-op.
    ///
    /// # Errors
    ///
    /// Protocol faults propagate.
    pub async fn unlink(&self, path: &str) -> Result<()> {
        debug!("unlink({path})");
        let name = self.resolver.resolve(path);
        let mut session = self.store.session().await;
        if node::classify(&mut session, &name).await?.is_leaf() {
            session.delete(&name).await?;
        }
        Ok(())
    }

    /// Renaming is not part of the store mapping; reported as success
    /// without protocol work.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        debug!("rename({from}, {to})");
        Ok(())
    }

    /// Create a file node. The store cannot represent an empty file,
    /// so no protocol work happens; the node comes into being on the
    /// first write.
    pub fn mknod(&self, path: &str) -> Result<()> {
        debug!("mknod({path})");
        Ok(())
    }

    // -- no-op stubs: no protocol work, reported as success --

    pub fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        debug!("chmod({path}, {mode:o})");
        Ok(())
    }

    pub fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()> {
        debug!("chown({path}, {uid}, {gid})");
        Ok(())
    }

    pub fn link(&self, target: &str, name: &str) -> Result<()> {
        debug!("link({target}, {name})");
        Ok(())
    }

    pub fn symlink(&self, name: &str, target: &str) -> Result<()> {
        debug!("symlink({name}, {target})");
        Ok(())
    }

    pub fn readlink(&self, path: &str) -> Result<()> {
        debug!("readlink({path})");
        Ok(())
    }

    pub fn utimens(&self, path: &str) -> Result<()> {
        debug!("utimens({path})");
        Ok(())
    }

    pub fn statfs(&self, path: &str) -> Result<()> {
        debug!("statfs({path})");
        Ok(())
    }

    pub fn truncate(&self, path: &str, size: u64) -> Result<()> {
        debug!("truncate({path}, {size})");
        Ok(())
    }

    pub fn access(&self, path: &str, mask: u32) -> Result<()> {
        debug!("access({path}, {mask:o})");
        Ok(())
    }

    pub fn flush(&self, path: &str) -> Result<()> {
        debug!("flush({path})");
        Ok(())
    }

    pub fn fsync(&self, path: &str) -> Result<()> {
        debug!("fsync({path})");
        Ok(())
    }

    pub fn release(&self, path: &str) -> Result<()> {
        debug!("release({path})");
        Ok(())
    }

    /// Log the underlying session out. Called once at unmount.
    pub async fn logout(&self) {
        self.store.logout().await;
    }
}

/// Cut the requested `[offset, offset + size)` window out of a body,
/// clipped to the available length.
fn clip(payload: &[u8], size: u32, offset: u64) -> &[u8] {
    let start = usize::try_from(offset)
        .unwrap_or(usize::MAX)
        .min(payload.len());
    let end = start.saturating_add(size as usize).min(payload.len());
    &payload[start..end]
}
