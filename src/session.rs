//! Single-session access to the mail store
//!
//! The store is one authenticated IMAP connection. The connection is
//! stateful (SELECT changes what FETCH operates on) and not safe for
//! interleaved use, so [`MailStore`] keeps it behind a mutex and hands
//! out a [`StoreSession`] guard for the duration of one whole logical
//! filesystem operation. The guard exposes exactly the protocol verbs
//! the translation layer consumes.

use crate::config::ImapConfig;
use crate::connection::{self, ImapSession};
use crate::error::{Error, Result};
use crate::path::ResolvedName;
use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Owner of the single IMAP session.
///
/// Opened once at startup, logged out at shutdown. All protocol
/// traffic flows through [`MailStore::session`], which serializes
/// callers: one logical operation in flight at a time, no pool, no
/// timeout.
pub struct MailStore {
    session: Mutex<ImapSession>,
}

impl MailStore {
    /// Connect and authenticate the single session.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connection, TLS handshake, or login
    /// fails.
    pub async fn connect(config: &ImapConfig) -> Result<Self> {
        let session = connection::connect(config).await?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    /// Acquire the session for one logical operation.
    ///
    /// Holding the guard across a classify-then-act sequence is what
    /// keeps the selected-folder state consistent; release it as soon
    /// as the operation completes.
    pub async fn session(&self) -> StoreSession<'_> {
        StoreSession {
            inner: self.session.lock().await,
        }
    }

    /// Log the session out. Failures are ignored; the connection is
    /// going away either way.
    pub async fn logout(&self) {
        let mut session = self.session.lock().await;
        session.logout().await.ok();
    }
}

/// Exclusive use of the session for one logical operation.
pub struct StoreSession<'a> {
    inner: MutexGuard<'a, ImapSession>,
}

impl StoreSession<'_> {
    /// SELECT a folder and report how many messages it holds.
    ///
    /// `Ok(None)` means the server rejected the SELECT (no folder at
    /// that name) — a normal outcome, not an error. On success the
    /// folder stays selected for subsequent verbs.
    ///
    /// # Errors
    ///
    /// Returns an error only for faults below the protocol status
    /// level (lost connection, unparseable response).
    pub async fn select(&mut self, name: &ResolvedName) -> Result<Option<u32>> {
        match self.inner.select(name.as_str()).await {
            Ok(mailbox) => Ok(Some(mailbox.exists)),
            Err(e) if is_rejection(&e) => {
                debug!("SELECT {} rejected: {}", name, e);
                Ok(None)
            }
            Err(e) => Err(Error::Imap(format!("Failed to select {name}: {e}"))),
        }
    }

    /// LIST every descendant folder name under `name`.
    ///
    /// The server enumerates all depths; callers filter to the level
    /// they need.
    ///
    /// # Errors
    ///
    /// Returns an error if the LIST command fails.
    pub async fn list(&mut self, name: &ResolvedName) -> Result<Vec<String>> {
        let mut stream = self
            .inner
            .list(Some(name.as_str()), Some("*"))
            .await
            .map_err(|e| Error::Imap(format!("List {name} failed: {e}")))?;

        let mut names = Vec::new();
        while let Some(item) = stream.next().await {
            if let Ok(entry) = item {
                names.push(entry.name().to_string());
            }
        }
        Ok(names)
    }

    /// Fetch the full body of the message at sequence number one of
    /// the currently selected folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the FETCH fails or the folder holds no
    /// message.
    pub async fn fetch_first(&mut self) -> Result<Vec<u8>> {
        let mut messages = self
            .inner
            .fetch("1", "(BODY.PEEK[])")
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;

        while let Some(msg_result) = messages.next().await {
            let msg = msg_result.map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;
            if let Some(body) = msg.body() {
                return Ok(body.to_vec());
            }
        }

        Err(Error::Imap("No message at position one".into()))
    }

    /// APPEND one message to the folder, stamped with the current
    /// time as its internal date.
    ///
    /// # Errors
    ///
    /// Returns an error if the APPEND is rejected or fails.
    pub async fn append(&mut self, name: &ResolvedName, raw: &[u8]) -> Result<()> {
        let date = format!("\"{}\"", Utc::now().format("%d-%b-%Y %H:%M:%S +0000"));
        self.inner
            .append(name.as_str(), None, Some(date.as_str()), raw)
            .await
            .map_err(|e| Error::Imap(format!("Append to {name} failed: {e}")))
    }

    /// CREATE an empty folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the CREATE is rejected or fails.
    pub async fn create(&mut self, name: &ResolvedName) -> Result<()> {
        self.inner
            .create(name.as_str())
            .await
            .map_err(|e| Error::Imap(format!("Create {name} failed: {e}")))
    }

    /// DELETE a folder and everything stored in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the DELETE is rejected or fails.
    pub async fn delete(&mut self, name: &ResolvedName) -> Result<()> {
        self.inner
            .delete(name.as_str())
            .await
            .map_err(|e| Error::Imap(format!("Delete {name} failed: {e}")))
    }
}

/// Whether the server answered the command with a No/Bad status, as
/// opposed to the exchange itself failing.
fn is_rejection(err: &async_imap::error::Error) -> bool {
    matches!(
        err,
        async_imap::error::Error::No(_) | async_imap::error::Error::Bad(_)
    )
}
