//! Stored message framing
//!
//! File content is carried as the payload of an RFC 2822 message. The
//! write path wraps the caller's bytes in a minimal fixed header block;
//! the read path parses the fetched message and recovers the payload.
//! The headers declare a binary transfer encoding so the payload passes
//! through byte-for-byte.

use crate::error::{Error, Result};

/// Wrap raw file content into the message stored on the server.
#[must_use]
pub fn wrap(payload: &[u8]) -> Vec<u8> {
    let header = "MIME-Version: 1.0\r\n\
                  Content-Type: application/octet-stream\r\n\
                  Content-Transfer-Encoding: binary\r\n\
                  \r\n";
    let mut raw = Vec::with_capacity(header.len() + payload.len());
    raw.extend_from_slice(header.as_bytes());
    raw.extend_from_slice(payload);
    raw
}

/// Recover the file content from a fetched message.
///
/// # Errors
///
/// Returns [`Error::Imap`] if the fetched bytes are not a parseable
/// message.
pub fn unwrap(raw: &[u8]) -> Result<Vec<u8>> {
    let parsed = mailparse::parse_mail(raw)
        .map_err(|e| Error::Imap(format!("Unparseable stored message: {e}")))?;
    parsed
        .get_body_raw()
        .map_err(|e| Error::Imap(format!("Unreadable message body: {e}")))
}
