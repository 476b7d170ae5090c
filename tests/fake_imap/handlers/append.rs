//! APPEND command handler.
//!
//! APPEND is the one command the client sends with a **literal**: the
//! command line ends in `{bytecount}`, the server answers with a `+`
//! continuation, and the client then sends exactly that many raw
//! bytes followed by CRLF:
//!
//! ```text
//!   Client:  A5 APPEND "FS/notes.txt" "07-Aug-2026 10:00:00 +0000" {42}
//!   Server:  + OK
//!   Client:  <exactly 42 bytes of raw RFC 2822 message>CRLF
//!   Server:  A5 OK APPEND completed
//! ```
//!
//! Because the literal never fits in one line, this handler parses the
//! command line itself instead of going through `CommandCodec`, then
//! drives the continuation exchange. A `{bytecount+}` (LITERAL+)
//! suffix means the client sends the bytes without waiting for the
//! continuation.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, BufReader};

/// Pull the folder name and literal size out of an APPEND line.
/// Returns `(name, length, nonsync)`.
fn parse_append(line: &str) -> Option<(String, usize, bool)> {
    let trimmed = line.trim_end();

    // literal marker at the very end: {N} or {N+}
    let open = trimmed.rfind('{')?;
    if !trimmed.ends_with('}') {
        return None;
    }
    let mut digits = &trimmed[open + 1..trimmed.len() - 1];
    let nonsync = digits.ends_with('+');
    if nonsync {
        digits = &digits[..digits.len() - 1];
    }
    let length: usize = digits.parse().ok()?;

    let mut parts = trimmed.splitn(3, ' ');
    let _tag = parts.next()?;
    let verb = parts.next()?;
    if !verb.eq_ignore_ascii_case("APPEND") {
        return None;
    }
    let rest = parts.next()?.trim_start();

    // folder name is either a quoted string or a bare atom
    let name = if let Some(stripped) = rest.strip_prefix('"') {
        stripped.split('"').next()?.to_string()
    } else {
        rest.split_whitespace().next()?.to_string()
    };

    Some((name, length, nonsync))
}

/// Handle the APPEND command, including the literal continuation.
pub async fn handle_append<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    line: &str,
    mailbox: &Mutex<Mailbox>,
    stream: &mut BufReader<S>,
) {
    let Some((folder_name, length, nonsync)) = parse_append(line) else {
        let resp = format!("{tag} BAD Malformed APPEND\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    if !nonsync && write_line(stream, "+ OK\r\n").await.is_err() {
        return;
    }

    let mut raw = vec![0u8; length];
    if stream.read_exact(&mut raw).await.is_err() {
        return;
    }

    // consume the CRLF that terminates the command after the literal
    let mut trailer = Vec::new();
    let _ = tokio::io::AsyncBufReadExt::read_until(stream, b'\n', &mut trailer).await;

    let appended = mailbox.lock().unwrap().append_message(&folder_name, raw);
    let resp = if appended {
        format!("{tag} OK APPEND completed\r\n")
    } else {
        format!("{tag} NO [TRYCREATE] No such folder\r\n")
    };
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::{AsyncWriteExt, BufReader};

    #[test]
    fn parses_quoted_name_with_date_and_literal() {
        let (name, len, nonsync) =
            parse_append("A5 APPEND \"FS/notes.txt\" \"07-Aug-2026 10:00:00 +0000\" {42}\r\n")
                .unwrap();
        assert_eq!(name, "FS/notes.txt");
        assert_eq!(len, 42);
        assert!(!nonsync);
    }

    #[test]
    fn parses_bare_atom_name() {
        let (name, len, _) = parse_append("A1 APPEND FS {7}\r\n").unwrap();
        assert_eq!(name, "FS");
        assert_eq!(len, 7);
    }

    #[test]
    fn parses_nonsync_literal() {
        let (_, len, nonsync) = parse_append("A1 APPEND \"FS\" {7+}\r\n").unwrap();
        assert_eq!(len, 7);
        assert!(nonsync);
    }

    #[test]
    fn rejects_line_without_literal() {
        assert!(parse_append("A1 APPEND \"FS\"\r\n").is_none());
    }

    #[test]
    fn rejects_other_verbs() {
        assert!(parse_append("A1 SELECT \"FS\" {5}\r\n").is_none());
    }

    async fn run(line: &str, payload: &[u8], mailbox: &Mutex<Mailbox>) -> String {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        // Pre-buffer the literal bytes the handler will ask for.
        client.write_all(payload).await.unwrap();
        client.write_all(b"\r\n").await.unwrap();

        let tag = line.split(' ').next().unwrap();
        handle_append(tag, line, mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut client, &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn appends_literal_to_folder() {
        let mailbox = Mutex::new(MailboxBuilder::new().folder("FS/f").build());

        let output = run("A1 APPEND \"FS/f\" {5}\r\n", b"hello", &mailbox).await;

        assert!(output.starts_with("+ OK\r\n"));
        assert!(output.contains("A1 OK APPEND completed"));
        let state = mailbox.lock().unwrap();
        assert_eq!(state.get_folder("FS/f").unwrap().messages, vec![b"hello".to_vec()]);
    }

    #[tokio::test]
    async fn missing_folder_is_a_no() {
        let mailbox = Mutex::new(MailboxBuilder::new().build());

        let output = run("A1 APPEND \"FS/ghost\" {5}\r\n", b"hello", &mailbox).await;

        assert!(output.contains("A1 NO [TRYCREATE] No such folder"));
    }

    #[tokio::test]
    async fn malformed_line_is_a_bad() {
        let mailbox = Mutex::new(MailboxBuilder::new().build());

        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);
        handle_append("A1", "A1 APPEND oops\r\n", &mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("A1 BAD Malformed APPEND"));
    }
}
