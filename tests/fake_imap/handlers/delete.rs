//! DELETE command handler.
//!
//! Removes a folder and its messages. Deleting a name that does not
//! exist is a NO, per RFC 3501 Section 6.3.4. Only the named folder is
//! removed; folders below it survive.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the DELETE command.
pub async fn handle_delete<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mutex<Mailbox>,
    stream: &mut BufReader<S>,
) {
    let deleted = mailbox.lock().unwrap().delete_folder(folder_name);
    let resp = if deleted {
        format!("{tag} OK DELETE completed\r\n")
    } else {
        format!("{tag} NO Folder not found\r\n")
    };
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    async fn run(tag: &str, folder_name: &str, mailbox: &Mutex<Mailbox>) -> String {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        handle_delete(tag, folder_name, mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn deletes_existing_folder() {
        let mailbox = Mutex::new(
            MailboxBuilder::new()
                .folder("FS")
                .folder("FS/doomed")
                .build(),
        );

        let output = run("A1", "FS/doomed", &mailbox).await;

        assert!(output.contains("A1 OK DELETE completed"));
        assert!(mailbox.lock().unwrap().get_folder("FS/doomed").is_none());
    }

    #[tokio::test]
    async fn missing_folder_is_a_no() {
        let mailbox = Mutex::new(MailboxBuilder::new().folder("FS").build());

        let output = run("A1", "FS/nope", &mailbox).await;

        assert!(output.contains("A1 NO Folder not found"));
    }

    #[tokio::test]
    async fn descendants_survive() {
        let mailbox = Mutex::new(
            MailboxBuilder::new()
                .folder("FS/a")
                .folder("FS/a/x")
                .build(),
        );

        run("A1", "FS/a", &mailbox).await;

        let state = mailbox.lock().unwrap();
        assert!(state.get_folder("FS/a").is_none());
        assert!(state.get_folder("FS/a/x").is_some());
    }
}
