//! CREATE command handler.
//!
//! Adds an empty folder to the store. A name collision is a NO, per
//! RFC 3501 Section 6.3.3.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the CREATE command.
pub async fn handle_create<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mutex<Mailbox>,
    stream: &mut BufReader<S>,
) {
    let created = mailbox.lock().unwrap().create_folder(folder_name);
    let resp = if created {
        format!("{tag} OK CREATE completed\r\n")
    } else {
        format!("{tag} NO Folder already exists\r\n")
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

        handle_create(tag, folder_name, mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn creates_new_folder() {
        let mailbox = Mutex::new(MailboxBuilder::new().folder("FS").build());

        let output = run("A1", "FS/new", &mailbox).await;

        assert!(output.contains("A1 OK CREATE completed"));
        assert!(mailbox.lock().unwrap().get_folder("FS/new").is_some());
    }

    #[tokio::test]
    async fn duplicate_name_is_a_no() {
        let mailbox = Mutex::new(MailboxBuilder::new().folder("FS").build());

        let output = run("A1", "FS", &mailbox).await;

        assert!(output.contains("A1 NO Folder already exists"));
        assert_eq!(mailbox.lock().unwrap().folders.len(), 1);
    }
}
