#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Mount an IMAP mail store as a filesystem

use clap::Parser;
use imapfs::fuse::{self, MailFuse};
use imapfs::{ImapConfig, ImapFs, MailStore, PathResolver};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imapfs")]
#[command(about = "Mount an IMAP mail store as a filesystem")]
struct Args {
    /// Mount target path
    mountpoint: PathBuf,
}

fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ImapConfig::from_env()?;

    let rt = tokio::runtime::Runtime::new()?;
    let store = rt.block_on(MailStore::connect(&config))?;
    let fs = ImapFs::new(store, PathResolver::new(config.root));

    // The whole tree lives under the root folder; provision it if the
    // server does not have it yet (idempotent).
    rt.block_on(fs.mkdir("/"))?;

    let adapter = MailFuse::new(fs, rt.handle().clone());
    fuse::mount(adapter, &args.mountpoint)?;
    Ok(())
}
