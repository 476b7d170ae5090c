//! Kernel dispatcher glue
//!
//! Translates `fuser`'s inode-style callbacks into [`ImapFs`]'s
//! path-based operations. FUSE replies are synchronous, so every
//! callback blocks on the core future through a shared tokio runtime
//! handle. The adapter holds no mail-store logic: it keeps an
//! inode↔path table, maps the error taxonomy onto the fixed errno
//! vocabulary (`ENOENT`, `EACCES`, `EIO`), and reports zero TTLs so
//! the kernel re-asks instead of caching.

use crate::error::Error;
use crate::fs::{AccessMode, ImapFs, NodeAttr};
use crate::node::NodeKind;
use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request,
};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Zero cache lifetime on every entry/attribute reply; the store is
/// re-probed on each call.
const TTL: Duration = Duration::ZERO;

const ROOT_INO: u64 = 1;

/// Bidirectional inode↔path table.
///
/// Inodes are handed out on first sight of a path and never reclaimed;
/// the kernel only learns paths through `lookup`, so every inode it
/// asks about is here.
struct InodeTable {
    paths: HashMap<u64, String>,
    inodes: HashMap<String, u64>,
    next: u64,
}

impl InodeTable {
    fn new() -> Self {
        let mut table = Self {
            paths: HashMap::new(),
            inodes: HashMap::new(),
            next: ROOT_INO + 1,
        };
        table.paths.insert(ROOT_INO, "/".to_string());
        table.inodes.insert("/".to_string(), ROOT_INO);
        table
    }

    fn get_or_assign(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.inodes.get(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, path.to_string());
        self.inodes.insert(path.to_string(), ino);
        ino
    }

    fn path_of(&self, ino: u64) -> Option<&str> {
        self.paths.get(&ino).map(String::as_str)
    }

    fn ino_of(&self, path: &str) -> Option<u64> {
        self.inodes.get(path).copied()
    }
}

/// Join a directory path and a child name from the kernel.
fn child_path(parent: &str, name: &OsStr) -> Option<String> {
    let name = name.to_str()?;
    if parent == "/" {
        Some(format!("/{name}"))
    } else {
        Some(format!("{parent}/{name}"))
    }
}

/// Parent path of a non-root path.
fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Map the error taxonomy onto the dispatcher's errno vocabulary.
fn errno(err: &Error) -> i32 {
    match err {
        Error::PathAbsent | Error::KindMismatch => libc::ENOENT,
        _ => libc::EIO,
    }
}

/// FUSE filesystem over an [`ImapFs`] core.
pub struct MailFuse {
    fs: ImapFs,
    rt: Handle,
    inodes: InodeTable,
}

impl MailFuse {
    #[must_use]
    pub fn new(fs: ImapFs, rt: Handle) -> Self {
        Self {
            fs,
            rt,
            inodes: InodeTable::new(),
        }
    }

    fn file_attr(&self, ino: u64, attr: NodeAttr) -> FileAttr {
        let kind = match attr.kind {
            NodeKind::Container => FileType::Directory,
            // Absent never reaches here; getattr errors first
            NodeKind::Leaf | NodeKind::Absent => FileType::RegularFile,
        };
        FileAttr {
            ino,
            size: attr.size,
            blocks: 0,
            atime: SystemTime::UNIX_EPOCH,
            mtime: SystemTime::UNIX_EPOCH,
            ctime: SystemTime::UNIX_EPOCH,
            crtime: SystemTime::UNIX_EPOCH,
            kind,
            perm: attr.perm,
            nlink: attr.nlink,
            uid: 0,
            gid: 0,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }
}

#[allow(clippy::too_many_lines)]
impl Filesystem for MailFuse {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        info!("Filesystem ready");
        Ok(())
    }

    fn destroy(&mut self) {
        info!("Unmounting, logging session out");
        self.rt.block_on(self.fs.logout());
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_path) = self.inodes.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(parent_path, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.rt.block_on(self.fs.getattr(&path)) {
            Ok(attr) => {
                let ino = self.inodes.get_or_assign(&path);
                reply.entry(&TTL, &self.file_attr(ino, attr), 0);
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let Some(path) = self.inodes.path_of(ino).map(str::to_string) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.rt.block_on(self.fs.getattr(&path)) {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(ino, attr)),
            Err(e) => reply.error(errno(&e)),
        }
    }

    #[allow(clippy::similar_names)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<fuser::TimeOrNow>,
        _mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let Some(path) = self.inodes.path_of(ino).map(str::to_string) else {
            reply.error(libc::ENOENT);
            return;
        };
        // truncate and time/mode updates perform no protocol work
        if let Some(size) = size {
            let _ = self.fs.truncate(&path, size);
        }
        match self.rt.block_on(self.fs.getattr(&path)) {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(ino, attr)),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        if let Some(path) = self.inodes.path_of(ino) {
            let _ = self.fs.readlink(path);
        }
        reply.data(&[]);
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let Some(parent_path) = self.inodes.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(parent_path, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        let _ = self.fs.mknod(&path);
        let ino = self.inodes.get_or_assign(&path);
        reply.entry(&TTL, &self.file_attr(ino, NodeAttr::leaf()), 0);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(parent_path) = self.inodes.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(parent_path, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.rt.block_on(self.fs.mkdir(&path)) {
            Ok(()) => {
                let ino = self.inodes.get_or_assign(&path);
                reply.entry(&TTL, &self.file_attr(ino, NodeAttr::container()), 0);
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(parent_path) = self.inodes.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(parent_path, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.rt.block_on(self.fs.unlink(&path)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(parent_path) = self.inodes.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(parent_path, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.rt.block_on(self.fs.rmdir(&path)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let name = link_name.to_string_lossy();
        let _ = self.fs.symlink(&name, &target.to_string_lossy());
        // nothing was created; report the synthetic node as a file
        let Some(parent_path) = self.inodes.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(parent_path, link_name) else {
            reply.error(libc::ENOENT);
            return;
        };
        let ino = self.inodes.get_or_assign(&path);
        reply.entry(&TTL, &self.file_attr(ino, NodeAttr::leaf()), 0);
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let from = self
            .inodes
            .path_of(parent)
            .and_then(|p| child_path(p, name));
        let to = self
            .inodes
            .path_of(newparent)
            .and_then(|p| child_path(p, newname));
        match (from, to) {
            (Some(from), Some(to)) => {
                let _ = self.fs.rename(&from, &to);
                reply.ok();
            }
            _ => reply.error(libc::ENOENT),
        }
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let target = self.inodes.path_of(ino).map(str::to_string);
        let link = self
            .inodes
            .path_of(newparent)
            .and_then(|p| child_path(p, newname));
        match (target, link) {
            (Some(target), Some(link)) => {
                let _ = self.fs.link(&target, &link);
                let ino = self.inodes.get_or_assign(&link);
                reply.entry(&TTL, &self.file_attr(ino, NodeAttr::leaf()), 0);
            }
            _ => reply.error(libc::ENOENT),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let Some(path) = self.inodes.path_of(ino).map(str::to_string) else {
            reply.error(libc::ENOENT);
            return;
        };
        let mode = match flags & libc::O_ACCMODE {
            libc::O_RDONLY => AccessMode::Read,
            libc::O_WRONLY => AccessMode::Write,
            libc::O_RDWR => AccessMode::ReadWrite,
            _ => {
                reply.error(libc::EACCES);
                return;
            }
        };
        match self.rt.block_on(self.fs.open(&path, mode)) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.inodes.path_of(ino).map(str::to_string) else {
            reply.error(libc::ENOENT);
            return;
        };
        let offset = u64::try_from(offset).unwrap_or(0);
        match self.rt.block_on(self.fs.read(&path, size, offset)) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(path) = self.inodes.path_of(ino).map(str::to_string) else {
            reply.error(libc::ENOENT);
            return;
        };
        let offset = u64::try_from(offset).unwrap_or(0);
        match self.rt.block_on(self.fs.write(&path, data, offset)) {
            Ok(written) => reply.written(u32::try_from(written).unwrap_or(u32::MAX)),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        if let Some(path) = self.inodes.path_of(ino) {
            let _ = self.fs.flush(path);
        }
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        if let Some(path) = self.inodes.path_of(ino) {
            let _ = self.fs.release(path);
        }
        reply.ok();
    }

    fn fsync(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
        if let Some(path) = self.inodes.path_of(ino) {
            let _ = self.fs.fsync(path);
        }
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.inodes.path_of(ino).map(str::to_string) else {
            reply.error(libc::ENOENT);
            return;
        };
        let names = match self.rt.block_on(self.fs.readdir(&path)) {
            Ok(names) => names,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };

        let parent_ino = self.inodes.ino_of(parent_path(&path)).unwrap_or(ROOT_INO);

        let mut entries: Vec<(u64, FileType, String)> = Vec::new();
        for name in names {
            if name == "." {
                entries.push((ino, FileType::Directory, name));
            } else if name == ".." {
                entries.push((parent_ino, FileType::Directory, name));
            } else {
                let Some(child) = child_path(&path, OsStr::new(&name)) else {
                    continue;
                };
                // each entry's kind costs a fresh probe; nothing is cached
                match self.rt.block_on(self.fs.getattr(&child)) {
                    Ok(attr) => {
                        let child_ino = self.inodes.get_or_assign(&child);
                        let kind = match attr.kind {
                            NodeKind::Container => FileType::Directory,
                            NodeKind::Leaf | NodeKind::Absent => FileType::RegularFile,
                        };
                        entries.push((child_ino, kind, name));
                    }
                    Err(e) => {
                        warn!("Skipping unreadable entry {}: {}", child, e);
                    }
                }
            }
        }

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (entry_ino, kind, name)) in entries.into_iter().enumerate().skip(skip) {
            let next_offset = i64::try_from(i + 1).unwrap_or(i64::MAX);
            if reply.add(entry_ino, next_offset, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        if let Some(path) = self.inodes.path_of(ino) {
            let _ = self.fs.statfs(path);
        }
        reply.statfs(0, 0, 0, 0, 0, 512, 255, 0);
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        if let Some(path) = self.inodes.path_of(ino) {
            let _ = self.fs.access(path, u32::try_from(mask).unwrap_or(0));
        }
        reply.ok();
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let Some(parent_path) = self.inodes.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(parent_path, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        let _ = self.fs.mknod(&path);
        let ino = self.inodes.get_or_assign(&path);
        reply.created(&TTL, &self.file_attr(ino, NodeAttr::leaf()), 0, 0, 0);
    }
}

/// Mount the filesystem at `mountpoint` and block until unmounted.
///
/// # Errors
///
/// Returns an error if the mount cannot be established.
pub fn mount(fuse: MailFuse, mountpoint: &Path) -> std::io::Result<()> {
    let options = [
        MountOption::FSName("imapfs".to_string()),
        MountOption::AutoUnmount,
    ];
    fuser::mount2(fuse, mountpoint, &options)
}
