use std::sync::Mutex;

use efs_fd::{FdTable, OpenFlags, RawFd};
use efs_inode::{Ino, InodeManager, InodeRecord, Kind, StatUpdate};
use efs_kv::{EncryptedStore, OrderedStore};
use efs_path::{Access, Credentials, NameResolver};

use crate::{
    device::{DeviceTable, RawDev},
    error::Error,
    stat::Stat,
};

/// An open encrypted filesystem: the POSIX-shaped facade over
/// [`efs_kv`]'s transactional store, [`efs_inode`]'s data model, and
/// [`efs_fd`]'s descriptor table.
///
/// There is no process concept in a library, so callers pass their
/// [`Credentials`] and a current-directory [`Ino`] explicitly to every
/// operation that resolves a path, instead of the filesystem tracking them
/// implicitly.
pub struct EncryptedFs<S: OrderedStore> {
    store: EncryptedStore<S>,
    inodes: InodeManager<S>,
    fds: Mutex<FdTable>,
    devices: DeviceTable,
    block_size: usize,
    umask: u16,
}

impl<S: OrderedStore> EncryptedFs<S> {
    pub(crate) fn from_parts(store: EncryptedStore<S>, block_size: usize, umask: u16) -> Self {
        Self { store, inodes: InodeManager::new(), fds: Mutex::new(FdTable::new()), devices: DeviceTable::with_standard_devices(), block_size, umask }
    }

    /// Formats an empty store: allocates and writes the root directory.
    /// Must be called exactly once, before the filesystem is used.
    pub fn mkfs(&self, uid: u32, gid: u32, now: i64) -> Result<(), Error> {
        self.store.transact(&[Ino::SUPERBLOCK.get(), Ino::ROOT.get()], |tx| -> Result<(), Error> {
            let ino = self.inodes.allocate_ino(tx)?;
            debug_assert_eq!(ino, Ino::ROOT, "mkfs must run against a freshly opened, empty store");
            self.inodes.dir_create(tx, ino, ino, 0o755, uid, gid, now)?;
            Ok(())
        })
    }

    pub fn register_device(&mut self, dev: RawDev, device: std::sync::Arc<dyn crate::device::CharDevice>) {
        self.devices.register(dev, device);
    }

    fn resolver(&self) -> Resolver<'_, S> {
        Resolver { store: &self.store, inodes: &self.inodes }
    }

    /// Resolves `path` (absolute or relative to `cwd`), following every
    /// symlink encountered, including a trailing one.
    fn resolve(&self, cwd: Ino, path: &str, creds: Credentials) -> Result<Ino, Error> {
        let mut resolver = self.resolver();
        efs_path::walk(&mut resolver, Ino::ROOT, cwd, path, creds).map_err(Error::from)
    }

    /// Splits `path` into its parent directory and final component, without
    /// resolving either yet.
    fn split(path: &str) -> Result<(&str, &str), Error> {
        if path.is_empty() {
            return Err(Error::InvalidArgument);
        }
        match path.rfind('/') {
            Some(idx) => {
                let name = &path[idx + 1..];
                if name.is_empty() {
                    return Err(Error::InvalidArgument);
                }
                let parent = if idx == 0 { "/" } else { &path[..idx] };
                Ok((parent, name))
            }
            None => Ok(("", path)),
        }
    }

    fn record(&self, tx: &mut efs_kv::Tx<'_, S>, ino: Ino) -> Result<InodeRecord, Error> {
        Ok(self.inodes.get(tx, ino)?)
    }

    pub fn stat(&self, cwd: Ino, path: &str, creds: Credentials) -> Result<Stat, Error> {
        let ino = self.resolve(cwd, path, creds)?;
        self.stat_ino(ino)
    }

    /// Like [`Self::stat`], but a trailing symlink is reported on, not
    /// followed through.
    pub fn lstat(&self, cwd: Ino, path: &str, creds: Credentials) -> Result<Stat, Error> {
        let (parent_path, name) = Self::split(path)?;
        let parent = self.resolve(cwd, parent_path, creds)?;
        let (ino, _kind) = self.store.transact(&[parent.get()], |tx| self.inodes.dir_get_entry(tx, parent, name))?.ok_or(Error::NotFound)?;
        self.stat_ino(ino)
    }

    fn stat_ino(&self, ino: Ino) -> Result<Stat, Error> {
        let record = self.store.transact(&[ino.get()], |tx| self.record(tx, ino))?;
        Ok(Stat::from_record(ino, &record))
    }

    pub fn readdir(&self, cwd: Ino, path: &str, creds: Credentials) -> Result<Vec<(String, Ino, Kind)>, Error> {
        let dir = self.resolve(cwd, path, creds)?;
        self.store.transact(&[dir.get()], |tx| -> Result<_, Error> {
            let record = self.record(tx, dir)?;
            if record.kind != Kind::Directory {
                return Err(Error::NotADirectory);
            }
            if !efs_path::check_permission(record.mode, record.uid, record.gid, creds, Access::READ) {
                return Err(Error::PermissionDenied);
            }
            Ok(self.inodes.dir_entries(tx, dir)?)
        })
    }

    pub fn mkdir(&self, cwd: Ino, path: &str, mode: u16, creds: Credentials, now: i64) -> Result<(), Error> {
        let (parent_path, name) = Self::split(path)?;
        let parent = self.resolve(cwd, parent_path, creds)?;
        self.store.transact(&[Ino::SUPERBLOCK.get(), parent.get()], |tx| -> Result<(), Error> {
            let parent_record = self.record(tx, parent)?;
            if parent_record.kind != Kind::Directory {
                return Err(Error::NotADirectory);
            }
            if !efs_path::check_permission(parent_record.mode, parent_record.uid, parent_record.gid, creds, Access::WRITE) {
                return Err(Error::PermissionDenied);
            }
            if self.inodes.dir_get_entry(tx, parent, name)?.is_some() {
                return Err(Error::AlreadyExists);
            }

            let ino = self.inodes.allocate_ino(tx)?;
            self.inodes.dir_create(tx, ino, parent, mode & !self.umask, creds.uid, creds.gid, now)?;
            self.inodes.dir_set_entry(tx, parent, name, ino, Kind::Directory)?;

            let mut updated_parent = parent_record;
            updated_parent.nlink += 1;
            self.inodes.stat_set_prop(
                tx,
                parent,
                &StatUpdate { nlink: Some(updated_parent.nlink), mtime: Some(now), ctime: Some(now), ..Default::default() },
            )?;
            Ok(())
        })
    }

    pub fn rmdir(&self, cwd: Ino, path: &str, creds: Credentials) -> Result<(), Error> {
        let (parent_path, name) = Self::split(path)?;
        let parent = self.resolve(cwd, parent_path, creds)?;
        let (target, kind) = self.store.transact(&[parent.get()], |tx| self.inodes.dir_get_entry(tx, parent, name))?.ok_or(Error::NotFound)?;
        if kind != Kind::Directory {
            return Err(Error::NotADirectory);
        }

        self.store.transact(&[parent.get(), target.get()], |tx| -> Result<(), Error> {
            let parent_record = self.record(tx, parent)?;
            if !efs_path::check_permission(parent_record.mode, parent_record.uid, parent_record.gid, creds, Access::WRITE) {
                return Err(Error::PermissionDenied);
            }
            let (found, found_kind) = self.inodes.dir_get_entry(tx, parent, name)?.ok_or(Error::NotFound)?;
            if found != target || found_kind != Kind::Directory {
                return Err(Error::TransactionConflict);
            }
            let entries = self.inodes.dir_entries(tx, target)?;
            if entries.len() > 2 {
                return Err(Error::NotEmpty);
            }
            self.inodes.dir_unset_entry(tx, parent, name)?;
            // An empty directory has no remaining links of its own — not even
            // ".", since it is about to stop existing.
            self.inodes.stat_set_prop(tx, target, &StatUpdate { nlink: Some(0), ..Default::default() })?;

            let mut updated_parent = parent_record;
            updated_parent.nlink = updated_parent.nlink.saturating_sub(1);
            self.inodes.stat_set_prop(tx, parent, &StatUpdate { nlink: Some(updated_parent.nlink), ..Default::default() })?;
            Ok(())
        })
    }

    pub fn unlink(&self, cwd: Ino, path: &str, creds: Credentials) -> Result<(), Error> {
        let (parent_path, name) = Self::split(path)?;
        let parent = self.resolve(cwd, parent_path, creds)?;
        let (target, _) = self.store.transact(&[parent.get()], |tx| self.inodes.dir_get_entry(tx, parent, name))?.ok_or(Error::NotFound)?;

        self.store.transact(&[parent.get(), target.get()], |tx| -> Result<(), Error> {
            let parent_record = self.record(tx, parent)?;
            if !efs_path::check_permission(parent_record.mode, parent_record.uid, parent_record.gid, creds, Access::WRITE) {
                return Err(Error::PermissionDenied);
            }
            let (found, kind) = self.inodes.dir_get_entry(tx, parent, name)?.ok_or(Error::NotFound)?;
            if found != target {
                return Err(Error::TransactionConflict);
            }
            if kind == Kind::Directory {
                return Err(Error::IsADirectory);
            }
            self.inodes.dir_unset_entry(tx, parent, name)?;

            let record = self.record(tx, target)?;
            let remaining = record.nlink.saturating_sub(1);
            self.inodes.stat_set_prop(tx, target, &StatUpdate { nlink: Some(remaining), ..Default::default() })?;
            Ok(())
        })
    }

    pub fn symlink(&self, cwd: Ino, target_path: &str, link_path: &str, creds: Credentials, now: i64) -> Result<(), Error> {
        let (parent_path, name) = Self::split(link_path)?;
        let parent = self.resolve(cwd, parent_path, creds)?;
        self.store.transact(&[Ino::SUPERBLOCK.get(), parent.get()], |tx| -> Result<(), Error> {
            let parent_record = self.record(tx, parent)?;
            if parent_record.kind != Kind::Directory {
                return Err(Error::NotADirectory);
            }
            if !efs_path::check_permission(parent_record.mode, parent_record.uid, parent_record.gid, creds, Access::WRITE) {
                return Err(Error::PermissionDenied);
            }
            if self.inodes.dir_get_entry(tx, parent, name)?.is_some() {
                return Err(Error::AlreadyExists);
            }
            let ino = self.inodes.allocate_ino(tx)?;
            self.inodes.symlink_create(tx, ino, 0o777, creds.uid, creds.gid, now, target_path)?;
            self.inodes.dir_set_entry(tx, parent, name, ino, Kind::Symlink)?;
            Ok(())
        })
    }

    pub fn readlink(&self, cwd: Ino, path: &str, creds: Credentials) -> Result<String, Error> {
        let (parent_path, name) = Self::split(path)?;
        let parent = self.resolve(cwd, parent_path, creds)?;
        let (ino, kind) = self.store.transact(&[parent.get()], |tx| self.inodes.dir_get_entry(tx, parent, name))?.ok_or(Error::NotFound)?;
        if kind != Kind::Symlink {
            return Err(Error::InvalidArgument);
        }
        self.store.transact(&[ino.get()], |tx| Ok(self.inodes.readlink(tx, ino)?))
    }

    pub fn link(&self, cwd: Ino, old_path: &str, new_path: &str, creds: Credentials, now: i64) -> Result<(), Error> {
        let target = self.resolve(cwd, old_path, creds)?;
        let (parent_path, name) = Self::split(new_path)?;
        let parent = self.resolve(cwd, parent_path, creds)?;

        self.store.transact(&[parent.get(), target.get()], |tx| -> Result<(), Error> {
            let parent_record = self.record(tx, parent)?;
            if parent_record.kind != Kind::Directory {
                return Err(Error::NotADirectory);
            }
            if !efs_path::check_permission(parent_record.mode, parent_record.uid, parent_record.gid, creds, Access::WRITE) {
                return Err(Error::PermissionDenied);
            }
            if self.inodes.dir_get_entry(tx, parent, name)?.is_some() {
                return Err(Error::AlreadyExists);
            }
            let mut record = self.record(tx, target)?;
            if record.kind == Kind::Directory {
                return Err(Error::IsADirectory);
            }
            record.nlink += 1;
            self.inodes.stat_set_prop(tx, target, &StatUpdate { nlink: Some(record.nlink), ctime: Some(now), ..Default::default() })?;
            self.inodes.dir_set_entry(tx, parent, name, target, record.kind)?;
            Ok(())
        })
    }

    pub fn rename(&self, cwd: Ino, old_path: &str, new_path: &str, creds: Credentials, now: i64) -> Result<(), Error> {
        let (old_parent_path, old_name) = Self::split(old_path)?;
        let (new_parent_path, new_name) = Self::split(new_path)?;
        let old_parent = self.resolve(cwd, old_parent_path, creds)?;
        let new_parent = self.resolve(cwd, new_parent_path, creds)?;

        // The destination's ino (if the name is already taken) isn't known
        // until this peek completes, so the real transaction below locks
        // exactly what it turns out to need.
        let displaced = self.store.transact(&[new_parent.get()], |tx| self.inodes.dir_get_entry(tx, new_parent, new_name))?;

        let mut lock_ids: Vec<u64> = vec![old_parent.get(), new_parent.get()];
        if let Some((existing, _)) = displaced {
            lock_ids.push(existing.get());
        }
        lock_ids.sort_unstable();
        lock_ids.dedup();

        self.store.transact(&lock_ids, |tx| -> Result<(), Error> {
            let old_parent_record = self.record(tx, old_parent)?;
            if !efs_path::check_permission(old_parent_record.mode, old_parent_record.uid, old_parent_record.gid, creds, Access::WRITE) {
                return Err(Error::PermissionDenied);
            }
            let new_parent_record = self.record(tx, new_parent)?;
            if new_parent_record.kind != Kind::Directory {
                return Err(Error::NotADirectory);
            }
            if !efs_path::check_permission(new_parent_record.mode, new_parent_record.uid, new_parent_record.gid, creds, Access::WRITE) {
                return Err(Error::PermissionDenied);
            }

            let (moved, kind) = self.inodes.dir_get_entry(tx, old_parent, old_name)?.ok_or(Error::NotFound)?;

            if let Some((existing, existing_kind)) = self.inodes.dir_get_entry(tx, new_parent, new_name)? {
                if existing_kind != kind {
                    return if existing_kind == Kind::Directory { Err(Error::IsADirectory) } else { Err(Error::NotADirectory) };
                }
                if existing_kind == Kind::Directory {
                    let entries = self.inodes.dir_entries(tx, existing)?;
                    if entries.len() > 2 {
                        return Err(Error::NotEmpty);
                    }
                    self.inodes.stat_set_prop(tx, existing, &StatUpdate { nlink: Some(0), ..Default::default() })?;
                } else {
                    let existing_record = self.record(tx, existing)?;
                    let remaining = existing_record.nlink.saturating_sub(1);
                    self.inodes.stat_set_prop(tx, existing, &StatUpdate { nlink: Some(remaining), ..Default::default() })?;
                }
                self.inodes.dir_unset_entry(tx, new_parent, new_name)?;
            }

            self.inodes.dir_unset_entry(tx, old_parent, old_name)?;
            self.inodes.dir_set_entry(tx, new_parent, new_name, moved, kind)?;

            if old_parent != new_parent {
                self.inodes.stat_set_prop(tx, old_parent, &StatUpdate { mtime: Some(now), ctime: Some(now), ..Default::default() })?;
                self.inodes.stat_set_prop(tx, new_parent, &StatUpdate { mtime: Some(now), ctime: Some(now), ..Default::default() })?;
            }
            Ok(())
        })
    }

    pub fn chmod(&self, cwd: Ino, path: &str, mode: u16, creds: Credentials, now: i64) -> Result<(), Error> {
        let ino = self.resolve(cwd, path, creds)?;
        self.store.transact(&[ino.get()], |tx| -> Result<(), Error> {
            let record = self.record(tx, ino)?;
            if !creds.is_root() && creds.uid != record.uid {
                return Err(Error::PermissionDenied);
            }
            self.inodes.stat_set_prop(tx, ino, &StatUpdate { mode: Some(mode), ctime: Some(now), ..Default::default() })?;
            Ok(())
        })
    }

    pub fn chown(&self, cwd: Ino, path: &str, uid: u32, gid: u32, creds: Credentials, now: i64) -> Result<(), Error> {
        let ino = self.resolve(cwd, path, creds)?;
        self.store.transact(&[ino.get()], |tx| -> Result<(), Error> {
            if !creds.is_root() {
                return Err(Error::PermissionDenied);
            }
            self.inodes.stat_set_prop(tx, ino, &StatUpdate { uid: Some(uid), gid: Some(gid), ctime: Some(now), ..Default::default() })?;
            Ok(())
        })
    }

    pub fn utimes(&self, cwd: Ino, path: &str, atime: i64, mtime: i64, creds: Credentials) -> Result<(), Error> {
        let ino = self.resolve(cwd, path, creds)?;
        self.store.transact(&[ino.get()], |tx| -> Result<(), Error> {
            let record = self.record(tx, ino)?;
            if !creds.is_root() && creds.uid != record.uid {
                return Err(Error::PermissionDenied);
            }
            self.inodes.stat_set_prop(tx, ino, &StatUpdate { atime: Some(atime), mtime: Some(mtime), ..Default::default() })?;
            Ok(())
        })
    }

    pub fn truncate(&self, cwd: Ino, path: &str, len: u64, creds: Credentials, now: i64) -> Result<(), Error> {
        let ino = self.resolve(cwd, path, creds)?;
        self.truncate_ino(ino, len, creds, now)
    }

    fn truncate_ino(&self, ino: Ino, len: u64, creds: Credentials, now: i64) -> Result<(), Error> {
        self.store.transact(&[ino.get()], |tx| -> Result<(), Error> {
            let record = self.record(tx, ino)?;
            if record.kind != Kind::File {
                return Err(Error::IsADirectory);
            }
            if !efs_path::check_permission(record.mode, record.uid, record.gid, creds, Access::WRITE) {
                return Err(Error::PermissionDenied);
            }
            let block_size = self.block_size as u64;
            let full_blocks = len / block_size;
            let remainder = (len % block_size) as usize;
            if remainder == 0 {
                self.inodes.file_delete_blocks_from(tx, ino, full_blocks)?;
            } else {
                self.inodes.file_delete_blocks_from(tx, ino, full_blocks + 1)?;
                let mut block = self.inodes.file_get_blocks(tx, ino, self.block_size, full_blocks * block_size, self.block_size)?;
                block.truncate(remainder);
                self.inodes.file_set_blocks(tx, ino, &[(full_blocks, block)])?;
            }
            self.inodes.stat_set_prop(tx, ino, &StatUpdate { size: Some(len), mtime: Some(now), ctime: Some(now), ..Default::default() })?;
            Ok(())
        })
    }

    pub fn ftruncate(&self, fd: RawFd, len: u64, creds: Credentials, now: i64) -> Result<(), Error> {
        let ino = self.fds.lock().unwrap().get(fd)?.ino;
        self.truncate_ino(ino, len, creds, now)
    }

    pub fn open(&self, cwd: Ino, path: &str, flags: OpenFlags, mode: u16, creds: Credentials, now: i64) -> Result<RawFd, Error> {
        let (parent_path, name) = Self::split(path)?;
        let parent = self.resolve(cwd, parent_path, creds)?;
        let parent_record = self.store.transact(&[parent.get()], |tx| self.record(tx, parent))?;
        if parent_record.kind != Kind::Directory {
            return Err(Error::NotADirectory);
        }

        // `resolve` follows a trailing symlink the same way it follows every
        // other path component, so opening a link opens what it points to.
        let resolved = match self.resolve(cwd, path, creds) {
            Ok(ino) => Some(ino),
            Err(Error::NotFound) => None,
            Err(err) => return Err(err),
        };

        let ino = match resolved {
            Some(existing) => {
                let kind = self.store.transact(&[existing.get()], |tx| Ok(self.record(tx, existing)?.kind))?;
                if flags.contains(OpenFlags::CREATE | OpenFlags::EXCL) {
                    return Err(Error::AlreadyExists);
                }
                if kind == Kind::Directory && flags.contains(OpenFlags::WRITE) {
                    return Err(Error::IsADirectory);
                }
                self.store.transact(&[existing.get()], |tx| -> Result<Ino, Error> {
                    let record = self.record(tx, existing)?;
                    let mut wanted = Access::empty();
                    if flags.contains(OpenFlags::READ) {
                        wanted |= Access::READ;
                    }
                    if flags.contains(OpenFlags::WRITE) {
                        wanted |= Access::WRITE;
                    }
                    if !efs_path::check_permission(record.mode, record.uid, record.gid, creds, wanted) {
                        return Err(Error::PermissionDenied);
                    }
                    if flags.contains(OpenFlags::TRUNC) && kind == Kind::File {
                        self.inodes.file_delete_blocks_from(tx, existing, 0)?;
                        self.inodes.stat_set_prop(tx, existing, &StatUpdate { size: Some(0), mtime: Some(now), ..Default::default() })?;
                    }
                    self.inodes.reference(tx, existing)?;
                    Ok(existing)
                })?
            }
            None => {
                if !flags.contains(OpenFlags::CREATE) {
                    return Err(Error::NotFound);
                }
                if !efs_path::check_permission(parent_record.mode, parent_record.uid, parent_record.gid, creds, Access::WRITE) {
                    return Err(Error::PermissionDenied);
                }
                self.store.transact(&[Ino::SUPERBLOCK.get(), parent.get()], |tx| -> Result<Ino, Error> {
                    if self.inodes.dir_get_entry(tx, parent, name)?.is_some() {
                        return Err(Error::AlreadyExists);
                    }
                    let ino = self.inodes.allocate_ino(tx)?;
                    self.inodes.file_create(tx, ino, mode & !self.umask, creds.uid, creds.gid, now)?;
                    self.inodes.dir_set_entry(tx, parent, name, ino, Kind::File)?;
                    self.inodes.reference(tx, ino)?;
                    Ok(ino)
                })?
            }
        };

        Ok(self.fds.lock().unwrap().insert(ino, flags))
    }

    pub fn close(&self, fd: RawFd) -> Result<(), Error> {
        let descriptor = self.fds.lock().unwrap().remove(fd)?;
        self.store.transact(&[descriptor.ino.get()], |tx| Ok(self.inodes.unref(tx, descriptor.ino)?))
    }

    pub fn dup(&self, fd: RawFd) -> Result<RawFd, Error> {
        let ino = self.fds.lock().unwrap().get(fd)?.ino;
        self.store.transact(&[ino.get()], |tx| Ok(self.inodes.reference(tx, ino)?))?;
        Ok(self.fds.lock().unwrap().dup(fd)?)
    }

    pub fn read(&self, fd: RawFd, len: usize) -> Result<Vec<u8>, Error> {
        let (ino, offset) = {
            let table = self.fds.lock().unwrap();
            let descriptor = table.get(fd)?;
            (descriptor.ino, descriptor.position)
        };

        let record = self.store.transact(&[ino.get()], |tx| self.record(tx, ino))?;
        let data = if record.kind == Kind::CharacterDev {
            self.devices.get(RawDev::decode(record.rdev))?.read(len)?
        } else {
            let available = record.size.saturating_sub(offset);
            let to_read = (available as usize).min(len);
            self.store.transact(&[ino.get()], |tx| Ok(self.inodes.file_get_blocks(tx, ino, self.block_size, offset, to_read)?))?
        };

        self.fds.lock().unwrap().get_mut(fd)?.position += data.len() as u64;
        Ok(data)
    }

    pub fn write(&self, fd: RawFd, data: &[u8], now: i64) -> Result<usize, Error> {
        let (ino, flags, mut offset) = {
            let table = self.fds.lock().unwrap();
            let descriptor = table.get(fd)?;
            (descriptor.ino, descriptor.flags, descriptor.position)
        };
        if !flags.contains(OpenFlags::WRITE) {
            return Err(Error::PermissionDenied);
        }

        let record = self.store.transact(&[ino.get()], |tx| self.record(tx, ino))?;
        if record.kind == Kind::CharacterDev {
            let written = self.devices.get(RawDev::decode(record.rdev))?.write(data)?;
            return Ok(written);
        }

        if flags.contains(OpenFlags::APPEND) {
            offset = record.size;
        }

        let new_size = offset + data.len() as u64;
        self.store.transact(&[ino.get()], |tx| -> Result<(), Error> {
            self.inodes.file_write_blocks(tx, ino, self.block_size, offset, data)?;
            if new_size > record.size {
                self.inodes.stat_set_prop(tx, ino, &StatUpdate { size: Some(new_size), mtime: Some(now), ctime: Some(now), ..Default::default() })?;
            } else {
                self.inodes.stat_set_prop(tx, ino, &StatUpdate { mtime: Some(now), ctime: Some(now), ..Default::default() })?;
            }
            Ok(())
        })?;

        let mut table = self.fds.lock().unwrap();
        let descriptor = table.get_mut(fd)?;
        descriptor.position = offset + data.len() as u64;
        Ok(data.len())
    }

    pub fn read_file(&self, cwd: Ino, path: &str, creds: Credentials) -> Result<Vec<u8>, Error> {
        let fd = self.open(cwd, path, OpenFlags::READ, 0, creds, 0)?;
        let record = self.stat_ino(self.fds.lock().unwrap().get(fd)?.ino)?;
        let data = self.read(fd, record.size as usize)?;
        self.close(fd)?;
        Ok(data)
    }

    pub fn write_file(&self, cwd: Ino, path: &str, data: &[u8], mode: u16, creds: Credentials, now: i64) -> Result<(), Error> {
        let fd = self.open(cwd, path, OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNC, mode, creds, now)?;
        self.write(fd, data, now)?;
        self.close(fd)?;
        Ok(())
    }
}

struct Resolver<'a, S: OrderedStore> {
    store: &'a EncryptedStore<S>,
    inodes: &'a InodeManager<S>,
}

impl<S: OrderedStore> NameResolver for Resolver<'_, S> {
    type Error = efs_inode::Error;

    fn lookup(&mut self, parent: Ino, name: &str) -> Result<Option<(Ino, Kind)>, Self::Error> {
        self.store.transact(&[parent.get()], |tx| self.inodes.dir_get_entry(tx, parent, name))
    }

    fn readlink(&mut self, ino: Ino) -> Result<String, Self::Error> {
        self.store.transact(&[ino.get()], |tx| self.inodes.readlink(tx, ino))
    }

    fn owner_mode(&mut self, ino: Ino) -> Result<(u16, u32, u32), Self::Error> {
        self.store.transact(&[ino.get()], |tx| {
            let record = self.inodes.get(tx, ino)?;
            Ok((record.mode, record.uid, record.gid))
        })
    }
}
