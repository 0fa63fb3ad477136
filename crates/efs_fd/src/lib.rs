//! File-descriptor table (spec §4.D).
//!
//! One [`FdTable`] per open [`efs::EncryptedFs`]. Slots are recycled with
//! smallest-unused-index allocation, matching POSIX `open`/`dup` behavior —
//! grounded on the teacher's fixed-slot inode table recycling, adapted here
//! from a static array to a growable `Vec` since a userspace library has no
//! `NINODE`-style compile-time budget.

use std::collections::BTreeSet;

use bitflags::bitflags;
use efs_inode::Ino;

#[derive(Debug, thiserror::Error)]
#[error("bad file descriptor")]
pub struct BadFileDescriptor;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const READ      = 0b0000_0001;
        const WRITE     = 0b0000_0010;
        const CREATE    = 0b0000_0100;
        const TRUNC     = 0b0000_1000;
        const APPEND    = 0b0001_0000;
        const EXCL      = 0b0010_0000;
        const DIRECTORY = 0b0100_0000;
    }
}

/// A transparent newtype over the small integer userland calls a file
/// descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawFd(pub u32);

#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub ino: Ino,
    pub flags: OpenFlags,
    pub position: u64,
}

/// Smallest-unused-index fd allocator with per-fd position and flags.
#[derive(Default)]
pub struct FdTable {
    slots: Vec<Option<FileDescriptor>>,
    free: BTreeSet<u32>,
}

impl FdTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the smallest unused fd and installs `descriptor` in it.
    pub fn insert(&mut self, ino: Ino, flags: OpenFlags) -> RawFd {
        let descriptor = FileDescriptor { ino, flags, position: 0 };
        if let Some(&index) = self.free.iter().next() {
            self.free.remove(&index);
            self.slots[index as usize] = Some(descriptor);
            RawFd(index)
        } else {
            self.slots.push(Some(descriptor));
            RawFd((self.slots.len() - 1) as u32)
        }
    }

    pub fn get(&self, fd: RawFd) -> Result<&FileDescriptor, BadFileDescriptor> {
        self.slots.get(fd.0 as usize).and_then(Option::as_ref).ok_or(BadFileDescriptor)
    }

    pub fn get_mut(&mut self, fd: RawFd) -> Result<&mut FileDescriptor, BadFileDescriptor> {
        self.slots.get_mut(fd.0 as usize).and_then(Option::as_mut).ok_or(BadFileDescriptor)
    }

    /// Frees `fd`, returning what it held. Using `fd` again before a new
    /// `insert` reuses the slot is [`BadFileDescriptor`].
    pub fn remove(&mut self, fd: RawFd) -> Result<FileDescriptor, BadFileDescriptor> {
        let slot = self.slots.get_mut(fd.0 as usize).ok_or(BadFileDescriptor)?;
        let descriptor = slot.take().ok_or(BadFileDescriptor)?;
        self.free.insert(fd.0);
        Ok(descriptor)
    }

    /// Allocates a new smallest-unused fd that shares position and flags
    /// with `fd` at the moment of the call (POSIX `dup` semantics — later
    /// seeks on one do not affect the other).
    pub fn dup(&mut self, fd: RawFd) -> Result<RawFd, BadFileDescriptor> {
        let descriptor = self.get(fd)?.clone();
        Ok(self.insert_descriptor(descriptor))
    }

    fn insert_descriptor(&mut self, descriptor: FileDescriptor) -> RawFd {
        if let Some(&index) = self.free.iter().next() {
            self.free.remove(&index);
            self.slots[index as usize] = Some(descriptor);
            RawFd(index)
        } else {
            self.slots.push(Some(descriptor));
            RawFd((self.slots.len() - 1) as u32)
        }
    }
}
