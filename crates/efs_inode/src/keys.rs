//! Byte-key layout of the filesystem's data model over the ordered store.
//!
//! One tag byte per sublevel, matching the bit-exact on-disk layout: `0x01`
//! inode records, `0x02` directory entries, `0x03` file blocks, `0x04`
//! symlink targets, `0x05` the pending-GC queue, `0x06` filesystem-wide
//! metadata (just the next-ino counter today). Numeric components are
//! fixed-width big-endian, which is already lexicographically
//! order-preserving, so no variable-length integer packing is needed to
//! keep scans in numeric order.

use crate::ino::Ino;

const TAG_INODE: u8 = 0x01;
const TAG_DIRENT: u8 = 0x02;
const TAG_BLOCK: u8 = 0x03;
const TAG_SYMLINK: u8 = 0x04;
const TAG_GC: u8 = 0x05;

/// Tag `0x06` (metadata) followed by the counter's own name.
pub const NEXT_INO: &[u8] = b"\x06/next_ino";

pub fn inode(ino: Ino) -> Vec<u8> {
    prefixed(TAG_INODE, ino)
}

pub fn gc(ino: Ino) -> Vec<u8> {
    prefixed(TAG_GC, ino)
}

pub fn symlink(ino: Ino) -> Vec<u8> {
    prefixed(TAG_SYMLINK, ino)
}

pub fn dirent(parent: Ino, name: &str) -> Vec<u8> {
    let mut key = dirent_prefix(parent);
    key.extend_from_slice(name.as_bytes());
    key
}

pub fn dirent_prefix(parent: Ino) -> Vec<u8> {
    let mut key = prefixed(TAG_DIRENT, parent);
    key.push(b'/');
    key
}

pub fn dirent_prefix_end(parent: Ino) -> Vec<u8> {
    dirent_prefix(parent.next())
}

pub fn block(ino: Ino, idx: u64) -> Vec<u8> {
    let mut key = block_prefix(ino);
    key.extend_from_slice(&idx.to_be_bytes());
    key
}

pub fn block_prefix(ino: Ino) -> Vec<u8> {
    prefixed(TAG_BLOCK, ino)
}

pub fn block_prefix_end(ino: Ino) -> Vec<u8> {
    block_prefix(ino.next())
}

/// Extracts the name suffix from a key produced by [`dirent`].
pub fn dirent_name(key: &[u8], parent: Ino) -> Option<String> {
    let prefix = dirent_prefix(parent);
    key.strip_prefix(prefix.as_slice()).and_then(|rest| std::str::from_utf8(rest).ok()).map(str::to_owned)
}

/// Extracts the block index from a key produced by [`block`].
pub fn block_index(key: &[u8], ino: Ino) -> Option<u64> {
    let prefix = block_prefix(ino);
    let rest = key.strip_prefix(prefix.as_slice())?;
    let bytes: [u8; 8] = rest.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

fn prefixed(tag: u8, ino: Ino) -> Vec<u8> {
    let mut key = Vec::with_capacity(10);
    key.push(tag);
    key.push(b'/');
    key.extend_from_slice(&ino.get().to_be_bytes());
    key
}
