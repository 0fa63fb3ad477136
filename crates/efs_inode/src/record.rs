use crate::{error::Error, ino::Ino, kind::Kind};

/// Everything the filesystem knows about one inode.
///
/// `nlink` counts directory entries pointing at this inode (what `stat`
/// reports); `refcount` separately counts open file descriptors. Garbage
/// collection only reclaims an inode once both have reached zero, so an
/// unlinked-but-open file stays on disk until its last open handle closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeRecord {
    pub kind: Kind,
    pub nlink: u32,
    pub refcount: u32,
    pub mode: u16,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub rdev: u64,
    /// Parent directory, meaningful only for `Kind::Directory`; backs the
    /// synthetic `..` entry so it never needs its own stored key.
    pub parent: Ino,
}

const ENCODED_LEN: usize = 1 + 4 + 4 + 2 + 4 + 4 + 8 + 8 + 8 + 8 + 8 + 8;

impl InodeRecord {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENCODED_LEN);
        out.push(self.kind.tag());
        out.extend_from_slice(&self.nlink.to_be_bytes());
        out.extend_from_slice(&self.refcount.to_be_bytes());
        out.extend_from_slice(&self.mode.to_be_bytes());
        out.extend_from_slice(&self.uid.to_be_bytes());
        out.extend_from_slice(&self.gid.to_be_bytes());
        out.extend_from_slice(&self.size.to_be_bytes());
        out.extend_from_slice(&self.atime.to_be_bytes());
        out.extend_from_slice(&self.mtime.to_be_bytes());
        out.extend_from_slice(&self.ctime.to_be_bytes());
        out.extend_from_slice(&self.rdev.to_be_bytes());
        out.extend_from_slice(&self.parent.get().to_be_bytes());
        out
    }

    pub fn decode(raw: &[u8]) -> Result<Self, Error> {
        if raw.len() != ENCODED_LEN {
            return Err(Error::Corruption);
        }
        let mut cursor = raw;
        let kind = Kind::from_tag(take_u8(&mut cursor))?;
        Ok(Self {
            kind,
            nlink: take_u32(&mut cursor),
            refcount: take_u32(&mut cursor),
            mode: take_u16(&mut cursor),
            uid: take_u32(&mut cursor),
            gid: take_u32(&mut cursor),
            size: take_u64(&mut cursor),
            atime: take_u64(&mut cursor) as i64,
            mtime: take_u64(&mut cursor) as i64,
            ctime: take_u64(&mut cursor) as i64,
            rdev: take_u64(&mut cursor),
            parent: Ino(take_u64(&mut cursor)),
        })
    }
}

fn take_u8(cursor: &mut &[u8]) -> u8 {
    let (head, tail) = cursor.split_at(1);
    *cursor = tail;
    head[0]
}

fn take_u16(cursor: &mut &[u8]) -> u16 {
    let (head, tail) = cursor.split_at(2);
    *cursor = tail;
    u16::from_be_bytes(head.try_into().unwrap())
}

fn take_u32(cursor: &mut &[u8]) -> u32 {
    let (head, tail) = cursor.split_at(4);
    *cursor = tail;
    u32::from_be_bytes(head.try_into().unwrap())
}

fn take_u64(cursor: &mut &[u8]) -> u64 {
    let (head, tail) = cursor.split_at(8);
    *cursor = tail;
    u64::from_be_bytes(head.try_into().unwrap())
}

/// A sparse update applied to an existing [`InodeRecord`] by
/// `InodeManager::stat_set_prop`. Fields left `None` are left untouched.
#[derive(Debug, Clone, Default)]
pub struct StatUpdate {
    pub mode: Option<u16>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: Option<i64>,
    pub mtime: Option<i64>,
    pub ctime: Option<i64>,
    pub nlink: Option<u32>,
}

impl StatUpdate {
    pub fn apply_to(&self, record: &mut InodeRecord) {
        if let Some(mode) = self.mode {
            record.mode = mode;
        }
        if let Some(uid) = self.uid {
            record.uid = uid;
        }
        if let Some(gid) = self.gid {
            record.gid = gid;
        }
        if let Some(size) = self.size {
            record.size = size;
        }
        if let Some(atime) = self.atime {
            record.atime = atime;
        }
        if let Some(mtime) = self.mtime {
            record.mtime = mtime;
        }
        if let Some(ctime) = self.ctime {
            record.ctime = ctime;
        }
        if let Some(nlink) = self.nlink {
            record.nlink = nlink;
        }
    }
}
