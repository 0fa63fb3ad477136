use efs_inode::{Ino, InodeRecord, Kind};

/// What `stat`/`lstat` report about an inode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub ino: Ino,
    pub kind: Kind,
    pub nlink: u32,
    pub mode: u16,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub rdev: u64,
}

impl Stat {
    #[must_use]
    pub fn from_record(ino: Ino, record: &InodeRecord) -> Self {
        Self {
            ino,
            kind: record.kind,
            nlink: record.nlink,
            mode: record.mode,
            uid: record.uid,
            gid: record.gid,
            size: record.size,
            atime: record.atime,
            mtime: record.mtime,
            ctime: record.ctime,
            rdev: record.rdev,
        }
    }
}
