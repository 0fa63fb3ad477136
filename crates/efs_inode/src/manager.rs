use efs_kv::{OrderedStore, Tx};

use crate::{
    error::Error,
    ino::Ino,
    keys,
    kind::Kind,
    record::{InodeRecord, StatUpdate},
};

const DOT: &str = ".";
const DOTDOT: &str = "..";

/// The first inode number handed out by `allocate_ino`. Ino 0 is reserved as
/// the superblock's own lock id; ino 1 is the well-known root directory.
const FIRST_INO: u64 = 1;

/// Owns the inode/directory/file-block data model laid over an
/// [`EncryptedStore`]. Every method takes the caller's open transaction —
/// this crate never opens one itself, so multi-step operations (like
/// `rename`, built from several of these calls) commit atomically together.
pub struct InodeManager<S: OrderedStore> {
    store: std::marker::PhantomData<S>,
}

impl<S: OrderedStore> Default for InodeManager<S> {
    fn default() -> Self {
        Self { store: std::marker::PhantomData }
    }
}

impl<S: OrderedStore> InodeManager<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumps and returns the filesystem-wide inode counter. The caller's
    /// transaction must include [`Ino::SUPERBLOCK`] in its lock set.
    pub fn allocate_ino(&self, tx: &mut Tx<'_, S>) -> Result<Ino, Error> {
        tx.ensure_locked(Ino::SUPERBLOCK.get())?;
        let next = match tx.get(keys::NEXT_INO)? {
            Some(raw) => decode_u64(&raw)?,
            None => FIRST_INO,
        };
        tx.put(keys::NEXT_INO.to_vec(), (next + 1).to_be_bytes().to_vec());
        tx.adopt_fresh_lock(next);
        Ok(Ino(next))
    }

    /// Marks `ino` as no longer reachable by name. The record and any
    /// blocks it owns are reclaimed lazily, the next time something
    /// `get`s this inode while its refcount is zero.
    pub fn deallocate_ino(&self, tx: &mut Tx<'_, S>, ino: Ino) -> Result<(), Error> {
        tx.ensure_locked(ino.get())?;
        tx.put(keys::gc(ino), Vec::new());
        Ok(())
    }

    pub fn file_create(&self, tx: &mut Tx<'_, S>, ino: Ino, mode: u16, uid: u32, gid: u32, now: i64) -> Result<(), Error> {
        self.create(tx, ino, Kind::File, mode, uid, gid, now, 1, Ino(0))
    }

    pub fn dir_create(&self, tx: &mut Tx<'_, S>, ino: Ino, parent: Ino, mode: u16, uid: u32, gid: u32, now: i64) -> Result<(), Error> {
        self.create(tx, ino, Kind::Directory, mode, uid, gid, now, 2, parent)
    }

    pub fn symlink_create(&self, tx: &mut Tx<'_, S>, ino: Ino, mode: u16, uid: u32, gid: u32, now: i64, target: &str) -> Result<(), Error> {
        tx.ensure_locked(ino.get())?;
        self.create(tx, ino, Kind::Symlink, mode, uid, gid, now, 1, Ino(0))?;
        let mut record = self.get(tx, ino)?;
        record.size = target.len() as u64;
        tx.put(keys::inode(ino), record.encode());
        tx.put(keys::symlink(ino), target.as_bytes().to_vec());
        Ok(())
    }

    pub fn readlink(&self, tx: &mut Tx<'_, S>, ino: Ino) -> Result<String, Error> {
        tx.ensure_locked(ino.get())?;
        let raw = tx.get(&keys::symlink(ino))?.ok_or(Error::NotFound)?;
        String::from_utf8(raw).map_err(|_| Error::Corruption)
    }

    #[allow(clippy::too_many_arguments)]
    fn create(&self, tx: &mut Tx<'_, S>, ino: Ino, kind: Kind, mode: u16, uid: u32, gid: u32, now: i64, nlink: u32, parent: Ino) -> Result<(), Error> {
        tx.ensure_locked(ino.get())?;
        let record = InodeRecord {
            kind,
            nlink,
            refcount: 0,
            mode,
            uid,
            gid,
            size: 0,
            atime: now,
            mtime: now,
            ctime: now,
            rdev: 0,
            parent,
        };
        tx.put(keys::inode(ino), record.encode());
        Ok(())
    }

    /// Sets a directory entry. `"."`/`".."` are synthetic and rejected here.
    pub fn dir_set_entry(&self, tx: &mut Tx<'_, S>, parent: Ino, name: &str, child: Ino, kind: Kind) -> Result<(), Error> {
        reject_reserved_name(name)?;
        tx.ensure_locked(parent.get())?;
        let mut value = child.get().to_be_bytes().to_vec();
        value.push(kind.tag());
        tx.put(keys::dirent(parent, name), value);
        Ok(())
    }

    pub fn dir_unset_entry(&self, tx: &mut Tx<'_, S>, parent: Ino, name: &str) -> Result<(), Error> {
        reject_reserved_name(name)?;
        tx.ensure_locked(parent.get())?;
        tx.del(keys::dirent(parent, name));
        Ok(())
    }

    pub fn dir_get_entry(&self, tx: &mut Tx<'_, S>, parent: Ino, name: &str) -> Result<Option<(Ino, Kind)>, Error> {
        tx.ensure_locked(parent.get())?;
        if name == DOT {
            return Ok(Some((parent, Kind::Directory)));
        }
        if name == DOTDOT {
            let record = self.get(tx, parent)?;
            return Ok(Some((record.parent, Kind::Directory)));
        }
        let Some(raw) = tx.get(&keys::dirent(parent, name))? else {
            return Ok(None);
        };
        Ok(Some(decode_dirent(&raw)?))
    }

    /// All entries in `parent`, including the synthetic `"."`/`".."`.
    pub fn dir_entries(&self, tx: &mut Tx<'_, S>, parent: Ino) -> Result<Vec<(String, Ino, Kind)>, Error> {
        tx.ensure_locked(parent.get())?;
        let record = self.get(tx, parent)?;
        let mut entries = vec![(DOT.to_owned(), parent, Kind::Directory), (DOTDOT.to_owned(), record.parent, Kind::Directory)];
        for (key, value) in tx.range(&keys::dirent_prefix(parent), &keys::dirent_prefix_end(parent))? {
            let name = keys::dirent_name(&key, parent).ok_or(Error::Corruption)?;
            let (ino, kind) = decode_dirent(&value)?;
            entries.push((name, ino, kind));
        }
        Ok(entries)
    }

    /// Overwrites exactly the given `(index, bytes)` pairs; used for
    /// truncation and other cases that don't need read-modify-write.
    pub fn file_set_blocks(&self, tx: &mut Tx<'_, S>, ino: Ino, blocks: &[(u64, Vec<u8>)]) -> Result<(), Error> {
        tx.ensure_locked(ino.get())?;
        for (idx, bytes) in blocks {
            tx.put(keys::block(ino, *idx), bytes.clone());
        }
        Ok(())
    }

    pub fn file_delete_blocks_from(&self, tx: &mut Tx<'_, S>, ino: Ino, from_idx: u64) -> Result<(), Error> {
        tx.ensure_locked(ino.get())?;
        let start = keys::block(ino, from_idx);
        let end = keys::block_prefix_end(ino);
        for (key, _) in tx.range(&start, &end)? {
            tx.del(key);
        }
        Ok(())
    }

    /// Writes `data` at byte `offset`, splitting it into `block_size`-sized
    /// chunks and merging partial first/last blocks with whatever is
    /// already stored. Writing past the current end of file zero-fills the
    /// gap bytes within a touched block rather than leaving them absent, so
    /// later reads see zeros instead of a `NotFound`-shaped hole — but a
    /// block is only ever stored as long as it has meaningful content;
    /// trailing bytes this write doesn't reach and nothing previously
    /// reached either are left off rather than padded on disk.
    pub fn file_write_blocks(&self, tx: &mut Tx<'_, S>, ino: Ino, block_size: usize, offset: u64, data: &[u8]) -> Result<(), Error> {
        tx.ensure_locked(ino.get())?;
        if data.is_empty() {
            return Ok(());
        }
        let block_size_u64 = block_size as u64;
        let mut written = 0usize;
        let mut position = offset;
        while written < data.len() {
            let idx = position / block_size_u64;
            let within = (position % block_size_u64) as usize;
            let take = (block_size - within).min(data.len() - written);

            let existing_len = tx.get(&keys::block(ino, idx))?.map_or(0, |bytes| bytes.len());
            let mut block = self.read_block(tx, ino, idx, block_size)?;
            block[within..within + take].copy_from_slice(&data[written..written + take]);
            block.truncate(existing_len.max(within + take));
            tx.put(keys::block(ino, idx), block);

            written += take;
            position += take as u64;
        }
        Ok(())
    }

    fn read_block(&self, tx: &mut Tx<'_, S>, ino: Ino, idx: u64, block_size: usize) -> Result<Vec<u8>, Error> {
        match tx.get(&keys::block(ino, idx))? {
            Some(mut bytes) => {
                bytes.resize(block_size, 0);
                Ok(bytes)
            }
            None => Ok(vec![0u8; block_size]),
        }
    }

    /// Reads `len` bytes starting at `offset`. Blocks never written read
    /// back as zero.
    pub fn file_get_blocks(&self, tx: &mut Tx<'_, S>, ino: Ino, block_size: usize, offset: u64, len: usize) -> Result<Vec<u8>, Error> {
        tx.ensure_locked(ino.get())?;
        if len == 0 {
            return Ok(Vec::new());
        }
        let block_size_u64 = block_size as u64;
        let mut out = Vec::with_capacity(len);
        let mut position = offset;
        while out.len() < len {
            let idx = position / block_size_u64;
            let within = (position % block_size_u64) as usize;
            let take = (block_size - within).min(len - out.len());
            let block = self.read_block(tx, ino, idx, block_size)?;
            out.extend_from_slice(&block[within..within + take]);
            position += take as u64;
        }
        Ok(out)
    }

    /// The highest-indexed block a file has, if it has any at all.
    pub fn file_get_last_block(&self, tx: &mut Tx<'_, S>, ino: Ino) -> Result<Option<(u64, Vec<u8>)>, Error> {
        tx.ensure_locked(ino.get())?;
        let all = tx.range(&keys::block_prefix(ino), &keys::block_prefix_end(ino))?;
        let Some((key, value)) = all.into_iter().last() else {
            return Ok(None);
        };
        let idx = keys::block_index(&key, ino).ok_or(Error::Corruption)?;
        Ok(Some((idx, value)))
    }

    pub fn stat_get(&self, tx: &mut Tx<'_, S>, ino: Ino) -> Result<InodeRecord, Error> {
        self.get(tx, ino)
    }

    pub fn stat_set_prop(&self, tx: &mut Tx<'_, S>, ino: Ino, update: &StatUpdate) -> Result<(), Error> {
        let mut record = self.get(tx, ino)?;
        update.apply_to(&mut record);
        tx.put(keys::inode(ino), record.encode());
        Ok(())
    }

    pub fn reference(&self, tx: &mut Tx<'_, S>, ino: Ino) -> Result<(), Error> {
        let mut record = self.get(tx, ino)?;
        record.refcount += 1;
        tx.put(keys::inode(ino), record.encode());
        Ok(())
    }

    /// Drops one open-handle reference. Reaching zero together with `nlink`
    /// collects the inode — its record and blocks — right away, in the same
    /// transaction that already holds its lock.
    pub fn unref(&self, tx: &mut Tx<'_, S>, ino: Ino) -> Result<(), Error> {
        tx.ensure_locked(ino.get())?;
        let Some(raw) = tx.get(&keys::inode(ino))? else {
            return Ok(());
        };
        let mut record = InodeRecord::decode(&raw)?;
        record.refcount = record.refcount.saturating_sub(1);
        if record.refcount == 0 && record.nlink == 0 {
            self.purge(tx, ino, &record)?;
            return Ok(());
        }
        tx.put(keys::inode(ino), record.encode());
        Ok(())
    }

    /// Fetches the record for `ino`, sweeping it first if both its link
    /// count and open-handle count have reached zero.
    pub fn get(&self, tx: &mut Tx<'_, S>, ino: Ino) -> Result<InodeRecord, Error> {
        tx.ensure_locked(ino.get())?;
        let Some(raw) = tx.get(&keys::inode(ino))? else {
            return Err(Error::NotFound);
        };
        let record = InodeRecord::decode(&raw)?;
        if record.nlink == 0 && record.refcount == 0 {
            self.purge(tx, ino, &record)?;
            return Err(Error::NotFound);
        }
        Ok(record)
    }

    fn purge(&self, tx: &mut Tx<'_, S>, ino: Ino, record: &InodeRecord) -> Result<(), Error> {
        log::debug!("collecting inode {ino}");
        tx.del(keys::inode(ino));
        tx.del(keys::gc(ino));
        match record.kind {
            Kind::Symlink => tx.del(keys::symlink(ino)),
            Kind::Directory => {
                for (key, _) in tx.range(&keys::dirent_prefix(ino), &keys::dirent_prefix_end(ino))? {
                    tx.del(key);
                }
            }
            Kind::File => {
                for (key, _) in tx.range(&keys::block_prefix(ino), &keys::block_prefix_end(ino))? {
                    tx.del(key);
                }
            }
            Kind::CharacterDev => {}
        }
        Ok(())
    }
}

fn reject_reserved_name(name: &str) -> Result<(), Error> {
    if name == DOT || name == DOTDOT {
        Err(Error::ReservedName)
    } else {
        Ok(())
    }
}

fn decode_dirent(raw: &[u8]) -> Result<(Ino, Kind), Error> {
    if raw.len() != 9 {
        return Err(Error::Corruption);
    }
    let ino = Ino(decode_u64(&raw[..8])?);
    let kind = Kind::from_tag(raw[8])?;
    Ok((ino, kind))
}

fn decode_u64(raw: &[u8]) -> Result<u64, Error> {
    let bytes: [u8; 8] = raw.try_into().map_err(|_| Error::Corruption)?;
    Ok(u64::from_be_bytes(bytes))
}
