//! Encrypted virtual filesystem facade.
//!
//! Wires the lower layers — [`efs_kv`]'s encrypted transactional store,
//! [`efs_inode`]'s data model, [`efs_fd`]'s descriptor table, and
//! [`efs_path`]'s name resolution — into one POSIX-shaped API: [`EncryptedFs`].

mod config;
mod device;
mod error;
mod fs;
mod stat;

pub use config::{Config, KeySource, DEFAULT_BLOCK_SIZE, DEFAULT_UMASK};
pub use device::{CharDevice, DeviceTable, NullDevice, RawDev, ZeroDevice};
pub use error::Error;
pub use fs::EncryptedFs;
pub use stat::Stat;

pub use efs_fd::{OpenFlags, RawFd};
pub use efs_inode::{Ino, Kind};
pub use efs_kv::SledStore;
pub use efs_path::Credentials;

use efs_crypto::MasterKey;
use efs_kv::EncryptedStore;

fn derive_key(source: &KeySource) -> Result<MasterKey, Error> {
    match source {
        KeySource::Key(bytes) => Ok(MasterKey::from_bytes(*bytes)),
        KeySource::Password { password, salt, iterations } => Ok(efs_crypto::derive_key(password, salt, *iterations)?),
    }
}

fn open_store(config: Config) -> Result<EncryptedFs<SledStore>, Error> {
    let key = derive_key(&config.key)?;
    let inner = SledStore::open(&config.db_path)?;
    let store = EncryptedStore::with_worker(inner, key, config.worker);
    Ok(EncryptedFs::from_parts(store, config.block_size, config.umask))
}

/// Opens an already-formatted filesystem backed by a `sled` database at
/// `config.db_path`.
pub fn open(config: Config) -> Result<EncryptedFs<SledStore>, Error> {
    open_store(config)
}

/// Formats a fresh (empty) `sled` database at `config.db_path` and opens it,
/// creating the root directory owned by `uid`/`gid`.
pub fn mkfs(config: Config, uid: u32, gid: u32, now: i64) -> Result<EncryptedFs<SledStore>, Error> {
    let fs = open_store(config)?;
    fs.mkfs(uid, gid, now)?;
    Ok(fs)
}
