use std::{num::NonZeroU32, path::PathBuf, sync::Arc};

use efs_worker::{CryptoWorker, InlineWorker};

/// How the master key is obtained when opening a filesystem.
pub enum KeySource {
    /// Use this 256-bit key directly.
    Key([u8; 32]),
    /// Derive a key from a password via PBKDF2-HMAC-SHA256.
    Password { password: Vec<u8>, salt: Vec<u8>, iterations: NonZeroU32 },
}

/// Everything needed to open or format an [`crate::EncryptedFs`].
///
/// There is no config *file* format — this is a programmatic builder, the
/// way the teacher's kernel parameter struct is a plain struct of named
/// knobs rather than a parsed document.
pub struct Config {
    pub db_path: PathBuf,
    pub key: KeySource,
    pub block_size: usize,
    pub umask: u16,
    pub worker: Arc<dyn CryptoWorker>,
}

/// Default block size for file data, in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;
/// Default umask applied by operations that don't specify one explicitly.
pub const DEFAULT_UMASK: u16 = 0o022;

impl Config {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>, key: KeySource) -> Self {
        Self { db_path: db_path.into(), key, block_size: DEFAULT_BLOCK_SIZE, umask: DEFAULT_UMASK, worker: Arc::new(InlineWorker) }
    }

    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    #[must_use]
    pub fn with_umask(mut self, umask: u16) -> Self {
        self.umask = umask;
        self
    }

    #[must_use]
    pub fn with_worker(mut self, worker: Arc<dyn CryptoWorker>) -> Self {
        self.worker = worker;
        self
    }
}
