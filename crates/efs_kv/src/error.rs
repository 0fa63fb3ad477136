use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("stored value at key failed to authenticate")]
    Corruption { key: Vec<u8> },

    #[error("crypto worker pool is unavailable")]
    WorkerUnavailable,

    #[error("transaction touched a key outside its declared lock set")]
    TransactionConflict,
}
