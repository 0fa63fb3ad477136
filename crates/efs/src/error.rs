/// The flat error taxonomy every operation reports through (spec §7).
///
/// Every error from the layers underneath — storage, inode management,
/// path resolution, file descriptors — funnels into one of these variants
/// at the facade boundary, the same shape as the teacher's
/// `KernelError` -> `SyscallError` conversion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no such file or directory")]
    NotFound,
    #[error("file already exists")]
    AlreadyExists,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("directory not empty")]
    NotEmpty,
    #[error("permission denied")]
    PermissionDenied,
    #[error("bad file descriptor")]
    BadFileDescriptor,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("too many levels of symbolic links")]
    SymlinkLoop,
    #[error("path component too long")]
    NameTooLong,
    #[error("no space left on device")]
    NoSpace,
    #[error("filesystem is read-only")]
    ReadOnly,
    #[error("stored data failed to authenticate")]
    Corruption,
    #[error("crypto worker pool is unavailable")]
    WorkerUnavailable,
    #[error("transaction touched an inode outside its declared lock set")]
    TransactionConflict,
}

impl From<efs_kv::Error> for Error {
    fn from(err: efs_kv::Error) -> Self {
        match err {
            efs_kv::Error::Io(io_err) => {
                log::warn!("storage I/O error: {io_err}");
                Self::Corruption
            }
            efs_kv::Error::Corruption { key } => {
                log::warn!("value at key {key:?} failed to authenticate");
                Self::Corruption
            }
            efs_kv::Error::WorkerUnavailable => Self::WorkerUnavailable,
            efs_kv::Error::TransactionConflict => Self::TransactionConflict,
        }
    }
}

impl From<efs_inode::Error> for Error {
    fn from(err: efs_inode::Error) -> Self {
        match err {
            efs_inode::Error::NotFound => Self::NotFound,
            efs_inode::Error::Corruption => Self::Corruption,
            efs_inode::Error::ReservedName => Self::InvalidArgument,
            efs_inode::Error::Store(kv) => kv.into(),
        }
    }
}

impl From<efs_fd::BadFileDescriptor> for Error {
    fn from(_: efs_fd::BadFileDescriptor) -> Self {
        Self::BadFileDescriptor
    }
}

impl From<efs_crypto::Error> for Error {
    fn from(err: efs_crypto::Error) -> Self {
        match err {
            efs_crypto::Error::IterationsTooLow(_) => Self::InvalidArgument,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        log::warn!("storage I/O error: {err}");
        Self::Corruption
    }
}

impl From<efs_path::Error<efs_inode::Error>> for Error {
    fn from(err: efs_path::Error<efs_inode::Error>) -> Self {
        match err {
            efs_path::Error::NotFound => Self::NotFound,
            efs_path::Error::NotADirectory => Self::NotADirectory,
            efs_path::Error::SymlinkLoop => Self::SymlinkLoop,
            efs_path::Error::PermissionDenied => Self::PermissionDenied,
            efs_path::Error::NameTooLong => Self::NameTooLong,
            efs_path::Error::Resolver(inner) => inner.into(),
        }
    }
}
