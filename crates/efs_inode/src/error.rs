#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no such inode")]
    NotFound,

    #[error("stored inode record is malformed")]
    Corruption,

    #[error("\".\" and \"..\" are synthetic and cannot be set or removed directly")]
    ReservedName,

    #[error(transparent)]
    Store(#[from] efs_kv::Error),
}
