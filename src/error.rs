use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("partition {0} is not mounted")]
    NotMounted(String),
    #[error("partition {0} is already mounted")]
    AlreadyMounted(String),
    #[error("partition {0} already has an active session")]
    AlreadyLoggedIn(String),
    #[error("no active session")]
    NoActiveSession,
    #[error("invalid credentials for user {0}")]
    InvalidCredentials(String),
    #[error("no free {0} left")]
    ResourceExhausted(&'static str),
    #[error("no space: {0}")]
    NoSpace(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("{0} is not a directory")]
    NotDirectory(String),
    #[error("{0} is not a regular file")]
    NotFile(String),
    #[error("{what} at offset {offset} (+{len}) is outside the disk image ({disk_size} bytes)")]
    OutOfBounds {
        what: &'static str,
        offset: u64,
        len: usize,
        disk_size: u64,
    },
    #[error("corrupt {what} at offset {offset}: {reason}")]
    Corrupt {
        what: &'static str,
        offset: u64,
        reason: String,
    },
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        FsError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = core::result::Result<T, FsError>;
