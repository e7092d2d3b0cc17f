use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CgroupError>;

/// Error taxonomy for the cgroup lifecycle engine.
///
/// Leaf operations wrap the native errno with the syscall name and
/// target path; middle layers propagate unchanged except where a
/// specific errno is recovered locally (see `destroy` and `delegate`).
#[derive(thiserror::Error, Debug)]
pub enum CgroupError {
    #[error("{syscall} `{}`: {source}", path.display())]
    SystemCall {
        syscall: &'static str,
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("{0}")]
    InvalidEnvironment(String),

    #[error("{0}")]
    Contract(String),
}

impl CgroupError {
    pub fn syscall(syscall: &'static str, path: impl Into<PathBuf>, source: nix::Error) -> Self {
        CgroupError::SystemCall {
            syscall,
            path: path.into(),
            source,
        }
    }

    /// Wraps a `std::io::Error` (used for the handful of operations that
    /// go through `std::fs` rather than a raw syscall wrapper) as a
    /// `SystemCall` error, preserving the originating errno.
    pub fn io(syscall: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let errno = source
            .raw_os_error()
            .map(nix::errno::Errno::from_i32)
            .unwrap_or(nix::errno::Errno::UnknownErrno);
        CgroupError::SystemCall {
            syscall,
            path: path.into(),
            source: nix::Error::Sys(errno),
        }
    }

    /// The errno carried by a `SystemCall` variant, if any.
    pub fn errno(&self) -> Option<nix::errno::Errno> {
        match self {
            CgroupError::SystemCall { source, .. } => match source {
                nix::Error::Sys(errno) => Some(*errno),
                _ => None,
            },
            _ => None,
        }
    }
}
