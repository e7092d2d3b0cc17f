//! Controller alias symlinks expected by userspace when two v1
//! controllers are co-mounted under a combined directory name.

use std::os::unix::io::RawFd;

use nix::errno::Errno;
use nix::unistd;

use crate::error::{CgroupError, Result};

struct SymlinkEntry {
    alias: &'static str,
    target: &'static str,
}

const SYMLINK_TABLE: &[SymlinkEntry] = &[
    SymlinkEntry {
        alias: "cpu",
        target: "cpu,cpuacct",
    },
    SymlinkEntry {
        alias: "cpuacct",
        target: "cpu,cpuacct",
    },
    SymlinkEntry {
        alias: "net_cls",
        target: "net_cls,net_prio",
    },
    SymlinkEntry {
        alias: "net_prio",
        target: "net_cls,net_prio",
    },
];

/// Creates every alias symlink in the static table, relative to
/// `dirfd`. Idempotent and best-effort: both a pre-existing symlink
/// (`EEXIST`) and a combined directory that doesn't exist on this host
/// (`ENOENT`) are tolerated; any other error aborts with the errno.
pub fn create_symlinks(dirfd: RawFd) -> Result<()> {
    for entry in SYMLINK_TABLE {
        match unistd::symlinkat(entry.target, Some(dirfd), entry.alias) {
            Ok(()) => {}
            Err(nix::Error::Sys(Errno::EEXIST)) | Err(nix::Error::Sys(Errno::ENOENT)) => {}
            Err(e) => return Err(CgroupError::syscall("symlinkat", entry.alias, e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::fcntl::OFlag;
    use nix::sys::stat::Mode;
    use std::os::unix::io::AsRawFd;

    fn open_dirfd(path: &std::path::Path) -> nix::dir::Dir {
        nix::dir::Dir::open(path, OFlag::O_DIRECTORY | OFlag::O_CLOEXEC, Mode::empty()).unwrap()
    }

    #[test]
    fn create_symlinks_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cpu,cpuacct")).unwrap();
        std::fs::create_dir(dir.path().join("net_cls,net_prio")).unwrap();

        let handle = open_dirfd(dir.path());
        create_symlinks(handle.as_raw_fd()).unwrap();
        create_symlinks(handle.as_raw_fd()).unwrap();

        assert!(dir.path().join("cpu").is_symlink());
        assert!(dir.path().join("cpuacct").is_symlink());
    }

    #[test]
    fn create_symlinks_tolerates_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        // Neither combined directory exists: every symlinkat fails ENOENT.
        let handle = open_dirfd(dir.path());
        create_symlinks(handle.as_raw_fd()).unwrap();
    }
}
