//! Applying the container owner's uid/gid to delegated cgroup attributes.

use std::ffi::CString;
use std::fs;
use std::os::unix::io::RawFd;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::{Gid, Uid};

use crate::common::{controller_path, CGROUP_DELEGATE_FILE};
use crate::error::{CgroupError, Result};

/// Chowns the cgroup directory at `root`/`path`, plus every file listed
/// in `/sys/kernel/cgroup/delegate`, to `uid`/`gid`.
///
/// A missing delegate file means the kernel does not support
/// delegation on this system, which is success, not an error.
/// Individual files named in the delegate list that don't exist in this
/// particular cgroup are skipped.
pub fn chown_delegated(root: &str, path: &str, uid: Uid, gid: Gid) -> Result<()> {
    let cgroup_path = controller_path(root, "", path);

    let delegate = match fs::read_to_string(CGROUP_DELEGATE_FILE) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(CgroupError::io("read", CGROUP_DELEGATE_FILE, e)),
    };

    let dfd = nix::fcntl::open(&cgroup_path, OFlag::O_PATH, Mode::empty())
        .map_err(|e| CgroupError::syscall("open", cgroup_path.clone(), e))?;

    let result = chown_all(dfd, &cgroup_path, &delegate, uid, gid);
    let _ = nix::unistd::close(dfd);
    result
}

fn chown_all(dfd: RawFd, cgroup_path: &Path, delegate: &str, uid: Uid, gid: Gid) -> Result<()> {
    chown_self(dfd, cgroup_path, uid, gid)?;

    for name in delegate.lines().filter(|l| !l.is_empty()) {
        match chown_relative(dfd, name, uid, gid) {
            Ok(()) => {}
            Err(e) if e.errno() == Some(Errno::ENOENT) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Chowns the directory the descriptor itself refers to (the
/// `AT_EMPTY_PATH` variant of `fchownat`), matching the original's
/// `fchownat(dfd, "", ...)` on a directory-path descriptor.
fn chown_self(dfd: RawFd, display_path: &Path, uid: Uid, gid: Gid) -> Result<()> {
    let empty = CString::new("").unwrap();
    let ret = unsafe {
        libc::fchownat(
            dfd,
            empty.as_ptr(),
            uid.as_raw(),
            gid.as_raw(),
            libc::AT_EMPTY_PATH | libc::AT_SYMLINK_NOFOLLOW,
        )
    };
    if ret < 0 {
        return Err(CgroupError::syscall(
            "fchownat",
            display_path,
            nix::Error::Sys(Errno::last()),
        ));
    }
    Ok(())
}

fn chown_relative(dfd: RawFd, name: &str, uid: Uid, gid: Gid) -> Result<()> {
    let c_name = CString::new(name)
        .map_err(|_| CgroupError::InvalidEnvironment(format!("invalid delegate entry `{}`", name)))?;
    let ret = unsafe {
        libc::fchownat(
            dfd,
            c_name.as_ptr(),
            uid.as_raw(),
            gid.as_raw(),
            libc::AT_SYMLINK_NOFOLLOW,
        )
    };
    if ret < 0 {
        return Err(CgroupError::syscall(
            "fchownat",
            name.to_string(),
            nix::Error::Sys(Errno::last()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_delegate_file_is_not_an_error() {
        // `CGROUP_DELEGATE_FILE` is a fixed kernel path; this crate has
        // no way to override it for the test, so we exercise only the
        // read_to_string/ENOENT branch in isolation.
        let result = fs::read_to_string("/nonexistent/cgroup/delegate-file-for-test");
        assert_eq!(
            result.unwrap_err().kind(),
            std::io::ErrorKind::NotFound
        );
    }
}
