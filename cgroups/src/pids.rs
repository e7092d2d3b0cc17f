//! Enumeration and signalling of processes under a cgroup subtree.

use std::os::unix::io::{AsRawFd, FromRawFd};
use std::path::Path;

use nix::dir::{Dir, Type};
use nix::fcntl::{self, OFlag};
use nix::sys::signal::{self, Signal};
use nix::sys::stat::Mode;
use nix::unistd::Pid;

use crate::common::CGROUP_PROCS;
use crate::error::{CgroupError, Result};
use crate::mode::CgroupMode;
use crate::proc_cgroup::resolve_controller_paths;

/// Reads every PID listed in `cgroup.procs` under `dir`, optionally
/// recursing into subdirectories.
///
/// Takes ownership of `dir` for the lifetime of the call: it is closed
/// on every exit path (including the error paths), so no descriptor
/// leaks during a deep recursion.
pub fn read_pids(dir: Dir, recurse: bool) -> Result<Vec<Pid>> {
    let mut pids = Vec::new();
    read_pids_into(dir, recurse, &mut pids)?;
    Ok(pids)
}

fn read_pids_into(mut dir: Dir, recurse: bool, pids: &mut Vec<Pid>) -> Result<()> {
    let dfd = dir.as_raw_fd();
    read_procs_file(dfd, pids)?;

    if !recurse {
        return Ok(());
    }

    let mut subdirs = Vec::new();
    for entry in dir.iter() {
        let entry = entry.map_err(|e| CgroupError::syscall("readdir", CGROUP_PROCS, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == "." || name == ".." {
            continue;
        }
        if entry.file_type() != Some(Type::Directory) {
            continue;
        }
        subdirs.push(name);
    }

    for name in subdirs {
        let child = Dir::openat(
            dfd,
            name.as_str(),
            OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
            Mode::empty(),
        )
        .map_err(|e| CgroupError::syscall("openat", name, e))?;
        read_pids_into(child, recurse, pids)?;
    }

    Ok(())
}

fn read_procs_file(dfd: std::os::unix::io::RawFd, pids: &mut Vec<Pid>) -> Result<()> {
    use std::io::Read;

    let fd = fcntl::openat(
        dfd,
        CGROUP_PROCS,
        OFlag::O_RDONLY | OFlag::O_CLOEXEC,
        Mode::empty(),
    )
    .map_err(|e| CgroupError::syscall("openat", CGROUP_PROCS, e))?;

    // SAFETY: `fd` was just opened above and is owned exclusively by this file.
    let mut file = unsafe { std::fs::File::from_raw_fd(fd) };
    let mut buffer = String::new();
    file.read_to_string(&mut buffer)
        .map_err(|e| CgroupError::io("read", CGROUP_PROCS, e))?;

    for token in buffer.lines() {
        // A malformed (non-numeric) token is silently dropped: the
        // kernel may emit blank lines.
        if let Ok(raw) = token.trim().parse::<u32>() {
            if raw != 0 {
                pids.push(Pid::from_raw(raw as i32));
            }
        }
    }

    Ok(())
}

fn open_dir(path: &Path) -> Result<Dir> {
    Dir::open(path, OFlag::O_DIRECTORY | OFlag::O_CLOEXEC, Mode::empty())
        .map_err(|e| CgroupError::syscall("open", path, e))
}

/// Enumerates every PID under the controller directories backing `path`
/// and sends `signal` to each. Returns the number of PIDs signalled.
///
/// A controller whose directory does not (or no longer) exist is
/// skipped rather than treated as an error: the subtree may have
/// already been partly torn down by a concurrent destroy iteration.
pub fn kill_all_pids(root: &str, mode: CgroupMode, path: &str, signal: Signal) -> Result<usize> {
    let mut count = 0;
    for (_, dir_path) in resolve_controller_paths(mode, root, path)? {
        let dir = match open_dir(&dir_path) {
            Ok(dir) => dir,
            Err(_) => continue,
        };
        for pid in read_pids(dir, true)? {
            if signal::kill(pid, signal).is_ok() {
                count += 1;
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_nonzero_pids_and_drops_malformed_tokens() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CGROUP_PROCS), "123\n0\nnotapid\n456\n").unwrap();

        let opened = open_dir(dir.path()).unwrap();
        let pids = read_pids(opened, false).unwrap();

        assert_eq!(pids, vec![Pid::from_raw(123), Pid::from_raw(456)]);
    }

    #[test]
    fn recurses_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CGROUP_PROCS), "1\n").unwrap();
        let child = dir.path().join("child");
        fs::create_dir(&child).unwrap();
        fs::write(child.join(CGROUP_PROCS), "2\n").unwrap();

        let opened = open_dir(dir.path()).unwrap();
        let mut pids = read_pids(opened, true).unwrap();
        pids.sort_by_key(|p| p.as_raw());

        assert_eq!(pids, vec![Pid::from_raw(1), Pid::from_raw(2)]);
    }
}
