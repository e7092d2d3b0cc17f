//! Recursive cgroup destruction with busy-retry and kill escalation.
//!
//! This is the hardest algorithm in the crate: it must remove a cgroup
//! subtree while other threads, or the cgroup's own members, may still
//! be populating it with new descendants.

use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::thread;
use std::time::Duration;

use nix::dir::{Dir, Type};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{self, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, UnlinkatFlags};

use crate::common::CGROUP_ROOT;
use crate::error::{CgroupError, Result};
use crate::mode::CgroupMode;
use crate::pids::{kill_all_pids, read_pids};
use crate::proc_cgroup::resolve_controller_paths;

/// Tunables for the outer retry loop. The spec's sampled implementation
/// has no bound on retries; this crate adds one (see REDESIGN FLAGS)
/// because an unbounded loop against a subtree that can never be
/// quiesced is a hang, not a correctness primitive.
#[derive(Debug, Clone, Copy)]
pub struct DestroyOptions {
    pub max_iterations: u32,
    pub retry_sleep: Duration,
}

impl Default for DestroyOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            retry_sleep: Duration::from_micros(100),
        }
    }
}

/// Destroys the cgroup subtree at `path` under the process-wide cgroup
/// root, using default retry tunables.
pub fn destroy(path: &str, mode: CgroupMode) -> Result<()> {
    destroy_with_options(path, mode, DestroyOptions::default())
}

pub fn destroy_with_options(path: &str, mode: CgroupMode, opts: DestroyOptions) -> Result<()> {
    destroy_at(CGROUP_ROOT, path, mode, opts)
}

pub(crate) fn destroy_at(root: &str, path: &str, mode: CgroupMode, opts: DestroyOptions) -> Result<()> {
    let mut iteration: u32 = 0;

    loop {
        let targets = resolve_controller_paths(mode, root, path)?;
        if targets.is_empty() {
            // `/proc/self/cgroup` is missing in legacy/hybrid mode:
            // nothing to destroy (P2, destroy idempotence).
            return Ok(());
        }

        let mut incomplete = false;
        for (_, dir_path) in &targets {
            match rmdir(dir_path) {
                Ok(()) => {}
                Err(e) if e.errno() == Some(Errno::EBUSY) => {
                    if rmdir_all(dir_path).is_err() {
                        incomplete = true;
                    }
                }
                Err(_) => {
                    // Non-EBUSY failures abort this controller but must
                    // not block the others in the same iteration.
                }
            }
        }

        if !incomplete {
            return Ok(());
        }

        iteration += 1;
        if iteration > opts.max_iterations {
            return Err(CgroupError::Contract(format!(
                "cgroup subtree `{}` cannot be quiesced after {} iterations",
                path, iteration
            )));
        }
        log::warn!(
            "cgroup `{}` still busy after rmdir, retry {}/{}",
            path,
            iteration,
            opts.max_iterations
        );

        thread::sleep(opts.retry_sleep);

        if let Err(e) = kill_all_pids(root, mode, path, Signal::SIGKILL) {
            log::debug!("kill_all_pids for `{}` failed, will retry: {}", path, e);
        }
    }
}

fn rmdir(path: &Path) -> Result<()> {
    match unistd::rmdir(path) {
        Ok(()) => Ok(()),
        Err(nix::Error::Sys(Errno::ENOENT)) => Ok(()),
        Err(e) => Err(CgroupError::syscall("rmdir", path, e)),
    }
}

fn open_dir(path: &Path) -> Result<Dir> {
    Dir::open(path, OFlag::O_DIRECTORY | OFlag::O_CLOEXEC, Mode::empty())
        .map_err(|e| CgroupError::syscall("open", path, e))
}

/// Empties and removes `path`, killing and recursing into any busy
/// descendant along the way.
fn rmdir_all(path: &Path) -> Result<()> {
    let dir = open_dir(path)?;
    rmdir_all_fd(dir)?;
    rmdir(path)
}

fn rmdir_all_fd(mut dir: Dir) -> Result<()> {
    let dfd = dir.as_raw_fd();

    let mut children = Vec::new();
    for entry in dir.iter() {
        let entry = entry.map_err(|e| CgroupError::syscall("readdir", "", e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == "." || name == ".." {
            continue;
        }
        if entry.file_type() != Some(Type::Directory) {
            continue;
        }
        children.push(name);
    }

    // Every child is attempted; one still-busy child does not stop the
    // others from being reaped in the same pass.
    let mut last_error = None;
    for name in children {
        if let Err(e) = remove_child(dfd, &name) {
            last_error = Some(e);
        }
    }

    match last_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn remove_child(dfd: RawFd, name: &str) -> Result<()> {
    match unlinkat_dir(dfd, name) {
        Ok(()) => Ok(()),
        Err(e) if e.errno() == Some(Errno::EBUSY) => {
            let pids_dir = Dir::openat(dfd, name, OFlag::O_DIRECTORY | OFlag::O_CLOEXEC, Mode::empty())
                .map_err(|e| CgroupError::syscall("openat", name, e))?;
            if let Ok(pids) = read_pids(pids_dir, true) {
                for pid in pids {
                    let _ = signal::kill(pid, Signal::SIGKILL);
                }
            }

            let child = Dir::openat(dfd, name, OFlag::O_DIRECTORY | OFlag::O_CLOEXEC, Mode::empty())
                .map_err(|e| CgroupError::syscall("openat", name, e))?;
            rmdir_all_fd(child)?;

            unlinkat_dir(dfd, name)
        }
        Err(e) => Err(e),
    }
}

fn unlinkat_dir(dfd: RawFd, name: &str) -> Result<()> {
    match unistd::unlinkat(Some(dfd), name, UnlinkatFlags::RemoveDir) {
        Ok(()) => Ok(()),
        Err(nix::Error::Sys(Errno::ENOENT)) => Ok(()),
        Err(e) => Err(CgroupError::syscall("unlinkat", name, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn destroy_unified_is_idempotent_when_path_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        // No such subtree ever created: resolve_controller_paths still
        // yields one unified target, whose rmdir tolerates ENOENT.
        destroy_at(root, "never-existed", CgroupMode::Unified, DestroyOptions::default()).unwrap();
        destroy_at(root, "never-existed", CgroupMode::Unified, DestroyOptions::default()).unwrap();
    }

    #[test]
    fn destroy_unified_removes_empty_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        fs::create_dir(dir.path().join("foo")).unwrap();

        destroy_at(root, "foo", CgroupMode::Unified, DestroyOptions::default()).unwrap();

        assert!(!dir.path().join("foo").exists());
    }

    // `destroy_at`'s own top-level `rmdir` only escalates to `rmdir_all`
    // on EBUSY, which real cgroupfs returns for a non-empty directory.
    // A plain tmpfs returns ENOTEMPTY instead, so the recursive-removal
    // path itself (used once cgroupfs has already handed back EBUSY) is
    // exercised directly here rather than through the outer retry loop.
    #[test]
    fn rmdir_all_recurses_through_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("foo/bar/baz")).unwrap();

        rmdir_all(&dir.path().join("foo")).unwrap();

        assert!(!dir.path().join("foo").exists());
    }
}
