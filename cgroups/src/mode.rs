//! One-shot classification of the active cgroup regime.

use std::ffi::CString;
use std::mem::MaybeUninit;

use nix::errno::Errno;
use once_cell::sync::OnceCell;

use crate::common::CGROUP_ROOT;
use crate::error::{CgroupError, Result};

// Not exposed by `libc` on every target, so defined here as the original does.
const CGROUP2_SUPER_MAGIC: i64 = 0x6367_7270;
const TMPFS_MAGIC: i64 = 0x0102_1994;

/// Which cgroup filesystem layout the kernel has mounted.
///
/// Detected once per process lifetime and cached; re-detection is a
/// programming error, not a supported operation, since the regime
/// cannot change under a running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupMode {
    /// v2 only.
    Unified,
    /// v1 only.
    Legacy,
    /// v1 with a v2 subtree mounted at `/sys/fs/cgroup/unified`.
    Hybrid,
}

static CGROUP_MODE: OnceCell<CgroupMode> = OnceCell::new();

/// Returns the process-wide cgroup mode, detecting it on first call.
///
/// Safe to call concurrently: competing first callers converge on the
/// same stored result (`OnceCell::get_or_try_init` only runs the
/// initializer once).
pub fn get_cgroup_mode() -> Result<CgroupMode> {
    CGROUP_MODE.get_or_try_init(detect_mode).map(|m| *m)
}

fn statfs_type(path: &str) -> Result<i64> {
    let c_path = CString::new(path).expect("cgroup path must not contain NUL bytes");
    let mut stat = MaybeUninit::<libc::statfs>::uninit();
    let ret = unsafe { libc::statfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if ret < 0 {
        return Err(CgroupError::syscall(
            "statfs",
            path.to_string(),
            nix::Error::Sys(Errno::last()),
        ));
    }
    let stat = unsafe { stat.assume_init() };
    Ok(stat.f_type as i64)
}

fn detect_mode() -> Result<CgroupMode> {
    match statfs_type(CGROUP_ROOT) {
        Ok(t) if t == CGROUP2_SUPER_MAGIC => return Ok(CgroupMode::Unified),
        Ok(t) if t == TMPFS_MAGIC => {}
        Ok(_) => {
            return Err(CgroupError::InvalidEnvironment(format!(
                "invalid file system type on '{}'",
                CGROUP_ROOT
            )))
        }
        Err(e) => return Err(e),
    }

    let unified_path = format!("{}/unified", CGROUP_ROOT);
    match statfs_type(&unified_path) {
        Ok(t) if t == CGROUP2_SUPER_MAGIC => Ok(CgroupMode::Hybrid),
        Ok(_) => Ok(CgroupMode::Legacy),
        Err(e) if e.errno() == Some(Errno::ENOENT) => Ok(CgroupMode::Legacy),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn magic_constants_match_linux_uapi() {
        assert_eq!(CGROUP2_SUPER_MAGIC, 0x6367_7270);
        assert_eq!(TMPFS_MAGIC, 0x0102_1994);
    }

    // `CGROUP_MODE` is a process-wide `OnceCell`; run in isolation so no
    // other test observes a half-initialized cache or races the first
    // `get_or_try_init` call.
    #[test]
    #[serial]
    fn get_cgroup_mode_is_stable_across_repeated_calls() {
        let _ = env_logger::try_init();

        let first = get_cgroup_mode();
        let second = get_cgroup_mode();
        match (first, second) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "mode must not change within a process lifetime"),
            (Err(_), Err(_)) => {}
            _ => panic!("get_cgroup_mode() must converge: one call succeeded, the other failed"),
        }
    }
}
