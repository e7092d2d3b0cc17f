//! Shared path and filesystem constants.

use std::path::PathBuf;

pub const CGROUP_ROOT: &str = "/sys/fs/cgroup";
pub const CGROUP_PROCS: &str = "cgroup.procs";
pub const PROC_SELF_CGROUP: &str = "/proc/self/cgroup";
pub const CGROUP_DELEGATE_FILE: &str = "/sys/kernel/cgroup/delegate";

/// Joins path segments under a cgroup root, skipping empty segments.
///
/// Some callers legitimately pass an empty segment (the subsystem
/// component is empty in unified mode); `join_safely` drops those
/// rather than producing a double slash.
pub fn join_safely<I, S>(segments: I) -> PathBuf
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut path = PathBuf::new();
    for segment in segments {
        let segment = segment.as_ref();
        if segment.is_empty() {
            continue;
        }
        path.push(segment.trim_start_matches('/'));
    }
    path
}

pub fn cgroup_procs_path(root: &str, subsystem: &str, path: &str) -> PathBuf {
    join_safely([root, subsystem, path, CGROUP_PROCS])
}

pub fn controller_path(root: &str, subsystem: &str, path: &str) -> PathBuf {
    join_safely([root, subsystem, path])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_safely_skips_empty_subsystem() {
        let p = controller_path(CGROUP_ROOT, "", "machine.slice/container-abc");
        assert_eq!(p, PathBuf::from("/sys/fs/cgroup/machine.slice/container-abc"));
    }

    #[test]
    fn join_safely_includes_subsystem() {
        let p = controller_path(CGROUP_ROOT, "cpu", "machine.slice/container-abc");
        assert_eq!(
            p,
            PathBuf::from("/sys/fs/cgroup/cpu/machine.slice/container-abc")
        );
    }
}
