//! Moving a single process into a cgroup.

use std::fs::OpenOptions;
use std::io::Write;

use nix::unistd::Pid;

use crate::common::cgroup_procs_path;
use crate::error::{CgroupError, Result};

/// Writes `pid` into `<root>/<subsystem>/<path>/cgroup.procs`.
///
/// `subsystem` is the empty string in unified mode. This is a single
/// syscall sequence; nothing is cached or retried.
pub fn move_process_to_cgroup(root: &str, subsystem: &str, path: &str, pid: Pid) -> Result<()> {
    let procs_path = cgroup_procs_path(root, subsystem, path);

    let mut file = OpenOptions::new()
        .write(true)
        .open(&procs_path)
        .map_err(|e| CgroupError::io("open", procs_path.clone(), e))?;

    write!(file, "{}", pid.as_raw()).map_err(|e| CgroupError::io("write", procs_path, e))?;

    Ok(())
}
