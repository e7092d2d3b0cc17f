//! Parsing of `/proc/self/cgroup` and resolution of controller paths.

use std::fs;
use std::path::PathBuf;

use nix::errno::Errno;

use crate::common::{controller_path, PROC_SELF_CGROUP};
use crate::error::{CgroupError, Result};
use crate::mode::CgroupMode;

/// One line of `/proc/self/cgroup`, already canonicalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcCgroupLine {
    pub id: String,
    /// The canonicalized controller/subsystem name (`name=` prefix
    /// stripped; empty becomes `unified`).
    pub controller: String,
    pub path: String,
}

/// Splits a single `<id>:<controller_list>:<path>` line. `path` may
/// itself contain `:`, so only the first two separators are significant.
fn parse_line(line: &str) -> Option<(&str, &str, &str)> {
    let mut parts = line.splitn(3, ':');
    let id = parts.next()?;
    let controllers = parts.next()?;
    let path = parts.next()?;
    Some((id, controllers, path))
}

/// Strips a `name=` prefix from a named hierarchy and maps the empty
/// v2 controller list to the pseudo-subsystem `unified`.
pub fn canonicalize_controller(controllers: &str) -> String {
    let stripped = controllers.strip_prefix("name=").unwrap_or(controllers);
    if stripped.is_empty() {
        "unified".to_string()
    } else {
        stripped.to_string()
    }
}

/// Reads and parses `/proc/self/cgroup`. Malformed lines (no two `:`)
/// are skipped rather than failing the whole read.
pub fn read_own_cgroups() -> Result<Vec<ProcCgroupLine>> {
    let content = fs::read_to_string(PROC_SELF_CGROUP)
        .map_err(|e| CgroupError::io("read", PROC_SELF_CGROUP, e))?;

    Ok(content
        .lines()
        .filter_map(parse_line)
        .map(|(id, controllers, path)| ProcCgroupLine {
            id: id.to_string(),
            controller: canonicalize_controller(controllers),
            path: path.to_string(),
        })
        .collect())
}

/// Resolves the on-disk controller directories backing `path` under
/// `mode`. In `Legacy` mode the `unified` pseudo-controller is skipped
/// (it must never be written to outside `Hybrid`). A missing
/// `/proc/self/cgroup` in legacy/hybrid mode resolves to no targets,
/// which callers treat as "nothing to destroy".
pub fn resolve_controller_paths(
    mode: CgroupMode,
    root: &str,
    path: &str,
) -> Result<Vec<(String, PathBuf)>> {
    match mode {
        CgroupMode::Unified => Ok(vec![(String::new(), controller_path(root, "", path))]),
        CgroupMode::Legacy | CgroupMode::Hybrid => {
            let lines = match read_own_cgroups() {
                Ok(lines) => lines,
                Err(e) if e.errno() == Some(Errno::ENOENT) => return Ok(Vec::new()),
                Err(e) => return Err(e),
            };

            Ok(lines
                .into_iter()
                .filter(|line| !(mode == CgroupMode::Legacy && line.controller == "unified"))
                .map(|line| {
                    let p = controller_path(root, &line.controller, path);
                    (line.controller, p)
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v1_line() {
        let (id, controllers, path) = parse_line("4:memory:/user.slice").unwrap();
        assert_eq!(id, "4");
        assert_eq!(controllers, "memory");
        assert_eq!(path, "/user.slice");
    }

    #[test]
    fn parses_v2_line_with_empty_controller_list() {
        let (id, controllers, path) = parse_line("0::/user.slice/session.scope").unwrap();
        assert_eq!(id, "0");
        assert_eq!(controllers, "");
        assert_eq!(path, "/user.slice/session.scope");
        assert_eq!(canonicalize_controller(controllers), "unified");
    }

    #[test]
    fn canonicalizes_named_hierarchy() {
        assert_eq!(canonicalize_controller("name=systemd"), "systemd");
    }

    #[test]
    fn rejects_malformed_line() {
        assert_eq!(parse_line("not-a-valid-line"), None);
    }
}
