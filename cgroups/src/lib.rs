//! Cgroup lifecycle management for an OCI container runtime.
//!
//! This crate does not apply resource limits. It detects which cgroup
//! regime the kernel has mounted (unified v2, legacy v1, or the hybrid
//! transitional layout), resolves controller paths within it, moves
//! processes in and out of cgroups, enumerates their members, and tears
//! subtrees down safely even while they are still being populated.

pub mod common;
pub mod delegate;
pub mod destroy;
pub mod error;
pub mod mode;
pub mod mover;
pub mod pids;
pub mod proc_cgroup;
pub mod symlinks;

pub use delegate::chown_delegated;
pub use destroy::{destroy, destroy_with_options, DestroyOptions};
pub use error::{CgroupError, Result};
pub use mode::{get_cgroup_mode, CgroupMode};
pub use mover::move_process_to_cgroup;
pub use pids::{kill_all_pids, read_pids};
pub use symlinks::create_symlinks;
