//! Seccomp user-notification plugin host for an OCI container runtime.
//!
//! Loads an ordered chain of dynamically-provided plugin modules and
//! dispatches kernel seccomp notifications to them in sequence until
//! one claims the event. Plugins are plain shared objects exporting
//! four fixed C entry points; this crate never builds seccomp filters
//! itself, only hosts the notification side of an already-installed
//! `SECCOMP_RET_USER_NOTIF` filter.

pub mod conf;
pub mod error;
pub mod host;
pub mod plugin;
pub mod sys;

pub use conf::SeccompNotifyConf;
pub use error::{PluginError, Result};
pub use host::PluginHost;
pub use plugin::PluginHandle;
