//! Error taxonomy for the plugin host.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PluginError>;

#[derive(thiserror::Error, Debug)]
pub enum PluginError {
    #[error("failed to load plugin `{}`: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("plugin `{}` entry point `{entry_point}` returned errno {errno}: {message}", path.display())]
    Runtime {
        path: PathBuf,
        entry_point: &'static str,
        errno: i32,
        message: String,
    },

    #[error("{0}")]
    Contract(String),
}

impl PluginError {
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PluginError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn runtime(path: impl Into<PathBuf>, entry_point: &'static str, errno: i32) -> Self {
        PluginError::Runtime {
            path: path.into(),
            entry_point,
            errno,
            message: nix::errno::Errno::from_i32(errno.abs()).to_string(),
        }
    }
}
