//! The four-string configuration handed to every plugin at `start`.

use std::ffi::CString;

use crate::error::{PluginError, Result};
use crate::sys::SeccompNotifyConfRaw;

/// Owned, safe-Rust mirror of `struct libcrun_load_seccomp_notify_conf_s`.
#[derive(Debug, Clone)]
pub struct SeccompNotifyConf {
    pub runtime_root_path: String,
    pub name: String,
    pub bundle_path: String,
    pub oci_config_path: String,
}

/// Keeps the `CString`s backing a [`SeccompNotifyConfRaw`] alive for as
/// long as the raw struct itself is in use; the pointers in the raw
/// struct borrow from these, so the two must never be separated.
pub struct OwnedConf {
    raw: SeccompNotifyConfRaw,
    _runtime_root_path: CString,
    _name: CString,
    _bundle_path: CString,
    _oci_config_path: CString,
}

impl OwnedConf {
    pub fn new(conf: &SeccompNotifyConf) -> Result<Self> {
        let runtime_root_path = to_cstring(&conf.runtime_root_path)?;
        let name = to_cstring(&conf.name)?;
        let bundle_path = to_cstring(&conf.bundle_path)?;
        let oci_config_path = to_cstring(&conf.oci_config_path)?;

        let raw = SeccompNotifyConfRaw {
            runtime_root_path: runtime_root_path.as_ptr(),
            name: name.as_ptr(),
            bundle_path: bundle_path.as_ptr(),
            oci_config_path: oci_config_path.as_ptr(),
        };

        Ok(OwnedConf {
            raw,
            _runtime_root_path: runtime_root_path,
            _name: name,
            _bundle_path: bundle_path,
            _oci_config_path: oci_config_path,
        })
    }

    pub fn as_raw_ptr(&self) -> *const SeccompNotifyConfRaw {
        &self.raw
    }

    pub fn conf_size() -> usize {
        std::mem::size_of::<SeccompNotifyConfRaw>()
    }
}

fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| PluginError::Contract(format!("embedded NUL in config value `{}`", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conf_size_matches_four_pointers() {
        assert_eq!(
            OwnedConf::conf_size(),
            4 * std::mem::size_of::<*const std::os::raw::c_char>()
        );
    }

    #[test]
    fn rejects_embedded_nul() {
        let conf = SeccompNotifyConf {
            runtime_root_path: "bad\0path".to_string(),
            name: String::new(),
            bundle_path: String::new(),
            oci_config_path: String::new(),
        };
        assert!(OwnedConf::new(&conf).is_err());
    }
}
