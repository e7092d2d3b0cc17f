//! A single loaded plugin module: its library handle, resolved entry
//! points, and opaque state.

use std::os::raw::c_void;
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};

use crate::conf::{OwnedConf, SeccompNotifyConf};
use crate::error::{PluginError, Result};
use crate::sys::{
    self, PluginHandleRequestFn, PluginStartFn, PluginStopFn, PluginVersionFn, SeccompNotif,
    SeccompNotifResp,
};

const SUPPORTED_VERSION: i32 = 1;

/// The capability a loaded plugin offers the host: request handling
/// and ordered teardown. [`Plugin`] is the dynamically-loaded
/// implementation; tests substitute an in-process one so the
/// dispatch-order and rollback logic in [`crate::host`] can be
/// exercised without a real shared object.
pub trait PluginHandle {
    fn path(&self) -> &Path;
    fn handle_request(&self, req: &SeccompNotif, resp: &mut SeccompNotifResp, seccomp_fd: i32) -> Result<bool>;
    fn stop(&mut self) -> Result<()>;
}

/// A loaded, started plugin module.
///
/// The `Library` is kept alive for as long as the resolved function
/// pointers may be called; dropping it would leave the pointers
/// dangling. `opaque` is the `void *` the plugin's own `start` handed
/// back — this crate transports it without ever inspecting it.
pub struct Plugin {
    path: PathBuf,
    _library: Library,
    handle_request: PluginHandleRequestFn,
    stop: PluginStopFn,
    opaque: *mut c_void,
    started: bool,
}

impl Plugin {
    /// Opens `path`, resolves the four required symbols, checks the
    /// version, and calls `start` with `conf`. On any failure the
    /// library is dropped and no partially-started state is retained.
    pub fn load(path: &Path, conf: &SeccompNotifyConf) -> Result<Self> {
        let library = unsafe {
            Library::new(path).map_err(|e| PluginError::load(path, e.to_string()))?
        };

        let version_fn = resolve::<PluginVersionFn>(&library, path, sys::SYM_PLUGIN_VERSION)?;
        let start_fn = resolve::<PluginStartFn>(&library, path, sys::SYM_PLUGIN_START)?;
        let handle_request_fn =
            resolve::<PluginHandleRequestFn>(&library, path, sys::SYM_PLUGIN_HANDLE_REQUEST)?;
        let stop_fn = resolve::<PluginStopFn>(&library, path, sys::SYM_PLUGIN_STOP)?;

        let version = unsafe { version_fn() };
        if version != SUPPORTED_VERSION {
            return Err(PluginError::load(
                path,
                format!("unsupported plugin ABI version {}", version),
            ));
        }

        let owned_conf = OwnedConf::new(conf)?;
        let mut opaque: *mut c_void = std::ptr::null_mut();
        let ret = unsafe {
            start_fn(
                &mut opaque as *mut *mut c_void,
                owned_conf.as_raw_ptr() as *const c_void,
                OwnedConf::conf_size(),
            )
        };
        if ret != 0 {
            return Err(PluginError::runtime(path, "run_oci_seccomp_notify_start", ret));
        }

        Ok(Plugin {
            path: path.to_path_buf(),
            _library: library,
            handle_request: handle_request_fn,
            stop: stop_fn,
            opaque,
            started: true,
        })
    }

}

impl PluginHandle for Plugin {
    fn path(&self) -> &Path {
        &self.path
    }

    /// Calls `handle_request`. Returns `true` if this plugin claimed
    /// the event (`*handled == 1`).
    fn handle_request(&self, req: &SeccompNotif, resp: &mut SeccompNotifResp, seccomp_fd: i32) -> Result<bool> {
        let mut handled: i32 = 0;
        let ret = unsafe {
            (self.handle_request)(
                self.opaque,
                req as *const SeccompNotif,
                resp as *mut SeccompNotifResp,
                seccomp_fd,
                &mut handled as *mut i32,
            )
        };
        if ret != 0 {
            return Err(PluginError::runtime(
                self.path.as_path(),
                "run_oci_seccomp_notify_handle_request",
                ret,
            ));
        }
        Ok(handled == 1)
    }

    /// Calls `stop` exactly once. Calling it again is a no-op returning
    /// `Ok(())`, so teardown code never has to track whether it has
    /// already been called.
    fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        let ret = unsafe { (self.stop)(self.opaque) };
        if ret != 0 {
            return Err(PluginError::runtime(self.path.as_path(), "run_oci_seccomp_notify_stop", ret));
        }
        Ok(())
    }
}

impl Drop for Plugin {
    fn drop(&mut self) {
        if self.started {
            if let Err(e) = PluginHandle::stop(self) {
                log::warn!("plugin `{}` stop on drop failed: {}", self.path.display(), e);
            }
        }
    }
}

fn resolve<T: Copy>(library: &Library, path: &Path, name: &[u8]) -> Result<T> {
    unsafe {
        let symbol: Symbol<T> = library
            .get(name)
            .map_err(|e| PluginError::load(path, format!("missing symbol `{}`: {}", String::from_utf8_lossy(name), e)))?;
        Ok(*symbol)
    }
}
