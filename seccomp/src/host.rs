//! Loading, dispatching to, and tearing down an ordered chain of
//! seccomp notification plugins.

use std::os::raw::c_int;
use std::path::Path;

use crate::conf::SeccompNotifyConf;
use crate::error::Result;
use crate::plugin::{Plugin, PluginHandle};
use crate::sys::{self, SeccompNotif, SeccompNotifResp};

/// An ordered, loaded chain of plugins. Not reentrant: `dispatch` must
/// not be called concurrently on the same host.
pub struct PluginHost {
    plugins: Vec<Box<dyn PluginHandle>>,
}

impl PluginHost {
    /// Loads every path in `plugin_paths`, in order, with the same
    /// `conf`. If any plugin fails to load, every plugin already
    /// loaded is stopped in reverse order before the error is
    /// returned, and no module is left loaded (P6).
    pub fn load(plugin_paths: &[impl AsRef<Path>], conf: &SeccompNotifyConf) -> Result<Self> {
        let mut plugins: Vec<Box<dyn PluginHandle>> = Vec::with_capacity(plugin_paths.len());

        for path in plugin_paths {
            match Plugin::load(path.as_ref(), conf) {
                Ok(plugin) => plugins.push(Box::new(plugin)),
                Err(e) => {
                    rollback(plugins);
                    return Err(e);
                }
            }
        }

        Ok(PluginHost { plugins })
    }

    /// Assembles a host from already-constructed handles, bypassing
    /// `dlopen`. Used by tests to drive dispatch/rollback ordering
    /// against in-process fakes.
    #[doc(hidden)]
    pub fn from_handles(plugins: Vec<Box<dyn PluginHandle>>) -> Self {
        PluginHost { plugins }
    }

    /// Reads the next notification from `seccomp_fd`, offers it to
    /// each plugin in load order until one claims it, and submits the
    /// response. Returns `true` if some plugin handled the event.
    pub fn dispatch(&self, seccomp_fd: c_int) -> Result<bool> {
        let req = sys::recv(seccomp_fd)
            .map_err(|e| crate::error::PluginError::Contract(format!("seccomp_notif recv failed: {}", e)))?;

        let mut resp = SeccompNotifResp {
            id: req.id,
            val: 0,
            error: 0,
            flags: 0,
        };

        let handled = self.dispatch_one(&req, &mut resp, seccomp_fd)?;

        sys::send(seccomp_fd, &mut resp)
            .map_err(|e| crate::error::PluginError::Contract(format!("seccomp_notif send failed: {}", e)))?;

        Ok(handled)
    }

    fn dispatch_one(&self, req: &SeccompNotif, resp: &mut SeccompNotifResp, seccomp_fd: c_int) -> Result<bool> {
        for plugin in &self.plugins {
            if plugin.handle_request(req, resp, seccomp_fd)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Stops every plugin in reverse load order. A plugin whose `stop`
    /// fails is logged, not propagated, so later plugins still get a
    /// chance to tear down.
    pub fn free(mut self) {
        let plugins = std::mem::take(&mut self.plugins);
        rollback(plugins);
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }
}

fn rollback(mut plugins: Vec<Box<dyn PluginHandle>>) {
    while let Some(mut plugin) = plugins.pop() {
        if let Err(e) = plugin.stop() {
            log::warn!("plugin `{}` stop failed during teardown: {}", plugin.path().display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    struct FakePlugin {
        path: PathBuf,
        calls: Rc<RefCell<Vec<String>>>,
        claims: bool,
        stop_fails: bool,
    }

    impl PluginHandle for FakePlugin {
        fn path(&self) -> &Path {
            &self.path
        }

        fn handle_request(&self, _req: &SeccompNotif, resp: &mut SeccompNotifResp, _seccomp_fd: c_int) -> Result<bool> {
            self.calls.borrow_mut().push(format!("handle:{}", self.path.display()));
            if self.claims {
                resp.error = -28; // -ENOSPC
                return Ok(true);
            }
            Ok(false)
        }

        fn stop(&mut self) -> Result<()> {
            self.calls.borrow_mut().push(format!("stop:{}", self.path.display()));
            if self.stop_fails {
                return Err(crate::error::PluginError::runtime(self.path.as_path(), "run_oci_seccomp_notify_stop", -5));
            }
            Ok(())
        }
    }

    fn fake(name: &str, calls: &Rc<RefCell<Vec<String>>>, claims: bool) -> Box<dyn PluginHandle> {
        Box::new(FakePlugin {
            path: PathBuf::from(name),
            calls: Rc::clone(calls),
            claims,
            stop_fails: false,
        })
    }

    /// (P5) Dispatch order: the first plugin that claims the event
    /// wins; later plugins in the chain are never consulted.
    #[test]
    fn dispatch_order_stops_at_first_claim() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let host = PluginHost::from_handles(vec![
            fake("a", &calls, false),
            fake("b", &calls, true),
            fake("c", &calls, false),
        ]);

        let mut resp = SeccompNotifResp { id: 0, val: 0, error: 0, flags: 0 };
        let req = SeccompNotif {
            id: 0,
            pid: 0,
            flags: 0,
            data: crate::sys::SeccompData { nr: 0, arch: 0, instruction_pointer: 0, args: [0; 6] },
        };

        let handled = host.dispatch_one(&req, &mut resp, 0).unwrap();

        assert!(handled);
        assert_eq!(resp.error, -28);
        assert_eq!(*calls.borrow(), vec!["handle:a", "handle:b"]);
    }

    /// (P6) Load rollback: a failure loading plugin N stops every
    /// already-loaded plugin exactly once, in reverse order.
    #[test]
    fn load_rollback_stops_in_reverse_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let loaded = vec![fake("a", &calls, false), fake("b", &calls, false)];

        rollback(loaded);

        assert_eq!(*calls.borrow(), vec!["stop:b", "stop:a"]);
    }

    #[test]
    fn free_stops_all_plugins_in_reverse_order_and_logs_failures() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let host = PluginHost::from_handles(vec![
            fake("a", &calls, false),
            Box::new(FakePlugin {
                path: PathBuf::from("b"),
                calls: Rc::clone(&calls),
                claims: false,
                stop_fails: true,
            }),
        ]);

        host.free();

        assert_eq!(*calls.borrow(), vec!["stop:b", "stop:a"]);
    }
}
