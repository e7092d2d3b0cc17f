//! Raw kernel/plugin ABI: `seccomp_notif` ioctls and the four C entry
//! points a plugin module must export.
//!
//! Struct layouts mirror `<linux/seccomp.h>` exactly; field order and
//! width are ABI, not style.

use std::os::raw::{c_char, c_int, c_void};

use nix::{ioctl_readwrite, ioctl_write_ptr};

/// `SECCOMP_IOC_MAGIC`, see `/usr/include/linux/seccomp.h`.
const SECCOMP_IOC_MAGIC: u8 = b'!';

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SeccompData {
    pub nr: c_int,
    pub arch: u32,
    pub instruction_pointer: u64,
    pub args: [u64; 6],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SeccompNotif {
    pub id: u64,
    pub pid: u32,
    pub flags: u32,
    pub data: SeccompData,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SeccompNotifResp {
    pub id: u64,
    pub val: i64,
    pub error: i32,
    pub flags: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SeccompNotifSizes {
    pub seccomp_notif: u16,
    pub seccomp_notif_resp: u16,
    pub seccomp_data: u16,
}

ioctl_readwrite!(seccomp_notif_ioctl_recv, SECCOMP_IOC_MAGIC, 0, SeccompNotif);
ioctl_readwrite!(
    seccomp_notif_ioctl_send,
    SECCOMP_IOC_MAGIC,
    1,
    SeccompNotifResp
);
ioctl_write_ptr!(seccomp_notif_ioctl_id_valid, SECCOMP_IOC_MAGIC, 2, u64);

/// Receives the next notification from the kernel, blocking until one
/// arrives. Mirrors crun's `ioctl(fd, SECCOMP_IOCTL_NOTIF_RECV, &req)`.
pub fn recv(seccomp_fd: c_int) -> nix::Result<SeccompNotif> {
    let mut req = std::mem::MaybeUninit::<SeccompNotif>::zeroed();
    unsafe {
        seccomp_notif_ioctl_recv(seccomp_fd, req.as_mut_ptr())?;
        Ok(req.assume_init())
    }
}

/// Submits a response for a previously-received notification.
pub fn send(seccomp_fd: c_int, resp: &mut SeccompNotifResp) -> nix::Result<()> {
    unsafe {
        seccomp_notif_ioctl_send(seccomp_fd, resp as *mut SeccompNotifResp)?;
    }
    Ok(())
}

pub type PluginVersionFn = unsafe extern "C" fn() -> c_int;

pub type PluginStartFn =
    unsafe extern "C" fn(opaque: *mut *mut c_void, conf: *const c_void, conf_size: usize) -> c_int;

pub type PluginHandleRequestFn = unsafe extern "C" fn(
    opaque: *mut c_void,
    req: *const SeccompNotif,
    resp: *mut SeccompNotifResp,
    seccomp_fd: c_int,
    handled: *mut c_int,
) -> c_int;

pub type PluginStopFn = unsafe extern "C" fn(opaque: *mut c_void) -> c_int;

pub const SYM_PLUGIN_VERSION: &[u8] = b"run_oci_seccomp_notify_plugin_version";
pub const SYM_PLUGIN_START: &[u8] = b"run_oci_seccomp_notify_start";
pub const SYM_PLUGIN_HANDLE_REQUEST: &[u8] = b"run_oci_seccomp_notify_handle_request";
pub const SYM_PLUGIN_STOP: &[u8] = b"run_oci_seccomp_notify_stop";

/// The fixed-layout configuration struct plugins are handed at `start`:
/// four null-terminated string pointers, in this order. Field order and
/// count are ABI-significant — a plugin validates `conf_size` against
/// its own compiled-in `sizeof`.
#[repr(C)]
pub struct SeccompNotifyConfRaw {
    pub runtime_root_path: *const c_char,
    pub name: *const c_char,
    pub bundle_path: *const c_char,
    pub oci_config_path: *const c_char,
}
