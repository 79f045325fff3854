//! C entry points resolved by the native SvcHostify host after it loads this
//! library as a DLL.
//!
//! The host calls `refvalue_svchostify_run` on its worker thread and
//! `refvalue_svchostify_on_stop` from its control handler thread. Panics are
//! caught and logged here; none unwind into the host.

use crate::{logging, service};
use log::error;
use std::any::Any;
use std::ffi::{c_char, CStr};
use std::panic::{self, AssertUnwindSafe};

/// # Safety
///
/// When `argc` is non-zero, `argv` must point to `argc` valid NUL-terminated
/// strings that stay alive for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn refvalue_svchostify_run(argc: usize, argv: *const *const c_char) {
    // Err means the host already installed a logger; keep it.
    let _ = logging::init_stderr();
    let args = collect_args(argc, argv);
    guarded("refvalue_svchostify_run", || service::run(&args));
}

#[no_mangle]
pub extern "C" fn refvalue_svchostify_on_stop() {
    // Err means a logger is already set.
    let _ = logging::init_stderr();
    guarded("refvalue_svchostify_on_stop", service::on_stop);
}

/// Copy the host's argument array. Invalid UTF-8 is replaced, not rejected.
///
/// # Safety
///
/// Same contract as [`refvalue_svchostify_run`].
unsafe fn collect_args(argc: usize, argv: *const *const c_char) -> Vec<String> {
    if argc == 0 || argv.is_null() {
        return Vec::new();
    }
    std::slice::from_raw_parts(argv, argc)
        .iter()
        .filter(|arg| !arg.is_null())
        .map(|&arg| CStr::from_ptr(arg).to_string_lossy().into_owned())
        .collect()
}

fn guarded(entry: &str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        error!("{} panicked: {}", entry, panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
