//! One-shot process-init hook putting standard output into UTF-8 mode.

use std::sync::Once;

#[cfg(windows)]
use log::warn;
#[cfg(windows)]
use windows_sys::Win32::System::Console::SetConsoleOutputCP;

// CP_UTF8 lives in Win32::Globalization; just use the constant directly
#[cfg(windows)]
const CP_UTF8: u32 = 65001;

static INIT: Once = Once::new();

/// Make the console encode standard output as UTF-8. Runs at most once per
/// process; later calls return immediately.
///
/// Outside Windows this is a no-op: `Stdout` passes our UTF-8 bytes through as is.
pub fn ensure_utf8_output() {
    INIT.call_once(set_utf8_code_page);
}

#[cfg(windows)]
fn set_utf8_code_page() {
    // Fails without an attached console (service mode); output then keeps the
    // platform default code page.
    if unsafe { SetConsoleOutputCP(CP_UTF8) } == 0 {
        warn!(
            "Failed to switch console output to UTF-8: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(windows))]
fn set_utf8_code_page() {}
