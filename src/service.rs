//! The hosted service: a banner, a side file, and a counter loop that runs until
//! the host calls `on_stop` from another thread.
//!
//! The `running` flag is the only synchronization point between the loop and the
//! stop callback. Stores use `Release`, loads use `Acquire`. The condvar only
//! shortens the wait between ticks; correctness never depends on it.

use crate::{console, logging};
use log::{error, warn};
use std::fmt;
use std::fs::File;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, OnceLock};
use std::time::Duration;

/// Side file written once per `run`, relative to the current working directory.
pub const SIDE_FILE_NAME: &str = "output_java.txt";
pub const SIDE_FILE_TEXT: &str = "It's good to write text to your own file for logging.";

/// Pause between two counter lines.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

pub const START_BANNER: &str = "A Svchost run from Java.";
pub const REDIRECT_BANNER: &str =
    "All outputs to System.out will be redirected to the logging file that you configured.";
pub const ARGS_HEADING: &str = "Input arguments:";
pub const COUNTER_PREFIX: &str = "Hello service counter: ";
pub const STOPPED_BANNER: &str = "Service has stopped from Java.";
pub const STOP_RECEIVED: &str = "A stop signal received.";
pub const STOP_REQUESTED: &str = "Requesting a stop.";

static PROCESS_SERVICE: OnceLock<Service> = OnceLock::new();

/// A cooperative service writing its lines to `W` (standard output by default).
pub struct Service<W = Stdout> {
    running: AtomicBool,
    wake_lock: Mutex<()>,
    wake: Condvar,
    out: Mutex<W>,
    side_file: PathBuf,
    tick: Duration,
}

impl<W: Write + Send> Service<W> {
    pub fn new(out: W) -> Self {
        Self {
            running: AtomicBool::new(false),
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
            out: Mutex::new(out),
            side_file: PathBuf::from(SIDE_FILE_NAME),
            tick: TICK_INTERVAL,
        }
    }

    /// Write the side file to `path` instead of `output_java.txt` in the working directory.
    pub fn with_side_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.side_file = path.into();
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Main routine. Blocks until a stop has been requested and observed by the loop.
    ///
    /// A stop requested before the flag is raised below is overwritten by it;
    /// the host is expected to call `on_stop` only after `run` has begun.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) {
        self.emit(START_BANNER);
        self.emit(REDIRECT_BANNER);
        self.emit(ARGS_HEADING);
        for arg in args {
            self.emit(arg.as_ref());
        }

        if let Err(e) = self.write_side_file() {
            error!("Failed to write {}: {}", self.side_file.display(), e);
        }

        self.running.store(true, Ordering::Release);

        let mut counter: u64 = 0;
        while self.running.load(Ordering::Acquire) {
            self.emit(format_args!("{}{}", COUNTER_PREFIX, counter));
            counter += 1;
            self.pause();
        }

        self.emit(STOPPED_BANNER);
    }

    /// Stop callback. Returns without waiting for the loop to exit; safe to call
    /// any number of times from any thread.
    pub fn on_stop(&self) {
        self.emit(STOP_RECEIVED);
        self.emit(STOP_REQUESTED);

        self.running.store(false, Ordering::Release);

        // A waiter checks the flag while holding the lock, so taking it here
        // means the notify cannot fall between its check and its wait.
        drop(self.wake_lock.lock());
        self.wake.notify_all();
    }

    /// Wait up to one tick, returning early once the flag drops.
    fn pause(&self) {
        let guard = match self.wake_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Wake lock poisoned; continuing");
                poisoned.into_inner()
            }
        };
        if let Err(e) = self
            .wake
            .wait_timeout_while(guard, self.tick, |_| self.running.load(Ordering::Acquire))
        {
            warn!("Tick wait interrupted: {}; continuing", e);
        }
    }

    /// Create or truncate the side file and write the fixed text. The file is
    /// closed when this returns.
    fn write_side_file(&self) -> io::Result<()> {
        let mut file = File::create(&self.side_file)?;
        file.write_all(SIDE_FILE_TEXT.as_bytes())?;
        file.flush()
    }

    fn emit(&self, line: impl fmt::Display) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{}", line).and_then(|()| out.flush()) {
            warn!("Failed to write service output: {}", e);
        }
    }
}

/// The process-wide service on standard output. The console is switched to
/// UTF-8, and diagnostics routed to standard error unless the host already
/// installed a logger, before the instance is first handed out.
pub fn process_service() -> &'static Service {
    PROCESS_SERVICE.get_or_init(|| {
        // Err means a logger is already set; keep the host's.
        let _ = logging::init_stderr();
        console::ensure_utf8_output();
        Service::new(io::stdout())
    })
}

/// Run the process-wide service. See [`Service::run`].
pub fn run<S: AsRef<str>>(args: &[S]) {
    process_service().run(args);
}

/// Stop the process-wide service. See [`Service::on_stop`].
pub fn on_stop() {
    process_service().on_stop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn output(service: &Service<Vec<u8>>) -> String {
        String::from_utf8(service.out.lock().unwrap().clone()).unwrap()
    }

    #[test]
    fn new_service_is_not_running() {
        let service = Service::new(Vec::new());
        assert!(!service.is_running());
        assert_eq!(service.side_file, Path::new(SIDE_FILE_NAME));
    }

    #[test]
    fn on_stop_emits_two_lines_and_lowers_flag() {
        let service = Service::new(Vec::new());
        service.running.store(true, Ordering::Release);

        service.on_stop();

        assert!(!service.is_running());
        assert_eq!(output(&service), "A stop signal received.\nRequesting a stop.\n");
    }

    #[test]
    fn pause_returns_immediately_when_stopped() {
        let mut service = Service::new(Vec::new());
        service.tick = Duration::from_secs(10);

        let started = Instant::now();
        service.pause();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn on_stop_wakes_a_pending_pause() {
        let mut service = Service::new(Vec::new());
        service.tick = Duration::from_secs(10);
        service.running.store(true, Ordering::Release);
        let service = Arc::new(service);

        let waiter = {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                let started = Instant::now();
                service.pause();
                started.elapsed()
            })
        };

        thread::sleep(Duration::from_millis(50));
        service.on_stop();

        let waited = waiter.join().unwrap();
        assert!(waited < Duration::from_secs(5), "pause was not woken: {:?}", waited);
    }

    #[test]
    fn side_file_is_truncated_and_holds_exact_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SIDE_FILE_NAME);
        let stale = "stale content that is longer than the new text, by quite a bit";
        std::fs::write(&path, stale).unwrap();

        let service = Service::new(Vec::new()).with_side_file(&path);
        service.write_side_file().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), SIDE_FILE_TEXT.as_bytes());
    }

    #[test]
    fn side_file_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let service = Service::new(Vec::new()).with_side_file(dir.path());
        assert!(service.write_side_file().is_err());
    }

    #[test]
    fn emit_writes_one_line() {
        let service = Service::new(Vec::new());
        service.emit(format_args!("{}{}", COUNTER_PREFIX, 7));
        assert_eq!(output(&service), "Hello service counter: 7\n");
    }
}
