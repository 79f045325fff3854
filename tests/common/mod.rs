//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Cloneable in-memory output sink standing in for the host's captured stdout.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("service output is not UTF-8")
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    /// Poll until `line` has been written, or panic after `timeout`.
    pub fn wait_for_line(&self, line: &str, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while !self.lines().iter().any(|l| l == line) {
            assert!(Instant::now() < deadline, "timed out waiting for {:?}", line);
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Parse `Hello service counter: N` lines in order, skipping anything else.
pub fn counters(lines: &[String]) -> Vec<u64> {
    lines
        .iter()
        .filter_map(|l| l.strip_prefix("Hello service counter: "))
        .map(|n| n.parse().expect("counter is not a number"))
        .collect()
}

pub fn assert_contiguous_from_zero(counters: &[u64]) {
    for (expected, actual) in counters.iter().enumerate() {
        assert_eq!(*actual, expected as u64, "counter gap in {:?}", counters);
    }
}
