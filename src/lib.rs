//! SvcHostify sample service: `run` / `on_stop` entry points with a cooperative stop.

pub mod console;
pub mod ffi;
pub mod logging;
pub mod service;

pub use service::{on_stop, run, Service};
