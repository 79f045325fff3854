//! SvcHostify sample host: Windows service and CLI modes.
//! - Run by Service Control Manager: runs as a Windows service (service mode).
//! - Run from command line: runs the service until Ctrl+C or a `stop` line on stdin (CLI mode).

use log::info;
use std::io::{self, BufRead};
use std::thread;

#[cfg(windows)]
use std::ffi::OsString;
#[cfg(windows)]
use std::sync::{Arc, OnceLock};
#[cfg(windows)]
use windows_service::{
    define_windows_service,
    service::{
        ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState, ServiceStatus,
    },
    service_control_handler::{self, ServiceControlHandlerResult},
    service_dispatcher,
};

#[cfg(windows)]
const SERVICE_NAME: &str = "svchostify-sample";
#[cfg(windows)]
const SERVICE_TYPE: windows_service::service::ServiceType =
    windows_service::service::ServiceType::OWN_PROCESS;

/// Line on standard input that requests a stop in CLI mode.
const STOP_COMMAND: &str = "stop";

/// CLI mode: run the service until Ctrl+C or `stop` on stdin.
fn run_cli() -> io::Result<()> {
    if let Err(e) = svchostify_sample::logging::init_stderr() {
        eprintln!("Failed to init logging: {}", e);
        return Err(io::Error::new(io::ErrorKind::Other, e));
    }
    svchostify_sample::console::ensure_utf8_output();
    info!("Running in CLI mode (press Ctrl+C or type '{}' to stop)", STOP_COMMAND);

    ctrlc::set_handler(svchostify_sample::on_stop)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    // Detached: a blocked stdin read must not keep the process alive.
    thread::spawn(watch_stdin);

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let worker = thread::spawn(move || svchostify_sample::run(&args));
    worker.join().map_err(|_| io::Error::new(io::ErrorKind::Other, "worker panicked"))?;

    info!("CLI mode finished");
    Ok(())
}

/// Request a stop on the first `stop` line. EOF (no attached stdin) is ignored.
fn watch_stdin() {
    for line in io::stdin().lock().lines() {
        match line {
            Ok(line) if line.trim() == STOP_COMMAND => {
                svchostify_sample::on_stop();
                return;
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("Failed to read stdin: {}", e);
                return;
            }
        }
    }
}

#[cfg(windows)]
fn run_windows_service() -> windows_service::Result<()> {
    service_dispatcher::start(SERVICE_NAME, ffi_service_main)
}

#[cfg(windows)]
define_windows_service!(ffi_service_main, my_service_main);

#[cfg(windows)]
fn my_service_main(arguments: Vec<OsString>) {
    if let Err(e) = svchostify_sample::logging::init_file() {
        eprintln!("Failed to init service logging: {}", e);
        return;
    }
    info!("Service entry point started");

    if let Err(e) = run_service(arguments) {
        log::error!("Service error: {}", e);
    }
}

#[cfg(windows)]
fn run_service(arguments: Vec<OsString>) -> windows_service::Result<()> {
    // Share the status handle with the event handler via OnceLock (set after register).
    let status_handle_cell: Arc<OnceLock<service_control_handler::ServiceStatusHandle>> =
        Arc::new(OnceLock::new());
    let status_handle_for_handler = Arc::clone(&status_handle_cell);

    let event_handler = move |control_event| -> ServiceControlHandlerResult {
        match control_event {
            ServiceControl::Interrogate => ServiceControlHandlerResult::NoError,
            ServiceControl::Stop => {
                // Report STOP_PENDING so SCM (and `net stop`) waits for the loop to exit.
                if let Some(handle) = status_handle_for_handler.get() {
                    let _ = handle.set_service_status(ServiceStatus {
                        service_type: SERVICE_TYPE,
                        current_state: ServiceState::StopPending,
                        controls_accepted: ServiceControlAccept::empty(),
                        exit_code: ServiceExitCode::Win32(0),
                        checkpoint: 0,
                        wait_hint: std::time::Duration::from_secs(5),
                        process_id: None,
                    });
                }
                svchostify_sample::on_stop();
                ServiceControlHandlerResult::NoError
            }
            _ => ServiceControlHandlerResult::NotImplemented,
        }
    };

    let status_handle = service_control_handler::register(SERVICE_NAME, event_handler)?;
    let _ = status_handle_cell.set(status_handle);

    status_handle.set_service_status(ServiceStatus {
        service_type: SERVICE_TYPE,
        current_state: ServiceState::Running,
        controls_accepted: ServiceControlAccept::STOP,
        exit_code: ServiceExitCode::Win32(0),
        checkpoint: 0,
        wait_hint: std::time::Duration::default(),
        process_id: None,
    })?;

    // The first argument is the service name.
    let args: Vec<String> = arguments
        .iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let worker = thread::spawn(move || svchostify_sample::run(&args));
    if worker.join().is_err() {
        log::error!("Service run thread panicked");
    }

    status_handle.set_service_status(ServiceStatus {
        service_type: SERVICE_TYPE,
        current_state: ServiceState::Stopped,
        controls_accepted: ServiceControlAccept::empty(),
        exit_code: ServiceExitCode::Win32(0),
        checkpoint: 0,
        wait_hint: std::time::Duration::default(),
        process_id: None,
    })?;

    Ok(())
}

fn main() {
    #[cfg(windows)]
    {
        if run_windows_service().is_ok() {
            return;
        }
    }

    if let Err(e) = run_cli() {
        eprintln!("CLI mode error: {}", e);
        std::process::exit(1);
    }
}
