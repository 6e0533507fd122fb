//! Logger module
//!
//! Provides logging utilities for the dispatcher including:
//! - Server lifecycle logging
//! - Request and access logging in several formats
//! - Handler failure, error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::{AccessLogEntry, AccessLogFormat};

use crate::config::{Config, LoggingConfig};
use crate::handler::HandlerError;
use crate::routing::RouteTable;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    writer::init(
        config.access_log_file.as_deref(),
        config.error_log_file.as_deref(),
    )
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, routes: &RouteTable) {
    writer::write_access("======================================");
    writer::write_access("Dispatcher started successfully");
    writer::write_access(&format!("Listening on: http://{addr}"));
    if config.assets.enabled {
        writer::write_access(&format!("Static assets: {}", config.assets.dir));
    } else {
        writer::write_access("Static assets: disabled");
    }
    let mut versions: Vec<&str> = routes.versions().collect();
    versions.sort_unstable();
    writer::write_access(&format!(
        "API routes: {} ({})",
        routes.len(),
        versions.join(", ")
    ));
    if let Some(workers) = config.server.workers {
        writer::write_access(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        writer::write_access(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        writer::write_access(&format!("Error log: {path}"));
    }
    writer::write_access("======================================\n");
}

pub fn log_shutdown() {
    writer::write_access("[Shutdown] Stopped accepting connections");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    writer::write_access(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    writer::write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    writer::write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    writer::write_error(&format!("[WARN] {message}"));
}

pub fn log_handler_error(err: &HandlerError) {
    writer::write_error(&format!("[ERROR] handler error: {err}"));
}

/// Request entering API routing
pub fn log_request(method: &str, url: &str) {
    writer::write_access(&format!("REQUEST {method} {url}"));
}

pub fn log_access(entry: &AccessLogEntry, format: &AccessLogFormat) {
    writer::write_access(&entry.format(format));
}
