// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::{LoggingConfig, PerformanceConfig};
use crate::dispatch::Dispatcher;
use crate::logger;

/// Connection-level behavior of the server loop
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub keep_alive: bool,
    pub connection_timeout: Duration,
    pub max_connections: Option<usize>,
    pub log_connections: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            keep_alive: true,
            connection_timeout: Duration::from_secs(30),
            max_connections: None,
            log_connections: false,
        }
    }
}

impl ServerOptions {
    pub fn from_config(performance: &PerformanceConfig, logging: &LoggingConfig) -> Self {
        Self {
            keep_alive: performance.keep_alive,
            connection_timeout: Duration::from_secs(performance.connection_timeout),
            max_connections: performance
                .max_connections
                .map(|max| usize::try_from(max).unwrap_or(usize::MAX)),
            log_connections: logging.access_log,
        }
    }
}

/// Accept loop
///
/// Connections are served with `spawn_local`, so this must run inside a
/// `tokio::task::LocalSet`. In-flight connections keep running after
/// `shutdown` resolves; only accepting stops.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    options: ServerOptions,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &dispatcher,
                            &active_connections,
                            &options,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => {
                logger::log_shutdown();
                return Ok(());
            }
        }
    }
}
