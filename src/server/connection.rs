// Connection handling module
// Serves a single TCP connection with the dispatcher

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Response;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;

use super::ServerOptions;
use crate::dispatch::Dispatcher;
use crate::logger;

/// Accept a connection, enforcing the connection limit.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `dispatcher` - Shared request dispatcher
/// * `conn_counter` - Active connection counter
/// * `options` - Connection limits and timeouts
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    dispatcher: &Arc<Dispatcher>,
    conn_counter: &Arc<AtomicUsize>,
    options: &ServerOptions,
) {
    // Increment first, then check, so concurrent accepts cannot both pass
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = options.max_connections {
        if prev_count >= max_conn {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    if options.log_connections {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(
        stream,
        Arc::clone(dispatcher),
        Arc::clone(conn_counter),
        options.clone(),
    );
}

/// Serve one connection in a local task
///
/// The whole connection, including keep-alive reuse, is bounded by
/// `options.connection_timeout`. The counter is decremented when it ends.
fn handle_connection(
    stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
    conn_counter: Arc<AtomicUsize>,
    options: ServerOptions,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(options.keep_alive);

        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let dispatcher = Arc::clone(&dispatcher);
                async move { Ok::<Response<Full<Bytes>>, Infallible>(dispatcher.dispatch(req).await) }
            }),
        );

        match tokio::time::timeout(options.connection_timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection timeout after {} seconds",
                    options.connection_timeout.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
