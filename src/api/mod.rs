// API module entry
// Registers the built-in versioned handlers into the route table

mod v1;

use crate::handler::define_handler;
use crate::routing::RouteTable;

/// Route table served under `/api`
pub fn routes() -> RouteTable {
    RouteTable::builder()
        .route("v1", "ping", define_handler(v1::ping))
        .route("v1", "health", define_handler(v1::health))
        .route("v1", "version", define_handler(v1::version))
        .route("v1", "echo", define_handler(v1::echo))
        .build()
}
