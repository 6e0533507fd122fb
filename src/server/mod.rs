// Server module entry
// Listener creation, connection serving and the accept loop

mod accept;
mod connection;
mod listener;

pub use accept::{serve, ServerOptions};
pub use listener::create_reusable_listener;
