//! Routing module
//!
//! Decomposes request paths into route keys and looks them up in the
//! versioned handler table.

mod key;
mod table;

pub use key::{RouteKey, API_NAMESPACE};
pub use table::{RouteTable, RouteTableBuilder};
