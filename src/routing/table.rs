//! Versioned route table
//!
//! Built once through [`RouteTableBuilder`]; the finished table has no
//! mutation API and is shared by reference with the dispatcher.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::RouteKey;
use crate::handler::Handler;

/// `version -> subpath -> handler`
#[derive(Default, Clone)]
pub struct RouteTable {
    versions: HashMap<String, HashMap<String, Arc<dyn Handler>>>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Handler registered for `key`, if any
    pub fn lookup(&self, key: &RouteKey<'_>) -> Option<&Arc<dyn Handler>> {
        self.versions.get(key.version)?.get(key.subpath)
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Number of registered `(version, subpath)` pairs
    pub fn len(&self) -> usize {
        self.versions.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<String> = self
            .versions
            .iter()
            .flat_map(|(version, paths)| paths.keys().map(move |p| format!("{version}/{p}")))
            .collect();
        routes.sort();
        f.debug_struct("RouteTable").field("routes", &routes).finish()
    }
}

/// Collects handler registrations before the table is frozen
#[derive(Default)]
pub struct RouteTableBuilder {
    versions: HashMap<String, HashMap<String, Arc<dyn Handler>>>,
}

impl RouteTableBuilder {
    /// Register `handler` for `GET /api/<version>/<subpath>`
    ///
    /// Registering the same pair twice keeps the last handler.
    #[must_use]
    pub fn route(
        mut self,
        version: impl Into<String>,
        subpath: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Self {
        self.versions
            .entry(version.into())
            .or_default()
            .insert(subpath.into(), Arc::new(handler));
        self
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            versions: self.versions,
        }
    }
}
