//! Route table: every permitted (table, verb) pair expanded into path templates, computed once at boot.

use crate::config::{Registry, TableDescriptor, Verb};
use crate::sql::Operation;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

/// First path segments taken by the operational routes.
pub const RESERVED_SEGMENTS: [&str; 3] = ["tables", "routes", "verbose"];

/// One bound endpoint: method and path template resolved to an operation on one table.
#[derive(Clone, Debug)]
pub struct RouteEntry {
    pub verb: Verb,
    pub path: String,
    pub operation: Operation,
    pub table: Arc<TableDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BoundRoute {
    pub method: String,
    pub path: String,
}

#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    prefix: String,
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn tables_path(&self) -> String {
        format!("{}/tables", self.prefix)
    }

    pub fn routes_path(&self) -> String {
        format!("{}/routes", self.prefix)
    }

    pub fn verbose_path(&self) -> String {
        format!("{}/verbose/:status", self.prefix)
    }

    /// Every bound method and path, operational routes first.
    pub fn bound(&self) -> Vec<BoundRoute> {
        let operational = [self.tables_path(), self.routes_path(), self.verbose_path()]
            .into_iter()
            .map(|path| BoundRoute {
                method: "GET".into(),
                path,
            });
        operational
            .chain(self.entries.iter().map(|e| BoundRoute {
                method: e.verb.http_method().as_str().to_string(),
                path: e.path.clone(),
            }))
            .collect()
    }

    /// Whether `method path` (template form) is bound to a table operation.
    pub fn contains(&self, verb: Verb, path: &str) -> bool {
        self.entries.iter().any(|e| e.verb == verb && e.path == path)
    }
}

fn routable_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_~-][A-Za-z0-9_.~-]*$").expect("Invalid regex pattern"))
}

/// Expand the registry into the route table. `prefix` must already be normalized.
pub fn synthesize(registry: &Registry, prefix: &str) -> RouteTable {
    let mut entries = Vec::new();
    let mut claimed: HashSet<&str> = HashSet::new();

    for table in registry.tables() {
        let name = table.public_name();
        if !routable_name().is_match(name) {
            tracing::warn!(table = %table.name, name = %name, "name is not a plain path segment, no routes bound");
            continue;
        }
        if RESERVED_SEGMENTS.contains(&name) {
            tracing::warn!(table = %table.name, name = %name, "name collides with an operational route, no routes bound");
            continue;
        }
        if !claimed.insert(name) {
            tracing::warn!(table = %table.name, name = %name, "name already bound by another relation, no routes bound");
            continue;
        }

        let base = format!("{}/{}", prefix, name);
        let mut push = |operation: Operation, path: String| {
            entries.push(RouteEntry {
                verb: operation.verb(),
                path,
                operation,
                table: Arc::clone(table),
            });
        };

        if table.allows(Verb::Create) {
            push(Operation::Create, base.clone());
        }
        if table.allows(Verb::Read) {
            push(Operation::ReadAll, base.clone());
            push(Operation::Describe, format!("{}/describe", base));
            push(Operation::Status, format!("{}/status", base));
            push(Operation::ReadAll, format!("{}/order/:column/:order", base));
            push(Operation::ReadAll, format!("{}/limit/:limit", base));
            push(Operation::ReadAll, format!("{}/order/:column/:order/limit/:limit", base));
            push(Operation::ReadByKey, format!("{}/:key/:id", base));
            let search = format!("{}/search/:key/:id", base);
            push(Operation::Search, format!("{}/order/:column/:order", search));
            push(Operation::Search, format!("{}/limit/:limit", search));
            push(Operation::Search, format!("{}/order/:column/:order/limit/:limit", search));
            push(Operation::Search, search);
        }
        if table.allows(Verb::Update) {
            push(Operation::Update, format!("{}/:key/:id", base));
        }
        if table.allows(Verb::Delete) {
            push(Operation::Delete, format!("{}/:key/:id", base));
        }
    }

    RouteTable {
        prefix: prefix.to_string(),
        entries,
    }
}
