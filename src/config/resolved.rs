//! Resolved table model: catalog relations annotated with alias and access policy.

use crate::config::{Access, Verb};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Arc;

/// Relation kind as reported by the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    Table,
    View,
}

impl TableKind {
    /// Maps `information_schema.tables.table_type`. Anything that is not a view is treated as a table.
    pub fn from_catalog(table_type: &str) -> Self {
        if table_type.eq_ignore_ascii_case("VIEW") {
            TableKind::View
        } else {
            TableKind::Table
        }
    }
}

impl Serialize for TableKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            TableKind::Table => "BASE TABLE",
            TableKind::View => "VIEW",
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TableDescriptor {
    #[serde(rename = "table_name")]
    pub name: String,
    #[serde(rename = "table_schema")]
    pub schema: String,
    #[serde(rename = "type")]
    pub kind: TableKind,
    pub primary_key: Vec<String>,
    /// Externally-facing name; empty means `name` is used in routes.
    pub alias: String,
    pub access: Access,
}

impl TableDescriptor {
    /// Name used in route paths.
    pub fn public_name(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }

    pub fn allows(&self, verb: Verb) -> bool {
        valid_route(self, verb)
    }
}

/// Whether an endpoint for `verb` may exist on this relation. Views only ever get READ.
pub fn valid_route(table: &TableDescriptor, verb: Verb) -> bool {
    match table.kind {
        TableKind::View => verb == Verb::Read,
        TableKind::Table => table.access.allows(verb),
    }
}

/// All descriptors discovered at boot, in catalog order. Immutable once built.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    tables: Vec<Arc<TableDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        let tables: Vec<Arc<TableDescriptor>> = tables.into_iter().map(Arc::new).collect();
        let by_name = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Registry { tables, by_name }
    }

    pub fn tables(&self) -> &[Arc<TableDescriptor>] {
        &self.tables
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TableDescriptor>> {
        self.by_name.get(name).map(|&i| &self.tables[i])
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
