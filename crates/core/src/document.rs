// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Documents and equality filters exchanged with the shared store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field every stored document is keyed on
pub const ID_FIELD: &str = "id";

/// A stored record: a JSON object with a unique `id` field
pub type Document = Map<String, Value>;

/// Equality filter over document fields
///
/// A document matches when it has every field of the filter with an equal
/// value. The empty filter matches every document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Document);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching the document with the given id
    pub fn by_id(id: impl Into<Value>) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    /// Add an equality constraint
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Document> for Filter {
    fn from(fields: Document) -> Self {
        Self(fields)
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}
