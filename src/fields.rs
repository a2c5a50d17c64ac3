//! Identifiers and small entity types shared across the board.
//!
//! This module defines the opaque identifier used for tasks and columns, the
//! `Column` status lane, priorities, and the kind tag carried by draggable items.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a task or a column.
///
/// The backend hands out GUID strings, but older endpoints return integers;
/// both deserialize into the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId")]
pub struct ItemId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for ItemId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => ItemId(s),
            RawId::Number(n) => ItemId(n.to_string()),
        }
    }
}

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        ItemId(n.to_string())
    }
}

/// A named status lane. Column order on the board is left-to-right display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ItemId,
    #[serde(alias = "name")]
    pub title: String,
}

impl Column {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Column {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// A priority level as defined by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub id: ItemId,
    pub name: String,
}

/// What kind of entity a draggable element represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Column,
    Task,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Column => f.write_str("Column"),
            ItemKind::Task => f.write_str("Task"),
        }
    }
}
