//! Task data structure and the request bodies derived from it.
//!
//! A `Task` belongs to exactly one column through `column_id` (the backend calls
//! this `statusId`). Every other field is payload: the drag engine carries it
//! around without looking at it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields::ItemId;

/// A unit of work on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: ItemId,
    #[serde(rename = "statusId", alias = "columnId")]
    pub column_id: ItemId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority_id: Option<ItemId>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Fields the board does not interpret (list id, activities, labels, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Create a task with only the fields the board needs.
    pub fn new(id: impl Into<ItemId>, column_id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            column_id: column_id.into(),
            title: title.into(),
            description: String::new(),
            priority_id: None,
            due_date: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Calendar part of the due date, if the backend sent a parseable one.
    ///
    /// Accepts `YYYY-MM-DD` optionally followed by a time component.
    pub fn due(&self) -> Option<NaiveDate> {
        let raw = self.due_date.as_deref()?;
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }
}

/// Body of `POST /TaskCard`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    #[serde(rename = "statusId")]
    pub column_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_board_id: Option<String>,
}

/// Body of `PUT /TaskCard/{id}`.
///
/// The backend replaces the editable fields wholesale, so a status change
/// still sends the title, description, priority and due date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: String,
    pub description: String,
    pub priority_id: Option<ItemId>,
    pub due_date: Option<String>,
    pub status_id: ItemId,
}

impl From<&Task> for TaskUpdate {
    fn from(task: &Task) -> Self {
        TaskUpdate {
            title: task.title.clone(),
            description: task.description.clone(),
            priority_id: task.priority_id.clone(),
            due_date: task.due_date.clone(),
            status_id: task.column_id.clone(),
        }
    }
}
