//! Drag-and-drop engine for the board.
//!
//! Input surfaces (keyboard, mouse, anything else) describe a gesture with
//! four calls on [`DragSink`]: start, hover, drop and cancel. Each element taking
//! part in a gesture is a [`Draggable`]: an id plus the data it was tagged
//! with when it was rendered. The engine never looks at toolkit event types.

pub mod controller;
pub mod reconcile;
pub mod session;
pub mod sync;

use crate::fields::{Column, ItemId, ItemKind};
use crate::task::Task;

/// What a draggable element says it is, captured when it was rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum DragData {
    Column(Column),
    Task(Task),
}

impl DragData {
    pub fn kind(&self) -> ItemKind {
        match self {
            DragData::Column(_) => ItemKind::Column,
            DragData::Task(_) => ItemKind::Task,
        }
    }
}

/// An element taking part in a gesture, either the one being dragged or the
/// one under the pointer.
///
/// `data` is `None` when the element carries no usable drag metadata; such
/// events are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct Draggable {
    pub id: ItemId,
    pub data: Option<DragData>,
}

impl Draggable {
    pub fn task(task: &Task) -> Self {
        Draggable {
            id: task.id.clone(),
            data: Some(DragData::Task(task.clone())),
        }
    }

    pub fn column(column: &Column) -> Self {
        Draggable {
            id: column.id.clone(),
            data: Some(DragData::Column(column.clone())),
        }
    }

    pub fn kind(&self) -> Option<ItemKind> {
        self.data.as_ref().map(DragData::kind)
    }
}

/// A hover or drop: the dragged element and whatever is under it.
#[derive(Debug, Clone, PartialEq)]
pub struct DragEvent {
    pub active: Draggable,
    pub over: Option<Draggable>,
}

impl DragEvent {
    pub fn new(active: Draggable, over: Option<Draggable>) -> Self {
        DragEvent { active, over }
    }
}

/// Receiver of drag gestures.
///
/// Every method returns the status text for assistive output, or `None` when
/// there is nothing to announce.
pub trait DragSink {
    fn drag_start(&mut self, active: Draggable) -> Option<String>;
    fn drag_over(&mut self, event: DragEvent) -> Option<String>;
    fn drag_end(&mut self, event: DragEvent) -> Option<String>;
    fn drag_cancel(&mut self, active: Draggable) -> Option<String>;
}
