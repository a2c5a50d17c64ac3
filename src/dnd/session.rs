//! Drag session state machine and accessibility announcements.
//!
//! A session is `Idle` until a drag starts, then remembers the single active
//! item (and, for tasks, the column the gesture started in) until the drag
//! ends or is cancelled. Announcements are derived from the board on every
//! event; nothing about them is stored.

use crate::db::Board;
use crate::dnd::{DragData, DragEvent, Draggable};
use crate::fields::{Column, ItemId, ItemKind};
use crate::task::Task;

/// Current gesture state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragSession {
    #[default]
    Idle,
    DraggingColumn {
        column: Column,
    },
    DraggingTask {
        task: Task,
        origin_column: ItemId,
    },
}

/// Borrowed view of the item being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveItem<'a> {
    Column(&'a Column),
    Task(&'a Task),
}

impl DragSession {
    /// Enter a dragging state from `Idle`.
    ///
    /// Returns `false` and stays put when the element has no drag metadata or
    /// another item is already active.
    pub fn start(&mut self, active: &Draggable) -> bool {
        if self.is_dragging() {
            return false;
        }
        match &active.data {
            Some(DragData::Column(column)) => {
                *self = DragSession::DraggingColumn {
                    column: column.clone(),
                };
                true
            }
            Some(DragData::Task(task)) => {
                *self = DragSession::DraggingTask {
                    task: task.clone(),
                    origin_column: task.column_id.clone(),
                };
                true
            }
            None => false,
        }
    }

    /// Back to `Idle`, forgetting the active item and origin column.
    pub fn clear(&mut self) {
        *self = DragSession::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        !matches!(self, DragSession::Idle)
    }

    pub fn active_kind(&self) -> Option<ItemKind> {
        match self {
            DragSession::Idle => None,
            DragSession::DraggingColumn { .. } => Some(ItemKind::Column),
            DragSession::DraggingTask { .. } => Some(ItemKind::Task),
        }
    }

    pub fn active_item(&self) -> Option<ActiveItem<'_>> {
        match self {
            DragSession::Idle => None,
            DragSession::DraggingColumn { column } => Some(ActiveItem::Column(column)),
            DragSession::DraggingTask { task, .. } => Some(ActiveItem::Task(task)),
        }
    }

    pub fn active_id(&self) -> Option<&ItemId> {
        match self.active_item()? {
            ActiveItem::Column(column) => Some(&column.id),
            ActiveItem::Task(task) => Some(&task.id),
        }
    }

    /// Column a dragged task was picked up from.
    pub fn origin_column_id(&self) -> Option<&ItemId> {
        match self {
            DragSession::DraggingTask { origin_column, .. } => Some(origin_column),
            _ => None,
        }
    }

    /// "Picked up ..." text for a drag that just started.
    pub fn announce_start(&self, board: &Board, active: &Draggable) -> Option<String> {
        match active.data.as_ref()? {
            DragData::Column(_) => {
                let (index, column) = column_at(board, &active.id)?;
                Some(format!(
                    "Picked up Column {} at position: {} of {}",
                    column.title,
                    index + 1,
                    board.columns().len()
                ))
            }
            DragData::Task(task) => {
                let origin = self.origin_column_id().unwrap_or(&task.column_id);
                let (position, len, column) = task_slot(board, &active.id, origin)?;
                Some(format!(
                    "Picked up Task {} at position: {} of {} in column {}",
                    task.title,
                    position + 1,
                    len,
                    column.title
                ))
            }
        }
    }

    /// Hover text: where the active item would land.
    pub fn announce_over(&self, board: &Board, event: &DragEvent) -> Option<String> {
        let active = event.active.data.as_ref()?;
        let over = event.over.as_ref()?;
        match (active, over.data.as_ref()?) {
            (DragData::Column(active_column), DragData::Column(over_column)) => {
                let index = board.column_index(&over.id)?;
                Some(format!(
                    "Column {} was moved over {} at position {} of {}",
                    active_column.title,
                    over_column.title,
                    index + 1,
                    board.columns().len()
                ))
            }
            (DragData::Task(active_task), DragData::Task(over_task)) => {
                let (position, len, column) = task_slot(board, &over.id, &over_task.column_id)?;
                if Some(&over_task.column_id) != self.origin_column_id() {
                    return Some(format!(
                        "Task {} was moved over column {} in position {} of {}",
                        active_task.title,
                        column.title,
                        position + 1,
                        len
                    ));
                }
                Some(format!(
                    "Task was moved over position {} of {} in column {}",
                    position + 1,
                    len,
                    column.title
                ))
            }
            _ => None,
        }
    }

    /// Drop text: where the active item ended up.
    pub fn announce_end(&self, board: &Board, event: &DragEvent) -> Option<String> {
        let active = event.active.data.as_ref()?;
        let over = event.over.as_ref()?;
        match (active, over.data.as_ref()?) {
            (DragData::Column(active_column), DragData::Column(_)) => {
                let index = board.column_index(&over.id)?;
                Some(format!(
                    "Column {} was dropped into position {} of {}",
                    active_column.title,
                    index + 1,
                    board.columns().len()
                ))
            }
            (DragData::Task(_), DragData::Task(over_task)) => {
                let (position, len, column) = task_slot(board, &over.id, &over_task.column_id)?;
                if Some(&over_task.column_id) != self.origin_column_id() {
                    return Some(format!(
                        "Task was dropped into column {} in position {} of {}",
                        column.title,
                        position + 1,
                        len
                    ));
                }
                Some(format!(
                    "Task was dropped into position {} of {} in column {}",
                    position + 1,
                    len,
                    column.title
                ))
            }
            _ => None,
        }
    }

    pub fn announce_cancel(active: &Draggable) -> Option<String> {
        let kind = active.kind()?;
        Some(format!("Dragging {kind} cancelled."))
    }
}

fn column_at<'a>(board: &'a Board, id: &ItemId) -> Option<(usize, &'a Column)> {
    let index = board.column_index(id)?;
    Some((index, &board.columns()[index]))
}

/// Position of a task inside a column, the column's size, and the column.
fn task_slot<'a>(board: &'a Board, task_id: &ItemId, column_id: &ItemId) -> Option<(usize, usize, &'a Column)> {
    let column = board.column(column_id)?;
    let (position, len) = board.position_in_column(task_id, column_id)?;
    Some((position, len, column))
}
