//! Collection reconciler: next task and column order for a hover or a drop.
//!
//! Nothing here mutates the board. Each function reads the current
//! collections and, when the event changes anything, returns a complete
//! replacement collection for the caller to swap in.

use tracing::debug;

use crate::db::Board;
use crate::dnd::{DragData, DragEvent, Draggable};
use crate::fields::ItemId;

/// A replacement collection produced by one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Columns(Vec<crate::fields::Column>),
    Tasks {
        tasks: Vec<crate::task::Task>,
        /// Task whose column changed, if any; this is what gets synced.
        recolumned: Option<ItemId>,
    },
}

/// Move one element to a new index, shifting the ones in between.
///
/// Same semantics as removing at `from` and inserting at `to` in the
/// shortened list; this is not a swap. A `to` past the end appends.
pub fn array_move<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = items.to_vec();
    if from >= out.len() {
        return out;
    }
    let item = out.remove(from);
    let to = to.min(out.len());
    out.insert(to, item);
    out
}

/// Live update while the pointer moves. Only dragged tasks reorder here.
pub fn drag_over(board: &Board, event: &DragEvent) -> Option<Reconciled> {
    let (active, over) = usable(event)?;
    match (active.data.as_ref()?, over.data.as_ref()?) {
        (DragData::Task(_), DragData::Task(_)) => task_over_task(board, &active.id, &over.id),
        (DragData::Task(_), DragData::Column(_)) => task_over_column(board, &active.id, &over.id),
        _ => None,
    }
}

/// Final commit on release.
pub fn drag_end(board: &Board, event: &DragEvent) -> Option<Reconciled> {
    let (active, over) = usable(event)?;
    match active.data.as_ref()? {
        DragData::Column(_) => column_over_column(board, &active.id, &over.id),
        DragData::Task(_) => task_over_task(board, &active.id, &over.id),
    }
}

/// Both ends present, distinct, and carrying drag metadata.
fn usable(event: &DragEvent) -> Option<(&Draggable, &Draggable)> {
    let over = event.over.as_ref()?;
    if event.active.id == over.id {
        return None;
    }
    if event.active.data.is_none() || over.data.is_none() {
        debug!(active = %event.active.id, over = %over.id, "ignoring drag event without metadata");
        return None;
    }
    Some((&event.active, over))
}

fn column_over_column(board: &Board, active_id: &ItemId, over_id: &ItemId) -> Option<Reconciled> {
    let from = board.column_index(active_id)?;
    let to = board.column_index(over_id)?;
    if from == to {
        return None;
    }
    Some(Reconciled::Columns(array_move(board.columns(), from, to)))
}

fn task_over_task(board: &Board, active_id: &ItemId, over_id: &ItemId) -> Option<Reconciled> {
    let from = board.task_index(active_id)?;
    let over = board.task_index(over_id)?;
    let tasks = board.tasks();
    let destination_column = &tasks[over].column_id;

    if tasks[from].column_id == *destination_column {
        return Some(Reconciled::Tasks {
            tasks: array_move(tasks, from, over),
            recolumned: None,
        });
    }

    // Entering another column lands the task just before the hovered one.
    // Hovering the head of the sequence wraps the target to the last slot.
    let to = over.checked_sub(1).unwrap_or(tasks.len() - 1);
    let mut moved = tasks.to_vec();
    moved[from].column_id = destination_column.clone();
    Some(Reconciled::Tasks {
        tasks: array_move(&moved, from, to),
        recolumned: Some(active_id.clone()),
    })
}

fn task_over_column(board: &Board, active_id: &ItemId, column_id: &ItemId) -> Option<Reconciled> {
    let index = board.task_index(active_id)?;
    board.column(column_id)?;

    let mut tasks = board.tasks().to_vec();
    let changed = tasks[index].column_id != *column_id;
    tasks[index].column_id = column_id.clone();
    Some(Reconciled::Tasks {
        tasks: array_move(&tasks, index, index),
        recolumned: changed.then(|| active_id.clone()),
    })
}
