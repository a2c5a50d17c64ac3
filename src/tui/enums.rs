//! Enumerations for TUI state management.

use crate::fields::ItemId;

/// Which screen or popup has the keyboard.
#[derive(Clone, Debug, PartialEq)]
pub enum BoardState {
    Board,
    TaskDetail,
    AddTask,
    ColumnForm(ColumnFormMode),
    ConfirmDelete(ItemId),
    Help,
}

/// Whether the column form creates a new status or renames one.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnFormMode {
    Create,
    Rename(ItemId),
}

/// Input device driving the current gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragInput {
    Keyboard,
    Mouse,
}
