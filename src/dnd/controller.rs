//! Ties the session, the reconciler and the sync adapter to one board.

use tracing::{debug, info};

use crate::db::Board;
use crate::dnd::reconcile::{self, Reconciled};
use crate::dnd::session::DragSession;
use crate::dnd::sync::RemoteSync;
use crate::dnd::{DragEvent, DragSink, Draggable};

/// Owns the board while gestures run against it.
pub struct DragController {
    board: Board,
    session: DragSession,
    sync: RemoteSync,
}

impl DragController {
    pub fn new(board: Board, sync: RemoteSync) -> Self {
        Self {
            board,
            session: DragSession::Idle,
            sync,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Direct access for edits made outside a gesture (create, rename, refetch).
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    pub fn sync_mut(&mut self) -> &mut RemoteSync {
        &mut self.sync
    }

    fn apply(&mut self, change: Reconciled) {
        match change {
            Reconciled::Columns(columns) => {
                debug!(count = columns.len(), "column order replaced");
                self.board.replace_columns(columns);
            }
            Reconciled::Tasks { tasks, recolumned } => {
                self.board.replace_tasks(tasks);
                let Some(id) = recolumned else {
                    return;
                };
                if let Some(task) = self.board.task(&id) {
                    info!(task_id = %id, column_id = %task.column_id, "task moved to another column");
                    self.sync.push(task);
                }
            }
        }
    }
}

fn log_announcement(announcement: &Option<String>) {
    if let Some(text) = announcement {
        debug!(announcement = %text);
    }
}

impl DragSink for DragController {
    fn drag_start(&mut self, active: Draggable) -> Option<String> {
        if !self.session.start(&active) {
            debug!(id = %active.id, "drag start ignored");
            return None;
        }
        let announcement = self.session.announce_start(&self.board, &active);
        log_announcement(&announcement);
        announcement
    }

    fn drag_over(&mut self, event: DragEvent) -> Option<String> {
        if !self.session.is_dragging() {
            return None;
        }
        let announcement = self.session.announce_over(&self.board, &event);
        log_announcement(&announcement);
        if let Some(change) = reconcile::drag_over(&self.board, &event) {
            self.apply(change);
        }
        announcement
    }

    fn drag_end(&mut self, event: DragEvent) -> Option<String> {
        if !self.session.is_dragging() {
            return None;
        }
        let announcement = self.session.announce_end(&self.board, &event);
        log_announcement(&announcement);
        if let Some(change) = reconcile::drag_end(&self.board, &event) {
            self.apply(change);
        }
        self.session.clear();
        announcement
    }

    fn drag_cancel(&mut self, active: Draggable) -> Option<String> {
        self.session.clear();
        let announcement = DragSession::announce_cancel(&active);
        log_announcement(&announcement);
        announcement
    }
}
