//! Kanban board interface.
//!
//! Columns come from the backend's status list and are drawn left to right in
//! board order; each column shows the tasks filtered into it. Tasks and
//! columns can be dragged with the keyboard or the mouse. Every gesture goes
//! through [`DragSink`], so the board only translates input into pick-up,
//! hover, drop and cancel calls and shows whatever text comes back.

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::fetch_board;
use crate::cmd::Context;
use crate::db::{format_due_relative, truncate, Board};
use crate::dnd::controller::DragController;
use crate::dnd::sync::RemoteSync;
use crate::dnd::{DragEvent, DragSink, Draggable};
use crate::error::Result;
use crate::fields::{Column, ItemId, ItemKind};
use crate::task::Task;
use crate::tui::colors::{DARK_RED, DRAG_GHOST, DROP_TARGET, STATUS_BAR};
use crate::tui::enums::{BoardState, ColumnFormMode, DragInput};
use crate::tui::input::InputField;
use crate::tui::overlay::render_overlay;
use crate::tui::task_form::{ColumnForm, TaskForm, DESCRIPTION_ORDER, DUE_ORDER, PRIORITY_ORDER, TITLE_ORDER};
use crate::tui::utils::{centered_rect, contains, wrap_words};

const CARD_HEIGHT: u16 = 5;

const HELP_TEXT: &str = "Space: pick up task | m: pick up column | arrows: move (while dragging) | \
Space/Enter: drop | Esc: cancel drag | mouse: drag and release | a: add task | n: new column | \
r: rename column | x: delete task | Enter: details | g: refetch | h: help | q: quit";

/// Screen areas from the last frame, for mouse hit-testing.
#[derive(Debug, Default)]
struct Hitboxes {
    /// Column id, whole column area.
    columns: Vec<(ItemId, Rect)>,
    /// Task id, card area.
    cards: Vec<(ItemId, Rect)>,
}

impl Hitboxes {
    fn card_at(&self, x: u16, y: u16) -> Option<&ItemId> {
        self.cards.iter().find(|(_, r)| contains(*r, x, y)).map(|(id, _)| id)
    }

    fn column_at(&self, x: u16, y: u16) -> Option<&ItemId> {
        self.columns.iter().find(|(_, r)| contains(*r, x, y)).map(|(id, _)| id)
    }

    /// Only the title row of a column starts a column drag.
    fn column_header_at(&self, x: u16, y: u16) -> Option<&ItemId> {
        self.columns
            .iter()
            .find(|(_, r)| r.y == y && contains(*r, x, y))
            .map(|(id, _)| id)
    }

    fn area_of(&self, id: &ItemId) -> Option<Rect> {
        self.cards
            .iter()
            .chain(self.columns.iter())
            .find(|(i, _)| i == id)
            .map(|(_, r)| *r)
    }
}

/// Main board application state
pub struct BoardApp {
    ctx: Context,
    controller: DragController,
    state: BoardState,
    selected_column: usize,
    selected_card: usize,
    scroll_offsets: HashMap<ItemId, usize>,
    status_message: String,
    task_form: Option<TaskForm>,
    column_form: Option<ColumnForm>,
    /// Item picked up by the current gesture.
    active: Option<Draggable>,
    /// Item currently under the dragged one.
    hover: Option<Draggable>,
    drag_input: Option<DragInput>,
    pointer: Option<(u16, u16)>,
    hitboxes: Hitboxes,
}

impl BoardApp {
    /// Fetch the board and build the app around it.
    pub fn new(ctx: Context) -> Result<Self> {
        let board = ctx.fetch()?;
        let sync = RemoteSync::new(ctx.gateway.clone(), ctx.handle.clone());
        Ok(Self::with_board(ctx, board, sync))
    }

    fn with_board(ctx: Context, board: Board, sync: RemoteSync) -> Self {
        BoardApp {
            ctx,
            controller: DragController::new(board, sync),
            state: BoardState::Board,
            selected_column: 0,
            selected_card: 0,
            scroll_offsets: HashMap::new(),
            status_message: String::new(),
            task_form: None,
            column_form: None,
            active: None,
            hover: None,
            drag_input: None,
            pointer: None,
            hitboxes: Hitboxes::default(),
        }
    }

    pub fn board(&self) -> &Board {
        self.controller.board()
    }

    /// Status updates still on their way to the backend.
    pub fn take_pending_syncs(&mut self) -> Vec<JoinHandle<()>> {
        self.controller.sync_mut().take_in_flight()
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    fn announce(&mut self, announcement: Option<String>) {
        if let Some(text) = announcement {
            self.status_message = text;
        }
    }

    fn report_error(&mut self, action: &str, e: impl std::fmt::Display) {
        error!(error = %e, "{action} failed");
        self.set_status_message(format!("Error: {action} failed: {e}"));
    }

    fn selected_column_id(&self) -> Option<ItemId> {
        self.board().columns().get(self.selected_column).map(|c| c.id.clone())
    }

    fn column_tasks(&self, column_index: usize) -> Vec<&Task> {
        match self.board().columns().get(column_index) {
            Some(column) => self.board().tasks_in_column(&column.id).collect(),
            None => Vec::new(),
        }
    }

    fn selected_task(&self) -> Option<&Task> {
        self.column_tasks(self.selected_column).get(self.selected_card).copied()
    }

    /// Ensure selected column and card indices are valid
    fn clamp_selection(&mut self) {
        let columns = self.board().columns().len();
        if columns == 0 {
            self.selected_column = 0;
            self.selected_card = 0;
            return;
        }
        if self.selected_column >= columns {
            self.selected_column = columns - 1;
        }
        let len = self.column_tasks(self.selected_column).len();
        if len == 0 {
            self.selected_card = 0;
        } else if self.selected_card >= len {
            self.selected_card = len - 1;
        }
    }

    /// Column index and card index of a task, or the column index of a column.
    fn locate(&self, id: &ItemId) -> Option<(usize, usize)> {
        let board = self.board();
        if let Some(task) = board.task(id) {
            let column = board.column_index(&task.column_id)?;
            let (row, _) = board.position_in_column(id, &task.column_id)?;
            return Some((column, row));
        }
        board.column_index(id).map(|column| (column, 0))
    }

    fn select_item(&mut self, id: &ItemId) {
        if let Some((column, card)) = self.locate(id) {
            self.selected_column = column;
            self.selected_card = card;
        }
        self.clamp_selection();
    }

    // Gestures

    fn begin_drag(&mut self, active: Draggable, input: DragInput) {
        let announcement = self.controller.drag_start(active.clone());
        if !self.controller.session().is_dragging() {
            return;
        }
        self.announce(announcement);
        self.hover = (input == DragInput::Keyboard).then(|| active.clone());
        self.active = Some(active);
        self.drag_input = Some(input);
    }

    fn hover_over(&mut self, over: Option<Draggable>) {
        let Some(active) = self.active.clone() else {
            return;
        };
        if over.as_ref().map(|o| &o.id) == self.hover.as_ref().map(|h| &h.id) {
            return;
        }
        self.hover = over.clone();
        if over.is_some() {
            let announcement = self.controller.drag_over(DragEvent::new(active, over));
            self.announce(announcement);
        }
    }

    fn drop_active(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let over = self.hover.take();
        let announcement = self.controller.drag_end(DragEvent::new(active.clone(), over));
        self.announce(announcement);
        self.drag_input = None;
        self.select_item(&active.id);
    }

    fn cancel_drag(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.hover = None;
        self.drag_input = None;
        let announcement = self.controller.drag_cancel(active.clone());
        self.announce(announcement);
        self.select_item(&active.id);
    }

    /// After a keyboard hover, a dragged task already sits in the hovered
    /// slot, so it becomes its own target; a dropped column still needs the
    /// hovered column.
    fn settle_hover(&mut self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let id = match active.kind() {
            Some(ItemKind::Task) => {
                self.hover = self.board().task(&active.id).map(Draggable::task);
                active.id.clone()
            }
            _ => match self.hover.as_ref() {
                Some(hover) => hover.id.clone(),
                None => return,
            },
        };
        self.select_item(&id);
    }

    /// Hover target one step away from the current one.
    fn next_hover(&self, code: KeyCode) -> Option<Draggable> {
        let board = self.board();
        let active = self.active.as_ref()?;
        let hover = self.hover.as_ref()?;

        if active.kind()? == ItemKind::Column {
            let index = board.column_index(&hover.id)?;
            let next = match code {
                KeyCode::Left => index.checked_sub(1)?,
                KeyCode::Right => index + 1,
                _ => return None,
            };
            return board.columns().get(next).map(Draggable::column);
        }

        let (column_id, row) = match hover.kind()? {
            ItemKind::Task => {
                let task = board.task(&hover.id)?;
                let (row, _) = board.position_in_column(&task.id, &task.column_id)?;
                (task.column_id.clone(), Some(row))
            }
            ItemKind::Column => (hover.id.clone(), None),
        };

        match code {
            KeyCode::Up | KeyCode::Down => {
                let tasks: Vec<&Task> = board.tasks_in_column(&column_id).collect();
                let step: isize = if code == KeyCode::Down { 1 } else { -1 };
                let mut i = row.map(|r| r as isize).unwrap_or(-1);
                loop {
                    i += step;
                    if i < 0 || i as usize >= tasks.len() {
                        return None;
                    }
                    let task = tasks[i as usize];
                    if task.id != active.id {
                        return Some(Draggable::task(task));
                    }
                }
            }
            KeyCode::Left | KeyCode::Right => {
                let index = board.column_index(&column_id)?;
                let next = if code == KeyCode::Left {
                    index.checked_sub(1)?
                } else {
                    index + 1
                };
                let column = board.columns().get(next)?;
                let others: Vec<&Task> = board
                    .tasks_in_column(&column.id)
                    .filter(|t| t.id != active.id)
                    .collect();
                match others.len() {
                    0 => Some(Draggable::column(column)),
                    len => Some(Draggable::task(others[row.unwrap_or(0).min(len - 1)])),
                }
            }
            _ => None,
        }
    }

    /// What the pointer is over, as seen by the active item.
    fn target_at(&self, x: u16, y: u16) -> Option<Draggable> {
        let board = self.board();
        let active_kind = self.active.as_ref()?.kind()?;
        if let Some(id) = self.hitboxes.card_at(x, y) {
            let task = board.task(id)?;
            return match active_kind {
                ItemKind::Task => Some(Draggable::task(task)),
                ItemKind::Column => board.column(&task.column_id).map(Draggable::column),
            };
        }
        let id = self.hitboxes.column_at(x, y)?;
        board.column(id).map(Draggable::column)
    }

    // Input

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => return Ok(self.handle_key(key)),
                Event::Mouse(mouse) => self.handle_mouse(mouse),
                _ => {}
            }
        }
        Ok(false)
    }

    /// Apply one key press. Returns `true` when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        match self.state.clone() {
            BoardState::Board if self.active.is_some() => {
                self.handle_drag_key(key);
                false
            }
            BoardState::Board => self.handle_board_key(key),
            BoardState::TaskDetail => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                    self.state = BoardState::Board;
                }
                false
            }
            BoardState::Help => {
                self.state = BoardState::Board;
                false
            }
            BoardState::AddTask => {
                self.handle_task_form_key(key);
                false
            }
            BoardState::ColumnForm(mode) => {
                self.handle_column_form_key(key, mode);
                false
            }
            BoardState::ConfirmDelete(id) => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => {
                        self.delete_task(&id);
                        self.state = BoardState::Board;
                    }
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        self.set_status_message("Delete cancelled");
                        self.state = BoardState::Board;
                    }
                    _ => {}
                }
                false
            }
        }
    }

    fn handle_drag_key(&mut self, key: KeyEvent) {
        if self.drag_input != Some(DragInput::Keyboard) {
            if key.code == KeyCode::Esc {
                self.cancel_drag();
            }
            return;
        }
        match key.code {
            KeyCode::Esc => self.cancel_drag(),
            KeyCode::Char(' ') | KeyCode::Enter => self.drop_active(),
            KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right => {
                if let Some(next) = self.next_hover(key.code) {
                    self.hover_over(Some(next));
                    self.settle_hover();
                }
            }
            _ => {}
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) -> bool {
        self.status_message.clear();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left => {
                if self.selected_column > 0 {
                    self.selected_column -= 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Right => {
                if self.selected_column + 1 < self.board().columns().len() {
                    self.selected_column += 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Up => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Down => {
                let len = self.column_tasks(self.selected_column).len();
                if self.selected_card + 1 < len {
                    self.selected_card += 1;
                }
            }
            KeyCode::Char(' ') => match self.selected_task().map(Draggable::task) {
                Some(active) => self.begin_drag(active, DragInput::Keyboard),
                None => self.set_status_message("No task selected"),
            },
            KeyCode::Char('m') => {
                let column = self.board().columns().get(self.selected_column).map(Draggable::column);
                if let Some(active) = column {
                    self.begin_drag(active, DragInput::Keyboard);
                }
            }
            KeyCode::Enter => {
                if self.selected_task().is_some() {
                    self.state = BoardState::TaskDetail;
                }
            }
            KeyCode::Char('a') => {
                if self.board().columns().is_empty() {
                    self.set_status_message("Add a column first (n)");
                } else {
                    self.task_form = Some(TaskForm::new(self.board().priorities()));
                    self.state = BoardState::AddTask;
                }
            }
            KeyCode::Char('n') => {
                self.column_form = Some(ColumnForm::new(""));
                self.state = BoardState::ColumnForm(ColumnFormMode::Create);
            }
            KeyCode::Char('r') => {
                let current = self.board().columns().get(self.selected_column).cloned();
                if let Some(column) = current {
                    self.column_form = Some(ColumnForm::new(&column.title));
                    self.state = BoardState::ColumnForm(ColumnFormMode::Rename(column.id));
                }
            }
            KeyCode::Char('x') => {
                if let Some(id) = self.selected_task().map(|t| t.id.clone()) {
                    self.state = BoardState::ConfirmDelete(id);
                }
            }
            KeyCode::Char('g') => self.refetch(),
            KeyCode::Char('h') => self.state = BoardState::Help,
            _ => {}
        }
        false
    }

    /// Apply one mouse event.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (x, y) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.state != BoardState::Board || self.active.is_some() {
                    return;
                }
                let board = self.board();
                let picked = if let Some(task) = self.hitboxes.card_at(x, y).and_then(|id| board.task(id)) {
                    Some(Draggable::task(task))
                } else {
                    self.hitboxes
                        .column_header_at(x, y)
                        .and_then(|id| board.column(id))
                        .map(Draggable::column)
                };
                if let Some(active) = picked {
                    self.pointer = Some((x, y));
                    let id = active.id.clone();
                    self.select_item(&id);
                    self.begin_drag(active, DragInput::Mouse);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.drag_input != Some(DragInput::Mouse) {
                    return;
                }
                self.pointer = Some((x, y));
                let over = self.target_at(x, y);
                self.hover_over(over);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.drag_input != Some(DragInput::Mouse) {
                    return;
                }
                let over = self.target_at(x, y);
                if over.as_ref().map(|o| &o.id) == self.hover.as_ref().map(|h| &h.id) {
                    // Released on the target the last hover already applied.
                    self.settle_hover();
                } else {
                    self.hover = over;
                }
                self.pointer = None;
                self.drop_active();
            }
            _ => {}
        }
    }

    fn handle_task_form_key(&mut self, key: KeyEvent) {
        let Some(form) = self.task_form.as_mut() else {
            self.state = BoardState::Board;
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.task_form = None;
                self.state = BoardState::Board;
            }
            KeyCode::Enter => self.submit_task_form(),
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Left => form.handle_left_right(false),
            KeyCode::Right => form.handle_left_right(true),
            KeyCode::Backspace => form.handle_backspace(),
            KeyCode::Char(c) => form.handle_char(c),
            _ => {}
        }
    }

    fn handle_column_form_key(&mut self, key: KeyEvent, mode: ColumnFormMode) {
        let Some(form) = self.column_form.as_mut() else {
            self.state = BoardState::Board;
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.column_form = None;
                self.state = BoardState::Board;
            }
            KeyCode::Enter => self.submit_column_form(mode),
            KeyCode::Left => form.name.move_cursor_left(),
            KeyCode::Right => form.name.move_cursor_right(),
            KeyCode::Backspace => form.name.handle_backspace(),
            KeyCode::Delete => form.name.handle_delete(),
            KeyCode::Char(c) => form.name.handle_char(c),
            _ => {}
        }
    }

    // Backend actions. Local state changes only after the backend accepts.

    fn submit_task_form(&mut self) {
        let (Some(form), Some(column_id)) = (self.task_form.as_ref(), self.selected_column_id()) else {
            return;
        };
        let draft = match form.to_draft(column_id, self.ctx.project_board.clone()) {
            Ok(draft) => draft,
            Err(e) => {
                self.set_status_message(e.to_string());
                return;
            }
        };
        match self.ctx.handle.block_on(self.ctx.gateway.create_task(&draft)) {
            Ok(task) => {
                info!(task_id = %task.id, "task created");
                let id = task.id.clone();
                self.set_status_message(format!("Added task: {}", task.title));
                self.controller.board_mut().add_task(task);
                self.task_form = None;
                self.state = BoardState::Board;
                self.select_item(&id);
            }
            Err(e) => self.report_error("create task", e),
        }
    }

    fn submit_column_form(&mut self, mode: ColumnFormMode) {
        let Some(form) = self.column_form.as_ref() else {
            return;
        };
        let name = match form.name() {
            Ok(name) => name,
            Err(e) => {
                self.set_status_message(e.to_string());
                return;
            }
        };
        match mode {
            ColumnFormMode::Create => {
                let column = Column::new(Uuid::new_v4().to_string(), name);
                match self.ctx.handle.block_on(self.ctx.gateway.create_column(&column)) {
                    Ok(()) => {
                        info!(column_id = %column.id, "column created");
                        self.set_status_message(format!("Added column: {}", column.title));
                        self.controller.board_mut().add_column(column);
                        self.selected_column = self.board().columns().len() - 1;
                        self.clamp_selection();
                    }
                    Err(e) => return self.report_error("create column", e),
                }
            }
            ColumnFormMode::Rename(id) => {
                match self.ctx.handle.block_on(self.ctx.gateway.rename_column(&id, &name)) {
                    Ok(()) => {
                        info!(column_id = %id, "column renamed");
                        self.controller.board_mut().rename_column(&id, &name);
                        self.set_status_message(format!("Renamed column to {name}"));
                    }
                    Err(e) => return self.report_error("rename column", e),
                }
            }
        }
        self.column_form = None;
        self.state = BoardState::Board;
    }

    fn delete_task(&mut self, id: &ItemId) {
        match self.ctx.handle.block_on(self.ctx.gateway.delete_task(id)) {
            Ok(()) => {
                info!(task_id = %id, "task deleted");
                self.controller.board_mut().remove_task(id);
                self.set_status_message("Task deleted");
                self.clamp_selection();
            }
            Err(e) => self.report_error("delete task", e),
        }
    }

    fn refetch(&mut self) {
        let fetched = self.ctx.handle.block_on(fetch_board(
            self.ctx.gateway.as_ref(),
            self.ctx.project_board.as_deref(),
        ));
        match fetched {
            Ok(board) => {
                *self.controller.board_mut() = board;
                self.clamp_selection();
                self.set_status_message("Board refreshed");
            }
            Err(e) => self.report_error("refresh", e),
        }
    }

    // Rendering

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Board
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_board(f, chunks[1]);
        self.render_status_bar(f, chunks[2]);

        if self.controller.session().is_dragging() {
            let anchor = self
                .pointer
                .map(|(x, y)| Rect::new(x, y, 1, 1))
                .or_else(|| self.hover.as_ref().and_then(|h| self.hitboxes.area_of(&h.id)))
                .unwrap_or(chunks[1]);
            render_overlay(f, self.controller.session(), self.controller.board(), anchor, chunks[1]);
        }

        match self.state.clone() {
            BoardState::TaskDetail => self.render_task_detail_popup(f),
            BoardState::Help => self.render_help_popup(f),
            BoardState::AddTask => self.render_task_form(f),
            BoardState::ColumnForm(mode) => self.render_column_form(f, &mode),
            BoardState::ConfirmDelete(id) => self.render_confirm_popup(f, &id),
            BoardState::Board => {}
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let scope = match &self.ctx.project_board {
            Some(board) => format!("Project board {board}"),
            None => "All tasks".to_string(),
        };
        let summary = format!(
            "{}  Columns: {}  Tasks: {}",
            scope,
            self.board().columns().len(),
            self.board().tasks().len()
        );
        let header_text = vec![Line::from(vec![
            Span::styled("TASK BOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(summary, Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC)),
        ])];

        let header_block = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header_block, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let Self {
            controller,
            hitboxes,
            scroll_offsets,
            active,
            hover,
            selected_column,
            selected_card,
            ..
        } = self;
        let board = controller.board();

        hitboxes.columns.clear();
        hitboxes.cards.clear();

        let columns = board.columns();
        if columns.is_empty() {
            let empty = Paragraph::new("No columns yet. Press n to add one.")
                .block(Block::default().borders(Borders::ALL))
                .alignment(Alignment::Center);
            f.render_widget(empty, area);
            return;
        }

        let constraints: Vec<Constraint> = columns
            .iter()
            .map(|_| Constraint::Ratio(1, columns.len() as u32))
            .collect();
        let columns_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        let marks = Marks {
            active: active.as_ref().map(|a| &a.id),
            hover: hover.as_ref().map(|h| &h.id),
        };
        for (i, (column, &column_area)) in columns.iter().zip(columns_layout.iter()).enumerate() {
            let selected = (i == *selected_column).then_some(*selected_card);
            let offset = scroll_offsets.entry(column.id.clone()).or_insert(0);
            render_column(f, column_area, board, column, selected, marks, offset, hitboxes);
        }
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if self.active.is_some() {
            "Dragging | arrows: move | Space/Enter: drop | Esc: cancel".to_string()
        } else {
            "Space: pick up | m: move column | a: add | n: new column | r: rename | x: delete | g: refetch | h: help | q: quit"
                .to_string()
        };
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(STATUS_BAR).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render_task_detail_popup(&self, f: &mut Frame) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let board = self.board();
        let popup_area = centered_rect(70, 70, f.area());
        f.render_widget(Clear, popup_area);

        let today = Local::now().date_naive();
        let due = match task.due() {
            Some(d) => format!("{} ({})", d, format_due_relative(Some(d), today)),
            None => "-".to_string(),
        };
        let column = board.column(&task.column_id).map(|c| c.title.as_str()).unwrap_or("-");
        let description = if task.description.is_empty() { "-" } else { task.description.as_str() };

        let detail_lines = vec![
            Line::from(vec![Span::styled(
                format!("Task #{}: {}", task.id, task.title),
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(format!("Column:   {column}")),
            Line::from(format!(
                "Priority: {}",
                board.priority_name(task.priority_id.as_ref()).unwrap_or("-")
            )),
            Line::from(format!("Due:      {due}")),
            Line::from(format!("Created:  {}", task.created_at.as_deref().unwrap_or("-"))),
            Line::from(format!("Updated:  {}", task.updated_at.as_deref().unwrap_or("-"))),
            Line::from(""),
            Line::from("Description:"),
            Line::from(description.to_string()),
        ];

        let popup_block = Block::default()
            .borders(Borders::ALL)
            .title("Task Details (Press Enter to close)")
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        let popup = Paragraph::new(detail_lines)
            .block(popup_block)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, popup_area);
    }

    fn render_help_popup(&self, f: &mut Frame) {
        let area = centered_rect(60, 50, f.area());
        f.render_widget(Clear, area);
        let lines: Vec<Line> = HELP_TEXT.split(" | ").map(Line::from).collect();
        let help = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Keys (any key to close)"))
            .style(Style::default().bg(Color::Black));
        f.render_widget(help, area);
    }

    fn render_task_form(&self, f: &mut Frame) {
        let Some(form) = self.task_form.as_ref() else {
            return;
        };
        let column = self
            .board()
            .columns()
            .get(self.selected_column)
            .map(|c| c.title.as_str())
            .unwrap_or("-");
        let area = centered_rect(60, 60, f.area());
        f.render_widget(Clear, area);
        let outer = Block::default()
            .borders(Borders::ALL)
            .title(format!("New task in {column} (Enter: save, Esc: cancel, Tab: next)"))
            .style(Style::default().bg(Color::Black));
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3); 4])
            .split(inner);

        let priority = form
            .selected_priority()
            .map(|p| p.name.as_str())
            .unwrap_or("None");
        render_input(f, rows[0], "Title", &form.title, form.current_field == TITLE_ORDER);
        render_input(f, rows[1], "Description", &form.description, form.current_field == DESCRIPTION_ORDER);
        render_selector(f, rows[2], "Priority", priority, form.current_field == PRIORITY_ORDER);
        render_input(f, rows[3], "Due (e.g. friday, in 3d, 2025-01-31)", &form.due, form.current_field == DUE_ORDER);
    }

    fn render_column_form(&self, f: &mut Frame, mode: &ColumnFormMode) {
        let Some(form) = self.column_form.as_ref() else {
            return;
        };
        let title = match mode {
            ColumnFormMode::Create => "New column",
            ColumnFormMode::Rename(_) => "Rename column",
        };
        let area = centered_rect(50, 20, f.area());
        f.render_widget(Clear, area);
        let rect = Rect::new(area.x, area.y, area.width, 3.min(area.height));
        render_input(f, rect, title, &form.name, true);
    }

    fn render_confirm_popup(&self, f: &mut Frame, id: &ItemId) {
        let title = self.board().task(id).map(|t| t.title.as_str()).unwrap_or("?");
        let area = centered_rect(50, 20, f.area());
        f.render_widget(Clear, area);
        let confirm = Paragraph::new(format!("Delete task '{title}'? (y/n)"))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Confirm")
                    .border_style(Style::default().fg(DARK_RED)),
            )
            .alignment(Alignment::Center)
            .style(Style::default().bg(Color::Black));
        f.render_widget(confirm, area);
    }

    /// Main event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

/// Ids drawn with drag styling.
#[derive(Clone, Copy)]
struct Marks<'a> {
    active: Option<&'a ItemId>,
    hover: Option<&'a ItemId>,
}

#[allow(clippy::too_many_arguments)]
fn render_column(
    f: &mut Frame,
    area: Rect,
    board: &Board,
    column: &Column,
    selected_card: Option<usize>,
    marks: Marks,
    scroll_offset: &mut usize,
    hitboxes: &mut Hitboxes,
) {
    let tasks: Vec<&Task> = board.tasks_in_column(&column.id).collect();
    hitboxes.columns.push((column.id.clone(), area));

    let border_style = if marks.active == Some(&column.id) {
        Style::default().fg(DRAG_GHOST)
    } else if marks.hover == Some(&column.id) {
        Style::default().fg(DROP_TARGET).add_modifier(Modifier::BOLD)
    } else if selected_card.is_some() {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{} ({})", column.title, tasks.len()))
        .border_style(border_style);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if tasks.is_empty() {
        *scroll_offset = 0;
        return;
    }

    let visible = (inner.height / CARD_HEIGHT).max(1) as usize;
    if let Some(card) = selected_card {
        if card < *scroll_offset {
            *scroll_offset = card;
        } else if card >= *scroll_offset + visible {
            *scroll_offset = card + 1 - visible;
        }
    }
    *scroll_offset = (*scroll_offset).min(tasks.len().saturating_sub(1));

    let mut y = 0;
    let mut rendered = 0;
    for (index, task) in tasks.iter().enumerate().skip(*scroll_offset) {
        if y + CARD_HEIGHT > inner.height {
            break;
        }
        let card_area = Rect::new(inner.x, inner.y + y, inner.width, CARD_HEIGHT);
        render_card(f, card_area, board, task, selected_card == Some(index), marks);
        hitboxes.cards.push((task.id.clone(), card_area));
        y += CARD_HEIGHT;
        rendered += 1;
    }

    if *scroll_offset > 0 {
        let indicator = Paragraph::new(format!("▲ +{} above", *scroll_offset)).style(Style::default().fg(Color::Cyan));
        f.render_widget(indicator, Rect::new(inner.x, inner.y, inner.width, 1));
    }
    let remaining = tasks.len() - *scroll_offset - rendered;
    if remaining > 0 && inner.height > 0 {
        let indicator = Paragraph::new(format!("▼ +{} below", remaining)).style(Style::default().fg(Color::Cyan));
        f.render_widget(indicator, Rect::new(inner.x, inner.y + inner.height - 1, inner.width, 1));
    }
}

fn render_card(f: &mut Frame, area: Rect, board: &Board, task: &Task, is_selected: bool, marks: Marks) {
    let is_active = marks.active == Some(&task.id);
    let is_hover = marks.hover == Some(&task.id) && !is_active;

    let style = if is_active {
        Style::default().fg(DRAG_GHOST)
    } else if is_selected {
        Style::default().bg(Color::Cyan).fg(Color::Black).add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(Color::DarkGray)
    };
    let border_style = if is_hover {
        Style::default().fg(DROP_TARGET).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let width = area.width.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = wrap_words(&task.title, width, 2).into_iter().map(Line::from).collect();

    let today = Local::now().date_naive();
    let due = task.due();
    let overdue = due.is_some_and(|d| d < today);
    let footer = format!(
        "{} | {}",
        board.priority_name(task.priority_id.as_ref()).unwrap_or("-"),
        format_due_relative(due, today)
    );
    let footer_style = if overdue && !is_active {
        Style::default().fg(Color::LightRed)
    } else {
        Style::default()
    };
    lines.push(Line::styled(footer, footer_style));

    let card = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(truncate(&format!("#{}", task.id), width))
                .border_style(border_style),
        )
        .style(style)
        .wrap(Wrap { trim: true });
    f.render_widget(card, area);
}

fn render_input(f: &mut Frame, area: Rect, title: &str, field: &InputField, focused: bool) {
    let border = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let input = Paragraph::new(field.value.as_str())
        .block(Block::default().borders(Borders::ALL).title(title).border_style(border));
    f.render_widget(input, area);
    if focused {
        let x = area.x + 1 + field.cursor as u16;
        f.set_cursor_position(Position::new(x.min(area.x + area.width.saturating_sub(2)), area.y + 1));
    }
}

fn render_selector(f: &mut Frame, area: Rect, title: &str, value: &str, focused: bool) {
    let border = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let selector = Paragraph::new(format!("< {value} >"))
        .block(Block::default().borders(Borders::ALL).title(title).border_style(border));
    f.render_widget(selector, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryGateway;
    use crossterm::event::KeyEvent;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    struct Harness {
        app: BoardApp,
        gateway: Arc<InMemoryGateway>,
        _runtime: tokio::runtime::Runtime,
    }

    fn harness() -> Harness {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let gateway = Arc::new(InMemoryGateway::demo());
        let ctx = Context {
            gateway: gateway.clone(),
            handle: runtime.handle().clone(),
            project_board: None,
        };
        let app = BoardApp::new(ctx).unwrap();
        Harness {
            app,
            gateway,
            _runtime: runtime,
        }
    }

    impl Harness {
        fn press(&mut self, code: KeyCode) -> bool {
            self.app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
        }

        fn type_text(&mut self, text: &str) {
            for c in text.chars() {
                self.press(KeyCode::Char(c));
            }
        }

        fn draw(&mut self) {
            let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
            terminal.draw(|f| self.app.render(f)).unwrap();
        }

        fn mouse(&mut self, kind: MouseEventKind, (column, row): (u16, u16)) {
            self.app.handle_mouse(MouseEvent {
                kind,
                column,
                row,
                modifiers: KeyModifiers::NONE,
            });
        }

        fn card_center(&self, id: &str) -> (u16, u16) {
            let area = self.app.hitboxes.area_of(&ItemId::from(id)).unwrap();
            (area.x + area.width / 2, area.y + area.height / 2)
        }

        fn wait_for_syncs(&mut self) {
            let pending = self.app.take_pending_syncs();
            self.app.ctx.handle.block_on(async {
                for handle in pending {
                    handle.await.unwrap();
                }
            });
        }

        fn column_of(&self, task: &str) -> String {
            self.app.board().task(&ItemId::from(task)).unwrap().column_id.to_string()
        }
    }

    #[test]
    fn test_keyboard_drag_across_columns() {
        let mut h = harness();
        // task-1 is the first card of WIP.
        h.press(KeyCode::Char(' '));
        assert!(h.app.status_message.starts_with("Picked up Task Sketch the board layout"));

        h.press(KeyCode::Right);
        assert_eq!(h.column_of("task-1"), "done");
        assert!(h.app.status_message.contains("was moved over column Done"));

        h.press(KeyCode::Enter);
        assert!(h.app.active.is_none());
        assert!(!h.app.controller.session().is_dragging());
        assert_eq!(h.column_of("task-1"), "done");
        // Selection follows the dropped task.
        assert_eq!(h.app.selected_column, 1);

        h.wait_for_syncs();
        let updates = h.gateway.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.status_id, ItemId::from("done"));
    }

    #[test]
    fn test_keyboard_reorder_within_column() {
        let mut h = harness();
        h.press(KeyCode::Char(' '));
        h.press(KeyCode::Down);
        h.press(KeyCode::Char(' '));

        let wip: Vec<String> = h
            .app
            .board()
            .tasks_in_column(&ItemId::from("WIP"))
            .map(|t| t.id.to_string())
            .collect();
        assert_eq!(wip, vec!["task-2", "task-1", "task-3"]);
        h.wait_for_syncs();
        assert!(h.gateway.updates().is_empty());
    }

    #[test]
    fn test_keyboard_column_drag() {
        let mut h = harness();
        h.press(KeyCode::Char('m'));
        assert_eq!(h.app.status_message, "Picked up Column WIP at position: 1 of 2");
        h.press(KeyCode::Right);
        // Hovering never reorders columns.
        assert_eq!(h.app.board().columns()[0].id, ItemId::from("WIP"));
        h.press(KeyCode::Char(' '));
        assert_eq!(h.app.status_message, "Column WIP was dropped into position 2 of 2");
        assert_eq!(h.app.board().columns()[0].id, ItemId::from("done"));
    }

    #[test]
    fn test_escape_cancels_but_keeps_live_moves() {
        let mut h = harness();
        h.press(KeyCode::Char(' '));
        h.press(KeyCode::Right);
        // Esc during a drag cancels instead of quitting.
        assert!(!h.press(KeyCode::Esc));
        assert_eq!(h.app.status_message, "Dragging Task cancelled.");
        assert!(h.app.active.is_none());
        // The hover already reassigned the column; cancel does not roll back.
        assert_eq!(h.column_of("task-1"), "done");
    }

    #[test]
    fn test_mouse_drag_onto_card() {
        let mut h = harness();
        h.draw();
        let from = h.card_center("task-2");
        let to = h.card_center("task-4");

        h.mouse(MouseEventKind::Down(MouseButton::Left), from);
        assert!(h.app.controller.session().is_dragging());
        h.mouse(MouseEventKind::Drag(MouseButton::Left), to);
        assert_eq!(h.column_of("task-2"), "done");
        h.draw();
        h.mouse(MouseEventKind::Up(MouseButton::Left), h.card_center("task-4"));
        assert!(!h.app.controller.session().is_dragging());
        let done: Vec<String> = h
            .app
            .board()
            .tasks_in_column(&ItemId::from("done"))
            .map(|t| t.id.to_string())
            .collect();
        assert_eq!(done, vec!["task-2", "task-4"]);

        h.wait_for_syncs();
        assert_eq!(h.gateway.updates().len(), 1);
    }

    #[test]
    fn test_mouse_release_outside_is_noop_drop() {
        let mut h = harness();
        h.draw();
        let before = h.app.board().clone();
        let from = h.card_center("task-3");

        h.mouse(MouseEventKind::Down(MouseButton::Left), from);
        h.mouse(MouseEventKind::Up(MouseButton::Left), (0, 0));
        assert!(!h.app.controller.session().is_dragging());
        assert_eq!(h.app.board(), &before);
    }

    #[test]
    fn test_add_task_through_form() {
        let mut h = harness();
        h.press(KeyCode::Right);
        h.press(KeyCode::Char('a'));
        assert_eq!(h.app.state, BoardState::AddTask);
        h.type_text("Release notes");
        h.press(KeyCode::Enter);

        assert_eq!(h.app.state, BoardState::Board);
        let task = h.app.board().tasks().last().unwrap();
        assert_eq!(task.title, "Release notes");
        assert_eq!(task.column_id, ItemId::from("done"));
    }

    #[test]
    fn test_column_create_rename_and_delete_task() {
        let mut h = harness();
        h.press(KeyCode::Char('n'));
        h.type_text("Review");
        h.press(KeyCode::Enter);
        assert_eq!(h.app.board().columns().len(), 3);
        assert_eq!(h.app.selected_column, 2);

        h.press(KeyCode::Char('r'));
        for _ in 0.."Review".len() {
            h.press(KeyCode::Backspace);
        }
        h.type_text("QA");
        h.press(KeyCode::Enter);
        assert_eq!(h.app.board().columns()[2].title, "QA");

        h.press(KeyCode::Left);
        h.press(KeyCode::Left);
        h.press(KeyCode::Char('x'));
        h.press(KeyCode::Char('y'));
        assert!(h.app.board().task(&ItemId::from("task-1")).is_none());
        assert_eq!(h.app.status_message, "Task deleted");
    }

    #[test]
    fn test_failed_create_keeps_form_open() {
        let mut h = harness();
        h.press(KeyCode::Char('a'));
        h.press(KeyCode::Enter);
        assert_eq!(h.app.state, BoardState::AddTask);
        assert!(h.app.status_message.contains("title"));
        assert_eq!(h.app.board().tasks().len(), 4);
    }

    #[test]
    fn test_render_shows_columns_and_overlay() {
        let mut h = harness();
        h.press(KeyCode::Char(' '));
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| h.app.render(f)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("WIP (3)"));
        assert!(text.contains("Done (1)"));
        assert!(text.contains("Picked up Task"));
        assert_eq!(h.app.hitboxes.cards.len(), 4);
    }

    #[test]
    fn test_quit_keys() {
        let mut h = harness();
        assert!(h.press(KeyCode::Char('q')));
        assert!(h.app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }
}
