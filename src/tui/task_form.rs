//! Task and column forms for the terminal user interface.
//!
//! `TaskForm` collects the fields of a new task; `ColumnForm` holds the single
//! name field used to create or rename a status column.

use crate::db::parse_due_input;
use crate::error::{BoardError, Result};
use crate::fields::{ItemId, Priority};
use crate::task::TaskDraft;
use crate::tui::input::InputField;

/// Field order for keyboard navigation.
pub const TITLE_ORDER: usize = 0;
pub const DESCRIPTION_ORDER: usize = 1;
pub const PRIORITY_ORDER: usize = 2;
pub const DUE_ORDER: usize = 3;
const FIELD_COUNT: usize = 4;

/// Form for a new task in one column.
pub struct TaskForm {
    pub title: InputField,
    pub description: InputField,
    pub due: InputField,
    /// Index into `priorities`; 0 is "none".
    pub priority: usize,
    pub priorities: Vec<Option<Priority>>,
    pub current_field: usize,
}

impl TaskForm {
    pub fn new(priorities: &[Priority]) -> Self {
        let mut choices = vec![None];
        choices.extend(priorities.iter().cloned().map(Some));
        let mut form = Self {
            title: InputField::new(),
            description: InputField::new(),
            due: InputField::new(),
            priority: 0,
            priorities: choices,
            current_field: TITLE_ORDER,
        };
        form.update_active_field();
        form
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        self.current_field = (self.current_field + FIELD_COUNT - 1) % FIELD_COUNT;
        self.update_active_field();
    }

    fn update_active_field(&mut self) {
        self.title.active = self.current_field == TITLE_ORDER;
        self.description.active = self.current_field == DESCRIPTION_ORDER;
        self.due.active = self.current_field == DUE_ORDER;
    }

    fn active_input(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            TITLE_ORDER => Some(&mut self.title),
            DESCRIPTION_ORDER => Some(&mut self.description),
            DUE_ORDER => Some(&mut self.due),
            _ => None,
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(field) = self.active_input() {
            field.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(field) = self.active_input() {
            field.handle_backspace();
        }
    }

    /// Move the cursor, or cycle the priority when that selector is focused.
    pub fn handle_left_right(&mut self, right: bool) {
        if self.current_field == PRIORITY_ORDER {
            let len = self.priorities.len();
            self.priority = if right {
                (self.priority + 1) % len
            } else {
                (self.priority + len - 1) % len
            };
            return;
        }
        if let Some(field) = self.active_input() {
            if right {
                field.move_cursor_right();
            } else {
                field.move_cursor_left();
            }
        }
    }

    pub fn selected_priority(&self) -> Option<&Priority> {
        self.priorities.get(self.priority).and_then(Option::as_ref)
    }

    /// Validate the form into a create request for `column_id`.
    pub fn to_draft(&self, column_id: ItemId, project_board: Option<String>) -> Result<TaskDraft> {
        let title = self
            .title
            .trimmed()
            .ok_or_else(|| BoardError::invalid_value("title", "must not be empty"))?;
        let due_date = match self.due.trimmed() {
            Some(raw) => {
                let date = parse_due_input(raw)
                    .ok_or_else(|| BoardError::invalid_value("due", format!("cannot parse '{raw}'")))?;
                Some(date.format("%Y-%m-%d").to_string())
            }
            None => None,
        };
        Ok(TaskDraft {
            title: title.to_string(),
            description: self.description.value.trim().to_string(),
            column_id,
            priority_id: self.selected_priority().map(|p| p.id.clone()),
            due_date,
            project_board_id: project_board,
        })
    }
}

/// Single-field form for a status column name.
pub struct ColumnForm {
    pub name: InputField,
}

impl ColumnForm {
    pub fn new(initial: &str) -> Self {
        let mut name = InputField::with_value(initial);
        name.active = true;
        Self { name }
    }

    pub fn name(&self) -> Result<String> {
        self.name
            .trimmed()
            .map(str::to_string)
            .ok_or_else(|| BoardError::invalid_value("name", "must not be empty"))
    }
}
