//! In-memory entity store for the board and display helpers.
//!
//! This module provides the `Board` struct holding the ordered task and column
//! collections, along with utility functions for due date parsing, formatting
//! and printing.
//!
//! Tasks live in one flat ordered sequence. Column membership is a filter over
//! that sequence (`tasks_in_column`), never a separate per-column list. Every
//! mutation swaps in a whole new collection rather than editing an element the
//! previous frame may still be showing.

use std::collections::HashSet;

use chrono::{Datelike, Duration, Local, NaiveDate};
use tracing::warn;

use crate::fields::{Column, ItemId, Priority};
use crate::task::Task;

/// Ordered tasks, ordered columns and the priority lookup table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    tasks: Vec<Task>,
    columns: Vec<Column>,
    priorities: Vec<Priority>,
}

impl Board {
    /// Build a board from fetched collections.
    ///
    /// Duplicate ids keep their first occurrence. Tasks pointing at a column
    /// that does not exist are kept but cannot be shown until the column appears.
    pub fn new(columns: Vec<Column>, tasks: Vec<Task>) -> Self {
        let columns = dedup_by_id(columns, |c| &c.id, "column");
        let tasks = dedup_by_id(tasks, |t| &t.id, "task");

        let known: HashSet<&ItemId> = columns.iter().map(|c| &c.id).collect();
        let orphaned = tasks.iter().filter(|t| !known.contains(&t.column_id)).count();
        if orphaned > 0 {
            warn!(orphaned, "tasks reference columns that were not fetched");
        }

        Board {
            tasks,
            columns,
            priorities: Vec::new(),
        }
    }

    pub fn with_priorities(mut self, priorities: Vec<Priority>) -> Self {
        self.priorities = priorities;
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn priorities(&self) -> &[Priority] {
        &self.priorities
    }

    /// Get a task by ID.
    pub fn task(&self, id: &ItemId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Get a column by ID.
    pub fn column(&self, id: &ItemId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// Position of a task in the flat sequence.
    pub fn task_index(&self, id: &ItemId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    /// Position of a column in display order.
    pub fn column_index(&self, id: &ItemId) -> Option<usize> {
        self.columns.iter().position(|c| &c.id == id)
    }

    /// Tasks of one column, in flat-sequence order.
    pub fn tasks_in_column<'a>(&'a self, column_id: &ItemId) -> impl Iterator<Item = &'a Task> + 'a {
        let column_id = column_id.clone();
        self.tasks.iter().filter(move |t| t.column_id == column_id)
    }

    /// Zero-based position of a task within its column and the column's size.
    pub fn position_in_column(&self, task_id: &ItemId, column_id: &ItemId) -> Option<(usize, usize)> {
        let in_column: Vec<&Task> = self.tasks_in_column(column_id).collect();
        let position = in_column.iter().position(|t| &t.id == task_id)?;
        Some((position, in_column.len()))
    }

    /// Resolve a priority id to its display name.
    pub fn priority_name(&self, id: Option<&ItemId>) -> Option<&str> {
        let id = id?;
        self.priorities
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.name.as_str())
    }

    /// Swap in a new task sequence.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Swap in a new column sequence.
    pub fn replace_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
    }

    /// Append a task created by the backend.
    pub fn add_task(&mut self, task: Task) {
        let mut tasks = self.tasks.clone();
        tasks.push(task);
        self.tasks = tasks;
    }

    /// Drop a task; returns whether it was present.
    pub fn remove_task(&mut self, id: &ItemId) -> bool {
        let before = self.tasks.len();
        let tasks: Vec<Task> = self.tasks.iter().filter(|t| &t.id != id).cloned().collect();
        let removed = tasks.len() != before;
        self.tasks = tasks;
        removed
    }

    /// Append a new status column.
    pub fn add_column(&mut self, column: Column) {
        let mut columns = self.columns.clone();
        columns.push(column);
        self.columns = columns;
    }

    /// Rename a column in place of its old record; returns whether it was present.
    pub fn rename_column(&mut self, id: &ItemId, title: &str) -> bool {
        let mut found = false;
        let columns = self
            .columns
            .iter()
            .map(|c| {
                if &c.id == id {
                    found = true;
                    Column::new(c.id.clone(), title)
                } else {
                    c.clone()
                }
            })
            .collect();
        self.columns = columns;
        found
    }
}

fn dedup_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> &ItemId, what: &str) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(id(&item).clone()) {
            out.push(item);
        } else {
            warn!(id = %id(&item), "dropping duplicate {what}");
        }
    }
    out
}

/// Resolve a task by exact id, then by case-insensitive title.
pub fn resolve_task_identifier(identifier: &str, board: &Board) -> Option<ItemId> {
    let id = ItemId::from(identifier);
    if board.task(&id).is_some() {
        return Some(id);
    }
    let lower = identifier.to_lowercase();
    let matches: Vec<&Task> = board
        .tasks()
        .iter()
        .filter(|t| t.title.to_lowercase() == lower)
        .collect();
    match matches.as_slice() {
        [only] => Some(only.id.clone()),
        _ => None,
    }
}

/// Resolve a column by exact id, then by case-insensitive title.
pub fn resolve_column_identifier(identifier: &str, board: &Board) -> Option<ItemId> {
    let id = ItemId::from(identifier);
    if board.column(&id).is_some() {
        return Some(id);
    }
    board
        .columns()
        .iter()
        .find(|c| c.title.eq_ignore_ascii_case(identifier))
        .map(|c| c.id.clone())
}

/// Parse human-readable due date input.
///
/// Supports:
/// - "today", "tomorrow"
/// - "monday" .. "sunday" and "next monday" ..
/// - "end of week", "end of month"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_this_week(today);
            return Some(end);
        }
        "end of month" | "eom" => {
            let (year, month) = (today.year(), today.month());
            let next_month = if month == 12 { 1 } else { month + 1 };
            let next_year = if month == 12 { year + 1 } else { year };
            let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Duration::try_days(days).and_then(|d| today.checked_add_signed(d));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Duration::try_weeks(weeks).and_then(|d| today.checked_add_signed(d));
            }
        }
    }

    let weekdays = [
        "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    ];
    let (next, name) = match s.strip_prefix("next ") {
        Some(rest) => (true, rest),
        None => (false, s.as_str()),
    };
    if let Some(target) = weekdays.iter().position(|d| *d == name) {
        let current = today.weekday().num_days_from_monday() as i64;
        let ahead = (target as i64 + 7 - current) % 7;
        let days = match (next, ahead) {
            (false, n) => n,
            (true, 0) => 7,
            (true, n) => n + 7,
        };
        return Some(today + Duration::days(days));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Calculate the start and end dates of the current ISO week (Monday to Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    let end = start + Duration::days(6);
    (start, end)
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {}d", delta)
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Print every column followed by its tasks.
pub fn print_board(board: &Board) {
    let today = Local::now().date_naive();
    for column in board.columns() {
        let tasks: Vec<&Task> = board.tasks_in_column(&column.id).collect();
        println!("== {} ({}) [{}]", column.title, tasks.len(), column.id);
        for t in tasks {
            let priority = board.priority_name(t.priority_id.as_ref()).unwrap_or("-");
            println!(
                "   {:<38} {:<10} {:<10} {}",
                t.id,
                truncate(priority, 10),
                format_due_relative(t.due(), today),
                t.title
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Board {
        Board::new(
            vec![Column::new("wip", "WIP"), Column::new("done", "Done")],
            vec![
                Task::new(1u64, "wip", "one"),
                Task::new(2u64, "wip", "two"),
                Task::new(3u64, "done", "three"),
            ],
        )
    }

    #[test]
    fn test_column_view_filters_flat_sequence() {
        let board = sample();
        let wip: Vec<&str> = board
            .tasks_in_column(&ItemId::from("wip"))
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(wip, vec!["one", "two"]);
        assert_eq!(
            board.position_in_column(&ItemId::from(2u64), &ItemId::from("wip")),
            Some((1, 2))
        );
        assert_eq!(
            board.position_in_column(&ItemId::from(3u64), &ItemId::from("wip")),
            None
        );
    }

    #[test]
    fn test_new_drops_duplicate_ids() {
        let board = Board::new(
            vec![Column::new("wip", "WIP"), Column::new("wip", "Again")],
            vec![Task::new(1u64, "wip", "a"), Task::new(1u64, "wip", "b")],
        );
        assert_eq!(board.columns().len(), 1);
        assert_eq!(board.tasks().len(), 1);
        assert_eq!(board.tasks()[0].title, "a");
    }

    #[test]
    fn test_crud_helpers() {
        let mut board = sample();
        board.add_task(Task::new(4u64, "done", "four"));
        assert_eq!(board.task_index(&ItemId::from(4u64)), Some(3));

        assert!(board.remove_task(&ItemId::from(1u64)));
        assert!(!board.remove_task(&ItemId::from(1u64)));

        board.add_column(Column::new("qa", "QA"));
        assert!(board.rename_column(&ItemId::from("qa"), "Review"));
        assert_eq!(board.column(&ItemId::from("qa")).unwrap().title, "Review");
        assert!(!board.rename_column(&ItemId::from("nope"), "x"));
    }

    #[test]
    fn test_resolve_identifiers() {
        let board = sample();
        assert_eq!(resolve_task_identifier("2", &board), Some(ItemId::from(2u64)));
        assert_eq!(resolve_task_identifier("THREE", &board), Some(ItemId::from(3u64)));
        assert_eq!(resolve_task_identifier("nine", &board), None);
        assert_eq!(resolve_column_identifier("done", &board), Some(ItemId::from("done")));
        assert_eq!(resolve_column_identifier("wip", &board), Some(ItemId::from("wip")));
        assert_eq!(resolve_column_identifier("Backlog", &board), None);
    }

    #[test]
    fn test_priority_name() {
        let board = sample().with_priorities(vec![Priority {
            id: ItemId::from("p1"),
            name: "High".into(),
        }]);
        assert_eq!(board.priority_name(Some(&ItemId::from("p1"))), Some("High"));
        assert_eq!(board.priority_name(Some(&ItemId::from("p2"))), None);
        assert_eq!(board.priority_name(None), None);
    }

    #[test]
    fn test_format_due_relative() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert_eq!(format_due_relative(None, today), "-");
        assert_eq!(format_due_relative(Some(today), today), "today");
        assert_eq!(format_due_relative(today.succ_opt(), today), "tomorrow");
        assert_eq!(
            format_due_relative(NaiveDate::from_ymd_opt(2024, 5, 13), today),
            "in 3d"
        );
        assert_eq!(
            format_due_relative(NaiveDate::from_ymd_opt(2024, 5, 8), today),
            "2d late"
        );
    }

    #[test]
    fn test_parse_due_input() {
        let today = Local::now().date_naive();
        assert_eq!(parse_due_input("today"), Some(today));
        assert_eq!(parse_due_input(" in 3d "), Some(today + Duration::days(3)));
        assert_eq!(parse_due_input("in 2w"), Some(today + Duration::weeks(2)));
        assert_eq!(parse_due_input("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_due_input("someday"), None);
        assert_eq!(parse_due_input("in 99999999999999d"), None);
        assert_eq!(parse_due_input("in 99999999999999w"), None);
        assert_eq!(parse_due_input("in 999999999d"), None);

        let monday = parse_due_input("next monday").unwrap();
        assert_eq!(monday.weekday().num_days_from_monday(), 0);
        assert!(monday > today);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 6), "a lon…");
    }
}
