//! Floating copy of the dragged item, drawn above the board.
//!
//! Pure presentation: reads the drag session and the board, never writes.

use chrono::Local;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::db::{format_due_relative, truncate, Board};
use crate::dnd::session::{ActiveItem, DragSession};
use crate::tui::colors::DRAG_OVERLAY;
use crate::tui::utils::wrap_words;

const OVERLAY_WIDTH: u16 = 28;
const MAX_COLUMN_ROWS: usize = 8;

/// Title and body of the overlay, or `None` while idle.
pub fn overlay_content(session: &DragSession, board: &Board) -> Option<(String, Vec<String>)> {
    let width = OVERLAY_WIDTH.saturating_sub(2) as usize;
    match session.active_item()? {
        ActiveItem::Column(column) => {
            let title = board
                .column(&column.id)
                .map(|c| c.title.clone())
                .unwrap_or_else(|| column.title.clone());
            let tasks: Vec<String> = board
                .tasks_in_column(&column.id)
                .map(|t| truncate(&format!("• {}", t.title), width))
                .collect();
            let mut body: Vec<String> = tasks.iter().take(MAX_COLUMN_ROWS).cloned().collect();
            if tasks.len() > MAX_COLUMN_ROWS {
                body.push(format!("  +{} more", tasks.len() - MAX_COLUMN_ROWS));
            }
            if body.is_empty() {
                body.push("(empty)".to_string());
            }
            Some((title, body))
        }
        ActiveItem::Task(task) => {
            let mut body = wrap_words(&task.title, width, 2);
            let priority = board.priority_name(task.priority_id.as_ref()).unwrap_or("-");
            let due = format_due_relative(task.due(), Local::now().date_naive());
            body.push(format!("{priority} | {due}"));
            Some((format!("#{}", task.id), body))
        }
    }
}

/// Place a `width` x `height` box just below and right of `anchor`, kept inside `bounds`.
pub fn overlay_rect(anchor: Rect, bounds: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);
    let max_x = bounds.x + bounds.width - width;
    let max_y = bounds.y + bounds.height - height;
    let x = (anchor.x + 2).clamp(bounds.x, max_x);
    let y = (anchor.y + 1).clamp(bounds.y, max_y);
    Rect::new(x, y, width, height)
}

/// Draw the overlay next to `anchor`, the area of the current hover target.
pub fn render_overlay(f: &mut Frame, session: &DragSession, board: &Board, anchor: Rect, bounds: Rect) {
    let Some((title, body)) = overlay_content(session, board) else {
        return;
    };
    let area = overlay_rect(anchor, bounds, OVERLAY_WIDTH, body.len() as u16 + 2);

    f.render_widget(Clear, area);
    let lines: Vec<Line> = body.into_iter().map(Line::from).collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(DRAG_OVERLAY).add_modifier(Modifier::BOLD));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(Color::Black).fg(DRAG_OVERLAY));
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dnd::Draggable;
    use crate::fields::{Column, ItemId};
    use crate::task::Task;

    fn board() -> Board {
        Board::new(
            vec![Column::new("wip", "WIP"), Column::new("done", "Done")],
            vec![
                Task::new("1", "wip", "one"),
                Task::new("2", "done", "two"),
                Task::new("3", "wip", "three"),
            ],
        )
    }

    #[test]
    fn test_idle_has_no_overlay() {
        assert!(overlay_content(&DragSession::Idle, &board()).is_none());
    }

    #[test]
    fn test_column_overlay_lists_live_tasks() {
        let mut board = board();
        let mut session = DragSession::Idle;
        session.start(&Draggable::column(board.column(&ItemId::from("wip")).unwrap()));

        let (title, body) = overlay_content(&session, &board).unwrap();
        assert_eq!(title, "WIP");
        assert_eq!(body, vec!["• one", "• three"]);

        board.remove_task(&ItemId::from("1"));
        let (_, body) = overlay_content(&session, &board).unwrap();
        assert_eq!(body, vec!["• three"]);
    }

    #[test]
    fn test_task_overlay_shows_task_alone() {
        let board = board();
        let mut session = DragSession::Idle;
        session.start(&Draggable::task(board.task(&ItemId::from("2")).unwrap()));

        let (title, body) = overlay_content(&session, &board).unwrap();
        assert_eq!(title, "#2");
        assert_eq!(body, vec!["two", "- | -"]);
    }

    #[test]
    fn test_overlay_rect_stays_in_bounds() {
        let bounds = Rect::new(0, 0, 80, 24);
        let near_edge = overlay_rect(Rect::new(70, 22, 10, 2), bounds, 28, 6);
        assert_eq!(near_edge, Rect::new(52, 18, 28, 6));

        let normal = overlay_rect(Rect::new(10, 5, 10, 2), bounds, 28, 6);
        assert_eq!(normal, Rect::new(12, 6, 28, 6));
    }
}
