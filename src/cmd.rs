//! Command implementations for the CLI interface.
//!
//! Every handler fetches what it needs through the gateway, does its work and
//! prints a short confirmation. Async gateway calls are driven to completion
//! on the runtime handle carried in [`Context`].

use std::sync::Arc;

use clap::Subcommand;
use clap_complete::{generate, Shell};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{fetch_board, TaskGateway};
use crate::db::*;
use crate::dnd::controller::DragController;
use crate::dnd::sync::RemoteSync;
use crate::dnd::{DragEvent, DragSink, Draggable};
use crate::error::{BoardError, Result};
use crate::fields::{Column, ItemId, ItemKind};
use crate::task::TaskDraft;
use crate::tui::run::run_board_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive kanban board.
    Ui,

    /// Print every column and its tasks.
    List,

    /// Drag one task or column onto another and drop it there.
    Move {
        /// Task or column being dragged (id or title).
        active: String,
        /// Task or column it is dropped on (id or title).
        over: String,
    },

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Column id or title. Defaults to the first column.
        #[arg(long)]
        column: Option<String>,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Priority id or name.
        #[arg(long)]
        priority: Option<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "friday", or "in Nd".
        #[arg(long)]
        due: Option<String>,
    },

    /// Manage status columns.
    Status {
        #[command(subcommand)]
        action: StatusAction,
    },

    /// Delete a task by id or title.
    Delete {
        task: String,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum StatusAction {
    /// Create a new status column.
    Add {
        name: String,
    },
    /// Rename an existing status column.
    Rename {
        /// Column id or current title.
        column: String,
        name: String,
    },
}

/// Everything a handler needs to reach the backend.
#[derive(Clone)]
pub struct Context {
    pub gateway: Arc<dyn TaskGateway>,
    pub handle: Handle,
    pub project_board: Option<String>,
}

impl Context {
    pub fn fetch(&self) -> Result<Board> {
        self.handle
            .block_on(fetch_board(self.gateway.as_ref(), self.project_board.as_deref()))
    }
}

/// Launch the interactive board.
pub fn cmd_ui(ctx: &Context) -> Result<()> {
    run_board_tui(ctx)
}

/// Print the board column by column.
pub fn cmd_list(ctx: &Context) -> Result<()> {
    let board = ctx.fetch()?;
    if board.columns().is_empty() {
        println!("No columns.");
        return Ok(());
    }
    print_board(&board);
    Ok(())
}

/// Find a task or, failing that, a column by id or title.
pub fn resolve_draggable(identifier: &str, board: &Board) -> Option<Draggable> {
    if let Some(id) = resolve_task_identifier(identifier, board) {
        return board.task(&id).map(Draggable::task);
    }
    let id = resolve_column_identifier(identifier, board)?;
    board.column(&id).map(Draggable::column)
}

/// Drive one complete gesture through `controller`: pick up, hover, drop.
///
/// Once the hover has placed a dragged task it rests in its own slot, so the
/// drop targets the task itself. A dragged column drops on `over`.
pub fn run_gesture(controller: &mut DragController, active: Draggable, over: Draggable) -> Vec<String> {
    let picked = controller.drag_start(active.clone());
    let hovered = controller.drag_over(DragEvent::new(active.clone(), Some(over.clone())));
    let target = match active.kind() {
        Some(ItemKind::Task) => controller.board().task(&active.id).map(Draggable::task),
        _ => Some(over),
    };
    let dropped = controller.drag_end(DragEvent::new(active, target));
    [picked, hovered, dropped].into_iter().flatten().collect()
}

/// Block until every queued status update has finished; returns how many
/// tasks aborted (panicked or were cancelled) instead of completing.
pub fn await_syncs(handle: &Handle, pending: Vec<JoinHandle<()>>) -> usize {
    handle.block_on(async {
        let mut aborted = 0;
        for task in pending {
            if let Err(e) = task.await {
                warn!(error = %e, "status update task did not complete");
                aborted += 1;
            }
        }
        aborted
    })
}

/// Run one gesture against the fetched board.
///
/// Prints each announcement and waits for the status update, if any, before
/// returning.
pub fn cmd_move(ctx: &Context, active: String, over: String) -> Result<()> {
    let board = ctx.fetch()?;
    let Some(active) = resolve_draggable(&active, &board) else {
        return Err(BoardError::not_found("task or column", active));
    };
    let Some(over) = resolve_draggable(&over, &board) else {
        return Err(BoardError::not_found("task or column", over));
    };

    let sync = RemoteSync::new(Arc::clone(&ctx.gateway), ctx.handle.clone());
    let mut controller = DragController::new(board, sync);

    for text in run_gesture(&mut controller, active.clone(), over) {
        println!("{text}");
    }

    await_syncs(&ctx.handle, controller.sync_mut().take_in_flight());

    if let Some(task) = controller.board().task(&active.id) {
        let column = controller
            .board()
            .column(&task.column_id)
            .map(|c| c.title.as_str())
            .unwrap_or("?");
        println!("{} is now in {}", task.title, column);
    }
    Ok(())
}

/// Create a task through the backend.
pub fn cmd_add(
    ctx: &Context,
    title: String,
    column: Option<String>,
    desc: Option<String>,
    priority: Option<String>,
    due: Option<String>,
) -> Result<()> {
    let board = ctx.fetch()?;

    let column_id = match column {
        Some(c) => resolve_column_identifier(&c, &board).ok_or_else(|| BoardError::column_not_found(&c))?,
        None => board
            .columns()
            .first()
            .map(|c| c.id.clone())
            .ok_or_else(|| BoardError::invalid_value("column", "the board has no columns"))?,
    };

    let priority_id = match priority {
        Some(p) => Some(resolve_priority(&p, &board)?),
        None => None,
    };

    let due_date = match due {
        Some(d) => {
            let date = parse_due_input(&d)
                .ok_or_else(|| BoardError::invalid_value("due", format!("cannot parse '{d}'")))?;
            Some(date.format("%Y-%m-%d").to_string())
        }
        None => None,
    };

    let draft = TaskDraft {
        title,
        description: desc.unwrap_or_default(),
        column_id,
        priority_id,
        due_date,
        project_board_id: ctx.project_board.clone(),
    };
    let task = ctx.handle.block_on(ctx.gateway.create_task(&draft))?;
    info!(task_id = %task.id, "task created");
    println!("Added task {}: {}", task.id, task.title);
    Ok(())
}

fn resolve_priority(identifier: &str, board: &Board) -> Result<ItemId> {
    board
        .priorities()
        .iter()
        .find(|p| p.id.as_str() == identifier || p.name.eq_ignore_ascii_case(identifier))
        .map(|p| p.id.clone())
        .ok_or_else(|| BoardError::invalid_value("priority", format!("unknown priority '{identifier}'")))
}

/// Create or rename a status column.
pub fn cmd_status(ctx: &Context, action: StatusAction) -> Result<()> {
    match action {
        StatusAction::Add { name } => {
            let column = Column::new(Uuid::new_v4().to_string(), name.trim());
            if column.title.is_empty() {
                return Err(BoardError::invalid_value("name", "must not be empty"));
            }
            ctx.handle.block_on(ctx.gateway.create_column(&column))?;
            info!(column_id = %column.id, "column created");
            println!("Added column {}: {}", column.id, column.title);
        }
        StatusAction::Rename { column, name } => {
            let board = ctx.fetch()?;
            let id = resolve_column_identifier(&column, &board)
                .ok_or_else(|| BoardError::column_not_found(&column))?;
            ctx.handle.block_on(ctx.gateway.rename_column(&id, name.trim()))?;
            info!(column_id = %id, "column renamed");
            println!("Renamed column {} to {}", id, name.trim());
        }
    }
    Ok(())
}

/// Delete a task through the backend.
pub fn cmd_delete(ctx: &Context, task: String) -> Result<()> {
    let board = ctx.fetch()?;
    let id = resolve_task_identifier(&task, &board).ok_or_else(|| BoardError::task_not_found(&task))?;
    ctx.handle.block_on(ctx.gateway.delete_task(&id))?;
    info!(task_id = %id, "task deleted");
    println!("Deleted task {id}.");
    Ok(())
}

/// Write a completion script for `shell` to stdout.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryGateway;
    use crate::task::Task;

    fn context(runtime: &tokio::runtime::Runtime) -> (Context, Arc<InMemoryGateway>) {
        let gateway = Arc::new(InMemoryGateway::demo());
        let ctx = Context {
            gateway: gateway.clone(),
            handle: runtime.handle().clone(),
            project_board: None,
        };
        (ctx, gateway)
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_draggable_prefers_tasks() {
        let rt = runtime();
        let (ctx, _) = context(&rt);
        let board = ctx.fetch().unwrap();

        let task = resolve_draggable("task-2", &board).unwrap();
        assert_eq!(task.kind(), Some(ItemKind::Task));

        let column = resolve_draggable("Done", &board).unwrap();
        assert_eq!(column.kind(), Some(ItemKind::Column));
        assert_eq!(column.id, ItemId::from("done"));

        assert!(resolve_draggable("nothing", &board).is_none());
    }

    #[test]
    fn test_move_persists_cross_column_drop() {
        let rt = runtime();
        let (ctx, gateway) = context(&rt);

        cmd_move(&ctx, "task-1".into(), "task-4".into()).unwrap();

        let updates = gateway.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.status_id, ItemId::from("done"));
        let board = ctx.fetch().unwrap();
        assert_eq!(board.task(&ItemId::from("task-1")).unwrap().column_id, ItemId::from("done"));
    }

    #[test]
    fn test_move_lands_before_target_in_demo_board() {
        let rt = runtime();
        let (ctx, _) = context(&rt);
        let board = ctx.fetch().unwrap();
        let sync = RemoteSync::new(ctx.gateway.clone(), ctx.handle.clone());
        let mut controller = DragController::new(board.clone(), sync);

        let active = resolve_draggable("task-1", &board).unwrap();
        let over = resolve_draggable("task-4", &board).unwrap();
        run_gesture(&mut controller, active, over);

        let order: Vec<String> = controller.board().tasks().iter().map(|t| t.id.to_string()).collect();
        assert_eq!(order, vec!["task-2", "task-3", "task-1", "task-4"]);
    }

    #[test]
    fn test_gesture_drops_wip_task_before_done_task() {
        let rt = runtime();
        let columns = vec![Column::new("wip", "WIP"), Column::new("done", "Done")];
        let tasks = vec![
            Task::new(1u64, "wip", "one"),
            Task::new(2u64, "wip", "two"),
            Task::new(3u64, "done", "three"),
        ];
        let gateway = Arc::new(InMemoryGateway::new(columns.clone(), tasks.clone(), vec![]));
        let sync = RemoteSync::new(gateway.clone(), rt.handle().clone());
        let mut controller = DragController::new(Board::new(columns, tasks), sync);

        let active = Draggable::task(controller.board().task(&ItemId::from(1u64)).unwrap());
        let over = Draggable::task(controller.board().task(&ItemId::from(3u64)).unwrap());
        let announcements = run_gesture(&mut controller, active, over);

        let order: Vec<(String, String)> = controller
            .board()
            .tasks()
            .iter()
            .map(|t| (t.id.to_string(), t.column_id.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("2".to_string(), "wip".to_string()),
                ("1".to_string(), "done".to_string()),
                ("3".to_string(), "done".to_string()),
            ]
        );
        assert_eq!(
            announcements.last().map(String::as_str),
            Some("Task was dropped into column Done in position 1 of 2")
        );

        assert_eq!(await_syncs(rt.handle(), controller.sync_mut().take_in_flight()), 0);
        assert_eq!(gateway.updates().len(), 1);
    }

    #[test]
    fn test_same_column_gesture_keeps_hovered_order() {
        let rt = runtime();
        let (ctx, gateway) = context(&rt);
        let board = ctx.fetch().unwrap();
        let sync = RemoteSync::new(ctx.gateway.clone(), ctx.handle.clone());
        let mut controller = DragController::new(board.clone(), sync);

        let active = resolve_draggable("task-3", &board).unwrap();
        let over = resolve_draggable("task-1", &board).unwrap();
        run_gesture(&mut controller, active, over);

        let wip: Vec<String> = controller
            .board()
            .tasks_in_column(&ItemId::from("WIP"))
            .map(|t| t.id.to_string())
            .collect();
        assert_eq!(wip, vec!["task-3", "task-1", "task-2"]);
        assert!(controller.sync_mut().take_in_flight().is_empty());
        assert!(gateway.updates().is_empty());
    }

    #[test]
    fn test_await_syncs_counts_aborted_tasks() {
        let rt = runtime();
        let ok = rt.spawn(async {});
        let boom = rt.spawn(async { panic!("sync task blew up") });
        assert_eq!(await_syncs(rt.handle(), vec![ok, boom]), 1);
        assert_eq!(await_syncs(rt.handle(), Vec::new()), 0);
    }

    #[test]
    fn test_move_unknown_item_fails() {
        let rt = runtime();
        let (ctx, _) = context(&rt);
        let err = cmd_move(&ctx, "task-1".into(), "Nowhere".into()).unwrap_err();
        assert!(matches!(err, BoardError::NotFound { .. }));
        assert_eq!(err.to_string(), "task or column not found: Nowhere");
        assert!(matches!(
            cmd_move(&ctx, "ghost".into(), "done".into()),
            Err(BoardError::NotFound { .. })
        ));
    }

    #[test]
    fn test_add_resolves_column_priority_and_due() {
        let rt = runtime();
        let (ctx, _) = context(&rt);

        cmd_add(
            &ctx,
            "Ship it".into(),
            Some("Done".into()),
            None,
            Some("high".into()),
            Some("2030-01-02".into()),
        )
        .unwrap();

        let board = ctx.fetch().unwrap();
        let task = board.tasks().last().unwrap();
        assert_eq!(task.title, "Ship it");
        assert_eq!(task.column_id, ItemId::from("done"));
        assert_eq!(task.priority_id, Some(ItemId::from("high")));
        assert_eq!(task.due_date.as_deref(), Some("2030-01-02"));
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let rt = runtime();
        let (ctx, _) = context(&rt);
        let err = cmd_add(&ctx, "x".into(), None, None, None, Some("someday".into())).unwrap_err();
        assert!(matches!(err, BoardError::InvalidValue { .. }));
        let err = cmd_add(&ctx, "x".into(), None, None, None, Some("in 99999999999999d".into())).unwrap_err();
        assert!(matches!(err, BoardError::InvalidValue { .. }));
        let err = cmd_add(&ctx, "x".into(), Some("Backlog".into()), None, None, None).unwrap_err();
        assert!(matches!(err, BoardError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_status_and_delete() {
        let rt = runtime();
        let (ctx, _) = context(&rt);

        cmd_status(&ctx, StatusAction::Add { name: " Review ".into() }).unwrap();
        cmd_status(
            &ctx,
            StatusAction::Rename {
                column: "review".into(),
                name: "QA".into(),
            },
        )
        .unwrap();
        cmd_delete(&ctx, "task-3".into()).unwrap();

        let board = ctx.fetch().unwrap();
        assert_eq!(board.columns().last().unwrap().title, "QA");
        assert!(board.task(&ItemId::from("task-3")).is_none());
        assert!(cmd_delete(&ctx, "task-3".into()).is_err());
    }
}
