//! # taskboard - Drag-and-drop kanban board for the terminal
//!
//! A client for a project-management REST backend that shows its status
//! columns and task cards as a kanban board, and lets you reorder both by
//! dragging with the keyboard or the mouse.
//!
//! ## Key Features
//!
//! - **Live reordering**: tasks move between columns while they are dragged,
//!   columns reorder on drop
//! - **Optimistic sync**: a task that changes column is saved in the
//!   background; the board never waits for the network
//! - **Screen-reader style announcements**: every pick-up, hover, drop and
//!   cancel produces a status line describing the new position
//! - **Scriptable**: the same drag engine runs headless behind `taskboard move`
//!
//! ## Quick Start
//!
//! ```bash
//! # Open the board against a local backend
//! taskboard ui
//!
//! # Try it without a backend
//! taskboard --offline ui
//!
//! # Drag a task onto another task, from the shell
//! taskboard move "Write docs" "Release notes"
//!
//! # List columns and their tasks
//! taskboard list --board 3f2a
//! ```
//!
//! ## Configuration
//!
//! - `--api-url` or `TASKBOARD_API_URL`: backend base URL (default
//!   `http://localhost:5140/api`)
//! - `TASKBOARD_TOKEN`: bearer token sent with every request
//! - `TASKBOARD_LOG`: tracing filter, e.g. `taskboard=debug`
//!
//! The interactive board logs to `~/.taskboard/taskboard.log`; every other
//! command logs to stderr.

use std::sync::Arc;

use clap::Parser;
use tracing::error;

pub mod api;
pub mod cli;
pub mod cmd;
pub mod db;
pub mod dnd;
pub mod error;
pub mod fields;
pub mod logging;
pub mod task;
pub mod tui {
    pub mod board;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod overlay;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}

use api::{get_api_url, InMemoryGateway, RestGateway, TaskGateway};
use cli::Cli;
use cmd::*;
use logging::{init_tracing, log_file_path};

fn main() {
    let cli = Cli::parse();

    // Completions need neither logging nor a backend.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let log_file = match cli.command {
        Commands::Ui => log_file_path(),
        _ => None,
    };
    init_tracing(cli.verbose, log_file.as_deref());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let gateway: Arc<dyn TaskGateway> = if cli.offline {
        Arc::new(InMemoryGateway::demo())
    } else {
        Arc::new(RestGateway::new(get_api_url(cli.api_url.as_deref())))
    };
    let ctx = Context {
        gateway,
        handle: runtime.handle().clone(),
        project_board: cli.board,
    };

    let result = match cli.command {
        Commands::Ui => cmd_ui(&ctx),
        Commands::List => cmd_list(&ctx),
        Commands::Move { active, over } => cmd_move(&ctx, active, over),
        Commands::Add { title, column, desc, priority, due } => cmd_add(&ctx, title, column, desc, priority, due),
        Commands::Status { action } => cmd_status(&ctx, action),
        Commands::Delete { task } => cmd_delete(&ctx, task),
        Commands::Completions { .. } => Ok(()),
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
