//! Board TUI entry point and setup.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};
use tracing::{info, warn};

use crate::cmd::Context;
use crate::error::Result;
use crate::tui::board::BoardApp;

/// How long to wait for status updates still in flight when the board closes.
const SYNC_GRACE: Duration = Duration::from_secs(3);

/// Initialise and run the board terminal user interface.
pub fn run_board_tui(ctx: &Context) -> Result<()> {
    // Fetch before touching the terminal so connection errors print normally.
    let mut app = BoardApp::new(ctx.clone())?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    let pending = app.take_pending_syncs();
    if !pending.is_empty() {
        info!(count = pending.len(), "waiting for status updates");
        let waited = ctx.handle.block_on(tokio::time::timeout(SYNC_GRACE, async {
            for handle in pending {
                let _ = handle.await;
            }
        }));
        if waited.is_err() {
            warn!("some status updates did not finish before exit");
        }
    }

    result?;
    Ok(())
}
