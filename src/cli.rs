use clap::Parser;

use crate::cmd::Commands;

/// Kanban board client for the project-management REST API.
/// The backend defaults to http://localhost:5140/api, or $TASKBOARD_API_URL.
#[derive(Parser)]
#[command(name = "taskboard", version, about = "Drag-and-drop kanban board for the terminal")]
pub struct Cli {
    /// Base URL of the REST API.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Only show tasks of this project board.
    #[arg(long, global = true)]
    pub board: Option<String>,

    /// Use a built-in demo board instead of the backend.
    #[arg(long, global = true)]
    pub offline: bool,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "taskboard",
            "list",
            "--api-url",
            "http://example.test/api",
            "--board",
            "b-1",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://example.test/api"));
        assert_eq!(cli.board.as_deref(), Some("b-1"));
        assert!(cli.verbose);
        assert!(!cli.offline);
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_move_arguments() {
        let cli = Cli::try_parse_from(["taskboard", "--offline", "move", "task-1", "done"]).unwrap();
        assert!(cli.offline);
        match cli.command {
            Commands::Move { active, over } => {
                assert_eq!(active, "task-1");
                assert_eq!(over, "done");
            }
            _ => panic!("expected move"),
        }
    }
}
