//! Color constants for the terminal user interface.

use ratatui::style::Color;

// Native Color::Cyan marks the selected column and card.

/// Border of the column or card under the dragged item
pub const DROP_TARGET: Color = Color::Rgb(0, 160, 80);
/// Floating copy of the dragged item
pub const DRAG_OVERLAY: Color = Color::Rgb(255, 215, 0);
/// Placeholder left where the dragged item sits in the board
pub const DRAG_GHOST: Color = Color::Rgb(70, 70, 70);
/// Overdue dates and failed actions
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Status bar background
pub const STATUS_BAR: Color = Color::Rgb(0, 80, 0);
