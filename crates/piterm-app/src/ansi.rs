//! ANSI escape sequences used by the renderer.

pub const CLEAR: &str = "\x1b[2J";
pub const CURSOR_HOME: &str = "\x1b[H";
pub const FG_CYAN: &str = "\x1b[36m";
pub const FG_YELLOW: &str = "\x1b[33m";
pub const FG_RESET: &str = "\x1b[39m";
