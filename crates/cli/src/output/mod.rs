//! Output formatting and rendering of operation results

mod formatter;
mod render;

pub use formatter::Formatter;
pub use render::render_operation;

/// Output settings shared by every command
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Emit a single JSON document instead of text
    pub json: bool,
    pub no_color: bool,
    /// Suppress everything except errors
    pub quiet: bool,
}
