//! CLI output formatting

use crate::controllers::StateDto;
use crate::core::state::{ControllerEvent, ControllerState};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format one pipeline event for display
pub fn format_event(pipeline: &str, event: ControllerEvent) -> String {
    match event {
        ControllerEvent::Started => {
            format!("{} {} started", ROCKET, style(pipeline).bold())
        }
        ControllerEvent::Paused => {
            format!("{} {} paused", SPINNER, style(pipeline).yellow())
        }
        ControllerEvent::Resumed => {
            format!("{} {} resumed", SPINNER, style(pipeline).cyan())
        }
        ControllerEvent::Cancelled => {
            format!("{} {} cancelled", CROSS, style(pipeline).yellow())
        }
        ControllerEvent::Failed => {
            format!("{} {} {}", CROSS, style(pipeline).bold(), style("failed").red())
        }
        ControllerEvent::Finished => format!(
            "{} {} completed {}",
            CHECK,
            style(pipeline).bold(),
            style("successfully").green()
        ),
        ControllerEvent::Changed => format!("{} {} changed", INFO, style(pipeline).dim()),
    }
}

/// Format a controller state label
pub fn format_state(state: ControllerState) -> String {
    match state {
        ControllerState::Unconstructed => style("UNCONSTRUCTED").dim().to_string(),
        ControllerState::Constructed => style("CONSTRUCTED").dim().to_string(),
        ControllerState::Started => style("STARTED").yellow().to_string(),
        ControllerState::Paused => style("PAUSED").blue().to_string(),
        ControllerState::Cancelled => style("CANCELLED").yellow().to_string(),
        ControllerState::Finished => style("FINISHED").green().to_string(),
        ControllerState::Failed => style("FAILED").red().to_string(),
    }
}

/// Render a state tree as an indented listing
pub fn render_state_tree(dto: &StateDto) -> String {
    let mut lines = Vec::new();
    render_node(dto, 0, &mut lines);
    lines.join("\n")
}

fn render_node(dto: &StateDto, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let mut line = format!("{}{} [{}]", indent, style(&dto.name).bold(), dto.kind);
    if let Some(error) = &dto.error {
        line.push_str(&format!(" - {}", style(error).red()));
    }
    lines.push(line);
    for child in dto
        .stages
        .iter()
        .chain(dto.jobs.iter())
        .chain(dto.steps.iter())
        .flatten()
    {
        render_node(child, depth + 1, lines);
    }
}
