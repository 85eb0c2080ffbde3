use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use piper::providers::jenkins::BuildResult;
use piper::report::StepReport;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(headers: &[&str]) -> Vec<Cell> {
    headers
        .iter()
        .map(|header| Cell::new(header).fg(TableColor::Cyan))
        .collect()
}

pub fn result_cell(step: &StepReport) -> Cell {
    if step.building {
        return Cell::new("RUNNING").fg(TableColor::Yellow);
    }

    match step.result {
        Some(BuildResult::Success) => Cell::new("SUCCESS").fg(TableColor::Green),
        Some(result @ (BuildResult::Failure | BuildResult::Aborted)) => {
            Cell::new(result).fg(TableColor::Red)
        }
        Some(result) => Cell::new(result).fg(TableColor::Yellow),
        None => Cell::new("not run").fg(TableColor::DarkGrey),
    }
}
