use comfy_table::Cell;

use piper::report::PipelineReport;

use super::styling::{bright, bright_green, bright_yellow, cyan, dim};
use super::tables::{create_cyan_header, create_table, result_cell};

fn add_section_header(output: &mut String, icon: &str, title: &str) {
    output.push_str(&format!("{}  {}\n", bright(icon), bright(title).underlined()));
}

fn status_line(report: &PipelineReport) -> String {
    if report.complete {
        bright_green("Complete").to_string()
    } else if report.waiting_manual_trigger {
        bright_yellow("Waiting on manual trigger").to_string()
    } else if report.steps_run() == 0 {
        dim("Not started").to_string()
    } else {
        bright_yellow("In progress or stopped").to_string()
    }
}

/// Renders a human-readable summary of the pipeline state.
#[allow(clippy::format_push_string)]
pub fn render_summary(report: &PipelineReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Pipeline");

    output.push_str(&format!(
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Server:"),
        cyan(&report.server),
        dim("Pipeline:"),
        cyan(&report.pipeline),
        dim("Steps run:"),
        bright_yellow(format!("{}/{}", report.steps_run(), report.total_jobs)),
        dim("Status:"),
        status_line(report),
    ));

    if let Some(next) = &report.next_step {
        output.push_str(&format!("  {} {}\n", dim("Next step:"), cyan(next)));
    }

    output.push('\n');

    if report.steps.is_empty() {
        output.push_str(&format!("{}\n", bright_yellow("Pipeline has no jobs.")));
        return output;
    }

    add_section_header(&mut output, "📋", "Steps");

    let mut table = create_table();
    table.set_header(create_cyan_header(&["#", "Job", "Build", "Result", "Started"]));

    for (index, step) in report.steps.iter().enumerate() {
        let build = step
            .build_number
            .map_or_else(|| "-".to_string(), |number| format!("#{number}"));
        let started = step.started_at.map_or_else(
            || "-".to_string(),
            |started| started.format("%Y-%m-%d %H:%M UTC").to_string(),
        );

        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&step.job),
            Cell::new(build),
            result_cell(step),
            Cell::new(started),
        ]);
    }

    output.push_str(&format!("{table}\n"));
    output
}
