use jubatus_model::{BatchReport, Inspector, ModelDescriptor, ModelError};
use tracing::debug;

use crate::cli::{GlobalArgs, InfoArgs};
use crate::config::AppConfig;

pub async fn execute(global: GlobalArgs, args: InfoArgs) -> anyhow::Result<()> {
    let cfg = AppConfig::load_or_default()?;
    let options = cfg.inspect_options(&global);
    let paths = args.paths;
    debug!(?options, files = paths.len(), "Inspecting model files");

    // Sequential blocking file I/O; keep it off the async workers.
    let report = tokio::task::spawn_blocking(move || Inspector::new(options).inspect(&paths))
        .await?
        .map_err(|e| anyhow::anyhow!(fail_fast_line(&e)))?;

    println!("{}", render(&report.models, args.compact)?);
    match failure_lines(&report) {
        None => Ok(()),
        Some(lines) => Err(anyhow::anyhow!(lines)),
    }
}

fn render(models: &[ModelDescriptor], compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(models)
    } else {
        serde_json::to_string_pretty(models)
    }
}

/// The one stderr line for an aborted batch. `main` prints it.
fn fail_fast_line(err: &ModelError) -> String {
    format!("Cannot read a model file: {err}")
}

/// One line per skipped file. Batch errors already name their path once, so
/// only the error is printed. `None` when nothing failed.
fn failure_lines(report: &BatchReport) -> Option<String> {
    if report.is_complete() {
        return None;
    }
    let lines: Vec<String> = report
        .failures
        .iter()
        .map(|f| format!("Skipped: {}", f.error))
        .collect();
    Some(lines.join("\n"))
}
