use std::path::Path;

use crate::output::report::Report;

/// Default location of the JSON report.
pub const DEFAULT_REPORT_PATH: &str = "output/validation_report.json";

/// Render the report as pretty-printed JSON.
pub fn to_json(report: &Report) -> Result<String, String> {
    serde_json::to_string_pretty(report).map_err(|e| format!("Failed to serialize report: {e}"))
}

/// Write the report to `path`, creating missing parent directories.
pub fn write_report(path: &Path, report: &Report) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("Report path must not be empty".to_string());
    }
    if path.is_dir() {
        return Err(format!(
            "Invalid report path '{}': it is a directory",
            path.display()
        ));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create output directory: {e}"))?;
    }

    let content = to_json(report)?;
    std::fs::write(path, content)
        .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    tracing::debug!(path = %path.display(), "report written");
    Ok(())
}
