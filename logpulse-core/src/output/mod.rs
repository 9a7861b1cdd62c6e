use crate::report::AnalysisReport;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

pub mod console;
pub mod json;

pub use console::ConsoleOutput;
pub use json::JsonOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Console,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "console" | "text" => Ok(OutputFormat::Console),
            _ => Err(anyhow::anyhow!("Unsupported output format: {}", s)),
        }
    }
}

pub trait OutputGenerator {
    fn generate(&self, report: &AnalysisReport) -> Result<String>;
    fn file_extension(&self) -> &str;
}

pub fn create_generator(format: OutputFormat) -> Box<dyn OutputGenerator> {
    match format {
        OutputFormat::Json => Box::new(JsonOutput::pretty()),
        OutputFormat::Console => Box::new(ConsoleOutput),
    }
}

pub fn generate_report(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    create_generator(format).generate(report)
}

/// Write rendered output, creating missing parent directories.
pub fn save_report(content: &str, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("Report saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("CONSOLE".parse::<OutputFormat>().unwrap(), OutputFormat::Console);
        assert!("html".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_save_report_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("report.json");
        let content = generate_report(&AnalysisReport::empty(), OutputFormat::Json).unwrap();

        save_report(&content, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }
}
