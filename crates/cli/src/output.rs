// Output formatting for CLI

use anyhow::{Context, Result};
use clap::ValueEnum;
use troll_replicator::RunReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn render(&self, report: &RunReport) -> Result<String> {
        match self {
            OutputFormat::Json => report.to_json().context("failed to serialize run report"),
            OutputFormat::Text => Ok(report.to_string()),
        }
    }

    pub fn print_report(&self, report: &RunReport) -> Result<()> {
        let rendered = self.render(report)?;
        println!("{}", rendered.trim_end());
        Ok(())
    }
}
