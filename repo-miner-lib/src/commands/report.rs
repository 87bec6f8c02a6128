use crate::pipeline::RunSummary;
use core::fmt::Write;
use owo_colors::OwoColorize;
use std::path::Path;

/// Render the end-of-run summary.
pub fn write_summary<W: Write>(summary: &RunSummary, ledger: &Path, ledger_rows: usize, use_colors: bool, writer: &mut W) -> core::fmt::Result {
    let heading = "Mining summary";
    if use_colors {
        writeln!(writer, "{}", heading.bold())?;
    } else {
        writeln!(writer, "{heading}")?;
    }

    writeln!(writer, "  catalog entries        {}", summary.catalog_size)?;
    writeln!(writer, "  already recorded       {}", summary.already_recorded)?;
    if summary.duplicate_names > 0 {
        writeln!(writer, "  duplicate names        {}", summary.duplicate_names)?;
    }

    let appended = format!("{} ({} with metrics, {} without)", summary.appended(), summary.scored, summary.unscored);
    if use_colors && summary.appended() > 0 {
        writeln!(writer, "  appended               {}", appended.green())?;
    } else {
        writeln!(writer, "  appended               {appended}")?;
    }

    let analysis: Vec<&str> = summary.analysis_failures.iter().map(String::as_str).collect();
    write_failures(writer, "analysis failed", &analysis, use_colors)?;

    let retrieval: Vec<&str> = summary.retrieval_failures.iter().map(|f| f.descriptor.name.as_str()).collect();
    write_failures(writer, "could not be cloned", &retrieval, use_colors)?;

    writeln!(writer, "  ledger                 {} ({ledger_rows} repositories)", ledger.display())
}

fn write_failures<W: Write>(writer: &mut W, label: &str, names: &[&str], use_colors: bool) -> core::fmt::Result {
    if names.is_empty() {
        return Ok(());
    }

    let line = format!("  {label:<22} {}", names.len());
    if use_colors {
        writeln!(writer, "{}", line.yellow())?;
    } else {
        writeln!(writer, "{line}")?;
    }

    for name in names {
        writeln!(writer, "    {name}")?;
    }
    Ok(())
}
