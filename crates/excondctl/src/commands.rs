//! Command handlers for excondctl.

use anyhow::{Context, Result};
use excond_common::config::{self, ExcondConfig, ReportSettings};
use excond_common::normalize::normalize;
use excond_common::report::Report;
use excond_common::signature::signature_from_descriptor;
use excond_common::trace::{replay, ReplaySummary, Trace};
use excond_common::ExceptionSiteCollector;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const TRACE_EXTENSION: &str = "jsonl";

/// Explicit config file if given, otherwise the default lookup.
pub fn load_config(path: Option<&Path>) -> Result<ExcondConfig> {
    match path {
        Some(p) => ExcondConfig::load_from(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => ExcondConfig::load()
            .with_context(|| format!("failed to load config {}", config::config_path().display())),
    }
}

/// Replay `trace` into `sink` with the given report settings.
pub fn replay_into<W: Write>(
    trace: &Path,
    sink: W,
    settings: ReportSettings,
) -> Result<(Report, ReplaySummary, W)> {
    let parsed = Trace::load(trace)
        .with_context(|| format!("failed to read trace {}", trace.display()))?;
    if let Some(desc) = &parsed.description {
        info!("replaying {}: {}", trace.display(), desc);
    }

    let mut collector = ExceptionSiteCollector::with_sink(sink, settings);
    let summary = replay(&parsed, &mut collector);
    info!("{}", summary);
    let (report, sink) = collector.into_parts();
    Ok((report, summary, sink))
}

/// Handle replay command: report goes to stdout.
pub fn handle_replay(trace: &Path) -> Result<()> {
    let settings = config::get().report.clone();
    replay_into(trace, std::io::stdout(), settings)?;
    Ok(())
}

/// Shell-friendly input: every literal `\n` stands for a line break, string
/// constants included.
fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

pub fn normalize_condition(condition: &str, fields: &[String], params: &[String]) -> String {
    let fields: BTreeSet<String> = fields.iter().cloned().collect();
    let params: BTreeSet<String> = params.iter().cloned().collect();
    normalize(&unescape_newlines(condition), &fields, &params)
}

/// Handle normalize command
pub fn handle_normalize(condition: &str, fields: &[String], params: &[String]) -> Result<()> {
    println!("{}", normalize_condition(condition, fields, params));
    Ok(())
}

/// Handle signature command
pub fn handle_signature(class: &str, method: &str, descriptor: &str) -> Result<()> {
    let sig = signature_from_descriptor(class, method, descriptor)?;
    println!("{}", sig);
    Ok(())
}

/// A trace file and its description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceListing {
    pub name: String,
    pub description: String,
}

/// Trace files in `dir`, sorted by name. Files without a description
/// comment are listed under their file name.
pub fn list_traces(dir: &Path) -> Result<Vec<TraceListing>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read trace directory {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == TRACE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut listings = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let description = Trace::description_of(&path)
            .ok()
            .flatten()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| name.clone());
        listings.push(TraceListing { name, description });
    }
    Ok(listings)
}

pub fn render_trace_list(dir: &Path, listings: &[TraceListing]) -> String {
    let width = listings.iter().map(|l| l.name.len()).max().unwrap_or(20);
    let rule = "-".repeat(width + 50);

    let mut out = String::new();
    out.push_str(&format!("Available traces ({}):\n", dir.display()));
    out.push_str(&rule);
    out.push('\n');
    for listing in listings {
        out.push_str(&format!(
            "  {:<width$}  {}\n",
            listing.name,
            listing.description,
            width = width
        ));
    }
    out.push_str(&rule);
    out.push('\n');
    out
}

/// Handle list command
pub fn handle_list(dir: &Path) -> Result<()> {
    let listings = list_traces(dir)?;
    print!("{}", render_trace_list(dir, &listings));
    Ok(())
}
