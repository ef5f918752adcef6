//! Rendering of bundles and comparisons as table, YAML, JSON or CSV

use std::fs;
use std::path::Path;

use crate::bundle::Bundle;
use crate::config::OutputFormat;
use crate::diff::Classification;
use crate::error::{PlannerError, Result};

/// Column headers for a single bundle
pub const VIEW_HEADERS: [&str; 3] = ["Charm", "Channel", "Revision"];

/// Column headers for a comparison; the `S` columns hold the change markers
pub const COMPARISON_HEADERS: [&str; 7] = [
    "Charm",
    "Src Channel",
    "S",
    "Dst Channel",
    "Src Rev",
    "S",
    "Dst Rev",
];

/// Plain rows with headers, shared by the table and CSV renderers
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn for_bundle(bundle: &Bundle) -> Self {
        let rows = bundle
            .iter()
            .map(|(name, d)| vec![name.to_string(), d.channel.clone(), d.revision.to_string()])
            .collect();
        Self {
            headers: VIEW_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    pub fn for_classification(classification: &Classification) -> Self {
        fn cell<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        let rows = classification
            .records
            .iter()
            .map(|r| {
                vec![
                    r.component.clone(),
                    cell(&r.src_channel),
                    r.channel_change.to_string(),
                    cell(&r.dst_channel),
                    cell(&r.src_revision),
                    r.revision_change.to_string(),
                    cell(&r.dst_revision),
                ]
            })
            .collect();
        Self {
            headers: COMPARISON_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    /// Aligned plain-text table with a dashed rule under the headers
    pub fn to_text(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = Vec::with_capacity(self.rows.len() + 2);
        out.push(line(&self.headers));
        out.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        for row in &self.rows {
            out.push(line(row));
        }
        out.join("\n")
    }

    /// CSV with a header row
    pub fn to_csv(&self) -> Result<String> {
        let mut bytes = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut bytes);
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }
}

/// Render a single bundle
pub fn render_bundle(bundle: &Bundle, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(Table::for_bundle(bundle).to_text()),
        OutputFormat::Csv => Table::for_bundle(bundle).to_csv(),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(bundle)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(bundle)?),
    }
}

/// Render the per-charm rows of a comparison
pub fn render_classification(classification: &Classification, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(Table::for_classification(classification).to_text()),
        OutputFormat::Csv => Table::for_classification(classification).to_csv(),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(classification)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(classification)?),
    }
}

/// Write rendered output to `path`, or stdout when no path is given.
///
/// The parent directory of `path` must already exist.
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        println!("{}", content.trim_end());
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(PlannerError::InvalidOutputPath(parent.display().to_string()));
        }
    }

    let mut content = content.to_string();
    if !content.ends_with('\n') {
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}
