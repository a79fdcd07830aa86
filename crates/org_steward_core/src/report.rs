//! Tabular report files.
//!
//! Every operation hands its results over as a [`Table`], and operations that
//! produce several related tables use a [`Workbook`]. Tables are stored as CSV
//! files; a workbook is a directory with one CSV file per sheet. Later
//! operations read these files back, so column names used for hand-offs are
//! exported as constants from the modules that produce them.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::errors::{Error, Result};

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

/// Longest sheet name kept when a workbook is written.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// A header row plus data rows. Every row has exactly one cell per header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding missing cells with empty strings and dropping
    /// surplus ones.
    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cells: Vec<String> = row.into_iter().map(Into::into).collect();
        cells.resize(self.headers.len(), String::new());
        self.rows.push(cells);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds a column by name, ignoring case and surrounding whitespace.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    }

    /// Like [`Table::column_index`] but fails with [`Error::MissingColumn`].
    pub fn require_column(&self, name: &str, source_name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
            source_name: source_name.to_string(),
        })
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[index].as_str()).collect())
    }

    /// Inserts a column at `index` (clamped to the end). Rows without a value
    /// get an empty cell.
    pub fn insert_column(&mut self, index: usize, name: impl Into<String>, values: Vec<String>) {
        let index = index.min(self.headers.len());
        self.headers.insert(index, name.into());
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.insert(index, values.next().unwrap_or_default());
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    pub fn sort_rows_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Vec<String>, &Vec<String>) -> Ordering,
    {
        self.rows.sort_by(compare);
    }

    /// Writes the table as CSV, creating parent directories as needed.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        debug!(path = %path.display(), rows = self.rows.len(), "Wrote CSV file");
        Ok(())
    }

    /// Reads a CSV file whose first record is the header row.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut table = Table::new(headers);
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter());
        }
        debug!(path = %path.display(), rows = table.len(), "Read CSV file");
        Ok(table)
    }
}

/// An ordered set of named tables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Workbook {
    sheets: Vec<(String, Table)>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet. The name is sanitised for use as a file name and
    /// truncated to [`MAX_SHEET_NAME_LEN`] characters; a sheet with the same
    /// resulting name is replaced.
    pub fn add_sheet(&mut self, name: &str, table: Table) {
        let name = sheet_name(name);
        match self.sheets.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = table,
            None => self.sheets.push((name, table)),
        }
    }

    /// Adds a sheet under a name no other sheet uses yet, appending `_2`,
    /// `_3`, ... to the sanitised name when needed. Returns the name used.
    pub fn add_unique_sheet(&mut self, name: &str, table: Table) -> String {
        let base = sheet_name(name);
        let mut candidate = base.clone();
        let mut n = 2;
        while self.sheet(&candidate).is_some() {
            let suffix = format!("_{n}");
            let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.len());
            candidate = base.chars().take(keep).chain(suffix.chars()).collect();
            n += 1;
        }
        self.sheets.push((candidate.clone(), table));
        candidate
    }

    pub fn sheets(&self) -> &[(String, Table)] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, t)| t)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.sheets
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Writes one `<sheet>.csv` per sheet into `dir`.
    pub fn write_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        for (name, table) in &self.sheets {
            table.write_csv(&dir.join(format!("{name}.csv")))?;
        }
        info!(dir = %dir.display(), sheets = self.sheets.len(), "Wrote workbook");
        Ok(())
    }

    /// Reads every `.csv` file of `dir` as a sheet, in natural name order
    /// (`Batch_2` before `Batch_10`).
    pub fn read_dir(dir: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();
        files.sort_by(|a, b| natural_cmp(&file_stem(a), &file_stem(b)));

        let mut workbook = Workbook::new();
        for file in files {
            let table = Table::read_csv(&file)?;
            workbook.sheets.push((file_stem(&file), table));
        }
        if workbook.is_empty() {
            return Err(Error::InvalidInput(format!(
                "no CSV sheets found in {}",
                dir.display()
            )));
        }
        Ok(workbook)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Makes a sheet name safe to use as a file name.
pub fn sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

/// Compares strings treating runs of digits as numbers.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let mut ln = String::new();
                while let Some(c) = left.next_if(char::is_ascii_digit) {
                    ln.push(c);
                }
                let mut rn = String::new();
                while let Some(c) = right.next_if(char::is_ascii_digit) {
                    rn.push(c);
                }
                let ordering = ln
                    .trim_start_matches('0')
                    .len()
                    .cmp(&rn.trim_start_matches('0').len())
                    .then_with(|| ln.trim_start_matches('0').cmp(rn.trim_start_matches('0')));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                let ordering = l.to_ascii_lowercase().cmp(&r.to_ascii_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }
}

/// Builds `<prefix>_<YYYYmmdd_HHMMSS>.<extension>`, used for default output names.
pub fn timestamped_name(prefix: &str, extension: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d_%H%M%S");
    if extension.is_empty() {
        format!("{prefix}_{stamp}")
    } else {
        format!("{prefix}_{stamp}.{extension}")
    }
}

/// Formats a timestamp the way every report does.
pub fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|v| v.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}
