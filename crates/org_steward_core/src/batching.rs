//! Groups repositories into size-limited batches for backup runs.

use tracing::{debug, info, instrument};

use crate::errors::{Error, Result};
use crate::inventory::ESTIMATED_FULL_SIZE_KB_COLUMN;
use crate::report::{Table, Workbook};

#[cfg(test)]
#[path = "batching_tests.rs"]
mod tests;

pub const DEFAULT_SIZE_LIMIT_GB: f64 = 70.0;
pub const DEFAULT_MAX_PER_BATCH: usize = 30;

pub const ESTIMATED_FULL_SIZE_GB_COLUMN: &str = "estimated_full_size_gb";

const KB_PER_GB: f64 = 1024.0 * 1024.0;

/// Limits applied to every batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchLimits {
    pub size_limit_gb: f64,
    pub max_per_batch: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            size_limit_gb: DEFAULT_SIZE_LIMIT_GB,
            max_per_batch: DEFAULT_MAX_PER_BATCH,
        }
    }
}

/// Packs `items` into batches, largest first.
///
/// An item joins the current batch while the batch has room for another item
/// and stays within the size limit; otherwise it opens a new batch. An item
/// larger than the limit ends up alone in its batch.
pub fn plan_batches<T>(mut items: Vec<(T, f64)>, limits: BatchLimits) -> Vec<Vec<(T, f64)>> {
    items.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut batches = Vec::new();
    let mut current: Vec<(T, f64)> = Vec::new();
    let mut current_size = 0.0;

    for (item, size) in items {
        let fits = current.len() < limits.max_per_batch.max(1)
            && current_size + size <= limits.size_limit_gb;
        if !fits && !current.is_empty() {
            debug!(items = current.len(), size_gb = current_size, "Closing batch");
            batches.push(std::mem::take(&mut current));
            current_size = 0.0;
        }
        current_size += size;
        current.push((item, size));
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Splits a size estimate table into `Batch_1..n` sheets.
///
/// Each row keeps its original columns plus `estimated_full_size_gb`.
#[instrument(skip(estimates), fields(rows = estimates.len()))]
pub fn batch_workbook(estimates: &Table, limits: BatchLimits) -> Result<Workbook> {
    let size_index = estimates.require_column(ESTIMATED_FULL_SIZE_KB_COLUMN, "size estimates")?;

    let mut items = Vec::with_capacity(estimates.len());
    for (line, row) in estimates.rows().iter().enumerate() {
        let raw = row[size_index].trim();
        let kb: f64 = raw.parse().map_err(|_| {
            Error::InvalidInput(format!(
                "row {}: '{raw}' is not a size in kilobytes",
                line + 2
            ))
        })?;
        items.push((row.clone(), kb / KB_PER_GB));
    }

    let mut headers: Vec<String> = estimates.headers().to_vec();
    headers.push(ESTIMATED_FULL_SIZE_GB_COLUMN.to_string());

    let batches = plan_batches(items, limits);
    let mut workbook = Workbook::new();
    for (i, batch) in batches.into_iter().enumerate() {
        let mut table = Table::new(headers.iter().cloned());
        for (mut row, size_gb) in batch {
            row.push(size_gb.to_string());
            table.push_row(row);
        }
        workbook.add_sheet(&format!("Batch_{}", i + 1), table);
    }
    info!(batches = workbook.len(), "Planned backup batches");
    Ok(workbook)
}
