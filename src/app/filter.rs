//! Zip-code domain and row filtering.

use crate::error::AppError;
use crate::query::{Dataset, Value};
use std::collections::BTreeSet;

/// Sorted, duplicate-free zip codes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZipCodeSet(Vec<String>);

impl ZipCodeSet {
    /// Zip domain of `column` in `dataset`.
    pub fn from_dataset(dataset: &Dataset, column: &str) -> Result<Self, AppError> {
        let cells = dataset
            .column(column)
            .ok_or_else(|| AppError::Validation(format!("dataset has no column '{}'", column)))?;
        Ok(unique_sorted(cells))
    }

    pub fn contains(&self, zip: &str) -> bool {
        self.0.iter().any(|z| z == zip)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Deduplicate and sort. Nulls are dropped. Numeric order when every value is
/// all digits, plain string order otherwise.
pub fn unique_sorted<'a, I>(column: I) -> ZipCodeSet
where
    I: IntoIterator<Item = &'a Value>,
{
    let keys: BTreeSet<String> = column.into_iter().filter_map(Value::as_key).collect();
    let mut keys: Vec<String> = keys.into_iter().collect();
    let numeric = keys
        .iter()
        .all(|k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()));
    if numeric {
        // Leading zeros are significant for zips, so equal numbers keep string order.
        keys.sort_by(|a, b| {
            let na = a.trim_start_matches('0');
            let nb = b.trim_start_matches('0');
            na.len().cmp(&nb.len()).then_with(|| na.cmp(nb)).then_with(|| a.cmp(b))
        });
    }
    ZipCodeSet(keys)
}

/// User choice in the zip multi-select. Selecting everything must be explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZipSelection {
    All,
    Only(Vec<String>),
}

impl ZipSelection {
    /// Concrete zips chosen out of `domain`. Unknown zips are dropped.
    pub fn resolve(&self, domain: &ZipCodeSet) -> ZipCodeSet {
        match self {
            Self::All => domain.clone(),
            Self::Only(chosen) => {
                let values: Vec<Value> = chosen.iter().map(|z| Value::Text(z.clone())).collect();
                let picked = unique_sorted(&values);
                let (known, unknown): (Vec<String>, Vec<String>) =
                    picked.0.into_iter().partition(|z| domain.contains(z));
                if !unknown.is_empty() {
                    log::warn!("Ignoring zip codes not in the dataset: {}", unknown.join(", "));
                }
                ZipCodeSet(known)
            }
        }
    }
}

/// Rows whose `column` value is in `chosen`. Empty `chosen` gives an empty
/// dataset; null cells never match. Columns are kept as-is.
pub fn apply_filter(dataset: &Dataset, column: &str, chosen: &ZipCodeSet) -> Result<Dataset, AppError> {
    let idx = dataset
        .column_index(column)
        .ok_or_else(|| AppError::Validation(format!("dataset has no column '{}'", column)))?;
    let chosen: BTreeSet<&str> = chosen.iter().map(String::as_str).collect();
    let rows = dataset
        .rows
        .iter()
        .filter(|row| {
            row.get(idx)
                .and_then(Value::as_key)
                .map_or(false, |zip| chosen.contains(zip.as_str()))
        })
        .cloned()
        .collect();
    Ok(dataset.with_rows(rows))
}
