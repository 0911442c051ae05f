//! CSV export of a filtered dataset.

use crate::cache::{Cache, EvictionPolicy};
use crate::error::AppError;
use crate::query::{Dataset, Value};
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CSV_MIME: &str = "text/csv";

/// `altos_data_<YYYY-MM-DD>.csv`
pub fn export_file_name(today: NaiveDate) -> String {
    format!("altos_data_{}.csv", today.format("%Y-%m-%d"))
}

/// UTF-8 CSV bytes: header row then one line per dataset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvBlob {
    bytes: Vec<u8>,
}

impl CsvBlob {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_str(&self) -> &str {
        // Built only from Rust strings.
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &'static str {
        CSV_MIME
    }
}

/// Encode without caching. Null cells become empty fields.
/// Numbers use their `Display` form, so a whole real such as `1.0` is written `1`.
pub fn encode_csv(dataset: &Dataset) -> Result<CsvBlob, AppError> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(dataset.column_names())?;
    for row in &dataset.rows {
        wtr.write_record(row.iter().map(Value::to_string))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Export(e.to_string()))?;
    Ok(CsvBlob { bytes })
}

/// Parse CSV back into an all-text dataset.
pub fn read_csv(bytes: &[u8]) -> Result<Dataset, AppError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let names: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(|f| Value::Text(f.to_string())).collect());
    }
    Ok(Dataset::from_rows(names, rows))
}

/// SHA-256 over column names, kinds and every cell, length-prefixed so
/// differently split content cannot collide.
pub fn content_digest(dataset: &Dataset) -> [u8; 32] {
    fn field(h: &mut Sha256, tag: u8, bytes: &[u8]) {
        h.update([tag]);
        h.update((bytes.len() as u64).to_le_bytes());
        h.update(bytes);
    }

    let mut hasher = Sha256::new();
    for col in &dataset.columns {
        field(&mut hasher, b'c', col.name.as_bytes());
        field(&mut hasher, b'k', format!("{:?}", col.kind).as_bytes());
    }
    for row in &dataset.rows {
        hasher.update([b'r']);
        for cell in row {
            match cell {
                Value::Null => field(&mut hasher, b'n', &[]),
                Value::Integer(i) => field(&mut hasher, b'i', &i.to_le_bytes()),
                Value::Real(f) => field(&mut hasher, b'f', &f.to_bits().to_le_bytes()),
                Value::Text(s) => field(&mut hasher, b's', s.as_bytes()),
            }
        }
    }
    hasher.finalize().into()
}

/// Memoizes encoded CSV per distinct dataset content.
pub struct CsvExporter {
    cache: Cache<[u8; 32], Arc<CsvBlob>>,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self {
            cache: Cache::new(EvictionPolicy::Never),
        }
    }

    pub fn to_csv(&mut self, dataset: &Dataset) -> Result<Arc<CsvBlob>, AppError> {
        let key = content_digest(dataset);
        self.cache.get_or_try_insert_with(key, || {
            let blob = encode_csv(dataset)?;
            log::info!("Encoded {} rows to CSV ({} bytes)", dataset.len(), blob.len());
            Ok(Arc::new(blob))
        })
    }

    /// Number of encodings actually performed.
    pub fn encodings(&self) -> u64 {
        self.cache.misses()
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `blob` into `dir` under the dated export name.
pub fn write_export(dir: &Path, today: NaiveDate, blob: &CsvBlob) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(today));
    std::fs::write(&path, blob.as_bytes())?;
    log::info!("Wrote {:?} ({})", path, CSV_MIME);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_rows(
            vec!["zip".into(), "street".into(), "bathrooms".into()],
            vec![
                vec![Value::Text("94110".into()), Value::Text("1 A St, Apt 2".into()), Value::Real(1.5)],
                vec![Value::Text("02139".into()), Value::Text("say \"hi\"".into()), Value::Null],
            ],
        )
    }

    #[test]
    fn file_name_uses_iso_date() {
        let d = NaiveDate::from_ymd_opt(2021, 1, 31).unwrap();
        assert_eq!(export_file_name(d), "altos_data_2021-01-31.csv");
    }

    #[test]
    fn quotes_commas_and_quotes() {
        let blob = encode_csv(&sample()).unwrap();
        let lines: Vec<&str> = blob.as_str().lines().collect();
        assert_eq!(lines[0], "zip,street,bathrooms");
        assert_eq!(lines[1], "94110,\"1 A St, Apt 2\",1.5");
        assert_eq!(lines[2], "02139,\"say \"\"hi\"\"\",");
    }

    #[test]
    fn whole_reals_drop_the_fraction() {
        let ds = Dataset::from_rows(
            vec!["bathrooms".into(), "price".into()],
            vec![vec![Value::Real(1.0), Value::Integer(2500)]],
        );
        let blob = encode_csv(&ds).unwrap();
        assert_eq!(blob.as_str(), "bathrooms,price\n1,2500\n");
    }

    #[test]
    fn digest_tracks_content() {
        let a = sample();
        let mut b = sample();
        assert_eq!(content_digest(&a), content_digest(&b));
        b.rows[1][2] = Value::Text(String::new());
        assert_ne!(content_digest(&a), content_digest(&b));
    }

    #[test]
    fn exporter_reuses_blob_for_equal_content() {
        let mut exporter = CsvExporter::new();
        let first = exporter.to_csv(&sample()).unwrap();
        let second = exporter.to_csv(&sample()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(exporter.encodings(), 1);
    }
}
