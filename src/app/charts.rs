//! Data behind the preview table, histogram and map. Rendering lives elsewhere.

use crate::error::AppError;
use crate::query::Dataset;
use serde::Serialize;

pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";
/// Columns the histogram can be drawn over.
pub const HISTOGRAM_COLUMNS: &[&str] = &["bedrooms", "bathrooms"];

/// First `n` rows.
pub fn preview(dataset: &Dataset, n: usize) -> Dataset {
    dataset.with_rows(dataset.rows.iter().take(n).cloned().collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub value: f64,
    pub count: usize,
}

/// Count of each distinct numeric value in `column`, ascending. Nulls and
/// non-numeric cells are skipped.
pub fn histogram(dataset: &Dataset, column: &str) -> Result<Vec<HistogramBin>, AppError> {
    let cells = dataset
        .column(column)
        .ok_or_else(|| AppError::Validation(format!("dataset has no column '{}'", column)))?;
    let mut values: Vec<f64> = cells.filter_map(|v| v.as_f64()).filter(|f| f.is_finite()).collect();
    values.sort_by(f64::total_cmp);

    let mut bins: Vec<HistogramBin> = Vec::new();
    for v in values {
        match bins.last_mut() {
            Some(bin) if bin.value == v => bin.count += 1,
            _ => bins.push(HistogramBin { value: v, count: 1 }),
        }
    }
    Ok(bins)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Rows with both coordinates present.
pub fn map_points(dataset: &Dataset) -> Result<Vec<MapPoint>, AppError> {
    let lat = dataset
        .column_index(LATITUDE_COLUMN)
        .ok_or_else(|| AppError::Validation("dataset has no latitude column".into()))?;
    let lon = dataset
        .column_index(LONGITUDE_COLUMN)
        .ok_or_else(|| AppError::Validation("dataset has no longitude column".into()))?;
    Ok(dataset
        .rows
        .iter()
        .filter_map(|row| {
            let latitude = row.get(lat)?.as_f64()?;
            let longitude = row.get(lon)?.as_f64()?;
            Some(MapPoint { latitude, longitude })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Value;

    #[test]
    fn histogram_counts_and_orders_bins() {
        let ds = Dataset::from_rows(
            vec!["bathrooms".into()],
            vec![
                vec![Value::Real(2.0)],
                vec![Value::Real(1.0)],
                vec![Value::Null],
                vec![Value::Real(1.0)],
                vec![Value::Real(1.5)],
            ],
        );
        let bins = histogram(&ds, "bathrooms").unwrap();
        assert_eq!(
            bins,
            vec![
                HistogramBin { value: 1.0, count: 2 },
                HistogramBin { value: 1.5, count: 1 },
                HistogramBin { value: 2.0, count: 1 },
            ]
        );
    }

    #[test]
    fn preview_keeps_columns() {
        let ds = Dataset::from_rows(
            vec!["a".into()],
            (0..5).map(|i| vec![Value::Integer(i)]).collect(),
        );
        let p = preview(&ds, 2);
        assert_eq!(p.columns, ds.columns);
        assert_eq!(p.len(), 2);
    }
}
