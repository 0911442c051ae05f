//! Tabular result model: named columns, rows in server order.

use chrono::NaiveDate;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Normalized text used for membership tests (zip codes and the like).
    /// Whole reals collapse to their integer form so `94110.0` matches `94110`.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(i.to_string()),
            Self::Real(f) if f.fract() == 0.0 && f.is_finite() => Some(format!("{}", *f as i64)),
            Self::Real(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.trim().to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null => None,
        }
    }

    pub(crate) fn from_sql_ref(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Self::Text(b.iter().map(|byte| format!("{:02x}", byte)).collect()),
        }
    }

    fn kind(&self) -> ColumnKind {
        match self {
            Self::Null => ColumnKind::Unknown,
            Self::Integer(_) => ColumnKind::Integer,
            Self::Real(_) => ColumnKind::Real,
            Self::Text(_) => ColumnKind::Text,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    /// Every value in the column was NULL.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Dataset {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build from column names and rows; kinds come from the first non-null cell.
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .find(|v| !v.is_null())
                    .map(Value::kind)
                    .unwrap_or(ColumnKind::Unknown);
                Column { name, kind }
            })
            .collect();
        Self { columns, rows }
    }

    /// Same columns, different rows.
    pub fn with_rows(&self, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Cells of one column in row order; `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| r.get(idx).unwrap_or(&Value::Null)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Bound parameter value. Dates bind as ISO `YYYY-MM-DD` text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
    Date(NaiveDate),
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::from(rusqlite::types::Null),
            Self::Integer(i) => ToSqlOutput::from(*i),
            Self::Text(s) => ToSqlOutput::from(s.as_str()),
            Self::Date(d) => ToSqlOutput::from(d.format("%Y-%m-%d").to_string()),
        })
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Named parameters, ordered so equal mappings hash equally.
pub type Params = BTreeMap<String, SqlValue>;

/// SQL text plus named parameters. Equality of both is the memoization key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub sql: String,
    pub params: Params,
}

impl Query {
    /// Parameter names are stored with their `:` prefix.
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        let params = params
            .into_iter()
            .map(|(k, v)| {
                if k.starts_with(':') {
                    (k, v)
                } else {
                    (format!(":{}", k), v)
                }
            })
            .collect();
        Self {
            sql: sql.into(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_first_non_null_cell() {
        let ds = Dataset::from_rows(
            vec!["zip".into(), "price".into(), "note".into()],
            vec![
                vec![Value::Null, Value::Real(1.5), Value::Null],
                vec![Value::Integer(94110), Value::Real(2.0), Value::Null],
            ],
        );
        assert_eq!(ds.columns[0].kind, ColumnKind::Integer);
        assert_eq!(ds.columns[1].kind, ColumnKind::Real);
        assert_eq!(ds.columns[2].kind, ColumnKind::Unknown);
    }

    #[test]
    fn as_key_normalizes_whole_reals() {
        assert_eq!(Value::Real(94110.0).as_key(), Some("94110".into()));
        assert_eq!(Value::Text(" 02139 ".into()).as_key(), Some("02139".into()));
        assert_eq!(Value::Null.as_key(), None);
    }

    #[test]
    fn query_params_get_colon_prefix() {
        let mut params = Params::new();
        params.insert("start".into(), SqlValue::Integer(1));
        params.insert(":end".into(), SqlValue::Integer(2));
        let q = Query::new("SELECT 1", params);
        assert!(q.params.contains_key(":start"));
        assert!(q.params.contains_key(":end"));
    }
}
