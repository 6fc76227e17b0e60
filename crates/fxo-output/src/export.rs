//! CSV and DataFrame export of column data.
//!
//! Input is the column-major data returned by `get_data` of a
//! [`fxo_data::FilingSet`] or one of its resource collections.

use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use fxo_data::{ColumnData, DataValue, TimeAccuracy};
use polars::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write column data as CSV with a header row.
///
/// Missing values are empty fields, datetimes use `time_accuracy` and
/// lists are joined with newlines.
///
/// # Errors
/// Returns [`crate::OutputError::Csv`] if writing fails.
pub fn write_csv<W: Write>(writer: W, data: &ColumnData, time_accuracy: TimeAccuracy) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(data.keys())?;

    let rows = data.values().map(Vec::len).max().unwrap_or(0);
    for i in 0..rows {
        let record = data.values().map(|values| {
            values
                .get(i)
                .and_then(Option::as_ref)
                .map(|v| v.to_text(time_accuracy))
                .unwrap_or_default()
        });
        wtr.write_record(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save column data to a CSV file.
///
/// # Errors
/// Returns [`crate::OutputError::Io`] if the file cannot be created.
pub fn save_csv<P: AsRef<Path>>(path: P, data: &ColumnData, time_accuracy: TimeAccuracy) -> Result<()> {
    let file = File::create(path)?;
    write_csv(file, data, time_accuracy)
}

/// Build a DataFrame with one column per data attribute.
///
/// Integer, float, date and datetime columns keep their types when all
/// values share the type. Datetimes are stored in UTC. Other columns
/// are strings.
///
/// # Errors
/// Returns [`crate::OutputError::Polars`] if the columns differ in length.
pub fn to_dataframe(data: &ColumnData) -> Result<DataFrame> {
    let columns: Vec<Column> = data
        .iter()
        .map(|(name, values)| to_series(name, values).into())
        .collect();
    Ok(DataFrame::new(columns)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Integer,
    Real,
    Date,
    DateTime,
    Text,
}

fn column_kind(values: &[Option<DataValue>]) -> Kind {
    let mut kind = None;
    for value in values.iter().flatten() {
        let this = match value {
            DataValue::Integer(_) => Kind::Integer,
            DataValue::Real(_) => Kind::Real,
            DataValue::Date(_) => Kind::Date,
            DataValue::DateTime(_) => Kind::DateTime,
            DataValue::Text(_) | DataValue::List(_) => return Kind::Text,
        };
        kind = match (kind, this) {
            (None, k) => Some(k),
            (Some(a), b) if a == b => Some(a),
            (Some(Kind::Integer | Kind::Real), Kind::Integer | Kind::Real) => Some(Kind::Real),
            _ => return Kind::Text,
        };
    }
    kind.unwrap_or(Kind::Text)
}

fn to_series(name: &str, values: &[Option<DataValue>]) -> Series {
    let name = PlSmallStr::from(name);
    match column_kind(values) {
        Kind::Integer => {
            let v: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Some(DataValue::Integer(i)) => Some(*i),
                    _ => None,
                })
                .collect();
            Series::new(name, v)
        }
        Kind::Real => {
            let v: Vec<Option<f64>> = values
                .iter()
                .map(|v| match v {
                    Some(DataValue::Real(r)) => Some(*r),
                    Some(DataValue::Integer(i)) => Some(*i as f64),
                    _ => None,
                })
                .collect();
            Series::new(name, v)
        }
        Kind::Date => {
            let v: Vec<Option<NaiveDate>> = values
                .iter()
                .map(|v| match v {
                    Some(DataValue::Date(d)) => Some(*d),
                    _ => None,
                })
                .collect();
            Series::new(name, v)
        }
        Kind::DateTime => {
            let v: Vec<Option<NaiveDateTime>> = values
                .iter()
                .map(|v| match v {
                    Some(DataValue::DateTime(dt)) => Some(dt.naive_utc()),
                    _ => None,
                })
                .collect();
            Series::new(name, v)
        }
        Kind::Text => {
            let v: Vec<Option<String>> = values
                .iter()
                .map(|v| v.as_ref().map(ToString::to_string))
                .collect();
            Series::new(name, v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn data() -> ColumnData {
        let mut data = ColumnData::new();
        data.insert("api_id".to_string(), vec![Some("1".into()), Some("2".into())]);
        data.insert("error_count".to_string(), vec![Some(DataValue::Integer(3)), None]);
        data.insert(
            "added_time".to_string(),
            vec![Some(Utc.with_ymd_and_hms(2023, 3, 6, 14, 41, 14).unwrap().into()), None],
        );
        data.insert(
            "calc_unreported_items".to_string(),
            vec![Some(DataValue::List(vec!["a".to_string(), "b".to_string()])), None],
        );
        data
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &data(), TimeAccuracy::Sec).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "api_id,error_count,added_time,calc_unreported_items\n\
             1,3,2023-03-06 14:41:14,\"a\nb\"\n\
             2,,,\n"
        );
    }

    #[test]
    fn test_save_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filings.csv");
        save_csv(&path, &data(), TimeAccuracy::Day).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("1,3,2023-03-06,"));
    }

    #[test]
    fn test_to_dataframe() {
        let df = to_dataframe(&data()).unwrap();
        assert_eq!(df.shape(), (2, 4));
        assert_eq!(df.column("api_id").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("error_count").unwrap().dtype(), &DataType::Int64);
        assert!(matches!(
            df.column("added_time").unwrap().dtype(),
            DataType::Datetime(_, None)
        ));
        assert_eq!(df.column("error_count").unwrap().null_count(), 1);
    }

    #[rstest]
    #[case(vec![Some(DataValue::Integer(1)), None], Kind::Integer)]
    #[case(vec![Some(DataValue::Integer(1)), Some(DataValue::Real(0.5))], Kind::Real)]
    #[case(vec![Some(DataValue::Integer(1)), Some("x".into())], Kind::Text)]
    #[case(vec![None, None], Kind::Text)]
    #[case(vec![Some(DataValue::Date(NaiveDate::from_ymd_opt(2022, 12, 31).unwrap()))], Kind::Date)]
    fn test_column_kind(#[case] values: Vec<Option<DataValue>>, #[case] expected: Kind) {
        assert_eq!(column_kind(&values), expected);
    }
}
