//! Generic claims table parser.
//!
//! Provides a streaming parser for delimited claims tables with a header row.
//! Columns are located by header name, so column order is free and extra
//! columns are ignored.

use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};

use crate::types::{ClaimsError, ClaimsResult, LoadConfig};

/// Trait for types that can be parsed from a claims table row.
pub trait TableRecord: Sized {
    /// Table name, used in errors and logs.
    const TABLE: &'static str;

    /// Columns that must appear in the header.
    const REQUIRED_COLUMNS: &'static [&'static str];

    /// Parses a record. `columns` locates [`Self::REQUIRED_COLUMNS`] by
    /// position in that list.
    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> ClaimsResult<Self>;
}

/// Header positions of a table's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    table: &'static str,
    headers: Vec<String>,
    required: Vec<(&'static str, usize)>,
}

impl ColumnIndex {
    /// Locates `required` columns in a header row.
    ///
    /// # Errors
    /// Returns [`ClaimsError::MissingColumn`] for the first absent column.
    pub fn from_headers(
        table: &'static str,
        headers: &StringRecord,
        required: &[&'static str],
    ) -> ClaimsResult<Self> {
        let headers: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                // Handle UTF-8 BOM at start of file
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();

        let required = required
            .iter()
            .map(|column| {
                headers
                    .iter()
                    .position(|h| h == column)
                    .map(|pos| (*column, pos))
                    .ok_or_else(|| ClaimsError::MissingColumn {
                        table: table.to_string(),
                        column: column.to_string(),
                    })
            })
            .collect::<ClaimsResult<Vec<_>>>()?;

        Ok(Self {
            table,
            headers,
            required,
        })
    }

    /// Table name.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Every header name, in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Header positions not claimed by a required column, with their names.
    pub fn other_columns(&self) -> impl Iterator<Item = (usize, &str)> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.required.iter().any(|(_, pos)| pos == i))
            .map(|(i, h)| (i, h.as_str()))
    }

    /// Value of the `n`th required column; missing trailing fields read as blank.
    pub fn value<'r>(&self, record: &'r StringRecord, n: usize) -> &'r str {
        self.required
            .get(n)
            .and_then(|(_, pos)| record.get(*pos))
            .unwrap_or("")
    }

    /// Value of the `n`th required column, which must be non-blank.
    pub fn required<'r>(&self, record: &'r StringRecord, n: usize) -> ClaimsResult<&'r str> {
        let value = self.value(record, n);
        if value.trim().is_empty() {
            return Err(ClaimsError::MissingField {
                table: self.table.to_string(),
                column: self
                    .required
                    .get(n)
                    .map(|(c, _)| c.to_string())
                    .unwrap_or_default(),
            });
        }
        Ok(value)
    }
}

/// A streaming parser for claims tables.
///
/// This parser reads a table record-by-record; blank rows are skipped and
/// the first malformed row ends iteration with an error.
pub struct TableParser<R: Read, T: TableRecord> {
    reader: Reader<R>,
    columns: ColumnIndex,
    _marker: PhantomData<T>,
}

impl<T: TableRecord> TableParser<BufReader<File>, T> {
    /// Creates a new parser from a file path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its header lacks a
    /// required column.
    pub fn from_path<P: AsRef<Path>>(path: P, config: &LoadConfig) -> ClaimsResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), config)
    }
}

impl<R: Read, T: TableRecord> TableParser<R, T> {
    /// Creates a new parser from a reader.
    pub fn from_reader(reader: R, config: &LoadConfig) -> ClaimsResult<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(config.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(if config.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .from_reader(reader);

        let columns = ColumnIndex::from_headers(T::TABLE, reader.headers()?, T::REQUIRED_COLUMNS)?;

        Ok(Self {
            reader,
            columns,
            _marker: PhantomData,
        })
    }

    /// Header positions of this table.
    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    /// Parses all records into a Vec, stopping at the first error.
    pub fn parse_all(self) -> ClaimsResult<Vec<T>> {
        self.collect()
    }
}

impl<R: Read, T: TableRecord> Iterator for TableParser<R, T> {
    type Item = ClaimsResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut record = StringRecord::new();
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    // Skip empty records
                    if record.iter().all(|f| f.trim().is_empty()) {
                        continue;
                    }

                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    return Some(T::from_record(&record, &self.columns).map_err(|source| {
                        ClaimsError::Row {
                            table: T::TABLE.to_string(),
                            line,
                            source: Box::new(source),
                        }
                    }));
                }
                Ok(false) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Helper functions for parsing claims field values.
pub mod parse {
    use chrono::NaiveDate;

    use super::{ClaimsError, ClaimsResult};

    const DATE_FORMAT: &str = "%Y-%m-%d";

    /// Parses a `YYYY-MM-DD` date, ignoring a time suffix
    /// (`2023-01-05 00:00:00`, `2023-01-05T08:30:00`).
    pub fn date(value: &str) -> ClaimsResult<NaiveDate> {
        let value = value.trim();
        let day = match value.char_indices().nth(10) {
            Some((idx, ' ' | 'T')) => &value[..idx],
            Some(_) => value,
            None => value,
        };
        NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|_| ClaimsError::InvalidDate {
            value: value.to_string(),
        })
    }

    /// Trims a free-text field.
    pub fn text(value: &str) -> String {
        value.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(fields: &[&str]) -> StringRecord {
        let mut record = StringRecord::new();
        for field in fields {
            record.push_field(field);
        }
        record
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse::date("2023-01-05").unwrap().to_string(), "2023-01-05");
        assert_eq!(parse::date("2023-01-05 00:00:00").unwrap().to_string(), "2023-01-05");
        assert_eq!(parse::date("2023-01-05T08:30:00").unwrap().to_string(), "2023-01-05");
        assert_eq!(parse::date(" 2023-01-05 ").unwrap().to_string(), "2023-01-05");
        assert!(parse::date("20230105").is_err());
        assert!(parse::date("01/05/2023").is_err());
        assert!(parse::date("2023-02-30").is_err());
        assert!(parse::date("").is_err());
    }

    #[test]
    fn test_column_index_by_name() {
        let headers = make_record(&["\u{feff}icd_code", "extra", "claim_entry_id"]);
        let index =
            ColumnIndex::from_headers("claims_diagnoses", &headers, &["claim_entry_id", "icd_code"])
                .unwrap();

        let record = make_record(&["E11.9", "x", "CE1"]);
        assert_eq!(index.value(&record, 0), "CE1");
        assert_eq!(index.value(&record, 1), "E11.9");
        assert_eq!(index.other_columns().collect::<Vec<_>>(), vec![(1, "extra")]);
    }

    #[test]
    fn test_column_index_missing_column() {
        let headers = make_record(&["claim_entry_id"]);
        let err = ColumnIndex::from_headers("claims_diagnoses", &headers, &["claim_entry_id", "icd_code"])
            .unwrap_err();
        assert!(matches!(
            err,
            ClaimsError::MissingColumn { ref table, ref column }
                if table == "claims_diagnoses" && column == "icd_code"
        ));
    }

    #[test]
    fn test_required_rejects_blank_and_short_rows() {
        let headers = make_record(&["claim_entry_id", "icd_code"]);
        let index =
            ColumnIndex::from_headers("claims_diagnoses", &headers, &["claim_entry_id", "icd_code"])
                .unwrap();

        assert!(index.required(&make_record(&["CE1", "I10"]), 0).is_ok());
        assert!(index.required(&make_record(&["  ", "I10"]), 0).is_err());
        assert_eq!(index.value(&make_record(&["CE1"]), 1), "");
        assert!(index.required(&make_record(&["CE1"]), 1).is_err());
    }
}
