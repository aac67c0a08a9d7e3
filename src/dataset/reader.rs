//! Streaming reader for delimited dataset files
//!
//! The on-disk layout is: one row of metadata keys, one row of metadata
//! values (paired positionally), one row of column names, then data rows.
//! Rows are yielded one at a time; the file is never materialized whole.

use std::collections::HashMap;
use std::io::Read;

use crate::error::{BatchmlError, Result};

/// Delimited-format options for a dataset file
#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    /// Field delimiter
    pub delimiter: u8,
    /// Quote character enclosing fields that contain the delimiter
    pub quote: u8,
    /// Escape character honored inside quoted fields
    pub escape: u8,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: b'\\',
        }
    }
}

/// Metadata extracted from the first two rows of a dataset file
#[derive(Debug, Clone)]
pub struct DatasetMetadata {
    fields: HashMap<String, String>,
}

impl DatasetMetadata {
    /// Raw metadata value by field name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    /// Number of feature columns declared by the dataset
    pub fn n_features(&self) -> Result<usize> {
        let raw = self
            .get("nfeatures")
            .ok_or_else(|| BatchmlError::Dataset("metadata is missing 'nfeatures'".to_string()))?;
        raw.trim()
            .parse()
            .map_err(|_| BatchmlError::Dataset(format!("'nfeatures' is not an integer: {}", raw)))
    }

    /// Declared target classes, in order
    pub fn target_classes(&self) -> Result<Vec<i64>> {
        let raw = self.get("targetclasses").ok_or_else(|| {
            BatchmlError::Dataset("metadata is missing 'targetclasses'".to_string())
        })?;

        let values: Vec<serde_json::Value> = serde_json::from_str(raw).map_err(|e| {
            BatchmlError::Dataset(format!("'targetclasses' is not a valid class list: {}", e))
        })?;

        values
            .iter()
            .map(|v| match v {
                serde_json::Value::Number(n) => n.as_i64().ok_or(()),
                serde_json::Value::String(s) => s.trim().parse().map_err(|_| ()),
                _ => Err(()),
            })
            .collect::<std::result::Result<Vec<i64>, ()>>()
            .map_err(|_| {
                BatchmlError::Dataset(format!("'targetclasses' contains a non-integer class: {}", raw))
            })
    }

    /// Declared class count.
    /// Falls back to counting list separators when the encoded list does
    /// not parse as a structured array.
    pub fn n_target_classes(&self) -> Result<usize> {
        match self.target_classes() {
            Ok(classes) => Ok(classes.len()),
            Err(_) => {
                let raw = self.get("targetclasses").ok_or_else(|| {
                    BatchmlError::Dataset("metadata is missing 'targetclasses'".to_string())
                })?;
                Ok(raw.matches(',').count() + 1)
            }
        }
    }
}

/// Lazy, forward-only reader over a delimited dataset stream.
///
/// Call [`extract_metadata`](Self::extract_metadata) exactly once, then
/// [`skip_header`](Self::skip_header), then iterate data rows. The reader
/// never rewinds; dropping it drops the underlying stream.
pub struct DatasetReader<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
}

impl<R: Read> DatasetReader<R> {
    /// Wrap a readable stream positioned at offset zero
    pub fn new(reader: R, config: ReaderConfig) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(config.delimiter)
            .quote(config.quote)
            .escape(Some(config.escape))
            .from_reader(reader)
            .into_records();
        Self { records }
    }

    fn next_record(&mut self, missing: &str) -> Result<csv::StringRecord> {
        match self.records.next() {
            Some(record) => Ok(record?),
            None => Err(BatchmlError::Dataset(missing.to_string())),
        }
    }

    /// Consume the two metadata rows and return the zipped mapping.
    ///
    /// Key/value rows of different lengths are a hard error; nothing can
    /// be paired reliably after a drifted header.
    pub fn extract_metadata(&mut self) -> Result<DatasetMetadata> {
        let keys = self.next_record("dataset has no metadata key row")?;
        let values = self.next_record("dataset has no metadata value row")?;

        if keys.len() != values.len() {
            return Err(BatchmlError::Dataset(format!(
                "metadata key row has {} fields but value row has {}",
                keys.len(),
                values.len()
            )));
        }

        let fields = keys
            .iter()
            .zip(values.iter())
            .map(|(k, v)| (k.trim().to_string(), v.to_string()))
            .collect();

        Ok(DatasetMetadata { fields })
    }

    /// Discard the column-name row that precedes data rows
    pub fn skip_header(&mut self) -> Result<()> {
        self.next_record("dataset has no header row")?;
        Ok(())
    }
}

impl<R: Read> Iterator for DatasetReader<R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|record| {
            record
                .map(|rec| rec.iter().map(|field| field.to_string()).collect())
                .map_err(BatchmlError::from)
        })
    }
}
