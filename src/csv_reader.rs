use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// A parsed CSV dataset: header row plus string-valued records.
///
/// Fields are trimmed on read. Records are never mutated after parsing.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Records dropped because they could not be decoded.
    pub skipped: usize,
    index: HashMap<String, usize>,
}

/// Read-only view of one record, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    index: &'a HashMap<String, usize>,
    values: &'a [String],
}

impl<'a> Row<'a> {
    /// Field value by (case-insensitive) column name.
    /// Missing columns and short records read as the empty string.
    pub fn get(&self, field: &str) -> &'a str {
        self.index
            .get(&field.to_ascii_lowercase())
            .and_then(|&idx| self.values.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Like `get`, but substitutes `default` for an empty value.
    pub fn get_or(&self, field: &str, default: &'a str) -> &'a str {
        match self.get(field) {
            "" => default,
            value => value,
        }
    }
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let index = build_index(&headers);
        Dataset {
            headers,
            rows,
            skipped: 0,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.index.contains_key(&field.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |values| Row {
            index: &self.index,
            values,
        })
    }
}

fn build_index(headers: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, header) in headers.iter().enumerate() {
        // First occurrence wins for duplicate headers
        index.entry(header.to_ascii_lowercase()).or_insert(i);
    }
    index
}

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).flexible(true).trim(Trim::All);
    builder
}

/// Parse a whole CSV stream into memory.
pub fn read_csv<R: Read>(input: R) -> Result<Dataset> {
    let mut dataset: Option<Dataset> = None;
    for_each_chunk(input, usize::MAX, |chunk| {
        match dataset.as_mut() {
            Some(all) => {
                all.rows.extend(chunk.rows);
                all.skipped += chunk.skipped;
            }
            None => dataset = Some(chunk),
        }
    })?;
    dataset.ok_or_else(|| anyhow!("CSV stream produced no header row"))
}

pub fn read_csv_from_stdin() -> Result<Dataset> {
    read_csv(io::stdin()).context("Failed to read CSV from stdin")
}

pub fn read_csv_from_path(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    read_csv(file).with_context(|| format!("Failed to read CSV '{}'", path.display()))
}

/// Parse a CSV stream incrementally, handing `on_chunk` datasets of at most
/// `chunk_size` rows that share the stream's header. The callback is invoked
/// at least once (possibly with an empty chunk) once the header is read.
///
/// Returns the total number of rows delivered.
pub fn for_each_chunk<R, F>(input: R, chunk_size: usize, mut on_chunk: F) -> Result<usize>
where
    R: Read,
    F: FnMut(Dataset),
{
    let chunk_size = chunk_size.max(1);
    let mut reader = reader_builder().from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|s| s.to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(anyhow!("CSV header row is empty"));
    }

    let mut chunk = Dataset::new(headers.clone(), Vec::new());
    let mut delivered = 0;
    let mut emitted = false;

    for (record_idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                log::warn!("Skipping CSV record {}: {}", record_idx + 1, err);
                chunk.skipped += 1;
                continue;
            }
        };
        chunk.rows.push(record.iter().map(|s| s.to_string()).collect());

        if chunk.rows.len() >= chunk_size {
            delivered += chunk.rows.len();
            let full = std::mem::replace(&mut chunk, Dataset::new(headers.clone(), Vec::new()));
            on_chunk(full);
            emitted = true;
        }
    }

    if !chunk.rows.is_empty() || chunk.skipped > 0 || !emitted {
        delivered += chunk.rows.len();
        on_chunk(chunk);
    }

    Ok(delivered)
}

/// Lenient float parse: anything unparseable counts as zero.
pub fn parse_number(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}
