//! Splits raw CSV text into its header rows and data rows.
//!
//! The format is deliberately simple: lines are separated by `\n` (a trailing `\r` is dropped),
//! cells by `,`. There is no support for quoted cells or embedded commas.
//!
//! - Line 0 holds the type tags.
//! - Line 1 holds the field names.
//! - Every further line is a data row.

use crate::value::TypeTag;

/// Minimum line count to derive a schema.
pub const MIN_SCHEMA_LINES: usize = 2;
/// Minimum line count for a full import, which needs at least one data row.
pub const MIN_DOCUMENT_LINES: usize = 3;

/// A single column's declared type and field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub tag: TypeTag,
    /// The field name. May be empty.
    pub name: String,
}

/// The ordered column definitions of a CSV document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    entries: Vec<FieldEntry>,
}

/// The CSV text has too few lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedInput {
    /// The amount of lines found.
    pub lines: usize,
    /// The amount of lines needed.
    pub required: usize,
}

utils::define_simple_error!(
    @main
    MalformedInput:
    e => "csv needs at least {} lines but only has {}", e.required, e.lines
);

/// A data row, borrowing its cells from the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRow<'a> {
    /// 1-based index over the non-blank data rows.
    pub index: usize,
    /// The raw cell values. Only numeric and boolean conversions ignore surrounding whitespace.
    pub cells: Vec<&'a str>,
}

/// Iterator over the data rows of a CSV document.
///
/// Blank lines are skipped and do not advance the row index.
/// Cloning the iterator restarts iteration from the clone's position.
#[derive(Debug, Clone)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct DataRows<'a> {
    lines: std::iter::Skip<std::str::Lines<'a>>,
    index: usize,
}

impl Schema {
    /// Creates a schema from entries.
    #[must_use]
    pub fn new(entries: Vec<FieldEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets the column index of the field named exactly `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Gets the declared type tags, in column order.
    pub fn type_tags(&self) -> impl Iterator<Item = &TypeTag> {
        self.entries.iter().map(|e| &e.tag)
    }

    /// Gets the field names, in column order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

impl<'a> Iterator for DataRows<'a> {
    type Item = DataRow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.by_ref().find(|l| !l.trim().is_empty())?;

        self.index += 1;
        Some(DataRow {
            index: self.index,
            cells: line.split(',').collect(),
        })
    }
}

/// Parses the two header lines into a schema.
///
/// Fails if the text has fewer than [`MIN_SCHEMA_LINES`] lines.
pub fn parse_schema(text: &str) -> Result<Schema, MalformedInput> {
    parse_with_min_lines(text, MIN_SCHEMA_LINES)
}

/// Parses the two header lines into a schema, additionally requiring room for data.
///
/// Fails if the text has fewer than [`MIN_DOCUMENT_LINES`] lines.
pub fn parse_document(text: &str) -> Result<Schema, MalformedInput> {
    parse_with_min_lines(text, MIN_DOCUMENT_LINES)
}

/// Iterates the data rows, starting at line 2.
pub fn iter_data_rows(text: &str) -> DataRows<'_> {
    DataRows {
        lines: text.lines().skip(MIN_SCHEMA_LINES),
        index: 0,
    }
}

fn parse_with_min_lines(text: &str, required: usize) -> Result<Schema, MalformedInput> {
    let lines = text.lines().count();
    if lines < required {
        return Err(MalformedInput { lines, required });
    }

    let mut header = text.lines();
    let (Some(tags), Some(names)) = (header.next(), header.next()) else {
        return Err(MalformedInput { lines, required });
    };

    let tags: Vec<&str> = split_header(tags).collect();
    let names: Vec<&str> = split_header(names).collect();
    if tags.len() != names.len() {
        log::warn!(
            "Header rows differ in length ({} types, {} names). Extra columns are ignored.",
            tags.len(), names.len()
        );
    }

    let entries = tags.into_iter()
        .zip(names)
        .map(|(tag, name)| FieldEntry { tag: TypeTag::parse(tag), name: name.to_owned() })
        .collect();

    Ok(Schema { entries })
}

fn split_header(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(str::trim)
}
