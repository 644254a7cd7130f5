//! Turns a spreadsheet exported as CSV into a generated record type and one persisted record per row.
//!
//! The CSV's first line declares the column types, the second line the field names, and every
//! further line is a data row. An import runs in two phases around a reload of the host:
//!
//! 1. [`Importer::start`] downloads the sheet, generates the record type source and asks the host to
//!    reload, saving what it needs in a durable [`StateStore`](pending::StateStore).
//! 2. [`Importer::on_reload_complete`] picks the saved state back up once the new type is loaded
//!    and creates the records.

use std::fmt::{Display, Formatter};

pub mod codegen;
pub mod folders;
pub mod host;
pub mod pending;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod sheet_url;
pub mod value;

#[cfg(test)]
mod testing;

pub use pipeline::{ImportRequest, ImportSettings, ImportState, ImportSummary, Importer};

/// An error that ends an import run.
#[derive(Debug)]
pub enum ImportError {
    /// A required input is missing or invalid.
    Config(&'static str),
    /// Another import is still waiting for its reload.
    AlreadyInProgress {
        record_type_name: String,
    },
    /// Downloading the sheet failed.
    Fetch {
        url: String,
        source: anyhow::Error,
    },
    /// The CSV has too few lines.
    MalformedInput(schema::MalformedInput),
    /// The generated record type is not loaded.
    TypeNotFound(String),
    /// A host or state store operation failed.
    Host(anyhow::Error),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(why) => f.write_str(why),
            Self::AlreadyInProgress { record_type_name } => write!(f, "an import of `{record_type_name}` is still waiting for the reload to complete"),
            Self::Fetch { url, source } => write!(f, "failed to download {url}: {source:#}"),
            Self::MalformedInput(err) => Display::fmt(err, f),
            Self::TypeNotFound(name) => write!(f, "record type `{name}` is not loaded"),
            Self::Host(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch { source, .. } | Self::Host(source) => Some(&**source),
            Self::MalformedInput(err) => Some(err),
            _ => None,
        }
    }
}

impl From<schema::MalformedInput> for ImportError {
    fn from(value: schema::MalformedInput) -> Self {
        Self::MalformedInput(value)
    }
}
