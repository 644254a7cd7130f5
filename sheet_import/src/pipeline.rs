//! The two-phase import: generate the record type, wait for the host to load it, create the records.

use crate::codegen;
use crate::folders;
use crate::host::Host;
use crate::pending::{PendingImport, StateStore};
use crate::record::{Instantiator, TypeDescriptor};
use crate::schema::{self, Schema};
use crate::sheet_url;
use crate::ImportError;

/// The output folder used when none is configured.
pub const DEFAULT_OUTPUT_FOLDER: &str = "DataSO";

/// Where an [`Importer`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportState {
    Idle,
    Fetching,
    FoldersReady,
    TypeGenerated,
    /// Suspended until [`Importer::on_reload_complete`] is called.
    AwaitingReload,
    Instantiating,
    Done,
    Aborted,
}

/// What to import, and where to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// The sheet link. Editable Google Sheets links are rewritten to their CSV export.
    pub sheet_url: String,
    /// The output folder, relative to the project root marker.
    pub output_folder: String,
    /// The name of the generated record type.
    pub record_type_name: String,
}

/// File extensions of generated files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    /// Extension of the generated record type source.
    pub source_extension: String,
    /// Extension of persisted records.
    pub asset_extension: String,
}

/// The record type written by the first phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedType {
    /// The path of the source file.
    pub path: String,
    /// The normalized output folder.
    pub output_folder: String,
    /// The type as generated.
    pub ty: TypeDescriptor,
}

/// The outcome of a completed import.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub record_type_name: String,
    pub output_folder: String,
    /// Paths of the persisted records, in row order.
    pub records: Vec<String>,
    /// Rows whose record could not be persisted.
    pub failed_rows: usize,
    /// Cells that were skipped across all rows.
    pub field_warnings: usize,
}

/// Runs imports against a host, keeping suspended state in a store.
#[derive(Debug)]
pub struct Importer<H, S> {
    host: H,
    store: S,
    settings: ImportSettings,
    state: ImportState,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            source_extension: "rs".to_owned(),
            asset_extension: "json".to_owned(),
        }
    }
}

impl ImportRequest {
    #[must_use]
    pub fn new(sheet_url: impl Into<String>, output_folder: impl Into<String>, record_type_name: impl Into<String>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            output_folder: output_folder.into(),
            record_type_name: record_type_name.into(),
        }
    }

    /// Checks that all inputs are present.
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.sheet_url.trim().is_empty() {
            return Err(ImportError::Config("sheet URL is empty"));
        }

        if self.output_folder.trim().is_empty() {
            return Err(ImportError::Config("output folder is empty"));
        }

        if self.record_type_name.trim().is_empty() {
            return Err(ImportError::Config("record type name is empty"));
        }

        if !codegen::is_identifier(&self.record_type_name) {
            return Err(ImportError::Config("record type name must be a valid identifier"));
        }

        if codegen::is_keyword(&self.record_type_name) {
            return Err(ImportError::Config("record type name must not be a keyword"));
        }

        Ok(())
    }
}

impl<H: Host, S: StateStore> Importer<H, S> {
    #[must_use]
    pub fn new(host: H, store: S, settings: ImportSettings) -> Self {
        Self {
            host,
            store,
            settings,
            state: ImportState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> ImportState {
        self.state
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn into_parts(self) -> (H, S) {
        (self.host, self.store)
    }

    /// Runs the first phase: download, create folders, write the record type, save state
    /// and trigger the host reload.
    ///
    /// Returns in [`ImportState::AwaitingReload`]. The import continues when the host reports
    /// that the reload finished, via [`Importer::on_reload_complete`].
    pub fn start(&mut self, request: &ImportRequest) -> Result<ImportState, ImportError> {
        self.transition(ImportState::Idle);
        self.suspend(request).map_err(|e| self.abort(e))
    }

    /// Runs only the generation steps, without saving state or triggering a reload.
    ///
    /// Unlike a full import, a CSV with just the two header lines is accepted.
    pub fn generate(&mut self, request: &ImportRequest) -> Result<GeneratedType, ImportError> {
        self.transition(ImportState::Idle);
        let generated = request.validate()
            .and_then(|()| self.prepare(request))
            .map(|(generated, _)| generated)
            .map_err(|e| self.abort(e))?;

        self.transition(ImportState::Done);
        Ok(generated)
    }

    /// Continues a suspended import. Call this once the host finished reloading.
    ///
    /// Does nothing and returns `None` if no import is pending.
    pub fn on_reload_complete(&mut self) -> Result<Option<ImportSummary>, ImportError> {
        let pending = match PendingImport::take(&mut self.store) {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                log::debug!("No import is pending. Ignoring reload notification.");
                return Ok(None);
            },
            Err(err) => return Err(self.abort(ImportError::Host(err))),
        };

        self.transition(ImportState::Instantiating);
        self.instantiate_all(&pending)
            .map(Some)
            .map_err(|e| self.abort(e))
    }

    /// Forgets any pending import, e.g. when a reload never completed.
    pub fn reset(&mut self) -> Result<(), ImportError> {
        PendingImport::clear(&mut self.store).map_err(ImportError::Host)?;
        self.transition(ImportState::Idle);
        Ok(())
    }

    fn suspend(&mut self, request: &ImportRequest) -> Result<ImportState, ImportError> {
        request.validate()?;

        match PendingImport::peek(&self.store) {
            Ok(Some(pending)) => {
                return Err(ImportError::AlreadyInProgress { record_type_name: pending.record_type_name });
            },
            Ok(None) => {},
            Err(err) => log::warn!("Discarding pending import state: {err}"),
        }

        let (generated, text) = self.prepare(request)?;

        PendingImport::new(&request.record_type_name, &generated.output_folder, text)
            .save(&mut self.store)
            .map_err(ImportError::Host)?;

        self.transition(ImportState::AwaitingReload);
        log::info!("Generated {}. Waiting for the reload to complete.", generated.path);
        self.host.trigger_recompile().map_err(ImportError::Host)?;

        Ok(self.state)
    }

    fn prepare(&mut self, request: &ImportRequest) -> Result<(GeneratedType, String), ImportError> {
        self.transition(ImportState::Fetching);

        let url = sheet_url::to_export_url(&request.sheet_url);
        log::info!("Downloading {url}");
        let text = self.host.fetch(&url)
            .map_err(|source| ImportError::Fetch { url: url.clone(), source })?;
        log::info!("CSV data downloaded ({} bytes).", text.len());

        let output_folder = folders::ensure(&mut self.host, &request.output_folder)
            .map_err(ImportError::Host)?;
        self.transition(ImportState::FoldersReady);

        let schema = schema::parse_schema(&text)?;
        let ty = TypeDescriptor::from_schema(&request.record_type_name, &schema);
        let path = format!("{output_folder}/{}.{}", request.record_type_name, self.settings.source_extension);

        self.host.write_text_file(&path, &codegen::render(&ty))
            .map_err(ImportError::Host)?;
        self.transition(ImportState::TypeGenerated);

        Ok((GeneratedType { path, output_folder, ty }, text))
    }

    fn instantiate_all(&mut self, pending: &PendingImport) -> Result<ImportSummary, ImportError> {
        let text = &pending.csv_content;
        let schema: Schema = schema::parse_document(text)?;
        let ty = self.host.resolve_type(&pending.record_type_name)
            .ok_or_else(|| ImportError::TypeNotFound(pending.record_type_name.clone()))?;

        let mut summary = ImportSummary {
            record_type_name: pending.record_type_name.clone(),
            output_folder: pending.output_folder.clone(),
            ..ImportSummary::default()
        };

        let instantiator = Instantiator::new(&ty, &schema, &pending.output_folder, &self.settings.asset_extension);
        for row in schema::iter_data_rows(text) {
            match instantiator.instantiate(&mut self.host, &row) {
                Ok(built) => {
                    summary.field_warnings += built.warnings;
                    summary.records.push(built.path);
                },
                Err(why) => {
                    log::error!("Row {}: failed to persist record: {why:#}", row.index);
                    summary.failed_rows += 1;
                },
            }
        }

        self.host.flush().map_err(ImportError::Host)?;
        self.host.refresh_asset_index().map_err(ImportError::Host)?;
        PendingImport::finish(&mut self.store).map_err(ImportError::Host)?;

        self.transition(ImportState::Done);
        log::info!(
            "Created {} `{}` records in {} ({} failed).",
            summary.records.len(), summary.record_type_name, summary.output_folder, summary.failed_rows
        );

        Ok(summary)
    }

    fn transition(&mut self, next: ImportState) {
        if self.state != next {
            log::debug!("Import state: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn abort(&mut self, err: ImportError) -> ImportError {
        log::error!("Import aborted: {err}");
        self.transition(ImportState::Aborted);
        err
    }
}
