//! The capabilities the import pipeline needs from its environment.

use crate::record::{Record, TypeDescriptor};

/// The environment an import runs in.
///
/// Paths are `/`-separated and relative to the project, starting with the root marker
/// (see [`crate::folders::ROOT_FOLDER`]).
pub trait Host {
    /// Downloads the text at `url`.
    fn fetch(&mut self, url: &str) -> anyhow::Result<String>;

    /// Whether a folder exists at `path`.
    fn folder_exists(&self, path: &str) -> bool;

    /// Creates the folder `name` inside the existing folder `parent`.
    fn create_folder(&mut self, parent: &str, name: &str) -> anyhow::Result<()>;

    /// Creates or overwrites a text file.
    fn write_text_file(&mut self, path: &str, text: &str) -> anyhow::Result<()>;

    /// Starts loading changed sources so that newly generated record types become resolvable.
    ///
    /// Completion is signalled separately, by calling
    /// [`Importer::on_reload_complete`](crate::pipeline::Importer::on_reload_complete).
    fn trigger_recompile(&mut self) -> anyhow::Result<()>;

    /// Looks up a loaded record type by name.
    fn resolve_type(&self, name: &str) -> Option<TypeDescriptor>;

    /// Persists a record at `path`, overwriting any existing asset.
    fn persist_record(&mut self, record: &Record, path: &str) -> anyhow::Result<()>;

    /// Flushes all pending asset changes.
    fn flush(&mut self) -> anyhow::Result<()>;

    /// Rescans the project for changed assets.
    fn refresh_asset_index(&mut self) -> anyhow::Result<()>;
}

impl<H: Host + ?Sized> Host for &mut H {
    fn fetch(&mut self, url: &str) -> anyhow::Result<String> {
        (**self).fetch(url)
    }

    fn folder_exists(&self, path: &str) -> bool {
        (**self).folder_exists(path)
    }

    fn create_folder(&mut self, parent: &str, name: &str) -> anyhow::Result<()> {
        (**self).create_folder(parent, name)
    }

    fn write_text_file(&mut self, path: &str, text: &str) -> anyhow::Result<()> {
        (**self).write_text_file(path, text)
    }

    fn trigger_recompile(&mut self) -> anyhow::Result<()> {
        (**self).trigger_recompile()
    }

    fn resolve_type(&self, name: &str) -> Option<TypeDescriptor> {
        (**self).resolve_type(name)
    }

    fn persist_record(&mut self, record: &Record, path: &str) -> anyhow::Result<()> {
        (**self).persist_record(record, path)
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        (**self).flush()
    }

    fn refresh_asset_index(&mut self) -> anyhow::Result<()> {
        (**self).refresh_asset_index()
    }
}
