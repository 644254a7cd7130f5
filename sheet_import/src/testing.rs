//! An in-memory [`Host`] for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{anyhow, bail};

use crate::codegen;
use crate::folders::ROOT_FOLDER;
use crate::host::Host;
use crate::record::{Record, TypeDescriptor};

#[derive(Debug, Default)]
pub struct MemoryHost {
    /// Downloadable content by URL.
    pub sheets: HashMap<String, String>,
    /// Every URL requested, in order.
    pub fetched: Vec<String>,
    pub folders: BTreeSet<String>,
    /// Every folder created, in order.
    pub created_folders: Vec<String>,
    pub files: BTreeMap<String, String>,
    pub types: HashMap<String, TypeDescriptor>,
    pub records: BTreeMap<String, Record>,
    /// Record paths that fail to persist.
    pub rejected_paths: BTreeSet<String>,
    /// When set, recompiling loads no types.
    pub broken_compiler: bool,
    pub recompiles: usize,
    pub flushes: usize,
    pub refreshes: usize,
}

impl MemoryHost {
    pub fn with_sheet(url: &str, text: &str) -> Self {
        let mut host = Self::default();
        host.sheets.insert(url.to_owned(), text.to_owned());
        host
    }

    fn parent_exists(&self, path: &str) -> bool {
        path.rsplit_once('/').is_some_and(|(parent, _)| self.folder_exists(parent))
    }
}

impl Host for MemoryHost {
    fn fetch(&mut self, url: &str) -> anyhow::Result<String> {
        self.fetched.push(url.to_owned());
        self.sheets.get(url).cloned().ok_or_else(|| anyhow!("404 Not Found"))
    }

    fn folder_exists(&self, path: &str) -> bool {
        path == ROOT_FOLDER || self.folders.contains(path)
    }

    fn create_folder(&mut self, parent: &str, name: &str) -> anyhow::Result<()> {
        if !self.folder_exists(parent) {
            bail!("parent folder {parent} does not exist");
        }

        let full = format!("{parent}/{name}");
        self.folders.insert(full.clone());
        self.created_folders.push(full);
        Ok(())
    }

    fn write_text_file(&mut self, path: &str, text: &str) -> anyhow::Result<()> {
        if !self.parent_exists(path) {
            bail!("no folder for {path}");
        }

        self.files.insert(path.to_owned(), text.to_owned());
        Ok(())
    }

    fn trigger_recompile(&mut self) -> anyhow::Result<()> {
        self.recompiles += 1;
        if !self.broken_compiler {
            for ty in self.files.values().flat_map(|f| codegen::parse_type_source(f)) {
                self.types.insert(ty.name().to_owned(), ty);
            }
        }

        Ok(())
    }

    fn resolve_type(&self, name: &str) -> Option<TypeDescriptor> {
        self.types.get(name).cloned()
    }

    fn persist_record(&mut self, record: &Record, path: &str) -> anyhow::Result<()> {
        if self.rejected_paths.contains(path) || !self.parent_exists(path) {
            bail!("cannot write {path}");
        }

        self.records.insert(path.to_owned(), record.clone());
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn refresh_asset_index(&mut self) -> anyhow::Result<()> {
        self.refreshes += 1;
        Ok(())
    }
}
