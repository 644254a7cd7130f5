//! A [`Host`] backed by the local filesystem and HTTP.
//!
//! Project paths like `Assets/Data/Hero.json` are resolved against the project root.
//! "Recompiling" means rescanning the `Assets` folder for generated record type sources.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;
use walkdir::WalkDir;

use sheet_import::codegen;
use sheet_import::folders::ROOT_FOLDER;
use sheet_import::host::Host;
use sheet_import::record::{Record, TypeDescriptor};

pub struct FsHost {
    root: PathBuf,
    source_extension: String,
    client: Client,
    types: HashMap<String, TypeDescriptor>,
    /// Sources written by this host, oldest first.
    written_sources: Vec<PathBuf>,
    /// Records written since the last flush.
    unflushed: Vec<PathBuf>,
}

impl std::fmt::Debug for FsHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(FsHost))
            .field("root", &self.root)
            .field("types", &self.types.len())
            .finish_non_exhaustive()
    }
}

impl FsHost {
    /// Opens the project at `root`, creating its `Assets` folder if needed, and loads the
    /// record types generated by earlier runs.
    pub fn open(root: impl Into<PathBuf>, source_extension: &str) -> anyhow::Result<Self> {
        let root = root.into();
        let assets = root.join(ROOT_FOLDER);
        fs::create_dir_all(&assets)
            .with_context(|| format!("cannot create {}", assets.display()))?;

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("cannot create http client")?;

        let mut host = Self {
            root,
            source_extension: source_extension.to_owned(),
            client,
            types: HashMap::new(),
            written_sources: Vec::new(),
            unflushed: Vec::new(),
        };

        host.load_types();
        Ok(host)
    }

    /// Resolves a `/`-separated project path.
    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        full.extend(path.split('/').filter(|s| !s.is_empty()));
        full
    }

    /// Rescans `Assets` for generated record types.
    ///
    /// When several sources declare the same type, sources written by this host win over the
    /// rest, the most recently written first. Otherwise the newest file wins.
    fn load_types(&mut self) {
        let assets = self.root.join(ROOT_FOLDER);
        let mut sources = Vec::new();

        for entry in WalkDir::new(&assets).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Skipping part of {}: {err}", assets.display());
                    continue;
                },
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !has_extension(path, &self.source_extension) {
                continue;
            }

            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(err) => {
                    log::warn!("Skipping {}: {err}", path.display());
                    continue;
                },
            };

            let types = codegen::parse_type_source(&text);
            if !types.is_empty() {
                let written = self.written_sources.iter().position(|p| p == path);
                let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
                sources.push(((written, modified), path.to_owned(), types));
            }
        }

        // lowest priority first, so later inserts win
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        let mut types: HashMap<String, (PathBuf, TypeDescriptor)> = HashMap::new();
        for (_, path, declared) in sources {
            for ty in declared {
                log::trace!("Loaded record type `{}` from {}.", ty.name(), path.display());
                let name = ty.name().to_owned();
                if let Some((old, _)) = types.insert(name, (path.clone(), ty)) {
                    log::warn!(
                        "Record type is generated more than once; using {} over {}.",
                        path.display(), old.display()
                    );
                }
            }
        }

        log::debug!("Loaded {} record types.", types.len());
        self.types = types.into_iter()
            .map(|(name, (_, ty))| (name, ty))
            .collect();
    }

    fn fetch_file(url: &Url) -> anyhow::Result<String> {
        let Ok(path) = url.to_file_path() else {
            bail!("not a local file path");
        };

        fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))
    }

    fn fetch_http(&self, url: &str) -> anyhow::Result<String> {
        let response = self.client.get(url)
            .send()?
            .error_for_status()?;

        let is_html = response.headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));

        let text = response.text()?;
        if is_html {
            // private sheets redirect to a sign-in page instead of failing
            bail!("expected CSV but got a web page, is the sheet shared? ({})", utils::text::preview(&text, 60));
        }

        Ok(text)
    }
}

impl Host for FsHost {
    fn fetch(&mut self, url: &str) -> anyhow::Result<String> {
        match Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "file" => Self::fetch_file(&parsed),
            _ => self.fetch_http(url),
        }
    }

    fn folder_exists(&self, path: &str) -> bool {
        self.resolve(path).is_dir()
    }

    fn create_folder(&mut self, parent: &str, name: &str) -> anyhow::Result<()> {
        let parent = self.resolve(parent);
        if !parent.is_dir() {
            bail!("parent folder {} does not exist", parent.display());
        }

        let full = parent.join(name);
        fs::create_dir(&full)
            .with_context(|| format!("cannot create folder {}", full.display()))?;
        Ok(())
    }

    fn write_text_file(&mut self, path: &str, text: &str) -> anyhow::Result<()> {
        let full = self.resolve(path);
        fs::write(&full, text)
            .with_context(|| format!("cannot write {}", full.display()))?;

        if has_extension(&full, &self.source_extension) {
            self.written_sources.retain(|p| *p != full);
            self.written_sources.push(full);
        }

        Ok(())
    }

    fn trigger_recompile(&mut self) -> anyhow::Result<()> {
        self.load_types();
        Ok(())
    }

    fn resolve_type(&self, name: &str) -> Option<TypeDescriptor> {
        self.types.get(name).cloned()
    }

    fn persist_record(&mut self, record: &Record, path: &str) -> anyhow::Result<()> {
        let full = self.resolve(path);
        let data = serde_json::to_vec_pretty(record)?;
        fs::write(&full, data)
            .with_context(|| format!("cannot write {}", full.display()))?;

        self.unflushed.push(full);
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        for path in self.unflushed.drain(..) {
            fs::File::open(&path)
                .and_then(|f| f.sync_all())
                .with_context(|| format!("cannot flush {}", path.display()))?;
        }

        Ok(())
    }

    fn refresh_asset_index(&mut self) -> anyhow::Result<()> {
        self.load_types();
        Ok(())
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(extension))
        .is_some_and(|n| n.ends_with('.'))
}

#[cfg(test)]
mod test {
    use std::time::{Duration, SystemTime};

    use sheet_import::pending::MemoryStore;
    use sheet_import::{ImportRequest, ImportSettings, ImportState, Importer};

    use super::*;

    #[test]
    fn folders_map_to_project() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FsHost::open(dir.path(), "rs").unwrap();

        assert!(host.folder_exists("Assets"));
        assert!(!host.folder_exists("Assets/Data"));

        host.create_folder("Assets", "Data").unwrap();
        assert!(dir.path().join("Assets").join("Data").is_dir());
        assert!(host.folder_exists("Assets/Data"));
        assert!(host.create_folder("Assets/Missing", "Data").is_err());
    }

    #[test]
    fn extensions() {
        assert!(has_extension(Path::new("Hero.rs"), "rs"));
        assert!(has_extension(Path::new("Hero.asset.json"), "asset.json"));
        assert!(!has_extension(Path::new("Hero.jrs"), "rs"));
        assert!(!has_extension(Path::new("rs"), "rs"));
    }

    #[test]
    fn imports_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("heroes.csv");
        fs::write(&csv, "int,string,bool\r\nid,name,alive\r\n1,Alice,true\r\n2,Bob,\r\n").unwrap();
        let url = Url::from_file_path(&csv).unwrap();

        let project = dir.path().join("game");
        let host = FsHost::open(&project, "rs").unwrap();
        let mut importer = Importer::new(host, MemoryStore::default(), ImportSettings::default());

        let request = ImportRequest::new(url.as_str(), "Data/Heroes", "Hero");
        assert_eq!(importer.start(&request).unwrap(), ImportState::AwaitingReload);
        assert!(project.join("Assets/Data/Heroes/Hero.rs").is_file());

        let summary = importer.on_reload_complete().unwrap().unwrap();
        assert_eq!(summary.records, ["Assets/Data/Heroes/Hero_1.json", "Assets/Data/Heroes/Hero_2.json"]);

        let text = fs::read_to_string(project.join("Assets/Data/Heroes/Hero_2.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 2, "name": "Bob", "alive": false }));
    }

    #[test]
    fn unreadable_sources_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let plugins = dir.path().join("Assets").join("Plugins");
        fs::create_dir_all(&plugins).unwrap();
        fs::write(plugins.join("legacy.rs"), [0xff_u8, 0xfe, 0x00]).unwrap();

        let schema = sheet_import::schema::parse_schema("int\nid\n").unwrap();
        fs::write(plugins.join("Item.rs"), codegen::generate_type_source("Item", &schema)).unwrap();

        let mut host = FsHost::open(dir.path(), "rs").unwrap();
        assert!(host.resolve_type("Item").is_some());
        host.trigger_recompile().unwrap();
        assert!(host.resolve_type("Item").is_some());
    }

    #[test]
    fn latest_generated_type_wins() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("heroes.csv");
        let url = Url::from_file_path(&csv).unwrap();
        let project = dir.path().join("game");
        let host = FsHost::open(&project, "rs").unwrap();
        let mut importer = Importer::new(host, MemoryStore::default(), ImportSettings::default());

        // "Z" sorts after "A", so a scan in name order alone would pick the stale type
        fs::write(&csv, "int\nid\n1\n").unwrap();
        importer.start(&ImportRequest::new(url.as_str(), "Z", "Hero")).unwrap();
        importer.on_reload_complete().unwrap().unwrap();

        fs::write(&csv, "int,string\nid,name\n1,Alice\n").unwrap();
        importer.start(&ImportRequest::new(url.as_str(), "A", "Hero")).unwrap();
        let summary = importer.on_reload_complete().unwrap().unwrap();
        assert_eq!(summary.field_warnings, 0);

        let text = fs::read_to_string(project.join("Assets/A/Hero_1.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 1, "name": "Alice" }));

        // going back to the first folder picks its type again
        fs::write(&csv, "int\nid\n2\n").unwrap();
        importer.start(&ImportRequest::new(url.as_str(), "Z", "Hero")).unwrap();
        importer.on_reload_complete().unwrap().unwrap();
        assert_eq!(importer.host().resolve_type("Hero").map(|t| t.members().len()), Some(1));
    }

    #[test]
    fn newest_source_wins_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FsHost::open(dir.path(), "rs").unwrap();
        host.create_folder("Assets", "A").unwrap();
        host.create_folder("Assets", "Z").unwrap();

        let old = sheet_import::schema::parse_schema("int\nid\n").unwrap();
        let new = sheet_import::schema::parse_schema("int,string\nid,name\n").unwrap();
        host.write_text_file("Assets/Z/Hero.rs", &codegen::generate_type_source("Hero", &old)).unwrap();
        host.write_text_file("Assets/A/Hero.rs", &codegen::generate_type_source("Hero", &new)).unwrap();

        let stale = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(dir.path().join("Assets/Z/Hero.rs"))
            .and_then(|f| f.set_modified(stale))
            .unwrap();

        let host = FsHost::open(dir.path(), "rs").unwrap();
        assert_eq!(host.resolve_type("Hero").map(|t| t.members().len()), Some(2));
    }

    #[test]
    fn reopened_host_knows_generated_types() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FsHost::open(dir.path(), "rs").unwrap();
        host.create_folder("Assets", "Data").unwrap();

        let schema = sheet_import::schema::parse_schema("int\nid\n").unwrap();
        host.write_text_file("Assets/Data/Item.rs", &codegen::generate_type_source("Item", &schema)).unwrap();
        host.write_text_file("Assets/Data/notes.rs", "pub struct Other {\n}\n").unwrap();
        assert!(host.resolve_type("Item").is_none());

        let host = FsHost::open(dir.path(), "rs").unwrap();
        assert_eq!(host.resolve_type("Item").map(|t| t.members().len()), Some(1));
        assert!(host.resolve_type("Other").is_none());
    }
}
