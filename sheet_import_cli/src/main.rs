use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use sheet_import::pending::{JsonFileStore, PendingImport};
use sheet_import::pipeline::DEFAULT_OUTPUT_FOLDER;
use sheet_import::{ImportRequest, ImportSummary, Importer};

mod config;
mod fs_host;

use config::HConfig;
use fs_host::FsHost;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// The config file. Missing files are fine.
    #[arg(short, long, default_value = "sheet_import.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generates the record type for a sheet and creates one record per row.
    Import {
        #[command(flatten)]
        target: Target,
        /// Stop once the record type is generated. Finish later with `resume`.
        #[arg(long)]
        no_resume: bool,
    },
    /// Creates the records of an import that is waiting for its record type to be loaded.
    Resume,
    /// Only generates the record type for a sheet.
    Generate {
        #[command(flatten)]
        target: Target,
    },
    /// Shows the import waiting to be resumed, if any.
    Status,
    /// Forgets the import waiting to be resumed.
    Reset,
}

#[derive(Debug, Args)]
struct Target {
    /// The sheet link. Editable Google Sheets links are fine.
    #[arg(short, long)]
    url: String,
    /// The output folder, inside the project's `Assets` folder.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FOLDER)]
    out: String,
    /// The name of the record type.
    #[arg(short, long)]
    name: String,
}

impl From<Target> for ImportRequest {
    fn from(value: Target) -> Self {
        ImportRequest::new(value.url, value.out, value.name)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = HConfig::load(&cli.config)?;
    config.log.init_logger();

    let host = FsHost::open(&config.project_root, &config.source_extension)?;
    let store = JsonFileStore::open(config.state_file())?;
    let mut importer = Importer::new(host, store, config.import_settings());

    match cli.command {
        Command::Import { target, no_resume } => {
            importer.start(&target.into())?;
            if no_resume {
                log::info!("Run `resume` to create the records.");
                return Ok(());
            }

            // loading types is synchronous here, so the reload is already complete
            if let Some(summary) = importer.on_reload_complete()? {
                report(&summary);
            }
        },
        Command::Resume => match importer.on_reload_complete()? {
            Some(summary) => report(&summary),
            None => log::info!("No import is waiting to be resumed."),
        },
        Command::Generate { target } => {
            let generated = importer.generate(&target.into())?;
            log::info!("Generated {} with {} fields.", generated.path, generated.ty.members().len());
        },
        Command::Status => match PendingImport::peek(importer.store())? {
            Some(pending) => {
                println!("Waiting to create `{}` records in {}.", pending.record_type_name, pending.output_folder);
                if let Some(started_at) = pending.started_at {
                    println!("Suspended at {started_at}.");
                }
                println!("{} bytes of CSV data saved.", pending.csv_content.len());
            },
            None => println!("No import is waiting to be resumed."),
        },
        Command::Reset => {
            importer.reset()?;
            log::info!("Cleared pending import state in {}.", importer.store().path().display());
        },
    }

    Ok(())
}

fn report(summary: &ImportSummary) {
    for path in &summary.records {
        println!("{path}");
    }

    if summary.field_warnings != 0 {
        log::warn!("{} fields could not be set. See the warnings above.", summary.field_warnings);
    }

    if summary.failed_rows != 0 {
        log::warn!("{} rows failed to save.", summary.failed_rows);
    }
}
