use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pptx_templater::model::{GenerationRequest, LayoutCatalog, MasterStyles, ThemeInfo};
use pptx_templater::{
    CatalogStore, Error, Presentation, SidecarStore, generate_pptx, read_theme_and_master_styles,
    scan_template,
};
use serde::Serialize;

/// Catalogue PPTX slide layouts and fill them with content
#[derive(Parser, Debug)]
#[command(name = "pptx-templater", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the layout catalog of a template
    Scan {
        template: PathBuf,
        /// Write the catalog here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Also save the catalog as a sidecar in this directory
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,
    },
    /// Print the theme and primary master text styles
    Styles { template: PathBuf },
    /// Generate a presentation from a JSON request
    Generate {
        template: PathBuf,
        request: PathBuf,
        #[arg(short, long, value_name = "OUT")]
        output: PathBuf,
        /// Catalog used to resolve layout indices
        #[arg(long, value_name = "FILE", conflicts_with = "store")]
        catalog: Option<PathBuf>,
        /// Look the catalog up in a sidecar directory
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct StylesOutput {
    theme: ThemeInfo,
    master_styles: MasterStyles,
}

fn template_key(template: &Path) -> String {
    template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Scan {
            template,
            output,
            store,
        } => {
            let catalog = scan_template(&template)?;
            if let Some(dir) = store {
                let record = SidecarStore::new(dir).save(&template_key(&template), &catalog)?;
                log::info!("Saved catalog for {}", record.filename);
            }
            let json = serde_json::to_string_pretty(&catalog)?;
            match output {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{json}"),
            }
        }
        Command::Styles { template } => {
            let pres = Presentation::open(&template)?;
            let (theme, master_styles) = read_theme_and_master_styles(&pres);
            let json = serde_json::to_string_pretty(&StylesOutput {
                theme,
                master_styles,
            })?;
            println!("{json}");
        }
        Command::Generate {
            template,
            request,
            output,
            catalog,
            store,
        } => {
            let request: GenerationRequest = serde_json::from_slice(&std::fs::read(request)?)?;
            let catalog: Option<LayoutCatalog> = match (catalog, store) {
                (Some(path), _) => Some(serde_json::from_slice(&std::fs::read(path)?)?),
                (None, Some(dir)) => SidecarStore::new(dir)
                    .load(&template_key(&template))?
                    .map(|record| record.catalog),
                (None, None) => None,
            };
            if catalog.is_none() {
                log::warn!("No catalog given, layout indices are counted linearly");
            }
            let reports = generate_pptx(&template, catalog.as_ref(), &request, &output)?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
