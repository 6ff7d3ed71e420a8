//! Plots the HUC-12 watersheds of the national Watershed Boundary Dataset.

use std::process::ExitCode;

use gpkg_plot::{plot, read_file, Engine, GpkgError, ReadOptions};
use tracing_subscriber::EnvFilter;

const WBD_PATH: &str = "~/Documents/WBD/WBD_National_GPKG.gpkg";
const LAYER: &str = "WBDHU12";
const ENGINE: Engine = Engine::Sqlite;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn run() -> gpkg_plot::Result<()> {
    let options = ReadOptions::with_engine(ENGINE);
    let huc12 = read_file(WBD_PATH, LAYER, &options)?;
    let figure = plot(&huc12, huc12.geometry_column())?;
    figure.show()
}

fn failure_message(err: &GpkgError) -> String {
    format!("gpkg-plot: {err}")
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", failure_message(&err));
            ExitCode::FAILURE
        }
    }
}
