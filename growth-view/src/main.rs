//! Application entry point for the growth viewer.
//!
//! Parses the command line, sets up logging, loads the preset and hands
//! everything else to [`Viewer`].

mod height_map;
mod viewer;

use std::path::PathBuf;

use clap::Parser;
use growth_core::config::Settings;
use log::{LevelFilter, error, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use viewer::Viewer;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML preset; missing keys take their default.
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

/// Loads the preset named on the command line, falling back to the
/// defaults when there is none or it cannot be used.
fn load_settings(path: Option<&PathBuf>) -> Settings {
    let Some(path) = path else {
        return Settings::default();
    };
    match Settings::load(path) {
        Ok(settings) => {
            info!("loaded settings from {}", path.display());
            settings
        }
        Err(err) => {
            error!("cannot use {}: {err}; using defaults", path.display());
            Settings::default()
        }
    }
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    if let Err(err) = TermLogger::init(
        args.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logging disabled: {err}");
    }

    let settings = load_settings(args.settings.as_ref());
    let options = eframe::NativeOptions::default();

    eframe::run_native(
        "Living Growth",
        options,
        Box::new(move |_cc| Ok(Box::new(Viewer::new(settings)))),
    )
}
