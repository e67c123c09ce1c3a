#![warn(clippy::all)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

mod admin;
mod database;
mod logging;
mod settings;
mod windows;

use std::process::ExitCode;

use admin::AdminError;
use database::{error::CatalogError, open_catalog};
use eframe::NativeOptions;
use egui::{FontId, Style, Visuals};
use settings::CatalogConfig;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{error, event, trace_span, Level};
use windows::main_window::MainWindow;

#[derive(Error, Debug)]
enum StartError {
    #[error("can't start the runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("ui error: {0}")]
    Ui(#[from] eframe::Error),
}

fn main() -> ExitCode {
    let config = match CatalogConfig::load() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Can't load configuration: {error}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.log_level);

    match start(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "admin stopped");
            ExitCode::FAILURE
        }
    }
}

fn start(config: &CatalogConfig) -> Result<(), StartError> {
    let span = trace_span!("starting main");
    let _guard = span.enter();

    let rt = Runtime::new()?;
    let _enter = rt.enter();

    event!(Level::TRACE, "opening catalog");
    let catalog = open_catalog(config)?;
    let site = admin::site()?;

    let options = NativeOptions::default();

    eframe::run_native(
        "Recipe catalog",
        options,
        Box::new(move |creation_context| {
            let style = Style {
                visuals: Visuals::dark(),
                override_font_id: Some(FontId::proportional(17f32)),
                ..Style::default()
            };

            creation_context.egui_ctx.set_style(style);
            Ok(Box::new(MainWindow::new(creation_context, catalog, &site)))
        }),
    )?;

    Ok(())
}
