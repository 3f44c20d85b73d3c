pub mod aggregate;
pub mod bindings;
pub mod bindings_cmd;
pub mod cli;
pub mod data;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filter;
pub mod io_utils;
pub mod metrics;
pub mod session;
pub mod summary;
pub mod table;
pub mod view;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    bindings::{BindingConfig, BindingTable, Category, Level, Selection},
    dataset::{Dataset, LoadOptions},
    error::DashboardError,
    filter::RowFilter,
    view::{ViewModel, ViewRequest, compute},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("seatboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Summary(args) => summary::execute(&args),
        Commands::Drilldown(args) => summary::execute_drilldown(&args),
        Commands::Export(args) => export::execute(&args),
        Commands::Bindings(args) => bindings_cmd::execute(&args),
        Commands::Districts(args) => bindings_cmd::execute_districts(&args),
    }
}
