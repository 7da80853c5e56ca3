//! Core module for extracting antibody regions, flagging sequence
//! liabilities and rating their risk
//! Alejandro Gonzales-Irribarren, 2025
//!
//! Reads an antibody table, extracts FR/CDR regions from annotation
//! strings when needed, flags liabilities per region and rates them on
//! a None < Low < Medium < High scale.

use clap::{self, Parser};
use config::{ArgCheck, VERSION};
use log::{error, info, Level};
use simple_logger::init_with_level;

use liab_risk::{cli::Args, core::annotate_liabilities};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap_or_else(|e| {
        eprintln!("ERROR: could not start logger: {}", e);
    });

    info!("liab-risk v{}", VERSION);
    let args: Args = Args::parse();

    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    annotate_liabilities(args).unwrap_or_else(|e| {
        error!("{:#}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
