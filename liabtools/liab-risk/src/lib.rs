//! Core module for extracting antibody regions, flagging sequence
//! liabilities and rating their risk
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This crate reads a tab-separated table of antibody records, slices
//! each record into framework and CDR regions, scans every region with
//! the requested liability rules and writes the table back with one
//! liability and one risk column per region, an overall risk and a
//! textual summary per record.

pub mod cli;
pub mod core;
pub mod utils;

use anyhow::Result;
use config::ArgCheck;

pub fn lib_liab_risk(args: Vec<String>) -> Result<()> {
    let args = cli::Args::from(args);
    args.check()?;

    crate::core::annotate_liabilities(args)?;

    log::info!("SUCCESS: liab-risk ran succesfully!");
    Ok(())
}
