use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// column naming
pub const SEQUENCE_SUFFIX: &str = "aa";
pub const ANNOTATION_SUFFIX: &str = "annotations";
pub const LIABILITIES_SUFFIX: &str = "liabilities";
pub const RISK_SUFFIX: &str = "risk";
pub const IDENTIFIER: &str = "clonotypeKey";
pub const OVERALL_RISK: &str = "Liabilities risk";
pub const LIABILITIES_SUMMARY: &str = "Sequence liabilities summary";
pub const CHAIN_PREFIXES: [&str; 2] = ["Heavy", "Light"];

// cell values
pub const NO_FINDINGS: &str = "None";
pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";

// annotation wire format
pub const SEGMENT_DELIMITER: char = '|';
pub const LABEL_DELIMITER: char = ':';
pub const SPAN_DELIMITER: char = '+';

// accepted input table extensions
pub const TABLE_EXTENSIONS: [&str; 3] = ["tsv", "txt", "tab"];

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// write a JSON value pretty-printed to a file, or to stdout when no path is given
pub fn write_json(value: &Value, path: Option<&Path>, description: &str) -> Result<(), CliError> {
    let contents = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::InvalidInput(format!("could not serialize {description}: {e}")))?;

    match path {
        Some(path) => {
            let f = File::create(path)?;
            let mut writer = BufWriter::new(f);
            writeln!(writer, "{}", contents)?;
            writer.flush()?;

            log::info!("{} written to {}", description, path.display());
        }
        None => {
            println!("\n{}:\n{}", description, contents);
        }
    }

    Ok(())
}

/// argument checker for all tools
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        validate(self.get_input())?;
        self.check_outputs();

        Ok(())
    }

    /// unwritable destinations are reported here but only fail at write time
    fn check_outputs(&self) {
        for output in self.get_outputs() {
            match output.parent() {
                Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                    log::warn!(
                        "Output directory {:?} does not exist, writing {:?} will fail",
                        parent,
                        output
                    );
                }
                _ => (),
            }
        }
    }

    fn get_input(&self) -> &PathBuf;
    fn get_outputs(&self) -> Vec<&PathBuf>;
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument validation
pub fn validate(arg: &PathBuf) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!("{:?} does not exist", arg)));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!("{:?} is not a file", arg)));
    }

    match arg.extension().and_then(|ext| ext.to_str()) {
        Some(ext)
            if TABLE_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted)) => {}
        _ => {
            return Err(CliError::InvalidInput(format!(
                "file {:?} is not a tab-separated table",
                arg
            )))
        }
    }

    std::fs::metadata(arg).map(|_| ()).map_err(CliError::IoError)
}
