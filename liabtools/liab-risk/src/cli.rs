use clap::{self, Parser};
use config::ArgCheck;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Extract antibody regions, flag sequence liabilities and rate their risk",
    long_about = None
)]
pub struct Args {
    #[arg(
        required = true,
        value_name = "INPUT_TSV",
        help = "Tab-separated table with sequence and/or annotation columns"
    )]
    pub input: PathBuf,

    #[arg(
        required = true,
        value_name = "OUTPUT_TSV",
        help = "Path to the annotated output table"
    )]
    pub output: PathBuf,

    #[arg(
        short = 'm',
        long = "label-map",
        required = false,
        value_name = "PATH|JSON",
        help = "Region label map as a JSON file or an inline JSON object"
    )]
    pub label_map: Option<String>,

    #[arg(
        short = 'o',
        long = "output-label-map",
        required = false,
        value_name = "PATH",
        help = "Where to write the final label map [default: stdout]"
    )]
    pub output_label_map: Option<PathBuf>,

    #[arg(
        long = "include-liabilities",
        required = false,
        value_name = "NAMES",
        help = "Comma-delimited liability names to compute"
    )]
    pub include_liabilities: Option<String>,

    #[arg(
        long = "output-regions-found",
        required = false,
        value_name = "PATH",
        help = "Where to write the analyzed regions as a JSON array"
    )]
    pub output_regions_found: Option<PathBuf>,
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}

impl ArgCheck for Args {
    fn get_input(&self) -> &PathBuf {
        &self.input
    }

    fn get_outputs(&self) -> Vec<&PathBuf> {
        [
            Some(&self.output),
            self.output_label_map.as_ref(),
            self.output_regions_found.as_ref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
