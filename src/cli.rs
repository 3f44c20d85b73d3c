use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    aggregate::{DEFAULT_DISTRICT_LIMIT, DEFAULT_RANK_LIMIT},
    bindings::{Category, Level},
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Seat, admission, and attendance analytics for institution datasets",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print KPIs, rankings, and district aggregates for a dataset
    Summary(SummaryArgs),
    /// Show per-institution detail for one district
    Drilldown(DrilldownArgs),
    /// Write the filtered, metric-augmented table to .xlsx, .csv, or .tsv
    Export(ExportArgs),
    /// Show how logical fields resolve to input columns, or write a bindings template
    Bindings(BindingsArgs),
    /// List the districts present in a dataset
    Districts(DistrictsArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input CSV/TSV file or Excel workbook
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Worksheet name or 0-based index (workbooks only, defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML file overriding the column keyword bindings
    #[arg(short = 'b', long = "bindings")]
    pub bindings: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Seat level to analyze
    #[arg(long, value_enum, default_value = "school")]
    pub level: Level,
    /// Seat category to analyze
    #[arg(long, value_enum, default_value = "minority")]
    pub category: Category,
    /// Restrict to these districts (repeatable or comma-separated; defaults to all)
    #[arg(short = 'd', long = "district", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub districts: Vec<String>,
    /// Case-insensitive institution name search
    #[arg(short = 's', long)]
    pub search: Option<String>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub view: ViewArgs,
    /// Number of institutions in the top and bottom attendance rankings
    #[arg(long, default_value_t = DEFAULT_RANK_LIMIT)]
    pub top: usize,
    /// Number of districts in the absenteeism ranking
    #[arg(long = "district-limit", default_value_t = DEFAULT_DISTRICT_LIMIT)]
    pub district_limit: usize,
    /// Emit the full view model as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DrilldownArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub view: ViewArgs,
    /// District to show institution detail for
    #[arg(value_name = "DISTRICT")]
    pub target: String,
    /// Emit rows as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub view: ViewArgs,
    /// Destination file; `.xlsx` writes a workbook, anything else delimited text
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Delimiter for delimited output (defaults by extension)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct BindingsArgs {
    /// Dataset to resolve the bindings against
    #[arg(short = 'i', long = "input", required_unless_present = "write_template")]
    pub input: Option<PathBuf>,
    /// Worksheet name or 0-based index (workbooks only)
    #[arg(long)]
    pub sheet: Option<String>,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML file overriding the column keyword bindings
    #[arg(short = 'b', long = "bindings")]
    pub bindings: Option<PathBuf>,
    /// Write the effective bindings configuration as YAML to this path
    #[arg(long = "write-template")]
    pub write_template: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DistrictsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn view_args_split_comma_separated_districts() {
        let cli = Cli::try_parse_from([
            "seatboard",
            "summary",
            "-i",
            "data.csv",
            "--level",
            "inter",
            "--category",
            "non-minority",
            "-d",
            "Adilabad,Warangal",
            "-d",
            "Medak",
        ])
        .expect("parse");
        let Commands::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.view.level, Level::Intermediate);
        assert_eq!(args.view.category, Category::NonMinority);
        assert_eq!(args.view.districts, ["Adilabad", "Warangal", "Medak"]);
        assert_eq!(args.top, DEFAULT_RANK_LIMIT);
    }

    #[test]
    fn bindings_requires_input_or_template() {
        assert!(Cli::try_parse_from(["seatboard", "bindings"]).is_err());
        assert!(
            Cli::try_parse_from(["seatboard", "bindings", "--write-template", "b.yml"]).is_ok()
        );
    }
}
