use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use fetcher::{Column, ColumnMapping, FetchConfig, ReportFormat};

#[derive(Parser, Debug)]
#[command(author, version, about = "Download report documents listed in a spreadsheet or CSV file", long_about = None, name = "fetch-reports")]
pub struct CliArgs {
    /// Workbook (.xlsx, .xls, .ods) or CSV file; the first row is a header
    pub input: PathBuf,

    /// Directory the documents and the metadata report are written to
    pub output_dir: PathBuf,

    /// Maximum number of concurrent downloads (unbounded when omitted)
    #[arg(long, env = "FETCH_MAX_CONCURRENT")]
    pub max_concurrent: Option<usize>,

    /// Only fetch the first N rows
    #[arg(long)]
    pub limit: Option<usize>,

    /// File extension for downloaded documents
    #[arg(long, default_value = "pdf", env = "FETCH_EXTENSION")]
    pub extension: String,

    /// Content-Type a response must carry (absent headers are accepted)
    #[arg(long, default_value = "application/pdf", env = "FETCH_CONTENT_TYPE")]
    pub content_type: String,

    /// Skip the structural PDF check on downloaded files
    #[arg(long)]
    pub no_validate: bool,

    /// Leave partially written files behind on failure or cancellation
    #[arg(long)]
    pub keep_partial: bool,

    /// Format of the metadata report (xlsx for workbook input, csv otherwise)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Log progress instead of drawing progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "FETCH_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Column holding the item id, as a letter or a header name
    #[arg(long, default_value = "A")]
    pub id_column: String,

    #[arg(long, default_value = "C")]
    pub name_column: String,

    #[arg(long, default_value = "AL")]
    pub primary_column: String,

    #[arg(long, default_value = "AM")]
    pub fallback_column: String,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
    Xlsx,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Xlsx => ReportFormat::Xlsx,
        }
    }
}

impl CliArgs {
    pub fn fetch_config(&self) -> fetcher::Result<FetchConfig> {
        FetchConfig::builder()
            .max_concurrent(self.max_concurrent)
            .file_extension(self.extension.as_str())
            .expected_content_type(self.content_type.as_str())
            .remove_partial_files(!self.keep_partial)
            .build()
    }

    pub fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping {
            id: Column::parse(&self.id_column),
            name: Column::parse(&self.name_column),
            primary_url: Column::parse(&self.primary_column),
            fallback_url: Column::parse(&self.fallback_column),
        }
    }

    pub fn report_format(&self) -> ReportFormat {
        self.format
            .map(ReportFormat::from)
            .unwrap_or_else(|| ReportFormat::matching_input(&self.input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let args = CliArgs::parse_from(["fetch-reports", "in.csv", "out"]);
        let config = args.fetch_config().unwrap();

        assert_eq!(config.file_extension, "pdf");
        assert_eq!(config.expected_content_type, "application/pdf");
        assert_eq!(config.max_concurrent, None);
        assert!(config.remove_partial_files);
        assert_eq!(args.column_mapping(), ColumnMapping::default());
        assert_eq!(args.report_format(), ReportFormat::Csv);
    }

    #[test]
    fn flags_reach_the_config() {
        let args = CliArgs::parse_from([
            "fetch-reports",
            "in.csv",
            "out",
            "--max-concurrent",
            "4",
            "--extension",
            ".bin",
            "--keep-partial",
            "--format",
            "json",
            "-vv",
        ]);
        let config = args.fetch_config().unwrap();

        assert_eq!(config.max_concurrent, Some(4));
        assert_eq!(config.file_extension, "bin");
        assert!(!config.remove_partial_files);
        assert_eq!(args.report_format(), ReportFormat::Json);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn workbook_input_gets_a_workbook_report() {
        let args = CliArgs::parse_from(["fetch-reports", "GRI_2017_2020.xlsx", "out"]);
        assert_eq!(args.report_format(), ReportFormat::Xlsx);

        let args = CliArgs::parse_from(["fetch-reports", "GRI_2017_2020.xlsx", "out", "--format", "csv"]);
        assert_eq!(args.report_format(), ReportFormat::Csv);
    }

    #[test]
    fn column_flags_take_letters_or_headers() {
        let args = CliArgs::parse_from([
            "fetch-reports",
            "in.csv",
            "out",
            "--id-column",
            "B",
            "--primary-column",
            "pdf_url",
        ]);
        let mapping = args.column_mapping();

        assert_eq!(mapping.id, Column::Letter(1));
        assert_eq!(mapping.primary_url, Column::header("pdf_url"));
        assert_eq!(mapping.fallback_url, Column::Letter(38));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let args = CliArgs::parse_from(["fetch-reports", "in.csv", "out", "--max-concurrent", "0"]);
        assert!(args.fetch_config().is_err());
    }
}
