use clap::Parser;
use std::path::PathBuf;

use crate::adapter::ReportKind;
use crate::report::export::ExportOptions;
use crate::report::pdf::layout::{PageGeometry, PageSize};

/// Environment variable consulted when `--output-dir` is not given.
pub const OUTPUT_DIR_ENV: &str = "REPORT_EXPORT_OUTPUT_DIR";

/// Get the default output directory for report-export
/// Uses the platform documents directory:
/// - Linux: ~/Documents/Report Exports
/// - macOS: ~/Documents/Report Exports
/// - Windows: {FOLDERID_Documents}\Report Exports
pub fn default_output_dir() -> PathBuf {
    dirs::document_dir().map(|p| p.join("Report Exports")).unwrap_or_else(|| PathBuf::from("exports"))
}

#[derive(Parser, Debug, Clone)]
#[command(name = "report-export")]
#[command(about = "Render an analysis payload as synchronized HTML, PDF and Markdown reports")]
#[command(version)]
pub struct CliArgs {
    /// Path to the JSON payload to export
    #[arg(long, short = 'i', value_name = "PATH")]
    pub input: PathBuf,

    /// Directory that receives the per-kind report folders
    /// Default: $REPORT_EXPORT_OUTPUT_DIR, then ~/Documents/Report Exports
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Report kind; inferred from the payload's "type" field when omitted
    #[arg(long, value_enum)]
    pub kind: Option<ReportKind>,

    /// TOML file with classification rules replacing the built-in ones per kind
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Paper size of the PDF output
    #[arg(long, value_enum, default_value = "letter")]
    pub page_size: PageSize,

    /// Keep writing the other formats when one renderer fails.
    /// Failures are listed in the manifest and the exit code is still 1.
    #[arg(long)]
    pub isolate_renderers: bool,
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        CliArgs::parse()
    }

    /// Validate arguments that clap cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        if let Some(rules) = &self.rules
            && !rules.is_file()
        {
            return Err(format!("Rules file not found: {}", rules.display()));
        }
        if let Some(dir) = &self.output_dir
            && dir.is_file()
        {
            return Err(format!("Output directory is a file: {}", dir.display()));
        }
        Ok(())
    }

    /// Output directory: flag, then environment, then the documents directory
    pub fn resolve_output_dir(&self) -> PathBuf {
        self.resolve_output_dir_with(std::env::var_os(OUTPUT_DIR_ENV).map(PathBuf::from))
    }

    fn resolve_output_dir_with(&self, from_env: Option<PathBuf>) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(|| from_env.filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(default_output_dir)
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            output_dir: self.resolve_output_dir(),
            kind: self.kind,
            rules: self.rules.clone(),
            page: PageGeometry::new(self.page_size),
            isolate_renderers: self.isolate_renderers,
        }
    }
}
