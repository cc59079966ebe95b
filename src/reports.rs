use log::{debug, info, warn};

use report_filling::batch::{run_batch, BatchOptions, BatchOutput};
use report_filling::quiz::QuizPersonalizer;
use report_filling::roster::{load_roster, RawTable};
use report_filling::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::reports::config_reader::*;

pub mod config_reader;
mod io_archive;
mod io_common;
mod io_csv;
mod io_docx;
mod io_excel;

#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("No worksheet named {name} in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Line {lineno}: malformed record"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening configuration file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the configuration"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Missing parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error reading template {path}"))]
    ReadingTemplate {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Template {path} is not a valid document: {message}"))]
    ParsingTemplate { path: String, message: String },
    #[snafu(display("Invalid roster: {source}"))]
    Roster { source: RosterError },
    #[snafu(display("Invalid configuration: {source}"))]
    Rules { source: RulesError },
    #[snafu(display("Error writing {path}"))]
    WritingArchive {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error adding {name} to the archive"))]
    ZipEntry {
        source: zip::result::ZipError,
        name: String,
    },
    #[snafu(display("Error writing {name} into the archive"))]
    ZipWrite {
        source: std::io::Error,
        name: String,
    },
    #[snafu(display("Error building the summary spreadsheet"))]
    WritingSummary {
        source: rust_xlsxwriter::XlsxError,
    },
    #[snafu(display("{count} documents could not be written: {units}"))]
    FailedUnits { count: usize, units: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;
pub type BReportResult<T> = Result<T, Box<ReportError>>;

/// Values given on the command line. They take precedence over the
/// configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub config: Option<String>,
    pub input: Option<String>,
    pub template: Option<String>,
    pub out: Option<String>,
    pub seed: Option<u64>,
    pub variant: Option<String>,
}

fn read_roster_table(path: &Path, source: &FileSource) -> BReportResult<RawTable> {
    let p = path.display().to_string();
    info!("Attempting to read roster file {:?}", p);
    match io_common::roster_provider(source, path)? {
        io_common::RosterProvider::Excel => {
            io_excel::read_excel_roster(&p, source.excel_worksheet_name.as_deref())
        }
        io_common::RosterProvider::Csv => io_csv::read_csv_roster(&p, source),
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => {
            info!("Using random seed {}", s);
            StdRng::seed_from_u64(s)
        }
        None => StdRng::from_os_rng(),
    }
}

/// Generates all the documents and writes the archive.
///
/// The archive is written even when some documents failed; the error then
/// names them.
pub fn run_generation(overrides: &RunOverrides) -> BReportResult<()> {
    let (config, root_p): (ReportConfig, PathBuf) = match overrides.config.as_ref() {
        Some(path) => {
            let config = read_config(path)?;
            let root = Path::new(path)
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => {
            info!("No configuration given, using the training report defaults");
            (default_config()?, PathBuf::from("."))
        }
    };
    debug!("run_generation: config: {:?}", config);

    let rules = validate_rules(&config)?;
    let operator = operator_config(&config);
    let quiz_rules = quiz_rules(&config)?;

    let roster_p = match overrides.input.as_ref() {
        Some(p) => PathBuf::from(p),
        None => io_common::resolve_path(&root_p, &config.roster_source.file_path),
    };
    let table = read_roster_table(&roster_p, &config.roster_source)?;
    let roster = load_roster(&table, &config.roster_source.roster_columns()).context(RosterSnafu {})?;

    let template_p = match overrides.template.as_ref() {
        Some(p) => PathBuf::from(p),
        None => io_common::resolve_path(&root_p, &config.template_path),
    };
    let template_path = template_p.display().to_string();
    info!("Reading template {:?}", template_path);
    let template_bytes = fs::read(&template_p).context(ReadingTemplateSnafu {
        path: template_path.clone(),
    })?;
    let template = io_docx::read_template(&template_bytes, &template_path)?;
    let writer = io_docx::DocxWriter::new(template_bytes);

    let settings = &config.output_settings;
    let variant = output_variant(overrides.variant.as_deref().or(settings.variant.as_deref()))?;
    let quiz;
    let mut options = match variant {
        OutputVariant::SessionReport => BatchOptions::session_reports(),
        OutputVariant::ParticipantQuiz => {
            quiz = QuizPersonalizer::new(&rules.marks, &quiz_rules).context(RulesSnafu {})?;
            BatchOptions::participant_quizzes(&quiz)
        }
    };
    if let Some(prefix) = settings.document_prefix.as_ref() {
        options.prefix = prefix.clone();
    }
    if let Some(summary) = settings.generate_summary {
        options.summary = summary;
    }

    let mut rng = make_rng(overrides.seed.or(settings.random_seed));
    let output = run_batch(&roster, &template, &rules, &operator, &writer, &options, &mut rng);
    if !output.anomalies.is_empty() {
        warn!(
            "{} anomalies found, the affected markers are left in the documents",
            output.anomalies.len()
        );
    }

    let out_p = match overrides.out.as_ref() {
        Some(p) => PathBuf::from(p),
        None => {
            let dir = settings.output_directory.clone().unwrap_or_else(|| ".".to_string());
            let name = settings
                .archive_name
                .clone()
                .unwrap_or_else(|| "Comptes_Rendus.zip".to_string());
            io_common::resolve_path(&root_p, &dir).join(name)
        }
    };
    let summary_name = if options.summary {
        Some(
            settings
                .summary_file_name
                .clone()
                .unwrap_or_else(|| "Recapitulatif.xlsx".to_string()),
        )
    } else {
        None
    };
    write_outputs(&output, &rules, summary_name, &out_p)
}

/// Writes the archive with every completed document, then fails if some
/// documents could not be written.
fn write_outputs(
    output: &BatchOutput,
    rules: &ReportRules,
    summary_name: Option<String>,
    out_p: &Path,
) -> BReportResult<()> {
    let summary = match summary_name {
        Some(name) => {
            let title = io_archive::headline_title(rules.headline_group.as_deref());
            Some((name, io_archive::build_summary(&output.summary, &title)?))
        }
        None => None,
    };
    let archive = io_archive::build_archive(&output.entries, summary)?;

    let out_path = out_p.display().to_string();
    fs::write(out_p, archive).context(WritingArchiveSnafu {
        path: out_path.clone(),
    })?;
    info!(
        "Wrote {} documents into {}",
        output.entries.len(),
        out_path
    );

    if !output.failures.is_empty() {
        let units: Vec<String> = output
            .failures
            .iter()
            .map(|f| format!("{} ({})", f.unit, f.message))
            .collect();
        return Err(Box::new(ReportError::FailedUnits {
            count: units.len(),
            units: units.join(", "),
        }));
    }
    Ok(())
}
