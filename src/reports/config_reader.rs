use crate::reports::*;

use report_filling::builder::RulesBuilder;
use report_filling::roster::RosterColumns;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// The configuration used when none is given on the command line.
const DEFAULT_CONFIG: &str = include_str!("../../config/training_report.json");

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "archiveName")]
    pub archive_name: Option<String>,
    #[serde(rename = "documentPrefix")]
    pub document_prefix: Option<String>,
    #[serde(rename = "summaryFileName")]
    pub summary_file_name: Option<String>,
    #[serde(rename = "generateSummary")]
    pub generate_summary: Option<bool>,
    pub variant: Option<String>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<u64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RosterColumnNames {
    pub session: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub course: Option<String>,
    pub duration: Option<String>,
    pub trainer: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    /// `xlsx` or `csv`. Guessed from the file extension when absent.
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "csvDelimiter")]
    pub csv_delimiter: Option<String>,
    pub columns: Option<RosterColumnNames>,
}

impl FileSource {
    pub fn roster_columns(&self) -> RosterColumns {
        let d = RosterColumns::default();
        match self.columns.as_ref() {
            None => d,
            Some(c) => RosterColumns {
                session: c.session.clone().unwrap_or(d.session),
                first_name: c.first_name.clone().unwrap_or(d.first_name),
                last_name: c.last_name.clone().unwrap_or(d.last_name),
                course: c.course.clone().unwrap_or(d.course),
                duration: c.duration.clone().unwrap_or(d.duration),
                trainer: c.trainer.clone().unwrap_or(d.trainer),
            },
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderNames {
    pub trainer: Option<String>,
    #[serde(rename = "sessionRef")]
    pub session_ref: Option<String>,
    pub course: Option<String>,
    pub duration: Option<String>,
    #[serde(rename = "participantCount")]
    pub participant_count: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MarksConfig {
    pub marker: Option<String>,
    pub selected: Option<String>,
    pub unselected: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AnswerGroupConfig {
    pub name: String,
    pub options: Vec<String>,
    pub positive: Option<Vec<String>>,
    pub anchors: Option<Vec<String>>,
    #[serde(rename = "hardOverride")]
    pub hard_override: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FreeTextConfig {
    #[serde(rename = "improvementHeading")]
    pub improvement_heading: Option<String>,
    #[serde(rename = "observationsHeading")]
    pub observations_heading: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OperatorChoicesConfig {
    pub fixed: Option<BTreeMap<String, String>>,
    #[serde(rename = "improvementNotes")]
    pub improvement_notes: Option<String>,
    pub observations: Option<String>,
}

impl OperatorChoicesConfig {
    fn to_choices(&self) -> OperatorChoices {
        OperatorChoices {
            fixed: self.fixed.clone().unwrap_or_default(),
            improvement_notes: self.improvement_notes.clone().unwrap_or_default(),
            observations: self.observations.clone().unwrap_or_default(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSection {
    #[serde(flatten)]
    pub defaults: OperatorChoicesConfig,
    pub sessions: Option<BTreeMap<String, OperatorChoicesConfig>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    #[serde(rename = "correctMarker")]
    pub correct_marker: Option<String>,
    /// question number -> letter
    #[serde(rename = "fixedPositions")]
    pub fixed_positions: Option<BTreeMap<String, String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "rosterSource")]
    pub roster_source: FileSource,
    #[serde(rename = "templatePath")]
    pub template_path: String,
    pub placeholders: Option<PlaceholderNames>,
    pub marks: Option<MarksConfig>,
    #[serde(rename = "answerGroups")]
    pub answer_groups: Vec<AnswerGroupConfig>,
    #[serde(rename = "headlineGroup")]
    pub headline_group: Option<String>,
    #[serde(rename = "freeText")]
    pub free_text: Option<FreeTextConfig>,
    pub operator: Option<OperatorSection>,
    pub quiz: Option<QuizConfig>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum OutputVariant {
    SessionReport,
    ParticipantQuiz,
}

pub fn output_variant(name: Option<&str>) -> ReportResult<OutputVariant> {
    match name {
        None | Some("sessionReport") => Ok(OutputVariant::SessionReport),
        Some("participantQuiz") => Ok(OutputVariant::ParticipantQuiz),
        Some(x) => whatever!("unknown variant: {}", x),
    }
}

pub fn read_config(path: &str) -> BReportResult<ReportConfig> {
    info!("Reading configuration {:?}", path);
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ReportConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn default_config() -> BReportResult<ReportConfig> {
    let config: ReportConfig = serde_json::from_str(DEFAULT_CONFIG).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn validate_rules(config: &ReportConfig) -> BReportResult<ReportRules> {
    let mut marks = Marks::default();
    if let Some(m) = config.marks.as_ref() {
        marks = Marks {
            marker: m.marker.clone().unwrap_or(marks.marker),
            selected: m.selected.clone().unwrap_or(marks.selected),
            unselected: m.unselected.clone().unwrap_or(marks.unselected),
        };
    }

    let mut tokens = PlaceholderTokens::default();
    if let Some(p) = config.placeholders.as_ref() {
        tokens = PlaceholderTokens {
            trainer: p.trainer.clone().unwrap_or(tokens.trainer),
            session_ref: p.session_ref.clone().unwrap_or(tokens.session_ref),
            course: p.course.clone().unwrap_or(tokens.course),
            duration: p.duration.clone().unwrap_or(tokens.duration),
            participant_count: p
                .participant_count
                .clone()
                .unwrap_or(tokens.participant_count),
            first_name: p.first_name.clone().unwrap_or(tokens.first_name),
            last_name: p.last_name.clone().unwrap_or(tokens.last_name),
        };
    }

    let mut headings = FreeTextHeadings::default();
    if let Some(f) = config.free_text.as_ref() {
        headings = FreeTextHeadings {
            improvement: f.improvement_heading.clone().unwrap_or(headings.improvement),
            observations: f
                .observations_heading
                .clone()
                .unwrap_or(headings.observations),
        };
    }

    let mut builder = RulesBuilder::new()
        .marks(marks)
        .context(RulesSnafu {})?
        .placeholders(tokens)
        .headings(headings);
    for g in config.answer_groups.iter() {
        builder
            .add_group(AnswerGroup {
                name: g.name.clone(),
                options: g.options.clone(),
                positive: g.positive.clone().unwrap_or_default(),
                anchors: g.anchors.clone().unwrap_or_default(),
                hard_override: g.hard_override.clone(),
            })
            .context(RulesSnafu {})?;
    }
    if let Some(h) = config.headline_group.as_ref() {
        builder = builder.headline(h);
    }
    let rules = builder.build().context(RulesSnafu {})?;
    debug!("validate_rules: {} answer groups", rules.groups.len());
    Ok(rules)
}

pub fn operator_config(config: &ReportConfig) -> OperatorConfig {
    match config.operator.as_ref() {
        None => OperatorConfig::default(),
        Some(op) => OperatorConfig {
            defaults: op.defaults.to_choices(),
            sessions: op
                .sessions
                .clone()
                .unwrap_or_default()
                .iter()
                .map(|(id, c)| (id.clone(), c.to_choices()))
                .collect(),
        },
    }
}

pub fn quiz_rules(config: &ReportConfig) -> ReportResult<QuizRules> {
    let mut rules = QuizRules::default();
    let q = match config.quiz.as_ref() {
        Some(q) => q,
        None => return Ok(rules),
    };
    if let Some(m) = q.correct_marker.as_ref() {
        rules.correct_marker = m.clone();
    }
    for (number, letter) in q.fixed_positions.clone().unwrap_or_default() {
        let n = match number.trim().parse::<usize>() {
            Ok(n) if n >= 1 => n,
            _ => whatever!("quiz.fixedPositions: {:?} is not a question number", number),
        };
        let mut chars = letter.trim().chars();
        let c = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
            _ => whatever!("quiz.fixedPositions: {:?} is not a letter", letter),
        };
        rules.fixed_positions.insert(n, c);
    }
    Ok(rules)
}
