// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// The literal marker written next to each option in a template, and the two
/// symbols that replace it once the answer is known.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Marks {
    pub marker: String,
    pub selected: String,
    pub unselected: String,
}

impl Default for Marks {
    fn default() -> Self {
        Marks {
            marker: "{{checkbox}}".to_string(),
            selected: "☑".to_string(),
            unselected: "☐".to_string(),
        }
    }
}

/// One question of the feedback form: a named set of mutually exclusive options.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnswerGroup {
    pub name: String,
    /// The valid labels, in the order the form lists them.
    pub options: Vec<String>,
    /// The favorable labels, preferred by the random fallback.
    pub positive: Vec<String>,
    /// Phrases introducing this question in the template. Only used to tell
    /// apart groups sharing a label.
    pub anchors: Vec<String>,
    /// Organizational policy: this answer is always marked, whatever the operator says.
    pub hard_override: Option<String>,
}

impl AnswerGroup {
    pub fn is_positive(&self, label: &str) -> bool {
        self.positive.iter().any(|p| p == label)
    }

    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|o| o == label)
    }
}

/// The tokens substituted with roster values.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PlaceholderTokens {
    pub trainer: String,
    pub session_ref: String,
    pub course: String,
    pub duration: String,
    pub participant_count: String,
    // Only filled in the per-participant variant.
    pub first_name: String,
    pub last_name: String,
}

impl Default for PlaceholderTokens {
    fn default() -> Self {
        PlaceholderTokens {
            trainer: "{{formateur}}".to_string(),
            session_ref: "{{ref_session}}".to_string(),
            course: "{{formation_dispensee}}".to_string(),
            duration: "{{duree_formation}}".to_string(),
            participant_count: "{{nb_participants}}".to_string(),
            first_name: "{{prenom}}".to_string(),
            last_name: "{{nom}}".to_string(),
        }
    }
}

/// Headings of the two free-text sections appended at the end of a report.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FreeTextHeadings {
    pub improvement: String,
    pub observations: String,
}

impl Default for FreeTextHeadings {
    fn default() -> Self {
        FreeTextHeadings {
            improvement: "Avis & piste d'amélioration :".to_string(),
            observations: "Autres observations :".to_string(),
        }
    }
}

/// Everything that describes how a report template is filled, independent of
/// any session. Build it with [crate::builder::RulesBuilder] to get it validated.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReportRules {
    pub groups: Vec<AnswerGroup>,
    pub marks: Marks,
    pub placeholders: PlaceholderTokens,
    pub headings: FreeTextHeadings,
    /// The group whose answer is reported in the summary.
    pub headline_group: Option<String>,
}

impl ReportRules {
    pub fn group(&self, name: &str) -> Option<&AnswerGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// What the operator decided for one session.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct OperatorChoices {
    /// group name -> option label
    pub fixed: BTreeMap<String, String>,
    pub improvement_notes: String,
    pub observations: String,
}

/// The operator input for a whole batch: a default set of choices and
/// optional per-session refinements.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct OperatorConfig {
    pub defaults: OperatorChoices,
    pub sessions: BTreeMap<String, OperatorChoices>,
}

impl OperatorConfig {
    /// The effective choices for a session. Per-session fixed values win over
    /// the defaults, and non-empty per-session texts replace the default texts.
    pub fn choices_for(&self, session_id: &str) -> OperatorChoices {
        let mut res = self.defaults.clone();
        if let Some(specific) = self.sessions.get(session_id) {
            for (group, value) in specific.fixed.iter() {
                res.fixed.insert(group.clone(), value.clone());
            }
            if !specific.improvement_notes.trim().is_empty() {
                res.improvement_notes = specific.improvement_notes.clone();
            }
            if !specific.observations.trim().is_empty() {
                res.observations = specific.observations.clone();
            }
        }
        res
    }
}

/// Rules of the quiz personalization variant.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuizRules {
    /// Token flagging the correct answer of a question in the template.
    pub correct_marker: String,
    /// 1-based question number -> visible letter where the correct answer is pinned.
    pub fixed_positions: BTreeMap<usize, char>,
}

impl Default for QuizRules {
    fn default() -> Self {
        QuizRules {
            correct_marker: "{{correct}}".to_string(),
            fixed_positions: BTreeMap::new(),
        }
    }
}

// ******** Output data structures *********

/// Where the answer of a group came from.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum AnswerSource {
    HardOverride,
    Operator,
    Random,
}

/// Why a checkbox marker could not be attached to a group.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum MissReason {
    /// None of the known labels appear next to the marker.
    NoKnownLabel,
    /// The label was found, but every group it could belong to already holds it.
    DuplicateLabel(String),
    /// The unit also holds markers cut by formatting, so its labels cannot be
    /// paired with its markers.
    SplitMarker,
}

/// Content anomalies found while filling one document. None of them stops a batch:
/// the affected markers or tokens are left as they are in the output.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Anomaly {
    DetectionMiss {
        unit: usize,
        context: String,
        reason: MissReason,
    },
    ResolutionMiss {
        group: String,
        requested: String,
        source: AnswerSource,
    },
    SplitPlaceholder {
        unit: usize,
        token: String,
    },
    UnknownGroup {
        group: String,
    },
    QuizMiss {
        question: usize,
        reason: String,
    },
}

impl Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::DetectionMiss {
                unit,
                context,
                reason: MissReason::NoKnownLabel,
            } => write!(
                f,
                "unit {}: checkbox next to {:?} matches no known option",
                unit, context
            ),
            Anomaly::DetectionMiss {
                unit,
                context,
                reason: MissReason::DuplicateLabel(label),
            } => write!(
                f,
                "unit {}: option {:?} already detected for every candidate question ({:?})",
                unit, label, context
            ),
            Anomaly::DetectionMiss {
                unit,
                reason: MissReason::SplitMarker,
                ..
            } => write!(
                f,
                "unit {}: checkbox left as is, the unit has markers split across runs",
                unit
            ),
            Anomaly::ResolutionMiss {
                group,
                requested,
                source,
            } => write!(
                f,
                "group {}: requested answer {:?} ({:?}) is not in the template",
                group, requested, source
            ),
            Anomaly::SplitPlaceholder { unit, token } => write!(
                f,
                "unit {}: placeholder {} is split across formatted runs",
                unit, token
            ),
            Anomaly::UnknownGroup { group } => {
                write!(f, "operator choice for unknown group {}", group)
            }
            Anomaly::QuizMiss { question, reason } => {
                write!(f, "question {}: {}", question, reason)
            }
        }
    }
}

// ********* Errors **********

/// Errors that prevent a roster from being used. Any of them fails the whole
/// batch before a single document is rendered.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RosterError {
    /// Required columns absent from the header, in configuration order.
    MissingColumns(Vec<String>),
    /// A non-blank row without a value for a required column.
    /// `line` is the 1-based line in the file, the header being line 1.
    MissingValue { line: usize, column: String },
    EmptyRoster,
}

impl Error for RosterError {}

impl Display for RosterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterError::MissingColumns(cols) => {
                write!(f, "missing roster columns: {}", cols.join(", "))
            }
            RosterError::MissingValue { line, column } => {
                write!(f, "line {}: no value for required column {:?}", line, column)
            }
            RosterError::EmptyRoster => write!(f, "the roster has no participant"),
        }
    }
}

/// Inconsistent answer-group configuration.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RulesError {
    DuplicateGroup(String),
    NoOptions(String),
    UnknownPositive { group: String, label: String },
    UnknownOverride { group: String, label: String },
    UnknownHeadline(String),
    EmptyMarker,
    /// The quiz answer pattern could not be built from the markers.
    InvalidPattern(String),
}

impl Error for RulesError {}

impl Display for RulesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RulesError::DuplicateGroup(g) => write!(f, "group {:?} is declared twice", g),
            RulesError::NoOptions(g) => write!(f, "group {:?} has no option", g),
            RulesError::UnknownPositive { group, label } => write!(
                f,
                "group {:?}: positive label {:?} is not one of its options",
                group, label
            ),
            RulesError::UnknownOverride { group, label } => write!(
                f,
                "group {:?}: override {:?} is not one of its options",
                group, label
            ),
            RulesError::UnknownHeadline(g) => write!(f, "headline group {:?} is not declared", g),
            RulesError::EmptyMarker => write!(f, "the checkbox marker cannot be empty"),
            RulesError::InvalidPattern(msg) => write!(f, "invalid quiz answer pattern: {}", msg),
        }
    }
}
