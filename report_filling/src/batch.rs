use log::{debug, info, warn};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{Anomaly, OperatorConfig, ReportRules};
use crate::document::Document;
use crate::quiz::QuizPersonalizer;
use crate::roster::Roster;
use crate::{fill_participant_quiz, fill_session_document};

/// Turns a filled document into the bytes of a file.
///
/// Implementations are expected to start from a pristine copy of the template
/// for every call.
pub trait DocumentWriter {
    type Error: Display;

    fn write(&self, doc: &Document) -> Result<Vec<u8>, Self::Error>;
}

/// What one unit of work is.
#[derive(Debug, Clone, Copy)]
pub enum Variant<'a> {
    /// One report per session.
    SessionReport,
    /// One questionnaire per participant.
    ParticipantQuiz(&'a QuizPersonalizer),
}

#[derive(Debug, Clone)]
pub struct BatchOptions<'a> {
    pub prefix: String,
    /// Without the dot.
    pub extension: String,
    pub summary: bool,
    pub variant: Variant<'a>,
    /// Checked before each unit of work. Once set, the batch stops and returns
    /// what it has done so far.
    pub cancel: Option<&'a AtomicBool>,
}

impl<'a> BatchOptions<'a> {
    pub fn session_reports() -> BatchOptions<'a> {
        BatchOptions {
            prefix: "Compte_Rendu".to_string(),
            extension: "docx".to_string(),
            summary: true,
            variant: Variant::SessionReport,
            cancel: None,
        }
    }

    pub fn participant_quizzes(quiz: &'a QuizPersonalizer) -> BatchOptions<'a> {
        BatchOptions {
            prefix: "QCM".to_string(),
            extension: "docx".to_string(),
            summary: false,
            variant: Variant::ParticipantQuiz(quiz),
            cancel: None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// One line of the summary spreadsheet.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SummaryRow {
    pub session: String,
    pub trainer: String,
    pub participants: usize,
    /// The answer chosen for the headline group.
    pub headline: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct UnitFailure {
    /// The file name the document would have had.
    pub unit: String,
    pub message: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BatchOutput {
    pub entries: Vec<ArchiveEntry>,
    pub summary: Vec<SummaryRow>,
    pub failures: Vec<UnitFailure>,
    /// (file name, anomaly)
    pub anomalies: Vec<(String, Anomaly)>,
    pub cancelled: bool,
}

impl BatchOutput {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Replaces the characters unsafe in file names.
pub fn sanitize_file_stem(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// Gives a distinct archive name to every document.
struct NameAllocator {
    extension: String,
    seen: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl NameAllocator {
    fn new(extension: &str) -> NameAllocator {
        NameAllocator {
            extension: extension.to_string(),
            seen: HashMap::new(),
            issued: HashSet::new(),
        }
    }

    // A suffixed name can also be the plain name of another unit: skip the
    // suffixes already issued.
    fn next(&mut self, parts: &[&str]) -> String {
        let stem = sanitize_file_stem(&parts.join("_"));
        let count = self.seen.entry(stem.clone()).or_insert(0);
        loop {
            *count += 1;
            let name = if *count == 1 {
                format!("{}.{}", stem, self.extension)
            } else {
                format!("{}_{}.{}", stem, count, self.extension)
            };
            if self.issued.insert(name.clone()) {
                return name;
            }
        }
    }
}

fn is_cancelled(options: &BatchOptions) -> bool {
    options
        .cancel
        .map_or(false, |flag| flag.load(Ordering::Relaxed))
}

/// Renders every unit of work of the roster, one after the other.
///
/// A unit whose document cannot be written is recorded as a failure and the
/// batch goes on with the next one. Content anomalies never stop the batch.
pub fn run_batch<W: DocumentWriter, R: Rng + ?Sized>(
    roster: &Roster,
    template: &Document,
    rules: &ReportRules,
    operator: &OperatorConfig,
    writer: &W,
    options: &BatchOptions,
    rng: &mut R,
) -> BatchOutput {
    let mut output = BatchOutput::default();
    let mut names = NameAllocator::new(&options.extension);

    'sessions: for session in roster.sessions.iter() {
        match options.variant {
            Variant::SessionReport => {
                if is_cancelled(options) {
                    output.cancelled = true;
                    break 'sessions;
                }
                let choices = operator.choices_for(&session.id);
                let name = names.next(&[options.prefix.as_str(), session.id.as_str()]);
                let filled = fill_session_document(template, rules, session, &choices, rng);
                let headline = filled.headline(rules);
                output
                    .anomalies
                    .extend(filled.anomalies.into_iter().map(|a| (name.clone(), a)));
                if add_entry(&mut output, writer, &filled.document, name) && options.summary {
                    output.summary.push(SummaryRow {
                        session: session.id.clone(),
                        trainer: session.trainer().to_string(),
                        participants: session.participant_count(),
                        headline,
                    });
                }
            }
            Variant::ParticipantQuiz(quiz) => {
                let mut written = false;
                for row in session.rows.iter() {
                    if is_cancelled(options) {
                        output.cancelled = true;
                        break 'sessions;
                    }
                    let name = names.next(&[
                        options.prefix.as_str(),
                        session.id.as_str(),
                        row.last_name.as_str(),
                        row.first_name.as_str(),
                    ]);
                    let filled = fill_participant_quiz(template, rules, quiz, session, row, rng);
                    output
                        .anomalies
                        .extend(filled.anomalies.into_iter().map(|a| (name.clone(), a)));
                    written |= add_entry(&mut output, writer, &filled.document, name);
                }
                if written && options.summary {
                    output.summary.push(SummaryRow {
                        session: session.id.clone(),
                        trainer: session.trainer().to_string(),
                        participants: session.participant_count(),
                        headline: None,
                    });
                }
            }
        }
    }

    if output.cancelled {
        info!(
            "Batch cancelled after {} documents",
            output.entries.len() + output.failures.len()
        );
    } else {
        info!(
            "Batch done: {} documents, {} failures, {} anomalies",
            output.entries.len(),
            output.failures.len(),
            output.anomalies.len()
        );
    }
    output
}

// Returns whether the document made it into the archive.
fn add_entry<W: DocumentWriter>(
    output: &mut BatchOutput,
    writer: &W,
    doc: &Document,
    name: String,
) -> bool {
    match writer.write(doc) {
        Ok(bytes) => {
            debug!("add_entry: {}: {} bytes", name, bytes.len());
            output.entries.push(ArchiveEntry { name, bytes });
            true
        }
        Err(e) => {
            warn!("Could not write {}: {}", name, e);
            output.failures.push(UnitFailure {
                unit: name,
                message: e.to_string(),
            });
            false
        }
    }
}
