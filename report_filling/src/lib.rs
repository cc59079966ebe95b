/*!
Filling of training report templates.

A template is a document whose text carries placeholder tokens (`{{formateur}}`,
`{{ref_session}}`, ...) and checkbox markers (`{{checkbox}}`) written next to the
options of the feedback questions. For every session of a roster, this crate:

- substitutes the tokens with the session values,
- finds which question each checkbox belongs to,
- decides one answer per question,
- writes the selected and unselected symbols,
- appends the free-text comments of the operator.

The crate is only concerned with text: it works on [document::Document], a
list of units made of text runs, and leaves reading and writing actual files
to its callers (see [batch::DocumentWriter]).

See the [manual] for the configuration vocabulary.
*/

pub mod batch;
pub mod builder;
mod config;
pub mod detection;
pub mod document;
pub mod manual;
pub mod placeholders;
pub mod quiz;
pub mod render;
pub mod resolution;
pub mod roster;

use log::debug;
use rand::Rng;

pub use crate::config::*;
use crate::detection::detect_groups;
use crate::document::Document;
use crate::placeholders::{participant_replacements, session_replacements, substitute_document};
use crate::quiz::{QuizOutcome, QuizPersonalizer};
use crate::render::{append_free_text, render_marks, RenderStats};
use crate::resolution::{resolve_answers, Resolutions};
use crate::roster::{RosterRow, Session};

/// A report filled for one session.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FilledDocument {
    pub document: Document,
    pub resolutions: Resolutions,
    pub stats: RenderStats,
    /// All the non-fatal problems, in pipeline order.
    pub anomalies: Vec<Anomaly>,
}

impl FilledDocument {
    /// The answer of the summary group, if it was decided.
    pub fn headline(&self, rules: &ReportRules) -> Option<String> {
        let group = rules.headline_group.as_ref()?;
        self.resolutions.chosen(group).map(|s| s.to_string())
    }
}

/// Fills a copy of the template for one session.
///
/// ```
/// use report_filling::builder::RulesBuilder;
/// use report_filling::document::{Document, TextUnit};
/// use report_filling::roster::{load_roster, RawTable, RosterColumns};
/// use report_filling::{fill_session_document, OperatorChoices};
/// use rand::SeedableRng;
///
/// let mut builder = RulesBuilder::new();
/// builder.add_group_simple("adaptation", &["Oui", "Non"])?;
/// let rules = builder.build()?;
///
/// let table = RawTable {
///     header: ["session", "Prénom", "Nom", "formation", "nb d'heure", "formateur"]
///         .iter().map(|s| s.to_string()).collect(),
///     rows: vec![["S1", "Ana", "Durand", "Excel", "7", "Martin"]
///         .iter().map(|s| s.to_string()).collect()],
/// };
/// let roster = load_roster(&table, &RosterColumns::default())?;
///
/// let template = Document::new(vec![
///     TextUnit::new(&["Session {{ref_session}}"]),
///     TextUnit::new(&["{{checkbox}} Oui {{checkbox}} Non"]),
/// ]);
/// let mut choices = OperatorChoices::default();
/// choices.fixed.insert("adaptation".to_string(), "Oui".to_string());
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
///
/// let filled = fill_session_document(&template, &rules, &roster.sessions[0], &choices, &mut rng);
/// assert_eq!(filled.document.units[0].text(), "Session S1");
/// assert_eq!(filled.document.units[1].text(), "☑ Oui ☐ Non");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn fill_session_document<R: Rng + ?Sized>(
    template: &Document,
    rules: &ReportRules,
    session: &Session,
    choices: &OperatorChoices,
    rng: &mut R,
) -> FilledDocument {
    debug!("fill_session_document: session {}", session.id);
    let mut document = template.clone();
    let (_, mut anomalies) = substitute_document(
        &mut document,
        &session_replacements(&rules.placeholders, session),
    );
    let detection = detect_groups(&document.units, &rules.groups, &rules.marks.marker);
    anomalies.extend(detection.anomalies());
    let resolutions = resolve_answers(&detection, rules, choices, rng);
    anomalies.extend(resolutions.anomalies.iter().cloned());
    let stats = render_marks(&mut document, &detection, &resolutions, &rules.marks);
    append_free_text(&mut document, &rules.headings, choices);
    FilledDocument {
        document,
        resolutions,
        stats,
        anomalies,
    }
}

/// A questionnaire personalized for one participant.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FilledQuiz {
    pub document: Document,
    pub outcome: QuizOutcome,
    pub anomalies: Vec<Anomaly>,
}

/// Fills a copy of a questionnaire template for one participant: the session
/// and participant tokens are substituted, then the answers of every question
/// are reordered.
pub fn fill_participant_quiz<R: Rng + ?Sized>(
    template: &Document,
    rules: &ReportRules,
    quiz: &QuizPersonalizer,
    session: &Session,
    row: &RosterRow,
    rng: &mut R,
) -> FilledQuiz {
    debug!(
        "fill_participant_quiz: session {}, line {}",
        session.id, row.line
    );
    let mut document = template.clone();
    let (_, mut anomalies) = substitute_document(
        &mut document,
        &participant_replacements(&rules.placeholders, session, row),
    );
    let outcome = quiz.personalize(&mut document, rng);
    anomalies.extend(outcome.anomalies.iter().cloned());
    FilledQuiz {
        document,
        outcome,
        anomalies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RulesBuilder;
    use crate::document::TextUnit;
    use crate::roster::{load_roster, RawTable, RosterColumns};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    const SATISFACTION: [&str; 5] = [
        "Très satisfait",
        "Satisfait",
        "Moyennement satisfait",
        "Insatisfait",
        "Non satisfait",
    ];

    fn rules() -> ReportRules {
        let mut b = RulesBuilder::new();
        b.add_group(AnswerGroup {
            name: "satisfaction".to_string(),
            options: strings(&SATISFACTION),
            positive: strings(&["Très satisfait", "Satisfait"]),
            anchors: strings(&["satisfaction"]),
            hard_override: None,
        })
        .unwrap();
        b.add_group(AnswerGroup {
            name: "adaptation".to_string(),
            options: strings(&["Oui", "Non"]),
            positive: vec![],
            anchors: strings(&["adapté"]),
            hard_override: Some("Non".to_string()),
        })
        .unwrap();
        b.headline("satisfaction").build().unwrap()
    }

    fn template() -> Document {
        let mut units = vec![
            TextUnit::new(&["Compte rendu de la session ", "{{ref_session}}"]),
            TextUnit::new(&["Formateur : {{formateur}}, {{nb_participants}} participants"]),
            TextUnit::new(&["Satisfaction globale du groupe"]),
        ];
        for label in SATISFACTION.iter() {
            units.push(TextUnit::new(&["{{checkbox}} ", label]));
        }
        units.push(TextUnit::new(&["Avez-vous adapté le déroulé ?"]));
        units.push(TextUnit::new(&["{{checkbox}} Oui"]));
        units.push(TextUnit::new(&["{{checkbox}} Non"]));
        Document::new(units)
    }

    fn roster() -> roster::Roster {
        let table = RawTable {
            header: strings(&["session", "Prénom", "Nom", "formation", "nb d'heure", "formateur"]),
            rows: vec![
                strings(&["S1", "Ana", "Durand", "Excel", "7", "Martin"]),
                strings(&["S1", "Bob", "Petit", "Excel", "7", "Martin"]),
                strings(&["S2", "Chloé", "Roux", "Word", "3", "Leroy"]),
            ],
        };
        load_roster(&table, &RosterColumns::default()).unwrap()
    }

    #[test]
    fn two_sessions_scenario() {
        init_logs();
        let rules = rules();
        let roster = roster();
        let template = template();
        let mut choices = OperatorChoices::default();
        // Conflicts with the override.
        choices
            .fixed
            .insert("adaptation".to_string(), "Oui".to_string());
        let mut rng = StdRng::seed_from_u64(99);
        assert_eq!(roster.sessions.len(), 2);
        for session in roster.sessions.iter() {
            let filled = fill_session_document(&template, &rules, session, &choices, &mut rng);
            let doc = &filled.document;
            let satisfaction_selected = (3..8)
                .filter(|u| doc.units[*u].text().starts_with('☑'))
                .count();
            assert_eq!(satisfaction_selected, 1);
            assert_eq!(doc.units[9].text(), "☐ Oui");
            assert_eq!(doc.units[10].text(), "☑ Non");
            assert_eq!(filled.stats, RenderStats { selected: 2, unselected: 5 });
            assert_eq!(doc.count_in_body("{{checkbox}}"), 0);
            assert!(filled.anomalies.is_empty());
            let headline = filled.headline(&rules).unwrap();
            assert!(headline == "Très satisfait" || headline == "Satisfait");
        }
        let s1 = fill_session_document(&template, &rules, &roster.sessions[0], &choices, &mut rng);
        assert_eq!(s1.document.units[0].runs, vec!["Compte rendu de la session ", "S1"]);
        assert_eq!(
            s1.document.units[1].text(),
            "Formateur : Martin, 2 participants"
        );
        // The template itself is never modified.
        assert_eq!(template.count_in_body("{{checkbox}}"), 7);
    }

    #[test]
    fn selected_and_unselected_counts() {
        let rules = rules();
        let roster = roster();
        let mut rng = StdRng::seed_from_u64(1);
        let template = template();
        let total = template.count_in_body("{{checkbox}}");
        let filled = fill_session_document(
            &template,
            &rules,
            &roster.sessions[1],
            &OperatorChoices::default(),
            &mut rng,
        );
        let body: String = filled
            .document
            .units
            .iter()
            .map(|u| u.text())
            .collect::<Vec<String>>()
            .join("\n");
        let n_groups = 2;
        assert_eq!(body.matches('☑').count(), n_groups);
        assert_eq!(body.matches('☐').count(), total - n_groups);
    }

    #[test]
    fn free_text_is_appended() {
        let rules = rules();
        let roster = roster();
        let mut rng = StdRng::seed_from_u64(1);
        let choices = OperatorChoices {
            observations: "Salle bruyante".to_string(),
            ..OperatorChoices::default()
        };
        let filled = fill_session_document(&template(), &rules, &roster.sessions[0], &choices, &mut rng);
        assert_eq!(
            filled.document.appended,
            vec!["Autres observations :\nSalle bruyante"]
        );
    }

    #[test]
    fn participant_quiz() {
        let rules = rules();
        let roster = roster();
        let quiz = QuizPersonalizer::new(&rules.marks, &QuizRules::default()).unwrap();
        let template = Document::new(vec![
            TextUnit::new(&["QCM de {{prenom}} {{nom}}"]),
            TextUnit::new(&["Question"]),
            TextUnit::new(&["{{checkbox}} A) oui {{correct}}"]),
            TextUnit::new(&["{{checkbox}} B) non"]),
        ]);
        let session = &roster.sessions[0];
        let mut rng = StdRng::seed_from_u64(4);
        let filled = fill_participant_quiz(&template, &rules, &quiz, session, &session.rows[1], &mut rng);
        assert_eq!(filled.document.units[0].text(), "QCM de Bob Petit");
        assert_eq!(filled.outcome.placements.len(), 1);
        assert!(filled.anomalies.is_empty());
    }
}
