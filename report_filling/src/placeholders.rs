use log::{debug, warn};

use crate::config::{Anomaly, PlaceholderTokens};
use crate::document::{Document, TextUnit};
use crate::roster::{RosterRow, Session};

/// Replaces every occurrence of the tokens in the unit with their values.
///
/// Replacement happens run by run: a token whose characters are split across
/// several runs by the template formatting is not replaced. Such tokens are
/// returned so that the caller can report them.
///
/// Returns the number of replacements and the split tokens.
pub fn substitute_unit(
    unit: &mut TextUnit,
    replacements: &[(String, String)],
) -> (usize, Vec<String>) {
    let mut replaced = 0;
    let mut split: Vec<String> = Vec::new();
    for (key, value) in replacements.iter() {
        if key.is_empty() {
            continue;
        }
        let in_text = unit.text().matches(key.as_str()).count();
        if in_text == 0 {
            continue;
        }
        let in_runs = unit.count_in_runs(key);
        if in_text > in_runs {
            split.push(key.clone());
        }
        if in_runs > 0 {
            replaced += unit.replace_occurrences(key, |_| Some(value.clone()));
        }
    }
    (replaced, split)
}

/// Substitutes the tokens in all the units of the document body.
pub fn substitute_document(
    doc: &mut Document,
    replacements: &[(String, String)],
) -> (usize, Vec<Anomaly>) {
    let mut total = 0;
    let mut anomalies: Vec<Anomaly> = Vec::new();
    for (idx, unit) in doc.units.iter_mut().enumerate() {
        let (n, split) = substitute_unit(unit, replacements);
        total += n;
        for token in split {
            let a = Anomaly::SplitPlaceholder { unit: idx, token };
            warn!("{}", a);
            anomalies.push(a);
        }
    }
    debug!("substitute_document: {} replacements", total);
    (total, anomalies)
}

/// The values of a session-level report.
pub fn session_replacements(
    tokens: &PlaceholderTokens,
    session: &Session,
) -> Vec<(String, String)> {
    vec![
        (tokens.trainer.clone(), session.trainer().to_string()),
        (tokens.session_ref.clone(), session.id.clone()),
        (tokens.course.clone(), session.course().to_string()),
        (tokens.duration.clone(), session.duration_hours().to_string()),
        (
            tokens.participant_count.clone(),
            session.participant_count().to_string(),
        ),
    ]
}

/// The session values plus the participant's own name.
pub fn participant_replacements(
    tokens: &PlaceholderTokens,
    session: &Session,
    row: &RosterRow,
) -> Vec<(String, String)> {
    let mut res = session_replacements(tokens, session);
    res.push((tokens.first_name.clone(), row.first_name.clone()));
    res.push((tokens.last_name.clone(), row.last_name.clone()));
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repl(v: &[(&str, &str)]) -> Vec<(String, String)> {
        v.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn token_inside_a_run_keeps_other_runs() {
        // "Formateur : " is bold in the template, the value run is plain.
        let mut u = TextUnit::new(&["Formateur : ", "{{formateur}}", " (référent)"]);
        let (n, split) = substitute_unit(&mut u, &repl(&[("{{formateur}}", "Martin")]));
        assert_eq!(n, 1);
        assert!(split.is_empty());
        assert_eq!(u.runs, vec!["Formateur : ", "Martin", " (référent)"]);
    }

    #[test]
    fn repeated_tokens_are_all_replaced() {
        let mut u = TextUnit::new(&["{{ref_session}} / {{ref_session}}", " {{ref_session}}"]);
        let (n, _) = substitute_unit(&mut u, &repl(&[("{{ref_session}}", "S1")]));
        assert_eq!(n, 3);
        assert_eq!(u.text(), "S1 / S1 S1");
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let r = repl(&[("{{duree_formation}}", "7"), ("{{formateur}}", "Martin")]);
        let mut doc = Document::new(vec![
            TextUnit::new(&["Durée : {{duree_formation}} h"]),
            TextUnit::new(&["{{formateur}}"]),
        ]);
        let (first, _) = substitute_document(&mut doc, &r);
        assert_eq!(first, 2);
        let snapshot = doc.clone();
        let (second, anomalies) = substitute_document(&mut doc, &r);
        assert_eq!(second, 0);
        assert!(anomalies.is_empty());
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn split_token_is_reported_and_left_alone() {
        let mut doc = Document::new(vec![TextUnit::new(&["{{nb_part", "icipants}}"])]);
        let (n, anomalies) =
            substitute_document(&mut doc, &repl(&[("{{nb_participants}}", "12")]));
        assert_eq!(n, 0);
        assert_eq!(
            anomalies,
            vec![Anomaly::SplitPlaceholder {
                unit: 0,
                token: "{{nb_participants}}".to_string()
            }]
        );
        assert_eq!(doc.units[0].text(), "{{nb_participants}}");
    }

    #[test]
    fn participant_values_include_names() {
        let row = RosterRow {
            line: 2,
            session_id: "S1".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Durand".to_string(),
            course: "Excel".to_string(),
            duration_hours: "7".to_string(),
            trainer: "Martin".to_string(),
        };
        let session = Session {
            id: "S1".to_string(),
            rows: vec![row.clone()],
        };
        let r = participant_replacements(&PlaceholderTokens::default(), &session, &row);
        assert!(r.contains(&("{{prenom}}".to_string(), "Ana".to_string())));
        assert!(r.contains(&("{{nb_participants}}".to_string(), "1".to_string())));
        assert!(r.contains(&("{{formation_dispensee}}".to_string(), "Excel".to_string())));
    }
}
