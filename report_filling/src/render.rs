use log::debug;
use std::collections::HashMap;

use crate::config::{FreeTextHeadings, Marks, OperatorChoices};
use crate::detection::{Detection, MarkerSlot};
use crate::document::Document;
use crate::resolution::{Resolution, Resolutions};

/// Symbols written by a render pass.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct RenderStats {
    pub selected: usize,
    pub unselected: usize,
}

/// Replaces the markers of every resolved group: the chosen option gets the
/// selected symbol, all its siblings the unselected one.
///
/// Markers of groups without a chosen option, and markers outside any group,
/// are left as they are.
pub fn render_marks(
    doc: &mut Document,
    detection: &Detection,
    resolutions: &Resolutions,
    marks: &Marks,
) -> RenderStats {
    let mut slots: HashMap<MarkerSlot, bool> = HashMap::new();
    for group in detection.groups.iter() {
        if let Some(Resolution::Chosen { label, .. }) = resolutions.outcome(&group.name) {
            for opt in group.options.iter() {
                slots.insert(opt.slot, opt.label == *label);
            }
        }
    }

    let mut stats = RenderStats::default();
    for (u_idx, unit) in doc.units.iter_mut().enumerate() {
        unit.replace_occurrences(&marks.marker, |occurrence| {
            let slot = MarkerSlot {
                unit: u_idx,
                occurrence,
            };
            match slots.get(&slot) {
                Some(true) => {
                    stats.selected += 1;
                    Some(marks.selected.clone())
                }
                Some(false) => {
                    stats.unselected += 1;
                    Some(marks.unselected.clone())
                }
                None => None,
            }
        });
    }
    debug!(
        "render_marks: {} selected, {} unselected",
        stats.selected, stats.unselected
    );
    stats
}

/// Adds the operator's free text after the template body: one paragraph per
/// non-blank text, made of its heading and the text on the next line.
pub fn append_free_text(doc: &mut Document, headings: &FreeTextHeadings, choices: &OperatorChoices) {
    let sections = [
        (&headings.improvement, &choices.improvement_notes),
        (&headings.observations, &choices.observations),
    ];
    for (heading, text) in sections {
        if !text.trim().is_empty() {
            doc.appended.push(format!("{}\n{}", heading, text.trim()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnswerGroup, AnswerSource};
    use crate::detection::detect_groups;
    use crate::document::TextUnit;
    use crate::resolution::GroupResolution;

    fn group(name: &str, options: &[&str]) -> AnswerGroup {
        AnswerGroup {
            name: name.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            positive: vec![],
            anchors: vec![],
            hard_override: None,
        }
    }

    fn chosen(group: &str, label: &str) -> GroupResolution {
        GroupResolution {
            group: group.to_string(),
            outcome: Resolution::Chosen {
                label: label.to_string(),
                source: AnswerSource::Operator,
            },
        }
    }

    fn template() -> Document {
        Document::new(vec![
            TextUnit::new(&["Satisfaction"]),
            TextUnit::new(&["{{checkbox}}", " Satisfait"]),
            TextUnit::new(&["{{checkbox}} Insatisfait"]),
            TextUnit::new(&["Adaptation : {{checkbox}} Oui {{checkbox}} Non"]),
            TextUnit::new(&["{{checkbox}} Peut-être"]),
        ])
    }

    #[test]
    fn one_selected_per_group() {
        let groups = vec![
            group("satisfaction", &["Satisfait", "Insatisfait"]),
            group("adaptation", &["Oui", "Non"]),
        ];
        let mut doc = template();
        let marks = Marks::default();
        let d = detect_groups(&doc.units, &groups, &marks.marker);
        let res = Resolutions {
            groups: vec![chosen("satisfaction", "Insatisfait"), chosen("adaptation", "Non")],
            anomalies: vec![],
        };
        let stats = render_marks(&mut doc, &d, &res, &marks);
        assert_eq!(stats, RenderStats { selected: 2, unselected: 2 });
        assert_eq!(doc.units[1].runs, vec!["☐", " Satisfait"]);
        assert_eq!(doc.units[2].text(), "☑ Insatisfait");
        assert_eq!(doc.units[3].text(), "Adaptation : ☐ Oui ☑ Non");
        // Unknown option: left for the reader to notice.
        assert_eq!(doc.units[4].text(), "{{checkbox}} Peut-être");
    }

    #[test]
    fn missed_group_keeps_its_markers() {
        let groups = vec![group("adaptation", &["Oui", "Non"])];
        let mut doc = template();
        let marks = Marks::default();
        let d = detect_groups(&doc.units, &groups, &marks.marker);
        let res = Resolutions {
            groups: vec![GroupResolution {
                group: "adaptation".to_string(),
                outcome: Resolution::Miss {
                    requested: "Peut-être".to_string(),
                    source: AnswerSource::Operator,
                },
            }],
            anomalies: vec![],
        };
        let stats = render_marks(&mut doc, &d, &res, &marks);
        assert_eq!(stats, RenderStats::default());
        assert_eq!(doc.count_in_body("{{checkbox}}"), 5);
    }

    #[test]
    fn free_text_only_when_present() {
        let mut doc = Document::default();
        let choices = OperatorChoices {
            improvement_notes: "  Prévoir plus d'exercices ".to_string(),
            observations: "   ".to_string(),
            ..OperatorChoices::default()
        };
        append_free_text(&mut doc, &FreeTextHeadings::default(), &choices);
        assert_eq!(
            doc.appended,
            vec!["Avis & piste d'amélioration :\nPrévoir plus d'exercices"]
        );
    }
}
