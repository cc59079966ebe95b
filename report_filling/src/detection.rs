use log::{debug, warn};

use crate::config::{AnswerGroup, Anomaly, MissReason};
use crate::document::{normalize_whitespace, TextUnit};

/// A checkbox marker position: the unit, and the rank of the marker among the
/// markers of that unit.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct MarkerSlot {
    pub unit: usize,
    pub occurrence: usize,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DetectedOption {
    pub label: String,
    pub slot: MarkerSlot,
}

/// The options of one answer group found in a document, in document order.
// Invariant: options is never empty, labels are distinct.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DetectedGroup {
    pub name: String,
    pub options: Vec<DetectedOption>,
}

impl DetectedGroup {
    pub fn labels(&self) -> Vec<String> {
        self.options.iter().map(|o| o.label.clone()).collect()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.options.iter().any(|o| o.label == label)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct UnresolvedMarker {
    pub slot: MarkerSlot,
    pub context: String,
    pub reason: MissReason,
}

/// The result of a detection pass. Every marker of the document body ends up
/// either in one group or in the unresolved list.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Detection {
    /// In the order of the configured groups. Groups absent from the document
    /// have no entry.
    pub groups: Vec<DetectedGroup>,
    pub unresolved: Vec<UnresolvedMarker>,
    /// Units holding a marker cut by formatting, with the marker token.
    pub split_markers: Vec<(usize, String)>,
}

impl Detection {
    pub fn group(&self, name: &str) -> Option<&DetectedGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut res: Vec<Anomaly> = self
            .split_markers
            .iter()
            .map(|(unit, token)| Anomaly::SplitPlaceholder {
                unit: *unit,
                token: token.clone(),
            })
            .collect();
        res.extend(self.unresolved.iter().map(|u| Anomaly::DetectionMiss {
            unit: u.slot.unit,
            context: u.context.clone(),
            reason: u.reason.clone(),
        }));
        res
    }
}

/// Whether `needle` appears in `haystack` with no alphanumeric character
/// directly before or after it. Both are expected in lowercase.
fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(pos, _)| {
        let before_ok = haystack[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[pos + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

// All the known labels, with the groups (by index) that list them.
struct Vocabulary {
    entries: Vec<(String, String, Vec<usize>)>, // (label, lowercase label, groups)
}

impl Vocabulary {
    fn new(groups: &[AnswerGroup]) -> Vocabulary {
        let mut entries: Vec<(String, String, Vec<usize>)> = Vec::new();
        for (g_idx, g) in groups.iter().enumerate() {
            for opt in g.options.iter() {
                let label = normalize_whitespace(opt);
                if let Some(e) = entries.iter_mut().find(|e| e.0 == label) {
                    if !e.2.contains(&g_idx) {
                        e.2.push(g_idx);
                    }
                } else {
                    let lc = label.to_lowercase();
                    entries.push((label, lc, vec![g_idx]));
                }
            }
        }
        Vocabulary { entries }
    }

    /// The longest label found as a whole word in the segment.
    fn best_match(&self, segment: &str) -> Option<&(String, String, Vec<usize>)> {
        let seg_lc = segment.to_lowercase();
        let mut best: Option<&(String, String, Vec<usize>)> = None;
        for e in self.entries.iter() {
            if contains_whole_word(&seg_lc, &e.1) {
                let longer = match best {
                    Some(b) => e.0.chars().count() > b.0.chars().count(),
                    None => true,
                };
                if longer {
                    best = Some(e);
                }
            }
        }
        best
    }
}

struct AnchorTracker {
    anchors: Vec<(String, usize)>, // (lowercase phrase, group index)
    last_seen: Vec<Option<usize>>, // group index -> unit index
}

impl AnchorTracker {
    fn new(groups: &[AnswerGroup]) -> AnchorTracker {
        let mut anchors: Vec<(String, usize)> = Vec::new();
        for (g_idx, g) in groups.iter().enumerate() {
            for a in g.anchors.iter() {
                let a = normalize_whitespace(a).to_lowercase();
                if !a.is_empty() {
                    anchors.push((a, g_idx));
                }
            }
        }
        AnchorTracker {
            anchors,
            last_seen: vec![None; groups.len()],
        }
    }

    fn observe(&mut self, unit_idx: usize, text: &str) {
        let lc = normalize_whitespace(text).to_lowercase();
        for (phrase, g_idx) in self.anchors.iter() {
            if lc.contains(phrase.as_str()) {
                debug!(
                    "detect_groups: unit {}: anchor {:?} for group {}",
                    unit_idx, phrase, g_idx
                );
                self.last_seen[*g_idx] = Some(unit_idx);
            }
        }
    }

    /// Candidates with an anchor already seen, most recent first, then the
    /// others in configuration order.
    fn rank(&self, candidates: &[usize]) -> Vec<usize> {
        let mut anchored: Vec<(usize, usize)> = candidates
            .iter()
            .filter_map(|g| self.last_seen[*g].map(|pos| (*g, pos)))
            .collect();
        anchored.sort_by(|a, b| b.1.cmp(&a.1));
        let mut res: Vec<usize> = anchored.iter().map(|(g, _)| *g).collect();
        for g in candidates.iter() {
            if !res.contains(g) {
                res.push(*g);
            }
        }
        res
    }
}

/// Finds the answer groups of a document.
///
/// Every in-run occurrence of the marker is a slot. Within a unit, the label of
/// a slot is the text between the slot and the next marker; when the unit ends
/// with a marker and starts with text, labels are read before their markers
/// instead. A label is matched against the option vocabulary of all the groups
/// (whole words, case-insensitive, longest match first).
///
/// A label shared by several groups goes to the group whose anchor phrase was
/// seen most recently, or else to the first group, in configuration order,
/// that does not hold it yet. Anchors are looked for in units without marker,
/// and in the text before the first marker of a unit.
pub fn detect_groups(units: &[TextUnit], groups: &[AnswerGroup], marker: &str) -> Detection {
    let vocab = Vocabulary::new(groups);
    let mut anchors = AnchorTracker::new(groups);
    let mut found: Vec<Vec<DetectedOption>> = vec![Vec::new(); groups.len()];
    let mut unresolved: Vec<UnresolvedMarker> = Vec::new();
    let mut split_markers: Vec<(usize, String)> = Vec::new();

    for (u_idx, unit) in units.iter().enumerate() {
        let text = unit.text();
        let num_slots = unit.count_in_runs(marker);
        if num_slots == 0 && !text.contains(marker) {
            anchors.observe(u_idx, &text);
            continue;
        }
        let segments: Vec<String> = text.split(marker).map(normalize_whitespace).collect();
        if segments.len() - 1 != num_slots {
            // Some markers are cut by formatting: they cannot be rewritten.
            warn!(
                "detect_groups: unit {}: {} markers split across runs",
                u_idx,
                segments.len() - 1 - num_slots
            );
            split_markers.push((u_idx, marker.to_string()));
            for occurrence in 0..num_slots {
                unresolved.push(UnresolvedMarker {
                    slot: MarkerSlot {
                        unit: u_idx,
                        occurrence,
                    },
                    context: normalize_whitespace(&text),
                    reason: MissReason::SplitMarker,
                });
            }
            continue;
        }

        let first = &segments[0];
        let labels_before = segments.last().map_or(false, |s| s.is_empty()) && !first.is_empty();
        if !labels_before {
            anchors.observe(u_idx, first);
        }

        for occurrence in 0..num_slots {
            let slot = MarkerSlot {
                unit: u_idx,
                occurrence,
            };
            let segment = if labels_before {
                &segments[occurrence]
            } else {
                &segments[occurrence + 1]
            };
            let (label, candidates) = match vocab.best_match(segment) {
                Some(e) => (e.0.clone(), e.2.clone()),
                None => {
                    unresolved.push(UnresolvedMarker {
                        slot,
                        context: segment.clone(),
                        reason: MissReason::NoKnownLabel,
                    });
                    continue;
                }
            };
            let chosen = anchors
                .rank(&candidates)
                .into_iter()
                .find(|g| !found[*g].iter().any(|o| o.label == label));
            match chosen {
                Some(g_idx) => {
                    debug!(
                        "detect_groups: unit {} slot {}: {:?} -> {}",
                        u_idx, occurrence, label, groups[g_idx].name
                    );
                    found[g_idx].push(DetectedOption { label, slot });
                }
                None => unresolved.push(UnresolvedMarker {
                    slot,
                    context: segment.clone(),
                    reason: MissReason::DuplicateLabel(label),
                }),
            }
        }
    }

    let detected: Vec<DetectedGroup> = groups
        .iter()
        .zip(found)
        .filter(|(_, options)| !options.is_empty())
        .map(|(g, options)| DetectedGroup {
            name: g.name.clone(),
            options,
        })
        .collect();
    for u in unresolved.iter() {
        warn!(
            "detect_groups: unit {} slot {}: unresolved marker ({:?}) near {:?}",
            u.slot.unit, u.slot.occurrence, u.reason, u.context
        );
    }
    debug!(
        "detect_groups: {} groups detected, {} unresolved markers",
        detected.len(),
        unresolved.len()
    );
    Detection {
        groups: detected,
        unresolved,
        split_markers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: &str = "{{checkbox}}";

    fn group(name: &str, options: &[&str], anchors: &[&str]) -> AnswerGroup {
        AnswerGroup {
            name: name.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            positive: vec![],
            anchors: anchors.iter().map(|s| s.to_string()).collect(),
            hard_override: None,
        }
    }

    fn units(lines: &[&str]) -> Vec<TextUnit> {
        lines.iter().map(|l| TextUnit::new(&[l])).collect()
    }

    fn satisfaction() -> AnswerGroup {
        group(
            "satisfaction",
            &[
                "Très satisfait",
                "Satisfait",
                "Moyennement satisfait",
                "Insatisfait",
                "Non satisfait",
            ],
            &["satisfaction globale"],
        )
    }

    #[test]
    fn longest_label_wins() {
        let groups = vec![
            satisfaction(),
            group("suivi", &["Oui", "Non", "Non concerné"], &[]),
        ];
        let d = detect_groups(
            &units(&[
                "{{checkbox}} Très satisfait",
                "{{checkbox}}   Satisfait",
                "{{checkbox}} Moyennement satisfait",
                "{{checkbox}} Insatisfait",
                "{{checkbox}} Non satisfait",
                "{{checkbox}} Non concerné",
                "{{checkbox}} Non",
            ]),
            &groups,
            M,
        );
        assert!(d.unresolved.is_empty());
        assert_eq!(
            d.group("satisfaction").unwrap().labels(),
            vec![
                "Très satisfait",
                "Satisfait",
                "Moyennement satisfait",
                "Insatisfait",
                "Non satisfait"
            ]
        );
        assert_eq!(
            d.group("suivi").unwrap().labels(),
            vec!["Non concerné", "Non"]
        );
    }

    #[test]
    fn shared_labels_follow_anchors() {
        let groups = vec![
            group("motivation", &["Très motivés", "Motivés", "Pas motivés"], &["motivation"]),
            group("assiduite", &["Très motivés", "Motivés", "Pas motivés"], &["assiduité"]),
        ];
        // The assiduity question comes first in this template.
        let d = detect_groups(
            &units(&[
                "Assiduité des participants",
                "{{checkbox}} Très motivés",
                "{{checkbox}} Motivés",
                "Motivation des participants",
                "{{checkbox}} Très motivés",
                "{{checkbox}} Pas motivés",
            ]),
            &groups,
            M,
        );
        let a = d.group("assiduite").unwrap();
        assert_eq!(a.labels(), vec!["Très motivés", "Motivés"]);
        assert_eq!(a.options[0].slot.unit, 1);
        let m = d.group("motivation").unwrap();
        assert_eq!(m.labels(), vec!["Très motivés", "Pas motivés"]);
        assert_eq!(m.options[0].slot.unit, 4);
    }

    #[test]
    fn shared_labels_without_anchor_use_first_appearance() {
        let groups = vec![
            group("adaptation", &["Oui", "Non"], &[]),
            group("suivi", &["Oui", "Non", "Non concerné"], &[]),
        ];
        let d = detect_groups(
            &units(&[
                "{{checkbox}} Oui",
                "{{checkbox}} Non",
                "{{checkbox}} Oui",
                "{{checkbox}} Non",
                "{{checkbox}} Non concerné",
            ]),
            &groups,
            M,
        );
        assert_eq!(d.group("adaptation").unwrap().labels(), vec!["Oui", "Non"]);
        let s = d.group("suivi").unwrap();
        assert_eq!(s.labels(), vec!["Oui", "Non", "Non concerné"]);
        assert_eq!(s.options[0].slot.unit, 2);
    }

    #[test]
    fn several_markers_in_one_unit() {
        let groups = vec![group("adaptation", &["Oui", "Non"], &["déroulé"])];
        let after = detect_groups(
            &units(&["Avez-vous adapté le déroulé ? {{checkbox}} Oui {{checkbox}} Non"]),
            &groups,
            M,
        );
        let g = after.group("adaptation").unwrap();
        assert_eq!(g.labels(), vec!["Oui", "Non"]);
        assert_eq!(g.options[1].slot, MarkerSlot { unit: 0, occurrence: 1 });

        let before = detect_groups(&units(&["Oui {{checkbox}} Non {{checkbox}}"]), &groups, M);
        let g = before.group("adaptation").unwrap();
        assert_eq!(g.labels(), vec!["Oui", "Non"]);
        assert_eq!(g.options[0].slot, MarkerSlot { unit: 0, occurrence: 0 });
    }

    #[test]
    fn unknown_label_is_unresolved() {
        let groups = vec![satisfaction()];
        let d = detect_groups(
            &units(&["{{checkbox}} Très satisfait", "{{checkbox}} Peut-être"]),
            &groups,
            M,
        );
        assert_eq!(d.groups.len(), 1);
        assert_eq!(
            d.unresolved,
            vec![UnresolvedMarker {
                slot: MarkerSlot { unit: 1, occurrence: 0 },
                context: "Peut-être".to_string(),
                reason: MissReason::NoKnownLabel,
            }]
        );
        assert_eq!(d.anomalies().len(), 1);
    }

    #[test]
    fn repeated_label_is_a_duplicate() {
        let groups = vec![group("adaptation", &["Oui", "Non"], &[])];
        let d = detect_groups(
            &units(&["{{checkbox}} Oui", "{{checkbox}} Non", "{{checkbox}} Oui"]),
            &groups,
            M,
        );
        assert_eq!(
            d.unresolved[0].reason,
            MissReason::DuplicateLabel("Oui".to_string())
        );
    }

    #[test]
    fn absent_group_has_no_entry() {
        let groups = vec![satisfaction(), group("adaptation", &["Oui", "Non"], &[])];
        let d = detect_groups(&units(&["Titre", "{{checkbox}} Oui"]), &groups, M);
        assert!(d.group("satisfaction").is_none());
        assert_eq!(d.groups.len(), 1);
    }

    #[test]
    fn marker_split_by_formatting() {
        let groups = vec![group("adaptation", &["Oui", "Non"], &[])];
        let units = vec![TextUnit::new(&["{{check", "box}} Oui"])];
        let d = detect_groups(&units, &groups, M);
        assert!(d.groups.is_empty());
        // Not rewritable, hence not a slot either.
        assert!(d.unresolved.is_empty());
        assert_eq!(
            d.anomalies(),
            vec![Anomaly::SplitPlaceholder {
                unit: 0,
                token: M.to_string()
            }]
        );
    }

    #[test]
    fn whole_words_only() {
        assert!(contains_whole_word("non concerné", "non"));
        assert!(!contains_whole_word("insatisfait", "satisfait"));
        assert!(contains_whole_word("(satisfait)", "satisfait"));
        assert!(!contains_whole_word("nonobstant", "non"));
    }
}
