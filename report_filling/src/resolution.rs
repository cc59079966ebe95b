use log::{debug, warn};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::config::{AnswerSource, Anomaly, OperatorChoices, ReportRules};
use crate::detection::Detection;
use crate::document::normalize_whitespace;

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Resolution {
    /// The option to mark as selected.
    Chosen { label: String, source: AnswerSource },
    /// The requested answer is not in the document: no option of the group
    /// gets marked.
    Miss {
        requested: String,
        source: AnswerSource,
    },
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct GroupResolution {
    pub group: String,
    pub outcome: Resolution,
}

/// One outcome per detected group, in the order of the detection.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Resolutions {
    pub groups: Vec<GroupResolution>,
    pub anomalies: Vec<Anomaly>,
}

impl Resolutions {
    pub fn outcome(&self, group: &str) -> Option<&Resolution> {
        self.groups
            .iter()
            .find(|g| g.group == group)
            .map(|g| &g.outcome)
    }

    /// The selected label of a group, if one was chosen.
    pub fn chosen(&self, group: &str) -> Option<&str> {
        match self.outcome(group) {
            Some(Resolution::Chosen { label, .. }) => Some(label.as_str()),
            _ => None,
        }
    }
}

/// Draws one of the candidates. When some candidates are positive, the draw is
/// uniform over those only; otherwise it is uniform over all of them.
///
/// Returns None for an empty candidate list.
pub fn pick_biased<'a, R: Rng + ?Sized>(
    candidates: &'a [String],
    positive: &[String],
    rng: &mut R,
) -> Option<&'a String> {
    let favorable: Vec<&String> = candidates
        .iter()
        .filter(|c| positive.iter().any(|p| p == *c))
        .collect();
    if favorable.is_empty() {
        candidates.choose(rng)
    } else {
        favorable.choose(rng).copied()
    }
}

/// Decides the answer of every detected group.
///
/// The first applicable rule wins: the group's hard override, then the
/// operator's fixed choice, then a random draw biased toward the positive
/// options. An override or fixed choice that names an option absent from the
/// document is a miss for the whole group; it does not fall through to the
/// next rule.
///
/// Groups missing from the detection are skipped without notice, even if the
/// operator fixed a value for them.
pub fn resolve_answers<R: Rng + ?Sized>(
    detection: &Detection,
    rules: &ReportRules,
    choices: &OperatorChoices,
    rng: &mut R,
) -> Resolutions {
    let mut res = Resolutions::default();

    for group in choices.fixed.keys() {
        if rules.group(group).is_none() {
            let a = Anomaly::UnknownGroup {
                group: group.clone(),
            };
            warn!("{}", a);
            res.anomalies.push(a);
        }
    }

    for detected in detection.groups.iter() {
        let labels = detected.labels();
        let rule = rules.group(&detected.name);
        let hard_override = rule.and_then(|r| r.hard_override.as_ref());
        let request: Option<(&String, AnswerSource)> = match hard_override {
            Some(v) => Some((v, AnswerSource::HardOverride)),
            None => choices
                .fixed
                .get(&detected.name)
                .map(|v| (v, AnswerSource::Operator)),
        };

        let outcome = match request {
            Some((requested, source)) => {
                let requested = normalize_whitespace(requested);
                if labels.contains(&requested) {
                    Resolution::Chosen {
                        label: requested,
                        source,
                    }
                } else {
                    let a = Anomaly::ResolutionMiss {
                        group: detected.name.clone(),
                        requested: requested.clone(),
                        source,
                    };
                    warn!("{}", a);
                    res.anomalies.push(a);
                    Resolution::Miss { requested, source }
                }
            }
            None => {
                let positive: &[String] = rule.map(|r| r.positive.as_slice()).unwrap_or(&[]);
                match pick_biased(&labels, positive, rng) {
                    Some(label) => Resolution::Chosen {
                        label: label.clone(),
                        source: AnswerSource::Random,
                    },
                    // Detected groups always hold one option at least.
                    None => continue,
                }
            }
        };
        debug!("resolve_answers: {}: {:?}", detected.name, outcome);
        res.groups.push(GroupResolution {
            group: detected.name.clone(),
            outcome,
        });
    }

    for group in choices.fixed.keys() {
        if rules.group(group).is_some() && detection.group(group).is_none() {
            debug!(
                "resolve_answers: {}: not in the template, operator choice skipped",
                group
            );
        }
    }
    res
}
