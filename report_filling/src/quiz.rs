use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::collections::BTreeMap;
use std::ops::Range;

use crate::config::{Anomaly, Marks, QuizRules, RulesError};
use crate::document::{normalize_whitespace, Document, TextUnit};

#[derive(Eq, PartialEq, Debug, Clone)]
struct AnswerLine {
    unit: usize,
    letter: char,
    body: Range<usize>,
    has_marker: bool,
}

/// A question line followed by its lettered answers.
#[derive(Eq, PartialEq, Debug, Clone)]
struct QuestionBlock {
    number: usize,
    answers: Vec<AnswerLine>,
}

/// Where the correct answer of a question ended up.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuizPlacement {
    /// 1-based, in document order.
    pub number: usize,
    pub correct_letter: char,
    pub fixed: bool,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct QuizOutcome {
    pub placements: Vec<QuizPlacement>,
    pub anomalies: Vec<Anomaly>,
}

/// Reorders the answers of a multiple-choice questionnaire and ticks the
/// correct one.
///
/// An answer line is an optional checkbox marker, a letter, one of `)`, `.`
/// or `:`, and the answer text. A question is a non-empty line followed by at
/// least two answer lines lettered A, B, C... in order; blank lines may sit
/// between them.
#[derive(Debug, Clone)]
pub struct QuizPersonalizer {
    answer_line: Regex,
    marks: Marks,
    correct_marker: String,
    fixed_positions: BTreeMap<usize, char>,
}

impl QuizPersonalizer {
    pub fn new(marks: &Marks, rules: &QuizRules) -> Result<QuizPersonalizer, RulesError> {
        if marks.marker.is_empty() {
            return Err(RulesError::EmptyMarker);
        }
        let pattern = format!(
            r"^(?s)\s*(?:({})\s*)?([A-Za-z])\s*[).:]\s*(\S.*?)\s*$",
            regex::escape(&marks.marker)
        );
        let answer_line =
            Regex::new(&pattern).map_err(|e| RulesError::InvalidPattern(e.to_string()))?;
        Ok(QuizPersonalizer {
            answer_line,
            marks: marks.clone(),
            correct_marker: rules.correct_marker.clone(),
            fixed_positions: rules.fixed_positions.clone(),
        })
    }

    fn parse_answer(&self, unit_idx: usize, text: &str) -> Option<AnswerLine> {
        let caps = self.answer_line.captures(text)?;
        let letter = caps.get(2)?.as_str().chars().next()?;
        let body = caps.get(3)?.range();
        Some(AnswerLine {
            unit: unit_idx,
            letter,
            body,
            has_marker: caps.get(1).is_some(),
        })
    }

    fn find_questions(&self, units: &[TextUnit]) -> Vec<QuestionBlock> {
        let texts: Vec<String> = units.iter().map(|u| u.text()).collect();
        let mut blocks: Vec<QuestionBlock> = Vec::new();
        let mut idx = 0;
        while idx < texts.len() {
            let text = &texts[idx];
            if text.trim().is_empty() || self.parse_answer(idx, text).is_some() {
                idx += 1;
                continue;
            }
            let mut answers: Vec<AnswerLine> = Vec::new();
            let mut next = idx + 1;
            while next < texts.len() {
                if texts[next].trim().is_empty() {
                    next += 1;
                    continue;
                }
                let expected = (b'a' + answers.len() as u8) as char;
                match self.parse_answer(next, &texts[next]) {
                    Some(a) if a.letter.to_ascii_lowercase() == expected => {
                        answers.push(a);
                        next += 1;
                    }
                    _ => break,
                }
            }
            if answers.len() >= 2 {
                let last_unit = answers[answers.len() - 1].unit;
                debug!(
                    "find_questions: question {} at unit {} with {} answers",
                    blocks.len() + 1,
                    idx,
                    answers.len()
                );
                blocks.push(QuestionBlock {
                    number: blocks.len() + 1,
                    answers,
                });
                idx = last_unit + 1;
            } else {
                idx += 1;
            }
        }
        blocks
    }

    /// Personalizes every question of the document. Fixed questions get their
    /// correct answer moved to the configured letter, the other answers keeping
    /// their relative order; the other questions are shuffled.
    pub fn personalize<R: Rng + ?Sized>(&self, doc: &mut Document, rng: &mut R) -> QuizOutcome {
        let mut outcome = QuizOutcome::default();
        let blocks = self.find_questions(&doc.units);
        for (number, _) in self.fixed_positions.iter() {
            if *number == 0 || *number > blocks.len() {
                let a = Anomaly::QuizMiss {
                    question: *number,
                    reason: "fixed position for a question absent from the template".to_string(),
                };
                warn!("{}", a);
                outcome.anomalies.push(a);
            }
        }
        for block in blocks.iter() {
            self.personalize_block(doc, block, rng, &mut outcome);
        }
        outcome
    }

    fn personalize_block<R: Rng + ?Sized>(
        &self,
        doc: &mut Document,
        block: &QuestionBlock,
        rng: &mut R,
        outcome: &mut QuizOutcome,
    ) {
        let mut report = |reason: String| {
            let a = Anomaly::QuizMiss {
                question: block.number,
                reason,
            };
            warn!("{}", a);
            outcome.anomalies.push(a);
        };

        let raw_bodies: Vec<String> = block
            .answers
            .iter()
            .map(|a| doc.units[a.unit].text()[a.body.clone()].to_string())
            .collect();
        let flagged: Vec<usize> = raw_bodies
            .iter()
            .enumerate()
            .filter(|(_, b)| !self.correct_marker.is_empty() && b.contains(&self.correct_marker))
            .map(|(idx, _)| idx)
            .collect();
        let correct = match flagged.as_slice() {
            [] => {
                report("no answer flagged as correct, the first one is used".to_string());
                0
            }
            [one] => *one,
            [first, ..] => {
                report("several answers flagged as correct, the first one is used".to_string());
                *first
            }
        };

        let n = block.answers.len();
        let fixed = self.fixed_positions.get(&block.number);
        let order: Vec<usize> = match fixed {
            Some(letter) => {
                let target = (letter.to_ascii_lowercase() as u32).wrapping_sub('a' as u32) as usize;
                if target >= n {
                    report(format!(
                        "fixed letter {} is outside the {} answers",
                        letter, n
                    ));
                    return;
                }
                let mut others: Vec<usize> = (0..n).filter(|idx| *idx != correct).collect();
                others.insert(target, correct);
                others
            }
            None => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(rng);
                order
            }
        };

        let bodies: Vec<String> = raw_bodies
            .iter()
            .map(|b| {
                if self.correct_marker.is_empty() {
                    normalize_whitespace(b)
                } else {
                    normalize_whitespace(&b.replace(&self.correct_marker, ""))
                }
            })
            .collect();
        let mut correct_letter = block.answers[0].letter;
        for (slot, answer) in block.answers.iter().enumerate() {
            let source = order[slot];
            let unit = &mut doc.units[answer.unit];
            unit.replace_range(answer.body.clone(), &bodies[source]);
            if source == correct {
                correct_letter = answer.letter;
            }
            if answer.has_marker {
                let symbol = if source == correct {
                    &self.marks.selected
                } else {
                    &self.marks.unselected
                };
                unit.replace_occurrences(&self.marks.marker, |k| {
                    if k == 0 {
                        Some(symbol.clone())
                    } else {
                        None
                    }
                });
            }
        }
        debug!(
            "personalize_block: question {}: order {:?}, correct answer at {}",
            block.number, order, correct_letter
        );
        outcome.placements.push(QuizPlacement {
            number: block.number,
            correct_letter,
            fixed: fixed.is_some(),
        });
    }
}
