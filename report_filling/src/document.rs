use std::ops::Range;

/// A text-bearing unit of a template (a paragraph, possibly inside a table cell).
///
/// The unit is made of formatted runs; only their text is modelled here. The
/// concatenation of the runs is the visible text of the unit. Operations below
/// never merge or split runs, so whatever formatting the runs carry in the
/// source document stays attached to the same text.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct TextUnit {
    pub runs: Vec<String>,
}

impl TextUnit {
    pub fn new(runs: &[&str]) -> TextUnit {
        TextUnit {
            runs: runs.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn text(&self) -> String {
        self.runs.concat()
    }

    pub fn normalized_text(&self) -> String {
        normalize_whitespace(&self.text())
    }

    /// Occurrences of the token fully contained in a single run.
    pub fn count_in_runs(&self, token: &str) -> usize {
        if token.is_empty() {
            return 0;
        }
        self.runs.iter().map(|r| r.matches(token).count()).sum()
    }

    /// Rewrites each in-run occurrence of `token`, numbered from 0 in reading
    /// order. Occurrences for which `replace` returns None are left untouched.
    /// Returns the number of rewritten occurrences.
    pub fn replace_occurrences<F>(&mut self, token: &str, mut replace: F) -> usize
    where
        F: FnMut(usize) -> Option<String>,
    {
        if token.is_empty() {
            return 0;
        }
        let mut occurrence = 0;
        let mut replaced = 0;
        for run in self.runs.iter_mut() {
            if !run.contains(token) {
                continue;
            }
            let mut new_text = String::with_capacity(run.len());
            let mut rest: &str = run.as_str();
            while let Some(pos) = rest.find(token) {
                new_text.push_str(&rest[..pos]);
                match replace(occurrence) {
                    Some(s) => {
                        new_text.push_str(&s);
                        replaced += 1;
                    }
                    None => new_text.push_str(token),
                }
                occurrence += 1;
                rest = &rest[pos + token.len()..];
            }
            new_text.push_str(rest);
            *run = new_text;
        }
        replaced
    }

    /// Replaces a byte range of the unit text. The replacement lands in the first
    /// run touched by the range; text of the other runs outside the range is kept.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: &str) {
        let num_runs = self.runs.len();
        let mut offset = 0;
        let mut inserted = false;
        for (idx, run) in self.runs.iter_mut().enumerate() {
            let start = offset;
            let end = offset + run.len();
            offset = end;
            let touches = if range.is_empty() {
                range.start >= start && (range.start < end || idx + 1 == num_runs)
            } else {
                range.start < end && range.end > start
            };
            if !touches || (range.is_empty() && inserted) {
                continue;
            }
            let local_start = range.start.max(start) - start;
            let local_end = range.end.min(end).max(range.start.max(start)) - start;
            let mut new_text = String::with_capacity(run.len() + replacement.len());
            new_text.push_str(&run[..local_start]);
            if !inserted {
                new_text.push_str(replacement);
                inserted = true;
            }
            new_text.push_str(&run[local_end..]);
            *run = new_text;
        }
        if !inserted {
            self.runs.push(replacement.to_string());
        }
    }
}

/// Collapses every whitespace sequence to one space and trims both ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// The in-memory form of a document: the template units in document order, and
/// the paragraphs appended after them.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Document {
    pub units: Vec<TextUnit>,
    pub appended: Vec<String>,
}

impl Document {
    pub fn new(units: Vec<TextUnit>) -> Document {
        Document {
            units,
            appended: Vec::new(),
        }
    }

    /// Counts the in-run occurrences of a token in the template body, appended
    /// paragraphs excluded.
    pub fn count_in_body(&self, token: &str) -> usize {
        self.units.iter().map(|u| u.count_in_runs(token)).sum()
    }
}
