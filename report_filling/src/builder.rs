use log::debug;

pub use crate::config::*;
use crate::document::normalize_whitespace;

/// A builder for the rules of a report template.
///
/// It checks that the answer groups are consistent with each other. Labels are
/// stored with their whitespace normalized, the way they are matched in
/// documents.
///
/// ```
/// use report_filling::builder::RulesBuilder;
/// # use report_filling::RulesError;
///
/// let mut builder = RulesBuilder::new();
/// builder.add_group_simple("adaptation", &["Oui", "Non"])?;
/// builder.add_group(report_filling::AnswerGroup {
///     name: "satisfaction".to_string(),
///     options: vec!["Satisfait".to_string(), "Insatisfait".to_string()],
///     positive: vec!["Satisfait".to_string()],
///     anchors: vec![],
///     hard_override: None,
/// })?;
/// let rules = builder.headline("satisfaction").build()?;
/// assert_eq!(rules.groups.len(), 2);
///
/// # Ok::<(), RulesError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RulesBuilder {
    pub(crate) _groups: Vec<AnswerGroup>,
    pub(crate) _marks: Marks,
    pub(crate) _placeholders: PlaceholderTokens,
    pub(crate) _headings: FreeTextHeadings,
    pub(crate) _headline: Option<String>,
}

impl RulesBuilder {
    pub fn new() -> RulesBuilder {
        RulesBuilder::default()
    }

    pub fn marks(self, marks: Marks) -> Result<RulesBuilder, RulesError> {
        if marks.marker.is_empty() {
            return Err(RulesError::EmptyMarker);
        }
        Ok(RulesBuilder {
            _marks: marks,
            ..self
        })
    }

    pub fn placeholders(self, tokens: PlaceholderTokens) -> RulesBuilder {
        RulesBuilder {
            _placeholders: tokens,
            ..self
        }
    }

    pub fn headings(self, headings: FreeTextHeadings) -> RulesBuilder {
        RulesBuilder {
            _headings: headings,
            ..self
        }
    }

    pub fn headline(self, group: &str) -> RulesBuilder {
        RulesBuilder {
            _headline: Some(group.to_string()),
            ..self
        }
    }

    /// Adds a group with no positive option, anchor or override.
    pub fn add_group_simple(&mut self, name: &str, options: &[&str]) -> Result<(), RulesError> {
        self.add_group(AnswerGroup {
            name: name.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            positive: Vec::new(),
            anchors: Vec::new(),
            hard_override: None,
        })
    }

    /// Adds a group. The positive labels and the override must be options of
    /// the group.
    pub fn add_group(&mut self, group: AnswerGroup) -> Result<(), RulesError> {
        let name = group.name.trim().to_string();
        if self._groups.iter().any(|g| g.name == name) {
            return Err(RulesError::DuplicateGroup(name));
        }
        let options: Vec<String> = group
            .options
            .iter()
            .map(|o| normalize_whitespace(o))
            .filter(|o| !o.is_empty())
            .collect();
        if options.is_empty() {
            return Err(RulesError::NoOptions(name));
        }
        let positive: Vec<String> = group.positive.iter().map(|p| normalize_whitespace(p)).collect();
        if let Some(label) = positive.iter().find(|p| !options.contains(p)) {
            return Err(RulesError::UnknownPositive {
                group: name,
                label: label.clone(),
            });
        }
        let hard_override = group.hard_override.as_deref().map(normalize_whitespace);
        if let Some(label) = hard_override.as_ref() {
            if !options.contains(label) {
                return Err(RulesError::UnknownOverride {
                    group: name,
                    label: label.clone(),
                });
            }
        }
        debug!(
            "add_group: {}: {} options, {} positive, override {:?}",
            name,
            options.len(),
            positive.len(),
            hard_override
        );
        self._groups.push(AnswerGroup {
            name,
            options,
            positive,
            anchors: group.anchors,
            hard_override,
        });
        Ok(())
    }

    pub fn build(self) -> Result<ReportRules, RulesError> {
        if let Some(h) = self._headline.as_ref() {
            if !self._groups.iter().any(|g| g.name == *h) {
                return Err(RulesError::UnknownHeadline(h.clone()));
            }
        }
        Ok(ReportRules {
            groups: self._groups,
            marks: self._marks,
            placeholders: self._placeholders,
            headings: self._headings,
            headline_group: self._headline,
        })
    }
}
