//! Status normalization and marker colors.
//!
//! Free-text project statuses are folded into [`ProjectStatus`] by an ordered
//! list of [`StatusRule`]s evaluated top-down; the first matching rule wins.
//! The order is part of the contract: `nearly completed` must be tested before
//! the plain `complete` rule.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ProjectStatus {
    Completed,
    Ongoing,
    UnderConstruction,
    UnderProgress,
    Planned,
    Approved,
    NearlyCompleted,
    Unknown,
    /// Lower-cased status text that no rule matched.
    Other(String),
}

impl ProjectStatus {
    pub const CANONICAL: [ProjectStatus; 8] = [
        ProjectStatus::Completed,
        ProjectStatus::Ongoing,
        ProjectStatus::UnderConstruction,
        ProjectStatus::UnderProgress,
        ProjectStatus::Planned,
        ProjectStatus::Approved,
        ProjectStatus::NearlyCompleted,
        ProjectStatus::Unknown,
    ];

    pub fn label(&self) -> &str {
        match self {
            ProjectStatus::Completed => "completed",
            ProjectStatus::Ongoing => "ongoing",
            ProjectStatus::UnderConstruction => "under construction",
            ProjectStatus::UnderProgress => "under progress",
            ProjectStatus::Planned => "planned",
            ProjectStatus::Approved => "approved",
            ProjectStatus::NearlyCompleted => "nearly completed",
            ProjectStatus::Unknown => "unknown",
            ProjectStatus::Other(text) => text,
        }
    }

    pub fn from_label(label: &str) -> Self {
        Self::CANONICAL
            .iter()
            .find(|status| status.label() == label)
            .cloned()
            .unwrap_or_else(|| ProjectStatus::Other(label.to_string()))
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, ProjectStatus::Other(_))
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for ProjectStatus {
    fn from(value: String) -> Self {
        ProjectStatus::from_label(value.trim())
    }
}

impl From<ProjectStatus> for String {
    fn from(value: ProjectStatus) -> Self {
        value.label().to_string()
    }
}

/// One substring rule: every `all` needle must occur and, when `any` is
/// non-empty, at least one `any` needle must occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<String>,
    pub status: ProjectStatus,
}

impl StatusRule {
    fn new(all: &[&str], any: &[&str], status: ProjectStatus) -> Self {
        Self {
            all: all.iter().map(|s| s.to_string()).collect(),
            any: any.iter().map(|s| s.to_string()).collect(),
            status,
        }
    }

    pub fn matches(&self, folded: &str) -> bool {
        self.all.iter().all(|needle| folded.contains(needle.as_str()))
            && (self.any.is_empty() || self.any.iter().any(|needle| folded.contains(needle.as_str())))
    }
}

pub fn default_rules() -> Vec<StatusRule> {
    vec![
        StatusRule::new(&["nearly", "complete"], &[], ProjectStatus::NearlyCompleted),
        StatusRule::new(&["complete"], &[], ProjectStatus::Completed),
        StatusRule::new(&["under construction"], &[], ProjectStatus::UnderConstruction),
        StatusRule::new(&[], &["under progress", "progress"], ProjectStatus::UnderProgress),
        StatusRule::new(&["ongoing"], &[], ProjectStatus::Ongoing),
        StatusRule::new(&["planned"], &[], ProjectStatus::Planned),
        StatusRule::new(&["approved"], &[], ProjectStatus::Approved),
    ]
}

/// What an unmatched, non-empty status becomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedStatus {
    #[default]
    Verbatim,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct StatusNormalizer {
    rules: Vec<StatusRule>,
    unmatched: UnmatchedStatus,
}

impl Default for StatusNormalizer {
    fn default() -> Self {
        Self::new(default_rules(), UnmatchedStatus::Verbatim)
    }
}

impl StatusNormalizer {
    pub fn new(rules: Vec<StatusRule>, unmatched: UnmatchedStatus) -> Self {
        Self { rules, unmatched }
    }

    pub fn rules(&self) -> &[StatusRule] {
        &self.rules
    }

    pub fn normalize(&self, raw: Option<&str>) -> ProjectStatus {
        let Some(raw) = raw else {
            return ProjectStatus::Unknown;
        };
        let folded = raw.trim().to_lowercase();
        if folded.is_empty() {
            return ProjectStatus::Unknown;
        }
        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(&folded)) {
            return rule.status.clone();
        }
        match self.unmatched {
            UnmatchedStatus::Verbatim => ProjectStatus::from_label(&folded),
            UnmatchedStatus::Unknown => ProjectStatus::Unknown,
        }
    }
}

/// Normalizes with the default rule list, keeping unmatched text verbatim.
pub fn normalize_status(raw: &str) -> ProjectStatus {
    StatusNormalizer::default().normalize(Some(raw))
}

fn default_color(status: &ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Completed => "#10b981",
        ProjectStatus::Ongoing | ProjectStatus::NearlyCompleted => "#f59e0b",
        ProjectStatus::UnderConstruction | ProjectStatus::UnderProgress => "#f97316",
        ProjectStatus::Planned => "#6366f1",
        ProjectStatus::Approved => "#8b5cf6",
        ProjectStatus::Unknown | ProjectStatus::Other(_) => DEFAULT_COLOR,
    }
}

/// Colors every status whose label contains one of `any`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRule {
    pub any: Vec<String>,
    pub color: String,
}

impl ColorRule {
    pub fn new(any: &[&str], color: &str) -> Self {
        Self {
            any: any.iter().map(|s| s.to_string()).collect(),
            color: color.to_string(),
        }
    }

    pub fn matches(&self, label: &str) -> bool {
        self.any.iter().any(|needle| label.contains(needle.as_str()))
    }
}

/// Status → color lookup.
///
/// Exact label overrides win, then the first matching [`ColorRule`], then the
/// default table.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    overrides: BTreeMap<String, String>,
    rules: Vec<ColorRule>,
}

impl Palette {
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        Self {
            overrides: overrides
                .iter()
                .map(|(label, color)| (label.trim().to_lowercase(), color.clone()))
                .collect(),
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: &[ColorRule]) -> Self {
        self.rules = rules
            .iter()
            .map(|rule| ColorRule {
                any: rule.any.iter().map(|needle| needle.to_lowercase()).collect(),
                color: rule.color.clone(),
            })
            .collect();
        self
    }

    pub fn color_for(&self, status: &ProjectStatus) -> &str {
        let label = status.label();
        if let Some(color) = self.overrides.get(label) {
            return color;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(label))
            .map(|rule| rule.color.as_str())
            .unwrap_or_else(|| default_color(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_completed_is_checked_before_completed() {
        assert_eq!(normalize_status("Nearly Completed"), ProjectStatus::NearlyCompleted);
        assert_eq!(normalize_status("nearly complete"), ProjectStatus::NearlyCompleted);
        assert_eq!(normalize_status("Completed"), ProjectStatus::Completed);
        assert_eq!(normalize_status("Work completed in 2019"), ProjectStatus::Completed);
    }

    #[test]
    fn progress_variants_collapse() {
        assert_eq!(normalize_status("Under Progress"), ProjectStatus::UnderProgress);
        assert_eq!(normalize_status("in progress"), ProjectStatus::UnderProgress);
        assert_eq!(
            normalize_status(" UNDER CONSTRUCTION "),
            ProjectStatus::UnderConstruction
        );
    }

    #[test]
    fn blank_and_missing_are_unknown() {
        assert_eq!(normalize_status(""), ProjectStatus::Unknown);
        assert_eq!(normalize_status("   "), ProjectStatus::Unknown);
        assert_eq!(StatusNormalizer::default().normalize(None), ProjectStatus::Unknown);
    }

    #[test]
    fn unmatched_policy_controls_fallback() {
        assert_eq!(
            normalize_status("Tender Stage"),
            ProjectStatus::Other("tender stage".to_string())
        );
        let strict = StatusNormalizer::new(default_rules(), UnmatchedStatus::Unknown);
        assert_eq!(strict.normalize(Some("Tender Stage")), ProjectStatus::Unknown);
    }

    #[test]
    fn canonical_labels_round_trip_through_from_label() {
        for status in ProjectStatus::CANONICAL {
            assert_eq!(ProjectStatus::from_label(status.label()), status);
            assert_eq!(normalize_status(status.label()), status);
        }
    }

    #[test]
    fn palette_overrides_take_precedence() {
        let mut overrides = BTreeMap::new();
        overrides.insert("Under Construction".to_string(), "#f59e0b".to_string());
        let palette = Palette::with_overrides(&overrides);
        assert_eq!(palette.color_for(&ProjectStatus::UnderConstruction), "#f59e0b");
        assert_eq!(palette.color_for(&ProjectStatus::Completed), "#10b981");
        assert_eq!(
            palette.color_for(&ProjectStatus::Other("stalled".into())),
            DEFAULT_COLOR
        );
    }

    #[test]
    fn color_rules_match_label_substrings_after_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert("approved".to_string(), "#8b5cf6".to_string());
        let palette = Palette::with_overrides(&overrides).with_rules(&[
            ColorRule::new(&["complete"], "#10b981"),
            ColorRule::new(&["ongoing", "progress", "Construction"], "#f59e0b"),
            ColorRule::new(&["planned", "approved"], "#6366f1"),
        ]);
        let stage = normalize_status("Construction stage");
        assert_eq!(stage, ProjectStatus::Other("construction stage".into()));
        assert_eq!(palette.color_for(&stage), "#f59e0b");
        assert_eq!(palette.color_for(&ProjectStatus::NearlyCompleted), "#10b981");
        assert_eq!(palette.color_for(&ProjectStatus::Approved), "#8b5cf6");
        assert_eq!(palette.color_for(&ProjectStatus::Planned), "#6366f1");
        assert_eq!(palette.color_for(&ProjectStatus::Unknown), DEFAULT_COLOR);
    }

    #[test]
    fn status_serializes_as_label() {
        let yaml = serde_yaml::to_string(&ProjectStatus::NearlyCompleted).unwrap();
        assert_eq!(yaml.trim(), "nearly completed");
        let parsed: ProjectStatus = serde_yaml::from_str("under progress").unwrap();
        assert_eq!(parsed, ProjectStatus::UnderProgress);
    }
}
