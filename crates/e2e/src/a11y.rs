//! Accessibility scanning with axe-core

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::driver::protocol::Command;
use crate::error::{E2eError, E2eResult};
use crate::page::Page;

/// WCAG 2.0 A and AA rules
pub const WCAG2_TAGS: [&str; 2] = ["wcag2a", "wcag2aa"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Minor => "minor",
            Impact::Moderate => "moderate",
            Impact::Serious => "serious",
            Impact::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationNode {
    pub target: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    pub impact: Option<Impact>,
    pub description: String,
    #[serde(default)]
    pub help_url: String,
    #[serde(default)]
    pub nodes: Vec<ViolationNode>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let impact = self.impact.map(|i| i.as_str()).unwrap_or("unknown");
        write!(f, "{}: {} - {}", impact, self.id, self.description)
    }
}

/// Violations found on one page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct A11yReport {
    pub violations: Vec<Violation>,
}

impl A11yReport {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn count(&self, impact: Impact) -> usize {
        self.violations
            .iter()
            .filter(|v| v.impact == Some(impact))
            .count()
    }

    pub fn critical(&self) -> usize {
        self.count(Impact::Critical)
    }

    pub fn serious(&self) -> usize {
        self.count(Impact::Serious)
    }

    /// Anything worth flagging in the test report
    pub fn has_blocking(&self) -> bool {
        self.critical() > 0 || self.serious() > 0
    }

    /// Annotation text, e.g. `critical=1, serious=0`
    pub fn counts(&self) -> String {
        format!("critical={}, serious={}", self.critical(), self.serious())
    }

    /// One line per violation
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Log the findings and, when `fail_on_critical` is set, fail on any
    /// critical violation. Serious ones are only reported.
    pub fn enforce(&self, fail_on_critical: bool) -> E2eResult<()> {
        if !self.has_blocking() {
            return Ok(());
        }
        warn!(
            "Accessibility violations detected\n{}\n{}",
            self.counts(),
            self.summary()
        );
        if fail_on_critical && self.critical() > 0 {
            return Err(E2eError::AssertionFailed(format!(
                "Critical accessibility violations must be fixed\n{}",
                self.summary()
            )));
        }
        Ok(())
    }
}

/// Inject axe-core into the current document and run the rules carrying `tags`
pub async fn scan(page: &Page, tags: &[&str]) -> E2eResult<A11yReport> {
    let violations: Vec<Violation> = page
        .driver()
        .request(Command::AxeScan {
            tags: tags.iter().map(|t| t.to_string()).collect(),
        })
        .await?;
    Ok(A11yReport::new(violations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(id: &str, impact: Option<Impact>) -> Violation {
        Violation {
            id: id.to_string(),
            impact,
            description: format!("{} description", id),
            help_url: String::new(),
            nodes: vec![],
        }
    }

    #[test]
    fn test_parse_axe_payload() {
        let json = r#"[
            {"id": "color-contrast", "impact": "serious", "description": "Low contrast",
             "helpUrl": "https://dequeuniversity.com/rules/axe/4.8/color-contrast",
             "nodes": [{"target": [".navbar a"]}]},
            {"id": "region", "impact": null, "description": "Landmarks", "nodes": []}
        ]"#;
        let violations: Vec<Violation> = serde_json::from_str(json).unwrap();
        assert_eq!(violations[0].impact, Some(Impact::Serious));
        assert_eq!(violations[0].nodes[0].target, vec![".navbar a"]);
        assert_eq!(violations[1].impact, None);
        assert_eq!(violations[1].help_url, "");
    }

    #[test]
    fn test_counts_and_summary() {
        let report = A11yReport::new(vec![
            violation("image-alt", Some(Impact::Critical)),
            violation("color-contrast", Some(Impact::Serious)),
            violation("region", None),
        ]);
        assert_eq!(report.counts(), "critical=1, serious=1");
        assert_eq!(
            report.summary(),
            "critical: image-alt - image-alt description\n\
             serious: color-contrast - color-contrast description\n\
             unknown: region - region description"
        );
    }

    #[test]
    fn test_enforce_is_non_blocking_by_default() {
        let report = A11yReport::new(vec![violation("image-alt", Some(Impact::Critical))]);
        assert!(report.enforce(false).is_ok());
        assert!(matches!(report.enforce(true), Err(E2eError::AssertionFailed(_))));
    }

    #[test]
    fn test_serious_only_never_fails() {
        let report = A11yReport::new(vec![violation("color-contrast", Some(Impact::Serious))]);
        assert!(report.has_blocking());
        assert!(report.enforce(true).is_ok());
    }

    #[test]
    fn test_minor_is_not_blocking() {
        let report = A11yReport::new(vec![violation("x", Some(Impact::Minor))]);
        assert!(!report.has_blocking());
    }
}
