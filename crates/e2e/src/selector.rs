//! Selector chains and text matchers
//!
//! A [`Segment`] list is what the bridge script turns back into a Playwright
//! locator: `page.locator(..).getByRole(..).filter(..).nth(..)`. Segments are
//! plain data so they can be logged, compared and sent over the wire.

use std::fmt;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// How a name or text is matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TextMatch {
    /// Literal text. `exact: false` is Playwright's case-insensitive substring match.
    Text { value: String, exact: bool },

    /// JavaScript-compatible regular expression source plus flags (`"i"`)
    Regex { source: String, flags: String },
}

impl TextMatch {
    /// Exact, case-sensitive text
    pub fn exact(value: impl Into<String>) -> Self {
        TextMatch::Text { value: value.into(), exact: true }
    }

    /// Case-insensitive substring
    pub fn contains(value: impl Into<String>) -> Self {
        TextMatch::Text { value: value.into(), exact: false }
    }

    /// Case-insensitive regular expression, e.g. `"Add Owner|Update Owner"`
    pub fn pattern(source: impl Into<String>) -> Self {
        TextMatch::Regex { source: source.into(), flags: "i".to_string() }
    }

    /// Case-sensitive regular expression
    pub fn regex(source: impl Into<String>) -> Self {
        TextMatch::Regex { source: source.into(), flags: String::new() }
    }

    /// Whether `haystack` satisfies this matcher.
    ///
    /// `full` controls literal comparison: `true` compares the whole
    /// whitespace-normalised text, `false` looks for a substring. Regexes
    /// always search, matching Playwright's `toHaveText(/re/)`.
    pub fn matches(&self, haystack: &str, full: bool) -> E2eResult<bool> {
        let normalised = normalise_whitespace(haystack);
        match self {
            TextMatch::Text { value, exact } => {
                let needle = normalise_whitespace(value);
                Ok(match (full, exact) {
                    (true, true) => normalised == needle,
                    (true, false) => normalised.to_lowercase() == needle.to_lowercase(),
                    (false, true) => normalised.contains(&needle),
                    (false, false) => normalised.to_lowercase().contains(&needle.to_lowercase()),
                })
            }
            TextMatch::Regex { source, flags } => {
                let re = RegexBuilder::new(source)
                    .case_insensitive(flags.contains('i'))
                    .multi_line(flags.contains('m'))
                    .build()?;
                Ok(re.is_match(&normalised))
            }
        }
    }
}

impl From<&str> for TextMatch {
    fn from(value: &str) -> Self {
        TextMatch::contains(value)
    }
}

impl From<String> for TextMatch {
    fn from(value: String) -> Self {
        TextMatch::contains(value)
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatch::Text { value, exact: true } => write!(f, "\"{}\"", value),
            TextMatch::Text { value, exact: false } => write!(f, "{}", value),
            TextMatch::Regex { source, flags } => write!(f, "/{}/{}", source, flags),
        }
    }
}

fn normalise_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// ARIA roles the suite locates by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Button,
    Cell,
    Combobox,
    Heading,
    Link,
    Row,
    Table,
    Textbox,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Button => "button",
            Role::Cell => "cell",
            Role::Combobox => "combobox",
            Role::Heading => "heading",
            Role::Link => "link",
            Role::Row => "row",
            Role::Table => "table",
            Role::Textbox => "textbox",
        }
    }
}

/// Options for role lookups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleOptions {
    pub name: Option<TextMatch>,
    pub level: Option<u8>,
}

impl RoleOptions {
    /// Match by accessible name
    pub fn named(name: impl Into<TextMatch>) -> Self {
        Self { name: Some(name.into()), level: None }
    }

    /// Match headings by level
    pub fn level(level: u8) -> Self {
        Self { name: None, level: Some(level) }
    }
}

/// One step of a locator chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Segment {
    /// CSS, or any Playwright selector engine (`xpath=`, `text=`)
    Css { selector: String },

    Role {
        role: Role,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<TextMatch>,
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<u8>,
    },

    Label { text: TextMatch },

    Text { text: TextMatch },

    TestId { id: String },

    Filter {
        #[serde(skip_serializing_if = "Option::is_none")]
        has_text: Option<TextMatch>,
        #[serde(skip_serializing_if = "Option::is_none")]
        has: Option<Vec<Segment>>,
    },

    Nth { index: i32 },

    First,

    Last,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Css { selector } => write!(f, "{}", selector),
            Segment::Role { role, name, level } => {
                write!(f, "role={}", role.as_str())?;
                if let Some(name) = name {
                    write!(f, "[name={}]", name)?;
                }
                if let Some(level) = level {
                    write!(f, "[level={}]", level)?;
                }
                Ok(())
            }
            Segment::Label { text } => write!(f, "label={}", text),
            Segment::Text { text } => write!(f, "text={}", text),
            Segment::TestId { id } => write!(f, "testid={}", id),
            Segment::Filter { has_text, has } => {
                write!(f, "filter(")?;
                if let Some(text) = has_text {
                    write!(f, "hasText={}", text)?;
                }
                if let Some(has) = has {
                    if has_text.is_some() {
                        write!(f, ", ")?;
                    }
                    write!(f, "has={}", describe_chain(has))?;
                }
                write!(f, ")")
            }
            Segment::Nth { index } => write!(f, "nth={}", index),
            Segment::First => write!(f, "first"),
            Segment::Last => write!(f, "last"),
        }
    }
}

/// Human-readable form of a chain, used in error messages
pub fn describe_chain(chain: &[Segment]) -> String {
    chain
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" >> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_role_segment_wire_format() {
        let seg = Segment::Role {
            role: Role::Heading,
            name: Some(TextMatch::pattern("Owner Information")),
            level: None,
        };
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["kind"], "role");
        assert_eq!(json["role"], "heading");
        assert_eq!(json["name"]["kind"], "regex");
        assert_eq!(json["name"]["source"], "Owner Information");
        assert_eq!(json["name"]["flags"], "i");
        assert!(json.get("level").is_none());
    }

    #[test]
    fn test_filter_segment_uses_camel_case_fields() {
        let seg = Segment::Filter {
            has_text: Some(TextMatch::contains("Leo")),
            has: None,
        };
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["kind"], "filter");
        assert_eq!(json["hasText"]["value"], "Leo");
        assert_eq!(json["hasText"]["exact"], false);
    }

    #[test]
    fn test_describe_chain() {
        let chain = vec![
            Segment::Css { selector: "nav.navbar".into() },
            Segment::Role { role: Role::Link, name: Some(TextMatch::pattern("Home")), level: None },
        ];
        assert_eq!(describe_chain(&chain), "nav.navbar >> role=link[name=/Home/i]");
    }

    #[test_case(TextMatch::exact("EN"), "  EN \n", true, true ; "exact full ignores surrounding whitespace")]
    #[test_case(TextMatch::exact("EN"), "ES", true, false ; "exact full mismatch")]
    #[test_case(TextMatch::contains("davis"), "Betty Davis", false, true ; "contains is case insensitive")]
    #[test_case(TextMatch::exact("Davis"), "Betty davis", false, false ; "exact substring is case sensitive")]
    #[test_case(TextMatch::pattern("upcoming visits"), "Upcoming Visits", true, true ; "pattern searches")]
    #[test_case(TextMatch::pattern("^Add Visit$"), "Add Visit Now", true, false ; "anchored pattern")]
    fn test_text_match(m: TextMatch, haystack: &str, full: bool, expected: bool) {
        assert_eq!(m.matches(haystack, full).unwrap(), expected);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(TextMatch::regex("(unclosed").matches("x", false).is_err());
    }
}
