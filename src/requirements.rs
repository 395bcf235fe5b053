//! Requirement extraction from RFP text
//!
//! A sentence is an obligation when it contains `shall`, `must` or `will`.
//! Classification is a declarative rule list evaluated in order; the
//! first rule whose pattern matches decides must vs should.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Obligation sentence, optionally preceded by an identifier like `L.4.2`
const SENTENCE_PATTERN: &str =
    r"(?i)(?P<id>[A-Z][\w.-]{0,8}[.-]?\d{0,3})?[^.\n]*\b(shall|must|will)\b[^.\n]*\.";

/// Heading that opens a new RFP section, e.g. `Section L` or `SECTION C.3`
const SECTION_PATTERN: &str = r"(?im)^[ \t]*(section[ \t]+[A-Z0-9]+(?:\.[A-Z0-9]+)*)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Obligation {
    Must,
    Should,
}

impl fmt::Display for Obligation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Obligation::Must => f.write_str("must"),
            Obligation::Should => f.write_str("should"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub req_id: String,
    pub verbatim: String,
    pub must_or_should: Obligation,
    pub section: Option<String>,
    pub eval_factor: Option<String>,
}

/// Pattern to classification mapping
#[derive(Debug, Clone)]
pub struct ObligationRule {
    pattern: Regex,
    obligation: Obligation,
}

impl ObligationRule {
    pub fn new(pattern: &str, obligation: Obligation) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            obligation,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    sentence: Regex,
    section: Regex,
    rules: Vec<ObligationRule>,
    fallback: Obligation,
}

impl RuleSet {
    /// The built-in rules: shall/must bind, will is advisory
    pub fn standard() -> Self {
        Self {
            sentence: Regex::new(SENTENCE_PATTERN).expect("valid sentence pattern"),
            section: Regex::new(SECTION_PATTERN).expect("valid section pattern"),
            rules: vec![
                ObligationRule::new(r"(?i)\b(shall|must)\b", Obligation::Must)
                    .expect("valid must rule"),
                ObligationRule::new(r"(?i)\bwill\b", Obligation::Should)
                    .expect("valid should rule"),
            ],
            fallback: Obligation::Should,
        }
    }

    /// Append a rule evaluated after the existing ones
    pub fn with_rule(mut self, rule: ObligationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn classify(&self, sentence: &str) -> Obligation {
        self.rules
            .iter()
            .find(|rule| rule.matches(sentence))
            .map(|rule| rule.obligation)
            .unwrap_or(self.fallback)
    }

    /// Extract requirements in document order, numbered from 1
    pub fn extract(&self, text: &str) -> Vec<Requirement> {
        let headings: Vec<(usize, String)> = self
            .section
            .captures_iter(text)
            .filter_map(|cap| {
                let m = cap.get(1)?;
                Some((m.start(), normalize_whitespace(m.as_str())))
            })
            .collect();

        self.sentence
            .find_iter(text)
            .enumerate()
            .map(|(i, m)| {
                let verbatim = m.as_str().trim().to_string();
                let section = headings
                    .iter()
                    .take_while(|(start, _)| *start <= m.start())
                    .last()
                    .map(|(_, name)| name.clone());

                Requirement {
                    req_id: format!("REQ-{:04}", i + 1),
                    must_or_should: self.classify(&verbatim),
                    verbatim,
                    section,
                    eval_factor: None,
                }
            })
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Extract requirements with the standard rule set
pub fn extract(text: &str) -> Vec<Requirement> {
    static RULES: OnceLock<RuleSet> = OnceLock::new();
    RULES.get_or_init(RuleSet::standard).extract(text)
}

/// Compliance matrix with one row per requirement
pub fn compliance_matrix_csv(requirements: &[Requirement]) -> String {
    let mut out = String::from("req_id,must_or_should,section,eval_factor,verbatim\n");
    for req in requirements {
        let row = [
            csv_field(&req.req_id),
            csv_field(&req.must_or_should.to_string()),
            csv_field(req.section.as_deref().unwrap_or("")),
            csv_field(req.eval_factor.as_deref().unwrap_or("")),
            csv_field(&req.verbatim),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tags_must_and_should() {
        let text = "The contractor shall deliver monthly reports. \
                    Offerors must include pricing. \
                    The agency will review proposals within 30 days. \
                    Background information follows.";
        let reqs = extract(text);

        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].req_id, "REQ-0001");
        assert_eq!(reqs[0].verbatim, "The contractor shall deliver monthly reports.");
        assert_eq!(reqs[0].must_or_should, Obligation::Must);
        assert_eq!(reqs[1].must_or_should, Obligation::Must);
        assert_eq!(reqs[2].req_id, "REQ-0003");
        assert_eq!(reqs[2].must_or_should, Obligation::Should);
        assert!(reqs.iter().all(|r| r.eval_factor.is_none()));
    }

    #[test]
    fn test_case_insensitive() {
        let reqs = extract("THE VENDOR SHALL COMPLY.");
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].must_or_should, Obligation::Must);
    }

    #[test]
    fn test_word_boundaries() {
        assert!(extract("Mustard is yellow. Willow trees are tall.").is_empty());
    }

    #[test]
    fn test_sentence_without_period_is_ignored() {
        assert!(extract("The vendor shall comply").is_empty());
    }

    #[test]
    fn test_sentences_do_not_span_lines() {
        let reqs = extract("Scope of work\nThe vendor shall provide support.");
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].verbatim, "The vendor shall provide support.");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let reqs = extract("You must sign. You must sign.");
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[1].req_id, "REQ-0002");
    }

    #[test]
    fn test_section_tracking() {
        let text = "Intro: the team will attend.\n\
                    SECTION L\n\
                    Proposals must not exceed 20 pages.\n\
                    Section  M.2\n\
                    Pricing shall be fixed.";
        let reqs = extract(text);
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].section, None);
        assert_eq!(reqs[1].section.as_deref(), Some("SECTION L"));
        assert_eq!(reqs[2].section.as_deref(), Some("Section M.2"));
    }

    #[test]
    fn test_custom_rule_appends() {
        let rules = RuleSet::standard()
            .with_rule(ObligationRule::new(r"(?i)\brequired\b", Obligation::Must).unwrap());
        assert_eq!(rules.classify("it is required"), Obligation::Must);
        assert_eq!(rules.classify("the vendor will help"), Obligation::Should);
        assert_eq!(rules.classify("nothing here"), Obligation::Should);
    }

    #[test]
    fn test_serialized_shape() {
        let reqs = extract("Vendors shall register.");
        let json = serde_json::to_value(&reqs[0]).unwrap();
        assert_eq!(json["must_or_should"], "must");
        assert!(json["section"].is_null());
        assert!(json["eval_factor"].is_null());
    }

    #[test]
    fn test_compliance_matrix_quotes_fields() {
        let reqs = vec![Requirement {
            req_id: "REQ-0001".to_string(),
            verbatim: "Vendors shall provide \"A\", B, and C.".to_string(),
            must_or_should: Obligation::Must,
            section: Some("Section L".to_string()),
            eval_factor: None,
        }];
        let csv = compliance_matrix_csv(&reqs);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "req_id,must_or_should,section,eval_factor,verbatim");
        assert_eq!(
            lines[1],
            "REQ-0001,must,Section L,,\"Vendors shall provide \"\"A\"\", B, and C.\""
        );
    }
}
