//! JUnit XML parsing into classified test outcomes.
//!
//! Accepts a `<testsuite>` root or a `<testsuites>` container. Reports that
//! fail to parse are sanitized and retried once; if that also fails, a single
//! synthetic failure is recorded so the problem stays visible.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::bytes::Regex;
use tracing::{error, warn};

use crate::models::{SuiteResult, TestOutcome, TestStatus};

/// Name of the synthetic failure recorded for unparsable reports.
pub const INTERNAL_PARSE_ERROR_NAME: &str = "Internal Fatal XML Parse Error";

/// Runs of NUL and high bytes, replaced before the second parse attempt.
static INVALID_BYTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)[\x00\x80-\xFF]+").expect("valid byte regex"));

/// Parsed XML element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Element>,
    /// Concatenated direct text and CDATA content
    pub text: Option<String>,
}

impl Element {
    /// Parse a document into its root element.
    pub fn parse(document: &[u8]) -> Result<Element, String> {
        let text = std::str::from_utf8(document).map_err(|e| e.to_string())?;
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, options).map_err(|e| e.to_string())?;
        Ok(Self::from_node(doc.root_element()))
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Element {
        let mut element = Element {
            tag: node.tag_name().name().to_string(),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            ..Default::default()
        };

        for child in node.children() {
            if child.is_element() {
                element.children.push(Self::from_node(child));
            } else if child.is_text()
                && let Some(t) = child.text()
            {
                element.text.get_or_insert_with(String::new).push_str(t);
            }
        }

        element
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First direct child with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn has_child(&self, tag: &str) -> bool {
        self.find(tag).is_some()
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Accumulates outcomes over one or more report documents.
#[derive(Debug, Default)]
pub struct JunitParser {
    outcomes: Vec<TestOutcome>,
}

impl JunitParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one report, recording its outcomes.
    pub fn parse_xml(&mut self, document: &[u8], source: &str) {
        if document.is_empty() {
            return;
        }

        let root = match Element::parse(document) {
            Ok(root) => root,
            Err(first_error) => {
                warn!(source = %source, error = %first_error, "JUnit parse failed, retrying sanitized");
                let sanitized = INVALID_BYTES.replace_all(document, &b"?"[..]);
                match Element::parse(&sanitized) {
                    Ok(root) => root,
                    Err(e) => {
                        error!(source = %source, error = %e, "JUnit report is not parsable");
                        self.outcomes.push(TestOutcome {
                            name: INTERNAL_PARSE_ERROR_NAME.to_string(),
                            status: TestStatus::Failed,
                            duration: 0.0,
                            failure_text: e,
                            output: String::new(),
                            source: source.to_string(),
                        });
                        return;
                    }
                }
            }
        };

        match root.tag.as_str() {
            "testsuite" => self.handle_suite(&root, source, ""),
            "testsuites" => {
                for suite in root.children.iter().filter(|c| c.tag == "testsuite") {
                    self.handle_suite(suite, source, "");
                }
            }
            other => {
                error!(source = %source, tag = %other, "Unable to find test results, unexpected root tag");
            }
        }
    }

    fn handle_suite(&mut self, suite: &Element, source: &str, parent_prefix: &str) {
        let prefix = match suite.attr("name") {
            Some(name) => format!("{}{} ", parent_prefix, name),
            None => parent_prefix.to_string(),
        };

        for child in &suite.children {
            match child.tag.as_str() {
                "testsuite" => self.handle_suite(child, source, &prefix),
                "testcase" => self.handle_case(child, source, &prefix),
                _ => {}
            }
        }
    }

    fn handle_case(&mut self, case: &Element, source: &str, prefix: &str) {
        let Some(case_name) = case.attr("name").filter(|n| !n.is_empty()) else {
            warn!(source = %source, "Skipping testcase without a name");
            return;
        };
        let name = format!("{}{}", prefix, case_name);

        let outcome = if case.has_child("skipped") {
            TestOutcome {
                name,
                status: TestStatus::Skipped,
                duration: 0.0,
                failure_text: String::new(),
                output: String::new(),
                source: source.to_string(),
            }
        } else if let Some(failure) = case.find("failure") {
            let output = case
                .children
                .iter()
                .filter(|c| c.tag == "system-out" || c.tag == "system-err")
                .map(Element::text_or_empty)
                .collect::<Vec<_>>()
                .join("\n");

            TestOutcome {
                name,
                status: TestStatus::Failed,
                duration: parse_duration(case.attr("time")),
                failure_text: failure_text(failure),
                output,
                source: source.to_string(),
            }
        } else {
            TestOutcome {
                name,
                status: TestStatus::Passed,
                duration: 0.0,
                failure_text: String::new(),
                output: String::new(),
                source: source.to_string(),
            }
        };

        self.outcomes.push(outcome);
    }

    /// Sorted results of everything parsed so far.
    pub fn into_results(self) -> SuiteResult {
        SuiteResult::from_outcomes(self.outcomes)
    }
}

/// Failure body, or the `message` attribute when the body is empty.
fn failure_text(failure: &Element) -> String {
    match failure.text.as_deref() {
        Some(body) if !body.trim().is_empty() => body.to_string(),
        _ => failure.attr("message").unwrap_or_default().to_string(),
    }
}

/// Case duration in seconds; missing, negative or unparsable values become 0.
fn parse_duration(time: Option<&str>) -> f64 {
    time.and_then(|t| t.trim().replace(',', "").parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0)
}

/// Parse a single report document.
pub fn parse(document: &[u8], source: &str) -> SuiteResult {
    let mut parser = JunitParser::new();
    parser.parse_xml(document, source);
    parser.into_results()
}
