//! Outline parsing for inference responses.
//!
//! The inference API answers with a string holding a JSON document of the
//! shape `{"slides": [{"layout": ..., "content": {...}}, ...]}`, often wrapped
//! in a markdown code fence. Parsing is best-effort: malformed slides and
//! content entries are skipped and reported as [`BuildWarning`]s, while a
//! document that is not JSON at all is an error.

use crate::error::{Error, Result};
use crate::types::{BuildWarning, PlaceholderText, SlideDescriptor, DEFAULT_LAYOUT};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Opening fence: three or more backticks, an optional language tag, then
/// any whitespace up to the payload.
static OPEN_FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^`{3,}(?:[A-Za-z][\w+.-]*)?\s*").unwrap());

/// Closing fence at the very end, with whitespace before it.
static CLOSE_FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*`{3,}$").unwrap());

/// Slides extracted from one inference response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    pub slides: Vec<SlideDescriptor>,

    /// Items dropped while reading the outline.
    pub warnings: Vec<BuildWarning>,
}

impl Outline {
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

/// Remove a surrounding markdown code fence, if there is one.
///
/// Surrounding whitespace is trimmed, and the fence may carry any language
/// tag (`json`, `JSON`, none). Text without a fence comes back trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(open) = OPEN_FENCE_REGEX.find(text) {
        text = &text[open.end()..];
    }
    if let Some(close) = CLOSE_FENCE_REGEX.find(text) {
        text = &text[..close.start()];
    }

    text.trim()
}

/// Parse an outline document, fenced or not.
pub fn parse_outline(raw: &str) -> Result<Outline> {
    let json = strip_code_fence(raw);
    let document: Value =
        serde_json::from_str(json).map_err(|e| Error::OutlineParse(e.to_string()))?;

    outline_from_value(&document)
}

/// Extract the outline from an already parsed JSON document.
pub fn outline_from_value(document: &Value) -> Result<Outline> {
    let object = document
        .as_object()
        .ok_or_else(|| Error::OutlineParse("outline is not a JSON object".to_string()))?;

    let mut outline = Outline::default();

    let slides = match object.get("slides") {
        None | Some(Value::Null) => {
            log::debug!("Outline has no 'slides' key");
            outline
                .warnings
                .push(BuildWarning::general("outline has no 'slides' key; no slides added"));
            return Ok(outline);
        }
        Some(Value::Array(slides)) => slides,
        Some(other) => {
            return Err(Error::OutlineParse(format!(
                "'slides' must be an array, found {}",
                json_kind(other)
            )));
        }
    };

    for (idx, value) in slides.iter().enumerate() {
        let number = idx + 1;
        match descriptor_from_value(value, number, &mut outline.warnings) {
            Some(slide) => outline.slides.push(slide),
            None => log::debug!("Skipping outline slide {}", number),
        }
    }

    Ok(outline)
}

/// Convert one `slides` element, recording anything dropped.
fn descriptor_from_value(
    value: &Value,
    number: usize,
    warnings: &mut Vec<BuildWarning>,
) -> Option<SlideDescriptor> {
    let Some(object) = value.as_object() else {
        warnings.push(BuildWarning::for_slide(
            number,
            format!("slide is {} instead of an object; skipped", json_kind(value)),
        ));
        return None;
    };

    let layout = match object.get("layout") {
        None | Some(Value::Null) => DEFAULT_LAYOUT.to_string(),
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            warnings.push(BuildWarning::for_slide(
                number,
                format!("layout is {}; using '{}'", json_kind(other), DEFAULT_LAYOUT),
            ));
            DEFAULT_LAYOUT.to_string()
        }
    };

    let mut slide = SlideDescriptor::new(layout);

    match object.get("content") {
        None | Some(Value::Null) => {}
        Some(Value::Object(content)) => {
            for (label, text) in content {
                match content_text(text) {
                    Some(text) => slide.content.push(PlaceholderText::new(label.clone(), text)),
                    None => warnings.push(BuildWarning::for_slide(
                        number,
                        format!("content '{}' is {}; skipped", label, json_kind(text)),
                    )),
                }
            }
        }
        Some(other) => warnings.push(BuildWarning::for_slide(
            number,
            format!("content is {} instead of an object; ignored", json_kind(other)),
        )),
    }

    Some(slide)
}

/// Text for a content value. Scalars are rendered, containers are not.
fn content_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{"slides":[{"layout":"title","content":{"placeholder 0":"Q3 Update"}}]}"#;

    #[test]
    fn test_strip_code_fence_json_tag() {
        let fenced = format!("```json\n{}\n```", PLAIN);
        assert_eq!(strip_code_fence(&fenced), PLAIN);
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence(&format!("```\n{}\n```", PLAIN)), PLAIN);
        assert_eq!(strip_code_fence(&format!("```JSON\r\n{}\r\n```", PLAIN)), PLAIN);
        assert_eq!(strip_code_fence(&format!("  \n```json {} ```\n\n", PLAIN)), PLAIN);
        assert_eq!(strip_code_fence(&format!("```{}```", PLAIN)), PLAIN);
        assert_eq!(strip_code_fence(&format!("````json\n{}\n````", PLAIN)), PLAIN);
    }

    #[test]
    fn test_strip_code_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence(PLAIN), PLAIN);
        assert_eq!(strip_code_fence(&format!("\n  {}  \n", PLAIN)), PLAIN);
    }

    #[test]
    fn test_strip_code_fence_unterminated() {
        assert_eq!(strip_code_fence(&format!("```json\n{}", PLAIN)), PLAIN);
    }

    #[test]
    fn test_fenced_and_plain_parse_identically() {
        let fenced = format!("```json\n{}\n```", PLAIN);
        assert_eq!(parse_outline(&fenced).unwrap(), parse_outline(PLAIN).unwrap());
    }

    #[test]
    fn test_parse_outline_scenario() {
        let outline = parse_outline(PLAIN).unwrap();
        assert_eq!(outline.slides.len(), 1);
        assert!(outline.warnings.is_empty());
        assert_eq!(
            outline.slides[0],
            SlideDescriptor::new("title").with_text("placeholder 0", "Q3 Update")
        );
    }

    #[test]
    fn test_content_keeps_outline_order() {
        let outline = parse_outline(
            r#"{"slides":[{"layout":"Agenda","content":{"b 2":"two","a 1":"one","c 0":"zero"}}]}"#,
        )
        .unwrap();
        let labels: Vec<&str> = outline.slides[0]
            .content
            .iter()
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(labels, vec!["b 2", "a 1", "c 0"]);
    }

    #[test]
    fn test_missing_layout_defaults_to_title() {
        let outline = parse_outline(r#"{"slides":[{"content":{}}, {"layout": null}]}"#).unwrap();
        assert_eq!(outline.slides.len(), 2);
        assert!(outline.slides.iter().all(|s| s.layout == "title"));
        assert!(outline.warnings.is_empty());
    }

    #[test]
    fn test_missing_slides_is_empty_with_warning() {
        let outline = parse_outline(r#"{"title": "nothing here"}"#).unwrap();
        assert!(outline.is_empty());
        assert_eq!(outline.warnings.len(), 1);
    }

    #[test]
    fn test_malformed_items_are_skipped_with_warnings() {
        let outline = parse_outline(
            r#"{"slides":[
                "not a slide",
                {"layout": 3, "content": {"placeholder 0": "kept", "placeholder 1": ["x"], "placeholder 2": 42}},
                {"layout": "subtitle", "content": "nope"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(outline.slides.len(), 2);
        assert_eq!(outline.slides[0].layout, "title");
        assert_eq!(
            outline.slides[0].content,
            vec![
                PlaceholderText::new("placeholder 0", "kept"),
                PlaceholderText::new("placeholder 2", "42"),
            ]
        );
        assert!(outline.slides[1].content.is_empty());

        let slides: Vec<Option<usize>> = outline.warnings.iter().map(|w| w.slide).collect();
        assert_eq!(slides, vec![Some(1), Some(2), Some(2), Some(3)]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_outline("not json"), Err(Error::OutlineParse(_))));
        assert!(matches!(parse_outline("```json\n{oops\n```"), Err(Error::OutlineParse(_))));
        assert!(matches!(parse_outline("[1, 2]"), Err(Error::OutlineParse(_))));
        assert!(matches!(
            parse_outline(r#"{"slides": {"layout": "title"}}"#),
            Err(Error::OutlineParse(_))
        ));
    }
}
