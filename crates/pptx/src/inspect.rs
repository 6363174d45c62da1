//! Deck inspector: reads a `.pptx` back into slides and placeholder texts.

use crate::xml::{
    is_relationship_id, local_name, parse_relationships, rels_path_for, resolve_target,
};
use deck_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Reader for generated decks.
pub struct DeckInspector;

/// Slides of a deck in presentation order.
#[derive(Debug, Clone, Serialize)]
pub struct DeckSummary {
    pub slides: Vec<SlideInfo>,
}

/// One slide of an inspected deck.
#[derive(Debug, Clone, Serialize)]
pub struct SlideInfo {
    /// 1-based slide number.
    pub number: usize,

    /// Package path of the slide part.
    pub part: String,

    /// Package path of the layout the slide uses.
    pub layout_part: String,

    /// Placeholder shapes in document order.
    pub placeholders: Vec<PlaceholderText>,
}

impl SlideInfo {
    /// Text of the placeholder with `idx`, if the slide has one.
    pub fn text_of(&self, idx: u32) -> Option<&str> {
        self.placeholders
            .iter()
            .find(|p| p.idx == idx)
            .map(|p| p.text.as_str())
    }
}

/// A placeholder shape and its text, paragraphs joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderText {
    pub idx: u32,
    pub ph_type: String,
    pub text: String,
}

impl DeckInspector {
    pub fn new() -> Self {
        Self
    }

    /// Inspect a deck from a reader.
    pub fn inspect<R: Read + Seek>(&self, reader: R) -> Result<DeckSummary> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;

        let presentation_part = "ppt/presentation.xml";
        let slide_order = self.get_slide_order(&mut archive, presentation_part)?;

        let mut slides = Vec::with_capacity(slide_order.len());
        for (idx, slide_path) in slide_order.iter().enumerate() {
            slides.push(self.inspect_slide(&mut archive, slide_path, idx + 1)?);
        }

        Ok(DeckSummary { slides })
    }

    /// Slide parts in `p:sldIdLst` order. Decks without a list fall back to
    /// slide relationships sorted by their number.
    fn get_slide_order<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        presentation_part: &str,
    ) -> Result<Vec<String>> {
        let rels_content = self.read_file_from_archive(archive, &rels_path_for(presentation_part))?;
        let rels = parse_relationships(&rels_content)?;
        let presentation = self.read_file_from_archive(archive, presentation_part)?;

        let listed: Vec<String> = slide_rel_ids(&presentation)?
            .iter()
            .filter_map(|rid| rels.iter().find(|r| &r.id == rid))
            .map(|r| resolve_target(presentation_part, &r.target))
            .collect();
        if !listed.is_empty() {
            return Ok(listed);
        }

        let mut slides: Vec<(String, Option<usize>)> = rels
            .iter()
            .filter(|r| r.is_kind("slide"))
            .map(|r| {
                let order = extract_slide_number(&r.target).or_else(|| extract_slide_number(&r.id));
                (resolve_target(presentation_part, &r.target), order)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    fn inspect_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        number: usize,
    ) -> Result<SlideInfo> {
        let content = self.read_file_from_archive(archive, slide_path)?;
        let rels = parse_relationships(&self.read_file_from_archive(archive, &rels_path_for(slide_path))?)?;
        let layout_part = rels
            .iter()
            .find(|r| r.is_kind("slideLayout"))
            .map(|r| resolve_target(slide_path, &r.target))
            .unwrap_or_default();

        Ok(SlideInfo {
            number,
            part: slide_path.to_string(),
            layout_part,
            placeholders: extract_placeholders(&content)?,
        })
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::Zip(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for DeckInspector {
    fn default() -> Self {
        Self::new()
    }
}

/// Relationship ids of `p:sldId` entries, in order.
fn slide_rel_ids(xml: &str) -> Result<Vec<String>> {
    let mut rids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                if let Some(attr) = e
                    .attributes()
                    .flatten()
                    .find(|a| is_relationship_id(a.key.as_ref()))
                {
                    rids.push(String::from_utf8_lossy(&attr.value).to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error parsing presentation: {}", e))),
            _ => {}
        }
    }

    Ok(rids)
}

/// Placeholder shapes with their text.
fn extract_placeholders(xml_content: &str) -> Result<Vec<PlaceholderText>> {
    let mut placeholders = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(false);

    let mut current: Option<PlaceholderText> = None;
    let mut in_shape = false;
    let mut in_text_body = false;
    let mut in_text = false;
    let mut paragraphs: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => {
                    in_shape = true;
                    current = None;
                    paragraphs.clear();
                }
                b"ph" if in_shape => current = Some(placeholder_from(e)),
                b"txBody" => in_text_body = true,
                b"p" if in_text_body => paragraphs.push(String::new()),
                b"t" if in_text_body => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"ph" if in_shape => current = Some(placeholder_from(e)),
                b"p" if in_text_body => paragraphs.push(String::new()),
                b"br" if in_text_body => {
                    if let Some(p) = paragraphs.last_mut() {
                        p.push('\u{b}');
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_text {
                    let text = e.unescape().unwrap_or_default();
                    if let Some(p) = paragraphs.last_mut() {
                        p.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => {
                    if let Some(mut ph) = current.take() {
                        ph.text = paragraphs.join("\n");
                        placeholders.push(ph);
                    }
                    paragraphs.clear();
                    in_shape = false;
                    in_text_body = false;
                    in_text = false;
                }
                b"txBody" => in_text_body = false,
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("XML parsing error (continuing): {}", e);
            }
            _ => {}
        }
    }

    Ok(placeholders)
}

fn placeholder_from(e: &quick_xml::events::BytesStart<'_>) -> PlaceholderText {
    let mut ph = PlaceholderText {
        idx: 0,
        ph_type: "obj".to_string(),
        text: String::new(),
    };
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"idx" => ph.idx = String::from_utf8_lossy(&attr.value).parse().unwrap_or(0),
            b"type" => ph.ph_type = String::from_utf8_lossy(&attr.value).to_string(),
            _ => {}
        }
    }
    ph
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    // Remove common extensions first
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    // Try to find digits at the end
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
