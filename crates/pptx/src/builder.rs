//! Deck builder: appends outline slides to a template and packages the
//! result as a new `.pptx`.

use crate::slide::NewSlide;
use crate::template::Template;
use crate::xml::{
    append_to_root, into_string, local_name, max_rel_number, prefix_of, relative_target,
    rels_path_for, write_event, CONTENT_TYPES_PART, CT_SLIDE, RT_SLIDE,
};
use deck_core::{BuildWarning, Error, LayoutMatch, LayoutTable, Result, SlideDescriptor};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::ZipWriter;

const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Presentation children that must come after `p:sldIdLst`.
const AFTER_SLIDE_LIST: &[&[u8]] = &[
    b"sldSz",
    b"notesSz",
    b"smartTags",
    b"embeddedFontLst",
    b"custShowLst",
    b"photoAlbum",
    b"custDataLst",
    b"kinsoku",
    b"defaultTextStyle",
    b"modifyVerifier",
    b"extLst",
];

/// First id PowerPoint allows for `p:sldId`.
const MIN_SLIDE_ID: u32 = 256;

/// Builds decks from slide descriptors against one template.
pub struct DeckBuilder<'a> {
    template: &'a Template,
    layouts: &'a LayoutTable,
}

/// What a build produced, besides the bytes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// One entry per appended slide, in outline order.
    pub slides: Vec<SlideSummary>,

    /// Items skipped by the best-effort policy.
    pub warnings: Vec<BuildWarning>,
}

/// Summary of one appended slide.
#[derive(Debug, Clone, Serialize)]
pub struct SlideSummary {
    /// Layout name as given by the outline.
    pub layout_name: String,

    /// Template layout index actually used.
    pub layout_index: usize,

    /// Package path of the new slide.
    pub part: String,

    /// Placeholders that received text.
    pub filled: usize,
}

/// A finished deck held in memory.
#[derive(Debug, Clone)]
pub struct BuiltDeck {
    pub bytes: Vec<u8>,
    pub report: BuildReport,
}

impl BuiltDeck {
    /// Write the deck to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        std::fs::write(path, &self.bytes)?;
        log::debug!("Saved deck to {}", path.display());
        Ok(path.to_path_buf())
    }
}

/// New part written alongside the template's own parts.
struct PendingPart {
    name: String,
    data: Vec<u8>,
}

impl<'a> DeckBuilder<'a> {
    pub fn new(template: &'a Template, layouts: &'a LayoutTable) -> Self {
        Self { template, layouts }
    }

    /// Build and save in one step. Returns the report of the saved deck.
    pub fn build_to_path(
        &self,
        slides: &[SlideDescriptor],
        path: impl AsRef<Path>,
    ) -> Result<BuildReport> {
        let deck = self.build(slides)?;
        deck.save(path)?;
        Ok(deck.report)
    }

    /// Append one slide per descriptor, in order.
    ///
    /// Unknown layout names use layout 0. Placeholder labels that do not
    /// resolve are skipped with a warning. A layout index past the end of
    /// the template's layouts fails the build.
    pub fn build(&self, slides: &[SlideDescriptor]) -> Result<BuiltDeck> {
        let template = self.template;
        let presentation_part = template.presentation_part();
        let slides_dir = match presentation_part.rsplit_once('/') {
            Some((dir, _)) => format!("{}/slides", dir),
            None => "slides".to_string(),
        };

        let mut report = BuildReport::default();
        let mut pending = Vec::with_capacity(slides.len() * 2);
        let mut slide_entries = Vec::with_capacity(slides.len());
        let mut relationships = Vec::with_capacity(slides.len());
        let mut overrides = Vec::with_capacity(slides.len());

        let mut next_part_number = self.next_slide_number(&slides_dir);
        let mut next_slide_id = template
            .slide_ids()
            .iter()
            .map(|(id, _)| id + 1)
            .max()
            .unwrap_or(MIN_SLIDE_ID)
            .max(MIN_SLIDE_ID);
        let mut next_rel = max_rel_number(template.presentation_rels()) + 1;

        for (i, descriptor) in slides.iter().enumerate() {
            let number = i + 1;
            let index = match self.layouts.lookup(&descriptor.layout) {
                LayoutMatch::Known(index) => index,
                fallback @ LayoutMatch::Fallback => {
                    log::debug!("Unknown layout '{}', using fallback", descriptor.layout);
                    report.warnings.push(BuildWarning::for_slide(
                        number,
                        format!(
                            "unknown layout '{}'; using layout {}",
                            descriptor.layout,
                            fallback.index()
                        ),
                    ));
                    fallback.index()
                }
            };

            let layout = template.layout(index).ok_or_else(|| Error::LayoutOutOfRange {
                name: descriptor.layout.clone(),
                index,
                available: template.layouts().len(),
            })?;

            let mut slide = NewSlide::from_layout(layout);
            for entry in &descriptor.content {
                let Some(idx) = entry.placeholder_idx() else {
                    log::debug!("Slide {}: unparsable label '{}'", number, entry.label);
                    report.warnings.push(BuildWarning::for_slide(
                        number,
                        format!("placeholder label '{}' has no index; skipped", entry.label),
                    ));
                    continue;
                };

                if !slide.set_text(idx, &entry.text) {
                    log::debug!("Slide {}: no placeholder {}", number, idx);
                    report.warnings.push(BuildWarning::for_slide(
                        number,
                        format!(
                            "layout {} has no placeholder {} (label '{}'); skipped",
                            index, idx, entry.label
                        ),
                    ));
                }
            }

            let part = format!("{}/slide{}.xml", slides_dir, next_part_number);
            let rel_id = format!("rId{}", next_rel);

            pending.push(PendingPart {
                name: part.clone(),
                data: slide.to_xml().into_bytes(),
            });
            pending.push(PendingPart {
                name: rels_path_for(&part),
                data: slide.rels_xml(&part).into_bytes(),
            });

            let mut rel = BytesStart::new("Relationship");
            rel.push_attribute(("Id", rel_id.as_str()));
            rel.push_attribute(("Type", RT_SLIDE));
            rel.push_attribute(("Target", relative_target(presentation_part, &part).as_str()));
            relationships.push(rel);

            let mut ct = BytesStart::new("Override");
            ct.push_attribute(("PartName", format!("/{}", part).as_str()));
            ct.push_attribute(("ContentType", CT_SLIDE));
            overrides.push(ct);

            slide_entries.push((next_slide_id, rel_id));

            log::debug!(
                "Appended slide {} ({}) with layout {} '{}'",
                number,
                part,
                index,
                layout.name
            );
            report.slides.push(SlideSummary {
                layout_name: descriptor.layout.clone(),
                layout_index: index,
                part,
                filled: slide.filled(),
            });

            next_part_number += 1;
            next_slide_id += 1;
            next_rel += 1;
        }

        let presentation_rels_part = rels_path_for(presentation_part);
        let presentation_xml =
            insert_slide_ids(&template.part_text(presentation_part)?, &slide_entries)?;
        let presentation_rels =
            append_to_root(&template.part_text(&presentation_rels_part)?, &relationships)?;
        let content_types = append_to_root(&template.part_text(CONTENT_TYPES_PART)?, &overrides)?;

        let bytes = self.package(
            &[
                (presentation_part, presentation_xml.as_bytes()),
                (presentation_rels_part.as_str(), presentation_rels.as_bytes()),
                (CONTENT_TYPES_PART, content_types.as_bytes()),
            ],
            &pending,
        )?;

        Ok(BuiltDeck { bytes, report })
    }

    /// Lowest slide number greater than any existing `slides/slideN.xml`.
    fn next_slide_number(&self, slides_dir: &str) -> usize {
        let prefix = format!("{}/slide", slides_dir);
        self.template
            .parts()
            .iter()
            .filter_map(|(name, _)| name.strip_prefix(&prefix)?.strip_suffix(".xml")?.parse::<usize>().ok())
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Zip the template's parts, with `replaced` substituted, followed by
    /// the new parts. `[Content_Types].xml` goes first.
    fn package(&self, replaced: &[(&str, &[u8])], pending: &[PendingPart]) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let content_of = |name: &str, original: &[u8]| -> Vec<u8> {
            replaced
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, data)| data.to_vec())
                .unwrap_or_else(|| original.to_vec())
        };

        let mut entries: Vec<(&str, Vec<u8>)> = self
            .template
            .parts()
            .iter()
            .map(|(name, data)| (name.as_str(), content_of(name, data)))
            .collect();
        entries.sort_by_key(|(name, _)| *name != CONTENT_TYPES_PART);
        entries.extend(pending.iter().map(|p| (p.name.as_str(), p.data.clone())));

        for (name, data) in entries {
            writer
                .start_file(name, options)
                .map_err(|e| Error::Zip(format!("Failed to add '{}': {}", name, e)))?;
            writer
                .write_all(&data)
                .map_err(|e| Error::Zip(format!("Failed to write '{}': {}", name, e)))?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::Zip(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

/// Add `p:sldId` entries to `presentation.xml`, creating `p:sldIdLst` in its
/// schema position when the template has no slides.
fn insert_slide_ids(xml: &str, entries: &[(u32, String)]) -> Result<String> {
    if entries.is_empty() {
        return Ok(xml.to_string());
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;
    let mut prefix = String::new();
    let mut rel_prefix = "r".to_string();
    let mut in_list = false;
    let mut done = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Xml(format!("Failed to read presentation: {}", e)))?;

        match event {
            Event::Start(e) => {
                let (is_list, follows_list) = {
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    if depth == 0 {
                        prefix = prefix_of(name.as_ref());
                        if let Some(found) = relationships_prefix(&e) {
                            rel_prefix = found;
                        }
                    }
                    (local == b"sldIdLst", AFTER_SLIDE_LIST.contains(&local))
                };

                if depth == 1 && !done && follows_list {
                    write_slide_list(&mut writer, &prefix, &rel_prefix, entries)?;
                    done = true;
                }
                if depth == 1 && is_list {
                    in_list = true;
                }
                depth += 1;
                write_event(&mut writer, Event::Start(e))?;
            }
            Event::End(e) => {
                if depth == 2 && in_list {
                    write_slide_ids(&mut writer, &prefix, &rel_prefix, entries)?;
                    in_list = false;
                    done = true;
                }
                if depth == 1 && !done {
                    write_slide_list(&mut writer, &prefix, &rel_prefix, entries)?;
                    done = true;
                }
                depth = depth.saturating_sub(1);
                write_event(&mut writer, Event::End(e))?;
            }
            Event::Empty(e) if depth == 1 && !done => {
                let (is_list, follows_list) = {
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    (local == b"sldIdLst", AFTER_SLIDE_LIST.contains(&local))
                };

                if is_list {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    write_event(&mut writer, Event::Start(e))?;
                    write_slide_ids(&mut writer, &prefix, &rel_prefix, entries)?;
                    write_event(&mut writer, Event::End(BytesEnd::new(name)))?;
                    done = true;
                    continue;
                }
                if follows_list {
                    write_slide_list(&mut writer, &prefix, &rel_prefix, entries)?;
                    done = true;
                }
                write_event(&mut writer, Event::Empty(e))?;
            }
            Event::Eof => break,
            other => write_event(&mut writer, other)?,
        }
    }

    into_string(writer)
}

/// Prefix bound to the relationships namespace on the root element.
fn relationships_prefix(root: &BytesStart<'_>) -> Option<String> {
    root.attributes().flatten().find_map(|attr| {
        let key = attr.key.as_ref();
        let prefix = key.strip_prefix(b"xmlns:")?;
        (attr.value.as_ref() == RELATIONSHIPS_NS.as_bytes())
            .then(|| String::from_utf8_lossy(prefix).to_string())
    })
}

fn write_slide_list<W: std::io::Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    rel_prefix: &str,
    entries: &[(u32, String)],
) -> Result<()> {
    let name = format!("{}sldIdLst", prefix);
    write_event(writer, Event::Start(BytesStart::new(name.as_str())))?;
    write_slide_ids(writer, prefix, rel_prefix, entries)?;
    write_event(writer, Event::End(BytesEnd::new(name.as_str())))
}

fn write_slide_ids<W: std::io::Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    rel_prefix: &str,
    entries: &[(u32, String)],
) -> Result<()> {
    let rel_attr = format!("{}:id", rel_prefix);
    for (id, rid) in entries {
        let mut elem = BytesStart::new(format!("{}sldId", prefix));
        elem.push_attribute(("id", id.to_string().as_str()));
        elem.push_attribute((rel_attr.as_str(), rid.as_str()));
        write_event(writer, Event::Empty(elem))?;
    }
    Ok(())
}
