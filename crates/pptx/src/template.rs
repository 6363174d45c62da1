//! Template reader.
//!
//! Loads a `.pptx` template fully into memory and indexes what the deck
//! builder needs: the main presentation part, the existing slide list, and
//! the slide layouts of the first slide master together with their
//! placeholders.

use crate::xml::{
    is_relationship_id, local_name, parse_relationships, rels_path_for, resolve_target,
    Relationship,
};
use deck_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const DEFAULT_PRESENTATION_PART: &str = "ppt/presentation.xml";

/// A presentation template held in memory.
#[derive(Debug, Clone)]
pub struct Template {
    /// Every file entry of the archive, in archive order.
    parts: Vec<(String, Vec<u8>)>,

    presentation_part: String,

    /// Relationships of the presentation part.
    presentation_rels: Vec<Relationship>,

    /// `(id, r:id)` of the slides already in the template.
    slide_ids: Vec<(u32, String)>,

    layouts: Vec<LayoutInfo>,
}

/// A slide layout of the first slide master.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutInfo {
    /// Position in the master's layout list.
    pub index: usize,

    /// Package path, e.g. `ppt/slideLayouts/slideLayout1.xml`.
    pub part: String,

    /// Layout name from `p:cSld/@name`, empty when unnamed.
    pub name: String,

    /// Placeholders in document order.
    pub placeholders: Vec<PlaceholderInfo>,
}

impl LayoutInfo {
    /// Placeholders a new slide inherits. Date, footer and slide number stay
    /// on the layout.
    pub fn cloneable_placeholders(&self) -> impl Iterator<Item = &PlaceholderInfo> {
        self.placeholders.iter().filter(|ph| ph.is_cloneable())
    }
}

/// A `p:ph` placeholder declared on a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderInfo {
    /// `idx` attribute; absent means 0 (the title).
    pub idx: u32,

    /// `type` attribute; absent means `obj`.
    pub ph_type: String,

    /// `orient` attribute when not the default `horz`.
    pub orient: Option<String>,

    /// `sz` attribute when not the default `full`.
    pub sz: Option<String>,

    /// Shape name on the layout.
    pub name: String,
}

impl PlaceholderInfo {
    pub fn is_cloneable(&self) -> bool {
        !matches!(self.ph_type.as_str(), "dt" | "ftr" | "sldNum")
    }

    /// Whether a freshly cloned shape gets an empty text body.
    pub fn has_text_frame(&self) -> bool {
        matches!(
            self.ph_type.as_str(),
            "title" | "ctrTitle" | "subTitle" | "body" | "obj"
        )
    }

    /// Base of the shape name PowerPoint gives a new shape of this kind.
    pub fn base_name(&self) -> &'static str {
        let vertical = self.orient.as_deref() == Some("vert");
        match self.ph_type.as_str() {
            "title" | "ctrTitle" => {
                if vertical {
                    "Vertical Title"
                } else {
                    "Title"
                }
            }
            "subTitle" => "Subtitle",
            "body" => {
                if vertical {
                    "Vertical Text Placeholder"
                } else {
                    "Text Placeholder"
                }
            }
            "chart" => "Chart Placeholder",
            "tbl" => "Table Placeholder",
            "pic" => "Picture Placeholder",
            "clipArt" => "ClipArt Placeholder",
            "dgm" => "SmartArt Placeholder",
            "media" => "Media Placeholder",
            "sldImg" => "Slide Image Placeholder",
            "hdr" => "Header Placeholder",
            "dt" => "Date Placeholder",
            "ftr" => "Footer Placeholder",
            "sldNum" => "Slide Number Placeholder",
            _ => {
                if vertical {
                    "Vertical Content Placeholder"
                } else {
                    "Content Placeholder"
                }
            }
        }
    }
}

impl Template {
    /// Open a template from disk.
    ///
    /// A missing file is reported as [`Error::TemplateNotFound`] so callers
    /// can turn it into a friendly message.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::TemplateNotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path)?;
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load a template from in-memory bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load a template from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::Zip(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", name, e)))?;
            parts.push((name, data));
        }

        let mut template = Self {
            parts,
            presentation_part: String::new(),
            presentation_rels: Vec::new(),
            slide_ids: Vec::new(),
            layouts: Vec::new(),
        };
        template.index()?;
        Ok(template)
    }

    /// Locate the presentation part, its slides and the master's layouts.
    fn index(&mut self) -> Result<()> {
        self.presentation_part = self.find_presentation_part()?;

        let rels_path = rels_path_for(&self.presentation_part);
        self.presentation_rels = parse_relationships(&self.part_text(&rels_path)?)?;

        let presentation_xml = self.part_text(&self.presentation_part)?;
        let ids = parse_presentation_ids(&presentation_xml)?;
        self.slide_ids = ids.slides;

        let master_rel = ids
            .master_rel_ids
            .iter()
            .find_map(|rid| self.presentation_rels.iter().find(|r| &r.id == rid))
            .or_else(|| self.presentation_rels.iter().find(|r| r.is_kind("slideMaster")))
            .ok_or_else(|| Error::InvalidTemplate("template has no slide master".to_string()))?;
        let master_part = resolve_target(&self.presentation_part, &master_rel.target);

        self.layouts = self.load_layouts(&master_part)?;
        log::debug!(
            "Template indexed: {} layouts, {} existing slides",
            self.layouts.len(),
            self.slide_ids.len()
        );
        Ok(())
    }

    fn find_presentation_part(&self) -> Result<String> {
        if let Some(rels) = self.part("_rels/.rels") {
            let rels = parse_relationships(&String::from_utf8_lossy(rels))?;
            if let Some(rel) = rels.iter().find(|r| r.is_kind("officeDocument")) {
                let part = resolve_target("", &rel.target);
                if self.part(&part).is_some() {
                    return Ok(part);
                }
            }
        }

        if self.part(DEFAULT_PRESENTATION_PART).is_some() {
            return Ok(DEFAULT_PRESENTATION_PART.to_string());
        }

        Err(Error::InvalidTemplate(
            "template has no presentation part".to_string(),
        ))
    }

    /// Layouts of a slide master, in `p:sldLayoutIdLst` order.
    fn load_layouts(&self, master_part: &str) -> Result<Vec<LayoutInfo>> {
        let master_xml = self.part_text(master_part)?;
        let master_rels = parse_relationships(&self.part_text(&rels_path_for(master_part))?)?;

        let mut layouts = Vec::new();
        for rid in parse_layout_rel_ids(&master_xml)? {
            let Some(rel) = master_rels.iter().find(|r| r.id == rid) else {
                log::warn!("Slide master references unknown layout relationship {}", rid);
                continue;
            };

            let part = resolve_target(master_part, &rel.target);
            let (name, placeholders) = parse_layout(&self.part_text(&part)?)?;
            layouts.push(LayoutInfo {
                index: layouts.len(),
                part,
                name,
                placeholders,
            });
        }

        Ok(layouts)
    }

    /// Layouts of the first slide master.
    pub fn layouts(&self) -> &[LayoutInfo] {
        &self.layouts
    }

    pub fn layout(&self, index: usize) -> Option<&LayoutInfo> {
        self.layouts.get(index)
    }

    /// Index of the layout stored at `part`.
    pub fn layout_index_of(&self, part: &str) -> Option<usize> {
        self.layouts.iter().position(|l| l.part == part)
    }

    /// Number of slides the template already contains.
    pub fn slide_count(&self) -> usize {
        self.slide_ids.len()
    }

    pub(crate) fn parts(&self) -> &[(String, Vec<u8>)] {
        &self.parts
    }

    pub(crate) fn presentation_part(&self) -> &str {
        &self.presentation_part
    }

    pub(crate) fn presentation_rels(&self) -> &[Relationship] {
        &self.presentation_rels
    }

    pub(crate) fn slide_ids(&self) -> &[(u32, String)] {
        &self.slide_ids
    }

    pub(crate) fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    pub(crate) fn part_text(&self, name: &str) -> Result<String> {
        let data = self
            .part(name)
            .ok_or_else(|| Error::InvalidTemplate(format!("missing part '{}'", name)))?;
        String::from_utf8(data.to_vec())
            .map_err(|e| Error::InvalidTemplate(format!("part '{}' is not UTF-8: {}", name, e)))
    }
}

/// Ids read from `presentation.xml`.
struct PresentationIds {
    master_rel_ids: Vec<String>,
    slides: Vec<(u32, String)>,
}

fn parse_presentation_ids(xml: &str) -> Result<PresentationIds> {
    let mut ids = PresentationIds {
        master_rel_ids: Vec::new(),
        slides: Vec::new(),
    };
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"sldMasterId" => {
                        if let Some(rid) = relationship_attr(e) {
                            ids.master_rel_ids.push(rid);
                        }
                    }
                    b"sldId" => {
                        let mut id = None;
                        let mut rid = None;
                        for attr in e.attributes().flatten() {
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            if attr.key.as_ref() == b"id" {
                                id = value.parse::<u32>().ok();
                            } else if is_relationship_id(attr.key.as_ref()) {
                                rid = Some(value);
                            }
                        }
                        if let (Some(id), Some(rid)) = (id, rid) {
                            ids.slides.push((id, rid));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing presentation: {}", e)));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Relationship ids of `p:sldLayoutId` entries, in order.
fn parse_layout_rel_ids(xml: &str) -> Result<Vec<String>> {
    let mut rids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldLayoutId" =>
            {
                if let Some(rid) = relationship_attr(e) {
                    rids.push(rid);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing slide master: {}", e)));
            }
            _ => {}
        }
    }

    Ok(rids)
}

/// Layout name and the placeholders directly under its shape tree.
fn parse_layout(xml: &str) -> Result<(String, Vec<PlaceholderInfo>)> {
    let mut name = String::new();
    let mut placeholders = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    // Shapes nested in a group are not layout placeholders.
    let mut group_depth = 0usize;
    let mut shape_name: Option<String> = None;
    let mut in_shape = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"cSld" => {
                    if let Some(value) = attr_value(e, b"name") {
                        name = value;
                    }
                }
                b"grpSp" => group_depth += 1,
                b"sp" if group_depth == 0 => {
                    in_shape = true;
                    shape_name = None;
                }
                b"cNvPr" if in_shape => shape_name = attr_value(e, b"name"),
                b"ph" if in_shape => placeholders.push(placeholder_from(e, shape_name.clone())),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"cSld" => {
                    if let Some(value) = attr_value(e, b"name") {
                        name = value;
                    }
                }
                b"cNvPr" if in_shape => shape_name = attr_value(e, b"name"),
                b"ph" if in_shape => placeholders.push(placeholder_from(e, shape_name.clone())),
                _ => {}
            },
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"grpSp" => group_depth = group_depth.saturating_sub(1),
                b"sp" if group_depth == 0 => in_shape = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing slide layout: {}", e)));
            }
            _ => {}
        }
    }

    Ok((name, placeholders))
}

fn placeholder_from(e: &quick_xml::events::BytesStart<'_>, shape_name: Option<String>) -> PlaceholderInfo {
    let mut ph = PlaceholderInfo {
        idx: 0,
        ph_type: "obj".to_string(),
        orient: None,
        sz: None,
        name: shape_name.unwrap_or_default(),
    };

    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.as_ref() {
            b"idx" => ph.idx = value.parse().unwrap_or(0),
            b"type" => ph.ph_type = value,
            b"orient" if value != "horz" => ph.orient = Some(value),
            b"sz" if value != "full" => ph.sz = Some(value),
            _ => {}
        }
    }

    ph
}

fn relationship_attr(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| is_relationship_id(attr.key.as_ref()))
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

fn attr_value(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::minimal_template;

    #[test]
    fn test_open_missing_template() {
        let err = Template::open("definitely/not/here.pptx").unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(_)));
        assert_eq!(
            err.to_string(),
            "Template file 'definitely/not/here.pptx' does not exist."
        );
    }

    #[test]
    fn test_not_a_zip() {
        let err = Template::from_bytes(b"plain text".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Zip(_)));
    }

    #[test]
    fn test_layouts_in_master_order() {
        let template = Template::from_bytes(minimal_template(11)).unwrap();

        assert_eq!(template.layouts().len(), 11);
        assert_eq!(template.slide_count(), 0);
        for (i, layout) in template.layouts().iter().enumerate() {
            assert_eq!(layout.index, i);
            assert_eq!(layout.part, format!("ppt/slideLayouts/slideLayout{}.xml", i + 1));
            assert_eq!(template.layout_index_of(&layout.part), Some(i));
        }
        assert_eq!(template.layouts()[0].name, "Layout 1");
    }

    #[test]
    fn test_layout_placeholders() {
        let template = Template::from_bytes(minimal_template(2)).unwrap();
        let layout = template.layout(0).unwrap();

        let types: Vec<&str> = layout.placeholders.iter().map(|p| p.ph_type.as_str()).collect();
        assert_eq!(types, vec!["title", "obj", "dt", "ftr", "sldNum"]);
        assert_eq!(layout.placeholders[0].idx, 0);
        assert_eq!(layout.placeholders[1].idx, 1);

        let cloneable: Vec<u32> = layout.cloneable_placeholders().map(|p| p.idx).collect();
        assert_eq!(cloneable, vec![0, 1]);
    }

    #[test]
    fn test_parse_layout_skips_grouped_shapes() {
        let xml = r#"<p:sldLayout xmlns:p="p" xmlns:a="a"><p:cSld name="Grouped"><p:spTree>
            <p:grpSp><p:sp><p:nvSpPr><p:cNvPr id="9" name="Inner"/><p:nvPr><p:ph idx="5"/></p:nvPr></p:nvSpPr></p:sp></p:grpSp>
            <p:sp><p:nvSpPr><p:cNvPr id="2" name="Body"/><p:cNvSpPr/><p:nvPr><p:ph type="body" orient="vert" sz="half" idx="3"/></p:nvPr></p:nvSpPr></p:sp>
        </p:spTree></p:cSld></p:sldLayout>"#;

        let (name, placeholders) = parse_layout(xml).unwrap();
        assert_eq!(name, "Grouped");
        assert_eq!(
            placeholders,
            vec![PlaceholderInfo {
                idx: 3,
                ph_type: "body".to_string(),
                orient: Some("vert".to_string()),
                sz: Some("half".to_string()),
                name: "Body".to_string(),
            }]
        );
        assert_eq!(placeholders[0].base_name(), "Vertical Text Placeholder");
    }

    #[test]
    fn test_placeholder_kinds() {
        let title = PlaceholderInfo {
            idx: 0,
            ph_type: "ctrTitle".to_string(),
            orient: None,
            sz: None,
            name: String::new(),
        };
        assert!(title.is_cloneable());
        assert!(title.has_text_frame());
        assert_eq!(title.base_name(), "Title");

        let pic = PlaceholderInfo {
            ph_type: "pic".to_string(),
            ..title.clone()
        };
        assert!(!pic.has_text_frame());
        assert_eq!(pic.base_name(), "Picture Placeholder");

        let footer = PlaceholderInfo {
            ph_type: "ftr".to_string(),
            ..title
        };
        assert!(!footer.is_cloneable());
    }
}
