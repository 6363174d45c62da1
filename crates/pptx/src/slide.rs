//! XML for newly appended slides.

use crate::template::{LayoutInfo, PlaceholderInfo};
use crate::xml::{relative_target, RELS_NS, RT_SLIDE_LAYOUT, XML_DECL};
use quick_xml::escape::escape;
use std::fmt::Write;

const SLIDE_NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

/// A placeholder cloned from the layout onto a new slide.
#[derive(Debug, Clone)]
pub(crate) struct SlideShape<'a> {
    pub source: &'a PlaceholderInfo,
    pub id: u32,
    pub name: String,
    pub text: Option<String>,
}

/// A slide under construction: the layout's placeholders plus assigned text.
#[derive(Debug, Clone)]
pub(crate) struct NewSlide<'a> {
    pub layout: &'a LayoutInfo,
    pub shapes: Vec<SlideShape<'a>>,
}

impl<'a> NewSlide<'a> {
    /// Clone the layout's placeholders. Shape ids start at 2 because the
    /// shape tree itself is id 1.
    pub fn from_layout(layout: &'a LayoutInfo) -> Self {
        let shapes = layout
            .cloneable_placeholders()
            .enumerate()
            .map(|(i, source)| {
                let id = i as u32 + 2;
                SlideShape {
                    source,
                    id,
                    name: format!("{} {}", source.base_name(), id - 1),
                    text: None,
                }
            })
            .collect();

        Self { layout, shapes }
    }

    /// Assign text to the placeholder with `idx`. Returns false when the
    /// slide has no such placeholder.
    pub fn set_text(&mut self, idx: u32, text: &str) -> bool {
        match self.shapes.iter_mut().find(|s| s.source.idx == idx) {
            Some(shape) => {
                shape.text = Some(text.to_string());
                true
            }
            None => false,
        }
    }

    /// Number of placeholders that received text.
    pub fn filled(&self) -> usize {
        self.shapes.iter().filter(|s| s.text.is_some()).count()
    }

    /// The `p:sld` document.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(XML_DECL);
        let _ = write!(
            xml,
            r#"<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
            SLIDE_NS
        );
        for shape in &self.shapes {
            write_shape(&mut xml, shape);
        }
        xml.push_str(r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#);
        xml
    }

    /// The slide's `.rels` document, pointing at its layout.
    pub fn rels_xml(&self, slide_part: &str) -> String {
        format!(
            r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}" Target="{}"/></Relationships>"#,
            XML_DECL,
            RELS_NS,
            RT_SLIDE_LAYOUT,
            escape(&relative_target(slide_part, &self.layout.part))
        )
    }
}

fn write_shape(xml: &mut String, shape: &SlideShape<'_>) {
    let ph = shape.source;
    let _ = write!(
        xml,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph"#,
        shape.id,
        escape(&shape.name)
    );
    if ph.ph_type != "obj" {
        let _ = write!(xml, r#" type="{}""#, escape(&ph.ph_type));
    }
    if let Some(orient) = &ph.orient {
        let _ = write!(xml, r#" orient="{}""#, escape(orient));
    }
    if let Some(sz) = &ph.sz {
        let _ = write!(xml, r#" sz="{}""#, escape(sz));
    }
    if ph.idx != 0 {
        let _ = write!(xml, r#" idx="{}""#, ph.idx);
    }
    xml.push_str("/></p:nvPr></p:nvSpPr><p:spPr/>");

    match &shape.text {
        Some(text) => {
            xml.push_str("<p:txBody><a:bodyPr/><a:lstStyle/>");
            write_paragraphs(xml, text);
            xml.push_str("</p:txBody>");
        }
        None if ph.has_text_frame() => {
            xml.push_str("<p:txBody><a:bodyPr/><a:lstStyle/><a:p/></p:txBody>");
        }
        None => {}
    }

    xml.push_str("</p:sp>");
}

/// One paragraph per line; a vertical tab becomes a soft line break.
fn write_paragraphs(xml: &mut String, text: &str) {
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            xml.push_str("<a:p/>");
            continue;
        }

        xml.push_str("<a:p>");
        for (i, run) in line.split('\u{b}').enumerate() {
            if i > 0 {
                xml.push_str("<a:br/>");
            }
            if !run.is_empty() {
                let _ = write!(xml, "<a:r><a:t>{}</a:t></a:r>", escape(&xml_safe(run)));
            }
        }
        xml.push_str("</a:p>");
    }
}

/// Drop characters XML 1.0 cannot carry.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{fffe}' && c != '\u{ffff}'))
        .collect()
}
