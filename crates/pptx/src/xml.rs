//! XML and package-relationship helpers shared by the reader and writer.

use deck_core::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

pub(crate) const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub(crate) const RT_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub(crate) const RT_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub(crate) const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub(crate) const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// One `<Relationship>` entry from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    /// Whether the relationship type ends with `/<kind>`, which covers both
    /// transitional and strict OOXML namespaces.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.rel_type
            .rsplit_once('/')
            .map(|(_, tail)| tail == kind)
            .unwrap_or(false)
    }
}

/// Parse every relationship in a `.rels` document.
pub(crate) fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut rels = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                };

                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }

                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Namespace prefix of a qualified name, including the colon (`"p:"`), or
/// empty when unprefixed.
pub(crate) fn prefix_of(name: &[u8]) -> String {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => String::from_utf8_lossy(&name[..=pos]).to_string(),
        None => String::new(),
    }
}

/// Whether an attribute key is a prefixed `id`, i.e. a relationship reference
/// such as `r:id`.
pub(crate) fn is_relationship_id(key: &[u8]) -> bool {
    key.contains(&b':') && local_name(key) == b"id"
}

/// Path of the `.rels` part belonging to `part`.
///
/// `ppt/presentation.xml` → `ppt/_rels/presentation.xml.rels`
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that owns the `.rels`.
///
/// An empty `source` means the package root (`_rels/.rels`).
pub(crate) fn resolve_target(source: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Relative target from one part to another, as written into a `.rels`.
///
/// `ppt/slides/slide1.xml` → `ppt/slideLayouts/slideLayout2.xml` gives
/// `../slideLayouts/slideLayout2.xml`.
pub(crate) fn relative_target(source: &str, target: &str) -> String {
    let source_dir: Vec<&str> = match source.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let target_segments: Vec<&str> = target.split('/').collect();
    let (target_dir, target_file) = target_segments.split_at(target_segments.len() - 1);

    let common = source_dir
        .iter()
        .zip(target_dir.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; source_dir.len() - common];
    parts.extend_from_slice(&target_dir[common..]);
    parts.extend_from_slice(target_file);
    parts.join("/")
}

/// Highest numeric suffix among relationship ids like `rId7`.
pub(crate) fn max_rel_number(rels: &[Relationship]) -> u32 {
    rels.iter()
        .filter_map(|r| r.id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

/// Copy `xml` through unchanged except that `children` are written as empty
/// elements just before the root element closes.
///
/// Used to append `<Relationship>` and `<Override>` entries. A self-closing
/// root is expanded so it can hold the new children.
pub(crate) fn append_to_root(xml: &str, children: &[BytesStart<'_>]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Xml(format!("Failed to read XML: {}", e)))?;

        match event {
            Event::Start(e) => {
                depth += 1;
                write_event(&mut writer, Event::Start(e))?;
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    for child in children {
                        write_event(&mut writer, Event::Empty(child.borrow()))?;
                    }
                }
                write_event(&mut writer, Event::End(e))?;
            }
            Event::Empty(e) if depth == 0 => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                write_event(&mut writer, Event::Start(e))?;
                for child in children {
                    write_event(&mut writer, Event::Empty(child.borrow()))?;
                }
                write_event(&mut writer, Event::End(BytesEnd::new(name)))?;
            }
            Event::Eof => break,
            other => write_event(&mut writer, other)?,
        }
    }

    into_string(writer)
}

pub(crate) fn write_event<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Xml(format!("Failed to write XML: {}", e)))
}

pub(crate) fn into_string(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Xml(format!("Generated XML is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_prefix_of() {
        assert_eq!(prefix_of(b"p:presentation"), "p:");
        assert_eq!(prefix_of(b"presentation"), "");
    }

    #[test]
    fn test_is_relationship_id() {
        assert!(is_relationship_id(b"r:id"));
        assert!(!is_relationship_id(b"id"));
        assert!(!is_relationship_id(b"r:embed"));
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
        assert_eq!(rels_path_for("ppt/slides/slide2.xml"), "ppt/slides/_rels/slide2.xml.rels");
        assert_eq!(rels_path_for("root.xml"), "_rels/root.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("", "ppt/presentation.xml"), "ppt/presentation.xml");
        assert_eq!(
            resolve_target("ppt/presentation.xml", "slideMasters/slideMaster1.xml"),
            "ppt/slideMasters/slideMaster1.xml"
        );
        assert_eq!(
            resolve_target("ppt/slideMasters/slideMaster1.xml", "../slideLayouts/slideLayout3.xml"),
            "ppt/slideLayouts/slideLayout3.xml"
        );
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "/ppt/slideLayouts/slideLayout1.xml"),
            "ppt/slideLayouts/slideLayout1.xml"
        );
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(
            relative_target("ppt/slides/slide1.xml", "ppt/slideLayouts/slideLayout2.xml"),
            "../slideLayouts/slideLayout2.xml"
        );
        assert_eq!(
            relative_target("ppt/presentation.xml", "ppt/slides/slide4.xml"),
            "slides/slide4.xml"
        );
    }

    #[test]
    fn test_parse_relationships_and_max_id() {
        let xml = format!(
            r#"<?xml version="1.0"?><Relationships xmlns="{}">
                <Relationship Id="rId1" Type="{}" Target="slides/slide1.xml"/>
                <Relationship Id="rId7" Type="http://x/hyperlink" Target="https://example.com" TargetMode="External"/>
            </Relationships>"#,
            RELS_NS, RT_SLIDE
        );
        let rels = parse_relationships(&xml).unwrap();

        assert_eq!(rels.len(), 2);
        assert!(rels[0].is_kind("slide"));
        assert!(!rels[0].is_kind("slideLayout"));
        assert_eq!(rels[1].target, "https://example.com");
        assert_eq!(max_rel_number(&rels), 7);
    }

    #[test]
    fn test_append_to_root() {
        let xml = r#"<?xml version="1.0"?><Types xmlns="x"><Default Extension="xml" ContentType="application/xml"/></Types>"#;
        let mut child = BytesStart::new("Override");
        child.push_attribute(("PartName", "/ppt/slides/slide1.xml"));

        let out = append_to_root(xml, &[child]).unwrap();
        assert!(out.ends_with(r#"<Override PartName="/ppt/slides/slide1.xml"/></Types>"#));
        assert!(out.starts_with(r#"<?xml version="1.0"?>"#));
    }

    #[test]
    fn test_append_to_self_closing_root() {
        let xml = r#"<Relationships xmlns="x"/>"#;
        let mut child = BytesStart::new("Relationship");
        child.push_attribute(("Id", "rId1"));

        let out = append_to_root(xml, &[child]).unwrap();
        assert_eq!(out, r#"<Relationships xmlns="x"><Relationship Id="rId1"/></Relationships>"#);
    }
}
