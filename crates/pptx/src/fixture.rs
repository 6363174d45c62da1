//! Synthesized templates for tests.
//!
//! Builds small but structurally complete `.pptx` packages in memory: one
//! slide master, a theme, and `layout_count` layouts that each carry a title
//! (idx 0), a body (idx 1), and date/footer/slide-number placeholders
//! (idx 10-12).

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const NS_DECL: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const RELS_OPEN: &str =
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#;
const RT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// A template with `layout_count` layouts and no slides.
pub fn minimal_template(layout_count: usize) -> Vec<u8> {
    template_with_slides(layout_count, &[])
}

/// A template with `layout_count` layouts and one pre-existing slide per
/// entry of `slide_titles`, each on the first layout.
pub fn template_with_slides(layout_count: usize, slide_titles: &[&str]) -> Vec<u8> {
    let layout_count = layout_count.max(1);
    let mut files: Vec<(String, String)> = Vec::new();

    files.push(("[Content_Types].xml".to_string(), content_types(layout_count, slide_titles.len())));
    files.push((
        "_rels/.rels".to_string(),
        format!(
            r#"{DECL}{RELS_OPEN}<Relationship Id="rId1" Type="{RT}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
        ),
    ));
    files.push(("ppt/presentation.xml".to_string(), presentation(slide_titles.len())));
    files.push((
        "ppt/_rels/presentation.xml.rels".to_string(),
        presentation_rels(slide_titles.len()),
    ));
    files.push(("ppt/slideMasters/slideMaster1.xml".to_string(), master(layout_count)));
    files.push((
        "ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(),
        master_rels(layout_count),
    ));
    for n in 1..=layout_count {
        files.push((format!("ppt/slideLayouts/slideLayout{}.xml", n), layout(n)));
        files.push((
            format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", n),
            format!(
                r#"{DECL}{RELS_OPEN}<Relationship Id="rId1" Type="{RT}/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#
            ),
        ));
    }
    for (i, title) in slide_titles.iter().enumerate() {
        files.push((format!("ppt/slides/slide{}.xml", i + 1), existing_slide(title)));
        files.push((
            format!("ppt/slides/_rels/slide{}.xml.rels", i + 1),
            format!(
                r#"{DECL}{RELS_OPEN}<Relationship Id="rId1" Type="{RT}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#
            ),
        ));
    }
    files.push(("ppt/theme/theme1.xml".to_string(), theme()));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, body) in files {
        writer.start_file(name, options).expect("in-memory zip entry");
        writer.write_all(body.as_bytes()).expect("in-memory zip write");
    }
    writer.finish().expect("in-memory zip finish").into_inner()
}

fn content_types(layout_count: usize, slide_count: usize) -> String {
    let mut xml = format!(
        r#"{DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#
    );
    for n in 1..=layout_count {
        xml.push_str(&format!(
            r#"<Override PartName="/ppt/slideLayouts/slideLayout{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#
        ));
    }
    for n in 1..=slide_count {
        xml.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn presentation(slide_count: usize) -> String {
    let slides = if slide_count == 0 {
        String::new()
    } else {
        let ids: String = (1..=slide_count)
            .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2))
            .collect();
        format!("<p:sldIdLst>{}</p:sldIdLst>", ids)
    };

    format!(
        r#"{DECL}<p:presentation {NS_DECL} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{slides}<p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/><p:defaultTextStyle/></p:presentation>"#
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let mut xml = format!(
        r#"{DECL}{RELS_OPEN}<Relationship Id="rId1" Type="{RT}/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="{RT}/theme" Target="theme/theme1.xml"/>"#
    );
    for n in 1..=slide_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{RT}/slide" Target="slides/slide{}.xml"/>"#,
            n + 2,
            n
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn master(layout_count: usize) -> String {
    let ids: String = (1..=layout_count)
        .map(|n| {
            format!(
                r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#,
                2147483648u64 + n as u64,
                n
            )
        })
        .collect();

    format!(
        r#"{DECL}<p:sldMaster {NS_DECL}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{title}{body}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst>{ids}</p:sldLayoutIdLst></p:sldMaster>"#,
        title = placeholder_shape(2, "Title Placeholder 1", r#"type="title""#),
        body = placeholder_shape(3, "Text Placeholder 2", r#"type="body" idx="1""#),
    )
}

fn master_rels(layout_count: usize) -> String {
    let mut xml = format!("{DECL}{RELS_OPEN}");
    for n in 1..=layout_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="{RT}/slideLayout" Target="../slideLayouts/slideLayout{n}.xml"/>"#
        ));
    }
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="{RT}/theme" Target="../theme/theme1.xml"/></Relationships>"#,
        layout_count + 1
    ));
    xml
}

fn layout(n: usize) -> String {
    format!(
        r#"{DECL}<p:sldLayout {NS_DECL} preserve="1"><p:cSld name="Layout {n}"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}{}{}{}{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        placeholder_shape(2, "Title 1", r#"type="title""#),
        placeholder_shape(3, "Content Placeholder 2", r#"idx="1""#),
        placeholder_shape(4, "Date Placeholder 3", r#"type="dt" sz="half" idx="10""#),
        placeholder_shape(5, "Footer Placeholder 4", r#"type="ftr" sz="quarter" idx="11""#),
        placeholder_shape(6, "Slide Number Placeholder 5", r#"type="sldNum" sz="quarter" idx="12""#),
    )
}

fn existing_slide(title: &str) -> String {
    format!(
        r#"{DECL}<p:sld {NS_DECL}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:t>{title}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn placeholder_shape(id: u32, name: &str, ph_attrs: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph {ph_attrs}/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p/></p:txBody></p:sp>"#
    )
}

fn theme() -> String {
    let colors = [
        ("dk1", "000000"),
        ("lt1", "FFFFFF"),
        ("dk2", "44546A"),
        ("lt2", "E7E6E6"),
        ("accent1", "4472C4"),
        ("accent2", "ED7D31"),
        ("accent3", "A5A5A5"),
        ("accent4", "FFC000"),
        ("accent5", "5B9BD5"),
        ("accent6", "70AD47"),
        ("hlink", "0563C1"),
        ("folHlink", "954F72"),
    ];
    let scheme: String = colors
        .iter()
        .map(|(name, rgb)| format!(r#"<a:{name}><a:srgbClr val="{rgb}"/></a:{name}>"#))
        .collect();
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = r#"<a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#;

    format!(
        r#"{DECL}<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Fixture"><a:themeElements><a:clrScheme name="Fixture">{scheme}</a:clrScheme><a:fontScheme name="Fixture"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Fixture"><a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}
