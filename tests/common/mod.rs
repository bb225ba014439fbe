#![allow(dead_code)]

use std::io::{Cursor, Write};

use pptx_templater::Presentation;
use zip::write::SimpleFileOptions;

pub const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
pub const PML_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub const OFFICE_THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements>
<a:clrScheme name="Office">
<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
<a:dk2><a:srgbClr val="44546A"/></a:dk2>
<a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>
<a:accent1><a:srgbClr val="4472C4"/></a:accent1>
<a:accent2><a:srgbClr val="ED7D31"/></a:accent2>
<a:accent3><a:srgbClr val="A5A5A5"/></a:accent3>
<a:accent4><a:srgbClr val="FFC000"/></a:accent4>
<a:accent5><a:srgbClr val="5B9BD5"/></a:accent5>
<a:accent6><a:srgbClr val="70AD47"/></a:accent6>
<a:hlink><a:srgbClr val="0563C1"/></a:hlink>
<a:folHlink><a:srgbClr val="954F72"/></a:folHlink>
</a:clrScheme>
<a:fontScheme name="Office">
<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>
<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>
</a:fontScheme>
<a:fmtScheme name="Office"/>
</a:themeElements></a:theme>"#;

pub const DEFAULT_TX_STYLES: &str = r#"<p:txStyles>
<p:titleStyle><a:lvl1pPr algn="l"><a:defRPr sz="4400" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mj-lt"/><a:ea typeface="+mj-ea"/></a:defRPr></a:lvl1pPr></p:titleStyle>
<p:bodyStyle><a:lvl1pPr marL="228600" indent="-228600" algn="l"><a:buChar char="&#8226;"/><a:defRPr sz="2800"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:bodyStyle>
<p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:otherStyle>
</p:txStyles>"#;

/// A paragraph with optional `a:pPr` attributes/children and one run.
pub fn paragraph(ppr: &str, run_props: &str, text: &str) -> String {
    format!(
        r#"<a:p>{ppr}<a:r><a:rPr lang="en-US"{run_props}/><a:t>{text}</a:t></a:r><a:endParaRPr lang="en-US"/></a:p>"#
    )
}

pub fn xfrm(x: i64, y: i64, cx: i64, cy: i64) -> String {
    format!(r#"<a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#)
}

/// A placeholder `p:sp`. `ph` is the attribute list of `p:ph`; `body` is
/// everything after `a:bodyPr`/`a:lstStyle`, or `None` for no text body.
pub fn placeholder(
    id: u32,
    name: &str,
    ph: &str,
    sp_pr: &str,
    body: Option<impl AsRef<str>>,
) -> String {
    let tx_body = body
        .map(|b| format!("<p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody>", b.as_ref()))
        .unwrap_or_default();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph {ph}/></p:nvPr></p:nvSpPr><p:spPr>{sp_pr}</p:spPr>{tx_body}</p:sp>"#
    )
}

pub fn decorative_rect(id: u32, name: &str, fill: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:solidFill>{fill}</a:solidFill></p:spPr></p:sp>"#,
        xfrm(0, 6400800, 12192000, 457200)
    )
}

/// A rectangle spanning `cx` by `cy` EMU, with a solid fill when one is given.
pub fn bar(id: u32, name: &str, fill: Option<&str>, cx: i64, cy: i64) -> String {
    let fill = fill
        .map(|f| format!("<a:solidFill>{f}</a:solidFill>"))
        .unwrap_or_default();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>{fill}</p:spPr></p:sp>"#,
        xfrm(0, 0, cx, cy)
    )
}

pub fn fixed_placeholders() -> Vec<String> {
    vec![
        placeholder(
            10,
            "Date Placeholder 3",
            r#"type="dt" sz="half" idx="10""#,
            "",
            Some(&paragraph("", r#" sz="1200""#, "1/1/2026")),
        ),
        placeholder(
            11,
            "Footer Placeholder 4",
            r#"type="ftr" sz="quarter" idx="11""#,
            "",
            Some(r#"<a:p><a:endParaRPr lang="en-US" sz="1000"><a:solidFill><a:srgbClr val="A6A6A6"/></a:solidFill></a:endParaRPr></a:p>"#),
        ),
        placeholder(
            12,
            "Slide Number Placeholder 5",
            r#"type="sldNum" sz="quarter" idx="12""#,
            "",
            Some(r#"<a:p><a:fld id="{B6F15528-21DE-4FAA-801E-634DDDAF4B2B}" type="slidenum"><a:rPr lang="en-US"/><a:t>&lt;#&gt;</a:t></a:fld><a:endParaRPr lang="en-US"/></a:p>"#),
        ),
    ]
}

#[derive(Clone, Debug)]
pub struct Layout {
    pub name: String,
    pub layout_type: Option<String>,
    pub shapes: Vec<String>,
}

impl Layout {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            layout_type: None,
            shapes: Vec::new(),
        }
    }

    pub fn with_type(mut self, layout_type: &str) -> Self {
        self.layout_type = Some(layout_type.to_string());
        self
    }

    pub fn shape(mut self, xml: impl Into<String>) -> Self {
        self.shapes.push(xml.into());
        self
    }

    pub fn with_fixed(mut self) -> Self {
        self.shapes.extend(fixed_placeholders());
        self
    }

    fn to_xml(&self) -> String {
        let type_attr = self
            .layout_type
            .as_ref()
            .map(|t| format!(r#" type="{t}""#))
            .unwrap_or_default();
        format!(
            r#"{XML_DECL}<p:sldLayout {NS}{type_attr} preserve="1"><p:cSld name="{}"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
            self.name,
            self.shapes.concat()
        )
    }
}

pub fn title_slide_layout() -> Layout {
    Layout::new("Title Slide")
        .with_type("title")
        .shape(placeholder(
            2,
            "Title 1",
            r#"type="ctrTitle""#,
            &xfrm(1524000, 1122363, 9144000, 2387600),
            Some(&paragraph(r#"<a:pPr algn="ctr"/>"#, "", "Click to edit Master title style")),
        ))
        .shape(placeholder(
            3,
            "Subtitle 2",
            r#"type="subTitle" idx="1""#,
            &xfrm(1524000, 3602038, 9144000, 1655762),
            Some(&paragraph(
                r#"<a:pPr marL="0" indent="0" algn="ctr"><a:buNone/></a:pPr>"#,
                "",
                "Click to edit Master subtitle style",
            )),
        ))
        .with_fixed()
}

pub fn title_and_content_layout() -> Layout {
    Layout::new("Title and Content")
        .with_type("obj")
        .shape(placeholder(
            2,
            "Title 1",
            r#"type="title""#,
            "",
            Some(&paragraph("", "", "Click to edit Master title style")),
        ))
        .shape(placeholder(
            3,
            "Content Placeholder 2",
            r#"idx="1""#,
            "",
            Some(&[
                paragraph(r#"<a:pPr lvl="0"/>"#, "", "Edit Master text styles"),
                paragraph(r#"<a:pPr lvl="1"/>"#, "", "Second level"),
            ]
            .concat()),
        ))
        .with_fixed()
}

pub fn section_header_layout() -> Layout {
    Layout::new("Section Header")
        .with_type("secHead")
        .shape(placeholder(
            2,
            "Title 1",
            r#"type="title""#,
            "",
            Some(&paragraph("", "", "Click to edit Master title style")),
        ))
        .shape(placeholder(
            3,
            "Text Placeholder 2",
            r#"type="body" idx="1""#,
            "",
            Some(&paragraph(r#"<a:pPr><a:buNone/></a:pPr>"#, "", "Edit Master text styles")),
        ))
        .with_fixed()
}

pub fn two_content_layout() -> Layout {
    Layout::new("Two Content")
        .with_type("twoObj")
        .shape(placeholder(
            2,
            "Title 1",
            r#"type="title""#,
            "",
            Some(&paragraph("", "", "Click to edit Master title style")),
        ))
        .shape(placeholder(
            3,
            "Content Placeholder 2",
            r#"sz="half" idx="1""#,
            &xfrm(838200, 1825625, 5181600, 4351338),
            Some(&paragraph(r#"<a:pPr lvl="0"/>"#, "", "Left")),
        ))
        .shape(placeholder(
            4,
            "Content Placeholder 3",
            r#"sz="half" idx="2""#,
            &xfrm(6172200, 1825625, 5181600, 4351338),
            Some(&paragraph(r#"<a:pPr lvl="0"/>"#, "", "Right")),
        ))
        .with_fixed()
}

pub fn blank_layout() -> Layout {
    Layout::new("Blank").with_type("blank").with_fixed()
}

pub fn standard_layouts() -> Vec<Layout> {
    vec![
        title_slide_layout(),
        title_and_content_layout(),
        section_header_layout(),
        two_content_layout(),
        blank_layout(),
    ]
}

/// Writes a minimal but complete presentation package in memory.
#[derive(Clone, Debug)]
pub struct TemplateBuilder {
    masters: Vec<Vec<Layout>>,
    theme: Option<String>,
    tx_styles: String,
    master_shapes: Vec<String>,
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self {
            masters: Vec::new(),
            theme: Some(OFFICE_THEME.to_string()),
            tx_styles: DEFAULT_TX_STYLES.to_string(),
            master_shapes: Vec::new(),
        }
    }

    pub fn master(mut self, layouts: Vec<Layout>) -> Self {
        self.masters.push(layouts);
        self
    }

    pub fn theme(mut self, theme: &str) -> Self {
        self.theme = Some(theme.to_string());
        self
    }

    pub fn without_theme(mut self) -> Self {
        self.theme = None;
        self
    }

    pub fn tx_styles(mut self, tx_styles: &str) -> Self {
        self.tx_styles = tx_styles.to_string();
        self
    }

    pub fn master_shape(mut self, xml: impl Into<String>) -> Self {
        self.master_shapes.push(xml.into());
        self
    }

    fn master_xml(&self, layout_rids: &[String]) -> String {
        let layout_ids: String = layout_rids
            .iter()
            .enumerate()
            .map(|(i, rid)| {
                format!(
                    r#"<p:sldLayoutId id="{}" r:id="{rid}"/>"#,
                    2147483649u64 + i as u64
                )
            })
            .collect();
        let shapes = [
            placeholder(
                2,
                "Title Placeholder 1",
                r#"type="title""#,
                &xfrm(838200, 365125, 10515600, 1325563),
                Some(&paragraph("", "", "Click to edit Master title style")),
            ),
            placeholder(
                3,
                "Text Placeholder 2",
                r#"type="body" idx="1""#,
                &xfrm(838200, 1825625, 10515600, 4351338),
                Some(&paragraph(r#"<a:pPr lvl="0"/>"#, "", "Edit Master text styles")),
            ),
            placeholder(
                4,
                "Footer Placeholder 4",
                r#"type="ftr" sz="quarter" idx="3""#,
                &xfrm(4038600, 6356350, 4114800, 365125),
                Some("<a:p/>"),
            ),
        ]
        .concat();
        format!(
            r#"{XML_DECL}<p:sldMaster {NS}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}{}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst>{layout_ids}</p:sldLayoutIdLst>{}</p:sldMaster>"#,
            self.master_shapes.concat(),
            self.tx_styles
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut parts: Vec<(String, String)> = Vec::new();
        let mut overrides = Vec::new();
        let mut pres_rels = Vec::new();
        let mut master_ids = String::new();

        let mut layout_number = 0;
        for (m, layouts) in self.masters.iter().enumerate() {
            let master_number = m + 1;
            let master_part = format!("ppt/slideMasters/slideMaster{master_number}.xml");
            let mut master_rels = Vec::new();
            let mut layout_rids = Vec::new();

            for layout in layouts {
                layout_number += 1;
                let layout_part = format!("ppt/slideLayouts/slideLayout{layout_number}.xml");
                let rid = format!("rId{}", layout_rids.len() + 1);
                master_rels.push(relationship(
                    &rid,
                    "slideLayout",
                    &format!("../slideLayouts/slideLayout{layout_number}.xml"),
                ));
                layout_rids.push(rid);
                parts.push((layout_part.clone(), layout.to_xml()));
                parts.push((
                    format!("ppt/slideLayouts/_rels/slideLayout{layout_number}.xml.rels"),
                    relationships(&[relationship(
                        "rId1",
                        "slideMaster",
                        &format!("../slideMasters/slideMaster{master_number}.xml"),
                    )]),
                ));
                overrides.push((
                    layout_part,
                    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml",
                ));
            }

            if self.theme.is_some() {
                master_rels.push(relationship(
                    &format!("rId{}", layout_rids.len() + 1),
                    "theme",
                    "../theme/theme1.xml",
                ));
            }
            parts.push((master_part.clone(), self.master_xml(&layout_rids)));
            parts.push((
                format!("ppt/slideMasters/_rels/slideMaster{master_number}.xml.rels"),
                relationships(&master_rels),
            ));
            overrides.push((
                master_part,
                "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml",
            ));

            let rid = format!("rId{}", pres_rels.len() + 1);
            master_ids.push_str(&format!(
                r#"<p:sldMasterId id="{}" r:id="{rid}"/>"#,
                2147483648u64 + (m as u64) * 100
            ));
            pres_rels.push(relationship(
                &rid,
                "slideMaster",
                &format!("slideMasters/slideMaster{master_number}.xml"),
            ));
        }

        if let Some(theme) = &self.theme {
            parts.push(("ppt/theme/theme1.xml".to_string(), format!("{XML_DECL}{theme}")));
            overrides.push((
                "ppt/theme/theme1.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.theme+xml",
            ));
            pres_rels.push(relationship(
                &format!("rId{}", pres_rels.len() + 1),
                "theme",
                "theme/theme1.xml",
            ));
        }

        let presentation = format!(
            r#"{XML_DECL}<p:presentation {NS} saveSubsetFonts="1"><p:sldMasterIdLst>{master_ids}</p:sldMasterIdLst><p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/><p:defaultTextStyle/></p:presentation>"#
        );
        parts.push(("ppt/presentation.xml".to_string(), presentation));
        parts.push((
            "ppt/_rels/presentation.xml.rels".to_string(),
            relationships(&pres_rels),
        ));
        overrides.push((
            "ppt/presentation.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
        ));

        let override_xml: String = overrides
            .iter()
            .map(|(part, ct)| format!(r#"<Override PartName="/{part}" ContentType="{ct}"/>"#))
            .collect();
        let content_types = format!(
            r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{override_xml}</Types>"#
        );
        let root_rels = format!(
            r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
        );

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        let mut write = |name: &str, data: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        };
        write("[Content_Types].xml", &content_types);
        write("_rels/.rels", &root_rels);
        for (name, data) in &parts {
            write(name, data);
        }
        zip.finish().unwrap().into_inner()
    }

    pub fn open(&self) -> Presentation {
        init_logging();
        Presentation::from_bytes(&self.build()).expect("fixture opens")
    }
}

/// Route the crate's log output through the test harness (`RUST_LOG=debug`).
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn relationship(id: &str, kind: &str, target: &str) -> String {
    format!(
        r#"<Relationship Id="{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/{kind}" Target="{target}"/>"#
    )
}

fn relationships(rels: &[String]) -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        rels.concat()
    )
}

/// Element name, sorted attributes and children, for structural comparison.
pub fn structure(node: roxmltree::Node) -> String {
    let mut attrs: Vec<String> = node
        .attributes()
        .map(|a| format!("{}={}", a.name(), a.value()))
        .collect();
    attrs.sort();
    let children: Vec<String> = node
        .children()
        .filter(|c| c.is_element())
        .map(structure)
        .collect();
    format!(
        "{}[{}]({})",
        node.tag_name().name(),
        attrs.join(","),
        children.join(";")
    )
}

fn pml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(PML_NS))
}

/// The placeholder shape with slot `idx` in a slide/layout part.
pub fn find_placeholder<'a>(
    doc: &'a roxmltree::Document<'a>,
    idx: u32,
) -> Option<roxmltree::Node<'a, 'a>> {
    doc.descendants()
        .filter(|n| n.tag_name().name() == "sp" && n.tag_name().namespace() == Some(PML_NS))
        .find(|sp| {
            let ph = pml(*sp, "nvSpPr")
                .and_then(|nv| pml(nv, "nvPr"))
                .and_then(|nv| pml(nv, "ph"));
            ph.is_some_and(|ph| {
                ph.attribute("idx")
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(0)
                    == idx
            })
        })
}

/// Paragraph nodes of a placeholder's text body.
pub fn paragraphs<'a>(shape: roxmltree::Node<'a, 'a>) -> Vec<roxmltree::Node<'a, 'a>> {
    pml(shape, "txBody")
        .map(|body| {
            body.children()
                .filter(|n| n.tag_name().name() == "p" && n.tag_name().namespace() == Some(DML_NS))
                .collect()
        })
        .unwrap_or_default()
}

pub fn child<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(DML_NS))
}

/// Text of every run in a paragraph.
pub fn run_texts(para: roxmltree::Node) -> Vec<String> {
    para.children()
        .filter(|n| n.tag_name().name() == "r")
        .map(|r| {
            child(r, "t")
                .and_then(|t| t.text())
                .unwrap_or("")
                .to_string()
        })
        .collect()
}
