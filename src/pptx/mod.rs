pub(crate) mod package;
pub(crate) mod placeholder;
pub(crate) mod shapes;
pub(crate) mod styles;
pub(crate) mod text;
pub(crate) mod theme;

use std::path::Path;

use crate::error::Error;
use crate::xml::Element;

pub use package::{Package, Relationship};
use package::{
    new_relationships_tree, next_relationship_id, relationship_element, relative_target,
    rels_part_name, resolve_target,
};

pub(crate) const PML_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub(crate) const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub(crate) const CT_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const RT_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const RT_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const RT_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

pub(crate) fn pml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(PML_NS))
}

pub(crate) fn dml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(DML_NS))
}

pub(crate) fn is_pml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(PML_NS)
}

pub(crate) fn attr_i64(node: roxmltree::Node, attr: &str) -> Option<i64> {
    node.attribute(attr).and_then(|v| v.parse::<i64>().ok())
}

/// One slide master and the layouts it owns, in `sldLayoutIdLst` order.
#[derive(Clone, Debug)]
pub struct MasterPart {
    pub part: String,
    pub theme_part: Option<String>,
    pub layouts: Vec<String>,
}

/// An opened presentation package with its master/layout hierarchy resolved.
///
/// All parts live in memory; nothing is written back until [`Presentation::to_bytes`].
#[derive(Clone, Debug)]
pub struct Presentation {
    package: Package,
    presentation_part: String,
    masters: Vec<MasterPart>,
}

impl Presentation {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
                std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
            ),
            _ => Error::Io(e),
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_package(Package::from_bytes(bytes)?)
    }

    pub fn from_package(package: Package) -> Result<Self, Error> {
        let presentation_part = package
            .relationships("")
            .into_iter()
            .find(|r| r.rel_type == RT_OFFICE_DOCUMENT)
            .map(|r| resolve_target("", &r.target))
            .unwrap_or_else(|| "ppt/presentation.xml".to_string());

        let xml_content = package.part_text(&presentation_part).ok_or_else(|| {
            Error::InvalidPptx(format!(
                "missing {presentation_part} (is this a PPTX file?)"
            ))
        })?;
        let xml = roxmltree::Document::parse(xml_content)?;
        let pres_rels = package.relationships(&presentation_part);

        let mut masters = Vec::new();
        let master_ids = pml(xml.root_element(), "sldMasterIdLst")
            .into_iter()
            .flat_map(|lst| lst.children())
            .filter(|n| is_pml(*n, "sldMasterId"));
        for master_id in master_ids {
            let Some(rid) = master_id.attribute((REL_NS, "id")) else {
                continue;
            };
            let Some(rel) = pres_rels.iter().find(|r| r.id == rid) else {
                log::warn!("Slide master relationship {rid} does not resolve, skipping");
                continue;
            };
            let part = resolve_target(&presentation_part, &rel.target);
            if !package.has_part(&part) {
                log::warn!("Slide master part {part} is missing, skipping");
                continue;
            }
            masters.push(read_master_part(&package, part));
        }

        log::debug!(
            "Opened presentation with {} master(s), {} layout(s)",
            masters.len(),
            masters.iter().map(|m| m.layouts.len()).sum::<usize>()
        );

        Ok(Self {
            package,
            presentation_part,
            masters,
        })
    }

    pub fn masters(&self) -> &[MasterPart] {
        &self.masters
    }

    pub fn layout_count(&self) -> usize {
        self.masters.iter().map(|m| m.layouts.len()).sum()
    }

    pub fn layout_part(&self, master_index: usize, local_index: usize) -> Option<&str> {
        self.masters
            .get(master_index)
            .and_then(|m| m.layouts.get(local_index))
            .map(String::as_str)
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn part_text(&self, name: &str) -> Option<&str> {
        self.package.part_text(name)
    }

    /// The shared theme: the one related to the first master, else the first theme part.
    pub fn theme_part(&self) -> Option<&str> {
        self.masters
            .first()
            .and_then(|m| m.theme_part.as_deref())
            .or_else(|| {
                self.package
                    .part_names()
                    .find(|n| n.starts_with("ppt/theme/") && n.ends_with(".xml"))
            })
    }

    /// Slide size in EMU from `p:sldSz`.
    pub fn slide_size(&self) -> Option<(i64, i64)> {
        let xml = roxmltree::Document::parse(self.part_text(&self.presentation_part)?).ok()?;
        let size = pml(xml.root_element(), "sldSz")?;
        Some((attr_i64(size, "cx")?, attr_i64(size, "cy")?))
    }

    /// Slide parts in presentation order.
    pub fn slide_parts(&self) -> Vec<String> {
        let Some(xml_content) = self.part_text(&self.presentation_part) else {
            return Vec::new();
        };
        let Ok(xml) = roxmltree::Document::parse(xml_content) else {
            return Vec::new();
        };
        let rels = self.package.relationships(&self.presentation_part);
        pml(xml.root_element(), "sldIdLst")
            .into_iter()
            .flat_map(|lst| lst.children())
            .filter(|n| is_pml(*n, "sldId"))
            .filter_map(|n| n.attribute((REL_NS, "id")))
            .filter_map(|rid| rels.iter().find(|r| r.id == rid))
            .map(|r| resolve_target(&self.presentation_part, &r.target))
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        self.package.to_bytes()
    }

    /// Register a new slide part built on `layout_part` and append it to the slide list.
    pub(crate) fn add_slide_part(
        &mut self,
        slide_tree: &Element,
        layout_part: &str,
    ) -> Result<String, Error> {
        let next_number = self
            .package
            .part_names()
            .filter_map(|n| n.strip_prefix("ppt/slides/slide"))
            .filter_map(|n| n.strip_suffix(".xml"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let slide_part = format!("ppt/slides/slide{next_number}.xml");

        self.package.set_part_tree(&slide_part, slide_tree)?;

        let mut slide_rels = new_relationships_tree();
        let layout_rel = relationship_element(
            &slide_rels,
            "rId1",
            RT_SLIDE_LAYOUT,
            &relative_target(&slide_part, layout_part),
        );
        slide_rels.push(layout_rel);
        self.package
            .set_part_tree(&rels_part_name(&slide_part), &slide_rels)?;

        let mut content_types = self.package.part_tree("[Content_Types].xml")?;
        let override_el = Element::new(CT_NS, content_types.prefix.as_deref(), "Override")
            .with_attr("PartName", format!("/{slide_part}"))
            .with_attr("ContentType", CT_SLIDE);
        content_types.push(override_el);
        self.package
            .set_part_tree("[Content_Types].xml", &content_types)?;

        let pres_rels_part = rels_part_name(&self.presentation_part);
        let mut pres_rels = if self.package.has_part(&pres_rels_part) {
            self.package.part_tree(&pres_rels_part)?
        } else {
            new_relationships_tree()
        };
        let rid = next_relationship_id(&pres_rels);
        let slide_rel = relationship_element(
            &pres_rels,
            &rid,
            RT_SLIDE,
            &relative_target(&self.presentation_part, &slide_part),
        );
        pres_rels.push(slide_rel);
        self.package.set_part_tree(&pres_rels_part, &pres_rels)?;

        let mut pres = self.package.part_tree(&self.presentation_part)?;
        append_slide_id(&mut pres, &rid);
        self.package.set_part_tree(&self.presentation_part, &pres)?;

        Ok(slide_part)
    }
}

fn read_master_part(package: &Package, part: String) -> MasterPart {
    let rels = package.relationships(&part);
    let theme_part = rels
        .iter()
        .find(|r| r.rel_type.ends_with("/theme"))
        .map(|r| resolve_target(&part, &r.target));

    let listed: Vec<String> = package
        .part_text(&part)
        .and_then(|text| roxmltree::Document::parse(text).ok())
        .map(|xml| {
            pml(xml.root_element(), "sldLayoutIdLst")
                .into_iter()
                .flat_map(|lst| lst.children())
                .filter(|n| is_pml(*n, "sldLayoutId"))
                .filter_map(|n| n.attribute((REL_NS, "id")))
                .filter_map(|rid| rels.iter().find(|r| r.id == rid))
                .map(|r| resolve_target(&part, &r.target))
                .collect()
        })
        .unwrap_or_default();

    // Without a layout list, fall back to relationship order.
    let layouts = if listed.is_empty() {
        rels.iter()
            .filter(|r| r.rel_type == RT_SLIDE_LAYOUT)
            .map(|r| resolve_target(&part, &r.target))
            .collect()
    } else {
        listed
    };
    let layouts = layouts
        .into_iter()
        .filter(|l| {
            let present = package.has_part(l);
            if !present {
                log::warn!("Layout part {l} referenced by {part} is missing");
            }
            present
        })
        .collect();

    MasterPart {
        part,
        theme_part,
        layouts,
    }
}

fn append_slide_id(pres: &mut Element, rid: &str) {
    let r_prefix = match pres.declared_prefix(REL_NS) {
        Some(p) => p.to_string(),
        None => {
            pres.declare(Some("r"), REL_NS);
            "r".to_string()
        }
    };

    if pres.position(PML_NS, "sldIdLst").is_none() {
        // sldIdLst follows the master lists and precedes sldSz.
        let insert_at = ["handoutMasterIdLst", "notesMasterIdLst", "sldMasterIdLst"]
            .iter()
            .find_map(|name| pres.position(PML_NS, name))
            .map(|i| i + 1)
            .unwrap_or(0);
        let list = pres.sibling("sldIdLst");
        pres.insert(insert_at, list);
    }

    let Some(list) = pres.child_mut(PML_NS, "sldIdLst") else {
        return;
    };
    let next_id = list
        .elements()
        .filter_map(|e| e.attr("id"))
        .filter_map(|id| id.parse::<u32>().ok())
        .max()
        .unwrap_or(255)
        .max(255)
        + 1;
    let entry = list
        .sibling("sldId")
        .with_attr("id", next_id.to_string())
        .with_attr(&format!("{r_prefix}:id"), rid);
    list.push(entry);
}
