use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;

use crate::error::Error;
use crate::xml::{self, Element};

use super::PKG_REL_NS;

/// Largest part the reader accepts. Declared entry sizes are not trusted.
const MAX_PART_SIZE: u64 = 256 * 1024 * 1024;

/// Every entry of the container, kept in archive order.
#[derive(Clone, Debug, Default)]
pub struct Package {
    entries: Vec<(String, Vec<u8>)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::read_limited(bytes, MAX_PART_SIZE)
    }

    fn read_limited(bytes: &[u8], max_part_size: u64) -> Result<Self, Error> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|_| Error::InvalidPptx("file is not a ZIP archive".into()))?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry.by_ref().take(max_part_size + 1).read_to_end(&mut data)?;
            if data.len() as u64 > max_part_size {
                return Err(Error::InvalidPptx(format!(
                    "part {name} exceeds {max_part_size} bytes"
                )));
            }
            entries.push((name, data));
        }
        Ok(Self { entries })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    pub fn part_text(&self, name: &str) -> Option<&str> {
        let data = self.part(name)?;
        let text = std::str::from_utf8(data).ok()?;
        Some(text.strip_prefix('\u{feff}').unwrap_or(text))
    }

    /// Replace a part, or append it if the package does not have it yet.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = data,
            None => self.entries.push((name.to_string(), data)),
        }
    }

    pub fn relationships(&self, source_part: &str) -> Vec<Relationship> {
        self.part_text(&rels_part_name(source_part))
            .map(parse_relationships)
            .unwrap_or_default()
    }

    /// Lift a part into an editable tree.
    pub fn part_tree(&self, name: &str) -> Result<Element, Error> {
        let text = self
            .part_text(name)
            .ok_or_else(|| Error::InvalidPptx(format!("missing part {name}")))?;
        xml::parse(text)
    }

    pub fn set_part_tree(&mut self, name: &str, tree: &Element) -> Result<(), Error> {
        let data = tree.to_xml()?;
        self.set_part(name, data);
        Ok(())
    }
}

pub fn parse_relationships(xml_content: &str) -> Vec<Relationship> {
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        log::warn!("Unparsable relationship part, ignoring it");
        return Vec::new();
    };
    xml.root_element()
        .children()
        .filter(|n| n.tag_name().name() == "Relationship")
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                rel_type: n.attribute("Type").unwrap_or("").to_string(),
                target: n.attribute("Target")?.to_string(),
            })
        })
        .collect()
}

/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`
pub fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target against the directory of its source part.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if part_dir(source_part).is_empty() => target.to_string(),
        None => format!("{}/{}", part_dir(source_part), target),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// The target to write in `from_part`'s relationships to reach `to_part`.
pub fn relative_target(from_part: &str, to_part: &str) -> String {
    let from: Vec<&str> = part_dir(from_part)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let to: Vec<&str> = to_part.split('/').collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    parts.join("/")
}

/// A fresh relationship id not used in `rels`.
pub fn next_relationship_id(rels: &Element) -> String {
    let max = rels
        .elements()
        .filter_map(|r| r.attr("Id"))
        .filter_map(|id| id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

pub fn new_relationships_tree() -> Element {
    let mut root = Element::new(PKG_REL_NS, None, "Relationships");
    root.declare(None, PKG_REL_NS);
    root
}

pub fn relationship_element(rels: &Element, id: &str, rel_type: &str, target: &str) -> Element {
    rels.sibling("Relationship")
        .with_attr("Id", id)
        .with_attr("Type", rel_type)
        .with_attr("Target", target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_parent_relative_targets() {
        assert_eq!(
            resolve_target(
                "ppt/slideMasters/slideMaster1.xml",
                "../slideLayouts/slideLayout3.xml"
            ),
            "ppt/slideLayouts/slideLayout3.xml"
        );
        assert_eq!(
            resolve_target("ppt/presentation.xml", "slideMasters/slideMaster1.xml"),
            "ppt/slideMasters/slideMaster1.xml"
        );
        assert_eq!(
            resolve_target("ppt/presentation.xml", "/ppt/theme/theme1.xml"),
            "ppt/theme/theme1.xml"
        );
        assert_eq!(resolve_target("", "ppt/presentation.xml"), "ppt/presentation.xml");
    }

    #[test]
    fn relative_target_walks_up_to_common_dir() {
        assert_eq!(
            relative_target("ppt/slides/slide4.xml", "ppt/slideLayouts/slideLayout2.xml"),
            "../slideLayouts/slideLayout2.xml"
        );
        assert_eq!(
            relative_target("ppt/presentation.xml", "ppt/slides/slide4.xml"),
            "slides/slide4.xml"
        );
    }

    fn push_u16(out: &mut Vec<u8>, v: u16) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    fn push_u32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    /// A stored one-entry archive whose central directory claims a zip64
    /// uncompressed size far beyond the five bytes it holds.
    fn archive_with_inflated_size() -> Vec<u8> {
        let name = b"a.txt";
        let data = b"hello";
        let crc = 0x3610_A686;

        let mut out = Vec::new();
        push_u32(&mut out, 0x0403_4B50);
        push_u16(&mut out, 20);
        push_u16(&mut out, 0);
        push_u16(&mut out, 0);
        push_u16(&mut out, 0);
        push_u16(&mut out, 0x21);
        push_u32(&mut out, crc);
        push_u32(&mut out, data.len() as u32);
        push_u32(&mut out, data.len() as u32);
        push_u16(&mut out, name.len() as u16);
        push_u16(&mut out, 0);
        out.extend_from_slice(name);
        out.extend_from_slice(data);

        let cd_offset = out.len() as u32;
        push_u32(&mut out, 0x0201_4B50);
        push_u16(&mut out, 45);
        push_u16(&mut out, 45);
        push_u16(&mut out, 0);
        push_u16(&mut out, 0);
        push_u16(&mut out, 0);
        push_u16(&mut out, 0x21);
        push_u32(&mut out, crc);
        push_u32(&mut out, data.len() as u32);
        push_u32(&mut out, u32::MAX);
        push_u16(&mut out, name.len() as u16);
        push_u16(&mut out, 12);
        push_u16(&mut out, 0);
        push_u16(&mut out, 0);
        push_u16(&mut out, 0);
        push_u32(&mut out, 0);
        push_u32(&mut out, 0);
        out.extend_from_slice(name);
        push_u16(&mut out, 0x0001);
        push_u16(&mut out, 8);
        out.extend_from_slice(&(1u64 << 61).to_le_bytes());
        let cd_size = out.len() as u32 - cd_offset;

        push_u32(&mut out, 0x0605_4B50);
        push_u16(&mut out, 0);
        push_u16(&mut out, 0);
        push_u16(&mut out, 1);
        push_u16(&mut out, 1);
        push_u32(&mut out, cd_size);
        push_u32(&mut out, cd_offset);
        push_u16(&mut out, 0);
        out
    }

    #[test]
    fn declared_entry_size_is_not_trusted() {
        // must return instead of trying to allocate 2^61 bytes
        match Package::from_bytes(&archive_with_inflated_size()) {
            Ok(package) => assert_eq!(package.part("a.txt"), Some(&b"hello"[..])),
            Err(e) => assert!(!e.to_string().is_empty()),
        }
    }

    #[test]
    fn oversized_part_is_rejected() {
        let mut package = Package::default();
        package.set_part("ppt/media/big.bin", vec![7u8; 64]);
        package.set_part("ppt/small.xml", b"<a/>".to_vec());
        let bytes = package.to_bytes().unwrap();

        let err = Package::read_limited(&bytes, 32).unwrap_err();
        assert!(matches!(err, Error::InvalidPptx(ref msg) if msg.contains("ppt/media/big.bin")));

        let read = Package::read_limited(&bytes, 64).unwrap();
        assert_eq!(read.part("ppt/media/big.bin").map(<[u8]>::len), Some(64));
        assert_eq!(read.part_text("ppt/small.xml"), Some("<a/>"));
    }

    #[test]
    fn rels_part_sits_beside_source() {
        assert_eq!(
            rels_part_name("ppt/presentation.xml"),
            "ppt/_rels/presentation.xml.rels"
        );
        assert_eq!(rels_part_name(""), "_rels/.rels");
    }
}
