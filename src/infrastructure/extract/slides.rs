//! Slide deck converter for Office Open XML presentations.
//!
//! Slides are read in presentation order (`p:sldIdLst`), shapes in document
//! order. Every top-level `p:sp` yields its text followed by a newline.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const PRESENTATION: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Vertical tab, the line-break marker inside a paragraph.
const LINE_BREAK: char = '\u{b}';

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub fn extract(bytes: &[u8]) -> Result<String, String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("not an Office Open XML presentation: {e}"))?;

    let presentation = read_entry(&mut archive, PRESENTATION)?;
    let targets = relationship_targets(&read_entry(&mut archive, PRESENTATION_RELS)?)?;

    let mut text = String::new();
    for rel_id in slide_relationship_ids(&presentation)? {
        let target = targets
            .get(&rel_id)
            .ok_or_else(|| format!("slide relationship {rel_id} has no target"))?;
        let slide = read_entry(&mut archive, &resolve_target(target))?;
        for shape in shape_texts(&slide)? {
            text.push_str(&shape);
            text.push('\n');
        }
    }
    Ok(text)
}

fn read_entry(archive: &mut Archive<'_>, name: &str) -> Result<String, String> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| format!("missing {name}: {e}"))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| format!("unreadable {name}: {e}"))?;
    Ok(xml)
}

/// Relationship targets are relative to `ppt/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{target}"),
    }
}

fn xml_error(e: impl std::fmt::Display) -> String {
    format!("malformed presentation XML: {e}")
}

/// Maps relationship id to target path.
fn relationship_targets(xml: &str) -> Result<HashMap<String, String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(xml_error)?;
                    let value = attr.unescape_value().map_err(xml_error)?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = Some(value),
                        b"Target" => target = Some(value),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Relationship ids of the slides, in presentation order.
fn slide_relationship_ids(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                for attr in e.attributes() {
                    let attr = attr.map_err(xml_error)?;
                    // `r:id`, not the numeric `id`.
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        ids.push(attr.unescape_value().map_err(xml_error)?.into_owned());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

#[derive(Default)]
struct ShapeText {
    paragraphs: Vec<String>,
    in_run_text: bool,
}

impl ShapeText {
    fn push_str(&mut self, s: &str) {
        match self.paragraphs.last_mut() {
            Some(paragraph) => paragraph.push_str(s),
            None => self.paragraphs.push(s.to_string()),
        }
    }

    fn finish(self) -> String {
        self.paragraphs.join("\n")
    }
}

fn is_top_level(stack: &[Vec<u8>]) -> bool {
    matches!(stack, [.., parent, tree] if parent.as_slice() == b"cSld" && tree.as_slice() == b"spTree")
}

/// Text of each top-level shape on one slide. Group members, pictures and
/// graphic frames are skipped.
fn shape_texts(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut shapes = Vec::new();
    let mut current: Option<ShapeText> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"sp" && is_top_level(&stack) {
                    current = Some(ShapeText::default());
                } else if let Some(shape) = current.as_mut() {
                    match name.as_slice() {
                        b"p" => shape.paragraphs.push(String::new()),
                        b"t" => shape.in_run_text = true,
                        _ => {}
                    }
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = e.local_name();
                if let Some(shape) = current.as_mut() {
                    match name.as_ref() {
                        b"p" => shape.paragraphs.push(String::new()),
                        b"br" => shape.push_str(&LINE_BREAK.to_string()),
                        _ => {}
                    }
                } else if name.as_ref() == b"sp" && is_top_level(&stack) {
                    shapes.push(String::new());
                }
            }
            Event::Text(t) => {
                if let Some(shape) = current.as_mut().filter(|s| s.in_run_text) {
                    shape.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(t) => {
                if let Some(shape) = current.as_mut().filter(|s| s.in_run_text) {
                    shape.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => {
                stack.pop();
                let name = e.local_name();
                if let Some(shape) = current.as_mut() {
                    if name.as_ref() == b"t" {
                        shape.in_run_text = false;
                    }
                }
                if name.as_ref() == b"sp" && is_top_level(&stack) {
                    if let Some(shape) = current.take() {
                        shapes.push(shape.finish());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::extract::fixtures;

    #[test]
    fn test_slides_and_shapes_in_order() {
        let bytes = fixtures::pptx(&[&["Quarterly review", "Revenue up 4%"], &["Next steps"]]);
        let text = extract(&bytes).unwrap();
        assert_eq!(text, "Quarterly review\nRevenue up 4%\nNext steps\n");
    }

    #[test]
    fn test_presentation_order_not_file_order() {
        // slide2.xml is listed first in sldIdLst
        let bytes = fixtures::pptx_with_order(&[&["first file"], &["second file"]], &[1, 0]);
        let text = extract(&bytes).unwrap();
        assert_eq!(text, "second file\nfirst file\n");
    }

    #[test]
    fn test_shape_text_joins_paragraphs_and_breaks() {
        let slide = fixtures::slide_xml(
            r#"<p:sp><p:txBody><a:p><a:r><a:t>Line &amp; one</a:t></a:r><a:br/><a:r><a:t>same para</a:t></a:r></a:p><a:p><a:r><a:t>Second</a:t></a:r></a:p></p:txBody></p:sp>"#,
        );
        let shapes = shape_texts(&slide).unwrap();
        assert_eq!(shapes, vec!["Line & one\u{b}same para\nSecond".to_string()]);
    }

    #[test]
    fn test_shape_without_text_body_is_empty_line() {
        let slide = fixtures::slide_xml(
            r#"<p:sp><p:nvSpPr/></p:sp><p:pic><p:blipFill/></p:pic><p:grpSp><p:sp><p:txBody><a:p><a:r><a:t>grouped</a:t></a:r></a:p></p:txBody></p:sp></p:grpSp>"#,
        );
        let shapes = shape_texts(&slide).unwrap();
        assert_eq!(shapes, vec![String::new()]);
    }

    #[test]
    fn test_empty_deck() {
        let bytes = fixtures::pptx(&[]);
        assert_eq!(extract(&bytes).unwrap(), "");
    }

    #[test]
    fn test_legacy_binary_is_error() {
        let err = extract(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]).unwrap_err();
        assert!(err.starts_with("not an Office Open XML presentation"));
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("/ppt/slides/slide1.xml"), "ppt/slides/slide1.xml");
    }
}
