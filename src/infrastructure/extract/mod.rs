//! Format-specific text extraction.
//!
//! [`FormatDispatcher`] picks a converter from the file extension; each
//! converter maps raw bytes to plain text.

pub mod pdf;
pub mod slides;
pub mod spreadsheet;

use tracing::{debug, instrument};

use crate::domain::{ports::TextExtractor, Document, DocumentFormat, DomainError};

/// Runs the converter for `format` over `bytes`.
pub fn extract_text(format: DocumentFormat, bytes: &[u8]) -> Result<String, String> {
    match format {
        DocumentFormat::Pdf => pdf::extract(bytes),
        DocumentFormat::Spreadsheet(kind) => spreadsheet::extract(bytes, kind),
        DocumentFormat::SlideDeck => slides::extract(bytes),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDispatcher;

impl FormatDispatcher {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for FormatDispatcher {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    fn extract(&self, name: &str, bytes: &[u8]) -> Result<Document, DomainError> {
        let format = DocumentFormat::from_file_name(name)?;
        let text =
            extract_text(format, bytes).map_err(|reason| DomainError::extraction(name, reason))?;

        debug!(%format, chars = text.len(), "extracted document text");

        let extension = std::path::Path::new(name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let metadata = serde_json::json!({
            "source": name,
            "extension": extension,
            "type": format.content_type(),
            "bytes": bytes.len(),
        });
        Ok(Document::new(name, format, text).with_metadata(metadata))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! In-memory sample files for extractor tests.

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// A PDF with one line of Courier text per page.
    pub fn pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn escape(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }

    /// Wraps raw shape markup into a slide part.
    pub fn slide_xml(shapes: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr/><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#
        )
    }

    fn text_shape(text: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="TextBox"/></p:nvSpPr><p:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
            escape(text)
        )
    }

    /// A presentation whose slides hold one text box per string.
    pub fn pptx(slides: &[&[&str]]) -> Vec<u8> {
        let order: Vec<usize> = (0..slides.len()).collect();
        pptx_with_order(slides, &order)
    }

    /// Like [`pptx`], but `order` lists slide file indices in presentation order.
    pub fn pptx_with_order(slides: &[&[&str]], order: &[usize]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let mut add = |name: &str, body: &str| {
            writer.start_file(name, options.clone()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        };

        add(
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#,
        );

        let ids: String = order
            .iter()
            .enumerate()
            .map(|(pos, i)| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + pos, i + 2))
            .collect();
        add(
            "ppt/presentation.xml",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
            ),
        );

        let rels: String = (0..slides.len())
            .map(|i| {
                format!(
                    r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
                    i + 2,
                    i + 1
                )
            })
            .collect();
        add(
            "ppt/_rels/presentation.xml.rels",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
            ),
        );

        for (i, texts) in slides.iter().enumerate() {
            let shapes: String = texts.iter().map(|t| text_shape(t)).collect();
            add(&format!("ppt/slides/slide{}.xml", i + 1), &slide_xml(&shapes));
        }

        writer.finish().unwrap().into_inner()
    }
    /// A single-sheet workbook. Cells that parse as numbers are stored as
    /// numeric values, everything else as inline strings.
    pub fn xlsx(rows: &[&[&str]]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let mut add = |name: &str, body: &str| {
            writer.start_file(name, options.clone()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        };

        add(
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#,
        );
        add(
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
        );
        add(
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        );
        add(
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
        );

        let data: String = rows
            .iter()
            .enumerate()
            .map(|(r, cells)| {
                let cells: String = cells
                    .iter()
                    .enumerate()
                    .map(|(c, value)| {
                        let at = format!("{}{}", (b'A' + c as u8) as char, r + 1);
                        if value.parse::<f64>().is_ok() {
                            format!(r#"<c r="{at}"><v>{value}</v></c>"#)
                        } else {
                            format!(r#"<c r="{at}" t="inlineStr"><is><t>{}</t></is></c>"#, escape(value))
                        }
                    })
                    .collect();
                format!(r#"<row r="{}">{cells}</row>"#, r + 1)
            })
            .collect();
        add(
            "xl/worksheets/sheet1.xml",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
            ),
        );

        writer.finish().unwrap().into_inner()
    }
}
