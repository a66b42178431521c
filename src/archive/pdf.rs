use anyhow::{Result, anyhow};
use lopdf::Document;

/// Extract plain text from the first `max_pages` pages of a PDF held in memory.
pub fn extract_leading_pages(bytes: &[u8], max_pages: usize) -> Result<String> {
    let doc = Document::load_mem(bytes).map_err(|e| anyhow!("unreadable PDF: {e}"))?;
    // get_pages is keyed by 1-based page number, in order
    let pages: Vec<u32> = doc.get_pages().keys().copied().take(max_pages).collect();
    if pages.is_empty() {
        return Ok(String::new());
    }
    doc.extract_text(&pages)
        .map_err(|e| anyhow!("text extraction failed: {e}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// A PDF whose page `n` shows the text `P{n:02}`.
    pub(crate) fn sample_pdf(page_count: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for n in 1..=page_count {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("P{n:02}"))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn stops_after_max_pages() {
        let text = extract_leading_pages(&sample_pdf(12), 10).unwrap();
        assert!(text.contains("P01"));
        assert!(text.contains("P10"));
        assert!(!text.contains("P11"));
        assert!(!text.contains("P12"));
    }

    #[test]
    fn short_documents_read_fully() {
        let text = extract_leading_pages(&sample_pdf(2), 10).unwrap();
        assert!(text.contains("P02"));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(extract_leading_pages(b"not a pdf", 10).is_err());
    }
}
