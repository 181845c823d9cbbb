//! In-memory PDF documents for tests.

use crate::PdfEngineError;
use lopdf::{dictionary, Document, Object};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixturePage {
    pub width_pt: f32,
    pub height_pt: f32,
    pub rotate: i64,
}

impl FixturePage {
    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self { width_pt, height_pt, rotate: 0 }
    }

    pub fn rotated(mut self, degrees: i64) -> Self {
        self.rotate = degrees;
        self
    }
}

/// Serialize a document with one blank page per entry.
pub fn pdf_with_pages(pages: &[FixturePage]) -> Result<Vec<u8>, PdfEngineError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = pages
        .iter()
        .map(|page| {
            let mut dict = dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.width_pt),
                    Object::Real(page.height_pt),
                ],
            };
            if page.rotate != 0 {
                dict.set("Rotate", Object::Integer(page.rotate));
            }
            Object::Reference(doc.add_object(dict))
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => Object::Integer(kids.len() as i64),
            "Kids" => kids,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}

/// `count` US Letter pages.
///
/// # Panics
/// Panics if lopdf fails to serialize the document.
pub fn letter_pages(count: usize) -> Vec<u8> {
    pdf_with_pages(&vec![FixturePage::new(612.0, 792.0); count])
        .expect("letter fixture should serialize")
}
