use crate::error::IngestError;
use lopdf::Document;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
}

impl DocumentKind {
    /// Supported kinds are decided by extension alone, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str())?;
        if extension.eq_ignore_ascii_case("txt") {
            Some(Self::PlainText)
        } else if extension.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    /// Page text is trimmed. Pages without extractable text are left out,
    /// so an image-only PDF yields an empty list rather than an error.
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            let text = text.trim();
            if !text.is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text: text.to_string(),
                });
            }
        }

        Ok(pages)
    }
}

pub fn extract_page_texts(path: &Path) -> Result<Vec<PageText>, IngestError> {
    LopdfExtractor.extract_pages(path)
}

/// Reads the full text of a supported document. PDF pages are joined with
/// newlines. Unsupported extensions yield `Ok(None)`.
pub fn load_document_text(path: &Path) -> Result<Option<String>, IngestError> {
    match DocumentKind::from_path(path) {
        Some(DocumentKind::PlainText) => Ok(Some(fs::read_to_string(path)?)),
        Some(DocumentKind::Pdf) => {
            let pages = extract_page_texts(path)?;
            Ok(Some(
                pages
                    .into_iter()
                    .map(|page| page.text)
                    .collect::<Vec<_>>()
                    .join("\n"),
            ))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{extract_page_texts, load_document_text, DocumentKind};
    use crate::error::IngestError;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// Writes a PDF with one page per entry. An empty entry becomes a page
    /// whose content stream has no operations.
    pub(crate) fn write_pdf(path: &Path, pages: &[&str]) -> Result<(), lopdf::Error> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations }.encode()?;
            let content_id = document.add_object(Stream::new(dictionary! {}, content));
            let page_id = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        document.save(path)?;
        Ok(())
    }

    #[test]
    fn kind_is_detected_from_extension() {
        assert_eq!(
            DocumentKind::from_path(Path::new("leave.TXT")),
            Some(DocumentKind::PlainText)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("dir/handbook.Pdf")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(DocumentKind::from_path(Path::new("notes.docx")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn plain_text_is_read_verbatim() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("leave.txt");
        fs::write(&path, "Sick leave is 10 days per year.\n")?;

        let text = load_document_text(&path)?;
        assert_eq!(text.as_deref(), Some("Sick leave is 10 days per year.\n"));
        Ok(())
    }

    #[test]
    fn unsupported_files_are_not_read() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("sheet.csv");
        fs::write(&path, "a,b,c")?;

        assert!(load_document_text(&path)?.is_none());
        Ok(())
    }

    #[test]
    fn pdf_pages_are_joined_and_blank_pages_dropped() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("handbook.pdf");
        write_pdf(
            &path,
            &[
                "Sick leave is 10 days per year.",
                "",
                "Unused leave does not carry over.",
            ],
        )?;

        let pages = extract_page_texts(&path)?;
        assert_eq!(
            pages.iter().map(|page| page.number).collect::<Vec<_>>(),
            vec![1, 3]
        );

        let text = load_document_text(&path)?;
        assert_eq!(
            text.as_deref(),
            Some("Sick leave is 10 days per year.\nUnused leave does not carry over.")
        );
        Ok(())
    }

    #[test]
    fn broken_pdf_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        assert!(matches!(
            load_document_text(&path),
            Err(IngestError::PdfParse(_))
        ));
        Ok(())
    }
}
