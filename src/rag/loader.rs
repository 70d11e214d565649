//! Source document loading for ingestion.
//!
//! Every `*.pdf` directly under the data directory is read page by page with
//! `lopdf`; `*.txt` and `*.md` files are read whole. Files are visited in file
//! name order so repeated runs produce the same documents in the same order.

use crate::types::{AppError, LoadedDocument, Result};
use lopdf::Document;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Pdf,
    Text,
}

impl SourceKind {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "txt" | "md" => Some(SourceKind::Text),
            _ => None,
        }
    }
}

/// Result of scanning a data directory.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<LoadedDocument>,
    /// Files that could not be read or parsed, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    pub files_loaded: usize,
}

pub struct DocumentLoader {
    dir: PathBuf,
}

impl DocumentLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load every supported file in the directory (non-recursive).
    ///
    /// # Errors
    ///
    /// `NotFound` when the directory does not exist, `Io` when it cannot be
    /// listed. Individual bad files are skipped, not reported as errors.
    pub fn load(&self) -> Result<LoadOutcome> {
        if !self.dir.is_dir() {
            return Err(AppError::NotFound(format!(
                "data directory '{}' does not exist",
                self.dir.display()
            )));
        }

        let mut files: Vec<(PathBuf, SourceKind)> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| SourceKind::from_path(&path).map(|kind| (path, kind)))
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut outcome = LoadOutcome::default();
        for (path, kind) in files {
            let loaded = match kind {
                // lopdf can panic on malformed input; that costs one file, not the run
                SourceKind::Pdf => panic::catch_unwind(AssertUnwindSafe(|| load_pdf(&path)))
                    .unwrap_or_else(|_| Err("PDF parser panicked".to_string())),
                SourceKind::Text => load_text(&path),
            };

            match loaded {
                Ok(documents) => {
                    debug!(file = %path.display(), documents = documents.len(), "Loaded file");
                    outcome.files_loaded += 1;
                    outcome.documents.extend(documents);
                }
                Err(reason) => {
                    warn!(file = %path.display(), error = %reason, "Skipping unreadable file");
                    outcome.skipped.push((path, reason));
                }
            }
        }

        info!(
            dir = %self.dir.display(),
            files = outcome.files_loaded,
            skipped = outcome.skipped.len(),
            documents = outcome.documents.len(),
            "Documents loaded"
        );
        Ok(outcome)
    }
}

fn load_pdf(path: &Path) -> std::result::Result<Vec<LoadedDocument>, String> {
    let doc = Document::load(path).map_err(|e| format!("failed to open PDF: {}", e))?;
    let pages = doc.get_pages().into_keys().map(|page_num| {
        let text = doc
            .extract_text(&[page_num])
            .map_err(|e| e.to_string());
        (page_num, text)
    });

    collect_pages(&path.display().to_string(), pages)
}

/// Turn extracted pages into documents. Pages that fail extraction are
/// skipped; the file only fails when no page could be read at all.
fn collect_pages<I>(source: &str, pages: I) -> std::result::Result<Vec<LoadedDocument>, String>
where
    I: IntoIterator<Item = (u32, std::result::Result<String, String>)>,
{
    let mut documents = Vec::new();
    let mut failed = 0usize;
    let mut total = 0usize;

    for (page_num, text) in pages {
        total += 1;
        let text = match text {
            Ok(text) => text,
            Err(e) => {
                warn!(file = source, page = page_num, error = %e, "Skipping unreadable page");
                failed += 1;
                continue;
            }
        };
        if text.trim().is_empty() {
            continue;
        }

        documents.push(LoadedDocument {
            content: text,
            source: source.to_string(),
            // lopdf numbers pages from 1
            page: Some(page_num.saturating_sub(1)),
        });
    }

    if total > 0 && failed == total {
        return Err(format!("failed to extract text from all {} pages", total));
    }
    Ok(documents)
}

fn load_text(path: &Path) -> std::result::Result<Vec<LoadedDocument>, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![LoadedDocument {
        content: text,
        source: path.display().to_string(),
        page: None,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use tempfile::TempDir;

    /// Write a PDF with one page per entry, each showing that text.
    fn write_pdf(path: &Path, pages: &[&str]) {
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

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
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

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_pdf_loads_one_document_per_page() {
        let dir = TempDir::new().unwrap();
        write_pdf(
            &dir.path().join("Medical_book.pdf"),
            &[
                "Aspirin reduces fever and inflammation.",
                "Insulin regulates glucose.",
            ],
        );

        let outcome = DocumentLoader::new(dir.path()).load().unwrap();

        assert_eq!(outcome.files_loaded, 1);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.documents.len(), 2);
        assert_eq!(outcome.documents[0].page, Some(0));
        assert_eq!(outcome.documents[1].page, Some(1));
        assert!(outcome.documents[0].content.contains("Aspirin reduces fever and inflammation."));
        assert!(outcome.documents[1].content.contains("Insulin regulates glucose."));
        assert!(outcome.documents[0].source.ends_with("Medical_book.pdf"));
    }

    #[test]
    fn test_unreadable_page_skips_only_that_page() {
        let pages = vec![
            (1, Ok("Aspirin reduces fever.".to_string())),
            (2, Err("invalid content stream".to_string())),
            (3, Ok("Insulin regulates glucose.".to_string())),
        ];

        let documents = collect_pages("data/Medical_book.pdf", pages).unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].page, Some(0));
        assert_eq!(documents[1].page, Some(2));
    }

    #[test]
    fn test_pdf_with_no_readable_page_fails() {
        let pages = vec![
            (1, Err("bad".to_string())),
            (2, Err("bad".to_string())),
        ];

        let result = collect_pages("data/scan.pdf", pages);

        assert!(result.unwrap_err().contains("all 2 pages"));
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let loader = DocumentLoader::new("/definitely/not/a/real/dir");
        assert!(matches!(loader.load(), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_loads_text_files_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "Ibuprofen is an NSAID.").unwrap();
        fs::write(dir.path().join("a.md"), "Aspirin reduces fever.").unwrap();
        fs::write(dir.path().join("ignored.csv"), "x,y").unwrap();

        let outcome = DocumentLoader::new(dir.path()).load().unwrap();

        assert_eq!(outcome.files_loaded, 2);
        assert_eq!(outcome.documents.len(), 2);
        assert!(outcome.documents[0].source.ends_with("a.md"));
        assert_eq!(outcome.documents[0].page, None);
        assert_eq!(outcome.documents[1].content, "Ibuprofen is an NSAID.");
    }

    #[test]
    fn test_blank_files_produce_no_documents() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.txt"), "   \n ").unwrap();

        let outcome = DocumentLoader::new(dir.path()).load().unwrap();

        assert_eq!(outcome.files_loaded, 1);
        assert!(outcome.documents.is_empty());
    }

    #[test]
    fn test_corrupt_pdf_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.pdf"), b"this is not a pdf").unwrap();
        fs::write(dir.path().join("notes.txt"), "Paracetamol relieves pain.").unwrap();

        let outcome = DocumentLoader::new(dir.path()).load().unwrap();

        assert_eq!(outcome.files_loaded, 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.skipped[0].0.ends_with("broken.pdf"));
        assert_eq!(outcome.documents.len(), 1);
    }

    #[test]
    fn test_subdirectories_are_not_descended() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("deep.txt"), "hidden").unwrap();

        let outcome = DocumentLoader::new(dir.path()).load().unwrap();

        assert_eq!(outcome.files_loaded, 0);
        assert!(outcome.documents.is_empty());
    }
}
