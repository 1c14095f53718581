//! PDF export adapter
//!
//! Rasterization is delegated to an external engine behind [`PdfEngine`].
//! This module assembles a note's displayable representation, drives the
//! engine with caller or default layout settings, and writes the result
//! through a staging file that is cleaned up on every failure path.

use std::path::{Path, PathBuf};

use crate::config::{PDF_DEFAULT_IMAGE_QUALITY, PDF_DEFAULT_MARGIN_MM};
use crate::error::{AppError, Result};
use crate::models::{Note, TagColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    A4,
    Letter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Layout configuration for an export
#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub margin_mm: f32,
    pub page_format: PageFormat,
    pub orientation: Orientation,
    /// JPEG quality for embedded images, 0.0–1.0
    pub image_quality: f32,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            margin_mm: PDF_DEFAULT_MARGIN_MM,
            page_format: PageFormat::A4,
            orientation: Orientation::Portrait,
            image_quality: PDF_DEFAULT_IMAGE_QUALITY,
        }
    }
}

/// The assembled, displayable representation of a note handed to the
/// engine: title, creation date line, tag chips, and the rich-text body.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub title: String,
    pub created_line: String,
    pub tag_chips: Vec<(String, TagColor)>,
    pub content_html: String,
}

impl ExportDocument {
    fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            created_line: format!("Created: {}", note.created_at.format("%-d %B %Y")),
            tag_chips: note
                .tags
                .iter()
                .map(|tag| (tag.name.clone(), tag.color))
                .collect(),
            content_html: note.content.clone(),
        }
    }
}

/// External rasterization capability: turns an assembled document into a
/// paginated PDF byte stream.
pub trait PdfEngine: Send + Sync {
    fn render(&self, document: &ExportDocument, options: &PdfOptions) -> Result<Vec<u8>>;
}

/// File name stem derived from a note title. Path separators are replaced
/// and leading dots stripped so the file always lands inside the output
/// directory regardless of what the title contains.
fn file_stem_for(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let stem = cleaned.trim().trim_start_matches('.').trim();
    if stem.is_empty() {
        "note".to_string()
    } else {
        stem.to_string()
    }
}

/// Removes the staging file unless the export was completed
struct StagingGuard {
    path: PathBuf,
    completed: bool,
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if !self.completed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Exports notes as PDF files through a [`PdfEngine`]
pub struct PdfExporter<E: PdfEngine> {
    engine: E,
}

impl<E: PdfEngine> PdfExporter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Export a note into `output_dir` as `<title>.pdf`; returns the final
    /// path. Unsaved notes are rejected up front: the caller must persist
    /// the note before exporting.
    pub async fn export_note(
        &self,
        note: &Note,
        output_dir: &Path,
        options: Option<PdfOptions>,
    ) -> Result<PathBuf> {
        if note.id.is_empty() {
            return Err(AppError::Validation(
                "save the note before exporting it".to_string(),
            ));
        }

        let options = options.unwrap_or_default();
        let document = ExportDocument::from_note(note);

        tracing::info!("Exporting note {} to PDF", note.id);

        let bytes = self
            .engine
            .render(&document, &options)
            .map_err(|err| AppError::Export(err.to_string()))?;

        let final_path = output_dir.join(format!("{}.pdf", file_stem_for(&note.title)));
        let staging_path = output_dir.join(format!(".{}.pdf.tmp", note.id));

        let mut guard = StagingGuard {
            path: staging_path.clone(),
            completed: false,
        };

        tokio::fs::write(&staging_path, &bytes).await?;
        tokio::fs::rename(&staging_path, &final_path).await?;
        guard.completed = true;

        tracing::info!("Exported note {} to {:?}", note.id, final_path);
        Ok(final_path)
    }
}
