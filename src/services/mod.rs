//! Services module
//!
//! Business logic layered over the document store capability.

pub mod export;
pub mod notebooks;
pub mod notes;
pub mod shares;

pub use export::{ExportDocument, PdfEngine, PdfExporter, PdfOptions};
pub use notebooks::NotebooksService;
pub use notes::NotesService;
pub use shares::SharesService;
