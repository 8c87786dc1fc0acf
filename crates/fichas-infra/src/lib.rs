//! Infrastructure layer - xlsx template patching, archive packaging, text loading

pub mod archive;
pub mod file_sink;
pub mod template;
pub mod text_loader;

pub use archive::{ArchiveEntry, ArchiveError, OutputArchive};
pub use file_sink::FileArchiveSink;
pub use template::{read_cell_text, CellPatch, Template, TemplateError};
