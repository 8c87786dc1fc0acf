//! Preview export (CSV and Excel)

mod preview;

pub use preview::{write_preview_csv, write_preview_xlsx, PreviewTable};
