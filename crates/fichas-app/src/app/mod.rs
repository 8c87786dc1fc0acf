//! Application use cases

mod batch_service;

pub use batch_service::{
    cell_patches, deliver_archive, fill_batch, fill_record, generate_sheets, package,
    BatchOutput, BatchReport, FillOptions, GeneratedSheets, ProgressCallback,
};
