//! Spreadsheet template patching
//!
//! A template is kept as the caller's original xlsx bytes. Every fill reopens the zip
//! from those bytes, rewrites only the active worksheet part and raw-copies every other
//! part, so fills never see each other's changes.

mod shared_strings;
mod workbook;
mod worksheet;

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;

use fichas_domain::model::CellRef;
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] ZipError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("part not found in template: {0}")]
    MissingPart(String),
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error("invalid cell reference in worksheet xml: {0}")]
    InvalidCellRef(String),
}

/// New text for one cell. An empty value clears the cell and keeps its style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPatch {
    pub cell: CellRef,
    pub value: String,
}

impl CellPatch {
    pub fn new(cell: CellRef, value: impl Into<String>) -> Self {
        Self {
            cell,
            value: value.into(),
        }
    }
}

/// Read-only xlsx template shared across fills
#[derive(Debug, Clone)]
pub struct Template {
    bytes: Arc<[u8]>,
}

impl Template {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn open(path: &Path) -> Result<Self, TemplateError> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Zip entry name of the sheet that fills are written to
    pub fn active_sheet_part(&self) -> Result<String, TemplateError> {
        let mut archive = ZipArchive::new(Cursor::new(self.bytes()))?;
        workbook::active_sheet_part(&mut archive)
    }

    /// Apply `patches` to a fresh copy of the template and return the new xlsx bytes.
    ///
    /// Output is deterministic: the same patches on the same template give the same bytes.
    pub fn fill(&self, patches: &[CellPatch]) -> Result<Vec<u8>, TemplateError> {
        let mut archive = ZipArchive::new(Cursor::new(self.bytes()))?;
        let sheet_part = workbook::active_sheet_part(&mut archive)?;
        let sheet_xml = read_part(&mut archive, &sheet_part)?;
        let patched = worksheet::patch_cells(&sheet_xml, patches)?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::with_capacity(self.bytes.len())));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            if file.name() == sheet_part {
                drop(file);
                zip.start_file(sheet_part.as_str(), options)?;
                zip.write_all(&patched)?;
            } else {
                zip.raw_copy_file(file)?;
            }
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Display text of a cell in the active sheet.
    ///
    /// `None` when the sheet has no such cell, `Some("")` for a cell without a value.
    pub fn read_cell_text(&self, cell: CellRef) -> Result<Option<String>, TemplateError> {
        read_cell_text(self.bytes(), cell)
    }
}

/// Display text of a cell in the active sheet of any xlsx document.
pub fn read_cell_text(xlsx: &[u8], cell: CellRef) -> Result<Option<String>, TemplateError> {
    let mut archive = ZipArchive::new(Cursor::new(xlsx))?;
    let sheet_part = workbook::active_sheet_part(&mut archive)?;
    let sheet_xml = read_part(&mut archive, &sheet_part)?;

    let Some(raw) = worksheet::find_cell(&sheet_xml, cell)? else {
        return Ok(None);
    };

    let text = match raw.kind.as_deref() {
        Some("s") => {
            let index: usize = raw
                .value
                .as_deref()
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| TemplateError::InvalidCellRef(cell.to_a1()))?;
            let part = workbook::shared_strings_part(&mut archive)?;
            let strings = match part {
                Some(part) => shared_strings::parse(&read_part(&mut archive, &part)?)?,
                None => Vec::new(),
            };
            strings.get(index).cloned().unwrap_or_default()
        }
        Some("inlineStr") => raw.inline.unwrap_or_default(),
        _ => raw.value.unwrap_or_default(),
    };
    Ok(Some(text))
}

pub(crate) fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, TemplateError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Err(TemplateError::MissingPart(name.to_string())),
        Err(err) => return Err(err.into()),
    };
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

pub(crate) fn element_prefix(name: &[u8]) -> Option<&[u8]> {
    name.iter().position(|b| *b == b':').map(|idx| &name[..idx])
}
