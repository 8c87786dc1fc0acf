//! Active sheet and shared-strings resolution from `xl/workbook.xml` and its relationships

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::{local_name, read_part, TemplateError};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const REL_TYPE_SHARED_STRINGS_SUFFIX: &str = "/sharedStrings";

#[derive(Debug, Default)]
struct WorkbookInfo {
    /// Relationship ids of the sheets, in tab order
    sheet_rel_ids: Vec<String>,
    active_tab: usize,
}

#[derive(Debug)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// Zip entry of the sheet selected by `workbookView/@activeTab` (first sheet by default)
pub(crate) fn active_sheet_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<String, TemplateError> {
    let info = parse_workbook(&read_part(archive, WORKBOOK_PART)?)?;
    let rel_id = info
        .sheet_rel_ids
        .get(info.active_tab)
        .or_else(|| info.sheet_rel_ids.first())
        .ok_or(TemplateError::NoWorksheet)?;

    let rels = parse_relationships(&read_part(archive, WORKBOOK_RELS_PART)?)?;
    let targets: HashMap<&str, &str> = rels
        .iter()
        .map(|rel| (rel.id.as_str(), rel.target.as_str()))
        .collect();
    let target = targets
        .get(rel_id.as_str())
        .ok_or_else(|| TemplateError::MissingPart(format!("{WORKBOOK_RELS_PART}#{rel_id}")))?;

    Ok(resolve_target(target))
}

/// Zip entry of the shared strings table, if the workbook has one
pub(crate) fn shared_strings_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Option<String>, TemplateError> {
    let rels = parse_relationships(&read_part(archive, WORKBOOK_RELS_PART)?)?;
    Ok(rels
        .into_iter()
        .find(|rel| rel.rel_type.ends_with(REL_TYPE_SHARED_STRINGS_SUFFIX))
        .map(|rel| resolve_target(&rel.target)))
}

fn parse_workbook(xml: &[u8]) -> Result<WorkbookInfo, TemplateError> {
    let mut reader = Reader::from_reader(xml);
    let mut info = WorkbookInfo::default();
    let mut saw_view = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"workbookView" if !saw_view => {
                    saw_view = true;
                    if let Some(tab) = attr_value(&e, b"activeTab")? {
                        info.active_tab = tab.trim().parse().unwrap_or(0);
                    }
                }
                b"sheet" => {
                    if let Some(id) = attr_value(&e, b"id")? {
                        info.sheet_rel_ids.push(id);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(info)
}

fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>, TemplateError> {
    let mut reader = Reader::from_reader(xml);
    let mut rels = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e)
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let id = attr_value(&e, b"Id")?.unwrap_or_default();
                let rel_type = attr_value(&e, b"Type")?.unwrap_or_default();
                let target = attr_value(&e, b"Target")?.unwrap_or_default();
                rels.push(Relationship {
                    id,
                    rel_type,
                    target,
                });
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Attribute by local name (`r:id` matches `id`)
pub(crate) fn attr_value(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, TemplateError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Resolve a relationship target of `xl/workbook.xml` to a zip entry name
fn resolve_target(target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
