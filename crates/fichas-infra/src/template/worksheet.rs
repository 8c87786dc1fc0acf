//! Worksheet XML rewriting and cell lookup
//!
//! Patched cells are written as inline strings (`t="inlineStr"`) so the shared
//! strings table never has to change. Rows and cells that do not exist yet are
//! inserted in sheet order.

use std::collections::BTreeMap;

use fichas_domain::model::CellRef;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::workbook::attr_value;
use super::{element_prefix, local_name, CellPatch, TemplateError};

type RowPatches<'a> = BTreeMap<u32, &'a str>;

/// Raw content of one `<c>` element
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct RawCell {
    /// `t` attribute
    pub kind: Option<String>,
    /// Text of `<v>`
    pub value: Option<String>,
    /// Text of `<is>`
    pub inline: Option<String>,
}

pub(crate) fn patch_cells(xml: &[u8], patches: &[CellPatch]) -> Result<Vec<u8>, TemplateError> {
    // Later patches for the same cell win.
    let mut rows: BTreeMap<u32, RowPatches<'_>> = BTreeMap::new();
    for patch in patches {
        rows.entry(patch.cell.row())
            .or_default()
            .insert(patch.cell.col(), patch.value.as_str());
    }
    let bounds = patch_bounds(patches);

    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 128 * patches.len()));

    let mut prefix: Option<String> = None;
    let mut in_sheet_data = false;
    let mut row_index: Option<u32> = None;
    let mut col_index: Option<u32> = None;
    let mut pending_cells: Option<RowPatches<'_>> = None;
    let mut skipping_cell = false;

    loop {
        let event = reader.read_event()?;

        if skipping_cell {
            if let Event::End(ref e) = event {
                if local_name(e.name().as_ref()) == b"c" {
                    skipping_cell = false;
                }
            }
            continue;
        }

        match event {
            Event::Eof => break,

            Event::Start(e) | Event::Empty(e)
                if !in_sheet_data && local_name(e.name().as_ref()) == b"dimension" =>
            {
                writer.write_event(Event::Empty(updated_dimension(&e, bounds)?))?;
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"dimension" => {}

            Event::Start(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                prefix = owned_prefix(&e);
                in_sheet_data = true;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                if rows.is_empty() {
                    writer.write_event(Event::Empty(e))?;
                } else {
                    prefix = owned_prefix(&e);
                    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    writer.write_event(Event::Start(e))?;
                    write_rows_before(&mut writer, &mut rows, None, prefix.as_deref())?;
                    writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                write_rows_before(&mut writer, &mut rows, None, prefix.as_deref())?;
                in_sheet_data = false;
                writer.write_event(Event::End(e))?;
            }

            Event::Start(e) if in_sheet_data && local_name(e.name().as_ref()) == b"row" => {
                let row = row_number(&e, row_index)?;
                row_index = Some(row);
                col_index = None;
                write_rows_before(&mut writer, &mut rows, Some(row), prefix.as_deref())?;
                pending_cells = rows.remove(&row);
                if pending_cells.is_some() {
                    writer.write_event(Event::Start(without_attr(&e, b"spans")?))?;
                } else {
                    writer.write_event(Event::Start(e))?;
                }
            }
            Event::Empty(e) if in_sheet_data && local_name(e.name().as_ref()) == b"row" => {
                let row = row_number(&e, row_index)?;
                row_index = Some(row);
                write_rows_before(&mut writer, &mut rows, Some(row), prefix.as_deref())?;
                match rows.remove(&row) {
                    Some(cells) => {
                        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        writer.write_event(Event::Start(without_attr(&e, b"spans")?))?;
                        write_cells(&mut writer, row, cells, prefix.as_deref())?;
                        writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
                    }
                    None => writer.write_event(Event::Empty(e))?,
                }
            }
            Event::End(e) if in_sheet_data && local_name(e.name().as_ref()) == b"row" => {
                if let (Some(row), Some(cells)) = (row_index, pending_cells.take()) {
                    write_cells(&mut writer, row, cells, prefix.as_deref())?;
                }
                writer.write_event(Event::End(e))?;
            }

            Event::Start(e) if in_sheet_data && local_name(e.name().as_ref()) == b"c" => {
                let col = cell_column(&e, col_index)?;
                col_index = Some(col);
                let row = row_index.unwrap_or(0);
                if patch_existing_cell(&mut writer, &mut pending_cells, row, col, &e, prefix.as_deref())? {
                    skipping_cell = true;
                } else {
                    writer.write_event(Event::Start(e))?;
                }
            }
            Event::Empty(e) if in_sheet_data && local_name(e.name().as_ref()) == b"c" => {
                let col = cell_column(&e, col_index)?;
                col_index = Some(col);
                let row = row_index.unwrap_or(0);
                if !patch_existing_cell(&mut writer, &mut pending_cells, row, col, &e, prefix.as_deref())? {
                    writer.write_event(Event::Empty(e))?;
                }
            }

            other => writer.write_event(other)?,
        }
    }

    Ok(writer.into_inner())
}

/// Write pending cells left of `col`, then the patch for `col` itself if there is one.
/// Returns `true` when the original cell was replaced.
fn patch_existing_cell(
    writer: &mut Writer<Vec<u8>>,
    pending: &mut Option<RowPatches<'_>>,
    row: u32,
    col: u32,
    original: &BytesStart<'_>,
    prefix: Option<&str>,
) -> Result<bool, TemplateError> {
    let Some(cells) = pending.as_mut() else {
        return Ok(false);
    };

    while let Some(entry) = cells.first_entry() {
        if *entry.key() >= col {
            break;
        }
        let (before_col, value) = entry.remove_entry();
        write_cell(writer, CellRef::new(row, before_col), value, None, prefix)?;
    }

    match cells.remove(&col) {
        Some(value) => {
            let style = attr_value(original, b"s")?;
            write_cell(writer, CellRef::new(row, col), value, style.as_deref(), prefix)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Insert whole rows for every patched row number below `before` (all rows when `None`).
fn write_rows_before(
    writer: &mut Writer<Vec<u8>>,
    rows: &mut BTreeMap<u32, RowPatches<'_>>,
    before: Option<u32>,
    prefix: Option<&str>,
) -> Result<(), TemplateError> {
    while let Some(entry) = rows.first_entry() {
        if before.is_some_and(|limit| *entry.key() >= limit) {
            break;
        }
        let (row, cells) = entry.remove_entry();
        let tag = prefixed_tag(prefix, "row");
        let mut start = BytesStart::new(tag.as_str());
        let row_1 = (row + 1).to_string();
        start.push_attribute(("r", row_1.as_str()));
        writer.write_event(Event::Start(start))?;
        write_cells(writer, row, cells, prefix)?;
        writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
    }
    Ok(())
}

fn write_cells(
    writer: &mut Writer<Vec<u8>>,
    row: u32,
    cells: RowPatches<'_>,
    prefix: Option<&str>,
) -> Result<(), TemplateError> {
    for (col, value) in cells {
        write_cell(writer, CellRef::new(row, col), value, None, prefix)?;
    }
    Ok(())
}

/// `<c r="B2" s="3" t="inlineStr"><is><t>value</t></is></c>`, or `<c r="B2" s="3"/>` for an
/// empty value.
fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    cell: CellRef,
    value: &str,
    style: Option<&str>,
    prefix: Option<&str>,
) -> Result<(), TemplateError> {
    let c_tag = prefixed_tag(prefix, "c");
    let a1 = cell.to_a1();
    let mut start = BytesStart::new(c_tag.as_str());
    start.push_attribute(("r", a1.as_str()));
    if let Some(style) = style {
        start.push_attribute(("s", style));
    }

    if value.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    start.push_attribute(("t", "inlineStr"));
    writer.write_event(Event::Start(start))?;

    let is_tag = prefixed_tag(prefix, "is");
    let t_tag = prefixed_tag(prefix, "t");
    writer.write_event(Event::Start(BytesStart::new(is_tag.as_str())))?;
    let mut t = BytesStart::new(t_tag.as_str());
    if value.trim() != value || value.contains('\n') {
        t.push_attribute(("xml:space", "preserve"));
    }
    writer.write_event(Event::Start(t))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(t_tag.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(is_tag.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(c_tag.as_str())))?;
    Ok(())
}

/// Find a cell in `<sheetData>` and collect its raw value.
pub(crate) fn find_cell(xml: &[u8], target: CellRef) -> Result<Option<RawCell>, TemplateError> {
    let mut reader = Reader::from_reader(xml);

    let mut in_sheet_data = false;
    let mut row_index: Option<u32> = None;
    let mut col_index: Option<u32> = None;
    let mut found: Option<RawCell> = None;
    let mut in_v = false;
    let mut in_is = false;
    let mut in_t = false;

    loop {
        let event = reader.read_event()?;
        if let Some(ref mut cell) = found {
            match event {
                Event::Eof => break,
                Event::Start(ref e) => match local_name(e.name().as_ref()) {
                    b"v" => in_v = true,
                    b"is" => in_is = true,
                    b"t" if in_is => in_t = true,
                    _ => {}
                },
                Event::Text(ref t) if in_v || in_t => {
                    let text = t.unescape()?;
                    let slot = if in_v { &mut cell.value } else { &mut cell.inline };
                    slot.get_or_insert_with(String::new).push_str(&text);
                }
                Event::End(ref e) => match local_name(e.name().as_ref()) {
                    b"v" => in_v = false,
                    b"t" => in_t = false,
                    b"is" => in_is = false,
                    b"c" => break,
                    _ => {}
                },
                _ => {}
            }
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Start(e) if local_name(e.name().as_ref()) == b"sheetData" => in_sheet_data = true,
            Event::End(e) if local_name(e.name().as_ref()) == b"sheetData" => break,
            Event::Start(e) | Event::Empty(e)
                if in_sheet_data && local_name(e.name().as_ref()) == b"row" =>
            {
                let row = row_number(&e, row_index)?;
                row_index = Some(row);
                col_index = None;
                if row > target.row() {
                    break;
                }
            }
            Event::Start(e) if in_sheet_data && local_name(e.name().as_ref()) == b"c" => {
                let col = cell_column(&e, col_index)?;
                col_index = Some(col);
                if row_index == Some(target.row()) && col == target.col() {
                    found = Some(RawCell {
                        kind: attr_value(&e, b"t")?,
                        ..RawCell::default()
                    });
                }
            }
            Event::Empty(e) if in_sheet_data && local_name(e.name().as_ref()) == b"c" => {
                let col = cell_column(&e, col_index)?;
                col_index = Some(col);
                if row_index == Some(target.row()) && col == target.col() {
                    return Ok(Some(RawCell {
                        kind: attr_value(&e, b"t")?,
                        ..RawCell::default()
                    }));
                }
            }
            _ => {}
        }
    }

    Ok(found)
}

/// Zero-based row from `r`, or the row after `previous` when `r` is absent
fn row_number(e: &BytesStart<'_>, previous: Option<u32>) -> Result<u32, TemplateError> {
    match attr_value(e, b"r")? {
        Some(r) => r
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(|n| n - 1)
            .ok_or(TemplateError::InvalidCellRef(r)),
        None => Ok(previous.map_or(0, |p| p + 1)),
    }
}

/// Zero-based column from `r`, or the column after `previous` when `r` is absent
fn cell_column(e: &BytesStart<'_>, previous: Option<u32>) -> Result<u32, TemplateError> {
    match attr_value(e, b"r")? {
        Some(r) => CellRef::from_a1(&r)
            .map(|cell| cell.col())
            .map_err(|_| TemplateError::InvalidCellRef(r)),
        None => Ok(previous.map_or(0, |p| p + 1)),
    }
}

/// Min/max corners of all patched cells
fn patch_bounds(patches: &[CellPatch]) -> Option<(CellRef, CellRef)> {
    let first = patches.first()?.cell;
    let (mut min_row, mut min_col, mut max_row, mut max_col) =
        (first.row(), first.col(), first.row(), first.col());
    for patch in patches {
        min_row = min_row.min(patch.cell.row());
        min_col = min_col.min(patch.cell.col());
        max_row = max_row.max(patch.cell.row());
        max_col = max_col.max(patch.cell.col());
    }
    Some((CellRef::new(min_row, min_col), CellRef::new(max_row, max_col)))
}

/// `<dimension ref>` widened to cover the patched cells
fn updated_dimension(
    e: &BytesStart<'_>,
    bounds: Option<(CellRef, CellRef)>,
) -> Result<BytesStart<'static>, TemplateError> {
    let current = attr_value(e, b"ref")?;
    let existing = current.as_deref().and_then(parse_dimension_ref);

    let merged = match (existing, bounds) {
        (Some((a_min, a_max)), Some((b_min, b_max))) => Some((
            CellRef::new(a_min.row().min(b_min.row()), a_min.col().min(b_min.col())),
            CellRef::new(a_max.row().max(b_max.row()), a_max.col().max(b_max.col())),
        )),
        (range, None) => range,
        (None, Some(range)) => Some(range),
    };

    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(tag);
    match merged {
        Some((min, max)) if min == max => out.push_attribute(("ref", min.to_a1().as_str())),
        Some((min, max)) => {
            let range = format!("{}:{}", min.to_a1(), max.to_a1());
            out.push_attribute(("ref", range.as_str()));
        }
        None => {
            if let Some(current) = current.as_deref() {
                out.push_attribute(("ref", current));
            }
        }
    }
    Ok(out)
}

fn parse_dimension_ref(s: &str) -> Option<(CellRef, CellRef)> {
    let (start, end) = match s.split_once(':') {
        Some((a, b)) => (a, b),
        None => (s, s),
    };
    let start = CellRef::from_a1(start).ok()?;
    let end = CellRef::from_a1(end).ok()?;
    Some((start, end))
}

/// Copy of a start tag without one attribute
fn without_attr(e: &BytesStart<'_>, skip: &[u8]) -> Result<BytesStart<'static>, TemplateError> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(tag);
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() != skip {
            out.push_attribute(attr);
        }
    }
    Ok(out)
}

fn owned_prefix(e: &BytesStart<'_>) -> Option<String> {
    element_prefix(e.name().as_ref()).map(|p| String::from_utf8_lossy(p).into_owned())
}

fn prefixed_tag(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:C4"/><sheetData><row r="2" spans="1:3"><c r="A2" s="1" t="s"><v>0</v></c><c r="C2" s="2"/></row><row r="4"><c r="B4" s="5" t="s"><v>1</v></c></row></sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#;

    fn patch(a1: &str, value: &str) -> CellPatch {
        CellPatch::new(CellRef::from_a1(a1).unwrap(), value)
    }

    fn patched(patches: &[CellPatch]) -> String {
        String::from_utf8(patch_cells(SHEET.as_bytes(), patches).unwrap()).unwrap()
    }

    #[test]
    fn test_no_patches_keeps_sheet_data() {
        let out = patched(&[]);
        assert!(out.contains(r#"<row r="2" spans="1:3"><c r="A2" s="1" t="s"><v>0</v></c><c r="C2" s="2"/></row>"#));
        assert!(out.contains(r#"<dimension ref="A1:C4"/>"#));
        assert!(out.contains("<pageMargins"));
    }

    #[test]
    fn test_replace_existing_cell_keeps_style() {
        let out = patched(&[patch("B4", "John Smith")]);
        assert!(out.contains(r#"<row r="4"><c r="B4" s="5" t="inlineStr"><is><t>John Smith</t></is></c></row>"#));
        assert!(!out.contains("<v>1</v>"));
    }

    #[test]
    fn test_insert_cell_between_existing_cells() {
        let out = patched(&[patch("B2", "Acme")]);
        assert!(out.contains(r#"<row r="2"><c r="A2" s="1" t="s"><v>0</v></c><c r="B2" t="inlineStr"><is><t>Acme</t></is></c><c r="C2" s="2"/></row>"#));
    }

    #[test]
    fn test_insert_rows_in_order() {
        let out = patched(&[patch("B12", "QWE4B77"), patch("B1", "topo"), patch("J3", "x")]);
        let row1 = out.find(r#"<row r="1">"#).unwrap();
        let row2 = out.find(r#"<row r="2""#).unwrap();
        let row3 = out.find(r#"<row r="3">"#).unwrap();
        let row4 = out.find(r#"<row r="4">"#).unwrap();
        let row12 = out.find(r#"<row r="12"><c r="B12" t="inlineStr"><is><t>QWE4B77</t></is></c></row>"#).unwrap();
        assert!(row1 < row2 && row2 < row3 && row3 < row4 && row4 < row12);
        assert!(out.contains(r#"<dimension ref="A1:J12"/>"#));
    }

    #[test]
    fn test_append_cell_at_row_end() {
        let out = patched(&[patch("J2", "Grain")]);
        assert!(out.contains(r#"<c r="C2" s="2"/><c r="J2" t="inlineStr"><is><t>Grain</t></is></c></row>"#));
    }

    #[test]
    fn test_empty_value_writes_blank_cell() {
        let out = patched(&[patch("A2", "")]);
        assert!(out.contains(r#"<c r="A2" s="1"/><c r="C2" s="2"/>"#));
    }

    #[test]
    fn test_text_is_escaped_and_preserved() {
        let out = patched(&[patch("B4", " <Ana & Lee> ")]);
        assert!(out.contains(r#"<t xml:space="preserve"> &lt;Ana &amp; Lee&gt; </t>"#));
    }

    #[test]
    fn test_empty_sheet_data_is_expanded() {
        let xml = br#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#;
        let out = patch_cells(xml, &[patch("B2", "Acme")]).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(r#"<sheetData><row r="2"><c r="B2" t="inlineStr"><is><t>Acme</t></is></c></row></sheetData>"#));
    }

    #[test]
    fn test_prefixed_worksheet() {
        let xml = br#"<x:worksheet xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><x:sheetData><x:row r="1"><x:c r="A1"><x:v>1</x:v></x:c></x:row></x:sheetData></x:worksheet>"#;
        let out = String::from_utf8(patch_cells(xml, &[patch("B1", "y")]).unwrap()).unwrap();
        assert!(out.contains(r#"<x:c r="B1" t="inlineStr"><x:is><x:t>y</x:t></x:is></x:c></x:row>"#));
    }

    #[test]
    fn test_find_cell_variants() {
        let out = patch_cells(SHEET.as_bytes(), &[patch("B4", "John")]).unwrap();
        let inline = find_cell(&out, CellRef::from_a1("B4").unwrap()).unwrap().unwrap();
        assert_eq!(inline.kind.as_deref(), Some("inlineStr"));
        assert_eq!(inline.inline.as_deref(), Some("John"));

        let shared = find_cell(&out, CellRef::from_a1("A2").unwrap()).unwrap().unwrap();
        assert_eq!(shared.kind.as_deref(), Some("s"));
        assert_eq!(shared.value.as_deref(), Some("0"));

        let blank = find_cell(&out, CellRef::from_a1("C2").unwrap()).unwrap().unwrap();
        assert_eq!(blank, RawCell::default());

        assert!(find_cell(&out, CellRef::from_a1("Z9").unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_row_reference() {
        let xml = br#"<worksheet><sheetData><row r="zero"/></sheetData></worksheet>"#;
        assert!(matches!(
            patch_cells(xml, &[patch("A1", "x")]),
            Err(TemplateError::InvalidCellRef(_))
        ));
    }
}
