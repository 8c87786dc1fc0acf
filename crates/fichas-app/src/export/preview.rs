//! Tabular preview of parsed records

use std::io::Write;
use std::path::Path;

use fichas_domain::model::{FieldKey, Record};
use fichas_types::{Error, Result};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;

/// One row per record, nine columns in field order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PreviewTable {
    pub fn from_records(records: &[Record]) -> Self {
        let headers = FieldKey::ALL.iter().map(|k| k.label().to_string()).collect();
        let rows = records
            .iter()
            .map(|r| r.fields().map(|(_, v)| v.to_string()).collect())
            .collect();
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest value per column, header included (in chars)
    pub fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|v| v.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

/// Write the preview as CSV to any writer
pub fn write_preview_csv<W: Write>(table: &PreviewTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&table.headers)
        .map_err(|e| Error::Export(e.to_string()))?;
    for row in &table.rows {
        wtr.write_record(row)
            .map_err(|e| Error::Export(e.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export the preview to an Excel file
pub fn write_preview_xlsx(table: &PreviewTable, output_path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name("Preview")
        .map_err(|e| Error::Export(e.to_string()))?;

    let header_format = Format::new().set_bold();
    for (col, header) in table.headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(|e| Error::Export(e.to_string()))?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let xl_row = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            sheet
                .write_string(xl_row, col as u16, value)
                .map_err(|e| Error::Export(e.to_string()))?;
        }
    }

    workbook
        .save(output_path)
        .map_err(|e| Error::Export(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fichas_domain::model::Vehicle;

    fn sample() -> Vec<Record> {
        vec![
            Record {
                carrier: "Acme".to_string(),
                cargo: "Steel".to_string(),
                driver: "John Smith".to_string(),
                cpf: "123.456.789-00".to_string(),
                vehicle: Vehicle::Truck("ABC1D23".to_string()),
                ..Default::default()
            },
            Record {
                carrier: "Beta, Ltda".to_string(),
                driver: "Ana Lee".to_string(),
                vehicle: Vehicle::Combination {
                    tractor: "XYZ9K88".to_string(),
                    trailer: "QWE4R56".to_string(),
                },
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_preview_columns_follow_field_order() {
        let table = PreviewTable::from_records(&sample());
        assert_eq!(
            table.headers,
            vec!["TRANSPORTADOR", "CARGA", "MOTORISTA", "CPF", "RG", "CNH", "TRUCK", "CAVALO", "CARRETA"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][6], "ABC1D23");
        assert_eq!(table.rows[0][7], "");
        assert_eq!(table.rows[1][7], "XYZ9K88");
        assert_eq!(table.rows[1][8], "QWE4R56");
    }

    #[test]
    fn test_column_widths() {
        let table = PreviewTable::from_records(&sample());
        let widths = table.column_widths();
        assert_eq!(widths[0], "TRANSPORTADOR".len());
        assert_eq!(widths[3], "123.456.789-00".len());
    }

    #[test]
    fn test_csv_quotes_commas() {
        let table = PreviewTable::from_records(&sample());
        let mut out = Vec::new();
        write_preview_csv(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("TRANSPORTADOR,CARGA,MOTORISTA"));
        assert!(lines[2].starts_with("\"Beta, Ltda\",,Ana Lee"));
    }

    #[test]
    fn test_xlsx_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.xlsx");
        write_preview_xlsx(&PreviewTable::from_records(&sample()), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
