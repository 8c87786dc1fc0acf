//! Batch Service - raw text and a template in, one zip of filled sheets out
//!
//! Workflow:
//! 1. Check that both inputs were supplied
//! 2. Parse the raw text into records (domain block parser)
//! 3. Fill one fresh copy of the template per record
//! 4. Name every sheet from its position and driver name
//! 5. Collect the sheets into the output archive, in input order

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use fichas_domain::model::{CellMap, Record};
use fichas_domain::repository::ArchiveSink;
use fichas_domain::service::{parse_records, sheet_file_name};
use fichas_infra::{CellPatch, OutputArchive, Template, TemplateError};
use fichas_types::{Error, Result};

/// Called once per filled sheet
pub type ProgressCallback<'a> = &'a (dyn Fn() + Sync);

/// Options for batch filling
#[derive(Debug, Clone)]
pub struct FillOptions {
    /// Worker threads for the fill step. 0 and 1 both mean sequential.
    pub jobs: usize,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

impl FillOptions {
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }
}

/// Counts reported back to the caller for confirmation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Sheets filled, one per record
    pub documents: usize,
    /// Entries in the archive
    pub entries: usize,
    /// Names that replaced an earlier entry
    pub collisions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub archive: OutputArchive,
    pub report: BatchReport,
}

/// Result of the whole generate use case
#[derive(Debug, Clone)]
pub struct GeneratedSheets {
    pub records: Vec<Record>,
    pub archive: OutputArchive,
    pub report: BatchReport,
}

/// Parse `raw_text`, fill one sheet per record and package them.
///
/// Fails with [`Error::InputMissing`] when the template or the text is empty.
pub fn generate_sheets(
    template_bytes: &[u8],
    raw_text: &str,
    cell_map: &CellMap,
    options: &FillOptions,
    on_progress: Option<ProgressCallback<'_>>,
) -> Result<GeneratedSheets> {
    if template_bytes.is_empty() {
        return Err(Error::InputMissing("no template supplied".to_string()));
    }
    if raw_text.is_empty() {
        return Err(Error::InputMissing("no driver text supplied".to_string()));
    }

    let records = parse_records(raw_text);
    tracing::debug!(records = records.len(), "parsed raw text");

    let template = Template::from_bytes(template_bytes.to_vec());
    let BatchOutput { archive, report } =
        fill_batch(&template, &records, cell_map, options, on_progress)?;

    Ok(GeneratedSheets {
        records,
        archive,
        report,
    })
}

/// Cell writes for one record. Every mapped field is written, empty values included.
pub fn cell_patches(record: &Record, cell_map: &CellMap) -> Vec<CellPatch> {
    record
        .fields()
        .filter_map(|(key, value)| cell_map.get(key).map(|cell| CellPatch::new(cell, value)))
        .collect()
}

/// Fill one fresh copy of the template with `record`
pub fn fill_record(template: &Template, record: &Record, cell_map: &CellMap) -> Result<Vec<u8>> {
    template
        .fill(&cell_patches(record, cell_map))
        .map_err(template_error)
}

/// Fill one sheet per record and collect them into an archive.
///
/// The template is never read when there are no records. The first unreadable
/// template aborts the batch; no partial archive is returned.
pub fn fill_batch(
    template: &Template,
    records: &[Record],
    cell_map: &CellMap,
    options: &FillOptions,
    on_progress: Option<ProgressCallback<'_>>,
) -> Result<BatchOutput> {
    if records.is_empty() {
        return Ok(BatchOutput {
            archive: OutputArchive::new(),
            report: BatchReport::default(),
        });
    }

    let documents = if options.jobs > 1 && records.len() > 1 {
        fill_parallel(template, records, cell_map, options.jobs, on_progress)?
    } else {
        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            documents.push(fill_record(template, record, cell_map)?);
            if let Some(progress) = on_progress {
                progress();
            }
        }
        documents
    };

    let named = records
        .iter()
        .zip(documents)
        .enumerate()
        .map(|(idx, (record, bytes))| (sheet_file_name(idx + 1, &record.driver), bytes));
    let output = package(named);

    tracing::info!(
        documents = output.report.documents,
        entries = output.report.entries,
        "batch filled"
    );
    Ok(output)
}

/// Insert named sheets in order. A repeated name replaces the earlier entry.
pub fn package(named: impl IntoIterator<Item = (String, Vec<u8>)>) -> BatchOutput {
    let mut archive = OutputArchive::new();
    let mut report = BatchReport::default();

    for (name, bytes) in named {
        report.documents += 1;
        if archive.insert(name.clone(), bytes).is_some() {
            tracing::warn!(%name, "duplicate sheet name, earlier sheet replaced");
            report.collisions.push(name);
        }
    }

    report.entries = archive.len();
    BatchOutput { archive, report }
}

fn template_error(err: TemplateError) -> Error {
    Error::TemplateRead(err.to_string())
}

/// Serialize the archive as zip and hand it to `sink` under `archive_name`
pub fn deliver_archive(
    archive: &OutputArchive,
    archive_name: &str,
    sink: &mut dyn ArchiveSink,
) -> Result<()> {
    let bytes = archive
        .to_zip_bytes()
        .map_err(|e| Error::UnexpectedProcessing(e.to_string()))?;
    tracing::debug!(name = archive_name, size = bytes.len(), entries = archive.len(), "delivering archive");
    sink.deliver(archive_name, &bytes)
}

/// Fill records on `jobs` scoped workers. Output order matches `records`.
fn fill_parallel(
    template: &Template,
    records: &[Record],
    cell_map: &CellMap,
    jobs: usize,
    on_progress: Option<ProgressCallback<'_>>,
) -> Result<Vec<Vec<u8>>> {
    let next_index = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let workers = jobs.min(records.len());

    let mut results: Vec<(usize, Result<Vec<u8>>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    while !failed.load(Ordering::SeqCst) {
                        let idx = next_index.fetch_add(1, Ordering::SeqCst);
                        let Some(record) = records.get(idx) else {
                            break;
                        };
                        let result = fill_record(template, record, cell_map);
                        if result.is_err() {
                            failed.store(true, Ordering::SeqCst);
                        } else if let Some(progress) = on_progress {
                            progress();
                        }
                        done.push((idx, result));
                    }
                    done
                })
            })
            .collect();

        let mut all = Vec::with_capacity(records.len());
        for handle in handles {
            match handle.join() {
                Ok(done) => all.extend(done),
                Err(_) => all.push((
                    usize::MAX,
                    Err(Error::UnexpectedProcessing("fill worker panicked".to_string())),
                )),
            }
        }
        all
    });

    results.sort_by_key(|(idx, _)| *idx);
    let mut documents = Vec::with_capacity(records.len());
    for (_, result) in results {
        documents.push(result?);
    }

    if documents.len() != records.len() {
        return Err(Error::UnexpectedProcessing(format!(
            "filled {} of {} sheets",
            documents.len(),
            records.len()
        )));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fichas_domain::model::{CellRef, FieldKey, Vehicle};

    #[test]
    fn test_cell_patches_include_empty_values() {
        let record = Record {
            carrier: "Acme".to_string(),
            driver: "John Smith".to_string(),
            vehicle: Vehicle::Truck("ABC1D23".to_string()),
            ..Default::default()
        };
        let patches = cell_patches(&record, &CellMap::default());
        assert_eq!(patches.len(), 9);
        assert!(patches.contains(&CellPatch::new(CellRef::new(1, 1), "Acme")));
        assert!(patches.contains(&CellPatch::new(CellRef::new(1, 9), "")));
        assert!(patches.contains(&CellPatch::new(CellRef::new(9, 1), "ABC1D23")));
        assert!(patches.contains(&CellPatch::new(CellRef::new(10, 1), "")));
    }

    #[test]
    fn test_unmapped_fields_are_skipped() {
        let mut map = CellMap::empty();
        map.insert(FieldKey::Driver, CellRef::new(0, 0));
        let record = Record {
            driver: "Ana Lee".to_string(),
            cpf: "123".to_string(),
            ..Default::default()
        };
        assert_eq!(
            cell_patches(&record, &map),
            vec![CellPatch::new(CellRef::new(0, 0), "Ana Lee")]
        );
    }

    #[test]
    fn test_package_collision_keeps_later_content() {
        let output = package(vec![
            ("Fluxo_1_Ana.xlsx".to_string(), b"first".to_vec()),
            ("Fluxo_2_Bia.xlsx".to_string(), b"second".to_vec()),
            ("Fluxo_1_Ana.xlsx".to_string(), b"third".to_vec()),
        ]);
        assert_eq!(output.report.documents, 3);
        assert_eq!(output.report.entries, 2);
        assert_eq!(output.report.collisions, vec!["Fluxo_1_Ana.xlsx"]);
        assert_eq!(output.archive.get("Fluxo_1_Ana.xlsx"), Some(&b"third"[..]));
        assert_eq!(
            output.archive.names().collect::<Vec<_>>(),
            vec!["Fluxo_1_Ana.xlsx", "Fluxo_2_Bia.xlsx"]
        );
    }

    #[test]
    fn test_empty_records_never_read_template() {
        let template = Template::from_bytes(b"not a spreadsheet".to_vec());
        let output =
            fill_batch(&template, &[], &CellMap::default(), &FillOptions::default(), None).unwrap();
        assert!(output.archive.is_empty());
        assert_eq!(output.report, BatchReport::default());
    }

    #[test]
    fn test_unreadable_template_aborts_batch() {
        let template = Template::from_bytes(b"not a spreadsheet".to_vec());
        let records = vec![Record::default(), Record::default()];
        for jobs in [1, 4] {
            let options = FillOptions::default().with_jobs(jobs);
            let err = fill_batch(&template, &records, &CellMap::default(), &options, None).unwrap_err();
            assert!(matches!(err, Error::TemplateRead(_)), "jobs={jobs}: {err}");
        }
    }

    #[test]
    fn test_deliver_archive_to_sink() {
        use fichas_domain::repository::MemorySink;

        let output = package(vec![("Fluxo_1_Ana.xlsx".to_string(), b"sheet".to_vec())]);
        let mut sink = MemorySink::default();
        deliver_archive(&output.archive, "Fichas_Preenchidas.zip", &mut sink).unwrap();

        assert_eq!(sink.name.as_deref(), Some("Fichas_Preenchidas.zip"));
        assert_eq!(sink.bytes, output.archive.to_zip_bytes().unwrap());
    }

    #[test]
    fn test_missing_inputs() {
        let err = generate_sheets(&[], "Acme\nSteel", &CellMap::default(), &FillOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, Error::InputMissing(_)));

        let err = generate_sheets(b"PK", "", &CellMap::default(), &FillOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, Error::InputMissing(_)));
    }
}
