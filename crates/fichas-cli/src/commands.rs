//! Command handlers

use crate::cli::{Cli, Commands};
use crate::output::{output_generated, output_records};
use fichas_app::app::{deliver_archive, generate_sheets, FillOptions};
use fichas_app::config::Config;
use fichas_app::export::{write_preview_csv, write_preview_xlsx, PreviewTable};
use fichas_domain::model::{CellRef, FieldKey};
use fichas_domain::service::parse_records;
use fichas_infra::text_loader::{load_raw_text, read_raw_text};
use fichas_infra::{FileArchiveSink, Template};
use fichas_types::{Error, OutputFormat, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub fn execute(cli: Cli) -> Result<()> {
    // Load config
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let output_format = cli.format.unwrap_or(config.output_format);

    match cli.command {
        Commands::Generate {
            template,
            input,
            output,
            jobs,
            preview_csv,
            preview_xlsx,
        } => {
            let options = FillOptions {
                jobs: resolve_jobs(jobs.unwrap_or(config.jobs)),
            };
            let output = output.unwrap_or_else(|| PathBuf::from(&config.archive_name));
            cmd_generate(
                &config,
                output_format,
                template,
                input,
                output,
                options,
                preview_csv,
                preview_xlsx,
            )
        }
        Commands::Parse { input } => {
            let raw_text = read_input(input.as_deref())?;
            let records = parse_records(&raw_text);
            output_records(output_format, &records)
        }
        Commands::Inspect { template, cells } => {
            cmd_inspect(&config, output_format, &template, cells)
        }
        Commands::Config {
            show,
            set_archive_name,
            set_jobs,
            set_output,
            set_cell,
            unset_cell,
            reset,
        } => {
            let path = match cli.config {
                Some(path) => path,
                None => Config::config_path()?,
            };
            cmd_config(
                &path,
                show,
                set_archive_name,
                set_jobs,
                set_output,
                set_cell,
                unset_cell,
                reset,
            )
        }
    }
}

/// 0 means one job per CPU
fn resolve_jobs(jobs: usize) -> usize {
    if jobs == 0 {
        num_cpus::get()
    } else {
        jobs
    }
}

fn read_input(input: Option<&Path>) -> Result<String> {
    let text = match input {
        Some(path) => load_raw_text(path)?,
        None => read_raw_text(std::io::stdin().lock())?,
    };
    Ok(text)
}

#[allow(clippy::too_many_arguments)]
fn cmd_generate(
    config: &Config,
    output_format: OutputFormat,
    template: PathBuf,
    input: Option<PathBuf>,
    output: PathBuf,
    options: FillOptions,
    preview_csv: Option<PathBuf>,
    preview_xlsx: Option<PathBuf>,
) -> Result<()> {
    let template_bytes = std::fs::read(&template)?;
    let raw_text = read_input(input.as_deref())?;

    tracing::debug!(
        template = %template.display(),
        jobs = options.jobs,
        "generating sheets"
    );

    // Setup progress bar
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {pos} fichas {msg}")
    {
        pb.set_style(style);
    }
    let progress: &(dyn Fn() + Sync) = &|| pb.inc(1);

    let generated = generate_sheets(
        &template_bytes,
        &raw_text,
        &config.cell_map,
        &options,
        Some(progress),
    );
    pb.finish_and_clear();
    let generated = generated?;

    let mut sink = FileArchiveSink::at_path(&output);
    deliver_archive(&generated.archive, &config.archive_name, &mut sink)?;
    let archive_path = sink.written().map(Path::to_path_buf).unwrap_or(output);

    if preview_csv.is_some() || preview_xlsx.is_some() {
        let table = PreviewTable::from_records(&generated.records);
        if let Some(path) = preview_csv {
            let file = File::create(&path)?;
            write_preview_csv(&table, BufWriter::new(file))?;
            eprintln!("Preview written to {}", path.display());
        }
        if let Some(path) = preview_xlsx {
            write_preview_xlsx(&table, &path)?;
            eprintln!("Preview written to {}", path.display());
        }
    }

    output_generated(
        output_format,
        &generated.records,
        &generated.report,
        &archive_path,
    )
}

fn cmd_inspect(
    config: &Config,
    output_format: OutputFormat,
    template: &Path,
    cells: Vec<CellRef>,
) -> Result<()> {
    let template =
        Template::open(template).map_err(|e| Error::TemplateRead(e.to_string()))?;
    let sheet = template
        .active_sheet_part()
        .map_err(|e| Error::TemplateRead(e.to_string()))?;

    let targets: Vec<(Option<FieldKey>, CellRef)> = if cells.is_empty() {
        config.cell_map.iter().map(|(key, cell)| (Some(key), cell)).collect()
    } else {
        cells.into_iter().map(|cell| (None, cell)).collect()
    };

    let mut rows = Vec::with_capacity(targets.len());
    for (key, cell) in targets {
        let value = template
            .read_cell_text(cell)
            .map_err(|e| Error::TemplateRead(e.to_string()))?;
        rows.push((key, cell, value));
    }

    if output_format == OutputFormat::Json {
        let cells: Vec<_> = rows
            .iter()
            .map(|(key, cell, value)| {
                serde_json::json!({
                    "field": key.map(|k| k.label()),
                    "cell": cell.to_a1(),
                    "value": value,
                })
            })
            .collect();
        let content = serde_json::json!({ "sheet": sheet, "cells": cells });
        println!("{}", serde_json::to_string_pretty(&content)?);
    } else {
        println!("Active sheet: {}", sheet);
        println!();
        for (key, cell, value) in rows {
            let label = key.map(|k| k.label()).unwrap_or("-");
            let value = match value {
                Some(v) if v.is_empty() => "(blank)".to_string(),
                Some(v) => v,
                None => "(no cell)".to_string(),
            };
            println!("{:<14} {:<6} {}", label, cell.to_a1(), value);
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_config(
    path: &Path,
    show: bool,
    set_archive_name: Option<String>,
    set_jobs: Option<usize>,
    set_output: Option<OutputFormat>,
    set_cell: Vec<(FieldKey, CellRef)>,
    unset_cell: Vec<FieldKey>,
    reset: bool,
) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save_to(path)?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        println!("Config file:    {}", path.display());
        return Ok(());
    }

    let mut config = Config::load_from(path)?;
    let mut modified = false;

    if let Some(name) = set_archive_name {
        if name.trim().is_empty() {
            return Err(Error::InputMissing("archive name must not be empty".to_string()));
        }
        config.archive_name = name;
        modified = true;
    }

    if let Some(jobs) = set_jobs {
        config.jobs = jobs;
        modified = true;
    }

    if let Some(output_format) = set_output {
        config.output_format = output_format;
        modified = true;
    }

    for (key, cell) in set_cell {
        config.cell_map.insert(key, cell);
        modified = true;
    }

    for key in unset_cell {
        config.cell_map.remove(key);
        modified = true;
    }

    if modified {
        config.save_to(path)?;
        println!("Configuration updated");
    }

    if show || !modified {
        println!("{}", config);
        println!("Config file:    {}", path.display());
    }

    Ok(())
}
