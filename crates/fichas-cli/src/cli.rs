//! CLI definition using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fichas_domain::model::{CellRef, FieldKey};
use fichas_types::OutputFormat;

#[derive(Parser)]
#[command(name = "fichas")]
#[command(version)]
#[command(about = "Fill one spreadsheet form per driver record and zip them")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output (debug logging; RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fill the template once per record and write the zip archive
    Generate {
        /// Template spreadsheet (.xlsx)
        #[arg(long, short = 't')]
        template: PathBuf,

        /// Raw driver text. Reads stdin when omitted.
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// Archive path. Defaults to the configured archive name in the current directory.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Parallel fills (0 = CPU count). Uses config value if not specified.
        #[arg(long, short = 'j')]
        jobs: Option<usize>,

        /// Also write the record preview as CSV
        #[arg(long)]
        preview_csv: Option<PathBuf>,

        /// Also write the record preview as Excel
        #[arg(long)]
        preview_xlsx: Option<PathBuf>,
    },

    /// Parse raw text and print the records without filling anything
    Parse {
        /// Raw driver text. Reads stdin when omitted.
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
    },

    /// Show the active sheet's values at the mapped cells (or the given ones)
    Inspect {
        /// Template or filled spreadsheet (.xlsx)
        #[arg(long, short = 't')]
        template: PathBuf,

        /// Cells to read, e.g. B4 J5
        #[arg(value_parser = parse_cell)]
        cells: Vec<CellRef>,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set the archive file name
        #[arg(long)]
        set_archive_name: Option<String>,

        /// Set default parallel fills (0 = CPU count)
        #[arg(long)]
        set_jobs: Option<usize>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,

        /// Map a field to a cell, e.g. MOTORISTA=B4 (repeatable)
        #[arg(long, value_parser = parse_cell_assignment)]
        set_cell: Vec<(FieldKey, CellRef)>,

        /// Stop filling a field (repeatable)
        #[arg(long, value_parser = parse_field_key)]
        unset_cell: Vec<FieldKey>,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,
    },
}

fn parse_cell(arg: &str) -> Result<CellRef, String> {
    CellRef::from_a1(arg).map_err(|e| e.to_string())
}

/// Field by its form label (`MOTORISTA`, `cpf`, ...)
fn parse_field_key(arg: &str) -> Result<FieldKey, String> {
    let wanted = arg.trim();
    FieldKey::ALL
        .into_iter()
        .find(|key| key.label().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| {
            let labels: Vec<&str> = FieldKey::ALL.iter().map(|k| k.label()).collect();
            format!("unknown field '{}', expected one of {}", wanted, labels.join(", "))
        })
}

fn parse_cell_assignment(arg: &str) -> Result<(FieldKey, CellRef), String> {
    let (field, cell) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=CELL, got '{}'", arg))?;
    Ok((parse_field_key(field)?, parse_cell(cell.trim())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_assignment() {
        assert_eq!(
            parse_cell_assignment("motorista=c7").unwrap(),
            (FieldKey::Driver, CellRef::new(6, 2))
        );
        assert_eq!(
            parse_cell_assignment("CAVALO = B11").unwrap(),
            (FieldKey::Tractor, CellRef::new(10, 1))
        );
        assert!(parse_cell_assignment("MOTORISTA").is_err());
        assert!(parse_cell_assignment("PLACA=B2").is_err());
        assert!(parse_cell_assignment("CPF=2B").is_err());
    }

    #[test]
    fn test_generate_args() {
        let cli = Cli::try_parse_from([
            "fichas", "-f", "json", "generate", "--template", "form.xlsx", "-j", "4",
        ])
        .unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Generate {
                template,
                input,
                jobs,
                ..
            } => {
                assert_eq!(template, PathBuf::from("form.xlsx"));
                assert_eq!(input, None);
                assert_eq!(jobs, Some(4));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_inspect_rejects_bad_cell() {
        assert!(Cli::try_parse_from(["fichas", "inspect", "-t", "a.xlsx", "B4", "J5"]).is_ok());
        assert!(Cli::try_parse_from(["fichas", "inspect", "-t", "a.xlsx", "B0"]).is_err());
    }

    #[test]
    fn test_config_repeatable_cells() {
        let cli = Cli::try_parse_from([
            "fichas",
            "config",
            "--set-cell",
            "CPF=K5",
            "--set-cell",
            "RG=C5",
            "--unset-cell",
            "carga",
        ])
        .unwrap();
        match cli.command {
            Commands::Config {
                set_cell,
                unset_cell,
                ..
            } => {
                assert_eq!(set_cell.len(), 2);
                assert_eq!(unset_cell, vec![FieldKey::Cargo]);
            }
            _ => panic!("expected config"),
        }
    }
}
