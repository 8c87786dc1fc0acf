//! Block parser: raw pasted text -> ordered records
//!
//! Blocks are separated by blank lines. Within a block the first two lines are the
//! carrier and the cargo; every other field is found through its label (`MOT:`,
//! `CPF:`, ...) anywhere in the block.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{FieldKey, Record, Vehicle};

/// Blocks shorter than this (trimmed, in characters) are noise.
pub const MIN_BLOCK_CHARS: usize = 10;

static BLOCK_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").expect("valid block separator pattern"));

/// Label table: field, label token, value pattern.
/// The value never crosses the end of its line.
const LABEL_RULES: [(FieldKey, &str, &str); 7] = [
    (FieldKey::Driver, "MOT:", r".*"),
    (FieldKey::Cpf, "CPF:", r"[\d.-]+"),
    (FieldKey::Rg, "RG:", r"\d+"),
    (FieldKey::Cnh, "CNH:", r"\d+"),
    (FieldKey::Truck, "TRUCK:", r"[A-Z0-9]+"),
    (FieldKey::Tractor, "CAVALO:", r"[A-Z0-9]+"),
    (FieldKey::Trailer, "CARRETA:", r"[A-Z0-9]+"),
];

static LABEL_PATTERNS: LazyLock<Vec<(FieldKey, Regex)>> = LazyLock::new(|| {
    LABEL_RULES
        .iter()
        .map(|(field, label, value)| {
            let pattern = format!(r"{}[ \t]*({})", regex::escape(label), value);
            (*field, Regex::new(&pattern).expect("valid label pattern"))
        })
        .collect()
});

/// Split raw text into blocks and parse every block that is not noise.
///
/// Output order follows block order. Empty input yields no records.
pub fn parse_records(raw: &str) -> Vec<Record> {
    split_blocks(raw).into_iter().map(parse_block).collect()
}

/// Blank-line separated blocks, trimmed, with noise blocks removed.
pub fn split_blocks(raw: &str) -> Vec<&str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    BLOCK_SEPARATOR
        .split(raw)
        .map(str::trim)
        .filter(|block| {
            let keep = block.chars().count() >= MIN_BLOCK_CHARS;
            if !keep && !block.is_empty() {
                tracing::debug!(block = %block, "skipping short block");
            }
            keep
        })
        .collect()
}

/// Parse one block. Never fails: a missing label is an empty value.
pub fn parse_block(block: &str) -> Record {
    let block = block.trim();
    let lines: Vec<&str> = block.lines().collect();

    let (carrier, cargo) = if lines.len() >= 2 {
        (lines[0].trim().to_string(), lines[1].trim().to_string())
    } else {
        (String::new(), String::new())
    };

    let mut labeled = extract_labeled(block);
    let mut take = |key: FieldKey| labeled.remove(&key).unwrap_or_default();

    let driver = take(FieldKey::Driver);
    let cpf = take(FieldKey::Cpf);
    let rg = take(FieldKey::Rg);
    let cnh = take(FieldKey::Cnh);
    let truck = take(FieldKey::Truck);
    let tractor = take(FieldKey::Tractor);
    let trailer = take(FieldKey::Trailer);

    if !truck.is_empty() && !(tractor.is_empty() && trailer.is_empty()) {
        tracing::debug!(%truck, %tractor, %trailer, "truck present, ignoring tractor/trailer");
    }

    Record {
        carrier,
        cargo,
        driver,
        cpf,
        rg,
        cnh,
        vehicle: Vehicle::resolve(truck, tractor, trailer),
    }
}

/// First match of every label rule, trimmed. Labels without a match are absent.
fn extract_labeled(text: &str) -> BTreeMap<FieldKey, String> {
    LABEL_PATTERNS
        .iter()
        .filter_map(|(field, re)| {
            re.captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| (*field, m.as_str().trim().to_string()))
        })
        .collect()
}
