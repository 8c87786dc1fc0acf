//! Cell coordinates and the field-to-cell map of the printed form

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::FieldKey;

pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLS: u32 = 16_384;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellRefError {
    #[error("invalid cell reference: {0:?}")]
    Invalid(String),

    #[error("cell reference out of sheet bounds: {0}")]
    OutOfBounds(String),
}

/// Zero-based cell coordinate, written in A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRef {
    row: u32,
    col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    /// Parse `B2`-style references. Lowercase column letters are accepted.
    pub fn from_a1(s: &str) -> Result<Self, CellRefError> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(|| CellRefError::Invalid(s.to_string()))?;
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CellRefError::Invalid(s.to_string()));
        }

        let col_1 = column_number(letters).ok_or_else(|| CellRefError::OutOfBounds(s.to_string()))?;
        let row_1: u32 = digits
            .parse()
            .map_err(|_| CellRefError::OutOfBounds(s.to_string()))?;
        if row_1 == 0 {
            return Err(CellRefError::Invalid(s.to_string()));
        }
        if row_1 > MAX_ROWS {
            return Err(CellRefError::OutOfBounds(s.to_string()));
        }

        Ok(Self::new(row_1 - 1, col_1 - 1))
    }

    pub fn to_a1(&self) -> String {
        format!("{}{}", column_letters(self.col), self.row + 1)
    }
}

/// `A` -> 1, `Z` -> 26, `AA` -> 27. `None` past column XFD.
fn column_number(letters: &str) -> Option<u32> {
    let mut col: u32 = 0;
    for b in letters.bytes() {
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
        if col > MAX_COLS {
            return None;
        }
    }
    Some(col)
}

/// Zero-based column index to letters (`0` -> `A`).
pub fn column_letters(col: u32) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

impl FromStr for CellRef {
    type Err = CellRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1(s)
    }
}

impl TryFrom<String> for CellRef {
    type Error = CellRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_a1(&value)
    }
}

impl From<CellRef> for String {
    fn from(cell: CellRef) -> Self {
        cell.to_a1()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Where each record field is written in the template's active sheet.
///
/// Fields without an entry are not written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellMap(BTreeMap<FieldKey, CellRef>);

impl CellMap {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: FieldKey) -> Option<CellRef> {
        self.0.get(&key).copied()
    }

    pub fn insert(&mut self, key: FieldKey, cell: CellRef) -> Option<CellRef> {
        self.0.insert(key, cell)
    }

    pub fn remove(&mut self, key: FieldKey) -> Option<CellRef> {
        self.0.remove(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, CellRef)> + '_ {
        self.0.iter().map(|(key, cell)| (*key, *cell))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CellMap {
    fn default() -> Self {
        Self(BTreeMap::from([
            (FieldKey::Carrier, CellRef::new(1, 1)),  // B2
            (FieldKey::Cargo, CellRef::new(1, 9)),    // J2
            (FieldKey::Driver, CellRef::new(3, 1)),   // B4
            (FieldKey::Cnh, CellRef::new(3, 9)),      // J4
            (FieldKey::Rg, CellRef::new(4, 1)),       // B5
            (FieldKey::Cpf, CellRef::new(4, 9)),      // J5
            (FieldKey::Truck, CellRef::new(9, 1)),    // B10
            (FieldKey::Tractor, CellRef::new(10, 1)), // B11
            (FieldKey::Trailer, CellRef::new(11, 1)), // B12
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_a1() {
        assert_eq!(CellRef::from_a1("B2").unwrap(), CellRef::new(1, 1));
        assert_eq!(CellRef::from_a1("j5").unwrap(), CellRef::new(4, 9));
        assert_eq!(CellRef::from_a1("AA10").unwrap(), CellRef::new(9, 26));
        assert_eq!(CellRef::from_a1("XFD1048576").unwrap(), CellRef::new(1_048_575, 16_383));
    }

    #[test]
    fn test_parse_a1_rejects_garbage() {
        assert!(CellRef::from_a1("").is_err());
        assert!(CellRef::from_a1("B").is_err());
        assert!(CellRef::from_a1("12").is_err());
        assert!(CellRef::from_a1("B0").is_err());
        assert!(CellRef::from_a1("B2C").is_err());
        assert!(matches!(CellRef::from_a1("XFE1"), Err(CellRefError::OutOfBounds(_))));
        assert!(matches!(CellRef::from_a1("A1048577"), Err(CellRefError::OutOfBounds(_))));
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(16_383), "XFD");
        assert_eq!(CellRef::new(11, 1).to_a1(), "B12");
    }

    #[test]
    fn test_default_map_matches_form_layout() {
        let map = CellMap::default();
        let cells: Vec<(String, String)> = map
            .iter()
            .map(|(key, cell)| (key.label().to_string(), cell.to_a1()))
            .collect();
        assert_eq!(
            cells,
            vec![
                ("TRANSPORTADOR".to_string(), "B2".to_string()),
                ("CARGA".to_string(), "J2".to_string()),
                ("MOTORISTA".to_string(), "B4".to_string()),
                ("CPF".to_string(), "J5".to_string()),
                ("RG".to_string(), "B5".to_string()),
                ("CNH".to_string(), "J4".to_string()),
                ("TRUCK".to_string(), "B10".to_string()),
                ("CAVALO".to_string(), "B11".to_string()),
                ("CARRETA".to_string(), "B12".to_string()),
            ]
        );
    }

    #[test]
    fn test_map_json_round_trip_uses_labels() {
        let mut map = CellMap::empty();
        map.insert(FieldKey::Driver, CellRef::new(3, 1));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"MOTORISTA":"B4"}"#);

        let parsed: CellMap = serde_json::from_str(r#"{"CAVALO":"c7"}"#).unwrap();
        assert_eq!(parsed.get(FieldKey::Tractor), Some(CellRef::new(6, 2)));

        assert!(serde_json::from_str::<CellMap>(r#"{"CAVALO":"7C"}"#).is_err());
        assert!(serde_json::from_str::<CellMap>(r#"{"PLACA":"B2"}"#).is_err());
    }
}
