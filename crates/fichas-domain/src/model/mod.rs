//! Domain model types

pub mod cell_map;
pub mod field;
pub mod record;

pub use cell_map::{CellMap, CellRef, CellRefError};
pub use field::FieldKey;
pub use record::{Record, Vehicle};
