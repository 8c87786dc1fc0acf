//! Record attribute names

use serde::{Deserialize, Serialize};

/// One attribute of a [`Record`](super::Record).
///
/// Serialized under the labels used by the printed form (`TRANSPORTADOR`, `CARGA`, ...).
/// Declaration order is the preview column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKey {
    #[serde(rename = "TRANSPORTADOR")]
    Carrier,
    #[serde(rename = "CARGA")]
    Cargo,
    #[serde(rename = "MOTORISTA")]
    Driver,
    #[serde(rename = "CPF")]
    Cpf,
    #[serde(rename = "RG")]
    Rg,
    #[serde(rename = "CNH")]
    Cnh,
    #[serde(rename = "TRUCK")]
    Truck,
    #[serde(rename = "CAVALO")]
    Tractor,
    #[serde(rename = "CARRETA")]
    Trailer,
}

impl FieldKey {
    pub const ALL: [FieldKey; 9] = [
        FieldKey::Carrier,
        FieldKey::Cargo,
        FieldKey::Driver,
        FieldKey::Cpf,
        FieldKey::Rg,
        FieldKey::Cnh,
        FieldKey::Truck,
        FieldKey::Tractor,
        FieldKey::Trailer,
    ];

    /// Form label for this field
    pub fn label(self) -> &'static str {
        match self {
            FieldKey::Carrier => "TRANSPORTADOR",
            FieldKey::Cargo => "CARGA",
            FieldKey::Driver => "MOTORISTA",
            FieldKey::Cpf => "CPF",
            FieldKey::Rg => "RG",
            FieldKey::Cnh => "CNH",
            FieldKey::Truck => "TRUCK",
            FieldKey::Tractor => "CAVALO",
            FieldKey::Trailer => "CARRETA",
        }
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
