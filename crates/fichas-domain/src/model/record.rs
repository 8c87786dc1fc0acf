//! Driver/shipment record extracted from one text block

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::FieldKey;

/// Vehicle configuration of a record.
///
/// A single truck and a tractor/trailer combination are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Vehicle {
    #[default]
    None,
    Truck(String),
    Combination { tractor: String, trailer: String },
}

impl Vehicle {
    /// Build the vehicle from the three raw label values.
    ///
    /// A non-empty truck always wins; tractor and trailer are dropped in that case.
    pub fn resolve(truck: String, tractor: String, trailer: String) -> Self {
        if !truck.is_empty() {
            Vehicle::Truck(truck)
        } else if tractor.is_empty() && trailer.is_empty() {
            Vehicle::None
        } else {
            Vehicle::Combination { tractor, trailer }
        }
    }

    pub fn truck(&self) -> &str {
        match self {
            Vehicle::Truck(plate) => plate,
            _ => "",
        }
    }

    pub fn tractor(&self) -> &str {
        match self {
            Vehicle::Combination { tractor, .. } => tractor,
            _ => "",
        }
    }

    pub fn trailer(&self) -> &str {
        match self {
            Vehicle::Combination { trailer, .. } => trailer,
            _ => "",
        }
    }
}

/// One parsed block. Missing values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub carrier: String,
    pub cargo: String,
    pub driver: String,
    pub cpf: String,
    pub rg: String,
    pub cnh: String,
    pub vehicle: Vehicle,
}

impl Record {
    pub fn truck(&self) -> &str {
        self.vehicle.truck()
    }

    pub fn tractor(&self) -> &str {
        self.vehicle.tractor()
    }

    pub fn trailer(&self) -> &str {
        self.vehicle.trailer()
    }

    /// Value of a single field
    pub fn value(&self, key: FieldKey) -> &str {
        match key {
            FieldKey::Carrier => &self.carrier,
            FieldKey::Cargo => &self.cargo,
            FieldKey::Driver => &self.driver,
            FieldKey::Cpf => &self.cpf,
            FieldKey::Rg => &self.rg,
            FieldKey::Cnh => &self.cnh,
            FieldKey::Truck => self.truck(),
            FieldKey::Tractor => self.tractor(),
            FieldKey::Trailer => self.trailer(),
        }
    }

    /// All fields in preview column order
    pub fn fields(&self) -> impl Iterator<Item = (FieldKey, &str)> + '_ {
        FieldKey::ALL.into_iter().map(move |key| (key, self.value(key)))
    }
}

// Flat map keyed by form label, so the preview shows one column per field.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FieldKey::ALL.len()))?;
        for (key, value) in self.fields() {
            map.serialize_entry(key.label(), value)?;
        }
        map.end()
    }
}
