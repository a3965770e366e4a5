use std::collections::HashMap;
use tracing::debug;

use super::workbook::{Column, Sheet, SheetRow};

const ADDRESS_COLUMN: Column = Column::from_letter('C');
const NAME_COLUMN: Column = Column::from_letter('H');
const PHONE_COLUMN: Column = Column::from_letter('I');

/// One row of the resident directory sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidentRecord {
    pub address: String,
    pub name: String,
    pub phone: String,
}

impl ResidentRecord {
    pub fn new(
        address: impl Into<String>,
        name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            phone: phone.into(),
        }
    }

    pub fn from_row(row: &SheetRow) -> Self {
        Self {
            address: row.cell(ADDRESS_COLUMN).to_text(),
            name: row.cell(NAME_COLUMN).to_text(),
            phone: row.cell(PHONE_COLUMN).to_text(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidentContact {
    pub name: String,
    pub phone: String,
}

/// Resident contacts keyed by the canonical street address.
#[derive(Debug, Clone, Default)]
pub struct ResidentIndex {
    entries: HashMap<String, ResidentContact>,
}

impl ResidentIndex {
    /// Builds the index from directory rows. The first row is the header;
    /// rows without an address are dropped and later duplicates win.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ResidentRecord>,
    {
        let mut entries = HashMap::new();

        for record in records.into_iter().skip(1) {
            let address = record.address.trim();
            if address.is_empty() {
                continue;
            }

            let contact = ResidentContact {
                name: record.name,
                phone: record.phone,
            };
            if entries.insert(address.to_string(), contact).is_some() {
                debug!(address, "duplicate resident address, keeping the later row");
            }
        }

        Self { entries }
    }

    pub fn from_sheet(sheet: &Sheet) -> Self {
        Self::build(sheet.rows().iter().map(ResidentRecord::from_row))
    }

    pub fn lookup(&self, address: &str) -> Option<&ResidentContact> {
        self.entries.get(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
