//! Load archetype and eligibility tables

use csv::Reader;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use super::{Archetype, EligibilityTable, PROFILE_COLUMN};
use crate::error::{LevyError, Result};
use crate::levy::loader::{read_rows, read_rows_from_path};

/// Default path to the archetype table
pub const DEFAULT_ARCHETYPES_PATH: &str = "data/archetypes.csv";

/// Load archetypes from a CSV file
pub fn load_archetypes(path: &Path) -> Result<Vec<Archetype>> {
    read_rows_from_path(path)
}

/// Load archetypes from any reader
pub fn load_archetypes_from_reader<R: Read>(reader: R) -> Result<Vec<Archetype>> {
    read_rows(reader)
}

/// Load an eligibility table from a CSV file
pub fn load_eligibility(path: &Path) -> Result<EligibilityTable> {
    eligibility_from_csv(Reader::from_path(path)?)
}

/// Load an eligibility table from any reader
pub fn load_eligibility_from_reader<R: Read>(reader: R) -> Result<EligibilityTable> {
    eligibility_from_csv(Reader::from_reader(reader))
}

fn eligibility_from_csv<R: Read>(mut reader: Reader<R>) -> Result<EligibilityTable> {
    let headers = reader.headers()?.clone();
    let profile_index = headers
        .iter()
        .position(|h| h == PROFILE_COLUMN)
        .ok_or_else(|| LevyError::MissingColumn(PROFILE_COLUMN.to_string()))?;

    // Descriptive text columns (nicknames, heating fuel) are skipped
    let mut numeric: Vec<bool> = vec![true; headers.len()];
    numeric[profile_index] = false;
    let records: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;
    for record in &records {
        for (i, field) in record.iter().enumerate() {
            let field = field.trim();
            if i < numeric.len() && !field.is_empty() && field.parse::<f64>().is_err() {
                numeric[i] = false;
            }
        }
    }

    let columns = headers
        .iter()
        .zip(&numeric)
        .filter(|(_, is_numeric)| **is_numeric)
        .map(|(h, _)| h.to_string())
        .collect();
    let mut table = EligibilityTable::new(columns);

    for record in &records {
        let profile = record
            .get(profile_index)
            .ok_or_else(|| LevyError::MissingColumn(PROFILE_COLUMN.to_string()))?;
        let mut values = HashMap::new();
        for (i, field) in record.iter().enumerate() {
            let field = field.trim();
            if !numeric.get(i).copied().unwrap_or(false) || field.is_empty() {
                continue;
            }
            let value = field.parse::<f64>().map_err(|_| LevyError::InvalidValue {
                column: headers[i].to_string(),
                value: field.to_string(),
            })?;
            values.insert(headers[i].to_string(), value);
        }
        table.push(profile, values);
    }

    Ok(table)
}
