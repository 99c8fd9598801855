//! CSV and JSON writers for model results

use csv::Writer;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::archetype::{Archetype, PROFILE_COLUMN};
use crate::error::Result;
use crate::scenario::ScenarioRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Write rows as CSV with a header taken from the serde field names
pub fn write_csv<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv = Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write rows as a pretty-printed JSON array
pub fn write_json<T: Serialize, W: Write>(mut writer: W, rows: &[T]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writeln!(writer)?;
    Ok(())
}

pub fn write_rows<T: Serialize, W: Write>(writer: W, rows: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(writer, rows),
        OutputFormat::Json => write_json(writer, rows),
    }
}

/// Write rows to `path`, replacing any existing file
pub fn write_rows_to_path<T: Serialize>(path: &Path, rows: &[T], format: OutputFormat) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    write_rows(file, rows, format)?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Wide view of long-form records: one row per archetype and scenario, with
/// the archetype's attributes followed by one column per variable
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryTable {
    pub variables: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub archetype: Archetype,
    pub scenario: String,
    /// Aligned with [`SummaryTable::variables`]; `None` where no record exists
    pub values: Vec<Option<f64>>,
}

const ATTRIBUTE_COLUMNS: [&str; 7] = [
    "scenario",
    "ArchetypeHeatingFuel",
    "ArchetypeNickname",
    "ArchetypeSize",
    "ElectricitySingleRatekWh",
    "GaskWh",
    "GrossAnnualHouseholdIncome",
];

/// Pivot records into a [`SummaryTable`]
///
/// Rows are sorted by profile then scenario; variables keep the order they
/// first appear in `records`. Records for profiles not in `archetypes` are
/// dropped.
pub fn summary_table(records: &[ScenarioRecord], archetypes: &[Archetype]) -> SummaryTable {
    let mut variables: Vec<String> = Vec::new();
    for record in records {
        if !variables.contains(&record.variable) {
            variables.push(record.variable.clone());
        }
    }

    let mut cells: BTreeMap<(&str, &str), Vec<Option<f64>>> = BTreeMap::new();
    for record in records {
        let Some(column) = variables.iter().position(|v| *v == record.variable) else {
            continue;
        };
        let row = cells
            .entry((record.archetype.as_str(), record.scenario.as_str()))
            .or_insert_with(|| vec![None; variables.len()]);
        row[column] = Some(record.value);
    }

    let rows = cells
        .into_iter()
        .filter_map(|((profile, scenario), values)| {
            let archetype = archetypes.iter().find(|a| a.profile == profile)?;
            Some(SummaryRow { archetype: archetype.clone(), scenario: scenario.to_string(), values })
        })
        .collect();

    SummaryTable { variables, rows }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl SummaryTable {
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = Writer::from_writer(writer);

        let mut header: Vec<&str> = vec![PROFILE_COLUMN];
        header.extend(ATTRIBUTE_COLUMNS);
        header.extend(self.variables.iter().map(String::as_str));
        csv.write_record(&header)?;

        for row in &self.rows {
            let a = &row.archetype;
            let mut record = vec![
                a.profile.clone(),
                row.scenario.clone(),
                a.heating_fuel.clone().unwrap_or_default(),
                a.nickname.clone().unwrap_or_default(),
                cell(a.size),
                a.electricity_kwh.to_string(),
                a.gas_kwh.to_string(),
                cell(a.income),
            ];
            record.extend(row.values.iter().map(|&v| cell(v)));
            csv.write_record(&record)?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn write_csv_to_path(&self, path: &Path) -> Result<()> {
        self.write_csv(BufWriter::new(File::create(path)?))?;
        info!("Wrote summary of {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::LevyRateRow;

    fn record(archetype: &str, scenario: &str, variable: &str, value: f64) -> ScenarioRecord {
        ScenarioRecord {
            archetype: archetype.to_string(),
            scenario: scenario.to_string(),
            variable: variable.to_string(),
            value,
        }
    }

    #[test]
    fn test_write_records_csv() {
        let rows = vec![record("Typical", "Baseline", "total levy costs", 250.5)];
        let mut out = Vec::new();
        write_csv(&mut out, &rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "AnnualConsumptionProfile,scenario,variable,value\nTypical,Baseline,total levy costs,250.5\n"
        );
    }

    #[test]
    fn test_write_rate_rows_use_display_headers() {
        let rows = vec![LevyRateRow {
            levy: "Green Gas Levy".to_string(),
            electricity_variable_rate: 0.0,
            electricity_fixed_rate: 0.0,
            gas_variable_rate: 0.0,
            gas_fixed_rate: 1.91,
            general_taxation: 0.0,
        }];
        let mut out = Vec::new();
        write_csv(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("Levy,\"Electricity, variable rate (£/MWh)\""));
        assert!(text.lines().nth(1).unwrap().starts_with("Green Gas Levy,0.0,0.0,0.0,1.91"));
    }

    #[test]
    fn test_write_json_array() {
        let rows = vec![record("Typical", "Baseline", "gas bill incl VAT", 900.0)];
        let mut out = Vec::new();
        write_rows(&mut out, &rows, OutputFormat::Json).unwrap();
        let parsed: Vec<ScenarioRecord> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_summary_table_pivots_records() {
        let archetypes = vec![
            Archetype::new("Typical", 2_700.0, 11_500.0),
            Archetype::new("Flat electric", 3_000.0, 0.0).with_size(1_000.0),
        ];
        let records = vec![
            record("Typical", "Baseline", "electricity bill incl VAT", 800.0),
            record("Flat electric", "Baseline", "electricity bill incl VAT", 900.0),
            record("Typical", "Baseline", "gas bill incl VAT", 1_000.0),
            record("Typical", "All gas", "electricity bill incl VAT", 700.0),
            record("Unknown", "Baseline", "gas bill incl VAT", 1.0),
        ];

        let table = summary_table(&records, &archetypes);
        assert_eq!(table.variables, ["electricity bill incl VAT", "gas bill incl VAT"]);
        let keys: Vec<(&str, &str)> =
            table.rows.iter().map(|r| (r.archetype.profile.as_str(), r.scenario.as_str())).collect();
        assert_eq!(keys, [("Flat electric", "Baseline"), ("Typical", "All gas"), ("Typical", "Baseline")]);
        assert_eq!(table.rows[0].values, [Some(900.0), None]);
        assert_eq!(table.rows[2].values, [Some(800.0), Some(1_000.0)]);

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "AnnualConsumptionProfile,scenario,ArchetypeHeatingFuel,ArchetypeNickname,ArchetypeSize,\
             ElectricitySingleRatekWh,GaskWh,GrossAnnualHouseholdIncome,\
             electricity bill incl VAT,gas bill incl VAT"
        );
        assert_eq!(lines.next().unwrap(), "Flat electric,Baseline,,,1000,3000,0,,900,");
    }
}
