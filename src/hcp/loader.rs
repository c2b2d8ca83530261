//! Load an already-joined HCP table from CSV

use super::data::{wallet_signal_column, Channel, ChannelObservation, HcpBatch, HcpRecord};
use crate::error::{EngineError, Result};
use crate::scoring::Product;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Which input columns carry identity, specialty and model features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputColumns {
    #[serde(default = "default_id_column")]
    pub id_column: String,

    #[serde(default = "default_specialty_column")]
    pub specialty_column: String,

    /// Explicit ordered feature columns. When `None`, every numeric column
    /// that is not otherwise claimed is a feature, in file order.
    #[serde(default)]
    pub feature_columns: Option<Vec<String>>,
}

fn default_id_column() -> String { "id".to_string() }
fn default_specialty_column() -> String { "specialty".to_string() }

impl Default for InputColumns {
    fn default() -> Self {
        Self {
            id_column: default_id_column(),
            specialty_column: default_specialty_column(),
            feature_columns: None,
        }
    }
}

impl InputColumns {
    /// Columns with a fixed meaning; never auto-detected as features
    fn reserved(&self) -> HashSet<String> {
        let mut reserved: HashSet<String> =
            [self.id_column.clone(), self.specialty_column.clone()].into_iter().collect();
        for channel in Channel::ALL {
            reserved.insert(channel.volume_column());
            reserved.insert(channel.share_column());
        }
        for product in Product::ALL {
            reserved.insert(wallet_signal_column(product));
        }
        reserved
    }
}

fn is_missing(cell: &str) -> bool {
    let t = cell.trim();
    t.is_empty()
        || t.eq_ignore_ascii_case("na")
        || t.eq_ignore_ascii_case("nan")
        || t.eq_ignore_ascii_case("null")
        || t.eq_ignore_ascii_case("none")
}

/// `None` for missing cells, `Some(Err)` for unparsable ones
fn parse_cell(cell: &str) -> Option<std::result::Result<f64, ()>> {
    if is_missing(cell) {
        return None;
    }
    Some(cell.trim().parse::<f64>().map_err(|_| ()).and_then(|v| {
        if v.is_finite() { Ok(v) } else { Err(()) }
    }))
}

fn is_numeric_column(rows: &[csv::StringRecord], idx: usize) -> bool {
    let mut seen_value = false;
    for row in rows {
        match parse_cell(row.get(idx).unwrap_or("")) {
            None => {}
            Some(Ok(_)) => seen_value = true,
            Some(Err(())) => return false,
        }
    }
    seen_value
}

/// Counts of cells that could not be parsed, reported once per column
#[derive(Default)]
struct BadCells(BTreeMap<String, usize>);

impl BadCells {
    fn optional(&mut self, row: &csv::StringRecord, idx: Option<usize>, name: &str) -> Option<f64> {
        match parse_cell(row.get(idx?).unwrap_or("")) {
            None => None,
            Some(Ok(v)) => Some(v),
            Some(Err(())) => {
                *self.0.entry(name.to_string()).or_insert(0) += 1;
                None
            }
        }
    }

    fn report(&self) {
        for (column, count) in &self.0 {
            warn!("Column '{column}': {count} unparsable value(s) treated as missing");
        }
    }
}

fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Load HCP rows from a CSV file
pub fn load_hcps(path: &Path, columns: &InputColumns) -> Result<HcpBatch> {
    let file = File::open(path)?;
    let batch = load_hcps_from_reader(file, columns)?;
    info!("Loaded {} HCPs from {}", batch.len(), path.display());
    Ok(batch)
}

/// Load HCP rows from any CSV reader.
///
/// Fails before touching any row if the identifier column (or an explicitly
/// requested feature column) is absent.
pub fn load_hcps_from_reader<R: Read>(reader: R, columns: &InputColumns) -> Result<HcpBatch> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let find = |name: &str| column_index(&headers, name);

    let id_idx = find(columns.id_column.as_str()).ok_or_else(|| EngineError::MissingColumn {
        column: columns.id_column.clone(),
    })?;

    let rows: Vec<csv::StringRecord> = rdr.records().collect::<std::result::Result<_, _>>()?;
    if rows.is_empty() {
        return Err(EngineError::EmptyBatch);
    }

    let feature_idx: Vec<usize> = match &columns.feature_columns {
        Some(names) => names
            .iter()
            .map(|n| {
                find(n.as_str()).ok_or_else(|| EngineError::MissingColumn { column: n.clone() })
            })
            .collect::<Result<_>>()?,
        None => {
            let reserved = columns.reserved();
            (0..headers.len())
                .filter(|&j| !reserved.contains(&headers[j]) && is_numeric_column(&rows, j))
                .collect()
        }
    };
    let feature_names: Vec<String> = feature_idx.iter().map(|&j| headers[j].clone()).collect();

    let specialty_idx = find(columns.specialty_column.as_str());
    let channel_idx: Vec<(Channel, Option<usize>, Option<usize>)> = Channel::ALL
        .into_iter()
        .map(|c| (c, find(c.volume_column().as_str()), find(c.share_column().as_str())))
        .collect();
    for (channel, volume, _) in &channel_idx {
        if volume.is_none() {
            warn!("No {} column; {channel} volume taken as 0", channel.volume_column());
        }
    }
    let wallet_idx: Vec<Option<usize>> = Product::ALL
        .into_iter()
        .map(|p| find(wallet_signal_column(p).as_str()))
        .collect();

    let mut bad = BadCells::default();
    let mut records = Vec::with_capacity(rows.len());

    for (row_no, row) in rows.iter().enumerate() {
        let mut record = HcpRecord::new(row.get(id_idx).unwrap_or("").to_string());
        record.specialty = specialty_idx
            .and_then(|j| row.get(j))
            .unwrap_or("")
            .to_string();

        for (channel, volume_idx, share_idx) in &channel_idx {
            let volume = bad
                .optional(row, *volume_idx, &channel.volume_column())
                .unwrap_or(0.0);
            let share_pct = bad.optional(row, *share_idx, &channel.share_column());
            *record.channel_mut(*channel) = ChannelObservation { volume, share_pct };
        }

        for (slot, (product, idx)) in Product::ALL.into_iter().zip(&wallet_idx).enumerate() {
            record.wallet_share_signals[slot] =
                bad.optional(row, *idx, &wallet_signal_column(product));
        }

        let mut features = Vec::with_capacity(feature_idx.len());
        for (&j, name) in feature_idx.iter().zip(&feature_names) {
            let cell = row.get(j).unwrap_or("");
            match parse_cell(cell) {
                None => features.push(0.0),
                Some(Ok(v)) => features.push(v),
                Some(Err(())) => {
                    return Err(EngineError::InvalidNumber {
                        row: row_no + 1,
                        column: name.clone(),
                        value: cell.to_string(),
                    })
                }
            }
        }
        record.features = features;
        record.input = row.iter().map(str::to_string).collect();

        records.push(record);
    }

    bad.report();
    Ok(HcpBatch::new(records, feature_names).with_input_columns(headers))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
id,specialty,ibsa_volume_trx,ibsa_share_pct_trx,ibsa_volume_nrx,ibsa_share_pct_nrx,tenure,calls_90d,region,wallet_share_growth_flector
A1,Endocrinology,25,50,5,,3,12,East,0.4
B2,Family Medicine,40,0,8,20,7,,West,
";

    #[test]
    fn test_load_sample_with_auto_features() {
        let batch = load_hcps_from_reader(SAMPLE.as_bytes(), &InputColumns::default()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.feature_names, vec!["tenure", "calls_90d"]);
        assert_eq!(batch.feature_width(), 2);

        let a = &batch.records[0];
        assert_eq!(a.id, "A1");
        assert_eq!(a.specialty, "Endocrinology");
        assert_eq!(a.trx, ChannelObservation { volume: 25.0, share_pct: Some(50.0) });
        assert_eq!(a.nrx.share_pct, None);
        assert_eq!(a.features, vec![3.0, 12.0]);
        assert_eq!(a.wallet_share_signals, [None, Some(0.4), None]);

        // missing feature cell fills with zero
        assert_eq!(batch.records[1].features, vec![7.0, 0.0]);
        assert_eq!(batch.records[1].nrx.share_pct, Some(20.0));

        assert_eq!(batch.input_columns.len(), 10);
        assert_eq!(batch.input_columns[8], "region");
        assert_eq!(batch.records[1].input[8], "West");
        assert_eq!(batch.records[1].input[9], "");
    }

    #[test]
    fn test_explicit_feature_columns_keep_order() {
        let columns = InputColumns {
            feature_columns: Some(vec!["calls_90d".to_string(), "tenure".to_string()]),
            ..Default::default()
        };
        let batch = load_hcps_from_reader(SAMPLE.as_bytes(), &columns).unwrap();
        assert_eq!(batch.records[0].features, vec![12.0, 3.0]);
    }

    #[test]
    fn test_missing_id_column_is_a_configuration_error() {
        let columns = InputColumns { id_column: "npi".to_string(), ..Default::default() };
        let err = load_hcps_from_reader(SAMPLE.as_bytes(), &columns).unwrap_err();
        assert!(matches!(err, EngineError::MissingColumn { column } if column == "npi"));
    }

    #[test]
    fn test_missing_explicit_feature_column() {
        let columns = InputColumns {
            feature_columns: Some(vec!["nope".to_string()]),
            ..Default::default()
        };
        assert!(matches!(
            load_hcps_from_reader(SAMPLE.as_bytes(), &columns),
            Err(EngineError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_non_numeric_explicit_feature_is_rejected() {
        let columns = InputColumns {
            feature_columns: Some(vec!["region".to_string()]),
            ..Default::default()
        };
        assert!(matches!(
            load_hcps_from_reader(SAMPLE.as_bytes(), &columns),
            Err(EngineError::InvalidNumber { row: 1, .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        let csv = "id,specialty\n";
        assert!(matches!(
            load_hcps_from_reader(csv.as_bytes(), &InputColumns::default()),
            Err(EngineError::EmptyBatch)
        ));
    }

    #[test]
    fn test_unparsable_share_becomes_missing() {
        let csv = "id,ibsa_volume_trx,ibsa_share_pct_trx\nX,10,abc\n";
        let batch = load_hcps_from_reader(csv.as_bytes(), &InputColumns::default()).unwrap();
        assert_eq!(batch.records[0].trx.share_pct, None);
        assert_eq!(batch.records[0].trx.volume, 10.0);
        assert_eq!(batch.feature_width(), 0);
    }
}
