//! Writers for the augmented HCP table and the batch summary

use crate::error::Result;
use crate::hcp::Channel;
use crate::market::CompetitorCluster;
use crate::pipeline::{BatchResult, HcpOutput};
use crate::scoring::{ModelKey, OutcomeKind, Prediction};
use crate::summary::BatchSummary;
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn fmt_f64(value: f64) -> String {
    format!("{value:.6}")
}

/// Observed inputs the engine used, appended when the source table did not
/// already carry a column of that name
#[derive(Debug, Clone, Copy, PartialEq)]
enum ObservedColumn {
    Id,
    Specialty,
    Volume(Channel),
    Share(Channel),
}

impl ObservedColumn {
    fn name(&self) -> String {
        match self {
            ObservedColumn::Id => "id".to_string(),
            ObservedColumn::Specialty => "specialty".to_string(),
            ObservedColumn::Volume(channel) => channel.volume_column(),
            ObservedColumn::Share(channel) => channel.share_column(),
        }
    }

    fn value(&self, row: &HcpOutput) -> String {
        match self {
            ObservedColumn::Id => row.id.clone(),
            ObservedColumn::Specialty => row.specialty.clone(),
            ObservedColumn::Volume(channel) => fmt_f64(row.channel(*channel).snapshot.ibsa_volume),
            ObservedColumn::Share(channel) => {
                row.channel(*channel).share_pct.map(fmt_f64).unwrap_or_default()
            }
        }
    }
}

fn observed_columns(input_columns: &[String]) -> Vec<ObservedColumn> {
    let mut columns = Vec::new();
    // A sourced table always carries its identifier, whatever it is called
    if input_columns.is_empty() {
        columns.push(ObservedColumn::Id);
    }
    columns.push(ObservedColumn::Specialty);
    for channel in Channel::ALL {
        columns.push(ObservedColumn::Volume(channel));
        columns.push(ObservedColumn::Share(channel));
    }
    columns.retain(|c| !input_columns.iter().any(|h| *h == c.name()));
    columns
}

/// Header row: the source columns unchanged, any missing observed inputs,
/// then the derived columns. Per-model columns appear only for slots that scored.
pub fn output_header(input_columns: &[String], scored: &[ModelKey]) -> Vec<String> {
    let mut header = input_columns.to_vec();
    header.extend(observed_columns(input_columns).iter().map(ObservedColumn::name));
    for key in scored {
        header.push(format!("{}_pred", key.stem()));
        if key.outcome.kind() == OutcomeKind::Binary {
            header.push(format!("{}_prob", key.stem()));
        }
    }
    header.extend(
        [
            "call_success_prob",
            "forecasted_lift",
            "churn_risk",
            "churn_risk_level",
            "ngd_classification",
            "segment",
            "next_best_action",
            "expected_roi",
            "sample_allocation",
        ]
        .map(str::to_string),
    );
    for channel in Channel::ALL {
        header.push(format!("total_market_volume_{channel}"));
        header.push(format!("implied_market_volume_{channel}"));
        header.push(format!("competitor_volume_{channel}"));
        for cluster in CompetitorCluster::ALL {
            header.push(format!("competitor_{cluster}_{channel}"));
        }
    }
    header
}

/// Write one row per input HCP, augmented with the derived columns
pub fn write_csv<W: Write>(result: &BatchResult, writer: W) -> Result<()> {
    let scored = result.report.scored_keys();
    let observed = observed_columns(&result.input_columns);
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(output_header(&result.input_columns, &scored))?;

    for row in &result.rows {
        let mut fields = row.input.clone();
        fields.extend(observed.iter().map(|c| c.value(row)));

        for key in &scored {
            match row.scores.get(key.product, key.outcome) {
                Some(Prediction::Binary { label, probability }) => {
                    fields.push(label.to_string());
                    fields.push(fmt_f64(*probability));
                }
                Some(Prediction::Continuous { value }) => fields.push(fmt_f64(*value)),
                None if key.outcome.kind() == OutcomeKind::Binary => {
                    fields.push(String::new());
                    fields.push(String::new());
                }
                None => fields.push(String::new()),
            }
        }

        let m = &row.metrics;
        let a = &row.assignment;
        fields.push(fmt_f64(m.call_success_prob));
        fields.push(fmt_f64(m.forecasted_lift));
        fields.push(fmt_f64(m.churn_risk));
        fields.push(m.churn_risk_level.to_string());
        fields.push(m.ngd_classification.to_string());
        fields.push(a.segment.to_string());
        fields.push(a.next_best_action.to_string());
        fields.push(fmt_f64(a.expected_roi));
        fields.push(a.sample_allocation.to_string());

        for channel in Channel::ALL {
            let out = row.channel(channel);
            fields.push(fmt_f64(out.snapshot.total_market_volume));
            fields.push(fmt_f64(out.snapshot.implied_market_volume));
            fields.push(fmt_f64(out.snapshot.competitor_volume));
            for (_, volume) in out.attribution.iter() {
                fields.push(fmt_f64(volume));
            }
        }

        wtr.write_record(&fields)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_csv_path(result: &BatchResult, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_csv(result, file)?;
    info!("Output written to {}", path.display());
    Ok(())
}

pub fn write_summary_path(summary: &BatchSummary, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    info!("Summary written to {}", path.display());
    Ok(())
}
