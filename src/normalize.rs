use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::metrics::{ExtractedMetrics, Metric};

/// Counting metrics that scale meaningfully with playing time. Percentages
/// and cards are never rescaled.
const NORMALIZABLE: [Metric; 10] = [
    Metric::Carries,
    Metric::MetresMade,
    Metric::Offloads,
    Metric::CleanBreaks,
    Metric::DefendersBeaten,
    Metric::Tackles,
    Metric::MissedTackles,
    Metric::TurnoversWon,
    Metric::LineoutSteals,
    Metric::PenaltiesConceded,
];

/// Which normalization was actually applied. Exactly one per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Basis {
    #[serde(rename = "per_80_min")]
    Per80Min,
    #[serde(rename = "per_appearance")]
    PerAppearance,
    #[serde(rename = "raw")]
    Raw,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationNotes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_played: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appearances: Option<u32>,
}

/// Raw, per-80-minutes and per-appearance views of one player's metrics.
/// The scaled views only carry the normalizable subset; everything else is
/// read from `raw`.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedMetrics {
    pub raw: ExtractedMetrics,
    pub per_80_min: BTreeMap<Metric, Option<f64>>,
    pub per_appearance: BTreeMap<Metric, Option<f64>>,
    pub basis: Basis,
    pub notes: NormalizationNotes,
}

impl NormalizedMetrics {
    /// Metric values for scoring, selected per metric with the precedence
    /// per-80-minutes, then per-appearance, then raw. Non-normalizable
    /// metrics (e.g. tackle success %) always come from `raw`.
    pub fn scoring_view(&self) -> BTreeMap<Metric, Option<f64>> {
        Metric::ALL
            .iter()
            .map(|metric| {
                let value = self
                    .per_80_min
                    .get(metric)
                    .copied()
                    .flatten()
                    .or_else(|| self.per_appearance.get(metric).copied().flatten())
                    .or_else(|| self.raw.get(*metric));
                (*metric, value)
            })
            .collect()
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn scaled_view(extracted: &ExtractedMetrics, factor: f64) -> BTreeMap<Metric, Option<f64>> {
    NORMALIZABLE
        .iter()
        .map(|metric| {
            // Absent stays absent; it must never become 0.
            let value = extracted.get(*metric).map(|v| round2(v * factor));
            (*metric, value)
        })
        .collect()
}

/// Rescale counting metrics against playing time.
///
/// Precedence is strict: minutes played (factor 80/minutes) beats appearances
/// (factor 1/appearances); with neither, values pass through unscaled and the
/// degraded basis is flagged for downstream callers.
pub fn normalize_metrics(
    extracted: &ExtractedMetrics,
    minutes_played: Option<f64>,
    appearances: Option<u32>,
) -> NormalizedMetrics {
    let mut normalized = NormalizedMetrics {
        raw: extracted.clone(),
        per_80_min: BTreeMap::new(),
        per_appearance: BTreeMap::new(),
        basis: Basis::Raw,
        notes: NormalizationNotes::default(),
    };

    match (minutes_played, appearances) {
        (Some(minutes), _) if minutes > 0.0 => {
            normalized.per_80_min = scaled_view(extracted, 80.0 / minutes);
            normalized.basis = Basis::Per80Min;
            normalized.notes.minutes_played = Some(minutes);
        }
        (_, Some(apps)) if apps > 0 => {
            normalized.per_appearance = scaled_view(extracted, 1.0 / f64::from(apps));
            normalized.basis = Basis::PerAppearance;
            normalized.notes.appearances = Some(apps);
        }
        _ => {
            warn!("no minutes or appearances provided; scoring raw values");
        }
    }

    normalized
}
