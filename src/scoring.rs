use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use crate::metrics::Metric;
use crate::normalize::{round2, NormalizedMetrics};
use crate::roles::{profile_for, BlendWeights, Role, RoleFallback};

/// Season benchmarks that map an exceptional value to 100 on the linear
/// scaling curve. Percentage metrics pass through unscaled.
const BENCHMARKS: &[(Metric, f64)] = &[
    (Metric::Carries, 60.0),
    (Metric::MetresMade, 150.0),
    (Metric::Offloads, 10.0),
    (Metric::CleanBreaks, 8.0),
    (Metric::DefendersBeaten, 15.0),
    (Metric::Tackles, 40.0),
    (Metric::MissedTackles, 12.0),
    (Metric::TurnoversWon, 6.0),
];

/// One sub-score: value in [0,100], the raw metric values that fed it
/// (absent entries included), and a human-readable method tag.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub score: f64,
    pub components: BTreeMap<Metric, Option<f64>>,
    pub method: String,
}

/// Proportional contribution of each sub-score to the composite.
#[derive(Debug, Clone, Serialize)]
pub struct BlendBreakdown {
    pub unstructured: f64,
    pub defensive: f64,
    pub discipline: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositeResult {
    pub score: f64,
    pub breakdown: BlendBreakdown,
    pub method: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerScores {
    pub unstructured_impact: ScoreResult,
    pub defensive_reliability: ScoreResult,
    pub discipline_risk: ScoreResult,
    pub composite_contribution: CompositeResult,
}

/// Which score a caller wants to rank or inspect by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    UnstructuredImpact,
    DefensiveReliability,
    DisciplineRisk,
    CompositeContribution,
}

impl ScoreKind {
    pub fn name(self) -> &'static str {
        match self {
            ScoreKind::UnstructuredImpact => "unstructured_impact",
            ScoreKind::DefensiveReliability => "defensive_reliability",
            ScoreKind::DisciplineRisk => "discipline_risk",
            ScoreKind::CompositeContribution => "composite_contribution",
        }
    }

    pub fn value(self, scores: &PlayerScores) -> f64 {
        match self {
            ScoreKind::UnstructuredImpact => scores.unstructured_impact.score,
            ScoreKind::DefensiveReliability => scores.defensive_reliability.score,
            ScoreKind::DisciplineRisk => scores.discipline_risk.score,
            ScoreKind::CompositeContribution => scores.composite_contribution.score,
        }
    }
}

impl FromStr for ScoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unstructured_impact" => Ok(ScoreKind::UnstructuredImpact),
            "defensive_reliability" => Ok(ScoreKind::DefensiveReliability),
            "discipline_risk" => Ok(ScoreKind::DisciplineRisk),
            "composite_contribution" => Ok(ScoreKind::CompositeContribution),
            other => Err(format!("unknown score kind: {other}")),
        }
    }
}

fn scale(metric: Metric, value: f64) -> f64 {
    match BENCHMARKS.iter().find(|(m, _)| *m == metric) {
        Some((_, benchmark)) => ((value / benchmark) * 100.0).clamp(0.0, 100.0),
        // tackle_success_pct and the like are already on a 0-100 scale.
        None => value,
    }
}

fn weighted_sub_score(
    view: &BTreeMap<Metric, Option<f64>>,
    weights: &[(Metric, f64)],
    method: &str,
) -> ScoreResult {
    let mut components = BTreeMap::new();
    let mut total_weighted = 0.0;

    for (metric, weight) in weights {
        let value = view.get(metric).copied().flatten();
        components.insert(*metric, value);
        // Absent metrics contribute nothing; they are not zeros.
        if let Some(value) = value {
            total_weighted += scale(*metric, value) * weight;
        }
    }

    ScoreResult {
        score: round2((total_weighted * 100.0).clamp(0.0, 100.0)),
        components,
        method: method.to_string(),
    }
}

fn discipline_sub_score(
    view: &BTreeMap<Metric, Option<f64>>,
    weights: &[(Metric, f64)],
) -> ScoreResult {
    let mut components = BTreeMap::new();
    let mut total_cost = 0.0;

    for (metric, weight) in weights {
        let value = view.get(metric).copied().flatten();
        components.insert(*metric, value);
        if let Some(value) = value {
            total_cost += value * weight;
        }
    }

    // 100 = clean record; the summed cost is floored at -100 before adding.
    let penalty = total_cost.max(-100.0);
    ScoreResult {
        score: round2((100.0 + penalty).clamp(0.0, 100.0)),
        components,
        method: "weighted discipline costs (0-100)".to_string(),
    }
}

fn composite_score(
    unstructured: f64,
    defensive: f64,
    discipline: f64,
    blend: BlendWeights,
) -> CompositeResult {
    let total = unstructured * blend.unstructured
        + defensive * blend.defensive
        + discipline * blend.discipline;
    // Guard against blend vectors that do not sum to 1.
    let total_weights = blend.unstructured + blend.defensive + blend.discipline;

    let (score, breakdown) = if total_weights > 0.0 {
        (
            round2((total / total_weights).clamp(0.0, 100.0)),
            BlendBreakdown {
                unstructured: round2(unstructured * blend.unstructured / total_weights),
                defensive: round2(defensive * blend.defensive / total_weights),
                discipline: round2(discipline * blend.discipline / total_weights),
            },
        )
    } else {
        (
            0.0,
            BlendBreakdown {
                unstructured: 0.0,
                defensive: 0.0,
                discipline: 0.0,
            },
        )
    };

    CompositeResult {
        score,
        breakdown,
        method: format!(
            "composite blend (attack {:.0}%, defence {:.0}%, discipline {:.0}%)",
            blend.unstructured * 100.0,
            blend.defensive * 100.0,
            blend.discipline * 100.0
        ),
    }
}

/// Compute the three sub-scores and the composite for one player, using the
/// role's weight tables (or the configured fallback when no role resolved).
///
/// Pure: identical inputs always yield identical results.
pub fn compute_all_scores_with(
    normalized: &NormalizedMetrics,
    role: Option<Role>,
    fallback: RoleFallback,
) -> PlayerScores {
    let view = normalized.scoring_view();
    let profile = profile_for(role, fallback);

    let unstructured_impact = weighted_sub_score(
        &view,
        profile.unstructured,
        "weighted attack metrics (0-100)",
    );
    let defensive_reliability = weighted_sub_score(
        &view,
        profile.defensive,
        "weighted defence metrics (0-100)",
    );
    let discipline_risk = discipline_sub_score(&view, profile.discipline);
    let composite_contribution = composite_score(
        unstructured_impact.score,
        defensive_reliability.score,
        discipline_risk.score,
        profile.blend,
    );

    PlayerScores {
        unstructured_impact,
        defensive_reliability,
        discipline_risk,
        composite_contribution,
    }
}

pub fn compute_all_scores(normalized: &NormalizedMetrics, role: Option<Role>) -> PlayerScores {
    compute_all_scores_with(normalized, role, RoleFallback::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ExtractedMetrics;
    use crate::normalize::normalize_metrics;

    fn normalized_from(
        pairs: impl IntoIterator<Item = (Metric, f64)>,
        minutes: Option<f64>,
    ) -> NormalizedMetrics {
        normalize_metrics(&ExtractedMetrics::from_pairs(pairs), minutes, None)
    }

    #[test]
    fn clean_record_scores_a_hundred_on_discipline() {
        let normalized = normalized_from(
            [
                (Metric::PenaltiesConceded, 0.0),
                (Metric::YellowCards, 0.0),
                (Metric::RedCards, 0.0),
            ],
            Some(80.0),
        );
        let scores = compute_all_scores(&normalized, Some(Role::BackRow));
        assert_eq!(scores.discipline_risk.score, 100.0);
    }

    #[test]
    fn discipline_costs_subtract_from_a_hundred() {
        let normalized = normalized_from(
            [
                (Metric::PenaltiesConceded, 1.0),
                (Metric::YellowCards, 1.0),
                (Metric::RedCards, 0.0),
            ],
            None,
        );
        let scores = compute_all_scores(&normalized, Some(Role::BackRow));
        // 1 * -0.5 + 1 * -2.0 = -2.5
        assert!((scores.discipline_risk.score - 97.5).abs() < 1e-9);
    }

    #[test]
    fn catastrophic_discipline_floors_at_zero() {
        let normalized = normalized_from([(Metric::PenaltiesConceded, 500.0)], None);
        let scores = compute_all_scores(&normalized, Some(Role::BackRow));
        assert_eq!(scores.discipline_risk.score, 0.0);
    }

    #[test]
    fn scores_stay_bounded_for_pathological_inputs() {
        let normalized = normalized_from(
            [
                (Metric::Carries, 10_000.0),
                (Metric::MetresMade, 1_000_000.0),
                (Metric::Tackles, 99_999.0),
                (Metric::TackleSuccessPct, 100.0),
                (Metric::RedCards, 50.0),
            ],
            Some(1.0),
        );
        for role in [None, Some(Role::Front5), Some(Role::Backs)] {
            let scores = compute_all_scores(&normalized, role);
            for score in [
                scores.unstructured_impact.score,
                scores.defensive_reliability.score,
                scores.discipline_risk.score,
                scores.composite_contribution.score,
            ] {
                assert!((0.0..=100.0).contains(&score), "out of bounds: {score}");
            }
        }
    }

    #[test]
    fn absent_metrics_are_excluded_not_zeroed() {
        let sparse = normalized_from([(Metric::Carries, 3.0)], None);
        let with_zeroes = normalized_from(
            [
                (Metric::Carries, 3.0),
                (Metric::MetresMade, 0.0),
                (Metric::Offloads, 0.0),
            ],
            None,
        );
        let a = compute_all_scores(&sparse, Some(Role::BackRow));
        let b = compute_all_scores(&with_zeroes, Some(Role::BackRow));
        // Same weighted total either way (zeros scale to zero), but the
        // component breakdown must distinguish absent from zero.
        assert_eq!(
            a.unstructured_impact.components[&Metric::MetresMade],
            None
        );
        assert_eq!(
            b.unstructured_impact.components[&Metric::MetresMade],
            Some(0.0)
        );
        assert_eq!(a.unstructured_impact.score, b.unstructured_impact.score);
    }

    #[test]
    fn small_values_produce_exact_weighted_scores() {
        // 0.5 carries per 80 under BACK_ROW: (0.5 / 60) * 100 * 0.30 * 100 = 25.0
        let normalized = normalized_from([(Metric::Carries, 0.5)], Some(80.0));
        let scores = compute_all_scores(&normalized, Some(Role::BackRow));
        assert!((scores.unstructured_impact.score - 25.0).abs() < 1e-9);
    }

    #[test]
    fn computing_twice_is_identical() {
        let normalized = normalized_from(
            [
                (Metric::Carries, 12.0),
                (Metric::Tackles, 9.0),
                (Metric::TackleSuccessPct, 91.0),
                (Metric::PenaltiesConceded, 2.0),
            ],
            Some(240.0),
        );
        let a = compute_all_scores(&normalized, Some(Role::HalfBacks));
        let b = compute_all_scores(&normalized, Some(Role::HalfBacks));
        assert_eq!(a.unstructured_impact.score, b.unstructured_impact.score);
        assert_eq!(a.defensive_reliability.score, b.defensive_reliability.score);
        assert_eq!(a.discipline_risk.score, b.discipline_risk.score);
        assert_eq!(
            a.composite_contribution.score,
            b.composite_contribution.score
        );
    }

    #[test]
    fn composite_blend_normalizes_by_weight_sum() {
        let result = composite_score(
            80.0,
            60.0,
            100.0,
            BlendWeights {
                unstructured: 0.40,
                defensive: 0.40,
                discipline: 0.20,
            },
        );
        // 80*0.4 + 60*0.4 + 100*0.2 = 76.0
        assert!((result.score - 76.0).abs() < 1e-9);
        assert!((result.breakdown.unstructured - 32.0).abs() < 1e-9);
        assert!((result.breakdown.defensive - 24.0).abs() < 1e-9);
        assert!((result.breakdown.discipline - 20.0).abs() < 1e-9);
    }

    #[test]
    fn composite_guards_against_zero_weight_sum() {
        let result = composite_score(
            80.0,
            60.0,
            100.0,
            BlendWeights {
                unstructured: 0.0,
                defensive: 0.0,
                discipline: 0.0,
            },
        );
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn unresolved_role_uses_back_row_weights_by_default() {
        let normalized = normalized_from([(Metric::Carries, 0.5)], Some(80.0));
        let fallback = compute_all_scores(&normalized, None);
        let back_row = compute_all_scores(&normalized, Some(Role::BackRow));
        assert_eq!(
            fallback.unstructured_impact.score,
            back_row.unstructured_impact.score
        );

        // And the opt-out uses the role-agnostic tables instead.
        let defaults =
            compute_all_scores_with(&normalized, None, RoleFallback::Defaults);
        // (0.5 / 60) * 100 * 0.20 * 100 = 16.67 (rounded)
        assert!((defaults.unstructured_impact.score - 16.67).abs() < 1e-9);
    }

    #[test]
    fn score_kind_parses_and_projects() {
        let kind: ScoreKind = "composite_contribution".parse().unwrap();
        assert_eq!(kind, ScoreKind::CompositeContribution);
        assert!("overall".parse::<ScoreKind>().is_err());
    }
}
