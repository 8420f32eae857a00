use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Internal metric vocabulary. Versioned: adding a name here means adding a
/// path entry to [`METRIC_PATHS`] and (usually) a weight somewhere in
/// `roles.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    // Unstructured play
    Carries,
    MetresMade,
    Offloads,
    CleanBreaks,
    DefendersBeaten,
    // Defence
    Tackles,
    MissedTackles,
    TurnoversWon,
    LineoutSteals,
    TackleSuccessPct,
    // Discipline
    PenaltiesConceded,
    YellowCards,
    RedCards,
}

impl Metric {
    pub const ALL: [Metric; 13] = [
        Metric::Carries,
        Metric::MetresMade,
        Metric::Offloads,
        Metric::CleanBreaks,
        Metric::DefendersBeaten,
        Metric::Tackles,
        Metric::MissedTackles,
        Metric::TurnoversWon,
        Metric::LineoutSteals,
        Metric::TackleSuccessPct,
        Metric::PenaltiesConceded,
        Metric::YellowCards,
        Metric::RedCards,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Carries => "carries",
            Metric::MetresMade => "metres_made",
            Metric::Offloads => "offloads",
            Metric::CleanBreaks => "clean_breaks",
            Metric::DefendersBeaten => "defenders_beaten",
            Metric::Tackles => "tackles",
            Metric::MissedTackles => "missed_tackles",
            Metric::TurnoversWon => "turnovers_won",
            Metric::LineoutSteals => "lineout_steals",
            Metric::TackleSuccessPct => "tackle_success_pct",
            Metric::PenaltiesConceded => "penalties_conceded",
            Metric::YellowCards => "yellow_cards",
            Metric::RedCards => "red_cards",
        }
    }
}

/// Candidate raw-response paths per metric, tried in declaration order; the
/// first one that resolves wins. Multiple entries exist to ride out upstream
/// schema drift without code changes.
const METRIC_PATHS: &[(Metric, &[&str])] = &[
    (
        Metric::Carries,
        &["data.playerseasonstats[0].player_stats.playerStats.attack.carries"],
    ),
    (
        Metric::MetresMade,
        &["data.playerseasonstats[0].player_stats.playerStats.attack.metresMade"],
    ),
    (
        Metric::Offloads,
        &["data.playerseasonstats[0].player_stats.playerStats.attack.offload"],
    ),
    (
        Metric::CleanBreaks,
        &["data.playerseasonstats[0].player_stats.playerStats.attack.cleanBreak"],
    ),
    (
        Metric::DefendersBeaten,
        &["data.playerseasonstats[0].player_stats.playerStats.attack.defenderBeaten"],
    ),
    (
        Metric::Tackles,
        &["data.playerseasonstats[0].player_stats.playerStats.defence.tackle"],
    ),
    (
        Metric::MissedTackles,
        &["data.playerseasonstats[0].player_stats.playerStats.defence.missedTackle"],
    ),
    (
        Metric::TurnoversWon,
        &["data.playerseasonstats[0].player_stats.playerStats.defence.turnoverWon"],
    ),
    (
        Metric::LineoutSteals,
        &["data.playerseasonstats[0].player_stats.playerStats.lineout.lineoutSteals"],
    ),
    (
        Metric::TackleSuccessPct,
        &["data.playerseasonstats[0].player_stats.playerStats.defence.percentTackleMade"],
    ),
    (
        Metric::PenaltiesConceded,
        &["data.playerseasonstats[0].player_stats.playerStats.discipline.penaltyConceded"],
    ),
    (
        Metric::YellowCards,
        &["data.playerseasonstats[0].player_stats.playerStats.discipline.yellowCard"],
    ),
    (
        Metric::RedCards,
        &["data.playerseasonstats[0].player_stats.playerStats.discipline.redCard"],
    ),
];

/// One entry per vocabulary metric, always. `None` means the metric could not
/// be located in the raw response; it is never collapsed to zero.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ExtractedMetrics {
    values: BTreeMap<Metric, Option<f64>>,
}

impl ExtractedMetrics {
    /// Build from present values only; everything else in the vocabulary is
    /// recorded as absent.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Metric, f64)>) -> Self {
        let mut values: BTreeMap<Metric, Option<f64>> =
            Metric::ALL.iter().map(|m| (*m, None)).collect();
        for (metric, value) in pairs {
            values.insert(metric, Some(value));
        }
        Self { values }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, Option<f64>)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    /// (found, total) across the vocabulary.
    pub fn coverage(&self) -> (usize, usize) {
        let found = self.values.values().filter(|v| v.is_some()).count();
        (found, self.values.len())
    }
}

enum Step<'a> {
    Key(&'a str),
    Index(usize),
}

fn path_steps(path: &str) -> Vec<Step<'_>> {
    let mut steps = Vec::new();
    for part in path.split('.') {
        let mut rest = part;
        while let Some(open) = rest.find('[') {
            if open > 0 {
                steps.push(Step::Key(&rest[..open]));
            }
            let Some(close) = rest[open..].find(']') else {
                return steps;
            };
            let close = open + close;
            if let Ok(idx) = rest[open + 1..close].parse::<usize>() {
                steps.push(Step::Index(idx));
            }
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            steps.push(Step::Key(rest));
        }
    }
    steps
}

/// Walk a dot/bracket path (`data.playerseasonstats[0].foo`) through a JSON
/// tree. Any missing key, out-of-range index or type mismatch yields `None`.
pub fn deep_get<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = root;
    for step in path_steps(path) {
        current = match step {
            Step::Key(key) => current.as_object()?.get(key)?,
            Step::Index(idx) => current.as_array()?.get(idx)?,
        };
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

/// Coerce a located value to a number. The API mostly returns JSON numbers but
/// occasionally numeric strings ("85", "85%").
fn as_metric_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == ',')
        .collect();
    let cleaned = cleaned.replace(',', "");
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Extract the full metric vocabulary from a raw season-stats response.
///
/// The output key set is invariant: every declared metric gets an entry,
/// present or absent, no matter what shape the response has.
pub fn extract_metrics(raw: &Value) -> ExtractedMetrics {
    let mut values: BTreeMap<Metric, Option<f64>> = BTreeMap::new();
    for (metric, paths) in METRIC_PATHS {
        let value = paths
            .iter()
            .find_map(|path| deep_get(raw, path).and_then(as_metric_number));
        values.insert(*metric, value);
    }
    let extracted = ExtractedMetrics { values };
    let (found, total) = extracted.coverage();
    debug!(found, total, "metric extraction complete");
    extracted
}
