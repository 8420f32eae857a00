use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::client::{FetchError, StatsSource};
use crate::metrics::{extract_metrics, ExtractedMetrics};
use crate::normalize::{normalize_metrics, NormalizedMetrics};
use crate::roles::{role_from_position, Role, RoleFallback};
use crate::scoring::{compute_all_scores_with, PlayerScores, ScoreKind};
use crate::squad::SquadPlayer;

/// Players per sub-batch; the backoff sleep only runs between sub-batches.
const SUB_BATCH_SIZE: usize = 5;

/// Full pipeline output for one player.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerReport {
    pub player_id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub raw_metrics: ExtractedMetrics,
    pub normalized_metrics: NormalizedMetrics,
    pub scores: PlayerScores,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Upstream throttling; `retry_after_seconds` may carry a hint.
    RateLimited,
    /// Transport succeeded but the payload itself reported an error.
    UpstreamData,
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerFailure {
    pub player_id: u64,
    pub name: String,
    pub kind: FailureKind,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<PlayerReport>,
    pub failures: Vec<PlayerFailure>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub player_id: u64,
    pub name: String,
    pub score: f64,
    pub metric: ScoreKind,
}

impl BatchSummary {
    /// Successful results only, sorted by the chosen score, descending.
    /// The sort is stable, so equal scores keep processing order.
    pub fn rankings(&self, kind: ScoreKind) -> Vec<RankingEntry> {
        let mut entries: Vec<RankingEntry> = self
            .results
            .iter()
            .map(|report| RankingEntry {
                player_id: report.player_id,
                name: report.name.clone(),
                score: kind.value(&report.scores),
                metric: kind,
            })
            .collect();
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        entries
    }
}

/// Drives fetch → extract → normalize → score over many players, isolating
/// per-player failures. Accumulators are local to each `process_batch` call;
/// reruns can never inherit stale results.
pub struct BatchProcessor<S: StatsSource> {
    source: S,
    season_id: u32,
    backoff: Duration,
    role_fallback: RoleFallback,
}

impl<S: StatsSource> BatchProcessor<S> {
    pub fn new(source: S, season_id: u32) -> Self {
        Self {
            source,
            season_id,
            backoff: Duration::ZERO,
            role_fallback: RoleFallback::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_role_fallback(mut self, fallback: RoleFallback) -> Self {
        self.role_fallback = fallback;
        self
    }

    /// Run the pipeline for a single player. Every failure mode is caught,
    /// classified and returned; nothing escapes this boundary.
    pub fn process_player(
        &self,
        player_id: u64,
        name: &str,
        minutes_played: Option<f64>,
        appearances: Option<u32>,
        position: Option<&str>,
    ) -> Result<PlayerReport, PlayerFailure> {
        info!(player_id, name, "fetching player season stats");
        let raw = self
            .source
            .player_season_stats(player_id, self.season_id)
            .map_err(|err| classify_fetch_error(player_id, name, err))?;

        // A 200 can still carry an error payload.
        if let Some(errors) = raw.get("errors") {
            let message = errors.to_string();
            error!(player_id, %message, "upstream data error");
            return Err(PlayerFailure {
                player_id,
                name: name.to_string(),
                kind: FailureKind::UpstreamData,
                error: message,
                retry_after_seconds: None,
            });
        }

        let extracted = extract_metrics(&raw);
        let normalized = normalize_metrics(&extracted, minutes_played, appearances);
        let role = role_from_position(position);
        let scores = compute_all_scores_with(&normalized, role, self.role_fallback);

        info!(
            player_id,
            composite = scores.composite_contribution.score,
            "player scored"
        );
        Ok(PlayerReport {
            player_id,
            name: name.to_string(),
            position: position.map(str::to_string),
            role,
            raw_metrics: extracted,
            normalized_metrics: normalized,
            scores,
        })
    }

    /// Process every player, partial failures allowed. Sub-batches of
    /// [`SUB_BATCH_SIZE`] run back to back with a fixed backoff sleep between
    /// them (never within one, never after the last).
    pub fn process_batch(
        &self,
        players: &[(u64, String)],
        minutes_played: Option<f64>,
        appearances: Option<u32>,
        details: Option<&[SquadPlayer]>,
    ) -> BatchSummary {
        info!(
            total = players.len(),
            season = self.season_id,
            "processing batch"
        );

        let positions: HashMap<u64, &str> = details
            .unwrap_or_default()
            .iter()
            .filter_map(|d| Some((d.player_id, d.position.as_deref()?)))
            .collect();

        let mut results = Vec::new();
        let mut failures = Vec::new();

        let last_index = players.len().div_ceil(SUB_BATCH_SIZE).saturating_sub(1);
        for (index, sub_batch) in players.chunks(SUB_BATCH_SIZE).enumerate() {
            info!(sub_batch = index + 1, size = sub_batch.len(), "sub-batch");
            for (player_id, name) in sub_batch {
                let position = positions.get(player_id).copied();
                match self.process_player(
                    *player_id,
                    name,
                    minutes_played,
                    appearances,
                    position,
                ) {
                    Ok(report) => results.push(report),
                    Err(failure) => {
                        warn!(
                            player_id = failure.player_id,
                            kind = ?failure.kind,
                            error = %failure.error,
                            "player failed"
                        );
                        failures.push(failure);
                    }
                }
            }

            if index < last_index && !self.backoff.is_zero() {
                info!(seconds = self.backoff.as_secs_f64(), "backoff between sub-batches");
                thread::sleep(self.backoff);
            }
        }

        BatchSummary {
            total: players.len(),
            successful: results.len(),
            failed: failures.len(),
            results,
            failures,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn classify_fetch_error(player_id: u64, name: &str, err: FetchError) -> PlayerFailure {
    match err {
        FetchError::RateLimited {
            retry_after,
            message,
        } => PlayerFailure {
            player_id,
            name: name.to_string(),
            kind: FailureKind::RateLimited,
            error: message,
            retry_after_seconds: retry_after,
        },
        other => PlayerFailure {
            player_id,
            name: name.to_string(),
            kind: FailureKind::Other,
            error: other.to_string(),
            retry_after_seconds: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    /// Scripted source: id 3 fails with a transport error, id 4 is rate
    /// limited, id 5 returns an upstream error payload, everything else
    /// returns a well-formed stats response.
    struct ScriptedSource;

    fn stats_body(carries: f64) -> Value {
        json!({
            "data": {
                "playerseasonstats": [{
                    "player_stats": { "playerStats": {
                        "attack": { "carries": carries },
                        "defence": { "tackle": 20, "percentTackleMade": 90 },
                        "discipline": { "penaltyConceded": 0 }
                    }}
                }]
            }
        })
    }

    impl StatsSource for ScriptedSource {
        fn player_season_stats(
            &self,
            player_id: u64,
            _season_id: u32,
        ) -> Result<Value, FetchError> {
            match player_id {
                3 => Err(FetchError::Status {
                    status: StatusCode::BAD_GATEWAY,
                    snippet: "upstream exploded".to_string(),
                }),
                4 => Err(FetchError::RateLimited {
                    retry_after: Some(30),
                    message: "HTTP 429 Too Many Requests".to_string(),
                }),
                5 => Ok(json!({ "errors": [{ "message": "player not found" }] })),
                other => Ok(stats_body(10.0 + other as f64)),
            }
        }
    }

    fn players(ids: &[u64]) -> Vec<(u64, String)> {
        ids.iter().map(|id| (*id, format!("Player {id}"))).collect()
    }

    #[test]
    fn one_failure_does_not_abort_the_batch() {
        let processor = BatchProcessor::new(ScriptedSource, 202501);
        let summary =
            processor.process_batch(&players(&[1, 2, 3, 6, 7]), Some(80.0), None, None);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.successful, 4);
        assert_eq!(summary.failed, 1);
        let ids: Vec<u64> = summary.results.iter().map(|r| r.player_id).collect();
        assert_eq!(ids, vec![1, 2, 6, 7]);
        assert_eq!(summary.failures[0].player_id, 3);
        assert_eq!(summary.failures[0].kind, FailureKind::Other);
        assert!(summary.failures[0].error.contains("upstream exploded"));
    }

    #[test]
    fn rate_limits_are_classified_with_retry_hint() {
        let processor = BatchProcessor::new(ScriptedSource, 202501);
        let summary = processor.process_batch(&players(&[4]), None, None, None);
        assert_eq!(summary.failed, 1);
        let failure = &summary.failures[0];
        assert_eq!(failure.kind, FailureKind::RateLimited);
        assert_eq!(failure.retry_after_seconds, Some(30));
    }

    #[test]
    fn upstream_error_payloads_fail_the_player_only() {
        let processor = BatchProcessor::new(ScriptedSource, 202501);
        let summary = processor.process_batch(&players(&[5, 1]), None, None, None);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failures[0].kind, FailureKind::UpstreamData);
        assert!(summary.failures[0].error.contains("player not found"));
    }

    #[test]
    fn positions_come_from_squad_details() {
        let details = vec![SquadPlayer {
            player_id: 1,
            first_name: Some("A".into()),
            last_name: Some("B".into()),
            position: Some("Hooker".into()),
            age: None,
            nationality: None,
        }];
        let processor = BatchProcessor::new(ScriptedSource, 202501);
        let summary =
            processor.process_batch(&players(&[1]), Some(80.0), None, Some(&details));
        assert_eq!(summary.results[0].position.as_deref(), Some("Hooker"));
        assert_eq!(summary.results[0].role, Some(Role::Front5));
    }

    #[test]
    fn reruns_start_from_fresh_accumulators() {
        let processor = BatchProcessor::new(ScriptedSource, 202501);
        let first = processor.process_batch(&players(&[1, 2]), None, None, None);
        let second = processor.process_batch(&players(&[1, 2]), None, None, None);
        assert_eq!(first.total, second.total);
        assert_eq!(second.successful, 2);
        assert_eq!(second.results.len(), 2);
    }

    #[test]
    fn rankings_sort_descending_with_stable_ties() {
        let processor = BatchProcessor::new(ScriptedSource, 202501);
        let mut summary =
            processor.process_batch(&players(&[1, 2, 6]), Some(80.0), None, None);
        // Pin scores: A=72.0, B=91.5, C=40.0.
        summary.results[0].scores.composite_contribution.score = 72.0;
        summary.results[1].scores.composite_contribution.score = 91.5;
        summary.results[2].scores.composite_contribution.score = 40.0;
        let ranked = summary.rankings(ScoreKind::CompositeContribution);
        let ids: Vec<u64> = ranked.iter().map(|r| r.player_id).collect();
        assert_eq!(ids, vec![2, 1, 6]);

        // Ties keep processing order.
        summary.results[2].scores.composite_contribution.score = 72.0;
        let ranked = summary.rankings(ScoreKind::CompositeContribution);
        let ids: Vec<u64> = ranked.iter().map(|r| r.player_id).collect();
        assert_eq!(ids, vec![2, 1, 6]);
    }
}
