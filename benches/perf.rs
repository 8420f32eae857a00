use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::Value;

use urc_scout::metrics::extract_metrics;
use urc_scout::normalize::normalize_metrics;
use urc_scout::roles::Role;
use urc_scout::scoring::compute_all_scores;

const SEASON_STATS_JSON: &str = r#"{
  "data": {
    "playerseasonstats": [{
      "player_stats": { "playerStats": {
        "attack": {
          "carries": 184, "metresMade": 902, "offload": 21,
          "cleanBreak": 17, "defenderBeaten": 44
        },
        "defence": {
          "tackle": 203, "missedTackle": 19, "turnoverWon": 11,
          "percentTackleMade": 91.4
        },
        "lineout": { "lineoutSteals": 4 },
        "discipline": { "penaltyConceded": 13, "yellowCard": 1, "redCard": 0 }
      }}
    }]
  }
}"#;

fn bench_pipeline(c: &mut Criterion) {
    let raw: Value = serde_json::from_str(SEASON_STATS_JSON).expect("valid bench json");

    c.bench_function("extract_metrics", |b| {
        b.iter(|| extract_metrics(black_box(&raw)))
    });

    let extracted = extract_metrics(&raw);
    c.bench_function("normalize_and_score", |b| {
        b.iter(|| {
            let normalized = normalize_metrics(black_box(&extracted), Some(1240.0), None);
            compute_all_scores(&normalized, Some(Role::BackRow))
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
