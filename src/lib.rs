//! Per-player rugby statistics pipeline: fetch raw season stats from the
//! United Rugby Championship GraphQL API, map raw fields into a stable
//! metric vocabulary, normalize against playing time, and derive
//! role-weighted 0-100 performance scores for ranking.

pub mod batch;
pub mod client;
pub mod export;
pub mod metrics;
pub mod normalize;
pub mod roles;
pub mod scoring;
pub mod squad;
