//! Engine core for a repeated-round multi-asset trading experiment.
//!
//! Per session: deterministic price paths for four synthetic assets, an
//! urgency-cue schedule and per-participant blind display permutations.
//! Per player per round: sequential trade execution with no-short-selling
//! and no-overdraft guarantees, wealth marking under current and next
//! prices, and carry-forward of the resulting portfolio.

pub mod asset;
pub mod config;
pub mod exec;
pub mod logging;
pub mod paths;
pub mod schedule;
pub mod seed;
pub mod session;
pub mod storage;
pub mod verify;

pub use asset::{Asset, PerAsset};
pub use config::Config;
pub use exec::{Holdings, PlayerRound, RoundPrices, TradeRequest};
pub use session::ExperimentSession;
