use serde::Serialize;
use sha2::{Digest, Sha256};

/// Experiment parameters.
///
/// Defaults are the published constants of the study; every field can be
/// overridden through the environment for pilots and parameter sweeps.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub num_rounds: u32,
    pub initial_cash: f64,
    pub start_price: f64,

    // Safe asset: Normal(mu, sigma), unclamped.
    pub safe_mu: f64,
    pub safe_sigma: f64,

    // Trap asset: scheduled jumps, crashes, mean-reverting noise.
    pub jump_return: f64,
    pub jump_prob: f64,
    pub min_trap_jumps: u32,
    pub trap_mu: f64,
    pub trap_sigma: f64,
    pub k_revert: f64,
    pub crash_return: f64,
    pub crash_prob: f64,
    pub postjump_crash_prob: f64,
    pub trap_return_min: f64,
    pub trap_return_max: f64,

    // Coin-flip asset.
    pub coin_return: f64,

    // High-volatility asset.
    pub wild_mu: f64,
    pub wild_sigma: f64,
    pub wild_return_min: f64,
    pub wild_return_max: f64,

    pub price_floor: f64,
    pub min_urgent_rounds: u32,
    /// Front-end decision timer; the core only observes the timeout flag.
    pub decision_timeout_secs: u64,
    pub sqlite_path: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_rounds: 25,
            initial_cash: 100.0,
            start_price: 10.0,
            safe_mu: 0.01,
            safe_sigma: 0.02,
            jump_return: 0.50,
            jump_prob: 0.10,
            min_trap_jumps: 2,
            trap_mu: -0.02,
            trap_sigma: 0.10,
            k_revert: 0.18,
            crash_return: -0.45,
            crash_prob: 0.08,
            postjump_crash_prob: 0.45,
            trap_return_min: -0.60,
            trap_return_max: 0.25,
            coin_return: 0.08,
            wild_mu: -0.01,
            wild_sigma: 0.22,
            wild_return_min: -0.70,
            wild_return_max: 0.70,
            price_floor: 0.10,
            min_urgent_rounds: 2,
            decision_timeout_secs: 7,
            sqlite_path: "./tradelab.sqlite".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Config::default();
        Self {
            num_rounds: env_parse("NUM_ROUNDS", d.num_rounds),
            initial_cash: env_parse("INITIAL_CASH", d.initial_cash),
            start_price: env_parse("START_PRICE", d.start_price),
            safe_mu: env_parse("SAFE_MU", d.safe_mu),
            safe_sigma: env_parse("SAFE_SIGMA", d.safe_sigma),
            jump_return: env_parse("JUMP_RETURN", d.jump_return),
            jump_prob: env_parse("JUMP_PROB", d.jump_prob),
            min_trap_jumps: env_parse("MIN_TRAP_JUMPS", d.min_trap_jumps),
            trap_mu: env_parse("TRAP_MU", d.trap_mu),
            trap_sigma: env_parse("TRAP_SIGMA", d.trap_sigma),
            k_revert: env_parse("K_REVERT", d.k_revert),
            crash_return: env_parse("CRASH_RETURN", d.crash_return),
            crash_prob: env_parse("CRASH_PROB", d.crash_prob),
            postjump_crash_prob: env_parse("POSTJUMP_CRASH_PROB", d.postjump_crash_prob),
            trap_return_min: env_parse("TRAP_RETURN_MIN", d.trap_return_min),
            trap_return_max: env_parse("TRAP_RETURN_MAX", d.trap_return_max),
            coin_return: env_parse("COIN_RETURN", d.coin_return),
            wild_mu: env_parse("WILD_MU", d.wild_mu),
            wild_sigma: env_parse("WILD_SIGMA", d.wild_sigma),
            wild_return_min: env_parse("WILD_RETURN_MIN", d.wild_return_min),
            wild_return_max: env_parse("WILD_RETURN_MAX", d.wild_return_max),
            price_floor: env_parse("PRICE_FLOOR", d.price_floor),
            min_urgent_rounds: env_parse("MIN_URGENT_ROUNDS", d.min_urgent_rounds),
            decision_timeout_secs: env_parse("DECISION_TIMEOUT_SECS", d.decision_timeout_secs),
            sqlite_path: std::env::var("SQLITE_PATH").unwrap_or(d.sqlite_path),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// SHA256 of the canonical JSON form, for stamping runs and exports.
    pub fn config_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_json().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_published_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.num_rounds, 25);
        assert_eq!(cfg.initial_cash, 100.0);
        assert_eq!(cfg.start_price, 10.0);
        assert_eq!(cfg.jump_return, 0.50);
        assert_eq!(cfg.min_trap_jumps, 2);
        assert_eq!(cfg.price_floor, 0.10);
    }

    #[test]
    fn test_config_hash_deterministic() {
        let a = Config::default();
        let b = Config::default();
        assert_eq!(a.config_hash(), b.config_hash());
        assert_eq!(a.config_hash().len(), 64);
    }

    #[test]
    fn test_config_hash_sensitive_to_params() {
        let a = Config::default();
        let b = Config {
            jump_prob: 0.2,
            ..Config::default()
        };
        assert_ne!(a.config_hash(), b.config_hash());
    }

    #[test]
    fn test_to_json_is_valid() {
        let cfg = Config::default();
        let parsed: serde_json::Value = serde_json::from_str(&cfg.to_json()).unwrap();
        assert!(parsed.is_object());
        assert!(parsed["num_rounds"].is_number());
        assert!(parsed["k_revert"].is_number());
    }
}
