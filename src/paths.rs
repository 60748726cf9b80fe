//! Shared per-session price paths.
//!
//! One deterministic stream per session drives every asset's returns. Draw
//! order within a period is fixed (safe, trap, coin, wild) and the trap
//! asset's jump periods are committed before the main loop, so a session
//! code always reproduces the same paths byte for byte.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::asset::{Asset, PerAsset};
use crate::config::Config;
use crate::seed::{self, PURPOSE_PRICES};

/// Prices and trap diagnostics for one session.
///
/// `prices[asset]` has length `num_rounds + 1`: index `r - 1` is round `r`'s
/// current price, index `r` its next price. `trap_returns[t - 1]` is the
/// trap return realized during period `t`; `jump_periods` lists the periods
/// (1-indexed, sorted) where that return was the +50% jump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPriceState {
    prices: PerAsset<Vec<f64>>,
    pub trap_returns: Vec<f64>,
    pub jump_periods: Vec<u32>,
}

impl SessionPriceState {
    /// Current price of `asset` in `round` (1-indexed).
    pub fn price_now(&self, asset: Asset, round: u32) -> f64 {
        self.prices[asset][(round - 1) as usize]
    }

    /// Next-period price of `asset` as seen from `round`.
    pub fn price_next(&self, asset: Asset, round: u32) -> f64 {
        self.prices[asset][round as usize]
    }

    pub fn series(&self, asset: Asset) -> &[f64] {
        &self.prices[asset]
    }

    /// True when the price shown in `round` is the result of a jump in the
    /// preceding period. Round 1 has no preceding period.
    pub fn trap_jumped_into(&self, round: u32) -> bool {
        round > 1 && self.jump_periods.binary_search(&(round - 1)).is_ok()
    }
}

fn gauss(rng: &mut StdRng, mu: f64, sigma: f64) -> f64 {
    // Degenerate sigma collapses to the mean rather than failing.
    Normal::new(mu, sigma).map(|d| d.sample(rng)).unwrap_or(mu)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Apply one period return: floor first, then fix to display precision so
/// every later read is exact.
fn step(prev: f64, ret: f64, floor: f64) -> f64 {
    round2((prev * (1.0 + ret)).max(floor))
}

/// Commit the trap asset's jump periods up front: one Bernoulli draw per
/// period, then top up with uniform picks from the remaining periods until
/// the configured minimum is met.
fn select_jump_periods(cfg: &Config, rng: &mut StdRng) -> Vec<u32> {
    let mut jumps: Vec<u32> = Vec::new();
    for t in 1..=cfg.num_rounds {
        if rng.gen::<f64>() < cfg.jump_prob {
            jumps.push(t);
        }
    }
    while (jumps.len() as u32) < cfg.min_trap_jumps {
        let remaining: Vec<u32> = (1..=cfg.num_rounds).filter(|t| !jumps.contains(t)).collect();
        if remaining.is_empty() {
            break;
        }
        jumps.push(remaining[rng.gen_range(0..remaining.len())]);
    }
    jumps.sort_unstable();
    jumps
}

/// Generate the full price state for a session. Pure function of the
/// session code and config; callers memoize it per session.
pub fn generate_price_paths(cfg: &Config, session: &str) -> SessionPriceState {
    let mut rng = seed::session_stream(session, PURPOSE_PRICES);

    let jump_periods = select_jump_periods(cfg, &mut rng);

    let mut prices: PerAsset<Vec<f64>> =
        PerAsset(std::array::from_fn(|_| vec![cfg.start_price]));
    let mut trap_returns = Vec::with_capacity(cfg.num_rounds as usize);

    let trap_base = cfg.start_price;
    let mut prev_was_jump = false;

    for period in 1..=cfg.num_rounds {
        let r_safe = gauss(&mut rng, cfg.safe_mu, cfg.safe_sigma);

        let r_trap = if jump_periods.binary_search(&period).is_ok() {
            prev_was_jump = true;
            cfg.jump_return
        } else {
            let crash_p = if prev_was_jump {
                cfg.postjump_crash_prob
            } else {
                cfg.crash_prob
            };
            prev_was_jump = false;
            if rng.gen::<f64>() < crash_p {
                cfg.crash_return
            } else {
                let noise = gauss(&mut rng, cfg.trap_mu, cfg.trap_sigma);
                let last = prices[Asset::Trap][period as usize - 1];
                let ratio = last / trap_base;
                let reverted = noise - cfg.k_revert * (ratio - 1.0);
                reverted.clamp(cfg.trap_return_min, cfg.trap_return_max)
            }
        };
        trap_returns.push(r_trap);

        let r_coin = if rng.gen::<f64>() < 0.5 {
            cfg.coin_return
        } else {
            -cfg.coin_return
        };

        let r_wild = gauss(&mut rng, cfg.wild_mu, cfg.wild_sigma)
            .clamp(cfg.wild_return_min, cfg.wild_return_max);

        let returns: PerAsset<f64> = PerAsset([r_safe, r_trap, r_coin, r_wild]);
        for asset in Asset::ALL {
            let prev = prices[asset][period as usize - 1];
            let next = step(prev, returns[asset], cfg.price_floor);
            prices[asset].push(next);
        }
    }

    SessionPriceState {
        prices,
        trap_returns,
        jump_periods,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn test_generation_is_deterministic() {
        let c = cfg();
        let a = generate_price_paths(&c, "S1");
        let b = generate_price_paths(&c, "S1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_sessions_diverge() {
        let c = cfg();
        let a = generate_price_paths(&c, "S1");
        let b = generate_price_paths(&c, "S2");
        assert_ne!(a.series(Asset::Safe), b.series(Asset::Safe));
    }

    #[test]
    fn test_series_lengths() {
        let c = cfg();
        let state = generate_price_paths(&c, "S1");
        for asset in Asset::ALL {
            assert_eq!(state.series(asset).len(), c.num_rounds as usize + 1);
        }
        assert_eq!(state.trap_returns.len(), c.num_rounds as usize);
    }

    #[test]
    fn test_start_price_unrounded_constant() {
        let c = cfg();
        let state = generate_price_paths(&c, "S1");
        for asset in Asset::ALL {
            assert_eq!(state.price_now(asset, 1), c.start_price);
        }
    }

    #[test]
    fn test_price_floor_holds_everywhere() {
        let c = cfg();
        for session in ["S1", "S2", "S3", "crash-heavy", "x"] {
            let state = generate_price_paths(&c, session);
            for asset in Asset::ALL {
                for p in state.series(asset) {
                    assert!(*p >= c.price_floor, "{:?} fell to {}", asset, p);
                }
            }
        }
    }

    #[test]
    fn test_prices_are_two_decimal() {
        let c = cfg();
        let state = generate_price_paths(&c, "S1");
        for asset in Asset::ALL {
            for p in state.series(asset).iter().skip(1) {
                assert_eq!(round2(*p), *p);
            }
        }
    }

    #[test]
    fn test_min_jumps_enforced_even_at_zero_prob() {
        let c = Config {
            jump_prob: 0.0,
            ..cfg()
        };
        let state = generate_price_paths(&c, "S1");
        assert!(state.jump_periods.len() as u32 >= c.min_trap_jumps);
    }

    #[test]
    fn test_jump_periods_sorted_distinct_in_range() {
        let c = cfg();
        for session in ["S1", "S2", "S3"] {
            let state = generate_price_paths(&c, session);
            let jp = &state.jump_periods;
            assert!(jp.windows(2).all(|w| w[0] < w[1]), "not sorted/distinct");
            assert!(jp.iter().all(|t| (1..=c.num_rounds).contains(t)));
        }
    }

    #[test]
    fn test_jump_periods_carry_jump_return() {
        let c = cfg();
        let state = generate_price_paths(&c, "S1");
        for t in &state.jump_periods {
            assert_eq!(state.trap_returns[(*t - 1) as usize], c.jump_return);
        }
    }

    #[test]
    fn test_trap_jumped_into_echoes_previous_period() {
        let c = cfg();
        let state = generate_price_paths(&c, "S1");
        assert!(!state.trap_jumped_into(1));
        for t in &state.jump_periods {
            if *t < c.num_rounds {
                assert!(state.trap_jumped_into(t + 1));
            }
        }
    }

    #[test]
    fn test_nonjump_trap_returns_within_band() {
        let c = cfg();
        let state = generate_price_paths(&c, "S1");
        for (i, r) in state.trap_returns.iter().enumerate() {
            let period = i as u32 + 1;
            if state.jump_periods.binary_search(&period).is_err() && *r != c.crash_return {
                assert!(
                    (c.trap_return_min..=c.trap_return_max).contains(r),
                    "period {} return {} outside band",
                    period,
                    r
                );
            }
        }
    }

    #[test]
    fn test_coin_returns_move_price_both_ways() {
        // Over 25 periods the coin flip realizes both signs with
        // overwhelming probability for any seed worth shipping.
        let c = cfg();
        let state = generate_price_paths(&c, "S1");
        let series = state.series(Asset::Coin);
        let mut up = 0;
        let mut down = 0;
        for w in series.windows(2) {
            if w[1] > w[0] {
                up += 1;
            } else if w[1] < w[0] {
                down += 1;
            }
        }
        assert!(up > 0 && down > 0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.006), 10.01);
        assert_eq!(round2(10.004), 10.0);
        assert_eq!(round2(9.994999), 9.99);
        assert_eq!(round2(0.1), 0.1);
    }

    #[test]
    fn test_step_applies_floor_before_rounding() {
        assert_eq!(step(0.10, -0.60, 0.10), 0.10);
        assert_eq!(step(10.0, 0.50, 0.10), 15.0);
    }
}
