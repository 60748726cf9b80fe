//! Ledger and generator invariant checks.
//!
//! The engine is built so these cannot fail; the checks exist as an
//! independent gate for tests and the simulator, in the spirit of
//! trust-but-verify.

use crate::asset::Asset;
use crate::config::Config;
use crate::exec::{Holdings, PlayerRound, RoundPrices};
use crate::paths::SessionPriceState;

#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub msg: String,
}

fn violation(msg: String) -> Result<(), InvariantViolation> {
    Err(InvariantViolation { msg })
}

/// Check a finalized round record against its opening holdings and the
/// prices it executed at.
pub fn assert_round_invariants(
    record: &PlayerRound,
    opening: &Holdings,
    prices: &RoundPrices,
) -> Result<(), InvariantViolation> {
    if record.cash.is_nan() || record.wealth_now.is_nan() || record.wealth_next.is_nan() {
        return violation(format!("round {}: NaN in ledger", record.round));
    }
    if record.cash < 0.0 {
        return violation(format!("round {}: overdraft, cash={}", record.round, record.cash));
    }

    let mut cash_after_sells = opening.cash;
    for asset in Asset::ALL {
        let sold = record.executed.sell[asset];
        if sold > record.requested.sell[asset] || sold > opening.qty[asset] {
            return violation(format!(
                "round {}: sell of {:?} exceeds request or holdings",
                record.round, asset
            ));
        }
        cash_after_sells += sold as f64 * prices.now[asset];
    }

    let mut buy_spend = 0.0;
    for asset in Asset::ALL {
        let bought = record.executed.buy[asset];
        if bought > record.requested.buy[asset] {
            return violation(format!(
                "round {}: buy of {:?} exceeds request",
                record.round, asset
            ));
        }
        buy_spend += bought as f64 * prices.now[asset];
    }
    if buy_spend > cash_after_sells + 1e-6 {
        return violation(format!(
            "round {}: buys spent {} with only {} available",
            record.round, buy_spend, cash_after_sells
        ));
    }

    let expected_wealth = record.cash
        + Asset::ALL
            .iter()
            .map(|a| record.qty[*a] as f64 * prices.now[*a])
            .sum::<f64>();
    if record.wealth_now != expected_wealth {
        return violation(format!(
            "round {}: wealth identity broken, {} != {}",
            record.round, record.wealth_now, expected_wealth
        ));
    }
    Ok(())
}

/// Check a generated price state against the config it was built from.
pub fn assert_price_state(
    state: &SessionPriceState,
    cfg: &Config,
) -> Result<(), InvariantViolation> {
    let expected_len = cfg.num_rounds as usize + 1;
    for asset in Asset::ALL {
        let series = state.series(asset);
        if series.len() != expected_len {
            return violation(format!(
                "{:?}: series length {} != {}",
                asset,
                series.len(),
                expected_len
            ));
        }
        for (i, p) in series.iter().enumerate() {
            if !p.is_finite() || *p < cfg.price_floor {
                return violation(format!("{:?}: price {} at index {} below floor", asset, p, i));
            }
        }
    }
    if (state.jump_periods.len() as u32) < cfg.min_trap_jumps {
        return violation(format!(
            "only {} trap jumps, minimum {}",
            state.jump_periods.len(),
            cfg.min_trap_jumps
        ));
    }
    if state.trap_returns.len() != cfg.num_rounds as usize {
        return violation("trap return series length mismatch".to_string());
    }
    Ok(())
}
