//! Sequential trade execution against the round's prices.
//!
//! Order of operations is load-bearing: all sells settle first so their
//! proceeds can fund buys in the same round, and buys execute one asset at
//! a time in declared order so later assets only see the cash earlier ones
//! left behind. Quantities are unsigned, so no-short-selling and
//! non-negative requests hold by construction; overdraft is prevented by
//! capping each buy at `floor(cash / price)`.

use serde::{Deserialize, Serialize};

use crate::asset::{Asset, PerAsset};

pub type Qty = u32;

/// Requested buy/sell units per asset for one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub buy: PerAsset<Qty>,
    pub sell: PerAsset<Qty>,
}

impl TradeRequest {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Cash and holdings snapshot that survives between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    pub cash: f64,
    pub qty: PerAsset<Qty>,
}

impl Holdings {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            qty: PerAsset::default(),
        }
    }
}

/// Current and next prices per asset for one round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoundPrices {
    pub now: PerAsset<f64>,
    pub next: PerAsset<f64>,
}

/// One player's ledger record for one round.
///
/// Created with the round's opening holdings, finalized exactly once by
/// [`execute_round`], immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRound {
    pub round: u32,
    pub cash: f64,
    pub qty: PerAsset<Qty>,
    pub requested: TradeRequest,
    pub executed: TradeRequest,
    pub timed_out: bool,
    pub wealth_now: f64,
    pub wealth_next: f64,
    pub gain_from_price_move: f64,
}

impl PlayerRound {
    pub fn open(round: u32, opening: Holdings) -> Self {
        Self {
            round,
            cash: opening.cash,
            qty: opening.qty,
            requested: TradeRequest::none(),
            executed: TradeRequest::none(),
            timed_out: false,
            wealth_now: 0.0,
            wealth_next: 0.0,
            gain_from_price_move: 0.0,
        }
    }

    pub fn holdings(&self) -> Holdings {
        Holdings {
            cash: self.cash,
            qty: self.qty,
        }
    }
}

/// Cash is held at cent precision, matching the display currency.
fn cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Execute one round's requests against the record in place and return the
/// post-trade holdings — the caller seeds the next round's record from the
/// returned value.
///
/// A timed-out decision is an all-zero request. A non-positive price here
/// is a generator bug, not bad input, and fails fast.
pub fn execute_round(
    record: &mut PlayerRound,
    prices: &RoundPrices,
    requested: TradeRequest,
    timed_out: bool,
) -> Holdings {
    for asset in Asset::ALL {
        assert!(
            prices.now[asset] > 0.0 && prices.next[asset] > 0.0,
            "non-positive {:?} price reached the execution engine",
            asset
        );
    }

    let req = if timed_out { TradeRequest::none() } else { requested };
    record.requested = req;
    record.timed_out = timed_out;

    // 1) Sells first, capped by holdings.
    for asset in Asset::ALL {
        let sold = req.sell[asset].min(record.qty[asset]);
        record.qty[asset] -= sold;
        record.cash = cents(record.cash + sold as f64 * prices.now[asset]);
        record.executed.sell[asset] = sold;
    }

    // 2) Buys second, in declared order, each capped by remaining cash.
    for asset in Asset::ALL {
        let price = prices.now[asset];
        let affordable = (record.cash / price).floor() as Qty;
        let bought = req.buy[asset].min(affordable);
        record.cash = cents(record.cash - bought as f64 * price);
        record.qty[asset] += bought;
        record.executed.buy[asset] = bought;
    }

    // 3) Mark-to-market under current and next prices.
    record.wealth_now = record.cash
        + Asset::ALL
            .iter()
            .map(|a| record.qty[*a] as f64 * prices.now[*a])
            .sum::<f64>();
    record.wealth_next = record.cash
        + Asset::ALL
            .iter()
            .map(|a| record.qty[*a] as f64 * prices.next[*a])
            .sum::<f64>();
    record.gain_from_price_move = record.wealth_next - record.wealth_now;

    record.holdings()
}
