//! Per-session experiment state and the surface the front end calls.
//!
//! All `ensure_*` entry points are idempotent: first access builds the
//! state, later accesses return it untouched. Session-scoped state sits
//! behind a once-only initialization barrier; per-participant state is
//! guarded by presence checks. Nothing here ever overwrites existing state.

use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::asset::Asset;
use crate::config::Config;
use crate::exec::{self, Holdings, PlayerRound, Qty, RoundPrices, TradeRequest};
use crate::logging::{json_log, obj, v_bool, v_int, v_num, v_str};
use crate::paths::{generate_price_paths, SessionPriceState};
use crate::schedule;
use crate::seed::{seed_fingerprint, PURPOSE_PRICES};

/// What the front end needs to render one display slot.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub label: String,
    pub code: &'static str,
    pub qty: Qty,
    pub price_now: String,
    pub price_next: String,
    pub exec_buy: Qty,
    pub exec_sell: Qty,
    pub urgent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalSummary {
    pub cash: f64,
    pub qty: Vec<(String, Qty)>,
    pub wealth: f64,
}

/// One experiment session: shared price/cue state plus every participant's
/// ledger, keyed by participant id.
pub struct ExperimentSession {
    cfg: Config,
    code: String,
    prices: OnceLock<SessionPriceState>,
    urgency: OnceLock<Vec<u32>>,
    ui_orders: HashMap<String, [Asset; 4]>,
    carry: HashMap<String, Holdings>,
    open: HashMap<String, PlayerRound>,
    history: HashMap<String, Vec<PlayerRound>>,
}

impl ExperimentSession {
    pub fn new(cfg: Config, code: &str) -> Self {
        Self {
            cfg,
            code: code.to_string(),
            prices: OnceLock::new(),
            urgency: OnceLock::new(),
            ui_orders: HashMap::new(),
            carry: HashMap::new(),
            open: HashMap::new(),
            history: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Build the shared price paths on first access; no-op afterwards.
    pub fn ensure_price_state(&self) -> &SessionPriceState {
        self.prices.get_or_init(|| {
            let state = generate_price_paths(&self.cfg, &self.code);
            json_log(
                "paths.generated",
                obj(&[
                    ("session", v_str(&self.code)),
                    ("seed", v_str(&seed_fingerprint(&[self.code.as_str(), PURPOSE_PRICES]))),
                    ("rounds", v_int(self.cfg.num_rounds as i64)),
                    ("trap_jumps", v_int(state.jump_periods.len() as i64)),
                ]),
            );
            state
        })
    }

    /// Build the urgency schedule on first access; no-op afterwards.
    pub fn ensure_urgency_schedule(&self) -> &[u32] {
        self.urgency
            .get_or_init(|| schedule::urgency_schedule(&self.cfg, &self.code))
    }

    /// Memoized display permutation for one participant.
    pub fn ensure_ui_order(&mut self, participant: &str) -> [Asset; 4] {
        if let Some(order) = self.ui_orders.get(participant) {
            return *order;
        }
        let order = schedule::ui_order(&self.code, participant);
        self.ui_orders.insert(participant.to_string(), order);
        order
    }

    /// Open the participant's first round from the session endowment, or
    /// from an existing carry snapshot if one was restored. Idempotent.
    pub fn initialize_round1(&mut self, participant: &str) -> &PlayerRound {
        self.ensure_price_state();
        if !self.open.contains_key(participant)
            && self.history.get(participant).map_or(true, |h| h.is_empty())
        {
            let opening = *self
                .carry
                .entry(participant.to_string())
                .or_insert_with(|| Holdings::new(self.cfg.initial_cash));
            self.open
                .insert(participant.to_string(), PlayerRound::open(1, opening));
        }
        self.open
            .get(participant)
            .or_else(|| self.history.get(participant).and_then(|h| h.first()))
            .unwrap_or_else(|| unreachable!("round 1 record just inserted"))
    }

    /// Restore a participant's carry snapshot (e.g. from the store) before
    /// round 1 opens. Existing state wins; restoring later is a no-op.
    pub fn restore_carry(&mut self, participant: &str, holdings: Holdings) {
        if !self.carry.contains_key(participant) && !self.open.contains_key(participant) {
            self.carry.insert(participant.to_string(), holdings);
        }
    }

    /// The round currently awaiting this participant's decision.
    pub fn current_round(&self, participant: &str) -> Option<u32> {
        self.open.get(participant).map(|r| r.round)
    }

    /// The not-yet-executed record for the current round, if any. Its
    /// cash/qty are the round's opening holdings.
    pub fn open_record(&self, participant: &str) -> Option<&PlayerRound> {
        self.open.get(participant)
    }

    /// Current and next prices for every asset in one round.
    pub fn prices_for_round(&self, round: u32) -> RoundPrices {
        self.round_prices(round)
    }

    /// Finalize the participant's open round: execute the requests, record
    /// the outcome, write the carry snapshot, and open the next round if
    /// one exists. Each round can be executed exactly once.
    pub fn execute_round(
        &mut self,
        participant: &str,
        requested: TradeRequest,
        timed_out: bool,
    ) -> Result<&PlayerRound> {
        let mut record = self
            .open
            .remove(participant)
            .ok_or_else(|| anyhow!("no open round for participant {}", participant))?;
        let round = record.round;
        let prices = self.round_prices(round);

        let carry = exec::execute_round(&mut record, &prices, requested, timed_out);
        self.carry.insert(participant.to_string(), carry);

        json_log(
            "round.executed",
            obj(&[
                ("session", v_str(&self.code)),
                ("participant", v_str(participant)),
                ("round", v_int(round as i64)),
                ("timed_out", v_bool(timed_out)),
                ("cash", v_num(record.cash)),
                ("wealth_now", v_num(record.wealth_now)),
                ("wealth_next", v_num(record.wealth_next)),
            ]),
        );

        if round < self.cfg.num_rounds {
            self.open
                .insert(participant.to_string(), PlayerRound::open(round + 1, carry));
        }
        let history = self.history.entry(participant.to_string()).or_default();
        history.push(record);
        Ok(history.last().unwrap_or_else(|| unreachable!("record just pushed")))
    }

    pub fn price_now(&self, asset: Asset, round: u32) -> f64 {
        self.ensure_price_state().price_now(asset, round)
    }

    pub fn price_next(&self, asset: Asset, round: u32) -> f64 {
        self.ensure_price_state().price_next(asset, round)
    }

    /// Scheduled urgency cue membership for a round.
    pub fn urgent_round(&self, round: u32) -> bool {
        self.ensure_urgency_schedule().binary_search(&round).is_ok()
    }

    /// Price-derived cue: the trap price shown this round is the result of
    /// a jump in the preceding period.
    pub fn trap_jumped_into(&self, round: u32) -> bool {
        self.ensure_price_state().trap_jumped_into(round)
    }

    pub fn round_record(&self, participant: &str, round: u32) -> Option<&PlayerRound> {
        self.history
            .get(participant)?
            .get((round - 1) as usize)
            .filter(|r| r.round == round)
    }

    fn record_for_view(&self, participant: &str, round: u32) -> Option<&PlayerRound> {
        match self.open.get(participant) {
            Some(open) if open.round == round => Some(open),
            _ => self.round_record(participant, round),
        }
    }

    fn round_prices(&self, round: u32) -> RoundPrices {
        let state = self.ensure_price_state();
        let mut prices = RoundPrices {
            now: Default::default(),
            next: Default::default(),
        };
        for asset in Asset::ALL {
            prices.now[asset] = state.price_now(asset, round);
            prices.next[asset] = state.price_next(asset, round);
        }
        prices
    }

    /// Display slots for one participant and round: neutral labels in the
    /// participant's fixed permutation, with the urgency flag attached to
    /// whichever slot hides the trap asset.
    pub fn ui_slots(&mut self, participant: &str, round: u32) -> Vec<SlotView> {
        let order = self.ensure_ui_order(participant);
        let urgent = self.urgent_round(round);
        let state = self.ensure_price_state();

        let labels = ["Asset A", "Asset B", "Asset C", "Asset D"];
        let record = self.record_for_view(participant, round);

        order
            .iter()
            .enumerate()
            .map(|(slot, asset)| SlotView {
                label: labels[slot].to_string(),
                code: asset.code(),
                qty: record.map_or(0, |r| r.qty[*asset]),
                price_now: fmt2(state.price_now(*asset, round)),
                price_next: fmt2(state.price_next(*asset, round)),
                exec_buy: record.map_or(0, |r| r.executed.buy[*asset]),
                exec_sell: record.map_or(0, |r| r.executed.sell[*asset]),
                urgent: *asset == Asset::Trap && urgent,
            })
            .collect()
    }

    /// Available once the terminal round has been executed.
    pub fn final_summary(&self, participant: &str) -> Option<FinalSummary> {
        let history = self.history.get(participant)?;
        let last = history.last()?;
        if last.round != self.cfg.num_rounds {
            return None;
        }
        Some(FinalSummary {
            cash: last.cash,
            qty: Asset::ALL
                .iter()
                .map(|a| (a.code().to_string(), last.qty[*a]))
                .collect(),
            wealth: last.wealth_now,
        })
    }
}

/// Two-decimal display string, the only formatting the core owns.
pub fn fmt2(x: f64) -> String {
    format!("{:.2}", x)
}
