//! Run a full session end to end with scripted participants.
//!
//! Usage: simulate [SESSION_CODE] [NUM_PARTICIPANTS]
//!
//! Each participant follows a deterministic script (spread the endowment in
//! round 1, dump the trap asset on an urgency cue, drift money into the
//! safe asset otherwise), so two runs with the same session code print
//! identical ledgers. Every executed round is re-checked against the
//! ledger invariants.

use tradelab::asset::Asset;
use tradelab::exec::TradeRequest;
use tradelab::session::ExperimentSession;
use tradelab::storage::StateStore;
use tradelab::verify;
use tradelab::Config;

fn scripted_request(session: &ExperimentSession, participant: u32, round: u32) -> TradeRequest {
    let mut req = TradeRequest::none();
    if round == 1 {
        // Spread: a few units of everything, tilted by participant id.
        req.buy[Asset::Safe] = 3 + participant % 2;
        req.buy[Asset::Trap] = 2;
        req.buy[Asset::Coin] = 2;
        req.buy[Asset::Wild] = 1;
        return req;
    }
    if session.urgent_round(round) || session.trap_jumped_into(round) {
        // The cue tempts; the script takes profits instead.
        req.sell[Asset::Trap] = 99;
        req.buy[Asset::Safe] = 99;
        return req;
    }
    if round % 5 == 0 {
        req.sell[Asset::Wild] = 1;
        req.buy[Asset::Safe] = 1;
    }
    req
}

fn main() {
    let code = std::env::args().nth(1).unwrap_or_else(|| "S1".to_string());
    let participants: u32 = std::env::args()
        .nth(2)
        .and_then(|v| v.parse().ok())
        .unwrap_or(2);

    let cfg = Config::from_env();
    println!("config_hash={}", cfg.config_hash());

    let mut store = match StateStore::new(&cfg.sqlite_path).and_then(|mut s| {
        s.init()?;
        Ok(s)
    }) {
        Ok(s) => Some(s),
        Err(err) => {
            eprintln!("store unavailable, running in-memory only: {}", err);
            None
        }
    };

    let num_rounds = cfg.num_rounds;
    let mut session = ExperimentSession::new(cfg.clone(), &code);

    let state = session.ensure_price_state().clone();
    if let Err(v) = verify::assert_price_state(&state, &cfg) {
        eprintln!("generated price state invalid: {}", v.msg);
        return;
    }
    println!(
        "session={} trap_jumps={:?} urgent_rounds={:?}",
        code,
        state.jump_periods,
        session.ensure_urgency_schedule()
    );

    for p in 1..=participants {
        session.initialize_round1(&p.to_string());
    }

    for round in 1..=num_rounds {
        let prices = session.prices_for_round(round);
        for p in 1..=participants {
            let pid = p.to_string();
            let opening = match session.open_record(&pid) {
                Some(r) => r.holdings(),
                None => {
                    eprintln!("no open round for participant {}", p);
                    return;
                }
            };
            let slots = session
                .ui_slots(&pid, round)
                .iter()
                .map(|s| format!("{}:{}", s.code, s.qty))
                .collect::<Vec<_>>()
                .join(",");
            let req = scripted_request(&session, p, round);
            let timed_out = round == 3 && p == 1; // one scripted lapse
            let record = match session.execute_round(&pid, req, timed_out) {
                Ok(r) => r.clone(),
                Err(err) => {
                    eprintln!("round {} participant {} failed: {}", round, p, err);
                    return;
                }
            };
            if let Err(v) = verify::assert_round_invariants(&record, &opening, &prices) {
                eprintln!("ledger invariant broken: {}", v.msg);
                return;
            }
            println!(
                "round={} participant={} slots=[{}] cash={:.2} wealth_now={:.2} wealth_next={:.2} gain={:.2}",
                round,
                p,
                slots,
                record.cash,
                record.wealth_now,
                record.wealth_next,
                record.gain_from_price_move
            );
            if let Some(s) = store.as_mut() {
                if let Err(err) = s.persist_round(&code, &pid, &record) {
                    eprintln!("persist failed: {}", err);
                }
            }
        }
    }

    for p in 1..=participants {
        if let Some(summary) = session.final_summary(&p.to_string()) {
            println!(
                "final participant={} cash={:.2} wealth={:.2} qty={:?}",
                p, summary.cash, summary.wealth, summary.qty
            );
        }
    }
}
