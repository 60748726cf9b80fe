//! Session-level cue scheduling and per-participant display order.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::asset::Asset;
use crate::config::Config;
use crate::seed::{self, PURPOSE_UI_ORDER, PURPOSE_URGENCY};

/// Rounds that show the urgency cue, sorted ascending.
///
/// Candidates are `2..=num_rounds` — round 1 has no prior round to compare
/// against. Each candidate is drawn independently with the trap asset's
/// jump probability, then topped up from the remaining candidates until the
/// configured minimum holds. Runs on its own stream so the price
/// generator's draw count can change without moving the cue rounds.
pub fn urgency_schedule(cfg: &Config, session: &str) -> Vec<u32> {
    let mut rng = seed::session_stream(session, PURPOSE_URGENCY);

    let mut urgent: Vec<u32> = Vec::new();
    for round in 2..=cfg.num_rounds {
        if rng.gen::<f64>() < cfg.jump_prob {
            urgent.push(round);
        }
    }
    while (urgent.len() as u32) < cfg.min_urgent_rounds {
        let remaining: Vec<u32> = (2..=cfg.num_rounds).filter(|r| !urgent.contains(r)).collect();
        if remaining.is_empty() {
            break;
        }
        urgent.push(remaining[rng.gen_range(0..remaining.len())]);
    }
    urgent.sort_unstable();
    urgent
}

/// Display-slot permutation for one participant: `order[i]` is the
/// underlying asset shown in slot `i`. Stable for the whole session.
pub fn ui_order(session: &str, participant: &str) -> [Asset; 4] {
    let mut rng = seed::participant_stream(session, PURPOSE_UI_ORDER, participant);
    let mut order = Asset::ALL;
    order.shuffle(&mut rng);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_deterministic() {
        let cfg = Config::default();
        assert_eq!(urgency_schedule(&cfg, "S1"), urgency_schedule(&cfg, "S1"));
    }

    #[test]
    fn test_schedule_excludes_round_one_and_meets_minimum() {
        let cfg = Config::default();
        for session in ["S1", "S2", "S3", "S4", "S5"] {
            let sched = urgency_schedule(&cfg, session);
            assert!(sched.len() as u32 >= cfg.min_urgent_rounds, "{}", session);
            assert!(sched.iter().all(|r| (2..=cfg.num_rounds).contains(r)));
            assert!(sched.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_schedule_minimum_survives_zero_prob() {
        let cfg = Config {
            jump_prob: 0.0,
            ..Config::default()
        };
        let sched = urgency_schedule(&cfg, "S1");
        assert_eq!(sched.len() as u32, cfg.min_urgent_rounds);
    }

    #[test]
    fn test_schedule_independent_of_price_stream() {
        // Same session, different purposes: drawing prices never moves the
        // cue schedule because the streams are seeded apart.
        let cfg = Config::default();
        let before = urgency_schedule(&cfg, "S1");
        let _paths = crate::paths::generate_price_paths(&cfg, "S1");
        let after = urgency_schedule(&cfg, "S1");
        assert_eq!(before, after);
    }

    #[test]
    fn test_ui_order_stable_per_participant() {
        assert_eq!(ui_order("S1", "7"), ui_order("S1", "7"));
    }

    #[test]
    fn test_ui_order_is_a_permutation() {
        for pid in ["1", "2", "3", "4", "5", "6"] {
            let order = ui_order("S1", pid);
            let mut seen: Vec<Asset> = order.to_vec();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), 4, "participant {}", pid);
        }
    }

    #[test]
    fn test_ui_order_varies_across_participants() {
        // Not guaranteed per pair, but across six participants at least two
        // permutations must differ.
        let orders: Vec<[Asset; 4]> =
            (1..=6).map(|p| ui_order("S1", &p.to_string())).collect();
        assert!(orders.iter().any(|o| o != &orders[0]));
    }
}
