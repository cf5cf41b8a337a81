//! Race Engine
//!
//! Drives a race session from selection to settlement:
//!
//! ```text
//! Selecting --start_race--> Racing --settle_race--> Settled
//! ```
//!
//! The wait between start and settlement belongs to the caller (the race
//! animation). The engine never blocks; it is re-entered once the slower
//! racer has crossed the line.

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RaceConfig;
use crate::core::rng::RandomSource;
use crate::economy::catalog::BoosterKind;
use crate::economy::ledger::{Ledger, LedgerError};
use crate::economy::store::SaveLoad;
use crate::race::session::{BoosterFlags, RacePhase, RaceSession, RacerDurations, RacerId};

/// Data returned when a race starts, used to time the animation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RaceStart {
    /// Session identifier
    pub session_id: Uuid,
    /// Player's champion
    pub chosen_racer: RacerId,
    /// Finish time of each racer
    pub racer_durations: RacerDurations,
    /// An x2 booster was consumed
    pub x2_applied: bool,
    /// A guaranteed-win booster was consumed
    pub guaranteed_applied: bool,
}

impl RaceStart {
    /// Seconds until settlement should run.
    pub fn settle_after(&self) -> f64 {
        self.racer_durations.slowest()
    }
}

/// Result of a settled race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RaceOutcome {
    /// Winning racer
    pub winner: RacerId,
    /// The player's champion won
    pub did_win: bool,
    /// Points credited to the ledger
    pub points_awarded: i64,
    /// The durations were equal and a coin flip decided
    pub tie_break: bool,
}

/// Race engine errors.
#[derive(Debug, thiserror::Error)]
pub enum RaceError {
    /// The player has left the race screen.
    #[error("no race session is open")]
    NoSession,

    /// Start requested without a champion.
    #[error("no racer selected")]
    NoRacerSelected,

    /// Selection or start requested after the race began.
    #[error("race already started")]
    NotSelecting,

    /// Settlement requested before the race began.
    #[error("race has not started")]
    NotRacing,

    /// Settlement requested twice.
    #[error("race already settled")]
    AlreadySettled,

    /// Ledger update failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Race state machine.
///
/// Owns the random source and the current session. The ledger is borrowed
/// per call so the same ledger also serves the shop between races.
#[derive(Debug)]
pub struct RaceEngine<R: RandomSource> {
    rng: R,
    config: RaceConfig,
    session: Option<RaceSession>,
}

impl<R: RandomSource> RaceEngine<R> {
    /// Create an engine with a fresh session open.
    pub fn new(rng: R, config: RaceConfig) -> Self {
        Self {
            rng,
            config,
            session: Some(RaceSession::new()),
        }
    }

    /// Race settings in effect.
    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Current session, if the race screen is open.
    pub fn session(&self) -> Option<&RaceSession> {
        self.session.as_ref()
    }

    /// Current phase, if the race screen is open.
    pub fn phase(&self) -> Option<RacePhase> {
        self.session.as_ref().map(|s| s.phase)
    }

    /// Discard the current session and open a new one.
    pub fn new_session(&mut self) -> &RaceSession {
        let session = RaceSession::new();
        debug!(session = %session.id, "Race session opened");
        self.session.insert(session)
    }

    /// Discard the current session (back to the menu).
    pub fn leave(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(session = %session.id, phase = ?session.phase, "Race session closed");
        }
    }

    /// Pick the player's champion.
    pub fn select_racer(&mut self, racer: RacerId) -> Result<(), RaceError> {
        let session = self.session.as_mut().ok_or(RaceError::NoSession)?;
        if session.phase != RacePhase::Selecting {
            return Err(RaceError::NotSelecting);
        }
        session.selected_racer = Some(racer);
        debug!(session = %session.id, %racer, "Racer selected");
        Ok(())
    }

    /// Start the race.
    ///
    /// `chosen` overrides any earlier [`RaceEngine::select_racer`] call. Both
    /// durations are drawn from the configured range, then the boosters are
    /// applied if the ledger holds them:
    ///
    /// - guaranteed win: the chosen racer runs the minimum duration and the
    ///   opponent is redrawn above the guaranteed floor
    /// - x2: consumed now, doubles the reward at settlement
    pub fn start_race<S: SaveLoad>(
        &mut self,
        ledger: &mut Ledger<S>,
        chosen: Option<RacerId>,
        boosters: BoosterFlags,
    ) -> Result<RaceStart, RaceError> {
        let session = self.session.as_mut().ok_or(RaceError::NoSession)?;
        if session.phase != RacePhase::Selecting {
            return Err(RaceError::NotSelecting);
        }
        let chosen = chosen.or(session.selected_racer).ok_or(RaceError::NoRacerSelected)?;

        let config = &self.config;
        let mut durations = RacerDurations {
            one: self.rng.next_f64_range(config.min_duration, config.max_duration),
            two: self.rng.next_f64_range(config.min_duration, config.max_duration),
        };

        if boosters.use_guaranteed_win && ledger.booster_count(BoosterKind::GuaranteedWin) == 0 {
            warn!(session = %session.id, "Guaranteed win requested without inventory");
        }
        if boosters.use_double_points && ledger.booster_count(BoosterKind::DoublePoints) == 0 {
            warn!(session = %session.id, "x2 requested without inventory");
        }
        // Session is untouched until the boosters are safely spent
        let (x2_applied, guaranteed_applied) = ledger
            .consume_race_boosters(boosters.use_double_points, boosters.use_guaranteed_win)?;

        if guaranteed_applied {
            durations.set(chosen, config.min_duration);
            durations.set(
                chosen.opponent(),
                self.rng.next_f64_range(config.guaranteed_opponent_min, config.max_duration),
            );
        }

        session.selected_racer = Some(chosen);
        session.boosters = boosters;
        session.x2_applied = x2_applied;
        session.guaranteed_applied = guaranteed_applied;
        session.racer_durations = durations;
        session.phase = RacePhase::Racing;

        info!(
            session = %session.id,
            racer = chosen.number(),
            duration_1 = durations.one,
            duration_2 = durations.two,
            x2 = session.x2_applied,
            guaranteed = session.guaranteed_applied,
            "Race started"
        );

        Ok(RaceStart {
            session_id: session.id,
            chosen_racer: chosen,
            racer_durations: durations,
            x2_applied: session.x2_applied,
            guaranteed_applied: session.guaranteed_applied,
        })
    }

    /// Decide the winner and pay out.
    ///
    /// The session is marked settled before the ledger is touched, so a
    /// second call is rejected even if the save fails. The outcome and the
    /// reward reach the ledger together in one update.
    pub fn settle_race<S: SaveLoad>(
        &mut self,
        ledger: &mut Ledger<S>,
    ) -> Result<RaceOutcome, RaceError> {
        let session = self.session.as_mut().ok_or(RaceError::NoSession)?;
        match session.phase {
            RacePhase::Racing => {}
            RacePhase::Selecting => return Err(RaceError::NotRacing),
            RacePhase::Settled => {
                warn!(session = %session.id, "Ignoring repeated settlement");
                return Err(RaceError::AlreadySettled);
            }
        }
        let selected = session.selected_racer.ok_or(RaceError::NoRacerSelected)?;

        let (winner, tie_break) = match session.racer_durations.leader() {
            Some(leader) => (leader, false),
            None => {
                let winner = if self.rng.coin_flip() { RacerId::One } else { RacerId::Two };
                (winner, true)
            }
        };
        let did_win = winner == selected;
        let points_awarded = if did_win {
            let multiplier = if session.x2_applied { 2 } else { 1 };
            self.config.base_reward * multiplier
        } else {
            0
        };

        session.winner = Some(winner);
        session.phase = RacePhase::Settled;
        session.boosters = BoosterFlags::default();
        session.x2_applied = false;
        session.guaranteed_applied = false;

        info!(
            session = %session.id,
            winner = winner.number(),
            did_win,
            points_awarded,
            tie_break,
            "Race settled"
        );

        ledger.record_settlement(did_win, points_awarded)?;

        Ok(RaceOutcome { winner, did_win, points_awarded, tie_break })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::config::EconomyConfig;
    use crate::core::rng::DeterministicRng;
    use crate::economy::store::{MemoryStore, PersistError, StoredEconomy};

    /// Replays fixed raw values, then zeros.
    struct ScriptedRng(VecDeque<u64>);

    impl ScriptedRng {
        fn new(values: &[u64]) -> Self {
            Self(values.iter().copied().collect())
        }
    }

    impl RandomSource for ScriptedRng {
        fn next_u64(&mut self) -> u64 {
            self.0.pop_front().unwrap_or(0)
        }
    }

    /// Racer 1 draws the minimum, racer 2 close to the maximum.
    fn racer_one_fast() -> ScriptedRng {
        ScriptedRng::new(&[0, u64::MAX])
    }

    /// Fails the `fail_at`-th save (1-based) and keeps the last good record.
    #[derive(Debug, Default)]
    struct FlakyStore {
        saves: u32,
        fail_at: u32,
        last: Option<StoredEconomy>,
    }

    impl SaveLoad for FlakyStore {
        fn load(&mut self) -> Result<StoredEconomy, PersistError> {
            Ok(StoredEconomy::default())
        }

        fn save(&mut self, record: &StoredEconomy) -> Result<(), PersistError> {
            self.saves += 1;
            if self.saves == self.fail_at {
                return Err(PersistError::Unavailable("write interrupted".into()));
            }
            self.last = Some(record.clone());
            Ok(())
        }
    }

    fn flaky_ledger(fail_at: u32) -> Ledger<FlakyStore> {
        let store = FlakyStore { fail_at, ..Default::default() };
        Ledger::load(store, EconomyConfig::default()).unwrap()
    }

    fn ledger_with(record: StoredEconomy) -> Ledger<MemoryStore> {
        Ledger::load(MemoryStore::with_record(record), EconomyConfig::default()).unwrap()
    }

    fn fresh_ledger() -> Ledger<MemoryStore> {
        ledger_with(StoredEconomy::default())
    }

    fn tie_config() -> RaceConfig {
        RaceConfig { min_duration: 5.0, max_duration: 5.0, ..RaceConfig::default() }
    }

    #[test]
    fn test_start_requires_racer() {
        let mut engine = RaceEngine::new(DeterministicRng::new(1), RaceConfig::default());
        let mut ledger = fresh_ledger();

        let err = engine.start_race(&mut ledger, None, BoosterFlags::default()).unwrap_err();
        assert!(matches!(err, RaceError::NoRacerSelected));
        assert_eq!(engine.phase(), Some(RacePhase::Selecting));

        engine.select_racer(RacerId::Two).unwrap();
        let start = engine.start_race(&mut ledger, None, BoosterFlags::default()).unwrap();
        assert_eq!(start.chosen_racer, RacerId::Two);
        assert_eq!(engine.phase(), Some(RacePhase::Racing));
    }

    #[test]
    fn test_durations_within_range() {
        let mut engine = RaceEngine::new(DeterministicRng::new(99), RaceConfig::default());
        let mut ledger = fresh_ledger();

        for _ in 0..500 {
            engine.new_session();
            let start = engine
                .start_race(&mut ledger, Some(RacerId::One), BoosterFlags::default())
                .unwrap();
            for racer in RacerId::ALL {
                let d = start.racer_durations.get(racer);
                assert!((3.0..20.0).contains(&d), "duration {d}");
            }
            engine.settle_race(&mut ledger).unwrap();
        }

        let economy = ledger.economy();
        assert_eq!(economy.total_races, 500);
        assert_eq!(economy.total_races, economy.wins + economy.losses);
    }

    #[test]
    fn test_cannot_restart_or_reselect_while_racing() {
        let mut engine = RaceEngine::new(DeterministicRng::new(3), RaceConfig::default());
        let mut ledger = fresh_ledger();

        engine.start_race(&mut ledger, Some(RacerId::One), BoosterFlags::default()).unwrap();

        assert!(matches!(engine.select_racer(RacerId::Two), Err(RaceError::NotSelecting)));
        assert!(matches!(
            engine.start_race(&mut ledger, Some(RacerId::Two), BoosterFlags::new(true, true)),
            Err(RaceError::NotSelecting)
        ));
        // Second start must not touch boosters
        assert_eq!(ledger.economy().x2_boosters, 1);
        assert_eq!(ledger.economy().guaranteed_boosters, 1);
    }

    #[test]
    fn test_settle_before_start_rejected() {
        let mut engine = RaceEngine::new(DeterministicRng::new(4), RaceConfig::default());
        let mut ledger = fresh_ledger();

        assert!(matches!(engine.settle_race(&mut ledger), Err(RaceError::NotRacing)));
        assert_eq!(ledger.economy().total_races, 0);
    }

    #[test]
    fn test_x2_win_scenario() {
        let mut engine = RaceEngine::new(racer_one_fast(), RaceConfig::default());
        let mut ledger = fresh_ledger();
        assert_eq!(ledger.points(), 50);

        let start = engine
            .start_race(&mut ledger, Some(RacerId::One), BoosterFlags::new(true, false))
            .unwrap();
        assert!(start.x2_applied);
        assert_eq!(start.racer_durations.one, 3.0);
        assert_eq!(ledger.economy().x2_boosters, 0);

        let outcome = engine.settle_race(&mut ledger).unwrap();
        assert_eq!(outcome.winner, RacerId::One);
        assert!(outcome.did_win);
        assert_eq!(outcome.points_awarded, 100);
        assert_eq!(ledger.points(), 150);
        assert_eq!(ledger.economy().wins, 1);
    }

    #[test]
    fn test_loss_pays_nothing_but_consumes_x2() {
        let mut engine = RaceEngine::new(racer_one_fast(), RaceConfig::default());
        let mut ledger = fresh_ledger();

        engine
            .start_race(&mut ledger, Some(RacerId::Two), BoosterFlags::new(true, false))
            .unwrap();
        let outcome = engine.settle_race(&mut ledger).unwrap();

        assert!(!outcome.did_win);
        assert_eq!(outcome.points_awarded, 0);
        assert_eq!(ledger.points(), 50);
        assert_eq!(ledger.economy().x2_boosters, 0);
        assert_eq!(ledger.economy().losses, 1);
    }

    #[test]
    fn test_x2_without_inventory_pays_base() {
        let mut engine = RaceEngine::new(racer_one_fast(), RaceConfig::default());
        let mut ledger = fresh_ledger();
        ledger.consume_x2_booster().unwrap();

        let start = engine
            .start_race(&mut ledger, Some(RacerId::One), BoosterFlags::new(true, false))
            .unwrap();
        assert!(!start.x2_applied);

        let outcome = engine.settle_race(&mut ledger).unwrap();
        assert_eq!(outcome.points_awarded, 50);
        assert_eq!(ledger.economy().x2_boosters, 0);
    }

    #[test]
    fn test_guaranteed_win_is_deterministic() {
        let mut engine = RaceEngine::new(DeterministicRng::new(2024), RaceConfig::default());
        let mut ledger = ledger_with(StoredEconomy {
            guaranteed_boosters: Some(300),
            ..Default::default()
        });

        for i in 0..300 {
            let chosen = if i % 2 == 0 { RacerId::One } else { RacerId::Two };
            engine.new_session();
            let start = engine
                .start_race(&mut ledger, Some(chosen), BoosterFlags::new(false, true))
                .unwrap();

            assert!(start.guaranteed_applied);
            assert_eq!(start.racer_durations.get(chosen), 3.0);
            let opponent = start.racer_durations.get(chosen.opponent());
            assert!((4.0..20.0).contains(&opponent), "opponent {opponent}");

            let outcome = engine.settle_race(&mut ledger).unwrap();
            assert!(outcome.did_win);
            assert!(!outcome.tie_break);
        }

        assert_eq!(ledger.economy().guaranteed_boosters, 0);
        assert_eq!(ledger.economy().wins, 300);
    }

    #[test]
    fn test_guaranteed_without_inventory_is_ignored() {
        let mut engine = RaceEngine::new(DeterministicRng::new(8), RaceConfig::default());
        let mut ledger = fresh_ledger();
        ledger.consume_guaranteed_booster().unwrap();

        let start = engine
            .start_race(&mut ledger, Some(RacerId::One), BoosterFlags::new(false, true))
            .unwrap();

        assert!(!start.guaranteed_applied);
        assert_eq!(ledger.economy().guaranteed_boosters, 0);
    }

    #[test]
    fn test_double_settle_is_rejected() {
        let mut engine = RaceEngine::new(racer_one_fast(), RaceConfig::default());
        let mut ledger = fresh_ledger();

        engine.start_race(&mut ledger, Some(RacerId::One), BoosterFlags::default()).unwrap();
        engine.settle_race(&mut ledger).unwrap();
        let after_first = ledger.economy().clone();
        let saves = ledger.store().save_count();

        assert!(matches!(engine.settle_race(&mut ledger), Err(RaceError::AlreadySettled)));
        assert_eq!(ledger.economy(), &after_first);
        assert_eq!(ledger.store().save_count(), saves);
    }

    #[test]
    fn test_settlement_resets_boosters() {
        let mut engine = RaceEngine::new(racer_one_fast(), RaceConfig::default());
        let mut ledger = fresh_ledger();

        engine
            .start_race(&mut ledger, Some(RacerId::One), BoosterFlags::new(true, true))
            .unwrap();
        engine.settle_race(&mut ledger).unwrap();

        let session = engine.session().unwrap();
        assert_eq!(session.phase, RacePhase::Settled);
        assert_eq!(session.boosters, BoosterFlags::default());
        assert!(!session.x2_applied);
        assert!(!session.guaranteed_applied);
        assert_eq!(session.did_win(), Some(true));
    }

    #[test]
    fn test_tie_break_is_fair() {
        let mut engine = RaceEngine::new(DeterministicRng::new(777), tie_config());
        let mut ledger = fresh_ledger();

        let runs = 4_000;
        let mut racer_one_wins = 0;
        for _ in 0..runs {
            engine.new_session();
            engine.start_race(&mut ledger, Some(RacerId::One), BoosterFlags::default()).unwrap();
            let outcome = engine.settle_race(&mut ledger).unwrap();
            assert!(outcome.tie_break);
            if outcome.winner == RacerId::One {
                racer_one_wins += 1;
            }
        }

        // 4k flips: 4 sigma is ~126
        assert!((1_874..=2_126).contains(&racer_one_wins), "racer 1 won {racer_one_wins}");
        assert_eq!(ledger.economy().wins, racer_one_wins);
    }

    #[test]
    fn test_leave_closes_session() {
        let mut engine = RaceEngine::new(DeterministicRng::new(5), RaceConfig::default());
        let mut ledger = fresh_ledger();

        engine.leave();
        assert!(engine.session().is_none());
        assert!(matches!(engine.select_racer(RacerId::One), Err(RaceError::NoSession)));
        assert!(matches!(
            engine.start_race(&mut ledger, Some(RacerId::One), BoosterFlags::default()),
            Err(RaceError::NoSession)
        ));
        assert!(matches!(engine.settle_race(&mut ledger), Err(RaceError::NoSession)));

        engine.new_session();
        assert_eq!(engine.phase(), Some(RacePhase::Selecting));
    }

    #[test]
    fn test_failed_start_spends_nothing() {
        let mut engine = RaceEngine::new(racer_one_fast(), RaceConfig::default());
        let mut ledger = flaky_ledger(1);

        let err = engine
            .start_race(&mut ledger, Some(RacerId::Two), BoosterFlags::new(true, true))
            .unwrap_err();
        assert!(matches!(err, RaceError::Ledger(LedgerError::Persist(_))));
        assert_eq!(ledger.economy().x2_boosters, 1);
        assert_eq!(ledger.economy().guaranteed_boosters, 1);

        let session = engine.session().unwrap();
        assert_eq!(session.phase, RacePhase::Selecting);
        assert_eq!(session.selected_racer, None);
        assert!(!session.x2_applied);
        assert!(!session.guaranteed_applied);

        // Retry applies both boosters for real
        let start = engine
            .start_race(&mut ledger, Some(RacerId::Two), BoosterFlags::new(true, true))
            .unwrap();
        assert!(start.x2_applied && start.guaranteed_applied);
        assert_eq!(start.racer_durations.two, 3.0);
        assert!(start.racer_durations.one >= 4.0);
        assert_eq!(ledger.economy().x2_boosters, 0);
        assert_eq!(ledger.economy().guaranteed_boosters, 0);

        let outcome = engine.settle_race(&mut ledger).unwrap();
        assert!(outcome.did_win);
        assert_eq!(ledger.points(), 150);
    }

    #[test]
    fn test_failed_settlement_keeps_win_and_reward() {
        let mut engine = RaceEngine::new(racer_one_fast(), RaceConfig::default());
        let mut ledger = flaky_ledger(2);

        engine
            .start_race(&mut ledger, Some(RacerId::One), BoosterFlags::new(false, true))
            .unwrap();

        let err = engine.settle_race(&mut ledger).unwrap_err();
        assert!(matches!(err, RaceError::Ledger(LedgerError::Persist(_))));
        assert!(matches!(engine.settle_race(&mut ledger), Err(RaceError::AlreadySettled)));

        let economy = ledger.economy();
        assert_eq!((economy.total_races, economy.wins), (1, 1));
        assert_eq!(economy.points, 100);

        // The next save carries the win and its payout
        ledger.grant_x2_booster().unwrap();
        let saved = ledger.store().last.clone().unwrap();
        assert_eq!(saved.wins, Some(1));
        assert_eq!(saved.points, Some(100));
    }
}
