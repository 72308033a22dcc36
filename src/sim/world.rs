/// RunState: the single authoritative model of a run.
///
/// ## Phases
///
/// ```text
///   Menu ──start_game──▶ Playing ──soldiers hit 0──▶ GameOver
///                          │  ▲                        │
///          enemy health 0  │  └──restart_level─────────┤
///                          ▼                           │
///                   LevelComplete ──next_level──▶ Playing (next level)
///                          │                           │
///                          └──next_level (last)──▶ Menu ◀─start_game─┘
/// ```
///
/// Every mutating operation checks the phase first and returns
/// `RunError::IllegalOperation` without touching state when it is not
/// allowed. Fields are private to the `sim` module; the presentation layer
/// reads them through accessors.
///
/// ## Consumed flags
///
/// Gates, obstacles and the enemy engagement each fire once per attempt.
/// `ConsumedFlags` is owned here and rebuilt for the current level on every
/// transition that puts progress back to 0.

use tracing::{debug, info};

use crate::config::SpeedConfig;
use crate::domain::catalog::{Catalog, GateOp, GateSide, Level};
use crate::domain::rules::{self, Lane};
use crate::error::{RunError, RunResult};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Menu,
    Playing,
    LevelComplete,
    GameOver,
}

/// A damage notice for the HUD. Display-only: the front end decides how
/// long to show it and may drop it entirely.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DamageNotice {
    pub value: i64,
    pub id: u64,
}

/// Per-attempt consumption markers, indexed by entity index in the level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsumedFlags {
    gates: Vec<bool>,
    obstacles: Vec<bool>,
    enemy: bool,
}

impl ConsumedFlags {
    pub fn for_level(level: &Level) -> Self {
        ConsumedFlags {
            gates: vec![false; level.gates.len()],
            obstacles: vec![false; level.obstacles.len()],
            enemy: false,
        }
    }

    pub fn gate(&self, idx: usize) -> bool {
        self.gates.get(idx).copied().unwrap_or(false)
    }

    pub fn obstacle(&self, idx: usize) -> bool {
        self.obstacles.get(idx).copied().unwrap_or(false)
    }

    pub fn enemy_engaged(&self) -> bool {
        self.enemy
    }

    /// Mark a gate consumed. Returns false if it already was.
    pub fn consume_gate(&mut self, idx: usize) -> bool {
        consume(&mut self.gates, idx)
    }

    pub fn consume_obstacle(&mut self, idx: usize) -> bool {
        consume(&mut self.obstacles, idx)
    }

    pub fn engage_enemy(&mut self) -> bool {
        !std::mem::replace(&mut self.enemy, true)
    }

    #[cfg(test)]
    pub fn any(&self) -> bool {
        self.enemy || self.gates.iter().chain(&self.obstacles).any(|&f| f)
    }
}

fn consume(flags: &mut [bool], idx: usize) -> bool {
    match flags.get_mut(idx) {
        Some(flag) if !*flag => {
            *flag = true;
            true
        }
        _ => false,
    }
}

pub struct RunState {
    catalog: Catalog,

    // ── Tuning ──
    pub speed: SpeedConfig,

    // ── Core ──
    pub(super) phase: Phase,
    pub(super) current_level: usize,
    pub(super) soldiers: u32,
    pub(super) score: u64,
    pub(super) enemy_health: u32,
    pub(super) lane: Lane,
    pub(super) progress: f64,
    pub(super) consumed: ConsumedFlags,
    /// Simulated seconds banked toward the next enemy strike.
    pub(super) strike_clock: f64,

    // ── Display-only ──
    damage_notice: Option<DamageNotice>,
    damage_seq: u64,

    // ── UI ──
    pub paused: bool,
}

// ── Construction ──

impl RunState {
    /// A fresh run sitting on the menu.
    pub fn new(catalog: Catalog) -> Self {
        let first = &catalog.levels()[0];
        let enemy_health = first.enemy.health;
        let consumed = ConsumedFlags::for_level(first);
        RunState {
            catalog,
            speed: SpeedConfig::default(),
            phase: Phase::Menu,
            current_level: 0,
            soldiers: rules::STARTING_SOLDIERS,
            score: 0,
            enemy_health,
            lane: Lane::Center,
            progress: 0.0,
            consumed,
            strike_clock: 0.0,
            damage_notice: None,
            damage_seq: 0,
            paused: false,
        }
    }

    /// Throw the run away and sit on the menu again. Tuning and the damage
    /// notice counter carry over.
    pub fn return_to_menu(&mut self) {
        let catalog = self.catalog.clone();
        let speed = self.speed.clone();
        let seq = self.damage_seq;
        *self = RunState::new(catalog);
        self.speed = speed;
        self.damage_seq = seq;
        info!("returned to menu");
    }
}

// ── Read accessors ──

impl RunState {
    pub fn phase(&self) -> Phase { self.phase }
    pub fn current_level(&self) -> usize { self.current_level }
    pub fn soldiers(&self) -> u32 { self.soldiers }
    pub fn score(&self) -> u64 { self.score }
    pub fn enemy_health(&self) -> u32 { self.enemy_health }
    pub fn lane(&self) -> Lane { self.lane }
    pub fn progress(&self) -> f64 { self.progress }
    pub fn consumed(&self) -> &ConsumedFlags { &self.consumed }
    pub fn damage_notice(&self) -> Option<DamageNotice> { self.damage_notice }
    pub fn catalog(&self) -> &Catalog { &self.catalog }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn is_last_level(&self) -> bool {
        self.current_level + 1 >= self.catalog.level_count()
    }

    /// The level being played. `current_level` always indexes the catalog.
    pub fn level(&self) -> &Level {
        &self.catalog.levels()[self.current_level]
    }

    /// Fraction of the track covered, 0.0..=1.0.
    pub fn progress_ratio(&self) -> f64 {
        (self.progress / self.level().track_length).clamp(0.0, 1.0)
    }
}

// ── Phase transitions ──

impl RunState {
    fn ensure_phase(&self, op: &'static str, allowed: &[Phase]) -> RunResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(RunError::IllegalOperation { op, phase: self.phase })
        }
    }

    /// Reset everything an attempt owns and start playing the current level.
    fn begin_attempt(&mut self) {
        let level = self.level();
        let enemy_health = level.enemy.health;
        let consumed = ConsumedFlags::for_level(level);
        self.enemy_health = enemy_health;
        self.consumed = consumed;
        self.soldiers = rules::STARTING_SOLDIERS;
        self.progress = 0.0;
        self.lane = Lane::Center;
        self.strike_clock = 0.0;
        self.damage_notice = None;
        self.paused = false;
        self.phase = Phase::Playing;
    }

    pub fn start_game(&mut self) -> RunResult<()> {
        self.ensure_phase("start_game", &[Phase::Menu, Phase::GameOver, Phase::LevelComplete])?;
        self.current_level = 0;
        self.score = 0;
        self.begin_attempt();
        info!(level = 1, name = %self.level().name, "game started");
        Ok(())
    }

    /// Advance to the next level, or back to the menu after the last one.
    pub fn next_level(&mut self) -> RunResult<()> {
        self.ensure_phase("next_level", &[Phase::LevelComplete])?;
        if self.is_last_level() {
            info!(score = self.score, "all levels cleared");
            self.phase = Phase::Menu;
            return Ok(());
        }
        self.current_level += 1;
        self.begin_attempt();
        info!(level = self.current_level + 1, name = %self.level().name, "level started");
        Ok(())
    }

    pub fn restart_level(&mut self) -> RunResult<()> {
        self.ensure_phase("restart_level", &[Phase::GameOver])?;
        self.begin_attempt();
        info!(level = self.current_level + 1, "level restarted");
        Ok(())
    }
}

// ── Playing operations ──

impl RunState {
    /// Apply one gate side. Returns the new soldier count.
    pub fn apply_gate(&mut self, op: GateOp, value: f64) -> RunResult<u32> {
        self.ensure_phase("apply_gate", &[Phase::Playing])?;
        if !(value.is_finite() && value > 0.0) {
            return Err(RunError::InvalidAmount { op: "apply_gate", value });
        }
        let before = self.soldiers;
        self.soldiers = rules::gate_result(before, GateSide { op, value });
        debug!(?op, value, before, after = self.soldiers, "gate applied");
        Ok(self.soldiers)
    }

    /// Lose `damage` soldiers. Reaching zero ends the run.
    pub fn take_damage(&mut self, damage: u32) -> RunResult<u32> {
        self.ensure_phase("take_damage", &[Phase::Playing])?;
        self.soldiers = self.soldiers.saturating_sub(damage);
        self.damage_seq += 1;
        self.damage_notice = Some(DamageNotice { value: -(damage as i64), id: self.damage_seq });
        if self.soldiers == 0 {
            self.phase = Phase::GameOver;
            info!(level = self.current_level + 1, score = self.score, "army defeated");
        } else {
            debug!(damage, left = self.soldiers, "soldiers lost");
        }
        Ok(self.soldiers)
    }

    /// Hit the enemy. Reaching zero clears the level and pays out the
    /// bonus for the enemy's full base health.
    pub fn damage_enemy(&mut self, damage: u32) -> RunResult<u32> {
        self.ensure_phase("damage_enemy", &[Phase::Playing])?;
        self.enemy_health = self.enemy_health.saturating_sub(damage);
        if self.enemy_health == 0 {
            let bonus = rules::clear_bonus(self.level().enemy.health);
            self.score += bonus;
            self.phase = Phase::LevelComplete;
            info!(level = self.current_level + 1, bonus, score = self.score, "level cleared");
        }
        Ok(self.enemy_health)
    }

    /// Shift lanes by -1, 0 or +1, clamped to the track.
    pub fn set_lane(&mut self, delta: i8) -> RunResult<Lane> {
        self.ensure_phase("set_lane", &[Phase::Playing])?;
        if !(-1..=1).contains(&delta) {
            return Err(RunError::InvalidAmount { op: "set_lane", value: delta as f64 });
        }
        self.lane = self.lane.shifted(delta);
        Ok(self.lane)
    }

    /// March forward, never past the end of the track.
    pub fn advance_progress(&mut self, delta: f64) -> RunResult<f64> {
        self.ensure_phase("advance_progress", &[Phase::Playing])?;
        if !(delta.is_finite() && delta >= 0.0) {
            return Err(RunError::InvalidAmount { op: "advance_progress", value: delta });
        }
        self.progress = (self.progress + delta).min(self.level().track_length);
        Ok(self.progress)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn playing() -> RunState {
        let mut w = RunState::new(Catalog::builtin().unwrap());
        w.start_game().unwrap();
        w
    }

    fn cleared(w: &mut RunState) {
        let hp = w.enemy_health();
        w.damage_enemy(hp).unwrap();
        assert_eq!(w.phase(), Phase::LevelComplete);
    }

    // ── Transition table ──

    #[test]
    fn new_state_sits_on_menu() {
        let w = RunState::new(Catalog::builtin().unwrap());
        assert_eq!(w.phase(), Phase::Menu);
        assert_eq!(w.soldiers(), 10);
        assert_eq!(w.enemy_health(), 100);
    }

    #[test]
    fn start_game_initializes_run() {
        let w = playing();
        assert_eq!(w.phase(), Phase::Playing);
        assert_eq!(w.current_level(), 0);
        assert_eq!(w.soldiers(), 10);
        assert_eq!(w.score(), 0);
        assert_eq!(w.progress(), 0.0);
        assert_eq!(w.enemy_health(), 100);
        assert_eq!(w.lane(), Lane::Center);
        assert!(!w.consumed().any());
    }

    #[test]
    fn start_game_while_playing_is_rejected() {
        let mut w = playing();
        w.advance_progress(12.0).unwrap();
        let err = w.start_game().unwrap_err();
        assert_eq!(err, RunError::IllegalOperation { op: "start_game", phase: Phase::Playing });
        assert_eq!(w.progress(), 12.0);
    }

    #[test]
    fn next_level_keeps_score_and_resets_attempt() {
        let mut w = playing();
        w.apply_gate(GateOp::Multiply, 3.0).unwrap();
        w.advance_progress(50.0).unwrap();
        w.consumed.consume_gate(0);
        w.set_lane(1).unwrap();
        assert_eq!(w.lane(), Lane::Right);
        cleared(&mut w);
        assert_eq!(w.score(), 1000);

        w.next_level().unwrap();
        assert_eq!(w.phase(), Phase::Playing);
        assert_eq!(w.current_level(), 1);
        assert_eq!(w.soldiers(), 10);
        assert_eq!(w.progress(), 0.0);
        assert_eq!(w.enemy_health(), 200);
        assert_eq!(w.score(), 1000);
        assert_eq!(w.lane(), Lane::Center);
        assert!(!w.consumed().any());
    }

    #[test]
    fn next_level_after_last_goes_to_menu() {
        let mut w = playing();
        for _ in 0..2 {
            cleared(&mut w);
            w.next_level().unwrap();
        }
        assert_eq!(w.current_level(), 2);
        cleared(&mut w);
        w.next_level().unwrap();
        assert_eq!(w.phase(), Phase::Menu);
        assert_eq!(w.current_level(), 2);
    }

    #[test]
    fn next_level_only_after_clear() {
        let mut w = playing();
        assert!(matches!(w.next_level(), Err(RunError::IllegalOperation { .. })));
        assert_eq!(w.current_level(), 0);
    }

    #[test]
    fn restart_after_defeat_keeps_level_and_score() {
        let mut w = playing();
        cleared(&mut w);
        w.next_level().unwrap();
        w.set_lane(1).unwrap();
        w.advance_progress(30.0).unwrap();
        w.consumed.consume_obstacle(0);
        w.take_damage(50).unwrap();
        assert_eq!(w.phase(), Phase::GameOver);

        w.restart_level().unwrap();
        assert_eq!(w.phase(), Phase::Playing);
        assert_eq!(w.current_level(), 1);
        assert_eq!(w.score(), 1000);
        assert_eq!(w.soldiers(), 10);
        assert_eq!(w.enemy_health(), 200);
        assert_eq!(w.lane(), Lane::Center);
        assert_eq!(w.progress(), 0.0);
        assert!(!w.consumed().any());
    }

    #[test]
    fn restart_is_only_for_game_over() {
        let mut w = playing();
        assert!(w.restart_level().is_err());
        cleared(&mut w);
        assert!(w.restart_level().is_err());
    }

    #[test]
    fn start_game_from_game_over_resets_score() {
        let mut w = playing();
        cleared(&mut w);
        w.next_level().unwrap();
        w.take_damage(10).unwrap();
        w.start_game().unwrap();
        assert_eq!(w.current_level(), 0);
        assert_eq!(w.score(), 0);
    }

    #[test]
    fn return_to_menu_reinitializes() {
        let mut w = playing();
        w.speed.march_speed = 3.0;
        w.take_damage(2).unwrap();
        w.return_to_menu();
        assert_eq!(w.phase(), Phase::Menu);
        assert_eq!(w.soldiers(), 10);
        assert_eq!(w.speed.march_speed, 3.0);
        w.start_game().unwrap();
        w.take_damage(1).unwrap();
        assert_eq!(w.damage_notice().unwrap().id, 2);
    }

    // ── Operations ──

    #[test]
    fn operations_rejected_outside_playing() {
        let mut w = RunState::new(Catalog::builtin().unwrap());
        assert!(w.apply_gate(GateOp::Add, 5.0).is_err());
        assert!(w.take_damage(1).is_err());
        assert!(w.damage_enemy(1).is_err());
        assert!(w.set_lane(1).is_err());
        assert!(w.advance_progress(1.0).is_err());
        assert_eq!(w.soldiers(), 10);
        assert_eq!(w.enemy_health(), 100);
        assert_eq!(w.lane(), Lane::Center);
        assert_eq!(w.progress(), 0.0);
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        let mut w = playing();
        assert!(matches!(w.advance_progress(-1.0), Err(RunError::InvalidAmount { .. })));
        assert!(w.advance_progress(f64::NAN).is_err());
        assert!(w.apply_gate(GateOp::Multiply, 0.0).is_err());
        assert!(w.set_lane(2).is_err());
        assert_eq!(w.soldiers(), 10);
        assert_eq!(w.progress(), 0.0);
    }

    #[test]
    fn damage_to_zero_is_game_over_without_score() {
        let mut w = playing();
        w.take_damage(7).unwrap();
        assert_eq!(w.soldiers(), 3);
        w.take_damage(10).unwrap();
        assert_eq!(w.soldiers(), 0);
        assert_eq!(w.phase(), Phase::GameOver);
        assert_eq!(w.score(), 0);
    }

    #[test]
    fn damage_notice_ids_increase() {
        let mut w = playing();
        w.take_damage(2).unwrap();
        let first = w.damage_notice().unwrap();
        w.take_damage(3).unwrap();
        let second = w.damage_notice().unwrap();
        assert_eq!(first.value, -2);
        assert_eq!(second.value, -3);
        assert!(second.id > first.id);
    }

    #[test]
    fn enemy_bonus_uses_base_health_not_overkill() {
        let mut w = playing();
        w.damage_enemy(60).unwrap();
        w.damage_enemy(500).unwrap();
        assert_eq!(w.enemy_health(), 0);
        assert_eq!(w.phase(), Phase::LevelComplete);
        assert_eq!(w.score(), 1000);
        assert!(w.damage_enemy(5).is_err());
        assert_eq!(w.score(), 1000);
    }

    #[test]
    fn lane_moves_one_step_and_clamps() {
        let mut w = playing();
        assert_eq!(w.set_lane(-1).unwrap(), Lane::Left);
        assert_eq!(w.set_lane(-1).unwrap(), Lane::Left);
        assert_eq!(w.set_lane(1).unwrap(), Lane::Center);
        assert_eq!(w.set_lane(1).unwrap(), Lane::Right);
        assert_eq!(w.set_lane(1).unwrap(), Lane::Right);
    }

    #[test]
    fn progress_clamps_at_track_end() {
        let mut w = playing();
        w.advance_progress(70.0).unwrap();
        w.advance_progress(70.0).unwrap();
        assert_eq!(w.progress(), 100.0);
        assert_eq!(w.progress_ratio(), 1.0);
    }

    #[test]
    fn consumed_flags_fire_once() {
        let mut flags = ConsumedFlags::for_level(&Catalog::builtin().unwrap().levels()[0]);
        assert!(flags.consume_gate(1));
        assert!(!flags.consume_gate(1));
        assert!(!flags.consume_gate(9));
        assert!(flags.engage_enemy());
        assert!(!flags.engage_enemy());
        assert!(flags.gate(1) && !flags.gate(0));
    }

    // ── Properties ──

    proptest! {
        #[test]
        fn prop_damage_never_underflows(start in 1u32..10_000, damage in 0u32..20_000) {
            let mut w = playing();
            w.soldiers = start;
            w.take_damage(damage).unwrap();
            prop_assert_eq!(w.soldiers(), start.saturating_sub(damage));
            prop_assert_eq!(w.soldiers() == 0, w.phase() == Phase::GameOver);
        }

        #[test]
        fn prop_add_gate_floors_at_one(start in 1u32..10_000, value in 0.001f64..500.0) {
            let mut w = playing();
            w.soldiers = start;
            let after = w.apply_gate(GateOp::Add, value).unwrap();
            prop_assert_eq!(after, ((start as f64 + value).floor() as u32).max(1));
        }

        #[test]
        fn prop_multiply_gate_floors_at_one(start in 1u32..10_000, value in 0.001f64..8.0) {
            let mut w = playing();
            w.soldiers = start;
            let after = w.apply_gate(GateOp::Multiply, value).unwrap();
            prop_assert_eq!(after, ((start as f64 * value).floor() as u32).max(1));
            prop_assert!(after >= 1);
        }

        #[test]
        fn prop_enemy_clears_exactly_once(hits in proptest::collection::vec(1u32..60, 1..80)) {
            let mut w = playing();
            let mut clears = 0;
            for hit in hits {
                if w.damage_enemy(hit).is_ok() && w.phase() == Phase::LevelComplete {
                    clears += 1;
                }
            }
            prop_assert!(clears <= 1);
            if clears == 1 {
                prop_assert_eq!(w.score(), 1000);
                prop_assert_eq!(w.enemy_health(), 0);
            }
        }

        #[test]
        fn prop_progress_never_passes_track(steps in proptest::collection::vec(0.0f64..40.0, 0..30)) {
            let mut w = playing();
            let mut last = 0.0;
            for step in steps {
                let now = w.advance_progress(step).unwrap();
                prop_assert!(now >= last);
                prop_assert!(now <= 100.0);
                last = now;
            }
        }
    }
}
