/// The step function: advances a run by one tick.
///
/// Processing order:
///   1. March (advance progress by dt * march_speed)
///   2. Lane intent
///   3. Gate crossings      ┐ merged, applied in track-position order
///   4. Obstacle crossings  ┘ (ties: gate first)
///   5. Enemy engagement / strikes
///   6. Win / lose events
///
/// Crossing detection is "not yet consumed AND window reached", so an entity
/// whose whole window was jumped over in one long tick still fires, once.
/// Every stage after the first bails out as soon as the phase has left
/// Playing; nothing more happens to a defeated army or a dead enemy.
/// A paused run is left untouched.

use tracing::{debug, warn};

use crate::domain::rules::{self, LaneShift};
use crate::error::RunResult;
use super::event::GameEvent;
use super::world::{Phase, RunState};

/// Floor for the strike cadence so a bad config cannot spin the strike loop.
const MIN_STRIKE_INTERVAL: f64 = 0.01;

/// Per-tick input from the presentation layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    /// Simulated seconds since the previous tick.
    pub dt: f64,
    /// At most one normalized lane change per tick.
    pub lane: Option<LaneShift>,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut RunState, input: FrameInput) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.paused { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();

    if let Err(err) = run_tick(world, input, &mut events) {
        warn!(%err, "tick aborted");
    }
    resolve_outcome(world, &mut events);

    events
}

fn run_tick(world: &mut RunState, input: FrameInput, events: &mut Vec<GameEvent>) -> RunResult<()> {
    resolve_march(world, input.dt)?;
    resolve_lane(world, input.lane, events)?;
    resolve_crossings(world, events)?;
    resolve_engagement(world, input.dt, events)?;
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// March + lane
// ══════════════════════════════════════════════════════════════

fn resolve_march(world: &mut RunState, dt: f64) -> RunResult<()> {
    let distance = dt * world.speed.march_speed;
    world.advance_progress(distance)?;
    Ok(())
}

fn resolve_lane(world: &mut RunState, shift: Option<LaneShift>, events: &mut Vec<GameEvent>) -> RunResult<()> {
    let shift = match shift { Some(s) => s, None => return Ok(()) };
    let before = world.lane;
    let lane = world.set_lane(shift.delta())?;
    if lane != before {
        events.push(GameEvent::LaneChanged { lane });
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Gates + obstacles
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
enum Crossing {
    Gate(usize),
    Obstacle(usize),
}

/// Everything whose window progress has reached but that has not fired yet,
/// sorted by window start. Gates are collected first and the sort is stable,
/// so a gate wins a tie with an obstacle.
fn pending_crossings(world: &RunState) -> Vec<(f64, Crossing)> {
    let level = world.level();
    let progress = world.progress;
    let mut due = Vec::new();

    for (i, gate) in level.gates.iter().enumerate() {
        let window = rules::gate_window(gate);
        if !world.consumed.gate(i) && window.reached(progress) {
            due.push((window.start, Crossing::Gate(i)));
        }
    }
    for (i, obstacle) in level.obstacles.iter().enumerate() {
        let window = rules::obstacle_window(obstacle);
        if !world.consumed.obstacle(i) && window.reached(progress) {
            due.push((window.start, Crossing::Obstacle(i)));
        }
    }

    due.sort_by(|a, b| a.0.total_cmp(&b.0));
    due
}

fn resolve_crossings(world: &mut RunState, events: &mut Vec<GameEvent>) -> RunResult<()> {
    if !world.is_playing() { return Ok(()); }

    for (_, crossing) in pending_crossings(world) {
        if !world.is_playing() { break; }
        match crossing {
            Crossing::Gate(i) => cross_gate(world, i, events)?,
            Crossing::Obstacle(i) => cross_obstacle(world, i, events)?,
        }
    }
    Ok(())
}

fn cross_gate(world: &mut RunState, idx: usize, events: &mut Vec<GameEvent>) -> RunResult<()> {
    if !world.consumed.consume_gate(idx) { return Ok(()); }
    let side = rules::pick_side(&world.level().gates[idx], world.lane);
    let soldiers = world.apply_gate(side.op, side.value)?;
    events.push(GameEvent::GateApplied { index: idx, side, soldiers });
    Ok(())
}

fn cross_obstacle(world: &mut RunState, idx: usize, events: &mut Vec<GameEvent>) -> RunResult<()> {
    if !world.consumed.consume_obstacle(idx) { return Ok(()); }
    let obstacle = world.level().obstacles[idx];
    let soldiers = world.take_damage(obstacle.damage)?;
    events.push(GameEvent::ObstacleHit {
        index: idx,
        kind: obstacle.kind,
        damage: obstacle.damage,
        soldiers,
    });
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Enemy engagement
// ══════════════════════════════════════════════════════════════

/// Once the army reaches the band in front of the enemy it stays engaged for
/// the rest of the attempt. The first strike lands on the tick engagement
/// begins; after that one strike per `strike_interval` of simulated time,
/// as many as the elapsed time pays for.
fn resolve_engagement(world: &mut RunState, dt: f64, events: &mut Vec<GameEvent>) -> RunResult<()> {
    if !world.is_playing() { return Ok(()); }

    if world.consumed.enemy_engaged() {
        world.strike_clock += dt;
    } else {
        let band = rules::engagement_band(world.level().track_length);
        if !band.reached(world.progress) { return Ok(()); }
        world.consumed.engage_enemy();
        world.strike_clock = 0.0;
        debug!(progress = world.progress, "enemy engaged");
        events.push(GameEvent::EnemyEngaged);
        strike(world, events)?;
    }

    let interval = world.speed.strike_interval.max(MIN_STRIKE_INTERVAL);
    while world.is_playing() && world.strike_clock >= interval {
        world.strike_clock -= interval;
        strike(world, events)?;
    }
    Ok(())
}

fn strike(world: &mut RunState, events: &mut Vec<GameEvent>) -> RunResult<()> {
    let damage = rules::strike_damage(world.soldiers);
    let health = world.damage_enemy(damage)?;
    events.push(GameEvent::EnemyStruck { damage, health });
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Outcome
// ══════════════════════════════════════════════════════════════

/// The step only runs while Playing, so any terminal phase here is new.
fn resolve_outcome(world: &RunState, events: &mut Vec<GameEvent>) {
    match world.phase {
        Phase::GameOver => events.push(GameEvent::ArmyDefeated { level: world.current_level }),
        Phase::LevelComplete => events.push(GameEvent::LevelCleared {
            level: world.current_level,
            score: world.score,
        }),
        _ => {}
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
