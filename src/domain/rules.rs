/// Numeric rules of a run, truth-table driven.
///
/// Pure functions with no side effects. These encode "what the numbers
/// become" without touching any state; `sim::world` applies them.
///
/// ## Gate arithmetic
/// ┌──────────────┬─────────────────────────────┐
/// │ Side op       │ New soldier count            │
/// ├──────────────┼─────────────────────────────┤
/// │ Add v         │ max(1, floor(soldiers + v)) │
/// │ Multiply v    │ max(1, floor(soldiers * v)) │
/// └──────────────┴─────────────────────────────┘
/// A gate never wipes out the army, even a multiply by a fraction.
///
/// ## Side selection
/// ┌──────────────┬──────────┐
/// │ Lane          │ Side     │
/// ├──────────────┼──────────┤
/// │ -1 (left)     │ left     │
/// │  0 (center)   │ left     │
/// │ +1 (right)    │ right    │
/// └──────────────┴──────────┘
///
/// ## Trigger windows (track units)
/// ┌──────────────┬────────────────────────────────────────────┐
/// │ Entity        │ Window                                      │
/// ├──────────────┼────────────────────────────────────────────┤
/// │ Gate          │ [p, p + 2)                                  │
/// │ Obstacle      │ [p - 1, p + 1)                              │
/// │ Enemy band    │ (L - 8, L - 2), i.e. |progress - (L-5)| < 3 │
/// └──────────────┴────────────────────────────────────────────┘
/// A window counts as reached once progress passes its start, even if a
/// single large step jumped over the whole window.
///
/// ## Combat
///   strike damage   = ceil(soldiers * 0.5), live count at each strike
///   clear bonus     = base enemy health * 10

use super::catalog::{Gate, GateOp, GateSide, Obstacle};

pub const STARTING_SOLDIERS: u32 = 10;
pub const SCORE_PER_ENEMY_HP: u64 = 10;
pub const STRIKE_RATIO: f64 = 0.5;

const GATE_DEPTH: f64 = 2.0;
const OBSTACLE_REACH: f64 = 1.0;
/// The enemy stands this far before the end of the track.
pub const ENEMY_STANDOFF: f64 = 5.0;
const ENGAGE_RADIUS: f64 = 3.0;

// ── Lanes ──

/// One of the three discrete lanes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Lane {
    Left,
    #[default]
    Center,
    Right,
}

/// A normalized lane-change intent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LaneShift {
    Left,
    Right,
}

impl LaneShift {
    pub fn delta(self) -> i8 {
        match self {
            LaneShift::Left => -1,
            LaneShift::Right => 1,
        }
    }
}

impl Lane {
    pub fn offset(self) -> i8 {
        match self {
            Lane::Left => -1,
            Lane::Center => 0,
            Lane::Right => 1,
        }
    }

    fn from_offset(offset: i8) -> Lane {
        match offset.clamp(-1, 1) {
            -1 => Lane::Left,
            0 => Lane::Center,
            _ => Lane::Right,
        }
    }

    /// Move by `delta` lanes, clamped to the track edges.
    pub fn shifted(self, delta: i8) -> Lane {
        Lane::from_offset(self.offset().saturating_add(delta))
    }
}

// ── Gates ──

/// Which side of a gate the army passes through.
pub fn pick_side(gate: &Gate, lane: Lane) -> GateSide {
    if lane.offset() <= 0 { gate.left } else { gate.right }
}

/// Soldier count after passing through one gate side. See table above.
pub fn gate_result(soldiers: u32, side: GateSide) -> u32 {
    let raw = match side.op {
        GateOp::Add => soldiers as f64 + side.value,
        GateOp::Multiply => soldiers as f64 * side.value,
    };
    // `as` saturates, so huge products pin to u32::MAX instead of wrapping.
    (raw.floor() as u32).max(1)
}

// ── Combat ──

pub fn strike_damage(soldiers: u32) -> u32 {
    (soldiers as f64 * STRIKE_RATIO).ceil() as u32
}

pub fn clear_bonus(base_health: u32) -> u64 {
    base_health as u64 * SCORE_PER_ENEMY_HP
}

// ── Trigger windows ──

/// A stretch of track that triggers an effect.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Window {
    pub start: f64,
    pub end: f64,
    /// true: `(start, end)`; false: `[start, end)`.
    pub open_start: bool,
}

impl Window {
    #[cfg(test)]
    pub fn contains(&self, progress: f64) -> bool {
        self.reached(progress) && progress < self.end
    }

    /// Has progress arrived at (or gone beyond) this window?
    pub fn reached(&self, progress: f64) -> bool {
        if self.open_start {
            progress > self.start
        } else {
            progress >= self.start
        }
    }
}

pub fn gate_window(gate: &Gate) -> Window {
    Window { start: gate.position, end: gate.position + GATE_DEPTH, open_start: false }
}

pub fn obstacle_window(obstacle: &Obstacle) -> Window {
    Window {
        start: obstacle.position - OBSTACLE_REACH,
        end: obstacle.position + OBSTACLE_REACH,
        open_start: false,
    }
}

/// Where the enemy stands on a track of the given length.
pub fn enemy_position(track_length: f64) -> f64 {
    track_length - ENEMY_STANDOFF
}

pub fn engagement_band(track_length: f64) -> Window {
    let center = enemy_position(track_length);
    Window { start: center - ENGAGE_RADIUS, end: center + ENGAGE_RADIUS, open_start: true }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
