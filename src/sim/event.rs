/// Events emitted during a simulation step.
/// The presentation layer consumes these for popups and sound.

use crate::domain::catalog::{GateSide, ObstacleKind};
use crate::domain::rules::Lane;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    LaneChanged { lane: Lane },
    GateApplied { index: usize, side: GateSide, soldiers: u32 },
    ObstacleHit { index: usize, kind: ObstacleKind, damage: u32, soldiers: u32 },
    EnemyEngaged,
    EnemyStruck { damage: u32, health: u32 },
    LevelCleared { level: usize, score: u64 },
    ArmyDefeated { level: usize },
}
