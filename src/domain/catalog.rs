/// Level catalog: the static, compiled-in description of every level.
///
/// A `Catalog` is validated once at construction and never mutated after.
/// Gates and obstacles are kept sorted by position so that crossing
/// detection can walk them in track order.

use crate::error::CatalogError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GateOp {
    Add,
    Multiply,
}

impl GateOp {
    /// Short HUD label prefix: `+5`, `x2`.
    pub fn symbol(self) -> char {
        match self {
            GateOp::Add => '+',
            GateOp::Multiply => 'x',
        }
    }
}

/// One half of a gate.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GateSide {
    pub op: GateOp,
    pub value: f64,
}

impl GateSide {
    pub const fn add(value: f64) -> Self {
        GateSide { op: GateOp::Add, value }
    }

    pub const fn multiply(value: f64) -> Self {
        GateSide { op: GateOp::Multiply, value }
    }

    pub fn label(&self) -> String {
        format!("{}{}", self.op.symbol(), self.value)
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Gate {
    pub position: f64,
    pub left: GateSide,
    pub right: GateSide,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ObstacleKind {
    Barrier,
    Spike,
    Crusher,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Obstacle {
    pub position: f64,
    pub kind: ObstacleKind,
    pub damage: u32,
    pub width: f64,
}

#[derive(Clone, PartialEq, Debug)]
pub struct EnemyDef {
    pub health: u32,
    pub name: String,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Level {
    pub id: u32,
    pub name: String,
    pub track_length: f64,
    pub obstacles: Vec<Obstacle>,
    pub gates: Vec<Gate>,
    pub enemy: EnemyDef,
}

/// Ordered, validated list of levels.
#[derive(Clone, Debug)]
pub struct Catalog {
    levels: Vec<Level>,
}

impl Catalog {
    /// Validate and build a catalog. Gates and obstacles keep the order they
    /// were given in; consumed flags are indexed by that order.
    pub fn new(levels: Vec<Level>) -> Result<Self, CatalogError> {
        if levels.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (i, level) in levels.iter().enumerate() {
            validate_level(i, level)?;
        }
        Ok(Catalog { levels })
    }

    /// The three levels shipped with the game, validated like any other.
    pub fn builtin() -> Result<Self, CatalogError> {
        Catalog::new(builtin_levels())
    }

    pub fn level(&self, idx: usize) -> Option<&Level> {
        self.levels.get(idx)
    }

    /// Never zero: `new` rejects an empty list.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
}

fn validate_level(i: usize, level: &Level) -> Result<(), CatalogError> {
    if !(level.track_length.is_finite() && level.track_length > 0.0) {
        return Err(CatalogError::TrackLength { level: i, length: level.track_length });
    }
    if level.enemy.health == 0 {
        return Err(CatalogError::EnemyHealth { level: i, name: level.enemy.name.clone() });
    }
    let on_track = |p: f64| p.is_finite() && (0.0..=level.track_length).contains(&p);

    for (index, gate) in level.gates.iter().enumerate() {
        let positive = |s: &GateSide| s.value.is_finite() && s.value > 0.0;
        if !positive(&gate.left) || !positive(&gate.right) {
            return Err(CatalogError::GateValue { level: i, index });
        }
        if !on_track(gate.position) {
            return Err(CatalogError::OffTrack { level: i, what: "gate", index, position: gate.position });
        }
    }
    for (index, obstacle) in level.obstacles.iter().enumerate() {
        if !(obstacle.width.is_finite() && obstacle.width > 0.0) {
            return Err(CatalogError::ObstacleWidth { level: i, index });
        }
        if !on_track(obstacle.position) {
            return Err(CatalogError::OffTrack { level: i, what: "obstacle", index, position: obstacle.position });
        }
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Built-in levels
// ══════════════════════════════════════════════════════════════

fn gate(position: f64, left: GateSide, right: GateSide) -> Gate {
    Gate { position, left, right }
}

fn obstacle(position: f64, kind: ObstacleKind, damage: u32, width: f64) -> Obstacle {
    Obstacle { position, kind, damage, width }
}

fn builtin_levels() -> Vec<Level> {
    use ObstacleKind::*;
    vec![
        Level {
            id: 1,
            name: "Training Grounds".into(),
            track_length: 100.0,
            obstacles: vec![obstacle(40.0, Barrier, 5, 3.0)],
            gates: vec![
                gate(20.0, GateSide::add(5.0), GateSide::multiply(2.0)),
                gate(60.0, GateSide::add(10.0), GateSide::multiply(3.0)),
            ],
            enemy: EnemyDef { health: 100, name: "Training Dummy".into() },
        },
        Level {
            id: 2,
            name: "The Gauntlet".into(),
            track_length: 120.0,
            obstacles: vec![
                obstacle(35.0, Barrier, 8, 3.0),
                obstacle(70.0, Spike, 12, 2.0),
            ],
            gates: vec![
                gate(20.0, GateSide::add(8.0), GateSide::multiply(2.0)),
                gate(50.0, GateSide::add(15.0), GateSide::multiply(3.0)),
                gate(85.0, GateSide::add(20.0), GateSide::multiply(2.0)),
            ],
            enemy: EnemyDef { health: 200, name: "Heavy Guard".into() },
        },
        Level {
            id: 3,
            name: "Final Assault".into(),
            track_length: 150.0,
            obstacles: vec![
                obstacle(25.0, Barrier, 10, 3.0),
                obstacle(55.0, Spike, 15, 2.0),
                obstacle(85.0, Crusher, 20, 4.0),
            ],
            gates: vec![
                gate(15.0, GateSide::add(10.0), GateSide::multiply(3.0)),
                gate(40.0, GateSide::add(20.0), GateSide::multiply(2.0)),
                gate(70.0, GateSide::add(30.0), GateSide::multiply(4.0)),
                gate(95.0, GateSide::add(50.0), GateSide::multiply(2.0)),
            ],
            enemy: EnemyDef { health: 500, name: "War Commander".into() },
        },
    ]
}
