/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The run view is a three-lane track seen from behind the army: the
/// formation sits at the bottom, everything ahead scrolls down toward it.
///
/// ```text
///   SCORE: 120            [ 15 ]
///   ████████████░░░░░░░░░░░░░░░░░░
///        Level 1 - Training Grounds
///  │          :          :          │
///  │[   +5    ]:[   x2   ]:         │   gate: left half / right half
///  │        ▓▓▓▓▓▓▓▓▓▓▓▓▓           │   obstacle
///  │          :   ♟ ♟ ♟  :          │   formation (front row)
/// ```

use std::io::{self, BufWriter, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::catalog::{GateOp, GateSide, ObstacleKind};
use crate::domain::formation;
use crate::domain::rules;
use crate::sim::event::GameEvent;
use crate::sim::world::{DamageNotice, Phase, RunState};

// ── Palette ──

const BASE_BG: Color = Color::Rgb { r: 18, g: 24, b: 38 };
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const TRACK_BG: Color = Color::Rgb { r: 60, g: 60, b: 70 };
const ADD_BG: Color = Color::Rgb { r: 40, g: 90, b: 200 };
const MULTIPLY_BG: Color = Color::Rgb { r: 30, g: 150, b: 70 };
const GOLD: Color = Color::Rgb { r: 255, g: 200, b: 40 };
const HEALTH_GREEN: Color = Color::Rgb { r: 60, g: 200, b: 80 };
const HEALTH_AMBER: Color = Color::Rgb { r: 240, g: 170, b: 30 };
const HEALTH_RED: Color = Color::Rgb { r: 230, g: 50, b: 50 };
const SOLDIER: Color = Color::Rgb { r: 110, g: 170, b: 255 };
const SOLDIER_BG: Color = Color::Rgb { r: 37, g: 99, b: 235 };
const DIM: Color = Color::Rgb { r: 130, g: 130, b: 140 };

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: BASE_BG };

    /// Never equal to a composed cell; forces a full repaint when it fills `back`.
    const INVALID: Cell = Cell { ch: '\0', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn put_center(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let x = self.width.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill_row(&mut self, y: usize, x0: usize, x1: usize, ch: char, fg: Color, bg: Color) {
        for x in x0..x1.min(self.width) {
            self.set(x, y, Cell::new(ch, fg, bg));
        }
    }
}

// ── Popups ──

/// A number that flashes on screen for a fixed time.
#[derive(Debug)]
struct Popup {
    ttl: Duration,
    value: i64,
    shown_at: Option<Instant>,
    last_id: Option<u64>,
}

impl Popup {
    fn new(ttl: Duration) -> Self {
        Popup { ttl, value: 0, shown_at: None, last_id: None }
    }

    fn show(&mut self, value: i64, now: Instant) {
        self.value = value;
        self.shown_at = Some(now);
    }

    /// Show a damage notice the first time its id is seen.
    fn track(&mut self, notice: Option<DamageNotice>, now: Instant) {
        if let Some(n) = notice {
            if self.last_id != Some(n.id) {
                self.last_id = Some(n.id);
                self.show(n.value, now);
            }
        }
    }

    fn current(&self, now: Instant) -> Option<i64> {
        let t = self.shown_at?;
        (now.duration_since(t) < self.ttl).then_some(self.value)
    }

    fn hide(&mut self) {
        self.shown_at = None;
    }
}

// ── Track geometry ──

const LANE_W: usize = 10;
const TRACK_W: usize = LANE_W * 3;
const HUD_ROWS: usize = 3;
const TRACK_TOP: usize = HUD_ROWS + 1;
const FORMATION_ROWS: u32 = 4;
/// Track units covered by one terminal row.
const UNITS_PER_ROW: f64 = 2.0;
const STRIKE_POPUP: Duration = Duration::from_millis(250);

/// Terminal row for something `position` units along the track, given the
/// row just in front of the army. None when it is behind the army or
/// beyond the top of the view.
fn track_row(position: f64, progress: f64, front_row: usize) -> Option<usize> {
    let ahead = position - progress;
    if ahead < 0.0 {
        return None;
    }
    let k = (ahead / UNITS_PER_ROW) as usize;
    let row = front_row.checked_sub(1 + k)?;
    (row >= TRACK_TOP).then_some(row)
}

fn health_color(health: u32, max: u32) -> Color {
    let ratio = health as f64 / max.max(1) as f64;
    if ratio > 0.5 {
        HEALTH_GREEN
    } else if ratio > 0.25 {
        HEALTH_AMBER
    } else {
        HEALTH_RED
    }
}

/// `filled` of `width` cells for `ratio` (0.0..=1.0).
fn bar_cells(ratio: f64, width: usize) -> usize {
    ((ratio.clamp(0.0, 1.0) * width as f64).round() as usize).min(width)
}

fn gate_bg(side: &GateSide) -> Color {
    match side.op {
        GateOp::Multiply => MULTIPLY_BG,
        GateOp::Add => ADD_BG,
    }
}

fn obstacle_look(kind: ObstacleKind) -> (char, Color) {
    match kind {
        ObstacleKind::Barrier => ('▓', Color::Rgb { r: 180, g: 120, b: 60 }),
        ObstacleKind::Spike => ('▲', Color::Rgb { r: 200, g: 200, b: 210 }),
        ObstacleKind::Crusher => ('█', Color::Rgb { r: 200, g: 60, b: 60 }),
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    damage: Popup,
    strike: Popup,
    blink_tick: u32,
    keyboard_enhanced: bool,
    /// Shown on the menu; the loop copies it from the gamepad tracker.
    pub pad_connected: bool,
}

impl Renderer {
    pub fn new(popup_ms: u64) -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            damage: Popup::new(Duration::from_millis(popup_ms)),
            strike: Popup::new(STRIKE_POPUP),
            blink_tick: 0,
            keyboard_enhanced: false,
            pad_connected: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(BASE_BG),
            Clear(ClearType::All)
        )?;

        // Release events only arrive with the enhancement pushed
        if matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.keyboard_enhanced = true;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    /// True once `init` has turned on key release reporting.
    pub fn keyboard_enhanced(&self) -> bool {
        self.keyboard_enhanced
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
            self.keyboard_enhanced = false;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Pick up what the last tick did, for the short-lived popups.
    pub fn observe(&mut self, events: &[GameEvent]) {
        let now = Instant::now();
        for event in events {
            if let GameEvent::EnemyStruck { damage, .. } = event {
                self.strike.show(-(*damage as i64), now);
            }
        }
    }

    pub fn render(&mut self, world: &RunState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(world.phase()) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase());
            self.damage.hide();
            self.strike.hide();
        }

        self.blink_tick = self.blink_tick.wrapping_add(1);
        self.damage.track(world.damage_notice(), Instant::now());

        self.front.clear();
        match world.phase() {
            Phase::Menu => self.compose_menu(world),
            Phase::Playing => self.compose_run(world),
            Phase::LevelComplete => self.compose_victory(world),
            Phase::GameOver => self.compose_game_over(world),
        }
        if world.paused && world.is_playing() {
            self.compose_pause_overlay();
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // explicit base colors; ResetColor would fall back to the terminal default
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ══════════════════════════════════════════════════════════════
    // Run view
    // ══════════════════════════════════════════════════════════════

    fn compose_run(&mut self, w: &RunState) {
        self.compose_hud(w);

        let height = self.front.height;
        if height < TRACK_TOP + FORMATION_ROWS as usize + 3 {
            self.front.put_center(TRACK_TOP, "terminal too small", HEALTH_RED, BASE_BG);
            return;
        }
        let bottom = height - 2;
        let front_row = bottom + 1 - FORMATION_ROWS as usize;
        let track_x = self.front.width.saturating_sub(TRACK_W) / 2;

        self.compose_track(w, track_x, bottom);
        self.compose_obstacles(w, track_x, front_row);
        self.compose_gates(w, track_x, front_row);
        self.compose_enemy(w, track_x, front_row);
        self.compose_formation(w, track_x, front_row);

        let now = Instant::now();
        if let Some(v) = self.damage.current(now) {
            let label = format!(" {} ", v);
            let x = lane_center(track_x, w).saturating_sub(label.len() / 2);
            self.front.put_str(x, front_row.saturating_sub(2), &label, Color::White, HEALTH_RED);
        }

        self.front.put_center(
            height - 1,
            "←/→ or A/D change lane   F1 pause   Esc menu",
            DIM,
            BASE_BG,
        );
    }

    fn compose_hud(&mut self, w: &RunState) {
        let width = self.front.width;
        for y in 0..HUD_ROWS {
            self.front.fill_row(y, 0, width, ' ', Color::White, HUD_BG);
        }

        self.front.put_str(1, 0, &format!("SCORE: {}", w.score()), GOLD, HUD_BG);
        self.front.put_center(0, &format!("[ {} ]", w.soldiers()), Color::White, SOLDIER_BG);

        let bar_w = TRACK_W.min(width.saturating_sub(2));
        let bar_x = width.saturating_sub(bar_w) / 2;
        let filled = bar_cells(w.progress_ratio(), bar_w);
        self.front.fill_row(1, bar_x, bar_x + filled, '█', GOLD, HUD_BG);
        self.front.fill_row(1, bar_x + filled, bar_x + bar_w, '░', DIM, HUD_BG);

        let level = w.level();
        self.front.put_center(2, &format!("Level {} - {}", w.current_level() + 1, level.name), DIM, HUD_BG);
    }

    fn compose_track(&mut self, w: &RunState, track_x: usize, bottom: usize) {
        // dividers scroll with progress so the march is visible
        let scroll = (w.progress() / UNITS_PER_ROW) as usize;
        for y in TRACK_TOP..=bottom {
            self.front.fill_row(y, track_x, track_x + TRACK_W, ' ', Color::White, TRACK_BG);
            if track_x > 0 {
                self.front.set(track_x - 1, y, Cell::new('│', Color::White, BASE_BG));
            }
            self.front.set(track_x + TRACK_W, y, Cell::new('│', Color::White, BASE_BG));
            if (y + scroll) % 2 == 0 {
                for lane in 1..3 {
                    self.front.set(track_x + lane * LANE_W, y, Cell::new(':', DIM, TRACK_BG));
                }
            }
        }
    }

    fn compose_gates(&mut self, w: &RunState, track_x: usize, front_row: usize) {
        let half = TRACK_W / 2;
        for (i, gate) in w.level().gates.iter().enumerate() {
            if w.consumed().gate(i) { continue; }
            let row = match track_row(gate.position, w.progress(), front_row) {
                Some(r) => r,
                None => continue,
            };
            for (side, x0) in [(&gate.left, track_x), (&gate.right, track_x + half)] {
                let bg = gate_bg(side);
                self.front.fill_row(row, x0, x0 + half, ' ', Color::White, bg);
                let label = side.label();
                let lx = x0 + half.saturating_sub(label.chars().count()) / 2;
                self.front.put_str(lx, row, &label, Color::White, bg);
            }
        }
    }

    fn compose_obstacles(&mut self, w: &RunState, track_x: usize, front_row: usize) {
        for (i, obstacle) in w.level().obstacles.iter().enumerate() {
            if w.consumed().obstacle(i) { continue; }
            let row = match track_row(obstacle.position, w.progress(), front_row) {
                Some(r) => r,
                None => continue,
            };
            let (ch, fg) = obstacle_look(obstacle.kind);
            let cols = ((obstacle.width * 4.0) as usize).clamp(3, TRACK_W);
            let x0 = track_x + (TRACK_W - cols) / 2;
            self.front.fill_row(row, x0, x0 + cols, ch, fg, TRACK_BG);
        }
    }

    fn compose_enemy(&mut self, w: &RunState, track_x: usize, front_row: usize) {
        let level = w.level();
        let position = rules::enemy_position(level.track_length);
        let row = if position < w.progress() || w.consumed().enemy_engaged() {
            track_row(position, w.progress(), front_row).unwrap_or(front_row - 1)
        } else {
            match track_row(position, w.progress(), front_row) {
                Some(r) => r,
                None => return,
            }
        };

        let name = format!("☠ {} ☠", level.enemy.name);
        let x = track_x + TRACK_W.saturating_sub(name.chars().count()) / 2;
        self.front.put_str(x, row, &name, HEALTH_RED, TRACK_BG);

        if row > TRACK_TOP {
            let bar_w = 20;
            let health = w.enemy_health();
            let max = level.enemy.health;
            let filled = bar_cells(health as f64 / max as f64, bar_w);
            let bx = track_x + (TRACK_W - bar_w) / 2;
            let color = health_color(health, max);
            self.front.fill_row(row - 1, bx, bx + filled, '█', color, TRACK_BG);
            self.front.fill_row(row - 1, bx + filled, bx + bar_w, '░', DIM, TRACK_BG);

            if let Some(v) = self.strike.current(Instant::now()) {
                let label = format!("{}", v);
                self.front.put_str(bx + bar_w + 1, row - 1, &label, GOLD, TRACK_BG);
            }
        }
    }

    fn compose_formation(&mut self, w: &RunState, track_x: usize, front_row: usize) {
        let f = formation::layout(w.soldiers(), FORMATION_ROWS);
        let center = lane_center(track_x, w);
        for r in 0..f.rows {
            let n = f.row_len(r) as usize;
            let width = n * 2 - 1;
            let x0 = center.saturating_sub(width / 2);
            for i in 0..n {
                self.front.set(x0 + i * 2, front_row + r as usize, Cell::new('♟', SOLDIER, TRACK_BG));
            }
        }
        if f.hidden > 0 {
            let label = format!("+{}", f.hidden);
            let x = center + f.columns as usize + 1;
            self.front.put_str(x, front_row, &label, Color::White, TRACK_BG);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Screens
    // ══════════════════════════════════════════════════════════════

    fn compose_menu(&mut self, w: &RunState) {
        let top = self.front.height.saturating_sub(14 + w.catalog().level_count()) / 2;
        self.front.put_center(top, "M A R C H", Color::White, BASE_BG);
        self.front.put_center(top + 1, "A R M Y", GOLD, BASE_BG);

        let blink = (self.blink_tick / 60) % 2 == 0;
        if blink {
            self.front.put_center(top + 4, "▶  ENTER: PLAY  ◀", Color::Black, HEALTH_GREEN);
        }
        self.front.put_center(top + 6, "Choose gates wisely to multiply your army!", DIM, BASE_BG);
        self.front.put_center(top + 7, "Avoid obstacles and defeat the boss!", DIM, BASE_BG);

        self.front.put_center(top + 9, "LEVELS", DIM, BASE_BG);
        let catalog = w.catalog();
        for i in 0..catalog.level_count() {
            if let Some(level) = catalog.level(i) {
                let line = format!("[{}] {:<18}", i + 1, level.name);
                self.front.put_center(top + 10 + i, &line, SOLDIER, BASE_BG);
            }
        }

        self.front.put_center(top + 11 + catalog.level_count(), "←/→ or A/D: lane   F1: pause   Q/Esc: quit", DIM, BASE_BG);
        if self.pad_connected {
            self.front.put_center(top + 12 + catalog.level_count(), "Gamepad connected", HEALTH_GREEN, BASE_BG);
        }
    }

    fn compose_victory(&mut self, w: &RunState) {
        let top = self.front.height.saturating_sub(12) / 2;
        self.front.put_center(top, "★  VICTORY!  ★", GOLD, BASE_BG);
        self.front.put_center(top + 1, &format!("Level {} Complete", w.current_level() + 1), Color::White, BASE_BG);
        self.front.put_center(top + 3, "FINAL SCORE", DIM, BASE_BG);
        self.front.put_center(top + 4, &w.score().to_string(), GOLD, BASE_BG);
        self.front.put_center(top + 5, &format!("Soldiers remaining: {}", w.soldiers()), SOLDIER, BASE_BG);

        let next = if w.is_last_level() { "PLAY AGAIN" } else { "NEXT LEVEL" };
        self.front.put_center(top + 8, &format!("▶ ENTER: {}", next), Color::Black, HEALTH_GREEN);
        self.front.put_center(top + 10, "ESC: Menu", DIM, BASE_BG);
    }

    fn compose_game_over(&mut self, w: &RunState) {
        let top = self.front.height.saturating_sub(12) / 2;
        self.front.put_center(top, "✕  GAME OVER  ✕", HEALTH_RED, BASE_BG);
        self.front.put_center(top + 2, "SCORE", DIM, BASE_BG);
        self.front.put_center(top + 3, &w.score().to_string(), GOLD, BASE_BG);
        self.front.put_center(top + 4, &format!("Level {} - {}", w.current_level() + 1, w.level().name), DIM, BASE_BG);

        self.front.put_center(top + 7, "▶ ENTER / R: TRY AGAIN", Color::White, ADD_BG);
        self.front.put_center(top + 8, "N: MAIN MENU (new game)", Color::White, BASE_BG);
        self.front.put_center(top + 10, "ESC: Menu", DIM, BASE_BG);
    }

    fn compose_pause_overlay(&mut self) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let box_w = 28.min(self.front.width);
        let box_h = 7.min(self.front.height);
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = self.front.height.saturating_sub(box_h) / 2;
        for y in box_y..box_y + box_h {
            self.front.fill_row(y, box_x, box_x + box_w, ' ', Color::White, dim);
        }
        let blink = (self.blink_tick / 60) % 2 == 0;
        let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_center(box_y + 1, label, GOLD, dim);
        self.front.put_center(box_y + 3, "F1   Resume", SOLDIER, dim);
        self.front.put_center(box_y + 4, "ESC  Menu  ", SOLDIER, dim);
    }
}

/// Column at the middle of the army's lane.
fn lane_center(track_x: usize, w: &RunState) -> usize {
    let lane = (w.lane().offset() + 1) as usize;
    track_x + lane * LANE_W + LANE_W / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_count_down_toward_the_army() {
        // front row 20: 0 ahead is just above the army
        assert_eq!(track_row(10.0, 10.0, 20), Some(19));
        assert_eq!(track_row(13.0, 10.0, 20), Some(18));
        assert_eq!(track_row(9.0, 10.0, 20), None);
        // far past the top of the view
        assert_eq!(track_row(60.0, 10.0, 20), None);
    }

    #[test]
    fn health_bar_colors() {
        assert_eq!(health_color(100, 100), HEALTH_GREEN);
        assert_eq!(health_color(51, 100), HEALTH_GREEN);
        assert_eq!(health_color(50, 100), HEALTH_AMBER);
        assert_eq!(health_color(26, 100), HEALTH_AMBER);
        assert_eq!(health_color(25, 100), HEALTH_RED);
        assert_eq!(health_color(0, 100), HEALTH_RED);
    }

    #[test]
    fn gate_sides_colored_by_op() {
        assert_eq!(gate_bg(&GateSide::multiply(2.0)), MULTIPLY_BG);
        assert_eq!(gate_bg(&GateSide::add(5.0)), ADD_BG);
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(bar_cells(0.0, 30), 0);
        assert_eq!(bar_cells(0.5, 30), 15);
        assert_eq!(bar_cells(1.7, 30), 30);
    }

    #[test]
    fn damage_popup_shows_each_id_once() {
        let mut p = Popup::new(Duration::from_millis(800));
        let t0 = Instant::now();
        p.track(Some(DamageNotice { value: -5, id: 1 }), t0);
        assert_eq!(p.current(t0 + Duration::from_millis(100)), Some(-5));
        assert_eq!(p.current(t0 + Duration::from_millis(800)), None);

        // same id seen again later does not re-show
        p.track(Some(DamageNotice { value: -5, id: 1 }), t0 + Duration::from_secs(2));
        assert_eq!(p.current(t0 + Duration::from_secs(2)), None);

        p.track(Some(DamageNotice { value: -8, id: 2 }), t0 + Duration::from_secs(3));
        assert_eq!(p.current(t0 + Duration::from_secs(3)), Some(-8));
    }

    fn row_text(fb: &FrameBuffer, y: usize) -> String {
        (0..fb.width).map(|x| fb.get(x, y).ch).collect()
    }

    fn menu_mentions_pad(connected: bool) -> bool {
        let catalog = crate::domain::catalog::Catalog::builtin().unwrap();
        let world = RunState::new(catalog);
        let mut r = Renderer::new(800);
        r.front.resize(80, 30);
        r.pad_connected = connected;
        r.compose_menu(&world);
        (0..r.front.height).any(|y| row_text(&r.front, y).contains("Gamepad connected"))
    }

    #[test]
    fn menu_shows_pad_only_when_connected() {
        assert!(menu_mentions_pad(true));
        assert!(!menu_mentions_pad(false));
    }

    #[test]
    fn put_str_clips_at_edge() {
        let mut fb = FrameBuffer::new(4, 1);
        fb.put_str(2, 0, "abc", Color::White, BASE_BG);
        assert_eq!(fb.get(2, 0).ch, 'a');
        assert_eq!(fb.get(3, 0).ch, 'b');
        fb.put_center(0, "xy", Color::White, BASE_BG);
        assert_eq!(fb.get(1, 0).ch, 'x');
    }
}
