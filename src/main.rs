/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::catalog::Catalog;
use domain::rules::LaneShift;
use error::RunResult;
use sim::event::GameEvent;
use sim::step::{self, FrameInput};
use sim::world::{Phase, RunState};
use ui::gamepad::GamepadState;
use ui::input::{InputState, LaneQueue};
use ui::renderer::Renderer;
use ui::sound::{cue_for, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Log file path. The terminal belongs to the renderer, so logs only go
/// to a file and only when this is set.
const LOG_ENV_VAR: &str = "MARCHARMY_LOG";

fn main() {
    init_tracing();

    let config = GameConfig::load();

    let catalog = match Catalog::builtin() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Level data is broken: {e}");
            return;
        }
    };
    let mut world = RunState::new(catalog);
    world.speed = config.speed.clone();

    let mut renderer = Renderer::new(config.speed.popup_ms);

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    info!(sound = sound.is_some(), tick_ms = config.speed.tick_rate_ms, "starting");

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing March Army!");
    println!("Final Score: {}", world.score());
}

fn init_tracing() {
    let path = match std::env::var(LOG_ENV_VAR) {
        Ok(p) if !p.is_empty() => p,
        _ => return,
    };
    let file = match File::create(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Could not open log file {path}: {e}");
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
}

fn game_loop(
    world: &mut RunState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> io::Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);
    let dt = tick_rate.as_secs_f64();

    let mut lanes = LaneQueue::default();

    loop {
        kb.drain_events();
        gp.update();
        renderer.pad_connected = gp.connected;

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &gp) {
            break;
        }

        if world.is_playing() && !world.paused {
            if let Some(shift) = detect_lane(&kb, &gp) {
                lanes.push(shift);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            if world.is_playing() && !world.paused {
                let frame_input = FrameInput { dt, lane: lanes.next() };
                let events = step::step(world, frame_input);
                process_sound_events(sound, &events);
                renderer.observe(&events);
            } else {
                lanes.clear();
            }
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for cue in events.iter().filter_map(cue_for) {
        sfx.play(cue);
    }
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_NEW_GAME: &[KeyCode] = &[KeyCode::Char('n'), KeyCode::Char('N')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::F(1)];
const KEYS_ESC: &[KeyCode] = &[KeyCode::Esc];

fn detect_lane(kb: &InputState, gp: &GamepadState) -> Option<LaneShift> {
    kb.lane_intent(KEYS_LEFT, KEYS_RIGHT).or_else(|| gp.lane_intent())
}

/// Log a refused transition; the state is untouched either way.
fn report(result: RunResult<()>) {
    if let Err(e) = result {
        warn!(error = %e, "input ignored");
    }
}

/// Menu/screen keys for the current phase. Returns true to quit.
fn handle_meta(world: &mut RunState, kb: &InputState, gp: &GamepadState) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();
    let esc = kb.any_pressed(KEYS_ESC) || gp.cancel_pressed();
    let retry = kb.any_pressed(KEYS_RESTART) || gp.restart_pressed();

    match world.phase() {
        // ── Menu ──
        Phase::Menu => {
            if confirm {
                report(world.start_game());
            } else if esc || kb.any_pressed(KEYS_QUIT) {
                return true;
            }
        }

        // ── Playing ──
        Phase::Playing => {
            if kb.any_pressed(KEYS_PAUSE) {
                world.paused = !world.paused;
                info!(paused = world.paused, "pause toggled");
            } else if esc {
                world.return_to_menu();
            }
        }

        // ── Victory ──
        Phase::LevelComplete => {
            if confirm {
                report(world.next_level());
            } else if esc {
                world.return_to_menu();
            }
        }

        // ── Game Over ──
        Phase::GameOver => {
            if confirm || retry {
                report(world.restart_level());
            } else if kb.any_pressed(KEYS_NEW_GAME) {
                report(world.start_game());
            } else if esc {
                world.return_to_menu();
            }
        }
    }

    false
}
