mod ai;
mod boss;
mod data;
mod ecs;
mod level;
mod render;
mod score;
mod scripted_input;

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use ai::chat::{ChatError, ChatSession, OfflineResponder};
use bracket_geometry::prelude::Point;
use bracket_terminal::prelude::*;
use clap::Parser;
use data::GameConfig;
use ecs::{EcsWorld, resources::StageOutcome};
use glam::Vec2;
use level::{LevelFlow, PauseReason, PauseState, Scene, TimerEvent, format_time};
use render::{
    ArenaView, HudView, draw_arena, draw_chat, draw_game_over, draw_high_scores, draw_hud,
    draw_log, draw_main_menu,
};
use score::{ScoreLedger, store::PrefsStore};
use scripted_input::{ScriptStep, ScriptedInput};

const SCREEN_HEIGHT: i32 = 50;
const ARENA_ORIGIN_X: i32 = 2;
const ARENA_ORIGIN_Y: i32 = 7;
const ARENA_COLS: i32 = 76;
const ARENA_ROWS: i32 = 34;
const LOG_PANEL_START: i32 = SCREEN_HEIGHT - 6;
const CHAT_PANEL_TOP: i32 = 30;
const LOG_MAX_ENTRIES: usize = 5;
const MAX_FRAME_SECONDS: f32 = 0.1;
const MAX_CHAT_INPUT: usize = 60;
const MAX_NAME_INPUT: usize = 16;

const QUICK_CHAT: [&str; 4] = [
    "Let's attack them together!",
    "I need health, heal me!",
    "I'm scared, there's danger everywhere!",
    "Relax, good job out there.",
];

#[derive(Parser, Debug)]
#[command(name = "spider-siege", about = "Arena shooter with a spider boss and a moody wingman")]
struct Args {
    /// JSON tuning file overriding the built-in values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Where high scores and preferences are kept.
    #[arg(long, default_value = "spider-siege-scores.json")]
    scores: PathBuf,
    /// Replays key presses and chat lines from a file, one step per frame.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Name pre-filled on the game over screen.
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
    #[arg(long, default_value = "spider-siege.log")]
    log_file: PathBuf,
}

struct SpiderSiegeState {
    config: GameConfig,
    seed: u64,
    scene: Scene,
    flow: LevelFlow,
    pause: PauseState,
    world: Option<EcsWorld>,
    ledger: ScoreLedger,
    chat: ChatSession<OfflineResponder>,
    chat_open: bool,
    chat_input: String,
    default_name: String,
    name_input: String,
    score_saved: bool,
    final_score: i32,
    message_log: Vec<String>,
    script: Option<ScriptedInput>,
}

impl GameState for SpiderSiegeState {
    fn tick(&mut self, ctx: &mut BTerm) {
        let input = self.next_input(ctx);
        match self.scene {
            Scene::MainMenu => self.menu_input(ctx, input),
            Scene::Stage(_) => {
                self.stage_input(ctx, input);
                self.update_stage(ctx);
            }
            Scene::GameOver => self.game_over_input(ctx, input),
            Scene::HighScores => self.high_scores_input(input),
        }
        ctx.cls();
        self.draw_scene(ctx);
    }
}

impl SpiderSiegeState {
    fn new(
        config: GameConfig,
        ledger: ScoreLedger,
        seed: u64,
        name: Option<String>,
        script: Option<ScriptedInput>,
    ) -> Self {
        let flow = LevelFlow::new(&config.levels);
        let default_name = name.unwrap_or_default();
        Self {
            config,
            seed,
            scene: Scene::MainMenu,
            flow,
            pause: PauseState::default(),
            world: None,
            ledger,
            chat: ChatSession::new(OfflineResponder::default()),
            chat_open: false,
            chat_input: String::new(),
            name_input: default_name.clone(),
            default_name,
            score_saved: false,
            final_score: 0,
            message_log: Vec::new(),
            script,
        }
    }

    /// Scripted steps take over until the script runs dry.
    fn next_input(&mut self, ctx: &BTerm) -> Option<ScriptStep> {
        if let Some(script) = self.script.as_mut() {
            let step = script.next_step();
            if script.is_finished() {
                log::info!("input script finished");
                self.script = None;
            }
            if step.is_some() {
                return step;
            }
        }
        ctx.key.map(ScriptStep::Key)
    }

    fn menu_input(&mut self, ctx: &mut BTerm, input: Option<ScriptStep>) {
        match input {
            Some(ScriptStep::Key(VirtualKeyCode::Return)) => self.start_run(),
            Some(ScriptStep::Key(VirtualKeyCode::H)) => self.scene = Scene::HighScores,
            Some(ScriptStep::Key(VirtualKeyCode::Escape)) => ctx.quit(),
            _ => {}
        }
    }

    fn stage_input(&mut self, ctx: &BTerm, input: Option<ScriptStep>) {
        let key = match input {
            Some(ScriptStep::Key(key)) => key,
            Some(ScriptStep::Chat(message)) => {
                self.send_chat(&message);
                return;
            }
            Some(ScriptStep::Idle) | None => return,
        };

        if self.chat_open {
            match key {
                VirtualKeyCode::Return => {
                    let message = std::mem::take(&mut self.chat_input);
                    self.send_chat(&message);
                }
                VirtualKeyCode::Escape => self.close_chat(),
                VirtualKeyCode::Back => {
                    self.chat_input.pop();
                }
                other => {
                    if let Some(c) = key_to_char(other, ctx.shift) {
                        if self.chat_input.len() < MAX_CHAT_INPUT {
                            self.chat_input.push(c);
                        }
                    }
                }
            }
            return;
        }

        match key {
            VirtualKeyCode::P | VirtualKeyCode::Escape => {
                self.pause.toggle_manual();
                log::debug!("manual pause toggled, paused = {}", self.pause.is_paused());
            }
            VirtualKeyCode::T => {
                self.chat_open = true;
                self.pause.pause(PauseReason::Chat);
            }
            VirtualKeyCode::F1 => {
                self.push_log_entry("Skipping ahead...");
                self.advance_stage();
            }
            VirtualKeyCode::F2 => self.send_chat(QUICK_CHAT[0]),
            VirtualKeyCode::F3 => self.send_chat(QUICK_CHAT[1]),
            VirtualKeyCode::F4 => self.send_chat(QUICK_CHAT[2]),
            VirtualKeyCode::F5 => self.send_chat(QUICK_CHAT[3]),
            _ if self.pause.is_paused() => {}
            VirtualKeyCode::Left | VirtualKeyCode::A => self.step_player(Vec2::NEG_X),
            VirtualKeyCode::Right | VirtualKeyCode::D => self.step_player(Vec2::X),
            VirtualKeyCode::Up | VirtualKeyCode::W => self.step_player(Vec2::Y),
            VirtualKeyCode::Down | VirtualKeyCode::S => self.step_player(Vec2::NEG_Y),
            VirtualKeyCode::Space => {
                if let Some(world) = self.world.as_mut() {
                    world.fire_laser();
                }
            }
            _ => {}
        }
    }

    fn step_player(&mut self, direction: Vec2) {
        if let Some(world) = self.world.as_mut() {
            world.queue_player_step(direction);
        }
    }

    fn close_chat(&mut self) {
        self.chat_open = false;
        self.chat_input.clear();
        self.pause.resume(PauseReason::Chat);
    }

    /// Sends one line to the companion. The player's words and the reply both
    /// go through the companion's keyword scan.
    fn send_chat(&mut self, message: &str) {
        let Some(world) = self.world.as_mut() else {
            return;
        };
        let exchange = self.chat.send(message, &world.chat_context());
        if exchange.reply == Err(ChatError::EmptyMessage) {
            self.push_log_entry(ChatError::EmptyMessage.to_string());
            return;
        }
        world.companion_hear(&exchange.player_text);
        if let Ok(reply) = &exchange.reply {
            world.companion_hear(reply);
        }
        self.flush_world_log();
    }

    fn update_stage(&mut self, ctx: &BTerm) {
        if self.pause.is_paused() {
            return;
        }
        let dt = (ctx.frame_time_ms / 1000.0).clamp(0.0, MAX_FRAME_SECONDS);
        let Some(world) = self.world.as_mut() else {
            return;
        };
        world.advance(dt);
        for cue in world.drain_sound_cues() {
            log::trace!("audio cue {cue:?}");
        }
        let session = world.session();
        let earned = session.score - self.ledger.current_score();
        if earned > 0 {
            self.ledger.add_score(earned);
        }
        let game_over = session.game_over;
        let outcome = world.take_outcome();
        self.flush_world_log();

        if !game_over {
            match self.flow.tick(dt) {
                Some(TimerEvent::Warning) => self.push_log_entry("10 seconds left!"),
                Some(TimerEvent::Expired) => {
                    self.push_log_entry("Time's up!");
                    self.advance_stage();
                    return;
                }
                None => {}
            }
        }

        match outcome {
            Some(StageOutcome::Victory) => self.advance_stage(),
            Some(StageOutcome::Defeat) => self.end_run(),
            None => {}
        }
    }

    fn start_run(&mut self) {
        self.flow.restart();
        self.ledger.reset_current_score();
        self.pause.clear();
        self.chat_open = false;
        self.chat_input.clear();
        self.chat.clear();
        self.message_log.clear();
        self.score_saved = false;
        self.name_input = self.default_name.clone();
        self.enter_stage(0, None);
    }

    fn enter_stage(&mut self, index: usize, carried: Option<level::CarriedStats>) {
        let Some(stage) = self.flow.stages().get(index).cloned() else {
            log::warn!("stage {index} is not configured");
            self.end_run();
            return;
        };
        let seed = self.seed.wrapping_add(index as u64);
        self.world = Some(EcsWorld::new(&self.config, &stage, carried, seed));
        self.scene = Scene::Stage(index);
        self.push_log_entry(format!("Entering {}", stage.name));
        log::info!("entered stage {} ({})", index, stage.name);
    }

    fn advance_stage(&mut self) {
        let Some(world) = self.world.as_ref() else {
            return;
        };
        let carried = world.carried_stats();
        match self.flow.begin_transition(carried) {
            Some(Scene::Stage(index)) => {
                let carried = self.flow.finish_transition(Scene::Stage(index));
                if self.chat_open {
                    self.close_chat();
                }
                self.enter_stage(index, carried);
            }
            Some(scene) => {
                self.flow.finish_transition(scene);
                self.end_run();
            }
            None => {}
        }
    }

    fn end_run(&mut self) {
        if let Some(world) = self.world.as_ref() {
            self.ledger.set_score(world.session().score);
        }
        self.final_score = self.ledger.current_score();
        if let Err(err) = self.ledger.record_last_score(self.final_score) {
            log::warn!("could not record last score: {err}");
        }
        self.pause.clear();
        self.chat_open = false;
        self.chat_input.clear();
        self.score_saved = false;
        self.scene = Scene::GameOver;
        log::info!("run over with score {}", self.final_score);
    }

    fn game_over_input(&mut self, ctx: &BTerm, input: Option<ScriptStep>) {
        let Some(ScriptStep::Key(key)) = input else {
            return;
        };
        match key {
            VirtualKeyCode::Return if !self.score_saved => self.save_score(),
            VirtualKeyCode::F6 => self.start_run(),
            VirtualKeyCode::F7 => self.scene = Scene::HighScores,
            VirtualKeyCode::Escape => self.scene = Scene::MainMenu,
            VirtualKeyCode::Back if !self.score_saved => {
                self.name_input.pop();
            }
            other if !self.score_saved => {
                if let Some(c) = key_to_char(other, ctx.shift) {
                    if self.name_input.len() < MAX_NAME_INPUT {
                        self.name_input.push(c);
                    }
                }
            }
            _ => {}
        }
    }

    fn save_score(&mut self) {
        match self.ledger.save_score(&self.name_input) {
            Ok(Some(rank)) => {
                self.push_log_entry(format!("Saved at rank {}", rank + 1));
            }
            Ok(None) => self.push_log_entry("Score saved."),
            Err(err) => {
                log::warn!("could not save score: {err}");
                self.push_log_entry(format!("Could not save score: {err}"));
                return;
            }
        }
        self.score_saved = true;
    }

    fn high_scores_input(&mut self, input: Option<ScriptStep>) {
        match input {
            Some(ScriptStep::Key(VirtualKeyCode::Escape)) => self.scene = Scene::MainMenu,
            Some(ScriptStep::Key(VirtualKeyCode::Delete)) => {
                if let Err(err) = self.ledger.clear_all() {
                    log::warn!("could not clear high scores: {err}");
                }
            }
            _ => {}
        }
    }

    fn flush_world_log(&mut self) {
        let entries = match self.world.as_mut() {
            Some(world) => world.drain_combat_log(),
            None => return,
        };
        for entry in entries {
            self.push_log_entry(entry);
        }
    }

    fn push_log_entry<S: Into<String>>(&mut self, entry: S) {
        self.message_log.insert(0, entry.into());
        self.message_log.truncate(LOG_MAX_ENTRIES);
    }

    fn draw_scene(&mut self, ctx: &mut BTerm) {
        match self.scene {
            Scene::MainMenu => draw_main_menu(ctx, self.ledger.last_score()),
            Scene::Stage(_) => self.draw_stage(ctx),
            Scene::GameOver => {
                let high_score = self.ledger.is_high_score(self.final_score);
                draw_game_over(
                    ctx,
                    self.final_score,
                    high_score,
                    &self.name_input,
                    self.score_saved,
                );
                draw_log(ctx, &self.message_log, LOG_PANEL_START);
            }
            Scene::HighScores => {
                let limit = self.config.scores.display_limit;
                draw_high_scores(ctx, self.ledger.top(limit));
            }
        }
    }

    fn draw_stage(&self, ctx: &mut BTerm) {
        let Some(world) = self.world.as_ref() else {
            return;
        };
        let session = world.session();
        let timer = (!self.flow.is_boss_stage())
            .then(|| (format_time(self.flow.time_remaining()), self.flow.timer_tone()));
        let hud = HudView {
            stage_name: self.flow.current().map_or("", |stage| stage.name.as_str()),
            health: session.health,
            max_health: session.max_health,
            score: session.score,
            timer,
            boss: world.boss_status(),
            mood: world.companion_mood(),
            paused: self.pause.is_paused(),
        };
        draw_hud(ctx, &hud);

        let view = ArenaView::new(
            Point::new(ARENA_ORIGIN_X, ARENA_ORIGIN_Y),
            ARENA_COLS,
            ARENA_ROWS,
            &world.arena(),
        );
        draw_arena(ctx, &view, &world.renderables());

        if self.chat_open {
            draw_chat(ctx, self.chat.transcript(), &self.chat_input, CHAT_PANEL_TOP);
        } else {
            draw_log(ctx, &self.message_log, LOG_PANEL_START);
        }
    }
}

fn key_to_char(key: VirtualKeyCode, shift: bool) -> Option<char> {
    use VirtualKeyCode::*;
    let letter = match key {
        A => 'a',
        B => 'b',
        C => 'c',
        D => 'd',
        E => 'e',
        F => 'f',
        G => 'g',
        H => 'h',
        I => 'i',
        J => 'j',
        K => 'k',
        L => 'l',
        M => 'm',
        N => 'n',
        O => 'o',
        P => 'p',
        Q => 'q',
        R => 'r',
        S => 's',
        T => 't',
        U => 'u',
        V => 'v',
        W => 'w',
        X => 'x',
        Y => 'y',
        Z => 'z',
        Key0 => return Some('0'),
        Key1 => return Some(if shift { '!' } else { '1' }),
        Key2 => return Some('2'),
        Key3 => return Some('3'),
        Key4 => return Some('4'),
        Key5 => return Some('5'),
        Key6 => return Some('6'),
        Key7 => return Some('7'),
        Key8 => return Some('8'),
        Key9 => return Some('9'),
        Space => return Some(' '),
        Comma => return Some(','),
        Period => return Some('.'),
        Apostrophe => return Some('\''),
        Minus => return Some('-'),
        Slash => return Some(if shift { '?' } else { '/' }),
        _ => return None,
    };
    Some(if shift {
        letter.to_ascii_uppercase()
    } else {
        letter
    })
}

fn init_logging(path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> BError {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::builtin()?,
    };
    let store = PrefsStore::open(&args.scores)?;
    let ledger = ScoreLedger::new(&config.scores, store);
    let script = match &args.script {
        Some(path) => Some(ScriptedInput::from_file(path)?),
        None => None,
    };

    let context = BTermBuilder::simple80x50()
        .with_title("Spider Siege")
        .build()?;
    let game_state = SpiderSiegeState::new(config, ledger, args.seed, args.name, script);
    main_loop(context, game_state)
}
