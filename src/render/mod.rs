#![allow(dead_code)]

use bracket_geometry::prelude::Point;
use bracket_terminal::prelude::*;
use glam::Vec2;

use crate::{
    ai::{
        Mood,
        chat::{ChatLine, Speaker},
    },
    boss::BossState,
    ecs::{BossStatus, components::Renderable, resources::Arena},
    level::TimerTone,
    score::ScoreEntry,
};

pub const PODIUM_GOLD: (u8, u8, u8) = (255, 215, 0);
pub const PODIUM_SILVER: (u8, u8, u8) = (192, 192, 192);
pub const PODIUM_BRONZE: (u8, u8, u8) = (205, 127, 50);

/// Maps continuous arena coordinates onto a block of terminal cells. World
/// `+y` points up the screen.
#[derive(Clone, Copy, Debug)]
pub struct ArenaView {
    pub origin: Point,
    pub cols: i32,
    pub rows: i32,
    pub half_extents: Vec2,
}

impl ArenaView {
    pub fn new(origin: Point, cols: i32, rows: i32, arena: &Arena) -> Self {
        Self {
            origin,
            cols: cols.max(2),
            rows: rows.max(2),
            half_extents: arena.half_extents,
        }
    }

    pub fn to_cell(&self, point: Vec2) -> Option<Point> {
        let span = self.half_extents * 2.0;
        let fx = (point.x + self.half_extents.x) / span.x;
        let fy = (self.half_extents.y - point.y) / span.y;
        if !(0.0..=1.0).contains(&fx) || !(0.0..=1.0).contains(&fy) {
            return None;
        }
        let x = (fx * (self.cols - 1) as f32).round() as i32;
        let y = (fy * (self.rows - 1) as f32).round() as i32;
        Some(Point::new(self.origin.x + x, self.origin.y + y))
    }
}

/// Everything the status bar shows.
pub struct HudView<'a> {
    pub stage_name: &'a str,
    pub health: i32,
    pub max_health: i32,
    pub score: i32,
    pub timer: Option<(String, TimerTone)>,
    pub boss: Option<BossStatus>,
    pub mood: Mood,
    pub paused: bool,
}

pub fn timer_color(tone: TimerTone) -> RGB {
    match tone {
        TimerTone::Normal => RGB::named(WHITE),
        TimerTone::Caution => RGB::named(YELLOW),
        TimerTone::Critical => RGB::named(RED),
    }
}

/// Podium colours for the first three ranks.
pub fn rank_color(rank: usize) -> RGB {
    match rank {
        0 => RGB::named(PODIUM_GOLD),
        1 => RGB::named(PODIUM_SILVER),
        2 => RGB::named(PODIUM_BRONZE),
        _ => RGB::named(WHITE),
    }
}

pub fn draw_hud(ctx: &mut BTerm, hud: &HudView) {
    let (width, _) = ctx.get_char_size();
    ctx.draw_box(0, 0, width - 1, 5, RGB::named(GRAY), RGB::named(BLACK));
    ctx.print_color(
        2,
        1,
        RGB::named(WHITE),
        RGB::named(BLACK),
        format!("Spider Siege · {}", hud.stage_name),
    );

    let hull: String = (0..hud.max_health.max(0))
        .map(|idx| if idx < hud.health { '♥' } else { '·' })
        .collect();
    let hull_color = if hud.health * 10 <= hud.max_health * 3 {
        RGB::named(RED)
    } else {
        RGB::named(LIGHT_GREEN)
    };
    ctx.print_color(2, 2, hull_color, RGB::named(BLACK), format!("Hull {hull}"));
    ctx.print_color(
        2,
        3,
        RGB::named(YELLOW),
        RGB::named(BLACK),
        format!("Score {}", hud.score),
    );

    if let Some((text, tone)) = &hud.timer {
        ctx.print_color(30, 2, timer_color(*tone), RGB::named(BLACK), format!("Time {text}"));
    }
    if let Some(boss) = hud.boss {
        let (label, color) = boss_label(&boss);
        ctx.print_color(30, 3, color, RGB::named(BLACK), label);
    }

    ctx.print_color(
        56,
        2,
        hud.mood.color(),
        RGB::named(BLACK),
        format!("Budy: {}", hud.mood.as_str()),
    );
    if hud.paused {
        ctx.print_color(56, 3, RGB::named(ORANGE), RGB::named(BLACK), "PAUSED");
    }
}

fn boss_label(boss: &BossStatus) -> (String, RGB) {
    match boss.state {
        BossState::Descending => ("Spider incoming...".to_string(), RGB::named(GRAY)),
        BossState::Defeated => ("Spider destroyed!".to_string(), RGB::named(LIGHT_GREEN)),
        BossState::Fighting if boss.vulnerable => (
            format!("Body EXPOSED · HP {}", boss.body_hit_points),
            RGB::named(RED),
        ),
        BossState::Fighting => (
            format!("Legs {}/{}", boss.legs_remaining, boss.leg_count),
            RGB::named(MAGENTA),
        ),
    }
}

pub fn draw_arena(ctx: &mut BTerm, view: &ArenaView, drawables: &[(Vec2, Renderable)]) {
    ctx.draw_box(
        view.origin.x - 1,
        view.origin.y - 1,
        view.cols + 1,
        view.rows + 1,
        RGB::named(DARK_GRAY),
        RGB::named(BLACK),
    );
    for (point, renderable) in drawables {
        if let Some(cell) = view.to_cell(*point) {
            ctx.set(
                cell.x,
                cell.y,
                renderable.color,
                RGB::named(BLACK),
                renderable.glyph,
            );
        }
    }
}

pub fn draw_log(ctx: &mut BTerm, log: &[String], start_y: i32) {
    let (width, _) = ctx.get_char_size();
    let height = (log.len() as i32).min(5) + 2;
    let top = (start_y - 1).max(0);
    ctx.draw_box(
        0,
        top,
        width - 1,
        height,
        RGB::named(DARK_GRAY),
        RGB::named(BLACK),
    );
    ctx.print_color(
        2,
        top + 1,
        RGB::named(WHITE),
        RGB::named(BLACK),
        "Event Log",
    );
    for (row, entry) in log.iter().take(5).enumerate() {
        ctx.print(2, top + 2 + row as i32, entry);
    }
}

pub fn draw_chat(ctx: &mut BTerm, transcript: &[ChatLine], input: &str, top: i32) {
    let (width, height) = ctx.get_char_size();
    let rows = (height as i32 - top - 3).max(1) as usize;
    ctx.draw_box(
        0,
        top,
        width - 1,
        height as i32 - top - 1,
        RGB::named(CYAN),
        RGB::named(BLACK),
    );
    ctx.print_color(
        2,
        top,
        RGB::named(CYAN),
        RGB::named(BLACK),
        " Chat with Budy (Enter send · Esc close) ",
    );
    let visible = transcript.len().saturating_sub(rows);
    for (row, line) in transcript[visible..].iter().enumerate() {
        let (prefix, color) = match (line.speaker, line.is_error) {
            (_, true) => ("Budy", RGB::named(RED)),
            (Speaker::Player, _) => ("You", RGB::named(WHITE)),
            (Speaker::Companion, _) => ("Budy", RGB::named(LIGHT_CYAN)),
        };
        let text = format!("{prefix}: {}", line.text);
        let clipped: String = text.chars().take(width as usize - 4).collect();
        ctx.print_color(2, top + 1 + row as i32, color, RGB::named(BLACK), clipped);
    }
    ctx.print_color(
        2,
        height as i32 - 2,
        RGB::named(YELLOW),
        RGB::named(BLACK),
        format!("> {input}_"),
    );
}

pub fn draw_main_menu(ctx: &mut BTerm, last_score: i32) {
    ctx.print_color_centered(12, RGB::named(MAGENTA), RGB::named(BLACK), "SPIDER SIEGE");
    ctx.print_color_centered(
        16,
        RGB::named(WHITE),
        RGB::named(BLACK),
        "[Enter] Start    [H] High scores    [Esc] Quit",
    );
    if last_score > 0 {
        ctx.print_color_centered(
            18,
            RGB::named(GRAY),
            RGB::named(BLACK),
            format!("Last run: {last_score}"),
        );
    }
    ctx.print_color_centered(
        22,
        RGB::named(GRAY),
        RGB::named(BLACK),
        "Arrows/WASD move · Space fire · P pause · T chat · F2-F5 quick chat",
    );
}

pub fn draw_game_over(ctx: &mut BTerm, score: i32, high_score: bool, name: &str, saved: bool) {
    ctx.print_color_centered(12, RGB::named(RED), RGB::named(BLACK), "GAME OVER");
    ctx.print_color_centered(
        14,
        RGB::named(YELLOW),
        RGB::named(BLACK),
        format!("Final score: {score}"),
    );
    if saved {
        ctx.print_color_centered(17, RGB::named(LIGHT_GREEN), RGB::named(BLACK), "Score saved!");
    } else {
        if high_score {
            ctx.print_color_centered(16, RGB::named(PODIUM_GOLD), RGB::named(BLACK), "NEW HIGH SCORE!");
        }
        ctx.print_color_centered(
            17,
            RGB::named(WHITE),
            RGB::named(BLACK),
            format!("Name: {name}_"),
        );
        ctx.print_color_centered(
            19,
            RGB::named(GRAY),
            RGB::named(BLACK),
            "[Enter] Save score",
        );
    }
    ctx.print_color_centered(
        21,
        RGB::named(GRAY),
        RGB::named(BLACK),
        "[F6] Play again · [F7] High scores · [Esc] Menu",
    );
}

pub fn draw_high_scores(ctx: &mut BTerm, entries: &[ScoreEntry]) {
    ctx.print_color_centered(6, RGB::named(YELLOW), RGB::named(BLACK), "HIGH SCORES");
    if entries.is_empty() {
        ctx.print_color_centered(10, RGB::named(GRAY), RGB::named(BLACK), "No scores yet!");
    }
    for (rank, entry) in entries.iter().enumerate() {
        let line = format!(
            "{:>2}. {:<16} {:>7}  {}",
            rank + 1,
            entry.player_name,
            entry.score,
            entry.recorded_at.format("%Y-%m-%d")
        );
        ctx.print_color(20, 9 + rank as i32, rank_color(rank), RGB::named(BLACK), line);
    }
    ctx.print_color_centered(
        22,
        RGB::named(GRAY),
        RGB::named(BLACK),
        "[Esc] Back · [Del] Clear table",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ArenaView {
        let arena = Arena {
            half_extents: Vec2::new(9.0, 5.0),
        };
        ArenaView::new(Point::new(2, 7), 73, 31, &arena)
    }

    #[test]
    fn arena_corners_land_on_the_frame_edges() {
        let view = view();
        assert_eq!(view.to_cell(Vec2::new(-9.0, 5.0)), Some(Point::new(2, 7)));
        assert_eq!(view.to_cell(Vec2::new(9.0, -5.0)), Some(Point::new(74, 37)));
        assert_eq!(view.to_cell(Vec2::ZERO), Some(Point::new(38, 22)));
    }

    #[test]
    fn points_off_the_arena_are_not_drawn() {
        let view = view();
        assert_eq!(view.to_cell(Vec2::new(0.0, 8.0)), None);
        assert_eq!(view.to_cell(Vec2::new(-9.5, 0.0)), None);
    }

    #[test]
    fn podium_colors_then_white() {
        assert_eq!(rank_color(0), RGB::named(PODIUM_GOLD));
        assert_eq!(rank_color(2), RGB::named(PODIUM_BRONZE));
        assert_eq!(rank_color(3), RGB::named(WHITE));
    }
}
