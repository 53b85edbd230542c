use crate::theme::ResolvedTheme;
use eframe::egui::{self, Id, Pos2, Rect, RichText, Vec2};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const SPACING: f32 = 8.0;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

fn place(trigger: Rect, size: Vec2, side: Side) -> Pos2 {
    let center = trigger.center();
    match side {
        Side::Top => Pos2::new(center.x - size.x / 2.0, trigger.top() - size.y - SPACING),
        Side::Bottom => Pos2::new(center.x - size.x / 2.0, trigger.bottom() + SPACING),
        Side::Left => Pos2::new(trigger.left() - size.x - SPACING, center.y - size.y / 2.0),
        Side::Right => Pos2::new(trigger.right() + SPACING, center.y - size.y / 2.0),
    }
}

fn fits(pos: Pos2, size: Vec2, side: Side, viewport: Vec2) -> bool {
    match side {
        Side::Top => pos.y >= 0.0,
        Side::Bottom => pos.y + size.y <= viewport.y,
        Side::Left => pos.x >= 0.0,
        Side::Right => pos.x + size.x <= viewport.x,
    }
}

fn opposite(side: Side) -> Side {
    match side {
        Side::Top => Side::Bottom,
        Side::Bottom => Side::Top,
        Side::Left => Side::Right,
        Side::Right => Side::Left,
    }
}

fn clamp_axis(value: f32, size: f32, extent: f32) -> f32 {
    if value < 0.0 {
        SPACING
    } else if value + size > extent {
        extent - size - SPACING
    } else {
        value
    }
}

pub fn compute_position(trigger: Rect, size: Vec2, side: Side, viewport: Vec2) -> Pos2 {
    let mut pos = place(trigger, size, side);
    if !fits(pos, size, side, viewport) {
        let flipped_side = opposite(side);
        let flipped = place(trigger, size, flipped_side);
        if fits(flipped, size, flipped_side, viewport) {
            pos = flipped;
        }
    }

    pos.x = clamp_axis(pos.x, size.x, viewport.x);
    pos.y = clamp_axis(pos.y, size.y, viewport.y);

    // Tooltips larger than the viewport minus spacing still start on-screen.
    pos.x = pos.x.min(viewport.x - size.x).max(0.0);
    pos.y = pos.y.min(viewport.y - size.y).max(0.0);
    pos
}

#[derive(Debug, Clone)]
pub struct TooltipState {
    delay: Duration,
    pending_since: Option<Instant>,
    visible: bool,
}

impl Default for TooltipState {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl TooltipState {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending_since: None,
            visible: false,
        }
    }

    pub fn pointer_entered(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    pub fn focus_gained(&mut self, now: Instant) {
        self.pointer_entered(now);
    }

    pub fn pointer_left(&mut self) {
        self.pending_since = None;
        self.visible = false;
    }

    pub fn focus_lost(&mut self) {
        self.pointer_left();
    }

    pub fn clicked(&mut self) {
        self.pending_since = None;
        self.visible = !self.visible;
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        if let Some(since) = self.pending_since {
            if now.duration_since(since) >= self.delay {
                self.pending_since = None;
                self.visible = true;
            }
        }
        self.visible
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending_since
            .map(|since| self.delay.saturating_sub(now.duration_since(since)))
    }
}

#[derive(Debug, Default)]
struct Tracked {
    state: TooltipState,
    hovered: bool,
    focused: bool,
    measured: Option<Vec2>,
}

#[derive(Debug, Default)]
pub struct Tooltips {
    entries: HashMap<Id, Tracked>,
}

impl Tooltips {
    pub fn hint(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        text: &str,
        side: Side,
        theme: &ResolvedTheme,
    ) {
        let now = Instant::now();
        let tracked = self.entries.entry(response.id).or_default();

        let hovered = response.hovered();
        if hovered && !tracked.hovered {
            tracked.state.pointer_entered(now);
        } else if !hovered && tracked.hovered {
            tracked.state.pointer_left();
        }
        tracked.hovered = hovered;

        let focused = response.has_focus();
        if focused && !tracked.focused {
            tracked.state.focus_gained(now);
        } else if !focused && tracked.focused {
            tracked.state.focus_lost();
        }
        tracked.focused = focused;

        if response.clicked() {
            tracked.state.clicked();
        }

        if let Some(remaining) = tracked.state.remaining(now) {
            ui.ctx().request_repaint_after(remaining);
        }
        if !tracked.state.poll(now) {
            return;
        }

        let viewport = ui.ctx().screen_rect().size();
        let size = tracked.measured.unwrap_or(Vec2::new(220.0, 40.0));
        let pos = compute_position(response.rect, size, side, viewport);
        let shown = egui::Area::new(response.id.with("tooltip"))
            .order(egui::Order::Tooltip)
            .fixed_pos(pos)
            .interactable(false)
            .show(ui.ctx(), |ui| {
                theme.tooltip_frame().show(ui, |ui| {
                    ui.set_max_width(280.0);
                    ui.label(RichText::new(text).color(theme.text_on_primary).small());
                });
            });
        let measured = shown.response.rect.size();
        if tracked.measured != Some(measured) {
            tracked.measured = Some(measured);
            ui.ctx().request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

    fn trigger(x: f32, y: f32) -> Rect {
        Rect::from_min_size(Pos2::new(x, y), Vec2::new(20.0, 20.0))
    }

    #[test]
    fn top_placement_centers_above_trigger() {
        let pos = compute_position(trigger(390.0, 300.0), Vec2::new(100.0, 30.0), Side::Top, VIEWPORT);
        assert_eq!(pos, Pos2::new(350.0, 262.0));
    }

    #[test]
    fn top_flips_to_bottom_when_no_room() {
        let pos = compute_position(trigger(390.0, 5.0), Vec2::new(100.0, 30.0), Side::Top, VIEWPORT);
        assert_eq!(pos.y, 33.0);
    }

    #[test]
    fn bottom_flips_to_top_near_viewport_edge() {
        let pos = compute_position(trigger(390.0, 570.0), Vec2::new(100.0, 30.0), Side::Bottom, VIEWPORT);
        assert_eq!(pos.y, 532.0);
    }

    #[test]
    fn right_flips_to_left_when_overflowing() {
        let pos = compute_position(trigger(760.0, 300.0), Vec2::new(100.0, 30.0), Side::Right, VIEWPORT);
        assert_eq!(pos.x, 652.0);
        assert_eq!(pos.y, 295.0);
    }

    #[test]
    fn wide_tooltip_is_clamped_inside_viewport() {
        let size = Vec2::new(300.0, 30.0);
        let pos = compute_position(trigger(770.0, 300.0), size, Side::Top, VIEWPORT);
        assert!(pos.x >= 0.0);
        assert!(pos.x + size.x <= VIEWPORT.x);
        assert_eq!(pos.x, 492.0);

        let left = compute_position(trigger(0.0, 300.0), size, Side::Top, VIEWPORT);
        assert_eq!(left.x, SPACING);
    }

    #[test]
    fn oversized_tooltip_still_starts_on_screen() {
        let size = Vec2::new(900.0, 700.0);
        let pos = compute_position(trigger(100.0, 100.0), size, Side::Bottom, VIEWPORT);
        assert_eq!(pos, Pos2::new(0.0, 0.0));
    }

    #[test]
    fn hover_shows_after_delay() {
        let start = Instant::now();
        let mut state = TooltipState::default();
        state.pointer_entered(start);
        assert!(!state.poll(start + Duration::from_millis(299)));
        assert!(state.poll(start + Duration::from_millis(300)));
    }

    #[test]
    fn leaving_before_delay_cancels_pending_show() {
        let start = Instant::now();
        let mut state = TooltipState::new(Duration::from_millis(100));
        state.pointer_entered(start);
        state.pointer_left();
        assert!(!state.is_pending());
        assert!(!state.poll(start + Duration::from_secs(1)));
    }

    #[test]
    fn click_toggles_immediately_and_cancels_pending() {
        let start = Instant::now();
        let mut state = TooltipState::default();
        state.focus_gained(start);
        state.clicked();
        assert!(state.poll(start));
        assert!(!state.is_pending());
        state.clicked();
        assert!(!state.poll(start + Duration::from_secs(1)));
    }
}
