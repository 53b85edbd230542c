use crate::settings::{ColorPalette, PrimaryColor, ThemeMode};
use eframe::egui::{self, Color32, CornerRadius, FontFamily, FontId, Frame, Margin, Stroke, TextStyle};
use tracing::{error, info, warn};

pub const SANS_STACK: &str = "Inter, ui-sans-serif, system-ui, -apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, \"Helvetica Neue\", Arial, \"Noto Sans\", sans-serif";
pub const SERIF_STACK: &str = "Georgia, ui-serif, Cambria, \"Times New Roman\", Times, serif";
pub const MONO_STACK: &str = "Menlo, ui-monospace, SFMono-Regular, Monaco, Consolas, \"Liberation Mono\", \"Courier New\", monospace";
pub const GENERIC_STACK: &str = "sans-serif";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontChoice {
    Sans,
    Serif,
    Mono,
    Generic,
}

impl FontChoice {
    pub fn from_value(value: &str) -> Self {
        match value {
            "sans" => Self::Sans,
            "serif" => Self::Serif,
            "mono" => Self::Mono,
            _ => Self::Generic,
        }
    }

    pub fn stack(self) -> &'static str {
        match self {
            Self::Sans => SANS_STACK,
            Self::Serif => SERIF_STACK,
            Self::Mono => MONO_STACK,
            Self::Generic => GENERIC_STACK,
        }
    }

    fn family(self) -> FontFamily {
        // egui ships no serif face; serif falls back to proportional.
        match self {
            Self::Mono => FontFamily::Monospace,
            Self::Sans | Self::Serif | Self::Generic => FontFamily::Proportional,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ThemeError {
    #[error("palette entry {field} has invalid color {value:?}")]
    InvalidColor { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTheme {
    pub mode: ThemeMode,
    pub primary: Color32,
    pub secondary: Color32,
    pub accent: Color32,
    pub neutral: Color32,
    pub base_100: Color32,
    pub base_content: Color32,
    pub neutral_focus: Color32,
    pub text_on_primary: Color32,
    pub danger: Color32,
    pub font: FontChoice,
    pub font_stack: &'static str,
}

impl Default for ResolvedTheme {
    fn default() -> Self {
        Self {
            mode: ThemeMode::Light,
            primary: Color32::from_rgb(0x0E, 0xA5, 0xE9),
            secondary: Color32::from_rgb(0x38, 0xBD, 0xF8),
            accent: Color32::from_rgb(0x7D, 0xD3, 0xFC),
            neutral: Color32::from_rgb(0xE0, 0xE0, 0xE0),
            base_100: Color32::WHITE,
            base_content: Color32::from_rgb(0x1F, 0x29, 0x37),
            neutral_focus: Color32::from_rgb(0xA1, 0xA1, 0xAA),
            text_on_primary: Color32::WHITE,
            danger: Color32::from_rgb(0xEF, 0x44, 0x44),
            font: FontChoice::Generic,
            font_stack: GENERIC_STACK,
        }
    }
}

fn parse_color(field: &'static str, value: &str) -> Result<Color32, ThemeError> {
    Color32::from_hex(value.trim()).map_err(|_| ThemeError::InvalidColor {
        field,
        value: value.to_string(),
    })
}

pub fn resolve_theme(
    mode: ThemeMode,
    color: &PrimaryColor,
    font_family: &str,
) -> Result<ResolvedTheme, ThemeError> {
    let palette: &ColorPalette = color.palette.for_mode(mode);
    let font = FontChoice::from_value(font_family);
    if font == FontChoice::Generic {
        warn!(font_family, "unknown font family; defaulting to sans-serif");
    }
    let neutral_focus = match mode {
        ThemeMode::Dark => Color32::from_rgb(0x71, 0x71, 0x7A),
        ThemeMode::Light => Color32::from_rgb(0xA1, 0xA1, 0xAA),
    };

    Ok(ResolvedTheme {
        mode,
        primary: parse_color("primary", &palette.primary)?,
        secondary: parse_color("secondary", &palette.secondary)?,
        accent: parse_color("accent", &palette.accent)?,
        neutral: parse_color("neutral", &palette.neutral)?,
        base_100: parse_color("base_100", &palette.base_100)?,
        base_content: parse_color("base_content", &palette.base_content)?,
        neutral_focus,
        text_on_primary: Color32::WHITE,
        danger: Color32::from_rgb(0xEF, 0x44, 0x44),
        font,
        font_stack: font.stack(),
    })
}

pub trait PresentationSink {
    fn apply(&mut self, theme: &ResolvedTheme);
    fn reset_to_baseline(&mut self);
}

/// Resolves and applies; an invalid palette reverts the sink to its baseline.
pub fn apply_theme(
    sink: &mut dyn PresentationSink,
    mode: ThemeMode,
    color: &PrimaryColor,
    font_family: &str,
) -> Option<ResolvedTheme> {
    match resolve_theme(mode, color, font_family) {
        Ok(theme) => {
            info!(?mode, color = %color.value, font = theme.font_stack, "applying theme");
            sink.apply(&theme);
            Some(theme)
        }
        Err(err) => {
            error!(%err, color = %color.value, "invalid palette; reverting to baseline");
            sink.reset_to_baseline();
            None
        }
    }
}

impl ResolvedTheme {
    pub const R8: u8 = 8;
    pub const R12: u8 = 12;
    pub const P8: f32 = 8.0;
    pub const P12: f32 = 12.0;

    pub fn is_dark(&self) -> bool {
        self.mode == ThemeMode::Dark
    }

    fn style_for(&self, ctx: &egui::Context) -> egui::Style {
        let mut visuals = if self.is_dark() {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        visuals.panel_fill = self.base_100;
        visuals.window_fill = self.base_100;
        visuals.extreme_bg_color = self.base_100;
        visuals.override_text_color = Some(self.base_content);
        visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, self.neutral);
        visuals.widgets.noninteractive.fg_stroke.color = self.base_content;
        visuals.widgets.inactive.bg_fill = self.neutral.gamma_multiply(0.5);
        visuals.widgets.inactive.weak_bg_fill = self.neutral.gamma_multiply(0.5);
        visuals.widgets.hovered.bg_fill = self.secondary;
        visuals.widgets.hovered.weak_bg_fill = self.secondary;
        visuals.widgets.active.bg_fill = self.primary;
        visuals.widgets.active.weak_bg_fill = self.primary;
        visuals.selection.bg_fill = self.primary;
        visuals.selection.stroke = Stroke::new(1.0, self.text_on_primary);
        visuals.hyperlink_color = self.accent;
        visuals.window_corner_radius = CornerRadius::same(Self::R12);

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(10.0, 10.0);
        style.spacing.button_padding = egui::vec2(12.0, 8.0);
        let body = self.font.family();
        style.text_styles.insert(TextStyle::Heading, FontId::new(18.0, body.clone()));
        style.text_styles.insert(TextStyle::Body, FontId::new(14.0, body.clone()));
        style.text_styles.insert(TextStyle::Button, FontId::new(14.0, body.clone()));
        style.text_styles.insert(TextStyle::Small, FontId::new(11.0, body));
        style.text_styles.insert(TextStyle::Monospace, FontId::monospace(13.0));
        style
    }

    pub fn bubble_frame(&self, from_user: bool) -> Frame {
        let (fill, stroke) = if from_user {
            (self.primary, Stroke::NONE)
        } else if self.is_dark() {
            (self.neutral, Stroke::new(1.0, self.neutral.gamma_multiply(0.5)))
        } else {
            (self.base_100, Stroke::new(1.0, self.neutral))
        };
        Frame::new()
            .fill(fill)
            .stroke(stroke)
            .inner_margin(Margin::same(Self::P12 as i8))
            .corner_radius(CornerRadius::same(Self::R12))
    }

    pub fn composer_frame(&self) -> Frame {
        Frame::new()
            .fill(self.base_100)
            .inner_margin(Margin::symmetric(Self::P12 as i8, 10))
            .corner_radius(CornerRadius::same(Self::R8))
            .stroke(Stroke::new(1.0, self.neutral))
    }

    pub fn banner_frame(&self) -> Frame {
        Frame::new()
            .fill(self.danger.gamma_multiply(0.15))
            .stroke(Stroke::new(1.0, self.danger))
            .inner_margin(Margin::same(Self::P8 as i8))
            .corner_radius(CornerRadius::same(Self::R8))
    }

    pub fn tooltip_frame(&self) -> Frame {
        Frame::new()
            .fill(self.neutral_focus)
            .inner_margin(Margin::symmetric(Self::P12 as i8, Self::P8 as i8))
            .corner_radius(CornerRadius::same(Self::R8))
    }
}

pub struct EguiSink<'a> {
    pub ctx: &'a egui::Context,
    pub current: &'a mut ResolvedTheme,
}

impl PresentationSink for EguiSink<'_> {
    fn apply(&mut self, theme: &ResolvedTheme) {
        self.ctx.set_style(theme.style_for(self.ctx));
        *self.current = theme.clone();
    }

    fn reset_to_baseline(&mut self) {
        let baseline = ResolvedTheme::default();
        self.ctx.set_style(baseline.style_for(self.ctx));
        *self.current = baseline;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[derive(Default)]
    struct RecordingSink {
        applied: Vec<ResolvedTheme>,
        resets: usize,
    }

    impl PresentationSink for RecordingSink {
        fn apply(&mut self, theme: &ResolvedTheme) {
            self.applied.push(theme.clone());
        }

        fn reset_to_baseline(&mut self) {
            self.resets += 1;
        }
    }

    #[test]
    fn dark_palette_and_font_are_resolved() {
        let settings = Settings::defaults();
        let theme = resolve_theme(ThemeMode::Dark, &settings.primary_color, "serif")
            .expect("preset palette is valid");
        assert_eq!(theme.primary, Color32::from_rgb(0x38, 0xBD, 0xF8));
        assert_eq!(theme.base_100, Color32::from_rgb(0x1F, 0x29, 0x37));
        assert_eq!(theme.neutral_focus, Color32::from_rgb(0x71, 0x71, 0x7A));
        assert_eq!(theme.font_stack, SERIF_STACK);
        assert!(theme.is_dark());
    }

    #[test]
    fn unknown_font_falls_back_to_generic_stack() {
        let settings = Settings::defaults();
        let theme = resolve_theme(ThemeMode::Light, &settings.primary_color, "comic")
            .expect("preset palette is valid");
        assert_eq!(theme.font, FontChoice::Generic);
        assert_eq!(theme.font_stack, "sans-serif");
    }

    #[test]
    fn invalid_palette_reverts_to_baseline() {
        let mut color = Settings::defaults().primary_color.as_ref().clone();
        color.palette.light.accent = "not-a-color".to_string();
        let mut sink = RecordingSink::default();

        let applied = apply_theme(&mut sink, ThemeMode::Light, &color, "sans");
        assert!(applied.is_none());
        assert_eq!(sink.resets, 1);
        assert!(sink.applied.is_empty());

        let applied = apply_theme(&mut sink, ThemeMode::Dark, &color, "mono");
        assert_eq!(applied.map(|theme| theme.font), Some(FontChoice::Mono));
        assert_eq!(sink.applied.len(), 1);
    }
}
