use crate::chat::GenerationParams;
use crate::config::{
    DEFAULT_SYSTEM_INSTRUCTION, DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P,
    MAX_TEMPERATURE, MAX_TOP_K, MAX_TOP_P, MIN_TEMPERATURE, MIN_TOP_K, MIN_TOP_P,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

pub mod store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub neutral: String,
    pub base_100: String,
    pub base_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteSet {
    pub light: ColorPalette,
    pub dark: ColorPalette,
}

impl PaletteSet {
    pub fn for_mode(&self, mode: ThemeMode) -> &ColorPalette {
        match mode {
            ThemeMode::Light => &self.light,
            ThemeMode::Dark => &self.dark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryColor {
    pub name: String,
    pub value: String,
    pub palette: PaletteSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontOption {
    pub name: &'static str,
    pub value: &'static str,
}

pub const AVAILABLE_FONTS: &[FontOption] = &[
    FontOption {
        name: "Sans Serif (Inter)",
        value: "sans",
    },
    FontOption {
        name: "Serif (Georgia)",
        value: "serif",
    },
    FontOption {
        name: "Monospace (Menlo)",
        value: "mono",
    },
];

type PaletteRow = [&'static str; 6];

struct ColorPreset {
    name: &'static str,
    value: &'static str,
    light: PaletteRow,
    dark: PaletteRow,
}

const COLOR_PRESETS: &[ColorPreset] = &[
    ColorPreset {
        name: "Sky Blue",
        value: "sky",
        light: ["#0ea5e9", "#38bdf8", "#7dd3fc", "#e0e0e0", "#ffffff", "#1f2937"],
        dark: ["#38bdf8", "#0ea5e9", "#0284c7", "#4b5563", "#1f2937", "#f3f4f6"],
    },
    ColorPreset {
        name: "Emerald Green",
        value: "emerald",
        light: ["#10b981", "#34d399", "#6ee7b7", "#e0e0e0", "#ffffff", "#1f2937"],
        dark: ["#34d399", "#10b981", "#059669", "#4b5563", "#1f2937", "#f3f4f6"],
    },
    ColorPreset {
        name: "Indigo Purple",
        value: "indigo",
        light: ["#6366f1", "#818cf8", "#a5b4fc", "#e0e0e0", "#ffffff", "#1f2937"],
        dark: ["#818cf8", "#6366f1", "#4f46e5", "#4b5563", "#1f2937", "#f3f4f6"],
    },
    ColorPreset {
        name: "Rose Pink",
        value: "rose",
        light: ["#f43f5e", "#fb7185", "#fda4af", "#e0e0e0", "#ffffff", "#1f2937"],
        dark: ["#fb7185", "#f43f5e", "#e11d48", "#4b5563", "#1f2937", "#f3f4f6"],
    },
];

fn palette(row: &PaletteRow) -> ColorPalette {
    let [primary, secondary, accent, neutral, base_100, base_content] = row.map(str::to_string);
    ColorPalette {
        primary,
        secondary,
        accent,
        neutral,
        base_100,
        base_content,
    }
}

impl ColorPreset {
    fn to_color(&self) -> PrimaryColor {
        PrimaryColor {
            name: self.name.to_string(),
            value: self.value.to_string(),
            palette: PaletteSet {
                light: palette(&self.light),
                dark: palette(&self.dark),
            },
        }
    }
}

pub fn available_colors() -> Vec<PrimaryColor> {
    COLOR_PRESETS.iter().map(ColorPreset::to_color).collect()
}

fn fallback_color() -> PrimaryColor {
    ColorPreset {
        name: "Default Fallback Blue",
        value: "default-fallback-blue",
        light: ["#0ea5e9", "#38bdf8", "#7dd3fc", "#e0e0e0", "#ffffff", "#1f2937"],
        dark: ["#38bdf8", "#0ea5e9", "#0284c7", "#4b5563", "#1f2937", "#f3f4f6"],
    }
    .to_color()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub system_instruction: String,
    pub primary_color: Arc<PrimaryColor>,
    pub font_family: String,
    pub theme: ThemeMode,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl Settings {
    /// Builds the defaults, allocating a fresh color each call.
    pub fn defaults() -> Self {
        let primary_color = match COLOR_PRESETS.first() {
            Some(preset) => preset.to_color(),
            None => {
                error!("no color presets available; using hard-coded fallback");
                fallback_color()
            }
        };
        let font_family = match AVAILABLE_FONTS.first() {
            Some(font) => font.value.to_string(),
            None => {
                error!("no font options available; using hard-coded fallback");
                "sans".to_string()
            }
        };
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            primary_color: Arc::new(primary_color),
            font_family,
            theme: ThemeMode::Light,
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            top_p: DEFAULT_TOP_P,
        }
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            system_instruction: self.system_instruction.clone(),
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
        }
    }

    pub fn appearance_changed(&self, other: &Settings) -> bool {
        self.theme != other.theme
            || self.font_family != other.font_family
            || !Arc::ptr_eq(&self.primary_color, &other.primary_color)
    }

    pub fn sanitized(mut self) -> Self {
        self.temperature = clamp_f32(self.temperature, MIN_TEMPERATURE, MAX_TEMPERATURE, DEFAULT_TEMPERATURE);
        self.top_k = self.top_k.clamp(MIN_TOP_K, MAX_TOP_K);
        self.top_p = clamp_f32(self.top_p, MIN_TOP_P, MAX_TOP_P, DEFAULT_TOP_P);
        self
    }
}

fn clamp_f32(value: f32, min: f32, max: f32, default: f32) -> f32 {
    if value.is_nan() {
        default
    } else {
        value.clamp(min, max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingChange {
    SystemInstruction(String),
    PrimaryColor(PrimaryColor),
    FontFamily(String),
    Theme(ThemeMode),
    Temperature(f32),
    TopK(u32),
    TopP(f32),
}

#[derive(Debug)]
pub struct SettingsStore {
    current: Arc<Settings>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::with_snapshot(Settings::defaults())
    }
}

impl SettingsStore {
    pub fn with_snapshot(settings: Settings) -> Self {
        Self {
            current: Arc::new(settings.sanitized()),
        }
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        Arc::clone(&self.current)
    }

    pub fn update(&mut self, change: SettingChange) -> Arc<Settings> {
        let mut next = Settings::clone(&self.current);
        match change {
            SettingChange::SystemInstruction(value) => next.system_instruction = value,
            SettingChange::PrimaryColor(value) => next.primary_color = Arc::new(value),
            SettingChange::FontFamily(value) => next.font_family = value,
            SettingChange::Theme(value) => next.theme = value,
            SettingChange::Temperature(value) => next.temperature = value,
            SettingChange::TopK(value) => next.top_k = value,
            SettingChange::TopP(value) => next.top_p = value,
        }
        self.current = Arc::new(next.sanitized());
        self.snapshot()
    }

    pub fn reset_to_defaults(&mut self) -> Arc<Settings> {
        self.current = Arc::new(Settings::defaults());
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_replaces_only_the_changed_field() {
        let mut store = SettingsStore::default();
        let before = store.snapshot();
        let after = store.update(SettingChange::TopK(12));

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.top_k, 12);
        let restored = Settings {
            top_k: before.top_k,
            ..Settings::clone(&after)
        };
        assert_eq!(&restored, before.as_ref());
        assert!(Arc::ptr_eq(&before.primary_color, &after.primary_color));
        assert!(!before.appearance_changed(&after));
    }

    #[test]
    fn update_clamps_out_of_range_values() {
        let mut store = SettingsStore::default();
        assert_eq!(store.update(SettingChange::Temperature(3.0)).temperature, MAX_TEMPERATURE);
        assert_eq!(store.update(SettingChange::TopK(0)).top_k, MIN_TOP_K);
        assert_eq!(store.update(SettingChange::TopP(f32::NAN)).top_p, DEFAULT_TOP_P);
    }

    #[test]
    fn reset_builds_fresh_color_identity() {
        let mut store = SettingsStore::default();
        let first = store.reset_to_defaults();
        let second = store.reset_to_defaults();

        assert_eq!(first, second);
        assert!(!Arc::ptr_eq(&first.primary_color, &second.primary_color));
        assert!(first.appearance_changed(&second));
    }

    #[test]
    fn defaults_use_first_presets() {
        let settings = Settings::defaults();
        assert_eq!(settings.primary_color.name, "Sky Blue");
        assert_eq!(settings.font_family, "sans");
        assert_eq!(settings.theme, ThemeMode::Light);
        assert_eq!(settings.top_k, 40);
        assert_eq!(available_colors().len(), 4);
    }

    #[test]
    fn generation_params_ignore_appearance() {
        let mut store = SettingsStore::default();
        let before = store.snapshot().generation_params();
        let after = store.update(SettingChange::Theme(ThemeMode::Dark));
        assert_eq!(before, after.generation_params());
        assert!(after.appearance_changed(&Settings::defaults()));
    }
}
