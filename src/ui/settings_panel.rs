use crate::config::{
    MAX_TEMPERATURE, MAX_TOP_K, MAX_TOP_P, MIN_TEMPERATURE, MIN_TOP_K, MIN_TOP_P,
    TEMPERATURE_STEP, TOP_K_STEP, TOP_P_STEP,
};
use crate::settings::{available_colors, PrimaryColor, SettingChange, Settings, ThemeMode, AVAILABLE_FONTS};
use crate::theme::ResolvedTheme;
use crate::ui::tooltip::{Side, Tooltips};
use eframe::egui::{self, Color32, CornerRadius, RichText, Sense, Stroke};

#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    Change(SettingChange),
    Reset,
}

pub struct SettingsPanel {
    colors: Vec<PrimaryColor>,
    instruction_draft: Option<String>,
    confirm_reset: bool,
    tooltips: Tooltips,
}

impl Default for SettingsPanel {
    fn default() -> Self {
        Self {
            colors: available_colors(),
            instruction_draft: None,
            confirm_reset: false,
            tooltips: Tooltips::default(),
        }
    }
}

impl SettingsPanel {
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        settings: &Settings,
        theme: &ResolvedTheme,
    ) -> Vec<PanelAction> {
        let mut actions = Vec::new();
        ui.heading(RichText::new("Settings").color(theme.primary));
        ui.separator();

        self.system_instruction(ui, settings, theme, &mut actions);
        ui.separator();
        self.model_parameters(ui, settings, theme, &mut actions);
        ui.separator();
        self.appearance(ui, settings, theme, &mut actions);
        ui.separator();
        self.reset(ui, theme, &mut actions);
        actions
    }

    fn system_instruction(
        &mut self,
        ui: &mut egui::Ui,
        settings: &Settings,
        theme: &ResolvedTheme,
        actions: &mut Vec<PanelAction>,
    ) {
        ui.strong("System Instruction");
        ui.label(
            RichText::new("Changing this starts a new conversation.")
                .small()
                .color(theme.neutral_focus),
        );
        let draft = self
            .instruction_draft
            .get_or_insert_with(|| settings.system_instruction.clone());
        let response = ui.add(
            egui::TextEdit::multiline(draft)
                .desired_rows(4)
                .desired_width(f32::INFINITY),
        );
        // Commit on focus loss so every keystroke does not restart the chat.
        if response.lost_focus() {
            if *draft != settings.system_instruction {
                actions.push(PanelAction::Change(SettingChange::SystemInstruction(
                    draft.clone(),
                )));
            }
            self.instruction_draft = None;
        } else if !response.has_focus() && *draft != settings.system_instruction {
            self.instruction_draft = None;
        }
    }

    fn model_parameters(
        &mut self,
        ui: &mut egui::Ui,
        settings: &Settings,
        theme: &ResolvedTheme,
        actions: &mut Vec<PanelAction>,
    ) {
        ui.strong("Model Parameters");

        let mut temperature = settings.temperature;
        let response = ui.add(
            egui::Slider::new(&mut temperature, MIN_TEMPERATURE..=MAX_TEMPERATURE)
                .step_by(TEMPERATURE_STEP)
                .fixed_decimals(1)
                .text("Temperature"),
        );
        self.tooltips.hint(
            ui,
            &response,
            "Controls randomness. Lower values are more deterministic, higher values more creative.",
            Side::Top,
            theme,
        );
        if response.changed() {
            actions.push(PanelAction::Change(SettingChange::Temperature(temperature)));
        }

        let mut top_k = settings.top_k;
        let response = ui.add(
            egui::Slider::new(&mut top_k, MIN_TOP_K..=MAX_TOP_K)
                .step_by(TOP_K_STEP)
                .text("Top-K"),
        );
        self.tooltips.hint(
            ui,
            &response,
            "Samples from the K most likely next tokens. Lower values make output more focused.",
            Side::Top,
            theme,
        );
        if response.changed() {
            actions.push(PanelAction::Change(SettingChange::TopK(top_k)));
        }

        let mut top_p = settings.top_p;
        let response = ui.add(
            egui::Slider::new(&mut top_p, MIN_TOP_P..=MAX_TOP_P)
                .step_by(TOP_P_STEP)
                .fixed_decimals(2)
                .text("Top-P"),
        );
        self.tooltips.hint(
            ui,
            &response,
            "Samples from the smallest token set whose cumulative probability exceeds P.",
            Side::Top,
            theme,
        );
        if response.changed() {
            actions.push(PanelAction::Change(SettingChange::TopP(top_p)));
        }
    }

    fn appearance(
        &mut self,
        ui: &mut egui::Ui,
        settings: &Settings,
        theme: &ResolvedTheme,
        actions: &mut Vec<PanelAction>,
    ) {
        ui.strong("Appearance");

        let mut mode = settings.theme;
        ui.horizontal(|ui| {
            ui.label("Theme");
            ui.radio_value(&mut mode, ThemeMode::Light, "Light");
            ui.radio_value(&mut mode, ThemeMode::Dark, "Dark");
        });
        if mode != settings.theme {
            actions.push(PanelAction::Change(SettingChange::Theme(mode)));
        }

        ui.label("Primary Color");
        ui.horizontal_wrapped(|ui| {
            for color in &self.colors {
                let swatch = color.palette.for_mode(settings.theme);
                let fill = Color32::from_hex(&swatch.primary).unwrap_or(theme.primary);
                let selected = color.value == settings.primary_color.value;
                let (rect, response) = ui.allocate_exact_size(egui::vec2(28.0, 28.0), Sense::click());
                let stroke = if selected {
                    Stroke::new(3.0, theme.base_content)
                } else {
                    Stroke::new(1.0, theme.neutral)
                };
                ui.painter().rect_filled(rect, CornerRadius::same(14), fill);
                ui.painter().rect_stroke(
                    rect,
                    CornerRadius::same(14),
                    stroke,
                    egui::StrokeKind::Outside,
                );
                let response = response.on_hover_text(color.name.as_str());
                if response.clicked() && !selected {
                    actions.push(PanelAction::Change(SettingChange::PrimaryColor(
                        color.clone(),
                    )));
                }
            }
        });

        let mut font = settings.font_family.clone();
        let selected_name = AVAILABLE_FONTS
            .iter()
            .find(|option| option.value == font)
            .map(|option| option.name)
            .unwrap_or("Sans Serif");
        egui::ComboBox::from_label("Font")
            .selected_text(selected_name)
            .show_ui(ui, |ui| {
                for option in AVAILABLE_FONTS {
                    ui.selectable_value(&mut font, option.value.to_string(), option.name);
                }
            });
        if font != settings.font_family {
            actions.push(PanelAction::Change(SettingChange::FontFamily(font)));
        }
    }

    fn reset(&mut self, ui: &mut egui::Ui, theme: &ResolvedTheme, actions: &mut Vec<PanelAction>) {
        if !self.confirm_reset {
            if ui.button("Reset to Defaults").clicked() {
                self.confirm_reset = true;
            }
            return;
        }

        ui.label(
            RichText::new("Are you sure you want to reset all settings to their defaults?")
                .color(theme.danger),
        );
        ui.horizontal(|ui| {
            if ui.button("Reset").clicked() {
                self.instruction_draft = None;
                self.confirm_reset = false;
                actions.push(PanelAction::Reset);
            }
            if ui.button("Cancel").clicked() {
                self.confirm_reset = false;
            }
        });
    }
}
