use crate::chat::ChatSessionManager;
use crate::event::AppEvent;
use crate::settings::{store, Settings, SettingsStore};
use crate::theme::{apply_theme, EguiSink, ResolvedTheme};
use crate::ui::chat_view::ChatView;
use crate::ui::settings_panel::{PanelAction, SettingsPanel};
use eframe::egui::{self, RichText, ScrollArea};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use tracing::warn;

pub struct ChatStudioApp {
    rx: Receiver<AppEvent>,
    chat: ChatSessionManager,
    settings: SettingsStore,
    applied: Option<Arc<Settings>>,
    settings_path: PathBuf,
    theme: ResolvedTheme,
    settings_panel: SettingsPanel,
    chat_view: ChatView,
    panel_visible: bool,
    diagnostics_log: Vec<String>,
}

impl ChatStudioApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        chat: ChatSessionManager,
        settings_path: PathBuf,
    ) -> Self {
        let mut warnings = Vec::new();
        let settings = match store::load(&settings_path) {
            Ok(Some(settings)) => SettingsStore::with_snapshot(settings),
            Ok(None) => SettingsStore::default(),
            Err(err) => {
                warn!(%err, "using default settings");
                warnings.push(format!("settings load warning: {err}"));
                SettingsStore::default()
            }
        };
        let mut app = Self {
            rx,
            chat,
            settings,
            applied: None,
            settings_path,
            theme: ResolvedTheme::default(),
            settings_panel: SettingsPanel::default(),
            chat_view: ChatView::default(),
            panel_visible: true,
            diagnostics_log: Vec::new(),
        };
        for warning in warnings {
            app.log_diagnostic(warning);
        }
        if let Some(error) = app.chat.error().map(str::to_string) {
            app.log_diagnostic(error);
        }
        app
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log.push(format!(
            "[{}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            message.into()
        ));
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event, ctx),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent, ctx: &egui::Context) {
        match &event {
            AppEvent::SessionCreated { generation, session } => self.log_diagnostic(format!(
                "session {} ready (generation {generation})",
                session.id()
            )),
            AppEvent::SessionFailed { error, .. } => {
                self.log_diagnostic(format!("session creation failed: {error}"))
            }
            AppEvent::StreamEnd { message_id } => {
                self.log_diagnostic(format!("reply {message_id} complete"))
            }
            AppEvent::StreamFailed { message_id, error } => {
                self.log_diagnostic(format!("reply {message_id} failed: {error}"))
            }
            AppEvent::Fragment { .. } => {}
        }
        self.chat.apply_event(event);
        self.chat_view.request_scroll();
        ctx.request_repaint();
    }

    fn sync_settings(&mut self, ctx: &egui::Context) {
        let snapshot = self.settings.snapshot();
        if let Some(applied) = &self.applied {
            if Arc::ptr_eq(applied, &snapshot) {
                return;
            }
        }

        let appearance_changed = self
            .applied
            .as_ref()
            .map_or(true, |applied| applied.appearance_changed(&snapshot));
        if appearance_changed {
            let mut sink = EguiSink {
                ctx,
                current: &mut self.theme,
            };
            if apply_theme(&mut sink, snapshot.theme, &snapshot.primary_color, &snapshot.font_family)
                .is_none()
            {
                self.log_diagnostic("invalid palette; using baseline theme");
            }
        }

        self.chat.configure(snapshot.generation_params());

        if self.applied.is_some() {
            if let Err(err) = store::save(&self.settings_path, &snapshot) {
                warn!(%err, "failed to persist settings");
                self.log_diagnostic(format!("failed to persist settings: {err}"));
            }
        }
        self.applied = Some(snapshot);
    }

    fn handle_panel_actions(&mut self, actions: Vec<PanelAction>) {
        for action in actions {
            match action {
                PanelAction::Change(change) => {
                    self.settings.update(change);
                }
                PanelAction::Reset => {
                    self.settings.reset_to_defaults();
                    self.log_diagnostic("settings reset to defaults");
                }
            }
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let label = if self.panel_visible {
                    "Hide Settings"
                } else {
                    "Show Settings"
                };
                if ui.button(label).clicked() {
                    self.panel_visible = !self.panel_visible;
                }
                ui.separator();
                ui.strong(RichText::new("Chat Studio").color(self.theme.primary));
                ui.separator();
                ui.label(
                    RichText::new(format!("Model: {}", self.chat.model()))
                        .small()
                        .color(self.theme.neutral_focus),
                );
            });
        });
    }

    fn render_settings_panel(&mut self, ctx: &egui::Context) {
        if !self.panel_visible {
            return;
        }
        let snapshot = self.settings.snapshot();
        let mut actions = Vec::new();
        egui::SidePanel::left("settings_panel")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                ScrollArea::vertical()
                    .id_salt("settings_scroll")
                    .show(ui, |ui| {
                        actions = self.settings_panel.show(ui, &snapshot, &self.theme);
                    });
            });
        self.handle_panel_actions(actions);
    }

    fn render_center_panel(&mut self, ctx: &egui::Context) {
        let snapshot = self.settings.snapshot();
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chat_view
                .show(ui, &mut self.chat, &snapshot.system_instruction, &self.theme);

            ui.separator();
            egui::CollapsingHeader::new("Diagnostics")
                .default_open(false)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("diagnostics_log")
                        .max_height(90.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(RichText::new(entry).small().monospace());
                            }
                        });
                });
        });
    }
}

impl eframe::App for ChatStudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);
        self.sync_settings(ctx);
        self.render_top_bar(ctx);
        self.render_settings_panel(ctx);
        self.render_center_panel(ctx);
        if self.chat.is_streaming() {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }
    }
}
