use crate::chat::log::{Message, Sender};
use crate::chat::{ChatSessionManager, SessionState};
use crate::theme::ResolvedTheme;
use crate::ui::markdown;
use eframe::egui::{self, Align, Layout, RichText, ScrollArea};

const INSTRUCTION_PREVIEW_CHARS: usize = 50;

#[derive(Default)]
pub struct ChatView {
    input_buffer: String,
    scroll_to_bottom: bool,
}

impl ChatView {
    pub fn request_scroll(&mut self) {
        self.scroll_to_bottom = true;
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        chat: &mut ChatSessionManager,
        system_instruction: &str,
        theme: &ResolvedTheme,
    ) {
        self.header(ui, chat, theme);
        ui.separator();

        let transcript_height = (ui.available_height() - 120.0).max(120.0);
        ScrollArea::vertical()
            .id_salt("chat_transcript")
            .max_height(transcript_height)
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for message in chat.messages() {
                    bubble(ui, message, theme);
                }
                if chat.messages().is_empty() && chat.error().is_none() {
                    empty_state(ui, chat, system_instruction, theme);
                }
                if self.scroll_to_bottom {
                    ui.scroll_to_cursor(Some(Align::BOTTOM));
                }
            });
        self.scroll_to_bottom = false;

        if let Some(error) = chat.error().map(str::to_string) {
            theme.banner_frame().show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(error).color(theme.danger));
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.small_button("✕").clicked() {
                            chat.dismiss_error();
                        }
                    });
                });
            });
        }

        ui.separator();
        self.composer(ui, chat, theme);
    }

    fn header(&self, ui: &mut egui::Ui, chat: &ChatSessionManager, theme: &ResolvedTheme) {
        ui.heading(RichText::new("Chat with Gemini").color(theme.primary));
        if chat.is_streaming() && chat.messages().iter().any(Message::is_loading) {
            ui.label(RichText::new("Bot is thinking...").color(theme.accent).small());
        }
    }

    fn composer(&mut self, ui: &mut egui::Ui, chat: &mut ChatSessionManager, theme: &ResolvedTheme) {
        let input_enabled = chat.can_send();
        let hint = match (chat.state(), chat.error()) {
            (SessionState::Ready, _) => chat.status_line(),
            (SessionState::InitFailed(_), Some(error)) => error.to_string(),
            _ => chat.status_line(),
        };

        let mut send_now = false;
        let input_id = ui.make_persistent_id("composer_input");
        if ui.memory(|memory| memory.has_focus(input_id)) {
            send_now = ui.input_mut(take_submit);
        }
        theme.composer_frame().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.add_enabled(
                    input_enabled,
                    egui::TextEdit::multiline(&mut self.input_buffer)
                        .id(input_id)
                        .desired_rows(1)
                        .desired_width(ui.available_width() - 80.0)
                        .hint_text(hint),
                );

                let clicked = ui
                    .add_enabled(
                        input_enabled && !self.input_buffer.trim().is_empty(),
                        egui::Button::new(RichText::new("Send").color(theme.text_on_primary))
                            .fill(theme.primary),
                    )
                    .clicked();
                send_now |= clicked;
            });
        });

        if send_now && input_enabled {
            let prompt = self.input_buffer.trim().to_string();
            if let Ok(Some(_)) = chat.send(&prompt) {
                self.input_buffer.clear();
                self.scroll_to_bottom = true;
                ui.ctx().request_repaint();
            }
        }
    }
}

// Plain Enter submits and never reaches the text edit; Shift+Enter inserts a newline.
fn take_submit(input: &mut egui::InputState) -> bool {
    !input.modifiers.shift && input.consume_key(egui::Modifiers::NONE, egui::Key::Enter)
}

fn bubble(ui: &mut egui::Ui, message: &Message, theme: &ResolvedTheme) {
    let from_user = message.sender == Sender::User;
    let layout = if from_user {
        Layout::top_down(Align::Max)
    } else {
        Layout::top_down(Align::Min)
    };
    let text_color = if from_user {
        theme.text_on_primary
    } else if message.is_error() {
        theme.danger
    } else {
        theme.base_content
    };

    ui.with_layout(layout, |ui| {
        theme.bubble_frame(from_user).show(ui, |ui| {
            ui.set_max_width((ui.available_width() * 0.75).min(560.0));
            if message.is_loading() && message.text.is_empty() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new("Thinking...").color(text_color));
                });
            } else {
                markdown::render(ui, &message.text, text_color, theme);
                if message.is_loading() {
                    ui.spinner();
                }
            }
            ui.label(
                RichText::new(message.timestamp.format("%H:%M").to_string())
                    .small()
                    .color(text_color.gamma_multiply(0.7)),
            );
        });
    });
}

fn empty_state(
    ui: &mut egui::Ui,
    chat: &ChatSessionManager,
    system_instruction: &str,
    theme: &ResolvedTheme,
) {
    ui.vertical_centered(|ui| {
        ui.add_space(32.0);
        match chat.state() {
            SessionState::Ready => {
                ui.label(RichText::new("Chat history is empty.").color(theme.neutral_focus));
                ui.label(
                    RichText::new("Type a message to start interacting with the bot.")
                        .color(theme.neutral_focus),
                );
                ui.label(
                    RichText::new(format!(
                        "Current System Instruction: \"{}\"",
                        instruction_preview(system_instruction)
                    ))
                    .small()
                    .color(theme.neutral_focus),
                );
            }
            SessionState::InitFailed(_) => {
                ui.label(RichText::new(chat.status_line()).color(theme.danger));
            }
            SessionState::Uninitialized | SessionState::Initializing => {
                ui.spinner();
                ui.label(RichText::new(chat.status_line()).color(theme.neutral_focus));
            }
        }
    });
}

fn instruction_preview(instruction: &str) -> String {
    let mut preview: String = instruction.chars().take(INSTRUCTION_PREVIEW_CHARS).collect();
    if instruction.chars().count() > INSTRUCTION_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::{instruction_preview, take_submit};
    use eframe::egui::{self, Event, Key, Modifiers, RawInput};

    fn enter_press(modifiers: Modifiers) -> RawInput {
        RawInput {
            modifiers,
            events: vec![Event::Key {
                key: Key::Enter,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn enter_is_consumed_before_the_text_edit() {
        let ctx = egui::Context::default();
        let _ = ctx.run(enter_press(Modifiers::NONE), |ctx| {
            ctx.input_mut(|input| {
                assert!(take_submit(input));
                assert!(!input.key_pressed(Key::Enter));
                assert!(!take_submit(input));
            });
        });
    }

    #[test]
    fn shift_enter_is_left_for_a_newline() {
        let ctx = egui::Context::default();
        let _ = ctx.run(enter_press(Modifiers::SHIFT), |ctx| {
            ctx.input_mut(|input| {
                assert!(!take_submit(input));
                assert!(input.key_pressed(Key::Enter));
            });
        });
    }

    #[test]
    fn long_instructions_are_truncated() {
        let long = "x".repeat(60);
        assert_eq!(instruction_preview(&long), format!("{}...", "x".repeat(50)));
        assert_eq!(instruction_preview("short"), "short");
    }
}
