//! Chat panel: the active conversation and the message input.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};
use tutor_core::chat::{ChatState, QUICK_PROMPTS};
use tutor_types::message::{Delivery, Role, TimelineEntry};
use crate::theme::*;

#[derive(Debug, Clone, PartialEq)]
pub enum ChatAction {
    EditDraft(String),
    Send,
    QuickPrompt(usize),
    Reload,
}

/// Render the chat panel. Returns what the user asked for this frame.
pub fn chat_panel(ui: &mut egui::Ui, chat: &ChatState) -> Vec<ChatAction> {
    let mut actions = Vec::new();

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                // Header
                ui.horizontal(|ui| {
                    let title = chat
                        .active_session()
                        .map(|s| s.title.as_str())
                        .unwrap_or("New conversation");
                    ui.heading(RichText::new(title).color(TEXT_PRIMARY).strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if chat.active.is_some() && ui.small_button("Reload").clicked() {
                            actions.push(ChatAction::Reload);
                        }
                        if chat.loading_messages || chat.sending {
                            ui.spinner();
                        }
                    });
                });

                ui.separator();

                let available_height = ui.available_height() - 60.0;
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if chat.timeline.is_empty() && !chat.loading_messages {
                            quick_prompts(ui, &mut actions);
                        }
                        for entry in &chat.timeline {
                            render_entry(ui, entry);
                            ui.add_space(4.0);
                        }
                        if chat.sending {
                            ui.label(RichText::new("Tutor is typing...").color(TEXT_SECONDARY).italics());
                        }
                    });

                ui.add_space(8.0);

                // Input area
                ui.horizontal(|ui| {
                    let mut draft = chat.draft.clone();
                    let input = egui::TextEdit::singleline(&mut draft)
                        .hint_text("Type a message...")
                        .desired_width(ui.available_width() - 70.0)
                        .font(egui::FontId::proportional(14.0));
                    let response = ui.add(input);
                    if response.changed() {
                        actions.push(ChatAction::EditDraft(draft.clone()));
                    }

                    let send_enabled = !draft.trim().is_empty() && !chat.sending;
                    let send_btn = ui.add_enabled(
                        send_enabled,
                        egui::Button::new(RichText::new("Send").color(TEXT_PRIMARY))
                            .fill(if send_enabled { ACCENT } else { BG_SURFACE })
                            .corner_radius(PANEL_ROUNDING)
                            .min_size(Vec2::new(60.0, 0.0)),
                    );

                    if (response.lost_focus()
                        && ui.input(|i| i.key_pressed(egui::Key::Enter))
                        && send_enabled)
                        || send_btn.clicked()
                    {
                        actions.push(ChatAction::Send);
                        response.request_focus();
                    }
                });
            });
        });

    actions
}

fn quick_prompts(ui: &mut egui::Ui, actions: &mut Vec<ChatAction>) {
    ui.label(RichText::new("Try one of these:").color(TEXT_SECONDARY));
    for (i, prompt) in QUICK_PROMPTS.iter().enumerate() {
        if ui.button(*prompt).clicked() {
            actions.push(ChatAction::QuickPrompt(i));
        }
    }
    ui.add_space(8.0);
}

fn render_entry(ui: &mut egui::Ui, entry: &TimelineEntry) {
    let (label, label_color, bg) = match (&entry.delivery, entry.role) {
        (Delivery::Synthetic, _) => ("Tutor", WARNING, BG_SURFACE),
        (Delivery::Failed { .. }, _) => ("You", ERROR, BG_FAILED),
        (_, Role::User) => ("You", ACCENT, BG_USER),
        (_, Role::Assistant) => ("Tutor", SUCCESS, BG_SECONDARY),
    };

    egui::Frame::default()
        .fill(bg)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(label).color(label_color).strong().small());
                if let Some(marker) = delivery_marker(&entry.delivery) {
                    ui.label(RichText::new(marker).color(TEXT_SECONDARY).small().italics());
                }
            });
            ui.label(RichText::new(&entry.content).color(TEXT_PRIMARY));
        });
}

/// Short status shown next to an entry's author, if any.
pub fn delivery_marker(delivery: &Delivery) -> Option<String> {
    match delivery {
        Delivery::Pending { .. } => Some("sending...".to_string()),
        Delivery::Failed { reason, .. } => Some(format!("not sent: {}", reason)),
        Delivery::Confirmed { .. } | Delivery::Synthetic => None,
    }
}
