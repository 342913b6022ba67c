//! Sessions sidebar: list, select, create, rename and delete sessions.

use egui::{self, RichText, ScrollArea};
use tutor_core::chat::ChatState;
use crate::theme::*;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    New,
    Select(u64),
    BeginRename(u64),
    EditTitle(String),
    CommitRename { id: u64, title: String },
    CancelRename,
    Delete(u64),
}

pub fn sessions_panel(ui: &mut egui::Ui, chat: &ChatState) -> Vec<SessionAction> {
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        ui.label(RichText::new("Sessions").color(TEXT_PRIMARY).strong());
        if chat.loading_sessions {
            ui.spinner();
        }
    });
    if ui
        .add(egui::Button::new(RichText::new("+ New chat").color(TEXT_PRIMARY)).fill(ACCENT))
        .clicked()
    {
        actions.push(SessionAction::New);
    }
    ui.separator();

    ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
        if chat.sessions.is_empty() && !chat.loading_sessions {
            ui.label(RichText::new("No conversations yet").color(TEXT_SECONDARY).small());
        }

        for session in &chat.sessions {
            match &chat.renaming {
                Some((id, buffer)) if *id == session.id => {
                    let mut title = buffer.clone();
                    let edit = ui.text_edit_singleline(&mut title);
                    if edit.changed() {
                        actions.push(SessionAction::EditTitle(title.clone()));
                    }
                    let enter = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    ui.horizontal(|ui| {
                        if ui.small_button("Save").clicked() || enter {
                            actions.push(SessionAction::CommitRename {
                                id: session.id,
                                title: title.clone(),
                            });
                        }
                        if ui.small_button("Cancel").clicked() {
                            actions.push(SessionAction::CancelRename);
                        }
                    });
                }
                _ => {
                    let active = chat.active == Some(session.id);
                    ui.horizontal(|ui| {
                        if ui.selectable_label(active, session.title.as_str()).clicked() {
                            actions.push(SessionAction::Select(session.id));
                        }
                        if ui.small_button("Rename").clicked() {
                            actions.push(SessionAction::BeginRename(session.id));
                        }
                        if ui.small_button("Delete").clicked() {
                            actions.push(SessionAction::Delete(session.id));
                        }
                    });
                    ui.label(
                        RichText::new(format!(
                            "{} · {}",
                            session.proficiency_level.label(),
                            session.learning_focus.label()
                        ))
                        .color(TEXT_SECONDARY)
                        .small(),
                    );
                }
            }
            ui.add_space(4.0);
        }
    });

    actions
}
