//! Library panel: content stats, category management and lesson lists.

use egui::{self, Align, Layout, RichText, ScrollArea};
use tutor_core::library::LibraryState;
use tutor_types::content::StatsResponse;
use crate::theme::*;

#[derive(Debug, Clone, PartialEq)]
pub enum LibraryAction {
    Reload,
    EditNewCategory(String),
    CreateCategory,
    BeginEdit(u64),
    EditName(String),
    SaveEdit,
    CancelEdit,
    DeleteCategory(u64),
}

pub fn library_panel(ui: &mut egui::Ui, library: &LibraryState) -> Vec<LibraryAction> {
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        ui.heading(RichText::new("Library").color(TEXT_PRIMARY).strong());
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.small_button("Reload").clicked() {
                actions.push(LibraryAction::Reload);
            }
            if library.loading {
                ui.spinner();
            }
        });
    });
    ui.separator();

    ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
        if let Some(stats) = &library.stats {
            ui.horizontal(|ui| {
                stat_card(ui, "Grammar", &stats.grammar);
                stat_card(ui, "Videos", &stats.videos);
                stat_card(ui, "Vocabulary", &stats.vocabulary);
            });
            ui.label(
                RichText::new(format!("{} items in total", stats.total()))
                    .color(TEXT_SECONDARY)
                    .small(),
            );
            ui.add_space(8.0);
        }

        egui::CollapsingHeader::new(RichText::new("Categories").color(ACCENT).strong())
            .default_open(true)
            .show(ui, |ui| categories_section(ui, library, &mut actions));

        egui::CollapsingHeader::new(RichText::new("Grammar lessons").color(ACCENT).strong())
            .show(ui, |ui| {
                if library.grammar.is_empty() {
                    empty(ui);
                }
                for lesson in &library.grammar {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(&lesson.title).color(TEXT_PRIMARY));
                        if let Some(category) = &lesson.category {
                            ui.label(RichText::new(&category.name).color(TEXT_SECONDARY).small());
                        }
                        if lesson.estimated_duration > 0 {
                            ui.label(
                                RichText::new(format!("{} min", lesson.estimated_duration))
                                    .color(TEXT_SECONDARY)
                                    .small(),
                            );
                        }
                    });
                }
            });

        egui::CollapsingHeader::new(RichText::new("Video lessons").color(ACCENT).strong())
            .show(ui, |ui| {
                if library.videos.is_empty() {
                    empty(ui);
                }
                for video in &library.videos {
                    ui.horizontal(|ui| {
                        ui.hyperlink_to(video.title.as_str(), &video.video_url);
                        ui.label(RichText::new(video.level.label()).color(TEXT_SECONDARY).small());
                        ui.label(
                            RichText::new(format!("{} views", video.views_count))
                                .color(TEXT_SECONDARY)
                                .small(),
                        );
                    });
                }
            });

        egui::CollapsingHeader::new(RichText::new("Vocabulary").color(ACCENT).strong())
            .show(ui, |ui| {
                if library.vocabulary.is_empty() {
                    empty(ui);
                }
                egui::Grid::new("vocabulary_grid").striped(true).show(ui, |ui| {
                    for word in &library.vocabulary {
                        ui.label(RichText::new(&word.english_word).color(TEXT_PRIMARY));
                        ui.label(RichText::new(&word.turkmen_word).color(TEXT_SECONDARY));
                        ui.label(RichText::new(word.level.label()).color(TEXT_SECONDARY).small());
                        ui.end_row();
                    }
                });
            });
    });

    actions
}

fn categories_section(ui: &mut egui::Ui, library: &LibraryState, actions: &mut Vec<LibraryAction>) {
    ui.horizontal(|ui| {
        let mut name = library.new_category.clone();
        let edit = ui.add(egui::TextEdit::singleline(&mut name).hint_text("New category"));
        if edit.changed() {
            actions.push(LibraryAction::EditNewCategory(name.clone()));
        }
        let can_create = !name.trim().is_empty();
        if ui.add_enabled(can_create, egui::Button::new("Add")).clicked() {
            actions.push(LibraryAction::CreateCategory);
        }
    });

    for category in &library.categories {
        ui.horizontal(|ui| match &library.editing {
            Some((id, buffer)) if *id == category.id => {
                let mut name = buffer.clone();
                if ui.text_edit_singleline(&mut name).changed() {
                    actions.push(LibraryAction::EditName(name));
                }
                if ui.small_button("Save").clicked() {
                    actions.push(LibraryAction::SaveEdit);
                }
                if ui.small_button("Cancel").clicked() {
                    actions.push(LibraryAction::CancelEdit);
                }
            }
            _ => {
                ui.label(RichText::new(&category.name).color(TEXT_PRIMARY));
                if ui.small_button("Rename").clicked() {
                    actions.push(LibraryAction::BeginEdit(category.id));
                }
                if ui.small_button("Delete").clicked() {
                    actions.push(LibraryAction::DeleteCategory(category.id));
                }
            }
        });
    }
}

fn stat_card(ui: &mut egui::Ui, label: &str, stats: &StatsResponse) {
    egui::Frame::default()
        .fill(BG_SECONDARY)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                ui.label(RichText::new(label).color(TEXT_SECONDARY).small());
                ui.label(RichText::new(stats.total.to_string()).color(TEXT_PRIMARY).heading());
            });
        });
}

fn empty(ui: &mut egui::Ui) {
    ui.label(RichText::new("Nothing here yet").color(TEXT_SECONDARY).small().italics());
}
