//! Settings panel: learning preferences for the active session, plus the
//! client connection config with an explicit Save button.

use egui::{self, RichText, Vec2};
use tutor_core::chat::ChatState;
use tutor_types::config::{StorageBackendType, TutorConfig};
use tutor_types::session::{LearningFocus, ProficiencyLevel};
use crate::theme::*;

#[derive(Debug, Clone, PartialEq)]
pub enum LearningAction {
    SetProficiency(ProficiencyLevel),
    SetFocus(LearningFocus),
    /// Persist the current choice to the active session
    Save,
}

/// What the caller should do after rendering the connection settings
pub enum SettingsAction {
    /// Nothing changed
    None,
    /// A field was changed
    Changed,
    /// The user clicked the explicit Save button
    SaveClicked,
}

/// Save feedback passed in from the app layer
#[derive(Clone)]
pub struct SaveFeedback {
    pub message: String,
    pub success: bool,
}

pub fn learning_panel(ui: &mut egui::Ui, chat: &ChatState) -> Vec<LearningAction> {
    let mut actions = Vec::new();

    ui.label(RichText::new("Learning").color(ACCENT).strong());
    ui.add_space(2.0);

    ui.label(RichText::new("Proficiency level").color(TEXT_SECONDARY).small());
    let mut level = chat.proficiency;
    egui::ComboBox::from_id_salt("proficiency_level")
        .selected_text(level.label())
        .show_ui(ui, |ui| {
            for l in ProficiencyLevel::all() {
                ui.selectable_value(&mut level, *l, l.label());
            }
        });
    if level != chat.proficiency {
        actions.push(LearningAction::SetProficiency(level));
    }

    ui.add_space(4.0);

    ui.label(RichText::new("Learning focus").color(TEXT_SECONDARY).small());
    let mut focus = chat.focus;
    egui::ComboBox::from_id_salt("learning_focus")
        .selected_text(focus.label())
        .show_ui(ui, |ui| {
            for f in LearningFocus::all() {
                ui.selectable_value(&mut focus, *f, f.label());
            }
        });
    if focus != chat.focus {
        actions.push(LearningAction::SetFocus(focus));
    }

    ui.add_space(8.0);
    let can_save = chat.active.is_some();
    let btn = ui.add_enabled(
        can_save,
        egui::Button::new(RichText::new("Update session").color(TEXT_PRIMARY))
            .fill(ACCENT)
            .corner_radius(PANEL_ROUNDING),
    );
    if btn.clicked() {
        actions.push(LearningAction::Save);
    }
    if !can_save {
        ui.label(
            RichText::new("Applies to your next conversation.")
                .color(TEXT_SECONDARY)
                .small()
                .italics(),
        );
    }

    actions
}

/// Render the connection settings. Returns an action for the caller to handle.
pub fn connection_panel(
    ui: &mut egui::Ui,
    config: &mut TutorConfig,
    save_feedback: Option<&SaveFeedback>,
) -> SettingsAction {
    let mut changed = false;
    let mut save_clicked = false;

    ui.label(RichText::new("Connection").color(ACCENT).strong());
    ui.add_space(2.0);

    ui.label(RichText::new("API base URL").color(TEXT_SECONDARY).small());
    if ui.text_edit_singleline(&mut config.api_base_url).changed() {
        changed = true;
    }

    ui.label(RichText::new("Request timeout (ms)").color(TEXT_SECONDARY).small());
    if ui
        .add(egui::Slider::new(&mut config.request_timeout_ms, 1_000..=120_000))
        .changed()
    {
        changed = true;
    }

    ui.label(RichText::new("Cache lifetime (s)").color(TEXT_SECONDARY).small());
    if ui
        .add(egui::Slider::new(&mut config.cache.default_ttl_secs, 0..=3_600))
        .changed()
    {
        changed = true;
    }

    ui.add_space(4.0);
    ui.label(RichText::new("Storage").color(TEXT_SECONDARY).small());
    egui::ComboBox::from_id_salt("storage_backend")
        .selected_text(storage_label(&config.storage.backend))
        .show_ui(ui, |ui| {
            for backend in storage_options() {
                let label = storage_label(&backend);
                if ui
                    .selectable_value(&mut config.storage.backend, backend, label)
                    .changed()
                {
                    changed = true;
                }
            }
        });
    ui.label(
        RichText::new(storage_description(&config.storage.backend))
            .color(TEXT_SECONDARY)
            .small()
            .italics(),
    );

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        let btn = ui.add(
            egui::Button::new(RichText::new("Save Settings").color(TEXT_PRIMARY).strong())
                .fill(ACCENT)
                .corner_radius(PANEL_ROUNDING)
                .min_size(Vec2::new(120.0, 28.0)),
        );
        if btn.clicked() {
            save_clicked = true;
        }

        if let Some(fb) = save_feedback {
            let color = if fb.success { SUCCESS } else { ERROR };
            ui.label(RichText::new(&fb.message).color(color).small());
        }
    });

    if save_clicked {
        SettingsAction::SaveClicked
    } else if changed {
        SettingsAction::Changed
    } else {
        SettingsAction::None
    }
}

pub fn storage_label(backend: &StorageBackendType) -> &'static str {
    match backend {
        StorageBackendType::Auto => "Auto-detect",
        StorageBackendType::Memory => "Memory",
        StorageBackendType::LocalStorage => "localStorage",
    }
}

fn storage_description(backend: &StorageBackendType) -> &'static str {
    match backend {
        StorageBackendType::Auto => "Uses localStorage when the browser allows it, memory otherwise.",
        StorageBackendType::Memory => "Nothing survives a reload; you sign in every visit.",
        StorageBackendType::LocalStorage => "Keeps you signed in across reloads.",
    }
}

fn storage_options() -> Vec<StorageBackendType> {
    vec![
        StorageBackendType::Auto,
        StorageBackendType::Memory,
        StorageBackendType::LocalStorage,
    ]
}
