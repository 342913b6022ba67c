//! Login panel: email/password form shown while signed out.

use egui::{self, Align, Layout, RichText, Vec2};
use crate::state::LoginForm;
use crate::theme::*;

#[derive(Debug, Clone, PartialEq)]
pub enum LoginAction {
    Submit { email: String, password: String },
}

/// Render the login form. Returns an action when the user submits.
pub fn login_panel(ui: &mut egui::Ui, form: &mut LoginForm) -> Option<LoginAction> {
    let mut submit = false;

    ui.with_layout(Layout::top_down(Align::Center), |ui| {
        ui.add_space(ui.available_height() * 0.15);
        egui::Frame::default()
            .fill(BG_SECONDARY)
            .inner_margin(PANEL_PADDING)
            .corner_radius(PANEL_ROUNDING)
            .show(ui, |ui| {
                ui.set_max_width(320.0);
                ui.heading(RichText::new("English Tutor").color(TEXT_PRIMARY).strong());
                ui.label(RichText::new("Sign in to continue").color(TEXT_SECONDARY).small());
                ui.separator();

                ui.label(RichText::new("Email").color(TEXT_SECONDARY).small());
                ui.add(
                    egui::TextEdit::singleline(&mut form.email)
                        .hint_text("you@example.com")
                        .desired_width(f32::INFINITY),
                );

                ui.label(RichText::new("Password").color(TEXT_SECONDARY).small());
                let password = ui.add(
                    egui::TextEdit::singleline(&mut form.password)
                        .password(true)
                        .desired_width(f32::INFINITY),
                );
                if password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submit = true;
                }

                if let Some(error) = &form.error {
                    ui.label(RichText::new(error).color(ERROR).small());
                }

                ui.add_space(8.0);
                let label = if form.submitting { "Signing in..." } else { "Sign in" };
                let btn = ui.add_enabled(
                    form.can_submit(),
                    egui::Button::new(RichText::new(label).color(TEXT_PRIMARY).strong())
                        .fill(ACCENT)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(120.0, 28.0)),
                );
                if btn.clicked() {
                    submit = true;
                }
            });
    });

    if submit && form.can_submit() {
        form.submitting = true;
        form.error = None;
        Some(LoginAction::Submit {
            email: form.email.trim().to_string(),
            password: form.password.clone(),
        })
    } else {
        None
    }
}
