//! Toast overlay in the bottom-right corner.

use egui::{self, Align2, RichText};
use crate::state::Toast;
use crate::theme::*;

pub fn notices_overlay(ctx: &egui::Context, toasts: &[Toast]) {
    if toasts.is_empty() {
        return;
    }

    egui::Area::new(egui::Id::new("notices"))
        .anchor(Align2::RIGHT_BOTTOM, [-16.0, -36.0])
        .order(egui::Order::Foreground)
        .interactable(false)
        .show(ctx, |ui| {
            for toast in toasts {
                let color = notice_color(toast.notice.level);
                egui::Frame::default()
                    .fill(BG_SECONDARY)
                    .stroke(egui::Stroke::new(1.0, color))
                    .corner_radius(PANEL_ROUNDING)
                    .inner_margin(PANEL_PADDING)
                    .show(ui, |ui| {
                        ui.set_max_width(280.0);
                        ui.label(RichText::new(&toast.notice.text).color(color));
                    });
                ui.add_space(4.0);
            }
        });
}
