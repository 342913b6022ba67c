//! Colours and spacing for the tutor UI (a dark slate palette with an
//! indigo accent), and the notice-level mapping used by toasts.

use egui::{Color32, CornerRadius, FontId, Stroke, TextStyle, Vec2};
use tutor_types::event::NoticeLevel;

pub const BG_PRIMARY: Color32 = Color32::from_rgb(15, 23, 42);
pub const BG_SECONDARY: Color32 = Color32::from_rgb(30, 41, 59);
pub const BG_SURFACE: Color32 = Color32::from_rgb(51, 65, 85);
/// Learner's own bubbles
pub const BG_USER: Color32 = Color32::from_rgb(49, 46, 129);
pub const BG_FAILED: Color32 = Color32::from_rgb(69, 26, 26);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(241, 245, 249);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(148, 163, 184);

pub const ACCENT: Color32 = Color32::from_rgb(79, 70, 229);
pub const SUCCESS: Color32 = Color32::from_rgb(16, 185, 129);
pub const INFO: Color32 = Color32::from_rgb(14, 165, 233);
pub const WARNING: Color32 = Color32::from_rgb(245, 158, 11);
pub const ERROR: Color32 = Color32::from_rgb(244, 63, 94);

pub const PANEL_ROUNDING: CornerRadius = CornerRadius::same(8);
pub const PANEL_PADDING: Vec2 = Vec2::new(14.0, 10.0);

pub fn notice_color(level: NoticeLevel) -> Color32 {
    match level {
        NoticeLevel::Success => SUCCESS,
        NoticeLevel::Info => INFO,
        NoticeLevel::Warning => WARNING,
        NoticeLevel::Error => ERROR,
    }
}

/// Install the palette and a slightly larger body font on the context.
pub fn apply_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    let visuals = &mut style.visuals;
    visuals.dark_mode = true;
    visuals.panel_fill = BG_PRIMARY;
    visuals.window_fill = BG_SECONDARY;
    visuals.extreme_bg_color = BG_SECONDARY;
    visuals.hyperlink_color = INFO;
    visuals.window_corner_radius = PANEL_ROUNDING;

    for widget in [
        &mut visuals.widgets.inactive,
        &mut visuals.widgets.hovered,
        &mut visuals.widgets.active,
    ] {
        widget.corner_radius = PANEL_ROUNDING;
    }
    visuals.widgets.inactive.weak_bg_fill = BG_SURFACE;
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, TEXT_SECONDARY);
    visuals.widgets.hovered.weak_bg_fill = BG_SURFACE;
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);
    visuals.widgets.active.weak_bg_fill = ACCENT;
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);

    visuals.selection.bg_fill = ACCENT.gamma_multiply(0.5);
    visuals.selection.stroke = Stroke::new(1.0, TEXT_PRIMARY);

    style.text_styles.insert(TextStyle::Body, FontId::proportional(15.0));
    style.spacing.item_spacing = Vec2::new(8.0, 6.0);
    style.spacing.button_padding = Vec2::new(10.0, 4.0);

    ctx.set_style(style);
}
