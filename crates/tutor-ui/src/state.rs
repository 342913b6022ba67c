//! UI-level state that drives rendering.
//! Screen routing, toasts and the login form, updated each frame by
//! draining the EventBus. Chat and library data are read straight from their
//! managers.

use tutor_types::event::{Notice, TutorEvent};

pub const SESSION_EXPIRED_TEXT: &str = "Your session has expired. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Chat,
    Library,
}

/// A notice on screen until `expires_at` (seconds, egui input time).
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub notice: Notice,
    pub expires_at: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub submitting: bool,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn can_submit(&self) -> bool {
        !self.submitting && !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

/// State visible to UI panels
pub struct UiState {
    pub screen: Screen,
    pub toasts: Vec<Toast>,
    pub login: LoginForm,
    /// Signed-in user's name for the top bar
    pub username: Option<String>,
    /// Whether the learning/connection settings panel is open
    pub show_settings: bool,
    /// Status line text
    pub status_text: String,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Login,
            toasts: Vec::new(),
            login: LoginForm::default(),
            username: None,
            show_settings: false,
            status_text: "Ready".to_string(),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.username.is_some()
    }

    /// Process events from the EventBus and update UI state
    pub fn process_events(&mut self, events: Vec<TutorEvent>, now: f64) {
        for event in events {
            match event {
                TutorEvent::Notice(notice) => self.push_toast(notice, now),
                TutorEvent::SessionExpired => {
                    log::info!("session expired, back to login");
                    self.username = None;
                    self.screen = Screen::Login;
                    self.login.submitting = false;
                    self.login.password.clear();
                    self.login.error = Some(SESSION_EXPIRED_TEXT.to_string());
                    self.status_text = "Signed out".to_string();
                }
                TutorEvent::DraftRestored { .. } => {
                    self.status_text = "Message not sent, draft restored".to_string();
                }
                TutorEvent::SignedIn { username } => {
                    self.status_text = format!("Signed in as {}", username);
                    self.username = Some(username);
                    self.login = LoginForm::default();
                    if self.screen == Screen::Login {
                        self.screen = Screen::Chat;
                    }
                }
                TutorEvent::SignedOut => {
                    self.username = None;
                    self.screen = Screen::Login;
                    self.login = LoginForm::default();
                    self.status_text = "Signed out".to_string();
                }
            }
        }
    }

    pub fn push_toast(&mut self, notice: Notice, now: f64) {
        let expires_at = now + notice.duration_secs;
        self.toasts.push(Toast { notice, expires_at });
    }

    /// Drop toasts whose time is up. Returns whether any are still shown.
    pub fn expire_toasts(&mut self, now: f64) -> bool {
        self.toasts.retain(|t| t.expires_at > now);
        !self.toasts.is_empty()
    }

    /// Navigate, refusing anything but the login screen while signed out.
    pub fn go_to(&mut self, screen: Screen) {
        self.screen = if self.is_signed_in() { screen } else { Screen::Login };
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
