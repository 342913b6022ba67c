//! Main egui application: composes all panels and dispatches user actions
//! to the session and library managers.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};

use tutor_core::auth::AuthStore;
use tutor_core::cache::ResponseCache;
use tutor_core::chat::ChatManager;
use tutor_core::client::ApiClient;
use tutor_core::content::ContentApi;
use tutor_core::event_bus::EventBus;
use tutor_core::library::LibraryManager;
use tutor_core::ports::{ChatPort, ClockPort, HttpPort, StoragePort, SystemClock};
use tutor_core::prefetch::Prefetcher;
use tutor_platform::http::FetchHttp;
use tutor_platform::storage::{auto_detect_storage, open_storage};
use tutor_types::config::{TutorConfig, CONFIG_STORAGE_KEY};
use tutor_types::event::TutorEvent;
use tutor_types::TutorError;
use tutor_ui::panels::chat::{chat_panel, ChatAction};
use tutor_ui::panels::library::{library_panel, LibraryAction};
use tutor_ui::panels::login::{login_panel, LoginAction};
use tutor_ui::panels::notices::notices_overlay;
use tutor_ui::panels::sessions::{sessions_panel, SessionAction};
use tutor_ui::panels::settings::{
    connection_panel, learning_panel, LearningAction, SaveFeedback, SettingsAction,
};
use tutor_ui::state::{Screen, UiState};
use tutor_ui::theme;

const TOAST_TICK: Duration = Duration::from_millis(250);

/// Read the saved client config, falling back to defaults.
pub async fn restore_config(prefs: &dyn StoragePort) -> TutorConfig {
    match prefs.get(CONFIG_STORAGE_KEY).await {
        Ok(Some(data)) => match serde_json::from_slice::<TutorConfig>(&data) {
            Ok(config) => {
                log::info!("Config restored from {}", prefs.backend_name());
                config
            }
            Err(e) => {
                log::warn!("Saved config is unreadable ({}), using defaults", e);
                TutorConfig::default()
            }
        },
        Ok(None) => TutorConfig::default(),
        Err(e) => {
            log::warn!("Could not read saved config: {}", e);
            TutorConfig::default()
        }
    }
}

/// The main application state
pub struct TutorApp {
    ui_state: UiState,
    config: TutorConfig,
    /// Where the client config itself is kept
    prefs: Rc<dyn StoragePort>,
    event_bus: EventBus,
    api: Rc<ApiClient>,
    chat: ChatManager,
    library: LibraryManager,
    prefetcher: Prefetcher,
    /// Error text from the last login attempt, written by the async task
    login_error: Rc<RefCell<Option<String>>>,
    save_feedback: Option<SaveFeedback>,
    first_frame: bool,
}

impl TutorApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: TutorConfig,
        prefs: Rc<dyn StoragePort>,
    ) -> Self {
        let event_bus = EventBus::new();

        let storage = match open_storage(&config.storage.backend) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Configured storage unavailable: {}. Auto-detecting.", e);
                auto_detect_storage()
            }
        };
        let http: Rc<dyn HttpPort> = Rc::new(FetchHttp::new(&config));
        let clock: Rc<dyn ClockPort> = Rc::new(SystemClock);
        let cache = ResponseCache::new(&config.cache, clock.clone());

        let api = Rc::new(ApiClient::new(
            http,
            AuthStore::new(storage),
            cache,
            event_bus.clone(),
        ));
        let chat_port: Rc<dyn ChatPort> = api.clone();
        let chat = ChatManager::new(chat_port, event_bus.clone(), clock, config.learning);
        let library = LibraryManager::new(ContentApi::new(api.clone()), event_bus.clone());
        let prefetcher = Prefetcher::new(api.clone());

        let app = Self {
            ui_state: UiState::new(),
            config,
            prefs,
            event_bus,
            api,
            chat,
            library,
            prefetcher,
            login_error: Rc::new(RefCell::new(None)),
            save_feedback: None,
            first_frame: true,
        };

        // SignedIn from a restored session starts the initial loads
        Self::restore_session(app.api.clone());

        app
    }

    fn restore_session(api: Rc<ApiClient>) {
        wasm_bindgen_futures::spawn_local(async move {
            match api.restore_session().await {
                Ok(Some(user)) => log::info!("Session restored for {}", user.username),
                Ok(None) => log::info!("No stored session"),
                Err(e) => log::warn!("Session restore failed: {}", e),
            }
        });
    }

    /// Save config to storage (async, fire-and-forget)
    fn save_config(prefs: Rc<dyn StoragePort>, config: &TutorConfig) -> Result<(), String> {
        let json = serde_json::to_vec(config).map_err(|e| e.to_string())?;
        wasm_bindgen_futures::spawn_local(async move {
            match prefs.set(CONFIG_STORAGE_KEY, &json).await {
                Ok(()) => log::info!("Config saved to storage"),
                Err(e) => log::error!("Config save failed: {}", e),
            }
        });
        Ok(())
    }

    /// Run `fut` on the local executor and repaint when it finishes.
    fn spawn(ctx: &egui::Context, fut: impl Future<Output = ()> + 'static) {
        let ctx = ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            fut.await;
            ctx.request_repaint();
        });
    }

    /// React to session events before the UI state sees them.
    fn handle_lifecycle(&self, events: &[TutorEvent], ctx: &egui::Context) {
        for event in events {
            match event {
                TutorEvent::SignedIn { .. } => self.on_signed_in(ctx),
                TutorEvent::SignedOut | TutorEvent::SessionExpired => {
                    self.chat.reset(self.config.learning);
                    self.library.reset();
                }
                _ => {}
            }
        }
    }

    fn on_signed_in(&self, ctx: &egui::Context) {
        let chat = self.chat.clone();
        Self::spawn(ctx, async move { chat.load_sessions().await });

        let prefetcher = self.prefetcher.clone();
        let level = self.config.learning.proficiency;
        Self::spawn(ctx, async move {
            let (dashboard, practice) = futures::join!(
                prefetcher.prefetch_dashboard(),
                prefetcher.prefetch_vocabulary_practice(Some(level)),
            );
            log::debug!("Warmed {} dashboard and {} practice endpoints", dashboard, practice);
        });
    }
}

impl eframe::App for TutorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            self.first_frame = false;
        }

        let now = ctx.input(|i| i.time);

        // Drain events from the managers
        let events = self.event_bus.drain();
        if !events.is_empty() {
            self.handle_lifecycle(&events, ctx);
            self.ui_state.process_events(events, now);
            ctx.request_repaint();
        }

        if let Some(error) = self.login_error.borrow_mut().take() {
            self.ui_state.login.submitting = false;
            self.ui_state.login.error = Some(error);
        }

        if self.ui_state.expire_toasts(now) {
            ctx.request_repaint_after(TOAST_TICK);
        }

        self.top_bar(ctx);
        self.status_bar(ctx);

        match self.ui_state.screen {
            Screen::Login => self.login_screen(ctx),
            Screen::Chat => self.chat_screen(ctx),
            Screen::Library => self.library_screen(ctx),
        }

        notices_overlay(ctx, &self.ui_state.toasts);
    }
}

// ─── Screens ─────────────────────────────────────────────────

impl TutorApp {
    fn top_bar(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new("English Tutor")
                        .strong()
                        .color(theme::ACCENT)
                        .size(16.0),
                );
                if !self.ui_state.is_signed_in() {
                    return;
                }

                ui.separator();
                let screen = self.ui_state.screen;
                if ui.selectable_label(screen == Screen::Chat, "Chat").clicked() {
                    self.ui_state.go_to(Screen::Chat);
                }
                if ui.selectable_label(screen == Screen::Library, "Library").clicked()
                    && screen != Screen::Library
                {
                    self.ui_state.go_to(Screen::Library);
                    let library = self.library.clone();
                    Self::spawn(ctx, async move { library.load().await });
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Log out").clicked() {
                        let api = self.api.clone();
                        Self::spawn(ctx, async move { api.logout().await });
                    }
                    if ui
                        .selectable_label(self.ui_state.show_settings, "Settings")
                        .clicked()
                    {
                        self.ui_state.show_settings = !self.ui_state.show_settings;
                    }
                    if let Some(name) = &self.ui_state.username {
                        ui.label(RichText::new(name).color(theme::TEXT_SECONDARY));
                    }
                });
            });
        });
    }

    fn status_bar(&self, ctx: &egui::Context) {
        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(&self.ui_state.status_text)
                        .color(theme::TEXT_SECONDARY)
                        .small(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let stats = self.api.cache_stats();
                    ui.label(
                        RichText::new(format!("cache: {} entries", stats.size))
                            .color(theme::TEXT_SECONDARY)
                            .small(),
                    );
                });
            });
        });
    }

    fn login_screen(&mut self, ctx: &egui::Context) {
        let mut submitted = None;
        CentralPanel::default().show(ctx, |ui| {
            submitted = login_panel(ui, &mut self.ui_state.login);
        });

        if let Some(LoginAction::Submit { email, password }) = submitted {
            let api = self.api.clone();
            let slot = self.login_error.clone();
            Self::spawn(ctx, async move {
                if let Err(e) = api.login(&email, &password).await {
                    log::warn!("Login failed: {}", e);
                    let text = match e {
                        TutorError::Auth(message) => message,
                        other => other.to_string(),
                    };
                    *slot.borrow_mut() = Some(text);
                }
            });
        }
    }

    fn chat_screen(&mut self, ctx: &egui::Context) {
        let session_actions = SidePanel::left("sessions_panel")
            .min_width(200.0)
            .max_width(280.0)
            .show(ctx, |ui| {
                let state = self.chat.state();
                sessions_panel(ui, &state)
            })
            .inner;
        for action in session_actions {
            self.dispatch_session(action, ctx);
        }

        if self.ui_state.show_settings {
            self.settings_side_panel(ctx);
        }

        let chat_actions = CentralPanel::default()
            .show(ctx, |ui| {
                let state = self.chat.state();
                chat_panel(ui, &state)
            })
            .inner;
        for action in chat_actions {
            self.dispatch_chat(action, ctx);
        }
    }

    fn settings_side_panel(&mut self, ctx: &egui::Context) {
        let mut learning_actions = Vec::new();
        let mut settings_action = SettingsAction::None;

        SidePanel::right("settings_panel")
            .min_width(260.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                learning_actions = {
                    let state = self.chat.state();
                    learning_panel(ui, &state)
                };
                ui.separator();
                settings_action =
                    connection_panel(ui, &mut self.config, self.save_feedback.as_ref());
            });

        for action in learning_actions {
            self.dispatch_learning(action, ctx);
        }

        match settings_action {
            SettingsAction::None => {}
            SettingsAction::Changed => self.save_feedback = None,
            SettingsAction::SaveClicked => {
                self.save_feedback = Some(
                    match Self::save_config(self.prefs.clone(), &self.config) {
                        Ok(()) => SaveFeedback {
                            message: "Saved. Reload the page to apply.".to_string(),
                            success: true,
                        },
                        Err(e) => SaveFeedback {
                            message: format!("Save failed: {}", e),
                            success: false,
                        },
                    },
                );
            }
        }
    }

    fn library_screen(&mut self, ctx: &egui::Context) {
        let actions = CentralPanel::default()
            .show(ctx, |ui| {
                let state = self.library.state();
                library_panel(ui, &state)
            })
            .inner;
        for action in actions {
            self.dispatch_library(action, ctx);
        }
    }
}

// ─── Dispatch ────────────────────────────────────────────────

impl TutorApp {
    fn dispatch_session(&self, action: SessionAction, ctx: &egui::Context) {
        let chat = self.chat.clone();
        match action {
            SessionAction::New => Self::spawn(ctx, async move { chat.create_session().await }),
            SessionAction::Select(id) => {
                Self::spawn(ctx, async move { chat.select_session(id).await })
            }
            SessionAction::BeginRename(id) => chat.begin_rename(id),
            SessionAction::EditTitle(title) => chat.set_rename_draft(title),
            SessionAction::CommitRename { id, title } => {
                Self::spawn(ctx, async move { chat.rename_session(id, &title).await })
            }
            SessionAction::CancelRename => chat.cancel_rename(),
            SessionAction::Delete(id) => {
                Self::spawn(ctx, async move { chat.delete_session(id).await })
            }
        }
    }

    fn dispatch_chat(&self, action: ChatAction, ctx: &egui::Context) {
        let chat = self.chat.clone();
        match action {
            ChatAction::EditDraft(text) => chat.set_draft(text),
            ChatAction::QuickPrompt(index) => chat.use_quick_prompt(index),
            ChatAction::Send => Self::spawn(ctx, async move { chat.send_message().await }),
            ChatAction::Reload => Self::spawn(ctx, async move { chat.reload_history().await }),
        }
    }

    fn dispatch_learning(&self, action: LearningAction, ctx: &egui::Context) {
        let chat = self.chat.clone();
        match action {
            LearningAction::SetProficiency(level) => chat.set_proficiency(level),
            LearningAction::SetFocus(focus) => chat.set_focus(focus),
            LearningAction::Save => Self::spawn(ctx, async move { chat.save_settings().await }),
        }
    }

    fn dispatch_library(&self, action: LibraryAction, ctx: &egui::Context) {
        let library = self.library.clone();
        match action {
            LibraryAction::Reload => Self::spawn(ctx, async move { library.load().await }),
            LibraryAction::EditNewCategory(name) => library.set_new_category(name),
            LibraryAction::CreateCategory => {
                Self::spawn(ctx, async move { library.create_category().await })
            }
            LibraryAction::BeginEdit(id) => library.begin_edit(id),
            LibraryAction::EditName(name) => library.set_edit_buffer(name),
            LibraryAction::SaveEdit => Self::spawn(ctx, async move { library.save_edit().await }),
            LibraryAction::CancelEdit => library.cancel_edit(),
            LibraryAction::DeleteCategory(id) => {
                Self::spawn(ctx, async move { library.delete_category(id).await })
            }
        }
    }
}
