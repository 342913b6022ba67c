//! Chat session manager: the session list, the active conversation and the
//! learning settings that steer the tutor.
//!
//! State machine: `NoSession → SessionActive → (SessionActive | NoSession)`.
//! `ChatState::active` is `None` in `NoSession`.
//!
//! Operations are `async` and meant to be spawned with `spawn_local`; several
//! can be in flight at once. State lives behind `Rc<RefCell<..>>` and is never
//! borrowed across an `.await`, so every response re-checks whether the
//! session it belongs to is still the active one before touching the
//! timeline.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tutor_types::{
    ErrorKind, TutorError,
    config::LearningDefaults,
    event::{Notice, TutorEvent},
    message::{ChatMessage, Role, SendMessageRequest, TimelineEntry, USAGE_LIMIT_APOLOGY},
    session::{
        ChatSession, DEFAULT_SESSION_TITLE, LearningFocus, ProficiencyLevel, SessionCreate,
        SessionStats, SessionUpdate,
    },
};
use uuid::Uuid;

use crate::event_bus::EventBus;
use crate::ports::{ChatPort, ClockPort};

/// Canned openers offered under an empty conversation.
pub const QUICK_PROMPTS: &[&str] = &[
    "Create a grammar exercise for my level",
    "Give me a vocabulary exercise to practice",
    "Let's practice conversation in English",
    "Help me improve my pronunciation",
    "Give me a writing exercise to practice",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    /// Server order.
    pub sessions: Vec<ChatSession>,
    pub active: Option<u64>,
    pub timeline: Vec<TimelineEntry>,
    /// Session whose history `timeline` currently holds.
    pub history_for: Option<u64>,
    pub proficiency: ProficiencyLevel,
    pub focus: LearningFocus,
    pub draft: String,
    /// Session whose title is being edited, with the edit buffer.
    pub renaming: Option<(u64, String)>,
    pub loading_sessions: bool,
    pub loading_messages: bool,
    pub sending: bool,
    /// Bumped by every reset; replies started under an older generation
    /// are dropped.
    pub generation: u64,
}

impl ChatState {
    pub fn active_session(&self) -> Option<&ChatSession> {
        let id = self.active?;
        self.sessions.iter().find(|s| s.id == id)
    }

    fn adopt_settings_of(&mut self, id: u64) {
        if let Some(s) = self.sessions.iter().find(|s| s.id == id) {
            self.proficiency = s.proficiency_level;
            self.focus = s.learning_focus;
        }
    }

    fn session_mut(&mut self, id: u64) -> Option<&mut ChatSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    fn entry_mut(&mut self, local_id: Uuid) -> Option<&mut TimelineEntry> {
        self.timeline
            .iter_mut()
            .find(|e| e.local_id() == Some(local_id))
    }
}

#[derive(Clone, Copy)]
pub(crate) enum Flag {
    Sessions,
    Messages,
    Sending,
}

impl Flag {
    fn name(self) -> &'static str {
        match self {
            Flag::Sessions => "loading_sessions",
            Flag::Messages => "loading_messages",
            Flag::Sending => "sending",
        }
    }

    fn slot(self, state: &mut ChatState) -> &mut bool {
        match self {
            Flag::Sessions => &mut state.loading_sessions,
            Flag::Messages => &mut state.loading_messages,
            Flag::Sending => &mut state.sending,
        }
    }
}

/// Raises a loading flag and lowers it again when dropped, on every exit
/// path.
pub(crate) struct LoadingGuard {
    state: Rc<RefCell<ChatState>>,
    flag: Flag,
}

impl LoadingGuard {
    pub(crate) fn raise(state: &Rc<RefCell<ChatState>>, flag: Flag) -> Self {
        *flag.slot(&mut state.borrow_mut()) = true;
        Self {
            state: state.clone(),
            flag,
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        match self.state.try_borrow_mut() {
            Ok(mut state) => *self.flag.slot(&mut state) = false,
            Err(_) => log::warn!("chat state busy, {} flag left raised", self.flag.name()),
        }
    }
}

/// Shared chat manager: clone-cheap via Rc.
#[derive(Clone)]
pub struct ChatManager {
    api: Rc<dyn ChatPort>,
    events: EventBus,
    clock: Rc<dyn ClockPort>,
    state: Rc<RefCell<ChatState>>,
}

impl ChatManager {
    pub fn new(
        api: Rc<dyn ChatPort>,
        events: EventBus,
        clock: Rc<dyn ClockPort>,
        defaults: LearningDefaults,
    ) -> Self {
        let state = ChatState {
            proficiency: defaults.proficiency,
            focus: defaults.focus,
            ..ChatState::default()
        };
        Self {
            api,
            events,
            clock,
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Read access for rendering. Do not hold across an `.await`.
    pub fn state(&self) -> Ref<'_, ChatState> {
        self.state.borrow()
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    /// Forget everything, e.g. after logout.
    pub fn reset(&self, defaults: LearningDefaults) {
        let mut s = self.state.borrow_mut();
        *s = ChatState {
            proficiency: defaults.proficiency,
            focus: defaults.focus,
            generation: s.generation + 1,
            ..ChatState::default()
        };
    }

    fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    // ─── Draft & settings ────────────────────────────────────

    pub fn set_draft(&self, text: impl Into<String>) {
        self.state.borrow_mut().draft = text.into();
    }

    /// Put one of [`QUICK_PROMPTS`] into the draft.
    pub fn use_quick_prompt(&self, index: usize) {
        if let Some(prompt) = QUICK_PROMPTS.get(index) {
            self.set_draft(*prompt);
        }
    }

    /// Change the settings used for the next message. Not persisted until
    /// [`save_settings`](Self::save_settings).
    pub fn set_proficiency(&self, level: ProficiencyLevel) {
        self.state.borrow_mut().proficiency = level;
    }

    pub fn set_focus(&self, focus: LearningFocus) {
        self.state.borrow_mut().focus = focus;
    }

    /// Persist the current proficiency and focus to the active session.
    pub async fn save_settings(&self) {
        let (id, level, focus) = {
            let s = self.state.borrow();
            match s.active {
                Some(id) => (id, s.proficiency, s.focus),
                None => return,
            }
        };

        match self
            .api
            .update_session(id, SessionUpdate::settings(level, focus))
            .await
        {
            Ok(_) => {
                if let Some(session) = self.state.borrow_mut().session_mut(id) {
                    session.proficiency_level = level;
                    session.learning_focus = focus;
                }
                self.events.notify(Notice::success("Learning settings updated"));
            }
            Err(e) => {
                log::error!("failed to update settings of session {}: {}", id, e);
                self.events.notify(Notice::error("Failed to update settings"));
            }
        }
    }

    // ─── Session list ────────────────────────────────────────

    /// Fetch the session list. With nothing active yet, the first session is
    /// selected and its history loaded.
    pub async fn load_sessions(&self) {
        let generation = self.generation();
        let result = {
            let _guard = LoadingGuard::raise(&self.state, Flag::Sessions);
            self.api.list_sessions().await
        };

        if self.generation() != generation {
            log::debug!("dropping session list: chat state was reset");
            return;
        }
        let first = match result {
            Ok(sessions) => {
                log::info!("loaded {} chat sessions", sessions.len());
                let mut s = self.state.borrow_mut();
                s.sessions = sessions;
                match s.active {
                    None => s.sessions.first().map(|first| first.id),
                    Some(_) => None,
                }
            }
            Err(e) => {
                self.report(&e, "Failed to load chat sessions");
                return;
            }
        };

        if let Some(id) = first {
            self.select_session(id).await;
        }
    }

    /// Start a fresh session with the current settings and make it active.
    pub async fn create_session(&self) {
        let data = {
            let s = self.state.borrow();
            SessionCreate {
                title: Some(DEFAULT_SESSION_TITLE.to_string()),
                proficiency_level: Some(s.proficiency),
                learning_focus: Some(s.focus),
            }
        };

        let generation = self.generation();
        let result = self.api.create_session(data).await;
        if self.generation() != generation {
            log::debug!("dropping created session: chat state was reset");
            return;
        }
        match result {
            Ok(session) => {
                log::info!("created chat session {}", session.id);
                let mut s = self.state.borrow_mut();
                s.active = Some(session.id);
                s.history_for = Some(session.id);
                s.timeline.clear();
                s.sessions.push(session);
            }
            Err(e) => self.report(&e, "Failed to create new session"),
        }
    }

    /// Make `id` active, adopt its settings and load its history. Selecting
    /// the session that is already active and loaded does nothing.
    pub async fn select_session(&self, id: u64) {
        {
            let mut s = self.state.borrow_mut();
            if s.active == Some(id) && s.history_for == Some(id) {
                return;
            }
            s.active = Some(id);
            s.adopt_settings_of(id);
            s.timeline.clear();
            s.history_for = None;
        }
        self.load_history(id).await;
    }

    /// Re-fetch the active session's history from the server, replacing the
    /// optimistic timeline.
    pub async fn reload_history(&self) {
        let active = self.state.borrow().active;
        if let Some(id) = active {
            self.load_history(id).await;
        }
    }

    async fn load_history(&self, id: u64) {
        let generation = self.generation();
        let result = {
            let _guard = LoadingGuard::raise(&self.state, Flag::Messages);
            self.api.list_messages(id).await
        };
        if self.generation() != generation {
            log::debug!("dropping history of session {}: chat state was reset", id);
            return;
        }

        match result {
            Ok(messages) => {
                let mut s = self.state.borrow_mut();
                if s.active != Some(id) {
                    log::debug!("dropping history of session {}: no longer active", id);
                    return;
                }
                s.timeline = messages.into_iter().map(TimelineEntry::confirmed).collect();
                s.history_for = Some(id);
            }
            Err(e) => self.report(&e, "Failed to load messages"),
        }
    }

    // ─── Sending ─────────────────────────────────────────────

    /// Send the trimmed draft. The user's turn shows up immediately as a
    /// pending entry; the draft is handed back if the request fails.
    pub async fn send_message(&self) {
        let now = self.now_string();
        let (text, local_id, req) = {
            let mut s = self.state.borrow_mut();
            let text = s.draft.trim().to_string();
            if text.is_empty() || s.sending {
                return;
            }
            let local_id = Uuid::new_v4();
            s.timeline
                .push(TimelineEntry::pending_user(local_id, text.clone(), now.clone()));
            s.draft.clear();
            let req = SendMessageRequest {
                message: text.clone(),
                session_id: s.active,
                proficiency_level: Some(s.proficiency),
                learning_focus: Some(s.focus),
            };
            (text, local_id, req)
        };
        let sent_on = req.session_id;
        let generation = self.generation();

        let result = {
            let _guard = LoadingGuard::raise(&self.state, Flag::Sending);
            self.api.send_message(req).await
        };
        if self.generation() != generation {
            log::debug!("dropping reply: chat state was reset while sending");
            return;
        }

        match result {
            Ok(resp) => {
                let session_id = resp.session_id;
                {
                    let mut s = self.state.borrow_mut();
                    if s.active == sent_on {
                        if let Some(entry) = s.entry_mut(local_id) {
                            entry.confirm(None);
                        }
                        s.timeline.push(TimelineEntry::confirmed(ChatMessage {
                            id: resp.message_id,
                            role: Role::Assistant,
                            content: resp.response,
                            created_at: now.clone(),
                        }));
                        if sent_on.is_none() {
                            s.active = Some(session_id);
                            s.history_for = Some(session_id);
                            s.proficiency = resp.proficiency_level;
                            s.focus = resp.learning_focus;
                        }
                    } else {
                        log::debug!("reply for session {} arrived after switching away", session_id);
                    }
                    if let Some(session) = s.session_mut(session_id) {
                        session.updated_at = now;
                    }
                }
                if sent_on.is_none() {
                    self.refresh_sessions().await;
                }
            }
            Err(e) => {
                log::error!("failed to send message: {}", e);
                {
                    let mut s = self.state.borrow_mut();
                    let still_here = s.active == sent_on;
                    if let Some(entry) = s.entry_mut(local_id) {
                        entry.fail(e.server_message());
                    }
                    if s.draft.is_empty() {
                        s.draft = text.clone();
                    }
                    if still_here && e.kind() == ErrorKind::UsageLimit {
                        s.timeline
                            .push(TimelineEntry::synthetic(USAGE_LIMIT_APOLOGY, self.now_string()));
                    }
                }
                self.events.emit(TutorEvent::DraftRestored { text });
                self.notify_failure(&e, "Failed to send message. Please try again.");
            }
        }
    }

    /// Replace the list with the server's, keeping the active selection.
    async fn refresh_sessions(&self) {
        match self.api.list_sessions().await {
            Ok(sessions) => self.state.borrow_mut().sessions = sessions,
            Err(e) => log::warn!("failed to refresh chat sessions: {}", e),
        }
    }

    // ─── Rename ──────────────────────────────────────────────

    pub fn begin_rename(&self, id: u64) {
        let mut s = self.state.borrow_mut();
        let title = match s.sessions.iter().find(|x| x.id == id) {
            Some(session) => session.title.clone(),
            None => return,
        };
        s.renaming = Some((id, title));
    }

    pub fn set_rename_draft(&self, text: impl Into<String>) {
        if let Some((_, buf)) = self.state.borrow_mut().renaming.as_mut() {
            *buf = text.into();
        }
    }

    pub fn cancel_rename(&self) {
        self.state.borrow_mut().renaming = None;
    }

    /// Rename `id`. A blank title just leaves editing mode; editing mode is
    /// left whatever the outcome.
    pub async fn rename_session(&self, id: u64, title: &str) {
        let title = title.trim().to_string();
        if title.is_empty() {
            self.cancel_rename();
            return;
        }

        let result = self.api.update_session(id, SessionUpdate::title(title.clone())).await;
        let mut s = self.state.borrow_mut();
        if matches!(s.renaming, Some((editing, _)) if editing == id) {
            s.renaming = None;
        }
        match result {
            Ok(_) => {
                if let Some(session) = s.session_mut(id) {
                    session.title = title;
                }
            }
            Err(e) => {
                drop(s);
                self.report(&e, "Failed to update session title");
            }
        }
    }

    // ─── Delete ──────────────────────────────────────────────

    /// Delete `id` once the server confirms. If it was active, the first
    /// remaining session becomes active, or none if the list is now empty.
    pub async fn delete_session(&self, id: u64) {
        if let Err(e) = self.api.delete_session(id).await {
            self.report(&e, "Failed to delete session");
            return;
        }

        let next = {
            let mut s = self.state.borrow_mut();
            let Some(idx) = s.sessions.iter().position(|x| x.id == id) else {
                return;
            };
            s.sessions.remove(idx);
            if matches!(s.renaming, Some((editing, _)) if editing == id) {
                s.renaming = None;
            }
            if s.active == Some(id) {
                let fallback = s.sessions.first().map(|x| x.id);
                s.active = None;
                s.history_for = None;
                s.timeline.clear();
                fallback
            } else {
                None
            }
        };
        log::info!("deleted chat session {}", id);
        self.events.notify(Notice::success("Chat session deleted"));

        if let Some(next) = next {
            self.select_session(next).await;
        }
    }

    pub async fn stats(&self) -> Option<SessionStats> {
        match self.api.session_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                self.report(&e, "Failed to load chat statistics");
                None
            }
        }
    }

    // ─── Helpers ─────────────────────────────────────────────

    fn report(&self, e: &TutorError, fallback: &str) {
        log::error!("{}: {}", fallback, e);
        self.notify_failure(e, fallback);
    }

    /// Usage-limit failures get their own longer notice; auth failures are
    /// already surfaced by the session-expired event.
    fn notify_failure(&self, e: &TutorError, fallback: &str) {
        match e.kind() {
            ErrorKind::Auth => {}
            ErrorKind::UsageLimit => self.events.notify(Notice::usage_limit()),
            ErrorKind::Recoverable => self.events.notify(Notice::error(fallback)),
        }
    }

    fn now_string(&self) -> String {
        self.clock.now().to_rfc3339()
    }
}
