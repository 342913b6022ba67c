//! Library manager: categories, dashboard stats and the first page of each
//! lesson list, plus category create / rename / delete.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tutor_types::{
    ErrorKind, TutorError,
    content::{
        Category, CategoryInput, DashboardStats, GrammarLesson, ListParams, VideoLesson,
        VocabularyWord,
    },
    event::Notice,
};

use crate::content::ContentApi;
use crate::event_bus::EventBus;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryState {
    pub categories: Vec<Category>,
    pub stats: Option<DashboardStats>,
    pub grammar: Vec<GrammarLesson>,
    pub videos: Vec<VideoLesson>,
    pub vocabulary: Vec<VocabularyWord>,
    /// Name typed into the "new category" field.
    pub new_category: String,
    /// Category being renamed, with the edit buffer.
    pub editing: Option<(u64, String)>,
    pub loading: bool,
}

#[derive(Clone)]
pub struct LibraryManager {
    api: ContentApi,
    events: EventBus,
    state: Rc<RefCell<LibraryState>>,
}

impl LibraryManager {
    pub fn new(api: ContentApi, events: EventBus) -> Self {
        Self {
            api,
            events,
            state: Rc::new(RefCell::new(LibraryState::default())),
        }
    }

    pub fn state(&self) -> Ref<'_, LibraryState> {
        self.state.borrow()
    }

    pub fn reset(&self) {
        *self.state.borrow_mut() = LibraryState::default();
    }

    pub fn set_new_category(&self, name: impl Into<String>) {
        self.state.borrow_mut().new_category = name.into();
    }

    pub fn begin_edit(&self, id: u64) {
        let mut s = self.state.borrow_mut();
        if let Some(name) = s.categories.iter().find(|c| c.id == id).map(|c| c.name.clone()) {
            s.editing = Some((id, name));
        }
    }

    pub fn set_edit_buffer(&self, name: impl Into<String>) {
        if let Some((_, buf)) = self.state.borrow_mut().editing.as_mut() {
            *buf = name.into();
        }
    }

    pub fn cancel_edit(&self) {
        self.state.borrow_mut().editing = None;
    }

    /// Load everything the library screen shows. Each part fails on its own.
    pub async fn load(&self) {
        self.state.borrow_mut().loading = true;
        let all = ListParams::default();
        let first_page = ListParams::page(1);

        let (categories, grammar, videos, vocabulary, stats) = futures::join!(
            self.api.categories(&all),
            self.api.grammar_lessons(&first_page),
            self.api.videos(&first_page),
            self.api.vocabulary(&first_page),
            self.load_stats(),
        );

        let mut failed = false;
        {
            let mut s = self.state.borrow_mut();
            s.loading = false;
            match categories {
                Ok(c) => s.categories = c.into_vec(),
                Err(e) => failed |= log_failure("categories", &e),
            }
            match grammar {
                Ok(g) => s.grammar = g.into_vec(),
                Err(e) => failed |= log_failure("grammar lessons", &e),
            }
            match videos {
                Ok(v) => s.videos = v.into_vec(),
                Err(e) => failed |= log_failure("videos", &e),
            }
            match vocabulary {
                Ok(v) => s.vocabulary = v.into_vec(),
                Err(e) => failed |= log_failure("vocabulary", &e),
            }
            match stats {
                Ok(st) => s.stats = Some(st),
                Err(e) => failed |= log_failure("stats", &e),
            }
        }
        if failed {
            self.events.notify(Notice::error("Failed to load some library content"));
        }
    }

    async fn load_stats(&self) -> tutor_types::Result<DashboardStats> {
        let (grammar, videos, vocabulary) = futures::join!(
            self.api.grammar_stats(),
            self.api.video_stats(),
            self.api.vocabulary_stats(),
        );
        Ok(DashboardStats {
            grammar: grammar?,
            videos: videos?,
            vocabulary: vocabulary?,
        })
    }

    pub async fn reload_categories(&self) {
        match self.api.categories(&ListParams::default()).await {
            Ok(c) => self.state.borrow_mut().categories = c.into_vec(),
            Err(e) => self.report(&e, "Failed to fetch categories"),
        }
    }

    /// Create a category from the "new category" field.
    pub async fn create_category(&self) {
        let name = self.state.borrow().new_category.trim().to_string();
        if name.is_empty() {
            return;
        }
        match self.api.create_category(&CategoryInput { name }).await {
            Ok(category) => {
                log::info!("created category {}", category.id);
                let mut s = self.state.borrow_mut();
                s.categories.push(category);
                s.new_category.clear();
                drop(s);
                self.events.notify(Notice::success("Category created"));
            }
            Err(e) => self.report(&e, "Failed to create category"),
        }
    }

    /// Save the edit buffer as the category's new name.
    pub async fn save_edit(&self) {
        let Some((id, name)) = self.state.borrow_mut().editing.take() else {
            return;
        };
        let name = name.trim().to_string();
        if name.is_empty() {
            return;
        }
        match self.api.update_category(id, &CategoryInput { name }).await {
            Ok(updated) => {
                if let Some(c) = self.state.borrow_mut().categories.iter_mut().find(|c| c.id == id) {
                    *c = updated;
                }
                self.events.notify(Notice::success("Category updated"));
            }
            Err(e) => self.report(&e, "Failed to update category"),
        }
    }

    pub async fn delete_category(&self, id: u64) {
        match self.api.delete_category(id).await {
            Ok(()) => {
                self.state.borrow_mut().categories.retain(|c| c.id != id);
                self.events.notify(Notice::success("Category deleted"));
            }
            Err(e) => self.report(&e, "Failed to delete category"),
        }
    }

    fn report(&self, e: &TutorError, fallback: &str) {
        log::error!("{}: {}", fallback, e);
        match e.kind() {
            ErrorKind::Auth => {}
            ErrorKind::UsageLimit => self.events.notify(Notice::usage_limit()),
            ErrorKind::Recoverable => self.events.notify(Notice::error(fallback)),
        }
    }
}

fn log_failure(what: &str, e: &TutorError) -> bool {
    log::warn!("failed to load {}: {}", what, e);
    e.kind() != ErrorKind::Auth
}
