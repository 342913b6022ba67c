#[cfg(test)]
mod tests {
    use crate::auth::AuthStore;
    use crate::cache::{cache_key, collection_prefix, ResponseCache};
    use crate::chat::{ChatManager, ChatState, Flag, LoadingGuard, QUICK_PROMPTS};
    use crate::client::{error_message, ApiClient, CacheOptions, LOGIN_PATH, REFRESH_PATH};
    use crate::content::ContentApi;
    use crate::event_bus::EventBus;
    use crate::library::LibraryManager;
    use crate::ports::*;
    use crate::prefetch::Prefetcher;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use futures::executor::block_on;
    use serde_json::{json, Value};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::rc::Rc;
    use std::task::{Context, Poll};
    use tutor_types::auth::{AuthSession, RegisterRequest, User, UserRole};
    use tutor_types::config::{CacheConfig, LearningDefaults};
    use tutor_types::event::{Notice, TutorEvent, USAGE_LIMIT_NOTICE_SECS};
    use tutor_types::message::*;
    use tutor_types::session::*;
    use tutor_types::{Result, TutorError};

    // ─── Test Doubles ────────────────────────────────────────

    /// Returns `Pending` once, waking itself, so `join!` can interleave.
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    struct FakeClock {
        now: Cell<DateTime<Utc>>,
    }

    impl FakeClock {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                now: Cell::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            })
        }

        fn advance(&self, secs: i64) {
            self.now.set(self.now.get() + Duration::seconds(secs));
        }
    }

    impl ClockPort for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            self.now.get()
        }
    }

    #[derive(Default)]
    struct MockStorage {
        data: RefCell<HashMap<String, Vec<u8>>>,
    }

    impl MockStorage {
        fn get_string(&self, key: &str) -> Option<String> {
            self.data
                .borrow()
                .get(key)
                .map(|v| String::from_utf8(v.clone()).unwrap())
        }
    }

    #[async_trait(?Send)]
    impl StoragePort for MockStorage {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.data.borrow().get(key).cloned())
        }
        async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
            self.data.borrow_mut().insert(key.to_string(), value.to_vec());
            Ok(())
        }
        async fn delete(&self, key: &str) -> Result<()> {
            self.data.borrow_mut().remove(key);
            Ok(())
        }
        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
            Ok(self
                .data
                .borrow()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }
        fn backend_name(&self) -> &str {
            "mock"
        }
    }

    type Handler = Box<dyn Fn(&HttpRequest) -> HttpResponse>;

    struct MockHttp {
        handler: Handler,
        calls: RefCell<Vec<HttpRequest>>,
        /// Requests to these exact paths suspend once before answering.
        yield_on: RefCell<Vec<String>>,
    }

    impl MockHttp {
        fn new(handler: impl Fn(&HttpRequest) -> HttpResponse + 'static) -> Rc<Self> {
            Rc::new(Self {
                handler: Box::new(handler),
                calls: RefCell::new(Vec::new()),
                yield_on: RefCell::new(Vec::new()),
            })
        }

        fn yield_on(&self, path: &str) {
            self.yield_on.borrow_mut().push(path.to_string());
        }

        fn calls_to(&self, path: &str) -> usize {
            self.calls.borrow().iter().filter(|r| r.path == path).count()
        }

        fn last_call(&self) -> HttpRequest {
            self.calls.borrow().last().cloned().unwrap()
        }
    }

    #[async_trait(?Send)]
    impl HttpPort for MockHttp {
        async fn send(&self, req: HttpRequest) -> Result<HttpResponse> {
            self.calls.borrow_mut().push(req.clone());
            let suspend = self.yield_on.borrow().iter().any(|p| *p == req.path);
            if suspend {
                YieldOnce(false).await;
            }
            Ok((self.handler)(&req))
        }
    }

    fn respond(status: u16, body: Value) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    fn no_content() -> HttpResponse {
        HttpResponse {
            status: 204,
            body: String::new(),
        }
    }

    fn user_json() -> Value {
        json!({"id": 1, "username": "aman", "email": "aman@example.com", "role": "student"})
    }

    fn user() -> User {
        serde_json::from_value(user_json()).unwrap()
    }

    struct Harness {
        http: Rc<MockHttp>,
        storage: Rc<MockStorage>,
        clock: Rc<FakeClock>,
        events: EventBus,
        client: Rc<ApiClient>,
    }

    fn harness(handler: impl Fn(&HttpRequest) -> HttpResponse + 'static) -> Harness {
        let http = MockHttp::new(handler);
        let storage = Rc::new(MockStorage::default());
        let clock = FakeClock::new();
        let events = EventBus::new();
        let client = Rc::new(ApiClient::new(
            http.clone(),
            AuthStore::new(storage.clone()),
            ResponseCache::new(&CacheConfig::default(), clock.clone()),
            events.clone(),
        ));
        Harness {
            http,
            storage,
            clock,
            events,
            client,
        }
    }

    fn sign_in(h: &Harness, access: &str) {
        block_on(h.client.auth().store(AuthSession {
            access_token: access.to_string(),
            refresh_token: "r1".to_string(),
            user: user(),
        }))
        .unwrap();
    }

    /// Accepts only `Bearer fresh`; the refresh endpoint hands out `fresh`.
    fn refreshing_backend(req: &HttpRequest) -> HttpResponse {
        if req.path == REFRESH_PATH {
            return respond(200, json!({"access": "fresh"}));
        }
        match req.header("Authorization") {
            Some("Bearer fresh") => respond(200, json!({"ok": true})),
            _ => respond(401, json!({"detail": "Given token not valid"})),
        }
    }

    fn notices(events: &EventBus) -> Vec<Notice> {
        events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                TutorEvent::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    // ─── EventBus Tests ──────────────────────────────────────

    #[test]
    fn test_event_bus_emit_and_drain() {
        let bus = EventBus::new();
        bus.emit(TutorEvent::SessionExpired);
        bus.notify(Notice::success("ok"));
        assert!(bus.has_pending());
        assert_eq!(bus.drain().len(), 2);
        assert!(!bus.has_pending());
    }

    #[test]
    fn test_event_bus_clone_shares_state() {
        let a = EventBus::new();
        let b = a.clone();
        a.emit(TutorEvent::SignedOut);
        assert_eq!(b.drain(), vec![TutorEvent::SignedOut]);
        assert!(!a.has_pending());
    }

    // ─── Cache Tests ─────────────────────────────────────────

    #[test]
    fn test_cache_set_then_get() {
        let clock = FakeClock::new();
        let mut cache = ResponseCache::new(&CacheConfig::default(), clock.clone());
        cache.set("/center/grammar/", json!([1, 2]));
        assert_eq!(cache.get("/center/grammar/"), Some(json!([1, 2])));
    }

    #[test]
    fn test_cache_expired_entry_is_purged_on_read() {
        let clock = FakeClock::new();
        let mut cache = ResponseCache::new(&CacheConfig::default(), clock.clone());
        cache.set_with_ttl("k", json!(1), Duration::seconds(10));
        clock.advance(9);
        assert!(cache.get("k").is_some());
        clock.advance(1);
        assert_eq!(cache.get("k"), None, "entry is invisible once now == expiry");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_default_ttl_is_five_minutes() {
        let clock = FakeClock::new();
        let mut cache = ResponseCache::new(&CacheConfig::default(), clock.clone());
        cache.set("k", json!(1));
        clock.advance(299);
        assert!(cache.get("k").is_some());
        clock.advance(1);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_cache_invalidate_prefix() {
        let clock = FakeClock::new();
        let mut cache = ResponseCache::new(&CacheConfig::default(), clock);
        cache.set("/center/grammar/", json!(1));
        cache.set("/center/grammar/3/", json!(2));
        cache.set("/center/grammar/?page=2", json!(3));
        cache.set("/center/videos/", json!(4));

        cache.invalidate_prefix("/center/grammar");
        assert_eq!(cache.len(), 1);
        assert!(cache.get("/center/videos/").is_some());
    }

    #[test]
    fn test_cache_lru_bound_evicts_least_recent() {
        let clock = FakeClock::new();
        let config = CacheConfig {
            default_ttl_secs: 300,
            max_entries: Some(2),
        };
        let mut cache = ResponseCache::new(&config, clock);
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        assert!(cache.get("a").is_some());
        cache.set("c", json!(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_cache_stats_lists_sorted_keys() {
        let clock = FakeClock::new();
        let mut cache = ResponseCache::new(&CacheConfig::default(), clock.clone());
        cache.set("/b", json!(1));
        cache.set("/a", json!(1));
        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.entries[0].0, "/a");
        assert_eq!(stats.entries[1].1, clock.now() + Duration::seconds(300));
    }

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = vec![
            ("page".to_string(), "2".to_string()),
            ("level".to_string(), "beginner".to_string()),
        ];
        let b: Vec<_> = a.iter().cloned().rev().collect();
        assert_eq!(cache_key("/center/videos/", &a), cache_key("/center/videos/", &b));
        assert_eq!(
            cache_key("/center/videos/", &a),
            "/center/videos/?level=beginner&page=2"
        );
        assert_eq!(cache_key("/center/videos/", &[]), "/center/videos/");
    }

    #[test]
    fn test_cache_key_encodes_values() {
        let q = vec![("search".to_string(), "present perfect".to_string())];
        assert_eq!(cache_key("/x/", &q), "/x/?search=present+perfect");
    }

    #[test]
    fn test_collection_prefix() {
        assert_eq!(collection_prefix("/a/b/7/"), "/a/b");
        assert_eq!(collection_prefix("/a/b/7"), "/a/b");
        assert_eq!(collection_prefix("/chat/sessions/3/?x=1"), "/chat/sessions");
        assert_eq!(collection_prefix("/center/categories/"), "/center");
    }

    // ─── ApiClient: Caching ──────────────────────────────────

    #[test]
    fn test_get_is_served_from_cache() {
        let h = harness(|_| respond(200, json!({"total": 3})));
        let first: Value = block_on(h.client.get_json("/center/grammar/stats/", &[], CacheOptions::default())).unwrap();
        let second: Value = block_on(h.client.get_json("/center/grammar/stats/", &[], CacheOptions::default())).unwrap();
        assert_eq!(first, second);
        assert_eq!(h.http.calls_to("/center/grammar/stats/"), 1);
    }

    #[test]
    fn test_get_refetches_after_ttl() {
        let h = harness(|_| respond(200, json!({"total": 3})));
        let _: Value = block_on(h.client.get_json("/s/", &[], CacheOptions::ttl(Duration::seconds(5)))).unwrap();
        h.clock.advance(5);
        let _: Value = block_on(h.client.get_json("/s/", &[], CacheOptions::default())).unwrap();
        assert_eq!(h.http.calls_to("/s/"), 2);
    }

    #[test]
    fn test_bypass_fetches_but_still_stores() {
        let h = harness(|_| respond(200, json!([])));
        let _: Value = block_on(h.client.get_json("/chat/sessions/", &[], CacheOptions::bypass())).unwrap();
        let _: Value = block_on(h.client.get_json("/chat/sessions/", &[], CacheOptions::bypass())).unwrap();
        assert_eq!(h.http.calls_to("/chat/sessions/"), 2);

        let _: Value = block_on(h.client.get_json("/chat/sessions/", &[], CacheOptions::default())).unwrap();
        assert_eq!(h.http.calls_to("/chat/sessions/"), 2);
    }

    #[test]
    fn test_query_is_part_of_the_request_and_key() {
        let h = harness(|_| respond(200, json!([])));
        let q = vec![("page".to_string(), "2".to_string())];
        let _: Value = block_on(h.client.get_json("/center/videos/", &q, CacheOptions::default())).unwrap();
        assert_eq!(h.http.last_call().path, "/center/videos/?page=2");
        assert_eq!(h.client.cache_stats().entries[0].0, "/center/videos/?page=2");
    }

    #[test]
    fn test_error_responses_are_not_cached() {
        let h = harness(|_| respond(500, json!({"detail": "boom"})));
        let err = block_on(h.client.get_json::<Value>("/x/", &[], CacheOptions::default())).unwrap_err();
        assert_eq!(
            err,
            TutorError::Api {
                status: 500,
                message: "boom".to_string()
            }
        );
        assert_eq!(h.client.cache_stats().size, 0);
    }

    #[test]
    fn test_write_invalidates_resource_and_collection() {
        let h = harness(|req| match req.method {
            Method::Get => respond(200, json!({"id": 7, "name": "Verbs"})),
            _ => respond(200, json!({"id": 7, "name": "Tenses"})),
        });
        let _: Value = block_on(h.client.get_json("/center/categories/", &[], CacheOptions::default())).unwrap();
        let _: Value = block_on(h.client.get_json("/center/categories/7/", &[], CacheOptions::default())).unwrap();
        let _: Value = block_on(h.client.get_json("/center/videos/", &[], CacheOptions::default())).unwrap();
        assert_eq!(h.client.cache_stats().size, 3);

        let _: Value = block_on(h.client.put_json("/center/categories/7/", &json!({"name": "Tenses"}))).unwrap();

        let keys: Vec<String> = h.client.cache_stats().entries.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["/center/videos/".to_string()]);
    }

    #[test]
    fn test_failed_write_keeps_cache() {
        let h = harness(|req| match req.method {
            Method::Get => respond(200, json!([])),
            _ => respond(400, json!({"name": ["This field is required."]})),
        });
        let _: Value = block_on(h.client.get_json("/center/categories/", &[], CacheOptions::default())).unwrap();
        let err = block_on(h.client.post_json::<_, Value>("/center/categories/", &json!({}))).unwrap_err();
        assert_eq!(err.server_message(), "This field is required.");
        assert_eq!(h.client.cache_stats().size, 1);
    }

    #[test]
    fn test_read_in_flight_during_write_is_not_cached() {
        let h = harness(|req| match req.method {
            Method::Get => respond(200, json!([{"id": 7}])),
            _ => no_content(),
        });
        h.http.yield_on("/center/categories/");

        let (read, write) = block_on(async {
            futures::join!(
                h.client.get_json::<Value>("/center/categories/", &[], CacheOptions::default()),
                h.client.delete("/center/categories/7/"),
            )
        });
        assert!(read.is_ok());
        assert!(write.is_ok());
        assert_eq!(h.client.cache_stats().size, 0);
    }

    #[test]
    fn test_delete_accepts_empty_body() {
        let h = harness(|_| no_content());
        assert!(block_on(h.client.delete("/chat/sessions/3/")).is_ok());
        assert_eq!(h.http.last_call().method, Method::Delete);
    }

    // ─── ApiClient: Auth ─────────────────────────────────────

    #[test]
    fn test_bearer_token_is_attached() {
        let h = harness(|_| respond(200, json!({})));
        sign_in(&h, "abc");
        let _: Value = block_on(h.client.get_json("/x/", &[], CacheOptions::bypass())).unwrap();
        assert_eq!(h.http.last_call().header("Authorization"), Some("Bearer abc"));
    }

    #[test]
    fn test_401_refreshes_and_replays_once() {
        let h = harness(refreshing_backend);
        sign_in(&h, "stale");

        let body: Value = block_on(h.client.get_json("/center/grammar/", &[], CacheOptions::default())).unwrap();
        assert_eq!(body, json!({"ok": true}));
        assert_eq!(h.http.calls_to(REFRESH_PATH), 1);
        assert_eq!(h.http.calls_to("/center/grammar/"), 2);
        assert_eq!(h.http.last_call().header("Authorization"), Some("Bearer fresh"));
        assert_eq!(h.storage.get_string("accessToken").as_deref(), Some("fresh"));
        assert_eq!(h.client.auth().access_token().as_deref(), Some("fresh"));
        assert!(!h.events.drain().contains(&TutorEvent::SessionExpired));
    }

    #[test]
    fn test_refresh_request_carries_stored_refresh_token() {
        let h = harness(refreshing_backend);
        sign_in(&h, "stale");
        let _: Value = block_on(h.client.get_json("/x/", &[], CacheOptions::default())).unwrap();
        let refresh = h
            .http
            .calls
            .borrow()
            .iter()
            .find(|r| r.path == REFRESH_PATH)
            .cloned()
            .unwrap();
        assert_eq!(refresh.method, Method::Post);
        let body: Value = serde_json::from_str(refresh.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"refresh": "r1"}));
    }

    #[test]
    fn test_second_401_forces_logout() {
        let h = harness(|req| {
            if req.path == REFRESH_PATH {
                respond(200, json!({"access": "fresh"}))
            } else {
                respond(401, json!({"detail": "nope"}))
            }
        });
        sign_in(&h, "stale");

        let err = block_on(h.client.get_json::<Value>("/x/", &[], CacheOptions::default())).unwrap_err();
        assert_eq!(err, TutorError::Unauthorized);
        assert_eq!(h.http.calls_to("/x/"), 2);
        assert!(!h.client.is_authenticated());
        assert!(h.storage.get_string("accessToken").is_none());
        assert!(h.storage.get_string("refreshToken").is_none());
        assert!(h.storage.get_string("user").is_none());
        assert!(h.events.drain().contains(&TutorEvent::SessionExpired));
    }

    #[test]
    fn test_failed_refresh_forces_logout() {
        let h = harness(|_| respond(401, json!({"detail": "Token is invalid or expired"})));
        sign_in(&h, "stale");

        let err = block_on(h.client.get_json::<Value>("/x/", &[], CacheOptions::default())).unwrap_err();
        assert_eq!(err, TutorError::Unauthorized);
        assert_eq!(h.http.calls_to("/x/"), 1, "no replay without a new token");
        assert!(!h.client.is_authenticated());
        assert_eq!(h.events.drain(), vec![TutorEvent::SessionExpired]);
    }

    #[test]
    fn test_401_without_refresh_token_forces_logout() {
        let h = harness(|_| respond(401, json!({})));
        let err = block_on(h.client.get_json::<Value>("/x/", &[], CacheOptions::default())).unwrap_err();
        assert_eq!(err, TutorError::Unauthorized);
        assert_eq!(h.http.calls_to(REFRESH_PATH), 0);
        assert!(h.events.drain().contains(&TutorEvent::SessionExpired));
    }

    #[test]
    fn test_concurrent_401s_share_one_refresh() {
        let h = harness(refreshing_backend);
        h.http.yield_on(REFRESH_PATH);
        sign_in(&h, "stale");

        let (a, b) = block_on(async {
            futures::join!(
                h.client.get_json::<Value>("/center/grammar/", &[], CacheOptions::bypass()),
                h.client.get_json::<Value>("/center/videos/", &[], CacheOptions::bypass()),
            )
        });
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(h.http.calls_to(REFRESH_PATH), 1);
    }

    #[test]
    fn test_refresh_after_completed_refresh_starts_anew() {
        let h = harness(refreshing_backend);
        sign_in(&h, "stale");
        let _: Value = block_on(h.client.get_json("/a/", &[], CacheOptions::bypass())).unwrap();
        // Server rotates again: the next 401 must trigger a second refresh.
        block_on(h.client.auth().replace_access_token("r1", "stale-again")).unwrap();
        let _: Value = block_on(h.client.get_json("/b/", &[], CacheOptions::bypass())).unwrap();
        assert_eq!(h.http.calls_to(REFRESH_PATH), 2);
    }

    // ─── ApiClient: Session Lifecycle ────────────────────────

    #[test]
    fn test_login_persists_session() {
        let h = harness(|req| {
            assert_eq!(req.path, LOGIN_PATH);
            assert!(req.header("Authorization").is_none());
            respond(200, json!({"access": "a1", "refresh": "r9", "user": user_json()}))
        });
        let user = block_on(h.client.login(" aman@example.com ", "secret")).unwrap();
        assert_eq!(user.username, "aman");
        assert_eq!(user.role, UserRole::Student);

        let body: Value = serde_json::from_str(h.http.last_call().body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"email": "aman@example.com", "password": "secret"}));
        assert_eq!(h.storage.get_string("accessToken").as_deref(), Some("a1"));
        assert_eq!(h.storage.get_string("refreshToken").as_deref(), Some("r9"));
        let stored: User = serde_json::from_str(&h.storage.get_string("user").unwrap()).unwrap();
        assert_eq!(stored, user);
        assert_eq!(
            h.events.drain(),
            vec![TutorEvent::SignedIn {
                username: "aman".to_string()
            }]
        );
    }

    #[test]
    fn test_login_rejection_is_auth_error() {
        let h = harness(|_| {
            respond(401, json!({"detail": "No active account found with the given credentials"}))
        });
        let err = block_on(h.client.login("x@y.z", "bad")).unwrap_err();
        assert_eq!(
            err,
            TutorError::Auth("No active account found with the given credentials".to_string())
        );
        assert_eq!(h.http.calls_to(REFRESH_PATH), 0);
        assert!(!h.client.is_authenticated());
    }

    #[test]
    fn test_login_clears_previous_users_cache() {
        let h = harness(|req| {
            if req.path == LOGIN_PATH {
                respond(200, json!({"access": "a", "refresh": "r", "user": user_json()}))
            } else {
                respond(200, json!([]))
            }
        });
        let _: Value = block_on(h.client.get_json("/x/", &[], CacheOptions::default())).unwrap();
        block_on(h.client.login("aman@example.com", "pw")).unwrap();
        assert_eq!(h.client.cache_stats().size, 0);
    }

    #[test]
    fn test_restore_session_from_storage() {
        let h = harness(|_| respond(200, json!({"access": "a", "refresh": "r", "user": user_json()})));
        block_on(h.client.login("aman@example.com", "pw")).unwrap();

        let fresh = AuthStore::new(h.storage.clone());
        let restored = block_on(fresh.restore()).unwrap();
        assert_eq!(restored.map(|u| u.username).as_deref(), Some("aman"));
        assert_eq!(fresh.access_token().as_deref(), Some("a"));
    }

    #[test]
    fn test_restore_requires_all_three_keys() {
        let storage = Rc::new(MockStorage::default());
        block_on(storage.set("accessToken", b"a")).unwrap();
        block_on(storage.set("user", user_json().to_string().as_bytes())).unwrap();
        let store = AuthStore::new(storage);
        assert_eq!(block_on(store.restore()).unwrap(), None);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_restore_discards_unreadable_user() {
        let storage = Rc::new(MockStorage::default());
        block_on(storage.set("accessToken", b"a")).unwrap();
        block_on(storage.set("refreshToken", b"r")).unwrap();
        block_on(storage.set("user", b"{not json")).unwrap();
        let store = AuthStore::new(storage);
        assert_eq!(block_on(store.restore()).unwrap(), None);
    }

    #[test]
    fn test_stale_refresh_result_is_not_written() {
        let storage = Rc::new(MockStorage::default());
        let store = AuthStore::new(storage.clone());
        block_on(store.store(AuthSession {
            access_token: "a".to_string(),
            refresh_token: "r2".to_string(),
            user: user(),
        }))
        .unwrap();

        let written = block_on(store.replace_access_token("r1", "late")).unwrap();
        assert!(!written);
        assert_eq!(store.access_token().as_deref(), Some("a"));
        assert_eq!(storage.get_string("accessToken").as_deref(), Some("a"));
    }

    #[test]
    fn test_logout_during_refresh_wins() {
        let h = harness(refreshing_backend);
        h.http.yield_on(REFRESH_PATH);
        sign_in(&h, "stale");

        let (result, ()) = block_on(async {
            futures::join!(
                h.client.get_json::<Value>("/x/", &[], CacheOptions::bypass()),
                h.client.logout(),
            )
        });
        assert_eq!(result.unwrap_err(), TutorError::Unauthorized);
        assert!(h.storage.get_string("accessToken").is_none());
        assert!(!h.client.is_authenticated());
    }

    #[test]
    fn test_logout_clears_credentials_and_cache() {
        let h = harness(|_| respond(200, json!({})));
        sign_in(&h, "a");
        let _: Value = block_on(h.client.get_json("/x/", &[], CacheOptions::default())).unwrap();

        block_on(h.client.logout());
        assert!(!h.client.is_authenticated());
        assert!(h.client.current_user().is_none());
        assert_eq!(h.client.cache_stats().size, 0);
        assert!(h.storage.data.borrow().is_empty());
        assert_eq!(h.events.drain(), vec![TutorEvent::SignedOut]);
    }

    #[test]
    fn test_register_validates_before_sending() {
        let h = harness(|_| respond(201, json!({})));
        let req = RegisterRequest {
            username: "aman".to_string(),
            email: "aman@example.com".to_string(),
            password: "short".to_string(),
            password_confirm: "short".to_string(),
            ..RegisterRequest::default()
        };
        let err = block_on(h.client.register(&req)).unwrap_err();
        assert!(matches!(err, TutorError::Validation(_)));
        assert!(h.http.calls.borrow().is_empty());
    }

    #[test]
    fn test_register_signs_in_with_returned_tokens() {
        let h = harness(|_| {
            respond(201, json!({"user": user_json(), "access": "a", "refresh": "r", "message": "ok"}))
        });
        let req = RegisterRequest {
            username: "aman".to_string(),
            email: "aman@example.com".to_string(),
            password: "longenough".to_string(),
            password_confirm: "longenough".to_string(),
            ..RegisterRequest::default()
        };
        let user = block_on(h.client.register(&req)).unwrap();
        assert_eq!(user.id, 1);
        assert!(h.client.is_authenticated());
    }

    #[test]
    fn test_error_message_extraction() {
        let r = |body: &str| HttpResponse {
            status: 400,
            body: body.to_string(),
        };
        assert_eq!(error_message(&r(r#"{"detail":"d","message":"m"}"#)).as_deref(), Some("d"));
        assert_eq!(error_message(&r(r#"{"message":"m"}"#)).as_deref(), Some("m"));
        assert_eq!(error_message(&r(r#"{"error":"e"}"#)).as_deref(), Some("e"));
        assert_eq!(
            error_message(&r(r#"{"non_field_errors":["Passwords don't match"]}"#)).as_deref(),
            Some("Passwords don't match")
        );
        assert_eq!(error_message(&r("Bad Gateway")).as_deref(), Some("Bad Gateway"));
        assert_eq!(error_message(&r("")), None);
    }

    // ─── ChatPort over ApiClient ─────────────────────────────

    fn session_json(id: u64) -> Value {
        json!({
            "id": id,
            "title": "New Chat",
            "proficiency_level": "beginner",
            "learning_focus": "grammar",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    #[test]
    fn test_list_sessions_accepts_page_or_array() {
        let h = harness(|_| respond(200, json!([session_json(1), session_json(2)])));
        assert_eq!(block_on(h.client.list_sessions()).unwrap().len(), 2);

        let h = harness(|_| {
            respond(200, json!({"count": 1, "next": null, "previous": null, "results": [session_json(4)]}))
        });
        let sessions = block_on(h.client.list_sessions()).unwrap();
        assert_eq!(sessions[0].id, 4);
        assert_eq!(sessions[0].proficiency_level, ProficiencyLevel::Beginner);
    }

    #[test]
    fn test_send_message_request_shape() {
        let h = harness(|_| {
            respond(200, json!({
                "response": "Hello!",
                "session_id": 9,
                "message_id": 31,
                "proficiency_level": "intermediate",
                "learning_focus": "general"
            }))
        });
        let resp = block_on(h.client.send_message(SendMessageRequest {
            message: "hi".to_string(),
            session_id: None,
            proficiency_level: Some(ProficiencyLevel::Intermediate),
            learning_focus: Some(LearningFocus::General),
        }))
        .unwrap();
        assert_eq!(resp.session_id, 9);

        let call = h.http.last_call();
        assert_eq!(call.method, Method::Post);
        assert_eq!(call.path, "/chat/sessions/chat/");
        let body: Value = serde_json::from_str(call.body.as_deref().unwrap()).unwrap();
        assert!(body.get("session_id").is_none());
        assert_eq!(body["message"], "hi");
    }

    #[test]
    fn test_update_session_patches_detail_path() {
        let h = harness(|_| respond(200, session_json(3)));
        block_on(h.client.update_session(3, SessionUpdate::title("Verbs"))).unwrap();
        let call = h.http.last_call();
        assert_eq!(call.method, Method::Patch);
        assert_eq!(call.path, "/chat/sessions/3/");
        assert_eq!(call.body.as_deref(), Some(r#"{"title":"Verbs"}"#));
    }

    // ─── ChatManager Tests ───────────────────────────────────

    #[derive(Default)]
    struct MockChat {
        sessions: RefCell<Vec<ChatSession>>,
        messages: RefCell<HashMap<u64, Vec<ChatMessage>>>,
        send_error: RefCell<Option<TutorError>>,
        fail_all: Cell<bool>,
        yield_on_send: Cell<bool>,
        next_id: Cell<u64>,
        list_message_calls: Cell<usize>,
        send_calls: Cell<usize>,
        update_calls: Cell<usize>,
        last_send: RefCell<Option<SendMessageRequest>>,
    }

    impl MockChat {
        fn with_sessions(sessions: Vec<ChatSession>) -> Rc<Self> {
            let mock = Self::default();
            mock.next_id.set(100);
            *mock.sessions.borrow_mut() = sessions;
            Rc::new(mock)
        }

        fn id(&self) -> u64 {
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            id
        }

        fn check(&self) -> Result<()> {
            if self.fail_all.get() {
                return Err(TutorError::Network("offline".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait(?Send)]
    impl ChatPort for MockChat {
        async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
            self.check()?;
            Ok(self.sessions.borrow().clone())
        }

        async fn create_session(&self, data: SessionCreate) -> Result<ChatSession> {
            self.check()?;
            let mut s = session(self.id(), &data.title.unwrap_or_default());
            s.proficiency_level = data.proficiency_level.unwrap_or_default();
            s.learning_focus = data.learning_focus.unwrap_or_default();
            self.sessions.borrow_mut().push(s.clone());
            Ok(s)
        }

        async fn update_session(&self, id: u64, data: SessionUpdate) -> Result<ChatSession> {
            self.update_calls.set(self.update_calls.get() + 1);
            self.check()?;
            let mut sessions = self.sessions.borrow_mut();
            let s = sessions
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or(TutorError::Api { status: 404, message: "Not found.".to_string() })?;
            if let Some(title) = data.title {
                s.title = title;
            }
            if let Some(level) = data.proficiency_level {
                s.proficiency_level = level;
            }
            if let Some(focus) = data.learning_focus {
                s.learning_focus = focus;
            }
            Ok(s.clone())
        }

        async fn delete_session(&self, id: u64) -> Result<()> {
            self.check()?;
            self.sessions.borrow_mut().retain(|s| s.id != id);
            Ok(())
        }

        async fn list_messages(&self, session_id: u64) -> Result<Vec<ChatMessage>> {
            self.list_message_calls.set(self.list_message_calls.get() + 1);
            self.check()?;
            Ok(self.messages.borrow().get(&session_id).cloned().unwrap_or_default())
        }

        async fn send_message(&self, req: SendMessageRequest) -> Result<SendMessageResponse> {
            self.send_calls.set(self.send_calls.get() + 1);
            *self.last_send.borrow_mut() = Some(req.clone());
            if self.yield_on_send.get() {
                YieldOnce(false).await;
            }
            let err = self.send_error.borrow().clone();
            if let Some(e) = err {
                return Err(e);
            }
            let session_id = match req.session_id {
                Some(id) => id,
                None => {
                    let s = session(self.id(), &req.message);
                    self.sessions.borrow_mut().push(s.clone());
                    s.id
                }
            };
            let reply = format!("echo: {}", req.message);
            let user_id = self.id();
            let reply_id = self.id();
            let mut messages = self.messages.borrow_mut();
            let log = messages.entry(session_id).or_default();
            log.push(msg(user_id, Role::User, &req.message));
            log.push(msg(reply_id, Role::Assistant, &reply));
            Ok(SendMessageResponse {
                response: reply,
                session_id,
                message_id: reply_id,
                proficiency_level: req.proficiency_level.unwrap_or_default(),
                learning_focus: req.learning_focus.unwrap_or_default(),
            })
        }

        async fn session_stats(&self) -> Result<SessionStats> {
            self.check()?;
            Ok(SessionStats {
                total_sessions: self.sessions.borrow().len() as u64,
                ..SessionStats::default()
            })
        }
    }

    fn session(id: u64, title: &str) -> ChatSession {
        ChatSession {
            id,
            title: title.to_string(),
            proficiency_level: ProficiencyLevel::Intermediate,
            learning_focus: LearningFocus::General,
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
            updated_at: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn msg(id: u64, role: Role, content: &str) -> ChatMessage {
        ChatMessage {
            id,
            role,
            content: content.to_string(),
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    struct ChatHarness {
        api: Rc<MockChat>,
        events: EventBus,
        clock: Rc<FakeClock>,
        chat: ChatManager,
    }

    fn chat_harness(api: Rc<MockChat>) -> ChatHarness {
        let events = EventBus::new();
        let clock = FakeClock::new();
        let chat = ChatManager::new(api.clone(), events.clone(), clock.clone(), LearningDefaults::default());
        ChatHarness {
            api,
            events,
            clock,
            chat,
        }
    }

    /// Three sessions; session 1 already holds one exchange.
    fn three_sessions() -> ChatHarness {
        let mut first = session(1, "First");
        first.proficiency_level = ProficiencyLevel::Advanced;
        first.learning_focus = LearningFocus::Grammar;
        let api = MockChat::with_sessions(vec![first, session(2, "Second"), session(3, "Third")]);
        api.messages.borrow_mut().insert(1, vec![msg(11, Role::User, "hi"), msg(12, Role::Assistant, "hello")]);
        api.messages.borrow_mut().insert(2, vec![msg(21, Role::User, "second")]);
        chat_harness(api)
    }

    #[test]
    fn test_load_sessions_selects_first_and_adopts_settings() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());

        let s = h.chat.state();
        assert_eq!(s.sessions.len(), 3);
        assert_eq!(s.active, Some(1));
        assert_eq!(s.proficiency, ProficiencyLevel::Advanced);
        assert_eq!(s.focus, LearningFocus::Grammar);
        let ids: Vec<_> = s.timeline.iter().map(|e| e.server_id()).collect();
        assert_eq!(ids, vec![Some(11), Some(12)]);
        assert!(!s.loading_sessions);
        assert!(!s.loading_messages);
    }

    #[test]
    fn test_load_empty_list_stays_without_session() {
        let h = chat_harness(MockChat::with_sessions(vec![]));
        block_on(h.chat.load_sessions());
        assert_eq!(h.chat.state().active, None);
        assert_eq!(h.api.list_message_calls.get(), 0);
    }

    #[test]
    fn test_load_keeps_existing_selection() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        block_on(h.chat.select_session(2));
        block_on(h.chat.load_sessions());
        assert_eq!(h.chat.state().active, Some(2));
    }

    #[test]
    fn test_load_failure_notifies_and_resets_flag() {
        let h = three_sessions();
        h.api.fail_all.set(true);
        block_on(h.chat.load_sessions());

        assert!(!h.chat.state().loading_sessions);
        assert_eq!(notices(&h.events), vec![Notice::error("Failed to load chat sessions")]);
    }

    #[test]
    fn test_select_active_session_is_noop() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        assert_eq!(h.api.list_message_calls.get(), 1);

        block_on(h.chat.select_session(1));
        assert_eq!(h.api.list_message_calls.get(), 1);

        block_on(h.chat.select_session(2));
        assert_eq!(h.api.list_message_calls.get(), 2);
        let s = h.chat.state();
        assert_eq!(s.active, Some(2));
        assert_eq!(s.proficiency, ProficiencyLevel::Intermediate);
        assert_eq!(s.timeline.len(), 1);
    }

    #[test]
    fn test_send_happy_path() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.chat.set_draft("  hello  ");
        block_on(h.chat.send_message());

        let s = h.chat.state();
        assert_eq!(s.timeline.len(), 4);
        assert_eq!(s.timeline[2].role, Role::User);
        assert_eq!(s.timeline[2].content, "hello");
        assert_eq!(s.timeline[2].delivery, Delivery::Confirmed { server_id: None });
        assert_eq!(s.timeline[3].role, Role::Assistant);
        assert_eq!(s.timeline[3].content, "echo: hello");
        assert!(s.timeline[3].server_id().is_some());
        assert!(s.draft.is_empty());
        assert!(!s.sending);
        assert_eq!(s.sessions[0].updated_at, h.clock.now().to_rfc3339());

        let sent = h.api.last_send.borrow().clone().unwrap();
        assert_eq!(sent.session_id, Some(1));
        assert_eq!(sent.proficiency_level, Some(ProficiencyLevel::Advanced));
        assert_eq!(sent.learning_focus, Some(LearningFocus::Grammar));
    }

    #[test]
    fn test_send_blank_draft_does_nothing() {
        let h = three_sessions();
        h.chat.set_draft("   ");
        block_on(h.chat.send_message());
        assert_eq!(h.api.send_calls.get(), 0);
        assert!(h.chat.state().timeline.is_empty());
    }

    #[test]
    fn test_send_without_session_adopts_new_one() {
        let h = chat_harness(MockChat::with_sessions(vec![]));
        block_on(h.chat.load_sessions());
        h.chat.set_draft("hi");
        block_on(h.chat.send_message());

        let s = h.chat.state();
        assert_eq!(s.sessions.len(), 1);
        assert_eq!(s.active, Some(s.sessions[0].id));
        assert_eq!(s.timeline.len(), 2);
        assert_eq!(h.api.last_send.borrow().as_ref().unwrap().session_id, None);
    }

    #[test]
    fn test_usage_limit_failure_appends_one_apology() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.events.drain();
        *h.api.send_error.borrow_mut() = Some(TutorError::Api {
            status: 429,
            message: "Daily quota exceeded".to_string(),
        });
        h.chat.set_draft("hello");
        block_on(h.chat.send_message());

        let s = h.chat.state();
        assert_eq!(s.draft, "hello");
        assert_eq!(s.timeline.len(), 4);
        assert!(s.timeline[2].is_failed());
        let apologies: Vec<_> = s
            .timeline
            .iter()
            .filter(|e| e.delivery == Delivery::Synthetic)
            .collect();
        assert_eq!(apologies.len(), 1);
        assert_eq!(apologies[0].content, USAGE_LIMIT_APOLOGY);
        assert_eq!(apologies[0].role, Role::Assistant);
        drop(s);

        let events = h.events.drain();
        assert!(events.contains(&TutorEvent::DraftRestored { text: "hello".to_string() }));
        assert!(events.contains(&TutorEvent::Notice(Notice::usage_limit())));
        assert!(events.iter().any(|e| matches!(e,
            TutorEvent::Notice(n) if n.duration_secs == USAGE_LIMIT_NOTICE_SECS)));
    }

    #[test]
    fn test_generic_send_failure_restores_draft() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.events.drain();
        *h.api.send_error.borrow_mut() = Some(TutorError::Network("offline".to_string()));
        h.chat.set_draft("hello");
        block_on(h.chat.send_message());

        let s = h.chat.state();
        assert_eq!(s.draft, "hello");
        assert!(!s.sending);
        assert!(s.timeline.iter().all(|e| e.delivery != Delivery::Synthetic));
        match &s.timeline[2].delivery {
            Delivery::Failed { reason, .. } => assert!(reason.contains("offline")),
            other => panic!("expected failed entry, got {:?}", other),
        }
        drop(s);
        assert_eq!(
            notices(&h.events),
            vec![Notice::error("Failed to send message. Please try again.")]
        );
    }

    #[test]
    fn test_auth_failure_leaves_notice_to_session_expiry() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.events.drain();
        *h.api.send_error.borrow_mut() = Some(TutorError::Unauthorized);
        h.chat.set_draft("hello");
        block_on(h.chat.send_message());
        assert!(notices(&h.events).is_empty());
        assert_eq!(h.chat.state().draft, "hello");
    }

    #[test]
    fn test_reply_after_switching_session_is_dropped() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.api.yield_on_send.set(true);
        h.chat.set_draft("hello");

        block_on(async { futures::join!(h.chat.send_message(), h.chat.select_session(2)) });

        let s = h.chat.state();
        assert_eq!(s.active, Some(2));
        assert_eq!(s.timeline.len(), 1);
        assert_eq!(s.timeline[0].server_id(), Some(21));
        assert_eq!(s.sessions[0].updated_at, h.clock.now().to_rfc3339());
    }

    #[test]
    fn test_reload_history_replaces_optimistic_entries() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.chat.set_draft("hello");
        block_on(h.chat.send_message());
        block_on(h.chat.reload_history());

        let s = h.chat.state();
        assert_eq!(s.timeline.len(), 4);
        assert!(s.timeline.iter().all(|e| e.server_id().is_some()));
    }

    #[test]
    fn test_second_send_while_sending_is_ignored() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.api.yield_on_send.set(true);
        h.chat.set_draft("one");

        block_on(async {
            futures::join!(h.chat.send_message(), async {
                h.chat.set_draft("two");
                h.chat.send_message().await;
            })
        });
        assert_eq!(h.api.send_calls.get(), 1);
        assert_eq!(h.chat.state().draft, "two");
    }

    #[test]
    fn test_create_session_appends_and_activates() {
        let h = chat_harness(MockChat::with_sessions(vec![]));
        h.chat.set_proficiency(ProficiencyLevel::Beginner);
        block_on(h.chat.create_session());

        let s = h.chat.state();
        assert_eq!(s.sessions.len(), 1);
        assert_eq!(s.sessions[0].title, DEFAULT_SESSION_TITLE);
        assert_eq!(s.sessions[0].proficiency_level, ProficiencyLevel::Beginner);
        assert_eq!(s.active, Some(s.sessions[0].id));
        assert!(s.timeline.is_empty());
    }

    #[test]
    fn test_delete_active_selects_first_remaining() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        block_on(h.chat.select_session(2));
        block_on(h.chat.delete_session(2));

        let s = h.chat.state();
        assert_eq!(s.active, Some(1));
        assert_eq!(s.history_for, Some(1));
        let ids: Vec<_> = s.sessions.iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![1, 3]);
        drop(s);
        assert_eq!(notices(&h.events), vec![Notice::success("Chat session deleted")]);
    }

    #[test]
    fn test_delete_active_first_moves_to_new_head() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        block_on(h.chat.delete_session(1));
        assert_eq!(h.chat.state().active, Some(2));
    }

    #[test]
    fn test_delete_active_last_falls_back_to_first() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        block_on(h.chat.select_session(3));
        block_on(h.chat.delete_session(3));
        assert_eq!(h.chat.state().active, Some(1));
    }

    #[test]
    fn test_delete_only_session_goes_to_no_session() {
        let h = chat_harness(MockChat::with_sessions(vec![session(5, "Only")]));
        block_on(h.chat.load_sessions());
        block_on(h.chat.delete_session(5));

        let s = h.chat.state();
        assert_eq!(s.active, None);
        assert!(s.timeline.is_empty());
        assert!(s.sessions.is_empty());
    }

    #[test]
    fn test_delete_inactive_keeps_selection() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        block_on(h.chat.delete_session(3));
        let s = h.chat.state();
        assert_eq!(s.active, Some(1));
        assert_eq!(s.timeline.len(), 2);
    }

    #[test]
    fn test_delete_failure_keeps_list() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.events.drain();
        h.api.fail_all.set(true);
        block_on(h.chat.delete_session(1));
        assert_eq!(h.chat.state().sessions.len(), 3);
        assert_eq!(notices(&h.events), vec![Notice::error("Failed to delete session")]);
    }

    #[test]
    fn test_rename_blank_title_only_leaves_editing() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.chat.begin_rename(2);
        assert_eq!(h.chat.state().renaming, Some((2, "Second".to_string())));

        block_on(h.chat.rename_session(2, "   "));
        assert_eq!(h.api.update_calls.get(), 0);
        assert_eq!(h.chat.state().renaming, None);
    }

    #[test]
    fn test_rename_updates_list() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.chat.begin_rename(2);
        h.chat.set_rename_draft(" Phrasal verbs ");
        let title = h.chat.state().renaming.clone().unwrap().1;
        block_on(h.chat.rename_session(2, &title));

        let s = h.chat.state();
        assert_eq!(s.sessions[1].title, "Phrasal verbs");
        assert_eq!(s.renaming, None);
    }

    #[test]
    fn test_rename_failure_still_leaves_editing() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.events.drain();
        h.chat.begin_rename(1);
        h.api.fail_all.set(true);
        block_on(h.chat.rename_session(1, "Renamed"));

        let s = h.chat.state();
        assert_eq!(s.renaming, None);
        assert_eq!(s.sessions[0].title, "First");
        drop(s);
        assert_eq!(notices(&h.events), vec![Notice::error("Failed to update session title")]);
    }

    #[test]
    fn test_save_settings_updates_active_entry() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.events.drain();
        h.chat.set_proficiency(ProficiencyLevel::Beginner);
        h.chat.set_focus(LearningFocus::Writing);
        block_on(h.chat.save_settings());

        let s = h.chat.state();
        assert_eq!(s.sessions[0].proficiency_level, ProficiencyLevel::Beginner);
        assert_eq!(s.sessions[0].learning_focus, LearningFocus::Writing);
        assert_eq!(s.sessions[1].learning_focus, LearningFocus::General);
        drop(s);
        assert_eq!(notices(&h.events), vec![Notice::success("Learning settings updated")]);
    }

    #[test]
    fn test_save_settings_without_session_sends_nothing() {
        let h = chat_harness(MockChat::with_sessions(vec![]));
        h.chat.set_focus(LearningFocus::Exam);
        block_on(h.chat.save_settings());
        assert_eq!(h.api.update_calls.get(), 0);
        assert_eq!(h.chat.state().focus, LearningFocus::Exam);
    }

    #[test]
    fn test_quick_prompt_fills_draft() {
        let h = three_sessions();
        h.chat.use_quick_prompt(1);
        assert_eq!(h.chat.state().draft, QUICK_PROMPTS[1]);
        h.chat.use_quick_prompt(99);
        assert_eq!(h.chat.state().draft, QUICK_PROMPTS[1]);
    }

    #[test]
    fn test_stats_pass_through() {
        let h = three_sessions();
        let stats = block_on(h.chat.stats()).unwrap();
        assert_eq!(stats.total_sessions, 3);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let h = three_sessions();
        block_on(h.chat.load_sessions());
        h.chat.reset(LearningDefaults::default());
        let s = h.chat.state();
        assert!(s.sessions.is_empty());
        assert_eq!(s.active, None);
        assert_eq!(s.proficiency, ProficiencyLevel::Intermediate);
    }

    #[test]
    fn test_loading_guard_lowers_flag_on_drop() {
        let state = Rc::new(RefCell::new(ChatState::default()));
        let guard = LoadingGuard::raise(&state, Flag::Messages);
        assert!(state.borrow().loading_messages);
        drop(guard);
        assert!(!state.borrow().loading_messages);
    }

    #[test]
    fn test_loading_guard_tolerates_busy_state() {
        let state = Rc::new(RefCell::new(ChatState::default()));
        let guard = LoadingGuard::raise(&state, Flag::Sending);
        {
            let held = state.borrow();
            drop(guard);
            assert!(held.sending);
        }
        // The flag stays raised until the next guard for it completes.
        drop(LoadingGuard::raise(&state, Flag::Sending));
        assert!(!state.borrow().sending);
    }

    #[test]
    fn test_reply_after_reset_is_dropped() {
        let h = three_sessions();
        h.api.yield_on_send.set(true);
        h.chat.set_draft("hello");

        block_on(async {
            futures::join!(h.chat.send_message(), async {
                h.chat.reset(LearningDefaults::default())
            })
        });

        let s = h.chat.state();
        assert_eq!(h.api.send_calls.get(), 1);
        assert_eq!(s.active, None);
        assert_eq!(s.history_for, None);
        assert!(s.timeline.is_empty());
        assert!(s.sessions.is_empty());
        assert!(!s.sending);
        assert_eq!(s.generation, 1);
        assert!(notices(&h.events).is_empty());
    }

    // ─── Library & Prefetch Tests ────────────────────────────

    fn content_backend(req: &HttpRequest) -> HttpResponse {
        let path = req.path.split('?').next().unwrap_or("");
        match (req.method, path) {
            (Method::Get, "/center/categories/") => {
                respond(200, json!([{"id": 1, "name": "Tenses"}]))
            }
            (Method::Post, "/center/categories/") => respond(201, json!({"id": 2, "name": "Idioms"})),
            (Method::Put, "/center/categories/1/") => respond(200, json!({"id": 1, "name": "Verb tenses"})),
            (Method::Delete, "/center/categories/1/") => no_content(),
            (Method::Get, p) if p.ends_with("/stats/") => respond(200, json!({"total": 4})),
            (Method::Get, "/center/grammar/") => respond(200, json!({
                "count": 1, "next": null, "previous": null,
                "results": [{"id": 1, "title": "Present simple"}]
            })),
            (Method::Get, "/center/videos/") => respond(200, json!({
                "count": 0, "next": null, "previous": null, "results": []
            })),
            (Method::Get, "/center/vocabulary/") => respond(200, json!([
                {"id": 1, "turkmen_word": "kitap", "english_word": "book", "level": "beginner"}
            ])),
            (Method::Get, "/center/vocabulary/categories/") => respond(200, json!(["food", "travel"])),
            _ => respond(404, json!({"detail": "Not found."})),
        }
    }

    fn library(h: &Harness) -> LibraryManager {
        LibraryManager::new(ContentApi::new(h.client.clone()), h.events.clone())
    }

    #[test]
    fn test_library_load_fills_every_list() {
        let h = harness(content_backend);
        let lib = library(&h);
        block_on(lib.load());

        let s = lib.state();
        assert!(!s.loading);
        assert_eq!(s.categories.len(), 1);
        assert_eq!(s.grammar[0].title, "Present simple");
        assert!(s.videos.is_empty());
        assert_eq!(s.vocabulary[0].english_word, "book");
        assert_eq!(s.stats.as_ref().map(|st| st.total()), Some(12));
        drop(s);
        assert!(notices(&h.events).is_empty());
    }

    #[test]
    fn test_library_category_lifecycle() {
        let h = harness(content_backend);
        let lib = library(&h);
        block_on(lib.reload_categories());

        lib.set_new_category("  Idioms ");
        block_on(lib.create_category());
        assert_eq!(lib.state().categories.len(), 2);
        assert!(lib.state().new_category.is_empty());
        let body: Value = serde_json::from_str(h.http.last_call().body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Idioms"}));

        lib.begin_edit(1);
        lib.set_edit_buffer("Verb tenses");
        block_on(lib.save_edit());
        assert_eq!(lib.state().categories[0].name, "Verb tenses");
        assert!(lib.state().editing.is_none());

        block_on(lib.delete_category(1));
        let names: Vec<_> = lib.state().categories.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["Idioms".to_string()]);

        let texts: Vec<_> = notices(&h.events).into_iter().map(|n| n.text).collect();
        assert_eq!(texts, vec!["Category created", "Category updated", "Category deleted"]);
    }

    #[test]
    fn test_category_write_refetches_list() {
        let h = harness(content_backend);
        let lib = library(&h);
        block_on(lib.reload_categories());
        block_on(lib.reload_categories());
        assert_eq!(h.http.calls_to("/center/categories/"), 1);

        block_on(lib.delete_category(1));
        block_on(lib.reload_categories());
        assert_eq!(h.http.calls_to("/center/categories/"), 2);
    }

    #[test]
    fn test_vocabulary_categories_and_random_words() {
        let h = harness(content_backend);
        let api = ContentApi::new(h.client.clone());
        assert_eq!(block_on(api.vocabulary_categories()).unwrap(), vec!["food", "travel"]);

        let _ = block_on(api.random_words(Some(5), Some(ProficiencyLevel::Advanced)));
        assert_eq!(h.http.last_call().path, "/center/vocabulary/random/?count=5&level=advanced");
    }

    #[test]
    fn test_prefetch_dashboard_tolerates_failures() {
        let h = harness(|req| {
            if req.path == "/center/videos/stats/" {
                respond(500, json!({"detail": "down"}))
            } else {
                respond(200, json!({"total": 1}))
            }
        });
        let prefetcher = Prefetcher::new(h.client.clone());
        let ok = block_on(prefetcher.prefetch_dashboard());

        assert_eq!(ok, 3);
        assert_eq!(h.client.cache_stats().size, 3);
        assert!(notices(&h.events).is_empty());
    }

    #[test]
    fn test_prefetched_data_expires_with_its_ttl() {
        let h = harness(|_| respond(200, json!({"total": 1})));
        let prefetcher = Prefetcher::new(h.client.clone());
        block_on(prefetcher.prefetch_vocabulary_practice(Some(ProficiencyLevel::Beginner)));

        let keys: Vec<_> = h.client.cache_stats().entries.into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"/center/vocabulary/random/?count=20&level=beginner".to_string()));
        assert!(keys.contains(&"/center/vocabulary/categories/".to_string()));

        h.clock.advance(4 * 60);
        let _: Value = block_on(h.client.get_json("/center/vocabulary/categories/", &[], CacheOptions::default())).unwrap();
        assert_eq!(h.http.calls_to("/center/vocabulary/categories/"), 1);

        h.clock.advance(60);
        let _: Value = block_on(h.client.get_json("/center/vocabulary/categories/", &[], CacheOptions::default())).unwrap();
        assert_eq!(h.http.calls_to("/center/vocabulary/categories/"), 2);
    }
}
