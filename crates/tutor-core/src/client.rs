//! API client: bearer auth with one transparent refresh, cached reads,
//! invalidating writes.
//!
//! Every authenticated request carries `Authorization: Bearer <access>`.
//! A 401 triggers one token refresh and one replay of the original request.
//! Concurrent 401s share a single refresh future. If the refresh fails, or the
//! replay is rejected again, the credentials and cache are cleared and
//! `TutorEvent::SessionExpired` tells the UI to show the login screen.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::Duration;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tutor_types::{
    Result, TutorError,
    auth::{
        AuthSession, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
        RegisterRequest, User,
    },
    event::TutorEvent,
};

use crate::auth::AuthStore;
use crate::cache::{cache_key, collection_prefix, CacheStats, ResponseCache};
use crate::event_bus::EventBus;
use crate::ports::{HttpPort, HttpRequest, HttpResponse, Method};

pub const LOGIN_PATH: &str = "/auth/login/";
pub const REGISTER_PATH: &str = "/auth/register/";
pub const REFRESH_PATH: &str = "/auth/token/refresh/";
pub const PROFILE_PATH: &str = "/auth/profile/";

type RefreshFuture = Shared<LocalBoxFuture<'static, Result<String>>>;

/// How a read interacts with the response cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Overrides the cache's default TTL for the stored response.
    pub ttl: Option<Duration>,
    /// Skip the lookup; the fresh response is still stored.
    pub bypass: bool,
}

impl CacheOptions {
    pub fn bypass() -> Self {
        Self {
            ttl: None,
            bypass: true,
        }
    }

    pub fn ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            bypass: false,
        }
    }
}

pub struct ApiClient {
    http: Rc<dyn HttpPort>,
    auth: AuthStore,
    cache: RefCell<ResponseCache>,
    events: EventBus,
    /// In-flight refresh shared by every request that hit a 401, tagged with
    /// a sequence number so only its own waiters clear it.
    refresh: RefCell<Option<(u64, RefreshFuture)>>,
    refresh_seq: Cell<u64>,
    /// Bumped on every invalidation; a read that started before a write must
    /// not repopulate the cache with what it fetched.
    write_epoch: Cell<u64>,
}

impl ApiClient {
    pub fn new(
        http: Rc<dyn HttpPort>,
        auth: AuthStore,
        cache: ResponseCache,
        events: EventBus,
    ) -> Self {
        Self {
            http,
            auth,
            cache: RefCell::new(cache),
            events,
            refresh: RefCell::new(None),
            refresh_seq: Cell::new(0),
            write_epoch: Cell::new(0),
        }
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn current_user(&self) -> Option<User> {
        self.auth.user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    // ─── Session lifecycle ───────────────────────────────────

    /// Restore credentials persisted by an earlier visit.
    pub async fn restore_session(&self) -> Result<Option<User>> {
        let user = self.auth.restore().await?;
        if let Some(ref u) = user {
            self.events.emit(TutorEvent::SignedIn {
                username: u.username.clone(),
            });
        }
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let body = serde_json::to_string(&LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        })?;
        let resp = self
            .http
            .send(HttpRequest::new(Method::Post, LOGIN_PATH).with_json_body(body))
            .await?;

        if !resp.ok() {
            let message = error_message(&resp).unwrap_or_else(|| "Login failed".to_string());
            log::warn!("login rejected: {}", message);
            return Err(TutorError::Auth(message));
        }

        let data: LoginResponse = serde_json::from_str(&resp.body)?;
        self.sign_in(data.access, data.refresh, data.user).await
    }

    /// Create an account. The server answers with a token pair, so a
    /// successful registration also signs the user in.
    pub async fn register(&self, req: &RegisterRequest) -> Result<User> {
        req.validate()?;
        let body = serde_json::to_string(req)?;
        let resp = self
            .http
            .send(HttpRequest::new(Method::Post, REGISTER_PATH).with_json_body(body))
            .await?;
        let resp = into_result(resp)?;

        #[derive(Deserialize)]
        struct RegisterResponse {
            user: User,
            access: Option<String>,
            refresh: Option<String>,
        }

        let data: RegisterResponse = serde_json::from_str(&resp.body)?;
        match (data.access, data.refresh) {
            (Some(access), Some(refresh)) => self.sign_in(access, refresh, data.user).await,
            _ => Ok(data.user),
        }
    }

    pub async fn profile(&self) -> Result<User> {
        self.get_json(PROFILE_PATH, &[], CacheOptions::bypass()).await
    }

    /// Forget the credentials locally. The backend keeps no server-side
    /// session, so nothing is sent.
    pub async fn logout(&self) {
        log::info!("logging out");
        if let Err(e) = self.auth.clear().await {
            log::warn!("logout: {}", e);
        }
        self.cache.borrow_mut().clear();
        self.events.emit(TutorEvent::SignedOut);
    }

    async fn sign_in(&self, access: String, refresh: String, user: User) -> Result<User> {
        // A different account must never see the previous account's reads.
        self.cache.borrow_mut().clear();
        self.auth
            .store(AuthSession {
                access_token: access,
                refresh_token: refresh,
                user: user.clone(),
            })
            .await?;
        log::info!("signed in as {}", user.username);
        self.events.emit(TutorEvent::SignedIn {
            username: user.username.clone(),
        });
        Ok(user)
    }

    // ─── Authenticated transport ─────────────────────────────

    /// Send with the bearer token, refreshing and replaying once on 401.
    /// Non-2xx responses become `TutorError::Api`.
    pub async fn send(&self, req: HttpRequest) -> Result<HttpResponse> {
        let first = self.http.send(self.authorize(req.clone())).await?;
        if first.status != 401 {
            return into_result(first);
        }

        log::info!("{} {} → 401, refreshing access token", req.method.as_str(), req.path);
        let token = match self.refresh_access_token().await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("token refresh failed: {}", e);
                self.expire_session().await;
                return Err(TutorError::Unauthorized);
            }
        };

        let retry = self.http.send(req.with_bearer(&token)).await?;
        if retry.status == 401 {
            log::warn!("request rejected again after refresh");
            self.expire_session().await;
            return Err(TutorError::Unauthorized);
        }
        into_result(retry)
    }

    fn authorize(&self, req: HttpRequest) -> HttpRequest {
        match self.auth.access_token() {
            Some(token) => req.with_bearer(&token),
            None => req,
        }
    }

    async fn refresh_access_token(&self) -> Result<String> {
        let (seq, pending) = {
            let mut slot = self.refresh.borrow_mut();
            match slot.as_ref() {
                Some((seq, fut)) => {
                    log::debug!("joining in-flight token refresh");
                    (*seq, fut.clone())
                }
                None => {
                    let seq = self.refresh_seq.get() + 1;
                    self.refresh_seq.set(seq);
                    let fut = request_new_access_token(self.http.clone(), self.auth.clone())
                        .boxed_local()
                        .shared();
                    *slot = Some((seq, fut.clone()));
                    (seq, fut)
                }
            }
        };

        let result = pending.await;

        let mut slot = self.refresh.borrow_mut();
        if matches!(slot.as_ref(), Some((s, _)) if *s == seq) {
            slot.take();
        }
        result
    }

    async fn expire_session(&self) {
        if let Err(e) = self.auth.clear().await {
            log::warn!("failed to clear credentials: {}", e);
        }
        self.cache.borrow_mut().clear();
        self.events.emit(TutorEvent::SessionExpired);
    }

    // ─── JSON helpers ────────────────────────────────────────

    /// GET through the cache. Only 2xx payloads are stored.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        opts: CacheOptions,
    ) -> Result<T> {
        let key = cache_key(path, query);
        if !opts.bypass {
            let hit = self.cache.borrow_mut().get(&key);
            if let Some(value) = hit {
                log::debug!("cache hit {}", key);
                return Ok(serde_json::from_value(value)?);
            }
        }

        let epoch = self.write_epoch.get();
        let resp = self.send(HttpRequest::new(Method::Get, key.clone())).await?;
        let value = parse_body(&resp.body)?;

        if self.write_epoch.get() == epoch {
            let mut cache = self.cache.borrow_mut();
            let ttl = opts.ttl.unwrap_or_else(|| cache.default_ttl());
            cache.set_with_ttl(key, value.clone(), ttl);
        } else {
            log::debug!("not caching {}: a write landed while it was in flight", key);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .write(Method::Post, path, Some(serde_json::to_string(body)?))
            .await?;
        Ok(serde_json::from_value(parse_body(&resp.body)?)?)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .write(Method::Put, path, Some(serde_json::to_string(body)?))
            .await?;
        Ok(serde_json::from_value(parse_body(&resp.body)?)?)
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .write(Method::Patch, path, Some(serde_json::to_string(body)?))
            .await?;
        Ok(serde_json::from_value(parse_body(&resp.body)?)?)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.write(Method::Delete, path, None).await?;
        Ok(())
    }

    async fn write(&self, method: Method, path: &str, body: Option<String>) -> Result<HttpResponse> {
        let mut req = HttpRequest::new(method, path);
        if let Some(body) = body {
            req = req.with_json_body(body);
        }
        let resp = self.send(req).await?;
        self.invalidate_resource(path);
        Ok(resp)
    }

    // ─── Cache control ───────────────────────────────────────

    /// Drop `path` and everything under its collection.
    pub fn invalidate_resource(&self, path: &str) {
        self.write_epoch.set(self.write_epoch.get() + 1);
        let mut cache = self.cache.borrow_mut();
        cache.invalidate(path);
        cache.invalidate_prefix(&collection_prefix(path));
    }

    pub fn invalidate_prefix(&self, prefix: &str) {
        self.write_epoch.set(self.write_epoch.get() + 1);
        self.cache.borrow_mut().invalidate_prefix(prefix);
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }
}

/// POST the stored refresh token and store the new access token.
async fn request_new_access_token(http: Rc<dyn HttpPort>, auth: AuthStore) -> Result<String> {
    let refresh = auth.refresh_token().ok_or(TutorError::Unauthorized)?;
    let body = serde_json::to_string(&RefreshRequest {
        refresh: refresh.clone(),
    })?;
    let resp = http
        .send(HttpRequest::new(Method::Post, REFRESH_PATH).with_json_body(body))
        .await?;
    let resp = into_result(resp)?;
    let data: RefreshResponse = serde_json::from_str(&resp.body)?;

    if auth.replace_access_token(&refresh, &data.access).await? {
        log::info!("access token refreshed");
        return Ok(data.access);
    }
    // Logged out or signed in again while the refresh was in flight; the
    // current credentials win over the stale result.
    log::info!("discarding refresh result for a replaced session");
    auth.access_token().ok_or(TutorError::Unauthorized)
}

fn into_result(resp: HttpResponse) -> Result<HttpResponse> {
    if resp.ok() {
        return Ok(resp);
    }
    let message = error_message(&resp).unwrap_or_else(|| format!("HTTP {}", resp.status));
    Err(TutorError::Api {
        status: resp.status,
        message,
    })
}

/// Empty bodies (204, DELETE) read as JSON `null`.
fn parse_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}

/// Server-provided reason for a failed request: `detail`, `message`, `error`,
/// or the first validation message, falling back to the raw body.
pub fn error_message(resp: &HttpResponse) -> Option<String> {
    let body = resp.body.trim();
    if body.is_empty() {
        return None;
    }
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return Some(body.chars().take(200).collect());
    };
    for key in ["detail", "message", "error"] {
        if let Some(text) = json.get(key).and_then(Value::as_str) {
            return Some(text.to_string());
        }
    }
    if let Some(obj) = json.as_object() {
        for value in obj.values() {
            if let Some(text) = value
                .as_array()
                .and_then(|items| items.first())
                .and_then(Value::as_str)
            {
                return Some(text.to_string());
            }
        }
    }
    Some(body.chars().take(200).collect())
}
