//! Credential store: the token pair and user, mirrored between memory and
//! persistent storage under the fixed keys `accessToken`, `refreshToken`
//! and `user`.

use std::cell::RefCell;
use std::rc::Rc;

use tutor_types::{
    Result, TutorError,
    auth::{AuthSession, User},
    config::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY},
};

use crate::ports::StoragePort;

/// Shared credential store: clone-cheap via Rc.
#[derive(Clone)]
pub struct AuthStore {
    storage: Rc<dyn StoragePort>,
    current: Rc<RefCell<Option<AuthSession>>>,
}

impl AuthStore {
    pub fn new(storage: Rc<dyn StoragePort>) -> Self {
        Self {
            storage,
            current: Rc::new(RefCell::new(None)),
        }
    }

    /// Load the persisted triple. All three keys must be present and the user
    /// must parse, otherwise the store stays signed out.
    pub async fn restore(&self) -> Result<Option<User>> {
        let access = self.read_string(ACCESS_TOKEN_KEY).await?;
        let refresh = self.read_string(REFRESH_TOKEN_KEY).await?;
        let user = self.read_string(USER_KEY).await?;

        let (Some(access_token), Some(refresh_token), Some(user_json)) = (access, refresh, user)
        else {
            log::debug!("auth: no persisted session");
            return Ok(None);
        };

        let user: User = match serde_json::from_str(&user_json) {
            Ok(u) => u,
            Err(e) => {
                log::warn!("auth: discarding unreadable persisted user ({})", e);
                return Ok(None);
            }
        };

        log::info!("auth: restored session for {}", user.username);
        *self.current.borrow_mut() = Some(AuthSession {
            access_token,
            refresh_token,
            user: user.clone(),
        });
        Ok(Some(user))
    }

    pub async fn store(&self, session: AuthSession) -> Result<()> {
        let user_json = serde_json::to_string(&session.user)?;
        *self.current.borrow_mut() = Some(session.clone());
        self.storage
            .set(ACCESS_TOKEN_KEY, session.access_token.as_bytes())
            .await?;
        self.storage
            .set(REFRESH_TOKEN_KEY, session.refresh_token.as_bytes())
            .await?;
        self.storage.set(USER_KEY, user_json.as_bytes()).await?;
        Ok(())
    }

    /// Replace the access token, but only if the session still holds the
    /// refresh token that produced it. Returns whether the write happened.
    pub async fn replace_access_token(&self, issued_for: &str, access_token: &str) -> Result<bool> {
        {
            let mut current = self.current.borrow_mut();
            match current.as_mut() {
                Some(session) if session.refresh_token == issued_for => {
                    session.access_token = access_token.to_string();
                }
                _ => return Ok(false),
            }
        }
        self.storage
            .set(ACCESS_TOKEN_KEY, access_token.as_bytes())
            .await?;
        Ok(true)
    }

    /// Forget everything, in memory and in storage.
    pub async fn clear(&self) -> Result<()> {
        self.current.borrow_mut().take();
        let mut first_err: Option<TutorError> = None;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.delete(key).await {
                log::warn!("auth: failed to delete {}: {}", key, e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|s| s.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|s| s.refresh_token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.current.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    async fn read_string(&self, key: &str) -> Result<Option<String>> {
        match self.storage.get(key).await? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| TutorError::Storage(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }
}
