// region:    --- Imports
use crate::auction::model::User;
use crate::error::Error;
use crate::server::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Session Store
pub const SESSION_COOKIE_NAME: &str = "auctions_session";

#[derive(Debug, Clone, Copy)]
struct SessionData {
    user_id: i64,
    created_at: DateTime<Utc>,
}

/// 세션 id → 사용자 id 매핑 (서버 메모리). `max_age`가 지난 세션은 무효
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(max_age: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_age,
        }
    }

    /// 새 세션 발급. 발급할 때마다 만료된 세션을 정리한다
    pub fn create(&self, user_id: i64) -> String {
        self.cleanup_expired_sessions();
        let session_id = Uuid::new_v4().to_string();
        let session = SessionData {
            user_id,
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.clone(), session);
        debug!("{:<12} --> 세션 발급 user: {}", "Session", user_id);
        session_id
    }

    /// 만료된 세션이면 삭제하고 None
    pub fn user_id(&self, session_id: &str) -> Option<i64> {
        let session = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .copied()?;
        if self.is_expired(&session, Utc::now()) {
            debug!("{:<12} --> 만료된 세션 user: {}", "Session", session.user_id);
            self.remove(session_id);
            return None;
        }
        Some(session.user_id)
    }

    pub fn remove(&self, session_id: &str) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
    }

    pub fn cleanup_expired_sessions(&self) {
        let now = Utc::now();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, session| !self.is_expired(session, now));
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, session: &SessionData, now: DateTime<Utc>) -> bool {
        now - session.created_at >= self.max_age
    }
}

// endregion: --- Session Store

// region:    --- Cookies
pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// 로그인: 기존 세션이 있으면 폐기하고 새 쿠키를 심는다
pub fn start_session(jar: CookieJar, state: &AppState, user_id: i64) -> CookieJar {
    if let Some(old) = jar.get(SESSION_COOKIE_NAME) {
        state.sessions.remove(old.value());
    }
    let session_id = state.sessions.create(user_id);
    jar.add(session_cookie(session_id, state.config.cookie_secure))
}

/// 로그아웃: 서버 세션 삭제 후 쿠키 만료
pub fn end_session(jar: CookieJar, state: &AppState) -> CookieJar {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        state.sessions.remove(cookie.value());
    }
    jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/"))
}

// endregion: --- Cookies

// region:    --- Viewer
/// 현재 요청의 로그인 사용자 (비로그인이면 None)
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(user_id) = jar
            .get(SESSION_COOKIE_NAME)
            .and_then(|cookie| state.sessions.user_id(cookie.value()))
        else {
            return Ok(Viewer(None));
        };

        let user = state.store.get_user(user_id).await?;
        if user.is_none() {
            warn!("{:<12} --> 세션의 사용자가 존재하지 않음: {}", "Session", user_id);
        }
        Ok(Viewer(user))
    }
}

// endregion: --- Viewer

// endregion: --- Tests
