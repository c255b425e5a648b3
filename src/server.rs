// region:    --- Imports
use crate::config::Config;
use crate::database::DatabaseManager;
use crate::handlers;
use crate::session::SessionStore;
use crate::store::{AuctionStore, MemoryStore, PgStore};
use axum::routing::{get, post};
use axum::Router;
use chrono::Duration;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- App State
/// 요청마다 복제되는 공유 상태
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuctionStore>,
    pub sessions: SessionStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn AuctionStore>, config: Config) -> Self {
        Self {
            store,
            sessions: SessionStore::new(Duration::seconds(config.session_max_age_secs)),
            config: Arc::new(config),
        }
    }

    /// 설정에 따라 저장소 선택. DATABASE_URL이 있으면 Postgres, 없으면 메모리
    pub async fn from_config(config: Config) -> crate::error::Result<Self> {
        let store: Arc<dyn AuctionStore> = match DatabaseManager::from_config(&config).await? {
            Some(db_manager) => {
                if config.init_schema {
                    db_manager.initialize_database().await?;
                }
                info!("{:<12} --> PostgreSQL 저장소 사용", "Main");
                Arc::new(PgStore::new(Arc::new(db_manager)))
            }
            None => {
                warn!(
                    "{:<12} --> DATABASE_URL 미설정: 메모리 저장소 사용 (재시작 시 데이터 소실)",
                    "Main"
                );
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(store, config))
    }
}

// endregion: --- App State

// region:    --- Router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/register", get(handlers::register_form).post(handlers::register))
        .route(
            "/create_listing",
            get(handlers::create_listing_form).post(handlers::create_listing),
        )
        .route("/listing/:id", get(handlers::check_listing))
        .route("/watchlist/:id", post(handlers::toggle_watchlist))
        .route("/watchlist", get(handlers::watchlist))
        .route("/bid/:id", post(handlers::bid))
        .route("/close_listing/:id", post(handlers::close_listing))
        .route("/closed", get(handlers::closed))
        .route("/comment/:id", post(handlers::comment))
        .route("/categories", get(handlers::categories))
        .route("/category/:name", get(handlers::category))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// endregion: --- Router
