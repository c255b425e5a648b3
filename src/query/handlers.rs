// region:    --- Imports
use super::queries;
use crate::auction::model::{Category, Closure, CommentView, Listing, User};
use crate::database::DatabaseManager;
use sqlx::Error as SqlxError;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// 진행 중인 상품 조회
pub async fn get_active_listings(db_manager: &DatabaseManager) -> Result<Vec<Listing>, SqlxError> {
    info!("{:<12} --> 진행 중인 상품 조회", "Query");
    sqlx::query_as::<_, Listing>(queries::GET_ACTIVE_LISTINGS)
        .fetch_all(db_manager.pool())
        .await
}

/// 종료된 상품 조회
pub async fn get_closed_listings(db_manager: &DatabaseManager) -> Result<Vec<Listing>, SqlxError> {
    info!("{:<12} --> 종료된 상품 조회", "Query");
    sqlx::query_as::<_, Listing>(queries::GET_CLOSED_LISTINGS)
        .fetch_all(db_manager.pool())
        .await
}

/// 상품 조회
pub async fn get_listing(
    db_manager: &DatabaseManager,
    listing_id: i64,
) -> Result<Option<Listing>, SqlxError> {
    info!("{:<12} --> 상품 조회 id: {}", "Query", listing_id);
    sqlx::query_as::<_, Listing>(queries::GET_LISTING)
        .bind(listing_id)
        .fetch_optional(db_manager.pool())
        .await
}

/// 상품 카테고리 조회
pub async fn get_listing_categories(
    db_manager: &DatabaseManager,
    listing_id: i64,
) -> Result<Vec<Category>, SqlxError> {
    sqlx::query_as::<_, Category>(queries::GET_LISTING_CATEGORIES)
        .bind(listing_id)
        .fetch_all(db_manager.pool())
        .await
}

/// 상품 댓글 조회
pub async fn get_listing_comments(
    db_manager: &DatabaseManager,
    listing_id: i64,
) -> Result<Vec<CommentView>, SqlxError> {
    info!("{:<12} --> 상품 댓글 조회 id: {}", "Query", listing_id);
    sqlx::query_as::<_, CommentView>(queries::GET_LISTING_COMMENTS)
        .bind(listing_id)
        .fetch_all(db_manager.pool())
        .await
}

/// 상품 입찰 수 조회
pub async fn get_bid_count(db_manager: &DatabaseManager, listing_id: i64) -> Result<i64, SqlxError> {
    sqlx::query_scalar::<_, i64>(queries::COUNT_LISTING_BIDS)
        .bind(listing_id)
        .fetch_one(db_manager.pool())
        .await
}

/// 종료 정보 조회
pub async fn get_closure(
    db_manager: &DatabaseManager,
    listing_id: i64,
) -> Result<Option<Closure>, SqlxError> {
    sqlx::query_as::<_, Closure>(queries::GET_CLOSURE)
        .bind(listing_id)
        .fetch_optional(db_manager.pool())
        .await
}

/// 관심 목록 포함 여부 조회
pub async fn is_watching(
    db_manager: &DatabaseManager,
    user_id: i64,
    listing_id: i64,
) -> Result<bool, SqlxError> {
    sqlx::query_scalar::<_, bool>(queries::IS_WATCHING)
        .bind(user_id)
        .bind(listing_id)
        .fetch_one(db_manager.pool())
        .await
}

/// 관심 목록 조회
pub async fn get_watchlist(
    db_manager: &DatabaseManager,
    user_id: i64,
) -> Result<Vec<Listing>, SqlxError> {
    info!("{:<12} --> 관심 목록 조회 user: {}", "Query", user_id);
    sqlx::query_as::<_, Listing>(queries::GET_WATCHLIST)
        .bind(user_id)
        .fetch_all(db_manager.pool())
        .await
}

/// 모든 카테고리 조회
pub async fn get_categories(db_manager: &DatabaseManager) -> Result<Vec<Category>, SqlxError> {
    info!("{:<12} --> 카테고리 조회", "Query");
    sqlx::query_as::<_, Category>(queries::GET_CATEGORIES)
        .fetch_all(db_manager.pool())
        .await
}

/// 카테고리별 진행 중인 상품 조회. 없는 카테고리면 빈 목록
pub async fn get_category_listings(
    db_manager: &DatabaseManager,
    name: &str,
) -> Result<Vec<Listing>, SqlxError> {
    info!("{:<12} --> 카테고리별 상품 조회: {}", "Query", name);
    let category = sqlx::query_as::<_, Category>(queries::GET_CATEGORY_BY_NAME)
        .bind(name)
        .fetch_optional(db_manager.pool())
        .await?;

    match category {
        Some(category) => {
            sqlx::query_as::<_, Listing>(queries::GET_ACTIVE_LISTINGS_BY_CATEGORY)
                .bind(category.id)
                .fetch_all(db_manager.pool())
                .await
        }
        None => Ok(Vec::new()),
    }
}

/// 사용자 조회
pub async fn get_user(db_manager: &DatabaseManager, user_id: i64) -> Result<Option<User>, SqlxError> {
    sqlx::query_as::<_, User>(queries::GET_USER)
        .bind(user_id)
        .fetch_optional(db_manager.pool())
        .await
}

/// 사용자명으로 조회
pub async fn get_user_by_username(
    db_manager: &DatabaseManager,
    username: &str,
) -> Result<Option<User>, SqlxError> {
    sqlx::query_as::<_, User>(queries::GET_USER_BY_USERNAME)
        .bind(username)
        .fetch_optional(db_manager.pool())
        .await
}

// endregion: --- Query Handlers
