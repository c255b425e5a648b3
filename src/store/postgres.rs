// region:    --- Imports
use super::AuctionStore;
use crate::auction::commands::{evaluate_bid, resolve_winner, BidOutcome, CloseOutcome};
use crate::auction::model::{
    Bid, Category, ClosedListing, Closure, Comment, CommentView, Listing, NewListing, User,
};
use crate::database::DatabaseManager;
use crate::error::{Error, Result, UniqueField};
use crate::query::{handlers, queries};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Postgres Store
/// PostgreSQL 저장소 구현체
pub struct PgStore {
    db_manager: Arc<DatabaseManager>,
}

impl PgStore {
    pub fn new(db_manager: Arc<DatabaseManager>) -> Self {
        Self { db_manager }
    }
}

/// 유일성 제약 위반을 컬럼별 충돌 에러로 변환
fn map_unique_violation(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some("users_username_key") => UniqueField::Username,
                Some("users_email_key") => UniqueField::Email,
                _ => UniqueField::Unknown,
            };
            return Error::Conflict(field);
        }
    }
    Error::Database(err)
}

#[async_trait]
impl AuctionStore for PgStore {
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User> {
        info!("{:<12} --> 사용자 등록: {}", "Store", username);
        sqlx::query_as::<_, User>(queries::INSERT_USER)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_one(self.db_manager.pool())
            .await
            .map_err(map_unique_violation)
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(handlers::get_user(&self.db_manager, user_id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(handlers::get_user_by_username(&self.db_manager, username).await?)
    }

    async fn get_active_listings(&self) -> Result<Vec<Listing>> {
        Ok(handlers::get_active_listings(&self.db_manager).await?)
    }

    async fn get_closed_listings(&self) -> Result<Vec<Listing>> {
        Ok(handlers::get_closed_listings(&self.db_manager).await?)
    }

    async fn make_listing(&self, owner_id: i64, listing: NewListing) -> Result<Listing> {
        info!("{:<12} --> 상품 등록 owner: {}", "Store", owner_id);
        self.db_manager
            .transaction(move |tx| {
                Box::pin(async move {
                    let created = sqlx::query_as::<_, Listing>(queries::INSERT_LISTING)
                        .bind(owner_id)
                        .bind(&listing.title)
                        .bind(&listing.description)
                        .bind(listing.starting_bid)
                        .bind(&listing.image)
                        .fetch_one(&mut **tx)
                        .await?;

                    for name in &listing.categories {
                        let category_id = sqlx::query_scalar::<_, i64>(queries::UPSERT_CATEGORY)
                            .bind(name)
                            .fetch_one(&mut **tx)
                            .await?;
                        sqlx::query(queries::LINK_LISTING_CATEGORY)
                            .bind(created.id)
                            .bind(category_id)
                            .execute(&mut **tx)
                            .await?;
                    }

                    Ok::<_, Error>(created)
                })
            })
            .await
    }

    async fn get_listing(&self, listing_id: i64) -> Result<Option<Listing>> {
        Ok(handlers::get_listing(&self.db_manager, listing_id).await?)
    }

    async fn get_listing_categories(&self, listing_id: i64) -> Result<Vec<Category>> {
        Ok(handlers::get_listing_categories(&self.db_manager, listing_id).await?)
    }

    async fn get_bid_count(&self, listing_id: i64) -> Result<i64> {
        Ok(handlers::get_bid_count(&self.db_manager, listing_id).await?)
    }

    async fn get_closure(&self, listing_id: i64) -> Result<Option<Closure>> {
        Ok(handlers::get_closure(&self.db_manager, listing_id).await?)
    }

    /// 상품 행을 잠근 뒤 판정하고, 수락이면 최고가 갱신과 입찰 등록을 같은 트랜잭션에서 처리
    async fn place_bid(&self, listing_id: i64, bidder_id: i64, amount: f64) -> Result<BidOutcome> {
        info!(
            "{:<12} --> 입찰 처리 listing: {}, bidder: {}, amount: {}",
            "Store", listing_id, bidder_id, amount
        );
        let outcome = self
            .db_manager
            .transaction(move |tx| {
                Box::pin(async move {
                    let listing = sqlx::query_as::<_, Listing>(queries::GET_LISTING_FOR_UPDATE)
                        .bind(listing_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .ok_or_else(|| Error::not_found(format!("listing {listing_id}")))?;

                    let closed = sqlx::query_as::<_, ClosedListing>(queries::GET_CLOSED_LISTING)
                        .bind(listing_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .is_some();

                    let outcome = evaluate_bid(&listing, closed, bidder_id, amount);
                    if let BidOutcome::Accepted { amount } = outcome {
                        sqlx::query(queries::UPDATE_HIGHEST_BID)
                            .bind(listing_id)
                            .bind(amount)
                            .execute(&mut **tx)
                            .await?;
                        sqlx::query_as::<_, Bid>(queries::INSERT_BID)
                            .bind(listing_id)
                            .bind(bidder_id)
                            .bind(amount)
                            .fetch_one(&mut **tx)
                            .await?;
                    }

                    Ok::<_, Error>(outcome)
                })
            })
            .await?;

        if !outcome.is_accepted() {
            warn!("{:<12} --> 입찰 거절: {:?}", "Store", outcome);
        }
        Ok(outcome)
    }

    /// 상품 행을 잠근 뒤 낙찰자를 결정하고 종료 기록을 남긴다
    async fn close_listing(&self, listing_id: i64, requester_id: i64) -> Result<CloseOutcome> {
        info!(
            "{:<12} --> 경매 종료 요청 listing: {}, requester: {}",
            "Store", listing_id, requester_id
        );
        self.db_manager
            .transaction(move |tx| {
                Box::pin(async move {
                    let listing = sqlx::query_as::<_, Listing>(queries::GET_LISTING_FOR_UPDATE)
                        .bind(listing_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .ok_or_else(|| Error::not_found(format!("listing {listing_id}")))?;

                    if listing.owner_id != requester_id {
                        return Ok(CloseOutcome::NotOwner);
                    }

                    let existing = sqlx::query_as::<_, ClosedListing>(queries::GET_CLOSED_LISTING)
                        .bind(listing_id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    if let Some(closed) = existing {
                        return Ok(CloseOutcome::AlreadyClosed {
                            winner_id: closed.winner_id,
                        });
                    }

                    let bids = sqlx::query_as::<_, Bid>(queries::GET_LISTING_BIDS)
                        .bind(listing_id)
                        .fetch_all(&mut **tx)
                        .await?;
                    let winner_id = resolve_winner(&listing, &bids);

                    sqlx::query(queries::INSERT_CLOSED_LISTING)
                        .bind(listing_id)
                        .bind(winner_id)
                        .execute(&mut **tx)
                        .await?;

                    Ok::<_, Error>(CloseOutcome::Closed { winner_id })
                })
            })
            .await
    }

    async fn add_comment(&self, listing_id: i64, owner_id: i64, content: &str) -> Result<Comment> {
        info!("{:<12} --> 댓글 등록 listing: {}", "Store", listing_id);
        Ok(sqlx::query_as::<_, Comment>(queries::INSERT_COMMENT)
            .bind(listing_id)
            .bind(owner_id)
            .bind(content)
            .fetch_one(self.db_manager.pool())
            .await?)
    }

    async fn get_listing_comments(&self, listing_id: i64) -> Result<Vec<CommentView>> {
        Ok(handlers::get_listing_comments(&self.db_manager, listing_id).await?)
    }

    /// 상품 행을 잠가 같은 상품에 대한 토글을 직렬화한다
    async fn toggle_watchlist(&self, user_id: i64, listing_id: i64) -> Result<bool> {
        let added = self
            .db_manager
            .transaction(move |tx| {
                Box::pin(async move {
                    sqlx::query_as::<_, Listing>(queries::GET_LISTING_FOR_UPDATE)
                        .bind(listing_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .ok_or_else(|| Error::not_found(format!("listing {listing_id}")))?;

                    let added = sqlx::query_scalar::<_, i64>(queries::TOGGLE_WATCHLIST)
                        .bind(user_id)
                        .bind(listing_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .is_some();
                    Ok::<_, Error>(added)
                })
            })
            .await?;
        info!(
            "{:<12} --> 관심 목록 토글 user: {}, listing: {}, watching: {}",
            "Store", user_id, listing_id, added
        );
        Ok(added)
    }

    async fn is_watching(&self, user_id: i64, listing_id: i64) -> Result<bool> {
        Ok(handlers::is_watching(&self.db_manager, user_id, listing_id).await?)
    }

    async fn get_watchlist(&self, user_id: i64) -> Result<Vec<Listing>> {
        Ok(handlers::get_watchlist(&self.db_manager, user_id).await?)
    }

    async fn get_categories(&self) -> Result<Vec<Category>> {
        Ok(handlers::get_categories(&self.db_manager).await?)
    }

    async fn get_category_listings(&self, name: &str) -> Result<Vec<Listing>> {
        Ok(handlers::get_category_listings(&self.db_manager, name).await?)
    }
}

// endregion: --- Postgres Store
