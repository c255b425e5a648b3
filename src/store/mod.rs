// region:    --- Imports
use crate::auction::commands::{BidOutcome, CloseOutcome};
use crate::auction::model::{Category, Closure, Comment, CommentView, Listing, NewListing, User};
use crate::error::Result;
use async_trait::async_trait;

// endregion: --- Imports

// region:    --- Modules
mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

// endregion: --- Modules

// region:    --- Auction Store Trait
/// 경매 저장소 트레이트
///
/// 입찰(`place_bid`)과 경매 종료(`close_listing`)는 구현체 안에서 하나의 원자적 작업으로 처리된다.
/// 같은 상품에 대한 동시 요청은 직렬화되며, 판정은 `auction::commands`의 규칙을 그대로 따른다.
#[async_trait]
pub trait AuctionStore: Send + Sync {
    // -- 사용자
    /// 중복 시 `Error::Conflict`
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User>;
    async fn get_user(&self, user_id: i64) -> Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    // -- 상품
    async fn get_active_listings(&self) -> Result<Vec<Listing>>;
    async fn get_closed_listings(&self) -> Result<Vec<Listing>>;
    async fn make_listing(&self, owner_id: i64, listing: NewListing) -> Result<Listing>;
    async fn get_listing(&self, listing_id: i64) -> Result<Option<Listing>>;
    async fn get_listing_categories(&self, listing_id: i64) -> Result<Vec<Category>>;
    async fn get_bid_count(&self, listing_id: i64) -> Result<i64>;
    async fn get_closure(&self, listing_id: i64) -> Result<Option<Closure>>;

    // -- 입찰 / 종료
    /// 없는 상품이면 `Error::NotFound`
    async fn place_bid(&self, listing_id: i64, bidder_id: i64, amount: f64) -> Result<BidOutcome>;
    /// 없는 상품이면 `Error::NotFound`
    async fn close_listing(&self, listing_id: i64, requester_id: i64) -> Result<CloseOutcome>;

    // -- 댓글
    async fn add_comment(&self, listing_id: i64, owner_id: i64, content: &str) -> Result<Comment>;
    async fn get_listing_comments(&self, listing_id: i64) -> Result<Vec<CommentView>>;

    // -- 관심 목록
    /// 토글 후 포함 여부를 반환한다
    async fn toggle_watchlist(&self, user_id: i64, listing_id: i64) -> Result<bool>;
    async fn is_watching(&self, user_id: i64, listing_id: i64) -> Result<bool>;
    async fn get_watchlist(&self, user_id: i64) -> Result<Vec<Listing>>;

    // -- 카테고리
    async fn get_categories(&self) -> Result<Vec<Category>>;
    /// 카테고리에 속한 진행 중인 상품. 없는 카테고리면 빈 목록
    async fn get_category_listings(&self, name: &str) -> Result<Vec<Listing>>;
}

// endregion: --- Auction Store Trait
