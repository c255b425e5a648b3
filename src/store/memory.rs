// region:    --- Imports
use super::AuctionStore;
use crate::auction::commands::{evaluate_bid, resolve_winner, BidOutcome, CloseOutcome};
use crate::auction::model::{
    Bid, Category, ClosedListing, Closure, Comment, CommentView, Listing, NewListing, User,
};
use crate::error::{Error, Result, UniqueField};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Tables
#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    listings: Vec<Listing>,
    listing_categories: BTreeSet<(i64, i64)>,
    bids: Vec<Bid>,
    comments: Vec<Comment>,
    closed_listings: Vec<ClosedListing>,
    watchlist: BTreeSet<(i64, i64)>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn is_closed(&self, listing_id: i64) -> bool {
        self.closed_listings.iter().any(|c| c.listing_id == listing_id)
    }

    fn listing(&self, listing_id: i64) -> Result<&Listing> {
        self.listings
            .iter()
            .find(|l| l.id == listing_id)
            .ok_or_else(|| Error::not_found(format!("listing {listing_id}")))
    }

    fn username(&self, user_id: i64) -> String {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    /// 최신순 정렬
    fn newest_first(mut listings: Vec<Listing>) -> Vec<Listing> {
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        listings
    }

    fn category_id(&mut self, name: &str) -> i64 {
        if let Some(category) = self.categories.iter().find(|c| c.name == name) {
            return category.id;
        }
        let id = self.next_id();
        self.categories.push(Category {
            id,
            name: name.to_string(),
        });
        id
    }
}

// endregion: --- Tables

// region:    --- Memory Store
/// 프로세스 내 메모리 저장소 (DATABASE_URL이 없을 때, 테스트)
///
/// 모든 작업이 하나의 뮤텍스 안에서 끝나므로 입찰과 종료가 원자적으로 처리된다.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }
}

#[async_trait]
impl AuctionStore for MemoryStore {
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User> {
        info!("{:<12} --> 사용자 등록: {}", "Store", username);
        self.with_tables(|t| -> Result<User> {
            if t.users.iter().any(|u| u.username == username) {
                return Err(Error::Conflict(UniqueField::Username));
            }
            if t.users.iter().any(|u| u.email == email) {
                return Err(Error::Conflict(UniqueField::Email));
            }
            let user = User {
                id: t.next_id(),
                username: username.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                created_at: Utc::now(),
            };
            t.users.push(user.clone());
            Ok(user)
        })
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.with_tables(|t| t.users.iter().find(|u| u.id == user_id).cloned()))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.with_tables(|t| t.users.iter().find(|u| u.username == username).cloned()))
    }

    async fn get_active_listings(&self) -> Result<Vec<Listing>> {
        Ok(self.with_tables(|t| {
            let active = t
                .listings
                .iter()
                .filter(|l| !t.is_closed(l.id))
                .cloned()
                .collect();
            Tables::newest_first(active)
        }))
    }

    async fn get_closed_listings(&self) -> Result<Vec<Listing>> {
        Ok(self.with_tables(|t| {
            let closed = t
                .listings
                .iter()
                .filter(|l| t.is_closed(l.id))
                .cloned()
                .collect();
            Tables::newest_first(closed)
        }))
    }

    async fn make_listing(&self, owner_id: i64, listing: NewListing) -> Result<Listing> {
        info!("{:<12} --> 상품 등록 owner: {}", "Store", owner_id);
        Ok(self.with_tables(|t| {
            let created = Listing {
                id: t.next_id(),
                owner_id,
                title: listing.title,
                description: listing.description,
                starting_bid: listing.starting_bid,
                highest_bid: listing.starting_bid,
                image: listing.image,
                created_at: Utc::now(),
            };
            for name in &listing.categories {
                let category_id = t.category_id(name);
                t.listing_categories.insert((created.id, category_id));
            }
            t.listings.push(created.clone());
            created
        }))
    }

    async fn get_listing(&self, listing_id: i64) -> Result<Option<Listing>> {
        Ok(self.with_tables(|t| t.listings.iter().find(|l| l.id == listing_id).cloned()))
    }

    async fn get_listing_categories(&self, listing_id: i64) -> Result<Vec<Category>> {
        Ok(self.with_tables(|t| {
            let mut categories: Vec<Category> = t
                .categories
                .iter()
                .filter(|c| t.listing_categories.contains(&(listing_id, c.id)))
                .cloned()
                .collect();
            categories.sort_by(|a, b| a.name.cmp(&b.name));
            categories
        }))
    }

    async fn get_bid_count(&self, listing_id: i64) -> Result<i64> {
        Ok(self.with_tables(|t| {
            t.bids.iter().filter(|b| b.listing_id == listing_id).count() as i64
        }))
    }

    async fn get_closure(&self, listing_id: i64) -> Result<Option<Closure>> {
        Ok(self.with_tables(|t| {
            t.closed_listings
                .iter()
                .find(|c| c.listing_id == listing_id)
                .map(|c| Closure {
                    listing_id,
                    winner_id: c.winner_id,
                    winner: t.username(c.winner_id),
                })
        }))
    }

    async fn place_bid(&self, listing_id: i64, bidder_id: i64, amount: f64) -> Result<BidOutcome> {
        info!(
            "{:<12} --> 입찰 처리 listing: {}, bidder: {}, amount: {}",
            "Store", listing_id, bidder_id, amount
        );
        let outcome = self.with_tables(|t| {
            let closed = t.is_closed(listing_id);
            let outcome = evaluate_bid(t.listing(listing_id)?, closed, bidder_id, amount);

            if let BidOutcome::Accepted { amount } = outcome {
                if let Some(listing) = t.listings.iter_mut().find(|l| l.id == listing_id) {
                    listing.highest_bid = amount;
                }
                let id = t.next_id();
                t.bids.push(Bid {
                    id,
                    listing_id,
                    bidder_id,
                    amount,
                    created_at: Utc::now(),
                });
            }
            Ok::<_, Error>(outcome)
        })?;

        if !outcome.is_accepted() {
            warn!("{:<12} --> 입찰 거절: {:?}", "Store", outcome);
        }
        Ok(outcome)
    }

    async fn close_listing(&self, listing_id: i64, requester_id: i64) -> Result<CloseOutcome> {
        info!(
            "{:<12} --> 경매 종료 요청 listing: {}, requester: {}",
            "Store", listing_id, requester_id
        );
        self.with_tables(|t| -> Result<CloseOutcome> {
            let listing = t.listing(listing_id)?.clone();
            if listing.owner_id != requester_id {
                return Ok(CloseOutcome::NotOwner);
            }
            if let Some(closed) = t.closed_listings.iter().find(|c| c.listing_id == listing_id) {
                return Ok(CloseOutcome::AlreadyClosed {
                    winner_id: closed.winner_id,
                });
            }

            let winner_id = resolve_winner(&listing, &t.bids);
            let id = t.next_id();
            t.closed_listings.push(ClosedListing {
                id,
                listing_id,
                winner_id,
            });
            Ok(CloseOutcome::Closed { winner_id })
        })
    }

    async fn add_comment(&self, listing_id: i64, owner_id: i64, content: &str) -> Result<Comment> {
        info!("{:<12} --> 댓글 등록 listing: {}", "Store", listing_id);
        self.with_tables(|t| -> Result<Comment> {
            t.listing(listing_id)?;
            let comment = Comment {
                id: t.next_id(),
                listing_id,
                owner_id,
                content: content.to_string(),
                created_at: Utc::now(),
            };
            t.comments.push(comment.clone());
            Ok(comment)
        })
    }

    async fn get_listing_comments(&self, listing_id: i64) -> Result<Vec<CommentView>> {
        Ok(self.with_tables(|t| {
            t.comments
                .iter()
                .filter(|c| c.listing_id == listing_id)
                .map(|c| CommentView {
                    id: c.id,
                    content: c.content.clone(),
                    author: t.username(c.owner_id),
                    created_at: c.created_at,
                })
                .collect()
        }))
    }

    async fn toggle_watchlist(&self, user_id: i64, listing_id: i64) -> Result<bool> {
        let watching = self.with_tables(|t| {
            t.listing(listing_id)?;
            let key = (user_id, listing_id);
            if t.watchlist.remove(&key) {
                Ok::<_, Error>(false)
            } else {
                t.watchlist.insert(key);
                Ok(true)
            }
        })?;
        info!(
            "{:<12} --> 관심 목록 토글 user: {}, listing: {}, watching: {}",
            "Store", user_id, listing_id, watching
        );
        Ok(watching)
    }

    async fn is_watching(&self, user_id: i64, listing_id: i64) -> Result<bool> {
        Ok(self.with_tables(|t| t.watchlist.contains(&(user_id, listing_id))))
    }

    async fn get_watchlist(&self, user_id: i64) -> Result<Vec<Listing>> {
        Ok(self.with_tables(|t| {
            let watched = t
                .listings
                .iter()
                .filter(|l| t.watchlist.contains(&(user_id, l.id)))
                .cloned()
                .collect();
            Tables::newest_first(watched)
        }))
    }

    async fn get_categories(&self) -> Result<Vec<Category>> {
        Ok(self.with_tables(|t| {
            let mut categories = t.categories.clone();
            categories.sort_by(|a, b| a.name.cmp(&b.name));
            categories
        }))
    }

    async fn get_category_listings(&self, name: &str) -> Result<Vec<Listing>> {
        Ok(self.with_tables(|t| {
            let Some(category) = t.categories.iter().find(|c| c.name == name) else {
                return Vec::new();
            };
            let listings = t
                .listings
                .iter()
                .filter(|l| t.listing_categories.contains(&(l.id, category.id)))
                .filter(|l| !t.is_closed(l.id))
                .cloned()
                .collect();
            Tables::newest_first(listings)
        }))
    }
}

// endregion: --- Memory Store

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_listing(title: &str, starting_bid: f64, categories: &[&str]) -> NewListing {
        NewListing {
            title: title.to_string(),
            description: format!("{title} description"),
            starting_bid,
            image: None,
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(name, &format!("{name}@example.com"), "hash")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_username_and_email_are_distinguished() {
        let store = MemoryStore::new();
        user(&store, "alice").await;

        let err = store
            .create_user("alice", "other@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(UniqueField::Username)));

        let err = store
            .create_user("bob", "alice@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(UniqueField::Email)));
    }

    #[tokio::test]
    async fn highest_bid_starts_at_starting_bid() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let listing = store
            .make_listing(owner.id, new_listing("Lamp", 10.0, &[]))
            .await
            .unwrap();
        assert_eq!(listing.highest_bid, 10.0);
        assert_eq!(listing.starting_bid, 10.0);
    }

    #[tokio::test]
    async fn bid_scenario_from_start_to_close() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let b = user(&store, "b").await;
        let c = user(&store, "c").await;
        let listing = store
            .make_listing(owner.id, new_listing("Lamp", 10.0, &[]))
            .await
            .unwrap();

        let outcome = store.place_bid(listing.id, b.id, 15.0).await.unwrap();
        assert_eq!(outcome, BidOutcome::Accepted { amount: 15.0 });

        let outcome = store.place_bid(listing.id, c.id, 12.0).await.unwrap();
        assert!(matches!(outcome, BidOutcome::TooLow { .. }));

        let current = store.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(current.highest_bid, 15.0);
        assert_eq!(store.get_bid_count(listing.id).await.unwrap(), 1);

        let outcome = store.close_listing(listing.id, owner.id).await.unwrap();
        assert_eq!(outcome, CloseOutcome::Closed { winner_id: b.id });

        let closure = store.get_closure(listing.id).await.unwrap().unwrap();
        assert_eq!(closure.winner, "b");
    }

    #[tokio::test]
    async fn equal_bid_and_owner_bid_leave_state_unchanged() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let b = user(&store, "b").await;
        let listing = store
            .make_listing(owner.id, new_listing("Lamp", 10.0, &[]))
            .await
            .unwrap();

        let outcome = store.place_bid(listing.id, b.id, 10.0).await.unwrap();
        assert!(matches!(outcome, BidOutcome::TooLow { .. }));
        let outcome = store.place_bid(listing.id, owner.id, 50.0).await.unwrap();
        assert_eq!(outcome, BidOutcome::OwnListing);

        let current = store.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(current.highest_bid, 10.0);
        assert_eq!(store.get_bid_count(listing.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn close_is_owner_only_and_happens_once() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let b = user(&store, "b").await;
        let listing = store
            .make_listing(owner.id, new_listing("Lamp", 10.0, &[]))
            .await
            .unwrap();

        assert_eq!(
            store.close_listing(listing.id, b.id).await.unwrap(),
            CloseOutcome::NotOwner
        );
        assert!(store.get_closure(listing.id).await.unwrap().is_none());

        assert_eq!(
            store.close_listing(listing.id, owner.id).await.unwrap(),
            CloseOutcome::Closed {
                winner_id: owner.id
            }
        );
        assert_eq!(
            store.close_listing(listing.id, owner.id).await.unwrap(),
            CloseOutcome::AlreadyClosed {
                winner_id: owner.id
            }
        );
        assert_eq!(store.get_closed_listings().await.unwrap().len(), 1);

        let outcome = store.place_bid(listing.id, b.id, 99.0).await.unwrap();
        assert_eq!(outcome, BidOutcome::Closed);
        let current = store.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(current.highest_bid, 10.0);
    }

    #[tokio::test]
    async fn active_listings_exclude_exactly_closed_ones() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let mut ids = Vec::new();
        for title in ["a", "b", "c", "d"] {
            let listing = store
                .make_listing(owner.id, new_listing(title, 1.0, &[]))
                .await
                .unwrap();
            ids.push(listing.id);
        }
        store.close_listing(ids[1], owner.id).await.unwrap();
        store.close_listing(ids[3], owner.id).await.unwrap();

        let mut active: Vec<i64> = store
            .get_active_listings()
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        active.sort();
        assert_eq!(active, vec![ids[0], ids[2]]);

        let mut closed: Vec<i64> = store
            .get_closed_listings()
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        closed.sort();
        assert_eq!(closed, vec![ids[1], ids[3]]);
    }

    #[tokio::test]
    async fn watchlist_toggle_twice_restores_state() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let b = user(&store, "b").await;
        let listing = store
            .make_listing(owner.id, new_listing("Lamp", 10.0, &[]))
            .await
            .unwrap();

        assert!(!store.is_watching(b.id, listing.id).await.unwrap());
        assert!(store.toggle_watchlist(b.id, listing.id).await.unwrap());
        assert_eq!(store.get_watchlist(b.id).await.unwrap().len(), 1);
        assert!(!store.toggle_watchlist(b.id, listing.id).await.unwrap());
        assert!(!store.is_watching(b.id, listing.id).await.unwrap());
        assert!(store.get_watchlist(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn categories_are_shared_and_filter_active_listings() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let bike = store
            .make_listing(owner.id, new_listing("Bike", 1.0, &["Sports", "Outdoor"]))
            .await
            .unwrap();
        let ball = store
            .make_listing(owner.id, new_listing("Ball", 1.0, &["Sports"]))
            .await
            .unwrap();

        let names: Vec<String> = store
            .get_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Outdoor", "Sports"]);

        let sports = store.get_category_listings("Sports").await.unwrap();
        assert_eq!(sports.len(), 2);

        store.close_listing(ball.id, owner.id).await.unwrap();
        let sports = store.get_category_listings("Sports").await.unwrap();
        assert_eq!(sports.iter().map(|l| l.id).collect::<Vec<_>>(), vec![bike.id]);

        assert!(store.get_category_listings("Toys").await.unwrap().is_empty());
        assert_eq!(store.get_listing_categories(bike.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn comments_carry_author_name() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let listing = store
            .make_listing(owner.id, new_listing("Lamp", 10.0, &[]))
            .await
            .unwrap();
        store.add_comment(listing.id, owner.id, "first").await.unwrap();

        let comments = store.get_listing_comments(listing.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author, "owner");
        assert_eq!(comments[0].content, "first");

        let err = store.add_comment(9999, owner.id, "lost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bids_never_lower_highest_bid() {
        let store = Arc::new(MemoryStore::new());
        let owner = user(&store, "owner").await;
        let listing = store
            .make_listing(owner.id, new_listing("Lamp", 10.0, &[]))
            .await
            .unwrap();

        let mut bidders = Vec::new();
        for i in 0..20 {
            bidders.push(user(&store, &format!("bidder{i}")).await);
        }

        // 금액이 섞인 순서로 동시에 입찰
        let listing_id = listing.id;
        let mut handles = Vec::new();
        for (i, bidder) in bidders.iter().enumerate() {
            let store = Arc::clone(&store);
            let bidder_id = bidder.id;
            let amount = 11.0 + ((i * 7) % 20) as f64;
            handles.push(tokio::spawn(async move {
                store.place_bid(listing_id, bidder_id, amount).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let current = store.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(current.highest_bid, 30.0);

        // 수락된 입찰은 등록 순서대로 금액이 증가해야 한다
        let amounts: Vec<f64> = store.with_tables(|t| {
            t.bids
                .iter()
                .filter(|b| b.listing_id == listing.id)
                .map(|b| b.amount)
                .collect()
        });
        assert!(amounts.windows(2).all(|w| w[0] < w[1]));

        let top_bidder = bidders
            .iter()
            .enumerate()
            .find(|(i, _)| 11.0 + ((i * 7) % 20) as f64 == 30.0)
            .map(|(_, b)| b.id)
            .unwrap();
        assert_eq!(
            store.close_listing(listing.id, owner.id).await.unwrap(),
            CloseOutcome::Closed {
                winner_id: top_bidder
            }
        );
    }

    #[tokio::test]
    async fn bid_on_unknown_listing_is_not_found() {
        let store = MemoryStore::new();
        let b = user(&store, "b").await;
        let err = store.place_bid(42, b.id, 5.0).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
// endregion: --- Tests
