// region:    --- Imports
use crate::auction::commands::{
    self, normalize_comment, parse_bid_amount, BidOutcome, CloseOutcome, ListingForm, RegisterForm,
};
use crate::auction::model::{Listing, NewListing};
use crate::error::{Error, Result, UniqueField};
use crate::password::{hash_password_blocking, verify_password_blocking};
use crate::server::AppState;
use crate::session::{end_session, start_session, Viewer};
use crate::views::Page;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Forms
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BidForm {
    pub bid_amount: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub comment_content: String,
}

// endregion: --- Forms

fn listing_url(listing_id: i64) -> String {
    format!("/listing/{listing_id}")
}

// region:    --- Account Handlers

/// 메인 페이지 (진행 중인 상품)
pub async fn index(State(state): State<AppState>, viewer: Viewer) -> Result<Page> {
    info!("{:<12} --> 메인 페이지", "Handler");
    let active_listings = state.store.get_active_listings().await?;
    Ok(Page::new("index")
        .viewer(&viewer)
        .with("active_listings", active_listings))
}

/// 로그인 폼
pub async fn login_form(viewer: Viewer) -> Page {
    Page::new("login").viewer(&viewer)
}

/// 로그인 처리
pub async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let username = form.username.trim();
    info!("{:<12} --> 로그인 요청: {}", "Handler", username);
    let user = state.store.find_user_by_username(username).await?;
    let authenticated = match &user {
        Some(user) => {
            verify_password_blocking(form.password.clone(), user.password_hash.clone()).await?
        }
        None => false,
    };

    match user {
        Some(user) if authenticated => {
            let jar = start_session(jar, &state, user.id);
            Ok((jar, Redirect::to("/")).into_response())
        }
        _ => {
            warn!("{:<12} --> 로그인 실패: {}", "Handler", username);
            Ok(Page::new("login")
                .viewer(&viewer)
                .with("message", commands::MSG_INVALID_LOGIN)
                .into_response())
        }
    }
}

/// 로그아웃
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    info!("{:<12} --> 로그아웃", "Handler");
    (end_session(jar, &state), Redirect::to("/"))
}

/// 회원가입 폼
pub async fn register_form(viewer: Viewer) -> Page {
    Page::new("register").viewer(&viewer)
}

/// 회원가입 처리
pub async fn register(
    State(state): State<AppState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    info!("{:<12} --> 회원가입 요청: {}", "Handler", form.username);
    let page = Page::new("register").viewer(&viewer);
    if let Err(message) = form.validate() {
        return Ok(page.with("message", message).into_response());
    }

    let password_hash = hash_password_blocking(form.password.clone()).await?;
    match state
        .store
        .create_user(form.username.trim(), form.email.trim(), &password_hash)
        .await
    {
        Ok(user) => {
            let jar = start_session(jar, &state, user.id);
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(Error::Conflict(field)) => {
            let message = match field {
                UniqueField::Username => commands::MSG_USERNAME_TAKEN,
                UniqueField::Email => commands::MSG_EMAIL_TAKEN,
                UniqueField::Unknown => commands::MSG_USERNAME_OR_EMAIL_TAKEN,
            };
            warn!("{:<12} --> 회원가입 중복: {:?}", "Handler", field);
            Ok(page.with("message", message).into_response())
        }
        Err(e) => Err(e),
    }
}

// endregion: --- Account Handlers

// region:    --- Listing Handlers

/// 상품 등록 폼
pub async fn create_listing_form(viewer: Viewer) -> Response {
    if viewer.user().is_none() {
        return Redirect::to("/").into_response();
    }
    Page::new("create").viewer(&viewer).into_response()
}

/// 상품 등록 처리
pub async fn create_listing(
    State(state): State<AppState>,
    viewer: Viewer,
    axum_extra::extract::Form(form): axum_extra::extract::Form<ListingForm>,
) -> Result<Response> {
    let Some(owner_id) = viewer.user_id() else {
        return Ok(Redirect::to("/").into_response());
    };

    let new_listing = match NewListing::from_form(form) {
        Ok(listing) => listing,
        Err(message) => {
            return Ok(Page::new("create")
                .viewer(&viewer)
                .with("message", message)
                .into_response())
        }
    };

    let listing = state.store.make_listing(owner_id, new_listing).await?;
    info!("{:<12} --> 상품 등록 완료 id: {}", "Handler", listing.id);

    let active_listings = state.store.get_active_listings().await?;
    Ok(Page::new("index")
        .viewer(&viewer)
        .with("creation_msg", commands::MSG_LISTING_CREATED)
        .with("active_listings", active_listings)
        .into_response())
}

/// 상품 페이지 컨텍스트 구성
async fn listing_page(state: &AppState, viewer: &Viewer, listing: Listing) -> Result<Page> {
    let categories = state.store.get_listing_categories(listing.id).await?;
    let comments = state.store.get_listing_comments(listing.id).await?;
    let bid_count = state.store.get_bid_count(listing.id).await?;
    let closure = state.store.get_closure(listing.id).await?;
    let owner = state.store.get_user(listing.owner_id).await?;
    let watching = match viewer.user_id() {
        Some(user_id) => state.store.is_watching(user_id, listing.id).await?,
        None => false,
    };
    let is_owner = viewer.user_id() == Some(listing.owner_id);

    Ok(Page::new("listing")
        .viewer(viewer)
        .with("listing", &listing)
        .with("categories", categories)
        .with("comments", comments)
        .with("bid_count", bid_count)
        .with("closure", closure)
        .with("owner", owner.map(|u| u.username))
        .with("watching", watching)
        .with("is_owner", is_owner))
}

async fn load_listing(state: &AppState, listing_id: i64) -> Result<Listing> {
    state
        .store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("listing {listing_id}")))
}

/// 상품 조회
pub async fn check_listing(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(listing_id): Path<i64>,
) -> Result<Page> {
    info!("{:<12} --> 상품 조회 id: {}", "Handler", listing_id);
    let listing = load_listing(&state, listing_id).await?;
    listing_page(&state, &viewer, listing).await
}

/// 종료된 상품 목록
pub async fn closed(State(state): State<AppState>, viewer: Viewer) -> Result<Page> {
    info!("{:<12} --> 종료된 상품 목록", "Handler");
    let closed_listings = state.store.get_closed_listings().await?;
    Ok(Page::new("closed")
        .viewer(&viewer)
        .with("closed_listings", closed_listings))
}

// endregion: --- Listing Handlers

// region:    --- Command Handlers

/// 관심 목록 토글
pub async fn toggle_watchlist(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(listing_id): Path<i64>,
) -> Result<Response> {
    let Some(user_id) = viewer.user_id() else {
        return Ok(Redirect::to("/").into_response());
    };
    load_listing(&state, listing_id).await?;
    state.store.toggle_watchlist(user_id, listing_id).await?;
    Ok(Redirect::to(&listing_url(listing_id)).into_response())
}

/// 관심 목록
pub async fn watchlist(State(state): State<AppState>, viewer: Viewer) -> Result<Response> {
    let Some(user_id) = viewer.user_id() else {
        return Ok(Redirect::to("/").into_response());
    };
    let watchlist = state.store.get_watchlist(user_id).await?;
    Ok(Page::new("watchlist")
        .viewer(&viewer)
        .with("watchlist", watchlist)
        .into_response())
}

/// 입찰 요청 처리
pub async fn bid(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(listing_id): Path<i64>,
    Form(form): Form<BidForm>,
) -> Result<Response> {
    let Some(bidder_id) = viewer.user_id() else {
        return Ok(Redirect::to("/").into_response());
    };

    let amount = parse_bid_amount(form.bid_amount.as_deref());
    info!(
        "{:<12} --> 입찰 요청 listing: {}, amount: {}",
        "Handler", listing_id, amount
    );
    let outcome = state.store.place_bid(listing_id, bidder_id, amount).await?;

    let listing = load_listing(&state, listing_id).await?;
    let page = listing_page(&state, &viewer, listing).await?;
    let page = match outcome {
        BidOutcome::Accepted { .. } => page.with("bid_success", outcome.message()),
        BidOutcome::OwnListing => page.with("owner_error", outcome.message()),
        BidOutcome::TooLow { amount, .. } => page
            .with("bid_error", outcome.message())
            .with("bid", amount),
        BidOutcome::Closed => page.with("bid_error", outcome.message()),
    };
    Ok(page.into_response())
}

/// 경매 종료 (판매자만)
pub async fn close_listing(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(listing_id): Path<i64>,
) -> Result<Response> {
    match viewer.user_id() {
        Some(user_id) => match state.store.close_listing(listing_id, user_id).await? {
            CloseOutcome::Closed { winner_id } => {
                info!(
                    "{:<12} --> 경매 종료 listing: {}, winner: {}",
                    "Handler", listing_id, winner_id
                );
            }
            CloseOutcome::AlreadyClosed { .. } => {
                info!("{:<12} --> 이미 종료된 경매: {}", "Handler", listing_id);
            }
            CloseOutcome::NotOwner => {
                warn!(
                    "{:<12} --> 판매자가 아닌 사용자의 종료 요청 listing: {}",
                    "Handler", listing_id
                );
            }
        },
        None => {
            load_listing(&state, listing_id).await?;
        }
    }
    Ok(Redirect::to(&listing_url(listing_id)).into_response())
}

/// 댓글 등록
pub async fn comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(listing_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response> {
    let redirect = Redirect::to(&listing_url(listing_id)).into_response();
    let Some(owner_id) = viewer.user_id() else {
        return Ok(redirect);
    };

    load_listing(&state, listing_id).await?;
    if let Some(content) = normalize_comment(&form.comment_content) {
        state.store.add_comment(listing_id, owner_id, &content).await?;
    }
    Ok(redirect)
}

// endregion: --- Command Handlers

// region:    --- Category Handlers

/// 카테고리 목록
pub async fn categories(State(state): State<AppState>, viewer: Viewer) -> Result<Page> {
    info!("{:<12} --> 카테고리 목록", "Handler");
    let categories = state.store.get_categories().await?;
    Ok(Page::new("categories")
        .viewer(&viewer)
        .with("categories", categories))
}

/// 카테고리별 진행 중인 상품
pub async fn category(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(name): Path<String>,
) -> Result<Page> {
    info!("{:<12} --> 카테고리별 상품: {}", "Handler", name);
    let category_listings = state.store.get_category_listings(&name).await?;
    Ok(Page::new("category")
        .viewer(&viewer)
        .with("category_listings", category_listings)
        .with("category", name))
}

pub async fn not_found() -> Error {
    Error::not_found("route")
}

// endregion: --- Category Handlers
