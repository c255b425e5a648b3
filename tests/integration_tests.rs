use auctions::config::Config;
use auctions::server::{self, AppState};
use auctions::store::{AuctionStore, MemoryStore};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tokio::net::TcpListener;

/// 트레이싱 초기화 (여러 테스트에서 호출되어도 안전)
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// 메모리 저장소로 서버를 임의 포트에 띄운다
async fn spawn_app() -> (String, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn AuctionStore> = store.clone();
    let config = Config::from_lookup(|_| None).expect("기본 설정");
    let state = AppState::new(shared, config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(state).into_make_service())
            .await
            .unwrap();
    });
    (format!("http://{addr}"), store)
}

/// 쿠키 유지, 리다이렉트 미추적 클라이언트
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// 회원가입 후 로그인된 클라이언트 반환
async fn signed_in(base: &str, username: &str) -> Client {
    let client = client();
    let email = format!("{username}@example.com");
    let response = client
        .post(format!("{base}/register"))
        .form(&[
            ("username", username),
            ("email", email.as_str()),
            ("password", "secret"),
            ("confirmation", "secret"),
        ])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    client
}

/// 상품 등록 후 id 반환
async fn create_listing(
    client: &Client,
    base: &str,
    store: &MemoryStore,
    title: &str,
    starting_bid: &str,
    categories: &[&str],
) -> i64 {
    let mut form = vec![
        ("title", title.to_string()),
        ("description", format!("{title} for sale")),
        ("starting_bid", starting_bid.to_string()),
        ("image", String::new()),
    ];
    for category in categories {
        form.push(("categories[]", category.to_string()));
    }

    let response = client
        .post(format!("{base}/create_listing"))
        .form(&form)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Your listing has been created!"));
    assert!(body.contains(title));

    store
        .get_active_listings()
        .await
        .unwrap()
        .into_iter()
        .find(|l| l.title == title)
        .map(|l| l.id)
        .expect("등록된 상품")
}

async fn bid(client: &Client, base: &str, listing_id: i64, amount: &str) -> String {
    let response = client
        .post(format!("{base}/bid/{listing_id}"))
        .form(&[("bid_amount", amount)])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    response.text().await.unwrap()
}

/// 회원가입 중복 메시지 테스트
#[tokio::test]
async fn test_register_duplicates() {
    let (base, _) = spawn_app().await;
    signed_in(&base, "alice").await;

    let body = client()
        .post(format!("{base}/register"))
        .form(&[
            ("username", "alice"),
            ("email", "someone@example.com"),
            ("password", "pw"),
            ("confirmation", "pw"),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Username already taken"));

    let body = client()
        .post(format!("{base}/register"))
        .form(&[
            ("username", "bob"),
            ("email", "alice@example.com"),
            ("password", "pw"),
            ("confirmation", "pw"),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Email is already in use"));

    let body = client()
        .post(format!("{base}/register"))
        .form(&[
            ("username", "carol"),
            ("email", "carol@example.com"),
            ("password", "pw"),
            ("confirmation", "other"),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Passwords must match."));
}

/// 로그인 / 로그아웃 테스트
#[tokio::test]
async fn test_login_and_logout() {
    let (base, _) = spawn_app().await;
    let alice = signed_in(&base, "alice").await;

    let body = alice.get(&base).send().await.unwrap().text().await.unwrap();
    assert!(body.contains("Signed in as <strong>alice</strong>"));

    let response = alice.get(format!("{base}/logout")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let body = alice.get(&base).send().await.unwrap().text().await.unwrap();
    assert!(body.contains("Not signed in."));

    let body = alice
        .post(format!("{base}/login"))
        .form(&[("username", "alice"), ("password", "wrong")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Invalid username and/or password."));

    let response = alice
        .post(format!("{base}/login"))
        .form(&[("username", "alice"), ("password", "secret")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let body = alice.get(&base).send().await.unwrap().text().await.unwrap();
    assert!(body.contains("Signed in as <strong>alice</strong>"));
}

/// 앞뒤 공백이 있는 사용자 이름으로 가입한 뒤 같은 입력으로 로그인
#[tokio::test]
async fn test_login_with_padded_username() {
    let (base, _) = spawn_app().await;
    let form = [
        ("username", " alice "),
        ("email", "alice@example.com"),
        ("password", "secret"),
        ("confirmation", "secret"),
    ];
    let response = client()
        .post(format!("{base}/register"))
        .form(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let alice = client();
    let response = alice
        .post(format!("{base}/login"))
        .form(&[("username", " alice "), ("password", "secret")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let body = get_text(&alice, base.clone()).await;
    assert!(body.contains("Signed in as <strong>alice</strong>"));
}

/// 입찰 → 종료 시나리오 테스트
#[tokio::test]
async fn test_bid_and_close_scenario() {
    let (base, store) = spawn_app().await;
    let owner = signed_in(&base, "owner").await;
    let b = signed_in(&base, "b").await;
    let c = signed_in(&base, "c").await;

    let listing_id = create_listing(&owner, &base, &store, "Brass Lamp", "10", &[]).await;

    // B가 15 입찰 → 수락
    let body = bid(&b, &base, listing_id, "15").await;
    assert!(body.contains("Your bid was successfully entered!"));
    assert!(body.contains("$15.00"));

    // C가 12 입찰 → 거절, 상태 유지
    let body = bid(&c, &base, listing_id, "12").await;
    assert!(body.contains("Your bid must be higher than the current price!"));
    let listing = store.get_listing(listing_id).await.unwrap().unwrap();
    assert_eq!(listing.highest_bid, 15.0);

    // 현재가와 같은 금액, 숫자가 아닌 금액 → 거절
    let body = bid(&c, &base, listing_id, "15").await;
    assert!(body.contains("Your bid must be higher than the current price!"));
    let body = bid(&c, &base, listing_id, "lots").await;
    assert!(body.contains("Your bid must be higher than the current price!"));

    // 판매자 본인 입찰 → 거절
    let body = bid(&owner, &base, listing_id, "100").await;
    assert!(body.contains("You cannot bid on your own listing!"));
    assert_eq!(store.get_bid_count(listing_id).await.unwrap(), 1);

    // 판매자가 아닌 사용자의 종료 요청 → 변화 없음
    let response = c
        .post(format!("{base}/close_listing/{listing_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(store.get_closure(listing_id).await.unwrap().is_none());

    // 판매자 종료 → 낙찰자 B
    let response = owner
        .post(format!("{base}/close_listing/{listing_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/listing/{listing_id}"));

    let body = c
        .get(format!("{base}/listing/{listing_id}"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Winner: <strong>b</strong>"));

    // 두 번째 종료 요청 → 낙찰자 유지
    let response = owner
        .post(format!("{base}/close_listing/{listing_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let closure = store.get_closure(listing_id).await.unwrap().unwrap();
    assert_eq!(closure.winner, "b");

    // 종료 후 입찰 → 거절
    let body = bid(&c, &base, listing_id, "50").await;
    assert!(body.contains("This auction has already been closed."));

    // 진행 중 목록에서 빠지고 종료 목록에 나타남
    let index = owner.get(&base).send().await.unwrap().text().await.unwrap();
    assert!(!index.contains("Brass Lamp"));
    let closed = owner
        .get(format!("{base}/closed"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(closed.contains("Brass Lamp"));
}

/// 비로그인 사용자 리다이렉트 테스트
#[tokio::test]
async fn test_anonymous_redirects() {
    let (base, store) = spawn_app().await;
    let owner = signed_in(&base, "owner").await;
    let listing_id = create_listing(&owner, &base, &store, "Chair", "5", &[]).await;
    let anonymous = client();

    let response = anonymous
        .get(format!("{base}/create_listing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = anonymous.get(format!("{base}/watchlist")).send().await.unwrap();
    assert_eq!(location(&response), "/");

    let response = anonymous
        .post(format!("{base}/bid/{listing_id}"))
        .form(&[("bid_amount", "50")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/");
    assert_eq!(store.get_bid_count(listing_id).await.unwrap(), 0);

    let response = anonymous
        .post(format!("{base}/comment/{listing_id}"))
        .form(&[("comment_content", "hello")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), format!("/listing/{listing_id}"));
    assert!(store.get_listing_comments(listing_id).await.unwrap().is_empty());

    let response = anonymous
        .post(format!("{base}/close_listing/{listing_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), format!("/listing/{listing_id}"));
    assert!(store.get_closure(listing_id).await.unwrap().is_none());
}

/// 관심 목록 토글 테스트
#[tokio::test]
async fn test_watchlist_toggle() {
    let (base, store) = spawn_app().await;
    let owner = signed_in(&base, "owner").await;
    let watcher = signed_in(&base, "watcher").await;
    let listing_id = create_listing(&owner, &base, &store, "Old Radio", "20", &[]).await;

    toggle_watchlist(&watcher, &base, listing_id).await;
    let watchlist = get_text(&watcher, format!("{base}/watchlist")).await;
    assert!(watchlist.contains("Old Radio"));
    let listing_page = get_text(&watcher, format!("{base}/listing/{listing_id}")).await;
    assert!(listing_page.contains("Remove from watchlist"));

    toggle_watchlist(&watcher, &base, listing_id).await;
    let watchlist = get_text(&watcher, format!("{base}/watchlist")).await;
    assert!(!watchlist.contains("Old Radio"));
    let listing_page = get_text(&watcher, format!("{base}/listing/{listing_id}")).await;
    assert!(listing_page.contains("Add to watchlist"));
}

async fn toggle_watchlist(client: &Client, base: &str, listing_id: i64) {
    let response = client
        .post(format!("{base}/watchlist/{listing_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/listing/{listing_id}"));
}

async fn get_text(client: &Client, url: String) -> String {
    client.get(url).send().await.unwrap().text().await.unwrap()
}

/// 댓글 / 카테고리 테스트
#[tokio::test]
async fn test_comments_and_categories() {
    let (base, store) = spawn_app().await;
    let owner = signed_in(&base, "owner").await;
    let listing_id =
        create_listing(&owner, &base, &store, "Tent", "40", &["Outdoor", "Camping"]).await;

    let response = owner
        .post(format!("{base}/comment/{listing_id}"))
        .form(&[("comment_content", "  Barely used  ")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    owner
        .post(format!("{base}/comment/{listing_id}"))
        .form(&[("comment_content", "   ")])
        .send()
        .await
        .unwrap();
    let comments = store.get_listing_comments(listing_id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].content, "Barely used");

    let body = owner
        .get(format!("{base}/listing/{listing_id}"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("<strong>owner</strong>: Barely used"));
    assert!(body.contains("<a href=\"/category/Outdoor\">Outdoor</a>"));

    let categories = owner
        .get(format!("{base}/categories"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(categories.contains("Camping"));
    assert!(categories.contains("Outdoor"));

    let category = owner
        .get(format!("{base}/category/Outdoor"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(category.contains("Tent"));

    let missing = owner
        .get(format!("{base}/category/Nothing"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(missing.contains("No listings."));
}

/// 잘못된 상품 등록 / 없는 상품 테스트
#[tokio::test]
async fn test_invalid_listing_and_missing_pages() {
    let (base, store) = spawn_app().await;
    let owner = signed_in(&base, "owner").await;

    let body = owner
        .post(format!("{base}/create_listing"))
        .form(&[("title", "Nothing"), ("starting_bid", "free")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Starting bid must be a non-negative number."));
    assert!(store.get_active_listings().await.unwrap().is_empty());

    let response = owner.get(format!("{base}/listing/999")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = owner
        .post(format!("{base}/bid/999"))
        .form(&[("bid_amount", "5")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = owner.get(format!("{base}/no/such/page")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
