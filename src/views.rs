//! 서버 렌더링 페이지
//!
//! 핸들러는 템플릿 이름과 컨텍스트(JSON 맵)만 만든다. 템플릿별 HTML 조립은 이 모듈이 맡는다.

// region:    --- Imports
use crate::session::Viewer;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Write;

// endregion: --- Imports

// region:    --- Page
/// 템플릿 이름 + 컨텍스트
#[derive(Debug, Clone)]
pub struct Page {
    template: &'static str,
    context: Map<String, Value>,
}

impl Page {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            context: Map::new(),
        }
    }

    /// 컨텍스트 값 추가. 직렬화할 수 없는 값은 null
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_default();
        self.context.insert(key.to_string(), value);
        self
    }

    /// 상단 메뉴용 로그인 사용자
    pub fn viewer(self, viewer: &Viewer) -> Self {
        self.with("user", viewer.user())
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn render(&self) -> String {
        let ctx = &self.context;
        let (title, body) = match self.template {
            "index" => ("Active Listings", render_index(ctx)),
            "login" => ("Log In", render_login(ctx)),
            "register" => ("Register", render_register(ctx)),
            "create" => ("Create Listing", render_create(ctx)),
            "listing" => ("Listing", render_listing(ctx)),
            "watchlist" => ("Watchlist", render_listings_page("Watchlist", ctx, "watchlist")),
            "closed" => (
                "Closed Listings",
                render_listings_page("Closed Listings", ctx, "closed_listings"),
            ),
            "categories" => ("Categories", render_categories(ctx)),
            "category" => ("Category", render_category(ctx)),
            _ => (
                "Auctions",
                format!(
                    "<pre>{}</pre>",
                    esc(&serde_json::to_string_pretty(ctx).unwrap_or_default())
                ),
            ),
        };
        layout(title, ctx.get("user"), &body)
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        Html(self.render()).into_response()
    }
}

/// 에러 페이지 (로그인 정보 없이)
pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<h2>{}</h2>\n<p class=\"error\">{}</p>\n<a href=\"/\">Back to active listings</a>",
        status.as_u16(),
        esc(message)
    );
    layout("Error", None, &body)
}

// endregion: --- Page

// region:    --- Templates
fn layout(title: &str, user: Option<&Value>, body: &str) -> String {
    let mut nav = String::from("<a href=\"/\">Active Listings</a> <a href=\"/categories\">Categories</a> <a href=\"/closed\">Closed</a> ");
    match user.and_then(|u| u.get("username")).and_then(Value::as_str) {
        Some(username) => {
            let _ = write!(
                nav,
                "<a href=\"/create_listing\">Create Listing</a> <a href=\"/watchlist\">Watchlist</a> \
                 <span>Signed in as <strong>{}</strong></span> <a href=\"/logout\">Log Out</a>",
                esc(username)
            );
        }
        None => nav.push_str(
            "<span>Not signed in.</span> <a href=\"/login\">Log In</a> <a href=\"/register\">Register</a>",
        ),
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{} | Auctions</title>\n</head>\n<body>\n<h1>Auctions</h1>\n<nav>{}</nav>\n<hr>\n<main>\n{}\n</main>\n</body>\n</html>\n",
        esc(title),
        nav,
        body
    )
}

fn render_index(ctx: &Map<String, Value>) -> String {
    let mut out = String::from("<h2>Active Listings</h2>\n");
    out.push_str(&message(ctx, "creation_msg", "success"));
    out.push_str(&listing_cards(ctx.get("active_listings")));
    out
}

fn render_login(ctx: &Map<String, Value>) -> String {
    format!(
        "<h2>Log In</h2>\n{}<form action=\"/login\" method=\"post\">\n\
         <input name=\"username\" placeholder=\"Username\" autofocus>\n\
         <input name=\"password\" type=\"password\" placeholder=\"Password\">\n\
         <input type=\"submit\" value=\"Log In\">\n</form>\n\
         Don't have an account? <a href=\"/register\">Register here.</a>",
        message(ctx, "message", "error")
    )
}

fn render_register(ctx: &Map<String, Value>) -> String {
    format!(
        "<h2>Register</h2>\n{}<form action=\"/register\" method=\"post\">\n\
         <input name=\"username\" placeholder=\"Username\" autofocus>\n\
         <input name=\"email\" type=\"email\" placeholder=\"Email Address\">\n\
         <input name=\"password\" type=\"password\" placeholder=\"Password\">\n\
         <input name=\"confirmation\" type=\"password\" placeholder=\"Confirm Password\">\n\
         <input type=\"submit\" value=\"Register\">\n</form>\n\
         Already have an account? <a href=\"/login\">Log In here.</a>",
        message(ctx, "message", "error")
    )
}

fn render_create(ctx: &Map<String, Value>) -> String {
    format!(
        "<h2>Create Listing</h2>\n{}<form action=\"/create_listing\" method=\"post\">\n\
         <input name=\"title\" maxlength=\"64\" placeholder=\"Title\">\n\
         <textarea name=\"description\" maxlength=\"10000\" placeholder=\"Description\"></textarea>\n\
         <input name=\"starting_bid\" type=\"number\" step=\"0.01\" min=\"0\" placeholder=\"Starting bid\">\n\
         <input name=\"image\" type=\"url\" placeholder=\"Image URL (optional)\">\n\
         <input name=\"categories[]\" placeholder=\"Category\">\n\
         <input name=\"categories[]\" placeholder=\"Category\">\n\
         <input name=\"categories[]\" placeholder=\"Category\">\n\
         <input type=\"submit\" value=\"Create\">\n</form>",
        message(ctx, "message", "error")
    )
}

fn render_listing(ctx: &Map<String, Value>) -> String {
    let Some(listing) = ctx.get("listing") else {
        return String::from("<p>Listing not available.</p>");
    };
    let id = listing.get("id").and_then(Value::as_i64).unwrap_or_default();
    let mut out = String::new();

    let _ = writeln!(out, "<h2>{}</h2>", esc(str_of(listing, "title")));
    for (key, class) in [
        ("owner_error", "error"),
        ("bid_error", "error"),
        ("bid_success", "success"),
    ] {
        out.push_str(&message(ctx, key, class));
    }
    if let Some(amount) = ctx.get("bid").and_then(Value::as_f64) {
        let _ = writeln!(out, "<p>Your bid: ${amount:.2}</p>");
    }

    if let Some(image) = listing.get("image").and_then(Value::as_str) {
        let _ = writeln!(out, "<img src=\"{}\" alt=\"{}\">", esc(image), esc(str_of(listing, "title")));
    }
    let _ = writeln!(out, "<p>{}</p>", esc(str_of(listing, "description")));
    let _ = writeln!(
        out,
        "<p>Current price: <strong>${}</strong> (starting bid ${})</p>",
        money(listing.get("highest_bid")),
        money(listing.get("starting_bid"))
    );
    let bid_count = ctx.get("bid_count").and_then(Value::as_i64).unwrap_or_default();
    let _ = writeln!(out, "<p>{bid_count} bid(s) so far.</p>");
    if let Some(owner) = ctx.get("owner").and_then(Value::as_str) {
        let _ = writeln!(out, "<p>Listed by {}</p>", esc(owner));
    }

    if let Some(categories) = ctx.get("categories").and_then(Value::as_array) {
        if !categories.is_empty() {
            out.push_str("<p>Categories: ");
            let links: Vec<String> = categories
                .iter()
                .map(|c| {
                    let name = str_of(c, "name");
                    format!("<a href=\"/category/{}\">{}</a>", url_segment(name), esc(name))
                })
                .collect();
            out.push_str(&links.join(", "));
            out.push_str("</p>\n");
        }
    }

    let signed_in = ctx.get("user").is_some_and(|u| !u.is_null());
    let is_owner = ctx.get("is_owner").and_then(Value::as_bool).unwrap_or(false);
    match ctx.get("closure").filter(|c| !c.is_null()) {
        Some(closure) => {
            let _ = writeln!(
                out,
                "<p class=\"closed\">This auction is closed. Winner: <strong>{}</strong></p>",
                esc(str_of(closure, "winner"))
            );
        }
        None if signed_in => {
            if is_owner {
                let _ = writeln!(
                    out,
                    "<form action=\"/close_listing/{id}\" method=\"post\"><input type=\"submit\" value=\"Close auction\"></form>"
                );
            } else {
                let _ = writeln!(
                    out,
                    "<form action=\"/bid/{id}\" method=\"post\"><input name=\"bid_amount\" type=\"number\" step=\"0.01\" placeholder=\"Bid\"><input type=\"submit\" value=\"Place bid\"></form>"
                );
            }
        }
        None => {}
    }

    if signed_in {
        let watching = ctx.get("watching").and_then(Value::as_bool).unwrap_or(false);
        let label = if watching {
            "Remove from watchlist"
        } else {
            "Add to watchlist"
        };
        let _ = writeln!(
            out,
            "<form action=\"/watchlist/{id}\" method=\"post\"><input type=\"submit\" value=\"{label}\"></form>"
        );
    }

    out.push_str("<h3>Comments</h3>\n<ul>\n");
    for comment in ctx
        .get("comments")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let _ = writeln!(
            out,
            "<li><strong>{}</strong>: {}</li>",
            esc(str_of(comment, "author")),
            esc(str_of(comment, "content"))
        );
    }
    out.push_str("</ul>\n");
    if signed_in {
        let _ = writeln!(
            out,
            "<form action=\"/comment/{id}\" method=\"post\"><textarea name=\"comment_content\" maxlength=\"1024\"></textarea><input type=\"submit\" value=\"Comment\"></form>"
        );
    }
    out
}

fn render_listings_page(heading: &str, ctx: &Map<String, Value>, key: &str) -> String {
    format!("<h2>{}</h2>\n{}", esc(heading), listing_cards(ctx.get(key)))
}

fn render_categories(ctx: &Map<String, Value>) -> String {
    let mut out = String::from("<h2>Categories</h2>\n<ul>\n");
    for category in ctx
        .get("categories")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let name = str_of(category, "name");
        let _ = writeln!(
            out,
            "<li><a href=\"/category/{}\">{}</a></li>",
            url_segment(name),
            esc(name)
        );
    }
    out.push_str("</ul>\n");
    out
}

fn render_category(ctx: &Map<String, Value>) -> String {
    let name = ctx.get("category").and_then(Value::as_str).unwrap_or_default();
    format!(
        "<h2>Category: {}</h2>\n{}",
        esc(name),
        listing_cards(ctx.get("category_listings"))
    )
}

fn listing_cards(listings: Option<&Value>) -> String {
    let items = listings.and_then(Value::as_array).cloned().unwrap_or_default();
    if items.is_empty() {
        return String::from("<p>No listings.</p>\n");
    }

    let mut out = String::from("<ul class=\"listings\">\n");
    for listing in &items {
        let id = listing.get("id").and_then(Value::as_i64).unwrap_or_default();
        let _ = writeln!(
            out,
            "<li><a href=\"/listing/{id}\">{}</a> - ${} <p>{}</p></li>",
            esc(str_of(listing, "title")),
            money(listing.get("highest_bid")),
            esc(str_of(listing, "description"))
        );
    }
    out.push_str("</ul>\n");
    out
}

fn message(ctx: &Map<String, Value>, key: &str, class: &str) -> String {
    match ctx.get(key).and_then(Value::as_str) {
        Some(text) => format!("<p class=\"{class}\">{}</p>\n", esc(text)),
        None => String::new(),
    }
}

// endregion: --- Templates

// region:    --- Helpers
fn str_of<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn money(value: Option<&Value>) -> String {
    format!("{:.2}", value.and_then(Value::as_f64).unwrap_or_default())
}

/// HTML 이스케이프
pub fn esc(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// 경로 세그먼트 퍼센트 인코딩
fn url_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

// endregion: --- Helpers

// endregion: --- Tests
