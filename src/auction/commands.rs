/// 경매 관련 커맨드 규칙
/// 1. 상품 등록 검증
/// 2. 입찰 판정
/// 3. 경매 종료 및 낙찰자 결정
/// 4. 댓글 / 회원가입 입력 정리
///
/// 저장소 구현체(Postgres, 메모리)가 같은 규칙을 공유하도록 I/O 없이 순수 함수로 둔다.
// region:    --- Imports
use crate::auction::model::{Bid, Listing, NewListing};
use serde::Deserialize;

// endregion: --- Imports

// region:    --- Messages
pub const MSG_BID_ACCEPTED: &str = "Your bid was successfully entered!";
pub const MSG_BID_TOO_LOW: &str = "Your bid must be higher than the current price!";
pub const MSG_BID_OWN_LISTING: &str = "You cannot bid on your own listing!";
pub const MSG_BID_CLOSED: &str = "This auction has already been closed.";

pub const MSG_LISTING_CREATED: &str = "Your listing has been created!";
pub const MSG_TITLE_REQUIRED: &str = "Your listing needs a title.";
pub const MSG_TITLE_TOO_LONG: &str = "Title must be at most 64 characters.";
pub const MSG_DESCRIPTION_TOO_LONG: &str = "Description must be at most 10000 characters.";
pub const MSG_INVALID_STARTING_BID: &str = "Starting bid must be a non-negative number.";

pub const MSG_PASSWORDS_MISMATCH: &str = "Passwords must match.";
pub const MSG_REGISTER_FIELDS_REQUIRED: &str = "Username, email and password are required.";
pub const MSG_USERNAME_TAKEN: &str = "Username already taken";
pub const MSG_EMAIL_TAKEN: &str = "Email is already in use";
pub const MSG_USERNAME_OR_EMAIL_TAKEN: &str = "Username or email already in use.";
pub const MSG_INVALID_LOGIN: &str = "Invalid username and/or password.";

// endregion: --- Messages

// region:    --- Limits
pub const TITLE_MAX_CHARS: usize = 64;
pub const DESCRIPTION_MAX_CHARS: usize = 10_000;
pub const IMAGE_MAX_CHARS: usize = 1024;
pub const CATEGORY_MAX_CHARS: usize = 254;
pub const COMMENT_MAX_CHARS: usize = 1024;

// endregion: --- Limits

// region:    --- Listing
/// 상품 등록 폼
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListingForm {
    pub title: String,
    pub description: String,
    pub starting_bid: String,
    pub image: String,
    #[serde(rename = "categories[]")]
    pub categories: Vec<String>,
}

impl NewListing {
    /// 1. 상품 등록 검증
    pub fn from_form(form: ListingForm) -> Result<Self, &'static str> {
        let title = form.title.trim().to_string();
        if title.is_empty() {
            return Err(MSG_TITLE_REQUIRED);
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(MSG_TITLE_TOO_LONG);
        }

        let description = form.description.trim().to_string();
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(MSG_DESCRIPTION_TOO_LONG);
        }

        let starting_bid = match form.starting_bid.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => round_to_cents(value),
            _ => return Err(MSG_INVALID_STARTING_BID),
        };

        let image = Some(form.image.trim())
            .filter(|url| !url.is_empty())
            .map(|url| truncate_chars(url, IMAGE_MAX_CHARS));

        let mut categories: Vec<String> = Vec::new();
        for raw in form.categories {
            let name = truncate_chars(raw.trim(), CATEGORY_MAX_CHARS);
            if !name.is_empty() && !categories.contains(&name) {
                categories.push(name);
            }
        }

        Ok(Self {
            title,
            description,
            starting_bid,
            image,
            categories,
        })
    }
}

// endregion: --- Listing

// region:    --- Bidding
/// 입찰 판정 결과
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BidOutcome {
    Accepted { amount: f64 },
    Closed,
    OwnListing,
    TooLow { amount: f64, highest_bid: f64 },
}

impl BidOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            BidOutcome::Accepted { .. } => MSG_BID_ACCEPTED,
            BidOutcome::Closed => MSG_BID_CLOSED,
            BidOutcome::OwnListing => MSG_BID_OWN_LISTING,
            BidOutcome::TooLow { .. } => MSG_BID_TOO_LOW,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, BidOutcome::Accepted { .. })
    }
}

/// 입찰 금액 파싱. 비어 있거나 숫자가 아니거나 유한하지 않으면 0으로 취급한다.
pub fn parse_bid_amount(raw: Option<&str>) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .map(round_to_cents)
        .unwrap_or(0.0)
}

/// 금액은 센트 단위로 저장한다 (화면 표시와 비교 기준 일치)
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// 2. 입찰 판정
/// 종료 여부 → 본인 상품 여부 → 현재가 초과 여부 순서로 검사한다.
pub fn evaluate_bid(listing: &Listing, closed: bool, bidder_id: i64, amount: f64) -> BidOutcome {
    if closed {
        return BidOutcome::Closed;
    }
    if listing.owner_id == bidder_id {
        return BidOutcome::OwnListing;
    }
    if amount <= listing.highest_bid {
        return BidOutcome::TooLow {
            amount,
            highest_bid: listing.highest_bid,
        };
    }
    BidOutcome::Accepted { amount }
}

// endregion: --- Bidding

// region:    --- Closing
/// 경매 종료 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed { winner_id: i64 },
    AlreadyClosed { winner_id: i64 },
    NotOwner,
}

/// 3. 낙찰자 결정
/// 현재 최고가와 같은 금액의 입찰 중 가장 먼저 들어온 입찰자가 낙찰자다.
/// 일치하는 입찰이 없으면 최고 금액 입찰 중 가장 먼저 들어온 입찰자, 입찰이 아예 없으면 판매자 본인.
pub fn resolve_winner(listing: &Listing, bids: &[Bid]) -> i64 {
    let mut ordered: Vec<&Bid> = bids.iter().filter(|b| b.listing_id == listing.id).collect();
    ordered.sort_by_key(|b| b.id);

    if let Some(bid) = ordered.iter().find(|b| b.amount == listing.highest_bid) {
        return bid.bidder_id;
    }

    ordered
        .iter()
        .fold(None::<&Bid>, |best, bid| match best {
            Some(current) if current.amount >= bid.amount => Some(current),
            _ => Some(bid),
        })
        .map(|bid| bid.bidder_id)
        .unwrap_or(listing.owner_id)
}

// endregion: --- Closing

// region:    --- Comments & Registration
/// 4. 댓글 정리. 공백뿐이면 None.
pub fn normalize_comment(raw: &str) -> Option<String> {
    let content = raw.trim();
    if content.is_empty() {
        None
    } else {
        Some(truncate_chars(content, COMMENT_MAX_CHARS))
    }
}

/// 회원가입 폼
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirmation: String,
}

impl RegisterForm {
    /// 비밀번호 확인 → 필수값 순서로 검사
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.password != self.confirmation {
            return Err(MSG_PASSWORDS_MISMATCH);
        }
        if self.username.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
        {
            return Err(MSG_REGISTER_FIELDS_REQUIRED);
        }
        Ok(())
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

// endregion: --- Comments & Registration

// endregion: --- Tests
