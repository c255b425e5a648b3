/// 상품 컬럼 목록 (별칭 l)
macro_rules! listing_columns {
    () => {
        "l.id, l.owner_id, l.title, l.description, l.starting_bid, l.highest_bid, l.image, l.created_at"
    };
}

/// 진행 중인 상품 조회 (종료 기록이 없는 상품)
pub const GET_ACTIVE_LISTINGS: &str = concat!(
    "SELECT ",
    listing_columns!(),
    " FROM listings l
      WHERE NOT EXISTS (SELECT 1 FROM closed_listings c WHERE c.listing_id = l.id)
      ORDER BY l.created_at DESC, l.id DESC"
);

/// 종료된 상품 조회
pub const GET_CLOSED_LISTINGS: &str = concat!(
    "SELECT ",
    listing_columns!(),
    " FROM listings l
      JOIN closed_listings c ON c.listing_id = l.id
      ORDER BY l.created_at DESC, l.id DESC"
);

/// 상품 조회
pub const GET_LISTING: &str = concat!("SELECT ", listing_columns!(), " FROM listings l WHERE l.id = $1");

/// 상품 조회 (행 잠금)
pub const GET_LISTING_FOR_UPDATE: &str = concat!(
    "SELECT ",
    listing_columns!(),
    " FROM listings l WHERE l.id = $1 FOR UPDATE"
);

/// 상품 등록
pub const INSERT_LISTING: &str = "
    INSERT INTO listings (owner_id, title, description, starting_bid, highest_bid, image)
    VALUES ($1, $2, $3, $4, $4, $5)
    RETURNING id, owner_id, title, description, starting_bid, highest_bid, image, created_at";

/// 카테고리 조회 또는 생성
pub const UPSERT_CATEGORY: &str = "
    INSERT INTO categories (name) VALUES ($1)
    ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
    RETURNING id";

/// 상품-카테고리 연결
pub const LINK_LISTING_CATEGORY: &str = "
    INSERT INTO listing_categories (listing_id, category_id) VALUES ($1, $2)
    ON CONFLICT DO NOTHING";

/// 상품의 카테고리 조회
pub const GET_LISTING_CATEGORIES: &str = "
    SELECT c.id, c.name
    FROM categories c
    JOIN listing_categories lc ON lc.category_id = c.id
    WHERE lc.listing_id = $1
    ORDER BY c.name";

/// 모든 카테고리 조회
pub const GET_CATEGORIES: &str = "SELECT id, name FROM categories ORDER BY name";

/// 이름으로 카테고리 조회
pub const GET_CATEGORY_BY_NAME: &str =
    "SELECT id, name FROM categories WHERE name = $1 ORDER BY id LIMIT 1";

/// 카테고리별 진행 중인 상품 조회
pub const GET_ACTIVE_LISTINGS_BY_CATEGORY: &str = concat!(
    "SELECT ",
    listing_columns!(),
    " FROM listings l
      JOIN listing_categories lc ON lc.listing_id = l.id
      WHERE lc.category_id = $1
        AND NOT EXISTS (SELECT 1 FROM closed_listings c WHERE c.listing_id = l.id)
      ORDER BY l.created_at DESC, l.id DESC"
);

/// 상품 입찰 조회 (입력 순)
pub const GET_LISTING_BIDS: &str = "
    SELECT id, listing_id, bidder_id, amount, created_at
    FROM bids
    WHERE listing_id = $1
    ORDER BY id";

/// 상품 입찰 수 조회
pub const COUNT_LISTING_BIDS: &str = "SELECT COUNT(*) FROM bids WHERE listing_id = $1";

/// 최고가 갱신
pub const UPDATE_HIGHEST_BID: &str = "UPDATE listings SET highest_bid = $2 WHERE id = $1";

/// 입찰 등록
pub const INSERT_BID: &str = "
    INSERT INTO bids (listing_id, bidder_id, amount) VALUES ($1, $2, $3)
    RETURNING id, listing_id, bidder_id, amount, created_at";

/// 종료 기록 조회
pub const GET_CLOSED_LISTING: &str =
    "SELECT id, listing_id, winner_id FROM closed_listings WHERE listing_id = $1";

/// 낙찰자 이름 포함 종료 정보 조회
pub const GET_CLOSURE: &str = "
    SELECT c.listing_id, c.winner_id, u.username AS winner
    FROM closed_listings c
    JOIN users u ON u.id = c.winner_id
    WHERE c.listing_id = $1";

/// 종료 기록 등록
pub const INSERT_CLOSED_LISTING: &str = "
    INSERT INTO closed_listings (listing_id, winner_id) VALUES ($1, $2)
    ON CONFLICT (listing_id) DO NOTHING";

/// 상품 댓글 조회 (작성자 이름 포함)
pub const GET_LISTING_COMMENTS: &str = "
    SELECT c.id, c.content, u.username AS author, c.created_at
    FROM comments c
    JOIN users u ON u.id = c.owner_id
    WHERE c.listing_id = $1
    ORDER BY c.created_at, c.id";

/// 댓글 등록
pub const INSERT_COMMENT: &str = "
    INSERT INTO comments (listing_id, owner_id, content) VALUES ($1, $2, $3)
    RETURNING id, listing_id, owner_id, content, created_at";

/// 관심 목록 포함 여부
pub const IS_WATCHING: &str =
    "SELECT EXISTS (SELECT 1 FROM watchlist WHERE user_id = $1 AND listing_id = $2)";

/// 관심 목록 토글. 삭제된 행이 없을 때만 추가하며, 추가되면 행을 반환한다.
pub const TOGGLE_WATCHLIST: &str = "
    WITH removed AS (
        DELETE FROM watchlist WHERE user_id = $1 AND listing_id = $2 RETURNING 1
    )
    INSERT INTO watchlist (user_id, listing_id)
    SELECT $1, $2 WHERE NOT EXISTS (SELECT 1 FROM removed)
    ON CONFLICT (user_id, listing_id) DO NOTHING
    RETURNING listing_id";

/// 사용자 관심 목록 조회
pub const GET_WATCHLIST: &str = concat!(
    "SELECT ",
    listing_columns!(),
    " FROM listings l
      JOIN watchlist w ON w.listing_id = l.id
      WHERE w.user_id = $1
      ORDER BY l.created_at DESC, l.id DESC"
);

/// 사용자 등록
pub const INSERT_USER: &str = "
    INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3)
    RETURNING id, username, email, password_hash, created_at";

/// 사용자 조회
pub const GET_USER: &str =
    "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1";

/// 사용자명으로 조회
pub const GET_USER_BY_USERNAME: &str =
    "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1";
