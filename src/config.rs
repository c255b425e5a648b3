// region:    --- Imports
use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::str::FromStr;

// endregion: --- Imports

// region:    --- Config

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// 환경 변수 기반 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 없으면 메모리 저장소를 사용한다
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub init_schema: bool,
    pub cookie_secure: bool,
    /// 로그인 세션 유효 시간 (초)
    pub session_max_age_secs: i64,
}

impl Config {
    /// 프로세스 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로 설정 로드 (테스트용으로 분리)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            database_url,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            bind_addr: parse_or(
                &lookup,
                "BIND_ADDR",
                SocketAddr::from_str(DEFAULT_BIND_ADDR)
                    .map_err(|e| Error::Internal(e.to_string()))?,
            )?,
            init_schema: parse_or(&lookup, "INIT_SCHEMA", true)?,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
            session_max_age_secs: parse_or(
                &lookup,
                "SESSION_MAX_AGE_SECS",
                DEFAULT_SESSION_MAX_AGE_SECS,
            )?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Internal(format!("invalid {key}={raw}: {e}"))),
        _ => Ok(default),
    }
}

// endregion: --- Config

// endregion: --- Tests
