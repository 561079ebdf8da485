//! 설정 관리.
//!
//! 설정은 TOML 파일을 먼저 읽은 뒤 `SCALPER__` 접두사 환경 변수로
//! 오버라이드합니다 (예: `SCALPER__TRADING__PAIRS`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 거래소 접속 설정
    #[serde(default)]
    pub exchange: ExchangeSettings,
    /// 트레이딩 설정
    #[serde(default)]
    pub trading: TradingConfig,
    /// 데이터베이스 설정
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 텔레그램 알림 설정
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 거래소 접속 설정.
#[derive(Clone, Deserialize, Serialize)]
pub struct ExchangeSettings {
    /// API 키
    #[serde(default)]
    pub api_key: String,
    /// API 시크릿
    #[serde(default)]
    pub api_secret: String,
    /// 테스트넷 사용 여부
    #[serde(default = "default_testnet")]
    pub testnet: bool,
    /// 서명 요청 recv_window (밀리초)
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
}

fn default_testnet() -> bool {
    true
}
fn default_recv_window() -> u64 {
    5000
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            testnet: default_testnet(),
            recv_window_ms: default_recv_window(),
        }
    }
}

// 자격증명이 로그에 노출되지 않도록 마스킹합니다.
impl fmt::Debug for ExchangeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeSettings")
            .field("api_key", &mask_key(&self.api_key))
            .field("api_secret", &"***REDACTED***")
            .field("testnet", &self.testnet)
            .field("recv_window_ms", &self.recv_window_ms)
            .finish()
    }
}

/// 키의 앞뒤 4자만 남기고 마스킹합니다.
pub fn mask_key(key: &str) -> String {
    if key.len() > 8 {
        format!("{}...{}", &key[..4], &key[key.len() - 4..])
    } else if key.is_empty() {
        "(empty)".to_string()
    } else {
        "***".to_string()
    }
}

/// 트레이딩 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingConfig {
    /// 거래 페어 목록, `"BTCUSDT:1,ETHUSDT:10"` 형식 (SYMBOL:QTY)
    #[serde(default)]
    pub pairs: String,
    /// 폴링 간격 (밀리초)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    420
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            pairs: String::new(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl TradingConfig {
    /// 페어 문자열을 파싱합니다. 빈 문자열은 빈 목록입니다.
    pub fn parsed_pairs(&self) -> Result<Vec<PairConfig>, config::ConfigError> {
        self.pairs
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| entry.parse().map_err(config::ConfigError::Message))
            .collect()
    }
}

/// 거래 페어 하나의 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PairConfig {
    /// 심볼
    pub symbol: String,
    /// 주문 수량
    pub qty: Decimal,
}

impl FromStr for PairConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, qty) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid pair format: {} (expected SYMBOL:QTY)", s))?;

        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(format!("Empty symbol in pair: {}", s));
        }

        let qty = qty
            .trim()
            .parse::<Decimal>()
            .map_err(|_| format!("Invalid quantity in pair: {}", s))?;
        if qty <= Decimal::ZERO {
            return Err(format!("Quantity must be positive in pair: {}", s));
        }

        Ok(Self {
            symbol: symbol.to_string(),
            qty,
        })
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// 연결 URL
    #[serde(default)]
    pub url: String,
    /// 최대 연결 수
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 최소 연결 수
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// 연결 획득 타임아웃 (초)
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    /// 유휴 타임아웃 (초)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_acquire_timeout() -> u64 {
    30
}
fn default_idle_timeout() -> u64 {
    600
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// 텔레그램 알림 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// 활성화 여부
    #[serde(default)]
    pub enabled: bool,
    /// 봇 토큰
    #[serde(default)]
    pub bot_token: String,
    /// 채팅 ID
    #[serde(default)]
    pub chat_id: String,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("trading.poll_interval_ms", 420)?
            .set_default("exchange.recv_window_ms", 5000)?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("SCALPER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}
