//! Bybit v5 REST 클라이언트.
//!
//! 모든 요청은 `timestamp + api_key + recv_window + 파라미터` 문자열에 대한
//! HMAC-SHA256 서명을 헤더로 첨부합니다. GET은 쿼리 문자열을, POST는
//! 전송되는 JSON 본문 문자열 그대로를 서명합니다. 서명한 문자열과 실제로
//! 전송되는 본문은 바이트 단위로 동일해야 하므로 본문은 한 번만 직렬화해
//! 서명과 전송에 같은 문자열을 사용합니다.

use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::PerpExchange;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use scalper_core::{mask_key, ExchangeSettings, Order, OrderAck, OrderType, Position, Side};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

const MAINNET_REST_URL: &str = "https://api.bybit.com";
const TESTNET_REST_URL: &str = "https://api-testnet.bybit.com";
const MAINNET_WS_PUBLIC_URL: &str = "wss://stream.bybit.com/v5/public/linear";
const TESTNET_WS_PUBLIC_URL: &str = "wss://stream-testnet.bybit.com/v5/public/linear";
const MAINNET_WS_PRIVATE_URL: &str = "wss://stream.bybit.com/v5/private";
const TESTNET_WS_PRIVATE_URL: &str = "wss://stream-testnet.bybit.com/v5/private";

/// Bybit API 설정.
#[derive(Clone)]
pub struct BybitConfig {
    /// API 키
    pub api_key: String,
    /// API 시크릿
    pub api_secret: SecretString,
    /// 테스트넷 사용 여부
    pub testnet: bool,
    /// 서명 요청 recv_window (밀리초)
    pub recv_window_ms: u64,
    /// REST 기본 URL
    pub rest_url: String,
    /// 공개 웹소켓 URL (linear 카테고리)
    pub ws_public_url: String,
    /// 프라이빗 웹소켓 URL
    pub ws_private_url: String,
}

impl BybitConfig {
    /// 새 설정을 생성합니다.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        testnet: bool,
    ) -> Self {
        let (rest_url, ws_public_url, ws_private_url) = if testnet {
            (TESTNET_REST_URL, TESTNET_WS_PUBLIC_URL, TESTNET_WS_PRIVATE_URL)
        } else {
            (MAINNET_REST_URL, MAINNET_WS_PUBLIC_URL, MAINNET_WS_PRIVATE_URL)
        };

        Self {
            api_key: api_key.into(),
            api_secret: SecretString::from(api_secret.into()),
            testnet,
            recv_window_ms: 5000,
            rest_url: rest_url.to_string(),
            ws_public_url: ws_public_url.to_string(),
            ws_private_url: ws_private_url.to_string(),
        }
    }

    /// 환경 변수에서 설정을 생성합니다.
    ///
    /// `BYBIT_API_KEY`, `BYBIT_API_SECRET`, `BYBIT_TESTNET`을 읽습니다.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("BYBIT_API_KEY").ok()?;
        let api_secret = std::env::var("BYBIT_API_SECRET").ok()?;
        let testnet = std::env::var("BYBIT_TESTNET")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Some(Self::new(api_key, api_secret, testnet))
    }

    /// 애플리케이션 설정에서 생성합니다.
    pub fn from_settings(settings: &ExchangeSettings) -> Self {
        let mut config = Self::new(
            settings.api_key.clone(),
            settings.api_secret.clone(),
            settings.testnet,
        );
        config.recv_window_ms = settings.recv_window_ms;
        config
    }

    /// REST 기본 URL을 교체합니다 (테스트용).
    pub fn with_rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = url.into();
        self
    }
}

impl fmt::Debug for BybitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BybitConfig")
            .field("api_key", &mask_key(&self.api_key))
            .field("api_secret", &"***REDACTED***")
            .field("testnet", &self.testnet)
            .field("rest_url", &self.rest_url)
            .finish()
    }
}

/// 현재 시각을 유닉스 epoch 밀리초로 반환합니다.
pub(crate) fn timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before unix epoch")
        .as_millis() as u64
}

/// HMAC-SHA256 서명을 16진수 문자열로 반환합니다.
pub(crate) fn hmac_sha256_hex(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// 빈 문자열을 None으로 매핑하며 Decimal을 파싱합니다.
pub(crate) fn parse_opt_decimal(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        None
    } else {
        s.parse().ok()
    }
}

/// 숫자 문자열을 파싱합니다. 빈 값이나 파싱 실패는 0입니다.
fn parse_decimal(s: &str) -> Decimal {
    s.parse().unwrap_or(Decimal::ZERO)
}

/// Bybit v5 REST 클라이언트.
///
/// 상태를 갖지 않는 서명기이므로 여러 에이전트가 하나의 인스턴스를
/// 공유합니다.
pub struct BybitClient {
    config: BybitConfig,
    http: reqwest::Client,
}

impl BybitClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(config: BybitConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// 설정을 반환합니다.
    pub fn config(&self) -> &BybitConfig {
        &self.config
    }

    /// 요청 서명을 생성합니다.
    fn sign(&self, timestamp: &str, recv_window: &str, params: &str) -> String {
        let payload = format!("{}{}{}{}", timestamp, self.config.api_key, recv_window, params);
        hmac_sha256_hex(self.config.api_secret.expose_secret(), &payload)
    }

    /// 쿼리 문자열을 생성합니다.
    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 서명 GET 요청을 보냅니다. 쿼리 문자열이 서명 대상입니다.
    async fn signed_get<T>(&self, path: &str, params: &[(&str, String)]) -> ExchangeResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let query = Self::build_query(params);
        let timestamp = timestamp_ms().to_string();
        let recv_window = self.config.recv_window_ms.to_string();
        let signature = self.sign(&timestamp, &recv_window, &query);

        let url = format!("{}{}?{}", self.config.rest_url, path, query);
        debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .header("X-BAPI-API-KEY", &self.config.api_key)
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-TIMESTAMP", &timestamp)
            .header("X-BAPI-RECV-WINDOW", &recv_window)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// 서명 POST 요청을 보냅니다. 전송되는 본문 문자열이 서명 대상입니다.
    async fn signed_post<T>(&self, path: &str, body: serde_json::Value) -> ExchangeResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        // 서명과 전송에 같은 문자열을 사용한다
        let body = serde_json::to_string(&body)?;
        let timestamp = timestamp_ms().to_string();
        let recv_window = self.config.recv_window_ms.to_string();
        let signature = self.sign(&timestamp, &recv_window, &body);

        let url = format!("{}{}", self.config.rest_url, path);
        debug!(%url, %body, "POST");

        let response = self
            .http
            .post(&url)
            .header("X-BAPI-API-KEY", &self.config.api_key)
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-TIMESTAMP", &timestamp)
            .header("X-BAPI-RECV-WINDOW", &recv_window)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// 응답 봉투를 해석합니다. retCode가 0이 아니면 에러입니다.
    async fn handle_response<T>(response: reqwest::Response) -> ExchangeResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let text = response.text().await?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ExchangeError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ExchangeError::Auth(text));
        }
        if !status.is_success() {
            return Err(ExchangeError::Api {
                code: status.as_u16() as i64,
                message: text,
            });
        }

        let envelope: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| ExchangeError::Parse(format!("응답 파싱 실패: {} ({})", e, text)))?;

        if envelope.ret_code != 0 {
            return Err(map_ret_code(envelope.ret_code, envelope.ret_msg));
        }

        serde_json::from_value(envelope.result)
            .map_err(|e| ExchangeError::Parse(format!("result 파싱 실패: {}", e)))
    }

    // ========================================================================
    // 공개 API
    // ========================================================================

    /// 심볼의 현재 포지션을 조회합니다. 결과 목록이 비어 있으면 `None`입니다.
    pub async fn get_position(&self, symbol: &str) -> ExchangeResult<Option<Position>> {
        let params = [
            ("category", "linear".to_string()),
            ("symbol", symbol.to_string()),
        ];
        let result: ResultList<PositionDto> =
            self.signed_get("/v5/position/list", &params).await?;

        Ok(result.list.into_iter().next().map(Position::from))
    }

    /// 심볼의 미체결 주문 목록을 조회합니다.
    pub async fn get_open_orders(&self, symbol: &str) -> ExchangeResult<Vec<Order>> {
        let params = [
            ("category", "linear".to_string()),
            ("symbol", symbol.to_string()),
        ];
        let result: ResultList<OrderDto> =
            self.signed_get("/v5/order/realtime", &params).await?;

        result.list.into_iter().map(Order::try_from).collect()
    }

    /// 주문을 제출합니다. `price`가 `Some`이면 지정가, `None`이면 시장가입니다.
    pub async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        price: Option<Decimal>,
    ) -> ExchangeResult<OrderAck> {
        let order_type = if price.is_some() {
            OrderType::Limit
        } else {
            OrderType::Market
        };

        let mut body = serde_json::json!({
            "category": "linear",
            "symbol": symbol,
            "side": side.to_string(),
            "orderType": order_type.to_string(),
            "qty": qty.to_string(),
        });
        if let Some(price) = price {
            body["price"] = serde_json::Value::String(price.to_string());
        }

        let ack: OrderAckDto = self.signed_post("/v5/order/create", body).await?;
        info!(symbol, side = %side, order_type = %order_type, qty = %qty, order_id = %ack.order_id, "주문 제출");

        Ok(ack.into())
    }

    /// 미체결 지정가 주문의 가격을 정정합니다.
    pub async fn amend_order(
        &self,
        symbol: &str,
        order_id: &str,
        qty: Decimal,
        price: Decimal,
    ) -> ExchangeResult<OrderAck> {
        let body = serde_json::json!({
            "category": "linear",
            "symbol": symbol,
            "orderId": order_id,
            "qty": qty.to_string(),
            "price": price.to_string(),
        });

        let ack: OrderAckDto = self.signed_post("/v5/order/amend", body).await?;
        debug!(symbol, order_id, price = %price, "주문 정정");

        Ok(ack.into())
    }

    /// 주문을 취소합니다.
    pub async fn cancel_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<OrderAck> {
        let body = serde_json::json!({
            "category": "linear",
            "symbol": symbol,
            "orderId": order_id,
        });

        let ack: OrderAckDto = self.signed_post("/v5/order/cancel", body).await?;
        info!(symbol, order_id, "주문 취소");

        Ok(ack.into())
    }

    /// 포지션의 손절가를 설정합니다.
    pub async fn set_trading_stop(
        &self,
        symbol: &str,
        stop_loss: Decimal,
        position_idx: i32,
    ) -> ExchangeResult<()> {
        let body = serde_json::json!({
            "category": "linear",
            "symbol": symbol,
            "stopLoss": stop_loss.to_string(),
            "positionIdx": position_idx.to_string(),
        });

        let _: serde_json::Value = self.signed_post("/v5/position/trading-stop", body).await?;
        info!(symbol, stop_loss = %stop_loss, "손절가 설정");

        Ok(())
    }
}

#[async_trait]
impl PerpExchange for BybitClient {
    async fn get_position(&self, symbol: &str) -> ExchangeResult<Option<Position>> {
        BybitClient::get_position(self, symbol).await
    }

    async fn get_open_orders(&self, symbol: &str) -> ExchangeResult<Vec<Order>> {
        BybitClient::get_open_orders(self, symbol).await
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        price: Option<Decimal>,
    ) -> ExchangeResult<OrderAck> {
        BybitClient::place_order(self, symbol, side, qty, price).await
    }

    async fn amend_order(
        &self,
        symbol: &str,
        order_id: &str,
        qty: Decimal,
        price: Decimal,
    ) -> ExchangeResult<OrderAck> {
        BybitClient::amend_order(self, symbol, order_id, qty, price).await
    }

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<OrderAck> {
        BybitClient::cancel_order(self, symbol, order_id).await
    }

    async fn set_trading_stop(
        &self,
        symbol: &str,
        stop_loss: Decimal,
        position_idx: i32,
    ) -> ExchangeResult<()> {
        BybitClient::set_trading_stop(self, symbol, stop_loss, position_idx).await
    }
}

/// retCode를 에러 타입으로 매핑합니다.
fn map_ret_code(code: i64, message: String) -> ExchangeError {
    match code {
        // 10003: invalid api key, 10004: sign error, 10005: permission denied
        10003 | 10004 | 10005 => ExchangeError::Auth(message),
        // 10006, 10018: rate limit
        10006 | 10018 => ExchangeError::RateLimited {
            retry_after_secs: 60,
        },
        _ => ExchangeError::Api { code, message },
    }
}

// ============================================================================
// 응답 DTO
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ResultList<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionDto {
    symbol: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    avg_price: String,
    #[serde(default)]
    unrealised_pnl: String,
    #[serde(default)]
    leverage: String,
    #[serde(default)]
    position_value: String,
}

impl From<PositionDto> for Position {
    fn from(dto: PositionDto) -> Self {
        Position {
            symbol: dto.symbol,
            size: parse_decimal(&dto.size),
            avg_price: parse_decimal(&dto.avg_price),
            unrealised_pnl: parse_decimal(&dto.unrealised_pnl),
            leverage: parse_decimal(&dto.leverage),
            position_value: parse_decimal(&dto.position_value),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDto {
    order_id: String,
    symbol: String,
    side: String,
    order_type: String,
    #[serde(default)]
    qty: String,
    #[serde(default)]
    price: String,
}

impl TryFrom<OrderDto> for Order {
    type Error = ExchangeError;

    fn try_from(dto: OrderDto) -> Result<Self, Self::Error> {
        let side = Side::parse_wire(&dto.side)
            .ok_or_else(|| ExchangeError::Parse(format!("알 수 없는 주문 방향: {}", dto.side)))?;
        let order_type = OrderType::parse_wire(&dto.order_type).ok_or_else(|| {
            ExchangeError::Parse(format!("알 수 없는 주문 유형: {}", dto.order_type))
        })?;

        Ok(Order {
            id: dto.order_id,
            symbol: dto.symbol,
            side,
            order_type,
            qty: parse_decimal(&dto.qty),
            price: parse_opt_decimal(&dto.price),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderAckDto {
    order_id: String,
}

impl From<OrderAckDto> for OrderAck {
    fn from(dto: OrderAckDto) -> Self {
        OrderAck {
            order_id: dto.order_id,
        }
    }
}
