//! 거래소 추상화 트레이트.

use crate::error::ExchangeResult;
use async_trait::async_trait;
use rust_decimal::Decimal;
use scalper_core::{Order, OrderAck, Position, Side};

/// 무기한 선물 거래소 작업 인터페이스.
///
/// 실거래 클라이언트와 테스트 더블이 공유하는 계약입니다. 에이전트는
/// 이 트레이트를 통해서만 거래소에 접근합니다.
#[async_trait]
pub trait PerpExchange: Send + Sync {
    /// 심볼의 현재 포지션을 조회합니다. 결과 목록이 비어 있으면 `None`입니다.
    async fn get_position(&self, symbol: &str) -> ExchangeResult<Option<Position>>;

    /// 심볼의 미체결 주문 목록을 조회합니다.
    async fn get_open_orders(&self, symbol: &str) -> ExchangeResult<Vec<Order>>;

    /// 주문을 제출합니다. `price`가 `Some`이면 지정가, `None`이면 시장가입니다.
    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        price: Option<Decimal>,
    ) -> ExchangeResult<OrderAck>;

    /// 미체결 지정가 주문의 가격을 정정합니다.
    async fn amend_order(
        &self,
        symbol: &str,
        order_id: &str,
        qty: Decimal,
        price: Decimal,
    ) -> ExchangeResult<OrderAck>;

    /// 주문을 취소합니다.
    async fn cancel_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<OrderAck>;

    /// 포지션의 손절가를 설정합니다.
    async fn set_trading_stop(
        &self,
        symbol: &str,
        stop_loss: Decimal,
        position_idx: i32,
    ) -> ExchangeResult<()>;
}
