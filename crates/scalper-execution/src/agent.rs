//! 심볼별 트레이딩 에이전트 상태 머신.
//!
//! 에이전트 하나가 심볼 하나를 담당하며 다음 사이클을 무한 반복합니다:
//! 1. 대기: 기존 주문/포지션이 모두 정리될 때까지 확인
//! 2. 진입: 최우선 매도 호가에 지정가 매수 제출
//! 3. 체결 대기: 체결될 때까지 호가를 따라 주문 가격 정정
//! 4. 모니터링: 손익률에 따라 청산 주문과 트레일링 스톱 관리
//!
//! 거래소가 유일한 상태 원본입니다. 에이전트는 포지션을 캐시하지 않고
//! 매 결정마다 새로 조회합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scalper_core::{BookSide, Order, Position, Side};
use scalper_exchange::{BookSampler, ExchangeResult, PerpExchange};
use scalper_risk::{pnl_percent, trailing_stop_price, StopRatchet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// 하드 스톱 발동 손익률 (%). 이하이면 전량 시장가 청산.
const HARD_STOP_PNL: Decimal = dec!(-0.8);

/// 소프트 청산 발동 손익률 (%). 이하이면 최우선 매수 호가에 지정가 청산.
const SOFT_EXIT_PNL: Decimal = dec!(-0.5);

/// 심볼 하나를 담당하는 트레이딩 에이전트.
///
/// 사이클 단위 상태(래칫, 청산 주문 추적)는 이 구조체가 단독 소유하며
/// 매 사이클 시작 시 초기화됩니다.
pub struct TraderAgent<C> {
    client: Arc<C>,
    sampler: BookSampler,
    symbol: String,
    qty: Decimal,
    poll_interval: Duration,
    ratchet: StopRatchet,
    /// 현재 걸려 있는 소프트 청산 주문 ID.
    exit_order: Option<String>,
    /// 이번 하락 구간에서 하드 스톱을 이미 냈는지 여부.
    hard_stopped: bool,
}

impl<C: PerpExchange> TraderAgent<C> {
    /// 새 에이전트를 생성합니다.
    pub fn new(
        client: Arc<C>,
        sampler: BookSampler,
        symbol: impl Into<String>,
        qty: Decimal,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            sampler,
            symbol: symbol.into(),
            qty,
            poll_interval,
            ratchet: StopRatchet::default(),
            exit_order: None,
            hard_stopped: false,
        }
    }

    /// 에이전트 메인 루프. 정상 동작 중에는 반환하지 않습니다.
    pub async fn run(mut self) {
        info!(symbol = %self.symbol, qty = %self.qty, "트레이딩 에이전트 시작");

        loop {
            // 사이클 단위 상태 초기화
            self.ratchet.reset();
            self.exit_order = None;
            self.hard_stopped = false;

            self.wait_until_clear().await;

            let order_id = self.enter().await;

            self.wait_for_fill(&order_id).await;

            self.monitor().await;

            info!(symbol = %self.symbol, "포지션 종료, 새 사이클 시작");
        }
    }

    /// 기존 주문과 포지션이 모두 정리될 때까지 대기합니다.
    ///
    /// 수동으로 낸 주문이나 이전 실행이 남긴 포지션 위에 새 진입을 얹지
    /// 않기 위한 안전 장치입니다. 조회 실패는 "정리 안 됨"으로 간주합니다.
    async fn wait_until_clear(&self) {
        loop {
            match self.fetch_open_state().await {
                Ok((orders, position)) => {
                    let flat = position.as_ref().map_or(true, Position::is_flat);
                    if orders.is_empty() && flat {
                        return;
                    }
                    debug!(
                        symbol = %self.symbol,
                        open_orders = orders.len(),
                        flat,
                        "기존 주문 또는 포지션 존재, 정리 대기"
                    );
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, "주문/포지션 조회 실패");
                }
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn fetch_open_state(&self) -> ExchangeResult<(Vec<Order>, Option<Position>)> {
        let orders = self.client.get_open_orders(&self.symbol).await?;
        let position = self.client.get_position(&self.symbol).await?;
        Ok((orders, position))
    }

    /// 최우선 매도 호가에 지정가 매수를 제출하고 주문 ID를 반환합니다.
    async fn enter(&self) -> String {
        loop {
            let ask = self.sampler.best(BookSide::Ask).await;

            match self
                .client
                .place_order(&self.symbol, Side::Buy, self.qty, Some(ask.price))
                .await
            {
                Ok(ack) => {
                    info!(
                        symbol = %self.symbol,
                        order_id = %ack.order_id,
                        price = %ask.price,
                        qty = %self.qty,
                        "진입 지정가 매수 제출"
                    );
                    return ack.order_id;
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, "진입 주문 실패, 재시도");
                    sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// 진입 주문이 체결될 때까지 호가를 따라 가격을 정정합니다.
    ///
    /// 타임아웃 없음. 포지션 수량이 0이 아니게 될 때까지 반복합니다.
    async fn wait_for_fill(&self, order_id: &str) {
        loop {
            sleep(self.poll_interval).await;

            match self.client.get_position(&self.symbol).await {
                Ok(Some(position)) if !position.is_flat() => {
                    info!(
                        symbol = %self.symbol,
                        size = %position.size,
                        avg_price = %position.avg_price,
                        "진입 체결"
                    );
                    return;
                }
                Ok(_) => {
                    // 미체결: 최신 매도 호가로 주문 가격을 끌어올린다
                    let ask = self.sampler.best(BookSide::Ask).await;
                    if let Err(e) = self
                        .client
                        .amend_order(&self.symbol, order_id, self.qty, ask.price)
                        .await
                    {
                        warn!(symbol = %self.symbol, order_id, error = %e, "주문 정정 실패");
                    }
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, "포지션 조회 실패");
                }
            }
        }
    }

    /// 포지션이 닫힐 때까지 손익률 기반 결정을 반복합니다.
    async fn monitor(&mut self) {
        loop {
            sleep(self.poll_interval).await;

            let position = match self.client.get_position(&self.symbol).await {
                Ok(Some(position)) if !position.is_flat() => position,
                Ok(_) => {
                    // 청산 체결, 스톱 발동 또는 수동 종료
                    self.exit_order = None;
                    info!(symbol = %self.symbol, "포지션 닫힘 확인");
                    return;
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, "포지션 조회 실패");
                    continue;
                }
            };

            let Some(pnl) = pnl_percent(&position) else {
                continue;
            };

            debug!(symbol = %self.symbol, pnl = %pnl, size = %position.size, "모니터링");

            if pnl <= HARD_STOP_PNL {
                // 구간당 한 번만 발동한다. 시장가 청산이 체결될 때까지
                // 같은 구간에서 주문을 반복해서 내지 않는다.
                if !self.hard_stopped {
                    self.hard_stopped = self.hard_stop(&position).await;
                }
                continue;
            }
            self.hard_stopped = false;

            if pnl <= SOFT_EXIT_PNL && self.exit_order.is_none() {
                self.place_soft_exit(&position).await;
            }

            self.advance_trailing_stop(&position, pnl).await;
        }
    }

    /// 하드 스톱: 걸려 있는 청산 주문을 취소하고 전량 시장가 매도합니다.
    ///
    /// 시장가 주문이 실제로 제출됐을 때만 `true`를 반환합니다.
    async fn hard_stop(&mut self, position: &Position) -> bool {
        // 취소 실패와 무관하게 추적을 푼다. 취소가 실패했다면
        // 대부분 그 주문이 이미 체결된 경우다.
        if let Some(order_id) = self.exit_order.take() {
            if let Err(e) = self.client.cancel_order(&self.symbol, &order_id).await {
                warn!(symbol = %self.symbol, order_id = %order_id, error = %e, "청산 주문 취소 실패");
            }
        }

        match self
            .client
            .place_order(&self.symbol, Side::Sell, position.size, None)
            .await
        {
            Ok(ack) => {
                info!(
                    symbol = %self.symbol,
                    order_id = %ack.order_id,
                    size = %position.size,
                    "하드 스톱: 전량 시장가 청산"
                );
                true
            }
            Err(e) => {
                warn!(symbol = %self.symbol, error = %e, "시장가 청산 실패, 다음 틱에 재시도");
                false
            }
        }
    }

    /// 소프트 청산: 최우선 매수 호가에 전량 지정가 매도를 걸어 둡니다.
    async fn place_soft_exit(&mut self, position: &Position) {
        let bid = self.sampler.best(BookSide::Bid).await;

        match self
            .client
            .place_order(&self.symbol, Side::Sell, position.size, Some(bid.price))
            .await
        {
            Ok(ack) => {
                info!(
                    symbol = %self.symbol,
                    order_id = %ack.order_id,
                    price = %bid.price,
                    size = %position.size,
                    "소프트 청산 지정가 매도 제출"
                );
                self.exit_order = Some(ack.order_id);
            }
            Err(e) => {
                warn!(symbol = %self.symbol, error = %e, "소프트 청산 주문 실패");
            }
        }
    }

    /// 손익 체크포인트를 넘었으면 트레일링 스톱을 끌어올립니다.
    async fn advance_trailing_stop(&mut self, position: &Position, pnl: Decimal) {
        for stop_percent in self.ratchet.advance(pnl) {
            let stop_price = trailing_stop_price(position.avg_price, stop_percent);

            match self
                .client
                .set_trading_stop(&self.symbol, stop_price, 0)
                .await
            {
                Ok(()) => {
                    info!(
                        symbol = %self.symbol,
                        stop_price = %stop_price,
                        stop_percent = %stop_percent,
                        "트레일링 스톱 상향"
                    );
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, "트레일링 스톱 설정 실패");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scalper_core::{BookLevel, BookTop, OrderAck, OrderType};
    use scalper_exchange::ExchangeError;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::watch;

    /// 테스트 더블이 기록한 거래소 호출.
    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        PlaceOrder {
            side: Side,
            qty: Decimal,
            price: Option<Decimal>,
        },
        AmendOrder {
            order_id: String,
            price: Decimal,
        },
        CancelOrder {
            order_id: String,
        },
        SetTradingStop {
            stop_loss: Decimal,
        },
    }

    /// 조회 응답을 시나리오 순서대로 돌려주는 PerpExchange 테스트 더블.
    ///
    /// 마지막 응답은 시나리오가 소진된 뒤에도 계속 반복됩니다.
    /// `Err(())` 항목은 네트워크 오류 응답을 뜻합니다.
    #[derive(Default)]
    struct ScriptedExchange {
        positions: Mutex<VecDeque<Result<Option<Position>, ()>>>,
        open_orders: Mutex<VecDeque<Result<Vec<Order>, ()>>>,
        calls: Mutex<Vec<Call>>,
        order_seq: Mutex<u64>,
    }

    impl ScriptedExchange {
        fn push_position(&self, position: Option<Position>) {
            self.positions.lock().unwrap().push_back(Ok(position));
        }

        fn fail_position(&self) {
            self.positions.lock().unwrap().push_back(Err(()));
        }

        fn push_orders(&self, orders: Vec<Order>) {
            self.open_orders.lock().unwrap().push_back(Ok(orders));
        }

        fn fail_orders(&self) {
            self.open_orders.lock().unwrap().push_back(Err(()));
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn next_order_id(&self) -> String {
            let mut seq = self.order_seq.lock().unwrap();
            *seq += 1;
            format!("ORDER-{}", seq)
        }

        fn pop<T: Clone>(queue: &Mutex<VecDeque<Result<T, ()>>>, what: &str) -> ExchangeResult<T> {
            let mut queue = queue.lock().unwrap();
            let item = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            item.unwrap_or_else(|| panic!("{} 시나리오가 비어 있음", what))
                .map_err(|_| ExchangeError::Network("scripted failure".to_string()))
        }
    }

    #[async_trait]
    impl PerpExchange for ScriptedExchange {
        async fn get_position(&self, _symbol: &str) -> ExchangeResult<Option<Position>> {
            Self::pop(&self.positions, "포지션")
        }

        async fn get_open_orders(&self, _symbol: &str) -> ExchangeResult<Vec<Order>> {
            Self::pop(&self.open_orders, "주문")
        }

        async fn place_order(
            &self,
            _symbol: &str,
            side: Side,
            qty: Decimal,
            price: Option<Decimal>,
        ) -> ExchangeResult<OrderAck> {
            self.record(Call::PlaceOrder { side, qty, price });
            Ok(OrderAck {
                order_id: self.next_order_id(),
            })
        }

        async fn amend_order(
            &self,
            _symbol: &str,
            order_id: &str,
            _qty: Decimal,
            price: Decimal,
        ) -> ExchangeResult<OrderAck> {
            self.record(Call::AmendOrder {
                order_id: order_id.to_string(),
                price,
            });
            Ok(OrderAck {
                order_id: order_id.to_string(),
            })
        }

        async fn cancel_order(&self, _symbol: &str, order_id: &str) -> ExchangeResult<OrderAck> {
            self.record(Call::CancelOrder {
                order_id: order_id.to_string(),
            });
            Ok(OrderAck {
                order_id: order_id.to_string(),
            })
        }

        async fn set_trading_stop(
            &self,
            _symbol: &str,
            stop_loss: Decimal,
            _position_idx: i32,
        ) -> ExchangeResult<()> {
            self.record(Call::SetTradingStop { stop_loss });
            Ok(())
        }
    }

    /// 레버리지 1, 명목 가치 100인 포지션. 손익률(%) == unrealised_pnl.
    fn position(size: Decimal, unrealised_pnl: Decimal) -> Position {
        Position {
            symbol: "BTCUSDT".to_string(),
            size,
            avg_price: dec!(100),
            unrealised_pnl,
            leverage: dec!(1),
            position_value: dec!(100),
        }
    }

    fn resting_order() -> Order {
        Order {
            id: "MANUAL-1".to_string(),
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            qty: dec!(1),
            price: Some(dec!(95)),
        }
    }

    /// 매수 호가 99.5 / 매도 호가 100으로 고정된 호가 샘플러.
    fn fixed_sampler() -> (watch::Sender<BookTop>, BookSampler) {
        let (tx, rx) = watch::channel(BookTop {
            bid: Some(BookLevel {
                price: dec!(99.5),
                size: dec!(2),
            }),
            ask: Some(BookLevel {
                price: dec!(100),
                size: dec!(5),
            }),
        });
        (tx, BookSampler::new(rx, Duration::from_millis(420)))
    }

    fn agent(ex: &Arc<ScriptedExchange>) -> (watch::Sender<BookTop>, TraderAgent<ScriptedExchange>) {
        let (tx, sampler) = fixed_sampler();
        let agent = TraderAgent::new(
            Arc::clone(ex),
            sampler,
            "BTCUSDT",
            dec!(1),
            Duration::from_millis(420),
        );
        (tx, agent)
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_waits_for_orders_and_position_to_clear() {
        let ex = Arc::new(ScriptedExchange::default());
        // 1회차: 수동 주문 존재 / 2회차: 포지션 존재 / 3회차: 모두 정리
        ex.push_orders(vec![resting_order()]);
        ex.push_position(None);
        ex.push_orders(vec![]);
        ex.push_position(Some(position(dec!(2), Decimal::ZERO)));
        ex.push_orders(vec![]);
        ex.push_position(Some(position(Decimal::ZERO, Decimal::ZERO)));

        let (_tx, agent) = agent(&ex);
        agent.wait_until_clear().await;

        // 정리 전에는 어떤 주문도 내지 않는다
        assert!(ex.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_treats_fetch_error_as_not_clear() {
        let ex = Arc::new(ScriptedExchange::default());
        ex.fail_orders();
        ex.push_orders(vec![]);
        ex.push_position(None);

        let (_tx, agent) = agent(&ex);
        agent.wait_until_clear().await;

        assert!(ex.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_wait_amends_price_until_filled() {
        let ex = Arc::new(ScriptedExchange::default());
        // 두 틱 동안 미체결(빈 목록, 수량 0 행), 세 번째 틱에 체결
        ex.push_position(None);
        ex.push_position(Some(position(Decimal::ZERO, Decimal::ZERO)));
        ex.push_position(Some(position(dec!(1), Decimal::ZERO)));

        let (_tx, agent) = agent(&ex);
        agent.wait_for_fill("ORDER-9").await;

        assert_eq!(
            ex.calls(),
            vec![
                Call::AmendOrder {
                    order_id: "ORDER-9".to_string(),
                    price: dec!(100),
                },
                Call::AmendOrder {
                    order_id: "ORDER-9".to_string(),
                    price: dec!(100),
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_stop_fires_once_per_breach_with_cancel_first() {
        let ex = Arc::new(ScriptedExchange::default());
        ex.push_position(Some(position(dec!(1), dec!(-0.6)))); // 소프트 청산 제출
        ex.push_position(Some(position(dec!(1), dec!(-0.6)))); // 이미 걸려 있음, 중복 금지
        ex.push_position(Some(position(dec!(1), dec!(-0.9)))); // 하드 스톱
        ex.push_position(Some(position(dec!(1), dec!(-0.85)))); // 같은 구간, 재발동 금지
        ex.push_position(None);

        let (_tx, mut agent) = agent(&ex);
        agent.monitor().await;

        assert_eq!(
            ex.calls(),
            vec![
                Call::PlaceOrder {
                    side: Side::Sell,
                    qty: dec!(1),
                    price: Some(dec!(99.5)),
                },
                Call::CancelOrder {
                    order_id: "ORDER-1".to_string(),
                },
                Call::PlaceOrder {
                    side: Side::Sell,
                    qty: dec!(1),
                    price: None,
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_skips_tick_on_fetch_error() {
        let ex = Arc::new(ScriptedExchange::default());
        ex.fail_position();
        ex.push_position(Some(position(dec!(1), dec!(-0.9))));
        ex.push_position(None);

        let (_tx, mut agent) = agent(&ex);
        agent.monitor().await;

        // 오류 틱에는 아무 결정도 내리지 않고, 루프는 계속된다
        assert_eq!(
            ex.calls(),
            vec![Call::PlaceOrder {
                side: Side::Sell,
                qty: dec!(1),
                price: None,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_fires_both_ratchet_tracks_in_one_tick() {
        let ex = Arc::new(ScriptedExchange::default());
        // 1.0%는 미세(0.5)와 굵은(1.0) 체크포인트를 동시에 넘는다
        ex.push_position(Some(position(dec!(1), dec!(1.0))));
        ex.push_position(None);

        let (_tx, mut agent) = agent(&ex);
        agent.monitor().await;

        assert_eq!(
            ex.calls(),
            vec![
                Call::SetTradingStop {
                    stop_loss: dec!(100.01),
                },
                Call::SetTradingStop {
                    stop_loss: dec!(100.05),
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cycle_trailing_stop_then_hard_stop_then_restart() {
        let ex = Arc::new(ScriptedExchange::default());
        ex.push_orders(vec![]); // 대기: 주문 없음 (이후 반복)
        ex.push_position(None); // 대기: 무포지션
        ex.push_position(Some(position(dec!(1), Decimal::ZERO))); // 진입 체결
        ex.push_position(Some(position(dec!(1), dec!(0.2)))); // 아무 일도 없음
        ex.push_position(Some(position(dec!(1), dec!(0.6)))); // 미세 체크포인트 통과
        ex.push_position(Some(position(dec!(1), dec!(-0.9)))); // 하드 스톱
        ex.push_position(None); // 포지션 종료 (이후 반복)

        let (_tx, agent) = agent(&ex);
        let handle = tokio::spawn(agent.run());

        // 두 번째 진입 매수가 기록될 때까지 가상 시간 진행
        loop {
            sleep(Duration::from_millis(50)).await;
            let buys = ex
                .calls()
                .iter()
                .filter(|c| matches!(c, Call::PlaceOrder { side: Side::Buy, .. }))
                .count();
            if buys >= 2 {
                break;
            }
        }
        handle.abort();

        let calls = ex.calls();
        // 진입 → 트레일링 스톱 1회 → 시장가 청산 → 재진입
        assert_eq!(
            calls[0],
            Call::PlaceOrder {
                side: Side::Buy,
                qty: dec!(1),
                price: Some(dec!(100)),
            }
        );
        assert_eq!(
            calls[1],
            Call::SetTradingStop {
                stop_loss: dec!(100.01),
            }
        );
        assert_eq!(
            calls[2],
            Call::PlaceOrder {
                side: Side::Sell,
                qty: dec!(1),
                price: None,
            }
        );
        assert_eq!(
            calls[3],
            Call::PlaceOrder {
                side: Side::Buy,
                qty: dec!(1),
                price: Some(dec!(100)),
            }
        );

        let stop_calls = calls
            .iter()
            .filter(|c| matches!(c, Call::SetTradingStop { .. }))
            .count();
        let market_sells = calls
            .iter()
            .filter(|c| matches!(c, Call::PlaceOrder { side: Side::Sell, price: None, .. }))
            .count();
        assert_eq!(stop_calls, 1);
        assert_eq!(market_sells, 1);
        assert!(!calls.iter().any(|c| matches!(c, Call::CancelOrder { .. })));
    }
}
