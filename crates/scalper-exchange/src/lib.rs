//! # Scalper Exchange
//!
//! Bybit v5 연동을 제공합니다:
//! - 서명 REST 클라이언트 (포지션/주문/손절)
//! - 공개 호가창 웹소켓 스트림
//! - 프라이빗 체결 웹소켓 스트림
//! - 최우선 호가 샘플러

pub mod client;
pub mod error;
pub mod sampler;
pub mod traits;
pub mod ws;

pub use client::{BybitClient, BybitConfig};
pub use error::{ExchangeError, ExchangeResult};
pub use sampler::BookSampler;
pub use traits::PerpExchange;
pub use ws::{ExecutionStream, OrderBookStream};
