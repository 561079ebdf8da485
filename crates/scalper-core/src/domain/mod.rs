//! 트레이딩 운영을 위한 도메인 모델.

mod book;
mod execution;
mod order;
mod position;

pub use book::*;
pub use execution::*;
pub use order::*;
pub use position::*;
