//! Common types shared by the enumeration and monitoring phases.

pub mod event;
pub mod pair;

pub use event::{LiquidityEvent, LiquidityEventKind};
pub use pair::Pair;
