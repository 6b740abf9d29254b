use std::fmt;

use ethers::abi::{self, ParamType, Token};
use ethers::contract::EthEvent;
use ethers::types::{Address, Bytes, Log, H256};

use crate::contracts::{BurnFilter, MintFilter, SwapFilter, SyncFilter, TransferFilter};

/// Classification of a pair log by its first topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidityEventKind {
    Mint,
    Burn,
    Swap,
    Sync { reserve0: u128, reserve1: u128 },
    Transfer,
    Other,
}

impl LiquidityEventKind {
    fn classify(log: &Log) -> Self {
        let Some(topic0) = log.topics.first().copied() else {
            return LiquidityEventKind::Other;
        };

        if topic0 == MintFilter::signature() {
            LiquidityEventKind::Mint
        } else if topic0 == BurnFilter::signature() {
            LiquidityEventKind::Burn
        } else if topic0 == SwapFilter::signature() {
            LiquidityEventKind::Swap
        } else if topic0 == TransferFilter::signature() {
            LiquidityEventKind::Transfer
        } else if topic0 == SyncFilter::signature() {
            decode_reserves(&log.data).unwrap_or(LiquidityEventKind::Other)
        } else {
            LiquidityEventKind::Other
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LiquidityEventKind::Mint => "Mint",
            LiquidityEventKind::Burn => "Burn",
            LiquidityEventKind::Swap => "Swap",
            LiquidityEventKind::Sync { .. } => "Sync",
            LiquidityEventKind::Transfer => "Transfer",
            LiquidityEventKind::Other => "Other",
        }
    }
}

impl fmt::Display for LiquidityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidityEventKind::Sync { reserve0, reserve1 } => {
                write!(f, "Sync(reserve0={}, reserve1={})", reserve0, reserve1)
            }
            other => f.write_str(other.name()),
        }
    }
}

// Sync(uint112 reserve0, uint112 reserve1) carries both reserves unindexed.
fn decode_reserves(data: &[u8]) -> Option<LiquidityEventKind> {
    let tokens = abi::decode(&[ParamType::Uint(112), ParamType::Uint(112)], data).ok()?;
    match tokens.as_slice() {
        [Token::Uint(reserve0), Token::Uint(reserve1)] => Some(LiquidityEventKind::Sync {
            reserve0: reserve0.low_u128(),
            reserve1: reserve1.low_u128(),
        }),
        _ => None,
    }
}

/// A log emitted by one of the monitored pairs.
///
/// Lives only until the handler has seen it; nothing is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityEvent {
    pub address: Address,
    pub kind: LiquidityEventKind,
    pub topics: Vec<H256>,
    pub payload: Bytes,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<H256>,
}

impl From<Log> for LiquidityEvent {
    fn from(log: Log) -> Self {
        let kind = LiquidityEventKind::classify(&log);
        Self {
            address: log.address,
            kind,
            block_number: log.block_number.map(|n| n.as_u64()),
            transaction_hash: log.transaction_hash,
            topics: log.topics,
            payload: log.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{U256, U64};

    fn log_with(topics: Vec<H256>, data: Vec<u8>) -> Log {
        Log {
            address: Address::from_low_u64_be(0xabc),
            topics,
            data: Bytes::from(data),
            block_number: Some(U64::from(17_000_000u64)),
            ..Default::default()
        }
    }

    fn word(value: u128) -> [u8; 32] {
        let mut buf = [0u8; 32];
        U256::from(value).to_big_endian(&mut buf);
        buf
    }

    #[test]
    fn test_sync_log_decodes_reserves() {
        let mut data = Vec::new();
        data.extend_from_slice(&word(1_000));
        data.extend_from_slice(&word(2_500));

        let event = LiquidityEvent::from(log_with(vec![SyncFilter::signature()], data));

        assert_eq!(event.address, Address::from_low_u64_be(0xabc));
        assert_eq!(event.block_number, Some(17_000_000));
        assert_eq!(
            event.kind,
            LiquidityEventKind::Sync {
                reserve0: 1_000,
                reserve1: 2_500
            }
        );
    }

    #[test]
    fn test_mint_and_burn_are_classified_by_topic() {
        let sender = H256::from_low_u64_be(7);
        let mint = LiquidityEvent::from(log_with(vec![MintFilter::signature(), sender], vec![]));
        let burn = LiquidityEvent::from(log_with(vec![BurnFilter::signature(), sender, sender], vec![]));

        assert_eq!(mint.kind, LiquidityEventKind::Mint);
        assert_eq!(burn.kind, LiquidityEventKind::Burn);
    }

    #[test]
    fn test_unknown_or_missing_topic_is_other() {
        let unknown = LiquidityEvent::from(log_with(vec![H256::repeat_byte(0x11)], vec![1, 2, 3]));
        let anonymous = LiquidityEvent::from(log_with(vec![], vec![]));

        assert_eq!(unknown.kind, LiquidityEventKind::Other);
        assert_eq!(unknown.payload, Bytes::from(vec![1, 2, 3]));
        assert_eq!(anonymous.kind, LiquidityEventKind::Other);
    }

    #[test]
    fn test_truncated_sync_payload_is_other() {
        let event = LiquidityEvent::from(log_with(vec![SyncFilter::signature()], vec![0u8; 10]));
        assert_eq!(event.kind, LiquidityEventKind::Other);
    }
}
