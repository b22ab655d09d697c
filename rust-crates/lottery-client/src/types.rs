use alloy::primitives::{
    Address,
    B256,
    U256,
};
use std::fmt;

const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;
const ETHER_DECIMALS: usize = 18;

/// Fixed price of one ticket: 0.015 ETH.
pub const ENTRY_STAKE: Amount = Amount::from_wei(U256::from_limbs([
    15_000_000_000_000_000,
    0,
    0,
    0,
]));

pub const GAS_LIMIT: u64 = 300_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(U256);

impl Amount {
    pub const ZERO: Amount = Amount(U256::ZERO);

    pub const fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    pub const fn wei(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let one_ether = U256::from(WEI_PER_ETHER);
        let whole = self.0 / one_ether;
        // always below 10^18, fits u64
        let fractional = (self.0 % one_ether).to::<u64>();
        if fractional == 0 {
            write!(f, "{whole}")
        } else {
            let digits = format!("{fractional:0width$}", width = ETHER_DECIMALS);
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HistoryEntry {
    pub round_id: u64,
    pub winner: Address,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}
