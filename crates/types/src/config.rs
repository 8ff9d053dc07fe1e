use serde::{Deserialize, Serialize};

/// Fork schedule relevant to transaction signing.
///
/// Block-activated forks are keyed by number, later ones by timestamp. A
/// missing entry means the fork is not scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homestead_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip155_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub berlin_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub london_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancun_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prague_time: Option<u64>,
}

fn reached(fork: Option<u64>, at: u64) -> bool {
    fork.is_some_and(|f| f <= at)
}

impl ChainConfig {
    /// Ethereum mainnet.
    pub fn mainnet() -> Self {
        Self {
            chain_id: 1,
            homestead_block: Some(1_150_000),
            eip155_block: Some(2_675_000),
            berlin_block: Some(12_244_000),
            london_block: Some(12_965_000),
            cancun_time: Some(1_710_338_135),
            prague_time: Some(1_746_612_311),
        }
    }

    /// Every fork active from genesis.
    pub fn all_forks(chain_id: u64) -> Self {
        Self {
            chain_id,
            homestead_block: Some(0),
            eip155_block: Some(0),
            berlin_block: Some(0),
            london_block: Some(0),
            cancun_time: Some(0),
            prague_time: Some(0),
        }
    }

    pub fn is_homestead(&self, number: u64) -> bool {
        reached(self.homestead_block, number)
    }

    pub fn is_eip155(&self, number: u64) -> bool {
        reached(self.eip155_block, number)
    }

    pub fn is_berlin(&self, number: u64) -> bool {
        reached(self.berlin_block, number)
    }

    pub fn is_london(&self, number: u64) -> bool {
        reached(self.london_block, number)
    }

    /// Time-based forks also require London by block number.
    pub fn is_cancun(&self, number: u64, time: u64) -> bool {
        self.is_london(number) && reached(self.cancun_time, time)
    }

    pub fn is_prague(&self, number: u64, time: u64) -> bool {
        self.is_london(number) && reached(self.prague_time, time)
    }
}
