//! Ledger event records.
//!
//! Every committed state transition of the ledger journals exactly one of
//! these. Hosts drain the journal after each call and publish it.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Timestamp};

/// A committed ledger state transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LedgerEvent {
    ProviderCreated {
        provider: Address,
        description: String,
        commission: u8,
    },
    ProviderEdited {
        provider: Address,
        description: String,
        commission: u8,
        timestamp: Timestamp,
    },
    Delegated {
        delegator: Address,
        provider: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
        timestamp: Timestamp,
    },
    Undelegated {
        delegator: Address,
        provider: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    RewardAdded {
        provider: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    /// `amount` is the net paid out, after commission.
    DelegatorRewardWithdrawn {
        delegator: Address,
        provider: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    ProviderCommissionWithdrawn {
        provider: Address,
        #[serde(with = "amount_str")]
        amount: Amount,
    },
    LockPeriodUpdated {
        old: u64,
        new: u64,
    },
    MaxProvidersUpdated {
        old: u32,
        new: u32,
    },
    AssetMigrated {
        old: Address,
        new: Address,
    },
    OperatorTransferred {
        previous: Address,
        new: Address,
    },
    GovernorTransferred {
        previous: Address,
        new: Address,
    },
}

impl LedgerEvent {
    /// Stable event name, matching the serialized `event_type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProviderCreated { .. } => "provider_created",
            Self::ProviderEdited { .. } => "provider_edited",
            Self::Delegated { .. } => "delegated",
            Self::Undelegated { .. } => "undelegated",
            Self::RewardAdded { .. } => "reward_added",
            Self::DelegatorRewardWithdrawn { .. } => "delegator_reward_withdrawn",
            Self::ProviderCommissionWithdrawn { .. } => "provider_commission_withdrawn",
            Self::LockPeriodUpdated { .. } => "lock_period_updated",
            Self::MaxProvidersUpdated { .. } => "max_providers_updated",
            Self::AssetMigrated { .. } => "asset_migrated",
            Self::OperatorTransferred { .. } => "operator_transferred",
            Self::GovernorTransferred { .. } => "governor_transferred",
        }
    }

    /// Whether `address` appears as a party of this event.
    pub fn involves(&self, address: &Address) -> bool {
        match self {
            Self::ProviderCreated { provider, .. }
            | Self::ProviderEdited { provider, .. }
            | Self::RewardAdded { provider, .. }
            | Self::ProviderCommissionWithdrawn { provider, .. } => provider == address,
            Self::Delegated {
                delegator, provider, ..
            }
            | Self::Undelegated {
                delegator, provider, ..
            }
            | Self::DelegatorRewardWithdrawn {
                delegator, provider, ..
            } => delegator == address || provider == address,
            Self::AssetMigrated { old, new } => old == address || new == address,
            Self::OperatorTransferred { previous, new }
            | Self::GovernorTransferred { previous, new } => {
                previous == address || new == address
            }
            Self::LockPeriodUpdated { .. } | Self::MaxProvidersUpdated { .. } => false,
        }
    }
}

/// Serialize `u128` amounts as decimal strings.
///
/// Amounts at 18 decimals do not fit in a JSON number.
pub mod amount_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_matches_name() {
        let event = LedgerEvent::RewardAdded {
            provider: Address::repeat(1),
            amount: 100_000_000_000_000_000_000,
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["event_type"], event.name());
        assert_eq!(value["amount"], "100000000000000000000");
    }

    #[test]
    fn test_involves() {
        let delegated = LedgerEvent::Undelegated {
            delegator: Address::repeat(2),
            provider: Address::repeat(3),
            amount: 1,
        };
        assert!(delegated.involves(&Address::repeat(2)));
        assert!(delegated.involves(&Address::repeat(3)));
        assert!(!delegated.involves(&Address::repeat(4)));

        let params = LedgerEvent::LockPeriodUpdated { old: 1, new: 2 };
        assert!(!params.involves(&Address::ZERO));
    }

    #[test]
    fn test_amount_roundtrip_above_u64() {
        let event = LedgerEvent::Delegated {
            delegator: Address::repeat(2),
            provider: Address::repeat(3),
            amount: u128::from(u64::MAX) * 10,
            timestamp: 1_700_000_000,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        let back: LedgerEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, event);
    }
}
