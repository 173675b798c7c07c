//! Provider registry.
//!
//! A provider is identified by the address that registered it and is never
//! removed. Besides its public profile (description and commission) each
//! record carries the provider's reward emission state, which is only ever
//! written through [`rewards::settle`](crate::rewards::settle) and
//! [`rewards::schedule`](crate::rewards::schedule).

use std::collections::BTreeMap;

use basis_types::{Address, Amount, Timestamp, MAX_COMMISSION_PERCENT, MAX_DESCRIPTION_LEN};
use serde::{Deserialize, Serialize};

use crate::math::U256;
use crate::{LedgerError, Result};

/// A registered provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Provider identity. Zero on the default record of an unknown address.
    pub address: Address,
    /// Free-form profile text, at most [`MAX_DESCRIPTION_LEN`] characters.
    pub description: String,
    /// Share of delegator rewards kept by the provider, 0-100.
    pub commission_percent: u8,
    /// Sum of live delegated shares.
    pub power: Amount,
    /// Base units emitted per second until `period_finish`.
    pub reward_rate: Amount,
    /// End of the current emission period.
    pub period_finish: Timestamp,
    /// Last accumulator checkpoint.
    pub last_update_time: Timestamp,
    /// Cumulative reward per unit share, scaled by 1e18.
    pub reward_per_share_stored: U256,
    /// Length of the emission period as scheduled by the last reward injection.
    pub reward_duration: u64,
    /// Commission owed to the provider.
    pub commission_rewards: Amount,
}

impl Provider {
    fn new(address: Address, description: String, commission_percent: u8) -> Self {
        Self {
            address,
            description,
            commission_percent,
            ..Self::default()
        }
    }
}

/// Check a provider profile against the description and commission bounds.
///
/// # Errors
///
/// - [`LedgerError::InvalidInput`] if the description is longer than
///   [`MAX_DESCRIPTION_LEN`] characters or the commission exceeds 100
pub fn validate_profile(description: &str, commission_percent: u8) -> Result<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(LedgerError::InvalidInput(format!(
            "description must be under {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    if commission_percent > MAX_COMMISSION_PERCENT {
        return Err(LedgerError::InvalidInput(format!(
            "commission must not exceed {MAX_COMMISSION_PERCENT}"
        )));
    }
    Ok(())
}

/// All registered providers, keyed by address.
#[derive(Clone, Debug, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<Address, Provider>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` as a provider.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] on a bad description or commission
    /// - [`LedgerError::AlreadyExists`] if `address` already registered
    /// - [`LedgerError::RegistryFull`] if `max_providers` are registered
    pub fn create(
        &mut self,
        address: Address,
        description: String,
        commission_percent: u8,
        max_providers: u32,
    ) -> Result<&Provider> {
        validate_profile(&description, commission_percent)?;
        if self.providers.contains_key(&address) {
            return Err(LedgerError::AlreadyExists(address));
        }
        if self.providers.len() >= max_providers as usize {
            return Err(LedgerError::RegistryFull { max: max_providers });
        }

        let provider = self
            .providers
            .entry(address)
            .or_insert(Provider::new(address, description, commission_percent));
        Ok(provider)
    }

    /// Replace the profile of an existing provider.
    ///
    /// Power, commission owed and reward state are left untouched.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] on a bad description or commission
    /// - [`LedgerError::NotRegistered`] if `address` never registered
    pub fn edit(
        &mut self,
        address: &Address,
        description: String,
        commission_percent: u8,
    ) -> Result<&Provider> {
        validate_profile(&description, commission_percent)?;
        let provider = self
            .providers
            .get_mut(address)
            .ok_or(LedgerError::NotRegistered(*address))?;

        provider.description = description;
        provider.commission_percent = commission_percent;
        Ok(provider)
    }

    /// Registered provider, if any.
    pub fn get(&self, address: &Address) -> Option<&Provider> {
        self.providers.get(address)
    }

    /// Registered provider, or the default record for an unknown address.
    pub fn lookup(&self, address: &Address) -> Provider {
        self.get(address).cloned().unwrap_or_default()
    }

    /// Copy of a registered provider for staged mutation.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotRegistered`] if `address` never registered
    pub fn checkout(&self, address: &Address) -> Result<Provider> {
        self.get(address)
            .cloned()
            .ok_or(LedgerError::NotRegistered(*address))
    }

    /// Write back a record obtained from [`checkout`](Self::checkout).
    pub(crate) fn commit(&mut self, provider: Provider) {
        self.providers.insert(provider.address, provider);
    }

    /// Whether `address` is a registered provider.
    pub fn is_provider(&self, address: &Address) -> bool {
        self.providers.contains_key(address)
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Iterate providers in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1: Address = Address::repeat(0x11);
    const P2: Address = Address::repeat(0x22);

    #[test]
    fn test_create_provider() {
        let mut registry = ProviderRegistry::new();
        let provider = registry
            .create(P1, "Provider One".to_string(), 10, 5)
            .expect("create");

        assert_eq!(provider.address, P1);
        assert_eq!(provider.description, "Provider One");
        assert_eq!(provider.commission_percent, 10);
        assert_eq!(provider.power, 0);
        assert!(registry.is_provider(&P1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_description_bound_is_inclusive() {
        let mut registry = ProviderRegistry::new();
        registry
            .create(P1, "a".repeat(50), 10, 5)
            .expect("50 characters allowed");
        assert!(matches!(
            registry.create(P2, "a".repeat(51), 10, 5),
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_description_counts_characters_not_bytes() {
        // 50 two-byte characters
        validate_profile(&"é".repeat(50), 0).expect("50 characters");
    }

    #[test]
    fn test_commission_bounds() {
        validate_profile("p", 0).expect("zero commission");
        validate_profile("p", 100).expect("full commission");
        assert!(validate_profile("p", 101).is_err());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ProviderRegistry::new();
        registry.create(P1, "One".to_string(), 10, 5).expect("create");
        assert_eq!(
            registry.create(P1, "Two".to_string(), 15, 5).map(|_| ()),
            Err(LedgerError::AlreadyExists(P1))
        );
        assert_eq!(registry.lookup(&P1).description, "One");
    }

    #[test]
    fn test_capacity() {
        let mut registry = ProviderRegistry::new();
        registry.create(P1, "One".to_string(), 10, 1).expect("create");
        assert_eq!(
            registry.create(P2, "Two".to_string(), 10, 1).map(|_| ()),
            Err(LedgerError::RegistryFull { max: 1 })
        );
        assert!(!registry.is_provider(&P2));
    }

    #[test]
    fn test_edit_keeps_reward_state() {
        let mut registry = ProviderRegistry::new();
        registry.create(P1, "One".to_string(), 10, 5).expect("create");

        let mut staged = registry.checkout(&P1).expect("checkout");
        staged.power = 1_000;
        staged.commission_rewards = 7;
        staged.reward_per_share_stored = U256::from(42u128);
        registry.commit(staged);

        let edited = registry
            .edit(&P1, "Updated".to_string(), 20)
            .expect("edit")
            .clone();
        assert_eq!(edited.description, "Updated");
        assert_eq!(edited.commission_percent, 20);
        assert_eq!(edited.power, 1_000);
        assert_eq!(edited.commission_rewards, 7);
        assert_eq!(edited.reward_per_share_stored, U256::from(42u128));
    }

    #[test]
    fn test_edit_unregistered() {
        let mut registry = ProviderRegistry::new();
        assert_eq!(
            registry.edit(&P1, "x".to_string(), 1).map(|_| ()),
            Err(LedgerError::NotRegistered(P1))
        );
    }

    #[test]
    fn test_lookup_unknown_is_default() {
        let registry = ProviderRegistry::new();
        let provider = registry.lookup(&P2);
        assert!(provider.address.is_zero());
        assert_eq!(provider, Provider::default());
    }
}
