//! The staking ledger state machine.
//!
//! [`StakingLedger`] owns the provider registry, the delegation book and
//! the governance parameters, and talks to two collaborators: an
//! [`Asset`] that holds principal and rewards under the ledger's custody
//! address, and a [`Capabilities`] implementation that answers operator
//! and governor checks.
//!
//! Operations run one at a time to completion. Each one checks its
//! preconditions, stages its changes on copies of the affected records,
//! makes at most one asset call, and only then commits. Any error leaves
//! the ledger exactly as it was.

use basis_access::{AccessControl, Capabilities};
use basis_asset::Asset;
use basis_types::{Address, Amount, LedgerEvent, Timestamp};
use tracing::{debug, info};

use crate::commission;
use crate::delegation::{Delegation, DelegationBook};
use crate::math::U256;
use crate::params::{self, LedgerParams};
use crate::registry::{Provider, ProviderRegistry};
use crate::rewards;
use crate::{LedgerError, Result};

/// Who is calling and when.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Authenticated caller address.
    pub caller: Address,
    /// Current time in Unix seconds.
    pub now: Timestamp,
}

impl CallContext {
    /// Create a call context.
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

/// Delegated staking ledger.
pub struct StakingLedger<A, C = AccessControl> {
    registry: ProviderRegistry,
    delegations: DelegationBook,
    total_share: Amount,
    params: LedgerParams,
    custody: Address,
    asset_address: Address,
    asset: A,
    access: C,
    events: Vec<LedgerEvent>,
}

impl<A: Asset, C: Capabilities> StakingLedger<A, C> {
    /// Create an empty ledger.
    ///
    /// `custody` is the address the ledger holds funds under in `asset`;
    /// `asset_address` identifies the asset itself.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] if `params` are invalid or `custody`
    ///   is the zero address
    pub fn new(
        params: LedgerParams,
        custody: Address,
        asset_address: Address,
        asset: A,
        access: C,
    ) -> Result<Self> {
        params.validate()?;
        if custody.is_zero() {
            return Err(LedgerError::InvalidInput(
                "custody address must be non-zero".to_string(),
            ));
        }

        info!(
            %custody,
            asset = %asset_address,
            lock_period = params.lock_period,
            max_providers = params.max_providers,
            "staking ledger initialised"
        );

        Ok(Self {
            registry: ProviderRegistry::new(),
            delegations: DelegationBook::new(),
            total_share: 0,
            params,
            custody,
            asset_address,
            asset,
            access,
            events: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Provider registry
    // ------------------------------------------------------------------

    /// Register the caller as a provider.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] on a bad description or commission
    /// - [`LedgerError::AlreadyExists`] if the caller already registered
    /// - [`LedgerError::RegistryFull`] at capacity
    pub fn create_provider(
        &mut self,
        ctx: &CallContext,
        description: impl Into<String>,
        commission_percent: u8,
    ) -> Result<()> {
        let provider = self.registry.create(
            ctx.caller,
            description.into(),
            commission_percent,
            self.params.max_providers,
        )?;
        let event = LedgerEvent::ProviderCreated {
            provider: provider.address,
            description: provider.description.clone(),
            commission: provider.commission_percent,
        };

        info!(provider = %ctx.caller, commission = commission_percent, "provider created");
        self.events.push(event);
        Ok(())
    }

    /// Update the caller's description and commission.
    ///
    /// Only affects commission taken on withdrawals from now on.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] on a bad description or commission
    /// - [`LedgerError::NotRegistered`] if the caller is not a provider
    pub fn edit_provider(
        &mut self,
        ctx: &CallContext,
        description: impl Into<String>,
        commission_percent: u8,
    ) -> Result<()> {
        let provider = self
            .registry
            .edit(&ctx.caller, description.into(), commission_percent)?;
        let event = LedgerEvent::ProviderEdited {
            provider: provider.address,
            description: provider.description.clone(),
            commission: provider.commission_percent,
            timestamp: ctx.now,
        };

        info!(provider = %ctx.caller, commission = commission_percent, "provider edited");
        self.events.push(event);
        Ok(())
    }

    /// Provider record, or the default record if `address` never registered.
    pub fn get_provider(&self, address: &Address) -> Provider {
        self.registry.lookup(address)
    }

    /// Whether `address` is a registered provider.
    pub fn is_provider(&self, address: &Address) -> bool {
        self.registry.is_provider(address)
    }

    /// Number of registered providers.
    pub fn provider_count(&self) -> usize {
        self.registry.len()
    }

    /// All registered providers.
    pub fn providers(&self) -> impl Iterator<Item = &Provider> {
        self.registry.iter()
    }

    // ------------------------------------------------------------------
    // Delegation
    // ------------------------------------------------------------------

    /// Delegate `amount` from the caller to `provider`.
    ///
    /// Pulls `amount` into custody, settles the caller's pending reward,
    /// grows the share and restarts the lock from now.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotRegistered`] if `provider` is unknown
    /// - [`LedgerError::InvalidInput`] if `amount` is zero
    /// - [`LedgerError::InsufficientApproval`] if the caller's allowance
    ///   toward the custody address is below `amount`
    /// - [`LedgerError::InsufficientBalance`] if the caller cannot fund it
    pub fn delegate(&mut self, ctx: &CallContext, provider: Address, amount: Amount) -> Result<()> {
        let mut record = self.registry.checkout(&provider)?;
        if amount == 0 {
            return Err(LedgerError::InvalidInput(
                "you cannot delegate zero".to_string(),
            ));
        }
        let approved = self.asset.allowance(&ctx.caller, &self.custody);
        if approved < amount {
            return Err(LedgerError::InsufficientApproval {
                required: amount,
                approved,
            });
        }

        let mut delegation = self.delegations.checkout_or_open(&ctx.caller, &provider);
        rewards::settle(&mut record, Some(&mut delegation), ctx.now)?;

        delegation.top_up(amount, ctx.now, self.params.lock_period)?;
        record.power = record
            .power
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let total_share = self
            .total_share
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.asset
            .transfer_from(&self.custody, &ctx.caller, &self.custody, amount)?;

        let unlock_time = delegation.unlock_time;
        self.commit(ctx.caller, record, delegation, total_share);

        info!(
            delegator = %ctx.caller,
            %provider,
            amount,
            unlock_time,
            "delegated"
        );
        self.events.push(LedgerEvent::Delegated {
            delegator: ctx.caller,
            provider,
            amount,
            timestamp: ctx.now,
        });
        Ok(())
    }

    /// Withdraw the caller's whole share from `provider`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotRegistered`] if `provider` is unknown
    /// - [`LedgerError::NoDelegation`] if the caller's share is zero
    /// - [`LedgerError::Locked`] before the unlock time
    /// - [`LedgerError::InsufficientBalance`] if custody cannot cover it
    pub fn undelegate(&mut self, ctx: &CallContext, provider: Address) -> Result<Amount> {
        let mut record = self.registry.checkout(&provider)?;
        let mut delegation = self
            .delegations
            .get(&ctx.caller, &provider)
            .filter(|d| d.share > 0)
            .cloned()
            .ok_or(LedgerError::NoDelegation {
                delegator: ctx.caller,
                provider,
            })?;
        if delegation.is_locked(ctx.now) {
            return Err(LedgerError::Locked {
                unlock_time: delegation.unlock_time,
                now: ctx.now,
            });
        }

        rewards::settle(&mut record, Some(&mut delegation), ctx.now)?;

        let amount = std::mem::take(&mut delegation.share);
        record.power = record
            .power
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;
        let total_share = self
            .total_share
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;

        self.asset.transfer(&self.custody, &ctx.caller, amount)?;

        self.commit(ctx.caller, record, delegation, total_share);

        info!(delegator = %ctx.caller, %provider, amount, "undelegated");
        self.events.push(LedgerEvent::Undelegated {
            delegator: ctx.caller,
            provider,
            amount,
        });
        Ok(amount)
    }

    /// Position of `delegator` with `provider`, or an empty default.
    pub fn get_delegation(&self, delegator: &Address, provider: &Address) -> Delegation {
        self.delegations.lookup(delegator, provider)
    }

    /// Positions recorded with `provider`, including retired ones.
    pub fn delegations_to<'a>(
        &'a self,
        provider: &'a Address,
    ) -> impl Iterator<Item = (&'a Address, &'a Delegation)> + 'a {
        self.delegations.by_provider(provider)
    }

    /// Sum of all live shares.
    pub fn total_share(&self) -> Amount {
        self.total_share
    }

    // ------------------------------------------------------------------
    // Rewards
    // ------------------------------------------------------------------

    /// Start a reward period of `amount` for `provider`. Operator only.
    ///
    /// The reward funds must already be held by the custody address.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if the caller is not the operator
    /// - [`LedgerError::NotRegistered`] if `provider` is unknown
    pub fn notify_reward_amount(
        &mut self,
        ctx: &CallContext,
        provider: Address,
        amount: Amount,
    ) -> Result<()> {
        if !self.access.is_operator(&ctx.caller) {
            return Err(LedgerError::Unauthorized {
                role: "operator",
                caller: ctx.caller,
            });
        }
        let mut record = self.registry.checkout(&provider)?;

        rewards::settle(&mut record, None, ctx.now)?;
        rewards::schedule(&mut record, amount, ctx.now, self.params.lock_period)?;

        info!(
            %provider,
            amount,
            reward_rate = record.reward_rate,
            period_finish = record.period_finish,
            "reward added"
        );
        self.registry.commit(record);
        self.events
            .push(LedgerEvent::RewardAdded { provider, amount });
        Ok(())
    }

    /// Rewards `delegator` could withdraw from `provider` at `now`, before
    /// commission. Zero for unknown pairs.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn earned(&self, delegator: &Address, provider: &Address, now: Timestamp) -> Result<Amount> {
        let record = self.registry.lookup(provider);
        let delegation = self.delegations.lookup(delegator, provider);
        rewards::earned(&record, &delegation, now)
    }

    /// Current reward-per-share accumulator of `provider`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn reward_per_share(&self, provider: &Address, now: Timestamp) -> Result<U256> {
        rewards::reward_per_share(&self.registry.lookup(provider), now)
    }

    /// `min(now, period_finish)` for `provider`.
    pub fn last_time_reward_applicable(&self, provider: &Address, now: Timestamp) -> Timestamp {
        rewards::last_time_reward_applicable(&self.registry.lookup(provider), now)
    }

    /// Expected total emission of `provider`'s current period.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn get_reward_for_duration(&self, provider: &Address) -> Result<Amount> {
        rewards::reward_for_duration(&self.registry.lookup(provider))
    }

    // ------------------------------------------------------------------
    // Commission & withdrawal
    // ------------------------------------------------------------------

    /// Pay out the caller's settled rewards from `provider`, net of
    /// commission. Works after undelegation too.
    ///
    /// Returns the net amount transferred.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NoDelegation`] if the caller never delegated to
    ///   `provider`
    /// - [`LedgerError::InsufficientBalance`] if custody cannot cover it
    pub fn withdraw_delegator_reward(
        &mut self,
        ctx: &CallContext,
        provider: Address,
    ) -> Result<Amount> {
        let mut delegation = self
            .delegations
            .get(&ctx.caller, &provider)
            .cloned()
            .ok_or(LedgerError::NoDelegation {
                delegator: ctx.caller,
                provider,
            })?;
        let mut record = self.registry.checkout(&provider)?;

        rewards::settle(&mut record, Some(&mut delegation), ctx.now)?;

        let amount = std::mem::take(&mut delegation.rewards);
        let split = commission::split(amount, record.commission_percent)?;
        record.commission_rewards = record
            .commission_rewards
            .checked_add(split.commission)
            .ok_or(LedgerError::Overflow)?;

        self.asset.transfer(&self.custody, &ctx.caller, split.net)?;

        let total_share = self.total_share;
        self.commit(ctx.caller, record, delegation, total_share);

        info!(
            delegator = %ctx.caller,
            %provider,
            earned = amount,
            net = split.net,
            commission = split.commission,
            "delegator reward withdrawn"
        );
        self.events.push(LedgerEvent::DelegatorRewardWithdrawn {
            delegator: ctx.caller,
            provider,
            amount: split.net,
        });
        Ok(split.net)
    }

    /// Pay out the caller's accumulated commission.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotRegistered`] if the caller is not a provider
    /// - [`LedgerError::NothingToWithdraw`] if no commission is owed
    /// - [`LedgerError::InsufficientBalance`] if custody cannot cover it
    pub fn withdraw_provider_commission(&mut self, ctx: &CallContext) -> Result<Amount> {
        let mut record = self.registry.checkout(&ctx.caller)?;
        if record.commission_rewards == 0 {
            return Err(LedgerError::NothingToWithdraw);
        }

        let amount = std::mem::take(&mut record.commission_rewards);
        self.asset.transfer(&self.custody, &ctx.caller, amount)?;
        self.registry.commit(record);

        info!(provider = %ctx.caller, amount, "provider commission withdrawn");
        self.events.push(LedgerEvent::ProviderCommissionWithdrawn {
            provider: ctx.caller,
            amount,
        });
        Ok(amount)
    }

    // ------------------------------------------------------------------
    // Governance
    // ------------------------------------------------------------------

    /// Change the lock period. Governor only.
    ///
    /// Running reward periods keep the duration they were scheduled with.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if the caller is not the governor
    /// - [`LedgerError::InvalidInput`] if `lock_period` is zero
    pub fn set_lock_period(&mut self, ctx: &CallContext, lock_period: u64) -> Result<()> {
        self.require_governor(ctx)?;
        params::validate_lock_period(lock_period)?;

        let old = std::mem::replace(&mut self.params.lock_period, lock_period);

        info!(old, new = lock_period, "lock period updated");
        self.events.push(LedgerEvent::LockPeriodUpdated {
            old,
            new: lock_period,
        });
        Ok(())
    }

    /// Change the registry capacity. Governor only.
    ///
    /// Lowering it below the current count only blocks new registrations.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if the caller is not the governor
    pub fn set_max_providers(&mut self, ctx: &CallContext, max_providers: u32) -> Result<()> {
        self.require_governor(ctx)?;

        let old = std::mem::replace(&mut self.params.max_providers, max_providers);

        info!(old, new = max_providers, "max providers updated");
        self.events.push(LedgerEvent::MaxProvidersUpdated {
            old,
            new: max_providers,
        });
        Ok(())
    }

    /// Switch the staked asset. Governor only.
    ///
    /// Returns the previous asset handle so the host can reconcile
    /// balances held under the old asset.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if the caller is not the governor
    /// - [`LedgerError::InvalidInput`] if `asset_address` is zero
    pub fn migrate_asset(
        &mut self,
        ctx: &CallContext,
        asset_address: Address,
        asset: A,
    ) -> Result<A> {
        self.require_governor(ctx)?;
        if asset_address.is_zero() {
            return Err(LedgerError::InvalidInput(
                "zero address given for new asset".to_string(),
            ));
        }

        let old = std::mem::replace(&mut self.asset_address, asset_address);
        let previous = std::mem::replace(&mut self.asset, asset);

        info!(%old, new = %asset_address, "staked asset migrated");
        self.events.push(LedgerEvent::AssetMigrated {
            old,
            new: asset_address,
        });
        Ok(previous)
    }

    /// Current parameters.
    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    // ------------------------------------------------------------------
    // Collaborators & events
    // ------------------------------------------------------------------

    /// Address funds are held under.
    pub fn custody(&self) -> Address {
        self.custody
    }

    /// Address of the staked asset.
    pub fn asset_address(&self) -> Address {
        self.asset_address
    }

    /// The staked asset.
    pub fn asset(&self) -> &A {
        &self.asset
    }

    /// Mutable access to the staked asset, for hosts that fund custody or
    /// manage allowances through the same handle.
    pub fn asset_mut(&mut self) -> &mut A {
        &mut self.asset
    }

    /// The capability collaborator.
    pub fn access(&self) -> &C {
        &self.access
    }

    /// Events journaled since the last [`take_events`](Self::take_events).
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Drain the event journal.
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    fn require_governor(&self, ctx: &CallContext) -> Result<()> {
        if !self.access.is_governor(&ctx.caller) {
            debug!(caller = %ctx.caller, "governor check failed");
            return Err(LedgerError::Unauthorized {
                role: "governor",
                caller: ctx.caller,
            });
        }
        Ok(())
    }

    fn commit(
        &mut self,
        delegator: Address,
        provider: Provider,
        delegation: Delegation,
        total_share: Amount,
    ) {
        self.registry.commit(provider);
        self.delegations.commit(delegator, delegation);
        self.total_share = total_share;
    }
}

impl<A: Asset> StakingLedger<A, AccessControl> {
    /// Hand the operator role to `new_operator`. Operator only.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if the caller is not the operator
    /// - [`LedgerError::InvalidInput`] if `new_operator` is zero
    pub fn transfer_operator(&mut self, ctx: &CallContext, new_operator: Address) -> Result<()> {
        let transfer = self.access.transfer_operator(&ctx.caller, new_operator)?;
        self.events.push(LedgerEvent::OperatorTransferred {
            previous: transfer.previous,
            new: transfer.new,
        });
        Ok(())
    }

    /// Hand the governor role to `new_governor`. Governor only.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if the caller is not the governor
    /// - [`LedgerError::InvalidInput`] if `new_governor` is zero
    pub fn transfer_governor(&mut self, ctx: &CallContext, new_governor: Address) -> Result<()> {
        let transfer = self.access.transfer_governor(&ctx.caller, new_governor)?;
        self.events.push(LedgerEvent::GovernorTransferred {
            previous: transfer.previous,
            new: transfer.new,
        });
        Ok(())
    }
}
