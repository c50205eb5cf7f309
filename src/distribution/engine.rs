// Distribution engine - the staged mint/lock/unlock state machine
//
// Owns the account ledger, the vesting ledger and the active stage. Each
// operation validates every precondition first and only then writes, so a
// rejected operation never leaves a partial effect behind.

use crate::bulk::{BulkMintCodec, BulkMintRecord};
use crate::distribution::clock::Clock;
use crate::distribution::config::{Allocation, DistributionConfig, TokenMetadata};
use crate::distribution::error::DistributionError;
use crate::distribution::events::{EventRecord, LedgerEvent};
use crate::distribution::transition::{EntryAction, TransitionTable};
use crate::distribution::Stage;
use crate::identity::Address;
use crate::ledger::{AccountLedger, Amount, Parity, SupplyStats, TransferOutcome};
use crate::vault::{Release, UnlockWindow, VestingLedger};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// RECEIPTS
// ============================================================================

/// Result of one successful mint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub account: Address,
    pub round: Stage,
    pub spendable: Amount,
    pub locked: Amount,
}

/// Result of a stage advance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub from: Stage,
    pub to: Stage,
    pub treasury_minted: Amount,
    pub opened_windows: Vec<UnlockWindow>,
    pub ceiling: Option<Amount>,
}

/// Result of a bulk unlock pass
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUnlockSummary {
    pub parity: Parity,
    pub accounts_released: usize,
    pub amount_released: Amount,
    pub releases: Vec<(Address, Amount)>,
}

impl BulkUnlockSummary {
    pub fn is_empty(&self) -> bool {
        self.accounts_released == 0
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Serializable state of a distribution (everything except the clock)
///
/// `history` only holds events not yet moved out by `take_history`; a store
/// keeps older events under their own keys.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributionSnapshot {
    pub config: DistributionConfig,
    pub stage: Stage,
    pub active_ceiling: Option<Amount>,
    pub accounts: AccountLedger,
    pub vesting: VestingLedger,
    pub history: Vec<EventRecord>,
    pub next_sequence: u64,
}

impl DistributionSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, DistributionError> {
        postcard::to_allocvec(self).map_err(|e| DistributionError::Serialization(e.to_string()))
    }
}

// ============================================================================
// DISTRIBUTION
// ============================================================================

/// A staged distribution of one spendable unit and its locked companion
pub struct Distribution {
    config: DistributionConfig,
    transitions: TransitionTable,
    stage: Stage,
    active_ceiling: Option<Amount>,
    accounts: AccountLedger,
    vesting: VestingLedger,
    history: Vec<EventRecord>,
    next_sequence: u64,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Distribution")
            .field("stage", &self.stage)
            .field("active_ceiling", &self.active_ceiling)
            .field("total_minted", &self.total_minted())
            .field("total_burned", &self.total_burned())
            .field("total_locked_supply", &self.total_locked_supply())
            .field("accounts", &self.account_count())
            .finish()
    }
}

impl Distribution {
    /// Create an empty distribution in the first stage
    pub fn new(config: DistributionConfig, clock: impl Clock + 'static) -> Result<Self, DistributionError> {
        config.validate()?;

        let first = config.stage(Stage::FIRST)?;
        let active_ceiling = first.ceiling.resolve(0);
        let accounts = AccountLedger::new(config.treasury, config.max_accounts);
        let vesting = VestingLedger::new(config.schedule.clone());

        info!(
            stage = %Stage::FIRST,
            treasury = %config.treasury,
            max_accounts = config.max_accounts,
            "Distribution created"
        );

        Ok(Self {
            transitions: TransitionTable::from_config(&config),
            config,
            stage: Stage::FIRST,
            active_ceiling,
            accounts,
            vesting,
            history: Vec::new(),
            next_sequence: 0,
            clock: Arc::new(clock),
        })
    }

    /// Create a distribution and mint the initial allocation table as one round
    pub fn with_allocations(
        config: DistributionConfig,
        clock: impl Clock + 'static,
        allocations: &[Allocation],
    ) -> Result<Self, DistributionError> {
        let mut distribution = Self::new(config, clock)?;
        if !allocations.is_empty() {
            distribution.mint_batch(allocations)?;
        }
        Ok(distribution)
    }

    /// Rebuild a distribution from a snapshot, checking its invariants
    pub fn from_snapshot(
        snapshot: DistributionSnapshot,
        clock: impl Clock + 'static,
    ) -> Result<Self, DistributionError> {
        snapshot.config.validate()?;

        if let Some(record) = snapshot
            .history
            .iter()
            .find(|r| r.sequence >= snapshot.next_sequence)
        {
            return Err(DistributionError::InvariantViolated(format!(
                "event {} is not below the next sequence {}",
                record.sequence, snapshot.next_sequence
            )));
        }

        let mut accounts = snapshot.accounts;
        accounts.rebuild_indexes();

        let distribution = Self {
            transitions: TransitionTable::from_config(&snapshot.config),
            config: snapshot.config,
            stage: snapshot.stage,
            active_ceiling: snapshot.active_ceiling,
            accounts,
            vesting: snapshot.vesting,
            history: snapshot.history,
            next_sequence: snapshot.next_sequence,
            clock: Arc::new(clock),
        };
        distribution.check_invariants()?;
        Ok(distribution)
    }

    pub fn snapshot(&self) -> DistributionSnapshot {
        DistributionSnapshot {
            config: self.config.clone(),
            stage: self.stage,
            active_ceiling: self.active_ceiling,
            accounts: self.accounts.clone(),
            vesting: self.vesting.clone(),
            history: self.history.clone(),
            next_sequence: self.next_sequence,
        }
    }

    /// Serialize the state to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, DistributionError> {
        self.snapshot().to_bytes()
    }

    /// Deserialize state from bytes
    pub fn from_bytes(bytes: &[u8], clock: impl Clock + 'static) -> Result<Self, DistributionError> {
        let snapshot: DistributionSnapshot = postcard::from_bytes(bytes)
            .map_err(|e| DistributionError::Serialization(e.to_string()))?;
        Self::from_snapshot(snapshot, clock)
    }

    /// SHA-256 over the serialized state
    pub fn state_digest(&self) -> Result<[u8; 32], DistributionError> {
        Ok(Sha256::digest(self.to_bytes()?).into())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.config.metadata
    }

    pub fn treasury(&self) -> &Address {
        self.accounts.treasury().address()
    }

    pub fn active_stage(&self) -> Stage {
        self.stage
    }

    /// Active cap on the minted total (`None` when unbounded)
    pub fn current_mint_ceiling(&self) -> Option<Amount> {
        self.active_ceiling
    }

    pub fn is_minting_open(&self) -> bool {
        self.config
            .stage(self.stage)
            .map(|rules| rules.minting)
            .unwrap_or(false)
    }

    pub fn spendable_balance_of(&self, account: &Address) -> Amount {
        self.accounts.spendable_balance_of(account)
    }

    pub fn locked_balance_of(&self, account: &Address) -> Amount {
        self.vesting.locked_balance_of(account)
    }

    /// Locked units `unlock` would release right now
    pub fn releasable_of(&self, account: &Address) -> Amount {
        self.vesting.releasable_of(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.accounts.allowance(owner, spender)
    }

    pub fn total_minted(&self) -> Amount {
        self.accounts.total_minted()
    }

    pub fn total_burned(&self) -> Amount {
        self.accounts.total_burned()
    }

    /// Locked units turned spendable by unlocks
    pub fn total_released(&self) -> Amount {
        self.accounts.total_released()
    }

    pub fn total_spendable_supply(&self) -> Amount {
        self.accounts.total_spendable_supply()
    }

    pub fn total_locked_supply(&self) -> Amount {
        self.vesting.total_locked_supply()
    }

    pub fn registration_index_of(&self, account: &Address) -> Option<usize> {
        self.accounts.registry().index_of(account)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.registry().len()
    }

    pub fn accounts(&self) -> &AccountLedger {
        &self.accounts
    }

    pub fn vesting(&self) -> &VestingLedger {
        &self.vesting
    }

    pub fn supply(&self) -> SupplyStats {
        let total_spendable_supply = self.total_spendable_supply();
        let total_locked_supply = self.total_locked_supply();
        SupplyStats {
            total_minted: self.total_minted(),
            total_released: self.total_released(),
            total_burned: self.total_burned(),
            total_spendable_supply,
            total_locked_supply,
            total_issued: total_spendable_supply.saturating_add(total_locked_supply),
            treasury_balance: self.spendable_balance_of(self.treasury()),
            account_count: self.account_count(),
        }
    }

    /// Accounts of one parity cohort with something to unlock, in registration order
    pub fn eligible_accounts(&self, parity: Parity) -> Vec<Address> {
        self.accounts
            .registry()
            .cohort(parity)
            .filter(|account| self.vesting.releasable_of(account) > 0)
            .copied()
            .collect()
    }

    /// Events recorded since the last `take_history`
    pub fn history(&self) -> &[EventRecord] {
        &self.history
    }

    /// Sequence number the next event will get
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Move the recorded events out, leaving the sequence counter running
    pub fn take_history(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.history)
    }

    /// Events touching one account, oldest first
    pub fn history_for<'a>(&'a self, account: &'a Address) -> impl Iterator<Item = &'a EventRecord> {
        self.history.iter().filter(move |r| r.event.involves(account))
    }

    /// Check the global accounting identities
    ///
    /// Escrow counts as issued supply: `spendable + locked` equals
    /// `minted + granted - burned`, where `granted` is every locked unit ever
    /// escrowed. Unlocks move units between the two sides without touching
    /// `minted`.
    pub fn check_invariants(&self) -> Result<(), DistributionError> {
        let violated = |msg: String| -> Result<(), DistributionError> {
            Err(DistributionError::InvariantViolated(msg))
        };
        let minted = self.total_minted();
        let released = self.total_released();
        let burned = self.total_burned();
        if minted.checked_add(released).map_or(true, |total| burned > total) {
            return violated(format!(
                "burned {} exceeds minted {} plus released {}",
                burned, minted, released
            ));
        }

        let spendable = self.accounts.sum_of_balances();
        if spendable != Some(self.total_spendable_supply()) {
            return violated(format!(
                "balances sum to {:?}, spendable supply is {}",
                spendable,
                self.total_spendable_supply()
            ));
        }

        let locked = self.vesting.sum_of_locked();
        if locked != Some(self.total_locked_supply()) {
            return violated(format!(
                "locked balances sum to {:?}, locked supply is {}",
                locked,
                self.total_locked_supply()
            ));
        }

        let escrow_released = self.vesting.sum_of_released();
        if escrow_released != Some(released) {
            return violated(format!(
                "escrow released {:?}, spendable side credited {}",
                escrow_released, released
            ));
        }

        let outstanding = spendable.zip(locked).and_then(|(s, l)| s.checked_add(l));
        let issued = self
            .vesting
            .sum_of_granted()
            .and_then(|granted| minted.checked_add(granted))
            .and_then(|total| total.checked_sub(burned));
        if outstanding.is_none() || outstanding != issued {
            return violated(format!(
                "spendable plus locked is {:?}, minted plus granted less burned is {:?}",
                outstanding, issued
            ));
        }
        Ok(())
    }

    // ========================================================================
    // MINTING
    // ========================================================================

    /// Mint `amount` spendable to `account`, escrowing the locked part
    pub fn mint(&mut self, account: Address, amount: Amount) -> Result<MintReceipt, DistributionError> {
        let receipts = self.mint_batch(&[Allocation::new(account, amount)])?;
        receipts
            .into_iter()
            .next()
            .ok_or(DistributionError::InvalidAmount)
    }

    /// Mint every allocation or none; the ceiling applies to the batch total
    pub fn mint_batch(&mut self, allocations: &[Allocation]) -> Result<Vec<MintReceipt>, DistributionError> {
        let receipts = self.plan_mint(allocations)?;

        for receipt in &receipts {
            self.accounts.issue(receipt.account, receipt.spendable)?;
            self.vesting.lock(receipt.account, receipt.round, receipt.locked)?;
            debug!(
                account = %receipt.account,
                spendable = receipt.spendable,
                locked = receipt.locked,
                "Minted"
            );
            self.record(LedgerEvent::Mint {
                account: receipt.account,
                round: receipt.round,
                spendable: receipt.spendable,
                locked: receipt.locked,
            });
        }

        if receipts.len() > 1 {
            info!(
                stage = %self.stage,
                entries = receipts.len(),
                total_minted = self.total_minted(),
                "Batch minted"
            );
        }
        Ok(receipts)
    }

    /// Validate and mint a decoded bulk record
    pub fn mint_bulk(&mut self, record: &BulkMintRecord) -> Result<Vec<MintReceipt>, DistributionError> {
        let allocations: Vec<Allocation> = record
            .entries()
            .iter()
            .map(|entry| Allocation::new(entry.account, entry.amount))
            .collect();
        self.mint_batch(&allocations)
    }

    /// Decode a binary bulk record and mint it
    pub fn mint_bulk_bytes(&mut self, bytes: &[u8]) -> Result<Vec<MintReceipt>, DistributionError> {
        let record = BulkMintCodec::decode(bytes)?;
        self.mint_bulk(&record)
    }

    fn plan_mint(&self, allocations: &[Allocation]) -> Result<Vec<MintReceipt>, DistributionError> {
        let rules = self.config.stage(self.stage)?;
        if !rules.minting {
            return Err(DistributionError::MintingClosed { stage: self.stage });
        }

        let mut receipts = Vec::with_capacity(allocations.len());
        let mut requested: Amount = 0;
        let mut locked_total: Amount = 0;
        let mut per_account: BTreeMap<Address, (Amount, Amount)> = BTreeMap::new();

        for allocation in allocations {
            if allocation.amount == 0 {
                return Err(DistributionError::InvalidAmount);
            }
            let locked = self
                .config
                .split
                .locked_part(allocation.amount)
                .ok_or(DistributionError::SupplyOverflow)?;

            requested = requested
                .checked_add(allocation.amount)
                .ok_or(DistributionError::SupplyOverflow)?;
            locked_total = locked_total
                .checked_add(locked)
                .ok_or(DistributionError::SupplyOverflow)?;

            let entry = per_account.entry(allocation.account).or_default();
            entry.0 = entry
                .0
                .checked_add(allocation.amount)
                .ok_or(DistributionError::SupplyOverflow)?;
            entry.1 = entry.1.checked_add(locked).ok_or(DistributionError::SupplyOverflow)?;

            receipts.push(MintReceipt {
                account: allocation.account,
                round: self.stage,
                spendable: allocation.amount,
                locked,
            });
        }

        let minted = self.total_minted();
        let minted_after = minted
            .checked_add(requested)
            .ok_or(DistributionError::SupplyOverflow)?;
        if let Some(ceiling) = self.active_ceiling {
            if minted_after > ceiling {
                return Err(DistributionError::CapExceeded {
                    ceiling,
                    minted,
                    requested,
                });
            }
        }
        self.total_locked_supply()
            .checked_add(locked_total)
            .ok_or(DistributionError::SupplyOverflow)?;

        let registry = self.accounts.registry();
        let new_accounts = per_account
            .keys()
            .filter(|account| !registry.contains(account))
            .count();
        registry.ensure_room_for(new_accounts)?;

        for (account, (spendable, locked)) in &per_account {
            self.accounts.check_issue(account, *spendable)?;
            self.vesting.check_lock(account, *locked)?;
        }

        Ok(receipts)
    }

    // ========================================================================
    // TRANSFERS AND ALLOWANCES
    // ========================================================================

    /// Move spendable units; sending to the treasury redeems (burns) them
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<TransferOutcome, DistributionError> {
        let outcome = self.accounts.transfer(from, to, amount)?;
        self.record_transfer(from, to, amount, outcome);
        Ok(outcome)
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.accounts.approve(owner, spender, amount);
        debug!(%owner, %spender, amount, "Allowance set");
        self.record(LedgerEvent::Approval {
            owner,
            spender,
            amount,
        });
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<TransferOutcome, DistributionError> {
        let outcome = self.accounts.transfer_from(spender, owner, to, amount)?;
        self.record_transfer(owner, to, amount, outcome);
        Ok(outcome)
    }

    pub fn increase_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        added: Amount,
    ) -> Result<Amount, DistributionError> {
        let amount = self.accounts.increase_allowance(owner, spender, added)?;
        self.record(LedgerEvent::Approval {
            owner,
            spender,
            amount,
        });
        Ok(amount)
    }

    pub fn decrease_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        subtracted: Amount,
    ) -> Result<Amount, DistributionError> {
        let amount = self.accounts.decrease_allowance(owner, spender, subtracted)?;
        self.record(LedgerEvent::Approval {
            owner,
            spender,
            amount,
        });
        Ok(amount)
    }

    fn record_transfer(&mut self, from: Address, to: Address, amount: Amount, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Redeemed => {
                info!(%from, amount, total_burned = self.total_burned(), "Redeemed to treasury");
                self.record(LedgerEvent::Redemption { from, amount });
            }
            TransferOutcome::Credited => {
                debug!(%from, %to, amount, "Transferred");
                self.record(LedgerEvent::Transfer { from, to, amount });
            }
        }
    }

    // ========================================================================
    // UNLOCKING
    // ========================================================================

    /// Release everything currently releasable for `account` into spendable form
    pub fn unlock(&mut self, account: Address) -> Result<Amount, DistributionError> {
        let release = self.vesting.plan_release(&account)?;
        self.accounts.check_release(&account, release.amount)?;

        self.apply_release(&release)?;
        debug!(%account, amount = release.amount, "Unlocked");
        Ok(release.amount)
    }

    /// Unlock every eligible account registered at an even index
    pub fn unlock_all_even(&mut self) -> Result<BulkUnlockSummary, DistributionError> {
        self.unlock_all(Parity::Even)
    }

    /// Unlock every eligible account registered at an odd index
    pub fn unlock_all_odd(&mut self) -> Result<BulkUnlockSummary, DistributionError> {
        self.unlock_all(Parity::Odd)
    }

    /// Unlock one parity cohort in registration order, all or nothing
    pub fn unlock_all(&mut self, parity: Parity) -> Result<BulkUnlockSummary, DistributionError> {
        let releases: Vec<Release> = self
            .eligible_accounts(parity)
            .iter()
            .map(|account| self.vesting.plan_release(account))
            .collect::<Result<_, _>>()?;

        let limit = self.config.bulk_unlock_limit;
        if releases.len() > limit {
            return Err(DistributionError::BulkLimitExceeded {
                limit,
                required: releases.len(),
            });
        }

        let amount_released = releases.iter().try_fold(0u128, |acc, r| {
            acc.checked_add(r.amount).ok_or(DistributionError::SupplyOverflow)
        })?;
        self.total_released()
            .checked_add(amount_released)
            .ok_or(DistributionError::SupplyOverflow)?;
        for release in &releases {
            self.accounts.check_release(&release.account, release.amount)?;
        }

        for release in &releases {
            self.apply_release(release)?;
        }

        let summary = BulkUnlockSummary {
            parity,
            accounts_released: releases.len(),
            amount_released,
            releases: releases.iter().map(|r| (r.account, r.amount)).collect(),
        };
        info!(
            ?parity,
            accounts = summary.accounts_released,
            amount = summary.amount_released,
            "Bulk unlock complete"
        );
        Ok(summary)
    }

    fn apply_release(&mut self, release: &Release) -> Result<(), DistributionError> {
        self.accounts.credit_release(release.account, release.amount)?;
        self.vesting.apply_release(release);
        self.record(LedgerEvent::Unlock {
            account: release.account,
            amount: release.amount,
        });
        Ok(())
    }

    // ========================================================================
    // STAGES
    // ========================================================================

    /// Move to the next stage and run its entry actions
    ///
    /// `expected` must name the active stage, so a repeated request cannot
    /// advance twice.
    pub fn advance_stage(&mut self, expected: Stage) -> Result<StageReport, DistributionError> {
        if self.stage != expected {
            return Err(DistributionError::StageMismatch {
                expected,
                actual: self.stage,
            });
        }
        let transition = self
            .transitions
            .from_stage(self.stage)
            .cloned()
            .ok_or(DistributionError::FinalStageReached { stage: self.stage })?;

        let now = self.clock.now();
        if let Some(gate) = transition.time_gate {
            if now < gate {
                return Err(DistributionError::TimeGateNotReached {
                    stage: transition.to,
                    gate,
                    now,
                });
            }
        }

        // Plan: only the treasury mint can fail. Its base is minted less
        // burned, so the amount does not depend on when holders unlocked.
        let treasury = *self.treasury();
        let base = self.accounts.supply().net_minted();
        let mut treasury_minted: Amount = 0;
        for action in &transition.actions {
            if let EntryAction::TreasuryMint(fraction) = action {
                let amount = fraction
                    .of(base)
                    .ok_or(DistributionError::SupplyOverflow)?;
                treasury_minted = treasury_minted
                    .checked_add(amount)
                    .ok_or(DistributionError::SupplyOverflow)?;
            }
        }
        self.accounts.check_issue(&treasury, treasury_minted)?;

        // Apply
        self.stage = transition.to;
        self.record(LedgerEvent::StageAdvanced {
            from: transition.from,
            to: transition.to,
            at: now,
        });

        let mut opened_windows = Vec::new();
        for action in &transition.actions {
            match action {
                EntryAction::TreasuryMint(_) => {
                    if treasury_minted > 0 {
                        self.accounts.issue(treasury, treasury_minted)?;
                        self.record(LedgerEvent::TreasuryMint {
                            treasury,
                            amount: treasury_minted,
                        });
                        info!(stage = %self.stage, amount = treasury_minted, "Treasury auto-mint");
                    }
                }
                EntryAction::OpenWindows => {
                    opened_windows.extend(self.vesting.open_windows_at(self.stage));
                }
                EntryAction::SetCeiling(ceiling) => {
                    self.active_ceiling = ceiling.resolve(self.total_minted());
                }
            }
        }

        info!(
            from = %transition.from,
            to = %transition.to,
            treasury_minted,
            windows = opened_windows.len(),
            ceiling = ?self.active_ceiling,
            "Stage advanced"
        );

        Ok(StageReport {
            from: transition.from,
            to: transition.to,
            treasury_minted,
            opened_windows,
            ceiling: self.active_ceiling,
        })
    }

    fn record(&mut self, event: LedgerEvent) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.history.push(EventRecord {
            sequence,
            stage: self.stage,
            event,
        });
    }
}
