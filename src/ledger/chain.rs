// Chain - one independently-operated ledger

use crate::claims::ClaimRef;
use crate::error::ErrorClass;
use crate::identity::AccountId;
use crate::ledger::history::latest_commitment_in;
use crate::ledger::{
    AccountRoot, AccountState, ChainHistory, Commitment, SourceChain, TxKind, TxRecord,
};
use crate::registry::{Amount, Asset, BridgeKey, ChainSide};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::debug;

/// Errors from applying a transaction to a chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account {0} does not exist")]
    NoAccount(AccountId),

    #[error("Account {0} already exists")]
    AccountExists(AccountId),

    #[error("Insufficient {asset} in {account}: available {available}, required {required}")]
    Unfunded {
        account: AccountId,
        asset: Asset,
        available: i64,
        required: i64,
    },

    #[error("An account cannot preauthorize itself")]
    SelfPreauth,

    #[error("Invalid amount: {0}")]
    BadAmount(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LedgerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LedgerError::NoAccount(_) => ErrorClass::Referential,
            LedgerError::AccountExists(_) | LedgerError::Unfunded { .. } => ErrorClass::Policy,
            LedgerError::SelfPreauth => ErrorClass::Permission,
            LedgerError::BadAmount(_) | LedgerError::InvalidConfig(_) => ErrorClass::Malformed,
        }
    }
}

/// Configuration of one chain
#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// Native drops charged for every successful transaction
    pub base_fee: i64,
    /// Native balance of the master account at genesis
    pub genesis_balance: i64,
}

impl ChainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_fee(mut self, fee: i64) -> Self {
        self.base_fee = fee;
        self
    }

    pub fn with_genesis_balance(mut self, balance: i64) -> Self {
        self.genesis_balance = balance;
        self
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.base_fee < 0 {
            return Err(LedgerError::InvalidConfig("base_fee must be >= 0".into()));
        }
        if self.genesis_balance <= 0 {
            return Err(LedgerError::InvalidConfig("genesis_balance must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            base_fee: 10,
            genesis_balance: 100_000_000_000_000_000,
        }
    }
}

/// A set of balance movements applied all-or-nothing
#[derive(Clone, Debug, Default)]
pub struct BalanceChanges {
    deltas: Vec<(AccountId, Asset, i64)>,
    created: Vec<AccountId>,
    fee: Option<(AccountId, i64)>,
}

impl BalanceChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debit(mut self, account: AccountId, amount: &Amount) -> Self {
        self.deltas.push((account, amount.asset().clone(), -amount.value()));
        self
    }

    pub fn credit(mut self, account: AccountId, amount: &Amount) -> Self {
        self.deltas.push((account, amount.asset().clone(), amount.value()));
        self
    }

    /// Allow credits to create `account` if it does not exist yet
    pub fn create(mut self, account: AccountId) -> Self {
        self.created.push(account);
        self
    }

    /// Charge the chain's base fee to the submitter
    pub fn fee(mut self, account: AccountId, drops: i64) -> Self {
        self.deltas.push((account, Asset::Native, -drops));
        self.fee = Some((account, drops));
        self
    }

    fn net(&self) -> Result<BTreeMap<(AccountId, Asset), i64>, LedgerError> {
        let mut net = BTreeMap::new();
        for (account, asset, delta) in &self.deltas {
            let entry: &mut i64 = net.entry((*account, asset.clone())).or_insert(0);
            *entry = entry
                .checked_add(*delta)
                .ok_or_else(|| LedgerError::BadAmount(format!("{} change for {} overflows", asset, account)))?;
        }
        Ok(net)
    }
}

/// One ledger: accounts, balances and an append-only transaction history
#[derive(Debug)]
pub struct Chain {
    side: ChainSide,
    config: ChainConfig,
    master: AccountId,
    accounts: HashMap<AccountId, AccountRoot>,
    history: Vec<TxRecord>,
    burned_fees: i64,
}

impl Chain {
    /// Create a chain whose master account holds the genesis balance
    pub fn new(side: ChainSide, master: AccountId, config: ChainConfig) -> Result<Self, LedgerError> {
        config.validate()?;

        let mut root = AccountRoot::new();
        root.adjust(&Asset::Native, config.genesis_balance);

        let mut accounts = HashMap::new();
        accounts.insert(master, root);

        Ok(Self {
            side,
            config,
            master,
            accounts,
            history: Vec::new(),
            burned_fees: 0,
        })
    }

    pub fn side(&self) -> ChainSide {
        self.side
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn base_fee(&self) -> i64 {
        self.config.base_fee
    }

    /// Total fees destroyed so far
    pub fn burned_fees(&self) -> i64 {
        self.burned_fees
    }

    pub fn account(&self, account: &AccountId) -> Option<&AccountRoot> {
        self.accounts.get(account)
    }

    /// Balance of `account` in `asset` (0 for unknown accounts)
    pub fn balance(&self, account: &AccountId, asset: &Asset) -> i64 {
        self.accounts
            .get(account)
            .map(|root| root.balance(asset))
            .unwrap_or(0)
    }

    pub fn native_balance(&self, account: &AccountId) -> i64 {
        self.balance(account, &Asset::Native)
    }

    /// Every non-zero balance on the chain
    pub fn balances(&self) -> BTreeMap<(AccountId, Asset), i64> {
        self.accounts
            .iter()
            .flat_map(|(id, root)| root.balances().map(move |(asset, v)| ((*id, asset.clone()), v)))
            .collect()
    }

    /// Pay native drops from the master account, creating `account` if needed
    pub fn fund(&mut self, account: AccountId, drops: i64) -> Result<(), LedgerError> {
        if drops <= 0 {
            return Err(LedgerError::BadAmount(format!("funding must be positive, got {}", drops)));
        }
        let amount = Amount::native(drops);
        let changes = BalanceChanges::new()
            .debit(self.master, &amount)
            .credit(account, &amount)
            .create(account);
        self.apply(changes)?;
        self.record(self.master, 0, TxKind::Payment { to: account, amount });
        Ok(())
    }

    /// Issue `amount` of an issued asset from its issuer to `holder`
    pub fn issue(&mut self, holder: AccountId, amount: &Amount) -> Result<(), LedgerError> {
        let issuer = *amount
            .asset()
            .issuer()
            .ok_or_else(|| LedgerError::BadAmount("native amounts cannot be issued".into()))?;
        if !amount.is_positive() {
            return Err(LedgerError::BadAmount(format!("must be positive, got {}", amount)));
        }
        if !self.accounts.contains_key(&issuer) {
            return Err(LedgerError::NoAccount(issuer));
        }
        self.apply(BalanceChanges::new().credit(holder, amount))?;
        self.record(issuer, 0, TxKind::Payment { to: holder, amount: amount.clone() });
        Ok(())
    }

    pub fn set_deposit_auth(&mut self, account: AccountId, enabled: bool) -> Result<(), LedgerError> {
        self.charge_fee(account)?;
        if let Some(root) = self.accounts.get_mut(&account) {
            root.set_deposit_auth(enabled);
        }
        self.record(account, self.config.base_fee, TxKind::AccountSet);
        Ok(())
    }

    /// Let `authorized` deposit into `account` while deposit-auth is on
    pub fn preauthorize(&mut self, account: AccountId, authorized: AccountId) -> Result<(), LedgerError> {
        if account == authorized {
            return Err(LedgerError::SelfPreauth);
        }
        if !self.accounts.contains_key(&authorized) {
            return Err(LedgerError::NoAccount(authorized));
        }
        self.charge_fee(account)?;
        if let Some(root) = self.accounts.get_mut(&account) {
            root.preauthorize(authorized);
        }
        self.record(account, self.config.base_fee, TxKind::DepositPreauth { authorized });
        Ok(())
    }

    /// Withdraw a preauthorization; returns whether one existed
    pub fn unauthorize(&mut self, account: AccountId, authorized: &AccountId) -> Result<bool, LedgerError> {
        self.charge_fee(account)?;
        let removed = self
            .accounts
            .get_mut(&account)
            .map(|root| root.unauthorize(authorized))
            .unwrap_or(false);
        self.record(account, self.config.base_fee, TxKind::AccountSet);
        Ok(removed)
    }

    /// Set the transfer fee an issuer charges, in billionths
    pub fn set_transfer_rate(&mut self, issuer: AccountId, rate: u32) -> Result<(), LedgerError> {
        self.charge_fee(issuer)?;
        if let Some(root) = self.accounts.get_mut(&issuer) {
            root.set_transfer_rate(rate);
        }
        self.record(issuer, self.config.base_fee, TxKind::AccountSet);
        Ok(())
    }

    /// Apply a set of balance movements atomically.
    ///
    /// Debits of an issued asset from its issuer mint; credits to the issuer
    /// burn. Every other debit must be covered by the existing balance.
    pub fn apply(&mut self, changes: BalanceChanges) -> Result<(), LedgerError> {
        let net = changes.net()?;

        for ((account, asset), delta) in &net {
            let exists = self.accounts.contains_key(account);
            if !exists && !changes.created.contains(account) {
                return Err(LedgerError::NoAccount(*account));
            }
            if asset.issuer() == Some(account) {
                continue;
            }
            let available = self.balance(account, asset);
            let after = available
                .checked_add(*delta)
                .ok_or_else(|| LedgerError::BadAmount(format!("{} balance of {} overflows", asset, account)))?;
            if after < 0 {
                return Err(LedgerError::Unfunded {
                    account: *account,
                    asset: asset.clone(),
                    available,
                    required: delta.saturating_neg(),
                });
            }
        }

        let side = self.side;
        for ((account, asset), delta) in net {
            let root = self.accounts.entry(account).or_insert_with(|| {
                debug!(chain = %side, %account, "account created");
                AccountRoot::new()
            });
            if asset.issuer() != Some(&account) {
                root.adjust(&asset, delta);
            }
        }

        if let Some((_, drops)) = changes.fee {
            self.burned_fees = self.burned_fees.saturating_add(drops);
        }
        Ok(())
    }

    /// Append a transaction to history, returning its index
    pub fn record(&mut self, account: AccountId, fee: i64, kind: TxKind) -> u64 {
        let index = self.history.len() as u64;
        self.history.push(TxRecord {
            index,
            account,
            fee,
            timestamp: Utc::now(),
            kind,
        });
        index
    }

    pub fn history(&self) -> &[TxRecord] {
        &self.history
    }

    /// Immutable copy of history for witnesses to scan concurrently
    pub fn snapshot(&self) -> ChainHistory {
        ChainHistory::new(self.side, self.history.clone())
    }

    fn charge_fee(&mut self, account: AccountId) -> Result<(), LedgerError> {
        let fee = self.config.base_fee;
        self.apply(BalanceChanges::new().fee(account, fee))
    }
}

impl AccountState for Chain {
    fn account_exists(&self, account: &AccountId) -> bool {
        self.accounts.contains_key(account)
    }

    fn deposit_auth_enabled(&self, account: &AccountId) -> bool {
        self.accounts
            .get(account)
            .map(|root| root.deposit_auth())
            .unwrap_or(false)
    }

    fn is_preauthorized(&self, account: &AccountId, sender: &AccountId) -> bool {
        self.accounts
            .get(account)
            .map(|root| root.is_preauthorized(sender))
            .unwrap_or(false)
    }

    fn transfer_rate(&self, issuer: &AccountId) -> u32 {
        self.accounts
            .get(issuer)
            .map(|root| root.transfer_rate())
            .unwrap_or(0)
    }

    fn master_account(&self) -> AccountId {
        self.master
    }
}

impl SourceChain for Chain {
    fn side(&self) -> ChainSide {
        self.side
    }

    fn latest_commitment(&self, bridge: &BridgeKey, reference: ClaimRef) -> Option<Commitment> {
        latest_commitment_in(&self.history, bridge, reference)
    }
}
