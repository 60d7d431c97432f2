//! Session context - what the shell knows about the player and the table

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sl_protocol::ServerInfo;

use crate::stage::ReelMetrics;

/// Bet sizes and payout tables announced by the authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutTables {
    /// Selectable bet sizes (sats)
    pub bet_options: Vec<u64>,
    /// Possible payouts per bet size
    pub payout_table: BTreeMap<u64, Vec<u64>>,
    /// Weights parallel to `payout_table` rows
    pub payout_weights: BTreeMap<u64, Vec<f64>>,
}

impl PayoutTables {
    /// Bet sizes offered before the first `serverInfo`
    pub const DEFAULT_BET_OPTIONS: [u64; 7] = [20, 100, 300, 500, 1000, 5000, 10000];

    /// Apply a `serverInfo` push. Empty bet lists keep the current ones.
    pub fn update(&mut self, info: &ServerInfo) {
        if !info.bet_options.is_empty() {
            self.bet_options = info.bet_options.clone();
        }
        self.payout_table = info.payout_table.clone();
        self.payout_weights = info.payout_weights.clone();
    }

    /// Payout row for a bet, if the table has a non-empty one
    pub fn options_for(&self, bet: u64) -> Option<&[u64]> {
        self.payout_table
            .get(&bet)
            .map(Vec::as_slice)
            .filter(|row| !row.is_empty())
    }

    pub fn weights_for(&self, bet: u64) -> Option<&[f64]> {
        self.payout_weights.get(&bet).map(Vec::as_slice)
    }
}

impl Default for PayoutTables {
    fn default() -> Self {
        Self {
            bet_options: Self::DEFAULT_BET_OPTIONS.to_vec(),
            payout_table: BTreeMap::new(),
            payout_weights: BTreeMap::new(),
        }
    }
}

/// Explicit session state handed to the controller by the shell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Payout destination of the player
    pub lightning_address: Option<String>,
    /// Bet chosen in the shell
    pub selected_bet: Option<u64>,
    /// Last balance shown to the player
    pub last_balance: Option<u64>,
    /// Reel layout measured by the shell; the configured default until then
    pub metrics: Option<ReelMetrics>,
    pub tables: PayoutTables,
    pub connected: bool,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lightning_address(mut self, address: impl Into<String>) -> Self {
        self.lightning_address = Some(address.into());
        self
    }

    pub fn with_bet(mut self, bet: u64) -> Self {
        self.selected_bet = Some(bet);
        self
    }

    pub fn with_balance(mut self, balance_sats: u64) -> Self {
        self.last_balance = Some(balance_sats);
        self
    }

    pub fn with_metrics(mut self, metrics: ReelMetrics) -> Self {
        self.metrics = Some(metrics.sanitized());
        self
    }

    pub fn with_tables(mut self, tables: PayoutTables) -> Self {
        self.tables = tables;
        self
    }

    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }

    /// Selected bet if it is still offered, else the first offered bet
    pub fn current_bet(&self) -> Option<u64> {
        self.selected_bet
            .filter(|bet| self.tables.bet_options.contains(bet))
            .or_else(|| self.tables.bet_options.first().copied())
    }
}
