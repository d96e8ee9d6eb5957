//! Settlement contract boundary.
//!
//! The deployed contract's clearing algorithm lives on-chain; this client
//! only issues these fixed-shape calls around channel funding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use clearline_types::Address;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("contract call rejected: {0}")]
    Rejected(String),
    #[error("chain unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: String,
}

#[async_trait]
pub trait SettlementContract: Send + Sync {
    async fn approve(&self, token: Address, amount: &str) -> Result<TxReceipt, ContractError>;

    async fn deposit(&self, token: Address, amount: &str) -> Result<TxReceipt, ContractError>;

    async fn withdraw(&self, token: Address, amount: &str) -> Result<TxReceipt, ContractError>;

    async fn custody_balance(
        &self,
        owner: Address,
        token: Address,
    ) -> Result<String, ContractError>;
}

/// In-memory settlement double: records calls and serves configured custody
/// balances.
#[derive(Debug, Default)]
pub struct MockSettlement {
    custody: Mutex<HashMap<(Address, Address), String>>,
    calls: Mutex<Vec<String>>,
    tx_counter: AtomicU64,
}

impl MockSettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_custody_balance(&self, owner: Address, token: Address, amount: impl Into<String>) {
        self.custody
            .lock()
            .unwrap()
            .insert((owner, token), amount.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> TxReceipt {
        self.calls.lock().unwrap().push(call);
        let nonce = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        TxReceipt {
            tx_hash: format!("0x{nonce:064x}"),
        }
    }
}

#[async_trait]
impl SettlementContract for MockSettlement {
    async fn approve(&self, token: Address, amount: &str) -> Result<TxReceipt, ContractError> {
        Ok(self.record(format!("approve({token},{amount})")))
    }

    async fn deposit(&self, token: Address, amount: &str) -> Result<TxReceipt, ContractError> {
        Ok(self.record(format!("deposit({token},{amount})")))
    }

    async fn withdraw(&self, token: Address, amount: &str) -> Result<TxReceipt, ContractError> {
        Ok(self.record(format!("withdraw({token},{amount})")))
    }

    async fn custody_balance(
        &self,
        owner: Address,
        token: Address,
    ) -> Result<String, ContractError> {
        Ok(self
            .custody
            .lock()
            .unwrap()
            .get(&(owner, token))
            .cloned()
            .unwrap_or_else(|| "0".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use clearline_types::Address;

    use super::{MockSettlement, SettlementContract};

    #[tokio::test]
    async fn records_calls_and_serves_custody_balances() {
        let settlement = MockSettlement::new();
        let owner = Address::new([0x01; 20]);
        let token = Address::new([0xaa; 20]);

        let approve = settlement.approve(token, "100").await.unwrap();
        let deposit = settlement.deposit(token, "100").await.unwrap();
        assert_ne!(approve.tx_hash, deposit.tx_hash);
        assert_eq!(settlement.calls().len(), 2);

        assert_eq!(settlement.custody_balance(owner, token).await.unwrap(), "0");
        settlement.set_custody_balance(owner, token, "250");
        assert_eq!(
            settlement.custody_balance(owner, token).await.unwrap(),
            "250"
        );
    }
}
