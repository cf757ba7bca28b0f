//! EVM chain interaction abstraction.
//!
//! This crate provides two traits for interacting with EVM chains:
//!
//! - [`Evm`]: read-only chain access. Provides the underlying provider
//!   and a `call` method that runs `eth_call` and keeps the JSON-RPC
//!   error payload available for inspection.
//!
//! - [`Wallet`]: extends `Evm` with a signing identity and
//!   transaction submission. Submission and confirmation are separate
//!   steps so callers can track a transaction while it is in flight.
//!
//! [`ProviderEvm`] is the read-only implementation used when no wallet
//! is connected. [`RawPrivateKeyWallet`](local::RawPrivateKeyWallet)
//! signs locally with a key loaded from secrets.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionReceipt;
use async_trait::async_trait;

pub mod rpc_error;

#[cfg(feature = "local-signer")]
pub mod local;

pub use rpc_error::RpcErrorDetails;

/// Errors that can occur during EVM operations.
#[derive(Debug, thiserror::Error)]
pub enum EvmError {
    #[error("transaction error: {0}")]
    Transaction(#[from] alloy::providers::PendingTransactionError),
    #[error("transport error: {0}")]
    Transport(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
    #[error("contract error: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("failed to decode return data: {0}")]
    Decode(#[from] alloy::sol_types::Error),
    #[error("transaction reverted: {tx_hash}")]
    Reverted { tx_hash: TxHash },
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(#[from] alloy::signers::k256::ecdsa::Error),
}

/// Read-only EVM chain access.
///
/// Implementations only need to supply the provider; `call` has a
/// default implementation.
#[async_trait]
pub trait Evm: Send + Sync + 'static {
    /// The provider type used for chain access.
    type Provider: Provider + Clone + Send + Sync + 'static;

    /// Returns the underlying provider for direct chain queries.
    fn provider(&self) -> &Self::Provider;

    /// Execute a view call against `contract` with the given calldata.
    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmError> {
        let tx = alloy::rpc::types::TransactionRequest::default()
            .to(contract)
            .input(calldata.into());

        Ok(self.provider().call(tx).await?)
    }
}

/// Signing wallet on an EVM chain.
///
/// Extends [`Evm`] with a wallet identity (address) and transaction
/// submission. `submit` returns as soon as the node accepted the
/// transaction; `confirm` waits for the receipt and reports reverts.
#[async_trait]
pub trait Wallet: Evm {
    /// Returns the address this wallet signs transactions from.
    fn address(&self) -> Address;

    /// Sign and broadcast a contract call transaction.
    ///
    /// - `contract`: target contract address
    /// - `calldata`: ABI-encoded function call
    /// - `note`: human-readable operation description used for logging
    async fn submit(&self, contract: Address, calldata: Bytes, note: &str)
    -> Result<TxHash, EvmError>;

    /// Wait until a previously submitted transaction is mined.
    async fn confirm(&self, tx_hash: TxHash, note: &str) -> Result<TransactionReceipt, EvmError>;
}

/// Read-only [`Evm`] over any provider.
#[derive(Debug, Clone)]
pub struct ProviderEvm<P> {
    provider: P,
}

impl<P> ProviderEvm<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P> Evm for ProviderEvm<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    type Provider = P;

    fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<T: Evm> Evm for Arc<T> {
    type Provider = T::Provider;

    fn provider(&self) -> &Self::Provider {
        (**self).provider()
    }

    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmError> {
        (**self).call(contract, calldata).await
    }
}

#[async_trait]
impl<T: Wallet> Wallet for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn submit(
        &self,
        contract: Address,
        calldata: Bytes,
        note: &str,
    ) -> Result<TxHash, EvmError> {
        (**self).submit(contract, calldata, note).await
    }

    async fn confirm(&self, tx_hash: TxHash, note: &str) -> Result<TransactionReceipt, EvmError> {
        (**self).confirm(tx_hash, note).await
    }
}
