//! Local signer implementation.
//!
//! `RawPrivateKeyWallet` wraps an alloy provider with an embedded
//! `EthereumWallet` and submits transactions directly. Only compiled
//! when the `local-signer` feature is enabled.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, Bytes, TxHash};
use alloy::providers::{PendingTransactionBuilder, Provider, ProviderBuilder, WalletProvider};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::{Evm, EvmError, Wallet};

/// Local wallet that signs and submits transactions directly.
///
/// Wraps a provider that includes a wallet filler (e.g., built with
/// `ProviderBuilder::new().wallet(wallet).connect_http(...)`).
///
/// The wallet address is derived from the provider's default signer;
/// no separate address parameter is needed.
pub struct RawPrivateKeyWallet<P> {
    provider: P,
    required_confirmations: u64,
}

impl<P> RawPrivateKeyWallet<P> {
    /// Creates a new `RawPrivateKeyWallet` with the given provider and confirmation count.
    pub fn new(provider: P, required_confirmations: u64) -> Self {
        Self {
            provider,
            required_confirmations,
        }
    }
}

/// Builds an HTTP wallet from a raw private key.
pub fn connect_http(
    private_key: &B256,
    rpc_url: Url,
    required_confirmations: u64,
) -> Result<RawPrivateKeyWallet<impl Provider + WalletProvider + Clone + Send + Sync + 'static>, EvmError> {
    let signer = PrivateKeySigner::from_bytes(private_key)?;
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(rpc_url);

    Ok(RawPrivateKeyWallet::new(provider, required_confirmations))
}

#[async_trait]
impl<P> Evm for RawPrivateKeyWallet<P>
where
    P: Provider + WalletProvider + Clone + Send + Sync + 'static,
{
    type Provider = P;

    fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> Wallet for RawPrivateKeyWallet<P>
where
    P: Provider + WalletProvider + Clone + Send + Sync + 'static,
{
    fn address(&self) -> Address {
        self.provider.default_signer_address()
    }

    async fn submit(
        &self,
        contract: Address,
        calldata: Bytes,
        note: &str,
    ) -> Result<TxHash, EvmError> {
        info!(%contract, note, "Submitting local contract call");

        let tx = alloy::rpc::types::TransactionRequest::default()
            .to(contract)
            .input(calldata.into());

        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();

        info!(%tx_hash, note, "Transaction submitted");

        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash, note: &str) -> Result<TransactionReceipt, EvmError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(self.required_confirmations)
            .get_receipt()
            .await?;

        if !receipt.status() {
            return Err(EvmError::Reverted {
                tx_hash: receipt.transaction_hash,
            });
        }

        info!(%tx_hash, note, "Transaction confirmed");

        Ok(receipt)
    }
}
