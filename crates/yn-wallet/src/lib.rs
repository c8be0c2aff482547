//! Browser wallet connection.
//!
//! The wallet extension owns keys and signing. This crate only asks it for
//! permission on a chain and reads the first account it exposes.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use yn_api_types::{ChainId, WalletAddress};

pub const PROVIDER_MISSING_MESSAGE: &str = "Wallet not found! Please install Keplr or Fina wallet.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet provider is not available")]
    ProviderUnavailable,

    #[error("wallet permission denied for {chain_id}")]
    PermissionDenied { chain_id: String },

    #[error("no accounts found in wallet")]
    NoAccounts,

    #[error("wallet provider error: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub address: WalletAddress,
    pub algo: String,
    pub pubkey: Vec<u8>,
}

/// Signing handle handed out by the wallet. Opaque beyond account listing.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait OfflineSigner: Send + Sync {
    async fn get_accounts(&self) -> Result<Vec<AccountData>, WalletError>;
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait WalletProvider: Send + Sync {
    /// May open a permission prompt in the browser.
    async fn enable(&self, chain_id: &ChainId) -> Result<(), WalletError>;
    fn offline_signer(&self, chain_id: &ChainId) -> Result<Arc<dyn OfflineSigner>, WalletError>;
}

/// User-facing side effects of connecting.
pub trait WalletNotifier: Send + Sync {
    fn provider_missing(&self);
    fn connected(&self, _address: &WalletAddress) {}
}

/// Notifier that only writes to the log.
pub struct LogNotifier;

impl WalletNotifier for LogNotifier {
    fn provider_missing(&self) {
        warn!("{PROVIDER_MISSING_MESSAGE}");
    }

    fn connected(&self, address: &WalletAddress) {
        info!("wallet connected: {}", address);
    }
}

#[derive(Clone)]
pub struct Account {
    pub address: WalletAddress,
    pub signer: Arc<dyn OfflineSigner>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

pub struct WalletConnector {
    provider: Option<Arc<dyn WalletProvider>>,
    notifier: Arc<dyn WalletNotifier>,
    chain_id: ChainId,
}

impl WalletConnector {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        notifier: Arc<dyn WalletNotifier>,
        chain_id: ChainId,
    ) -> Self {
        Self {
            provider,
            notifier,
            chain_id,
        }
    }

    /// Connector with no provider, as in an environment without the extension.
    pub fn unavailable() -> Self {
        Self::new(None, Arc::new(LogNotifier), ChainId::secret())
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    /// Typed variant of [`connect`](Self::connect).
    pub async fn try_connect(&self) -> Result<Account, WalletError> {
        let Some(provider) = &self.provider else {
            self.notifier.provider_missing();
            return Err(WalletError::ProviderUnavailable);
        };

        provider.enable(&self.chain_id).await?;
        let signer = provider.offline_signer(&self.chain_id)?;
        let accounts = signer.get_accounts().await?;
        let first = accounts.into_iter().next().ok_or(WalletError::NoAccounts)?;

        self.notifier.connected(&first.address);
        Ok(Account {
            address: first.address,
            signer,
        })
    }

    /// Returns `None` on every failure; the cause is logged.
    pub async fn connect(&self) -> Option<Account> {
        match self.try_connect().await {
            Ok(account) => Some(account),
            Err(WalletError::ProviderUnavailable) => None,
            Err(WalletError::NoAccounts) => {
                warn!("no accounts found in wallet for {}", self.chain_id);
                None
            }
            Err(err) => {
                error!("failed to connect to wallet: {}", err);
                None
            }
        }
    }

    /// Address of the first account, or an empty string.
    pub async fn wallet_address(&self) -> String {
        self.connect()
            .await
            .map(|account| account.address.0)
            .unwrap_or_default()
    }

    /// The extension keeps no session on our side; there is nothing to release.
    pub fn disconnect(&self) {
        info!("wallet disconnected");
    }
}
