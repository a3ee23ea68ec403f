//! Reading the verifier's current root.
//!
//! Supports two backends:
//! - **Mock**: in-memory root accounts for tests and dry runs.
//! - **Live**: Solana RPC reads of the phase root PDA.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use tracing::{debug, info, warn};

use craftdrop_core::{short_hex, DistributorConfig, Hash, Phase, PublicKey};
use craftdrop_distribution::DistributionSnapshot;

use crate::pda::root_address;
use crate::{FetchError, Result, RootInfo, RootStatus};

/// Source of the verifier's current root for a phase
#[async_trait]
pub trait RootFetcher: Send + Sync {
    async fn fetch_current_root(&self, phase: Phase) -> std::result::Result<RootInfo, FetchError>;
}

/// Compare a local snapshot with the verifier's current root.
///
/// A stale result means proofs from this snapshot will be rejected; the
/// caller must reload the published artifact before claiming.
pub async fn check_snapshot<F>(fetcher: &F, snapshot: &DistributionSnapshot) -> Result<RootStatus>
where
    F: RootFetcher + ?Sized,
{
    let info = fetcher.fetch_current_root(snapshot.phase()).await?;

    let status = if info.merkle_root != snapshot.root() {
        warn!(
            "Snapshot for phase {} is stale: local root {}, on-chain root {}",
            snapshot.phase(),
            short_hex(&snapshot.root()),
            short_hex(&info.merkle_root)
        );
        RootStatus::Stale {
            on_chain: info.merkle_root,
        }
    } else if info.paused {
        info!("Claims for phase {} are paused", snapshot.phase());
        RootStatus::Paused
    } else {
        RootStatus::Current
    };
    Ok(status)
}

/// In-memory state for the mock fetcher: raw root account data per phase
#[derive(Debug, Default)]
struct MockState {
    accounts: HashMap<Phase, Vec<u8>>,
}

/// Root fetcher backed by in-memory account data.
///
/// Accounts are stored encoded and decoded on every fetch, the same way
/// the live fetcher treats RPC responses.
#[derive(Debug, Clone, Default)]
pub struct MockRootFetcher {
    state: Arc<RwLock<MockState>>,
}

impl MockRootFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or replace) a root for `phase`
    pub fn set_root(&self, phase: Phase, admin: PublicKey, merkle_root: Hash) {
        let info = RootInfo {
            bump: 255,
            admin,
            phase,
            merkle_root,
            paused: false,
        };
        self.set_account_data(phase, info.to_account_data());
        debug!("[MOCK] Root for phase {} set to {}", phase, short_hex(&merkle_root));
    }

    /// Toggle the paused flag of an existing root
    pub fn set_paused(&self, phase: Phase, paused: bool) -> std::result::Result<(), FetchError> {
        let mut state = self.state.write().expect("root fetcher lock poisoned");
        let data = state
            .accounts
            .get_mut(&phase)
            .ok_or(FetchError::NotInitialized(phase))?;
        let mut info = RootInfo::from_account_data(data)?;
        info.paused = paused;
        *data = info.to_account_data();
        Ok(())
    }

    /// Store raw account bytes for `phase`
    pub fn set_account_data(&self, phase: Phase, data: Vec<u8>) {
        let mut state = self.state.write().expect("root fetcher lock poisoned");
        state.accounts.insert(phase, data);
    }
}

#[async_trait]
impl RootFetcher for MockRootFetcher {
    async fn fetch_current_root(&self, phase: Phase) -> std::result::Result<RootInfo, FetchError> {
        let state = self.state.read().expect("root fetcher lock poisoned");
        let data = state
            .accounts
            .get(&phase)
            .ok_or(FetchError::NotInitialized(phase))?;
        RootInfo::from_account_data(data)
    }
}

/// Root fetcher reading the phase root PDA over Solana RPC
pub struct RpcRootFetcher {
    rpc: Arc<RpcClient>,
    config: DistributorConfig,
}

impl RpcRootFetcher {
    /// Connect to `rpc_url` with `confirmed` commitment
    pub fn new(rpc_url: impl Into<String>, config: DistributorConfig) -> Self {
        let rpc = RpcClient::new_with_commitment(rpc_url.into(), CommitmentConfig::confirmed());
        Self::with_client(Arc::new(rpc), config)
    }

    /// Share an existing RPC client
    pub fn with_client(rpc: Arc<RpcClient>, config: DistributorConfig) -> Self {
        Self { rpc, config }
    }
}

#[async_trait]
impl RootFetcher for RpcRootFetcher {
    async fn fetch_current_root(&self, phase: Phase) -> std::result::Result<RootInfo, FetchError> {
        let (root_pda, _) = root_address(&self.config, phase);
        debug!("Fetching root account {} for phase {}", root_pda, phase);

        let response = self
            .rpc
            .get_account_with_commitment(&root_pda, self.rpc.commitment())
            .await
            .map_err(|e| FetchError::Rpc(e.to_string()))?;
        let account = response.value.ok_or(FetchError::NotInitialized(phase))?;

        let program_id = Pubkey::new_from_array(self.config.program_id);
        if account.owner != program_id {
            return Err(FetchError::InvalidAccountData(format!(
                "root account owned by {}, expected {}",
                account.owner, program_id
            )));
        }

        let info = RootInfo::from_account_data(&account.data)?;
        if info.phase != phase {
            return Err(FetchError::InvalidAccountData(format!(
                "root account holds phase {}, expected {}",
                info.phase, phase
            )));
        }

        info!(
            "Fetched phase {} root {} (paused: {})",
            phase,
            short_hex(&info.merkle_root),
            info.paused
        );
        Ok(info)
    }
}
