//! Program-derived and associated token addresses.
//!
//! Seeds come from [`DistributorConfig`]; nothing here is hard-wired to a
//! single deployment.

use solana_sdk::pubkey::Pubkey;

use craftdrop_core::{DistributorConfig, Phase, PublicKey};

/// SPL Associated Token Account program
/// Program: ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL
pub const ASSOCIATED_TOKEN_PROGRAM_ID: PublicKey = [
    140, 151, 37, 143, 78, 36, 137, 241, 187, 61, 16, 41, 20, 142, 13, 131,
    11, 90, 19, 153, 218, 255, 16, 132, 4, 142, 123, 216, 219, 233, 248, 89,
];

/// Instructions sysvar, read by the verifier to find the Ed25519 check
/// Address: Sysvar1nstructions1111111111111111111111111
pub const INSTRUCTIONS_SYSVAR_ID: PublicKey = [
    6, 167, 213, 23, 24, 123, 209, 102, 53, 218, 212, 4, 85, 253, 194, 192,
    193, 36, 198, 143, 33, 86, 117, 165, 219, 186, 203, 95, 8, 0, 0, 0,
];

/// Derive the phase root account: [phase_seed, phase, mint]
pub fn root_address(config: &DistributorConfig, phase: Phase) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[config.phase_seed.as_bytes(), &[phase], &config.mint],
        &Pubkey::new_from_array(config.program_id),
    )
}

/// Derive the claim record: [claim_seed, phase, owner, mint]
///
/// The owner is the entitlement holder in both claim paths, so a direct
/// and a delegated claim for the same entitlement collide here.
pub fn claim_record_address(config: &DistributorConfig, phase: Phase, owner: &PublicKey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[config.claim_seed.as_bytes(), &[phase], owner, &config.mint],
        &Pubkey::new_from_array(config.program_id),
    )
}

/// Derive associated token account address for a given wallet and mint.
///
/// ATA PDA = find_program_address(
///   [wallet, token_program, mint],
///   ASSOCIATED_TOKEN_PROGRAM_ID,
/// )
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    let (ata, _) = Pubkey::find_program_address(
        &[wallet.as_ref(), token_program.as_ref(), mint.as_ref()],
        &Pubkey::new_from_array(ASSOCIATED_TOKEN_PROGRAM_ID),
    );
    ata
}

/// Token account of `wallet` for the configured mint and token program
pub fn wallet_token_address(config: &DistributorConfig, wallet: &PublicKey) -> Pubkey {
    associated_token_address(
        &Pubkey::new_from_array(*wallet),
        &Pubkey::new_from_array(config.mint),
        &Pubkey::new_from_array(config.token_program_id),
    )
}

/// Token vault holding the phase's undistributed tokens (owned by the root PDA)
pub fn vault_address(config: &DistributorConfig, phase: Phase) -> Pubkey {
    let (root, _) = root_address(config, phase);
    wallet_token_address(config, &root.to_bytes())
}
