//! Claim flow integration tests
//!
//! 1. Deployment config on disk → assembler + authorizer
//! 2. Owner keypair file → delegated authorization → instruction sequence
//! 3. Direct claim against the published root
//! 4. Root freshness checks across a root update and a pause

use std::path::PathBuf;

use anyhow::Result;
use solana_sdk::pubkey::Pubkey;

use craftdrop_core::{AuthorizationEncoding, DistributorConfig, PublicKey, ED25519_PROGRAM_ID};
use craftdrop_crypto::{verify_authorization, verify_signature, AuthorizationError, ClaimAuthorizer, SigningKeypair};
use craftdrop_distribution::DistributionSnapshot;
use craftdrop_merkle::{encode_leaf, MerkleProof, MerkleTree};
use craftdrop_settlement::{
    check_snapshot, claim_record_address, root_address, wallet_token_address, ClaimAssembler,
    MockRootFetcher, RootStatus, SettlementError, INSTRUCTIONS_SYSVAR_ID,
};

const PROGRAM: PublicKey = [9u8; 32];
const MINT: PublicKey = [8u8; 32];
const ADMIN: PublicKey = [5u8; 32];
const BOB: PublicKey = [2u8; 32];
const RECEIVER: PublicKey = [3u8; 32];
const OWNER_SECRET: [u8; 32] = [7u8; 32];
const EXPIRY: i64 = 1_700_000_000;
const NOW: i64 = 1_699_999_000;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("craftdrop-claim-{}-{}", std::process::id(), name));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn owner() -> SigningKeypair {
    SigningKeypair::from_secret_bytes(&OWNER_SECRET)
}

fn deployment() -> DistributorConfig {
    DistributorConfig::new(PROGRAM, MINT).with_authorization_encoding(AuthorizationEncoding::HexDigest)
}

fn snapshot() -> Result<DistributionSnapshot> {
    let owner = owner().public_key_bytes();
    Ok(DistributionSnapshot::build(1, &[(owner, 1000), (BOB, 2000), (owner, 500)])?)
}

// ============================================================================
// 1. Deployment config
// ============================================================================

#[test]
fn test_config_file_drives_assembler_and_authorizer() -> Result<()> {
    craftdrop_logging::init_for_tests();
    let dir = temp_dir("config");
    let path = dir.join("distributor.json");
    deployment().save_to(&path)?;

    let loaded = DistributorConfig::load_from(&path)?;
    assert_eq!(loaded, deployment());

    let authorizer = ClaimAuthorizer::from_config(&loaded)?;
    assert_eq!(authorizer.encoding(), AuthorizationEncoding::HexDigest);

    let assembler = ClaimAssembler::new(loaded)?;
    let ix = assembler.init_root(&ADMIN, 1, &snapshot()?.root());
    assert_eq!(ix.program_id, Pubkey::new_from_array(PROGRAM));
    assert_eq!(ix.accounts[2].pubkey, root_address(assembler.config(), 1).0);

    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn test_unconfirmed_encoding_blocks_delegation() -> Result<()> {
    let config = DistributorConfig::new(PROGRAM, MINT);
    assert_eq!(
        ClaimAuthorizer::from_config(&config).unwrap_err(),
        AuthorizationError::EncodingUnconfirmed
    );

    // An authorization signed elsewhere still cannot be assembled
    let snapshot = snapshot()?;
    let owner = owner();
    let proof = snapshot.lookup(&owner.public_key_bytes())?.proof.to_bytes();
    let auth = ClaimAuthorizer::new(AuthorizationEncoding::RawDigest).authorize_at(&owner, &proof, &RECEIVER, EXPIRY, NOW)?;

    let err = ClaimAssembler::new(config)?
        .delegated_claim_instructions(vec![], &snapshot, &owner.public_key_bytes(), &auth, &RECEIVER)
        .unwrap_err();
    assert!(matches!(
        err,
        SettlementError::Authorization(AuthorizationError::EncodingUnconfirmed)
    ));

    let err = ClaimAssembler::new(deployment())?
        .delegated_claim_instructions(vec![], &snapshot, &owner.public_key_bytes(), &auth, &RECEIVER)
        .unwrap_err();
    assert!(matches!(err, SettlementError::EncodingMismatch { .. }));
    Ok(())
}

// ============================================================================
// 2. Delegated claim
// ============================================================================

/// Owner signs from a wallet keypair file; the receiver submits
/// [compute prefix, Ed25519 verify, claim_airdrop_with_receiver].
#[test]
fn test_delegated_claim_from_keypair_file() -> Result<()> {
    craftdrop_logging::init_for_tests();
    let dir = temp_dir("keypair");
    let key_path = dir.join("owner.json");

    let owner_pubkey = owner().public_key_bytes();
    let mut keypair_bytes = OWNER_SECRET.to_vec();
    keypair_bytes.extend_from_slice(&owner_pubkey);
    std::fs::write(&key_path, serde_json::to_string(&keypair_bytes)?)?;

    let owner = SigningKeypair::load_from_file(&key_path)?;
    assert_eq!(owner.public_key_bytes(), owner_pubkey);

    let snapshot = snapshot()?;
    let proof = snapshot.lookup(&owner_pubkey)?.proof.to_bytes();
    assert_eq!(proof, encode_leaf(1, &BOB, 2000).to_vec());

    let auth = ClaimAuthorizer::from_config(&deployment())?.authorize_at(&owner, &proof, &RECEIVER, EXPIRY, NOW)?;
    assert_eq!(
        hex::encode(auth.digest),
        "98d8e80d54a786d88feae445dfa21f7229f398dafbfb3da9540b903a9bf9c600"
    );
    assert!(verify_authorization(&auth, &proof));

    let assembler = ClaimAssembler::new(deployment())?;
    let prefix = vec![assembler.set_paused(&ADMIN, 1, false), assembler.set_paused(&ADMIN, 1, false)];
    let ixs = assembler.delegated_claim_instructions(prefix, &snapshot, &owner_pubkey, &auth, &RECEIVER)?;
    assert_eq!(ixs.len(), 4);

    // The verify instruction carries exactly what the owner signed
    let verify = &ixs[2];
    assert_eq!(verify.program_id, Pubkey::new_from_array(ED25519_PROGRAM_ID));
    let mut pubkey = [0u8; 32];
    pubkey.copy_from_slice(&verify.data[16..48]);
    let mut signature = [0u8; 64];
    signature.copy_from_slice(&verify.data[48..112]);
    assert!(verify_signature(&pubkey, &verify.data[112..], &signature));
    assert_eq!(&verify.data[112..], auth.message.as_slice());

    let claim = &ixs[3];
    assert_eq!(claim.program_id, Pubkey::new_from_array(PROGRAM));
    assert_eq!(*claim.data.last().expect("claim data"), 2);
    assert_eq!(&claim.data[9..41], &owner_pubkey);
    assert_eq!(&claim.data[41..49], &1500u64.to_le_bytes());
    assert!(claim.accounts[0].is_signer);
    assert_eq!(claim.accounts[0].pubkey, Pubkey::new_from_array(RECEIVER));
    assert_eq!(claim.accounts[4].pubkey, wallet_token_address(assembler.config(), &RECEIVER));
    assert_eq!(claim.accounts[5].pubkey, claim_record_address(assembler.config(), 1, &owner_pubkey).0);
    assert_eq!(claim.accounts[6].pubkey, Pubkey::new_from_array(INSTRUCTIONS_SYSVAR_ID));

    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn test_delegated_claim_rejects_other_submitter() -> Result<()> {
    let snapshot = snapshot()?;
    let owner = owner();
    let proof = snapshot.lookup(&owner.public_key_bytes())?.proof.to_bytes();
    let auth = ClaimAuthorizer::new(AuthorizationEncoding::HexDigest).authorize_at(&owner, &proof, &RECEIVER, EXPIRY, NOW)?;

    let err = ClaimAssembler::new(deployment())?
        .delegated_claim_instructions(vec![], &snapshot, &owner.public_key_bytes(), &auth, &[4u8; 32])
        .unwrap_err();
    assert!(matches!(err, SettlementError::ReceiverMismatch));
    Ok(())
}

#[test]
fn test_authorization_does_not_survive_redistribution() -> Result<()> {
    let owner = owner();
    let first = snapshot()?;
    let proof = first.lookup(&owner.public_key_bytes())?.proof.to_bytes();
    let auth = ClaimAuthorizer::new(AuthorizationEncoding::HexDigest).authorize_at(&owner, &proof, &RECEIVER, EXPIRY, NOW)?;

    // Bob's amount changes, so the owner's proof (Bob's leaf) changes too
    let second = DistributionSnapshot::build(1, &[(owner.public_key_bytes(), 1500), (BOB, 2001)])?;
    let new_proof = second.lookup(&owner.public_key_bytes())?.proof.to_bytes();
    assert!(!verify_authorization(&auth, &new_proof));

    let err = ClaimAssembler::new(deployment())?
        .delegated_claim(&second, &owner.public_key_bytes(), &auth, &RECEIVER, 0)
        .unwrap_err();
    assert!(matches!(err, SettlementError::ProofMismatch));
    Ok(())
}

// ============================================================================
// 3. Direct claim
// ============================================================================

#[test]
fn test_direct_claim_proof_reaches_root() -> Result<()> {
    let snapshot = snapshot()?;
    let owner = owner().public_key_bytes();
    let ix = ClaimAssembler::new(deployment())?.claim(&snapshot, &owner, &RECEIVER)?;

    // disc | phase | amount | proof_len | proof
    assert_eq!(ix.data[8], 1);
    let amount = u64::from_le_bytes(ix.data[9..17].try_into()?);
    let proof_len = u32::from_le_bytes(ix.data[17..21].try_into()?) as usize;
    assert_eq!(amount, 1500);
    assert_eq!(proof_len, ix.data.len() - 21);

    let proof = MerkleProof::from_bytes(&ix.data[21..])?;
    assert!(MerkleTree::verify(&snapshot.root(), &encode_leaf(1, &owner, amount), &proof));

    // Direct and delegated claims share one record per (phase, owner, mint)
    let record = claim_record_address(&deployment(), 1, &owner).0;
    assert_eq!(ix.accounts[6].pubkey, record);
    Ok(())
}

// ============================================================================
// 4. Root freshness
// ============================================================================

#[tokio::test]
async fn test_root_lifecycle() -> Result<()> {
    craftdrop_logging::init_for_tests();
    let fetcher = MockRootFetcher::new();
    let snapshot = snapshot()?;

    fetcher.set_root(1, ADMIN, snapshot.root());
    assert_eq!(check_snapshot(&fetcher, &snapshot).await?, RootStatus::Current);

    fetcher.set_paused(1, true)?;
    assert_eq!(check_snapshot(&fetcher, &snapshot).await?, RootStatus::Paused);
    fetcher.set_paused(1, false)?;

    // Admin publishes a corrected distribution
    let corrected = DistributionSnapshot::build(1, &[(owner().public_key_bytes(), 1500), (BOB, 2500)])?;
    fetcher.set_root(1, ADMIN, corrected.root());

    assert_eq!(
        check_snapshot(&fetcher, &snapshot).await?,
        RootStatus::Stale {
            on_chain: corrected.root()
        }
    );
    assert_eq!(check_snapshot(&fetcher, &corrected).await?, RootStatus::Current);
    Ok(())
}

#[tokio::test]
async fn test_unpublished_phase_is_an_error() -> Result<()> {
    let fetcher = MockRootFetcher::new();
    let snapshot = DistributionSnapshot::build(3, &[(BOB, 1)])?;
    assert!(check_snapshot(&fetcher, &snapshot).await.is_err());
    Ok(())
}
