//! Claim submission assembler.
//!
//! Builds the verifier's instructions byte-for-byte: Anchor discriminator,
//! Borsh-encoded arguments, and the account list in declaration order.
//! No business logic lives here beyond the checks that would otherwise
//! surface as an opaque on-chain rejection.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_sdk_ids::system_program;
use tracing::{debug, info};

use craftdrop_core::{encode_pubkey, short_hex, DistributorConfig, Hash, Phase, PublicKey};
use craftdrop_crypto::{authorization_digest, verify_signature, AuthorizationError, ClaimAuthorization};
use craftdrop_distribution::DistributionSnapshot;

use crate::pda::{
    claim_record_address, root_address, vault_address, wallet_token_address,
    ASSOCIATED_TOKEN_PROGRAM_ID, INSTRUCTIONS_SYSVAR_ID,
};
use crate::{DelegatedClaim, DirectClaim, Result, SettlementError};

/// Anchor instruction discriminators for the airdrop verifier program.
/// Each is the first 8 bytes of SHA256("global:<instruction_name>").
mod instruction {
    pub const INIT_MERKLE_ROOT:            [u8; 8] = [0x7b, 0xf2, 0xd9, 0x6d, 0x9e, 0x63, 0x6e, 0x42];
    pub const UPDATE_MERKLE_ROOT:          [u8; 8] = [0xc3, 0xad, 0x26, 0x3c, 0xf2, 0xcb, 0x9e, 0x5d];
    pub const CLAIM_AIRDROP:               [u8; 8] = [0x89, 0x32, 0x7a, 0x6f, 0x59, 0xfe, 0x08, 0x14];
    pub const CLAIM_AIRDROP_WITH_RECEIVER: [u8; 8] = [0xe6, 0xa4, 0x52, 0x7d, 0x97, 0x6a, 0xcb, 0x4b];
    pub const WITHDRAW_UNCLAIMED_TOKENS:   [u8; 8] = [0x2b, 0xef, 0x28, 0x4b, 0xa4, 0x9c, 0xe7, 0x8b];
    pub const UPDATE_AIRDROP_PAUSE:        [u8; 8] = [0xba, 0x7d, 0x1d, 0xe4, 0xbc, 0x8c, 0xf8, 0x92];
}

/// Ed25519 program header: one signature, one padding byte, seven u16 offsets
const ED25519_HEADER_LEN: usize = 2 + 7 * 2;
const ED25519_PUBKEY_OFFSET: usize = ED25519_HEADER_LEN;
const ED25519_SIGNATURE_OFFSET: usize = ED25519_PUBKEY_OFFSET + 32;
const ED25519_MESSAGE_OFFSET: usize = ED25519_SIGNATURE_OFFSET + 64;
/// "This instruction" marker for the offsets' instruction-index fields
const ED25519_CURRENT_IX: u16 = u16::MAX;

/// Ed25519 verify instruction data with pubkey, signature, and message
/// inline in the same instruction.
pub fn ed25519_verify_instruction_data(pubkey: &PublicKey, message: &[u8], signature: &[u8; 64]) -> Vec<u8> {
    let mut data = Vec::with_capacity(ED25519_MESSAGE_OFFSET + message.len());
    data.push(1); // num_signatures
    data.push(0); // padding
    data.extend_from_slice(&(ED25519_SIGNATURE_OFFSET as u16).to_le_bytes());
    data.extend_from_slice(&ED25519_CURRENT_IX.to_le_bytes());
    data.extend_from_slice(&(ED25519_PUBKEY_OFFSET as u16).to_le_bytes());
    data.extend_from_slice(&ED25519_CURRENT_IX.to_le_bytes());
    data.extend_from_slice(&(ED25519_MESSAGE_OFFSET as u16).to_le_bytes());
    data.extend_from_slice(&(message.len() as u16).to_le_bytes());
    data.extend_from_slice(&ED25519_CURRENT_IX.to_le_bytes());
    data.extend_from_slice(pubkey);
    data.extend_from_slice(signature);
    data.extend_from_slice(message);
    data
}

impl DirectClaim {
    /// Anchor instruction data: disc | phase | amount | proof (u32 len + bytes)
    pub fn instruction_data(&self) -> Vec<u8> {
        let mut data = instruction::CLAIM_AIRDROP.to_vec();
        data.push(self.phase);
        data.extend_from_slice(&self.amount.to_le_bytes());
        data.extend_from_slice(&(self.proof.len() as u32).to_le_bytes());
        data.extend_from_slice(&self.proof);
        data
    }
}

impl DelegatedClaim {
    /// Anchor instruction data:
    /// disc | phase | proof_owner | amount | proof (u32 len + bytes) | expire_at | signature | verify_ix_index
    pub fn instruction_data(&self) -> Vec<u8> {
        let mut data = instruction::CLAIM_AIRDROP_WITH_RECEIVER.to_vec();
        data.push(self.phase);
        data.extend_from_slice(&self.proof_owner);
        data.extend_from_slice(&self.amount.to_le_bytes());
        data.extend_from_slice(&(self.proof.len() as u32).to_le_bytes());
        data.extend_from_slice(&self.proof);
        data.extend_from_slice(&self.expire_at.to_le_bytes());
        data.extend_from_slice(&self.signature);
        data.push(self.verify_ix_index);
        data
    }
}

/// Assembles verifier instructions for one deployment (program + mint).
#[derive(Debug, Clone)]
pub struct ClaimAssembler {
    config: DistributorConfig,
}

impl ClaimAssembler {
    /// Create an assembler; the config must pass validation
    pub fn new(config: DistributorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DistributorConfig {
        &self.config
    }

    fn program_id(&self) -> Pubkey {
        Pubkey::new_from_array(self.config.program_id)
    }

    fn mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.config.mint)
    }

    fn token_program(&self) -> Pubkey {
        Pubkey::new_from_array(self.config.token_program_id)
    }

    fn ata_program(&self) -> Pubkey {
        Pubkey::new_from_array(ASSOCIATED_TOKEN_PROGRAM_ID)
    }

    // ==================== Admin ====================

    fn root_instruction(&self, disc: [u8; 8], admin: &PublicKey, phase: Phase, root: &Hash, with_vault: bool) -> Instruction {
        let (root_pda, _) = root_address(&self.config, phase);

        let mut data = disc.to_vec();
        data.push(phase);
        data.extend_from_slice(root);

        let mut accounts = vec![
            AccountMeta::new(Pubkey::new_from_array(*admin), true),  // admin (signer + payer)
            AccountMeta::new_readonly(self.mint(), false),           // airdrop_token_mint
            AccountMeta::new(root_pda, false),                       // merkle_root
        ];
        if with_vault {
            accounts.push(AccountMeta::new(vault_address(&self.config, phase), false)); // merkle_token_vault (init)
        }
        accounts.extend([
            AccountMeta::new_readonly(self.ata_program(), false),         // associated_token_program
            AccountMeta::new_readonly(self.token_program(), false),       // token_program
            AccountMeta::new_readonly(system_program::id(), false),       // system_program
        ]);

        Instruction {
            program_id: self.program_id(),
            accounts,
            data,
        }
    }

    /// Publish the root for a new phase and create its token vault.
    pub fn init_root(&self, admin: &PublicKey, phase: Phase, root: &Hash) -> Instruction {
        info!("Assembling init_merkle_root for phase {} (root: {})", phase, short_hex(root));
        self.root_instruction(instruction::INIT_MERKLE_ROOT, admin, phase, root, true)
    }

    /// Replace the root of an existing phase.
    pub fn update_root(&self, admin: &PublicKey, phase: Phase, root: &Hash) -> Instruction {
        info!("Assembling update_merkle_root for phase {} (root: {})", phase, short_hex(root));
        self.root_instruction(instruction::UPDATE_MERKLE_ROOT, admin, phase, root, false)
    }

    /// Pause or resume claims for a phase.
    pub fn set_paused(&self, admin: &PublicKey, phase: Phase, paused: bool) -> Instruction {
        info!("Assembling update_airdrop_pause for phase {} (paused: {})", phase, paused);
        let (root_pda, _) = root_address(&self.config, phase);

        let mut data = instruction::UPDATE_AIRDROP_PAUSE.to_vec();
        data.push(phase);
        data.push(paused as u8);

        Instruction {
            program_id: self.program_id(),
            accounts: vec![
                AccountMeta::new(Pubkey::new_from_array(*admin), true),  // admin
                AccountMeta::new_readonly(self.mint(), false),           // airdrop_token_mint
                AccountMeta::new(root_pda, false),                       // merkle_root (has admin)
                AccountMeta::new_readonly(self.ata_program(), false),    // associated_token_program
                AccountMeta::new_readonly(self.token_program(), false),  // token_program
                AccountMeta::new_readonly(system_program::id(), false),  // system_program
            ],
            data,
        }
    }

    /// Sweep the phase vault into the admin's token account.
    pub fn withdraw_unclaimed(&self, admin: &PublicKey, phase: Phase) -> Instruction {
        info!("Assembling withdraw_unclaimed_tokens for phase {}", phase);
        let (root_pda, _) = root_address(&self.config, phase);

        let mut data = instruction::WITHDRAW_UNCLAIMED_TOKENS.to_vec();
        data.push(phase);

        Instruction {
            program_id: self.program_id(),
            accounts: vec![
                AccountMeta::new(Pubkey::new_from_array(*admin), true),              // admin
                AccountMeta::new_readonly(self.mint(), false),                       // airdrop_token_mint
                AccountMeta::new_readonly(root_pda, false),                          // merkle_root (has admin)
                AccountMeta::new(vault_address(&self.config, phase), false),         // merkle_token_vault
                AccountMeta::new(wallet_token_address(&self.config, admin), false),  // admin token account (init_if_needed)
                AccountMeta::new_readonly(self.ata_program(), false),                // associated_token_program
                AccountMeta::new_readonly(self.token_program(), false),              // token_program
                AccountMeta::new_readonly(system_program::id(), false),              // system_program
            ],
            data,
        }
    }

    // ==================== Claims ====================

    /// `claim_airdrop` for explicit arguments. `owner` signs; `receiver`
    /// gets the tokens.
    pub fn claim_instruction(&self, owner: &PublicKey, receiver: &PublicKey, claim: &DirectClaim) -> Result<Instruction> {
        if claim.amount == 0 {
            return Err(SettlementError::InvalidAmount);
        }

        let (root_pda, _) = root_address(&self.config, claim.phase);
        let (claim_record, _) = claim_record_address(&self.config, claim.phase, owner);

        debug!(
            "Assembled claim_airdrop: phase {}, owner {}, amount {}, proof {} bytes",
            claim.phase,
            short_hex(owner),
            claim.amount,
            claim.proof.len()
        );

        Ok(Instruction {
            program_id: self.program_id(),
            accounts: vec![
                AccountMeta::new(Pubkey::new_from_array(*owner), true),                 // signer (entitlement owner)
                AccountMeta::new_readonly(self.mint(), false),                          // airdrop_token_mint
                AccountMeta::new_readonly(Pubkey::new_from_array(*receiver), false),    // receiver
                AccountMeta::new_readonly(root_pda, false),                             // merkle_root
                AccountMeta::new(vault_address(&self.config, claim.phase), false),      // merkle_token_vault
                AccountMeta::new(wallet_token_address(&self.config, receiver), false),  // user_token_vault (receiver ATA)
                AccountMeta::new(claim_record, false),                                  // claim_airdrop_record (init)
                AccountMeta::new_readonly(self.ata_program(), false),                   // associated_token_program
                AccountMeta::new_readonly(self.token_program(), false),                 // token_program
                AccountMeta::new_readonly(system_program::id(), false),                 // system_program
            ],
            data: claim.instruction_data(),
        })
    }

    /// Direct claim for `owner`'s snapshot entry, paid to `receiver`.
    pub fn claim(&self, snapshot: &DistributionSnapshot, owner: &PublicKey, receiver: &PublicKey) -> Result<Instruction> {
        let entry = snapshot.lookup(owner)?;
        let claim = DirectClaim {
            phase: snapshot.phase(),
            amount: entry.amount,
            proof: entry.proof.to_bytes(),
        };
        info!(
            "Assembling claim for {} (phase {}, amount {}, {} siblings)",
            encode_pubkey(owner),
            claim.phase,
            claim.amount,
            entry.proof.len()
        );
        self.claim_instruction(owner, receiver, &claim)
    }

    /// `claim_airdrop_with_receiver` for explicit arguments. `receiver`
    /// signs and is paid; the claim record is keyed by the proof owner.
    pub fn delegated_claim_instruction(&self, receiver: &PublicKey, claim: &DelegatedClaim) -> Result<Instruction> {
        if claim.amount == 0 {
            return Err(SettlementError::InvalidAmount);
        }

        let (root_pda, _) = root_address(&self.config, claim.phase);
        let (claim_record, _) = claim_record_address(&self.config, claim.phase, &claim.proof_owner);

        debug!(
            "Assembled claim_airdrop_with_receiver: phase {}, owner {}, receiver {}, amount {}, proof {} bytes, verify ix {}",
            claim.phase,
            short_hex(&claim.proof_owner),
            short_hex(receiver),
            claim.amount,
            claim.proof.len(),
            claim.verify_ix_index
        );

        Ok(Instruction {
            program_id: self.program_id(),
            accounts: vec![
                AccountMeta::new(Pubkey::new_from_array(*receiver), true),                    // signer (receiver + payer)
                AccountMeta::new_readonly(self.mint(), false),                                // airdrop_token_mint
                AccountMeta::new_readonly(root_pda, false),                                   // merkle_root
                AccountMeta::new(vault_address(&self.config, claim.phase), false),            // merkle_token_vault
                AccountMeta::new(wallet_token_address(&self.config, receiver), false),        // user_token_vault (signer ATA)
                AccountMeta::new(claim_record, false),                                        // claim_airdrop_record (init)
                AccountMeta::new_readonly(Pubkey::new_from_array(INSTRUCTIONS_SYSVAR_ID), false), // ix_sysvar
                AccountMeta::new_readonly(self.ata_program(), false),                         // associated_token_program
                AccountMeta::new_readonly(self.token_program(), false),                       // token_program
                AccountMeta::new_readonly(system_program::id(), false),                       // system_program
            ],
            data: claim.instruction_data(),
        })
    }

    /// Ed25519 signature-verification instruction for a claim authorization
    pub fn ed25519_verify_instruction(&self, auth: &ClaimAuthorization) -> Instruction {
        Instruction {
            program_id: Pubkey::new_from_array(self.config.signature_program_id),
            accounts: vec![],
            data: ed25519_verify_instruction_data(&auth.owner, &auth.message, &auth.signature),
        }
    }

    /// Delegated claim of the authorization owner's snapshot entry.
    ///
    /// `submitter` must be the authorization's receiver: the verifier binds
    /// the signed receiver to the transaction signer. Refused until the
    /// deployment pins an authorization encoding, and for authorizations
    /// signed under any other encoding.
    pub fn delegated_claim(
        &self,
        snapshot: &DistributionSnapshot,
        owner: &PublicKey,
        auth: &ClaimAuthorization,
        submitter: &PublicKey,
        verify_ix_index: u8,
    ) -> Result<Instruction> {
        let pinned = self
            .config
            .authorization_encoding
            .ok_or(AuthorizationError::EncodingUnconfirmed)?;
        if auth.encoding != pinned {
            return Err(SettlementError::EncodingMismatch {
                pinned,
                signed: auth.encoding,
            });
        }
        if auth.owner != *owner {
            return Err(SettlementError::OwnerMismatch);
        }
        if auth.receiver != *submitter {
            return Err(SettlementError::ReceiverMismatch);
        }

        let entry = snapshot.lookup(owner)?;
        let proof = entry.proof.to_bytes();
        if authorization_digest(&proof, &auth.receiver, auth.expiry) != auth.digest {
            return Err(SettlementError::ProofMismatch);
        }
        if !verify_signature(&auth.owner, &auth.message, &auth.signature) {
            return Err(SettlementError::InvalidSignature);
        }

        let claim = DelegatedClaim {
            phase: snapshot.phase(),
            proof_owner: *owner,
            amount: entry.amount,
            proof,
            expire_at: auth.expiry,
            signature: auth.signature,
            verify_ix_index,
        };
        info!(
            "Assembling delegated claim for {} -> {} (phase {}, amount {}, {} siblings, expiry {})",
            encode_pubkey(owner),
            encode_pubkey(submitter),
            claim.phase,
            claim.amount,
            entry.proof.len(),
            claim.expire_at
        );
        self.delegated_claim_instruction(submitter, &claim)
    }

    /// Full instruction sequence for a delegated claim.
    ///
    /// `prefix` holds whatever the caller places first (compute budget,
    /// account creation). The Ed25519 check goes right after it and its
    /// position is passed to the verifier.
    pub fn delegated_claim_instructions(
        &self,
        prefix: Vec<Instruction>,
        snapshot: &DistributionSnapshot,
        owner: &PublicKey,
        auth: &ClaimAuthorization,
        submitter: &PublicKey,
    ) -> Result<Vec<Instruction>> {
        let index = prefix.len();
        let verify_ix_index =
            u8::try_from(index).map_err(|_| SettlementError::InstructionIndexOverflow(index))?;

        let claim = self.delegated_claim(snapshot, owner, auth, submitter, verify_ix_index)?;

        let mut instructions = prefix;
        instructions.push(self.ed25519_verify_instruction(auth));
        instructions.push(claim);
        Ok(instructions)
    }
}
