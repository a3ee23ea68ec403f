//! Entitlement source parsing.
//!
//! Input is a two-column list: `recipient,amount`, one row per line.
//! Amounts are token units with up to `decimals` fractional digits and are
//! scaled to base units with integer arithmetic. Unusable rows are dropped
//! and reported; duplicate recipients are summed.

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use tracing::{debug, info, warn};

use craftdrop_core::{decode_pubkey, encode_pubkey, PublicKey};

use crate::{DistributionError, Result};

/// Why an entitlement row was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InvalidEncoding,
    MissingAmount,
    InvalidRecipient,
    InvalidAmount,
    ZeroAmount,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::InvalidEncoding => "row is not valid UTF-8",
            SkipReason::MissingAmount => "missing amount column",
            SkipReason::InvalidRecipient => "invalid recipient address",
            SkipReason::InvalidAmount => "invalid amount",
            SkipReason::ZeroAmount => "zero amount",
        };
        f.write_str(s)
    }
}

/// A dropped row and its 1-based line number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: SkipReason,
}

/// Parsed and merged entitlement list
#[derive(Debug, Clone, Default)]
pub struct EntitlementSource {
    /// One entry per recipient, sorted by recipient key
    pub entries: Vec<(PublicKey, u64)>,
    pub skipped: Vec<SkippedRow>,
}

impl EntitlementSource {
    /// Sum of all merged amounts
    pub fn total(&self) -> u128 {
        self.entries.iter().map(|(_, amount)| *amount as u128).sum()
    }
}

/// Scale a decimal token amount to base units.
///
/// Accepts `123`, `1.5`, `.25`, `7.`; rejects signs, exponents, more
/// fractional digits than `decimals`, and values beyond `u64`.
pub fn parse_amount(raw: &str, decimals: u8) -> Option<u64> {
    let raw = raw.trim();
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, f),
        None => (raw, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }
    if frac_part.len() > decimals as usize {
        return None;
    }

    let scale = 10u64.checked_pow(decimals as u32)?;
    let int_value = if int_part.is_empty() { 0 } else { int_part.parse::<u64>().ok()? };

    let frac_value = if frac_part.is_empty() {
        0
    } else {
        let padding = 10u64.checked_pow((decimals as usize - frac_part.len()) as u32)?;
        frac_part.parse::<u64>().ok()?.checked_mul(padding)?
    };

    int_value.checked_mul(scale)?.checked_add(frac_value)
}

fn parse_row(line: &str, decimals: u8) -> std::result::Result<(PublicKey, u64), SkipReason> {
    let mut columns = line.split(',');
    let recipient = columns.next().unwrap_or_default();
    let amount = columns.next().ok_or(SkipReason::MissingAmount)?;

    let recipient = decode_pubkey(recipient).map_err(|_| SkipReason::InvalidRecipient)?;
    let amount = parse_amount(amount, decimals).ok_or(SkipReason::InvalidAmount)?;
    if amount == 0 {
        return Err(SkipReason::ZeroAmount);
    }
    Ok((recipient, amount))
}

/// Sum duplicate recipients. Output is sorted by recipient key.
pub fn merge_entitlements<I>(rows: I) -> Result<Vec<(PublicKey, u64)>>
where
    I: IntoIterator<Item = (PublicKey, u64)>,
{
    let mut totals: BTreeMap<PublicKey, u64> = BTreeMap::new();
    for (recipient, amount) in rows {
        let slot = totals.entry(recipient).or_insert(0);
        *slot = slot
            .checked_add(amount)
            .ok_or_else(|| DistributionError::AmountOverflow(encode_pubkey(&recipient)))?;
    }
    Ok(totals.into_iter().collect())
}

/// Parse entitlement rows from a reader.
pub fn parse_entitlements<R: BufRead>(reader: R, decimals: u8) -> Result<EntitlementSource> {
    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for (idx, raw) in reader.split(b'\n').enumerate() {
        let parsed = match String::from_utf8(raw?) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                parse_row(trimmed, decimals)
            }
            Err(_) => Err(SkipReason::InvalidEncoding),
        };

        match parsed {
            Ok(row) => rows.push(row),
            Err(reason) => {
                warn!("Skipping entitlement row {}: {}", idx + 1, reason);
                skipped.push(SkippedRow {
                    line: idx + 1,
                    reason,
                });
            }
        }
    }

    let row_count = rows.len();
    let entries = merge_entitlements(rows)?;
    debug!(
        "Parsed {} entitlement rows into {} recipients ({} skipped)",
        row_count,
        entries.len(),
        skipped.len()
    );

    Ok(EntitlementSource { entries, skipped })
}

/// Load an entitlement list from a file.
pub fn load_entitlements(path: &Path, decimals: u8) -> Result<EntitlementSource> {
    let file = std::fs::File::open(path)?;
    let source = parse_entitlements(std::io::BufReader::new(file), decimals)?;
    info!(
        "Loaded {} recipients from {} (total {} base units, {} rows skipped)",
        source.entries.len(),
        path.display(),
        source.total(),
        source.skipped.len()
    );
    Ok(source)
}
