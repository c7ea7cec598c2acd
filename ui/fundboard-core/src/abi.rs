//! Minimal Solidity ABI codec for the funding contract's surface.
//!
//! Only the shapes the contract uses are supported: `uint256` and `string`
//! arguments, and `uint256` / `address` / `string` / tuple return values.

use primitive_types::U256;
use sha3::{Digest, Keccak256};

use crate::error::AbiError;
use crate::types::{Address, OnChainCampaign};

const WORD: usize = 32;

pub const TOTAL_DONATIONS: &str = "totalDonations()";
pub const GET_DONATION: &str = "getDonation(uint256)";
pub const GET_TOTAL_DONATED: &str = "getTotalDonated(uint256)";
pub const CREATE_DONATION: &str = "createDonation(uint256,string)";
pub const DONATE: &str = "donate(uint256,uint256)";

/// A call argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Uint(U256),
    String(String),
}

/// First four bytes of the Keccak-256 hash of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Selector followed by the head/tail encoding of `args`.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut head = Vec::with_capacity(args.len() * WORD);
    let mut tail = Vec::new();
    let head_len = args.len() * WORD;

    for arg in args {
        match arg {
            Token::Uint(v) => head.extend_from_slice(&uint_word(*v)),
            Token::String(s) => {
                head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
                tail.extend_from_slice(&uint_word(U256::from(s.len())));
                tail.extend_from_slice(s.as_bytes());
                let pad = (WORD - s.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(pad));
            }
        }
    }

    let mut out = Vec::with_capacity(4 + head.len() + tail.len());
    out.extend_from_slice(&selector(signature));
    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
    out
}

fn uint_word(v: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    v.to_big_endian(&mut word);
    word
}

fn word_at(data: &[u8], pos: usize) -> Result<&[u8], AbiError> {
    let end = pos.checked_add(WORD).ok_or(AbiError::OutOfRange)?;
    data.get(pos..end).ok_or(AbiError::TooShort {
        needed: end,
        got: data.len(),
    })
}

fn as_usize(v: U256) -> Result<usize, AbiError> {
    if v > U256::from(usize::MAX) {
        return Err(AbiError::OutOfRange);
    }
    Ok(v.low_u64() as usize)
}

pub fn decode_uint(data: &[u8], pos: usize) -> Result<U256, AbiError> {
    Ok(U256::from_big_endian(word_at(data, pos)?))
}

pub fn decode_address(data: &[u8], pos: usize) -> Result<Address, AbiError> {
    let word = word_at(data, pos)?;
    Ok(Address::from_slice(&word[12..]))
}

/// Decodes a `string` whose offset word sits at `pos`; the offset is
/// relative to `base` (the start of the enclosing tuple).
pub fn decode_string(data: &[u8], base: usize, pos: usize) -> Result<String, AbiError> {
    let offset = as_usize(decode_uint(data, pos)?)?;
    let start = base.checked_add(offset).ok_or(AbiError::OutOfRange)?;
    let len = as_usize(decode_uint(data, start)?)?;
    let body = start + WORD;
    let end = body.checked_add(len).ok_or(AbiError::OutOfRange)?;
    let bytes = data.get(body..end).ok_or(AbiError::TooShort {
        needed: end,
        got: data.len(),
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
}

/// Decodes the `getDonation` return value: one dynamic tuple
/// `(uint256, uint256, address, uint256, string)` behind an offset word.
pub fn decode_campaign(data: &[u8]) -> Result<OnChainCampaign, AbiError> {
    let base = as_usize(decode_uint(data, 0)?)?;
    if base > data.len() {
        return Err(AbiError::OutOfRange);
    }
    let timestamp = decode_uint(data, base + 3 * WORD)?;
    if timestamp > U256::from(u64::MAX) {
        return Err(AbiError::OutOfRange);
    }
    Ok(OnChainCampaign {
        target_amount: decode_uint(data, base)?,
        total_donated: decode_uint(data, base + WORD)?,
        creator: decode_address(data, base + 2 * WORD)?,
        timestamp: timestamp.low_u64(),
        description: decode_string(data, base, base + 4 * WORD)?,
    })
}

/// Inverse of [`decode_campaign`]; produces the bytes a node returns for
/// `getDonation`.
pub fn encode_campaign(c: &OnChainCampaign) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&uint_word(U256::from(WORD)));
    out.extend_from_slice(&uint_word(c.target_amount));
    out.extend_from_slice(&uint_word(c.total_donated));
    let mut addr = [0u8; WORD];
    addr[12..].copy_from_slice(c.creator.as_bytes());
    out.extend_from_slice(&addr);
    out.extend_from_slice(&uint_word(U256::from(c.timestamp)));
    out.extend_from_slice(&uint_word(U256::from(5 * WORD)));
    out.extend_from_slice(&uint_word(U256::from(c.description.len())));
    out.extend_from_slice(c.description.as_bytes());
    let pad = (WORD - c.description.len() % WORD) % WORD;
    out.extend(std::iter::repeat(0u8).take(pad));
    out
}

/// A single `uint256` return value.
pub fn encode_uint(v: U256) -> Vec<u8> {
    uint_word(v).to_vec()
}

pub fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn from_hex(text: &str) -> Result<Vec<u8>, AbiError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| AbiError::Hex(e.to_string()))
}

/// Parses a quantity such as `"0x14a34"` (JSON-RPC quantity encoding).
pub fn parse_quantity(text: &str) -> Result<U256, AbiError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16).map_err(|e| AbiError::Hex(format!("{e:?}")))
}

pub fn parse_address(text: &str) -> Result<Address, AbiError> {
    let bytes = from_hex(text.trim())?;
    if bytes.len() != 20 {
        return Err(AbiError::Hex(format!(
            "address must be 20 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

pub fn format_address(address: &Address) -> String {
    format!("{address:#x}")
}
