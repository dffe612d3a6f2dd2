use crate::error::AddressError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const CHECKSUM_LEN: usize = 4;
const ADDRESS_LEN: usize = 58;

lazy_static! {
    static ref ADDRESS_RE: Regex = Regex::new(r"^[A-Z2-7]{58}$").unwrap();
}

fn base32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 31) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 31) as usize] as char);
    }
    out
}

fn base32_decode(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for ch in input.bytes() {
        let value = BASE32_ALPHABET.iter().position(|&a| a == ch)? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    Some(out)
}

pub(crate) fn sha512_256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// An account address: 32-byte public key, shown as base32 with a 4-byte checksum.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 32]);

impl Address {
    pub fn from_public_key(public_key: [u8; 32]) -> Self {
        Address(public_key)
    }

    /// Escrow address of an application: hash of `"appID"` and the big-endian id.
    pub fn for_application(app_id: u64) -> Self {
        Self::from_public_key(sha512_256(&[&b"appID"[..], &app_id.to_be_bytes()[..]]))
    }

    /// Deterministic dev account key material.
    pub fn from_seed(seed: &[u8]) -> Self {
        Self::from_public_key(sha512_256(&[&b"anjoli-dev-account"[..], seed]))
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.0
    }

    /// `ABCDEFGH...UVWXYZ` form used on the connected-account line.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..8], &full[full.len() - 6..])
    }

    fn checksum(public_key: &[u8; 32]) -> [u8; CHECKSUM_LEN] {
        let digest = sha512_256(&[&public_key[..]]);
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&digest[32 - CHECKSUM_LEN..]);
        checksum
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Vec::with_capacity(32 + CHECKSUM_LEN);
        raw.extend_from_slice(&self.0);
        raw.extend_from_slice(&Self::checksum(&self.0));
        f.write_str(&base32_encode(&raw))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != ADDRESS_LEN {
            return Err(AddressError::Length(s.len()));
        }
        if !ADDRESS_RE.is_match(s) {
            return Err(AddressError::Alphabet);
        }
        let raw = base32_decode(s).ok_or(AddressError::Alphabet)?;
        if raw.len() != 32 + CHECKSUM_LEN {
            return Err(AddressError::Length(s.len()));
        }

        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&raw[..32]);
        if raw[32..] != Self::checksum(&public_key) {
            return Err(AddressError::Checksum);
        }
        Ok(Address(public_key))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}
