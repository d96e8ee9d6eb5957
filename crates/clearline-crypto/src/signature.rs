use std::fmt;
use std::str::FromStr;

use alloy_primitives::{B256, U256};
use clearline_types::{Address, CryptoError, ValidationError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 65-byte secp256k1 signature in r || s || v form, with v in {27, 28}.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 65]);

impl Signature {
    pub const LEN: usize = 65;

    pub const fn new(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.len() != Self::LEN {
            return Err(ValidationError::InvalidLength {
                kind: "Signature",
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn from_hex(value: &str) -> Result<Self, ValidationError> {
        let stripped = value.strip_prefix("0x").unwrap_or(value);
        let bytes =
            hex::decode(stripped).map_err(|err| ValidationError::InvalidHex(err.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn from_alloy(signature: &alloy_primitives::Signature) -> Self {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&signature.r().to_be_bytes::<32>());
        out[32..64].copy_from_slice(&signature.s().to_be_bytes::<32>());
        out[64] = 27 + u8::from(signature.v());
        Self(out)
    }

    pub fn to_alloy(&self) -> Result<alloy_primitives::Signature, CryptoError> {
        let r = U256::from_be_slice(&self.0[..32]);
        let s = U256::from_be_slice(&self.0[32..64]);
        let parity = match self.0[64] {
            0 | 27 => false,
            1 | 28 => true,
            other => return Err(CryptoError::InvalidRecoveryId(other)),
        };
        Ok(alloy_primitives::Signature::new(r, s, parity))
    }

    /// Recover the address that produced this signature over `digest`.
    pub fn recover(&self, digest: [u8; 32]) -> Result<Address, CryptoError> {
        let recovered = self
            .to_alloy()?
            .recover_address_from_prehash(&B256::from(digest))
            .map_err(|err| CryptoError::RecoveryFailed(err.to_string()))?;
        Ok(Address::new(recovered.0 .0))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_hex(value)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}
