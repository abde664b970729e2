use ring::digest;
use std::fmt;

use crate::dns::common::CanonicalWire;
use crate::dns::name::Name;
use crate::dns::rdata::{Dnskey, Ds};
use crate::dns::resource::{DNSResource, DNSResourceData};
use crate::error::{DnsSecError, Result};

/// DS digest type algorithms (RFC 4034, 4509, 5933, 6605)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DigestType {
    /// SHA-1 (RFC 3658)
    Sha1 = 1,
    /// SHA-256 (RFC 4509)
    Sha256 = 2,
    /// GOST R 34.11-94 (RFC 5933)
    Gost94 = 3,
    /// SHA-384 (RFC 6605)
    Sha384 = 4,
}

impl DigestType {
    /// Create from digest type number
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Sha1),
            2 => Some(Self::Sha256),
            3 => Some(Self::Gost94),
            4 => Some(Self::Sha384),
            _ => None,
        }
    }

    /// Convert to digest type number
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Check if digest type is supported
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Sha1 | Self::Sha256 | Self::Sha384)
    }

    /// Get the expected digest length in bytes
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Gost94 => 32,
            Self::Sha384 => 48,
        }
    }

    /// Calculate digest of data using this algorithm
    pub fn digest(&self, data: &[u8]) -> Option<Vec<u8>> {
        let alg = match self {
            Self::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => &digest::SHA256,
            Self::Sha384 => &digest::SHA384,
            Self::Gost94 => return None,
        };
        Some(digest::digest(alg, data).as_ref().to_vec())
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "SHA1"),
            Self::Sha256 => write!(f, "SHA256"),
            Self::Gost94 => write!(f, "GOST94"),
            Self::Sha384 => write!(f, "SHA384"),
        }
    }
}

/// Digest input: canonical owner name followed by the DNSKEY rdata
fn dnskey_digest(owner: &Name, dnskey: &Dnskey, digest_type: DigestType) -> Result<Vec<u8>> {
    let mut data = owner.to_canonical_wire();
    data.extend_from_slice(&dnskey.to_wire()?);
    digest_type
        .digest(&data)
        .ok_or(DnsSecError::UnsupportedDigestType(digest_type.to_u8()))
}

/// Build the DS record data for a DNSKEY
pub fn ds_from_dnskey(owner: &Name, dnskey: &Dnskey, digest_type: DigestType) -> Result<Ds> {
    Ok(Ds {
        key_tag: dnskey.key_tag(),
        algorithm: dnskey.algorithm,
        digest_type: digest_type.to_u8(),
        digest: dnskey_digest(owner, dnskey, digest_type)?,
    })
}

/// True when `ds` was derived from `dnskey` at `owner`.
///
/// Key tag and algorithm must agree before the digest is computed. An
/// unsupported digest type never matches.
pub fn ds_matches_dnskey(ds: &Ds, owner: &Name, dnskey: &Dnskey) -> bool {
    if ds.key_tag != dnskey.key_tag() || ds.algorithm != dnskey.algorithm {
        return false;
    }
    let Some(digest_type) = DigestType::from_u8(ds.digest_type) else {
        return false;
    };
    match dnskey_digest(owner, dnskey, digest_type) {
        Ok(digest) => digest == ds.digest,
        Err(_) => false,
    }
}

/// True when both records are the same key or DS, or when one is a DS
/// record derived from the other (a DNSKEY at the same owner)
pub fn ds_equivalent(a: &DNSResource, b: &DNSResource) -> bool {
    if a.name != b.name {
        return false;
    }
    match (&a.rdata, &b.rdata) {
        (DNSResourceData::DNSKEY(key), DNSResourceData::DS(ds))
        | (DNSResourceData::DS(ds), DNSResourceData::DNSKEY(key)) => ds_matches_dnskey(ds, &a.name, key),
        _ => a.is_duplicate_of(b),
    }
}
