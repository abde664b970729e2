use ring::signature;
use std::fmt;

use crate::error::{DnsSecError, Result};

/// Smallest RSA modulus accepted for verification, in bytes
const MIN_RSA_MODULUS_LEN: usize = 1024 / 8;

/// DNSSEC Algorithm numbers (RFC 4034, 5155, 5702, 5933, 6605, 8080, 8624)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DnsSecAlgorithm {
    /// RSA/MD5 (deprecated)
    RsaMd5 = 1,
    /// DSA/SHA1 (RFC 2536)
    DSA = 3,
    /// RSA/SHA-1 (RFC 3110)
    RsaSha1 = 5,
    /// DSA-NSEC3-SHA1 (RFC 5155)
    DsaNsec3Sha1 = 6,
    /// RSASHA1-NSEC3-SHA1 (RFC 5155)
    RsaSha1Nsec3Sha1 = 7,
    /// RSA/SHA-256 (RFC 5702)
    RsaSha256 = 8,
    /// RSA/SHA-512 (RFC 5702)
    RsaSha512 = 10,
    /// GOST R 34.10-2001 (RFC 5933)
    EccGost = 12,
    /// ECDSA Curve P-256 with SHA-256 (RFC 6605)
    EcdsaP256Sha256 = 13,
    /// ECDSA Curve P-384 with SHA-384 (RFC 6605)
    EcdsaP384Sha384 = 14,
    /// Ed25519 (RFC 8080)
    Ed25519 = 15,
    /// Ed448 (RFC 8080)
    Ed448 = 16,
}

impl DnsSecAlgorithm {
    /// Create from algorithm number
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::RsaMd5),
            3 => Some(Self::DSA),
            5 => Some(Self::RsaSha1),
            6 => Some(Self::DsaNsec3Sha1),
            7 => Some(Self::RsaSha1Nsec3Sha1),
            8 => Some(Self::RsaSha256),
            10 => Some(Self::RsaSha512),
            12 => Some(Self::EccGost),
            13 => Some(Self::EcdsaP256Sha256),
            14 => Some(Self::EcdsaP384Sha384),
            15 => Some(Self::Ed25519),
            16 => Some(Self::Ed448),
            _ => None,
        }
    }

    /// Convert to algorithm number
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Check if algorithm is supported for validation
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            Self::RsaSha1
                | Self::RsaSha1Nsec3Sha1
                | Self::RsaSha256
                | Self::RsaSha512
                | Self::EcdsaP256Sha256
                | Self::EcdsaP384Sha384
                | Self::Ed25519
        )
    }

    /// Check if signatures can be created with this algorithm. RSASHA1
    /// signing needs the `dnssec-openssl` feature.
    pub fn is_supported_for_signing(&self) -> bool {
        match self {
            Self::RsaSha1 | Self::RsaSha1Nsec3Sha1 => cfg!(feature = "dnssec-openssl"),
            _ => matches!(
                self,
                Self::RsaSha256
                    | Self::RsaSha512
                    | Self::EcdsaP256Sha256
                    | Self::EcdsaP384Sha384
                    | Self::Ed25519
            ),
        }
    }

    /// Check if algorithm is recommended (RFC 8624)
    pub fn is_recommended(&self) -> bool {
        matches!(
            self,
            Self::RsaSha256 | Self::EcdsaP256Sha256 | Self::Ed25519
        )
    }

    pub fn is_rsa(&self) -> bool {
        matches!(
            self,
            Self::RsaMd5 | Self::RsaSha1 | Self::RsaSha1Nsec3Sha1 | Self::RsaSha256 | Self::RsaSha512
        )
    }

    /// Verify `signature` over `message` with a DNSKEY public key field.
    ///
    /// A malformed key yields `InvalidPublicKey`, a failed check `Bogus` and
    /// an algorithm without a primitive `UnknownAlgorithm`.
    pub fn verify(&self, public_key: &[u8], message: &[u8], sig: &[u8]) -> Result<()> {
        match self {
            Self::RsaSha1 | Self::RsaSha1Nsec3Sha1 | Self::RsaSha256 | Self::RsaSha512 => {
                let params = match self {
                    Self::RsaSha256 => &signature::RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
                    Self::RsaSha512 => &signature::RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY,
                    _ => &signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY,
                };
                let (e, n) = rsa_exponent_modulus(public_key)?;
                let components = signature::RsaPublicKeyComponents { n, e };
                components
                    .verify(params, message, sig)
                    .map_err(|_| DnsSecError::Bogus)
            }
            Self::EcdsaP256Sha256 | Self::EcdsaP384Sha384 => {
                let (alg, len) = match self {
                    Self::EcdsaP256Sha256 => (&signature::ECDSA_P256_SHA256_FIXED, 64),
                    _ => (&signature::ECDSA_P384_SHA384_FIXED, 96),
                };
                if public_key.len() != len {
                    return Err(DnsSecError::InvalidPublicKey);
                }
                // ring expects an uncompressed SEC1 point
                let mut point = Vec::with_capacity(len + 1);
                point.push(0x04);
                point.extend_from_slice(public_key);
                signature::UnparsedPublicKey::new(alg, point)
                    .verify(message, sig)
                    .map_err(|_| DnsSecError::Bogus)
            }
            Self::Ed25519 => {
                if public_key.len() != 32 {
                    return Err(DnsSecError::InvalidPublicKey);
                }
                signature::UnparsedPublicKey::new(&signature::ED25519, public_key)
                    .verify(message, sig)
                    .map_err(|_| DnsSecError::Bogus)
            }
            _ => Err(DnsSecError::UnknownAlgorithm(self.to_u8())),
        }
    }
}

/// Split an RFC 3110 RSA public key into (exponent, modulus)
pub fn rsa_exponent_modulus(public_key: &[u8]) -> Result<(&[u8], &[u8])> {
    if public_key.len() <= 3 {
        return Err(DnsSecError::InvalidPublicKey);
    }

    let (pos, exp_len) = match public_key[0] {
        0 => (
            3,
            (usize::from(public_key[1]) << 8) | usize::from(public_key[2]),
        ),
        len => (1, usize::from(len)),
    };

    let rest = &public_key[pos..];
    if exp_len == 0 || rest.len() <= exp_len {
        return Err(DnsSecError::InvalidPublicKey);
    }

    let (e, n) = rest.split_at(exp_len);
    if n.len() < MIN_RSA_MODULUS_LEN {
        return Err(DnsSecError::InvalidPublicKey);
    }
    Ok((e, n))
}

/// Encode an RSA exponent and modulus as an RFC 3110 public key
pub fn rsa_encode(e: &[u8], n: &[u8]) -> Vec<u8> {
    let e = strip_leading_zeros(e);
    let n = strip_leading_zeros(n);
    let mut key = Vec::with_capacity(3 + e.len() + n.len());
    if e.len() <= 255 {
        key.push(e.len() as u8);
    } else {
        key.push(0);
        key.extend_from_slice(&(e.len() as u16).to_be_bytes());
    }
    key.extend_from_slice(e);
    key.extend_from_slice(n);
    key
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

impl fmt::Display for DnsSecAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RsaMd5 => write!(f, "RSAMD5"),
            Self::DSA => write!(f, "DSA"),
            Self::RsaSha1 => write!(f, "RSASHA1"),
            Self::DsaNsec3Sha1 => write!(f, "DSA-NSEC3-SHA1"),
            Self::RsaSha1Nsec3Sha1 => write!(f, "RSASHA1-NSEC3-SHA1"),
            Self::RsaSha256 => write!(f, "RSASHA256"),
            Self::RsaSha512 => write!(f, "RSASHA512"),
            Self::EccGost => write!(f, "ECC-GOST"),
            Self::EcdsaP256Sha256 => write!(f, "ECDSAP256SHA256"),
            Self::EcdsaP384Sha384 => write!(f, "ECDSAP384SHA384"),
            Self::Ed25519 => write!(f, "ED25519"),
            Self::Ed448 => write!(f, "ED448"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8() {
        assert_eq!(DnsSecAlgorithm::from_u8(8), Some(DnsSecAlgorithm::RsaSha256));
        assert_eq!(DnsSecAlgorithm::from_u8(13).unwrap().to_string(), "ECDSAP256SHA256");
        assert_eq!(DnsSecAlgorithm::from_u8(2), None);
    }

    #[test]
    fn test_support_matrix() {
        assert!(DnsSecAlgorithm::RsaSha1.is_supported());
        assert_eq!(
            DnsSecAlgorithm::RsaSha1.is_supported_for_signing(),
            cfg!(feature = "dnssec-openssl")
        );
        assert!(!DnsSecAlgorithm::DSA.is_supported());
        assert!(!DnsSecAlgorithm::DSA.is_supported_for_signing());
        assert!(DnsSecAlgorithm::Ed25519.is_supported_for_signing());
    }

    #[test]
    fn test_rsa_key_encoding() {
        let e = [0x01, 0x00, 0x01];
        let n = vec![0xc5; 128];
        let key = rsa_encode(&e, &n);
        assert_eq!(key[0], 3);
        let (pe, pn) = rsa_exponent_modulus(&key).unwrap();
        assert_eq!(pe, &e);
        assert_eq!(pn, n.as_slice());
    }

    #[test]
    fn test_rsa_short_modulus_rejected() {
        let key = rsa_encode(&[3], &[0xab; 64]);
        assert_eq!(rsa_exponent_modulus(&key), Err(DnsSecError::InvalidPublicKey));
    }

    #[test]
    fn test_unsupported_verify() {
        assert_eq!(
            DnsSecAlgorithm::DSA.verify(&[0; 20], b"data", &[0; 41]),
            Err(DnsSecError::UnknownAlgorithm(3))
        );
    }

    #[test]
    fn test_bad_ecdsa_key_length() {
        assert_eq!(
            DnsSecAlgorithm::EcdsaP256Sha256.verify(&[0; 10], b"data", &[0; 64]),
            Err(DnsSecError::InvalidPublicKey)
        );
    }
}
