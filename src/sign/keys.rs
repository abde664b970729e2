//! Private key material for zone signing.

use ring::rand::SystemRandom;
use ring::signature::{self, EcdsaKeyPair, Ed25519KeyPair, KeyPair as _, RsaKeyPair};
use std::fmt;
use tracing::debug;

#[cfg(feature = "dnssec-openssl")]
use openssl::{
    hash::MessageDigest,
    pkey::{PKey, Private},
    rsa::Rsa,
    sign::Signer,
};

use crate::dns::enums::DNSResourceType;
use crate::dns::name::Name;
use crate::dns::rdata::{DNSKEY_FLAG_SEP, DNSKEY_FLAG_ZONE, Dnskey};
use crate::dns::resource::{DNSResource, DNSResourceData};
use crate::dnssec::DnsSecAlgorithm;
use crate::dnssec::algorithm::rsa_encode;
use crate::error::{DnsSecError, Result};

/// Flags of a zone signing key
pub const ZSK_FLAGS: u16 = DNSKEY_FLAG_ZONE;
/// Flags of a key signing key
pub const KSK_FLAGS: u16 = DNSKEY_FLAG_ZONE | DNSKEY_FLAG_SEP;

/// ring does not implement Clone for key pairs, so neither does this
enum KeyPair {
    Rsa(RsaKeyPair),
    Ecdsa(EcdsaKeyPair),
    Ed25519(Ed25519KeyPair),
    /// ring refuses to sign with SHA-1, so RSASHA1 keys go through OpenSSL
    #[cfg(feature = "dnssec-openssl")]
    OpenSslRsa(PKey<Private>),
}

/// A private key able to sign RRsets for the zone at `owner`.
///
/// The private material lives only inside the ring key pair and is
/// released when the key is dropped.
pub struct SigningKey {
    owner: Name,
    flags: u16,
    algorithm: DnsSecAlgorithm,
    inception: Option<u32>,
    expiration: Option<u32>,
    key_pair: KeyPair,
    dnskey: Dnskey,
    key_tag: u16,
    rng: SystemRandom,
}

impl SigningKey {
    /// Load a key from a PKCS#8 document
    pub fn from_pkcs8(
        owner: Name,
        flags: u16,
        algorithm: DnsSecAlgorithm,
        der: &[u8],
    ) -> Result<Self> {
        let rng = SystemRandom::new();
        let rejected = |e: ring::error::KeyRejected| {
            DnsSecError::SigningError(format!("private key rejected: {}", e))
        };

        let (key_pair, public_key) = match algorithm {
            DnsSecAlgorithm::RsaSha256 | DnsSecAlgorithm::RsaSha512 => {
                let key = RsaKeyPair::from_pkcs8(der).map_err(rejected)?;
                let components: ring::rsa::PublicKeyComponents<Vec<u8>> = key.public().into();
                let public_key = rsa_encode(&components.e, &components.n);
                (KeyPair::Rsa(key), public_key)
            }
            DnsSecAlgorithm::EcdsaP256Sha256 | DnsSecAlgorithm::EcdsaP384Sha384 => {
                let key = EcdsaKeyPair::from_pkcs8(ecdsa_signing(algorithm)?, der, &rng)
                    .map_err(rejected)?;
                // Drop the uncompressed point marker
                let public_key = key.public_key().as_ref()[1..].to_vec();
                (KeyPair::Ecdsa(key), public_key)
            }
            DnsSecAlgorithm::Ed25519 => {
                let key = Ed25519KeyPair::from_pkcs8_maybe_unchecked(der).map_err(rejected)?;
                let public_key = key.public_key().as_ref().to_vec();
                (KeyPair::Ed25519(key), public_key)
            }
            #[cfg(feature = "dnssec-openssl")]
            DnsSecAlgorithm::RsaSha1 | DnsSecAlgorithm::RsaSha1Nsec3Sha1 => {
                let key = PKey::private_key_from_pkcs8(der).map_err(openssl_failed)?;
                let rsa = key.rsa().map_err(openssl_failed)?;
                let public_key = rsa_encode(&rsa.e().to_vec(), &rsa.n().to_vec());
                (KeyPair::OpenSslRsa(key), public_key)
            }
            other => return Err(DnsSecError::UnsupportedAlgorithm(other.to_u8())),
        };

        let dnskey = Dnskey::new(flags, algorithm.to_u8(), public_key);
        let key_tag = dnskey.key_tag();
        debug!("Loaded {} key for {} with key tag {}", algorithm, owner, key_tag);

        Ok(Self {
            owner,
            flags,
            algorithm,
            inception: None,
            expiration: None,
            key_pair,
            dnskey,
            key_tag,
            rng,
        })
    }

    /// Generate a fresh key. ECDSA and Ed25519 keys can always be generated,
    /// RSASHA1 keys only with the `dnssec-openssl` feature.
    pub fn generate(owner: Name, flags: u16, algorithm: DnsSecAlgorithm) -> Result<Self> {
        let document = generate_pkcs8(algorithm)?;
        Self::from_pkcs8(owner, flags, algorithm, &document)
    }

    /// Set a fixed validity window for signatures made with this key
    pub fn with_validity(mut self, inception: u32, expiration: u32) -> Self {
        self.inception = Some(inception);
        self.expiration = Some(expiration);
        self
    }

    pub fn owner(&self) -> &Name {
        &self.owner
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn algorithm(&self) -> DnsSecAlgorithm {
        self.algorithm
    }

    pub fn inception(&self) -> Option<u32> {
        self.inception
    }

    pub fn expiration(&self) -> Option<u32> {
        self.expiration
    }

    pub fn is_zone_key(&self) -> bool {
        self.flags & DNSKEY_FLAG_ZONE != 0
    }

    pub fn is_sep(&self) -> bool {
        self.flags & DNSKEY_FLAG_SEP != 0
    }

    /// Public half as DNSKEY rdata
    pub fn dnskey(&self) -> &Dnskey {
        &self.dnskey
    }

    /// Public half as a DNSKEY record owned by the zone
    pub fn dnskey_record(&self, ttl: u32) -> DNSResource {
        DNSResource::new(
            self.owner.clone(),
            ttl,
            DNSResourceData::DNSKEY(self.dnskey.clone()),
        )
    }

    pub fn key_tag(&self) -> u16 {
        self.key_tag
    }

    /// Key selection: only zone keys sign, and a DNSKEY RRset is signed by
    /// secure entry point keys alone
    pub fn signs(&self, rtype: DNSResourceType) -> bool {
        self.is_zone_key() && (rtype != DNSResourceType::DNSKEY || self.is_sep())
    }

    /// Sign `data` with the algorithm's primitive
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        match &self.key_pair {
            KeyPair::Rsa(key) => {
                let padding: &'static dyn signature::RsaEncoding = match self.algorithm {
                    DnsSecAlgorithm::RsaSha512 => &signature::RSA_PKCS1_SHA512,
                    _ => &signature::RSA_PKCS1_SHA256,
                };
                let mut sig = vec![0u8; key.public().modulus_len()];
                key.sign(padding, &self.rng, data, &mut sig)
                    .map_err(|_| DnsSecError::SigningError(format!("{} signing failed", self.algorithm)))?;
                Ok(sig)
            }
            KeyPair::Ecdsa(key) => key
                .sign(&self.rng, data)
                .map(|sig| sig.as_ref().to_vec())
                .map_err(|_| DnsSecError::SigningError(format!("{} signing failed", self.algorithm))),
            KeyPair::Ed25519(key) => Ok(key.sign(data).as_ref().to_vec()),
            #[cfg(feature = "dnssec-openssl")]
            KeyPair::OpenSslRsa(key) => {
                let mut signer = Signer::new(MessageDigest::sha1(), key).map_err(openssl_failed)?;
                signer.update(data).map_err(openssl_failed)?;
                signer.sign_to_vec().map_err(openssl_failed)
            }
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("owner", &self.owner)
            .field("flags", &self.flags)
            .field("algorithm", &self.algorithm)
            .field("key_tag", &self.key_tag)
            .field("inception", &self.inception)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

fn ecdsa_signing(
    algorithm: DnsSecAlgorithm,
) -> Result<&'static signature::EcdsaSigningAlgorithm> {
    match algorithm {
        DnsSecAlgorithm::EcdsaP256Sha256 => Ok(&signature::ECDSA_P256_SHA256_FIXED_SIGNING),
        DnsSecAlgorithm::EcdsaP384Sha384 => Ok(&signature::ECDSA_P384_SHA384_FIXED_SIGNING),
        other => Err(DnsSecError::UnsupportedAlgorithm(other.to_u8())),
    }
}

#[cfg(feature = "dnssec-openssl")]
fn openssl_failed(e: openssl::error::ErrorStack) -> DnsSecError {
    DnsSecError::SigningError(format!("openssl: {}", e))
}

/// Generate a PKCS#8 document for a new private key
pub fn generate_pkcs8(algorithm: DnsSecAlgorithm) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let failed = |_| DnsSecError::SigningError(format!("{} key generation failed", algorithm));

    let document = match algorithm {
        DnsSecAlgorithm::EcdsaP256Sha256 | DnsSecAlgorithm::EcdsaP384Sha384 => {
            EcdsaKeyPair::generate_pkcs8(ecdsa_signing(algorithm)?, &rng).map_err(failed)?
        }
        DnsSecAlgorithm::Ed25519 => Ed25519KeyPair::generate_pkcs8(&rng).map_err(failed)?,
        #[cfg(feature = "dnssec-openssl")]
        DnsSecAlgorithm::RsaSha1 | DnsSecAlgorithm::RsaSha1Nsec3Sha1 => {
            let key = Rsa::generate(2048)
                .and_then(PKey::from_rsa)
                .and_then(|key| key.private_key_to_pkcs8())
                .map_err(openssl_failed)?;
            return Ok(key);
        }
        other => return Err(DnsSecError::UnsupportedAlgorithm(other.to_u8())),
    };
    Ok(document.as_ref().to_vec())
}
