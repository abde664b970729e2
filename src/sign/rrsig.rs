use tracing::trace;

use super::keys::SigningKey;
use crate::config::EngineConfig;
use crate::dns::rdata::Rrsig;
use crate::dns::resource::{DNSResource, DNSResourceData};
use crate::dnssec::canonical::{canonical_rrset, signed_data};
use crate::error::{DnsSecError, Result};

/// Sign an RRset with one key.
///
/// TTL and original TTL come from the first record in canonical order, the
/// label count leaves out a leading `*`. Without a validity window on the
/// key, inception is `now` minus the configured offset and expiration is
/// `now` plus the configured validity.
pub fn create_rrsig(
    rrset: &[DNSResource],
    key: &SigningKey,
    now: u32,
    config: &EngineConfig,
) -> Result<DNSResource> {
    let sorted = canonical_rrset(rrset);
    let first = sorted.first().ok_or(DnsSecError::EmptyInput)?;

    if !key.algorithm().is_supported_for_signing() {
        return Err(DnsSecError::UnsupportedAlgorithm(key.algorithm().to_u8()));
    }

    let mut rrsig = Rrsig {
        type_covered: first.rtype(),
        algorithm: key.algorithm().to_u8(),
        labels: first.name.label_count(),
        original_ttl: first.ttl,
        expiration: key
            .expiration()
            .unwrap_or_else(|| now.saturating_add(config.signature_validity_secs)),
        inception: key
            .inception()
            .unwrap_or_else(|| now.saturating_sub(config.inception_offset_secs)),
        key_tag: key.key_tag(),
        signer_name: key.owner().clone(),
        signature: Vec::new(),
    };

    let data = signed_data(&sorted, &rrsig)?;
    rrsig.signature = key.sign(&data)?;

    trace!(
        "Signed {} {} with key tag {}",
        first.name,
        first.rtype(),
        rrsig.key_tag
    );
    Ok(DNSResource::new(
        first.name.clone(),
        first.ttl,
        DNSResourceData::RRSIG(rrsig),
    ))
}

/// One signature per key over `rrset`
pub fn sign_rrset(
    rrset: &[DNSResource],
    keys: &[SigningKey],
    now: u32,
    config: &EngineConfig,
) -> Result<Vec<DNSResource>> {
    if rrset.is_empty() {
        return Err(DnsSecError::EmptyInput);
    }
    keys.iter()
        .map(|key| create_rrsig(rrset, key, now, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::name::Name;
    use crate::dnssec::{DnsSecAlgorithm, verify};
    use crate::sign::keys::{KSK_FLAGS, ZSK_FLAGS};

    const NOW: u32 = 1_700_000_000;

    fn rrset(owner: &str) -> Vec<DNSResource> {
        let owner: Name = owner.parse().unwrap();
        vec![
            DNSResource::new(owner.clone(), 300, DNSResourceData::A([192, 0, 2, 2].into())),
            DNSResource::new(owner, 300, DNSResourceData::A([192, 0, 2, 1].into())),
        ]
    }

    fn key(algorithm: DnsSecAlgorithm) -> SigningKey {
        SigningKey::generate("example".parse().unwrap(), ZSK_FLAGS, algorithm).unwrap()
    }

    #[test]
    fn test_sign_and_verify_every_algorithm() {
        let config = EngineConfig::default();
        for algorithm in [
            DnsSecAlgorithm::EcdsaP256Sha256,
            DnsSecAlgorithm::EcdsaP384Sha384,
            DnsSecAlgorithm::Ed25519,
        ] {
            let key = key(algorithm);
            let records = rrset("www.example");
            let sig = create_rrsig(&records, &key, NOW, &config).unwrap();
            let dnskey = key.dnskey_record(3600);
            assert_eq!(verify(&records, &[sig], &[dnskey], NOW, None), Ok(()));
        }
    }

    #[test]
    fn test_rrsig_fields() {
        let config = EngineConfig::default();
        let key = key(DnsSecAlgorithm::Ed25519);
        let sig = create_rrsig(&rrset("*.example"), &key, NOW, &config).unwrap();
        let rrsig = sig.as_rrsig().unwrap();
        assert_eq!(rrsig.labels, 1);
        assert_eq!(rrsig.original_ttl, 300);
        assert_eq!(rrsig.inception, NOW);
        assert_eq!(rrsig.expiration, NOW + config.signature_validity_secs);
        assert_eq!(rrsig.key_tag, key.key_tag());
        assert_eq!(rrsig.signer_name, *key.owner());
        assert_eq!(sig.ttl, 300);
    }

    #[test]
    fn test_key_validity_window() {
        let config = EngineConfig::default();
        let key = SigningKey::generate("example".parse().unwrap(), KSK_FLAGS, DnsSecAlgorithm::Ed25519)
            .unwrap()
            .with_validity(100, 200);
        let sig = create_rrsig(&rrset("example"), &key, NOW, &config).unwrap();
        let rrsig = sig.as_rrsig().unwrap();
        assert_eq!((rrsig.inception, rrsig.expiration), (100, 200));
    }

    #[test]
    fn test_one_signature_per_key() {
        let config = EngineConfig::default();
        let keys = vec![key(DnsSecAlgorithm::Ed25519), key(DnsSecAlgorithm::EcdsaP256Sha256)];
        let sigs = sign_rrset(&rrset("www.example"), &keys, NOW, &config).unwrap();
        assert_eq!(sigs.len(), 2);
        assert_eq!(sign_rrset(&[], &keys, NOW, &config), Err(DnsSecError::EmptyInput));
    }
}
