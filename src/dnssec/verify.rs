use tracing::{debug, trace};

use super::DnsSecAlgorithm;
use super::canonical::signed_data;
use crate::dns::name::Name;
use crate::dns::rdata::{Dnskey, Rrsig, serial_diff};
use crate::dns::resource::DNSResource;
use crate::error::{DnsSecError, Result};

/// Rank failures so the caller hears about the most telling one
fn specificity(err: &DnsSecError) -> u8 {
    match err {
        DnsSecError::Bogus => 5,
        DnsSecError::SignatureExpired
        | DnsSecError::SignatureNotYetValid
        | DnsSecError::ExpirationBeforeInception => 4,
        DnsSecError::InvalidPublicKey => 3,
        DnsSecError::UnknownAlgorithm(_) => 2,
        DnsSecError::NoMatchingKeytag => 1,
        _ => 0,
    }
}

pub(crate) fn keep_most_specific(current: &mut Option<DnsSecError>, err: DnsSecError) {
    let replace = match current {
        Some(existing) => specificity(&err) > specificity(existing),
        None => true,
    };
    if replace {
        *current = Some(err);
    }
}

/// Timestamp sanity of a signature at `now`. Timestamps compare in serial
/// number arithmetic, so a window may span the 32-bit wrap.
pub fn check_validity_period(rrsig: &Rrsig, now: u32) -> Result<()> {
    if serial_diff(rrsig.expiration, rrsig.inception) < 0 {
        return Err(DnsSecError::ExpirationBeforeInception);
    }
    if serial_diff(rrsig.inception, now) > 0 {
        return Err(DnsSecError::SignatureNotYetValid);
    }
    if serial_diff(rrsig.expiration, now) < 0 {
        return Err(DnsSecError::SignatureExpired);
    }
    Ok(())
}

/// Whether `key` (owned by `key_owner`) is the key `rrsig` names
fn key_matches(rrsig: &Rrsig, key_owner: &Name, key: &Dnskey) -> bool {
    key.key_tag() == rrsig.key_tag
        && key.algorithm == rrsig.algorithm
        && key.protocol == 3
        && key.is_zone_key()
        && *key_owner == rrsig.signer_name
}

/// Verify one signature over `rrset` with one DNSKEY record.
///
/// The validity window is checked before anything else. The key must carry
/// the tag, algorithm and owner the signature names, else
/// `NoMatchingKeytag`.
pub fn verify_rrsig(
    rrset: &[DNSResource],
    rrsig: &DNSResource,
    key: &DNSResource,
    now: u32,
) -> Result<()> {
    let sig = rrsig
        .as_rrsig()
        .ok_or_else(|| DnsSecError::NotFound("RRSIG rdata".to_string()))?;
    let dnskey = key.as_dnskey().ok_or(DnsSecError::NoDnskey)?;

    check_validity_period(sig, now)?;

    let first = rrset.first().ok_or(DnsSecError::EmptyInput)?;
    if first.rtype() != sig.type_covered {
        trace!(
            "RRSIG covers {} but RRset is {}",
            sig.type_covered,
            first.rtype()
        );
        return Err(DnsSecError::Bogus);
    }

    if !key_matches(sig, &key.name, dnskey) {
        return Err(DnsSecError::NoMatchingKeytag);
    }

    let algorithm = DnsSecAlgorithm::from_u8(sig.algorithm)
        .ok_or(DnsSecError::UnknownAlgorithm(sig.algorithm))?;

    let data = signed_data(rrset, sig)?;
    algorithm.verify(&dnskey.public_key, &data, &sig.signature)?;

    trace!(
        "RRSIG {} {} verified with key tag {}",
        first.name,
        sig.type_covered,
        sig.key_tag
    );
    Ok(())
}

/// Verify one signature against every candidate key, collecting the keys
/// that validated it into `good_keys`.
pub fn verify_rrsig_keylist(
    rrset: &[DNSResource],
    rrsig: &DNSResource,
    keys: &[DNSResource],
    now: u32,
    good_keys: &mut Vec<DNSResource>,
) -> Result<()> {
    if keys.is_empty() {
        return Err(DnsSecError::NoDnskey);
    }

    let mut failure = None;
    let mut validated = false;
    for key in keys {
        match verify_rrsig(rrset, rrsig, key, now) {
            Ok(()) => {
                validated = true;
                if !good_keys.contains(key) {
                    good_keys.push(key.clone());
                }
            }
            Err(e) => keep_most_specific(&mut failure, e),
        }
    }

    if validated {
        Ok(())
    } else {
        Err(failure.unwrap_or(DnsSecError::NoMatchingKeytag))
    }
}

/// Verify an RRset against a set of signatures and candidate keys.
///
/// Succeeds when at least one signature validates with at least one key;
/// otherwise reports the most specific failure seen.
pub fn verify(
    rrset: &[DNSResource],
    rrsigs: &[DNSResource],
    keys: &[DNSResource],
    now: u32,
    good_keys: Option<&mut Vec<DNSResource>>,
) -> Result<()> {
    if rrset.is_empty() {
        return Err(DnsSecError::EmptyInput);
    }
    if rrsigs.is_empty() {
        return Err(DnsSecError::NoRrsig);
    }
    if keys.is_empty() {
        return Err(DnsSecError::NoDnskey);
    }

    let mut collected = Vec::new();
    let mut failure = None;
    let mut validated = false;
    for rrsig in rrsigs {
        match verify_rrsig_keylist(rrset, rrsig, keys, now, &mut collected) {
            Ok(()) => validated = true,
            Err(e) => keep_most_specific(&mut failure, e),
        }
    }

    if let Some(out) = good_keys {
        for key in collected {
            if !out.contains(&key) {
                out.push(key);
            }
        }
    }

    if validated {
        Ok(())
    } else {
        let err = failure.unwrap_or(DnsSecError::NoMatchingKeytag);
        debug!("No valid signature for {}: {}", rrset[0].name, err);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::enums::DNSResourceType;

    fn sig(inception: u32, expiration: u32) -> Rrsig {
        Rrsig {
            type_covered: DNSResourceType::A,
            algorithm: 15,
            labels: 1,
            original_ttl: 60,
            expiration,
            inception,
            key_tag: 1,
            signer_name: Name::root(),
            signature: Vec::new(),
        }
    }

    #[test]
    fn test_validity_period_boundaries() {
        let now = 1_000_000;
        assert_eq!(check_validity_period(&sig(now, now + 1), now), Ok(()));
        assert_eq!(
            check_validity_period(&sig(now - 10, now - 1), now),
            Err(DnsSecError::SignatureExpired)
        );
        assert_eq!(
            check_validity_period(&sig(now + 1, now + 10), now),
            Err(DnsSecError::SignatureNotYetValid)
        );
        assert_eq!(
            check_validity_period(&sig(now, now - 1), now),
            Err(DnsSecError::ExpirationBeforeInception)
        );
    }

    #[test]
    fn test_validity_period_across_wrap() {
        // inception just before the 32-bit wrap, expiration just after
        let window = sig(u32::MAX - 100, 100);
        assert_eq!(check_validity_period(&window, u32::MAX - 50), Ok(()));
        assert_eq!(check_validity_period(&window, 50), Ok(()));
        assert_eq!(
            check_validity_period(&window, 101),
            Err(DnsSecError::SignatureExpired)
        );
        assert_eq!(
            check_validity_period(&window, u32::MAX - 101),
            Err(DnsSecError::SignatureNotYetValid)
        );
    }

    #[test]
    fn test_specificity_prefers_bogus() {
        let mut failure = None;
        keep_most_specific(&mut failure, DnsSecError::NoMatchingKeytag);
        keep_most_specific(&mut failure, DnsSecError::Bogus);
        keep_most_specific(&mut failure, DnsSecError::UnknownAlgorithm(3));
        assert_eq!(failure, Some(DnsSecError::Bogus));
    }

    #[test]
    fn test_verify_requires_signatures_and_keys() {
        let rr = DNSResource::new(
            Name::root(),
            60,
            crate::dns::resource::DNSResourceData::A([127, 0, 0, 1].into()),
        );
        assert_eq!(
            verify(&[rr.clone()], &[], &[], 0, None),
            Err(DnsSecError::NoRrsig)
        );
        assert_eq!(verify(&[], &[], &[], 0, None), Err(DnsSecError::EmptyInput));
    }
}
