//! NSEC and NSEC3 denial of existence.

use ring::digest;
use tracing::{debug, trace};

use super::constants::MAX_NSEC3_ITERATIONS;
use crate::dns::enums::{DNSResourceType, ResponseCode};
use crate::dns::name::Name;
use crate::dns::rdata::Nsec3Param;
use crate::dns::resource::DNSResource;
use crate::error::{DnsSecError, Result};

/// NSEC3 hash algorithm 1 (SHA-1), the only one defined
pub const NSEC3_HASH_SHA1: u8 = 1;

/// Iterated, salted SHA-1 of the canonical wire form of `name` (RFC 5155 section 5)
pub fn nsec3_hash(name: &Name, params: &Nsec3Param) -> Result<Vec<u8>> {
    if params.hash_algorithm != NSEC3_HASH_SHA1 {
        return Err(DnsSecError::InvalidNsec3Parameters(format!(
            "unknown hash algorithm {}",
            params.hash_algorithm
        )));
    }
    if params.iterations > MAX_NSEC3_ITERATIONS {
        return Err(DnsSecError::InvalidNsec3Parameters(format!(
            "{} iterations exceed the maximum of {}",
            params.iterations, MAX_NSEC3_ITERATIONS
        )));
    }

    let mut input = name.to_canonical_wire();
    input.extend_from_slice(&params.salt);
    let mut hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &input);

    for _ in 0..params.iterations {
        let mut next = hash.as_ref().to_vec();
        next.extend_from_slice(&params.salt);
        hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &next);
    }

    Ok(hash.as_ref().to_vec())
}

/// Lowercase base32hex label for a raw NSEC3 hash
pub fn hash_label(hash: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648Hex { padding: false }, hash).to_lowercase()
}

/// Decode the first label of an NSEC3 owner back into the raw hash
pub fn decode_hash_label(label: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(label).ok()?.to_ascii_uppercase();
    base32::decode(base32::Alphabet::Rfc4648Hex { padding: false }, &text)
}

/// `<base32hex(hash(name))>.<zone>`
pub fn nsec3_hashed_owner(name: &Name, params: &Nsec3Param, zone: &Name) -> Result<Name> {
    let hash = nsec3_hash(name, params)?;
    zone.prepend_label(hash_label(&hash).as_bytes())
}

/// True when the NSEC record's range covers `name`: owner <= name < next,
/// wrapping at the end of the zone. An NSEC pointing at itself covers
/// every name.
pub fn nsec_covers_name(nsec: &DNSResource, name: &Name) -> bool {
    let Some(data) = nsec.as_nsec() else {
        return false;
    };
    let owner = &nsec.name;
    let next = &data.next_name;

    if owner == next {
        return true;
    }
    if owner < next {
        owner <= name && name < next
    } else {
        owner <= name || name < next
    }
}

/// True when the NSEC3 record's hash range strictly covers `hashed_name`
/// (a full `<hash>.<zone>` name)
pub fn nsec3_covers_name(nsec3: &DNSResource, hashed_name: &Name) -> bool {
    let Some(data) = nsec3.as_nsec3() else {
        return false;
    };
    let Some(zone) = nsec3.name.parent() else {
        return false;
    };
    if !hashed_name.is_subdomain_of(&zone) || hashed_name.num_labels() != zone.num_labels() + 1 {
        return false;
    }
    let Ok(next) = zone.prepend_label(hash_label(&data.next_hashed_owner).as_bytes()) else {
        return false;
    };
    let owner = &nsec3.name;

    if *owner == next {
        return *hashed_name != *owner;
    }
    if *owner < next {
        owner < hashed_name && *hashed_name < next
    } else {
        owner < hashed_name || *hashed_name < next
    }
}

fn nsec3_params_of(nsecs: &[DNSResource]) -> Result<(Nsec3Param, Name)> {
    let first = nsecs
        .iter()
        .find(|rr| rr.as_nsec3().is_some())
        .ok_or(DnsSecError::EmptyInput)?;
    let params = first.as_nsec3().map(|n| n.params()).ok_or(DnsSecError::EmptyInput)?;
    let zone = first
        .name
        .parent()
        .ok_or_else(|| DnsSecError::InvalidName(first.name.to_string()))?;
    Ok((params, zone))
}

fn matching_nsec3<'a>(nsecs: &'a [DNSResource], hashed: &Name) -> Option<&'a DNSResource> {
    nsecs
        .iter()
        .find(|rr| rr.as_nsec3().is_some() && rr.name == *hashed)
}

fn covering_nsec3<'a>(nsecs: &'a [DNSResource], hashed: &Name) -> Option<&'a DNSResource> {
    nsecs.iter().find(|rr| nsec3_covers_name(rr, hashed))
}

/// Closest provable encloser of `qname` (RFC 5155 section 8.3): the longest
/// ancestor whose hash matches an NSEC3 owner while the hash of the next
/// closer name is covered by an NSEC3 range.
pub fn nsec3_closest_encloser(qname: &Name, nsecs: &[DNSResource]) -> Result<Option<Name>> {
    let (params, zone) = nsec3_params_of(nsecs)?;
    if !qname.is_subdomain_of(&zone) {
        return Ok(None);
    }

    let mut next_closer_covered = false;
    let mut sname = qname.clone();
    loop {
        let hashed = nsec3_hashed_owner(&sname, &params, &zone)?;
        if matching_nsec3(nsecs, &hashed).is_some() {
            if next_closer_covered {
                trace!("Closest encloser of {} is {}", qname, sname);
                return Ok(Some(sname));
            }
            // qname itself exists; there is no closest encloser proof
            return Ok(None);
        }
        next_closer_covered = covering_nsec3(nsecs, &hashed).is_some();

        if sname == zone {
            return Ok(None);
        }
        match sname.parent() {
            Some(parent) => sname = parent,
            None => return Ok(None),
        }
    }
}

/// NSEC denial of existence for `name`/`rtype`.
///
/// The name (or the matching NSEC owner without `rtype`) must be covered,
/// and so must the wildcard at the parent of `name`. An NSEC at the name
/// itself whose signature label count equals the name's label count shows
/// no wildcard could have produced the answer.
pub fn verify_denial(
    name: &Name,
    rtype: DNSResourceType,
    nsecs: &[DNSResource],
    rrsigs: &[DNSResource],
) -> Result<()> {
    let wildcard_name = name.strip_left(1).wildcard_of()?;

    let mut name_covered = false;
    let mut type_covered = false;
    let mut wildcard_covered = false;
    let mut wildcard_type_covered = false;

    for nsec in nsecs {
        let Some(data) = nsec.as_nsec() else {
            continue;
        };

        if nsec.name == *name {
            if data.types.contains(rtype) {
                type_covered = true;
            }
            let label_match = rrsigs.iter().any(|sig| {
                sig.name == nsec.name
                    && sig
                        .as_rrsig()
                        .is_some_and(|s| s.type_covered == DNSResourceType::NSEC && s.labels == name.label_count())
            });
            if label_match {
                wildcard_covered = true;
            }
        }

        if nsec_covers_name(nsec, name) {
            name_covered = true;
        }

        if nsec.name == wildcard_name && data.types.contains(rtype) {
            wildcard_type_covered = true;
        }

        if nsec_covers_name(nsec, &wildcard_name) {
            wildcard_covered = true;
        }
    }

    if type_covered || !name_covered {
        debug!("NSEC does not deny {} {}", name, rtype);
        return Err(DnsSecError::NotCovered);
    }
    if wildcard_type_covered || !wildcard_covered {
        debug!("NSEC does not deny wildcard {} {}", wildcard_name, rtype);
        return Err(DnsSecError::WildcardNotCovered);
    }
    Ok(())
}

/// True when the denial records show `name` to be a delegation: the record
/// matching it has NS but no SOA in its bitmap (RFC 4035 section 5.2).
/// Only such a DS denial proves the data below it unsigned.
pub fn denial_marks_zone_cut(name: &Name, nsecs: &[DNSResource]) -> bool {
    let types = if let Some(nsec) = nsecs.iter().find(|rr| rr.name == *name).and_then(|rr| rr.as_nsec()) {
        &nsec.types
    } else {
        let Ok((params, zone)) = nsec3_params_of(nsecs) else {
            return false;
        };
        let Ok(hashed) = nsec3_hashed_owner(name, &params, &zone) else {
            return false;
        };
        match matching_nsec3(nsecs, &hashed).and_then(|rr| rr.as_nsec3()) {
            Some(nsec3) => &nsec3.types,
            None => return false,
        }
    };
    types.contains(DNSResourceType::NS) && !types.contains(DNSResourceType::SOA)
}

/// NSEC3 denial of existence (RFC 4035 sections 8.4 to 8.6 as applied to
/// NSEC3 by RFC 5155).
pub fn verify_denial_nsec3(
    name: &Name,
    nsecs: &[DNSResource],
    packet_rcode: ResponseCode,
    packet_qtype: DNSResourceType,
    packet_nodata: bool,
) -> Result<()> {
    let (params, zone) = nsec3_params_of(nsecs)?;

    if packet_rcode == ResponseCode::NxDomain {
        let Some(closest_encloser) = nsec3_closest_encloser(name, nsecs)? else {
            debug!("No closest encloser proof for {}", name);
            return Err(DnsSecError::NotCovered);
        };
        let wildcard = closest_encloser.wildcard_of()?;
        let hashed_wildcard = nsec3_hashed_owner(&wildcard, &params, &zone)?;
        if covering_nsec3(nsecs, &hashed_wildcard).is_some() {
            return Ok(());
        }
        debug!("Wildcard {} not covered by NSEC3", wildcard);
        return Err(DnsSecError::WildcardNotCovered);
    }

    if packet_nodata {
        let hashed = nsec3_hashed_owner(name, &params, &zone)?;
        if let Some(nsec3) = matching_nsec3(nsecs, &hashed).and_then(|rr| rr.as_nsec3()) {
            if !nsec3.types.contains(packet_qtype) && !nsec3.types.contains(DNSResourceType::CNAME) {
                return Ok(());
            }
        }

        if packet_qtype == DNSResourceType::DS {
            let encloser = nsec3_closest_encloser(name, nsecs)?;
            debug!(
                "No NSEC3 match for DS at {}, closest encloser {:?}",
                name, encloser
            );
        }
        return Err(DnsSecError::NotCovered);
    }

    Err(DnsSecError::NotCovered)
}
