//! NSEC and NSEC3 chains over the names of a zone.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::dns::bitmap::TypeBitmap;
use crate::dns::enums::DNSResourceType;
use crate::dns::name::Name;
use crate::dns::rdata::{NSEC3_FLAG_OPT_OUT, Nsec, Nsec3, Nsec3Param};
use crate::dns::resource::{DNSResource, DNSResourceData};
use crate::dnssec::denial::{hash_label, nsec3_hash};
use crate::error::{DnsSecError, Result};
use crate::zone::{DnssecZone, ZoneName};

/// Which denial of existence records to generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialChain {
    Nsec,
    Nsec3 { params: Nsec3Param, opt_out: bool },
}

/// Replace the zone's denial records with a freshly built chain. Glue is
/// left out. Returns the records of the new chain.
pub fn build_denial_chain(zone: &mut DnssecZone, chain: &DenialChain) -> Result<Vec<DNSResource>> {
    match chain {
        DenialChain::Nsec => build_nsec_chain(zone),
        DenialChain::Nsec3 { params, opt_out } => build_nsec3_chain(zone, params, *opt_out),
    }
}

fn denial_ttl(zone: &DnssecZone) -> Result<u32> {
    zone.soa()
        .and_then(|rr| rr.as_soa())
        .map(|soa| soa.minimum)
        .ok_or_else(|| DnsSecError::NotFound(format!("SOA for {}", zone.apex())))
}

/// Install `chain` (original name -> denial record) on every name,
/// clearing the slot where the chain has nothing
fn install(zone: &mut DnssecZone, mut chain: HashMap<Name, DNSResource>) {
    let mut hashed = Vec::new();
    for node in zone.names_mut() {
        let denial = chain.remove(node.name());
        node.set_hashed_name(None);
        if let Some(rr) = denial.as_ref().filter(|rr| rr.rtype() == DNSResourceType::NSEC3) {
            hashed.push((node.name().clone(), rr.name.clone()));
        }
        node.set_denial(denial);
    }

    zone.reset_hashed_names();
    for (name, owner) in hashed {
        zone.set_hashed_name(&name, owner);
    }
}

fn build_nsec_chain(zone: &mut DnssecZone) -> Result<Vec<DNSResource>> {
    let ttl = denial_ttl(zone)?;
    let members: Vec<&ZoneName> = zone
        .names()
        .filter(|node| !node.is_glue() && !node.is_empty_non_terminal())
        .collect();

    let mut chain = HashMap::with_capacity(members.len());
    let mut created = Vec::with_capacity(members.len());
    for (i, node) in members.iter().enumerate() {
        let next = members[(i + 1) % members.len()];
        let mut types = TypeBitmap::from_types(node.types());
        types.insert(DNSResourceType::RRSIG);
        types.insert(DNSResourceType::NSEC);

        let nsec = DNSResource::new(
            node.name().clone(),
            ttl,
            DNSResourceData::NSEC(Nsec {
                next_name: next.name().clone(),
                types,
            }),
        );
        trace!("{}", nsec);
        chain.insert(node.name().clone(), nsec.clone());
        created.push(nsec);
    }

    debug!("Built NSEC chain of {} records for {}", created.len(), zone.apex());
    install(zone, chain);
    Ok(created)
}

fn build_nsec3_chain(
    zone: &mut DnssecZone,
    params: &Nsec3Param,
    opt_out: bool,
) -> Result<Vec<DNSResource>> {
    let ttl = denial_ttl(zone)?;
    let apex = zone.apex().clone();
    let flags = if opt_out { NSEC3_FLAG_OPT_OUT } else { 0 };

    let mut hashed: Vec<(Vec<u8>, Name, TypeBitmap)> = Vec::new();
    for node in zone.names().filter(|node| !node.is_glue()) {
        let hash = nsec3_hash(node.name(), params)?;
        let mut types = TypeBitmap::from_types(node.types());
        // Nothing is signed at an insecure delegation
        let insecure_cut = zone.is_delegation(node.name()) && !node.has_type(DNSResourceType::DS);
        if !node.is_empty_non_terminal() && !insecure_cut {
            types.insert(DNSResourceType::RRSIG);
        }
        hashed.push((hash, node.name().clone(), types));
    }
    hashed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut chain = HashMap::with_capacity(hashed.len());
    let mut created = Vec::with_capacity(hashed.len());
    for (i, (hash, name, types)) in hashed.iter().enumerate() {
        let next = &hashed[(i + 1) % hashed.len()].0;
        let owner = apex.prepend_label(hash_label(hash).as_bytes())?;
        let nsec3 = DNSResource::new(
            owner,
            ttl,
            DNSResourceData::NSEC3(Nsec3 {
                hash_algorithm: params.hash_algorithm,
                flags,
                iterations: params.iterations,
                salt: params.salt.clone(),
                next_hashed_owner: next.clone(),
                types: types.clone(),
            }),
        );
        trace!("{} for {}", nsec3, name);
        chain.insert(name.clone(), nsec3.clone());
        created.push(nsec3);
    }

    debug!("Built NSEC3 chain of {} records for {}", created.len(), apex);
    install(zone, chain);
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::rdata::Soa;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn zone(owners: &[&str]) -> DnssecZone {
        let mut records = vec![DNSResource::new(
            name("example"),
            3600,
            DNSResourceData::SOA(Soa {
                mname: name("ns.example"),
                rname: name("hostmaster.example"),
                serial: 1,
                refresh: 7200,
                retry: 3600,
                expire: 1209600,
                minimum: 600,
            }),
        )];
        for owner in owners {
            records.push(DNSResource::new(
                name(owner),
                3600,
                DNSResourceData::A([192, 0, 2, 1].into()),
            ));
        }
        DnssecZone::from_records(name("example"), records).unwrap()
    }

    #[test]
    fn test_nsec_chain_links_names_in_order() {
        let mut zone = zone(&["a.example", "b.example", "d.example"]);
        let chain = build_denial_chain(&mut zone, &DenialChain::Nsec).unwrap();
        assert_eq!(chain.len(), 4);

        let b = zone.find_name(&name("b.example")).unwrap().denial().unwrap();
        let nsec = b.as_nsec().unwrap();
        assert_eq!(nsec.next_name, name("d.example"));
        assert!(nsec.types.contains(DNSResourceType::A));
        assert!(nsec.types.contains(DNSResourceType::NSEC));
        assert!(nsec.types.contains(DNSResourceType::RRSIG));
        assert_eq!(b.ttl, 600);

        let last = zone.find_name(&name("d.example")).unwrap().denial().unwrap();
        assert_eq!(last.as_nsec().unwrap().next_name, name("example"));
    }

    #[test]
    fn test_nsec3_chain_is_sorted_by_hash() {
        let mut zone = zone(&["a.example", "b.example"]);
        let params = Nsec3Param::new(0, vec![]);
        let chain = build_denial_chain(
            &mut zone,
            &DenialChain::Nsec3 { params, opt_out: false },
        )
        .unwrap();
        assert_eq!(chain.len(), 3);

        for (i, rr) in chain.iter().enumerate() {
            let next = &chain[(i + 1) % chain.len()];
            let expected = crate::dnssec::denial::decode_hash_label(next.name.first_label().unwrap()).unwrap();
            assert_eq!(rr.as_nsec3().unwrap().next_hashed_owner, expected);
            assert!(zone.original_of(&rr.name).is_some());
        }
    }

    #[test]
    fn test_missing_soa() {
        let mut zone = DnssecZone::new(name("example"));
        assert!(matches!(
            build_denial_chain(&mut zone, &DenialChain::Nsec),
            Err(DnsSecError::NotFound(_))
        ));
    }
}
