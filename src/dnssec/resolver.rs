//! The query collaborator the validator fetches DNSKEY and DS sets through.
//!
//! Transport, timeouts and retries live behind the trait; the engine only
//! sees finished answers. [`StaticResolver`] answers from zones held in
//! memory and is what the tests and the benchmarks drive the validator with.

use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::denial::{nsec3_covers_name, nsec3_hashed_owner, nsec_covers_name};
use crate::dns::DNSPacket;
use crate::dns::enums::{DNSResourceClass, DNSResourceType, ResponseCode};
use crate::dns::name::Name;
use crate::dns::resource::DNSResource;
use crate::error::{DnsSecError, Result};

/// Blocking lookup of one name and type
pub trait Resolver {
    fn query(
        &self,
        name: &Name,
        rtype: DNSResourceType,
        class: DNSResourceClass,
    ) -> Result<DNSPacket>;
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn query(
        &self,
        name: &Name,
        rtype: DNSResourceType,
        class: DNSResourceClass,
    ) -> Result<DNSPacket> {
        (**self).query(name, rtype, class)
    }
}

impl<R: Resolver + ?Sized> Resolver for Box<R> {
    fn query(
        &self,
        name: &Name,
        rtype: DNSResourceType,
        class: DNSResourceClass,
    ) -> Result<DNSPacket> {
        (**self).query(name, rtype, class)
    }
}

/// Authoritative answers from a set of in-memory zones.
///
/// The deepest loaded zone containing the query name answers it, except
/// that DS at a zone apex comes from the parent zone. Negative answers
/// carry the SOA and the NSEC or NSEC3 records that prove them, each with
/// its signatures.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    zones: BTreeMap<Name, Vec<DNSResource>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or extend) the zone at `apex`. Records outside the zone are
    /// dropped.
    pub fn add_zone(&mut self, apex: Name, records: impl IntoIterator<Item = DNSResource>) {
        let entry = self.zones.entry(apex.clone()).or_default();
        for rr in records {
            if rr.name.is_subdomain_of(&apex) {
                entry.push(rr);
            } else {
                trace!("Dropping out-of-zone record {} for {}", rr.name, apex);
            }
        }
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    fn zone_for(&self, name: &Name, rtype: DNSResourceType) -> Option<(&Name, &[DNSResource])> {
        let mut best: Option<(&Name, &Vec<DNSResource>)> = None;
        for (apex, records) in &self.zones {
            if !name.is_subdomain_of(apex) {
                continue;
            }
            if rtype == DNSResourceType::DS && apex == name && !name.is_root() {
                continue;
            }
            if best.is_none_or(|(current, _)| apex.num_labels() > current.num_labels()) {
                best = Some((apex, records));
            }
        }
        best.map(|(apex, records)| (apex, records.as_slice()))
    }
}

fn rrset_with_sigs(records: &[DNSResource], name: &Name, rtype: DNSResourceType) -> Vec<DNSResource> {
    let mut out: Vec<DNSResource> = records
        .iter()
        .filter(|rr| rr.name == *name && rr.rtype() == rtype)
        .cloned()
        .collect();
    if !out.is_empty() {
        out.extend(signatures_for(records, name, rtype));
    }
    out
}

fn signatures_for(records: &[DNSResource], name: &Name, rtype: DNSResourceType) -> Vec<DNSResource> {
    records
        .iter()
        .filter(|rr| rr.name == *name && rr.as_rrsig().is_some_and(|s| s.type_covered == rtype))
        .cloned()
        .collect()
}

fn push_unique(out: &mut Vec<DNSResource>, rrs: Vec<DNSResource>) {
    for rr in rrs {
        if !out.contains(&rr) {
            out.push(rr);
        }
    }
}

/// Nearest delegation point strictly below the apex at or above `name`
fn delegation_point(records: &[DNSResource], apex: &Name, name: &Name) -> Option<Name> {
    let mut candidate = Some(name.clone());
    let mut found = None;
    while let Some(current) = candidate {
        if current == *apex {
            break;
        }
        if records
            .iter()
            .any(|rr| rr.name == current && rr.rtype() == DNSResourceType::NS)
        {
            found = Some(current.clone());
        }
        candidate = current.parent();
    }
    found
}

fn name_exists(records: &[DNSResource], name: &Name) -> bool {
    records.iter().any(|rr| {
        !matches!(rr.rtype(), DNSResourceType::NSEC3 | DNSResourceType::RRSIG)
            && rr.name.is_subdomain_of(name)
    })
}

/// Longest existing ancestor of `name` within the zone
fn closest_encloser(records: &[DNSResource], apex: &Name, name: &Name) -> Name {
    let mut current = name.clone();
    while current != *apex {
        if name_exists(records, &current) {
            return current;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    apex.clone()
}

/// NSEC or NSEC3 records, with signatures, that deny `name`
fn denial_records(records: &[DNSResource], apex: &Name, name: &Name) -> Result<Vec<DNSResource>> {
    let encloser = closest_encloser(records, apex, name);
    let mut targets = vec![name.clone(), encloser.wildcard_of()?];
    if let Some(parent) = name.parent() {
        if parent.is_subdomain_of(apex) {
            targets.push(parent.wildcard_of()?);
        }
    }

    let mut out = Vec::new();
    let nsecs: Vec<&DNSResource> = records
        .iter()
        .filter(|rr| rr.rtype() == DNSResourceType::NSEC)
        .collect();
    for target in &targets {
        for nsec in &nsecs {
            if nsec.name == *target || nsec_covers_name(nsec, target) {
                push_unique(&mut out, rrset_with_sigs(records, &nsec.name, DNSResourceType::NSEC));
            }
        }
    }

    let Some(params) = records.iter().find_map(|rr| rr.as_nsec3().map(|n| n.params())) else {
        return Ok(out);
    };
    // the closest encloser proof needs every ancestor up to the apex
    let mut ancestor = name.parent();
    while let Some(current) = ancestor {
        if !current.is_subdomain_of(apex) {
            break;
        }
        targets.push(current.clone());
        ancestor = current.parent();
    }
    for target in &targets {
        let hashed = nsec3_hashed_owner(target, &params, apex)?;
        for nsec3 in records.iter().filter(|rr| rr.rtype() == DNSResourceType::NSEC3) {
            if nsec3.name == hashed || nsec3_covers_name(nsec3, &hashed) {
                push_unique(&mut out, rrset_with_sigs(records, &nsec3.name, DNSResourceType::NSEC3));
            }
        }
    }
    Ok(out)
}

impl Resolver for StaticResolver {
    fn query(
        &self,
        name: &Name,
        rtype: DNSResourceType,
        _class: DNSResourceClass,
    ) -> Result<DNSPacket> {
        let (apex, records) = self
            .zone_for(name, rtype)
            .ok_or_else(|| DnsSecError::Resolver(format!("no zone loaded for {}", name)))?;
        trace!("Answering {} {} from zone {}", name, rtype, apex);

        let mut packet = DNSPacket::new(ResponseCode::NoError);

        if let Some(cut) = delegation_point(records, apex, name) {
            if !(rtype == DNSResourceType::DS && cut == *name) {
                debug!("Referral for {} at {}", name, cut);
                packet.authorities = rrset_with_sigs(records, &cut, DNSResourceType::NS);
                let ds = rrset_with_sigs(records, &cut, DNSResourceType::DS);
                if ds.is_empty() {
                    push_unique(&mut packet.authorities, denial_records(records, apex, &cut)?);
                } else {
                    push_unique(&mut packet.authorities, ds);
                }
                return Ok(packet);
            }
        }

        let answers = rrset_with_sigs(records, name, rtype);
        if !answers.is_empty() {
            packet.answers = answers;
            return Ok(packet);
        }

        let cname = rrset_with_sigs(records, name, DNSResourceType::CNAME);
        if !cname.is_empty() {
            packet.answers = cname;
            return Ok(packet);
        }

        if !name_exists(records, name) {
            packet.rcode = ResponseCode::NxDomain;
        }
        packet.authorities = rrset_with_sigs(records, apex, DNSResourceType::SOA);
        push_unique(&mut packet.authorities, denial_records(records, apex, name)?);
        Ok(packet)
    }
}
