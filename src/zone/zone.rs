use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

use super::name::ZoneName;
use super::rrset::RRset;
use crate::dns::enums::DNSResourceType;
use crate::dns::name::Name;
use crate::dns::rdata::Nsec3Param;
use crate::dns::resource::{DNSResource, DNSResourceData};
use crate::dnssec::denial::nsec3_hashed_owner;
use crate::error::{DnsSecError, Result};

/// A zone prepared for signing: every owner name in canonical order, each
/// with its RRsets, denial record and signatures
#[derive(Debug, Clone)]
pub struct DnssecZone {
    /// Zone apex, moved by an SOA record
    apex: Name,
    /// All names in the zone, including synthesized empty non-terminals
    names: BTreeMap<Name, ZoneName>,
    /// NSEC3 owner -> original name
    hashed: HashMap<Name, Name>,
}

impl DnssecZone {
    /// Create a new empty zone
    pub fn new(apex: Name) -> Self {
        Self {
            apex,
            names: BTreeMap::new(),
            hashed: HashMap::new(),
        }
    }

    /// Build a zone from records. NSEC3 records and their signatures are
    /// added last so their original names can be found; empty
    /// non-terminals are synthesized first since the NSEC3 chain covers
    /// them too.
    pub fn from_records<I>(apex: Name, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = DNSResource>,
    {
        let mut zone = Self::new(apex);
        let (hashed, plain): (Vec<DNSResource>, Vec<DNSResource>) = records
            .into_iter()
            .partition(|rr| rr.covered_type() == DNSResourceType::NSEC3);

        for rr in plain {
            zone.add_record(rr)?;
        }
        if !hashed.is_empty() {
            zone.add_empty_non_terminals();
        }
        for rr in hashed {
            zone.add_record(rr)?;
        }
        Ok(zone)
    }

    pub fn apex(&self) -> &Name {
        &self.apex
    }

    /// Add a record to the zone. Returns false when it was already present.
    pub fn add_record(&mut self, rr: DNSResource) -> Result<bool> {
        if rr.covered_type() == DNSResourceType::NSEC3 {
            let original = self.find_nsec3_original(&rr)?;
            let node = self
                .names
                .get_mut(&original)
                .ok_or_else(|| DnsSecError::NotFound(format!("original of {}", rr.name)))?;
            node.set_hashed_name(Some(rr.name.clone()));
            return Ok(node.add_rr(rr));
        }

        if !rr.name.is_subdomain_of(&self.apex) && rr.rtype() != DNSResourceType::SOA {
            debug!("Refusing out-of-zone record {} for zone {}", rr.name, self.apex);
            return Err(DnsSecError::InvalidName(format!(
                "{} is not in zone {}",
                rr.name, self.apex
            )));
        }

        if rr.rtype() == DNSResourceType::SOA && rr.name != self.apex {
            debug!("SOA moves zone apex from {} to {}", self.apex, rr.name);
            self.apex = rr.name.clone();
        }

        let added = self
            .names
            .entry(rr.name.clone())
            .or_insert_with(|| ZoneName::new(rr.name.clone()))
            .add_rr(rr);
        Ok(added)
    }

    /// Find the name an NSEC3 owner was hashed from: first through the
    /// cache, then by hashing every name with the zone's parameters
    fn find_nsec3_original(&mut self, rr: &DNSResource) -> Result<Name> {
        if let Some(original) = self.hashed.get(&rr.name) {
            return Ok(original.clone());
        }

        let params = match &rr.rdata {
            DNSResourceData::NSEC3(nsec3) => Some(nsec3.params()),
            _ => self.nsec3_params(),
        }
        .ok_or_else(|| DnsSecError::NotFound(format!("NSEC3 parameters for {}", rr.name)))?;

        // Hash the whole zone once so later NSEC3 records hit the cache
        let zone = rr.name.strip_left(1);
        for name in self.names.keys() {
            let hashed = nsec3_hashed_owner(name, &params, &zone)?;
            self.hashed.entry(hashed).or_insert_with(|| name.clone());
        }

        match self.hashed.get(&rr.name) {
            Some(original) => {
                trace!("NSEC3 owner {} is the hash of {}", rr.name, original);
                Ok(original.clone())
            }
            None => {
                debug!("No original name for NSEC3 owner {}", rr.name);
                Err(DnsSecError::NotFound(format!(
                    "original of NSEC3 owner {}",
                    rr.name
                )))
            }
        }
    }

    /// Parameters from the apex NSEC3PARAM record, else from any NSEC3
    /// already in the zone
    pub fn nsec3_params(&self) -> Option<Nsec3Param> {
        let from_param = self
            .find_rrset(&self.apex, DNSResourceType::NSEC3PARAM)
            .and_then(|set| {
                set.records().iter().find_map(|rr| match &rr.rdata {
                    DNSResourceData::NSEC3PARAM(param) => Some(param.clone()),
                    _ => None,
                })
            });

        from_param.or_else(|| {
            self.names
                .values()
                .filter_map(|node| node.denial())
                .find_map(|rr| rr.as_nsec3().map(|nsec3| nsec3.params()))
        })
    }

    /// Original name of an NSEC3 owner, if known
    pub fn original_of(&self, hashed: &Name) -> Option<&Name> {
        self.hashed.get(hashed)
    }

    pub(crate) fn set_hashed_name(&mut self, name: &Name, hashed: Name) {
        if let Some(node) = self.names.get_mut(name) {
            node.set_hashed_name(Some(hashed.clone()));
            self.hashed.insert(hashed, name.clone());
        }
    }

    pub fn find_name(&self, name: &Name) -> Option<&ZoneName> {
        self.names.get(name)
    }

    pub fn find_rrset(&self, name: &Name, rtype: DNSResourceType) -> Option<&RRset> {
        self.names
            .get(name)
            .and_then(|node| node.find_rrset(rtype))
            .filter(|set| !set.is_empty())
    }

    /// All names in canonical order
    pub fn names(&self) -> impl Iterator<Item = &ZoneName> {
        self.names.values()
    }

    pub(crate) fn names_mut(&mut self) -> impl Iterator<Item = &mut ZoneName> {
        self.names.values_mut()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn soa(&self) -> Option<&DNSResource> {
        self.find_rrset(&self.apex, DNSResourceType::SOA)
            .and_then(|set| set.records().first())
    }

    /// Every record of the zone in canonical name order
    pub fn records(&self) -> impl Iterator<Item = &DNSResource> {
        self.names.values().flat_map(|node| node.records())
    }

    /// NS present at a name other than the apex
    pub fn is_delegation(&self, name: &Name) -> bool {
        *name != self.apex
            && self
                .names
                .get(name)
                .is_some_and(|node| node.has_type(DNSResourceType::NS))
    }

    /// True when a strict ancestor of `name` below the apex is a delegation
    pub fn is_below_delegation(&self, name: &Name) -> bool {
        let mut current = name.parent();
        while let Some(ancestor) = current {
            if ancestor == self.apex || !ancestor.is_subdomain_of(&self.apex) {
                return false;
            }
            if self.is_delegation(&ancestor) {
                return true;
            }
            current = ancestor.parent();
        }
        false
    }

    /// Mark address-only names under a zone cut as glue. Returns the
    /// number of glue names.
    pub fn mark_glue(&mut self) -> usize {
        let cuts: HashSet<Name> = self
            .names
            .keys()
            .filter(|name| self.is_delegation(name))
            .cloned()
            .collect();

        let mut glue = 0;
        for node in self.names.values_mut() {
            node.set_glue(false);
            if !node.is_address_only() {
                continue;
            }

            let mut current = node.name().parent();
            while let Some(ancestor) = current {
                if ancestor == self.apex || !ancestor.is_subdomain_of(&self.apex) {
                    break;
                }
                if cuts.contains(&ancestor) {
                    trace!("{} is glue below {}", node.name(), ancestor);
                    node.set_glue(true);
                    glue += 1;
                    break;
                }
                current = ancestor.parent();
            }
        }

        debug!("Marked {} glue names in {}", glue, self.apex);
        glue
    }

    /// Synthesize a name node for every label depth between two adjacent
    /// names that carries no record of its own. Returns the number of
    /// names added.
    pub fn add_empty_non_terminals(&mut self) -> usize {
        let names: Vec<Name> = self.names.keys().cloned().collect();
        if names.is_empty() {
            return 0;
        }

        let apex_labels = self.apex.num_labels();
        let mut missing = BTreeSet::new();
        for (i, next) in names.iter().enumerate() {
            let prev = &names[(i + names.len() - 1) % names.len()];
            let shared = prev.common_suffix_len(next).max(apex_labels);

            for depth in (shared + 1)..next.num_labels() {
                let candidate = next.suffix(depth);
                if !self.names.contains_key(&candidate) && !self.is_below_delegation(&candidate) {
                    missing.insert(candidate);
                }
            }
        }

        let added = missing.len();
        for name in missing {
            trace!("Adding empty non-terminal {}", name);
            self.names.insert(name.clone(), ZoneName::new(name));
        }

        if added > 0 {
            debug!("Added {} empty non-terminals to {}", added, self.apex);
        }
        added
    }

    /// Forget every NSEC3 owner -> original mapping
    pub(crate) fn reset_hashed_names(&mut self) {
        self.hashed.clear();
    }

    /// Get zone statistics
    pub fn stats(&self) -> ZoneStats {
        let mut stats = ZoneStats::default();

        for node in self.names.values() {
            stats.names += 1;
            if node.is_glue() {
                stats.glue_names += 1;
            }
            if node.is_empty_non_terminal() {
                stats.empty_non_terminals += 1;
            }
            for set in node.rrsets().iter().filter(|set| !set.is_empty()) {
                stats.rrsets += 1;
                stats.records += set.records().len();
                stats.signatures += set.signatures().len();
            }
            if node.denial().is_some() {
                stats.denial_records += 1;
            }
            stats.signatures += node.denial_signatures().len();
        }

        stats
    }
}

/// Zone statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ZoneStats {
    pub names: usize,
    pub rrsets: usize,
    pub records: usize,
    pub signatures: usize,
    pub denial_records: usize,
    pub glue_names: usize,
    pub empty_non_terminals: usize,
}
