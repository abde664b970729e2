use super::rrset::RRset;
use crate::dns::enums::DNSResourceType;
use crate::dns::name::Name;
use crate::dns::resource::DNSResource;

/// One owner name of a zone: its RRsets ordered by type, its NSEC or
/// NSEC3 record with that record's signatures, and signing flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneName {
    name: Name,
    rrsets: Vec<RRset>,
    denial: Option<DNSResource>,
    denial_signatures: Vec<DNSResource>,
    is_glue: bool,
    hashed_name: Option<Name>,
}

impl ZoneName {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            rrsets: Vec::new(),
            denial: None,
            denial_signatures: Vec::new(),
            is_glue: false,
            hashed_name: None,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn rrsets(&self) -> &[RRset] {
        &self.rrsets
    }

    pub(crate) fn rrsets_mut(&mut self) -> &mut [RRset] {
        &mut self.rrsets
    }

    pub fn find_rrset(&self, rtype: DNSResourceType) -> Option<&RRset> {
        self.rrsets
            .binary_search_by(|set| set.rtype().cmp(&rtype))
            .ok()
            .map(|i| &self.rrsets[i])
    }

    fn rrset_entry(&mut self, rtype: DNSResourceType) -> &mut RRset {
        let index = match self.rrsets.binary_search_by(|set| set.rtype().cmp(&rtype)) {
            Ok(i) => i,
            Err(i) => {
                self.rrsets.insert(i, RRset::new(rtype));
                i
            }
        };
        &mut self.rrsets[index]
    }

    /// Types that have records at this name, in numeric order
    pub fn types(&self) -> impl Iterator<Item = DNSResourceType> + '_ {
        self.rrsets
            .iter()
            .filter(|set| !set.is_empty())
            .map(|set| set.rtype())
    }

    pub fn has_type(&self, rtype: DNSResourceType) -> bool {
        self.find_rrset(rtype).is_some_and(|set| !set.is_empty())
    }

    /// No records of its own: the name exists only because of descendants
    pub fn is_empty_non_terminal(&self) -> bool {
        self.rrsets.iter().all(|set| set.is_empty())
    }

    /// All data is address records
    pub fn is_address_only(&self) -> bool {
        !self.is_empty_non_terminal() && self.types().all(|t| t.is_address())
    }

    pub fn is_glue(&self) -> bool {
        self.is_glue
    }

    pub(crate) fn set_glue(&mut self, glue: bool) {
        self.is_glue = glue;
    }

    pub fn denial(&self) -> Option<&DNSResource> {
        self.denial.as_ref()
    }

    pub fn denial_signatures(&self) -> &[DNSResource] {
        &self.denial_signatures
    }

    pub(crate) fn denial_signatures_mut(&mut self) -> &mut Vec<DNSResource> {
        &mut self.denial_signatures
    }

    /// Replace the denial record; its old signatures go with it
    pub(crate) fn set_denial(&mut self, rr: Option<DNSResource>) {
        if self.denial != rr {
            self.denial_signatures.clear();
        }
        self.denial = rr;
    }

    /// Hashed owner of this name's NSEC3 record
    pub fn hashed_name(&self) -> Option<&Name> {
        self.hashed_name.as_ref()
    }

    pub(crate) fn set_hashed_name(&mut self, hashed: Option<Name>) {
        self.hashed_name = hashed;
    }

    /// File a record: NSEC and NSEC3 take the denial slot, signatures over
    /// them go to the denial signature list, other signatures join the
    /// RRset of the type they cover. Returns false for a duplicate.
    pub fn add_rr(&mut self, rr: DNSResource) -> bool {
        match rr.rtype() {
            DNSResourceType::NSEC | DNSResourceType::NSEC3 => {
                match &self.denial {
                    Some(current) if current.is_duplicate_of(&rr) => return false,
                    Some(_) => self.set_denial(Some(rr)),
                    // signatures loaded ahead of their record stay
                    None => self.denial = Some(rr),
                }
                true
            }
            DNSResourceType::RRSIG => {
                let covered = rr.covered_type();
                if covered.is_denial() {
                    if self.denial_signatures.iter().any(|sig| sig.is_duplicate_of(&rr)) {
                        return false;
                    }
                    self.denial_signatures.push(rr);
                    true
                } else {
                    self.rrset_entry(covered).add_signature(rr)
                }
            }
            rtype => self.rrset_entry(rtype).add_record(rr),
        }
    }

    /// Every record held here: RRsets with their signatures, then the
    /// denial record and its signatures
    pub fn records(&self) -> impl Iterator<Item = &DNSResource> {
        self.rrsets
            .iter()
            .flat_map(|set| set.records().iter().chain(set.signatures().iter()))
            .chain(self.denial.iter())
            .chain(self.denial_signatures.iter())
    }
}
