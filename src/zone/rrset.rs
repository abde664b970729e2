use std::cmp::Ordering;

use crate::dns::enums::DNSResourceType;
use crate::dns::resource::DNSResource;

/// All records of one owner and type, kept in canonical order, plus the
/// signatures covering them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RRset {
    rtype: DNSResourceType,
    records: Vec<DNSResource>,
    signatures: Vec<DNSResource>,
}

impl RRset {
    pub fn new(rtype: DNSResourceType) -> Self {
        Self {
            rtype,
            records: Vec::new(),
            signatures: Vec::new(),
        }
    }

    pub fn rtype(&self) -> DNSResourceType {
        self.rtype
    }

    pub fn records(&self) -> &[DNSResource] {
        &self.records
    }

    pub fn signatures(&self) -> &[DNSResource] {
        &self.signatures
    }

    pub(crate) fn signatures_mut(&mut self) -> &mut Vec<DNSResource> {
        &mut self.signatures
    }

    /// An RRset may exist with only signatures when an RRSIG arrived first
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// TTL of the set, taken from its first record
    pub fn ttl(&self) -> Option<u32> {
        self.records.first().map(|rr| rr.ttl)
    }

    /// Insert keeping canonical order. Returns false for a duplicate.
    pub fn add_record(&mut self, rr: DNSResource) -> bool {
        match self
            .records
            .binary_search_by(|existing| existing.canonical_cmp(&rr))
        {
            Ok(_) => false,
            Err(pos) => {
                self.records.insert(pos, rr);
                true
            }
        }
    }

    /// Returns false for a duplicate signature
    pub fn add_signature(&mut self, rr: DNSResource) -> bool {
        if self
            .signatures
            .iter()
            .any(|sig| sig.canonical_cmp(&rr) == Ordering::Equal)
        {
            return false;
        }
        self.signatures.push(rr);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::resource::DNSResourceData;

    fn a(last: u8, ttl: u32) -> DNSResource {
        DNSResource::new(
            "www.example".parse().unwrap(),
            ttl,
            DNSResourceData::A([192, 0, 2, last].into()),
        )
    }

    #[test]
    fn test_canonical_insert_order() {
        let mut rrset = RRset::new(DNSResourceType::A);
        assert!(rrset.add_record(a(3, 60)));
        assert!(rrset.add_record(a(1, 60)));
        assert!(rrset.add_record(a(2, 60)));
        let order: Vec<String> = rrset.records().iter().map(|rr| rr.rdata.to_string()).collect();
        assert_eq!(order, vec!["192.0.2.1", "192.0.2.2", "192.0.2.3"]);
        assert_eq!(rrset.ttl(), Some(60));
    }

    #[test]
    fn test_duplicates_ignored() {
        let mut rrset = RRset::new(DNSResourceType::A);
        assert!(rrset.add_record(a(1, 60)));
        // TTL is not part of record identity
        assert!(!rrset.add_record(a(1, 300)));
        assert_eq!(rrset.records().len(), 1);
    }
}
