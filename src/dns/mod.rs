pub mod bitmap;
pub mod common;
pub mod enums;
pub mod name;
pub mod rdata;
pub mod resource;

use enums::{DNSResourceType, ResponseCode};
use name::Name;
use resource::DNSResource;

/// A resolver answer as handed to the validator: response code plus the
/// three record sections. Header flags and the question are owned by the
/// transport layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub rcode: ResponseCode,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub resources: Vec<DNSResource>,
}

impl DNSPacket {
    pub fn new(rcode: ResponseCode) -> Self {
        Self {
            rcode,
            ..Default::default()
        }
    }

    fn all_records(&self) -> impl Iterator<Item = &DNSResource> {
        self.answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.resources.iter())
    }

    /// Records of `rtype` owned by `name`, from any section
    pub fn rrset(&self, name: &Name, rtype: DNSResourceType) -> Vec<DNSResource> {
        self.all_records()
            .filter(|rr| rr.rtype() == rtype && rr.name == *name)
            .cloned()
            .collect()
    }

    /// RRSIG records owned by `name` that cover `rtype`
    pub fn rrsigs_covering(&self, name: &Name, rtype: DNSResourceType) -> Vec<DNSResource> {
        self.all_records()
            .filter(|rr| {
                rr.name == *name && rr.as_rrsig().is_some_and(|sig| sig.type_covered == rtype)
            })
            .cloned()
            .collect()
    }

    /// RRSIG records in any section covering `rtype`, whatever their owner
    pub fn rrsigs_for_type(&self, rtype: DNSResourceType) -> Vec<DNSResource> {
        self.all_records()
            .filter(|rr| rr.as_rrsig().is_some_and(|sig| sig.type_covered == rtype))
            .cloned()
            .collect()
    }

    pub fn records_of_type(&self, rtype: DNSResourceType) -> Vec<DNSResource> {
        self.all_records()
            .filter(|rr| rr.rtype() == rtype)
            .cloned()
            .collect()
    }

    /// NOERROR without any answer records
    pub fn is_nodata(&self) -> bool {
        self.rcode == ResponseCode::NoError && self.answers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource::DNSResourceData;

    #[test]
    fn test_rrset_lookup_spans_sections() {
        let owner: Name = "example".parse().unwrap();
        let mut packet = DNSPacket::new(ResponseCode::NoError);
        packet.answers.push(DNSResource::new(
            owner.clone(),
            60,
            DNSResourceData::A([192, 0, 2, 1].into()),
        ));
        packet.resources.push(DNSResource::new(
            "EXAMPLE".parse().unwrap(),
            60,
            DNSResourceData::A([192, 0, 2, 2].into()),
        ));
        assert_eq!(packet.rrset(&owner, DNSResourceType::A).len(), 2);
        assert!(packet.rrset(&owner, DNSResourceType::AAAA).is_empty());
        assert!(!packet.is_nodata());
        assert!(DNSPacket::new(ResponseCode::NoError).is_nodata());
    }
}
