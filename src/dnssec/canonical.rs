//! The byte string an RRSIG signs (RFC 4034 section 3.1.8.1).

use bitstream_io::BitWriter;
use std::cmp::Ordering;

use crate::dns::common::WireWriter;
use crate::dns::name::Name;
use crate::dns::rdata::Rrsig;
use crate::dns::resource::DNSResource;
use crate::error::{DnsSecError, Result};

/// Owner name as it appears in signed data: lowercased, and replaced by
/// `*.<closest labels>` when the owner has more labels than the signature
/// records (the RRset was synthesised from a wildcard).
pub fn signed_owner(owner: &Name, labels: u8) -> Result<Name> {
    let owner = owner.to_lowercase();
    if owner.label_count() > labels {
        owner.suffix(labels as usize).wildcard_of()
    } else {
        Ok(owner)
    }
}

/// Records of an RRset in canonical order with duplicates removed
pub fn canonical_rrset(rrset: &[DNSResource]) -> Vec<DNSResource> {
    let mut sorted: Vec<DNSResource> = rrset.to_vec();
    sorted.sort_by(|a, b| a.canonical_cmp(b));
    sorted.dedup_by(|a, b| a.canonical_cmp(b) == Ordering::Equal);
    sorted
}

/// RRSIG rdata without the signature, followed by every record of the
/// RRset in canonical form using the original TTL from the signature.
pub fn signed_data(rrset: &[DNSResource], rrsig: &Rrsig) -> Result<Vec<u8>> {
    if rrset.is_empty() {
        return Err(DnsSecError::EmptyInput);
    }

    let mut buf = Vec::new();
    {
        let mut writer: WireWriter<'_> = BitWriter::new(&mut buf);
        rrsig.write_prefix(&mut writer)?;
        for rr in canonical_rrset(rrset) {
            let owner = signed_owner(&rr.name, rrsig.labels)?;
            rr.write_canonical_with_ttl(&mut writer, &owner, rrsig.original_ttl)?;
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::enums::DNSResourceType;
    use crate::dns::resource::DNSResourceData;

    fn rrsig(labels: u8) -> Rrsig {
        Rrsig {
            type_covered: DNSResourceType::A,
            algorithm: 15,
            labels,
            original_ttl: 3600,
            expiration: 20,
            inception: 10,
            key_tag: 1,
            signer_name: "example".parse().unwrap(),
            signature: Vec::new(),
        }
    }

    fn a(owner: &str, ttl: u32, last: u8) -> DNSResource {
        DNSResource::new(
            owner.parse().unwrap(),
            ttl,
            DNSResourceData::A([192, 0, 2, last].into()),
        )
    }

    #[test]
    fn test_wildcard_owner_reconstruction() {
        let owner: Name = "a.b.example".parse().unwrap();
        assert_eq!(signed_owner(&owner, 1).unwrap().to_string(), "*.example.");
        assert_eq!(signed_owner(&owner, 3).unwrap(), owner);
    }

    #[test]
    fn test_signed_data_is_order_and_ttl_independent() {
        let first = vec![a("WWW.example", 60, 2), a("www.example", 300, 1)];
        let second = vec![a("www.example", 3600, 1), a("www.example", 10, 2)];
        let sig = rrsig(2);
        assert_eq!(
            signed_data(&first, &sig).unwrap(),
            signed_data(&second, &sig).unwrap()
        );
    }

    #[test]
    fn test_signed_data_layout() {
        let sig = rrsig(2);
        let data = signed_data(&[a("www.example", 60, 1)], &sig).unwrap();
        // prefix (18 + signer) then owner, type, class, ttl, rdlength, rdata
        let prefix_len = 18 + 9;
        let record = &data[prefix_len..];
        assert_eq!(&record[..13], b"\x03www\x07example\x00");
        assert_eq!(&record[13..17], &[0, 1, 0, 1]);
        assert_eq!(&record[17..21], &3600u32.to_be_bytes());
        assert_eq!(&record[21..], &[0, 4, 192, 0, 2, 1]);
    }

    #[test]
    fn test_duplicates_removed() {
        let rrset = vec![a("www.example", 60, 1), a("www.example", 60, 1)];
        assert_eq!(canonical_rrset(&rrset).len(), 1);
    }

    #[test]
    fn test_empty_rrset() {
        assert_eq!(signed_data(&[], &rrsig(1)), Err(DnsSecError::EmptyInput));
    }
}
