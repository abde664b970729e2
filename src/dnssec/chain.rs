//! Data chains: an answer, its signatures, and the links up to the keys
//! (and DS records) that vouch for them.

use std::fmt;
use tracing::{debug, trace};

use super::resolver::Resolver;
use crate::dns::DNSPacket;
use crate::dns::enums::{DNSResourceClass, DNSResourceType, ResponseCode};
use crate::dns::name::Name;
use crate::dns::resource::DNSResource;
use crate::error::{DnsSecError, Result};

/// One link of a data chain. The parent link holds the DNSKEY set that
/// signed `rrset`, or the DS set vouching for it when `rrset` is itself a
/// DNSKEY set.
#[derive(Debug, Clone, Default)]
pub struct DataChain {
    pub rrset: Vec<DNSResource>,
    pub signatures: Vec<DNSResource>,
    pub parent: Option<Box<DataChain>>,
    /// The parent link holds DS records rather than keys
    pub parent_is_ds: bool,
    pub packet_rcode: ResponseCode,
    /// Name the link's packet answered, when it came from a known query
    pub packet_qname: Option<Name>,
    pub packet_qtype: DNSResourceType,
    pub packet_nodata: bool,
}

fn fetch<R: Resolver + ?Sized>(
    resolver: &R,
    name: &Name,
    rtype: DNSResourceType,
    class: DNSResourceClass,
) -> DNSPacket {
    match resolver.query(name, rtype, class) {
        Ok(packet) => packet,
        Err(e) => {
            debug!("Query {} {} failed: {}", name, rtype, e);
            DNSPacket::new(ResponseCode::ServFail)
        }
    }
}

fn has_rrsigs(packet: &DNSPacket) -> bool {
    !packet.records_of_type(DNSResourceType::RRSIG).is_empty()
}

impl DataChain {
    /// Build the chain for `rrset` as found in `packet`.
    ///
    /// With `question`, the first link stands for the question itself and
    /// records the packet's response code, so an empty `rrset` becomes a
    /// chain over the packet's NSEC or NSEC3 records. Keys and DS records
    /// missing from the packet are fetched through `resolver`. A packet
    /// carrying no signatures at all yields an empty chain.
    pub fn build<R: Resolver + ?Sized>(
        resolver: &R,
        rrset: &[DNSResource],
        packet: Option<&DNSPacket>,
        question: Option<&DNSResource>,
        max_depth: usize,
    ) -> Result<DataChain> {
        Self::build_at(resolver, rrset, packet, question, 0, max_depth)
    }

    fn build_at<R: Resolver + ?Sized>(
        resolver: &R,
        rrset: &[DNSResource],
        packet: Option<&DNSPacket>,
        question: Option<&DNSResource>,
        depth: usize,
        max_depth: usize,
    ) -> Result<DataChain> {
        if depth > max_depth {
            return Err(DnsSecError::RecursionLimit(max_depth));
        }

        let mut chain = DataChain::default();
        if packet.is_some_and(|p| !has_rrsigs(p)) {
            trace!("Packet carries no signatures, chain ends");
            return Ok(chain);
        }
        if let Some(p) = packet {
            chain.packet_rcode = p.rcode;
        }

        if let Some(question) = question {
            chain.rrset = vec![question.clone()];
            chain.parent = Some(Box::new(Self::build_at(
                resolver, rrset, packet, None, depth + 1, max_depth,
            )?));
            chain.packet_rcode = packet.map(|p| p.rcode).unwrap_or_default();
            chain.packet_qname = Some(question.name.clone());
            chain.packet_qtype = question.rtype();
            chain.packet_nodata = packet.is_some_and(|p| p.answers.is_empty());
            return Ok(chain);
        }

        let current: Vec<DNSResource> = if rrset.is_empty() {
            chain.packet_nodata = true;
            let Some(packet) = packet else {
                return Ok(chain);
            };
            let nsecs = packet.records_of_type(DNSResourceType::NSEC);
            if nsecs.is_empty() {
                packet.records_of_type(DNSResourceType::NSEC3)
            } else {
                nsecs
            }
        } else {
            rrset.to_vec()
        };
        let Some(first) = current.first() else {
            return Ok(chain);
        };
        let name = first.name.clone();
        let rtype = first.rtype();
        let class = first.rclass;
        chain.rrset = current.clone();

        let signatures = if rtype.is_denial() {
            match packet {
                Some(p) => p.rrsigs_for_type(rtype),
                None => fetch(resolver, &name, rtype, class).rrsigs_for_type(rtype),
            }
        } else {
            let found = packet
                .map(|p| p.rrsigs_covering(&name, rtype))
                .unwrap_or_default();
            if found.is_empty() {
                fetch(resolver, &name, rtype, class).rrsigs_covering(&name, rtype)
            } else {
                found
            }
        };

        let Some(signer) = signatures
            .iter()
            .find_map(|sig| sig.as_rrsig().map(|s| s.signer_name.clone()))
        else {
            // Unsigned: a signed denial of DS at the nearest cut above
            // shows the data may legitimately be unsigned
            if rrset.is_empty() {
                return Ok(chain);
            }
            debug!("No signatures for {} {}", name, rtype);
            chain.parent = Self::ds_denial_at(resolver, &name, class, depth + 1, max_depth)?.map(Box::new);
            return Ok(chain);
        };

        if rtype != DNSResourceType::DNSKEY {
            chain.signatures = signatures;
            let in_packet = packet
                .map(|p| p.rrset(&signer, DNSResourceType::DNSKEY))
                .unwrap_or_default();
            let mut parent = if in_packet.is_empty() {
                let key_packet = fetch(resolver, &signer, DNSResourceType::DNSKEY, class);
                let keys = key_packet.rrset(&signer, DNSResourceType::DNSKEY);
                Self::build_at(resolver, &keys, Some(&key_packet), None, depth + 1, max_depth)?
            } else {
                Self::build_at(resolver, &in_packet, packet, None, depth + 1, max_depth)?
            };
            parent.packet_qtype = DNSResourceType::DNSKEY;
            chain.parent = Some(Box::new(parent));
        } else {
            let ds_packet = fetch(resolver, &signer, DNSResourceType::DS, class);
            let dss = ds_packet.rrset(&signer, DNSResourceType::DS);
            if !dss.is_empty() {
                let mut parent = Self::build_at(resolver, &dss, Some(&ds_packet), None, depth + 1, max_depth)?;
                parent.packet_qname = Some(signer.clone());
                parent.packet_qtype = DNSResourceType::DS;
                chain.parent = Some(Box::new(parent));
                chain.parent_is_ds = true;
            }

            let key_packet = fetch(resolver, &signer, DNSResourceType::DNSKEY, class);
            let key_signatures = key_packet.rrsigs_covering(&signer, DNSResourceType::DNSKEY);
            chain.signatures = if key_signatures.is_empty() {
                signatures
            } else {
                key_signatures
            };
        }

        Ok(chain)
    }

    /// Chain for an RRset that arrived without signatures. Its parent link,
    /// if any, is the first signed DS denial found walking from the owner
    /// towards the root.
    pub fn build_unsigned<R: Resolver + ?Sized>(
        resolver: &R,
        rrset: &[DNSResource],
        rcode: ResponseCode,
        max_depth: usize,
    ) -> Result<DataChain> {
        let Some(first) = rrset.first() else {
            return Err(DnsSecError::EmptyInput);
        };
        let parent = Self::ds_denial_at(resolver, &first.name, first.rclass, 1, max_depth)?;
        Ok(DataChain {
            rrset: rrset.to_vec(),
            parent: parent.map(Box::new),
            packet_rcode: rcode,
            ..Default::default()
        })
    }

    /// Ask for DS at `name` and each ancestor until an answer is signed. A
    /// signed denial becomes the link; a DS that exists ends the walk
    /// without one.
    fn ds_denial_at<R: Resolver + ?Sized>(
        resolver: &R,
        name: &Name,
        class: DNSResourceClass,
        depth: usize,
        max_depth: usize,
    ) -> Result<Option<DataChain>> {
        let mut candidate = Some(name.clone());
        while let Some(owner) = candidate {
            trace!("Asking for DS at {}", owner);
            let ds_packet = fetch(resolver, &owner, DNSResourceType::DS, class);
            if !ds_packet.answers.is_empty() {
                return Ok(None);
            }
            if has_rrsigs(&ds_packet) {
                let mut link = Self::build_at(resolver, &[], Some(&ds_packet), None, depth, max_depth)?;
                link.packet_qname = Some(owner);
                link.packet_qtype = DNSResourceType::DS;
                return Ok(Some(link));
            }
            candidate = owner.parent();
        }
        Ok(None)
    }

    /// Number of links, this one included
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }

    pub fn is_empty(&self) -> bool {
        self.rrset.is_empty()
    }
}

impl fmt::Display for DataChain {
    /// Root-most link first, each closed by `---`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{}", parent)?;
        }
        if self.rrset.is_empty() {
            return writeln!(f, "<no data>");
        }
        writeln!(f, ";; rcode: {:?}", self.packet_rcode)?;
        writeln!(f, ";; qtype: {}", self.packet_qtype)?;
        if self.packet_nodata {
            writeln!(f, ";; NODATA response")?;
        }
        writeln!(f, "rrset:")?;
        for rr in &self.rrset {
            writeln!(f, "{}", rr)?;
        }
        writeln!(f, "sigs:")?;
        for sig in &self.signatures {
            writeln!(f, "{}", sig)?;
        }
        writeln!(f, "---")
    }
}
