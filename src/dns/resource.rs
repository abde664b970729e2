use bitstream_io::BitWrite;
use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::common::{CanonicalWire, WireWriter, write_sized, write_u16, write_u32};
use super::enums::{DNSResourceClass, DNSResourceType};
use super::name::Name;
use super::rdata::{Dnskey, Ds, Nsec, Nsec3, Nsec3Param, Rrsig, Soa};
use crate::error::Result;

/// A parsed resource record. The engine reorders and retags records but
/// never rewrites the rdata of a record it was handed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DNSResource {
    pub name: Name,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdata: DNSResourceData,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DNSResourceData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(Name),
    CNAME(Name),
    PTR(Name),
    MX(u16, Name),
    TXT(Vec<Vec<u8>>),
    SOA(Soa),
    SRV(u16, u16, u16, Name),
    DS(Ds),
    DNSKEY(Dnskey),
    RRSIG(Rrsig),
    NSEC(Nsec),
    NSEC3(Nsec3),
    NSEC3PARAM(Nsec3Param),
    Unknown(u16, Vec<u8>),
}

impl DNSResourceData {
    pub fn rtype(&self) -> DNSResourceType {
        match self {
            DNSResourceData::A(_) => DNSResourceType::A,
            DNSResourceData::AAAA(_) => DNSResourceType::AAAA,
            DNSResourceData::NS(_) => DNSResourceType::NS,
            DNSResourceData::CNAME(_) => DNSResourceType::CNAME,
            DNSResourceData::PTR(_) => DNSResourceType::PTR,
            DNSResourceData::MX(..) => DNSResourceType::MX,
            DNSResourceData::TXT(_) => DNSResourceType::TXT,
            DNSResourceData::SOA(_) => DNSResourceType::SOA,
            DNSResourceData::SRV(..) => DNSResourceType::SRV,
            DNSResourceData::DS(_) => DNSResourceType::DS,
            DNSResourceData::DNSKEY(_) => DNSResourceType::DNSKEY,
            DNSResourceData::RRSIG(_) => DNSResourceType::RRSIG,
            DNSResourceData::NSEC(_) => DNSResourceType::NSEC,
            DNSResourceData::NSEC3(_) => DNSResourceType::NSEC3,
            DNSResourceData::NSEC3PARAM(_) => DNSResourceType::NSEC3PARAM,
            DNSResourceData::Unknown(rtype, _) => DNSResourceType::from(*rtype),
        }
    }
}

impl CanonicalWire for DNSResourceData {
    fn write_canonical(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()> {
        match self {
            DNSResourceData::A(addr) => writer.write_bytes(&addr.octets()),
            DNSResourceData::AAAA(addr) => writer.write_bytes(&addr.octets()),
            DNSResourceData::NS(name) | DNSResourceData::CNAME(name) | DNSResourceData::PTR(name) => {
                name.write_canonical(writer)
            }
            DNSResourceData::MX(preference, exchange) => {
                write_u16(writer, *preference)?;
                exchange.write_canonical(writer)
            }
            DNSResourceData::TXT(strings) => {
                for s in strings {
                    write_sized(writer, s)?;
                }
                Ok(())
            }
            DNSResourceData::SOA(soa) => soa.write_canonical(writer),
            DNSResourceData::SRV(priority, weight, port, target) => {
                write_u16(writer, *priority)?;
                write_u16(writer, *weight)?;
                write_u16(writer, *port)?;
                target.write_canonical(writer)
            }
            DNSResourceData::DS(ds) => ds.write_canonical(writer),
            DNSResourceData::DNSKEY(key) => key.write_canonical(writer),
            DNSResourceData::RRSIG(sig) => sig.write_canonical(writer),
            DNSResourceData::NSEC(nsec) => nsec.write_canonical(writer),
            DNSResourceData::NSEC3(nsec3) => nsec3.write_canonical(writer),
            DNSResourceData::NSEC3PARAM(param) => param.write_canonical(writer),
            DNSResourceData::Unknown(_, data) => writer.write_bytes(data),
        }
    }
}

impl DNSResource {
    pub fn new(name: Name, ttl: u32, rdata: DNSResourceData) -> Self {
        Self {
            name,
            rclass: DNSResourceClass::IN,
            ttl,
            rdata,
        }
    }

    /// Record with empty rdata standing in for the question `name`/`rtype`
    pub fn question(name: Name, rtype: DNSResourceType) -> Self {
        Self::new(name, 0, DNSResourceData::Unknown(rtype.to_u16(), Vec::new()))
    }

    pub fn rtype(&self) -> DNSResourceType {
        self.rdata.rtype()
    }

    /// For an RRSIG, the type it covers; otherwise the record's own type
    pub fn covered_type(&self) -> DNSResourceType {
        match &self.rdata {
            DNSResourceData::RRSIG(sig) => sig.type_covered,
            other => other.rtype(),
        }
    }

    /// Canonical rdata bytes. Embedded names are lowercased.
    pub fn canonical_rdata(&self) -> Result<Vec<u8>> {
        self.rdata.to_wire()
    }

    /// Full canonical record: owner, type, class, `ttl`, rdlength, rdata.
    pub fn write_canonical_with_ttl(
        &self,
        writer: &mut WireWriter<'_>,
        owner: &Name,
        ttl: u32,
    ) -> Result<()> {
        let rdata = self.canonical_rdata()?;
        owner.write_canonical(writer)?;
        write_u16(writer, self.rtype().into())?;
        write_u16(writer, self.rclass.into())?;
        write_u32(writer, ttl)?;
        write_u16(writer, rdata.len() as u16)?;
        writer.write_bytes(&rdata)?;
        Ok(())
    }

    /// Canonical RR ordering: owner, class, type, then rdata as
    /// left-justified unsigned octet sequences.
    pub fn canonical_cmp(&self, other: &DNSResource) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| u16::from(self.rclass).cmp(&u16::from(other.rclass)))
            .then_with(|| self.rtype().cmp(&other.rtype()))
            .then_with(|| {
                let a = self.canonical_rdata().unwrap_or_default();
                let b = other.canonical_rdata().unwrap_or_default();
                a.cmp(&b)
            })
    }

    /// Same owner, class, type and canonical rdata
    pub fn is_duplicate_of(&self, other: &DNSResource) -> bool {
        self.canonical_cmp(other) == Ordering::Equal
    }

    pub fn as_rrsig(&self) -> Option<&Rrsig> {
        match &self.rdata {
            DNSResourceData::RRSIG(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn as_dnskey(&self) -> Option<&Dnskey> {
        match &self.rdata {
            DNSResourceData::DNSKEY(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_ds(&self) -> Option<&Ds> {
        match &self.rdata {
            DNSResourceData::DS(ds) => Some(ds),
            _ => None,
        }
    }

    pub fn as_nsec(&self) -> Option<&Nsec> {
        match &self.rdata {
            DNSResourceData::NSEC(nsec) => Some(nsec),
            _ => None,
        }
    }

    pub fn as_nsec3(&self) -> Option<&Nsec3> {
        match &self.rdata {
            DNSResourceData::NSEC3(nsec3) => Some(nsec3),
            _ => None,
        }
    }

    pub fn as_soa(&self) -> Option<&Soa> {
        match &self.rdata {
            DNSResourceData::SOA(soa) => Some(soa),
            _ => None,
        }
    }
}

impl fmt::Display for DNSResourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DNSResourceData::A(addr) => write!(f, "{}", addr),
            DNSResourceData::AAAA(addr) => write!(f, "{}", addr),
            DNSResourceData::NS(name) | DNSResourceData::CNAME(name) | DNSResourceData::PTR(name) => {
                write!(f, "{}", name)
            }
            DNSResourceData::MX(preference, exchange) => write!(f, "{} {}", preference, exchange),
            DNSResourceData::TXT(strings) => {
                let parts: Vec<String> = strings
                    .iter()
                    .map(|s| format!("\"{}\"", String::from_utf8_lossy(s)))
                    .collect();
                write!(f, "{}", parts.join(" "))
            }
            DNSResourceData::SOA(soa) => write!(f, "{}", soa),
            DNSResourceData::SRV(priority, weight, port, target) => {
                write!(f, "{} {} {} {}", priority, weight, port, target)
            }
            DNSResourceData::DS(ds) => write!(f, "{}", ds),
            DNSResourceData::DNSKEY(key) => write!(f, "{}", key),
            DNSResourceData::RRSIG(sig) => write!(f, "{}", sig),
            DNSResourceData::NSEC(nsec) => write!(f, "{}", nsec),
            DNSResourceData::NSEC3(nsec3) => write!(f, "{}", nsec3),
            DNSResourceData::NSEC3PARAM(param) => write!(f, "{}", param),
            DNSResourceData::Unknown(_, data) => {
                write!(f, "\\# {} {}", data.len(), hex::encode(data))
            }
        }
    }
}

impl fmt::Display for DNSResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name,
            self.ttl,
            self.rclass,
            self.rtype(),
            self.rdata
        )
    }
}
