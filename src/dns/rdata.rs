//! Typed rdata for the record types the DNSSEC engine reasons about.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bitstream_io::BitWrite;
use chrono::DateTime;
use std::fmt;

use super::bitmap::TypeBitmap;
use super::common::{CanonicalWire, WireWriter, write_sized, write_u8, write_u16, write_u32};
use super::enums::DNSResourceType;
use super::name::Name;
use crate::dnssec::calculate_key_tag;

/// DNSKEY flag: the key is a zone key
pub const DNSKEY_FLAG_ZONE: u16 = 0x0100;
/// DNSKEY flag: secure entry point
pub const DNSKEY_FLAG_SEP: u16 = 0x0001;
/// DNSKEY flag: revoked (RFC 5011)
pub const DNSKEY_FLAG_REVOKE: u16 = 0x0080;
/// NSEC3 flag: opt-out
pub const NSEC3_FLAG_OPT_OUT: u8 = 0x01;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ds {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dnskey {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
}

impl Dnskey {
    pub fn new(flags: u16, algorithm: u8, public_key: Vec<u8>) -> Self {
        Self {
            flags,
            protocol: 3,
            algorithm,
            public_key,
        }
    }

    pub fn key_tag(&self) -> u16 {
        calculate_key_tag(self.flags, self.protocol, self.algorithm, &self.public_key)
    }

    pub fn is_zone_key(&self) -> bool {
        self.flags & DNSKEY_FLAG_ZONE != 0
    }

    pub fn is_sep(&self) -> bool {
        self.flags & DNSKEY_FLAG_SEP != 0
    }

    pub fn is_revoked(&self) -> bool {
        self.flags & DNSKEY_FLAG_REVOKE != 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rrsig {
    pub type_covered: DNSResourceType,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer_name: Name,
    pub signature: Vec<u8>,
}

impl Rrsig {
    /// RRSIG rdata up to, but excluding, the signature field
    pub fn write_prefix(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()> {
        write_u16(writer, self.type_covered.into())?;
        write_u8(writer, self.algorithm)?;
        write_u8(writer, self.labels)?;
        write_u32(writer, self.original_ttl)?;
        write_u32(writer, self.expiration)?;
        write_u32(writer, self.inception)?;
        write_u16(writer, self.key_tag)?;
        self.signer_name.write_canonical(writer)
    }

    /// True when `now` falls inside the inception..=expiration window
    pub fn is_current(&self, now: u32) -> bool {
        serial_diff(self.expiration, self.inception) >= 0
            && serial_diff(now, self.inception) >= 0
            && serial_diff(self.expiration, now) >= 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Nsec {
    pub next_name: Name,
    pub types: TypeBitmap,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Nsec3 {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
    pub next_hashed_owner: Vec<u8>,
    pub types: TypeBitmap,
}

impl Nsec3 {
    pub fn is_opt_out(&self) -> bool {
        self.flags & NSEC3_FLAG_OPT_OUT != 0
    }

    pub fn params(&self) -> Nsec3Param {
        Nsec3Param {
            hash_algorithm: self.hash_algorithm,
            flags: 0,
            iterations: self.iterations,
            salt: self.salt.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Nsec3Param {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
}

impl Nsec3Param {
    pub fn new(iterations: u16, salt: Vec<u8>) -> Self {
        Self {
            hash_algorithm: 1,
            flags: 0,
            iterations,
            salt,
        }
    }
}

impl CanonicalWire for Soa {
    fn write_canonical(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()> {
        self.mname.write_canonical(writer)?;
        self.rname.write_canonical(writer)?;
        write_u32(writer, self.serial)?;
        write_u32(writer, self.refresh)?;
        write_u32(writer, self.retry)?;
        write_u32(writer, self.expire)?;
        write_u32(writer, self.minimum)
    }
}

impl CanonicalWire for Ds {
    fn write_canonical(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()> {
        write_u16(writer, self.key_tag)?;
        write_u8(writer, self.algorithm)?;
        write_u8(writer, self.digest_type)?;
        writer.write_bytes(&self.digest)
    }
}

impl CanonicalWire for Dnskey {
    fn write_canonical(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()> {
        write_u16(writer, self.flags)?;
        write_u8(writer, self.protocol)?;
        write_u8(writer, self.algorithm)?;
        writer.write_bytes(&self.public_key)
    }
}

impl CanonicalWire for Rrsig {
    fn write_canonical(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()> {
        self.write_prefix(writer)?;
        writer.write_bytes(&self.signature)
    }
}

impl CanonicalWire for Nsec {
    fn write_canonical(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()> {
        self.next_name.write_canonical(writer)?;
        writer.write_bytes(&self.types.to_wire())
    }
}

impl CanonicalWire for Nsec3 {
    fn write_canonical(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()> {
        write_u8(writer, self.hash_algorithm)?;
        write_u8(writer, self.flags)?;
        write_u16(writer, self.iterations)?;
        write_sized(writer, &self.salt)?;
        write_sized(writer, &self.next_hashed_owner)?;
        writer.write_bytes(&self.types.to_wire())
    }
}

impl CanonicalWire for Nsec3Param {
    fn write_canonical(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()> {
        write_u8(writer, self.hash_algorithm)?;
        write_u8(writer, self.flags)?;
        write_u16(writer, self.iterations)?;
        write_sized(writer, &self.salt)
    }
}

/// Signed distance from `b` to `a` in RFC 1982 serial arithmetic, which is
/// how RRSIG timestamps compare (RFC 4034 section 3.1.5)
pub fn serial_diff(a: u32, b: u32) -> i32 {
    a.wrapping_sub(b) as i32
}

/// Presentation form of an RRSIG timestamp (YYYYMMDDHHmmSS)
pub fn format_timestamp(ts: u32) -> String {
    DateTime::from_timestamp(i64::from(ts), 0)
        .map(|dt| dt.format("%Y%m%d%H%M%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn format_salt(salt: &[u8]) -> String {
    if salt.is_empty() {
        "-".to_string()
    } else {
        hex::encode_upper(salt)
    }
}

fn format_types(types: &TypeBitmap) -> String {
    types
        .types()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Soa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname, self.rname, self.serial, self.refresh, self.retry, self.expire, self.minimum
        )
    }
}

impl fmt::Display for Ds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.key_tag,
            self.algorithm,
            self.digest_type,
            hex::encode_upper(&self.digest)
        )
    }
}

impl fmt::Display for Dnskey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.flags,
            self.protocol,
            self.algorithm,
            BASE64.encode(&self.public_key)
        )
    }
}

impl fmt::Display for Rrsig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {}",
            self.type_covered,
            self.algorithm,
            self.labels,
            self.original_ttl,
            format_timestamp(self.expiration),
            format_timestamp(self.inception),
            self.key_tag,
            self.signer_name,
            BASE64.encode(&self.signature)
        )
    }
}

impl fmt::Display for Nsec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.next_name, format_types(&self.types))
    }
}

impl fmt::Display for Nsec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let next = base32::encode(
            base32::Alphabet::Rfc4648Hex { padding: false },
            &self.next_hashed_owner,
        );
        write!(
            f,
            "{} {} {} {} {} {}",
            self.hash_algorithm,
            self.flags,
            self.iterations,
            format_salt(&self.salt),
            next,
            format_types(&self.types)
        )
    }
}

impl fmt::Display for Nsec3Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.hash_algorithm,
            self.flags,
            self.iterations,
            format_salt(&self.salt)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dnskey_flags() {
        let ksk = Dnskey::new(DNSKEY_FLAG_ZONE | DNSKEY_FLAG_SEP, 8, vec![1, 2, 3]);
        assert!(ksk.is_zone_key());
        assert!(ksk.is_sep());
        assert!(!ksk.is_revoked());

        let zsk = Dnskey::new(DNSKEY_FLAG_ZONE, 8, vec![1, 2, 3]);
        assert!(!zsk.is_sep());
    }

    #[test]
    fn test_rrsig_prefix_excludes_signature() {
        let rrsig = Rrsig {
            type_covered: DNSResourceType::A,
            algorithm: 13,
            labels: 2,
            original_ttl: 3600,
            expiration: 2000,
            inception: 1000,
            key_tag: 0xabcd,
            signer_name: "Example".parse().unwrap(),
            signature: vec![0xff; 64],
        };
        let full = rrsig.to_wire().unwrap();

        let mut prefix = Vec::new();
        {
            let mut writer: WireWriter<'_> = bitstream_io::BitWriter::new(&mut prefix);
            rrsig.write_prefix(&mut writer).unwrap();
        }
        assert_eq!(prefix.len() + 64, full.len());
        assert_eq!(&prefix[..4], &[0, 1, 13, 2]);
        // signer name is lowercased
        assert_eq!(&prefix[18..], b"\x07example\x00");
    }

    #[test]
    fn test_rrsig_window() {
        let rrsig = Rrsig {
            type_covered: DNSResourceType::A,
            algorithm: 13,
            labels: 1,
            original_ttl: 60,
            expiration: 200,
            inception: 100,
            key_tag: 1,
            signer_name: Name::root(),
            signature: Vec::new(),
        };
        assert!(rrsig.is_current(100));
        assert!(rrsig.is_current(200));
        assert!(!rrsig.is_current(201));
        assert!(!rrsig.is_current(99));
    }

    #[test]
    fn test_serial_diff_wraps() {
        assert_eq!(serial_diff(10, 5), 5);
        assert_eq!(serial_diff(5, 10), -5);
        assert_eq!(serial_diff(3, u32::MAX - 2), 6);
        assert_eq!(serial_diff(u32::MAX - 2, 3), -6);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "19700101000000");
        assert_eq!(format_timestamp(1_700_000_000), "20231114221320");
    }

    #[test]
    fn test_nsec3_display() {
        let nsec3 = Nsec3 {
            hash_algorithm: 1,
            flags: 1,
            iterations: 12,
            salt: vec![0xaa, 0xbb, 0xcc, 0xdd],
            next_hashed_owner: vec![0; 20],
            types: TypeBitmap::from_types([DNSResourceType::A, DNSResourceType::RRSIG]),
        };
        assert!(nsec3.is_opt_out());
        assert_eq!(
            nsec3.to_string(),
            "1 1 12 AABBCCDD 00000000000000000000000000000000 A RRSIG"
        );
    }
}
