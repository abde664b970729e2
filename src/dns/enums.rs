use std::cmp::Ordering;
use std::fmt;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DNSResourceType {
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    DS,
    RRSIG,
    NSEC,
    DNSKEY,
    NSEC3,
    NSEC3PARAM,
    Unknown(u16),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DNSResourceClass {
    #[default]
    IN,
    CH,
    HS,
    Unknown(u16),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    #[default]
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    Other(u8),
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            3 => DNSResourceClass::CH,
            4 => DNSResourceClass::HS,
            other => DNSResourceClass::Unknown(other),
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(value: DNSResourceClass) -> Self {
        match value {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CH => 3,
            DNSResourceClass::HS => 4,
            DNSResourceClass::Unknown(other) => other,
        }
    }
}

impl From<u16> for DNSResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceType::A,
            2 => DNSResourceType::NS,
            5 => DNSResourceType::CNAME,
            6 => DNSResourceType::SOA,
            12 => DNSResourceType::PTR,
            15 => DNSResourceType::MX,
            16 => DNSResourceType::TXT,
            28 => DNSResourceType::AAAA,
            33 => DNSResourceType::SRV,
            43 => DNSResourceType::DS,
            46 => DNSResourceType::RRSIG,
            47 => DNSResourceType::NSEC,
            48 => DNSResourceType::DNSKEY,
            50 => DNSResourceType::NSEC3,
            51 => DNSResourceType::NSEC3PARAM,
            other => DNSResourceType::Unknown(other),
        }
    }
}

impl From<DNSResourceType> for u16 {
    fn from(value: DNSResourceType) -> Self {
        match value {
            DNSResourceType::A => 1,
            DNSResourceType::NS => 2,
            DNSResourceType::CNAME => 5,
            DNSResourceType::SOA => 6,
            DNSResourceType::PTR => 12,
            DNSResourceType::MX => 15,
            DNSResourceType::TXT => 16,
            DNSResourceType::AAAA => 28,
            DNSResourceType::SRV => 33,
            DNSResourceType::DS => 43,
            DNSResourceType::RRSIG => 46,
            DNSResourceType::NSEC => 47,
            DNSResourceType::DNSKEY => 48,
            DNSResourceType::NSEC3 => 50,
            DNSResourceType::NSEC3PARAM => 51,
            DNSResourceType::Unknown(other) => other,
        }
    }
}

impl DNSResourceType {
    pub fn to_u16(self) -> u16 {
        self.into()
    }

    /// Mnemonic used in presentation format, `TYPEnnn` for unknown types
    pub fn mnemonic(&self) -> String {
        let name = match self {
            DNSResourceType::A => "A",
            DNSResourceType::NS => "NS",
            DNSResourceType::CNAME => "CNAME",
            DNSResourceType::SOA => "SOA",
            DNSResourceType::PTR => "PTR",
            DNSResourceType::MX => "MX",
            DNSResourceType::TXT => "TXT",
            DNSResourceType::AAAA => "AAAA",
            DNSResourceType::SRV => "SRV",
            DNSResourceType::DS => "DS",
            DNSResourceType::RRSIG => "RRSIG",
            DNSResourceType::NSEC => "NSEC",
            DNSResourceType::DNSKEY => "DNSKEY",
            DNSResourceType::NSEC3 => "NSEC3",
            DNSResourceType::NSEC3PARAM => "NSEC3PARAM",
            DNSResourceType::Unknown(other) => return format!("TYPE{}", other),
        };
        name.to_string()
    }

    /// Address records are the only data a glue name may carry
    pub fn is_address(&self) -> bool {
        matches!(self, DNSResourceType::A | DNSResourceType::AAAA)
    }

    pub fn is_denial(&self) -> bool {
        matches!(self, DNSResourceType::NSEC | DNSResourceType::NSEC3)
    }
}

impl PartialOrd for DNSResourceType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// RRsets at a name are kept in numeric type order
impl Ord for DNSResourceType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_u16().cmp(&other.to_u16())
    }
}

impl fmt::Display for DNSResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic())
    }
}

impl fmt::Display for DNSResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DNSResourceClass::IN => write!(f, "IN"),
            DNSResourceClass::CH => write!(f, "CH"),
            DNSResourceClass::HS => write!(f, "HS"),
            DNSResourceClass::Unknown(other) => write!(f, "CLASS{}", other),
        }
    }
}

impl From<u8> for ResponseCode {
    fn from(value: u8) -> Self {
        match value {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormErr,
            2 => ResponseCode::ServFail,
            3 => ResponseCode::NxDomain,
            4 => ResponseCode::NotImp,
            5 => ResponseCode::Refused,
            other => ResponseCode::Other(other),
        }
    }
}

impl From<ResponseCode> for u8 {
    fn from(value: ResponseCode) -> Self {
        match value {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::ServFail => 2,
            ResponseCode::NxDomain => 3,
            ResponseCode::NotImp => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Other(other) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_roundtrip() {
        for value in [1u16, 2, 5, 6, 12, 15, 16, 28, 33, 43, 46, 47, 48, 50, 51, 999] {
            let rtype = DNSResourceType::from(value);
            assert_eq!(u16::from(rtype), value);
        }
        assert_eq!(DNSResourceType::from(999), DNSResourceType::Unknown(999));
    }

    #[test]
    fn test_type_ordering_is_numeric() {
        let mut types = vec![
            DNSResourceType::DNSKEY,
            DNSResourceType::Unknown(3),
            DNSResourceType::AAAA,
            DNSResourceType::A,
        ];
        types.sort();
        assert_eq!(
            types,
            vec![
                DNSResourceType::A,
                DNSResourceType::Unknown(3),
                DNSResourceType::AAAA,
                DNSResourceType::DNSKEY,
            ]
        );
    }

    #[test]
    fn test_mnemonic() {
        assert_eq!(DNSResourceType::NSEC3PARAM.to_string(), "NSEC3PARAM");
        assert_eq!(DNSResourceType::Unknown(65280).to_string(), "TYPE65280");
        assert_eq!(DNSResourceClass::Unknown(254).to_string(), "CLASS254");
    }
}
