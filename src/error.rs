use thiserror::Error;

/// Errors produced by the zone model, the signer and the validator.
///
/// Statuses are kept on trust-tree edges, so the type is cheap to clone and
/// comparable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsSecError {
    #[error("Empty input: no records or keys were supplied")]
    EmptyInput,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("DNSSEC signature not yet valid")]
    SignatureNotYetValid,

    #[error("DNSSEC signature has expired")]
    SignatureExpired,

    #[error("DNSSEC signature expiration is before its inception")]
    ExpirationBeforeInception,

    #[error("Bogus DNSSEC signature")]
    Bogus,

    #[error("No DNSKEY with a matching keytag found")]
    NoMatchingKeytag,

    #[error("Unknown DNSSEC algorithm: {0}")]
    UnknownAlgorithm(u8),

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(u8),

    #[error("Signing failed: {0}")]
    SigningError(String),

    #[error("No trusted DNSKEY found")]
    NoTrustedDnskey,

    #[error("No trusted DS found")]
    NoTrustedDs,

    #[error("Name or type not covered by denial of existence records")]
    NotCovered,

    #[error("Wildcard not covered by denial of existence records")]
    WildcardNotCovered,

    #[error("DS denial at {0} is not at a zone cut")]
    NotZoneCut(String),

    #[error("No RRSIG records supplied")]
    NoRrsig,

    #[error("No DNSKEY records supplied")]
    NoDnskey,

    #[error("Invalid public key material")]
    InvalidPublicKey,

    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    #[error("Invalid NSEC3 parameters: {0}")]
    InvalidNsec3Parameters(String),

    #[error("Unsupported DS digest type: {0}")]
    UnsupportedDigestType(u8),

    #[error("Recursion limit of {0} exceeded")]
    RecursionLimit(usize),

    #[error("Resolver error: {0}")]
    Resolver(String),

    #[error("Wire format error: {0}")]
    Wire(String),
}

impl From<std::io::Error> for DnsSecError {
    fn from(err: std::io::Error) -> Self {
        DnsSecError::Wire(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read configuration: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DnsSecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DnsSecError::UnknownAlgorithm(200).to_string(),
            "Unknown DNSSEC algorithm: 200"
        );
        assert_eq!(
            DnsSecError::NotFound("original of NSEC3 owner".to_string()).to_string(),
            "Not found: original of NSEC3 owner"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::WriteZero, "short write");
        let err: DnsSecError = io.into();
        assert!(matches!(err, DnsSecError::Wire(_)));
    }
}
