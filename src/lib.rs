pub mod config;
pub mod dns;
pub mod dnssec;
pub mod error;
pub mod sign;
pub mod zone;

pub use config::EngineConfig;
pub use dns::DNSPacket;
pub use dnssec::{DnsSecValidator, TrustAnchorStore, ValidationResult};
pub use error::{DnsSecError, Result};
pub use sign::{SignatureAction, SigningKey, ZoneSigner};
pub use zone::DnssecZone;
