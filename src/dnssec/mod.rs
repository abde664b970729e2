pub mod algorithm;
pub mod canonical;
pub mod chain;
pub mod denial;
pub mod digest;
pub mod key_tag;
pub mod resolver;
pub mod trust_anchor;
pub mod trust_tree;
pub mod validator;
pub mod verify;

pub use algorithm::DnsSecAlgorithm;
pub use chain::DataChain;
pub use denial::{nsec3_closest_encloser, nsec3_hash, verify_denial, verify_denial_nsec3};
pub use digest::{DigestType, ds_from_dnskey, ds_matches_dnskey};
pub use key_tag::calculate_key_tag;
pub use resolver::{Resolver, StaticResolver};
pub use trust_anchor::TrustAnchorStore;
pub use trust_tree::{TrustTree, TrustVerdict};
pub use validator::DnsSecValidator;
pub use verify::{verify, verify_rrsig, verify_rrsig_keylist};

use crate::error::DnsSecError;

/// DNSSEC validation result
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// The response is secure and validated
    Secure,
    /// The response is provably unsigned
    Insecure,
    /// The response is bogus (validation failed)
    Bogus(DnsSecError),
    /// Validation is indeterminate (missing data)
    Indeterminate,
}

impl ValidationResult {
    pub fn is_secure(&self) -> bool {
        matches!(self, ValidationResult::Secure)
    }
}

/// DNSSEC constants
pub mod constants {
    /// Maximum iterations for NSEC3 (RFC 5155)
    pub const MAX_NSEC3_ITERATIONS: u16 = 2500;

    /// Root trust anchor key tag (2017 KSK)
    pub const ROOT_KSK_2017_KEY_TAG: u16 = 20326;

    /// Root trust anchor key tag (2024 KSK)
    pub const ROOT_KSK_2024_KEY_TAG: u16 = 38696;

    /// Default signature lifetime: 30 days
    pub const DEFAULT_SIGNATURE_VALIDITY: u32 = 30 * 24 * 3600;
}

/// Current time as a 32-bit Unix timestamp, as carried in RRSIG records
pub fn unix_now() -> u32 {
    chrono::Utc::now().timestamp() as u32
}
