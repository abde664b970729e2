use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::chain::DataChain;
use super::denial::{verify_denial, verify_denial_nsec3};
use super::digest::ds_equivalent;
use super::resolver::Resolver;
use super::trust_tree::{TrustTree, TrustVerdict};
use super::verify::{keep_most_specific, verify, verify_rrsig};
use super::{TrustAnchorStore, ValidationResult, unix_now};
use crate::config::EngineConfig;
use crate::dns::DNSPacket;
use crate::dns::enums::{DNSResourceClass, DNSResourceType, ResponseCode};
use crate::dns::name::Name;
use crate::dns::resource::DNSResource;
use crate::error::{DnsSecError, Result};

/// DNSSEC validator: anchors, a resolver to fetch keys through, and the
/// clock signatures are checked against.
pub struct DnsSecValidator {
    /// Trust anchor store
    trust_anchors: Arc<TrustAnchorStore>,
    resolver: Box<dyn Resolver + Send + Sync>,
    config: EngineConfig,
    /// Current time for signature validation (for testing)
    current_time: Option<u32>,
}

impl DnsSecValidator {
    /// Create a new DNSSEC validator
    pub fn new(
        trust_anchors: Arc<TrustAnchorStore>,
        resolver: impl Resolver + Send + Sync + 'static,
    ) -> Self {
        Self {
            trust_anchors,
            resolver: Box::new(resolver),
            config: EngineConfig::default(),
            current_time: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set current time for testing
    pub fn set_current_time(&mut self, time: u32) {
        self.current_time = Some(time);
    }

    fn now(&self) -> u32 {
        self.current_time.unwrap_or_else(unix_now)
    }

    fn query(&self, name: &Name, rtype: DNSResourceType) -> Result<DNSPacket> {
        self.resolver.query(name, rtype, DNSResourceClass::IN)
    }

    /// Validate the DNSKEY set of `domain` against `keys`.
    ///
    /// A domain key equal to one of `keys` (or matched by a DS among them)
    /// that signed the set makes the whole set trusted. A matched key whose
    /// signature does not verify is still trusted on its own.
    pub fn validate_domain_dnskey(
        &self,
        domain: &Name,
        keys: &[DNSResource],
    ) -> Result<Vec<DNSResource>> {
        let packet = self.query(domain, DNSResourceType::DNSKEY)?;
        let domain_keys = packet.rrset(domain, DNSResourceType::DNSKEY);
        let signatures = packet.rrsigs_covering(domain, DNSResourceType::DNSKEY);
        let now = self.now();

        let mut trusted = Vec::new();
        for key in &domain_keys {
            if !keys.iter().any(|anchor| ds_equivalent(key, anchor)) {
                continue;
            }
            let Some(tag) = key.as_dnskey().map(|k| k.key_tag()) else {
                continue;
            };
            for sig in &signatures {
                if sig.as_rrsig().is_some_and(|s| s.key_tag == tag)
                    && verify_rrsig(&domain_keys, sig, key, now).is_ok()
                {
                    debug!("DNSKEY set of {} validated by key {}", domain, tag);
                    return Ok(domain_keys);
                }
            }
            trusted.push(key.clone());
        }

        if trusted.is_empty() {
            Err(DnsSecError::NoTrustedDnskey)
        } else {
            Ok(trusted)
        }
    }

    /// Fetch the DS set of `domain` and validate it with the parent's keys
    pub fn validate_domain_ds(
        &self,
        domain: &Name,
        parent_keys: &[DNSResource],
    ) -> Result<Vec<DNSResource>> {
        let packet = self.query(domain, DNSResourceType::DS)?;
        let ds = packet.rrset(domain, DNSResourceType::DS);
        let signatures = packet.rrsigs_covering(domain, DNSResourceType::DS);
        if ds.is_empty() {
            return Err(DnsSecError::NoTrustedDs);
        }
        match verify(&ds, &signatures, parent_keys, self.now(), None) {
            Ok(()) => Ok(ds),
            Err(e) => {
                debug!("DS set of {} did not validate: {}", domain, e);
                Err(DnsSecError::NoTrustedDs)
            }
        }
    }

    /// Keys of `domain` that can be trusted starting from `keys`.
    ///
    /// Tries the domain's own DNSKEY set first; failing that, walks to the
    /// parent, validates the DS set there and uses it to vouch for the
    /// domain's keys.
    pub fn fetch_valid_domain_keys(
        &self,
        domain: &Name,
        keys: &[DNSResource],
    ) -> Result<Vec<DNSResource>> {
        self.fetch_valid_domain_keys_at(domain, keys, 0)
    }

    fn fetch_valid_domain_keys_at(
        &self,
        domain: &Name,
        keys: &[DNSResource],
        depth: usize,
    ) -> Result<Vec<DNSResource>> {
        if depth > self.config.max_recursion_depth {
            return Err(DnsSecError::RecursionLimit(self.config.max_recursion_depth));
        }
        if keys.is_empty() {
            return Err(DnsSecError::EmptyInput);
        }

        if let Ok(trusted) = self.validate_domain_dnskey(domain, keys) {
            return Ok(trusted);
        }

        let Some(parent) = domain.parent() else {
            return Err(DnsSecError::NoTrustedDnskey);
        };
        trace!("No direct trust for {}, trying {}", domain, parent);

        let parent_keys = self.fetch_valid_domain_keys_at(&parent, keys, depth + 1)?;
        let ds = self.validate_domain_ds(domain, &parent_keys)?;
        self.validate_domain_dnskey(domain, &ds)
    }

    /// Verify `rrset` with keys reachable from the trust anchors, collecting
    /// the keys that validated it.
    pub fn verify_trusted(
        &self,
        rrset: &[DNSResource],
        rrsigs: &[DNSResource],
        validating_keys: Option<&mut Vec<DNSResource>>,
    ) -> Result<()> {
        if rrset.is_empty() {
            return Err(DnsSecError::EmptyInput);
        }
        if rrsigs.is_empty() {
            return Err(DnsSecError::NoRrsig);
        }

        let anchors = self.trust_anchors.trusted_records();
        let now = self.now();
        let mut good_keys = Vec::new();
        let mut failure = None;

        for sig in rrsigs {
            let Some(signer) = sig.as_rrsig().map(|s| s.signer_name.clone()) else {
                continue;
            };
            let keys = match self.fetch_valid_domain_keys(&signer, &anchors) {
                Ok(keys) => keys,
                Err(e) => {
                    keep_most_specific(&mut failure, e);
                    continue;
                }
            };
            for key in &keys {
                match verify_rrsig(rrset, sig, key, now) {
                    Ok(()) => {
                        if !good_keys.contains(key) {
                            good_keys.push(key.clone());
                        }
                    }
                    Err(e) => keep_most_specific(&mut failure, e),
                }
            }
        }

        let validated = !good_keys.is_empty();
        if let Some(out) = validating_keys {
            out.extend(good_keys);
        }
        if validated {
            Ok(())
        } else {
            Err(failure.unwrap_or(DnsSecError::NoTrustedDnskey))
        }
    }

    /// Validate one RRset and its signatures against the trust anchors
    pub fn validate_rrset(&self, rrset: &[DNSResource], rrsigs: &[DNSResource]) -> ValidationResult {
        match self.verify_trusted(rrset, rrsigs, None) {
            Ok(()) => ValidationResult::Secure,
            Err(DnsSecError::NoRrsig) => ValidationResult::Indeterminate,
            Err(e) => {
                warn!("DNSSEC validation failed: {}", e);
                ValidationResult::Bogus(e)
            }
        }
    }

    /// Validate every answer RRset of a response
    pub fn validate_packet(&self, packet: &DNSPacket) -> ValidationResult {
        let mut rrsets: BTreeMap<(Name, DNSResourceType), Vec<DNSResource>> = BTreeMap::new();
        for rr in &packet.answers {
            if rr.rtype() != DNSResourceType::RRSIG {
                rrsets
                    .entry((rr.name.clone(), rr.rtype()))
                    .or_default()
                    .push(rr.clone());
            }
        }
        if rrsets.is_empty() {
            return ValidationResult::Indeterminate;
        }

        let mut outcome = ValidationResult::Secure;
        for ((name, rtype), rrset) in &rrsets {
            let sigs = packet.rrsigs_covering(name, *rtype);
            if sigs.is_empty() {
                debug!("No RRSIG for {} {}, looking for proof of an unsigned zone", name, rtype);
                match self.validate_unsigned(rrset, packet.rcode) {
                    ValidationResult::Secure => {}
                    ValidationResult::Bogus(e) => {
                        warn!("Unsigned {} {} where signatures are expected: {}", name, rtype, e);
                        return ValidationResult::Bogus(e);
                    }
                    ValidationResult::Indeterminate => outcome = ValidationResult::Indeterminate,
                    ValidationResult::Insecure => {
                        if outcome == ValidationResult::Secure {
                            outcome = ValidationResult::Insecure;
                        }
                    }
                }
                continue;
            }
            if let Err(e) = self.verify_trusted(rrset, &sigs, None) {
                warn!("DNSSEC validation failed for {} {}: {}", name, rtype, e);
                return ValidationResult::Bogus(e);
            }
        }
        outcome
    }

    /// An RRset that came without signatures is insecure only when a
    /// trusted DS denial at a zone cut above it shows its zone unsigned.
    fn validate_unsigned(&self, rrset: &[DNSResource], rcode: ResponseCode) -> ValidationResult {
        let max_depth = self.config.max_recursion_depth;
        let tree = DataChain::build_unsigned(self.resolver.as_ref(), rrset, rcode, max_depth)
            .and_then(|chain| {
                let proven = chain.parent.is_some();
                TrustTree::derive(&chain, None, self.now(), max_depth).map(|tree| (tree, proven))
            });
        let (tree, proven) = match tree {
            Ok(found) => found,
            Err(e) => return ValidationResult::Bogus(e),
        };

        match tree.contains_keys(&self.trust_anchors.trusted_records()) {
            Ok(_) => ValidationResult::Insecure,
            // the walk met a DS, so the zone is signed
            Err(DnsSecError::NoDnskey) if !proven => ValidationResult::Bogus(DnsSecError::NoRrsig),
            Err(DnsSecError::NoDnskey) => ValidationResult::Indeterminate,
            Err(e) => ValidationResult::Bogus(e),
        }
    }

    /// Validate the denial of `name`/`rtype` carried by a negative response:
    /// the NSEC or NSEC3 proof must hold and its records must be signed by
    /// trusted keys.
    pub fn validate_denial(&self, name: &Name, rtype: DNSResourceType, packet: &DNSPacket) -> ValidationResult {
        let nsecs = packet.records_of_type(DNSResourceType::NSEC);
        let (denial_type, records) = if nsecs.is_empty() {
            (DNSResourceType::NSEC3, packet.records_of_type(DNSResourceType::NSEC3))
        } else {
            (DNSResourceType::NSEC, nsecs)
        };
        if records.is_empty() {
            return ValidationResult::Bogus(DnsSecError::NotCovered);
        }
        let signatures = packet.rrsigs_for_type(denial_type);

        let proof = if denial_type == DNSResourceType::NSEC {
            verify_denial(name, rtype, &records, &signatures)
        } else {
            let too_many = records
                .iter()
                .filter_map(|rr| rr.as_nsec3())
                .any(|n| n.iterations > self.config.max_nsec3_iterations);
            if too_many {
                debug!("NSEC3 iterations above limit, treating {} as insecure", name);
                return ValidationResult::Insecure;
            }
            verify_denial_nsec3(name, &records, packet.rcode, rtype, packet.answers.is_empty())
        };
        if let Err(e) = proof {
            return ValidationResult::Bogus(e);
        }

        let mut owners: Vec<&Name> = records.iter().map(|rr| &rr.name).collect();
        owners.sort();
        owners.dedup();
        for owner in owners {
            let rrset: Vec<DNSResource> = records.iter().filter(|rr| rr.name == *owner).cloned().collect();
            let sigs: Vec<DNSResource> = signatures.iter().filter(|rr| rr.name == *owner).cloned().collect();
            if let Err(e) = self.verify_trusted(&rrset, &sigs, None) {
                warn!("Denial record {} did not validate: {}", owner, e);
                return ValidationResult::Bogus(e);
            }
        }
        ValidationResult::Secure
    }

    /// Build the data chain and trust tree for a query answered by the
    /// resolver
    pub fn trust_tree_for(&self, name: &Name, rtype: DNSResourceType) -> Result<TrustTree> {
        let packet = self.query(name, rtype)?;
        self.trust_tree_from_packet(name, rtype, &packet)
    }

    fn trust_tree_from_packet(&self, name: &Name, rtype: DNSResourceType, packet: &DNSPacket) -> Result<TrustTree> {
        let question = DNSResource::question(name.clone(), rtype);
        let answers = packet.rrset(name, rtype);
        let signed = !packet.records_of_type(DNSResourceType::RRSIG).is_empty();
        let max_depth = self.config.max_recursion_depth;

        // unsigned answers are chased from scratch so the DS proof is fetched
        let chain = DataChain::build(
            self.resolver.as_ref(),
            &answers,
            signed.then_some(packet),
            Some(&question),
            max_depth,
        )?;
        TrustTree::derive(&chain, None, self.now(), max_depth)
    }

    /// Decide whether `packet`, the answer to `name`/`rtype`, is secure,
    /// provably insecure, or bogus by searching its trust tree for an anchor.
    pub fn validate_answer(&self, packet: &DNSPacket, name: &Name, rtype: DNSResourceType) -> ValidationResult {
        let tree = match self.trust_tree_from_packet(name, rtype, packet) {
            Ok(tree) => tree,
            Err(e) => return ValidationResult::Bogus(e),
        };
        if tracing::enabled!(tracing::Level::TRACE) {
            trace!("Trust tree for {} {}:\n{}", name, rtype, tree);
        }

        let positive = packet.rcode == ResponseCode::NoError && !packet.answers.is_empty();
        match tree.contains_keys(&self.trust_anchors.trusted_records()) {
            Ok(TrustVerdict::Secure) => ValidationResult::Secure,
            Ok(TrustVerdict::ExistenceDenied) if positive => ValidationResult::Insecure,
            Ok(TrustVerdict::ExistenceDenied) => ValidationResult::Secure,
            Err(DnsSecError::NoDnskey) => ValidationResult::Indeterminate,
            Err(e) => {
                warn!("DNSSEC validation failed for {} {}: {}", name, rtype, e);
                ValidationResult::Bogus(e)
            }
        }
    }
}
