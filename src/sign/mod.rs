//! Zone signing: glue marking, denial chains and RRSIG generation.

pub mod chain;
pub mod keys;
pub mod policy;
pub mod rrsig;

pub use chain::{DenialChain, build_denial_chain};
pub use keys::{KSK_FLAGS, SigningKey, ZSK_FLAGS};
pub use policy::SignatureAction;
pub use rrsig::{create_rrsig, sign_rrset};

use std::collections::HashSet;
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::dns::enums::DNSResourceType;
use crate::dns::name::Name;
use crate::dns::rdata::Nsec3Param;
use crate::dns::resource::{DNSResource, DNSResourceData};
use crate::dnssec::unix_now;
use crate::error::{DnsSecError, Result};
use crate::zone::DnssecZone;

/// Progress of a signing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SigningState {
    Unsigned,
    GlueMarked,
    ChainBuilt,
    Signed,
}

/// Apply `policy` to existing signatures, dropping the ones it removes and
/// switching off keys it says not to sign with again
fn retain_signatures<P>(
    signatures: &mut Vec<DNSResource>,
    keys: &[SigningKey],
    enabled: &mut [bool],
    policy: &mut P,
) where
    P: FnMut(Option<&DNSResource>) -> SignatureAction,
{
    if signatures.is_empty() {
        if !policy(None).adds_new() {
            enabled.iter_mut().for_each(|use_key| *use_key = false);
        }
        return;
    }

    signatures.retain(|sig| {
        let action = policy(Some(sig));
        if !action.adds_new() {
            if let Some(rrsig) = sig.as_rrsig() {
                for (key, use_key) in keys.iter().zip(enabled.iter_mut()) {
                    if key.key_tag() == rrsig.key_tag && key.algorithm().to_u8() == rrsig.algorithm {
                        *use_key = false;
                    }
                }
            }
        }
        action.keeps()
    });
}

/// Sign every RRset and denial record of every non-glue name.
///
/// At a delegation only the DS RRset and the denial record are signed.
/// Returns the signatures that were created.
pub fn sign_rrsets<P>(
    zone: &mut DnssecZone,
    keys: &[SigningKey],
    mut policy: P,
    now: u32,
    config: &EngineConfig,
) -> Result<Vec<DNSResource>>
where
    P: FnMut(Option<&DNSResource>) -> SignatureAction,
{
    if keys.is_empty() {
        return Err(DnsSecError::EmptyInput);
    }

    let cuts: HashSet<Name> = zone
        .names()
        .filter(|node| zone.is_delegation(node.name()))
        .map(|node| node.name().clone())
        .collect();

    let mut created = Vec::new();
    for node in zone.names_mut() {
        if node.is_glue() {
            continue;
        }
        let at_cut = cuts.contains(node.name());

        for set in node.rrsets_mut() {
            let rtype = set.rtype();
            if set.is_empty() || (at_cut && rtype != DNSResourceType::DS) {
                continue;
            }

            let mut enabled = vec![true; keys.len()];
            retain_signatures(set.signatures_mut(), keys, &mut enabled, &mut policy);

            for (key, _) in keys
                .iter()
                .zip(&enabled)
                .filter(|(key, use_key)| **use_key && key.signs(rtype))
            {
                let sig = create_rrsig(set.records(), key, now, config)?;
                set.signatures_mut().push(sig.clone());
                created.push(sig);
            }
        }

        if let Some(denial) = node.denial().cloned() {
            let mut enabled = vec![true; keys.len()];
            retain_signatures(node.denial_signatures_mut(), keys, &mut enabled, &mut policy);

            for (key, _) in keys
                .iter()
                .zip(&enabled)
                .filter(|(key, use_key)| **use_key && key.signs(denial.rtype()))
            {
                let sig = create_rrsig(std::slice::from_ref(&denial), key, now, config)?;
                node.denial_signatures_mut().push(sig.clone());
                created.push(sig);
            }
        }
    }

    debug!("Created {} signatures in {}", created.len(), zone.apex());
    Ok(created)
}

/// Drives one zone through `Unsigned -> GlueMarked -> ChainBuilt -> Signed`
#[derive(Debug)]
pub struct ZoneSigner {
    zone: DnssecZone,
    config: EngineConfig,
    state: SigningState,
    current_time: Option<u32>,
}

impl ZoneSigner {
    pub fn new(zone: DnssecZone) -> Self {
        Self {
            zone,
            config: EngineConfig::default(),
            state: SigningState::Unsigned,
            current_time: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sign as if the clock read `time`
    pub fn set_current_time(&mut self, time: u32) {
        self.current_time = Some(time);
    }

    fn now(&self) -> u32 {
        self.current_time.unwrap_or_else(unix_now)
    }

    pub fn state(&self) -> SigningState {
        self.state
    }

    pub fn zone(&self) -> &DnssecZone {
        &self.zone
    }

    pub fn into_zone(self) -> DnssecZone {
        self.zone
    }

    /// NSEC3 parameters from the configuration
    pub fn default_nsec3_params(&self) -> Result<Nsec3Param> {
        let salt = self
            .config
            .nsec3_salt_bytes()
            .map_err(|e| DnsSecError::InvalidNsec3Parameters(e.to_string()))?;
        Ok(Nsec3Param::new(self.config.nsec3_iterations, salt))
    }

    pub fn mark_glue(&mut self) -> usize {
        let glue = self.zone.mark_glue();
        self.state = SigningState::GlueMarked;
        glue
    }

    /// Build the denial chain. Glue is marked first if that has not
    /// happened yet; NSEC3 also synthesizes empty non-terminals and adds
    /// an NSEC3PARAM record at the apex when there is none.
    pub fn build_denial_chain(&mut self, chain: &DenialChain) -> Result<Vec<DNSResource>> {
        if self.state == SigningState::Unsigned {
            self.mark_glue();
        }

        let mut created = Vec::new();
        if let DenialChain::Nsec3 { params, .. } = chain {
            self.zone.add_empty_non_terminals();

            let apex = self.zone.apex().clone();
            if self.zone.find_rrset(&apex, DNSResourceType::NSEC3PARAM).is_none() {
                let ttl = self
                    .zone
                    .soa()
                    .and_then(|rr| rr.as_soa())
                    .map(|soa| soa.minimum)
                    .ok_or_else(|| DnsSecError::NotFound(format!("SOA for {}", apex)))?;
                let param = DNSResource::new(
                    apex,
                    ttl,
                    DNSResourceData::NSEC3PARAM(Nsec3Param {
                        flags: 0,
                        ..params.clone()
                    }),
                );
                trace!("Adding {}", param);
                self.zone.add_record(param.clone())?;
                created.push(param);
            }
        }

        created.extend(build_denial_chain(&mut self.zone, chain)?);
        self.state = SigningState::ChainBuilt;
        Ok(created)
    }

    /// Sign every RRset with `keys`, asking `policy` about old signatures
    pub fn sign_rrsets<P>(&mut self, keys: &[SigningKey], policy: P) -> Result<Vec<DNSResource>>
    where
        P: FnMut(Option<&DNSResource>) -> SignatureAction,
    {
        if self.state == SigningState::Unsigned {
            self.mark_glue();
        }
        let now = self.now();
        let created = sign_rrsets(&mut self.zone, keys, policy, now, &self.config)?;
        self.state = SigningState::Signed;
        Ok(created)
    }

    /// Full NSEC signing run. Returns every record added to the zone.
    pub fn sign_zone<P>(&mut self, keys: &[SigningKey], policy: P) -> Result<Vec<DNSResource>>
    where
        P: FnMut(Option<&DNSResource>) -> SignatureAction,
    {
        self.mark_glue();
        let mut added = self.build_denial_chain(&DenialChain::Nsec)?;
        added.extend(self.sign_rrsets(keys, policy)?);
        info!("Signed zone {} with NSEC: {} new records", self.zone.apex(), added.len());
        Ok(added)
    }

    /// Full NSEC3 signing run. Returns every record added to the zone.
    pub fn sign_zone_nsec3<P>(
        &mut self,
        keys: &[SigningKey],
        policy: P,
        params: Nsec3Param,
    ) -> Result<Vec<DNSResource>>
    where
        P: FnMut(Option<&DNSResource>) -> SignatureAction,
    {
        self.mark_glue();
        let chain = DenialChain::Nsec3 {
            params,
            opt_out: self.config.nsec3_opt_out,
        };
        let mut added = self.build_denial_chain(&chain)?;
        added.extend(self.sign_rrsets(keys, policy)?);
        info!("Signed zone {} with NSEC3: {} new records", self.zone.apex(), added.len());
        Ok(added)
    }
}
