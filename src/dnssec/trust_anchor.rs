use base64::{Engine as _, engine::general_purpose::STANDARD};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::constants::{ROOT_KSK_2017_KEY_TAG, ROOT_KSK_2024_KEY_TAG};
use super::digest::ds_equivalent;
use crate::dns::enums::DNSResourceType;
use crate::dns::name::Name;
use crate::dns::rdata::{Dnskey, Ds};
use crate::dns::resource::{DNSResource, DNSResourceData};
use crate::error::{DnsSecError, Result};

/// Root KSK-2017 (key tag 20326)
const ROOT_KSK_2017: &str = "AwEAAaz/tAm8yTn4Mfeh5eyI96WSVexTBAvkMgJzkKTOiW1vkIbzxeF3\
    +/4RgWOq7HrxRixHlFlExOLAJr5emLvN7SWXgnLh4+B5xQlNVz8Og8kv\
    ArMtNROxVQuCaSnIDdD5LKyWbRd2n9WGe2R8PzgCmr3EgVLrjyBxWezF\
    0jLHwVN8efS3rCj/EWgvIWgb9tarpVUDK/b58Da+sqqls3eNbuv7pr+e\
    oZG+SrDK6nWeL3c6H5Apxz7LjVc1uTIdsIXxuOLYA4/ilBmSVIzuDWfd\
    RUfhHdY6+cn8HFRm+2hM8AnXGXws9555KrUB5qihylGa8subX2Nn6UwN\
    R1AkUTV74bU=";

/// SHA-256 DS digest of the root KSK-2024 (key tag 38696)
const ROOT_KSK_2024_DS: &str = "683D2D0ACB8C9B712A1948B27F741219298D0A450D612C483AF444A4C0FB2B16";

/// Trust anchor store: DNSKEY or DS records trusted without proof
pub struct TrustAnchorStore {
    /// Map of owner name -> anchors
    anchors: Arc<RwLock<HashMap<Name, Vec<DNSResource>>>>,
}

impl TrustAnchorStore {
    /// Create a new trust anchor store with default root trust anchors
    pub fn new() -> Self {
        let mut store = Self::empty();
        store.add_root_trust_anchors();
        store
    }

    /// A store with no anchors at all
    pub fn empty() -> Self {
        Self {
            anchors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add the current root trust anchors
    fn add_root_trust_anchors(&mut self) {
        let mut roots = Vec::new();

        let compact: String = ROOT_KSK_2017.split_whitespace().collect();
        match STANDARD.decode(compact) {
            Ok(public_key) => {
                let key = Dnskey::new(257, 8, public_key);
                debug_assert_eq!(key.key_tag(), ROOT_KSK_2017_KEY_TAG);
                roots.push(DNSResource::new(Name::root(), 172800, DNSResourceData::DNSKEY(key)));
            }
            Err(e) => debug!("Root KSK-2017 did not decode: {}", e),
        }

        match hex::decode(ROOT_KSK_2024_DS) {
            Ok(digest) => roots.push(DNSResource::new(
                Name::root(),
                172800,
                DNSResourceData::DS(Ds {
                    key_tag: ROOT_KSK_2024_KEY_TAG,
                    algorithm: 8,
                    digest_type: 2,
                    digest,
                }),
            )),
            Err(e) => debug!("Root KSK-2024 DS did not decode: {}", e),
        }

        self.anchors.write().insert(Name::root(), roots);
    }

    /// Add a trust anchor. Only DNSKEY and DS records can be anchors.
    pub fn add_anchor(&self, anchor: DNSResource) -> Result<()> {
        if !matches!(anchor.rtype(), DNSResourceType::DNSKEY | DNSResourceType::DS) {
            return Err(DnsSecError::NotFound(format!(
                "trust anchor must be DNSKEY or DS, got {}",
                anchor.rtype()
            )));
        }
        self.insert(anchor);
        Ok(())
    }

    pub fn add_dnskey(&self, owner: Name, dnskey: Dnskey) {
        self.insert(DNSResource::new(owner, 0, DNSResourceData::DNSKEY(dnskey)));
    }

    pub fn add_ds(&self, owner: Name, ds: Ds) {
        self.insert(DNSResource::new(owner, 0, DNSResourceData::DS(ds)));
    }

    fn insert(&self, anchor: DNSResource) {
        let mut anchors = self.anchors.write();
        let entry = anchors.entry(anchor.name.clone()).or_default();
        if !entry.iter().any(|rr| rr.is_duplicate_of(&anchor)) {
            entry.push(anchor);
        }
    }

    /// Get trust anchors for a domain: its own, else the closest ancestor's
    pub fn get_anchors(&self, domain: &Name) -> Option<Vec<DNSResource>> {
        let anchors = self.anchors.read();
        let mut candidate = Some(domain.clone());
        while let Some(current) = candidate {
            if let Some(found) = anchors.get(&current) {
                return Some(found.clone());
            }
            candidate = current.parent();
        }
        None
    }

    /// Every anchor in the store
    pub fn trusted_records(&self) -> Vec<DNSResource> {
        self.anchors.read().values().flatten().cloned().collect()
    }

    /// Find a trust anchor by key tag
    pub fn find_by_key_tag(&self, domain: &Name, key_tag: u16) -> Option<DNSResource> {
        self.get_anchors(domain)?.into_iter().find(|rr| match &rr.rdata {
            DNSResourceData::DNSKEY(key) => key.key_tag() == key_tag,
            DNSResourceData::DS(ds) => ds.key_tag == key_tag,
            _ => false,
        })
    }

    /// Whether `rr` is an anchor, or a key some DS anchor vouches for
    pub fn is_trusted(&self, rr: &DNSResource) -> bool {
        self.anchors
            .read()
            .get(&rr.name)
            .is_some_and(|anchors| anchors.iter().any(|anchor| ds_equivalent(rr, anchor)))
    }

    /// Clear all trust anchors (useful for testing)
    pub fn clear(&self) {
        self.anchors.write().clear();
    }

    /// Get the number of domains with trust anchors
    pub fn domain_count(&self) -> usize {
        self.anchors.read().len()
    }
}

impl Default for TrustAnchorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dnssec::digest::{DigestType, ds_from_dnskey};

    #[test]
    fn test_root_anchors() {
        let store = TrustAnchorStore::new();
        assert_eq!(store.domain_count(), 1);
        let roots = store.get_anchors(&Name::root()).unwrap();
        assert_eq!(roots.len(), 2);
        assert!(store.find_by_key_tag(&Name::root(), ROOT_KSK_2017_KEY_TAG).is_some());
        assert!(store.find_by_key_tag(&Name::root(), ROOT_KSK_2024_KEY_TAG).is_some());

        let ksk = store.find_by_key_tag(&Name::root(), ROOT_KSK_2017_KEY_TAG).unwrap();
        let ds = ds_from_dnskey(&Name::root(), ksk.as_dnskey().unwrap(), DigestType::Sha256).unwrap();
        assert_eq!(
            hex::encode_upper(&ds.digest),
            "E06D44B80B8F1D39A95C0B0D7C65D08458E880409BBC683457104237C7F8EC8D"
        );
    }

    #[test]
    fn test_closest_ancestor_lookup() {
        let store = TrustAnchorStore::new();
        let anchors = store.get_anchors(&"www.example.com".parse().unwrap()).unwrap();
        assert_eq!(anchors.len(), 2);

        store.clear();
        assert!(store.get_anchors(&"www.example.com".parse().unwrap()).is_none());
    }

    #[test]
    fn test_add_anchor() {
        let store = TrustAnchorStore::empty();
        let owner: Name = "example".parse().unwrap();
        let key = DNSResource::new(owner.clone(), 3600, DNSResourceData::DNSKEY(Dnskey::new(257, 15, vec![7; 32])));
        store.add_anchor(key.clone()).unwrap();
        store.add_dnskey(owner.clone(), Dnskey::new(257, 15, vec![7; 32]));
        assert_eq!(store.trusted_records().len(), 1);
        assert!(store.is_trusted(&key));

        let a = DNSResource::new(owner, 3600, DNSResourceData::A([192, 0, 2, 1].into()));
        assert!(store.add_anchor(a).is_err());
    }

    #[test]
    fn test_ds_anchor_trusts_key() {
        let store = TrustAnchorStore::empty();
        let owner: Name = "example".parse().unwrap();
        let dnskey = Dnskey::new(257, 15, vec![9; 32]);
        let ds = ds_from_dnskey(&owner, &dnskey, DigestType::Sha256).unwrap();
        store.add_ds(owner.clone(), ds);
        assert!(store.is_trusted(&DNSResource::new(owner, 60, DNSResourceData::DNSKEY(dnskey))));
    }
}
