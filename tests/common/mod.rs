//! Common test utilities for the DNSSEC engine tests
//!
//! Zone builders, key helpers and a small signed hierarchy
//! (root, `example`, and the unsigned `insecure.example`) served by a
//! [`StaticResolver`].

#![allow(dead_code)] // These functions are used by various test files

use dnssec_engine::{
    dns::{
        name::Name,
        rdata::Soa,
        resource::{DNSResource, DNSResourceData},
    },
    dnssec::{DigestType, DnsSecAlgorithm, StaticResolver, ds_from_dnskey},
    sign::{KSK_FLAGS, SigningKey, ZSK_FLAGS, policy},
    zone::DnssecZone,
    ZoneSigner,
};
use std::sync::Once;

/// Fixed clock for signing and validation
pub const NOW: u32 = 1_700_000_000;

pub const KEY_TTL: u32 = 3600;

static TRACING: Once = Once::new();

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn name(s: &str) -> Name {
    s.parse().unwrap()
}

/// SOA at `apex` with negative TTL `minimum`
pub fn soa(apex: &str, minimum: u32) -> DNSResource {
    DNSResource::new(
        name(apex),
        3600,
        DNSResourceData::SOA(Soa {
            mname: name("ns.example"),
            rname: name("hostmaster.example"),
            serial: 2024010101,
            refresh: 7200,
            retry: 3600,
            expire: 1209600,
            minimum,
        }),
    )
}

pub fn a(owner: &str, last_octet: u8) -> DNSResource {
    DNSResource::new(
        name(owner),
        300,
        DNSResourceData::A([192, 0, 2, last_octet].into()),
    )
}

pub fn ns(owner: &str, target: &str) -> DNSResource {
    DNSResource::new(name(owner), 3600, DNSResourceData::NS(name(target)))
}

pub fn txt(owner: &str, text: &str) -> DNSResource {
    DNSResource::new(
        name(owner),
        300,
        DNSResourceData::TXT(vec![text.as_bytes().to_vec()]),
    )
}

/// Key signing key (SEP) for `owner`
pub fn ksk(owner: &str) -> SigningKey {
    SigningKey::generate(name(owner), KSK_FLAGS, DnsSecAlgorithm::Ed25519).unwrap()
}

/// Zone signing key for `owner`
pub fn zsk(owner: &str) -> SigningKey {
    SigningKey::generate(name(owner), ZSK_FLAGS, DnsSecAlgorithm::EcdsaP256Sha256).unwrap()
}

/// Zone with `records` plus the DNSKEY records of `keys`
pub fn zone_with_keys(apex: &str, records: Vec<DNSResource>, keys: &[SigningKey]) -> DnssecZone {
    let dnskeys = keys.iter().map(|key| key.dnskey_record(KEY_TTL));
    DnssecZone::from_records(name(apex), records.into_iter().chain(dnskeys)).unwrap()
}

/// NSEC-sign `records` at `apex` with `keys` and return every record of the
/// signed zone
pub fn sign_records(apex: &str, records: Vec<DNSResource>, keys: &[SigningKey]) -> Vec<DNSResource> {
    let mut signer = ZoneSigner::new(zone_with_keys(apex, records, keys));
    signer.set_current_time(NOW);
    signer.sign_zone(keys, policy::replace_all).unwrap();
    signer.zone().records().cloned().collect()
}

/// SHA-256 DS record for `key`
pub fn ds_for(key: &SigningKey) -> DNSResource {
    let ds = ds_from_dnskey(key.owner(), key.dnskey(), DigestType::Sha256).unwrap();
    DNSResource::new(key.owner().clone(), KEY_TTL, DNSResourceData::DS(ds))
}

/// Signed `example` zone where a, b and d exist and c does not. Returns
/// the records and the KSK/ZSK pair that signed them.
pub fn abd_zone() -> (Vec<DNSResource>, Vec<SigningKey>) {
    init_tracing();
    let keys = vec![ksk("example"), zsk("example")];
    let records = vec![
        soa("example", 300),
        ns("example", "ns.example"),
        a("a.example", 1),
        a("b.example", 2),
        a("d.example", 4),
    ];
    let signed = sign_records("example", records, &keys);
    (signed, keys)
}

/// Signed root and `example` zones plus the unsigned `insecure.example`
pub struct Hierarchy {
    pub resolver: StaticResolver,
    /// Root KSK as a DNSKEY record, the only trust anchor the tests use
    pub root_anchor: DNSResource,
    pub example_ksk: DNSResource,
}

pub fn hierarchy() -> Hierarchy {
    init_tracing();

    let example_keys = [ksk("example"), zsk("example")];
    let example = sign_records(
        "example",
        vec![
            soa("example", 300),
            ns("example", "ns.example"),
            a("ns.example", 53),
            a("www.example", 1),
            a("www.example", 2),
            txt("www.example", "v=test"),
            ns("insecure.example", "ns.insecure.example"),
            a("ns.insecure.example", 54),
        ],
        &example_keys,
    );

    let root_keys = [ksk("."), zsk(".")];
    let root = sign_records(
        ".",
        vec![
            soa(".", 86400),
            ns(".", "a.root-servers.test"),
            ns("example", "ns.example"),
            ds_for(&example_keys[0]),
        ],
        &root_keys,
    );

    let insecure = vec![
        soa("insecure.example", 300),
        ns("insecure.example", "ns.insecure.example"),
        a("ns.insecure.example", 54),
        a("host.insecure.example", 80),
    ];

    let mut resolver = StaticResolver::new();
    resolver.add_zone(Name::root(), root);
    resolver.add_zone(name("example"), example);
    resolver.add_zone(name("insecure.example"), insecure);

    Hierarchy {
        resolver,
        root_anchor: root_keys[0].dnskey_record(KEY_TTL),
        example_ksk: example_keys[0].dnskey_record(KEY_TTL),
    }
}
