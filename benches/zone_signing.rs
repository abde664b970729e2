use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use dnssec_engine::ZoneSigner;
use dnssec_engine::dns::name::Name;
use dnssec_engine::dns::rdata::{Nsec3Param, Soa};
use dnssec_engine::dns::resource::{DNSResource, DNSResourceData};
use dnssec_engine::dnssec::DnsSecAlgorithm;
use dnssec_engine::sign::{KSK_FLAGS, SigningKey, ZSK_FLAGS, policy};
use dnssec_engine::zone::DnssecZone;
use std::hint::black_box;

const NOW: u32 = 1_700_000_000;

fn name(s: &str) -> Name {
    s.parse().unwrap()
}

fn keys() -> Vec<SigningKey> {
    vec![
        SigningKey::generate(name("bench.test"), KSK_FLAGS, DnsSecAlgorithm::Ed25519).unwrap(),
        SigningKey::generate(name("bench.test"), ZSK_FLAGS, DnsSecAlgorithm::EcdsaP256Sha256).unwrap(),
    ]
}

/// Apex, `hosts` address records, and a delegation with glue every 50 hosts
fn zone(hosts: usize, keys: &[SigningKey]) -> DnssecZone {
    let mut records = vec![
        DNSResource::new(
            name("bench.test"),
            3600,
            DNSResourceData::SOA(Soa {
                mname: name("ns.bench.test"),
                rname: name("hostmaster.bench.test"),
                serial: 1,
                refresh: 7200,
                retry: 3600,
                expire: 1209600,
                minimum: 300,
            }),
        ),
        DNSResource::new(name("bench.test"), 3600, DNSResourceData::NS(name("ns.bench.test"))),
    ];
    for i in 0..hosts {
        let owner = name(&format!("host{}.bench.test", i));
        records.push(DNSResource::new(
            owner,
            300,
            DNSResourceData::A([10, 0, (i / 256) as u8, (i % 256) as u8].into()),
        ));
        if i % 50 == 0 {
            let cut = name(&format!("sub{}.bench.test", i));
            let glue = cut.prepend_label(b"ns").unwrap();
            records.push(DNSResource::new(cut, 3600, DNSResourceData::NS(glue.clone())));
            records.push(DNSResource::new(glue, 3600, DNSResourceData::A([10, 1, 0, 1].into())));
        }
    }
    records.extend(keys.iter().map(|key| key.dnskey_record(3600)));
    DnssecZone::from_records(name("bench.test"), records).unwrap()
}

fn bench_zone_signing(c: &mut Criterion) {
    let keys = keys();
    let mut group = c.benchmark_group("zone signing");

    for hosts in [100, 1000] {
        group.bench_function(format!("nsec {} hosts", hosts), |b| {
            b.iter_batched(
                || zone(hosts, &keys),
                |zone| {
                    let mut signer = ZoneSigner::new(zone);
                    signer.set_current_time(NOW);
                    black_box(signer.sign_zone(&keys, policy::replace_all).unwrap())
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("nsec3 {} hosts", hosts), |b| {
            b.iter_batched(
                || zone(hosts, &keys),
                |zone| {
                    let mut signer = ZoneSigner::new(zone);
                    signer.set_current_time(NOW);
                    black_box(
                        signer
                            .sign_zone_nsec3(&keys, policy::replace_all, Nsec3Param::new(0, Vec::new()))
                            .unwrap(),
                    )
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_zone_signing);
criterion_main!(benches);
