use dnssec_engine::EngineConfig;
use dnssec_engine::error::ConfigError;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
signature_validity_secs = 604800
inception_offset_secs = 3600
max_recursion_depth = 64
nsec3_iterations = 5
nsec3_salt = "cafe"
nsec3_opt_out = true
"#
    )
    .unwrap();

    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.signature_validity_secs, 604800);
    assert_eq!(config.inception_offset_secs, 3600);
    assert_eq!(config.max_recursion_depth, 64);
    assert_eq!(config.nsec3_iterations, 5);
    assert_eq!(config.nsec3_salt_bytes().unwrap(), vec![0xca, 0xfe]);
    assert!(config.nsec3_opt_out);
    // Unset keys keep their defaults
    assert_eq!(config.max_nsec3_iterations, 2500);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = EngineConfig::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_invalid_values_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "nsec3_iterations = 3000").unwrap();
    assert!(matches!(
        EngineConfig::from_file(file.path()),
        Err(ConfigError::Invalid(_))
    ));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "signature_validity_secs = \"forever\"").unwrap();
    assert!(matches!(
        EngineConfig::from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_config_drives_signature_lifetime() {
    use dnssec_engine::dns::resource::{DNSResource, DNSResourceData};
    use dnssec_engine::dnssec::DnsSecAlgorithm;
    use dnssec_engine::sign::{SigningKey, ZSK_FLAGS, create_rrsig};

    let config = EngineConfig::from_toml_str(
        r#"
        signature_validity_secs = 86400
        inception_offset_secs = 300
        "#,
    )
    .unwrap();
    let key = SigningKey::generate("example".parse().unwrap(), ZSK_FLAGS, DnsSecAlgorithm::Ed25519).unwrap();
    let rr = DNSResource::new(
        "www.example".parse().unwrap(),
        60,
        DNSResourceData::A([192, 0, 2, 1].into()),
    );

    let sig = create_rrsig(&[rr], &key, 1_000_000, &config).unwrap();
    let rrsig = sig.as_rrsig().unwrap();
    assert_eq!(rrsig.inception, 1_000_000 - 300);
    assert_eq!(rrsig.expiration, 1_000_000 + 86400);
}
