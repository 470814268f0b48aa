mod common;

use common::{backend, contents, raw_connection, seed};
use nx9_pdns_backend::{Autoprimary, BackendError, DomainKind, ResourceRecord, TsigKey};

fn soa(zone_id: i64, zone: &str, serial: u32) -> ResourceRecord {
    ResourceRecord::new(
        zone_id,
        zone,
        "SOA",
        &format!("ns1.{zone}. hostmaster.{zone}. {serial} 10800 3600 604800 86400"),
        3600,
    )
}

#[test]
fn created_domains_can_be_read_back() {
    let (_dir, backend) = backend(false);
    backend
        .create_domain("example.com", DomainKind::Master, &[], "acme")
        .unwrap();
    backend.create_slave_domain("192.0.2.1", "example.net").unwrap();

    let info = backend.get_domain_info("example.com").unwrap().unwrap();
    assert_eq!(info.zone, "example.com");
    assert_eq!(info.kind, DomainKind::Master);
    assert_eq!(info.account, "acme");
    assert!(info.masters.is_empty());

    let slave = backend.get_domain_info("example.net").unwrap().unwrap();
    assert_eq!(slave.kind, DomainKind::Slave);
    assert_eq!(slave.masters, vec!["192.0.2.1:53"]);

    assert!(backend.get_domain_info("missing.example").unwrap().is_none());
    assert_eq!(backend.get_domain_id("EXAMPLE.COM").unwrap(), Some(info.id));
}

#[test]
fn domain_attributes_can_be_changed() {
    let (_dir, backend) = backend(false);
    backend.create_domain("example.com", DomainKind::Native, &[], "").unwrap();

    backend.set_kind("example.com", DomainKind::Slave).unwrap();
    backend
        .set_masters("example.com", &["192.0.2.1".into(), "192.0.2.2".into()])
        .unwrap();
    backend.set_account("example.com", "ops").unwrap();

    let info = backend.get_domain_info("example.com").unwrap().unwrap();
    assert_eq!(info.kind, DomainKind::Slave);
    assert_eq!(info.masters, vec!["192.0.2.1", "192.0.2.2"]);
    assert_eq!(info.account, "ops");

    backend.set_fresh(info.id).unwrap();
    assert!(backend.get_domain_info("example.com").unwrap().unwrap().last_check > 0);
}

#[test]
fn all_domains_report_their_serial() {
    let (_dir, backend) = backend(false);
    backend.create_domain("example.com", DomainKind::Master, &[], "").unwrap();
    backend.create_domain("empty.example", DomainKind::Native, &[], "").unwrap();
    let id = backend.get_domain_id("example.com").unwrap().unwrap();
    seed(&backend, 1, &[soa(id, "example.com", 2024010101)]);

    let domains = backend.get_all_domains(false).unwrap();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0].zone, "example.com");
    assert_eq!(domains[0].serial, 2024010101);

    let mut all: Vec<String> = backend
        .get_all_domains(true)
        .unwrap()
        .into_iter()
        .map(|d| d.zone)
        .collect();
    all.sort();
    assert_eq!(all, vec!["empty.example", "example.com"]);
}

#[test]
fn unknown_domain_kinds_are_listed_verbatim() {
    let (dir, backend) = backend(false);
    backend.create_domain("example.com", DomainKind::Master, &[], "").unwrap();
    raw_connection(&dir)
        .execute("insert into domains (name, type) values ('catalog.example', 'PRODUCER')", [])
        .unwrap();

    let mut domains = backend.get_all_domains(true).unwrap();
    domains.sort_by(|a, b| a.zone.cmp(&b.zone));
    let kinds: Vec<DomainKind> = domains.into_iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DomainKind::Other("PRODUCER".into()), DomainKind::Master]);

    let info = backend.get_domain_info("catalog.example").unwrap().unwrap();
    assert_eq!(info.kind.to_string(), "PRODUCER");
}

#[test]
fn updated_masters_track_notified_serial() {
    let (_dir, backend) = backend(false);
    backend.create_domain("example.com", DomainKind::Master, &[], "").unwrap();
    backend.create_domain("example.net", DomainKind::Slave, &[], "").unwrap();
    let com = backend.get_domain_id("example.com").unwrap().unwrap();
    let net = backend.get_domain_id("example.net").unwrap().unwrap();
    seed(&backend, 1, &[soa(com, "example.com", 5), soa(net, "example.net", 9)]);

    let updated = backend.get_updated_masters().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].zone, "example.com");
    assert_eq!(updated[0].serial, 5);
    assert_eq!(updated[0].notified_serial, 0);

    backend.set_notified(com, 5).unwrap();
    assert!(backend.get_updated_masters().unwrap().is_empty());
}

#[test]
fn deleting_a_domain_removes_its_data() {
    let (_dir, backend) = backend(true);
    backend.create_domain("example.com", DomainKind::Master, &[], "").unwrap();
    let id = backend.get_domain_id("example.com").unwrap().unwrap();
    seed(&backend, 1, &[soa(id, "example.com", 1)]);
    backend
        .set_domain_metadata("example.com", "ALSO-NOTIFY", &["192.0.2.1".into()])
        .unwrap();

    backend.delete_domain("example.com").unwrap();

    assert!(backend.get_domain_info("example.com").unwrap().is_none());
    assert!(backend.lookup("SOA", "example.com", Some(id)).unwrap().is_empty());
    assert!(backend.get_all_domain_metadata("example.com").unwrap().is_empty());
    assert!(matches!(
        backend.delete_domain("example.com"),
        Err(BackendError::DomainNotFound(_))
    ));
}

#[test]
fn lookup_filters_by_type_zone_and_disabled() {
    let (_dir, backend) = backend(false);
    let mut disabled = ResourceRecord::new(1, "www.example.com", "A", "192.0.2.3", 300);
    disabled.disabled = true;
    seed(
        &backend,
        1,
        &[
            ResourceRecord::new(1, "www.example.com", "A", "192.0.2.1", 300),
            ResourceRecord::new(1, "www.example.com", "AAAA", "2001:db8::1", 300),
            ResourceRecord::new(2, "www.example.com", "A", "192.0.2.2", 300),
            disabled,
        ],
    );

    assert_eq!(
        contents(&backend.lookup("A", "www.example.com", None).unwrap()),
        vec!["192.0.2.1", "192.0.2.2"]
    );
    assert_eq!(
        contents(&backend.lookup("A", "www.example.com", Some(1)).unwrap()),
        vec!["192.0.2.1"]
    );
    assert_eq!(
        contents(&backend.lookup("ANY", "www.example.com", Some(1)).unwrap()),
        vec!["192.0.2.1", "2001:db8::1"]
    );
    assert_eq!(backend.lookup("any", "www.example.com", None).unwrap().len(), 3);
}

#[test]
fn list_resolves_zone_by_name() {
    let (_dir, backend) = backend(false);
    backend.create_domain("example.com", DomainKind::Native, &[], "").unwrap();
    let id = backend.get_domain_id("example.com").unwrap().unwrap();
    let mut disabled = ResourceRecord::new(id, "old.example.com", "A", "192.0.2.9", 300);
    disabled.disabled = true;
    seed(
        &backend,
        1,
        &[
            ResourceRecord::new(id, "www.example.com", "A", "192.0.2.1", 300),
            ResourceRecord::new(id, "a.sub.example.com", "A", "192.0.2.2", 300),
            disabled,
        ],
    );

    assert_eq!(backend.list("example.com", None, false).unwrap().len(), 2);
    assert_eq!(backend.list("example.com", None, true).unwrap().len(), 3);
    assert!(matches!(
        backend.list("missing.example", None, false),
        Err(BackendError::DomainNotFound(_))
    ));

    let sub = backend.list_subzone("sub.example.com", id).unwrap();
    assert_eq!(contents(&sub), vec!["192.0.2.2"]);
}

#[test]
fn search_matches_names_and_content() {
    let (_dir, backend) = backend(false);
    seed(
        &backend,
        1,
        &[
            ResourceRecord::new(1, "www.example.com", "A", "192.0.2.1", 300),
            ResourceRecord::new(1, "mail.example.com", "A", "192.0.2.25", 300),
            ResourceRecord::new(1, "example.com", "TXT", "\"100% real_value\"", 300),
        ],
    );

    assert_eq!(backend.search_records("www.*", 10).unwrap().len(), 1);
    assert_eq!(backend.search_records("*.example.com", 10).unwrap().len(), 2);
    assert_eq!(backend.search_records("*.example.com", 1).unwrap().len(), 1);
    assert_eq!(backend.search_records("192.0.2.?", 10).unwrap().len(), 1);
    assert_eq!(backend.search_records("*100%*", 10).unwrap().len(), 1);
    assert!(backend.search_records("*100_*", 10).unwrap().is_empty());
}

#[test]
fn tsig_keys_round_trip() {
    let (_dir, backend) = backend(false);
    let key = TsigKey {
        name: "xfr-key".into(),
        algorithm: "hmac-sha256".into(),
        secret: "c2VjcmV0".into(),
    };
    assert!(backend.get_tsig_key("xfr-key").unwrap().is_none());

    backend.set_tsig_key(&key).unwrap();
    assert_eq!(backend.get_tsig_key("xfr-key").unwrap(), Some(key.clone()));

    let rotated = TsigKey { secret: "bmV3".into(), ..key };
    backend.set_tsig_key(&rotated).unwrap();
    assert_eq!(backend.get_tsig_keys().unwrap(), vec![rotated]);

    backend.delete_tsig_key("xfr-key").unwrap();
    assert!(backend.get_tsig_keys().unwrap().is_empty());
}

#[test]
fn autoprimaries_authorize_provisioning() {
    let (_dir, backend) = backend(false);
    backend
        .add_autoprimary(&Autoprimary {
            ip: "192.0.2.1".into(),
            nameserver: "ns2.example.com".into(),
            account: "acme".into(),
        })
        .unwrap();

    let nsset = [
        ResourceRecord::new(0, "example.org", "NS", "ns1.example.com", 3600),
        ResourceRecord::new(0, "example.org", "NS", "ns2.example.com", 3600),
    ];
    assert_eq!(
        backend.super_master_backend("192.0.2.1", "example.org", &nsset).unwrap(),
        Some(("ns2.example.com".to_string(), "acme".to_string()))
    );
    assert!(backend
        .super_master_backend("192.0.2.99", "example.org", &nsset)
        .unwrap()
        .is_none());

    assert_eq!(backend.autoprimary_ips("ns2.example.com", "acme").unwrap(), vec!["192.0.2.1"]);
    assert_eq!(backend.list_autoprimaries().unwrap().len(), 1);

    backend.remove_autoprimary("192.0.2.1", "ns2.example.com").unwrap();
    assert!(backend.list_autoprimaries().unwrap().is_empty());
}

#[test]
fn tsig_keys_with_null_columns_read_as_empty() {
    let (dir, backend) = backend(false);
    raw_connection(&dir)
        .execute("insert into tsigkeys (name, algorithm) values ('bare-key', 'hmac-md5')", [])
        .unwrap();

    let expected = TsigKey {
        name: "bare-key".into(),
        algorithm: "hmac-md5".into(),
        secret: String::new(),
    };
    assert_eq!(backend.get_tsig_key("bare-key").unwrap(), Some(expected.clone()));
    assert_eq!(backend.get_tsig_keys().unwrap(), vec![expected]);
}
