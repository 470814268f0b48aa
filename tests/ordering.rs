mod common;

use common::backend;
use nx9_pdns_backend::{Backend, ResourceRecord};
use tempfile::TempDir;

fn chain() -> (TempDir, Backend) {
    let (dir, backend) = backend(true);
    let mut disabled = ResourceRecord::new(3, "0.example.com", "A", "192.0.2.100", 300);
    disabled.disabled = true;
    let mut glue = ResourceRecord::new(3, "ns.sub.example.com", "A", "192.0.2.53", 300);
    glue.auth = false;

    backend.start_transaction(1, 0).unwrap();
    for (rr, ordername) in [
        (ResourceRecord::new(3, "example.com", "SOA", "ns1 hostmaster 1 2 3 4 5", 300), "a"),
        (ResourceRecord::new(3, "mail.example.com", "A", "192.0.2.25", 300), "m"),
        (ResourceRecord::new(3, "zz.example.com", "A", "192.0.2.26", 300), "z"),
        (disabled, "0"),
        (glue, ""),
        (ResourceRecord::new(4, "n.example.net", "A", "198.51.100.1", 300), "n"),
    ] {
        backend.feed_record(1, &rr, ordername).unwrap();
    }
    backend.commit_transaction(1).unwrap();
    (dir, backend)
}

#[test]
fn first_and_last_ignore_the_key() {
    let (_dir, backend) = chain();
    let first = backend.get_order_first(3).unwrap().unwrap();
    assert_eq!(first.ordername, "a");
    assert_eq!(first.name, "example.com");
    assert_eq!(backend.get_order_last(3).unwrap().unwrap().ordername, "z");
}

#[test]
fn before_is_less_or_equal() {
    let (_dir, backend) = chain();
    assert_eq!(backend.get_order_before(3, "n").unwrap().unwrap().ordername, "m");
    assert_eq!(backend.get_order_before(3, "m").unwrap().unwrap().ordername, "m");
    assert!(backend.get_order_before(3, "0").unwrap().is_none());
}

#[test]
fn after_is_strictly_greater() {
    let (_dir, backend) = chain();
    let after = backend.get_order_after(3, "n").unwrap().unwrap();
    assert_eq!(after.ordername, "z");
    assert_eq!(after.name, "zz.example.com");
    assert_eq!(backend.get_order_after(3, "a").unwrap().unwrap().ordername, "m");
    assert!(backend.get_order_after(3, "z").unwrap().is_none());
}

#[test]
fn empty_zone_has_no_chain() {
    let (_dir, backend) = chain();
    assert!(backend.get_order_first(9).unwrap().is_none());
    assert!(backend.get_order_last(9).unwrap().is_none());
    assert!(backend.get_order_before(9, "m").unwrap().is_none());
    assert!(backend.get_order_after(9, "m").unwrap().is_none());
}
