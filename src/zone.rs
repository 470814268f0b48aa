//! Zone updates and the DNSSEC ordering chain.
//!
//! Every mutation here runs inside a transaction registered by
//! `Backend::start_transaction` and fails with
//! `BackendError::NoActiveTransaction` otherwise.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::args::Args;
use crate::backend::Backend;
use crate::db::StoreTransaction;
use crate::errors::BackendError;
use crate::types::{Comment, OrderEntry, ResourceRecord, ANY_TYPE};
use crate::utils::pattern_to_like;

fn ordername_value(ordername: &str) -> Option<String> {
    if ordername.is_empty() {
        None
    } else {
        Some(ordername.to_lowercase())
    }
}

impl Backend {
    fn insert_record(
        &self,
        tx: &StoreTransaction,
        rr: &ResourceRecord,
        ordername: &str,
    ) -> Result<(), BackendError> {
        // without DNSSEC every record is authoritative
        let auth = if self.dnssec { rr.auth } else { true };
        let args = Args::new()
            .with_text("content", &rr.content)
            .with("ttl", rr.ttl)
            .with("priority", rr.priority)
            .with_text("qtype", &rr.qtype)
            .with("domain_id", rr.domain_id)
            .with("disabled", rr.disabled)
            .with_text("qname", &rr.qname)
            .with("auth", auth)
            .with("ordername", ordername_value(ordername));
        tx.execute("insert-record-query", &args)?;
        Ok(())
    }

    fn insert_comment(&self, tx: &StoreTransaction, comment: &Comment) -> Result<(), BackendError> {
        let args = Args::new()
            .with("domain_id", comment.domain_id)
            .with_text("qname", &comment.qname)
            .with_text("qtype", &comment.qtype)
            .with("modified_at", comment.modified_at)
            .with_text("account", &comment.account)
            .with_text("content", &comment.content);
        tx.execute("insert-comment-query", &args)?;
        Ok(())
    }

    /// Insert one record inside transaction `id`.
    ///
    /// A non-empty `ordername` is stored lower-cased as the ordering key.
    pub fn feed_record(&self, id: i64, rr: &ResourceRecord, ordername: &str) -> Result<(), BackendError> {
        self.in_transaction(id, |tx| self.insert_record(tx, rr, ordername))
    }

    /// Replace the record set (`zone_id`, `qname`, `qtype`) with `rrset`.
    ///
    /// `ANY` replaces every type at `qname`. An empty `rrset` removes the
    /// record set together with its comments.
    pub fn replace_rrset(
        &self,
        id: i64,
        zone_id: i64,
        qname: &str,
        qtype: &str,
        rrset: &[ResourceRecord],
    ) -> Result<(), BackendError> {
        self.in_transaction(id, |tx| {
            let key = Args::new()
                .with("domain_id", zone_id)
                .with_text("qname", qname)
                .with_text("qtype", qtype);
            if qtype.eq_ignore_ascii_case(ANY_TYPE) {
                tx.execute("delete-names-query", &key)?;
            } else {
                tx.execute("delete-rrset-query", &key)?;
            }
            if rrset.is_empty() {
                tx.execute("delete-comment-rrset-query", &key)?;
            }
            for rr in rrset {
                self.insert_record(tx, rr, "")?;
            }
            debug!(
                "Transaction {} replaced {} {} in zone {} with {} records",
                id,
                qname,
                qtype,
                zone_id,
                rrset.len()
            );
            Ok(())
        })
    }

    /// Insert empty non-terminal rows for `nonterm` (name -> auth flag).
    ///
    /// The stored auth flag is the caller's flag or'ed with DNSSEC mode.
    pub fn feed_ents(
        &self,
        id: i64,
        zone_id: i64,
        nonterm: &BTreeMap<String, bool>,
    ) -> Result<(), BackendError> {
        self.in_transaction(id, |tx| {
            for (qname, auth) in nonterm {
                let args = Args::new()
                    .with("domain_id", zone_id)
                    .with_text("qname", qname)
                    .with("ordername", None::<String>)
                    .with("auth", *auth || self.dnssec);
                tx.execute("insert-empty-non-terminal-order-query", &args)?;
            }
            Ok(())
        })
    }

    /// Insert empty non-terminal rows for an NSEC3 zone.
    ///
    /// Names in a narrow zone, and non-authoritative names, get an ordering
    /// key from the injected hasher; the rest get none.
    pub fn feed_ents3(
        &self,
        id: i64,
        zone_id: i64,
        zone: &str,
        nonterm: &BTreeMap<String, bool>,
        narrow: bool,
    ) -> Result<(), BackendError> {
        self.require_dnssec()?;
        let needs_hash = |auth: bool| narrow || !auth;
        self.in_transaction(id, |tx| {
            if self.hasher.is_none() && nonterm.values().any(|auth| needs_hash(*auth)) {
                return Err(BackendError::HasherMissing);
            }
            for (qname, auth) in nonterm {
                let ordername = match &self.hasher {
                    Some(hasher) if needs_hash(*auth) => Some(hasher.hash(zone, qname)),
                    _ => None,
                };
                let args = Args::new()
                    .with("domain_id", zone_id)
                    .with_text("qname", qname)
                    .with("ordername", ordername)
                    .with("auth", *auth);
                tx.execute("insert-empty-non-terminal-order-query", &args)?;
            }
            Ok(())
        })
    }

    /// Add and remove empty non-terminals of a zone.
    ///
    /// With `remove_all` every empty non-terminal of the zone is deleted and
    /// `erase` is ignored. Inserted names are authoritative with no
    /// ordering key.
    pub fn update_empty_non_terminals(
        &self,
        id: i64,
        zone_id: i64,
        insert: &BTreeSet<String>,
        erase: &BTreeSet<String>,
        remove_all: bool,
    ) -> Result<(), BackendError> {
        self.in_transaction(id, |tx| {
            if remove_all {
                tx.execute(
                    "remove-empty-non-terminals-from-zone-query",
                    &Args::new().with("domain_id", zone_id),
                )?;
            } else {
                for qname in erase {
                    let args = Args::new().with("domain_id", zone_id).with_text("qname", qname);
                    tx.execute("delete-empty-non-terminal-query", &args)?;
                }
            }
            for qname in insert {
                let args = Args::new()
                    .with("domain_id", zone_id)
                    .with_text("qname", qname)
                    .with("ordername", None::<String>)
                    .with("auth", true);
                tx.execute("insert-empty-non-terminal-order-query", &args)?;
            }
            Ok(())
        })
    }

    /// Set the ordering key and auth flag of the enabled records at `qname`.
    ///
    /// `None` for `ordername` clears the key. `qtype` restricts the update
    /// to one type.
    pub fn update_dnssec_order_name_and_auth(
        &self,
        id: i64,
        zone_id: i64,
        qname: &str,
        qtype: Option<&str>,
        ordername: Option<&str>,
        auth: bool,
    ) -> Result<(), BackendError> {
        self.require_dnssec()?;
        let statement = match (ordername.is_some(), qtype.is_some()) {
            (true, false) => "update-ordername-and-auth-query",
            (true, true) => "update-ordername-and-auth-type-query",
            (false, false) => "nullify-ordername-and-update-auth-query",
            (false, true) => "nullify-ordername-and-update-auth-type-query",
        };
        let mut args = Args::new()
            .with("domain_id", zone_id)
            .with_text("qname", qname)
            .with("auth", auth);
        if let Some(ordername) = ordername {
            args = args.with("ordername", ordername.to_lowercase());
        }
        if let Some(qtype) = qtype {
            args = args.with_text("qtype", qtype);
        }
        self.in_transaction(id, |tx| tx.execute(statement, &args).map(|_| ()))
    }

    /// Insert one comment inside transaction `id`.
    pub fn feed_comment(&self, id: i64, comment: &Comment) -> Result<(), BackendError> {
        self.in_transaction(id, |tx| self.insert_comment(tx, comment))
    }

    /// Replace the comments of record set (`zone_id`, `qname`, `qtype`).
    pub fn replace_comments(
        &self,
        id: i64,
        zone_id: i64,
        qname: &str,
        qtype: &str,
        comments: &[Comment],
    ) -> Result<(), BackendError> {
        self.in_transaction(id, |tx| {
            let key = Args::new()
                .with("domain_id", zone_id)
                .with_text("qname", qname)
                .with_text("qtype", qtype);
            tx.execute("delete-comment-rrset-query", &key)?;
            for comment in comments {
                self.insert_comment(tx, comment)?;
            }
            Ok(())
        })
    }

    /// All comments of a zone.
    pub fn list_comments(&self, zone_id: i64) -> Result<Vec<Comment>, BackendError> {
        self.store.query(
            "list-comments-query",
            &Args::new().with("domain_id", zone_id),
            Comment::from_row,
        )
    }

    /// Search comments whose name or text matches a `*`/`?` pattern.
    pub fn search_comments(&self, pattern: &str, max_results: u32) -> Result<Vec<Comment>, BackendError> {
        let like = pattern_to_like(pattern);
        let args = Args::new()
            .with("value", like.clone())
            .with("value2", like)
            .with("limit", max_results);
        self.store.query("search-comments-query", &args, Comment::from_row)
    }

    /// The smallest ordering key of the zone.
    pub fn get_order_first(&self, zone_id: i64) -> Result<Option<OrderEntry>, BackendError> {
        self.store.query_one(
            "get-order-first-query",
            &Args::new().with("domain_id", zone_id),
            OrderEntry::from_row,
        )
    }

    /// The greatest ordering key less than or equal to `ordername`.
    pub fn get_order_before(&self, zone_id: i64, ordername: &str) -> Result<Option<OrderEntry>, BackendError> {
        let args = Args::new().with("domain_id", zone_id).with_text("ordername", ordername);
        self.store.query_one("get-order-before-query", &args, OrderEntry::from_row)
    }

    /// The least ordering key strictly greater than `ordername`.
    pub fn get_order_after(&self, zone_id: i64, ordername: &str) -> Result<Option<OrderEntry>, BackendError> {
        let args = Args::new().with("domain_id", zone_id).with_text("ordername", ordername);
        self.store.query_one("get-order-after-query", &args, OrderEntry::from_row)
    }

    /// The greatest non-empty ordering key of the zone.
    pub fn get_order_last(&self, zone_id: i64) -> Result<Option<OrderEntry>, BackendError> {
        self.store.query_one(
            "get-order-last-query",
            &Args::new().with("domain_id", zone_id),
            OrderEntry::from_row,
        )
    }
}
