//! DNSSEC key and zone metadata management.

use std::collections::BTreeMap;

use log::debug;

use crate::args::Args;
use crate::backend::Backend;
use crate::errors::BackendError;
use crate::types::KeyData;

impl Backend {
    fn key_args(name: &str, key_id: i64) -> Args {
        Args::new().with_text("domain", name).with("key_id", key_id)
    }

    fn update_key(&self, statement: &str, name: &str, key_id: i64) -> Result<(), BackendError> {
        self.require_dnssec()?;
        self.store.execute(statement, &Self::key_args(name, key_id))?;
        Ok(())
    }

    /// Store a signing key for domain `name`.
    ///
    /// # Returns
    /// The id of the new key, or `BackendError::DomainNotFound` if the
    /// domain does not exist.
    pub fn add_domain_key(&self, name: &str, key: &KeyData) -> Result<i64, BackendError> {
        self.require_dnssec()?;
        let args = Args::new()
            .with_text("domain", name)
            .with("flags", key.flags)
            .with("active", key.active)
            .with("published", key.published)
            .with_text("content", &key.content);
        let id = self.atomically(|tx| {
            if tx.execute("add-domain-key-query", &args)? == 0 {
                return Err(BackendError::DomainNotFound(name.to_owned()));
            }
            let ids = tx.query("get-last-inserted-key-id-query", &Args::new(), |row| row.get::<_, i64>(0))?;
            Ok(ids.into_iter().next().unwrap_or_default())
        })?;
        debug!("Added key {} to {}", id, name);
        Ok(id)
    }

    /// All signing keys of domain `name`.
    pub fn get_domain_keys(&self, name: &str) -> Result<Vec<KeyData>, BackendError> {
        self.require_dnssec()?;
        self.store.query(
            "list-domain-keys-query",
            &Args::new().with_text("domain", name),
            KeyData::from_row,
        )
    }

    pub fn remove_domain_key(&self, name: &str, key_id: i64) -> Result<(), BackendError> {
        self.update_key("remove-domain-key-query", name, key_id)
    }

    pub fn activate_domain_key(&self, name: &str, key_id: i64) -> Result<(), BackendError> {
        self.update_key("activate-domain-key-query", name, key_id)
    }

    pub fn deactivate_domain_key(&self, name: &str, key_id: i64) -> Result<(), BackendError> {
        self.update_key("deactivate-domain-key-query", name, key_id)
    }

    pub fn publish_domain_key(&self, name: &str, key_id: i64) -> Result<(), BackendError> {
        self.update_key("publish-domain-key-query", name, key_id)
    }

    pub fn unpublish_domain_key(&self, name: &str, key_id: i64) -> Result<(), BackendError> {
        self.update_key("unpublish-domain-key-query", name, key_id)
    }

    /// Every metadata kind of domain `name` with its values.
    pub fn get_all_domain_metadata(&self, name: &str) -> Result<BTreeMap<String, Vec<String>>, BackendError> {
        let rows = self.store.query(
            "get-all-domain-metadata-query",
            &Args::new().with_text("domain", name),
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?.unwrap_or_default())),
        )?;
        let mut meta: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (kind, content) in rows {
            meta.entry(kind).or_default().push(content);
        }
        Ok(meta)
    }

    /// Values of one metadata kind of domain `name`.
    pub fn get_domain_metadata(&self, name: &str, kind: &str) -> Result<Vec<String>, BackendError> {
        let args = Args::new().with_text("domain", name).with_text("kind", kind);
        self.store.query("get-domain-metadata-query", &args, |row| {
            Ok(row.get::<_, Option<String>>(0)?.unwrap_or_default())
        })
    }

    /// Replace the values of one metadata kind. Empty `values` clears it.
    pub fn set_domain_metadata(&self, name: &str, kind: &str, values: &[String]) -> Result<(), BackendError> {
        self.require_dnssec()?;
        self.atomically(|tx| {
            let key = Args::new().with_text("domain", name).with_text("kind", kind);
            tx.execute("clear-domain-metadata-query", &key)?;
            for value in values {
                tx.execute("set-domain-metadata-query", &key.clone().with_text("content", value))?;
            }
            Ok(())
        })
    }
}
