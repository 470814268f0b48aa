//! Domain, autoprimary and TSIG administration.

use chrono::Utc;
use log::{debug, info};

use crate::args::Args;
use crate::backend::Backend;
use crate::errors::BackendError;
use crate::types::{Autoprimary, DomainInfo, DomainKind, ResourceRecord, TsigKey};
use crate::utils::{soa_serial, split_masters};

impl Backend {
    /// Id of domain `name`, if it exists.
    pub fn get_domain_id(&self, name: &str) -> Result<Option<i64>, BackendError> {
        self.store.query_one(
            "get-domain-id",
            &Args::new().with_text("domain", name),
            |row| row.get(0),
        )
    }

    /// Information about domain `name`, if it exists.
    pub fn get_domain_info(&self, name: &str) -> Result<Option<DomainInfo>, BackendError> {
        let row = self.store.query_one(
            "info-zone-query",
            &Args::new().with_text("domain", name),
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            },
        )?;
        Ok(row.map(|(id, zone, master, last_check, notified, kind, account)| DomainInfo {
            id,
            zone,
            masters: split_masters(&master.unwrap_or_default()),
            last_check: last_check.unwrap_or_default(),
            serial: 0,
            notified_serial: notified.unwrap_or_default(),
            kind: DomainKind::from(kind.as_str()),
            account: account.unwrap_or_default(),
        }))
    }

    /// Every domain, with its apex SOA serial.
    ///
    /// Domains without an enabled apex SOA are only listed when
    /// `include_disabled` is set.
    pub fn get_all_domains(&self, include_disabled: bool) -> Result<Vec<DomainInfo>, BackendError> {
        let rows = self.store.query(
            "get-all-domains-query",
            &Args::new().with("include_disabled", include_disabled),
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, Option<i64>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            },
        )?;
        rows.into_iter()
            .map(|(id, zone, soa, kind, master, notified, last_check, account)| {
                Ok(DomainInfo {
                    id,
                    zone,
                    masters: split_masters(&master.unwrap_or_default()),
                    last_check: last_check.unwrap_or_default(),
                    serial: soa.as_deref().map(soa_serial).transpose()?.unwrap_or_default(),
                    notified_serial: notified.unwrap_or_default(),
                    kind: DomainKind::from(kind.as_str()),
                    account: account.unwrap_or_default(),
                })
            })
            .collect()
    }

    /// MASTER domains whose SOA serial differs from the last notified one.
    pub fn get_updated_masters(&self) -> Result<Vec<DomainInfo>, BackendError> {
        let rows = self.store.query("info-all-master-query", &Args::new(), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;
        let mut updated = Vec::new();
        for (id, zone, notified, content) in rows {
            let serial = soa_serial(&content.unwrap_or_default())?;
            let notified_serial = notified.unwrap_or_default();
            if serial != notified_serial {
                updated.push(DomainInfo {
                    id,
                    zone,
                    masters: Vec::new(),
                    last_check: 0,
                    serial,
                    notified_serial,
                    kind: DomainKind::Master,
                    account: String::new(),
                });
            }
        }
        Ok(updated)
    }

    /// Record that `serial` was notified for domain `domain_id`.
    pub fn set_notified(&self, domain_id: i64, serial: i64) -> Result<(), BackendError> {
        let args = Args::new().with("serial", serial).with("domain_id", domain_id);
        self.store.execute("update-serial-query", &args)?;
        Ok(())
    }

    /// Mark domain `domain_id` as checked now.
    pub fn set_fresh(&self, domain_id: i64) -> Result<(), BackendError> {
        let args = Args::new()
            .with("last_check", Utc::now().timestamp())
            .with("domain_id", domain_id);
        self.store.execute("update-lastcheck-query", &args)?;
        Ok(())
    }

    /// Create a domain.
    ///
    /// # Arguments
    /// * `name` - Zone name.
    /// * `kind` - Replication role.
    /// * `masters` - Primaries to transfer from, for secondaries.
    /// * `account` - Owning account, may be empty.
    pub fn create_domain(
        &self,
        name: &str,
        kind: DomainKind,
        masters: &[String],
        account: &str,
    ) -> Result<(), BackendError> {
        let args = Args::new()
            .with_text("type", kind.as_str())
            .with_text("domain", name)
            .with("masters", masters.join(" "))
            .with_text("account", account);
        self.store.execute("insert-zone-query", &args)?;
        info!("Created {} domain {}", kind, name);
        Ok(())
    }

    /// Create a secondary domain transferring from `ip` port 53.
    pub fn create_slave_domain(&self, ip: &str, domain: &str) -> Result<(), BackendError> {
        self.create_domain(domain, DomainKind::Slave, &[format!("{}:53", ip)], "")
    }

    /// Delete domain `name` with all of its records, comments, metadata and
    /// keys.
    pub fn delete_domain(&self, name: &str) -> Result<(), BackendError> {
        let domain_id = self
            .get_domain_id(name)?
            .ok_or_else(|| BackendError::DomainNotFound(name.to_owned()))?;
        self.atomically(|tx| {
            let by_id = Args::new().with("domain_id", domain_id);
            let by_name = Args::new().with_text("domain", name);
            tx.execute("delete-zone-query", &by_id)?;
            tx.execute("delete-comments-query", &by_id)?;
            tx.execute("clear-domain-all-metadata-query", &by_name)?;
            tx.execute("clear-domain-all-keys-query", &by_name)?;
            tx.execute("delete-domain-query", &by_name)?;
            Ok(())
        })?;
        info!("Deleted domain {}", name);
        Ok(())
    }

    pub fn set_masters(&self, name: &str, masters: &[String]) -> Result<(), BackendError> {
        let args = Args::new()
            .with("master", masters.join(" "))
            .with_text("domain", name);
        self.store.execute("update-master-query", &args)?;
        Ok(())
    }

    pub fn set_kind(&self, name: &str, kind: DomainKind) -> Result<(), BackendError> {
        let args = Args::new().with_text("kind", kind.as_str()).with_text("domain", name);
        self.store.execute("update-kind-query", &args)?;
        Ok(())
    }

    pub fn set_account(&self, name: &str, account: &str) -> Result<(), BackendError> {
        let args = Args::new().with_text("account", account).with_text("domain", name);
        self.store.execute("update-account-query", &args)?;
        Ok(())
    }

    /// Find the autoprimary allowed to provision `domain` from `ip`.
    ///
    /// # Arguments
    /// * `ip` - Address the NOTIFY came from.
    /// * `domain` - Zone being provisioned.
    /// * `nsset` - NS records of the zone, checked in order.
    ///
    /// # Returns
    /// The first matching nameserver and its account.
    pub fn super_master_backend(
        &self,
        ip: &str,
        domain: &str,
        nsset: &[ResourceRecord],
    ) -> Result<Option<(String, String)>, BackendError> {
        for rr in nsset {
            let args = Args::new()
                .with_text("ip", ip)
                .with_text("nameserver", &rr.content);
            let account = self.store.query_one("supermaster-query", &args, |row| row.get::<_, String>(0))?;
            if let Some(account) = account {
                debug!("Autoprimary {} ({}) may provision {}", rr.content, ip, domain);
                return Ok(Some((rr.content.clone(), account)));
            }
        }
        Ok(None)
    }

    pub fn add_autoprimary(&self, primary: &Autoprimary) -> Result<(), BackendError> {
        let args = Args::new()
            .with_text("ip", &primary.ip)
            .with_text("nameserver", &primary.nameserver)
            .with_text("account", &primary.account);
        self.store.execute("supermaster-add", &args)?;
        Ok(())
    }

    pub fn remove_autoprimary(&self, ip: &str, nameserver: &str) -> Result<(), BackendError> {
        let args = Args::new().with_text("ip", ip).with_text("nameserver", nameserver);
        self.store.execute("autoprimary-remove", &args)?;
        Ok(())
    }

    pub fn list_autoprimaries(&self) -> Result<Vec<Autoprimary>, BackendError> {
        self.store.query("list-autoprimaries", &Args::new(), |row| {
            Ok(Autoprimary {
                ip: row.get(0)?,
                nameserver: row.get(1)?,
                account: row.get(2)?,
            })
        })
    }

    /// Addresses registered for `nameserver` under `account`.
    pub fn autoprimary_ips(&self, nameserver: &str, account: &str) -> Result<Vec<String>, BackendError> {
        let args = Args::new()
            .with_text("nameserver", nameserver)
            .with_text("account", account);
        self.store.query("supermaster-name-to-ips", &args, |row| row.get(0))
    }

    /// The TSIG key called `name`, if any.
    pub fn get_tsig_key(&self, name: &str) -> Result<Option<TsigKey>, BackendError> {
        self.store.query_one(
            "get-tsig-key-query",
            &Args::new().with_text("key_name", name),
            |row| {
                Ok(TsigKey {
                    name: name.to_owned(),
                    algorithm: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    secret: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            },
        )
    }

    pub fn set_tsig_key(&self, key: &TsigKey) -> Result<(), BackendError> {
        let args = Args::new()
            .with_text("key_name", &key.name)
            .with_text("algorithm", &key.algorithm)
            .with_text("content", &key.secret);
        self.store.execute("set-tsig-key-query", &args)?;
        Ok(())
    }

    pub fn delete_tsig_key(&self, name: &str) -> Result<(), BackendError> {
        self.store.execute("delete-tsig-key-query", &Args::new().with_text("key_name", name))?;
        Ok(())
    }

    pub fn get_tsig_keys(&self) -> Result<Vec<TsigKey>, BackendError> {
        self.store.query("get-tsig-keys-query", &Args::new(), |row| {
            Ok(TsigKey {
                name: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                algorithm: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                secret: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })
    }
}
