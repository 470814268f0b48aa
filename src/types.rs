//! Typed rows returned and accepted by the backend.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use rusqlite::Row;

/// Query type that matches every record type.
pub const ANY_TYPE: &str = "ANY";

/// A DNS resource record as stored in the `records` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Owning zone id.
    pub domain_id: i64,

    /// Owner name.
    pub qname: String,

    /// Record type, empty for empty non-terminals.
    pub qtype: String,

    /// Presentation-format record data.
    pub content: String,

    /// Time-to-live in seconds.
    pub ttl: u32,

    /// Priority for MX/SRV style records.
    pub priority: i64,

    /// Whether the record is disabled.
    pub disabled: bool,

    /// Whether the record is authoritative (not glue).
    pub auth: bool,

    /// Canonical ordering key, only populated by zone listings.
    pub ordername: Option<String>,
}

impl ResourceRecord {
    /// Create an enabled, authoritative record.
    pub fn new(domain_id: i64, qname: &str, qtype: &str, content: &str, ttl: u32) -> Self {
        Self {
            domain_id,
            qname: qname.to_owned(),
            qtype: qtype.to_owned(),
            content: content.to_owned(),
            ttl,
            auth: true,
            ..Self::default()
        }
    }

    /// Map a row selected with the common record column list.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
            ttl: row.get::<_, Option<u32>>(1)?.unwrap_or_default(),
            priority: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
            qtype: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            domain_id: row.get(4)?,
            disabled: row.get::<_, Option<bool>>(5)?.unwrap_or(false),
            qname: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            auth: row.get::<_, Option<bool>>(7)?.unwrap_or(true),
            ordername: None,
        })
    }

    /// Like `from_row`, with the ordering key in the ninth column.
    pub(crate) fn from_list_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut record = Self::from_row(row)?;
        record.ordername = row.get(8)?;
        Ok(record)
    }

    /// Whether this row is an empty non-terminal placeholder.
    pub fn is_empty_non_terminal(&self) -> bool {
        self.qtype.is_empty()
    }
}

/// A comment attached to a record set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    pub domain_id: i64,
    pub qname: String,
    pub qtype: String,
    /// Seconds since the Unix epoch.
    pub modified_at: i64,
    pub account: String,
    pub content: String,
}

impl Comment {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            domain_id: row.get(0)?,
            qname: row.get(1)?,
            qtype: row.get(2)?,
            modified_at: row.get(3)?,
            account: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            content: row.get(5)?,
        })
    }
}

/// Replication role of a zone.
///
/// Kinds this backend does not manage itself are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainKind {
    Master,
    Slave,
    Native,
    Other(String),
}

impl DomainKind {
    pub fn as_str(&self) -> &str {
        match self {
            DomainKind::Master => "MASTER",
            DomainKind::Slave => "SLAVE",
            DomainKind::Native => "NATIVE",
            DomainKind::Other(kind) => kind,
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DomainKind {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "MASTER" => DomainKind::Master,
            "SLAVE" => DomainKind::Slave,
            "NATIVE" => DomainKind::Native,
            _ => DomainKind::Other(s.to_owned()),
        }
    }
}

impl FromStr for DomainKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DomainKind::from(s))
    }
}

/// Information about a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainInfo {
    pub id: i64,
    pub zone: String,
    pub masters: Vec<String>,
    pub last_check: i64,
    /// Serial of the apex SOA, when known.
    pub serial: i64,
    pub notified_serial: i64,
    pub kind: DomainKind,
    pub account: String,
}

/// A DNSSEC signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyData {
    pub id: i64,
    pub flags: u32,
    pub active: bool,
    pub published: bool,
    pub content: String,
}

impl KeyData {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            flags: row.get(1)?,
            active: row.get::<_, Option<bool>>(2)?.unwrap_or(false),
            published: row.get::<_, Option<bool>>(3)?.unwrap_or(true),
            content: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        })
    }
}

/// A TSIG key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsigKey {
    pub name: String,
    pub algorithm: String,
    /// Base64 encoded secret, as stored.
    pub secret: String,
}

/// An autoprimary (supermaster) entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Autoprimary {
    pub ip: String,
    pub nameserver: String,
    pub account: String,
}

/// One position in a zone's ordering chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEntry {
    pub ordername: String,
    pub name: String,
}

impl OrderEntry {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            ordername: row.get(0)?,
            name: row.get(1)?,
        })
    }
}
