//! The statement catalog.
//!
//! Every statement the backend issues is declared here by name. The catalog
//! is compiled once when the backend is built and never changes afterwards,
//! so it can be shared between threads without locking.

use std::collections::HashMap;

use rusqlite::types::Value;

use crate::args::Args;
use crate::errors::BackendError;
use crate::query::{compile, CompiledStatement};

macro_rules! record_query {
    () => {
        "SELECT content,ttl,prio,type,domain_id,disabled,name,auth FROM records WHERE"
    };
}

/// Statement templates keyed by name.
pub const TEMPLATES: &[(&str, &str)] = &[
    ("basic-query", concat!(record_query!(), " disabled=0 and type=:qtype and name=:qname")),
    ("id-query", concat!(record_query!(), " disabled=0 and type=:qtype and name=:qname and domain_id=:domain_id")),
    ("any-query", concat!(record_query!(), " disabled=0 and name=:qname")),
    ("any-id-query", concat!(record_query!(), " disabled=0 and name=:qname and domain_id=:domain_id")),
    ("list-query", "SELECT content,ttl,prio,type,domain_id,disabled,name,auth,ordername FROM records WHERE (disabled=0 OR :include_disabled) and domain_id=:domain_id order by name, type"),
    ("list-subzone-query", concat!(record_query!(), " disabled=0 and (name=:zone OR name like :wildzone) and domain_id=:domain_id")),

    ("remove-empty-non-terminals-from-zone-query", "delete from records where domain_id=:domain_id and type is null"),
    ("delete-empty-non-terminal-query", "delete from records where domain_id=:domain_id and name=:qname and type is null"),

    ("info-zone-query", "select id,name,master,last_check,notified_serial,type,account from domains where name=:domain"),
    ("get-domain-id", "select id from domains where name=:domain"),

    ("supermaster-query", "select account from supermasters where ip=:ip and nameserver=:nameserver"),
    ("supermaster-name-to-ips", "select ip,account from supermasters where nameserver=:nameserver and account=:account"),
    ("supermaster-add", "insert into supermasters (ip, nameserver, account) values (:ip,:nameserver,:account)"),
    ("autoprimary-remove", "delete from supermasters where ip = :ip and nameserver = :nameserver"),
    ("list-autoprimaries", "select ip,nameserver,account from supermasters"),

    ("insert-zone-query", "insert into domains (type,name,master,account,last_check,notified_serial) values(:type, :domain, :masters, :account, null, null)"),

    ("insert-record-query", "insert into records (content,ttl,prio,type,domain_id,disabled,name,ordername,auth) values (:content,:ttl,:priority,:qtype,:domain_id,:disabled,:qname,:ordername,:auth)"),
    ("insert-empty-non-terminal-order-query", "insert into records (type,domain_id,disabled,name,ordername,auth,ttl,prio,content) values (null,:domain_id,0,:qname,:ordername,:auth,null,null,null)"),

    ("get-order-first-query", "select ordername, name from records where disabled=0 and domain_id=:domain_id and ordername is not null order by 1 asc limit 1"),
    ("get-order-before-query", "select ordername, name from records where disabled=0 and ordername <= :ordername and domain_id=:domain_id and ordername is not null order by 1 desc limit 1"),
    ("get-order-after-query", "select ordername, name from records where disabled=0 and ordername > :ordername and domain_id=:domain_id and ordername is not null order by 1 asc limit 1"),
    ("get-order-last-query", "select ordername, name from records where disabled=0 and ordername != '' and domain_id=:domain_id and ordername is not null order by 1 desc limit 1"),

    ("update-ordername-and-auth-query", "update records set ordername=:ordername,auth=:auth where domain_id=:domain_id and name=:qname and disabled=0"),
    ("update-ordername-and-auth-type-query", "update records set ordername=:ordername,auth=:auth where domain_id=:domain_id and name=:qname and type=:qtype and disabled=0"),
    ("nullify-ordername-and-update-auth-query", "update records set ordername=NULL,auth=:auth where domain_id=:domain_id and name=:qname and disabled=0"),
    ("nullify-ordername-and-update-auth-type-query", "update records set ordername=NULL,auth=:auth where domain_id=:domain_id and name=:qname and type=:qtype and disabled=0"),

    ("update-master-query", "update domains set master=:master where name=:domain"),
    ("update-kind-query", "update domains set type=:kind where name=:domain"),
    ("update-account-query", "update domains set account=:account where name=:domain"),
    ("update-serial-query", "update domains set notified_serial=:serial where id=:domain_id"),
    ("update-lastcheck-query", "update domains set last_check=:last_check where id=:domain_id"),
    ("info-all-master-query", "select domains.id, domains.name, domains.notified_serial, records.content from records join domains on records.domain_id=domains.id and records.name=domains.name where records.type='SOA' and records.disabled=0 and domains.type='MASTER'"),
    ("delete-domain-query", "delete from domains where name=:domain"),
    ("delete-zone-query", "delete from records where domain_id=:domain_id"),
    ("delete-rrset-query", "delete from records where domain_id=:domain_id and name=:qname and type=:qtype"),
    ("delete-names-query", "delete from records where domain_id=:domain_id and name=:qname"),

    ("add-domain-key-query", "insert into cryptokeys (domain_id, flags, active, published, content) select id, :flags, :active, :published, :content from domains where name=:domain"),
    ("get-last-inserted-key-id-query", "select last_insert_rowid()"),
    ("list-domain-keys-query", "select cryptokeys.id, flags, active, published, content from domains, cryptokeys where cryptokeys.domain_id=domains.id and name=:domain"),
    ("get-all-domain-metadata-query", "select kind,content from domains, domainmetadata where domainmetadata.domain_id=domains.id and name=:domain"),
    ("get-domain-metadata-query", "select content from domains, domainmetadata where domainmetadata.domain_id=domains.id and name=:domain and domainmetadata.kind=:kind"),
    ("clear-domain-metadata-query", "delete from domainmetadata where domain_id=(select id from domains where name=:domain) and domainmetadata.kind=:kind"),
    ("clear-domain-all-metadata-query", "delete from domainmetadata where domain_id=(select id from domains where name=:domain)"),
    ("set-domain-metadata-query", "insert into domainmetadata (domain_id, kind, content) select id, :kind, :content from domains where name=:domain"),
    ("activate-domain-key-query", "update cryptokeys set active=1 where domain_id=(select id from domains where name=:domain) and cryptokeys.id=:key_id"),
    ("deactivate-domain-key-query", "update cryptokeys set active=0 where domain_id=(select id from domains where name=:domain) and cryptokeys.id=:key_id"),
    ("publish-domain-key-query", "update cryptokeys set published=1 where domain_id=(select id from domains where name=:domain) and cryptokeys.id=:key_id"),
    ("unpublish-domain-key-query", "update cryptokeys set published=0 where domain_id=(select id from domains where name=:domain) and cryptokeys.id=:key_id"),
    ("remove-domain-key-query", "delete from cryptokeys where domain_id=(select id from domains where name=:domain) and cryptokeys.id=:key_id"),
    ("clear-domain-all-keys-query", "delete from cryptokeys where domain_id=(select id from domains where name=:domain)"),
    ("get-tsig-key-query", "select algorithm, secret from tsigkeys where name=:key_name"),
    ("set-tsig-key-query", "replace into tsigkeys (name,algorithm,secret) values(:key_name,:algorithm,:content)"),
    ("delete-tsig-key-query", "delete from tsigkeys where name=:key_name"),
    ("get-tsig-keys-query", "select name,algorithm, secret from tsigkeys"),

    ("get-all-domains-query", "select domains.id, domains.name, records.content, domains.type, domains.master, domains.notified_serial, domains.last_check, domains.account from domains LEFT JOIN records ON records.domain_id=domains.id AND records.type='SOA' AND records.name=domains.name WHERE records.disabled=0 OR :include_disabled"),

    ("list-comments-query", "SELECT domain_id,name,type,modified_at,account,comment FROM comments WHERE domain_id=:domain_id"),
    ("insert-comment-query", "INSERT INTO comments (domain_id, name, type, modified_at, account, comment) VALUES (:domain_id, :qname, :qtype, :modified_at, :account, :content)"),
    ("delete-comment-rrset-query", "DELETE FROM comments WHERE domain_id=:domain_id AND name=:qname AND type=:qtype"),
    ("delete-comments-query", "DELETE FROM comments WHERE domain_id=:domain_id"),
    ("search-records-query", concat!(record_query!(), " name LIKE :value ESCAPE '\\' OR content LIKE :value2 ESCAPE '\\' LIMIT :limit")),
    ("search-comments-query", "SELECT domain_id,name,type,modified_at,account,comment FROM comments WHERE name LIKE :value ESCAPE '\\' OR comment LIKE :value2 ESCAPE '\\' LIMIT :limit"),
];

/// Compiled statements keyed by name.
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    statements: HashMap<String, CompiledStatement>,
}

impl QueryCatalog {
    /// Compile the built-in statement set.
    ///
    /// # Returns
    /// The catalog, or `BackendError::Parse` if any template is malformed.
    pub fn new() -> Result<Self, BackendError> {
        Self::from_templates(TEMPLATES.iter().copied())
    }

    /// Compile an arbitrary set of templates.
    pub fn from_templates<'a, I>(templates: I) -> Result<Self, BackendError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let statements = templates
            .into_iter()
            .map(|(name, template)| Ok((name.to_owned(), compile(template)?)))
            .collect::<Result<HashMap<_, _>, BackendError>>()?;
        Ok(Self { statements })
    }

    /// Look up a compiled statement by name.
    pub fn statement(&self, name: &str) -> Result<&CompiledStatement, BackendError> {
        self.statements
            .get(name)
            .ok_or_else(|| BackendError::UnknownStatement(name.to_owned()))
    }

    /// Resolve a statement name and bind its arguments.
    ///
    /// # Arguments
    /// * `name` - Symbolic statement name.
    /// * `args` - Named arguments; missing names bind `NULL`.
    ///
    /// # Returns
    /// The positional SQL text and one value per `?` marker.
    pub fn prepare(&self, name: &str, args: &Args) -> Result<(&str, Vec<Value>), BackendError> {
        let statement = self.statement(name)?;
        Ok((statement.sql.as_str(), args.bind(&statement.names)))
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_compile() {
        let catalog = QueryCatalog::new().unwrap();
        assert_eq!(catalog.len(), TEMPLATES.len());
    }

    #[test]
    fn prepare_binds_by_name() {
        let catalog = QueryCatalog::new().unwrap();
        let args = Args::new()
            .with("domain_id", 7i64)
            .with_text("qname", "www.example.com")
            .with_text("qtype", "A");
        let (sql, params) = catalog.prepare("id-query", &args).unwrap();
        assert!(sql.ends_with("disabled=0 and type=? and name=? and domain_id=?"));
        assert_eq!(
            params,
            vec![
                Value::Text("A".into()),
                Value::Text("www.example.com".into()),
                Value::Integer(7),
            ]
        );
    }

    #[test]
    fn search_keeps_escape_literal() {
        let catalog = QueryCatalog::new().unwrap();
        let statement = catalog.statement("search-records-query").unwrap();
        assert!(statement.sql.contains("ESCAPE '\\'"));
        assert_eq!(statement.names, vec!["value", "value2", "limit"]);
    }

    #[test]
    fn unknown_statement_is_reported() {
        let catalog = QueryCatalog::new().unwrap();
        assert!(matches!(
            catalog.prepare("no-such-query", &Args::new()),
            Err(BackendError::UnknownStatement(name)) if name == "no-such-query"
        ));
    }

    #[test]
    fn malformed_template_fails_the_catalog() {
        let result = QueryCatalog::from_templates([("ok", "select :a"), ("bad", "select : a")]);
        assert!(matches!(result, Err(BackendError::Parse { .. })));
    }
}
