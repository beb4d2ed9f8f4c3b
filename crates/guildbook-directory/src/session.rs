//! Connection provisioning against the directory server.
//!
//! Every request gets at most one connection: opened, bound for that
//! operation's authentication context, used, and torn down. There is no
//! pooling and no reuse across requests. The `LdapSession`/`LdapConnector`
//! seams keep the transport mockable in tests.

use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use native_tls::{Certificate, TlsConnector};
use secrecy::SecretString;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::dn::DistinguishedName;
use crate::record::RawEntry;
use crate::Result;
use guildbook_core::{DirectorySettings, Error};

// LDAP resultCode 49 (invalidCredentials).
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Authentication context for one directory operation.
///
/// Reads run under the fixed service identity (anonymous when none is
/// configured). Writes bind as the target record's own identity with the
/// secret submitted for that one request; the context is dropped with the
/// connection and is never logged or persisted.
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// Low-privilege service identity, used for all reads.
    Service,
    /// The target record's own identity, used for a single write.
    BoundAs {
        /// Entry to bind as.
        dn: DistinguishedName,
        /// Secret submitted with the write request.
        password: SecretString,
    },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapSession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<RawEntry>>;
    async fn replace(&mut self, dn: &str, attribute: &str, values: Vec<String>) -> Result<()>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// Real connector backed by `ldap3`.
pub(crate) struct RealLdapConnector {
    settings: Arc<DirectorySettings>,
}

impl RealLdapConnector {
    pub(crate) fn new(settings: Arc<DirectorySettings>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let endpoint = self.settings.endpoint();
        let conn_settings = build_conn_settings(&self.settings)?;
        let (conn, ldap) = LdapConnAsync::with_settings(conn_settings, &endpoint)
            .await
            .map_err(|err| Error::Connect(format!("{endpoint}: {err}")))?;
        ldap3::drive!(conn);
        debug!(%endpoint, "directory connection opened");
        Ok(Box::new(RealLdapSession {
            inner: ldap,
            operation_timeout: self.settings.operation_timeout(),
        }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

fn operation_error(operation: &str, err: &ldap3::LdapError) -> Error {
    Error::Operation {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = timeout(self.operation_timeout, self.inner.simple_bind(dn, password))
            .await
            .map_err(|_| Error::Timeout("directory bind timed out".to_string()))?
            .map_err(|err| operation_error("bind", &err))?;
        match result.rc {
            0 => Ok(()),
            RC_INVALID_CREDENTIALS => Err(Error::Bind(format!("credentials rejected for {dn}"))),
            rc => Err(Error::Operation {
                operation: "bind".to_string(),
                message: format!("rc {rc}: {}", result.text),
            }),
        }
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<RawEntry>> {
        debug!(base = base_dn, %filter, "directory search");
        let result = timeout(
            self.operation_timeout,
            self.inner
                .search(base_dn, Scope::Subtree, filter, attributes.to_vec()),
        )
        .await
        .map_err(|_| Error::Timeout("directory search timed out".to_string()))?
        .map_err(|err| operation_error("search", &err))?;
        let (entries, _) = result
            .success()
            .map_err(|err| operation_error("search", &err))?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| RawEntry {
                dn: entry.dn,
                attrs: entry.attrs,
                bin_attrs: entry.bin_attrs,
            })
            .collect())
    }

    async fn replace(&mut self, dn: &str, attribute: &str, values: Vec<String>) -> Result<()> {
        debug!(%dn, attribute, "directory attribute replace");
        let mods = vec![Mod::Replace(
            attribute.to_string(),
            values.into_iter().collect::<HashSet<_>>(),
        )];
        let result = timeout(self.operation_timeout, self.inner.modify(dn, mods))
            .await
            .map_err(|_| Error::Timeout("directory modify timed out".to_string()))?
            .map_err(|err| operation_error("modify", &err))?;
        match result.rc {
            0 => Ok(()),
            rc => Err(Error::Operation {
                operation: "modify".to_string(),
                message: format!("rc {rc}: {}", result.text),
            }),
        }
    }

    async fn unbind(&mut self) -> Result<()> {
        timeout(self.operation_timeout, self.inner.unbind())
            .await
            .map_err(|_| Error::Timeout("directory unbind timed out".to_string()))?
            .map_err(|err| operation_error("unbind", &err))?;
        debug!("directory connection closed");
        Ok(())
    }
}

fn build_conn_settings(settings: &DirectorySettings) -> Result<LdapConnSettings> {
    let mut conn_settings = LdapConnSettings::new().set_conn_timeout(settings.connect_timeout());

    if !settings.tls {
        return Ok(conn_settings);
    }

    if !settings.tls_verify {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| Error::Config(format!("failed to construct TLS connector: {err}")))?;
        conn_settings = conn_settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = &settings.tls_ca_cert {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::Config(format!(
                "failed to read CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::Config(format!("invalid CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| Error::Config(format!("failed to load CA certificate: {err}")))?;
        conn_settings = conn_settings.set_connector(connector);
    }

    Ok(conn_settings)
}
