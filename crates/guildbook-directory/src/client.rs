//! The directory client: listing, fetching, and self-service updates.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::warn;

use crate::dn::DistinguishedName;
use crate::filter::Filter;
use crate::profile::ProfileUpdate;
use crate::record::Record;
use crate::session::{AuthContext, LdapConnector, LdapSession, RealLdapConnector};
use crate::Result;
use guildbook_core::{DirectorySettings, Error};

const ALL_ATTRIBUTES: &[&'static str] = &["*"];

/// Client for the organization directory.
///
/// Reads run under the configured service identity; writes bind as the
/// target record's own identity. Each call opens one connection, uses it,
/// and releases it before returning.
pub struct DirectoryClient {
    settings: Arc<DirectorySettings>,
    base_dn: DistinguishedName,
    connector: Box<dyn LdapConnector>,
}

impl DirectoryClient {
    /// Creates a client that connects to the configured directory server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured base DN does not parse.
    pub fn new(settings: DirectorySettings) -> Result<Self> {
        let base_dn = DistinguishedName::parse(&settings.base_dn)?;
        let settings = Arc::new(settings);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(settings.clone()));
        Ok(Self {
            settings,
            base_dn,
            connector,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_connector(
        settings: DirectorySettings,
        connector: Box<dyn LdapConnector>,
    ) -> Result<Self> {
        let base_dn = DistinguishedName::parse(&settings.base_dn)?;
        Ok(Self {
            settings: Arc::new(settings),
            base_dn,
            connector,
        })
    }

    /// Lists records matching the optional predicate, in server order.
    ///
    /// The search always constrains on `uid` presence, so even an
    /// unrestricted predicate only ever returns entries of the managed
    /// record type. Ordering for display is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`], [`Error::Bind`] or [`Error::Operation`]
    /// when the directory cannot be reached, the service bind is rejected,
    /// or the search fails.
    pub async fn list_records(&self, predicate: Option<Filter>) -> Result<Vec<Record>> {
        let uid_present = Filter::present("uid");
        let filter = match predicate {
            Some(predicate) => uid_present & predicate,
            None => uid_present,
        };

        let mut session = self.open_session(&AuthContext::Service).await?;
        let outcome = session
            .search(self.base_dn.as_str(), &filter.to_string(), ALL_ATTRIBUTES)
            .await;
        let _ = session.unbind().await;

        Ok(outcome?.into_iter().map(Record::normalize).collect())
    }

    /// Fetches the record with the given `uid` key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no entry matches; transport and
    /// server failures as in [`Self::list_records`].
    pub async fn get_record(&self, key: &str) -> Result<Record> {
        let filter = Filter::equals("uid", key);

        let mut session = self.open_session(&AuthContext::Service).await?;
        let outcome = session
            .search(self.base_dn.as_str(), &filter.to_string(), ALL_ATTRIBUTES)
            .await;
        let _ = session.unbind().await;

        let mut entries = outcome?;
        if entries.is_empty() {
            return Err(Error::NotFound(format!("no directory record for `{key}`")));
        }
        if entries.len() > 1 {
            // uid uniqueness is the directory's contract, not ours; make
            // violations observable and take the first match.
            warn!(uid = key, matches = entries.len(), "uid matched multiple entries");
        }
        Ok(Record::normalize(entries.remove(0)))
    }

    /// Replaces whitelisted profile attributes on one record.
    ///
    /// The target DN is computed from `key` and the configured base; the
    /// record owner authenticates the change with their own secret, never a
    /// service identity. Replacements are applied one attribute at a time
    /// and are not atomic: on failure, earlier replacements stand and later
    /// ones are never attempted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`] when the submitted secret is rejected (also
    /// the outcome for a key with no corresponding entry, since the DN is
    /// computed rather than looked up), or [`Error::Operation`] when the
    /// directory refuses a replacement.
    pub async fn update_record(
        &self,
        key: &str,
        password: SecretString,
        updates: &ProfileUpdate,
    ) -> Result<()> {
        let dn = DistinguishedName::for_uid(key, &self.base_dn);
        let auth = AuthContext::BoundAs {
            dn: dn.clone(),
            password,
        };

        let mut session = self.open_session(&auth).await?;
        let mut result = Ok(());
        for (attribute, value) in updates.replacements() {
            if let Err(err) = session
                .replace(dn.as_str(), attribute, vec![value.to_string()])
                .await
            {
                result = Err(err);
                break;
            }
        }
        let _ = session.unbind().await;
        result
    }

    /// Opens a connection and performs the bind implied by the context.
    ///
    /// On bind failure the connection is released before the error is
    /// returned, so no live handle ever escapes.
    async fn open_session(&self, auth: &AuthContext) -> Result<Box<dyn LdapSession>> {
        let mut session = self.connector.connect().await?;

        let bind = match auth {
            AuthContext::Service => match (
                &self.settings.service_bind_dn,
                &self.settings.service_bind_password,
            ) {
                (Some(dn), Some(password)) => {
                    session.simple_bind(dn, password.expose_secret()).await
                }
                // No service identity configured: anonymous read bind.
                _ => Ok(()),
            },
            AuthContext::BoundAs { dn, password } => {
                session.simple_bind(dn.as_str(), password.expose_secret()).await
            }
        };

        if let Err(err) = bind {
            let _ = session.unbind().await;
            return Err(err);
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawEntry;
    use crate::session::{MockLdapConnector, MockLdapSession};
    use std::collections::HashMap;

    fn sample_settings() -> DirectorySettings {
        DirectorySettings::new("ldap.example.com", "ou=People,dc=example,dc=com").unwrap()
    }

    fn entry(uid: &str, extra: &[(&str, &str)]) -> RawEntry {
        let mut attrs: HashMap<String, Vec<String>> = HashMap::new();
        attrs.insert("uid".to_string(), vec![uid.to_string()]);
        for (name, value) in extra {
            attrs.insert((*name).to_string(), vec![(*value).to_string()]);
        }
        RawEntry {
            dn: format!("uid={uid},ou=People,dc=example,dc=com"),
            attrs,
            bin_attrs: HashMap::new(),
        }
    }

    fn client_with_session(session: MockLdapSession) -> DirectoryClient {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .times(1)
            .return_once(move || Ok(Box::new(session)));
        DirectoryClient::with_connector(sample_settings(), Box::new(connector)).unwrap()
    }

    #[tokio::test]
    async fn list_without_predicate_filters_on_uid_presence() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|base, filter, _| {
                base == "ou=People,dc=example,dc=com" && filter == "(uid=*)"
            })
            .returning(|_, _, _| Ok(vec![entry("alice", &[]), entry("bob", &[])]));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        let records = client.list_records(None).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].uid(), Some("alice"));
        assert_eq!(records[1].uid(), Some("bob"));
    }

    #[tokio::test]
    async fn list_conjoins_predicate_with_uid_presence() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|_, filter, _| filter == "(&(uid=*)(!(shadowExpire=*)))")
            .returning(|_, _, _| Ok(vec![entry("alice", &[]), entry("carol", &[])]));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        let records = client
            .list_records(Some(!Filter::present("shadowExpire")))
            .await
            .unwrap();
        let uids: Vec<_> = records.iter().filter_map(Record::uid).collect();
        assert_eq!(uids, ["alice", "carol"]);
    }

    #[tokio::test]
    async fn list_preserves_server_order() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .returning(|_, _, _| Ok(vec![entry("zoe", &[]), entry("alice", &[])]));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        let records = client.list_records(None).await.unwrap();
        let uids: Vec<_> = records.iter().filter_map(Record::uid).collect();
        assert_eq!(uids, ["zoe", "alice"]);
    }

    #[tokio::test]
    async fn get_record_escapes_the_key() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|_, filter, _| filter == "(uid=j\\2adoe)")
            .returning(|_, _, _| Ok(Vec::new()));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        let result = client.get_record("j*doe").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn get_record_returns_not_found_for_zero_matches() {
        let mut session = MockLdapSession::new();
        session.expect_search().returning(|_, _, _| Ok(Vec::new()));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        let result = client.get_record("ghost").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn get_record_returns_the_first_of_duplicate_matches() {
        let mut session = MockLdapSession::new();
        session.expect_search().returning(|_, _, _| {
            Ok(vec![
                entry("jdoe", &[("cn", "First Match")]),
                entry("jdoe", &[("cn", "Second Match")]),
            ])
        });
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        let record = client.get_record("jdoe").await.unwrap();
        assert_eq!(record.first("cn"), Some("First Match"));
    }

    #[tokio::test]
    async fn connect_failure_surfaces_as_connect_error() {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(|| Err(Error::Connect("ldap.example.com: refused".to_string())));

        let client =
            DirectoryClient::with_connector(sample_settings(), Box::new(connector)).unwrap();
        let result = client.list_records(None).await;
        assert!(matches!(result, Err(Error::Connect(_))));
    }

    #[tokio::test]
    async fn reads_bind_with_the_configured_service_identity() {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .withf(|dn, password| dn == "cn=reader,dc=example,dc=com" && password == "letmein")
            .returning(|_, _| Ok(()));
        session.expect_search().returning(|_, _, _| Ok(Vec::new()));
        session.expect_unbind().returning(|| Ok(()));

        let settings = sample_settings().with_service_bind(
            "cn=reader,dc=example,dc=com",
            SecretString::from("letmein".to_string()),
        );
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(session)));

        let client = DirectoryClient::with_connector(settings, Box::new(connector)).unwrap();
        let records = client.list_records(None).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn service_bind_failure_releases_the_connection() {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .returning(|_, _| Err(Error::Bind("credentials rejected".to_string())));
        session.expect_search().times(0);
        session.expect_unbind().times(1).returning(|| Ok(()));

        let settings = sample_settings().with_service_bind(
            "cn=reader,dc=example,dc=com",
            SecretString::from("wrong".to_string()),
        );
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(session)));

        let client = DirectoryClient::with_connector(settings, Box::new(connector)).unwrap();
        let result = client.list_records(None).await;
        assert!(matches!(result, Err(Error::Bind(_))));
    }

    #[tokio::test]
    async fn update_binds_as_the_computed_record_dn() {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .withf(|dn, password| {
                dn == "uid=jdoe,ou=People,dc=example,dc=com" && password == "hunter2"
            })
            .returning(|_, _| Ok(()));
        session
            .expect_replace()
            .times(2)
            .withf(|dn, attribute, values| {
                dn == "uid=jdoe,ou=People,dc=example,dc=com"
                    && matches!(attribute, "givenName" | "sn")
                    && values.len() == 1
            })
            .returning(|_, _, _| Ok(()));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        let updates = ProfileUpdate::new().with_given_name("Jane").with_sn("Doe");
        client
            .update_record("jdoe", SecretString::from("hunter2".to_string()), &updates)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_with_wrong_secret_never_modifies() {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .returning(|_, _| Err(Error::Bind("credentials rejected".to_string())));
        session.expect_replace().times(0);
        session.expect_unbind().times(1).returning(|| Ok(()));

        let client = client_with_session(session);
        let updates = ProfileUpdate::new().with_cn("J Doe");
        let result = client
            .update_record("jdoe", SecretString::from("wrong".to_string()), &updates)
            .await;
        assert!(matches!(result, Err(Error::Bind(_))));
    }

    #[tokio::test]
    async fn update_stops_at_the_first_failed_replacement() {
        let mut session = MockLdapSession::new();
        session.expect_simple_bind().returning(|_, _| Ok(()));
        // Declaration order: cn first, then sn, then title. The sn failure
        // must leave title untouched.
        session
            .expect_replace()
            .times(2)
            .returning(|_, attribute, _| {
                if attribute == "sn" {
                    Err(Error::Operation {
                        operation: "modify".to_string(),
                        message: "constraint violation".to_string(),
                    })
                } else {
                    Ok(())
                }
            });
        session.expect_unbind().times(1).returning(|| Ok(()));

        let client = client_with_session(session);
        let updates = ProfileUpdate::new()
            .with_cn("Jane Doe")
            .with_sn("Doe")
            .with_title("Librarian");
        let result = client
            .update_record("jdoe", SecretString::from("hunter2".to_string()), &updates)
            .await;
        assert!(matches!(result, Err(Error::Operation { .. })));
    }

    #[tokio::test]
    async fn update_escapes_the_key_in_the_target_dn() {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .withf(|dn, _| dn == "uid=doe\\,admin,ou=People,dc=example,dc=com")
            .returning(|_, _| Ok(()));
        session
            .expect_replace()
            .withf(|dn, _, _| dn == "uid=doe\\,admin,ou=People,dc=example,dc=com")
            .returning(|_, _, _| Ok(()));
        session.expect_unbind().returning(|| Ok(()));

        let client = client_with_session(session);
        let updates = ProfileUpdate::new().with_cn("Doe Admin");
        client
            .update_record(
                "doe,admin",
                SecretString::from("hunter2".to_string()),
                &updates,
            )
            .await
            .unwrap();
    }
}
