//! GuildBook directory access layer.
//!
//! Members of an organization look up colleague records and edit their own
//! profile fields in an LDAP directory. Reads run under a low-privilege
//! service identity; every write binds as the target record's own identity,
//! so the directory server itself enforces who may change what.
//!
//! The front end (routing, templating, sessions) is an external caller: it
//! hands this crate already-validated input and renders whatever records come
//! back.

#![deny(missing_docs)]

mod client;
mod dn;
mod filter;
mod profile;
mod record;
mod session;

pub use client::DirectoryClient;
pub use dn::{DistinguishedName, DnError, Rdn};
pub use filter::Filter;
pub use profile::ProfileUpdate;
pub use record::{RawEntry, Record};
pub use session::AuthContext;

/// Convenient result alias that reuses the core error type.
pub type Result<T> = guildbook_core::Result<T>;
