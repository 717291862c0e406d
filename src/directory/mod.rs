//! Directory client for ds-repltest
//!
//! Provides the directory-protocol primitives the verification engine drives:
//! - `connect`: simple bind, protocol version 3, anonymous when no bind DN
//! - `search`: entry count, zero when the base object is missing
//! - `add`, `delete`, `modify`: typed outcomes
//! - `disconnect`: best-effort unbind
//!
//! Backends implement `Directory`/`DirectorySession`. `LdapDirectory` talks
//! to real servers through `ldap3`; `MemoryDirectory` simulates hosts,
//! replication links and faults.

mod client;
mod errors;
mod ldap;
pub mod memory;
mod modlist;
mod session;

pub use client::{add, connect, delete, disconnect, modify, search, Connection, ANY_OBJECT_FILTER};
pub use errors::{
    result_code_description, DirectoryError, DirectoryResult, RC_ALREADY_EXISTS, RC_NO_SUCH_OBJECT,
};
pub use ldap::LdapDirectory;
pub use memory::MemoryDirectory;
pub use modlist::{add_list, attributes, lookup, modify_list, Attributes, Modification};
pub use session::{BindRequest, Directory, DirectorySession, SearchScope};
