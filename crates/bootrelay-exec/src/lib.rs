//! bootrelay-exec: Remote session abstraction
//!
//! Provides the authenticated SSH session used for privileged one-shot
//! commands on the controlled host, plus the liveness probe.

pub mod error;
pub mod keys;
pub mod probe;
pub mod result;
pub mod ssh;
pub mod traits;

pub use error::ExecError;
pub use keys::{AuthMethod, KeySource};
pub use probe::TcpProbe;
pub use result::{CommandResult, ConnectionInfo};
pub use ssh::SshConnector;
pub use traits::{LivenessProbe, RemoteSession, SessionConnector};
