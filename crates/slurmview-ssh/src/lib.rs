//! Persistent SSH session management for slurmview.
//!
//! Maintains one multiplexed OpenSSH control-master session to the login
//! node, executes remote commands over it, auto-reconnects on drop with a
//! fixed delay, and publishes connection-state transitions on a watch
//! channel.

pub mod keys;
pub mod session;

pub use keys::find_private_key_in;
pub use session::{ConnectionState, SshConfig, SshError, SshSession};
