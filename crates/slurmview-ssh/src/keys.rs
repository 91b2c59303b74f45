//! SSH private-key discovery.

use camino::{Utf8Path, Utf8PathBuf};

/// Candidate key file names, in preference order.
pub const KEY_CANDIDATES: &[&str] = &["id_ed25519", "id_rsa", "id_ecdsa"];

/// The user's standard credential directory (`~/.ssh`).
pub fn default_key_dir() -> Utf8PathBuf {
    dirs::home_dir()
        .and_then(|h| Utf8PathBuf::from_path_buf(h).ok())
        .map(|h| h.join(".ssh"))
        .unwrap_or_else(|| Utf8PathBuf::from(".ssh"))
}

/// Find the first existing candidate key in the given directory.
pub fn find_private_key_in(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    KEY_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}
