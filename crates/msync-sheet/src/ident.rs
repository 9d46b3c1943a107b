//! Derived-identity minting for one parse pass.
//!
//! The sheet provides no canonical ids, so the parser mints correlation
//! keys: a normalized slug of the label plus a per-pass monotonic counter.
//! These ids are valid only within the pass that minted them; after a
//! create the catalog's server-assigned id is authoritative.

/// Mints pass-scoped ids. One mint per parse pass; the counter restarts
/// at zero for every new pass, which keeps parsing deterministic.
#[derive(Debug, Default)]
pub struct IdMint {
    next: u64,
}

impl IdMint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive an id from `label`: lowercase, keep only ASCII lowercase
    /// letters and digits, append the pass-local counter.
    ///
    /// Two labels that normalize identically still get distinct ids
    /// because the counter differs.
    pub fn mint(&mut self, label: &str) -> String {
        let slug: String = label
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect();
        let n = self.next;
        self.next += 1;
        if slug.is_empty() {
            format!("unnamed-{n}")
        } else {
            format!("{slug}-{n}")
        }
    }
}
