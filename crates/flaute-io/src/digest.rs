use sha2::{Digest, Sha256};

/// Hex SHA-256 of a task identity. Used to name scratch namespaces so that
/// concurrent tasks sharing one scratch directory never collide.
pub fn identity_digest(identity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_hex() {
        let d = identity_digest("/data/Germany/CF_PV/x.csv");
        assert_eq!(d.len(), 64);
        assert_eq!(d, identity_digest("/data/Germany/CF_PV/x.csv"));
        assert_ne!(d, identity_digest("/data/Duisburg/CF_PV/x.csv"));
    }
}
