use std::collections::HashMap;

use lazy_static::lazy_static;

use super::Protocol;

/// Supported minor versions per `(protocol name, major version)`, ascending.
type RegistryMap = HashMap<(String, u8), Vec<u8>>;

fn map_insert(map: &mut RegistryMap, protocol: Protocol) {
    let (name, major, minor) = protocol.as_parts();
    map.entry((name.to_owned(), major)).or_default().push(minor);
}

lazy_static! {
    /// The protocol registry, used as a baseline for the protocols and versions
    /// that an agent supports along with semver resolution.
    pub static ref PROTOCOL_REGISTRY: RegistryMap = {
        let mut m = HashMap::new();
        map_insert(&mut m, Protocol::CredentialIssuanceV1_0);
        map_insert(&mut m, Protocol::CredentialIssuanceV2_0);
        map_insert(&mut m, Protocol::PresentProofV1_0);
        map_insert(&mut m, Protocol::PresentProofV2_0);
        m
    };
}

/// Looks into the protocol registry for (in order):
/// * the exact protocol version requested
/// * the maximum minor version of a protocol less than the minor version requested (e.g: requesting
///   1.7 should yield 1.6).
pub fn get_supported_version(name: &str, major: u8, minor: u8) -> Option<u8> {
    PROTOCOL_REGISTRY
        .get(&(name.to_owned(), major))
        .and_then(|minors| minors.iter().rev().copied().find(|m| *m <= minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_version_lookup() {
        assert_eq!(get_supported_version("issue-credential", 1, 0), Some(0));
        assert_eq!(get_supported_version("present-proof", 2, 0), Some(0));
    }

    #[test]
    fn test_higher_minor_resolves_down() {
        assert_eq!(get_supported_version("issue-credential", 1, 7), Some(0));
    }

    #[test]
    fn test_unknown_protocol() {
        assert_eq!(get_supported_version("issue-credential", 3, 0), None);
        assert_eq!(get_supported_version("basicmessage", 1, 0), None);
    }
}
