use strum_macros::{AsRefStr, EnumString, IntoStaticStr};

/// Message kinds of the `issue-credential` protocol, version 1.0.
#[derive(Copy, Clone, Debug, PartialEq, Eq, AsRefStr, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum CredentialIssuanceTypeV1_0 {
    ProposeCredential,
    OfferCredential,
    RequestCredential,
    IssueCredential,
    Ack,
    ProblemReport,
}

/// Message kinds of the `issue-credential` protocol, version 2.0.
#[derive(Copy, Clone, Debug, PartialEq, Eq, AsRefStr, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum CredentialIssuanceTypeV2_0 {
    ProposeCredential,
    OfferCredential,
    RequestCredential,
    IssueCredential,
    Ack,
    ProblemReport,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(
            CredentialIssuanceTypeV1_0::ProposeCredential.as_ref(),
            "propose-credential"
        );
        assert_eq!(
            CredentialIssuanceTypeV2_0::from_str("issue-credential").unwrap(),
            CredentialIssuanceTypeV2_0::IssueCredential
        );
        assert!(CredentialIssuanceTypeV1_0::from_str("revoke-credential").is_err());
    }
}
