use std::cmp::Ordering;

use depot_types::{ContentHash, Version};
use serde::{Deserialize, Serialize};

/// Release notes reported when no release exists yet.
pub const NO_UPDATES_NOTES: &str = "no updates available";

/// How a client's current version is judged against the latest release.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MandatoryPolicy {
    /// Mandatory only when the client's version orders strictly before the
    /// latest one. Versions that are not dotted-numeric fall back to string
    /// inequality.
    #[default]
    OlderOnly,
    /// Mandatory whenever the client's version differs from the latest,
    /// including clients that are ahead of it.
    AnyDifference,
}

impl MandatoryPolicy {
    pub fn is_mandatory(&self, current: &str, latest: &Version) -> bool {
        let differs = current != latest.as_str();
        match self {
            MandatoryPolicy::AnyDifference => differs,
            MandatoryPolicy::OlderOnly => {
                let ordering = Version::new(current)
                    .ok()
                    .and_then(|current| current.compare_numeric(latest));
                match ordering {
                    Some(ord) => ord == Ordering::Less,
                    None => differs,
                }
            }
        }
    }
}

/// Answer to a client's "is there an update?" query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdateInfo {
    pub latest_version: Option<Version>,
    pub release_notes: String,
    pub file_hash: Option<ContentHash>,
    pub is_mandatory: bool,
}

impl ClientUpdateInfo {
    /// Response for a registry with nothing to offer.
    pub fn no_updates() -> Self {
        Self {
            latest_version: None,
            release_notes: NO_UPDATES_NOTES.to_string(),
            file_hash: None,
            is_mandatory: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::new(s).unwrap()
    }

    #[test]
    fn any_difference_is_string_inequality() {
        let p = MandatoryPolicy::AnyDifference;
        assert!(!p.is_mandatory("1.2.0", &v("1.2.0")));
        assert!(p.is_mandatory("1.1.0", &v("1.2.0")));
        assert!(p.is_mandatory("1.3.0", &v("1.2.0")));
    }

    #[test]
    fn older_only_ignores_newer_clients() {
        let p = MandatoryPolicy::OlderOnly;
        assert!(!p.is_mandatory("1.2.0", &v("1.2.0")));
        assert!(p.is_mandatory("1.1.0", &v("1.2.0")));
        assert!(p.is_mandatory("1.9", &v("1.10")));
        assert!(!p.is_mandatory("1.3.0", &v("1.2.0")));
        // Zero padding: these are the same version.
        assert!(!p.is_mandatory("1.2", &v("1.2.0")));
    }

    #[test]
    fn older_only_falls_back_for_unparseable() {
        let p = MandatoryPolicy::OlderOnly;
        assert!(p.is_mandatory("nightly", &v("1.2.0")));
        assert!(p.is_mandatory("", &v("1.2.0")));
        assert!(!p.is_mandatory("beta", &v("beta")));
    }

    #[test]
    fn default_policy_is_older_only() {
        assert_eq!(MandatoryPolicy::default(), MandatoryPolicy::OlderOnly);
        let p: MandatoryPolicy = serde_json::from_str("\"any_difference\"").unwrap();
        assert_eq!(p, MandatoryPolicy::AnyDifference);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(ClientUpdateInfo::no_updates()).unwrap();
        assert_eq!(json["latestVersion"], serde_json::Value::Null);
        assert_eq!(json["releaseNotes"], NO_UPDATES_NOTES);
        assert_eq!(json["isMandatory"], false);
    }
}
