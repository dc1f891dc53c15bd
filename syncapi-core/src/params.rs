//! Ordered query parameters
//!
//! Endpoint calls never mutate the caller's parameters: authentication
//! fields are merged into a new set by [`with_auth`].

/// Ordered list of query parameters. Keys are unique; setting an existing
/// key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key.into(), value.to_string());
        self
    }

    /// Insert only when `value` is present
    pub fn with_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// New set with `other`'s pairs layered over this one
    pub fn merged(&self, other: &Params) -> Params {
        let mut out = self.clone();
        for (k, v) in &other.pairs {
            out.set(k.clone(), v.clone());
        }
        out
    }

    fn set(&mut self, key: String, value: String) {
        if let Some(slot) = self.pairs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.pairs.push((key, value));
        }
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Params::new(), |params, (k, v)| params.with(k, v))
    }
}

/// Authentication fields appended to an outgoing call
#[derive(Debug, Clone, Default)]
pub struct AuthFields<'a> {
    pub token: &'a str,
    /// Legacy API only
    pub guid: Option<&'a str>,
    /// Legacy API only
    pub action: Option<&'a str>,
    /// Cache-busting timestamp, legacy API only
    pub timestamp: Option<i64>,
}

/// Merge authentication fields over `base`, returning a new set.
/// Auth fields win over same-named caller parameters.
pub fn with_auth(base: &Params, auth: &AuthFields<'_>) -> Params {
    let auth = Params::new()
        .with("token", auth.token)
        .with_opt("guid", auth.guid)
        .with_opt("action", auth.action)
        .with_opt("t", auth.timestamp);
    base.merged(&auth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_replaces_existing_key() {
        let params = Params::new().with("path", "/a").with("force", 1).with("path", "/b");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("path"), Some("/b"));
        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["path", "force"]);
    }

    #[test]
    fn test_with_auth_leaves_base_untouched() {
        let base = Params::new().with("path", "/data").with("token", "stale");
        let merged = with_auth(
            &base,
            &AuthFields {
                token: "abc123",
                ..Default::default()
            },
        );

        assert_eq!(base.get("token"), Some("stale"));
        assert_eq!(merged.get("token"), Some("abc123"));
        assert_eq!(merged.get("path"), Some("/data"));
        assert!(merged.get("guid").is_none());
    }

    #[test]
    fn test_with_auth_legacy_fields() {
        let base: Params = [("dir", "/home")].into_iter().collect();
        let merged = with_auth(
            &base,
            &AuthFields {
                token: "tok",
                guid: Some("ABC"),
                action: Some("getdir"),
                timestamp: Some(1700000000000),
            },
        );

        let pairs: Vec<_> = merged.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("dir", "/home"),
                ("token", "tok"),
                ("guid", "ABC"),
                ("action", "getdir"),
                ("t", "1700000000000"),
            ]
        );
    }
}
