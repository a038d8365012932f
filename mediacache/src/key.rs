//! Derivation of stable, filesystem-safe cache keys from resource identities.
//!
//! A resource identity is the string a caller uses to name a remote or
//! embedded resource. It is canonicalized and hashed with SHA-256, giving a
//! 64-character lowercase hex key.
//!
//! Canonicalization, in priority order:
//!
//! 1. `data:` identities hash the encoded payload (the text after `base64,`
//!    when present, otherwise the whole identity).
//! 2. Virtual-scheme identities hash the identity verbatim.
//! 3. Everything else is parsed as a URL and hashed as
//!    `namespace + path + ["?" + query]`, where the namespace comes from the
//!    host and path and query are percent-decoded. Mirrors on different hosts that share a namespace therefore map to
//!    the same key. Identities that fail to parse are hashed verbatim.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};
use url::Url;

/// Default capacity of the identity → key memo.
pub const DEFAULT_MEMO_CAPACITY: usize = 1000;

/// Scheme treated as virtual when none is configured.
pub const DEFAULT_VIRTUAL_SCHEME: &str = "resource";

const DATA_SCHEME: &str = "data";
const BASE64_MARKER: &str = "base64,";

/// Maps a network host to the namespace of the source that owns it.
pub trait NamespaceResolver: Send + Sync {
    fn namespace_for_host(&self, host: &str) -> Option<String>;
}

/// Host → namespace table, usually loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct HostNamespaces {
    hosts: HashMap<String, String>,
}

impl HostNamespaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host. Hosts compare case-insensitively.
    pub fn insert(&mut self, host: impl AsRef<str>, namespace: impl Into<String>) {
        self.hosts
            .insert(host.as_ref().to_ascii_lowercase(), namespace.into());
    }

    pub fn with(mut self, host: impl AsRef<str>, namespace: impl Into<String>) -> Self {
        self.insert(host, namespace);
        self
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.hosts.iter().map(|(h, n)| (h.as_str(), n.as_str()))
    }
}

impl FromIterator<(String, String)> for HostNamespaces {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut namespaces = Self::new();
        for (host, namespace) in iter {
            namespaces.insert(host, namespace);
        }
        namespaces
    }
}

impl NamespaceResolver for HostNamespaces {
    fn namespace_for_host(&self, host: &str) -> Option<String> {
        self.hosts.get(&host.to_ascii_lowercase()).cloned()
    }
}

/// Canonicalizes identities and hashes them into cache keys.
///
/// Safe to share between threads. The memo is consulted only to skip work;
/// a cold memo yields the same keys.
pub struct KeyDeriver {
    namespaces: Box<dyn NamespaceResolver>,
    virtual_schemes: Vec<String>,
    memo: Mutex<LruCache<String, String>>,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(HostNamespaces::new())
    }
}

impl KeyDeriver {
    /// Create a deriver with the default virtual scheme and memo capacity.
    pub fn new(namespaces: impl NamespaceResolver + 'static) -> Self {
        Self::with_options(
            namespaces,
            vec![DEFAULT_VIRTUAL_SCHEME.to_string()],
            DEFAULT_MEMO_CAPACITY,
        )
    }

    /// Create a deriver with explicit virtual schemes and memo capacity.
    ///
    /// A zero capacity is raised to one.
    pub fn with_options(
        namespaces: impl NamespaceResolver + 'static,
        virtual_schemes: Vec<String>,
        memo_capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(memo_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            namespaces: Box::new(namespaces),
            virtual_schemes: virtual_schemes
                .into_iter()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            memo: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Derive the cache key for an identity.
    pub fn derive_key(&self, identity: &str) -> String {
        if let Some(key) = self.memo.lock().get(identity) {
            return key.clone();
        }

        let key = sha256_hex(&self.canonicalize(identity));
        self.memo.lock().put(identity.to_string(), key.clone());
        key
    }

    /// The string that is hashed for an identity.
    pub fn canonicalize(&self, identity: &str) -> String {
        match scheme_of(identity) {
            Some(scheme) if scheme.eq_ignore_ascii_case(DATA_SCHEME) => {
                match identity.find(BASE64_MARKER) {
                    Some(index) => identity[index + BASE64_MARKER.len()..].to_string(),
                    None => identity.to_string(),
                }
            }
            Some(scheme) if self.is_virtual(scheme) => identity.to_string(),
            _ => self.canonicalize_network(identity),
        }
    }

    /// Number of memoized identities.
    pub fn memo_len(&self) -> usize {
        self.memo.lock().len()
    }

    fn is_virtual(&self, scheme: &str) -> bool {
        self.virtual_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
    }

    fn canonicalize_network(&self, identity: &str) -> String {
        let Ok(url) = Url::parse(identity) else {
            return identity.to_string();
        };

        let mut data = String::new();
        if let Some(namespace) = url
            .host_str()
            .and_then(|host| self.namespaces.namespace_for_host(host))
        {
            data.push_str(&namespace);
        }
        data.push_str(&percent_decode_str(url.path()).decode_utf8_lossy());
        if let Some(query) = url.query() {
            data.push('?');
            data.push_str(&percent_decode_str(query).decode_utf8_lossy());
        }
        data
    }
}

/// Scheme prefix of an identity, if it has a syntactically valid one.
fn scheme_of(identity: &str) -> Option<&str> {
    let (scheme, _) = identity.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Lowercase hex SHA-256 of a string.
pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}
