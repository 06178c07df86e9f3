//! HMAC-SHA256 signing of canonical metric strings.

use crate::types::Metric;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies metrics with a shared secret.
///
/// An empty secret disables signing: `sign` yields `None` and `verify`
/// accepts every metric.
///
/// # Examples
///
/// ```
/// use pulse_common::{Metric, Signer};
///
/// let signer = Signer::new("abc");
/// let mut m = Metric::gauge("temp", 36.6);
/// m.hash = signer.sign(&m);
/// assert!(signer.verify(&m));
///
/// m.value = Some(36.7);
/// assert!(!signer.verify(&m));
/// ```
#[derive(Clone, Default)]
pub struct Signer {
    mac: Option<HmacSha256>,
}

impl Signer {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        let key = key.as_ref();
        if key.is_empty() {
            return Self::disabled();
        }
        // HMAC accepts keys of any length.
        Self {
            mac: HmacSha256::new_from_slice(key).ok(),
        }
    }

    pub fn disabled() -> Self {
        Self { mac: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.mac.is_some()
    }

    /// Hex digest of `message`, `None` when signing is disabled.
    pub fn sign_str(&self, message: &str) -> Option<String> {
        let mut mac = self.mac.clone()?;
        mac.update(message.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    pub fn sign(&self, metric: &Metric) -> Option<String> {
        self.sign_str(&metric.canonical())
    }

    /// Returns `metric` with its signature replaced by a fresh one.
    pub fn signed(&self, mut metric: Metric) -> Metric {
        metric.hash = self.sign(&metric);
        metric
    }

    pub fn verify(&self, metric: &Metric) -> bool {
        let Some(expected) = self.sign(metric) else {
            return true;
        };
        match metric.hash.as_deref() {
            Some(supplied) => constant_time_eq(&expected, supplied),
            None => false,
        }
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Constant-time string comparison.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
