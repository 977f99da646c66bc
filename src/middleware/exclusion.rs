//! Paths that bypass access logging.

use std::borrow::Cow;

/// Route-path prefixes exempt from every recording stage.
///
/// Matching runs against the route template (`/orders/:id`), not the raw
/// URL, so one prefix covers every concrete path under it. The default set
/// holds the Kubernetes probe paths served by [`health`](crate::health).
#[derive(Clone, Debug)]
pub struct ExclusionPolicy {
    prefixes: Vec<Cow<'static, str>>,
}

impl ExclusionPolicy {
    pub const LIVENESS: &'static str = "/liveness";
    pub const READINESS: &'static str = "/readiness";

    /// A policy with exactly `prefixes`, and none of the defaults.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        Self { prefixes: prefixes.into_iter().map(Into::into).collect() }
    }

    /// Adds one more prefix. Returns `self` for chaining.
    pub fn with(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn is_excluded(&self, route: &str) -> bool {
        self.prefixes.iter().any(|p| route.starts_with(p.as_ref()))
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(|p| p.as_ref())
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::new([Self::LIVENESS, Self::READINESS])
    }
}
