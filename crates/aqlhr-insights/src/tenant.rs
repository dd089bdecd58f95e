use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Opaque company identifier scoping every remote query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn parse(raw: &str) -> Result<Self, TenantResolutionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TenantResolutionError::Missing);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TenantResolutionError {
    #[error("no tenant could be resolved for the current session")]
    Missing,
    #[error("tenant lookup failed: {0}")]
    Lookup(String),
}

/// Resolves the tenant bound to the current session, if any.
pub trait TenantResolver: Send + Sync {
    fn resolve(&self) -> Result<Option<TenantId>, TenantResolutionError>;
}

impl<T: TenantResolver + ?Sized> TenantResolver for Arc<T> {
    fn resolve(&self) -> Result<Option<TenantId>, TenantResolutionError> {
        (**self).resolve()
    }
}

/// Resolver returning a tenant fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantResolver {
    tenant: Option<TenantId>,
}

impl StaticTenantResolver {
    pub fn new(tenant: Option<TenantId>) -> Self {
        Self { tenant }
    }

    pub fn tenant(tenant: TenantId) -> Self {
        Self::new(Some(tenant))
    }
}

impl TenantResolver for StaticTenantResolver {
    fn resolve(&self) -> Result<Option<TenantId>, TenantResolutionError> {
        Ok(self.tenant.clone())
    }
}

/// Falls back to the shared demo tenant when the session carries none.
#[derive(Debug, Clone)]
pub struct DemoFallbackResolver<R> {
    inner: R,
    demo: TenantId,
}

impl<R: TenantResolver> DemoFallbackResolver<R> {
    pub fn new(inner: R, demo: TenantId) -> Self {
        Self { inner, demo }
    }
}

impl<R: TenantResolver> TenantResolver for DemoFallbackResolver<R> {
    fn resolve(&self) -> Result<Option<TenantId>, TenantResolutionError> {
        match self.inner.resolve()? {
            Some(tenant) => Ok(Some(tenant)),
            None => {
                debug!(demo = %self.demo, "no session tenant, using demo tenant");
                Ok(Some(self.demo.clone()))
            }
        }
    }
}

/// Resolves a tenant or fails with [`TenantResolutionError::Missing`].
pub fn require_tenant(resolver: &dyn TenantResolver) -> Result<TenantId, TenantResolutionError> {
    resolver.resolve()?.ok_or(TenantResolutionError::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_identifiers_are_rejected() {
        assert!(matches!(
            TenantId::parse("   "),
            Err(TenantResolutionError::Missing)
        ));
        assert_eq!(TenantId::parse(" acme ").expect("valid").as_str(), "acme");
    }

    #[test]
    fn require_tenant_fails_without_session_tenant() {
        let resolver = StaticTenantResolver::default();
        assert!(matches!(
            require_tenant(&resolver),
            Err(TenantResolutionError::Missing)
        ));
    }

    #[test]
    fn demo_fallback_fills_missing_tenant() {
        let demo = TenantId::parse("demo").expect("valid");
        let resolver = DemoFallbackResolver::new(StaticTenantResolver::default(), demo.clone());
        assert_eq!(require_tenant(&resolver).expect("resolves"), demo);

        let acme = TenantId::parse("acme").expect("valid");
        let resolver = DemoFallbackResolver::new(StaticTenantResolver::tenant(acme.clone()), demo);
        assert_eq!(require_tenant(&resolver).expect("resolves"), acme);
    }
}
