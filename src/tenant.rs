//! Tenant identity shared by every subsystem.

use std::fmt;

/// Max length and character class for a wire-supplied `TenantId`
/// (spec.md §3 Tenant Registry: `[A-Za-z0-9_-]`, <= 64 chars).
pub const MAX_TENANT_ID_LEN: usize = 64;

/// Opaque tenant identifier.
///
/// Tenant IDs are caller-supplied strings (e.g. an account slug or UUID); this
/// crate never interprets their contents, only uses them as a map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate a tenant id received over the wire (Admin/Router RPCs, the
    /// `acsd-ctl` CLI). Internal construction from already-trusted state
    /// (test fixtures, the registry's own keys) uses [`Self::new`] instead.
    pub fn parse(id: impl Into<String>) -> Result<Self, crate::acs_error::AcsErrorKind> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_TENANT_ID_LEN
            && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(crate::acs_error::AcsErrorKind::BadPayload {
                op_name: "tenant_id".to_string(),
                reason: format!("{id:?} must be non-empty, <= {MAX_TENANT_ID_LEN} chars, [A-Za-z0-9_-]"),
            });
        }
        Ok(Self(id))
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
