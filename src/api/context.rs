use crate::Result;
use anyhow::bail;
use std::fmt::{Debug, Formatter};

/// Credentials and tenancy for one backend call. Built once from the config and passed to every
/// `Backend` method.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestContext {
    token: String,
    organization_id: String,
}

impl RequestContext {
    /// # Errors
    /// Returns an error when either value is empty.
    pub fn new(token: impl Into<String>, organization_id: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        let organization_id = organization_id.into().trim().to_string();
        if token.is_empty() {
            bail!("An access token is required");
        }
        if organization_id.is_empty() {
            bail!("An organization id is required");
        }
        Ok(Self {
            token,
            organization_id,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }
}

impl Debug for RequestContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("token", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .finish()
    }
}
