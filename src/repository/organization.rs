use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// An organization owning users and resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    /// URL-safe unique identifier.
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, AuthError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>, AuthError>;
    async fn create(&self, name: &str, slug: &str) -> Result<Organization, AuthError>;
}
