use crate::core::catalog;
use crate::entities::course;
use crate::errors::Result;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, trace};

/// Memo of the published course listing.
///
/// There is no expiry: the listing is filled on the first read and dropped by
/// [`CatalogCache::invalidate`] whenever a course or its lectures change.
#[derive(Debug, Clone, Default)]
pub struct CatalogCache {
    courses: Arc<RwLock<Option<Vec<course::Model>>>>,
}

impl CatalogCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached listing, loading it from the database on a miss.
    pub async fn published_courses(&self, db: &DatabaseConnection) -> Result<Vec<course::Model>> {
        if let Some(courses) = self.courses.read().await.as_ref() {
            trace!(count = courses.len(), "Course listing served from cache");
            return Ok(courses.clone());
        }

        let mut writer = self.courses.write().await;
        // Another request may have filled it while we waited for the lock.
        if let Some(courses) = writer.as_ref() {
            return Ok(courses.clone());
        }
        let courses = catalog::list_published_courses(db).await?;
        info!("Course listing cache refreshed with {} items.", courses.len());
        *writer = Some(courses.clone());
        Ok(courses)
    }

    /// Drops the cached listing.
    pub async fn invalidate(&self) {
        let mut writer = self.courses.write().await;
        if writer.take().is_some() {
            trace!("Course listing cache invalidated");
        }
    }

    /// Whether a listing is currently cached.
    pub async fn is_warm(&self) -> bool {
        self.courses.read().await.is_some()
    }
}
