use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use portal_core::{Collection, CollectionStats, DashboardStats, UserContentStats};
use portal_logging::{portal_debug, portal_warn};

use crate::repository::{CountQuery, RepositoryAdapter};

/// Builds the admin dashboard from independent repository count queries.
///
/// Every query is allowed to fail on its own; a failed count shows up as 0
/// and never removes a collection from the breakdown.
pub struct DashboardAggregator {
    repository: Arc<RepositoryAdapter>,
    page_size: u32,
    max_concurrent: usize,
}

impl DashboardAggregator {
    pub fn new(repository: Arc<RepositoryAdapter>, page_size: u32, max_concurrent: usize) -> Self {
        Self {
            repository,
            page_size,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub async fn load_stats(&self, scope: Option<&str>) -> DashboardStats {
        let totals = async {
            tokio::join!(
                self.count_or_zero(CountQuery::collections().within(scope)),
                self.count_or_zero(CountQuery::archived_items().within(scope)),
                self.count_or_zero(CountQuery::workflow_items().within(scope)),
            )
        };
        let ((collections, archived_items, workflow_items), per_collection) =
            tokio::join!(totals, self.per_collection(scope));

        DashboardStats {
            collections,
            archived_items,
            workflow_items,
            per_collection,
        }
    }

    pub async fn load_user_stats(&self, user_id: &str) -> Option<UserContentStats> {
        match self.repository.user_content_stats(user_id).await {
            Ok(stats) => Some(stats),
            Err(err) => {
                portal_warn!("User statistics for {} unavailable: {}", user_id, err);
                None
            }
        }
    }

    async fn per_collection(&self, scope: Option<&str>) -> Vec<CollectionStats> {
        let collections = match self.repository.collections(self.page_size).await {
            Ok(collections) => collections,
            Err(err) => {
                portal_warn!("Collection listing failed: {}", err);
                Vec::new()
            }
        };
        let selected: Vec<Collection> = match scope {
            None => collections,
            // The scoped pair is issued even when the listing failed or did
            // not include the collection.
            Some(id) => vec![collections
                .into_iter()
                .find(|collection| collection.id == id)
                .unwrap_or_else(|| Collection {
                    id: id.to_string(),
                    name: String::new(),
                    handle: None,
                })],
        };
        portal_debug!("Counting items in {} collection(s)", selected.len());

        stream::iter(selected)
            .map(|collection| self.collection_stats(collection))
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    async fn collection_stats(&self, collection: Collection) -> CollectionStats {
        let scope = Some(collection.id.as_str());
        let (archived_count, workflow_count) = tokio::join!(
            self.count_or_zero(CountQuery::archived_items().within(scope)),
            self.count_or_zero(CountQuery::workflow_items().within(scope)),
        );
        let label = if collection.name.is_empty() {
            collection.id.clone()
        } else {
            collection.name
        };
        CollectionStats {
            id: collection.id,
            label,
            archived_count,
            workflow_count,
        }
    }

    async fn count_or_zero(&self, query: CountQuery) -> u64 {
        match self.repository.count(&query).await {
            Ok(count) => count,
            Err(err) => {
                portal_warn!("Count query {:?} failed, using 0: {}", query, err);
                0
            }
        }
    }
}
