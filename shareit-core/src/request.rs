use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::item::Item;
use crate::repository::Repositories;
use crate::{require_non_blank, CoreResult};

/// A want-ad for an item nobody has listed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub id: i64,
    pub description: String,
    #[serde(skip_serializing)]
    pub requester_id: i64,
    pub created: DateTime<Utc>,
}

/// An item listed in answer to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAnswer {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

impl From<Item> for RequestAnswer {
    fn from(item: Item) -> Self {
        Self { id: item.id, name: item.name, owner_id: item.owner_id }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    #[serde(flatten)]
    pub request: ItemRequest,
    pub items: Vec<RequestAnswer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScope {
    Own,
    Others,
}

pub struct RequestService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl RequestService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    pub async fn create_request(&self, requester_id: i64, description: String) -> CoreResult<RequestView> {
        require_non_blank("description", &description)?;
        self.repos.user_or_not_found(requester_id).await?;

        let request = self
            .repos
            .requests
            .create_request(requester_id, description.trim(), self.clock.now())
            .await?;
        info!(request_id = request.id, requester_id, "Item request created");
        Ok(RequestView { request, items: Vec::new() })
    }

    /// Newest first; answers for the whole page come from a single lookup.
    pub async fn list_requests(&self, viewer_id: i64, scope: RequestScope) -> CoreResult<Vec<RequestView>> {
        self.repos.user_or_not_found(viewer_id).await?;

        let mut requests = match scope {
            RequestScope::Own => self.repos.requests.list_by_requester(viewer_id).await?,
            RequestScope::Others => self.repos.requests.list_excluding_requester(viewer_id).await?,
        };
        requests.sort_by(|a, b| b.created.cmp(&a.created));

        let ids: Vec<i64> = requests.iter().map(|r| r.id).collect();
        let mut answers: HashMap<i64, Vec<RequestAnswer>> = HashMap::new();
        if !ids.is_empty() {
            for item in self.repos.items.list_by_requests(&ids).await? {
                if let Some(request_id) = item.request_id {
                    answers.entry(request_id).or_default().push(item.into());
                }
            }
        }

        debug!(viewer_id, ?scope, count = requests.len(), "Item requests listed");
        Ok(requests
            .into_iter()
            .map(|request| {
                let items = answers.remove(&request.id).unwrap_or_default();
                RequestView { request, items }
            })
            .collect())
    }

    pub async fn get_request(&self, viewer_id: i64, request_id: i64) -> CoreResult<RequestView> {
        self.repos.user_or_not_found(viewer_id).await?;
        let request = self.repos.request_or_not_found(request_id).await?;
        let items = self
            .repos
            .items
            .list_by_requests(&[request_id])
            .await?
            .into_iter()
            .map(RequestAnswer::from)
            .collect();
        Ok(RequestView { request, items })
    }
}
