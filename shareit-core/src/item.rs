use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::booking::{last_and_next, Booking};
use crate::clock::Clock;
use crate::repository::Repositories;
use crate::{non_blank, require_non_blank, CoreError, CoreResult};

/// A listed item. The owner is never exposed in API output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    #[serde(skip_serializing)]
    pub owner_id: i64,
    pub request_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub available: bool,
    #[serde(default)]
    pub request_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

/// Reference to a booking inside an item view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingShort {
    pub id: i64,
    pub booker_id: i64,
}

impl From<&Booking> for BookingShort {
    fn from(b: &Booking) -> Self {
        Self { id: b.id, booker_id: b.booker_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub text: String,
    #[serde(skip_serializing)]
    pub item_id: i64,
    #[serde(skip_serializing)]
    pub author_id: i64,
    pub author_name: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub item_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// Item as returned by reads: booking neighbours (owner only) and comments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub last_booking: Option<BookingShort>,
    pub next_booking: Option<BookingShort>,
    pub comments: Vec<Comment>,
}

impl ItemView {
    fn build(
        item: Item,
        viewer_id: i64,
        approved: &[Booking],
        mut comments: Vec<Comment>,
        now: DateTime<Utc>,
    ) -> Self {
        comments.sort_by(|a, b| b.created.cmp(&a.created));

        let (last_booking, next_booking) = if item.owner_id == viewer_id {
            let (last, next) = last_and_next(approved, now);
            (last.map(BookingShort::from), next.map(BookingShort::from))
        } else {
            (None, None)
        };

        Self { item, last_booking, next_booking, comments }
    }
}

pub struct ItemService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl ItemService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    pub async fn create_item(&self, owner_id: i64, new_item: NewItem) -> CoreResult<Item> {
        require_non_blank("name", &new_item.name)?;
        require_non_blank("description", &new_item.description)?;

        self.repos.user_or_not_found(owner_id).await?;
        if let Some(request_id) = new_item.request_id {
            self.repos.request_or_not_found(request_id).await?;
        }

        let item = self.repos.items.create_item(owner_id, &new_item).await?;
        info!(item_id = item.id, owner_id, request_id = ?item.request_id, "Item listed");
        Ok(item)
    }

    /// Owner-only partial update.
    pub async fn update_item(&self, user_id: i64, item_id: i64, patch: ItemPatch) -> CoreResult<Item> {
        self.repos.user_or_not_found(user_id).await?;
        let mut item = self.repos.item_or_not_found(item_id).await?;

        if item.owner_id != user_id {
            warn!(item_id, user_id, "Item update by non-owner");
            return Err(CoreError::Forbidden("Only the owner may modify this item".to_string()));
        }

        if let Some(name) = non_blank(patch.name) {
            item.name = name;
        }
        if let Some(description) = non_blank(patch.description) {
            item.description = description;
        }
        if let Some(available) = patch.available {
            item.available = available;
        }

        let updated = self.repos.items.update_item(&item).await?;
        info!(item_id, available = updated.available, "Item updated");
        Ok(updated)
    }

    pub async fn get_item(&self, item_id: i64, requester_id: i64) -> CoreResult<ItemView> {
        self.repos.user_or_not_found(requester_id).await?;
        let item = self.repos.item_or_not_found(item_id).await?;
        let now = self.clock.now();

        let comments = self.repos.comments.list_for_items(&[item_id]).await?;
        let approved = if item.owner_id == requester_id {
            self.repos.bookings.list_approved_for_items(&[item_id]).await?
        } else {
            Vec::new()
        };

        debug!(item_id, requester_id, "Item fetched");
        Ok(ItemView::build(item, requester_id, &approved, comments, now))
    }

    /// Every item of `owner_id`, enriched with one batched booking lookup and
    /// one batched comment lookup.
    pub async fn list_owner_items(&self, owner_id: i64) -> CoreResult<Vec<ItemView>> {
        self.repos.user_or_not_found(owner_id).await?;
        let items = self.repos.items.list_by_owner(owner_id).await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();

        let mut bookings_by_item: HashMap<i64, Vec<Booking>> = HashMap::new();
        for booking in self.repos.bookings.list_approved_for_items(&ids).await? {
            bookings_by_item.entry(booking.item_id).or_default().push(booking);
        }

        let mut comments_by_item: HashMap<i64, Vec<Comment>> = HashMap::new();
        for comment in self.repos.comments.list_for_items(&ids).await? {
            comments_by_item.entry(comment.item_id).or_default().push(comment);
        }

        let views = items
            .into_iter()
            .map(|item| {
                let approved = bookings_by_item.remove(&item.id).unwrap_or_default();
                let comments = comments_by_item.remove(&item.id).unwrap_or_default();
                ItemView::build(item, owner_id, &approved, comments, now)
            })
            .collect::<Vec<_>>();

        debug!(owner_id, count = views.len(), "Owner items listed");
        Ok(views)
    }

    /// Available items whose name or description contains `text`, ignoring case.
    pub async fn search(&self, text: &str) -> CoreResult<Vec<Item>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let items = self.repos.items.search_available(text).await?;
        debug!(text, count = items.len(), "Item search");
        Ok(items)
    }

    /// Only a booker whose approved rental of the item has ended may comment.
    pub async fn add_comment(&self, item_id: i64, user_id: i64, text: String) -> CoreResult<Comment> {
        require_non_blank("text", &text)?;
        let item = self.repos.item_or_not_found(item_id).await?;
        let author = self.repos.user_or_not_found(user_id).await?;
        let now = self.clock.now();

        if !self.repos.bookings.has_completed_rental(author.id, item.id, now).await? {
            warn!(item_id, user_id, "Comment without a completed rental");
            return Err(CoreError::Forbidden(
                "Reviews are allowed only after the rental has been completed".to_string(),
            ));
        }

        let comment = self
            .repos
            .comments
            .create_comment(&NewComment { item_id: item.id, author_id: author.id, text, created: now })
            .await?;
        info!(comment_id = comment.id, item_id, user_id, "Comment added");
        Ok(comment)
    }
}
