//! In-memory repositories for tests. Mirrors the constraints the PostgreSQL
//! schema enforces (unique email, cascading deletes, start-descending order).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::booking::{Booking, BookingDetails, BookingStatus, NewBooking};
use crate::item::{Comment, Item, NewComment, NewItem};
use crate::repository::{
    BookingRepository, CommentRepository, ItemRepository, RepoResult, Repositories, RequestRepository,
    UserRepository,
};
use crate::request::ItemRequest;
use crate::user::{NewUser, User};
use crate::CoreError;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    items: BTreeMap<i64, Item>,
    bookings: BTreeMap<i64, Booking>,
    comments: BTreeMap<i64, Comment>,
    requests: BTreeMap<i64, ItemRequest>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn details(&self, booking: &Booking) -> Option<BookingDetails> {
        Some(BookingDetails {
            id: booking.id,
            start: booking.start,
            end: booking.end,
            status: booking.status,
            item: self.items.get(&booking.item_id)?.clone(),
            booker: self.users.get(&booking.booker_id)?.clone(),
        })
    }

    fn details_where(&self, pred: impl Fn(&Booking, &Item) -> bool) -> Vec<BookingDetails> {
        let mut out: Vec<BookingDetails> = self
            .bookings
            .values()
            .filter(|b| self.items.get(&b.item_id).is_some_and(|item| pred(b, item)))
            .filter_map(|b| self.details(b))
            .collect();
        out.sort_by(|a, b| b.start.cmp(&a.start));
        out
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            users: self.clone(),
            items: self.clone(),
            bookings: self.clone(),
            comments: self.clone(),
            requests: self.clone(),
        }
    }

    pub fn booking_count(&self) -> usize {
        self.lock().bookings.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let mut t = self.lock();
        if t.users.values().any(|u| u.email == user.email) {
            return Err(Box::new(CoreError::AlreadyExists("email".into())));
        }
        let id = t.next_id();
        let user = User { id, name: user.name.clone(), email: user.email.clone() };
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> RepoResult<User> {
        let mut t = self.lock();
        if t.users.values().any(|u| u.email == user.email && u.id != user.id) {
            return Err(Box::new(CoreError::AlreadyExists("email".into())));
        }
        t.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> RepoResult<()> {
        let mut t = self.lock();
        t.users.remove(&id);
        t.items.retain(|_, item| item.owner_id != id);
        let items = t.items.clone();
        t.bookings.retain(|_, b| b.booker_id != id && items.contains_key(&b.item_id));
        t.comments.retain(|_, c| c.author_id != id && items.contains_key(&c.item_id));
        t.requests.retain(|_, r| r.requester_id != id);
        let requests = t.requests.clone();
        for item in t.items.values_mut() {
            if item.request_id.is_some_and(|r| !requests.contains_key(&r)) {
                item.request_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn create_item(&self, owner_id: i64, item: &NewItem) -> RepoResult<Item> {
        let mut t = self.lock();
        let id = t.next_id();
        let item = Item {
            id,
            name: item.name.clone(),
            description: item.description.clone(),
            available: item.available,
            owner_id,
            request_id: item.request_id,
        };
        t.items.insert(id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: i64) -> RepoResult<Option<Item>> {
        Ok(self.lock().items.get(&id).cloned())
    }

    async fn update_item(&self, item: &Item) -> RepoResult<Item> {
        self.lock().items.insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn list_by_owner(&self, owner_id: i64) -> RepoResult<Vec<Item>> {
        Ok(self.lock().items.values().filter(|i| i.owner_id == owner_id).cloned().collect())
    }

    async fn search_available(&self, text: &str) -> RepoResult<Vec<Item>> {
        let needle = text.to_lowercase();
        Ok(self
            .lock()
            .items
            .values()
            .filter(|i| i.available)
            .filter(|i| i.name.to_lowercase().contains(&needle) || i.description.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn list_by_requests(&self, request_ids: &[i64]) -> RepoResult<Vec<Item>> {
        Ok(self
            .lock()
            .items
            .values()
            .filter(|i| i.request_id.is_some_and(|r| request_ids.contains(&r)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &NewBooking) -> RepoResult<Booking> {
        let mut t = self.lock();
        let id = t.next_id();
        let booking = Booking {
            id,
            start: booking.start,
            end: booking.end,
            item_id: booking.item_id,
            booker_id: booking.booker_id,
            status: booking.status,
        };
        t.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: i64) -> RepoResult<Option<BookingDetails>> {
        let t = self.lock();
        Ok(t.bookings.get(&id).and_then(|b| t.details(b)))
    }

    async fn update_status(&self, id: i64, status: BookingStatus) -> RepoResult<()> {
        if let Some(booking) = self.lock().bookings.get_mut(&id) {
            booking.status = status;
        }
        Ok(())
    }

    async fn list_by_booker(&self, booker_id: i64) -> RepoResult<Vec<BookingDetails>> {
        Ok(self.lock().details_where(|b, _| b.booker_id == booker_id))
    }

    async fn list_by_owner(&self, owner_id: i64) -> RepoResult<Vec<BookingDetails>> {
        Ok(self.lock().details_where(|_, item| item.owner_id == owner_id))
    }

    async fn list_approved_for_items(&self, item_ids: &[i64]) -> RepoResult<Vec<Booking>> {
        let mut out: Vec<Booking> = self
            .lock()
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Approved && item_ids.contains(&b.item_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.start.cmp(&a.start));
        Ok(out)
    }

    async fn has_completed_rental(
        &self,
        booker_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        Ok(self.lock().bookings.values().any(|b| {
            b.booker_id == booker_id && b.item_id == item_id && b.status == BookingStatus::Approved && b.end < now
        }))
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create_comment(&self, comment: &NewComment) -> RepoResult<Comment> {
        let mut t = self.lock();
        let author_name = t
            .users
            .get(&comment.author_id)
            .map(|u| u.name.clone())
            .ok_or("comment author does not exist")?;
        let id = t.next_id();
        let comment = Comment {
            id,
            text: comment.text.clone(),
            item_id: comment.item_id,
            author_id: comment.author_id,
            author_name,
            created: comment.created,
        };
        t.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn list_for_items(&self, item_ids: &[i64]) -> RepoResult<Vec<Comment>> {
        let mut out: Vec<Comment> = self
            .lock()
            .comments
            .values()
            .filter(|c| item_ids.contains(&c.item_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(out)
    }
}

#[async_trait]
impl RequestRepository for MemoryStore {
    async fn create_request(
        &self,
        requester_id: i64,
        description: &str,
        created: DateTime<Utc>,
    ) -> RepoResult<ItemRequest> {
        let mut t = self.lock();
        let id = t.next_id();
        let request = ItemRequest { id, description: description.to_string(), requester_id, created };
        t.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: i64) -> RepoResult<Option<ItemRequest>> {
        Ok(self.lock().requests.get(&id).cloned())
    }

    async fn list_by_requester(&self, requester_id: i64) -> RepoResult<Vec<ItemRequest>> {
        let mut out: Vec<ItemRequest> =
            self.lock().requests.values().filter(|r| r.requester_id == requester_id).cloned().collect();
        out.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn list_excluding_requester(&self, requester_id: i64) -> RepoResult<Vec<ItemRequest>> {
        let mut out: Vec<ItemRequest> =
            self.lock().requests.values().filter(|r| r.requester_id != requester_id).cloned().collect();
        out.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(out)
    }
}
