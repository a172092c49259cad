use std::sync::Arc;

use shareit_core::{BookingService, Clock, ItemService, Repositories, RequestService, UserService};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub items: Arc<ItemService>,
    pub bookings: Arc<BookingService>,
    pub requests: Arc<RequestService>,
}

impl AppState {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: Arc::new(UserService::new(repos.clone())),
            items: Arc::new(ItemService::new(repos.clone(), clock.clone())),
            bookings: Arc::new(BookingService::new(repos.clone(), clock.clone())),
            requests: Arc::new(RequestService::new(repos, clock)),
        }
    }
}
