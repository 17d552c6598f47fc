//! Application state shared across handlers

use std::sync::Arc;

use secondop_marketplace::Marketplace;

#[derive(Clone)]
pub struct AppState {
    pub market: Arc<Marketplace>,
}

impl AppState {
    pub fn new(market: Arc<Marketplace>) -> Self {
        Self { market }
    }
}
