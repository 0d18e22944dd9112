use std::sync::Arc;

use crate::repository::ListRepository;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ListRepository>,
}

impl AppState {
    pub fn new(repo: Arc<dyn ListRepository>) -> Self {
        Self { repo }
    }
}
