use std::sync::Arc;

use crate::repository::TodoRepository;
use crate::storage::AttachmentStore;

#[derive(Clone)]
pub struct AppState {
    pub todos: Arc<dyn TodoRepository>,
    pub attachments: Arc<dyn AttachmentStore>,
}

impl AppState {
    pub fn new(todos: Arc<dyn TodoRepository>, attachments: Arc<dyn AttachmentStore>) -> Self {
        Self { todos, attachments }
    }
}
