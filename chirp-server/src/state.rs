use crate::db::Database;
use crate::images::ImageStore;
use crate::placeholder::PlaceholderClient;
use crate::session::SessionManager;

/// Everything a handler needs, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub session_manager: SessionManager,
    pub images: ImageStore,
    pub placeholder: PlaceholderClient,
}

impl AppState {
    pub fn new(db: Database, images: ImageStore, placeholder: PlaceholderClient) -> Self {
        let session_manager = SessionManager::new(db.clone());
        Self {
            db,
            session_manager,
            images,
            placeholder,
        }
    }
}
