//! Participant registration and the classroom roster.
//!
//! Roles are self-declared; nothing here authenticates anyone.

use chrono::Utc;

use crate::errors::AppError;
use crate::ids::new_id;
use crate::models::{RegisterRequest, Role, User};
use crate::store::SharedStore;
use crate::validate;

#[derive(Clone)]
pub struct RosterService {
    store: SharedStore,
}

impl RosterService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Register a student. Names need not be unique.
    pub async fn register_student(&self, request: &RegisterRequest) -> Result<User, AppError> {
        self.register(request, Role::Student).await
    }

    /// Register a teacher. Teachers are kept in the roster like students
    /// but never count toward full participation.
    pub async fn register_teacher(&self, request: &RegisterRequest) -> Result<User, AppError> {
        self.register(request, Role::Teacher).await
    }

    async fn register(&self, request: &RegisterRequest, role: Role) -> Result<User, AppError> {
        let name = validate::require(&request.name, validate::non_blank_text, "Name is required")?;

        let now = Utc::now();
        let user = User {
            id: new_id(),
            name,
            role,
            session_id: new_id(),
            created_at: now,
            last_active: now,
        };

        self.store.lock().await.insert_user(user.clone());
        tracing::info!("Registered {:?} {} ({})", user.role, user.name, user.id);

        Ok(user)
    }

    /// Everyone registered, in registration order.
    pub async fn list(&self) -> Vec<User> {
        self.store.lock().await.users().to_vec()
    }

    /// Drop a student from the roster. Their recorded responses stay.
    pub async fn remove_student(&self, id: &str) -> Result<User, AppError> {
        let mut store = self.store.lock().await;

        let is_student = store
            .users()
            .iter()
            .any(|u| u.id == id && u.role == Role::Student);
        if !is_student {
            return Err(AppError::NotFound(format!("Student {} not found", id)));
        }

        let removed = store
            .remove_user(id)
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))?;
        tracing::info!("Removed student {} ({})", removed.name, removed.id);

        Ok(removed)
    }
}
