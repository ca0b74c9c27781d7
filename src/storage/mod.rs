//! Entity store.
//!
//! [`Storage`] is the persistence boundary the route layer talks to. Two
//! backends implement it: [`MemoryStorage`] keeps everything in process, and
//! [`PgStorage`] keeps it in PostgreSQL. The backend is chosen once at start-up
//! and shared as an `Arc<dyn Storage>`.

pub mod dashboard;
pub mod memory;
pub mod postgres;
pub mod seed;

use async_trait::async_trait;

use crate::models::{
    Announcement, Assignment, AssignmentPatch, Course, DashboardData, Enrollment, NewAnnouncement,
    NewAssignment, NewCourse, NewEnrollment, NewResource, NewUser, Resource, User,
};

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: i32 },
    #[error("{field} references missing {entity} {id}")]
    MissingReference {
        field: &'static str,
        entity: &'static str,
        id: i32,
    },
    #[error("{entity} with {field} `{value}` already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        StoreError::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_user(&self, id: i32) -> StoreResult<Option<User>>;

    async fn get_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>>;

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn count_users(&self) -> StoreResult<usize>;

    async fn get_courses(&self) -> StoreResult<Vec<Course>>;

    async fn get_course(&self, id: i32) -> StoreResult<Option<Course>>;

    async fn create_course(&self, course: NewCourse) -> StoreResult<Course>;

    /// Fails with [`StoreError::MissingReference`] unless both the user and
    /// the course exist.
    async fn create_enrollment(&self, enrollment: NewEnrollment) -> StoreResult<Enrollment>;

    /// The user's enrollments in insertion order.
    async fn get_enrollments(&self, user_id: i32) -> StoreResult<Vec<Enrollment>>;

    /// All assignments, or only those of `course_id`.
    async fn get_assignments(&self, course_id: Option<i32>) -> StoreResult<Vec<Assignment>>;

    async fn create_assignment(&self, assignment: NewAssignment) -> StoreResult<Assignment>;

    /// Merges the fields present in `patch` into the stored assignment and
    /// returns the merged record.
    async fn update_assignment(&self, id: i32, patch: AssignmentPatch) -> StoreResult<Assignment>;

    async fn get_announcements(&self) -> StoreResult<Vec<Announcement>>;

    async fn create_announcement(&self, announcement: NewAnnouncement) -> StoreResult<Announcement>;

    async fn get_resources(&self) -> StoreResult<Vec<Resource>>;

    async fn create_resource(&self, resource: NewResource) -> StoreResult<Resource>;

    async fn get_dashboard_data(&self, user_id: i32) -> StoreResult<DashboardData>;

    /// Inserts the demo data set unless a user already exists. Returns
    /// whether anything was inserted.
    async fn seed_initial_data(&self) -> StoreResult<bool> {
        seed::seed(self).await
    }
}
