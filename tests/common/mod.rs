#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use portal_server::chat::ChatCompletion;
use portal_server::models::{
    Announcement, Assignment, AssignmentPatch, Course, DashboardData, Enrollment, NewAnnouncement,
    NewAssignment, NewCourse, NewEnrollment, NewResource, NewUser, Resource, User,
};
use portal_server::predict::{Prediction, Predictor};
use portal_server::storage::{MemoryStorage, Storage, StoreError, StoreResult};
use portal_server::AppState;

/// Answers every prediction with the same score and remembers the last input.
#[derive(Default)]
pub struct FixedPredictor {
    pub score: f64,
    pub last_input: Mutex<Option<Value>>,
}

impl FixedPredictor {
    pub fn new(score: f64) -> Arc<Self> {
        Arc::new(Self {
            score,
            last_input: Mutex::new(None),
        })
    }

    pub fn last_input(&self) -> Option<Value> {
        self.last_input.lock().unwrap().clone()
    }
}

#[async_trait]
impl Predictor for FixedPredictor {
    async fn predict(&self, features: &Value) -> Result<Prediction> {
        *self.last_input.lock().unwrap() = Some(features.clone());
        Ok(Prediction { score: self.score })
    }
}

pub struct FailingPredictor;

#[async_trait]
impl Predictor for FailingPredictor {
    async fn predict(&self, _features: &Value) -> Result<Prediction> {
        Err(anyhow!("prediction process exited with exit status: 1 and no output"))
    }
}

pub struct EchoChat;

#[async_trait]
impl ChatCompletion for EchoChat {
    async fn complete(&self, input: &str) -> Result<String> {
        Ok(format!("echo: {}", input))
    }
}

/// Seeded store whose user lookups fail as if the database were down.
#[derive(Default)]
pub struct UserLookupDown {
    inner: MemoryStorage,
}

impl UserLookupDown {
    pub async fn seeded() -> Arc<Self> {
        let storage = Self::default();
        storage.inner.seed_initial_data().await.unwrap();
        Arc::new(storage)
    }
}

#[async_trait]
impl Storage for UserLookupDown {
    async fn get_user(&self, _id: i32) -> StoreResult<Option<User>> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn get_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        self.inner.get_user_by_external_id(external_id).await
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.inner.create_user(user).await
    }

    async fn count_users(&self) -> StoreResult<usize> {
        self.inner.count_users().await
    }

    async fn get_courses(&self) -> StoreResult<Vec<Course>> {
        self.inner.get_courses().await
    }

    async fn get_course(&self, id: i32) -> StoreResult<Option<Course>> {
        self.inner.get_course(id).await
    }

    async fn create_course(&self, course: NewCourse) -> StoreResult<Course> {
        self.inner.create_course(course).await
    }

    async fn create_enrollment(&self, enrollment: NewEnrollment) -> StoreResult<Enrollment> {
        self.inner.create_enrollment(enrollment).await
    }

    async fn get_enrollments(&self, user_id: i32) -> StoreResult<Vec<Enrollment>> {
        self.inner.get_enrollments(user_id).await
    }

    async fn get_assignments(&self, course_id: Option<i32>) -> StoreResult<Vec<Assignment>> {
        self.inner.get_assignments(course_id).await
    }

    async fn create_assignment(&self, assignment: NewAssignment) -> StoreResult<Assignment> {
        self.inner.create_assignment(assignment).await
    }

    async fn update_assignment(&self, id: i32, patch: AssignmentPatch) -> StoreResult<Assignment> {
        self.inner.update_assignment(id, patch).await
    }

    async fn get_announcements(&self) -> StoreResult<Vec<Announcement>> {
        self.inner.get_announcements().await
    }

    async fn create_announcement(&self, announcement: NewAnnouncement) -> StoreResult<Announcement> {
        self.inner.create_announcement(announcement).await
    }

    async fn get_resources(&self) -> StoreResult<Vec<Resource>> {
        self.inner.get_resources().await
    }

    async fn create_resource(&self, resource: NewResource) -> StoreResult<Resource> {
        self.inner.create_resource(resource).await
    }

    async fn get_dashboard_data(&self, user_id: i32) -> StoreResult<DashboardData> {
        self.inner.get_dashboard_data(user_id).await
    }
}

pub async fn seeded_storage() -> Arc<dyn Storage> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    storage.seed_initial_data().await.unwrap();
    storage
}

pub fn state(storage: Arc<dyn Storage>) -> AppState {
    AppState::new(storage).with_predictors(Arc::new(FailingPredictor), Arc::new(FailingPredictor))
}
