use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{
    Announcement, Assignment, AssignmentPatch, Course, DashboardData, Enrollment, NewAnnouncement,
    NewAssignment, NewCourse, NewEnrollment, NewResource, NewUser, Resource, User,
};
use crate::storage::{dashboard, Storage, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    courses: Vec<Course>,
    enrollments: Vec<Enrollment>,
    assignments: Vec<Assignment>,
    announcements: Vec<Announcement>,
    resources: Vec<Resource>,
}

impl Tables {
    fn has_user(&self, id: i32) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn has_course(&self, id: i32) -> bool {
        self.courses.iter().any(|c| c.id == id)
    }
}

/// Rows are never deleted, so one past the largest id stays monotonic.
fn next_id<T>(rows: &[T], id: impl Fn(&T) -> i32) -> i32 {
    rows.iter().map(id).max().unwrap_or(0) + 1
}

/// Process-local store. Collections keep insertion order.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_user(&self, id: i32) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.external_id == user.external_id) {
            return Err(StoreError::Duplicate {
                entity: "User",
                field: "externalId",
                value: user.external_id,
            });
        }
        let user = User {
            id: next_id(&tables.users, |u| u.id),
            external_id: user.external_id,
            name: user.name,
            email: user.email,
            affiliations: user.affiliations,
            created_at: Some(Utc::now()),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn count_users(&self) -> StoreResult<usize> {
        Ok(self.tables.read().await.users.len())
    }

    async fn get_courses(&self) -> StoreResult<Vec<Course>> {
        Ok(self.tables.read().await.courses.clone())
    }

    async fn get_course(&self, id: i32) -> StoreResult<Option<Course>> {
        let tables = self.tables.read().await;
        Ok(tables.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn create_course(&self, course: NewCourse) -> StoreResult<Course> {
        let mut tables = self.tables.write().await;
        let course = Course {
            id: next_id(&tables.courses, |c| c.id),
            credits: course.credits_or_default(),
            color: course.color_or_default(),
            code: course.code,
            title: course.title,
            term: course.term,
            instructor: course.instructor,
            location: course.location,
            schedule: course.schedule,
        };
        tables.courses.push(course.clone());
        Ok(course)
    }

    async fn create_enrollment(&self, enrollment: NewEnrollment) -> StoreResult<Enrollment> {
        let mut tables = self.tables.write().await;
        if !tables.has_user(enrollment.user_id) {
            return Err(StoreError::MissingReference {
                field: "userId",
                entity: "User",
                id: enrollment.user_id,
            });
        }
        if !tables.has_course(enrollment.course_id) {
            return Err(StoreError::MissingReference {
                field: "courseId",
                entity: "Course",
                id: enrollment.course_id,
            });
        }
        let enrollment = Enrollment {
            id: next_id(&tables.enrollments, |e| e.id),
            role: enrollment.role_or_default(),
            user_id: enrollment.user_id,
            course_id: enrollment.course_id,
            current_grade: enrollment.current_grade,
        };
        tables.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn get_enrollments(&self, user_id: i32) -> StoreResult<Vec<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_assignments(&self, course_id: Option<i32>) -> StoreResult<Vec<Assignment>> {
        let tables = self.tables.read().await;
        Ok(match course_id {
            Some(course_id) => tables
                .assignments
                .iter()
                .filter(|a| a.course_id == course_id)
                .cloned()
                .collect(),
            None => tables.assignments.clone(),
        })
    }

    async fn create_assignment(&self, assignment: NewAssignment) -> StoreResult<Assignment> {
        let mut tables = self.tables.write().await;
        if !tables.has_course(assignment.course_id) {
            return Err(StoreError::MissingReference {
                field: "courseId",
                entity: "Course",
                id: assignment.course_id,
            });
        }
        let assignment = Assignment {
            id: next_id(&tables.assignments, |a| a.id),
            course_id: assignment.course_id,
            title: assignment.title,
            due_date: assignment.due_date,
            status: assignment.status,
            score: assignment.score,
            max_score: assignment.max_score,
        };
        tables.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(&self, id: i32, patch: AssignmentPatch) -> StoreResult<Assignment> {
        let mut tables = self.tables.write().await;
        if let Some(course_id) = patch.course_id {
            if !tables.has_course(course_id) {
                return Err(StoreError::MissingReference {
                    field: "courseId",
                    entity: "Course",
                    id: course_id,
                });
            }
        }
        let assignment = tables
            .assignments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::not_found("Assignment", id))?;
        patch.apply_to(assignment);
        Ok(assignment.clone())
    }

    async fn get_announcements(&self) -> StoreResult<Vec<Announcement>> {
        Ok(self.tables.read().await.announcements.clone())
    }

    async fn create_announcement(&self, announcement: NewAnnouncement) -> StoreResult<Announcement> {
        let mut tables = self.tables.write().await;
        let announcement = Announcement {
            id: next_id(&tables.announcements, |a| a.id),
            title: announcement.title,
            content: announcement.content,
            source: announcement.source,
            date: announcement.date.or_else(|| Some(Utc::now())),
            priority: announcement.priority,
        };
        tables.announcements.push(announcement.clone());
        Ok(announcement)
    }

    async fn get_resources(&self) -> StoreResult<Vec<Resource>> {
        Ok(self.tables.read().await.resources.clone())
    }

    async fn create_resource(&self, resource: NewResource) -> StoreResult<Resource> {
        let mut tables = self.tables.write().await;
        let resource = Resource {
            id: next_id(&tables.resources, |r| r.id),
            title: resource.title,
            url: resource.url,
            category: resource.category,
            icon: resource.icon,
        };
        tables.resources.push(resource.clone());
        Ok(resource)
    }

    async fn get_dashboard_data(&self, user_id: i32) -> StoreResult<DashboardData> {
        let tables = self.tables.read().await;
        let user = tables
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", user_id))?;

        Ok(dashboard::compose(
            user,
            &tables.enrollments,
            &tables.courses,
            &tables.assignments,
            tables.announcements.clone(),
            tables.resources.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssignmentStatus;

    async fn seeded() -> MemoryStorage {
        let storage = MemoryStorage::new();
        assert!(storage.seed_initial_data().await.unwrap());
        storage
    }

    #[tokio::test]
    async fn seed_loads_fixture() {
        let storage = seeded().await;
        assert_eq!(storage.count_users().await.unwrap(), 1);
        assert_eq!(storage.get_courses().await.unwrap().len(), 3);
        assert_eq!(storage.get_enrollments(1).await.unwrap().len(), 3);
        assert_eq!(storage.get_announcements().await.unwrap().len(), 3);
        assert_eq!(storage.get_resources().await.unwrap().len(), 5);

        let assignments = storage.get_assignments(None).await.unwrap();
        assert_eq!(assignments.len(), 4);
        let webwork = assignments
            .iter()
            .find(|a| a.title == "WebWork Set 8")
            .unwrap();
        assert_eq!(webwork.status, AssignmentStatus::Completed);
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let storage = seeded().await;
        assert!(!storage.seed_initial_data().await.unwrap());
        assert_eq!(storage.count_users().await.unwrap(), 1);
        assert_eq!(storage.get_courses().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn dashboard_for_seeded_user() {
        let storage = seeded().await;
        let data = storage.get_dashboard_data(1).await.unwrap();
        assert_eq!(data.user.external_id, "andy");
        assert_eq!(data.courses.len(), 3);
        assert_eq!(data.tasks.len(), 3);
        assert!(data.tasks.iter().all(|t| !t.status.is_completed()));

        let grades: Vec<_> = data.courses.iter().map(|c| c.grade.as_deref()).collect();
        assert_eq!(grades, vec![Some("92%"), Some("88%"), Some("76%")]);

        for course in &data.courses {
            let expected = storage.get_assignments(Some(course.course.id)).await.unwrap();
            assert_eq!(course.assignments, expected);
        }
    }

    #[tokio::test]
    async fn dashboard_for_unknown_user_is_not_found() {
        let storage = seeded().await;
        let err = storage.get_dashboard_data(42).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn completing_an_assignment_changes_only_status() {
        let storage = seeded().await;
        let before = storage.get_assignments(None).await.unwrap()[0].clone();

        let once = storage
            .update_assignment(before.id, AssignmentPatch::status(AssignmentStatus::Completed))
            .await
            .unwrap();
        let twice = storage
            .update_assignment(before.id, AssignmentPatch::status(AssignmentStatus::Completed))
            .await
            .unwrap();

        assert_eq!(once, twice);
        assert_eq!(once.status, AssignmentStatus::Completed);
        assert_eq!(
            Assignment {
                status: before.status,
                ..once.clone()
            },
            before
        );

        let data = storage.get_dashboard_data(1).await.unwrap();
        assert_eq!(data.tasks.len(), 2);
    }

    #[tokio::test]
    async fn updating_unknown_assignment_is_not_found() {
        let storage = seeded().await;
        let err = storage
            .update_assignment(99, AssignmentPatch::status(AssignmentStatus::Completed))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Assignment not found");
    }

    #[tokio::test]
    async fn updating_to_unknown_course_is_rejected() {
        let storage = seeded().await;
        let patch = AssignmentPatch {
            course_id: Some(77),
            ..AssignmentPatch::default()
        };
        let err = storage.update_assignment(1, patch).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { field: "courseId", .. }));
        assert_eq!(storage.get_assignments(None).await.unwrap()[0].course_id, 1);
    }

    #[tokio::test]
    async fn enrollment_requires_existing_user_and_course() {
        let storage = seeded().await;
        let err = storage
            .create_enrollment(NewEnrollment {
                user_id: 5,
                course_id: 1,
                role: None,
                current_grade: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { field: "userId", .. }));
    }

    #[tokio::test]
    async fn ids_are_assigned_in_sequence() {
        let storage = MemoryStorage::new();
        let first = storage
            .create_user(NewUser {
                external_id: "a".to_string(),
                name: "A".to_string(),
                email: "a@asu.edu".to_string(),
                affiliations: vec![],
            })
            .await
            .unwrap();
        let second = storage
            .create_user(NewUser {
                external_id: "b".to_string(),
                name: "B".to_string(),
                email: "b@asu.edu".to_string(),
                affiliations: vec![],
            })
            .await
            .unwrap();
        assert_eq!((first.id, second.id), (1, 2));
        assert!(first.created_at.is_some());
        assert_eq!(
            storage.get_user_by_external_id("b").await.unwrap(),
            Some(second)
        );
    }

    #[tokio::test]
    async fn external_ids_are_unique() {
        let storage = seeded().await;
        let err = storage
            .create_user(NewUser {
                external_id: "andy".to_string(),
                name: "Other Andy".to_string(),
                email: "other@asu.edu".to_string(),
                affiliations: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }
}
