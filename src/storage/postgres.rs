use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use crate::models::{
    Announcement, Assignment, AssignmentPatch, Course, DashboardData, Enrollment, NewAnnouncement,
    NewAssignment, NewCourse, NewEnrollment, NewResource, NewUser, Resource, User,
};
use crate::storage::{dashboard, Storage, StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../migrations/001_schema.sql");

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates any missing tables.
    pub async fn migrate(&self) -> StoreResult<()> {
        (&self.pool).execute(SCHEMA).await?;
        Ok(())
    }

    async fn ensure_course(&self, field: &'static str, id: i32) -> StoreResult<()> {
        match self.get_course(id).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::MissingReference {
                field,
                entity: "Course",
                id,
            }),
        }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get_user(&self, id: i32) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1 LIMIT 1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        if self.get_user_by_external_id(&user.external_id).await?.is_some() {
            return Err(StoreError::Duplicate {
                entity: "User",
                field: "externalId",
                value: user.external_id,
            });
        }

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (external_id, name, email, affiliations) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&user.external_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.affiliations)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn count_users(&self) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn get_courses(&self) -> StoreResult<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(courses)
    }

    async fn get_course(&self, id: i32) -> StoreResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1 LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(course)
    }

    async fn create_course(&self, course: NewCourse) -> StoreResult<Course> {
        let course = sqlx::query_as::<_, Course>(
            "INSERT INTO courses (code, title, term, instructor, location, schedule, credits, color) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(&course.code)
        .bind(&course.title)
        .bind(&course.term)
        .bind(&course.instructor)
        .bind(&course.location)
        .bind(&course.schedule)
        .bind(course.credits_or_default())
        .bind(course.color_or_default())
        .fetch_one(&self.pool)
        .await?;
        Ok(course)
    }

    async fn create_enrollment(&self, enrollment: NewEnrollment) -> StoreResult<Enrollment> {
        if self.get_user(enrollment.user_id).await?.is_none() {
            return Err(StoreError::MissingReference {
                field: "userId",
                entity: "User",
                id: enrollment.user_id,
            });
        }
        self.ensure_course("courseId", enrollment.course_id).await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(
            "INSERT INTO enrollments (user_id, course_id, role, current_grade) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(enrollment.user_id)
        .bind(enrollment.course_id)
        .bind(enrollment.role_or_default())
        .bind(&enrollment.current_grade)
        .fetch_one(&self.pool)
        .await?;
        Ok(enrollment)
    }

    async fn get_enrollments(&self, user_id: i32) -> StoreResult<Vec<Enrollment>> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(enrollments)
    }

    async fn get_assignments(&self, course_id: Option<i32>) -> StoreResult<Vec<Assignment>> {
        let assignments = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments WHERE ($1::INTEGER IS NULL OR course_id = $1) ORDER BY id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }

    async fn create_assignment(&self, assignment: NewAssignment) -> StoreResult<Assignment> {
        self.ensure_course("courseId", assignment.course_id).await?;

        let assignment = sqlx::query_as::<_, Assignment>(
            "INSERT INTO assignments (course_id, title, due_date, status, score, max_score) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(assignment.course_id)
        .bind(&assignment.title)
        .bind(assignment.due_date)
        .bind(assignment.status)
        .bind(&assignment.score)
        .bind(&assignment.max_score)
        .fetch_one(&self.pool)
        .await?;
        Ok(assignment)
    }

    async fn update_assignment(&self, id: i32, patch: AssignmentPatch) -> StoreResult<Assignment> {
        if let Some(course_id) = patch.course_id {
            self.ensure_course("courseId", course_id).await?;
        }

        let mut assignment =
            sqlx::query_as::<_, Assignment>("SELECT * FROM assignments WHERE id = $1 LIMIT 1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| StoreError::not_found("Assignment", id))?;
        patch.apply_to(&mut assignment);

        let assignment = sqlx::query_as::<_, Assignment>(
            "UPDATE assignments \
             SET course_id = $2, title = $3, due_date = $4, status = $5, score = $6, max_score = $7 \
             WHERE id = $1 RETURNING *",
        )
        .bind(assignment.id)
        .bind(assignment.course_id)
        .bind(&assignment.title)
        .bind(assignment.due_date)
        .bind(assignment.status)
        .bind(&assignment.score)
        .bind(&assignment.max_score)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("Assignment", id))?;
        Ok(assignment)
    }

    async fn get_announcements(&self) -> StoreResult<Vec<Announcement>> {
        let announcements =
            sqlx::query_as::<_, Announcement>("SELECT * FROM announcements ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(announcements)
    }

    async fn create_announcement(&self, announcement: NewAnnouncement) -> StoreResult<Announcement> {
        let announcement = sqlx::query_as::<_, Announcement>(
            "INSERT INTO announcements (title, content, source, date, priority) \
             VALUES ($1, $2, $3, COALESCE($4, now()), $5) RETURNING *",
        )
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(&announcement.source)
        .bind(announcement.date)
        .bind(announcement.priority)
        .fetch_one(&self.pool)
        .await?;
        Ok(announcement)
    }

    async fn get_resources(&self) -> StoreResult<Vec<Resource>> {
        let resources = sqlx::query_as::<_, Resource>("SELECT * FROM resources ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(resources)
    }

    async fn create_resource(&self, resource: NewResource) -> StoreResult<Resource> {
        let resource = sqlx::query_as::<_, Resource>(
            "INSERT INTO resources (title, url, category, icon) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&resource.title)
        .bind(&resource.url)
        .bind(&resource.category)
        .bind(&resource.icon)
        .fetch_one(&self.pool)
        .await?;
        Ok(resource)
    }

    async fn get_dashboard_data(&self, user_id: i32) -> StoreResult<DashboardData> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| StoreError::not_found("User", user_id))?;

        let enrollments = self.get_enrollments(user_id).await?;
        let courses = self.get_courses().await?;
        let assignments = self.get_assignments(None).await?;
        let announcements = self.get_announcements().await?;
        let resources = self.get_resources().await?;

        Ok(dashboard::compose(
            user,
            &enrollments,
            &courses,
            &assignments,
            announcements,
            resources,
        ))
    }
}
