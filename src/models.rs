use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::Postgres;

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub external_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub affiliations: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub external_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub affiliations: Vec<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i32,
    pub code: String,
    pub title: String,
    pub term: String,
    pub instructor: String,
    pub location: Option<String>,
    pub schedule: Option<String>,
    #[serde(default = "default_credits")]
    pub credits: i32,
    #[serde(default = "default_color")]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub code: String,
    pub title: String,
    pub term: String,
    pub instructor: String,
    pub location: Option<String>,
    pub schedule: Option<String>,
    pub credits: Option<i32>,
    pub color: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i32,
    pub user_id: i32,
    pub course_id: i32,
    #[serde(default = "default_role")]
    pub role: String,
    pub current_grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnrollment {
    pub user_id: i32,
    pub course_id: i32,
    pub role: Option<String>,
    pub current_grade: Option<String>,
}

/// Progress of an assignment.
///
/// Only [`AssignmentStatus::Completed`] takes an assignment off the
/// dashboard task list; `submitted` and `graded` still count as open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    Submitted,
    Graded,
    Completed,
}

impl AssignmentStatus {
    pub const ALL: [&'static str; 4] = ["pending", "submitted", "graded", "completed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Submitted => "submitted",
            AssignmentStatus::Graded => "graded",
            AssignmentStatus::Completed => "completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        *self == AssignmentStatus::Completed
    }

    /// The status a checkbox toggle moves to.
    pub fn toggled(&self) -> AssignmentStatus {
        if self.is_completed() {
            AssignmentStatus::Pending
        } else {
            AssignmentStatus::Completed
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: i32,
    pub course_id: i32,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: AssignmentStatus,
    pub score: Option<String>,
    pub max_score: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub course_id: i32,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: AssignmentStatus,
    pub score: Option<String>,
    pub max_score: Option<String>,
}

/// Partial update for an [`Assignment`].
///
/// Nullable fields use a double option: the outer `None` leaves the field
/// alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AssignmentStatus>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub score: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub max_score: Option<Option<String>>,
}

impl AssignmentPatch {
    pub fn status(status: AssignmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Shallow merge: every field present in the patch overwrites the record.
    pub fn apply_to(self, assignment: &mut Assignment) {
        if let Some(course_id) = self.course_id {
            assignment.course_id = course_id;
        }
        if let Some(title) = self.title {
            assignment.title = title;
        }
        if let Some(due_date) = self.due_date {
            assignment.due_date = due_date;
        }
        if let Some(status) = self.status {
            assignment.status = status;
        }
        if let Some(score) = self.score {
            assignment.score = score;
        }
        if let Some(max_score) = self.max_score {
            assignment.max_score = max_score;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
    Alert,
}

impl Priority {
    pub const ALL: [&'static str; 3] = ["normal", "high", "alert"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Alert => "alert",
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub source: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    pub source: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: i32,
    pub title: String,
    pub url: String,
    pub category: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResource {
    pub title: String,
    pub url: String,
    pub category: String,
    pub icon: Option<String>,
}

/// A course as the dashboard shows it: the enrollment's grade and every
/// assignment of the course folded into the course record.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseWithGrade {
    #[serde(flatten)]
    pub course: Course,
    pub grade: Option<String>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub user: User,
    pub courses: Vec<CourseWithGrade>,
    pub announcements: Vec<Announcement>,
    pub resources: Vec<Resource>,
    pub tasks: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} `{}`", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for AssignmentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AssignmentStatus::Pending),
            "submitted" => Ok(AssignmentStatus::Submitted),
            "graded" => Ok(AssignmentStatus::Graded),
            "completed" => Ok(AssignmentStatus::Completed),
            other => Err(UnknownVariant {
                kind: "assignment status",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "alert" => Ok(Priority::Alert),
            other => Err(UnknownVariant {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

// Both enums live in `text` columns.
macro_rules! text_column {
    ($ty:ty) => {
        impl sqlx::Type<Postgres> for $ty {
            fn type_info() -> PgTypeInfo {
                <&str as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <&str as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, Postgres> for $ty {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let text = <&str as sqlx::Decode<Postgres>>::decode(value)?;
                Ok(text.parse::<$ty>()?)
            }
        }

        impl<'q> sqlx::Encode<'q, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
                <&str as sqlx::Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

text_column!(AssignmentStatus);
text_column!(Priority);

fn default_credits() -> i32 {
    3
}

fn default_color() -> String {
    "maroon".to_string()
}

fn default_role() -> String {
    "student".to_string()
}

impl NewCourse {
    pub fn credits_or_default(&self) -> i32 {
        self.credits.unwrap_or_else(default_credits)
    }

    pub fn color_or_default(&self) -> String {
        self.color.clone().unwrap_or_else(default_color)
    }
}

impl NewEnrollment {
    pub fn role_or_default(&self) -> String {
        self.role.clone().unwrap_or_else(default_role)
    }
}
