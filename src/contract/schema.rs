//! Declarative shape checks for request and response bodies.
//!
//! A [`Schema`] is an ordered list of [`Field`]s. Validation walks the
//! declared fields in order, then rejects keys the schema does not know, and
//! stops at the first failure so callers can report a single offending field.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{AssignmentStatus, Priority};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub message: String,
    pub field: String,
}

impl ValidationError {
    pub fn new<M: Into<String>, F: Into<String>>(field: F, message: M) -> Self {
        Self {
            message: message.into(),
            field: field.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Integer,
    Number,
    Text,
    Timestamp,
    TextList,
    OneOf(&'static [&'static str]),
    Object(&'static Schema),
    ArrayOf(&'static Schema),
    /// Object whose values are all numbers.
    NumberMap,
    NumberOrNumberMap,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
    pub nullable: bool,
}

impl Field {
    pub const fn required(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: true,
            nullable: false,
        }
    }

    pub const fn optional(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: false,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: false,
            nullable: true,
        }
    }
}

#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    /// Fields inherited from another schema, checked before `fields`.
    pub base: Option<&'static Schema>,
    pub fields: &'static [Field],
    /// Kind accepted for keys not declared in `fields`; `None` rejects them.
    pub extra: Option<Kind>,
}

impl Schema {
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.check(value, "", false)
    }

    /// Validation where every declared field is optional.
    pub fn validate_partial(&self, value: &Value) -> Result<(), ValidationError> {
        self.check(value, "", true)
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .or_else(|| self.base.and_then(|base| base.field(name)))
    }

    fn all_fields(&self) -> impl Iterator<Item = &'static Field> {
        let inherited = self.base.map(|base| base.fields).unwrap_or(&[]);
        inherited.iter().chain(self.fields.iter())
    }

    fn check(&self, value: &Value, path: &str, partial: bool) -> Result<(), ValidationError> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(ValidationError::new(
                    or_body(path),
                    format!("Expected object, received {}", type_name(other)),
                ))
            }
        };

        for field in self.all_fields() {
            let field_path = join(path, field.name);
            match object.get(field.name) {
                None if field.required && !partial => {
                    return Err(ValidationError::new(field_path, "Required"))
                }
                None => {}
                Some(Value::Null) if field.nullable => {}
                Some(value) => field.kind.check(value, &field_path)?,
            }
        }

        self.check_unknown_keys(object, path)
    }

    fn check_unknown_keys(&self, object: &Map<String, Value>, path: &str) -> Result<(), ValidationError> {
        for (key, value) in object {
            if self.field(key).is_some() {
                continue;
            }
            let key_path = join(path, key);
            match self.extra {
                Some(kind) => kind.check(value, &key_path)?,
                None => {
                    return Err(ValidationError::new(
                        key_path,
                        format!("Unrecognized key '{}'", key),
                    ))
                }
            }
        }
        Ok(())
    }
}

impl Kind {
    pub fn check(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        match self {
            Kind::Integer => match value.as_i64() {
                Some(n) if i32::try_from(n).is_ok() => Ok(()),
                Some(_) => Err(ValidationError::new(path, "Number out of range")),
                None => Err(expected("integer", value, path)),
            },
            Kind::Number if value.is_number() => Ok(()),
            Kind::Number => Err(expected("number", value, path)),
            Kind::Text if value.is_string() => Ok(()),
            Kind::Text => Err(expected("string", value, path)),
            Kind::Timestamp => match value.as_str() {
                Some(text) if DateTime::parse_from_rfc3339(text).is_ok() => Ok(()),
                Some(_) => Err(ValidationError::new(path, "Invalid date")),
                None => Err(expected("date", value, path)),
            },
            Kind::TextList => {
                let items = value.as_array().ok_or_else(|| expected("array", value, path))?;
                for (index, item) in items.iter().enumerate() {
                    Kind::Text.check(item, &join(path, &index.to_string()))?;
                }
                Ok(())
            }
            Kind::OneOf(options) => {
                let text = value.as_str().ok_or_else(|| expected("string", value, path))?;
                if options.contains(&text) {
                    Ok(())
                } else {
                    let expected = options
                        .iter()
                        .map(|option| format!("'{}'", option))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    Err(ValidationError::new(
                        path,
                        format!("Invalid enum value. Expected {}, received '{}'", expected, text),
                    ))
                }
            }
            Kind::Object(schema) => schema.check(value, path, false),
            Kind::ArrayOf(schema) => {
                let items = value.as_array().ok_or_else(|| expected("array", value, path))?;
                for (index, item) in items.iter().enumerate() {
                    schema.check(item, &join(path, &index.to_string()), false)?;
                }
                Ok(())
            }
            Kind::NumberMap => {
                let entries = value.as_object().ok_or_else(|| expected("object", value, path))?;
                for (key, entry) in entries {
                    Kind::Number.check(entry, &join(path, key))?;
                }
                Ok(())
            }
            Kind::NumberOrNumberMap if value.is_number() => Ok(()),
            Kind::NumberOrNumberMap => Kind::NumberMap.check(value, path),
        }
    }
}

fn expected(kind: &str, value: &Value, path: &str) -> ValidationError {
    ValidationError::new(
        or_body(path),
        format!("Expected {}, received {}", kind, type_name(value)),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn or_body(path: &str) -> String {
    if path.is_empty() {
        "body".to_string()
    } else {
        path.to_string()
    }
}

pub static USER: Schema = Schema {
    name: "User",
    base: None,
    fields: &[
        Field::required("id", Kind::Integer),
        Field::required("externalId", Kind::Text),
        Field::required("name", Kind::Text),
        Field::required("email", Kind::Text),
        Field::optional("affiliations", Kind::TextList),
        Field::nullable("createdAt", Kind::Timestamp),
    ],
    extra: None,
};

pub static COURSE: Schema = Schema {
    name: "Course",
    base: None,
    fields: &[
        Field::required("id", Kind::Integer),
        Field::required("code", Kind::Text),
        Field::required("title", Kind::Text),
        Field::required("term", Kind::Text),
        Field::required("instructor", Kind::Text),
        Field::nullable("location", Kind::Text),
        Field::nullable("schedule", Kind::Text),
        Field::optional("credits", Kind::Integer),
        Field::optional("color", Kind::Text),
    ],
    extra: None,
};

pub static ASSIGNMENT: Schema = Schema {
    name: "Assignment",
    base: None,
    fields: &[
        Field::required("id", Kind::Integer),
        Field::required("courseId", Kind::Integer),
        Field::required("title", Kind::Text),
        Field::nullable("dueDate", Kind::Timestamp),
        Field::optional("status", Kind::OneOf(&AssignmentStatus::ALL)),
        Field::nullable("score", Kind::Text),
        Field::nullable("maxScore", Kind::Text),
    ],
    extra: None,
};

/// Insertable assignment fields; the PATCH body is its partial form.
pub static ASSIGNMENT_INPUT: Schema = Schema {
    name: "AssignmentInput",
    base: None,
    fields: &[
        Field::required("courseId", Kind::Integer),
        Field::required("title", Kind::Text),
        Field::nullable("dueDate", Kind::Timestamp),
        Field::optional("status", Kind::OneOf(&AssignmentStatus::ALL)),
        Field::nullable("score", Kind::Text),
        Field::nullable("maxScore", Kind::Text),
    ],
    extra: None,
};

pub static COURSE_WITH_GRADE: Schema = Schema {
    name: "CourseWithGrade",
    base: Some(&COURSE),
    fields: &[
        Field::nullable("grade", Kind::Text),
        Field::optional("assignments", Kind::ArrayOf(&ASSIGNMENT)),
    ],
    extra: None,
};

pub static ANNOUNCEMENT: Schema = Schema {
    name: "Announcement",
    base: None,
    fields: &[
        Field::required("id", Kind::Integer),
        Field::required("title", Kind::Text),
        Field::required("content", Kind::Text),
        Field::required("source", Kind::Text),
        Field::nullable("date", Kind::Timestamp),
        Field::optional("priority", Kind::OneOf(&Priority::ALL)),
    ],
    extra: None,
};

pub static RESOURCE: Schema = Schema {
    name: "Resource",
    base: None,
    fields: &[
        Field::required("id", Kind::Integer),
        Field::required("title", Kind::Text),
        Field::required("url", Kind::Text),
        Field::required("category", Kind::Text),
        Field::nullable("icon", Kind::Text),
    ],
    extra: None,
};

pub static DASHBOARD: Schema = Schema {
    name: "Dashboard",
    base: None,
    fields: &[
        Field::required("user", Kind::Object(&USER)),
        Field::required("courses", Kind::ArrayOf(&COURSE_WITH_GRADE)),
        Field::required("announcements", Kind::ArrayOf(&ANNOUNCEMENT)),
        Field::required("resources", Kind::ArrayOf(&RESOURCE)),
        Field::required("tasks", Kind::ArrayOf(&ASSIGNMENT)),
    ],
    extra: None,
};

pub static MESSAGE: Schema = Schema {
    name: "Message",
    base: None,
    fields: &[Field::required("message", Kind::Text)],
    extra: None,
};

pub static VALIDATION_MESSAGE: Schema = Schema {
    name: "ValidationMessage",
    base: None,
    fields: &[
        Field::required("message", Kind::Text),
        Field::optional("field", Kind::Text),
    ],
    extra: None,
};

pub static SCORE_REQUEST: Schema = Schema {
    name: "ScoreRequest",
    base: None,
    fields: &[
        Field::required("income", Kind::Number),
        Field::required("expenses", Kind::NumberMap),
        Field::required("debt", Kind::NumberOrNumberMap),
        Field::required("savings", Kind::Number),
    ],
    extra: None,
};

/// Risk factors are free-form `"Yes"`/`"No"` answers keyed by factor name.
pub static RISK_PROFILE: Schema = Schema {
    name: "RiskProfile",
    base: None,
    fields: &[Field::optional("name", Kind::Text)],
    extra: Some(Kind::Text),
};

pub static SCORE: Schema = Schema {
    name: "Score",
    base: None,
    fields: &[Field::required("score", Kind::Number)],
    extra: None,
};

pub static CHAT_REQUEST: Schema = Schema {
    name: "ChatRequest",
    base: None,
    fields: &[Field::required("input", Kind::Text)],
    extra: None,
};

pub static CHAT_REPLY: Schema = Schema {
    name: "ChatReply",
    base: None,
    fields: &[Field::required("text", Kind::Text)],
    extra: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_input_accepts_single_field() {
        assert!(ASSIGNMENT_INPUT
            .validate_partial(&json!({ "status": "completed" }))
            .is_ok());
        assert!(ASSIGNMENT_INPUT.validate_partial(&json!({})).is_ok());
    }

    #[test]
    fn full_input_requires_title() {
        let err = ASSIGNMENT_INPUT
            .validate(&json!({ "courseId": 1 }))
            .unwrap_err();
        assert_eq!(err.field, "title");
        assert_eq!(err.message, "Required");
    }

    #[test]
    fn reports_first_declared_field_that_fails() {
        let err = ASSIGNMENT_INPUT
            .validate_partial(&json!({ "title": 7, "status": "lost" }))
            .unwrap_err();
        assert_eq!(err.field, "title");
        assert_eq!(err.message, "Expected string, received number");
    }

    #[test]
    fn rejects_unknown_status() {
        let err = ASSIGNMENT_INPUT
            .validate_partial(&json!({ "status": "lost" }))
            .unwrap_err();
        assert_eq!(err.field, "status");
        assert!(err.message.starts_with("Invalid enum value"));
    }

    #[test]
    fn rejects_unrecognized_keys() {
        let err = ASSIGNMENT_INPUT
            .validate_partial(&json!({ "grade": "A" }))
            .unwrap_err();
        assert_eq!(err.field, "grade");
    }

    #[test]
    fn non_object_body_is_reported_on_body() {
        let err = ASSIGNMENT_INPUT.validate_partial(&json!([1, 2])).unwrap_err();
        assert_eq!(err.field, "body");
        assert_eq!(err.message, "Expected object, received array");
    }

    #[test]
    fn nested_failures_carry_dotted_path() {
        let dashboard = json!({
            "user": { "id": 1, "externalId": "andy", "name": "Andy", "email": "andy@asu.edu" },
            "courses": [{ "id": 1, "code": "CSE 445", "term": "Spring 2026", "instructor": "Dr. Chen" }],
            "announcements": [],
            "resources": [],
            "tasks": []
        });
        let err = DASHBOARD.validate(&dashboard).unwrap_err();
        assert_eq!(err.field, "courses.0.title");
    }

    #[test]
    fn timestamps_must_be_rfc3339() {
        assert!(ASSIGNMENT_INPUT
            .validate_partial(&json!({ "dueDate": "2026-03-15T00:00:00Z" }))
            .is_ok());
        let err = ASSIGNMENT_INPUT
            .validate_partial(&json!({ "dueDate": "next week" }))
            .unwrap_err();
        assert_eq!(err.message, "Invalid date");
    }

    #[test]
    fn risk_profile_accepts_any_text_factor() {
        assert!(RISK_PROFILE
            .validate(&json!({ "name": "Student", "late fees": "No" }))
            .is_ok());
        let err = RISK_PROFILE.validate(&json!({ "late fees": 1 })).unwrap_err();
        assert_eq!(err.field, "late fees");
    }

    #[test]
    fn debt_may_be_total_or_itemized() {
        let base = |debt: Value| json!({ "income": 1000, "expenses": {}, "debt": debt, "savings": 0 });
        assert!(SCORE_REQUEST.validate(&base(json!(250.5))).is_ok());
        assert!(SCORE_REQUEST.validate(&base(json!({ "card": 100 }))).is_ok());
        assert_eq!(
            SCORE_REQUEST.validate(&base(json!({ "card": "lots" }))).unwrap_err().field,
            "debt.card"
        );
    }
}
