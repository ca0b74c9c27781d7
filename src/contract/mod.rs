//! The API contract shared by the route layer and [`crate::client`].
//!
//! Every endpoint is declared once here: its method, its path template
//! (with `:param` placeholders), the schema its request body must satisfy and
//! the schema of the body it answers with for each status code.

pub mod schema;

use std::fmt::Display;

use axum::routing::MethodFilter;
use serde_json::Value;

pub use schema::{Field, Kind, Schema, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        }
    }

    pub fn is_mutation(&self) -> bool {
        *self != Method::Get
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => MethodFilter::GET,
            Method::Post => MethodFilter::POST,
            Method::Patch => MethodFilter::PATCH,
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Body {
    One(&'static Schema),
    Many(&'static Schema),
}

impl Body {
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        match self {
            Body::One(schema) => schema.validate(value),
            Body::Many(schema) => Kind::ArrayOf(*schema).check(value, ""),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Input {
    pub schema: &'static Schema,
    /// Every field optional, as for partial updates.
    pub partial: bool,
}

impl Input {
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        if self.partial {
            self.schema.validate_partial(value)
        } else {
            self.schema.validate(value)
        }
    }
}

#[derive(Debug)]
pub struct Endpoint {
    pub name: &'static str,
    pub method: Method,
    pub path: &'static str,
    pub input: Option<Input>,
    pub responses: &'static [(u16, Body)],
}

impl Endpoint {
    pub fn response(&self, status: u16) -> Option<&Body> {
        self.responses
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, body)| body)
    }

    /// Checks a request body against the declared input; endpoints without
    /// one accept anything.
    pub fn validate_input(&self, value: &Value) -> Result<(), ValidationError> {
        match &self.input {
            Some(input) => input.validate(value),
            None => Ok(()),
        }
    }

    /// Checks a response body against the schema declared for `status`.
    /// Undeclared statuses are not checked.
    pub fn validate_response(&self, status: u16, value: &Value) -> Result<(), ValidationError> {
        match self.response(status) {
            Some(body) => body.validate(value),
            None => Ok(()),
        }
    }

    pub fn url<K, V, I>(&self, params: I) -> String
    where
        K: AsRef<str>,
        V: Display,
        I: IntoIterator<Item = (K, V)>,
    {
        build_url(self.path, params)
    }
}

/// Substitutes `:key` placeholders in a path template.
///
/// Params whose placeholder does not occur are ignored; placeholders without
/// a param are left in the result as-is.
pub fn build_url<K, V, I>(path: &str, params: I) -> String
where
    K: AsRef<str>,
    V: Display,
    I: IntoIterator<Item = (K, V)>,
{
    let mut url = path.to_string();
    for (key, value) in params {
        let placeholder = format!(":{}", key.as_ref());
        if url.contains(&placeholder) {
            url = url.replacen(&placeholder, &value.to_string(), 1);
        }
    }
    url
}

const NO_PARAMS: [(&str, &str); 0] = [];

/// Path for endpoints without parameters.
pub fn plain(endpoint: &Endpoint) -> String {
    endpoint.url(NO_PARAMS)
}

pub static DASHBOARD_GET: Endpoint = Endpoint {
    name: "dashboard.get",
    method: Method::Get,
    path: "/api/dashboard",
    input: None,
    responses: &[
        (200, Body::One(&schema::DASHBOARD)),
        (401, Body::One(&schema::MESSAGE)),
    ],
};

pub static COURSES_LIST: Endpoint = Endpoint {
    name: "courses.list",
    method: Method::Get,
    path: "/api/courses",
    input: None,
    responses: &[(200, Body::Many(&schema::COURSE))],
};

pub static COURSES_GET: Endpoint = Endpoint {
    name: "courses.get",
    method: Method::Get,
    path: "/api/courses/:id",
    input: None,
    responses: &[
        (200, Body::One(&schema::COURSE)),
        (404, Body::One(&schema::MESSAGE)),
    ],
};

pub static ASSIGNMENTS_LIST: Endpoint = Endpoint {
    name: "assignments.list",
    method: Method::Get,
    path: "/api/assignments",
    input: None,
    responses: &[(200, Body::Many(&schema::ASSIGNMENT))],
};

pub static ASSIGNMENTS_UPDATE: Endpoint = Endpoint {
    name: "assignments.update",
    method: Method::Patch,
    path: "/api/assignments/:id",
    input: Some(Input {
        schema: &schema::ASSIGNMENT_INPUT,
        partial: true,
    }),
    responses: &[
        (200, Body::One(&schema::ASSIGNMENT)),
        (400, Body::One(&schema::VALIDATION_MESSAGE)),
        (404, Body::One(&schema::MESSAGE)),
    ],
};

pub static ANNOUNCEMENTS_LIST: Endpoint = Endpoint {
    name: "announcements.list",
    method: Method::Get,
    path: "/api/announcements",
    input: None,
    responses: &[(200, Body::Many(&schema::ANNOUNCEMENT))],
};

pub static SCORE_CREATE: Endpoint = Endpoint {
    name: "score.create",
    method: Method::Post,
    path: "/api/score",
    input: Some(Input {
        schema: &schema::SCORE_REQUEST,
        partial: false,
    }),
    responses: &[
        (200, Body::One(&schema::SCORE)),
        (400, Body::One(&schema::VALIDATION_MESSAGE)),
        (500, Body::One(&schema::MESSAGE)),
    ],
};

pub static PREDICT_CREATE: Endpoint = Endpoint {
    name: "predict.create",
    method: Method::Post,
    path: "/api/predict",
    input: Some(Input {
        schema: &schema::RISK_PROFILE,
        partial: false,
    }),
    responses: &[
        (200, Body::One(&schema::SCORE)),
        (400, Body::One(&schema::VALIDATION_MESSAGE)),
        (500, Body::One(&schema::MESSAGE)),
    ],
};

pub static CHAT_CREATE: Endpoint = Endpoint {
    name: "chat.create",
    method: Method::Post,
    path: "/api/chat",
    input: Some(Input {
        schema: &schema::CHAT_REQUEST,
        partial: false,
    }),
    responses: &[
        (200, Body::One(&schema::CHAT_REPLY)),
        (400, Body::One(&schema::VALIDATION_MESSAGE)),
        (500, Body::One(&schema::MESSAGE)),
    ],
};

pub static ENDPOINTS: [&Endpoint; 9] = [
    &DASHBOARD_GET,
    &COURSES_LIST,
    &COURSES_GET,
    &ASSIGNMENTS_LIST,
    &ASSIGNMENTS_UPDATE,
    &ANNOUNCEMENTS_LIST,
    &SCORE_CREATE,
    &PREDICT_CREATE,
    &CHAT_CREATE,
];
