//! Supabase connectivity for the todo app.
//!
//! This module provides abstractions for interacting with a Supabase project, including:
//! - Error types for failed or rejected backend calls
//! - Traits for the auth API (GoTrue) and the `tasks` table API (PostgREST)
//! - Wire types for sessions, users and task rows
//!
//! The traits keep the rest of the crate independent of the HTTP client. A concrete
//! implementation using `reqwest` is provided in the `reqwest` submodule.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

pub mod reqwest;

/// Errors that can occur while talking to Supabase.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend answered with a structured rejection
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// The request never produced a usable response
    #[error("Cannot reach the backend")]
    Transport(#[from] ::reqwest::Error),
    /// The response body did not have the expected shape
    #[error("Cannot decode the backend response")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Builds an API rejection, mostly useful for fakes and tests.
    pub fn api(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Profile metadata attached to an auth user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A user as reported by the auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl AuthUser {
    /// The name shown in the navigation banner, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.user_metadata
            .display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or_default()
    }
}

/// An authenticated session issued by the auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: String,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Email and password pair used for the password grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Payload of a sign-up call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub data: UserMetadata,
    /// Where the verification email sends the user back to. Sent as a query parameter.
    #[serde(skip)]
    pub redirect_to: Option<String>,
}

/// What the auth API hands back after a sign-up.
///
/// Projects that require email confirmation answer with the bare user, the others
/// sign the user in straight away.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(Session),
    User(AuthUser),
}

/// Opaque, server-assigned identifier of a task row.
///
/// The table may use numeric or textual keys, so both are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawTaskId", into = "String")]
pub struct TaskId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTaskId {
    Number(i64),
    Text(String),
}

impl From<RawTaskId> for TaskId {
    fn from(raw: RawTaskId) -> Self {
        match raw {
            RawTaskId::Number(number) => TaskId(number.to_string()),
            RawTaskId::Text(text) => TaskId(text),
        }
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of the `tasks` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: TaskId,
    pub task: String,
    pub status: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the `tasks` table. The id and timestamp are assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTaskRow {
    pub task: String,
    pub status: bool,
    pub user_id: Uuid,
}

/// Trait for abstracting the Supabase auth API.
#[automock]
#[async_trait]
pub trait AuthConnector {
    /// Registers a new user. The display name travels as user metadata.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, Error>;

    /// Exchanges an email and password for a session.
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, Error>;

    /// Revokes the given session on the server.
    async fn sign_out(&self, session: &Session) -> Result<(), Error>;
}

/// Trait for abstracting the `tasks` table.
///
/// Every call carries the caller's session: its access token is what the
/// row-ownership policy on the server checks.
#[automock]
#[async_trait]
pub trait TaskTable {
    /// Retrieves every row owned by the session's user, newest first.
    async fn select_by_owner(&self, session: &Session) -> Result<Vec<TaskRow>, Error>;

    /// Inserts a row and returns the stored representation.
    async fn insert(&self, session: &Session, row: &NewTaskRow) -> Result<Vec<TaskRow>, Error>;

    async fn update_status(
        &self,
        session: &Session,
        id: &TaskId,
        status: bool,
    ) -> Result<(), Error>;

    async fn delete(&self, session: &Session, id: &TaskId) -> Result<(), Error>;
}
