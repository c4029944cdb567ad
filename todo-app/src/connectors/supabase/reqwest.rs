//! Reqwest-based implementation of Supabase connectivity.
//!
//! Talks to the GoTrue auth endpoints under `/auth/v1` and to the PostgREST
//! endpoints under `/rest/v1`.

use crate::config::SupabaseConfig;
use crate::connectors::supabase::{
    AuthConnector, Credentials, Error, NewTaskRow, Session, SignUpRequest, SignUpResponse,
    TaskId, TaskRow, TaskTable,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

const TASKS_TABLE: &str = "tasks";

/// Supabase connector implementation using the reqwest HTTP client.
pub struct ReqwestSupabaseConnector {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl ReqwestSupabaseConnector {
    /// Creates a connector for the project described by `config`.
    pub fn new(config: &SupabaseConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &SupabaseConfig) -> Self {
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TASKS_TABLE)
    }

    /// Adds the project key and the bearer token. Anonymous calls use the anon key as token.
    fn authorize(&self, request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        let token = access_token.unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }
}

/// Error body shapes returned by GoTrue and PostgREST.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    error_code: Option<String>,
    code: Option<serde_json::Value>,
}

impl ApiErrorBody {
    fn into_error(self, status: u16) -> Error {
        let code = self.error_code.or_else(|| match self.code {
            Some(serde_json::Value::String(code)) => Some(code),
            _ => None,
        });
        let message = self
            .msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_default();
        Error::Api {
            status,
            code,
            message,
        }
    }
}

/// Turns a non-success response into `Error::Api`, passing successful ones through.
async fn check(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await?;
    let parsed: ApiErrorBody = serde_json::from_slice(&body).unwrap_or_default();
    debug!(status = status.as_u16(), "Backend rejected the request");
    Err(parsed.into_error(status.as_u16()))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let body = check(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl AuthConnector for ReqwestSupabaseConnector {
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, Error> {
        let mut call = self.client.post(self.auth_url("signup")).json(request);
        if let Some(redirect_to) = &request.redirect_to {
            call = call.query(&[("redirect_to", redirect_to)]);
        }
        let response = self.authorize(call, None).send().await?;
        let signed_up = decode(response).await?;
        info!("Sign-up accepted");
        Ok(signed_up)
    }

    #[tracing::instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, Error> {
        let call = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(credentials);
        let response = self.authorize(call, None).send().await?;
        let session: Session = decode(response).await?;
        info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    #[tracing::instrument(skip(self, session), fields(user_id = %session.user.id))]
    async fn sign_out(&self, session: &Session) -> Result<(), Error> {
        let call = self.client.post(self.auth_url("logout"));
        let response = self
            .authorize(call, Some(&session.access_token))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskTable for ReqwestSupabaseConnector {
    #[tracing::instrument(skip(self, session), fields(user_id = %session.user.id))]
    async fn select_by_owner(&self, session: &Session) -> Result<Vec<TaskRow>, Error> {
        let call = self.client.get(self.table_url()).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", session.user.id)),
            ("order", "created_at.desc".to_string()),
        ]);
        let response = self
            .authorize(call, Some(&session.access_token))
            .send()
            .await?;
        let rows: Vec<TaskRow> = decode(response).await?;
        debug!("Fetched {} tasks", rows.len());
        Ok(rows)
    }

    #[tracing::instrument(skip(self, session, row), fields(user_id = %session.user.id))]
    async fn insert(&self, session: &Session, row: &NewTaskRow) -> Result<Vec<TaskRow>, Error> {
        let call = self
            .client
            .post(self.table_url())
            .query(&[("select", "*")])
            .header("Prefer", "return=representation")
            .json(&[row]);
        let response = self
            .authorize(call, Some(&session.access_token))
            .send()
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self, session))]
    async fn update_status(
        &self,
        session: &Session,
        id: &TaskId,
        status: bool,
    ) -> Result<(), Error> {
        let call = self
            .client
            .patch(self.table_url())
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "status": status }));
        let response = self
            .authorize(call, Some(&session.access_token))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, session))]
    async fn delete(&self, session: &Session, id: &TaskId) -> Result<(), Error> {
        let call = self
            .client
            .delete(self.table_url())
            .query(&[("id", format!("eq.{}", id))]);
        let response = self
            .authorize(call, Some(&session.access_token))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
