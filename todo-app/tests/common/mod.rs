#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use todo_app::config::{AuthConfig, TasksConfig};
use todo_app::connectors::supabase::{
    AuthConnector, AuthUser, Credentials, Error, NewTaskRow, Session, SignUpRequest,
    SignUpResponse, TaskId, TaskRow, TaskTable,
};
use uuid::Uuid;

/// Domains the fake auth service refuses, the way a real project rejects
/// addresses it cannot deliver to.
pub const UNDELIVERABLE_DOMAIN: &str = "undeliverable.test";

struct Account {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

/// In-memory stand-in for a Supabase project: an auth service that requires
/// email confirmation and a `tasks` table with row ownership enforced per token.
#[derive(Default)]
pub struct FakeSupabase {
    accounts: Mutex<Vec<Account>>,
    tokens: Mutex<HashMap<String, Uuid>>,
    rows: Mutex<Vec<TaskRow>>,
    next_id: AtomicI64,
    fail_updates: AtomicBool,
    calls: AtomicUsize,
}

impl FakeSupabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remote calls served so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Marks the account as verified, as clicking the email link would.
    pub fn confirm(&self, email: &str) {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts
            .iter_mut()
            .find(|account| account.user.email.as_deref() == Some(email))
        {
            account.confirmed = true;
        }
    }

    /// Makes every following status update fail until switched back.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// The stored row, bypassing row ownership.
    pub fn row(&self, id: &TaskId) -> Option<TaskRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| &row.id == id)
            .cloned()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn owner_of(&self, session: &Session) -> Result<Uuid, Error> {
        self.tokens
            .lock()
            .unwrap()
            .get(&session.access_token)
            .copied()
            .ok_or_else(|| Error::api(401, Some("bad_jwt"), "invalid JWT"))
    }

    fn timestamp(id: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::seconds(id)
    }
}

#[async_trait]
impl AuthConnector for FakeSupabase {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, Error> {
        self.record_call();
        if request.email.ends_with(&format!("@{}", UNDELIVERABLE_DOMAIN)) {
            return Err(Error::api(
                400,
                Some("email_address_invalid"),
                format!("Email address \"{}\" is invalid", request.email),
            ));
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts
            .iter()
            .any(|account| account.user.email.as_deref() == Some(request.email.as_str()))
        {
            return Err(Error::api(
                422,
                Some("user_already_exists"),
                "User already registered",
            ));
        }
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(request.email.clone()),
            user_metadata: request.data.clone(),
        };
        accounts.push(Account {
            user: user.clone(),
            password: request.password.clone(),
            confirmed: false,
        });
        Ok(SignUpResponse::User(user))
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, Error> {
        self.record_call();
        let accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter()
            .find(|account| {
                account.user.email.as_deref() == Some(credentials.email.as_str())
                    && account.password == credentials.password
            })
            .ok_or_else(|| {
                Error::api(400, Some("invalid_credentials"), "Invalid login credentials")
            })?;
        if !account.confirmed {
            return Err(Error::api(
                400,
                Some("email_not_confirmed"),
                "Email not confirmed",
            ));
        }
        let token = format!("token-{}", Uuid::new_v4());
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), account.user.id);
        Ok(Session {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: None,
            refresh_token: "refresh".to_string(),
            user: account.user.clone(),
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<(), Error> {
        self.record_call();
        self.tokens.lock().unwrap().remove(&session.access_token);
        Ok(())
    }
}

#[async_trait]
impl TaskTable for FakeSupabase {
    async fn select_by_owner(&self, session: &Session) -> Result<Vec<TaskRow>, Error> {
        self.record_call();
        let owner = self.owner_of(session)?;
        let mut rows: Vec<TaskRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.user_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert(&self, session: &Session, row: &NewTaskRow) -> Result<Vec<TaskRow>, Error> {
        self.record_call();
        let owner = self.owner_of(session)?;
        if row.user_id != owner {
            return Err(Error::api(
                403,
                Some("42501"),
                "new row violates row-level security policy for table \"tasks\"",
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = TaskRow {
            id: TaskId::new(id.to_string()),
            task: row.task.clone(),
            status: row.status,
            user_id: row.user_id,
            created_at: Self::timestamp(id),
        };
        self.rows.lock().unwrap().push(stored.clone());
        Ok(vec![stored])
    }

    async fn update_status(
        &self,
        session: &Session,
        id: &TaskId,
        status: bool,
    ) -> Result<(), Error> {
        self.record_call();
        let owner = self.owner_of(session)?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::api(503, None, "Service Unavailable"));
        }
        // Rows of other users are invisible, so the update silently matches nothing.
        for row in self.rows.lock().unwrap().iter_mut() {
            if &row.id == id && row.user_id == owner {
                row.status = status;
            }
        }
        Ok(())
    }

    async fn delete(&self, session: &Session, id: &TaskId) -> Result<(), Error> {
        self.record_call();
        let owner = self.owner_of(session)?;
        self.rows
            .lock()
            .unwrap()
            .retain(|row| !(&row.id == id && row.user_id == owner));
        Ok(())
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        email_redirect_to: Some("http://localhost:3000".to_string()),
    }
}

pub fn tasks_config() -> TasksConfig {
    TasksConfig::default()
}
