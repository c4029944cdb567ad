use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "todo-app/config";
pub const ENV_PREFIX: &str = "TODO";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Where the Supabase project lives and the public key used for anonymous calls.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Link target of the verification email sent after sign-up.
    #[serde(default)]
    pub email_redirect_to: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct TasksConfig {
    #[serde(default)]
    pub toggle_failure: ToggleFailurePolicy,
    #[serde(default)]
    pub sync: SyncMode,
}

/// What happens to an optimistic status flip when the remote update fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleFailurePolicy {
    /// Log the failure and leave the flipped flag until the next list.
    #[default]
    Keep,
    /// Revert the flag and report the failure.
    Rollback,
}

/// How local state is reconciled after an add or a delete.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Re-fetch the whole list.
    #[default]
    Refetch,
    /// Apply the confirmed change to the local list without another round-trip.
    Merge,
}

impl Config {
    /// Loads `todo-app/config.toml` (optional) overlaid with `TODO__*` environment variables.
    pub fn new() -> anyhow::Result<Self> {
        Self::load(DEFAULT_CONFIG_FILE)
    }

    pub fn load(file: &str) -> anyhow::Result<Self> {
        let s = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(s.try_deserialize()?)
    }
}
