// Bearer credentials for the telemetry backend
use crate::application::telemetry_client::{Credential, CredentialProvider, Role};

pub const TOKEN_ENV_VAR: &str = "DASHBOARD_TOKEN";

/// Reads the token from the environment on every call, falling back to the
/// configured one, so a rotated token is picked up without a restart.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    env_var: String,
    configured_token: Option<String>,
    role: Role,
}

impl EnvCredentialProvider {
    pub fn new(configured_token: Option<String>, role: Role) -> Self {
        Self::with_env_var(TOKEN_ENV_VAR, configured_token, role)
    }

    pub fn with_env_var(env_var: &str, configured_token: Option<String>, role: Role) -> Self {
        Self {
            env_var: env_var.to_string(),
            configured_token,
            role,
        }
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn credential(&self) -> Option<Credential> {
        let token = std::env::var(&self.env_var)
            .ok()
            .or_else(|| self.configured_token.clone())
            .filter(|t| !t.trim().is_empty())?;

        Some(Credential {
            token,
            role: self.role,
        })
    }
}
