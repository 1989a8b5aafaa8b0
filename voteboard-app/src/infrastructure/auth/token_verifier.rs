use serde::Deserialize;
use voteboard_errors::AppError;

use crate::domain::AuthenticatedUser;

/// Response shape of the external auth service's token-check endpoint.
#[derive(Debug, Deserialize)]
struct AuthCheckResponse {
    success: bool,
    data: Option<AuthCheckData>,
}

#[derive(Debug, Deserialize)]
struct AuthCheckData {
    is_token_valid: bool,
    user: Option<VerifiedUser>,
}

#[derive(Debug, Deserialize)]
struct VerifiedUser {
    #[serde(rename = "ID")]
    id: i64,
    email: String,
    username: String,
    name: String,
}

#[derive(Clone)]
pub struct TokenVerifier {
    http_client: reqwest::Client,
    check_url: String,
}

impl TokenVerifier {
    pub fn new(check_url: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            check_url,
        }
    }

    /// Resolve a bearer token to a stable identity. Every failure mode, from
    /// transport errors to an invalid token, collapses to `Unauthorized`; the
    /// upstream cause goes only to the log.
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let response = self
            .http_client
            .get(&self.check_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!("token check request failed: {err}");
                unauthorized()
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "token check returned non-success");
            return Err(unauthorized());
        }

        let body: AuthCheckResponse = response.json().await.map_err(|err| {
            tracing::warn!("token check returned malformed body: {err}");
            unauthorized()
        })?;

        match body {
            AuthCheckResponse {
                success: true,
                data:
                    Some(AuthCheckData {
                        is_token_valid: true,
                        user: Some(user),
                    }),
            } => Ok(AuthenticatedUser {
                id: user.id,
                email: user.email,
                username: user.username,
                name: user.name,
            }),
            _ => Err(unauthorized()),
        }
    }
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Invalid or expired token".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_check_response() {
        let body: AuthCheckResponse = serde_json::from_str(
            r#"{
                "code": 200,
                "success": true,
                "data": {
                    "is_token_valid": true,
                    "user": {
                        "ID": 42,
                        "email": "jdoe@example.com",
                        "username": "jdoe",
                        "name": "Jane Doe",
                        "is_root_user": 0,
                        "logged_in": 1
                    }
                }
            }"#,
        )
        .unwrap();

        assert!(body.success);
        let data = body.data.unwrap();
        assert!(data.is_token_valid);
        assert_eq!(data.user.unwrap().id, 42);
    }

    #[test]
    fn parses_invalid_token_response() {
        let body: AuthCheckResponse =
            serde_json::from_str(r#"{"success": true, "data": {"is_token_valid": false}}"#)
                .unwrap();

        assert!(body.data.unwrap().user.is_none());
    }
}
