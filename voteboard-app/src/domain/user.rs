use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// Identity resolved by the external token verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub name: String,
}

/// Display info captured at action time and stored with the row. A snapshot,
/// not a live reference: later identity changes do not rewrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct UserDetail {
    pub username: String,
    pub name: String,
    pub email: String,
}

impl From<&AuthenticatedUser> for UserDetail {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

impl UserDetail {
    /// Username, falling back to the full name, then "Unknown".
    pub fn display_name(&self) -> &str {
        if !self.username.is_empty() {
            &self.username
        } else if !self.name.is_empty() {
            &self.name
        } else {
            "Unknown"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_name_then_unknown() {
        let mut detail = UserDetail {
            username: "jdoe".to_string(),
            name: "Jane Doe".to_string(),
            email: "jdoe@example.com".to_string(),
        };
        assert_eq!(detail.display_name(), "jdoe");

        detail.username.clear();
        assert_eq!(detail.display_name(), "Jane Doe");

        detail.name.clear();
        assert_eq!(detail.display_name(), "Unknown");
    }
}
