use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{AuthToken, ProfileUpdate, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    pub nickname: Option<String>,
    pub city: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response returned after register or login. `token` is shown only here.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub city: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(r: UpdateProfileRequest) -> Self {
        Self {
            name: r.name.map(|n| n.trim().to_string()),
            nickname: r.nickname,
            city: r.city,
            avatar_url: r.avatar_url,
            bio: r.bio,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    #[serde(default)]
    pub id: String,
}

/// Public view of a token; the digest never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_used_at: Option<OffsetDateTime>,
    pub revoked: bool,
}

impl From<AuthToken> for TokenSummary {
    fn from(t: AuthToken) -> Self {
        Self {
            id: t.id,
            created_at: t.created_at,
            last_used_at: t.last_used_at,
            revoked: t.revoked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_summary_hides_digest() {
        let token = AuthToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "ba7816bf8f01cfea414140de5dae2223".into(),
            revoked: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
            last_used_at: None,
        };
        let json = serde_json::to_value(TokenSummary::from(token)).unwrap();
        assert_eq!(json["revoked"], true);
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert!(json.get("lastUsedAt").is_none());
        assert!(!json.to_string().contains("ba7816bf"));
    }

    #[test]
    fn register_request_tolerates_missing_fields() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@b.com","avatarUrl":"http://x/y.png"}"#).unwrap();
        assert!(req.password.is_empty());
        assert!(req.name.is_empty());
        assert_eq!(req.avatar_url.as_deref(), Some("http://x/y.png"));
    }
}
