use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::common::user::{Role, UserId};

use super::user::User;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

const BEARER_PREFIX: &str = "Bearer ";

/// An authentication token issued by the identity provider, representing a
/// specific user with a specific role.
///
/// As a request guard, `AuthToken<U>` only succeeds if the token's role
/// satisfies `U::ROLE`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken<U> {
    #[serde(rename = "sub")]
    pub id: UserId,
    pub role: Role,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Does this token permit acting as `target`?
    pub fn permits(&self, target: Role) -> bool {
        self.role.satisfies(target)
    }
}

impl<U> AuthToken<U>
where
    U: User,
{
    /// Create a new [`AuthToken`] for the given user ID and role.
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            phantom: PhantomData,
        }
    }

    /// Sign this token into a JWT that expires after `ttl`.
    #[allow(clippy::missing_panics_doc)]
    pub fn encode(self, secret: &[u8], ttl: chrono::Duration) -> String {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + ttl,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .expect("JWT encoding is infallible with default settings")
    }

    /// Sign this token into a cookie.
    pub fn into_cookie(self, config: &Config, ttl: chrono::Duration) -> Cookie<'static> {
        let token = self.encode(config.jwt_secret(), ttl);
        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(ttl.num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Verify and decode a JWT.
    pub fn decode(token: &str, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// JWT claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Find the raw JWT: the auth cookie wins over an `Authorization: Bearer` header.
fn raw_token<'r>(req: &'r Request<'_>) -> Option<String> {
    if let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::to_string)
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the request and verify that it has the
    /// correct role for this user type.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.guard::<&State<Config>>().await {
            Outcome::Success(config) => config,
            _ => {
                return Outcome::Failure((
                    Status::InternalServerError,
                    Error::Storage("application config is not loaded".to_string()),
                ))
            }
        };

        let raw = match raw_token(req) {
            Some(raw) => raw,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized("no authentication token supplied".to_string()),
                ))
            }
        };

        let token = match Self::decode(&raw, config) {
            Ok(token) => token,
            Err(e) => {
                debug!("Rejected authentication token: {e}");
                return Outcome::Failure((Status::Unauthorized, e));
            }
        };

        if !token.permits(U::ROLE) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::PermissionDenied(format!("{} role required", role_name(U::ROLE))),
            ));
        }

        Outcome::Success(token)
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Voter => "voter",
        Role::Organizer => "organizer",
    }
}
