//! Stateless bearer authentication: HS512 JWTs and Argon2id password hashes.

use std::fmt;
use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUser, NewUserRecord, ROLE_USER, User};
use crate::traits::UserDirectory;
use crate::validation::Validate;

type HmacSha512 = Hmac<Sha512>;

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;
/// Shortest accepted token lifetime, in seconds.
pub const MIN_TTL_SECS: i64 = 60;

const ALGORITHM: &str = "HS512";

/// Hash checked when the email is unknown, so both login failures cost one Argon2 verify.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("bazaar-unknown-account").unwrap_or_default());

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account email.
    pub sub: String,
    pub user_id: i64,
    pub email: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Signing key and token lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    secret: Vec<u8>,
    ttl: TimeDelta,
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl JwtKeys {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: i64) -> Result<Self, AppError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::ConfigError(format!(
                "JWT secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if ttl_secs < MIN_TTL_SECS {
            return Err(AppError::ConfigError(format!(
                "JWT lifetime must be at least {MIN_TTL_SECS} seconds"
            )));
        }
        Ok(Self {
            secret,
            ttl: TimeDelta::seconds(ttl_secs),
        })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user: &User, roles: &[String]) -> Result<String, AppError> {
        self.issue_at(user, roles, Utc::now())
    }

    pub fn issue_at(
        &self,
        user: &User,
        roles: &[String],
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: user.email.clone(),
            user_id: user.id,
            email: user.email.clone(),
            roles: roles.to_vec(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.encode(&claims)
    }

    fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
        );
        let signature = self.mac(&signing_input)?.finalize().into_bytes();
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        self.verify_at(token, Utc::now())
    }

    /// Check structure, algorithm, signature and expiry, in that order.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AppError> {
        let malformed = || AppError::Unauthorized("malformed token".to_string());

        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let header: Header = decode_segment(header_b64).ok_or_else(malformed)?;
        if header.alg != ALGORITHM {
            return Err(AppError::Unauthorized(format!(
                "unsupported token algorithm {}",
                header.alg
            )));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| malformed())?;
        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
        self.mac(signing_input)?
            .verify_slice(&signature)
            .map_err(|_| AppError::Unauthorized("invalid token signature".to_string()))?;

        let claims: Claims = decode_segment(payload_b64).ok_or_else(malformed)?;
        if now.timestamp() >= claims.exp {
            return Err(AppError::Unauthorized("token expired".to_string()));
        }
        Ok(claims)
    }

    fn mac(&self, input: &str) -> Result<HmacSha512, AppError> {
        let mut mac = HmacSha512::new_from_slice(&self.secret)
            .map_err(|e| AppError::ConfigError(format!("invalid JWT secret: {e}")))?;
        mac.update(input.as_bytes());
        Ok(mac)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Generic(format!("password hashing failed: {e}")))
}

/// Verify a password against a PHC hash string. Unparseable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
    pub roles: Vec<String>,
}

/// Registration, login and token authentication over a [`UserDirectory`].
#[derive(Clone)]
pub struct AuthService<U: UserDirectory> {
    users: U,
    keys: JwtKeys,
}

impl<U: UserDirectory> AuthService<U> {
    pub fn new(users: U, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// Create an account holding the `USER` role.
    pub async fn register(&self, input: NewUser) -> Result<User, AppError> {
        input.validate()?;
        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "email {} is already registered",
                input.email
            )));
        }

        let record = NewUserRecord {
            email: input.email,
            password_hash: hash_password(&input.password)?,
            full_name: input.full_name,
            phone: input.phone,
            active: true,
        };
        let user = self.users.create_with_role(&record, ROLE_USER).await?;
        tracing::info!(user_id = user.id, "user registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let rejected = || AppError::Unauthorized("invalid email or password".to_string());

        let Some(user) = self.users.find_by_email(email).await? else {
            verify_password(password, &DUMMY_HASH);
            return Err(rejected());
        };
        if !verify_password(password, &user.password_hash) {
            tracing::warn!(user_id = user.id, "login rejected: wrong password");
            return Err(rejected());
        }
        if !user.active {
            return Err(AppError::Unauthorized("account is disabled".to_string()));
        }

        self.session_for(user).await
    }

    /// Issue a token for an existing account without checking a password.
    pub async fn session_for(&self, user: User) -> Result<Session, AppError> {
        let roles = self.users.role_names(user.id).await?;
        let token = self.keys.issue(&user, &roles)?;
        tracing::info!(user_id = user.id, "token issued");
        Ok(Session {
            token,
            expires_in: self.keys.ttl_secs(),
            user,
            roles,
        })
    }

    /// Resolve a bearer token to the current user, re-reading roles from
    /// the directory so revocations apply before the token expires.
    pub async fn authenticate(&self, token: &str) -> Result<CurrentUser, AppError> {
        let claims = self.keys.verify(token)?;

        let user = self
            .users
            .find_user(claims.user_id)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| AppError::Unauthorized("account not found or disabled".to_string()))?;
        let roles = self.users.role_names(user.id).await?;

        Ok(CurrentUser {
            id: user.id,
            email: user.email,
            roles,
        })
    }
}
