use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{repo::UserRepo, repo_types::User, token::TokenKeys};
use crate::{error::ApiError, state::AppState, store::StoreResult};

/// Header spellings accepted for a plain identity claim. Header names are
/// case-insensitive, so these also cover `User-ID` and `userID`.
pub const IDENTITY_HEADERS: [&str; 2] = ["user-id", "userid"];

/// Where the identity claim came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityClaim {
    Bearer(String),
    Header(String),
}

impl IdentityClaim {
    pub fn value(&self) -> &str {
        match self {
            IdentityClaim::Bearer(v) | IdentityClaim::Header(v) => v,
        }
    }
}

/// Pulls the claim out of the request headers, verifying bearer tokens.
pub fn extract_claim(
    headers: &HeaderMap,
    keys: &TokenKeys,
    allow_header: bool,
) -> Result<IdentityClaim, ApiError> {
    if let Some(auth) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(ApiError::InvalidToken)?;
        let claims = keys.verify(token.trim()).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            ApiError::InvalidToken
        })?;
        return Ok(IdentityClaim::Bearer(claims.sub));
    }

    let header = IDENTITY_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .find(|v| !v.is_empty());

    match header {
        Some(value) if allow_header => Ok(IdentityClaim::Header(value.to_owned())),
        Some(_) => {
            warn!("identity header rejected: header identity is disabled");
            Err(ApiError::Unauthenticated)
        }
        None => Err(ApiError::Unauthenticated),
    }
}

/// Result of the two lookup strategies, in the order they are tried.
#[derive(Debug, Clone)]
pub enum Resolution {
    BySemanticId(User),
    ByStorageKey(User),
    Unresolved,
}

/// Semantic identifier first, then the storage key.
pub async fn resolve<S>(store: &S, claim: &str) -> StoreResult<Resolution>
where
    S: UserRepo + ?Sized,
{
    if let Some(user) = store.find_user_by_user_id(claim).await? {
        return Ok(Resolution::BySemanticId(user));
    }
    if let Ok(key) = Uuid::parse_str(claim) {
        if let Some(user) = store.find_user_by_key(key).await? {
            return Ok(Resolution::ByStorageKey(user));
        }
    }
    Ok(Resolution::Unresolved)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolvedBy {
    SemanticId,
    StorageKey,
}

/// The caller, as seen by the handlers of a single request.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedIdentity {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(skip)]
    pub resolved_by: ResolvedBy,
}

impl ResolvedIdentity {
    fn from_user(user: User, resolved_by: ResolvedBy) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            name: user.name,
            resolved_by,
        }
    }
}

impl TryFrom<Resolution> for ResolvedIdentity {
    type Error = ApiError;

    fn try_from(resolution: Resolution) -> Result<Self, Self::Error> {
        match resolution {
            Resolution::BySemanticId(user) => Ok(Self::from_user(user, ResolvedBy::SemanticId)),
            Resolution::ByStorageKey(user) => Ok(Self::from_user(user, ResolvedBy::StorageKey)),
            Resolution::Unresolved => Err(ApiError::InvalidIdentity),
        }
    }
}

/// Resolves the caller on every request; nothing is kept between requests.
pub struct AuthUser(pub ResolvedIdentity);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<ResolvedIdentity>() {
            return Ok(AuthUser(identity.clone()));
        }

        let keys = TokenKeys::from_ref(state);
        let claim = extract_claim(&parts.headers, &keys, state.config.allow_header_identity)?;
        let resolution = resolve(state.store.as_ref(), claim.value()).await?;
        let identity = ResolvedIdentity::try_from(resolution).map_err(|e| {
            warn!(claim = %claim.value(), "identity claim did not resolve to a user");
            e
        })?;

        debug!(user_id = %identity.user_id, via = ?identity.resolved_by, "identity resolved");
        parts.extensions.insert(identity.clone());
        Ok(AuthUser(identity))
    }
}
