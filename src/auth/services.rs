use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{GoogleLoginRequest, LoginRequest, RegisterRequest},
    password::{self, MIN_PASSWORD_LEN},
    provider::{ProviderClaim, ProviderVerifier},
    repo::UserRepo,
    repo_types::{AuthProvider, User, DEFAULT_LANGUAGE},
};
use crate::{
    error::{present, ApiError, ApiResult},
    store::StoreError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register<S>(store: &S, payload: RegisterRequest) -> ApiResult<User>
where
    S: UserRepo + ?Sized,
{
    let (Some(name), Some(email), Some(plain)) = (
        present(&payload.name),
        present(&payload.email),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::MissingFields);
    };

    let email = normalize_email(email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::InvalidEmailFormat);
    }
    if plain.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::PasswordTooShort);
    }

    if store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::EmailExists);
    }

    let hash = password::hash(plain).await?;
    let language = present(&payload.language)
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string();
    let user = User::new_local(name.to_string(), email, hash, language);

    // A concurrent registration can still win between the check and the insert.
    let user = store.create_user(&user).await.map_err(|e| match e {
        StoreError::DuplicateKey => ApiError::EmailExists,
        other => other.into(),
    })?;

    info!(user_id = %user.user_id, email = %user.email, "user registered");
    Ok(user)
}

pub async fn login<S>(store: &S, payload: LoginRequest) -> ApiResult<User>
where
    S: UserRepo + ?Sized,
{
    let (Some(email), Some(plain)) = (
        present(&payload.email),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::MissingCredentials);
    };
    let email = normalize_email(email);

    let Some(user) = store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify(plain, &user.password_hash).await? {
        warn!(user_id = %user.user_id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    info!(user_id = %user.user_id, "user logged in");
    Ok(user)
}

pub async fn google_login<S>(
    store: &S,
    verifier: &dyn ProviderVerifier,
    payload: GoogleLoginRequest,
) -> ApiResult<User>
where
    S: UserRepo + ?Sized,
{
    let (Some(email), Some(name), Some(google_id)) = (
        present(&payload.email),
        present(&payload.name),
        present(&payload.google_id),
    ) else {
        return Err(ApiError::MissingProviderData);
    };

    let claim = ProviderClaim {
        email: normalize_email(email),
        name: name.to_string(),
        google_id: google_id.to_string(),
        id_token: payload.id_token.clone(),
        access_token: payload.access_token.clone(),
    };
    if !verifier.verify(&claim).await? {
        warn!(email = %claim.email, "provider rejected google claim");
        return Err(ApiError::InvalidCredentials);
    }

    match store.find_user_by_email(&claim.email).await? {
        None => {
            let hash = password::unusable_hash().await?;
            let user = User::new_google(claim.name, claim.email, claim.google_id, hash);
            let user = store.create_user(&user).await.map_err(|e| match e {
                StoreError::DuplicateKey => ApiError::EmailExists,
                other => other.into(),
            })?;
            info!(user_id = %user.user_id, "user created through google");
            Ok(user)
        }
        Some(mut user) if user.google_id.is_none() => {
            user.google_id = Some(claim.google_id);
            user.auth_provider = AuthProvider::Google;
            let user = store.update_user(&user).await?;
            info!(user_id = %user.user_id, "google account linked");
            Ok(user)
        }
        Some(user) => Ok(user),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::provider::TrustUpstream, store::MemoryStore};

    fn registration(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
            language: None,
        }
    }

    fn google(email: &str, google_id: &str) -> GoogleLoginRequest {
        GoogleLoginRequest {
            email: Some(email.into()),
            name: Some("Ana G".into()),
            google_id: Some(google_id.into()),
            ..Default::default()
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ana@x.com"));
        assert!(!is_valid_email("ana@x"));
        assert!(!is_valid_email("ana x@x.com"));
        assert!(!is_valid_email("@x.com"));
    }

    #[tokio::test]
    async fn register_normalizes_and_hashes() {
        let store = MemoryStore::default();
        let user = register(&store, registration("  Ana ", "Ana@X.com", "longpass1"))
            .await
            .unwrap();
        assert_eq!(user.email, "ana@x.com");
        assert_eq!(user.name, "Ana");
        assert_eq!(user.language, "es");
        assert_ne!(user.password_hash, "longpass1");
        assert!(password::verify("longpass1", &user.password_hash).await.unwrap());
    }

    #[tokio::test]
    async fn register_twice_with_case_variation_fails() {
        let store = MemoryStore::default();
        register(&store, registration("Ana", "Ana@X.com", "longpass1")).await.unwrap();
        let err = register(&store, registration("Ana", "ANA@x.com", "longpass1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmailExists));
    }

    #[tokio::test]
    async fn register_validation_order() {
        let store = MemoryStore::default();
        let missing = RegisterRequest {
            email: Some("a@b.co".into()),
            ..Default::default()
        };
        assert!(matches!(register(&store, missing).await, Err(ApiError::MissingFields)));
        assert!(matches!(
            register(&store, registration("Ana", "not-an-email", "longpass1")).await,
            Err(ApiError::InvalidEmailFormat)
        ));
        assert!(matches!(
            register(&store, registration("Ana", "a@b.co", "short")).await,
            Err(ApiError::PasswordTooShort)
        ));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let store = MemoryStore::default();
        register(&store, registration("Ana", "ana@x.com", "longpass1")).await.unwrap();

        let wrong_password = login(
            &store,
            LoginRequest {
                email: Some("ana@x.com".into()),
                password: Some("longpass2".into()),
            },
        )
        .await
        .unwrap_err();
        let unknown_email = login(
            &store,
            LoginRequest {
                email: Some("bob@x.com".into()),
                password: Some("longpass1".into()),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(wrong_password.code(), unknown_email.code());
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.status(), unknown_email.status());
    }

    #[tokio::test]
    async fn login_is_case_insensitive_on_email() {
        let store = MemoryStore::default();
        let created = register(&store, registration("Ana", "ana@x.com", "longpass1"))
            .await
            .unwrap();
        let user = login(
            &store,
            LoginRequest {
                email: Some(" ANA@x.com ".into()),
                password: Some("longpass1".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(user.user_id, created.user_id);
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let store = MemoryStore::default();
        let err = login(&store, LoginRequest::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingCredentials));
    }

    #[tokio::test]
    async fn google_login_creates_account_without_usable_password() {
        let store = MemoryStore::default();
        let user = google_login(&store, &TrustUpstream, google("G@x.com", "g-1"))
            .await
            .unwrap();
        assert_eq!(user.email, "g@x.com");
        assert_eq!(user.auth_provider, AuthProvider::Google);
        assert_eq!(user.google_id.as_deref(), Some("g-1"));

        let err = login(
            &store,
            LoginRequest {
                email: Some("g@x.com".into()),
                password: Some("g-1".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn google_login_links_existing_account_and_keeps_password() {
        let store = MemoryStore::default();
        let local = register(&store, registration("Ana", "ana@x.com", "longpass1"))
            .await
            .unwrap();
        let linked = google_login(&store, &TrustUpstream, google("ana@x.com", "g-7"))
            .await
            .unwrap();
        assert_eq!(linked.user_id, local.user_id);
        assert_eq!(linked.google_id.as_deref(), Some("g-7"));
        assert_eq!(linked.password_hash, local.password_hash);

        let again = google_login(&store, &TrustUpstream, google("ana@x.com", "g-other"))
            .await
            .unwrap();
        assert_eq!(again.google_id.as_deref(), Some("g-7"));
    }

    #[tokio::test]
    async fn google_login_requires_all_fields() {
        let store = MemoryStore::default();
        let payload = GoogleLoginRequest {
            email: Some("a@b.co".into()),
            ..Default::default()
        };
        let err = google_login(&store, &TrustUpstream, payload).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingProviderData));
    }
}
