use async_trait::async_trait;

/// Google sign-in data as posted by the client after its own token exchange.
#[derive(Debug, Clone)]
pub struct ProviderClaim {
    pub email: String,
    pub name: String,
    pub google_id: String,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}

/// Checks a provider claim against the identity provider.
#[async_trait]
pub trait ProviderVerifier: Send + Sync {
    async fn verify(&self, claim: &ProviderClaim) -> anyhow::Result<bool>;
}

/// Accepts every claim; the token exchange is trusted to happen upstream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustUpstream;

#[async_trait]
impl ProviderVerifier for TrustUpstream {
    async fn verify(&self, _claim: &ProviderClaim) -> anyhow::Result<bool> {
        Ok(true)
    }
}
