use async_trait::async_trait;
use courseca_identity_core::{
    ExternalProvider, IdentityError, IdentityResult, ProviderId, ProviderKind, ProviderRegistry,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ids handed out to accepted providers start here.
pub const FIRST_PROVIDER_ID: ProviderId = 30000;

#[derive(Clone)]
pub struct InMemoryProviderRegistry {
    providers: Arc<RwLock<BTreeMap<ProviderId, ExternalProvider>>>,
}

impl InMemoryProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Registers an active provider under the next free id.
    pub async fn accept_provider(
        &self,
        name: impl Into<String>,
        kind: ProviderKind,
        end_point_url: impl Into<String>,
    ) -> ExternalProvider {
        let mut providers = self.providers.write().await;
        let id = providers
            .keys()
            .next_back()
            .map_or(FIRST_PROVIDER_ID, |last| last + 1);

        let provider = ExternalProvider {
            id,
            name: name.into(),
            kind,
            end_point_url: end_point_url.into(),
            active: true,
        };
        providers.insert(id, provider.clone());
        provider
    }

    pub async fn set_active(&self, provider_id: ProviderId, active: bool) -> IdentityResult<()> {
        let mut providers = self.providers.write().await;
        let provider = providers
            .get_mut(&provider_id)
            .ok_or_else(|| IdentityError::Storage(format!("unknown provider {provider_id}")))?;
        provider.active = active;
        Ok(())
    }
}

impl Default for InMemoryProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderRegistry for InMemoryProviderRegistry {
    async fn find_active(&self, provider_id: ProviderId) -> IdentityResult<Option<ExternalProvider>> {
        let providers = self.providers.read().await;
        Ok(providers.get(&provider_id).filter(|p| p.active).cloned())
    }

    async fn list_active(&self) -> IdentityResult<Vec<ExternalProvider>> {
        let providers = self.providers.read().await;
        Ok(providers.values().filter(|p| p.active).cloned().collect())
    }
}
