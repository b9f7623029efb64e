//! Pool token list published per network on the token list CDN.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use lumina_worker::Address;

use crate::error::TokenListError;
use crate::machine::SettingsPatch;
use crate::wallet::Network;

const TOKEN_LIST_FILE: &str = "pool-token-list.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    pub address: Address,
    pub pool_address: Address,
    pub token_id: String,
    pub chain_id: String,
    pub symbol: String,
    pub decimals: u32,
}

impl TokenDescriptor {
    /// Selects this token and its pool for swap or liquidity settings.
    pub fn settings_patch(&self) -> SettingsPatch {
        SettingsPatch::default()
            .pool(self.pool_address.clone())
            .token_a(self.address.clone())
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 500,
        }
    }
}

/// Fetches token lists and keeps one cached copy per network.
pub struct TokenListClient {
    base_url: Url,
    http: reqwest::Client,
    retry: RetryConfig,
    cache: HashMap<Network, Vec<TokenDescriptor>>,
}

impl TokenListClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, TokenListError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            http,
            retry: RetryConfig::default(),
            cache: HashMap::new(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn list_url(&self, network: Network) -> Result<Url, TokenListError> {
        let url = format!(
            "{}/{}/{TOKEN_LIST_FILE}",
            self.base_url.as_str().trim_end_matches('/'),
            network.slug()
        );
        Ok(Url::parse(&url)?)
    }

    pub fn cached(&self, network: Network) -> Option<&[TokenDescriptor]> {
        self.cache.get(&network).map(Vec::as_slice)
    }

    pub async fn fetch_pool_token_list(
        &mut self,
        network: Network,
    ) -> Result<&[TokenDescriptor], TokenListError> {
        if !self.cache.contains_key(&network) {
            let url = self.list_url(network)?;
            let http = self.http.clone();
            let tokens = with_retry(self.retry.clone(), || fetch(&http, url.clone())).await?;
            debug!(%network, count = tokens.len(), "token list fetched");
            self.cache.insert(network, tokens);
        }
        Ok(self.cached(network).unwrap_or_default())
    }

    pub fn invalidate(&mut self, network: Network) {
        self.cache.remove(&network);
    }
}

async fn fetch(http: &reqwest::Client, url: Url) -> Result<Vec<TokenDescriptor>, TokenListError> {
    let response = http.get(url.clone()).send().await?;
    if !response.status().is_success() {
        return Err(TokenListError::Status(format!(
            "token list {url}: {}",
            response.status()
        )));
    }
    Ok(response.json().await?)
}

async fn with_retry<F, Fut, T>(retry: RetryConfig, mut f: F) -> Result<T, TokenListError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, TokenListError>>,
{
    let mut attempt = 0usize;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= retry.max_attempts {
                    return Err(err);
                }
                warn!(attempt, "token list fetch failed: {err}");
                sleep(Duration::from_millis(retry.delay_ms)).await;
            }
        }
    }
}
