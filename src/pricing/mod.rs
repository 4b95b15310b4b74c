pub mod coingecko_client;

pub use coingecko_client::CoinGeckoClient;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::PnlError;

/// Every price is quoted in this currency.
pub const QUOTE_CURRENCY: &str = "usd";

/// Built-in token id → CoinGecko id mapping.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("eth", "ethereum"),
    ("ethereum", "ethereum"),
    ("btc", "bitcoin"),
    ("bitcoin", "bitcoin"),
    ("sol", "solana"),
    ("solana", "solana"),
];

/// External market price source, queried by canonical symbol.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn usd_price(&self, symbol: &str) -> Result<Decimal, PnlError>;
}

/// Case-insensitive alias table. Unmapped identifiers pass through
/// lower-cased.
#[derive(Debug, Clone)]
pub struct TokenAliases {
    map: HashMap<String, String>,
}

impl Default for TokenAliases {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TokenAliases {
    pub fn builtin() -> Self {
        Self {
            map: BUILTIN_ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Built-ins overlaid with `extra`; later entries win.
    pub fn with_overrides(extra: &HashMap<String, String>) -> Self {
        let mut aliases = Self::builtin();
        for (alias, id) in extra {
            aliases.map.insert(alias.to_lowercase(), id.to_lowercase());
        }
        aliases
    }

    pub fn canonical(&self, token_id: &str) -> String {
        let key = token_id.trim().to_lowercase();
        match self.map.get(&key) {
            Some(id) => id.clone(),
            None => key,
        }
    }
}

/// Token-id based price lookup: normalizes through the alias table and asks
/// the underlying source.
#[derive(Clone)]
pub struct PriceLookup {
    source: Arc<dyn PriceSource>,
    aliases: TokenAliases,
}

impl PriceLookup {
    pub fn new(source: Arc<dyn PriceSource>, aliases: TokenAliases) -> Self {
        Self { source, aliases }
    }

    pub fn canonical_symbol(&self, token_id: &str) -> String {
        self.aliases.canonical(token_id)
    }

    pub async fn lookup(&self, token_id: &str) -> Result<Decimal, PnlError> {
        let symbol = self.canonical_symbol(token_id);
        self.price_of(&symbol).await
    }

    /// Query by an already-canonical symbol.
    pub async fn price_of(&self, symbol: &str) -> Result<Decimal, PnlError> {
        self.source.usd_price(symbol).await
    }
}
