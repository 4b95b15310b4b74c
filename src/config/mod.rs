use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_POSITIONS_TABLE: &str = "trading_table";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub positions_table: String,

    // Price source
    pub coingecko_api_url: String,
    pub coingecko_api_key: Option<String>,
    pub token_aliases: HashMap<String, String>,
    pub price_lookup_concurrency: usize,
    pub http_timeout_secs: u64,

    // Report sink (all three required unless dry_run)
    pub google_sheet_id: Option<String>,
    pub google_sheet_name: Option<String>,
    pub google_credentials: Option<PathBuf>,

    pub dry_run: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let positions_table =
            env::var("POSITIONS_TABLE").unwrap_or_else(|_| DEFAULT_POSITIONS_TABLE.into());
        if !is_sql_identifier(&positions_table) {
            anyhow::bail!(
                "POSITIONS_TABLE must be a plain SQL identifier, got {positions_table:?}"
            );
        }

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            positions_table,

            coingecko_api_url: env::var("COINGECKO_API_URL")
                .unwrap_or_else(|_| DEFAULT_COINGECKO_URL.into()),
            coingecko_api_key: env::var("COINGECKO_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            token_aliases: parse_token_aliases(&env::var("TOKEN_ALIASES").unwrap_or_default()),
            price_lookup_concurrency: env::var("PRICE_LOOKUP_CONCURRENCY")
                .unwrap_or_else(|_| "4".into())
                .parse::<usize>()?
                .max(1),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()?,

            google_sheet_id: env::var("GOOGLE_SHEET_ID").ok(),
            google_sheet_name: env::var("GOOGLE_SHEET_NAME").ok(),
            google_credentials: env::var("GOOGLE_CREDENTIALS").ok().map(PathBuf::from),

            dry_run: env::var("DRY_RUN")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
        };

        if !config.dry_run && !config.has_sheet_config() {
            anyhow::bail!(
                "GOOGLE_SHEET_ID, GOOGLE_SHEET_NAME and GOOGLE_CREDENTIALS must be set \
                 (or DRY_RUN=true)"
            );
        }

        Ok(config)
    }

    /// Returns true if every Google Sheets setting is configured.
    pub fn has_sheet_config(&self) -> bool {
        self.google_sheet_id.is_some()
            && self.google_sheet_name.is_some()
            && self.google_credentials.is_some()
    }
}

/// Parse `sym=id,sym=id` into a lower-cased alias map. Malformed entries are
/// ignored.
pub fn parse_token_aliases(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (alias, id) = pair.split_once('=')?;
            let alias = alias.trim().to_lowercase();
            let id = id.trim().to_lowercase();
            if alias.is_empty() || id.is_empty() {
                return None;
            }
            Some((alias, id))
        })
        .collect()
}

/// The table name is interpolated into SQL, so only `[A-Za-z_][A-Za-z0-9_]*`
/// is accepted.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
