use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use urlencoding::encode as url_encode;

use crate::config::DashboardConfig;
use crate::error::{AdapterError, AdapterResult};
use crate::http::{HttpClient, HttpRequest};

const EXPIRY_SKEW_SECS: i64 = 30;
const DEFAULT_TTL_SECS: i64 = 3600;
const SESSION_ERRORS: &[&str] = &[
    "invalid_grant",
    "interaction_required",
    "login_required",
    "consent_required",
];

/// A signed-in user known to the token cache.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub home_account_id: String,
    pub username: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("home_account_id", &self.home_account_id)
            .field("username", &self.username)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.secret)
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::seconds(EXPIRY_SKEW_SECS)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Identity library seam: account discovery plus silent acquisition.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    fn accounts(&self) -> Vec<Account>;

    async fn acquire_token_silent(
        &self,
        scopes: &[&str],
        account: &Account,
    ) -> AdapterResult<AccessToken>;
}

/// Acquires a token for the first cached account, or fails with
/// [`AdapterError::NoSession`] when nobody is signed in.
pub async fn acquire_for_current_account(
    provider: &dyn TokenProvider,
    scopes: &[&str],
) -> AdapterResult<AccessToken> {
    let account = provider
        .accounts()
        .into_iter()
        .next()
        .ok_or(AdapterError::NoSession)?;
    provider.acquire_token_silent(scopes, &account).await
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

/// Public-client token cache that refreshes through the v2.0 token endpoint.
pub struct SilentTokenClient {
    client_id: String,
    authority: String,
    redirect_uri: String,
    http: Arc<dyn HttpClient>,
    accounts: Mutex<Vec<Account>>,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl SilentTokenClient {
    pub fn new(cfg: &DashboardConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            client_id: cfg.client_id.clone(),
            authority: cfg.authority(),
            redirect_uri: cfg.redirect_uri.clone(),
            http,
            accounts: Mutex::new(Vec::new()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_account(&self, account: Account) {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.retain(|known| known.home_account_id != account.home_account_id);
        accounts.push(account);
    }

    pub fn remove_account(&self, home_account_id: &str) {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|known| known.home_account_id != home_account_id);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| !key.starts_with(&format!("{home_account_id}|")));
    }

    /// Seeds the cache with a token obtained elsewhere (e.g. an interactive login).
    pub fn insert_token(&self, account: &Account, scopes: &[&str], token: AccessToken) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cache_key(&account.home_account_id, scopes), token);
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority)
    }

    fn known_account(&self, home_account_id: &str) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|known| known.home_account_id == home_account_id)
            .cloned()
    }

    fn rotate_refresh_token(&self, home_account_id: &str, refresh_token: String) {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(known) = accounts
            .iter_mut()
            .find(|known| known.home_account_id == home_account_id)
        {
            known.refresh_token = Some(refresh_token);
        }
    }

    async fn redeem_refresh_token(
        &self,
        scopes: &[&str],
        refresh_token: &str,
    ) -> AdapterResult<TokenResponse> {
        let mut scope_list: Vec<&str> = scopes.to_vec();
        scope_list.push("offline_access");
        let form = format!(
            "client_id={}&grant_type=refresh_token&refresh_token={}&scope={}&redirect_uri={}",
            url_encode(&self.client_id),
            url_encode(refresh_token),
            url_encode(&scope_list.join(" ")),
            url_encode(&self.redirect_uri)
        );
        let request = HttpRequest::post(self.token_url(), form.into_bytes())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json");
        let resp = self.http.send(request).await?;
        if !resp.is_success() {
            let body: Value = serde_json::from_slice(&resp.body).unwrap_or(Value::Null);
            let code = body.get("error").and_then(Value::as_str).unwrap_or("");
            if SESSION_ERRORS.contains(&code) {
                warn!(error = code, "cached session rejected by token endpoint");
                return Err(AdapterError::NoSession);
            }
            let message = body
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or(code)
                .to_string();
            return Err(AdapterError::Status {
                status: resp.status,
                message,
            });
        }
        serde_json::from_slice(&resp.body)
            .map_err(|err| AdapterError::Malformed(format!("invalid token response: {err}")))
    }
}

#[async_trait]
impl TokenProvider for SilentTokenClient {
    fn accounts(&self) -> Vec<Account> {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn acquire_token_silent(
        &self,
        scopes: &[&str],
        account: &Account,
    ) -> AdapterResult<AccessToken> {
        let key = cache_key(&account.home_account_id, scopes);
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(token) = cached.filter(|token| token.is_fresh_at(Utc::now())) {
            debug!(account = %account.username, "access token served from cache");
            return Ok(token);
        }

        let known = self
            .known_account(&account.home_account_id)
            .ok_or(AdapterError::NoSession)?;
        let refresh_token = known.refresh_token.ok_or(AdapterError::NoSession)?;

        let payload = self.redeem_refresh_token(scopes, &refresh_token).await?;
        let secret = payload.access_token.ok_or_else(|| {
            AdapterError::Malformed("token response missing access_token".to_string())
        })?;
        let ttl = payload.expires_in.unwrap_or(DEFAULT_TTL_SECS);
        let expires_at = Duration::try_seconds(ttl)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                AdapterError::Malformed(format!("token response expires_in out of range: {ttl}"))
            })?;
        let token = AccessToken::new(secret, expires_at);

        if let Some(rotated) = payload.refresh_token {
            self.rotate_refresh_token(&account.home_account_id, rotated);
        }
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, token.clone());
        debug!(account = %account.username, ttl, "access token refreshed");
        Ok(token)
    }
}

fn cache_key(home_account_id: &str, scopes: &[&str]) -> String {
    let mut normalized: Vec<String> = scopes.iter().map(|s| s.to_ascii_lowercase()).collect();
    normalized.sort();
    normalized.dedup();
    format!("{home_account_id}|{}", normalized.join(" "))
}
