//! Implements `Backend` over HTTP with `reqwest`.

use crate::api::{dashboard_params, expense_params, Backend, TokenStore};
use crate::error::ApiError;
use crate::model::{
    Category, CategoryList, CategoryPayload, DashboardData, Expense, ExpensePayload, Filters, Id,
    Page,
};
use crate::Result;
use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};
use url::Url;

/// Talks to the expense REST API. Each request carries the stored bearer token, if any. A 401
/// response removes the token both here and on disk.
pub(crate) struct HttpBackend {
    base: Url,
    client: reqwest::Client,
    tokens: TokenStore,
    token: Mutex<Option<String>>,
}

/// Single resources may come back bare or wrapped in `{"data": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Resource<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Resource<T> {
    fn into_inner(self) -> T {
        match self {
            Resource::Wrapped { data } | Resource::Bare(data) => data,
        }
    }
}

impl HttpBackend {
    pub(crate) async fn new(api_url: &str, timeout: Duration, tokens: TokenStore) -> Result<Self> {
        let base =
            Url::parse(api_url).with_context(|| format!("Invalid API URL '{api_url}'"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("The API URL '{api_url}' cannot be used as a base URL");
        }
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Unable to create the HTTP client")?;
        let token = tokens.load().await?;
        debug!(
            "HTTP backend at {base} (timeout {}s, token {})",
            timeout.as_secs(),
            if token.is_some() { "present" } else { "absent" }
        );
        Ok(Self {
            base,
            client,
            tokens,
            token: Mutex::new(token),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("The API URL '{}' cannot be a base", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn clear_token(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Err(e) = self.tokens.clear().await {
            warn!("Unable to remove the stored token: {e:#}");
        }
    }

    /// Sends a request and returns the body of a successful response. Any other outcome becomes an
    /// `ApiError`.
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&'static str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = self.url(segments)?;
        trace!("{method} {url} {query:?}");
        let mut request = self.client.request(method.clone(), url.clone()).query(query);
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("API Error: url={url} method={method} message={e}");
                return Err(ApiError::Transport(e.to_string()).into());
            }
        };
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if status.is_success() {
            debug!(
                "API Request completed in {}ms: {url}",
                start.elapsed().as_millis()
            );
            return Ok(text);
        }

        let e = ApiError::from_response(status.as_u16(), &text);
        error!(
            "API Error: url={url} method={method} status={} message={}",
            status.as_u16(),
            e.user_message()
        );
        if status == StatusCode::UNAUTHORIZED {
            self.clear_token().await;
        }
        if status == StatusCode::FORBIDDEN {
            error!("Access forbidden");
        }
        if status.is_server_error() {
            error!("Server error occurred");
        }
        Err(e.into())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let text = self.send(Method::GET, segments, query, None).await?;
        decode(&text)
    }

    async fn write<B, T>(&self, method: Method, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).context("Unable to serialize the request body")?;
        let text = self.send(method, segments, &[], Some(body)).await?;
        decode::<Resource<T>>(&text).map(Resource::into_inner)
    }

    async fn delete(&self, segments: &[&str]) -> Result<()> {
        // 204 No Content, or a confirmation body that is not needed.
        let _ = self.send(Method::DELETE, segments, &[], None).await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()).into())
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn list_expenses(&self, filters: &Filters, page: u32) -> Result<Page<Expense>> {
        self.get(&["expenses"], &expense_params(filters, page))
            .await
    }

    async fn get_expense(&self, id: Id) -> Result<Expense> {
        let id = id.to_string();
        self.get::<Resource<Expense>>(&["expenses", &id], &[])
            .await
            .map(Resource::into_inner)
    }

    async fn create_expense(&self, payload: &ExpensePayload) -> Result<Expense> {
        self.write(Method::POST, &["expenses"], payload).await
    }

    async fn update_expense(&self, id: Id, payload: &ExpensePayload) -> Result<Expense> {
        let id = id.to_string();
        self.write(Method::PUT, &["expenses", &id], payload).await
    }

    async fn delete_expense(&self, id: Id) -> Result<()> {
        self.delete(&["expenses", &id.to_string()]).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.get::<CategoryList>(&["categories"], &[])
            .await
            .map(Vec::from)
    }

    async fn get_category(&self, id: Id) -> Result<Category> {
        let id = id.to_string();
        self.get::<Resource<Category>>(&["categories", &id], &[])
            .await
            .map(Resource::into_inner)
    }

    async fn create_category(&self, payload: &CategoryPayload) -> Result<Category> {
        self.write(Method::POST, &["categories"], payload).await
    }

    async fn update_category(&self, id: Id, payload: &CategoryPayload) -> Result<Category> {
        let id = id.to_string();
        self.write(Method::PUT, &["categories", &id], payload).await
    }

    async fn delete_category(&self, id: Id) -> Result<()> {
        self.delete(&["categories", &id.to_string()]).await
    }

    async fn dashboard(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<DashboardData> {
        self.get(&["dashboard"], &dashboard_params(start_date, end_date))
            .await
    }

    async fn monthly_stats(&self, year: i32) -> Result<serde_json::Value> {
        self.get(&["dashboard", "monthly", &year.to_string()], &[])
            .await
    }

    async fn health(&self) -> Result<serde_json::Value> {
        self.get(&["health"], &[]).await
    }
}
