//! Table reads and writes over the REST interface.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::cache::ListingCache;
use super::{AccessToken, BackendError, SupabaseClient};

/// A `PostgREST` query: table, columns, equality filters, order and limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: &'static str,
    select: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<usize>,
}

impl Query {
    /// Select every column of `table`.
    #[must_use]
    pub fn table(table: &'static str) -> Self {
        Self {
            table,
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Columns and embedded resources, e.g. `*,profiles(full_name)`.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.to_string();
        self
    }

    /// `column = value`. Dotted columns filter embedded resources.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    #[must_use]
    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(format!("{column}.desc"));
        self
    }

    #[must_use]
    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(format!("{column}.asc"));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn table_name(&self) -> &'static str {
        self.table
    }

    /// Query-string pairs for the request.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filters.iter().cloned());
        if let Some(order) = &self.order {
            params.push(("order".to_string(), order.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    fn cache_key(&self) -> String {
        let params = self
            .params()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        ListingCache::key(self.table, &params)
    }
}

/// Parse the total out of a `Content-Range` header (`0-9/42` or `*/42`).
pub(super) fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

impl SupabaseClient {
    /// Fetch the rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows don't deserialize as `T`.
    #[instrument(skip(self, token), fields(table = query.table))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        query: &Query,
        token: AccessToken<'_>,
    ) -> Result<Vec<T>, BackendError> {
        let value = self.select_raw(query, token).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch exactly one row.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if no row matches.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        query: &Query,
        token: AccessToken<'_>,
    ) -> Result<T, BackendError> {
        let query = query.clone().limit(1);
        self.select::<T>(&query, token)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("{} row", query.table)))
    }

    /// Anonymous read served from the listing cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows don't deserialize as `T`.
    #[instrument(skip(self), fields(table = query.table))]
    pub async fn select_cached<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> Result<Vec<T>, BackendError> {
        let key = query.cache_key();
        if let Some(value) = self.inner.cache.get(&key).await {
            debug!("Cache hit for listings");
            return Ok(serde_json::from_value((*value).clone())?);
        }

        let value = self.select_raw(query, AccessToken::Anon).await?;
        let rows = serde_json::from_value(value.clone())?;
        self.inner.cache.insert(key, value).await;
        Ok(rows)
    }

    async fn select_raw(
        &self,
        query: &Query,
        token: AccessToken<'_>,
    ) -> Result<serde_json::Value, BackendError> {
        let builder = self
            .inner
            .http
            .get(self.rest_url(query.table))
            .query(&query.params())
            .header(reqwest::header::ACCEPT, "application/json");
        let response = Self::send(self.authorize(builder, token)?).await?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Exact row count of `table`, cached like listing reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend omits the
    /// `Content-Range` total.
    #[instrument(skip(self))]
    pub async fn count(&self, table: &'static str) -> Result<u64, BackendError> {
        let key = ListingCache::key(table, "count");
        if let Some(value) = self.inner.cache.get(&key).await
            && let Some(count) = value.as_u64()
        {
            return Ok(count);
        }

        let builder = self
            .inner
            .http
            .head(self.rest_url(table))
            .query(&[("select", "*")])
            .header("Prefer", "count=exact");
        let response = Self::send(self.authorize(builder, AccessToken::Anon)?).await?;

        let count = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| BackendError::Api {
                status: response.status().as_u16(),
                message: format!("no row count returned for {table}"),
            })?;

        self.inner.cache.insert(key, count.into()).await;
        Ok(count)
    }

    /// Insert one row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the row.
    #[instrument(skip(self, row, token))]
    pub async fn insert<T: Serialize + Sync, R: DeserializeOwned>(
        &self,
        table: &'static str,
        row: &T,
        token: AccessToken<'_>,
    ) -> Result<R, BackendError> {
        let builder = self
            .inner
            .http
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(row);
        let response = Self::send(self.authorize(builder, token)?).await?;
        self.inner.cache.invalidate_table(table);

        let rows: Vec<R> = response.json().await?;
        rows.into_iter().next().ok_or_else(|| BackendError::Api {
            status: 500,
            message: format!("insert into {table} returned no rows"),
        })
    }

    /// Apply `patch` to the rows matching `query`'s filters.
    ///
    /// # Errors
    ///
    /// Refuses to run without a filter; otherwise returns an error if the
    /// backend rejects the update.
    #[instrument(skip(self, patch, token), fields(table = query.table))]
    pub async fn update<T: Serialize + Sync>(
        &self,
        query: &Query,
        patch: &T,
        token: AccessToken<'_>,
    ) -> Result<(), BackendError> {
        if query.filters.is_empty() {
            return Err(BackendError::Api {
                status: 400,
                message: format!("refusing to update every row of {}", query.table),
            });
        }

        let builder = self
            .inner
            .http
            .patch(self.rest_url(query.table))
            .query(&query.filters)
            .header("Prefer", "return=minimal")
            .json(patch);
        Self::send(self.authorize(builder, token)?).await?;
        self.inner.cache.invalidate_table(query.table);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params() {
        let query = Query::table("plot_leases")
            .select("*,land_listings!inner(title,farmer_id)")
            .eq("land_listings.farmer_id", "abc")
            .order_desc("created_at")
            .limit(20);

        assert_eq!(
            query.params(),
            vec![
                ("select".to_string(), "*,land_listings!inner(title,farmer_id)".to_string()),
                ("land_listings.farmer_id".to_string(), "eq.abc".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_cache_key_includes_filters() {
        let all = Query::table("produce_listings");
        let active = Query::table("produce_listings").eq("status", "active");
        assert_ne!(all.cache_key(), active.cache_key());
        assert!(active.cache_key().starts_with("produce_listings|"));
    }

    fn client(server: &httpmock::MockServer) -> SupabaseClient {
        let config = crate::config::SupabaseConfig {
            url: url::Url::parse(&server.base_url()).unwrap(),
            anon_key: secrecy::SecretString::from("anon-key"),
            service_role_key: None,
        };
        SupabaseClient::new(&config, std::time::Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_user_token_is_sent_as_bearer() {
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .path("/rest/v1/orders")
                    .query_param("buyer_id", "eq.42")
                    .header("apikey", "anon-key")
                    .header("authorization", "Bearer user-jwt");
                then.status(200).json_body(serde_json::json!([{"id": 1}]));
            })
            .await;

        let rows: Vec<serde_json::Value> = client(&server)
            .select(&Query::table("orders").eq("buyer_id", 42), AccessToken::User("user-jwt"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_count_is_cached_until_a_write() {
        let server = httpmock::MockServer::start_async().await;
        let head = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::HEAD)
                    .path("/rest/v1/produce_listings")
                    .header("prefer", "count=exact");
                then.status(200).header("content-range", "0-0/12");
            })
            .await;
        let insert = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/rest/v1/produce_listings");
                then.status(201).json_body(serde_json::json!([{"id": 13}]));
            })
            .await;

        let client = client(&server);
        assert_eq!(client.count("produce_listings").await.unwrap(), 12);
        assert_eq!(client.count("produce_listings").await.unwrap(), 12);
        head.assert_hits_async(1).await;

        let _: serde_json::Value = client
            .insert(
                "produce_listings",
                &serde_json::json!({"name": "Okra"}),
                AccessToken::Anon,
            )
            .await
            .unwrap();
        insert.assert_async().await;

        client.count("produce_listings").await.unwrap();
        head.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn test_update_without_filter_is_refused() {
        let server = httpmock::MockServer::start_async().await;
        let result = client(&server)
            .update(
                &Query::table("land_listings"),
                &serde_json::json!({"status": "leased"}),
                AccessToken::Anon,
            )
            .await;
        assert!(matches!(result, Err(BackendError::Api { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_status_codes_map_to_errors() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/rest/v1/profiles");
                then.status(429).header("retry-after", "7");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/rest/v1/orders");
                then.status(401)
                    .json_body(serde_json::json!({"message": "JWT expired"}));
            })
            .await;

        let client = client(&server);
        let limited = client
            .select::<serde_json::Value>(&Query::table("profiles"), AccessToken::Anon)
            .await;
        assert!(matches!(limited, Err(BackendError::RateLimited(7))));

        let expired = client
            .select::<serde_json::Value>(&Query::table("orders"), AccessToken::User("old"))
            .await;
        assert!(matches!(expired, Err(BackendError::Unauthorized(m)) if m == "JWT expired"));
    }

    #[tokio::test]
    async fn test_service_role_needs_a_key() {
        let server = httpmock::MockServer::start_async().await;
        let result = client(&server)
            .select::<serde_json::Value>(&Query::table("profiles"), AccessToken::ServiceRole)
            .await;
        assert!(matches!(result, Err(BackendError::Unauthorized(_))));
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-0/42"), Some(42));
        assert_eq!(parse_content_range("*/7"), Some(7));
        assert_eq!(parse_content_range("0-9/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }
}
