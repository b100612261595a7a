//! HTTP client for the NetLab catalog endpoints.

use std::time::Duration;

use reqwest::{Client, Url};

use pricelab_core::{CatalogRecord, CategoryRecord, ProductRecord};

use crate::error::NetlabError;
use crate::token::TokenCache;
use crate::xml;

/// Client for the NetLab distributor REST API.
///
/// Manages the HTTP client, credentials, base URL, and a cached bearer
/// token. Use [`NetlabClient::new`] for production or
/// [`NetlabClient::with_base_url`] to point at a mock server in tests.
pub struct NetlabClient {
    client: Client,
    base_url: Url,
    login: String,
    password: String,
    token: TokenCache,
}

impl NetlabClient {
    /// Creates a new client for the given API root.
    ///
    /// # Errors
    ///
    /// Returns [`NetlabError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`NetlabError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(
        base_url: &str,
        login: &str,
        password: &str,
        timeout_secs: u64,
    ) -> Result<Self, NetlabError> {
        Self::with_base_url(base_url, login, password, timeout_secs)
    }

    /// Creates a new client with an explicit base URL (for testing with
    /// wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`NetlabClient::new`].
    pub fn with_base_url(
        base_url: &str,
        login: &str,
        password: &str,
        timeout_secs: u64,
    ) -> Result<Self, NetlabError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("pricelab/0.1 (catalog-sync)")
            .build()?;

        // Normalise: exactly one trailing slash so joined paths extend the
        // root instead of replacing the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| NetlabError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            login: login.to_owned(),
            password: password.to_owned(),
            token: TokenCache::default(),
        })
    }

    /// Lists the catalogs available to this account.
    ///
    /// # Errors
    ///
    /// - [`NetlabError::Api`] if the embedded status code is not 200.
    /// - [`NetlabError::Http`] / [`NetlabError::UnexpectedStatus`] on
    ///   transport failure.
    /// - [`NetlabError::Xml`] / [`NetlabError::MissingElement`] on a
    ///   malformed document.
    pub async fn list_catalogs(&self) -> Result<Vec<CatalogRecord>, NetlabError> {
        let body = self.get_catalog_xml(&["list.xml"]).await?;
        xml::ensure_ok(&body, "catalog list")?;
        xml::parse_catalogs(&body, "catalog list")
    }

    /// Lists the full category tree of one catalog.
    ///
    /// # Errors
    ///
    /// Same classes as [`NetlabClient::list_catalogs`].
    pub async fn list_categories(
        &self,
        catalog_name: &str,
    ) -> Result<Vec<CategoryRecord>, NetlabError> {
        let segment = format!("{catalog_name}.xml");
        let context = format!("categories of {catalog_name}");
        let body = self.get_catalog_xml(&[&segment]).await?;
        xml::ensure_ok(&body, &context)?;
        xml::parse_categories(&body, &context)
    }

    /// Lists the products of one category, with property mapping applied.
    ///
    /// # Errors
    ///
    /// Same classes as [`NetlabClient::list_catalogs`].
    pub async fn list_products(
        &self,
        catalog_name: &str,
        category_id: i64,
    ) -> Result<Vec<ProductRecord>, NetlabError> {
        let segment = format!("{category_id}.xml");
        let context = format!("products of {catalog_name}/{category_id}");
        let body = self.get_catalog_xml(&[catalog_name, &segment]).await?;
        xml::ensure_ok(&body, &context)?;
        let goods = xml::parse_goods(&body, &context)?;
        Ok(goods
            .into_iter()
            .map(|g| ProductRecord::from_properties(g.id, &g.properties))
            .collect())
    }

    /// Returns the current bearer token, refreshing it when absent or near
    /// expiry.
    ///
    /// # Errors
    ///
    /// Surfaces authentication-endpoint failures as [`NetlabError::Api`] or
    /// transport errors.
    pub async fn current_token(&self) -> Result<String, NetlabError> {
        self.token.get_or_refresh(|| self.fetch_token()).await
    }

    async fn fetch_token(&self) -> Result<(String, String), NetlabError> {
        let mut url = self.endpoint(&["rest", "authentication", "token.xml"])?;
        url.query_pairs_mut()
            .append_pair("username", &self.login)
            .append_pair("password", &self.password);
        let body = self.get_xml(url).await?;
        xml::ensure_ok(&body, "authentication")?;
        xml::parse_token(&body, "authentication")
    }

    /// Fetches one `catalogsZip` document with the bearer token attached.
    async fn get_catalog_xml(&self, segments: &[&str]) -> Result<String, NetlabError> {
        let token = self.current_token().await?;
        let mut path = vec!["rest", "catalogsZip"];
        path.extend_from_slice(segments);
        let mut url = self.endpoint(&path)?;
        url.query_pairs_mut().append_pair("oauth_token", &token);
        self.get_xml(url).await
    }

    async fn get_xml(&self, url: Url) -> Result<String, NetlabError> {
        tracing::debug!(path = url.path(), "NetLab request");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetlabError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.path().to_string(),
            });
        }
        Ok(response.text().await?)
    }

    /// Builds an endpoint URL from path segments. Segments are
    /// percent-encoded, so catalog names may carry spaces or Cyrillic.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, NetlabError> {
        let mut url = self.base_url.clone();
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|()| NetlabError::InvalidBaseUrl {
                    url: self.base_url.to_string(),
                    reason: "cannot be a base".to_string(),
                })?;
            parts.pop_if_empty();
            for segment in segments {
                parts.push(segment);
            }
        }
        Ok(url)
    }
}
