use async_trait::async_trait;
use reqwest::header::{HeaderMap, LINK};
use tracing::{debug, trace, warn};

use super::Upstream;
use crate::config::HarborConfig;
use crate::error::{CollectError, Result};

/// Harbor REST client.
///
/// `reqwest::Client` is cheaply cloneable and pools connections, so one
/// instance is shared by every family and every worker.
#[derive(Debug, Clone)]
pub struct HarborClient {
    http: reqwest::Client,
    api_base: String,
    username: Option<String>,
    password: Option<String>,
    page_size: usize,
    max_pages: usize,
}

impl HarborClient {
    pub fn new(config: &HarborConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base(),
            username: config.username.clone(),
            password: config.password.clone(),
            page_size: config.page_size,
            max_pages: config.max_pages,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.api_base, path);
        trace!(%url, "GET");

        let mut req = self.http.get(&url);
        if let Some(user) = &self.username {
            req = req.basic_auth(user, self.password.as_ref());
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CollectError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl Upstream for HarborClient {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let body = self.get(path).await?.bytes().await?;
        Ok(body.to_vec())
    }

    async fn fetch_all_pages(
        &self,
        path: &str,
        on_page: &mut (dyn for<'p> FnMut(&'p [u8]) -> Result<()> + Send),
    ) -> Result<()> {
        let mut page = 1usize;
        loop {
            let paged = with_page(path, page, self.page_size);
            let resp = self.get(&paged).await?;

            let next_link = has_next_link(resp.headers());
            let total = total_count(resp.headers());
            let body = resp.bytes().await?;
            on_page(&body)?;

            let items = page_len(&body);
            let more = match (items, next_link) {
                (Some(0), _) => false,
                // Harbor v2 advertises further pages via `Link: <...>; rel="next"`
                (_, Some(has_next)) => has_next,
                (Some(n), None) => n >= self.page_size,
                (None, None) => false,
            };
            // `X-Total-Count` caps the walk even if the upstream ignores `page`
            let more = more && !total.is_some_and(|t| page * self.page_size >= t);

            if !more {
                debug!(path, pages = page, "pagination finished");
                return Ok(());
            }
            if page >= self.max_pages {
                warn!(path, max_pages = self.max_pages, "pagination did not terminate");
                return Err(CollectError::PageLimit {
                    path: path.to_string(),
                    max_pages: self.max_pages,
                });
            }
            page += 1;
        }
    }
}

/// Append `page` / `page_size` to a path that may already carry a query.
fn with_page(path: &str, page: usize, page_size: usize) -> String {
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}page={page}&page_size={page_size}")
}

fn has_next_link(headers: &HeaderMap) -> Option<bool> {
    headers
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("rel=\"next\""))
}

fn total_count(headers: &HeaderMap) -> Option<usize> {
    headers
        .get("x-total-count")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Number of elements if the body is a JSON array.
fn page_len(body: &[u8]) -> Option<usize> {
    serde_json::from_slice::<Vec<serde_json::Value>>(body)
        .ok()
        .map(|items| items.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_page_respects_existing_query() {
        assert_eq!(with_page("/projects", 2, 50), "/projects?page=2&page_size=50");
        assert_eq!(
            with_page("/repositories?project_id=3", 1, 10),
            "/repositories?project_id=3&page=1&page_size=10"
        );
    }

    #[test]
    fn page_len_counts_array_items() {
        assert_eq!(page_len(br#"[{"a":1},{"a":2}]"#), Some(2));
        assert_eq!(page_len(b"[]"), Some(0));
        assert_eq!(page_len(b"not json"), None);
    }

    #[test]
    fn pagination_headers_are_read() {
        let mut headers = HeaderMap::new();
        assert_eq!(has_next_link(&headers), None);
        assert_eq!(total_count(&headers), None);

        headers.insert(LINK, r#"</api/v2.0/projects?page=1>; rel="prev""#.parse().unwrap());
        headers.insert("x-total-count", "42".parse().unwrap());
        assert_eq!(has_next_link(&headers), Some(false));
        assert_eq!(total_count(&headers), Some(42));
    }

    #[test]
    fn client_uses_configured_api_base() {
        let client = HarborClient::new(&HarborConfig::new("http://harbor.local")).unwrap();
        assert_eq!(client.api_base(), "http://harbor.local/api/v2.0");
    }
}
