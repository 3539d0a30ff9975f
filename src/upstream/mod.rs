//! Seam to the upstream registry API.

mod harbor;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{CollectError, Result};

pub use harbor::HarborClient;

#[async_trait]
pub trait Upstream: Send + Sync + 'static {
    /// GET `path` relative to the API root and return the raw body.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;

    /// GET every page of `path`, handing each body to `on_page` until the
    /// upstream reports no further pages. The default treats `path` as a
    /// single page.
    async fn fetch_all_pages(
        &self,
        path: &str,
        on_page: &mut (dyn for<'p> FnMut(&'p [u8]) -> Result<()> + Send),
    ) -> Result<()> {
        let body = self.fetch(path).await?;
        on_page(&body)
    }
}

/// Fetch `path` and decode it as `T`.
pub async fn fetch_json<T: DeserializeOwned>(upstream: &dyn Upstream, path: &str) -> Result<T> {
    let body = upstream.fetch(path).await?;
    decode(path, &body)
}

/// Fetch every page of a JSON-array endpoint and concatenate the elements.
pub async fn fetch_all_json<T>(upstream: &dyn Upstream, path: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned + Send,
{
    let mut all = Vec::new();
    upstream
        .fetch_all_pages(path, &mut |body: &[u8]| {
            let page: Vec<T> = decode(path, body)?;
            all.extend(page);
            Ok(())
        })
        .await?;
    Ok(all)
}

fn decode<T: DeserializeOwned>(path: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| CollectError::Parse {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    struct Fixed(&'static str);

    #[async_trait]
    impl Upstream for Fixed {
        async fn fetch(&self, _path: &str) -> Result<Vec<u8>> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[tokio::test]
    async fn default_pagination_hands_over_single_page() {
        let upstream = Fixed(r#"[{"id": 1}, {"id": 2}]"#);

        let mut pages = Vec::new();
        upstream
            .fetch_all_pages("/things", &mut |body: &[u8]| {
                pages.push(body.len());
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);

        let items: Vec<Item> = fetch_all_json(&upstream, "/things").await.unwrap();
        assert_eq!(items, vec![Item { id: 1 }, Item { id: 2 }]);
    }

    #[tokio::test]
    async fn malformed_page_is_a_parse_error() {
        let upstream = Fixed("<html>");

        let err = fetch_all_json::<Item>(&upstream, "/things").await.unwrap_err();
        assert!(matches!(err, CollectError::Parse { path, .. } if path == "/things"));
    }
}
