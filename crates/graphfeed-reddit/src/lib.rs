//! Reddit content source for graphfeed.
//!
//! Thin wrapper over the public listing endpoint
//! (`https://www.reddit.com/r/<source>/<sort>/.json`), decoded with serde and
//! mapped into [`RankedItem`]s.
//!
//! # Example
//! ```rust,no_run
//! use graphfeed_core::content::ContentSource;
//! use graphfeed_reddit::RedditSource;
//!
//! #[tokio::main]
//! async fn main() -> graphfeed_core::Result<()> {
//!     let source = RedditSource::new();
//!     let items = source.fetch_ranked_items("lifeprotips", "top").await?;
//!     println!("got {} items", items.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use graphfeed_core::{ContentSource, GraphfeedError, RankedItem, Result};
use serde::Deserialize;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const LISTING_LIMIT: u32 = 25;
/// Listing children of this kind are posts; everything else is skipped.
const POST_KIND: &str = "t3";

/// A Reddit-backed [`ContentSource`].
pub struct RedditSource {
    client: reqwest::Client,
    base_url: String,
}

impl Default for RedditSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RedditSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point at a different host, e.g. a local fixture server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn listing_url(&self, source_id: &str, sort: &str) -> String {
        format!(
            "{}/r/{}/{}/.json?limit={}",
            self.base_url, source_id, sort, LISTING_LIMIT
        )
    }

    fn fetch_error(source_id: &str, reason: impl ToString) -> GraphfeedError {
        GraphfeedError::Fetch {
            source_id: source_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ContentSource for RedditSource {
    async fn fetch_ranked_items(&self, source_id: &str, sort: &str) -> Result<Vec<RankedItem>> {
        let url = self.listing_url(source_id, sort);
        debug!(%url, "fetching listing");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| Self::fetch_error(source_id, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::fetch_error(source_id, format!("status {status}")));
        }
        let body: ListingBody = response
            .json()
            .await
            .map_err(|err| Self::fetch_error(source_id, err))?;
        let items = extract_items(body, &self.base_url);
        debug!(source_id, count = items.len(), "decoded listing");
        Ok(items)
    }
}

/// A listing endpoint returns either one listing or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingBody {
    One(Listing),
    Many(Vec<Listing>),
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    kind: String,
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    ups: i64,
}

fn extract_items(body: ListingBody, base_url: &str) -> Vec<RankedItem> {
    let listings = match body {
        ListingBody::One(listing) => vec![listing],
        ListingBody::Many(listings) => listings,
    };
    listings
        .into_iter()
        .flat_map(|listing| listing.data.children)
        .filter(|child| child.kind == POST_KIND)
        .map(|child| {
            let post = child.data;
            RankedItem {
                source_ref: format!(
                    "[r/{}]({}{})",
                    post.subreddit, base_url, post.permalink
                ),
                title: post.title,
                body: post.selftext,
                author: post.author,
                score: post.ups.max(0) as u32,
            }
        })
        .collect()
}
