//! Track discovery seam.
//!
//! A [`Catalog`] turns a search into direct download URLs and supplies
//! title/artist for each. Scraping a real catalog site is left to callers;
//! [`UrlListCatalog`] serves a fixed list of URLs.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::track::TrackMetadata;

/// Ordering requested from a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackFilter {
    Latest,
    #[default]
    Random,
    Featured,
    Popular,
}

impl TrackFilter {
    /// Lenient parse: unknown names select [`TrackFilter::Random`].
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackFilter::Latest => "latest",
            TrackFilter::Random => "random",
            TrackFilter::Featured => "featured",
            TrackFilter::Popular => "popular",
        }
    }
}

impl FromStr for TrackFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(TrackFilter::Latest),
            "random" => Ok(TrackFilter::Random),
            "featured" => Ok(TrackFilter::Featured),
            "popular" => Ok(TrackFilter::Popular),
            other => Err(format!("unknown track filter: {other}")),
        }
    }
}

impl fmt::Display for TrackFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Catalog: Send + Sync {
    /// Direct download URLs for one 1-based page of results; an empty page
    /// means the listing is exhausted.
    fn search(&self, query: &str, filter: TrackFilter, page: u32) -> anyhow::Result<Vec<String>>;

    fn track_metadata(&self, url: &str) -> anyhow::Result<TrackMetadata>;
}

/// Catalog over a fixed list of direct URLs.
///
/// `query` matches URLs case-insensitively by substring. `Latest` lists the
/// URLs newest-first (last given first). `Random` shuffles them with a seed
/// fixed per catalog, so successive pages never repeat or skip a URL. A plain
/// list has no editorial picks or play counts; see [`UrlListCatalog::supports`].
#[derive(Debug, Clone)]
pub struct UrlListCatalog {
    urls: Vec<String>,
    page_size: usize,
    seed: u64,
}

impl UrlListCatalog {
    pub fn new(urls: Vec<String>, page_size: usize) -> Self {
        Self::with_seed(urls, page_size, rand::random())
    }

    /// Same as [`UrlListCatalog::new`] with a fixed shuffle seed.
    pub fn with_seed(urls: Vec<String>, page_size: usize, seed: u64) -> Self {
        Self {
            urls,
            page_size: page_size.max(1),
            seed,
        }
    }

    /// Whether the list can be ordered by `filter`. `Featured` and `Popular`
    /// need data only a remote catalog has.
    pub fn supports(filter: TrackFilter) -> bool {
        matches!(filter, TrackFilter::Latest | TrackFilter::Random)
    }
}

impl Catalog for UrlListCatalog {
    fn search(&self, query: &str, filter: TrackFilter, page: u32) -> anyhow::Result<Vec<String>> {
        let needle = query.trim().to_lowercase();
        let mut matches: Vec<&String> = self
            .urls
            .iter()
            .filter(|u| needle.is_empty() || u.to_lowercase().contains(&needle))
            .collect();
        match filter {
            TrackFilter::Latest => matches.reverse(),
            TrackFilter::Random => matches.shuffle(&mut StdRng::seed_from_u64(self.seed)),
            TrackFilter::Featured | TrackFilter::Popular => {
                anyhow::bail!("a URL list cannot be ordered by {filter}")
            }
        }
        let page = page.max(1) as usize;
        Ok(matches
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .cloned()
            .collect())
    }

    fn track_metadata(&self, url: &str) -> anyhow::Result<TrackMetadata> {
        Ok(TrackMetadata::from_url(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> UrlListCatalog {
        UrlListCatalog::with_seed(
            vec![
                "https://h/a/intro.mp3".to_string(),
                "https://h/b/boss.mp3".to_string(),
                "https://h/c/credits.mp3".to_string(),
            ],
            2,
            7,
        )
    }

    #[test]
    fn filter_parse_is_lenient() {
        assert_eq!(TrackFilter::parse_lenient("Popular"), TrackFilter::Popular);
        assert_eq!(TrackFilter::parse_lenient("nonsense"), TrackFilter::Random);
        assert!("nonsense".parse::<TrackFilter>().is_err());
    }

    #[test]
    fn search_pages_until_empty() {
        let c = catalog();
        assert_eq!(c.search("", TrackFilter::Latest, 1).unwrap().len(), 2);
        assert_eq!(
            c.search("", TrackFilter::Latest, 2).unwrap(),
            vec!["https://h/a/intro.mp3".to_string()]
        );
        assert!(c.search("", TrackFilter::Latest, 3).unwrap().is_empty());
        // Page 0 is treated as the first page.
        assert_eq!(
            c.search("", TrackFilter::Latest, 0).unwrap(),
            c.search("", TrackFilter::Latest, 1).unwrap()
        );
    }

    #[test]
    fn search_matches_query_and_latest_reverses() {
        let c = catalog();
        assert_eq!(
            c.search("BOSS", TrackFilter::Latest, 1).unwrap(),
            vec!["https://h/b/boss.mp3".to_string()]
        );
        assert_eq!(
            c.search("", TrackFilter::Latest, 1).unwrap()[0],
            "https://h/c/credits.mp3"
        );
    }

    #[test]
    fn random_order_is_shuffled_and_stable_across_pages() {
        let urls: Vec<String> = (0..20).map(|i| format!("https://h/{i}.mp3")).collect();
        let c = UrlListCatalog::with_seed(urls.clone(), 6, 42);

        let mut listed = Vec::new();
        for page in 1.. {
            let batch = c.search("", TrackFilter::Random, page).unwrap();
            if batch.is_empty() {
                break;
            }
            listed.extend(batch);
        }
        assert_ne!(listed, urls);
        let mut sorted = listed.clone();
        sorted.sort();
        let mut expected = urls.clone();
        expected.sort();
        assert_eq!(sorted, expected);

        // Asking again yields the same order.
        assert_eq!(
            c.search("", TrackFilter::Random, 2).unwrap(),
            listed[6..12].to_vec()
        );
    }

    #[test]
    fn featured_and_popular_are_not_supported() {
        assert!(UrlListCatalog::supports(TrackFilter::Latest));
        assert!(UrlListCatalog::supports(TrackFilter::Random));
        assert!(!UrlListCatalog::supports(TrackFilter::Featured));
        assert!(!UrlListCatalog::supports(TrackFilter::Popular));
        assert!(catalog().search("", TrackFilter::Popular, 1).is_err());
    }

    #[test]
    fn metadata_comes_from_url() {
        let m = catalog().track_metadata("https://h/b/boss.mp3").unwrap();
        assert_eq!(m.title, "boss");
    }
}
