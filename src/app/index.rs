//! NOMADS directory listing retrieval and parsing
//!
//! NOMADS publishes each day's RAP runs as a plain HTML index. The fetcher
//! scrapes its anchors, keeps the hrefs of first forecast hour AWIPS 32 km
//! files and reads the run hour out of the `rap.tHHz.` token.

use scraper::{Html, Selector};
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::app::models::{DirectoryListing, ForecastHourCandidate, ListingEntry};
use crate::app::progress::ProgressReporter;
use crate::constants::listing;

/// Scrape every `<a href>` of an HTML page, in document order
pub fn parse_listing(html: &str) -> DirectoryListing {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(listing::ANCHOR_SELECTOR) else {
        return DirectoryListing::default();
    };

    let entries = document
        .select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            Some(ListingEntry {
                link_text: anchor.text().collect::<String>().trim().to_string(),
                href: href.to_string(),
            })
        })
        .collect();

    DirectoryListing { entries }
}

/// Run hour encoded in an href such as `rap.t15z.awip32f01.grib2`
///
/// The hour sits at a fixed offset (characters 1..3) of the second
/// dot-delimited segment. Anything that is not two ASCII digits in 0..=23
/// yields `None`.
pub fn extract_hour(href: &str) -> Option<u32> {
    let file_name = href.rsplit('/').next().unwrap_or(href);
    let segment = file_name.split('.').nth(1)?;
    let token = segment.get(1..3)?;
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok().filter(|hour| *hour <= 23)
}

/// Forecast hour candidates of a listing, in listing order
pub fn extract_candidates(listing: &DirectoryListing) -> Vec<ForecastHourCandidate> {
    let mut matched = 0usize;
    let candidates: Vec<ForecastHourCandidate> = listing
        .entries
        .iter()
        .filter(|entry| entry.href.contains(listing::PRODUCT_SUFFIX_MARKER))
        .filter(|entry| !entry.href.ends_with(listing::INDEX_SIDECAR_SUFFIX))
        .filter_map(|entry| {
            matched += 1;
            match extract_hour(&entry.href) {
                Some(hour) => Some(ForecastHourCandidate {
                    hour,
                    href: entry.href.clone(),
                }),
                None => {
                    tracing::debug!("Skipping href without a run hour: {}", entry.href);
                    None
                }
            }
        })
        .collect();

    if matched > 0 && candidates.is_empty() {
        tracing::warn!(
            "{} hrefs matched {} but none carried a run hour; the file naming may have changed",
            matched,
            listing::PRODUCT_SUFFIX_MARKER
        );
    }

    candidates
}

/// First href published for `hour`, if any
pub fn find_href_for_hour(candidates: &[ForecastHourCandidate], hour: u32) -> Option<&str> {
    candidates
        .iter()
        .find(|c| c.hour == hour)
        .map(|c| c.href.as_str())
}

/// Fetches index pages and turns them into forecast hour candidates
pub struct DirectoryIndexFetcher<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DirectoryIndexFetcher<'a> {
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Fetch and parse the index at `url`
    ///
    /// A failed request is reported and yields an empty listing; callers treat
    /// empty as "nothing published".
    pub async fn fetch_listing(
        &self,
        url: &Url,
        percent: u8,
        reporter: &dyn ProgressReporter,
    ) -> DirectoryListing {
        match self.http_handler.get_page(url).await {
            Ok(html) => {
                let listing = parse_listing(&html);
                tracing::info!("Index {} lists {} links", url, listing.len());
                listing
            }
            Err(e) => {
                tracing::error!("Failed to access {}: {}", url, e);
                reporter.checkpoint(percent, &format!("Failed to access {}", url));
                DirectoryListing::default()
            }
        }
    }

    /// Fetch the index at `url` and extract its forecast hour candidates
    pub async fn fetch_candidates(
        &self,
        url: &Url,
        percent: u8,
        reporter: &dyn ProgressReporter,
    ) -> Vec<ForecastHourCandidate> {
        let listing = self.fetch_listing(url, percent, reporter).await;
        extract_candidates(&listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_PAGE: &str = r#"<html>
<head><title>Index of /pub/data/nccf/com/rap/prod/rap.20241203</title></head>
<body>
<h1>Index of /pub/data/nccf/com/rap/prod/rap.20241203</h1>
<pre><a href="../">Parent Directory</a>
<a href="rap.t03z.awip32f00.grib2">rap.t03z.awip32f00.grib2</a>  03-Dec-2024 03:51  13M
<a href="rap.t03z.awip32f01.grib2">rap.t03z.awip32f01.grib2</a>  03-Dec-2024 03:52  13M
<a href="rap.t03z.awip32f01.grib2.idx">rap.t03z.awip32f01.grib2.idx</a>  03-Dec-2024 03:52  25K
<a href="rap.t09z.awip32f01.grib2">rap.t09z.awip32f01.grib2</a>  03-Dec-2024 09:52  13M
<a href="rap.t15z.awip32f01.grib2">rap.t15z.awip32f01.grib2</a>  03-Dec-2024 15:52  13M
<a href="rap.t21z.awip32f01.grib2">rap.t21z.awip32f01.grib2</a>  03-Dec-2024 21:52  13M
<a href="rap.t21z.wrfprsf01.grib2">rap.t21z.wrfprsf01.grib2</a>  03-Dec-2024 21:52  80M
</pre></body></html>"#;

    #[test]
    fn test_parse_listing_keeps_document_order() {
        let listing = parse_listing(INDEX_PAGE);
        assert_eq!(listing.len(), 8);
        assert_eq!(listing.entries[0].href, "../");
        assert_eq!(listing.entries[0].link_text, "Parent Directory");
        assert_eq!(listing.entries[7].href, "rap.t21z.wrfprsf01.grib2");
    }

    #[test]
    fn test_extract_candidates() {
        let candidates = extract_candidates(&parse_listing(INDEX_PAGE));
        let hours: Vec<u32> = candidates.iter().map(|c| c.hour).collect();
        assert_eq!(hours, vec![3, 9, 15, 21]);
        assert!(candidates.iter().all(|c| c.href.ends_with(".grib2")));
    }

    #[test]
    fn test_extract_hour_fixed_offset() {
        assert_eq!(extract_hour("rap.t15z.awip32f01.grib2"), Some(15));
        assert_eq!(extract_hour("sub/dir/rap.t00z.awip32f01.grib2"), Some(0));
        assert_eq!(extract_hour("rap.tXYz.awip32f01.grib2"), None);
        assert_eq!(extract_hour("rap.t9z.awip32f01.grib2"), None);
        assert_eq!(extract_hour("rap.t25z.awip32f01.grib2"), None);
        assert_eq!(extract_hour("rapawip32f01"), None);
        assert_eq!(extract_hour("rap.t"), None);
    }

    #[test]
    fn test_no_matching_links_is_empty() {
        let html = r#"<html><body><a href="../">Parent</a><a href="rap.t03z.wrfprsf00.grib2">x</a></body></html>"#;
        assert!(extract_candidates(&parse_listing(html)).is_empty());
        assert!(extract_candidates(&parse_listing("")).is_empty());
    }

    #[test]
    fn test_find_href_for_hour_returns_first() {
        let candidates = vec![
            ForecastHourCandidate {
                hour: 15,
                href: "rap.t15z.awip32f01.grib2".to_string(),
            },
            ForecastHourCandidate {
                hour: 15,
                href: "old/rap.t15z.awip32f01.grib2".to_string(),
            },
        ];
        assert_eq!(
            find_href_for_hour(&candidates, 15),
            Some("rap.t15z.awip32f01.grib2")
        );
        assert_eq!(find_href_for_hour(&candidates, 3), None);
    }
}
