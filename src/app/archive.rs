//! Archived MRMS object lookup on the NOAA open data bucket
//!
//! Archived MRMS keys carry the second at which the product was generated
//! (`..._20241203-150038.grib2.gz`), which a caller cannot know. The resolver
//! lists the bucket with a prefix ending at the requested hour and uses the
//! first key returned; S3 lists keys in lexical order, so that is the earliest
//! product of the hour.

use serde::Deserialize;
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::app::models::Product;
use crate::app::timestamp::Timestamp;
use crate::errors::{NetworkError, ResolutionError, ResolutionResult, Result};

/// `ListObjectsV2` response, reduced to what the lookup reads
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ListBucketResult {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub contents: Vec<BucketObject>,
}

/// One `<Contents>` element
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketObject {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Listing prefix selecting every object of `product` in the timestamp's hour
///
/// Returns `None` for products that are not archived in the MRMS bucket.
pub fn listing_prefix(region: &str, product: Product, timestamp: &Timestamp) -> Option<String> {
    let name = product.mrms_name()?;
    let resolution = product.resolution_token()?;
    let date = timestamp.date_part();
    Some(format!(
        "{region}/{name}_{resolution}/{date}/MRMS_{name}_{resolution}_{date}-{hour}",
        hour = timestamp.hour_part()
    ))
}

/// First object key of a bucket listing body, trimmed
pub fn first_key(body: &str) -> ResolutionResult<Option<String>> {
    let listing: ListBucketResult =
        serde_xml_rs::from_str(body).map_err(|e| ResolutionError::MalformedListing {
            reason: e.to_string(),
        })?;

    Ok(listing
        .contents
        .into_iter()
        .map(|object| object.key.trim().to_string())
        .find(|key| !key.is_empty()))
}

/// Resolves archived object keys through bucket listing queries
pub struct ArchiveKeyResolver<'a> {
    http_handler: &'a HttpHandler,
    bucket_url: &'a str,
    region: &'a str,
}

impl<'a> ArchiveKeyResolver<'a> {
    pub fn new(http_handler: &'a HttpHandler, bucket_url: &'a str, region: &'a str) -> Self {
        Self {
            http_handler,
            bucket_url,
            region,
        }
    }

    /// `ListObjectsV2` query URL for a prefix
    pub fn listing_url(&self, prefix: &str) -> std::result::Result<Url, NetworkError> {
        let base = format!("{}/", self.bucket_url.trim_end_matches('/'));
        Url::parse_with_params(&base, &[("list-type", "2"), ("prefix", prefix)]).map_err(|e| {
            NetworkError::InvalidUrl {
                url: base.clone(),
                error: e.to_string(),
            }
        })
    }

    /// Key of the first archived object of `product` in the timestamp's hour
    ///
    /// # Errors
    ///
    /// `NetworkError` when the listing request fails,
    /// `ResolutionError::ArchiveKeyNotFound` when nothing matches the prefix.
    pub async fn resolve_key(&self, product: Product, timestamp: &Timestamp) -> Result<String> {
        let prefix = listing_prefix(self.region, product, timestamp).ok_or_else(|| {
            ResolutionError::ArchiveKeyNotFound {
                product: product.to_string(),
                prefix: String::new(),
            }
        })?;
        let url = self.listing_url(&prefix)?;
        tracing::info!("Listing {} objects with prefix {}", product, prefix);

        let body = self.http_handler.get_page(&url).await?;

        match first_key(&body)? {
            Some(key) => {
                tracing::info!("Resolved archive key {}", key);
                Ok(key)
            }
            None => {
                tracing::warn!("No archived {} object matches {}", product, prefix);
                Err(ResolutionError::ArchiveKeyNotFound {
                    product: product.to_string(),
                    prefix,
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::config::ClientConfig;

    const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>noaa-mrms-pds</Name>
  <Prefix>CONUS/ReflectivityAtLowestAltitude_00.50/20241203/MRMS_ReflectivityAtLowestAltitude_00.50_20241203-15</Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key> CONUS/ReflectivityAtLowestAltitude_00.50/20241203/MRMS_ReflectivityAtLowestAltitude_00.50_20241203-150038.grib2.gz </Key>
    <LastModified>2024-12-03T15:01:02.000Z</LastModified>
    <ETag>"0d1f"</ETag>
    <Size>512034</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
  <Contents>
    <Key>CONUS/ReflectivityAtLowestAltitude_00.50/20241203/MRMS_ReflectivityAtLowestAltitude_00.50_20241203-150238.grib2.gz</Key>
    <LastModified>2024-12-03T15:03:02.000Z</LastModified>
    <ETag>"9a2c"</ETag>
    <Size>511877</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
</ListBucketResult>"#;

    const EMPTY_LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>noaa-mrms-pds</Name>
  <Prefix>CONUS/PrecipFlag_00.00/20241203/MRMS_PrecipFlag_00.00_20241203-15</Prefix>
  <KeyCount>0</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>false</IsTruncated>
</ListBucketResult>"#;

    #[test]
    fn test_listing_prefix_uses_date_and_hour() {
        let ts = Timestamp::parse("20241203-1500").unwrap();
        assert_eq!(
            listing_prefix("CONUS", Product::Reflectivity, &ts).unwrap(),
            "CONUS/ReflectivityAtLowestAltitude_00.50/20241203/MRMS_ReflectivityAtLowestAltitude_00.50_20241203-15"
        );
        assert_eq!(
            listing_prefix("CONUS", Product::PrecipFlag, &ts).unwrap(),
            "CONUS/PrecipFlag_00.00/20241203/MRMS_PrecipFlag_00.00_20241203-15"
        );
        assert!(listing_prefix("CONUS", Product::CloudCover, &ts).is_none());
    }

    #[test]
    fn test_first_key_is_trimmed_and_first() {
        let key = first_key(LISTING).unwrap().unwrap();
        assert_eq!(
            key,
            "CONUS/ReflectivityAtLowestAltitude_00.50/20241203/MRMS_ReflectivityAtLowestAltitude_00.50_20241203-150038.grib2.gz"
        );
    }

    #[test]
    fn test_empty_listing_has_no_key() {
        assert_eq!(first_key(EMPTY_LISTING).unwrap(), None);
    }

    #[test]
    fn test_truncated_body_is_malformed() {
        assert!(matches!(
            first_key("<ListBucketResult><Contents><Key>CONUS/PrecipFlag_00.00/2024"),
            Err(ResolutionError::MalformedListing { .. })
        ));
    }

    #[test]
    fn test_listing_url() {
        let http_handler = HttpHandler::new(ClientConfig::default()).unwrap();
        let resolver =
            ArchiveKeyResolver::new(&http_handler, "https://noaa-mrms-pds.s3.amazonaws.com/", "CONUS");

        let url = resolver
            .listing_url("CONUS/PrecipFlag_00.00/20241203/MRMS_PrecipFlag_00.00_20241203-15")
            .unwrap();
        assert_eq!(url.host_str(), Some("noaa-mrms-pds.s3.amazonaws.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("list-type".to_string(), "2".to_string()));
        assert_eq!(
            pairs[1].1,
            "CONUS/PrecipFlag_00.00/20241203/MRMS_PrecipFlag_00.00_20241203-15"
        );
    }
}
