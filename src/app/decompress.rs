//! Gzip decompression of downloaded MRMS products

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::app::client::download::temp_path_for;
use crate::constants::files;
use crate::errors::{DownloadError, DownloadOpResult};

/// Name of the decompressed file: `x.grib2.gz` becomes `x.grib2`
pub fn decompressed_name(file_name: &str) -> &str {
    file_name
        .strip_suffix(files::GZIP_SUFFIX)
        .unwrap_or(file_name)
}

/// Decompress `source` into `target_dir`, replacing any previous output atomically
///
/// Returns the path of the decompressed file.
pub async fn gunzip_into(source: &Path, target_dir: &Path) -> DownloadOpResult<PathBuf> {
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DownloadError::Decompression {
            path: source.to_path_buf(),
            reason: "source has no file name".to_string(),
        })?;
    let target = target_dir.join(decompressed_name(file_name));

    tokio::fs::create_dir_all(target_dir).await?;

    let source_owned = source.to_path_buf();
    let target_owned = target.clone();
    let written = tokio::task::spawn_blocking(move || gunzip_blocking(&source_owned, &target_owned))
        .await
        .map_err(|e| DownloadError::Decompression {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })??;

    tracing::info!(
        "Decompressed {} to {} ({} bytes)",
        source.display(),
        target.display(),
        written
    );
    Ok(target)
}

fn gunzip_blocking(source: &Path, target: &Path) -> DownloadOpResult<u64> {
    let temp_path = temp_path_for(target);
    let result = (|| -> io::Result<u64> {
        let mut decoder = GzDecoder::new(BufReader::new(File::open(source)?));
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        let written = io::copy(&mut decoder, &mut writer)?;
        writer.flush()?;
        Ok(written)
    })();

    match result {
        Ok(written) => {
            std::fs::rename(&temp_path, target).map_err(|_| {
                DownloadError::AtomicOperationFailed {
                    temp_path: temp_path.clone(),
                    final_path: target.to_path_buf(),
                }
            })?;
            Ok(written)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&temp_path);
            Err(DownloadError::Decompression {
                path: source.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::tempdir;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decompressed_name() {
        assert_eq!(
            decompressed_name("MRMS_PrecipFlag.latest.grib2.gz"),
            "MRMS_PrecipFlag.latest.grib2"
        );
        assert_eq!(decompressed_name("rap.t15z.awip32f00.grib2"), "rap.t15z.awip32f00.grib2");
    }

    #[tokio::test]
    async fn test_gunzip_replaces_previous_output() {
        let temp_dir = tempdir().unwrap();
        let zipped = temp_dir.path().join("Zipped");
        let unzipped = temp_dir.path().join("Unzipped");
        std::fs::create_dir_all(&zipped).unwrap();
        std::fs::create_dir_all(&unzipped).unwrap();

        let source = zipped.join("MRMS_PrecipFlag.latest.grib2.gz");
        std::fs::write(&source, gzip(b"GRIB....7777")).unwrap();
        std::fs::write(unzipped.join("MRMS_PrecipFlag.latest.grib2"), b"stale").unwrap();

        let output = gunzip_into(&source, &unzipped).await.unwrap();

        assert_eq!(output, unzipped.join("MRMS_PrecipFlag.latest.grib2"));
        assert_eq!(std::fs::read(&output).unwrap(), b"GRIB....7777");
        assert!(!temp_path_for(&output).exists());
    }

    #[tokio::test]
    async fn test_corrupt_input_keeps_previous_output() {
        let temp_dir = tempdir().unwrap();
        let source = temp_dir.path().join("broken.grib2.gz");
        std::fs::write(&source, b"this is not gzip").unwrap();
        let previous = temp_dir.path().join("broken.grib2");
        std::fs::write(&previous, b"previous").unwrap();

        let result = gunzip_into(&source, temp_dir.path()).await;

        assert!(matches!(result, Err(DownloadError::Decompression { .. })));
        assert_eq!(std::fs::read(&previous).unwrap(), b"previous");
    }
}
