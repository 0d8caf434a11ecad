//! Receipt files kept on disk, one folder per user.

use std::path::{Component, Path, PathBuf};

use rand::{Rng, distr::Alphanumeric};
use time::OffsetDateTime;

use crate::{Error, auth::UserID};

/// The file types accepted as receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptFileType {
    Jpeg,
    Png,
    Webp,
    Pdf,
}

impl ReceiptFileType {
    /// Work out the file type from the upload's content type, falling back to
    /// the file name's extension.
    ///
    /// # Errors
    ///
    /// Returns [Error::UnsupportedFileType] for anything other than JPEG, PNG, WebP or PDF.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Result<Self, Error> {
        let from_content_type = content_type.and_then(|content_type| {
            match content_type.trim().to_ascii_lowercase().as_str() {
                "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
                "image/png" => Some(Self::Png),
                "image/webp" => Some(Self::Webp),
                "application/pdf" => Some(Self::Pdf),
                _ => None,
            }
        });

        if let Some(file_type) = from_content_type {
            return Ok(file_type);
        }

        let extension = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|extension| extension.to_str())
            .map(|extension| extension.to_ascii_lowercase())
            .unwrap_or_default();

        Self::from_extension(&extension).ok_or_else(|| {
            Error::UnsupportedFileType(
                content_type
                    .map(str::to_owned)
                    .unwrap_or_else(|| extension.clone()),
            )
        })
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }
}

/// Whether `receipt_path` points inside the folder of `user_id`.
///
/// Receipt paths are relative to the bills directory, e.g. "3/1718000000-a1B2c3D4.png".
pub fn is_receipt_path_owned_by(receipt_path: &str, user_id: UserID) -> bool {
    let path = Path::new(receipt_path);
    let mut components = path.components();

    let owner_matches = matches!(
        components.next(),
        Some(Component::Normal(first)) if first.to_str() == Some(user_id.to_string().as_str())
    );

    owner_matches
        && components.clone().count() > 0
        && components.all(|component| matches!(component, Component::Normal(_)))
}

/// Build the relative path for a new receipt, `{user_id}/{timestamp}-{random}.{ext}`.
pub fn new_receipt_path(user_id: UserID, file_type: ReceiptFileType, now: OffsetDateTime) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();

    format!(
        "{user_id}/{}-{suffix}.{}",
        now.unix_timestamp(),
        file_type.extension()
    )
}

/// Write an uploaded receipt under `bills_dir`, returning its relative path.
pub async fn store_receipt(
    bills_dir: &Path,
    user_id: UserID,
    file_type: ReceiptFileType,
    bytes: &[u8],
    now: OffsetDateTime,
) -> Result<String, Error> {
    let receipt_path = new_receipt_path(user_id, file_type, now);
    let full_path = bills_dir.join(&receipt_path);

    if let Some(parent) = full_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|error| Error::FileStorageError(error.to_string()))?;
    }

    tokio::fs::write(&full_path, bytes)
        .await
        .map_err(|error| Error::FileStorageError(error.to_string()))?;

    tracing::info!("Stored receipt {receipt_path} ({} bytes)", bytes.len());

    Ok(receipt_path)
}

/// Remove a stored receipt, e.g. after a failed scan.
pub async fn remove_receipt(bills_dir: &Path, receipt_path: &str) {
    if let Err(error) = tokio::fs::remove_file(bills_dir.join(receipt_path)).await {
        tracing::warn!("Could not remove receipt {receipt_path}: {error}");
    }
}

/// Read a stored receipt and its file type.
///
/// # Errors
///
/// Returns [Error::NotFound] if the file does not exist.
pub async fn read_receipt(
    bills_dir: &Path,
    receipt_path: &str,
) -> Result<(ReceiptFileType, Vec<u8>), Error> {
    let full_path: PathBuf = bills_dir.join(receipt_path);
    let file_type = full_path
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(ReceiptFileType::from_extension)
        .ok_or(Error::NotFound)?;

    match tokio::fs::read(&full_path).await {
        Ok(bytes) => Ok((file_type, bytes)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound),
        Err(error) => Err(Error::FileStorageError(error.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use crate::{Error, auth::UserID};

    use super::{
        ReceiptFileType, is_receipt_path_owned_by, new_receipt_path, read_receipt, store_receipt,
    };

    #[test]
    fn detects_file_types() {
        assert_eq!(
            ReceiptFileType::detect(Some("image/png"), None),
            Ok(ReceiptFileType::Png)
        );
        assert_eq!(
            ReceiptFileType::detect(Some("application/octet-stream"), Some("bill.JPEG")),
            Ok(ReceiptFileType::Jpeg)
        );
        assert_eq!(
            ReceiptFileType::detect(Some("image/gif"), Some("bill.gif")),
            Err(Error::UnsupportedFileType("image/gif".to_owned()))
        );
    }

    #[test]
    fn receipt_paths_belong_to_their_user() {
        let user_id = UserID::new(3);

        assert!(is_receipt_path_owned_by("3/1-abc.png", user_id));
        assert!(!is_receipt_path_owned_by("4/1-abc.png", user_id));
        assert!(!is_receipt_path_owned_by("3/../4/1-abc.png", user_id));
        assert!(!is_receipt_path_owned_by("/3/1-abc.png", user_id));
        assert!(!is_receipt_path_owned_by("3", user_id));
        assert!(!is_receipt_path_owned_by("33/1-abc.png", user_id));
    }

    #[test]
    fn new_paths_are_unique_and_owned() {
        let user_id = UserID::new(7);
        let now = OffsetDateTime::now_utc();

        let first = new_receipt_path(user_id, ReceiptFileType::Pdf, now);
        let second = new_receipt_path(user_id, ReceiptFileType::Pdf, now);

        assert_ne!(first, second);
        assert!(first.ends_with(".pdf"));
        assert!(is_receipt_path_owned_by(&first, user_id));
    }

    #[tokio::test]
    async fn store_then_read() {
        let bills_dir = std::env::temp_dir().join(format!(
            "spendbook-receipts-{}",
            OffsetDateTime::now_utc().unix_timestamp_nanos()
        ));
        let user_id = UserID::new(1);

        let path = store_receipt(
            &bills_dir,
            user_id,
            ReceiptFileType::Png,
            b"not really a png",
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap();
        let got = read_receipt(&bills_dir, &path).await;

        assert_eq!(got, Ok((ReceiptFileType::Png, b"not really a png".to_vec())));
        assert_eq!(
            read_receipt(&bills_dir, "1/missing.png").await,
            Err(Error::NotFound)
        );
        std::fs::remove_dir_all(&bills_dir).unwrap();
    }
}
