use crate::infras::storage::StoredObject;
use bytes::Bytes;
use rocket::{
    data::ToByteUnit,
    form::{self, DataField, FromFormField},
    http::ContentType,
};
use thiserror::Error;

/// Largest image accepted anywhere on the site
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    pub fn from_content_type(ct: &ContentType) -> Option<Self> {
        if !ct.top().as_str().eq_ignore_ascii_case("image") {
            return None;
        }
        match ct.sub().as_str().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "pjpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// Why an upload was turned away before reaching storage
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("Choose an image to upload")]
    Empty,
    #[error("Please upload a JPEG, PNG or WebP image")]
    UnsupportedType,
    #[error("Image must be 5MB or smaller")]
    TooLarge,
}

/// A file field of a multipart form, accepted as-is and validated later so the
/// rejection can be shown in place.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Bytes,
    pub content_type: ContentType,
    pub file_stem: Option<String>,
    // The body did not fit into the form limit
    pub truncated: bool,
}

impl Upload {
    pub fn validate(self) -> Result<ValidatedImage, UploadRejection> {
        if self.bytes.is_empty() && !self.truncated {
            return Err(UploadRejection::Empty);
        }
        let kind =
            ImageKind::from_content_type(&self.content_type).ok_or(UploadRejection::UnsupportedType)?;
        if self.truncated || self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(UploadRejection::TooLarge);
        }
        Ok(ValidatedImage {
            suggested_alt: self
                .file_stem
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "image".to_string()),
            object: StoredObject {
                bytes: self.bytes,
                kind,
            },
        })
    }
}

/// An image that passed validation and may be uploaded
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    /// The file name without its extension
    pub suggested_alt: String,
    pub object: StoredObject,
}

#[rocket::async_trait]
impl<'r> FromFormField<'r> for Upload {
    async fn from_data(field: DataField<'r, '_>) -> form::Result<'r, Self> {
        // Read a little past the maximum so oversized files are recognized as such
        let limit = field
            .request
            .limits()
            .get("file")
            .unwrap_or_else(|| 6.mebibytes())
            .max((MAX_IMAGE_BYTES + 1).bytes());

        let file_stem = field.file_name.and_then(|f| f.as_str()).map(String::from);
        let bytes = field.data.open(limit).into_bytes().await?;
        let truncated = !bytes.is_complete();
        Ok(Self {
            bytes: bytes.into_inner().into(),
            content_type: field.content_type,
            file_stem,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(ct: ContentType, len: usize, name: Option<&str>) -> Upload {
        Upload {
            bytes: Bytes::from(vec![0u8; len]),
            content_type: ct,
            file_stem: name.map(String::from),
            truncated: false,
        }
    }

    #[test]
    fn accept_png() {
        let image = upload(ContentType::PNG, 2 * 1024 * 1024, Some("photo"))
            .validate()
            .unwrap();
        assert_eq!(image.suggested_alt, "photo");
        assert_eq!(image.object.kind, ImageKind::Png);
    }

    #[test]
    fn reject_uploads() {
        assert_eq!(
            upload(ContentType::PNG, MAX_IMAGE_BYTES + 1, Some("big"))
                .validate()
                .unwrap_err(),
            UploadRejection::TooLarge
        );
        assert_eq!(
            upload(ContentType::GIF, 10, Some("anim")).validate().unwrap_err(),
            UploadRejection::UnsupportedType
        );
        assert_eq!(
            upload(ContentType::PDF, 10, None).validate().unwrap_err(),
            UploadRejection::UnsupportedType
        );
        assert_eq!(
            upload(ContentType::JPEG, 0, None).validate().unwrap_err(),
            UploadRejection::Empty
        );
        // Exactly at the limit is fine
        assert!(upload(ContentType::new("image", "webp"), MAX_IMAGE_BYTES, None)
            .validate()
            .is_ok());
    }

    #[test]
    fn default_alt() {
        let image = upload(ContentType::JPEG, 10, None).validate().unwrap();
        assert_eq!(image.suggested_alt, "image");
        assert_eq!(image.object.kind.extension(), "jpg");
    }
}
