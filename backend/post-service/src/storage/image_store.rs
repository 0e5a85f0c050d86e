/// Image store backed by S3-compatible object storage
///
/// Posts reference images by public URL only. Uploads accept either an
/// inline base64 data URI or a remote URL to re-host; both resolve to a
/// stable public URL. Objects are stored without a file extension so that
/// the id derived from a URL's trailing path segment round-trips to the
/// object key on delete.
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use uuid::Uuid;

use crate::config::S3Config;
use crate::error::{AppError, Result};

/// External collaborator converting uploaded image payloads into durable URLs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload an encoded image payload and return its public URL.
    async fn upload(&self, payload: &str) -> Result<String>;

    /// Delete a previously uploaded image by its derived store id.
    async fn destroy(&self, image_id: &str) -> Result<()>;
}

/// Derive the store id of an image from its public URL: the trailing path
/// segment, stripped of any extension.
pub fn derive_image_id(url: &str) -> &str {
    let tail = url.rsplit('/').next().unwrap_or(url);
    tail.split('.').next().unwrap_or(tail)
}

pub struct S3ImageStore {
    client: Client,
    config: S3Config,
}

impl S3ImageStore {
    pub fn new(client: Client, config: S3Config) -> Self {
        Self { client, config }
    }

    /// Initialize the AWS S3 client from config.
    ///
    /// Uses explicit credentials when provided, otherwise the default
    /// credential chain. A custom endpoint supports S3-compatible storage
    /// like MinIO.
    pub async fn connect(config: S3Config) -> Result<Self> {
        use aws_sdk_s3::config::Region;

        let mut aws_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            use aws_sdk_s3::config::Credentials;

            let credentials = Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "post_service_s3",
            );

            aws_config_builder = aws_config_builder.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            aws_config_builder = aws_config_builder.endpoint_url(endpoint);
        }

        let aws_config = aws_config_builder.load().await;
        let client = Client::new(&aws_config);

        Ok(Self::new(client, config))
    }

    /// Verify bucket connectivity and credentials.
    pub async fn health_check(&self) -> Result<()> {
        self.client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| {
                AppError::StorageError(format!(
                    "image store health check failed (bucket {}): {}",
                    self.config.bucket, e
                ))
            })?;

        Ok(())
    }

    fn object_key(&self, image_id: &str) -> String {
        format!("{}/{}", self.config.key_prefix, image_id)
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key
        )
    }

    /// Resolve the payload into raw bytes plus content type.
    async fn resolve_payload(&self, payload: &str) -> Result<(Vec<u8>, String)> {
        if payload.starts_with("http://") || payload.starts_with("https://") {
            let response = reqwest::get(payload)
                .await
                .map_err(|e| AppError::StorageError(format!("image fetch failed: {}", e)))?;

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("image/jpeg")
                .to_string();

            let bytes = response
                .bytes()
                .await
                .map_err(|e| AppError::StorageError(format!("image fetch failed: {}", e)))?;

            return Ok((bytes.to_vec(), content_type));
        }

        decode_data_uri(payload)
    }
}

/// Decode a `data:image/...;base64,...` payload.
///
/// Bare base64 without a data-URI header is accepted and treated as JPEG,
/// matching what legacy clients send.
fn decode_data_uri(payload: &str) -> Result<(Vec<u8>, String)> {
    let (content_type, data) = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest.split_once(',').ok_or_else(|| {
                AppError::BadRequest("Invalid image payload: malformed data URI".to_string())
            })?;
            let content_type = header
                .split(';')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or("image/jpeg");
            (content_type.to_string(), data)
        }
        None => ("image/jpeg".to_string(), payload),
    };

    let parsed: mime::Mime = content_type
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid image payload: bad content type".to_string()))?;
    if parsed.type_() != mime::IMAGE {
        return Err(AppError::BadRequest(format!(
            "Invalid image payload: unsupported content type {}",
            content_type
        )));
    }

    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid image payload: {}", e)))?;

    Ok((bytes, content_type))
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload(&self, payload: &str) -> Result<String> {
        let (bytes, content_type) = self.resolve_payload(payload).await?;

        let key = self.object_key(&Uuid::new_v4().to_string());

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(&content_type)
            // Images are immutable once uploaded; cache aggressively
            .cache_control("max-age=31536000")
            .send()
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("403") || msg.contains("Forbidden") {
                    AppError::StorageError(
                        "image upload auth failed (403): check credentials".to_string(),
                    )
                } else if msg.contains("NoSuchBucket") {
                    AppError::StorageError(format!("bucket not found: {}", self.config.bucket))
                } else {
                    AppError::StorageError(format!("image upload failed: {}", msg))
                }
            })?;

        Ok(self.public_url(&key))
    }

    async fn destroy(&self, image_id: &str) -> Result<()> {
        if image_id.is_empty() || image_id.contains('/') {
            return Err(AppError::StorageError(format!(
                "invalid image id: {:?}",
                image_id
            )));
        }

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(self.object_key(image_id))
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("image delete failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_id_from_trailing_segment() {
        assert_eq!(
            derive_image_id("https://res.example.com/v1/upload/abc123.png"),
            "abc123"
        );
        assert_eq!(
            derive_image_id("https://bucket.s3.us-east-1.amazonaws.com/posts/5f3e"),
            "5f3e"
        );
        // Only the first dot delimits the extension
        assert_eq!(derive_image_id("https://x/y/photo.final.jpg"), "photo");
        assert_eq!(derive_image_id("bare-id"), "bare-id");
    }

    #[test]
    fn decodes_base64_data_uri() {
        let payload = format!("data:image/png;base64,{}", BASE64.encode(b"png-bytes"));
        let (bytes, content_type) = decode_data_uri(&payload).unwrap();
        assert_eq!(bytes, b"png-bytes");
        assert_eq!(content_type, "image/png");
    }

    #[test]
    fn bare_base64_defaults_to_jpeg() {
        let payload = BASE64.encode(b"jpeg-bytes");
        let (bytes, content_type) = decode_data_uri(&payload).unwrap();
        assert_eq!(bytes, b"jpeg-bytes");
        assert_eq!(content_type, "image/jpeg");
    }

    #[test]
    fn rejects_non_image_data_uri() {
        let payload = format!("data:text/html;base64,{}", BASE64.encode(b"<html>"));
        assert!(matches!(
            decode_data_uri(&payload),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn rejects_malformed_data_uri() {
        assert!(matches!(
            decode_data_uri("data:image/png;base64"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,!!!not-base64!!!"),
            Err(AppError::BadRequest(_))
        ));
    }
}
