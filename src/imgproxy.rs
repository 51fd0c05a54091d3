//! Signed imgproxy URLs for objects in the media bucket.

use crate::error::ConfigError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct ImgProxy {
    base_url: String,
    mac: HmacSha256,
    salt: Vec<u8>,
    bucket: String,
}

impl ImgProxy {
    /// `key` and `salt` are hex encoded, as imgproxy expects them in `IMGPROXY_KEY` / `IMGPROXY_SALT`.
    pub fn new(base_url: &str, key_hex: &str, salt_hex: &str, bucket: &str) -> Result<Self, ConfigError> {
        let key = hex::decode(key_hex).map_err(|e| ConfigError::Invalid {
            var: "IMGPROXY_KEY",
            reason: e.to_string(),
        })?;
        let salt = hex::decode(salt_hex).map_err(|e| ConfigError::Invalid {
            var: "IMGPROXY_SALT",
            reason: e.to_string(),
        })?;
        let mac = HmacSha256::new_from_slice(&key).map_err(|e| ConfigError::Invalid {
            var: "IMGPROXY_KEY",
            reason: e.to_string(),
        })?;
        Ok(ImgProxy {
            base_url: base_url.trim_end_matches('/').to_string(),
            mac,
            salt,
            bucket: bucket.to_string(),
        })
    }

    /// Smart-cropped JPEG of `width`×`height`.
    pub fn thumbnail_url(&self, object_key: &str, width: u32, height: u32) -> String {
        let source = self.encoded_source(object_key);
        let path = format!("/rs:fill:{}:{}:1/g:sm/{}.jpeg", width, height, source);
        self.signed(&path)
    }

    pub fn original_url(&self, object_key: &str) -> String {
        let path = format!("/{}", self.encoded_source(object_key));
        self.signed(&path)
    }

    fn encoded_source(&self, object_key: &str) -> String {
        URL_SAFE_NO_PAD.encode(format!("s3://{}/{}", self.bucket, object_key))
    }

    fn signed(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, self.signature(path), path)
    }

    fn signature(&self, path: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(&self.salt);
        mac.update(path.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}
