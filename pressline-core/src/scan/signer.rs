use std::fmt;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use pressline_model::ItemId;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies the tamper-proof tokens embedded in scan URLs.
///
/// A token binds an item id to its issuance time with an HMAC-SHA-256
/// signature over `"{item_id}.{timestamp_ms}"` under a server-held secret,
/// so a printed barcode cannot be forged or redirected to another item.
/// Verification fails closed: malformed hex, a mismatched id, or a stale
/// timestamp all reject.
pub struct ScanUrlSigner {
    secret: Zeroizing<Vec<u8>>,
    max_token_age: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("scan secret must not be empty")]
    EmptySecret,
}

/// Why a presented token was rejected. Expiry is reported separately from
/// forgery so operators can tell a stale printed label from an attack in
/// the logs; both map to the same HTTP status.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("signature check failed")]
    BadSignature,
    #[error("scan token expired")]
    Expired,
}

/// A freshly issued token, ready to be embedded as query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedScanToken {
    pub item_id: ItemId,
    pub timestamp_ms: i64,
    pub signature: String,
}

impl ScanUrlSigner {
    /// `max_token_age: None` disables the freshness window; used during
    /// migration while long-lived printed codes are still in circulation.
    pub fn new(
        secret: impl AsRef<[u8]>,
        max_token_age: Option<Duration>,
    ) -> Result<Self, SignerError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(SignerError::EmptySecret);
        }
        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
            max_token_age,
        })
    }

    /// Mint a token for `item_id` at the current time.
    pub fn issue(&self, item_id: &ItemId) -> SignedScanToken {
        let timestamp_ms = Utc::now().timestamp_millis();
        let signature = self.signature(item_id, &timestamp_ms.to_string());
        SignedScanToken {
            item_id: item_id.clone(),
            timestamp_ms,
            signature,
        }
    }

    /// Hex HMAC over the canonical `"{item_id}.{timestamp}"` payload.
    pub fn signature(&self, item_id: &ItemId, timestamp: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC-SHA-256 accepts keys of any size");
        mac.update(item_id.as_str().as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a presented token against the exact item id and timestamp it
    /// claims to carry.
    pub fn verify(
        &self,
        item_id: &ItemId,
        timestamp: &str,
        signature_hex: &str,
    ) -> Result<(), VerifyError> {
        let provided = hex::decode(signature_hex).map_err(|_| VerifyError::BadSignature)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC-SHA-256 accepts keys of any size");
        mac.update(item_id.as_str().as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| VerifyError::BadSignature)?;

        if let Some(max_age) = self.max_token_age {
            // Authentic signature implies the timestamp string is one we
            // produced, but parse defensively anyway.
            let issued_ms: i64 = timestamp.parse().map_err(|_| VerifyError::BadSignature)?;
            let age_ms = Utc::now().timestamp_millis().saturating_sub(issued_ms);
            if age_ms > max_age.as_millis() as i64 {
                return Err(VerifyError::Expired);
            }
        }

        Ok(())
    }
}

impl fmt::Debug for ScanUrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanUrlSigner")
            .field("max_token_age", &self.max_token_age)
            .finish_non_exhaustive()
    }
}
