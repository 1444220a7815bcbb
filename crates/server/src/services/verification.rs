//! Phone verification: the one-time code state machine.
//!
//! A phone number's current record walks `NONE → PENDING(0) →
//! PENDING(n+1)… → VERIFIED | EXPIRED | EXHAUSTED`. Expired and exhausted
//! records are deleted on detection, which returns the phone to `NONE`.
//! Requesting a new code from any state supersedes the prior record with a
//! fresh `PENDING(0)`.

use std::sync::Arc;

use chrono::Utc;
use doorstep_core::{PhoneError, PhoneNumber};
use rand::Rng;
use thiserror::Error;

use crate::db::{RepositoryError, VerificationStore};
use crate::services::sms::SmsSender;

/// Validity window of an issued code, in seconds.
pub const CODE_TTL_SECONDS: i64 = 300;

/// Wrong guesses allowed before a code is exhausted.
const MAX_ATTEMPTS: i32 = 3;

/// Errors produced by the verification flow.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The supplied phone number is not a recognizable mobile number.
    #[error("invalid phone number: {0}")]
    InvalidPhone(#[from] PhoneError),

    /// The code argument was empty.
    #[error("phone number and code are required")]
    MissingCode,

    /// No unverified code exists for this phone.
    #[error("no active code for this phone number; request a new one")]
    NoActiveCode,

    /// The code's validity window has passed.
    #[error("code expired; request a new one")]
    CodeExpired,

    /// The attempt cap was reached before this try.
    #[error("too many failed attempts; request a new code")]
    TooManyAttempts,

    /// The code did not match.
    #[error("wrong code; {attempts_remaining} attempts remaining")]
    WrongCode {
        /// How many more tries this record allows.
        attempts_remaining: i32,
    },

    /// The messaging vendor did not accept the message.
    #[error("could not deliver the verification message")]
    DeliveryFailed,

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Successful outcome of a code request.
#[derive(Debug, Clone, Copy)]
pub struct IssuedCode {
    /// Seconds until the code expires.
    pub expires_in_seconds: i64,
}

/// Issues, delivers, and validates one-time codes.
#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn VerificationStore>,
    sender: Arc<dyn SmsSender>,
}

impl VerificationService {
    /// Create the service over a store and a message sender.
    #[must_use]
    pub fn new(store: Arc<dyn VerificationStore>, sender: Arc<dyn SmsSender>) -> Self {
        Self { store, sender }
    }

    /// Issue a fresh code for a phone number and deliver it.
    ///
    /// Any prior unverified record for the phone is superseded. Delivery
    /// failure is surfaced; the freshly inserted record is left in place
    /// since the next request supersedes it anyway.
    ///
    /// # Errors
    ///
    /// `InvalidPhone` for unusable input, `DeliveryFailed` when the vendor
    /// rejects the message, `Store` on persistence failures.
    pub async fn request_code(&self, raw_phone: &str) -> Result<IssuedCode, VerificationError> {
        let phone = PhoneNumber::parse(raw_phone)?;
        let code = generate_code();

        self.store.delete_unverified(&phone).await?;

        let expires_at = Utc::now() + chrono::Duration::seconds(CODE_TTL_SECONDS);
        self.store.insert(&phone, &code, expires_at).await?;

        tracing::info!(phone = %phone, "Verification code issued");

        if !self.sender.send_code(&phone, &code).await {
            return Err(VerificationError::DeliveryFailed);
        }

        Ok(IssuedCode {
            expires_in_seconds: CODE_TTL_SECONDS,
        })
    }

    /// Validate a submitted code against the phone's active record.
    ///
    /// On success the record is marked verified and becomes the caller's
    /// proof-of-ownership for order submission. Returns the normalized
    /// phone number.
    ///
    /// # Errors
    ///
    /// See [`VerificationError`]; every failure except `WrongCode` below
    /// the cap is terminal for the active code.
    pub async fn verify_code(
        &self,
        raw_phone: &str,
        code: &str,
    ) -> Result<PhoneNumber, VerificationError> {
        if code.trim().is_empty() {
            return Err(VerificationError::MissingCode);
        }
        let phone = PhoneNumber::parse(raw_phone)?;

        let Some(record) = self.store.latest_unverified(&phone).await? else {
            return Err(VerificationError::NoActiveCode);
        };

        if record.is_expired(Utc::now()) {
            self.store.delete(record.id).await?;
            return Err(VerificationError::CodeExpired);
        }

        if record.attempts >= MAX_ATTEMPTS {
            self.store.delete(record.id).await?;
            return Err(VerificationError::TooManyAttempts);
        }

        if record.code != code.trim() {
            let attempts = self.store.increment_attempts(record.id).await?;
            return Err(VerificationError::WrongCode {
                attempts_remaining: (MAX_ATTEMPTS - attempts).max(0),
            });
        }

        self.store.mark_verified(record.id).await?;
        tracing::info!(phone = %phone, "Phone number verified");

        Ok(phone)
    }
}

/// Generate a uniformly random 4-digit numeric code.
#[must_use]
pub fn generate_code() -> String {
    let code: u32 = rand::rng().random_range(1000..10_000);
    code.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::db::MemoryVerificationStore;

    /// Sender stub that records every message and succeeds or fails on
    /// command.
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        succeed: bool,
    }

    impl RecordingSender {
        fn new(succeed: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                succeed,
            }
        }

        fn sent_codes(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, code)| code.clone())
                .collect()
        }
    }

    #[async_trait]
    impl SmsSender for RecordingSender {
        async fn send_code(&self, phone: &PhoneNumber, code: &str) -> bool {
            self.sent
                .lock()
                .unwrap()
                .push((phone.as_str().to_owned(), code.to_owned()));
            self.succeed
        }
    }

    fn service() -> (VerificationService, Arc<MemoryVerificationStore>, Arc<RecordingSender>) {
        let store = Arc::new(MemoryVerificationStore::new());
        let sender = Arc::new(RecordingSender::new(true));
        let service = VerificationService::new(store.clone(), sender.clone());
        (service, store, sender)
    }

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("5551234567").unwrap()
    }

    #[test]
    fn test_generate_code_format() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_request_then_verify_succeeds() {
        let (service, store, sender) = service();

        let issued = service.request_code("5551234567").await.unwrap();
        assert_eq!(issued.expires_in_seconds, 300);

        let codes = sender.sent_codes();
        assert_eq!(codes.len(), 1);

        let verified = service.verify_code("5551234567", &codes[0]).await.unwrap();
        assert_eq!(verified.as_str(), "5551234567");

        let record = store.latest(&phone()).unwrap();
        assert!(record.verified);
    }

    #[tokio::test]
    async fn test_invalid_phone_sends_nothing() {
        let (service, store, sender) = service();

        let result = service.request_code("12345").await;
        assert!(matches!(result, Err(VerificationError::InvalidPhone(_))));
        assert!(sender.sent_codes().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_surfaced() {
        let store = Arc::new(MemoryVerificationStore::new());
        let sender = Arc::new(RecordingSender::new(false));
        let service = VerificationService::new(store.clone(), sender);

        let result = service.request_code("5551234567").await;
        assert!(matches!(result, Err(VerificationError::DeliveryFailed)));
    }

    #[tokio::test]
    async fn test_second_request_supersedes_first() {
        let (service, store, _sender) = service();

        service.request_code("5551234567").await.unwrap();
        service.request_code("5551234567").await.unwrap();

        // Only one unverified record survives the second request.
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_superseded_code_is_rejected() {
        let (service, store, _sender) = service();

        // First issuance, driven through the store for a known code.
        let expires = Utc::now() + chrono::Duration::seconds(CODE_TTL_SECONDS);
        store.insert(&phone(), "1111", expires).await.unwrap();

        // Second issuance supersedes it.
        store.delete_unverified(&phone()).await.unwrap();
        store.insert(&phone(), "2222", expires).await.unwrap();

        let result = service.verify_code("5551234567", "1111").await;
        assert!(matches!(result, Err(VerificationError::WrongCode { .. })));

        let verified = service.verify_code("5551234567", "2222").await;
        assert!(verified.is_ok());
    }

    #[tokio::test]
    async fn test_expired_code_is_deleted_on_read() {
        let (service, store, _sender) = service();

        let expired = Utc::now() - chrono::Duration::milliseconds(1);
        store.insert(&phone(), "1234", expired).await.unwrap();

        let result = service.verify_code("5551234567", "1234").await;
        assert!(matches!(result, Err(VerificationError::CodeExpired)));

        // Record is gone, so the next attempt has no code at all.
        let result = service.verify_code("5551234567", "1234").await;
        assert!(matches!(result, Err(VerificationError::NoActiveCode)));
    }

    #[tokio::test]
    async fn test_attempt_cap_exhausts_the_code() {
        let (service, store, _sender) = service();

        let expires = Utc::now() + chrono::Duration::seconds(CODE_TTL_SECONDS);
        store.insert(&phone(), "1234", expires).await.unwrap();

        for remaining in [2, 1, 0] {
            let result = service.verify_code("5551234567", "0000").await;
            match result {
                Err(VerificationError::WrongCode { attempts_remaining }) => {
                    assert_eq!(attempts_remaining, remaining);
                }
                other => panic!("expected WrongCode, got {other:?}"),
            }
        }

        // Fourth try fails even with the correct code, and deletes the record.
        let result = service.verify_code("5551234567", "1234").await;
        assert!(matches!(result, Err(VerificationError::TooManyAttempts)));

        let result = service.verify_code("5551234567", "1234").await;
        assert!(matches!(result, Err(VerificationError::NoActiveCode)));
    }

    #[tokio::test]
    async fn test_empty_code_is_rejected() {
        let (service, _store, _sender) = service();
        let result = service.verify_code("5551234567", "  ").await;
        assert!(matches!(result, Err(VerificationError::MissingCode)));
    }
}
