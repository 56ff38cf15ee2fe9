//! Phone one-time-code verification.
//!
//! Stateless with respect to this component: the code lives in the
//! challenge store under a short TTL and the send/verify counters live
//! in the rate guard. Delivery of the code (SMS/voice gateway) is an
//! external collaborator; this component only generates, stores, and
//! checks codes.

use crate::config::PhoneConfig;
use crate::error::{AuthError, Result};
use crate::providers::{ChallengeStore, CodeCheck, RateGuard};
use rand::Rng;

/// Phone verification flow over a challenge store and a rate guard.
#[derive(Clone)]
pub struct PhoneVerifier<C, R>
where
    C: ChallengeStore,
    R: RateGuard,
{
    challenges: C,
    guard: R,
    config: PhoneConfig,
}

impl<C, R> PhoneVerifier<C, R>
where
    C: ChallengeStore,
    R: RateGuard,
{
    /// Create a phone verifier over the given stores.
    pub const fn new(challenges: C, guard: R, config: PhoneConfig) -> Self {
        Self {
            challenges,
            guard,
            config,
        }
    }

    /// Generate and store a verification code for `phone`.
    ///
    /// Any previously stored code for the number is replaced. Bounded
    /// to `send_limit` requests per `send_window` per phone number.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The send limit is exhausted → `AuthError::RateLimited`
    /// - The challenge store request fails
    pub async fn request_code(&self, phone: &str) -> Result<String> {
        self.guard
            .admit(
                &format!("code_send:{phone}"),
                self.config.send_limit,
                self.config.send_window,
            )
            .await?;

        let code = generate_code();
        self.challenges
            .put_code(phone, &code, self.config.code_ttl)
            .await?;

        tracing::info!(phone = %phone, "Stored verification code");

        Ok(code)
    }

    /// Check a presented code against the stored challenge.
    ///
    /// A matching code is consumed in the same store operation that
    /// checks it (single use); a mismatch leaves the challenge in
    /// place until its TTL runs out.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The verification-attempt limit is exhausted → `AuthError::RateLimited`
    /// - No challenge exists or the code differs → `AuthError::InvalidCredential`
    /// - The challenge store request fails
    pub async fn verify_code(&self, phone: &str, code: &str) -> Result<()> {
        self.guard
            .admit(
                &format!("code_verify:{phone}"),
                self.config.verify_limit,
                self.config.verify_window,
            )
            .await?;

        match self.challenges.consume_if_match(phone, code).await? {
            CodeCheck::Matched => {
                tracing::info!(phone = %phone, "Verification code accepted");
                Ok(())
            }
            CodeCheck::Mismatch | CodeCheck::Missing => {
                tracing::debug!(phone = %phone, "Verification code rejected");
                Err(AuthError::InvalidCredential)
            }
        }
    }
}

/// Uniform random 6-digit code, zero-padded.
fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
