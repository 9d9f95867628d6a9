use chrono::{Duration, Utc};
use rand::Rng;

use crate::error::AppError;
use crate::models::order::Otp;

pub const OTP_TTL_MINUTES: i64 = 10;

/// Uniform 4-digit code. Collisions across orders are fine; the code is only
/// ever checked against its own order.
pub fn generate() -> Otp {
    let code = rand::thread_rng().gen_range(1000..=9999).to_string();
    Otp {
        code,
        expires_at: Utc::now() + Duration::minutes(OTP_TTL_MINUTES),
    }
}

/// Valid iff a code exists, it has not expired, and the candidate matches
/// exactly. Verification does not consume the code; the caller drives the
/// follow-up transition.
pub fn verify(otp: Option<&Otp>, candidate: &str) -> bool {
    match otp {
        Some(otp) => Utc::now() <= otp.expires_at && candidate == otp.code,
        None => false,
    }
}

/// A fresh code is only issued when none exists or the old one has expired.
pub fn resend(existing: Option<&Otp>) -> Result<Otp, AppError> {
    if let Some(otp) = existing {
        if Utc::now() <= otp.expires_at {
            return Err(AppError::OtpStillValid);
        }
    }
    Ok(generate())
}
