//! QR check-in tokens.
//!
//! Format: `{meetup_id}.{issued_unix}.{hex(hmac_sha256(secret, "{meetup_id}:{issued_unix}"))}`.
//! Organizers fetch a fresh token and show it as a QR code; attendees submit it back.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Tolerated clock drift for tokens stamped slightly in the future.
pub const MAX_CLOCK_SKEW_SECS: i64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckinTokenError {
    #[error("check-in token is malformed")]
    Malformed,

    #[error("check-in token is for a different meetup")]
    WrongMeetup,

    #[error("check-in token signature is invalid")]
    BadSignature,

    #[error("check-in token is not valid yet")]
    NotYetValid,

    #[error("check-in token has expired")]
    Expired,

    #[error("check-in secret is unusable")]
    InvalidKey,
}

fn signing_message(meetup_id: Uuid, issued_at: i64) -> String {
    format!("{meetup_id}:{issued_at}")
}

fn mac_for(secret: &[u8], meetup_id: Uuid, issued_at: i64) -> Result<HmacSha256, CheckinTokenError> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| CheckinTokenError::InvalidKey)?;
    mac.update(signing_message(meetup_id, issued_at).as_bytes());
    Ok(mac)
}

pub fn sign_token(secret: &[u8], meetup_id: Uuid, issued_at: i64) -> Result<String, CheckinTokenError> {
    let signature = mac_for(secret, meetup_id, issued_at)?.finalize().into_bytes();
    Ok(format!("{meetup_id}.{issued_at}.{}", hex::encode(signature)))
}

/// Verifies a token for `expected_meetup` at `now_unix`. Returns the issue time.
pub fn verify_token(
    secret: &[u8],
    token: &str,
    expected_meetup: Uuid,
    now_unix: i64,
    ttl_secs: i64,
) -> Result<i64, CheckinTokenError> {
    let mut parts = token.trim().split('.');
    let (Some(id_part), Some(issued_part), Some(sig_part), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CheckinTokenError::Malformed);
    };

    let meetup_id: Uuid = id_part.parse().map_err(|_| CheckinTokenError::Malformed)?;
    let issued_at: i64 = issued_part.parse().map_err(|_| CheckinTokenError::Malformed)?;
    let signature = hex::decode(sig_part).map_err(|_| CheckinTokenError::Malformed)?;

    if meetup_id != expected_meetup {
        return Err(CheckinTokenError::WrongMeetup);
    }

    mac_for(secret, meetup_id, issued_at)?
        .verify_slice(&signature)
        .map_err(|_| CheckinTokenError::BadSignature)?;

    if issued_at > now_unix + MAX_CLOCK_SKEW_SECS {
        return Err(CheckinTokenError::NotYetValid);
    }
    if now_unix - issued_at > ttl_secs {
        return Err(CheckinTokenError::Expired);
    }
    Ok(issued_at)
}
