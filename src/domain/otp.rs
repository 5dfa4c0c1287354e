//! One-time verification codes.

use rand::Rng;
use rand::rngs::OsRng;

/// Number of digits in a code.
pub const OTP_DIGITS: usize = 6;

/// Exclusive upper bound of the numeric code space.
const OTP_SPACE: u32 = 1_000_000;

/// Draw a uniformly random 6-digit code from the OS RNG.
///
/// Leading zeros are kept: `000042` is a valid code.
pub fn random_code() -> String {
    let n = OsRng.gen_range(0..OTP_SPACE);
    format!("{n:06}")
}

/// Redis key holding the active code for a subject.
pub fn otp_key(subject_id: &str) -> String {
    format!("auth:otp:{subject_id}")
}

/// Mail body sent with a fresh code.
pub fn verification_mail_body(name: &str, code: &str, ttl_minutes: u64) -> String {
    format!(
        "<h2>Verify your email</h2>\
         <p>Hi {name},</p>\
         <p>Welcome to Rivon. To complete your registration, please verify your email using the code below:</p>\
         <div class=\"otp-block\"><div class=\"otp-text\">{code}</div>\
         <div class=\"copy-instruction\">This code expires in {ttl_minutes} minutes</div></div>\
         <p>If you didn't request this, you can safely ignore this email.</p>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_six_ascii_digits() {
        for _ in 0..1000 {
            let code = random_code();
            assert_eq!(code.len(), OTP_DIGITS);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_otp_key_format() {
        assert_eq!(otp_key("abc"), "auth:otp:abc");
    }

    #[test]
    fn test_mail_body_contains_code() {
        let body = verification_mail_body("Ada", "004211", 5);
        assert!(body.contains("004211"));
        assert!(body.contains("Ada"));
        assert!(body.contains("5 minutes"));
    }
}
