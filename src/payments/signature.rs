use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Verify a provider signature header of the form `t=<unix_ts>,v1=<hex hmac>`
/// where the HMAC-SHA256 is computed over `"{t}.{raw body}"` with the shared
/// signing secret. Secrets may carry the provider's `whsec_` prefix.
pub fn verify(
    secret: &str,
    header: &str,
    body: &[u8],
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut v1_signature: Option<&str> = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => v1_signature = Some(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    let v1_signature = v1_signature.ok_or(SignatureError::MalformedHeader)?;

    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let key = secret.strip_prefix("whsec_").unwrap_or(secret);
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .map_err(|_| SignatureError::MalformedHeader)?;
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(body);
    let provided = hex::decode(v1_signature).map_err(|_| SignatureError::Mismatch)?;
    // verify_slice compares in constant time.
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

#[derive(Debug, PartialEq, Eq)]
pub enum SignatureError {
    MalformedHeader,
    TimestampOutOfTolerance,
    Mismatch,
}

/// Build a valid signature header for a payload. Used by tests and local tooling.
pub fn sign(secret: &str, body: &[u8], timestamp: i64) -> String {
    let key = secret.strip_prefix("whsec_").unwrap_or(secret);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key.as_bytes()).expect("HMAC can use any key length");
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(body);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign(SECRET, body, 1_700_000_000);
        assert_eq!(verify(SECRET, &header, body, 300, 1_700_000_050), Ok(()));
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign(SECRET, br#"{"id":"evt_1"}"#, 1_700_000_000);
        let result = verify(SECRET, &header, br#"{"id":"evt_2"}"#, 300, 1_700_000_050);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign(SECRET, body, 1_700_000_000);
        let result = verify("whsec_other", &header, body, 300, 1_700_000_050);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign(SECRET, body, 1_700_000_000);
        let result = verify(SECRET, &header, body, 300, 1_700_000_301);
        assert_eq!(result, Err(SignatureError::TimestampOutOfTolerance));
    }

    #[test]
    fn rejects_non_hex_signature() {
        let result = verify(SECRET, "t=1700000000,v1=nothex", b"{}", 300, 1_700_000_000);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn rejects_header_without_v1() {
        let result = verify(SECRET, "t=1700000000", b"{}", 300, 1_700_000_000);
        assert_eq!(result, Err(SignatureError::MalformedHeader));
    }
}
