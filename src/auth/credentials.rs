//! Password hashing and signed, expiring bearer tokens.
//!
//! A token is a compact JWT (`header.claims.signature`) signed with the
//! process-wide secret. It is never stored: a token is valid exactly when
//! its signature verifies under the configured algorithm and its `exp` lies
//! strictly in the future.

use std::str::FromStr;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, Params, Version};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::Result;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
}

/// Identity asserted by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(String);

impl Subject {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Outcome of [`CredentialService::decode_token`]. The reason a token was
/// rejected is intentionally not part of the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Valid(Subject),
    Invalid,
}

impl TokenStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenStatus::Valid(_))
    }

    pub fn into_subject(self) -> Option<Subject> {
        match self {
            TokenStatus::Valid(subject) => Some(subject),
            TokenStatus::Invalid => None,
        }
    }
}

/// Unverified view of a token's header and claims. Debugging aid only.
#[derive(Debug, Clone)]
pub struct TokenParts {
    pub header: serde_json::Value,
    pub claims: serde_json::Value,
}

/// Stateless credential operations sharing one immutable signing secret.
///
/// Built once at startup from [`AuthConfig`] and shared behind an `Arc`;
/// every method takes `&self` and is safe to call concurrently.
pub struct CredentialService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    default_ttl: Duration,
    hasher: Argon2<'static>,
    decoy_hash: String,
}

impl CredentialService {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if config.jwt_secret.is_empty() {
            return Err(AppError::ConfigError("auth.jwt_secret must not be empty".into()));
        }

        let algorithm = Algorithm::from_str(&config.algorithm)
            .map_err(|_| AppError::ConfigError(format!("unknown signing algorithm {}", config.algorithm)))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AppError::ConfigError(format!(
                "signing algorithm {} needs a key pair; only HS256, HS384 and HS512 are supported",
                config.algorithm
            )));
        }

        if config.token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError("auth.token_expiry_minutes must be positive".into()));
        }
        let default_ttl = Duration::try_minutes(config.token_expiry_minutes)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| AppError::ConfigError("auth.token_expiry_minutes is out of range".into()))?;

        let params = Params::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
            None,
        )
        .map_err(|e| AppError::ConfigError(format!("invalid password hashing cost: {}", e)))?;
        let hasher = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let secret = config.jwt_secret.as_bytes();
        let mut service = Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            validation,
            default_ttl,
            hasher,
            decoy_hash: String::new(),
        };
        service.decoy_hash = service.hash_password("decoy password for unknown users")?;

        Ok(service)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Hashes a password with Argon2id and a fresh random salt.
    ///
    /// Returns a PHC string that embeds the salt and cost parameters, so
    /// hashes created under an older cost still verify after it changes.
    pub fn hash_password(&self, plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.hasher.hash_password(plain.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Checks `plain` against a PHC hash. An unparseable hash never matches.
    pub fn verify_password(&self, plain: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self.hasher.verify_password(plain.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }

    /// Runs a full verification against an internal decoy hash and always
    /// returns `false`. Lets a login for an unknown user cost the same as a
    /// login with a wrong password.
    pub fn verify_decoy(&self, plain: &str) -> bool {
        let _ = self.verify_password(plain, &self.decoy_hash);
        false
    }

    pub fn issue_token(&self, subject: &str) -> Result<String> {
        self.issue_token_with_ttl(subject, self.default_ttl)
    }

    /// A non-positive `ttl` yields a token that is already expired.
    pub fn issue_token_with_ttl(&self, subject: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::InternalError("Token lifetime out of range".into()))?;
        let claims = Claims {
            sub: subject.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to generate token: {}", e)))
    }

    /// Verifies signature, algorithm and expiry and extracts the subject.
    ///
    /// Never fails: every problem with attacker-supplied input collapses
    /// into [`TokenStatus::Invalid`].
    pub fn decode_token(&self, token: &str) -> TokenStatus {
        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(kind = ?e.kind(), "Rejected credential");
                return TokenStatus::Invalid;
            }
        };

        if claims.exp <= Utc::now().timestamp() {
            debug!("Rejected credential: expired");
            return TokenStatus::Invalid;
        }
        if claims.sub.is_empty() {
            debug!("Rejected credential: empty subject");
            return TokenStatus::Invalid;
        }

        TokenStatus::Valid(Subject(claims.sub))
    }
}

/// Decodes the header and claims segments of a token without checking the
/// signature or expiry. The result must not be trusted.
pub fn inspect_token(token: &str) -> Option<TokenParts> {
    let mut segments = token.split('.');
    let (header, claims, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let decode_segment = |segment: &str| -> Option<serde_json::Value> {
        let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
        serde_json::from_slice(&bytes).ok()
    };

    Some(TokenParts {
        header: decode_segment(header)?,
        claims: decode_segment(claims)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-chars";

    fn test_config() -> AuthConfig {
        Settings::new_for_test().expect("Failed to load test config").auth
    }

    fn create_test_service() -> CredentialService {
        CredentialService::new(&test_config()).expect("should build credential service")
    }

    fn reencode_claims(token: &str, claims: &serde_json::Value) -> String {
        let parts: Vec<&str> = token.split('.').collect();
        let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{}.{}.{}", parts[0], claims, parts[2])
    }

    #[test]
    fn test_password_hashing() {
        let service = create_test_service();
        let hash = service.hash_password("secret123").expect("should hash password");

        assert_ne!(hash, "secret123");
        assert!(hash.starts_with("$argon2id$"), "hash should be in PHC format");
        assert!(service.verify_password("secret123", &hash));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let service = create_test_service();
        let first = service.hash_password("secret123").unwrap();
        let second = service.hash_password("secret123").unwrap();

        assert_ne!(first, second);
        assert!(service.verify_password("secret123", &first));
        assert!(service.verify_password("secret123", &second));
    }

    #[test]
    fn test_password_verification_failure() {
        let service = create_test_service();
        let passwords = ["secret123", "secret124", "Secret123", "", "pässwörd"];

        for (i, stored) in passwords.iter().enumerate() {
            let hash = service.hash_password(stored).unwrap();
            for (j, attempt) in passwords.iter().enumerate() {
                assert_eq!(service.verify_password(attempt, &hash), i == j, "{:?} vs {:?}", attempt, stored);
            }
        }
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        let service = create_test_service();
        assert!(!service.verify_password("secret123", "not-a-phc-string"));
        assert!(!service.verify_password("", ""));
        assert!(!service.verify_decoy("decoy password for unknown users"));
    }

    #[test]
    fn test_hash_from_different_cost_still_verifies() {
        let service = create_test_service();
        let mut config = test_config();
        config.hash_memory_kib = 2048;
        config.hash_iterations = 2;
        let stronger = CredentialService::new(&config).unwrap();

        let hash = stronger.hash_password("secret123").unwrap();
        assert!(service.verify_password("secret123", &hash));
    }

    #[test]
    fn test_token_roundtrip() {
        let service = create_test_service();
        let token = service.issue_token("alice").expect("should issue token");

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(
            service.decode_token(&token),
            TokenStatus::Valid(Subject("alice".to_string()))
        );
    }

    #[test]
    fn test_claims_expiration() {
        let service = create_test_service();
        let token = service.issue_token("alice").unwrap();
        let parts = inspect_token(&token).expect("token segments should decode");

        let iat = parts.claims["iat"].as_i64().unwrap();
        let exp = parts.claims["exp"].as_i64().unwrap();
        let now = Utc::now().timestamp();

        assert!(iat <= now && iat >= now - 5, "iat should be current timestamp");
        assert_eq!(exp - iat, service.default_ttl().num_seconds(), "exp should be iat + default ttl");
        assert_eq!(service.default_ttl(), Duration::minutes(15));
        assert_eq!(parts.claims["sub"], "alice");
        assert_eq!(parts.header["alg"], "HS256");
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let service = create_test_service();
        let token = service.issue_token_with_ttl("alice", Duration::seconds(-5)).unwrap();
        assert_eq!(service.decode_token(&token), TokenStatus::Invalid);

        let token = service.issue_token_with_ttl("alice", Duration::zero()).unwrap();
        assert_eq!(service.decode_token(&token), TokenStatus::Invalid);
    }

    #[test]
    fn test_unrepresentable_ttl_is_an_error() {
        let service = create_test_service();
        let result = service.issue_token_with_ttl("alice", Duration::days(365 * 300_000));
        assert!(matches!(result, Err(AppError::InternalError(_))));

        let result = service.issue_token_with_ttl("alice", Duration::days(-365 * 300_000));
        assert!(matches!(result, Err(AppError::InternalError(_))));

        assert!(service.issue_token("alice").is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn test_token_expires_after_ttl() {
        let service = create_test_service();
        let token = service.issue_token_with_ttl("alice", Duration::seconds(1)).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

        assert_eq!(service.decode_token(&token), TokenStatus::Invalid);
    }

    #[test]
    fn test_any_mutated_byte_invalidates_token() {
        let service = create_test_service();
        let token = service.issue_token("alice").unwrap();
        assert!(service.decode_token(&token).is_valid());

        for (i, c) in token.char_indices() {
            if c == '.' {
                continue;
            }
            let replacement = if c == 'A' { "B" } else { "A" };
            let mut tampered = token.clone();
            tampered.replace_range(i..i + 1, replacement);

            assert_eq!(
                service.decode_token(&tampered),
                TokenStatus::Invalid,
                "mutation at byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_forged_claims_are_invalid() {
        let service = create_test_service();
        let token = service.issue_token("alice").unwrap();
        let mut claims = inspect_token(&token).unwrap().claims;
        claims["sub"] = serde_json::json!("mallory");

        assert_eq!(service.decode_token(&reencode_claims(&token, &claims)), TokenStatus::Invalid);
    }

    #[test]
    fn test_token_verification_wrong_secret() {
        let service = create_test_service();
        let mut config = test_config();
        config.jwt_secret = "another-secret-that-is-32-chars-long".to_string();
        let other = CredentialService::new(&config).unwrap();

        let token = other.issue_token("alice").unwrap();
        assert_eq!(service.decode_token(&token), TokenStatus::Invalid);
    }

    #[test]
    fn test_algorithm_mismatch_is_invalid() {
        let service = create_test_service();
        let mut config = test_config();
        config.algorithm = "HS512".to_string();
        let hs512 = CredentialService::new(&config).unwrap();

        let token = hs512.issue_token("alice").unwrap();
        assert!(hs512.decode_token(&token).is_valid());
        assert_eq!(service.decode_token(&token), TokenStatus::Invalid);
    }

    #[test]
    fn test_unsigned_token_is_invalid() {
        let service = create_test_service();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let exp = Utc::now().timestamp() + 600;
        let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"alice","exp":{}}}"#, exp));

        assert_eq!(service.decode_token(&format!("{}.{}.", header, claims)), TokenStatus::Invalid);
    }

    #[test]
    fn test_missing_or_empty_subject_is_invalid() {
        let service = create_test_service();
        let key = EncodingKey::from_secret(SECRET.as_bytes());
        let exp = Utc::now().timestamp() + 600;

        let without_sub = encode(&Header::default(), &serde_json::json!({ "exp": exp }), &key).unwrap();
        assert_eq!(service.decode_token(&without_sub), TokenStatus::Invalid);

        let empty_sub = encode(&Header::default(), &serde_json::json!({ "sub": "", "exp": exp }), &key).unwrap();
        assert_eq!(service.decode_token(&empty_sub), TokenStatus::Invalid);

        let without_exp = encode(&Header::default(), &serde_json::json!({ "sub": "alice" }), &key).unwrap();
        assert_eq!(service.decode_token(&without_exp), TokenStatus::Invalid);
    }

    #[test]
    fn test_garbage_input_is_invalid() {
        let service = create_test_service();
        for input in ["", ".", "..", "invalid.token.here", "a.b.c.d", "Bearer x", "\u{0}\u{1}"] {
            assert_eq!(service.decode_token(input), TokenStatus::Invalid, "{:?}", input);
        }
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let mut config = test_config();
        config.jwt_secret.clear();
        assert!(matches!(CredentialService::new(&config), Err(AppError::ConfigError(_))));

        let mut config = test_config();
        config.algorithm = "RS256".to_string();
        assert!(matches!(CredentialService::new(&config), Err(AppError::ConfigError(_))));

        let mut config = test_config();
        config.algorithm = "ROT13".to_string();
        assert!(matches!(CredentialService::new(&config), Err(AppError::ConfigError(_))));

        let mut config = test_config();
        config.token_expiry_minutes = 0;
        assert!(matches!(CredentialService::new(&config), Err(AppError::ConfigError(_))));

        for minutes in [1_000_000_000_000, i64::MAX] {
            let mut config = test_config();
            config.token_expiry_minutes = minutes;
            assert!(
                matches!(CredentialService::new(&config), Err(AppError::ConfigError(_))),
                "{} minutes was accepted",
                minutes
            );
        }
    }

    #[test]
    fn test_inspect_rejects_non_tokens() {
        assert!(inspect_token("only.two").is_none());
        assert!(inspect_token("a.b.c.d").is_none());
        assert!(inspect_token("!!!.???.sig").is_none());
    }
}
