use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{CompanyId, UserId};

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,                   // Subject (user_id as string)
    pub user_id: UserId,               // User UUID
    pub company_id: Option<CompanyId>, // Set for company-regular and company-admin users
    pub exp: i64,                      // Expiration timestamp
    pub iat: i64,                      // Issued at timestamp
    pub iss: String,                   // Issuer
    pub jti: String,                   // JWT ID (unique token identifier)
}

/// JWT Service - creates and verifies JWT tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    /// Create new JWT service with secret and issuer
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Create a new JWT token for a user
    ///
    /// Token expires after 24 hours
    pub fn create_token(&self, user_id: UserId, company_id: Option<CompanyId>) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(24);

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            company_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify and decode a JWT token
    ///
    /// Returns claims if token is valid and not expired
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        let user_id = UserId::new();
        let company_id = CompanyId::new();

        let token = service.create_token(user_id, Some(company_id)).unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.company_id, Some(company_id));
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iss, "test_issuer");
    }

    #[test]
    fn test_worker_token_has_no_company() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        let token = service.create_token(UserId::new(), None).unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.company_id, None);
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        let result = service.verify_token("invalid_token");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = JwtService::new("secret1", "test_issuer".to_string());
        let service2 = JwtService::new("secret2", "test_issuer".to_string());

        let token = service1.create_token(UserId::new(), None).unwrap();

        // Token created with secret1 should not verify with secret2
        let result = service2.verify_token(&token);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let issuer_a = JwtService::new("shared", "issuer_a".to_string());
        let issuer_b = JwtService::new("shared", "issuer_b".to_string());

        let token = issuer_a.create_token(UserId::new(), None).unwrap();
        assert!(issuer_b.verify_token(&token).is_err());
    }

    #[test]
    fn test_expiry_is_24_hours() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        let token = service.create_token(UserId::new(), None).unwrap();

        let claims = service.verify_token(&token).unwrap();

        let now = chrono::Utc::now().timestamp();
        let expires_in = claims.exp - now;
        assert!(expires_in > 23 * 3600);
        assert!(expires_in <= 24 * 3600);
    }
}
