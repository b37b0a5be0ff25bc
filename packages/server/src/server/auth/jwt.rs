use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Role;

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,        // Subject (operator user id)
    pub roles: Vec<String>, // Role names, optionally prefixed "ROLE_"
    pub exp: i64,           // Expiration timestamp
    pub iat: i64,           // Issued at timestamp
    pub iss: String,        // Issuer
    pub jti: String,        // JWT ID (unique token identifier)
}

impl Claims {
    /// Recognized roles; unknown role names are ignored
    pub fn roles(&self) -> Vec<Role> {
        self.roles.iter().filter_map(|r| Role::from_claim(r)).collect()
    }
}

/// JWT Service - creates and verifies bearer tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Issue a token for an operator. Expires after 8 hours.
    pub fn create_token(&self, user_id: &str, roles: &[Role]) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(8);

        let claims = Claims {
            sub: user_id.to_string(),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify signature, expiry and issuer
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

        let token = service
            .create_token("ops-anna", &[Role::Operations])
            .unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "ops-anna");
        assert_eq!(claims.roles(), vec![Role::Operations]);
        assert_eq!(claims.iss, "test_issuer");
    }

    #[test]
    fn test_prefixed_and_unknown_role_claims() {
        let claims = Claims {
            sub: "u".to_string(),
            roles: vec![
                "ROLE_ADMIN".to_string(),
                "viewer".to_string(),
                "AUDITOR".to_string(),
            ],
            exp: 0,
            iat: 0,
            iss: "i".to_string(),
            jti: "j".to_string(),
        };
        assert_eq!(claims.roles(), vec![Role::Admin, Role::Viewer]);
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        assert!(service.verify_token("invalid_token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = JwtService::new("secret1", "test_issuer".to_string());
        let service2 = JwtService::new("secret2", "test_issuer".to_string());

        let token = service1.create_token("ops-anna", &[Role::Admin]).unwrap();
        assert!(service2.verify_token(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let service1 = JwtService::new("secret", "issuer-a".to_string());
        let service2 = JwtService::new("secret", "issuer-b".to_string());

        let token = service1.create_token("ops-anna", &[Role::Admin]).unwrap();
        assert!(service2.verify_token(&token).is_err());
    }
}
