use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::identity::Identity;

#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    expiry: Duration,
}

impl JwtService {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            encoding: EncodingKey::from_secret(config.session_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.session_secret.as_bytes()),
            issuer: config.session_issuer.clone(),
            audience: config.session_audience.clone(),
            expiry: Duration::minutes(config.session_expiry_minutes),
        })
    }

    pub fn expiry_seconds(&self) -> i64 {
        self.expiry.num_seconds()
    }

    pub fn generate_token(&self, identity: &Identity) -> Result<String> {
        let now = Utc::now();
        let exp = now + self.expiry;
        let claims = Claims {
            sub: identity.subject_id.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            manager_name: identity.manager_name.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(&[self.audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub manager_name: String,
    pub iss: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn into_identity(self) -> Identity {
        Identity::new(self.sub, self.name, self.email).with_manager(self.manager_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str, audience: &str) -> JwtService {
        JwtService {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: "employee-dialogue".to_string(),
            audience: audience.to_string(),
            expiry: Duration::minutes(5),
        }
    }

    #[test]
    fn session_token_carries_the_identity() {
        let jwt = service("secret", "clients");
        let identity = Identity::new("sub-1", "Alice", "alice@example.com").with_manager("Bob");

        let token = jwt.generate_token(&identity).expect("token");
        let claims = jwt.verify_token(&token).expect("valid token");

        assert_eq!(claims.into_identity(), identity);
    }

    #[test]
    fn rejects_tokens_signed_for_another_audience_or_secret() {
        let identity = Identity::new("sub-1", "Alice", "alice@example.com");
        let token = service("secret", "other-clients")
            .generate_token(&identity)
            .expect("token");

        assert!(service("secret", "clients").verify_token(&token).is_err());
        assert!(service("another-secret", "other-clients")
            .verify_token(&token)
            .is_err());
    }
}
