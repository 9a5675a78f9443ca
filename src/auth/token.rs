use crate::error::AppError;
use crate::models::{AuthToken, User, AUTH_ACCESS};
use crate::store::Store;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject of the token: the owning user's id.
    pub sub: Uuid,
    /// Access level. Always `auth` for tokens this service issues.
    pub access: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Random id that keeps tokens issued in the same second distinct.
    pub jti: Uuid,
}

/// Issues, resolves and revokes session tokens.
///
/// A token is an HS256 JWT signed with the server secret. Signature validity alone is not
/// enough to authenticate: the token must also still be present in its owner's token list,
/// which is what makes logout possible. Tokens carry no expiry and live until revoked.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenManager {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Signs a fresh token for `user_id` without storing it.
    pub fn sign(&self, user_id: Uuid) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id,
            access: AUTH_ACCESS.to_string(),
            iat: chrono::Utc::now().timestamp(),
            jti: Uuid::new_v4(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Decodes a token, returning `None` for a bad signature, malformed payload or
    /// non-`auth` access.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) if data.claims.access == AUTH_ACCESS => Some(data.claims),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Rejected session token: {}", e);
                None
            }
        }
    }

    /// Signs a token and appends it to the user's token list.
    ///
    /// The token is only returned once the store has accepted it.
    pub async fn issue(&self, store: &dyn Store, user_id: Uuid) -> Result<String, AppError> {
        let token = self.sign(user_id)?;
        store.push_token(user_id, AuthToken::auth(&token)).await?;
        Ok(token)
    }

    /// Finds the user a token belongs to.
    ///
    /// Both the signature and the stored token list must agree. A token that verifies but
    /// was revoked resolves to `None`. Only store failures surface as errors.
    pub async fn resolve(&self, store: &dyn Store, token: &str) -> Result<Option<User>, AppError> {
        let claims = match self.verify(token) {
            Some(claims) => claims,
            None => return Ok(None),
        };
        store.find_user_by_token(claims.sub, token).await
    }

    pub async fn revoke(&self, store: &dyn Store, user_id: Uuid, token: &str) -> Result<(), AppError> {
        store.remove_token(user_id, &AuthToken::auth(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    const SECRET: &str = "test_secret_for_gen_verify";

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .insert_user(User::new("token@example.com".into(), "hash".into()))
            .await
            .unwrap();
        (store, user)
    }

    #[test]
    fn test_token_generation_and_verification() {
        let tokens = TokenManager::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = tokens.sign(user_id).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.access, "auth");
    }

    #[test]
    fn test_tokens_are_unique_per_signing() {
        let tokens = TokenManager::new(SECRET);
        let user_id = Uuid::new_v4();
        assert_ne!(tokens.sign(user_id).unwrap(), tokens.sign(user_id).unwrap());
    }

    #[test]
    fn test_invalid_token_signature() {
        let token = TokenManager::new("some_other_secret")
            .sign(Uuid::new_v4())
            .unwrap();
        assert!(TokenManager::new(SECRET).verify(&token).is_none());
        assert!(TokenManager::new(SECRET).verify("not.a.token").is_none());
        assert!(TokenManager::new(SECRET).verify("").is_none());
    }

    #[test]
    fn test_non_auth_access_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            access: "reset".into(),
            iat: 0,
            jti: Uuid::new_v4(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(TokenManager::new(SECRET).verify(&token).is_none());
    }

    #[actix_rt::test]
    async fn test_issue_resolve_revoke() {
        let (store, user) = store_with_user().await;
        let tokens = TokenManager::new(SECRET);

        let token = tokens.issue(&store, user.id).await.unwrap();
        let resolved = tokens.resolve(&store, &token).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.tokens, vec![AuthToken::auth(&token)]);

        tokens.revoke(&store, user.id, &token).await.unwrap();
        assert!(tokens.resolve(&store, &token).await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_signed_but_unstored_token_rejected() {
        let (store, user) = store_with_user().await;
        let tokens = TokenManager::new(SECRET);

        let token = tokens.sign(user.id).unwrap();
        assert!(tokens.resolve(&store, &token).await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_revoke_leaves_other_sessions() {
        let (store, user) = store_with_user().await;
        let tokens = TokenManager::new(SECRET);

        let first = tokens.issue(&store, user.id).await.unwrap();
        let second = tokens.issue(&store, user.id).await.unwrap();
        tokens.revoke(&store, user.id, &first).await.unwrap();

        assert!(tokens.resolve(&store, &first).await.unwrap().is_none());
        assert!(tokens.resolve(&store, &second).await.unwrap().is_some());
    }

    #[actix_rt::test]
    async fn test_issue_for_unknown_user_returns_no_token() {
        let store = MemoryStore::new();
        let tokens = TokenManager::new(SECRET);
        assert!(tokens.issue(&store, Uuid::new_v4()).await.is_err());
    }
}
