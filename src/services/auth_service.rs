use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{info, warn};
use validator::Validate;

use crate::database::store::MarketStore;
use crate::errors::{AppError, Result};
use crate::models::user::{AuthResponse, Claims, LoginUser, RegisterUser, Role, User, UserResponse};

#[derive(Clone)]
pub struct JwtKeys {
    secret: Arc<String>,
    ttl_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Self {
        JwtKeys {
            secret: Arc::new(secret.into()),
            ttl_hours,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let claims = Claims {
            sub: user.id.to_hex(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            role: user.role,
            exp: (Utc::now().timestamp() + self.ttl_hours * 3600) as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::service(format!("Token generation failed: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::AuthError)
    }
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn MarketStore>,
    jwt: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn MarketStore>, jwt: JwtKeys) -> Self {
        AuthService { store, jwt }
    }

    pub async fn register(&self, payload: RegisterUser) -> Result<AuthResponse> {
        payload.validate()?;

        let role: Role = payload.role.parse()?;
        if role == Role::Admin {
            return Err(AppError::invalid_input("Admin accounts cannot self-register"));
        }

        let phone = payload.phone.trim().to_string();
        if self.store.find_user_by_phone(&phone).await?.is_some() {
            return Err(AppError::DuplicateKey(format!("phone {}", phone)));
        }

        let password_hash = hash(&payload.password, DEFAULT_COST)?;
        let user = User::new(payload.name.trim().to_string(), phone, password_hash, role);
        self.store.insert_user(&user).await?;

        info!("👤 Registered {} {} ({})", user.role, user.name, user.id.to_hex());

        let token = self.jwt.issue(&user)?;
        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }

    pub async fn login(&self, payload: LoginUser) -> Result<AuthResponse> {
        let user = self
            .store
            .find_user_by_phone(payload.phone.trim())
            .await?
            .ok_or(AppError::AuthError)?;

        if !verify(&payload.password, &user.password_hash)? {
            return Err(AppError::AuthError);
        }

        if user.blocked {
            warn!("Blocked user {} attempted to log in", user.id.to_hex());
            return Err(AppError::forbidden("Account is blocked"));
        }

        let token = self.jwt.issue(&user)?;
        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }

    pub async fn current_user(&self, claims: &Claims) -> Result<UserResponse> {
        let user = self
            .store
            .find_user(&claims.user_id()?)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        Ok(user.into())
    }

    /// Creates the configured admin account if no user owns that phone yet.
    pub async fn bootstrap_admin(&self, phone: &str, password: &str) -> Result<bool> {
        if self.store.find_user_by_phone(phone).await?.is_some() {
            return Ok(false);
        }

        let password_hash = hash(password, DEFAULT_COST)?;
        let admin = User::new("Administrator".to_string(), phone.to_string(), password_hash, Role::Admin);
        self.store.insert_user(&admin).await?;
        info!("🔑 Bootstrapped admin account {}", admin.id.to_hex());
        Ok(true)
    }
}
