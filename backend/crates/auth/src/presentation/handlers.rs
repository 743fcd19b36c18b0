//! HTTP Handlers

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use std::sync::Arc;

use platform::password::{PasswordHashError, PasswordHasher};

use crate::application::config::AuthConfig;
use crate::application::{
    ChangePasswordInput, ChangePasswordUseCase, LogResetDelivery, LoginInput, LoginUseCase,
    LogoutUseCase, ManageUsersUseCase, PasswordResetUseCase, RefreshUseCase, RegisterInput,
    RegisterUseCase, ResetDelivery, TokenCodec, UpdateUserInput,
};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::user_id::UserId;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, MessageResponse,
    OkResponse, RefreshResponse, RefreshTokenRequest, RegisterRequest, ResetPasswordRequest,
    TemporaryPasswordResponse, UpdateUserRequest, UserResponse,
};
use crate::presentation::extract::{CurrentUser, OptionalUser, ValidJson};

/// Shared state for auth handlers
#[derive(Clone)]
pub struct AuthAppState<R>
where
    R: AuthStore,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub codec: Arc<TokenCodec>,
    pub hasher: Arc<PasswordHasher>,
    pub reset_delivery: Arc<dyn ResetDelivery>,
}

impl<R> AuthAppState<R>
where
    R: AuthStore,
{
    pub fn new(repo: R, config: AuthConfig) -> Result<Self, PasswordHashError> {
        let hasher = config.password_hasher()?;
        let codec = TokenCodec::from_config(&config);

        Ok(Self {
            repo: Arc::new(repo),
            config: Arc::new(config),
            codec: Arc::new(codec),
            hasher: Arc::new(hasher),
            reset_delivery: Arc::new(LogResetDelivery),
        })
    }

    pub fn with_reset_delivery(mut self, delivery: impl ResetDelivery + 'static) -> Self {
        self.reset_delivery = Arc::new(delivery);
        self
    }

    fn login_use_case(&self) -> LoginUseCase<R, R> {
        LoginUseCase::new(
            self.repo.clone(),
            self.repo.clone(),
            self.codec.clone(),
            self.hasher.clone(),
        )
    }

    fn password_reset_use_case(&self) -> PasswordResetUseCase<R, R, R> {
        PasswordResetUseCase::new(
            self.repo.clone(),
            self.repo.clone(),
            self.repo.clone(),
            self.hasher.clone(),
            self.config.password_reset_ttl,
        )
    }

    fn manage_users_use_case(&self) -> ManageUsersUseCase<R, R> {
        ManageUsersUseCase::new(self.repo.clone(), self.repo.clone(), self.hasher.clone())
    }
}

fn parse_user_id(raw: &str) -> AuthResult<UserId> {
    raw.parse()
        .map_err(|_| AuthError::validation("Invalid user id"))
}

// ============================================================================
// Register / Login
// ============================================================================

/// POST /auth/register
pub async fn register<R>(
    State(state): State<AuthAppState<R>>,
    OptionalUser(caller): OptionalUser,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> AuthResult<(StatusCode, Json<AuthResponse>)>
where
    R: AuthStore,
{
    let use_case = RegisterUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.codec.clone(),
        state.hasher.clone(),
    );

    let input = RegisterInput {
        email: req.email,
        password: req.password,
        role: req.role,
    };

    let outcome = use_case
        .execute(input, caller.as_ref().map(|CurrentUser(user)| user))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::from_outcome(outcome)),
    ))
}

/// POST /auth/login
pub async fn login<R>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> AuthResult<Json<AuthResponse>>
where
    R: AuthStore,
{
    let input = LoginInput {
        email: req.email,
        password: req.password,
    };

    let outcome = state.login_use_case().execute(input).await?;

    Ok(Json(AuthResponse::from_outcome(outcome)))
}

// ============================================================================
// Refresh / Logout
// ============================================================================

/// POST /auth/refresh
pub async fn refresh<R>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<RefreshTokenRequest>,
) -> AuthResult<Json<RefreshResponse>>
where
    R: AuthStore,
{
    let use_case = RefreshUseCase::new(state.repo.clone(), state.repo.clone(), state.codec.clone());

    let outcome = use_case.execute(&req.refresh_token).await?;

    Ok(Json(RefreshResponse::from_outcome(outcome)))
}

/// POST /auth/logout
///
/// Always 200, even for a missing or malformed body.
pub async fn logout<R>(State(state): State<AuthAppState<R>>, body: Bytes) -> Json<MessageResponse>
where
    R: AuthStore,
{
    if let Ok(req) = serde_json::from_slice::<RefreshTokenRequest>(&body) {
        LogoutUseCase::new(state.repo.clone(), state.codec.clone())
            .execute(&req.refresh_token)
            .await;
    }

    Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}

// ============================================================================
// Password
// ============================================================================

/// POST /auth/forgot-password
///
/// Same response whether or not the account exists.
pub async fn forgot_password<R>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<ForgotPasswordRequest>,
) -> Json<OkResponse>
where
    R: AuthStore,
{
    if let Some(ticket) = state.password_reset_use_case().request_reset(&req.email).await {
        state.reset_delivery.deliver(&ticket);
    }

    Json(OkResponse::OK)
}

/// POST /auth/reset-password
pub async fn reset_password<R>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> AuthResult<Json<OkResponse>>
where
    R: AuthStore,
{
    state
        .password_reset_use_case()
        .reset_password(&req.token, req.new_password)
        .await?;

    Ok(Json(OkResponse::OK))
}

/// POST /auth/change-password
pub async fn change_password<R>(
    State(state): State<AuthAppState<R>>,
    CurrentUser(user): CurrentUser,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> AuthResult<Json<UserResponse>>
where
    R: AuthStore,
{
    let use_case = ChangePasswordUseCase::new(state.repo.clone(), state.hasher.clone());

    let input = ChangePasswordInput {
        current_password: req.current_password,
        new_password: req.new_password,
    };

    let updated = use_case.execute(&user.id, input).await?;

    Ok(Json(UserResponse::from(&updated)))
}

// ============================================================================
// Current user
// ============================================================================

/// GET /auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

// ============================================================================
// Admin user management
// ============================================================================

/// GET /users
pub async fn list_users<R>(
    State(state): State<AuthAppState<R>>,
) -> AuthResult<Json<Vec<UserResponse>>>
where
    R: AuthStore,
{
    let users = state.manage_users_use_case().list().await?;

    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// GET /users/{id}
pub async fn get_user<R>(
    State(state): State<AuthAppState<R>>,
    Path(id): Path<String>,
) -> AuthResult<Json<UserResponse>>
where
    R: AuthStore,
{
    let user_id = parse_user_id(&id)?;
    let user = state.manage_users_use_case().get(&user_id).await?;

    Ok(Json(UserResponse::from(&user)))
}

/// PATCH /users/{id}
pub async fn update_user<R>(
    State(state): State<AuthAppState<R>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> AuthResult<Json<UserResponse>>
where
    R: AuthStore,
{
    let user_id = parse_user_id(&id)?;

    let input = UpdateUserInput {
        role: req.role,
        is_active: req.is_active,
    };

    let user = state
        .manage_users_use_case()
        .update(&actor, &user_id, input)
        .await?;

    Ok(Json(UserResponse::from(&user)))
}

/// POST /users/{id}/temporary-password
pub async fn issue_temporary_password<R>(
    State(state): State<AuthAppState<R>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> AuthResult<Json<TemporaryPasswordResponse>>
where
    R: AuthStore,
{
    let user_id = parse_user_id(&id)?;

    let (user, temporary_password) = state
        .manage_users_use_case()
        .issue_temporary_password(&actor, &user_id)
        .await?;

    Ok(Json(TemporaryPasswordResponse {
        user: UserResponse::from(&user),
        temporary_password,
    }))
}
