use crate::{
    auth::{
        find_by_credentials, password::hash_password_blocking, AuthenticatedUser,
        PasswordChangeRequest, AUTH_HEADER,
    },
    error::AppError,
    models::{User, UserInput},
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use validator::Validate;

/// Register a new user
///
/// Creates the account, opens its first session and returns the user with the session
/// token in the `x-auth` header.
///
/// ## Responses:
/// - `200 OK`: `{id, email}` plus `x-auth`.
/// - `400 Bad Request`: invalid email, password shorter than 6, or email already taken.
#[post("")]
pub async fn register(
    state: web::Data<AppState>,
    input: web::Json<UserInput>,
) -> Result<impl Responder, AppError> {
    let input = input.into_inner().normalized();
    input.validate()?;

    let password_hash = hash_password_blocking(input.password, state.bcrypt_cost).await?;
    let user = state
        .store
        .insert_user(User::new(input.email, password_hash))
        .await?;
    let token = state.tokens.issue(state.store.as_ref(), user.id).await?;

    log::info!("Registered user {}", user.id);
    Ok(HttpResponse::Ok()
        .insert_header((AUTH_HEADER, token))
        .json(user))
}

/// Login user
///
/// Opens an additional session; sessions from earlier logins stay valid.
///
/// ## Responses:
/// - `200 OK`: `{id, email}` plus a new `x-auth` token.
/// - `400 Bad Request`: unknown email or wrong password.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    input: web::Json<UserInput>,
) -> Result<impl Responder, AppError> {
    let input = input.into_inner();
    let user = match find_by_credentials(state.store.as_ref(), &input.email, &input.password).await
    {
        Ok(user) => user,
        Err(e) => {
            log::warn!("Failed login for {}", input.email.trim());
            return Err(e);
        }
    };
    let token = state.tokens.issue(state.store.as_ref(), user.id).await?;

    Ok(HttpResponse::Ok()
        .insert_header((AUTH_HEADER, token))
        .json(user))
}

#[get("")]
pub async fn me(caller: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(caller.user)
}

/// Change the caller's password. Existing sessions are kept.
#[patch("/password")]
pub async fn change_password(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    input: web::Json<PasswordChangeRequest>,
) -> Result<impl Responder, AppError> {
    input.validate()?;

    let password_hash =
        hash_password_blocking(input.into_inner().password, state.bcrypt_cost).await?;
    state
        .store
        .set_password_hash(caller.user.id, &password_hash)
        .await?;

    Ok(HttpResponse::Ok().json(caller.user))
}

/// Logout
///
/// Revokes the token used for this request. Other sessions are unaffected.
#[delete("/token")]
pub async fn logout(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state
        .tokens
        .revoke(state.store.as_ref(), caller.user.id, &caller.token)
        .await?;
    Ok(HttpResponse::Ok().finish())
}
