use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::auth::extractors::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the session token on every protected request.
pub const AUTH_HEADER: &str = "x-auth";

/// Rejects requests whose `x-auth` token does not resolve to a user.
///
/// On success the caller is stored in the request extensions as an `AuthenticatedUser`.
/// Otherwise the request is answered with 401 and the wrapped service never runs.
/// Wrap only the scopes that need a caller.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let token = req
                .headers()
                .get(AUTH_HEADER)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            let token = match token {
                Some(token) => token,
                None => return Ok(reject(req, AppError::Unauthorized("Missing token".into()))),
            };

            let state = match req.app_data::<web::Data<AppState>>().cloned() {
                Some(state) => state,
                None => {
                    let err = AppError::InternalServerError("Application state not configured".into());
                    return Ok(reject(req, err));
                }
            };

            let user = match state.tokens.resolve(state.store.as_ref(), &token).await {
                Ok(Some(user)) => user,
                Ok(None) => return Ok(reject(req, AppError::Unauthorized("Invalid token".into()))),
                Err(e) => {
                    log::error!("Token lookup failed: {}", e);
                    return Ok(reject(req, AppError::Unauthorized("Invalid token".into())));
                }
            };

            req.extensions_mut()
                .insert(AuthenticatedUser { user, token });
            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

fn reject<B>(req: ServiceRequest, err: AppError) -> ServiceResponse<EitherBody<B>> {
    req.into_response(err.error_response()).map_into_right_body()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::User;
    use crate::store::{MemoryStore, Store};
    use actix_web::{http::StatusCode, test, App, HttpResponse};
    use std::sync::Arc;

    async fn whoami(caller: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().body(caller.user.email)
    }

    fn state(store: Arc<dyn Store>) -> web::Data<AppState> {
        let config = Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some("middleware-secret".to_string()),
            _ => None,
        })
        .unwrap();
        web::Data::new(AppState::new(store, &config))
    }

    #[actix_rt::test]
    async fn test_gate_accepts_stored_token_and_rejects_others() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(User::new("gate@example.com".into(), "hash".into()))
            .await
            .unwrap();
        let data = state(store.clone());
        let token = data.tokens.issue(store.as_ref(), user.id).await.unwrap();
        let unstored = data.tokens.sign(user.id).unwrap();

        let app = test::init_service(
            App::new().app_data(data.clone()).service(
                web::scope("/me")
                    .wrap(AuthMiddleware)
                    .route("", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((AUTH_HEADER, token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "gate@example.com");

        for header in [None, Some("garbage"), Some(unstored.as_str())] {
            let mut req = test::TestRequest::get().uri("/me");
            if let Some(value) = header {
                req = req.insert_header((AUTH_HEADER, value));
            }
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(
                resp.status(),
                StatusCode::UNAUTHORIZED,
                "header {:?} should be rejected",
                header
            );
        }
    }

    #[actix_rt::test]
    async fn test_gate_without_app_state_is_server_error() {
        let app = test::init_service(
            App::new().service(
                web::scope("/me")
                    .wrap(AuthMiddleware)
                    .route("", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((AUTH_HEADER, "some-token"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
