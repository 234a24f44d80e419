/// Bearer Authentication Middleware
///
/// Verifies the access token from the Authorization header and hands the
/// verified claims to route handlers, which take them as an explicit
/// `web::ReqData<AccessClaims>` argument.
///
/// With `strict_epoch_check`, the token's epoch is also compared with the
/// account's current epoch, so logout and theft response revoke access
/// tokens immediately instead of at expiry.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::AuthService;
use crate::error::{AppError, AuthError};

pub struct JwtMiddleware {
    auth: AuthService,
    strict_epoch_check: bool,
}

impl JwtMiddleware {
    pub fn new(auth: AuthService, strict_epoch_check: bool) -> Self {
        Self {
            auth,
            strict_epoch_check,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            auth: self.auth.clone(),
            strict_epoch_check: self.strict_epoch_check,
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    auth: AuthService,
    strict_epoch_check: bool,
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let auth = self.auth.clone();
        let strict = self.strict_epoch_check;

        Box::pin(async move {
            let token = bearer_token(&req).ok_or_else(|| {
                tracing::warn!("Missing or invalid Authorization header");
                AppError::Auth(AuthError::MissingToken)
            })?;

            let claims = auth.verify_access(&token).map_err(AppError::Auth)?;

            if strict {
                auth.ensure_current(&claims).await?;
            }

            tracing::debug!(
                account_id = %claims.sub,
                epoch = claims.epoch,
                "Access token validated"
            );
            req.extensions_mut().insert(claims);

            service.call(req).await
        })
    }
}
