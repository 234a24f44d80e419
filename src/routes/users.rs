/// Account Routes

use actix_web::{web, HttpResponse};

use crate::auth::{AccessClaims, AuthService};
use crate::error::AppError;

/// GET /users/me
///
/// Profile of the account the bearer token was issued to.
pub async fn get_current_user(
    claims: web::ReqData<AccessClaims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let account_id = claims.account_id()?;
    let profile = auth.profile(account_id).await?;

    Ok(HttpResponse::Ok().json(profile))
}
