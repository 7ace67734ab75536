/// User Routes
///
/// Paginated user listing, restricted to tokens carrying `employee: true`.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::TokenClaims;
use crate::error::{AppError, AuthError};
use crate::startup::AppState;
use crate::store::{PageRequest, UserSummary};
use crate::validators::int_param;

/// Raw query parameters; non-numeric values fall back to the defaults
#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl PageQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(
            int_param(self.page.as_deref(), PageRequest::DEFAULT_PAGE),
            int_param(self.per_page.as_deref(), PageRequest::DEFAULT_PER_PAGE),
        )
    }
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
    pub page: u32,
    pub per_page: u32,
}

/// GET /users/all?page=&per_page=
pub async fn list_users(
    claims: web::ReqData<TokenClaims>,
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if !claims.is_employee() {
        tracing::warn!(sub = %claims.sub, "User listing denied without employee claim");
        return Err(AuthError::Forbidden.into());
    }

    let page = query.page_request();
    let users = state
        .credentials
        .list(page)
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();

    Ok(HttpResponse::Ok().json(UsersResponse {
        users,
        page: page.page,
        per_page: page.per_page,
    }))
}
