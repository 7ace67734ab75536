/// Token Gate Middleware
///
/// Runs the authorization gate in front of a resource and injects the
/// verified claims into request extensions. Handlers read them back with
/// `web::ReqData<TokenClaims>`; on failure the handler never runs.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::{authorize, Requirements, TokenService};

pub struct TokenGate {
    tokens: Arc<TokenService>,
    requirements: Requirements,
}

impl TokenGate {
    pub fn new(tokens: Arc<TokenService>, requirements: Requirements) -> Self {
        Self {
            tokens,
            requirements,
        }
    }

    /// Valid access token required
    pub fn access(tokens: Arc<TokenService>) -> Self {
        Self::new(tokens, Requirements::access())
    }

    /// Valid refresh token required
    pub fn refresh(tokens: Arc<TokenService>) -> Self {
        Self::new(tokens, Requirements::refresh())
    }

    /// Either token type accepted
    pub fn any_type(tokens: Arc<TokenService>) -> Self {
        Self::new(tokens, Requirements::any_type())
    }
}

impl<S, B> Transform<S, ServiceRequest> for TokenGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TokenGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(TokenGateService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
            requirements: self.requirements,
        }))
    }
}

pub struct TokenGateService<S> {
    service: Rc<S>,
    tokens: Arc<TokenService>,
    requirements: Requirements,
}

impl<S, B> Service<ServiceRequest> for TokenGateService<S>
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
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .map(|h| h.to_str().unwrap_or_default().to_string());

        let service = self.service.clone();
        let tokens = self.tokens.clone();
        let requirements = self.requirements;

        Box::pin(async move {
            match authorize(&tokens, header.as_deref(), &requirements).await {
                Ok(Some(claims)) => {
                    tracing::debug!(
                        sub = %claims.sub,
                        jti = %claims.jti,
                        token_type = %claims.token_type,
                        "Token validated successfully"
                    );
                    req.extensions_mut().insert(claims);
                }
                Ok(None) => {
                    tracing::debug!("No token supplied, continuing unauthenticated");
                }
                Err(e) => {
                    tracing::warn!(path = %req.path(), "Token gate rejected request: {}", e);
                    return Err(e.into());
                }
            }

            service.call(req).await
        })
    }
}
