use crate::handlers::auth::{AuthenticatedUser, TokenCodec};
use crate::models::all_models::UserRole;
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
    http::header,
    web, Error, HttpMessage,
};
use futures_util::future::{ok, Ready};
use std::{
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

// One message for missing and invalid credentials, so callers cannot tell
// which failure mode occurred
const AUTH_REQUIRED: &str = "Authentication required";

/// Middleware enforcing bearer-token authentication and a per-route role
/// policy. The allowed set is declared where the route is configured.
///
/// A credential is verified whenever the `Authorization` header is present;
/// a present-but-invalid credential is always rejected. An empty allowed set
/// admits requests without a credential too, so handlers behind it must not
/// assume an identity was attached.
pub struct RoleGuard {
    allowed: &'static [UserRole],
}

impl RoleGuard {
    pub fn allow(allowed: &'static [UserRole]) -> Self {
        RoleGuard { allowed }
    }

    pub fn authenticated() -> Self {
        RoleGuard { allowed: &[] }
    }
}

/// Membership test for a declared role set. Roles carry no hierarchy: a role
/// passes a non-empty set only by being listed in it.
pub fn role_permitted(role: UserRole, allowed: &[UserRole]) -> bool {
    allowed.is_empty() || allowed.contains(&role)
}

/// Resolves the caller's identity from the request headers. An absent header
/// resolves to no identity; a header that is present but malformed, carries
/// the wrong scheme, an empty token, or a token that fails verification is
/// an authentication failure.
fn resolve_identity(req: &ServiceRequest) -> Result<Option<AuthenticatedUser>, Error> {
    let header_value = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => value,
        None => return Ok(None),
    };

    let codec = req
        .app_data::<web::Data<TokenCodec>>()
        .ok_or_else(|| ErrorInternalServerError("Token codec is not configured"))?;

    let token = header_value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ErrorUnauthorized(AUTH_REQUIRED))?;

    let claims = codec
        .verify(token)
        .map_err(|_| ErrorUnauthorized(AUTH_REQUIRED))?;

    Ok(Some(AuthenticatedUser {
        id: claims.id,
        role: claims.role,
    }))
}

impl<S, B> Transform<S, ServiceRequest> for RoleGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RoleGuardMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RoleGuardMiddleware {
            service: Rc::new(service),
            allowed: self.allowed,
        })
    }
}

pub struct RoleGuardMiddleware<S> {
    service: Rc<S>,
    allowed: &'static [UserRole],
}

impl<S, B> Service<ServiceRequest> for RoleGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let allowed = self.allowed;

        Box::pin(async move {
            match resolve_identity(&req)? {
                Some(user) => {
                    if !role_permitted(user.role, allowed) {
                        return Err(ErrorForbidden("Insufficient role for this route"));
                    }
                    req.extensions_mut().insert(user);
                }
                None => {
                    // Declared roles demand a credential; an empty set admits
                    // anonymous callers
                    if !allowed.is_empty() {
                        return Err(ErrorUnauthorized(AUTH_REQUIRED));
                    }
                }
            }

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{
        body::{BoxBody, MessageBody}, dev::ServiceFactory, http::StatusCode, test, App, HttpRequest,
        HttpResponse, Responder,
    };
    use uuid::Uuid;

    #[actix_web::test]
    async fn empty_policy_admits_every_role() {
        for role in [
            UserRole::User,
            UserRole::Doctor,
            UserRole::Admin,
            UserRole::SuperAdmin,
        ] {
            assert!(role_permitted(role, &[]));
        }
    }

    #[actix_web::test]
    async fn policy_membership_is_exact_with_no_hierarchy() {
        let allowed = [UserRole::Admin, UserRole::SuperAdmin];

        assert!(role_permitted(UserRole::Admin, &allowed));
        assert!(role_permitted(UserRole::SuperAdmin, &allowed));
        assert!(!role_permitted(UserRole::Doctor, &allowed));
        assert!(!role_permitted(UserRole::User, &allowed));

        // Admin is not implicitly superadmin
        assert!(!role_permitted(UserRole::Admin, &[UserRole::SuperAdmin]));
    }

    async fn whoami(req: HttpRequest) -> impl Responder {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => HttpResponse::Ok().body(user.id.to_string()),
            None => HttpResponse::Ok().body("anonymous"),
        }
    }

    const SECRET: &str = "gate-test-secret";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, 1)
    }

    fn gate_app() -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<BoxBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::new(codec()))
            .route("/open", web::get().to(whoami))
            .service(
                web::resource("/any")
                    .wrap(RoleGuard::authenticated())
                    .route(web::get().to(whoami)),
            )
            .service(
                web::resource("/doctor")
                    .wrap(RoleGuard::allow(&[UserRole::Doctor]))
                    .route(web::get().to(whoami)),
            )
            .service(
                web::resource("/admin")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::get().to(whoami)),
            )
    }

    fn get(path: &str) -> test::TestRequest {
        test::TestRequest::get().uri(path)
    }

    fn authorized(path: &str, role: UserRole) -> test::TestRequest {
        let token = codec().issue(Uuid::new_v4(), role).unwrap();
        get(path).insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
    }

    // Rejections leave the middleware as an Error, so they surface through
    // try_call_service rather than a ServiceResponse
    async fn rejection_status(req: test::TestRequest) -> StatusCode {
        let app = test::init_service(gate_app()).await;
        let err = test::try_call_service(&app, req.to_request())
            .await
            .expect_err("the gate should have rejected this request");
        err.error_response().status()
    }

    #[actix_web::test]
    async fn ungated_route_allows_anonymous_requests() {
        let app = test::init_service(gate_app()).await;
        let resp = test::call_service(&app, get("/open").to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "anonymous");
    }

    #[actix_web::test]
    async fn role_demanding_route_rejects_missing_credentials() {
        assert_eq!(
            rejection_status(get("/admin")).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn gated_route_rejects_empty_bearer_value() {
        let req = get("/any").insert_header((header::AUTHORIZATION, "Bearer "));
        assert_eq!(rejection_status(req).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn gated_route_rejects_wrong_scheme() {
        let req = get("/any").insert_header((header::AUTHORIZATION, "Basic dXNlcjpwdw=="));
        assert_eq!(rejection_status(req).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn gated_route_rejects_garbage_token() {
        let req = get("/any").insert_header((header::AUTHORIZATION, "Bearer not-a-real-token"));
        assert_eq!(rejection_status(req).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn role_outside_declared_set_is_forbidden() {
        let req = authorized("/admin", UserRole::Doctor);
        assert_eq!(rejection_status(req).await, StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn valid_user_token_on_doctor_route_is_forbidden() {
        let req = authorized("/doctor", UserRole::User);
        assert_eq!(rejection_status(req).await, StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn declared_roles_are_admitted() {
        let app = test::init_service(gate_app()).await;

        for role in [UserRole::Admin, UserRole::SuperAdmin] {
            let resp = test::call_service(&app, authorized("/admin", role).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }

    #[actix_web::test]
    async fn empty_policy_route_admits_any_authenticated_role() {
        let app = test::init_service(gate_app()).await;
        let resp = test::call_service(&app, authorized("/any", UserRole::User).to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn empty_policy_route_admits_anonymous_callers() {
        let app = test::init_service(gate_app()).await;
        let resp = test::call_service(&app, get("/any").to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "anonymous");
    }

    #[actix_web::test]
    async fn handler_sees_the_resolved_identity() {
        let app = test::init_service(gate_app()).await;
        let id = Uuid::new_v4();
        let token = codec().issue(id, UserRole::User).unwrap();
        let req = get("/any")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, id.to_string());
    }

    #[actix_web::test]
    async fn expired_token_is_rejected_like_a_missing_one() {
        use crate::handlers::auth::Claims;
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_ref()),
        )
        .unwrap();

        let req = get("/admin").insert_header((header::AUTHORIZATION, format!("Bearer {}", token)));
        assert_eq!(rejection_status(req).await, StatusCode::UNAUTHORIZED);
    }
}
