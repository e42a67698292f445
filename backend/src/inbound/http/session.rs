//! Session cookie access for handlers.
//!
//! Handlers never touch `actix_session` directly: they extract a
//! [`SessionContext`] and ask it for the signed-in user.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{Error, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Session wrapper exposing the authenticated identity.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Wrap an Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Store `user_id` as the signed-in user.
    pub fn persist_user(&self, user_id: &UserId) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, user_id.to_string())
            .map_err(|err| Error::internal(format!("failed to persist session: {err}")))
    }

    /// Forget the signed-in user.
    pub fn clear(&self) {
        self.0.purge();
    }

    /// The signed-in user, if any. A tampered value counts as signed out.
    pub fn user_id(&self) -> Result<Option<UserId>, Error> {
        let raw = self
            .0
            .get::<String>(USER_ID_KEY)
            .map_err(|err| Error::internal(format!("failed to read session: {err}")))?;
        Ok(raw.and_then(|value| {
            UserId::new(&value)
                .inspect_err(|err| warn!(error = %err, "ignoring malformed session user id"))
                .ok()
        }))
    }

    /// The signed-in user or `401 login required`.
    pub fn require_user_id(&self) -> Result<UserId, Error> {
        self.user_id()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Audit actor for writes made in this session.
    pub fn actor(&self) -> Result<String, Error> {
        self.require_user_id().map(|id| id.to_string())
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(Self::new) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::test_session_middleware;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};

    const USER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    async fn sign_in(session: SessionContext) -> Result<HttpResponse, Error> {
        let id = UserId::new(USER)
            .map_err(|err| Error::internal(err.to_string()))?;
        session.persist_user(&id)?;
        Ok(HttpResponse::Ok().finish())
    }

    async fn whoami(session: SessionContext) -> Result<HttpResponse, Error> {
        Ok(HttpResponse::Ok().body(session.actor()?))
    }

    #[actix_web::test]
    async fn signed_in_user_round_trips() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route("/in", web::post().to(sign_in))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::post().uri("/in").to_request()).await;
        let cookie = res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie")
            .into_owned();

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/me").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, USER);
    }

    #[actix_web::test]
    async fn anonymous_requests_are_unauthorised() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route("/me", web::get().to(whoami)),
        )
        .await;
        let res = test::call_service(&app, test::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn malformed_ids_are_treated_as_signed_out() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/tamper",
                    web::post().to(|session: Session| async move {
                        session
                            .insert(USER_ID_KEY, "not-a-uuid")
                            .map_err(actix_web::Error::from)?;
                        Ok::<_, actix_web::Error>(HttpResponse::Ok().finish())
                    }),
                )
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let res =
            test::call_service(&app, test::TestRequest::post().uri("/tamper").to_request()).await;
        let cookie = res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie")
            .into_owned();
        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/me").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
