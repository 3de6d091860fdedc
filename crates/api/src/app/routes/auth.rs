//! Sign-in and sign-out.

use axum::{
    Extension, Json,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::app::dto::{LoginRequest, SignedInResponse};
use crate::app::errors::{access_error_to_response, json_error};
use crate::client;
use crate::context::AccessContext;
use crate::session::SharedSession;

pub async fn login(
    Extension(ctx): Extension<AccessContext>,
    Extension(session): Extension<SharedSession>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Response {
    let user = match ctx.resolver.verify_credentials(&body.name, &body.password).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!(user = %body.name, "sign-in rejected");
            return json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid name or password");
        }
        Err(err) => return access_error_to_response(&err),
    };

    let mut session = session.lock().await;
    session.rotate();

    if let Err(err) = ctx
        .resolver
        .sign_in(&mut *session, &user, &client::user_agent(&headers))
        .await
    {
        return access_error_to_response(&err);
    }

    Json(SignedInResponse::from(&user)).into_response()
}

pub async fn logout(
    Extension(ctx): Extension<AccessContext>,
    Extension(session): Extension<SharedSession>,
) -> StatusCode {
    let mut session = session.lock().await;
    ctx.resolver.sign_out(&mut *session);
    StatusCode::NO_CONTENT
}
