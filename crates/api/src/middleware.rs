use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use warden_auth::{AccessDecision, ClientInfo, Identity};
use warden_core::{AccessError, AccessResult};

use crate::app::errors::access_error_to_response;
use crate::client;
use crate::context::AccessContext;
use crate::session::SharedSession;

/// Gate every request on the access-control decision.
///
/// The caller's [`Identity`] is resolved first and inserted into request
/// extensions; anonymous when no session layer is installed.
pub async fn access_middleware(
    State(ctx): State<AccessContext>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let client = client::client_info(&req, ctx.trust_proxy_headers);
    let session = req.extensions().get::<SharedSession>().cloned();
    let path = req.uri().path().to_string();

    let outcome = tokio::time::timeout(ctx.decision_timeout, decide(&ctx, session, &client, &path)).await;

    let (identity, decision) = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            error!(error = %err, path = %path, "access decision failed");
            return access_error_to_response(&err);
        }
        Err(_) => {
            warn!(path = %path, timeout_ms = ctx.decision_timeout.as_millis() as u64, "access decision timed out");
            return access_error_to_response(&AccessError::Timeout);
        }
    };

    debug!(path = %path, user = identity.name(), decision = ?decision, "access decided");
    req.extensions_mut().insert(identity);

    match decision {
        AccessDecision::Allow => next.run(req).await,
        AccessDecision::Unauthorized => ctx.responders.unauthorized(),
        AccessDecision::Forbidden => ctx.responders.forbidden(),
    }
}

async fn decide(
    ctx: &AccessContext,
    session: Option<SharedSession>,
    client: &ClientInfo,
    path: &str,
) -> AccessResult<(Identity, AccessDecision)> {
    let identity = match session {
        Some(session) => {
            let mut session = session.lock().await;
            ctx.resolver.authenticate(&mut *session, &client.user_agent).await
        }
        None => Identity::anonymous(),
    };

    let permission = ctx.routes.permission_for(path);
    let decision = ctx.access.decide(&identity, client, permission).await?;

    Ok((identity, decision))
}
