use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::{require_auth, resolve_user};
use crate::{posts, subs, users, votes};

/// Assemble the full router. Three tiers: open routes run bare, viewer-
/// optional routes run behind the permissive resolve stage alone, and
/// protected routes run behind resolve-then-gate in that fixed order.
pub fn build_router(state: AppState) -> Router {
    let open = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/subs/sub/topSubs", get(subs::top_subs))
        .with_state(state.clone());

    let viewer_optional = Router::new()
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/users/{username}", get(users::get_user_activity))
        .layer(from_fn_with_state(state.clone(), resolve_user))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/subs", post(subs::create_sub))
        .route("/posts", post(posts::create_post))
        .route("/posts/{post_id}/comments", post(posts::create_comment))
        .route("/votes", post(votes::cast_vote))
        // Outermost layer runs first: resolve, then the gate.
        .layer(from_fn(require_auth))
        .layer(from_fn_with_state(state.clone(), resolve_user))
        .with_state(state);

    Router::new()
        .merge(open)
        .merge(viewer_optional)
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
