//! Liveness endpoint (§10.5), grounded in the teacher's ambient use of
//! `axum` for HTTP serving elsewhere in the workspace.

use axum::routing::get;
use axum::Router;

pub fn router() -> Router {
	Router::new().route("/healthz", get(healthz))
}

async fn healthz() -> &'static str {
	"ok"
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::Body;
	use axum::http::{Request, StatusCode};
	use tower::ServiceExt;

	#[tokio::test]
	async fn healthz_returns_200() {
		let app = router();
		let response = app
			.oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
	}
}
