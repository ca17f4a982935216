//! `POST /api/graphql`: the single query endpoint.

use axum::{Json, extract::State};
use staffsite_core::{
  graphql::{GraphqlRequest, GraphqlResponse},
  store::SiteStore,
};

use crate::{AppState, auth::CurrentUser, operation};

/// Once the envelope parses, the answer is always HTTP 200; failures travel
/// in the `errors` list.
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  CurrentUser(identity): CurrentUser,
  Json(request): Json<GraphqlRequest>,
) -> Json<GraphqlResponse>
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  Json(operation::execute(&state, identity.as_ref(), request).await)
}
