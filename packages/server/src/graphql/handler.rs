use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::extractors::json::AppJson;
use crate::state::AppState;

/// Execute a GraphQL request (`{query, variables, operationName}`).
#[instrument(skip_all, fields(operation = request.operation_name.as_deref()))]
pub async fn graphql_handler(
    State(state): State<AppState>,
    AppJson(request): AppJson<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    Json(state.schema.execute(request).await)
}
