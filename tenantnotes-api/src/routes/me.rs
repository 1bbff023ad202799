/// Current user endpoint
///
/// ```text
/// GET /v1/me
/// Authorization: Bearer <token>
/// ```
///
/// ```json
/// { "user_id": 1, "tenant_id": 1, "username": "alice", "tenant_name": "Acme" }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tenantnotes_shared::{auth::middleware::AuthContext, models::tenant::Tenant};

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_id: i32,
    pub tenant_id: i32,
    pub username: String,

    /// Absent if the tenant row has gone
    pub tenant_name: Option<String>,
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let tenant = Tenant::find_by_id(&state.db, auth.tenant_id).await?;

    Ok(Json(MeResponse {
        user_id: auth.user_id,
        tenant_id: auth.tenant_id,
        username: auth.username,
        tenant_name: tenant.map(|t| t.name),
    }))
}
