use axum::Json;

use crate::auth::AuthenticatedUser;

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}
