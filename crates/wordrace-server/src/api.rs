use axum::extract::{Path, State};
use axum::response::Json;

use wordrace_core::room::RoomView;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/v1/rooms/{room_id}: sanitized state of an active room.
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomView>, AppError> {
    let rooms = state.rooms.read().await;
    rooms
        .room_view(&room_id)
        .map(Json)
        .ok_or(AppError::RoomNotFound(room_id))
}
