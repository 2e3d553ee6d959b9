use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Wordmania Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::get_room,
        crate::routes::admin::list_rooms,
        crate::routes::admin::close_room,
        crate::routes::admin::remove_player,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::SessionView,
            crate::dto::session::TeamView,
            crate::dto::session::PlayerView,
            crate::dto::session::RoundView,
            crate::dto::session::TeamClaimsView,
            crate::dto::session::VisibleRoundPhase,
            crate::dto::session::RoundResults,
            crate::dto::session::TeamRoundResult,
            crate::dto::session::JoinResponse,
            crate::dto::session::WordResponse,
            crate::dto::session::SubmitWordResponse,
            crate::dto::session::ScoreResponse,
            crate::dto::admin::RoomListItem,
            crate::dto::admin::RoomTeamSummary,
            crate::dto::admin::CloseRoomRequest,
            crate::dto::admin::ActionResponse,
            crate::dto::ws::RoomRef,
            crate::dto::ws::CreateRoomRequest,
            crate::dto::ws::JoinRoomRequest,
            crate::dto::ws::ReconnectPlayerRequest,
            crate::dto::ws::StartRoundRequest,
            crate::dto::ws::RoundScoreRequest,
            crate::dto::ws::TeamScoreRequest,
            crate::dto::ws::SubmitWordRequest,
            crate::dto::ws::FinalizeRoundRequest,
            crate::dto::ws::RemovePlayerRequest,
            crate::error::ErrorBody,
            crate::state::session::ScoringMode,
            crate::state::session::CloseReason,
            crate::state::round::FinishReason,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Read-only room state"),
        (name = "admin", description = "Administrative room management"),
        (name = "game", description = "WebSocket operations for hosts and players"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_http_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/healthcheck",
            "/rooms/{code}",
            "/admin/rooms",
            "/admin/rooms/{code}/close",
            "/admin/rooms/{code}/players/{client_id}",
            "/ws",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn client_ids_are_documented_as_uuid_strings() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let schemas = &doc["components"]["schemas"];
        for (schema, field) in [
            ("PlayerView", "client_id"),
            ("JoinResponse", "client_id"),
            ("RoundView", "explainer_id"),
            ("RemovePlayerRequest", "client_id"),
        ] {
            let property = &schemas[schema]["properties"][field];
            assert_eq!(property["type"], "string", "{schema}.{field}");
            assert_eq!(property["format"], "uuid", "{schema}.{field}");
        }
        assert_eq!(
            schemas["TeamView"]["properties"]["players"]["items"]["format"],
            "uuid"
        );
    }
}
