/// Admin service for room management operations.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Periodic inactivity sweep.
pub mod janitor;
/// Room lifecycle notifications.
pub mod notifier;
/// Dispatch of WebSocket operations to the registry.
pub mod room_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
/// Words for the active party.
pub mod word_source;
