// =============================================================================
// Presentation API — REST views and WebSocket push over `AppState`
// =============================================================================

pub mod rest;
pub mod ws;
