use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Live Exam Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sessions::create_session,
        crate::routes::sessions::join_session,
        crate::routes::sessions::session_state,
        crate::routes::host::start,
        crate::routes::host::end_question,
        crate::routes::host::next_question,
        crate::routes::host::finish,
        crate::routes::host::delete_session,
        crate::routes::sse::lobby_stream,
        crate::routes::sse::play_stream,
        crate::routes::websocket::lobby_socket,
        crate::routes::websocket::play_socket,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::QuestionInput,
            crate::dto::session::OptionInput,
            crate::dto::session::CreateSessionResponse,
            crate::dto::session::JoinRequest,
            crate::dto::session::JoinResponse,
            crate::dto::host::HostCommand,
            crate::dto::host::StartRequest,
            crate::dto::host::CommandResponse,
            crate::dto::public::SessionStateResponse,
            crate::dto::phase::VisiblePhase,
            crate::dto::phase::VisibleFinishReason,
            crate::dto::common::QuestionView,
            crate::dto::common::OptionView,
            crate::dto::common::LobbyPlayer,
            crate::dto::common::LeaderboardEntry,
            crate::dto::common::ResultEntry,
            crate::dto::ws::Role,
            crate::dto::ws::InboundMessage,
            crate::dto::ws::LobbyStatePayload,
            crate::dto::ws::GameStartedPayload,
            crate::dto::ws::QuestionPublishedPayload,
            crate::dto::ws::AnswerProgressPayload,
            crate::dto::ws::RevealPayload,
            crate::dto::ws::FinishedPayload,
            crate::dto::ws::AnswerAcceptedPayload,
            crate::dto::ws::MyResultPayload,
            crate::dto::ws::ErrorPayload,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Session provisioning, joins and recovery"),
        (name = "host", description = "Host commands, authenticated by the X-Host-Token header"),
        (name = "sse", description = "Server-sent events streams for spectators"),
        (name = "sockets", description = "WebSocket lobby and play channels"),
    )
)]
pub struct ApiDoc;
