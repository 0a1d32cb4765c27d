//! Routes for the Initiative bounded context.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use turnkeeper_core::key::ChannelKey;
use turnkeeper_initiative::application::broadcaster::TurnBroadcast;
use turnkeeper_initiative::application::command_handlers::{self, TurnOutcome};
use turnkeeper_initiative::application::query_handlers::{self, InitiativeView};
use turnkeeper_initiative::domain::commands::{self, PromptTicket};
use turnkeeper_initiative::domain::events::TurnEvent;
use turnkeeper_initiative::domain::state::{InitiativeKind, InitiativeRecord};

use crate::error::ApiError;
use crate::state::AppState;

/// Path parameters identifying a channel.
#[derive(Debug, Deserialize)]
pub struct ChannelPath {
    /// The game session.
    pub session_id: String,
    /// The chat channel.
    pub channel_id: String,
}

impl ChannelPath {
    fn key(&self) -> ChannelKey {
        ChannelKey::new(&self.session_id, &self.channel_id)
    }
}

/// Path parameters identifying a participant in a channel's roster.
#[derive(Debug, Deserialize)]
pub struct ParticipantPath {
    /// The game session.
    pub session_id: String,
    /// The chat channel.
    pub channel_id: String,
    /// The participant.
    pub participant_id: String,
}

/// Query string for GET.
#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    /// The user looking at the initiative.
    pub viewer_id: String,
}

/// Query string for DELETE.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    /// The user issuing the command.
    pub user_id: String,
}

/// Request body for POST (setup).
#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    /// The user issuing the command.
    pub user_id: String,
    /// `round_robin` or `popcorn`.
    pub kind: InitiativeKind,
    /// Directory ids to seed the roster with, in order.
    #[serde(default)]
    pub participant_ids: Vec<String>,
}

/// Request body for POST /participants.
#[derive(Debug, Deserialize)]
pub struct AddParticipantRequest {
    /// The user issuing the command.
    pub user_id: String,
    /// Directory id of the participant to add.
    pub participant_id: String,
}

/// Request body for POST /start.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// The user issuing the command.
    pub user_id: String,
}

/// Request body for POST /advance.
#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    /// The user issuing the command.
    pub user_id: String,
    /// The prompt being answered.
    #[serde(default)]
    pub prompt: Option<PromptTicket>,
}

/// Request body for POST /first-pick.
#[derive(Debug, Deserialize)]
pub struct FirstPickRequest {
    /// The user issuing the command.
    pub user_id: String,
    /// Who acts first.
    pub participant_id: String,
    /// The prompt being answered.
    #[serde(default)]
    pub prompt: Option<PromptTicket>,
}

/// Request body for POST /nominate.
#[derive(Debug, Deserialize)]
pub struct NominateRequest {
    /// The user issuing the command.
    pub user_id: String,
    /// Who acts next.
    pub nominee_id: String,
    /// The prompt being answered.
    #[serde(default)]
    pub prompt: Option<PromptTicket>,
}

/// Response body returned after a command is successfully handled.
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    /// The encounter the command acted on.
    pub encounter_id: Uuid,
    /// Stored version after the command.
    pub version: i64,
    /// The stored state.
    #[serde(flatten)]
    pub record: InitiativeRecord,
    /// What happened.
    pub events: Vec<TurnEvent>,
    /// What to announce, what to offer and who may answer.
    pub broadcast: TurnBroadcast,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            encounter_id: outcome.encounter_id,
            version: outcome.version,
            record: outcome.state.to_storage(),
            events: outcome.events,
            broadcast: outcome.broadcast,
        }
    }
}

/// GET /
#[instrument(skip(state, path, query), fields(session_id = %path.session_id, channel_id = %path.channel_id))]
async fn get_initiative(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<InitiativeView>, ApiError> {
    let view =
        query_handlers::get_initiative(&path.key(), &query.viewer_id, &state.collaborators())
            .await?;
    Ok(Json(view))
}

/// POST /
#[instrument(skip(state, path, request), fields(session_id = %path.session_id, channel_id = %path.channel_id))]
async fn setup_initiative(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Json(request): Json<SetupRequest>,
) -> Result<(StatusCode, Json<TurnResponse>), ApiError> {
    let command = commands::SetupInitiative {
        correlation_id: Uuid::new_v4(),
        key: path.key(),
        user_id: request.user_id,
        kind: request.kind,
        participant_ids: request.participant_ids,
    };

    info!(correlation_id = %command.correlation_id, "handling setup_initiative command");

    let outcome =
        command_handlers::handle_setup_initiative(&command, &state.collaborators()).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// DELETE /
#[instrument(skip(state, path, query), fields(session_id = %path.session_id, channel_id = %path.channel_id))]
async fn clear_initiative(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Query(query): Query<UserQuery>,
) -> Result<StatusCode, ApiError> {
    let command = commands::ClearInitiative {
        correlation_id: Uuid::new_v4(),
        key: path.key(),
        user_id: query.user_id,
    };

    info!(correlation_id = %command.correlation_id, "handling clear_initiative command");

    command_handlers::handle_clear_initiative(&command, &state.collaborators()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /participants
#[instrument(skip(state, path, request), fields(session_id = %path.session_id, channel_id = %path.channel_id))]
async fn add_participant(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Json(request): Json<AddParticipantRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let command = commands::AddParticipant {
        correlation_id: Uuid::new_v4(),
        key: path.key(),
        user_id: request.user_id,
        participant_id: request.participant_id,
    };

    info!(correlation_id = %command.correlation_id, "handling add_participant command");

    let outcome =
        command_handlers::handle_add_participant(&command, &state.collaborators()).await?;
    Ok(Json(outcome.into()))
}

/// DELETE /participants/{participant_id}
#[instrument(skip(state, path, query), fields(session_id = %path.session_id, channel_id = %path.channel_id))]
async fn remove_participant(
    State(state): State<AppState>,
    Path(path): Path<ParticipantPath>,
    Query(query): Query<UserQuery>,
) -> Result<Json<TurnResponse>, ApiError> {
    let command = commands::RemoveParticipant {
        correlation_id: Uuid::new_v4(),
        key: ChannelKey::new(path.session_id, path.channel_id),
        user_id: query.user_id,
        participant_id: path.participant_id,
    };

    info!(correlation_id = %command.correlation_id, "handling remove_participant command");

    let outcome =
        command_handlers::handle_remove_participant(&command, &state.collaborators()).await?;
    Ok(Json(outcome.into()))
}

/// POST /start
#[instrument(skip(state, path, request), fields(session_id = %path.session_id, channel_id = %path.channel_id))]
async fn start_round_robin(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Json(request): Json<StartRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let command = commands::StartRoundRobin {
        correlation_id: Uuid::new_v4(),
        key: path.key(),
        user_id: request.user_id,
    };

    info!(correlation_id = %command.correlation_id, "handling start_round_robin command");

    let outcome =
        command_handlers::handle_start_round_robin(&command, &state.collaborators()).await?;
    Ok(Json(outcome.into()))
}

/// POST /advance
#[instrument(skip(state, path, request), fields(session_id = %path.session_id, channel_id = %path.channel_id))]
async fn advance_round_robin(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let command = commands::AdvanceRoundRobin {
        correlation_id: Uuid::new_v4(),
        key: path.key(),
        user_id: request.user_id,
        prompt: request.prompt,
    };

    info!(correlation_id = %command.correlation_id, "handling advance_round_robin command");

    let outcome =
        command_handlers::handle_advance_round_robin(&command, &state.collaborators()).await?;
    Ok(Json(outcome.into()))
}

/// POST /first-pick
#[instrument(skip(state, path, request), fields(session_id = %path.session_id, channel_id = %path.channel_id))]
async fn first_pick_popcorn(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Json(request): Json<FirstPickRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let command = commands::FirstPickPopcorn {
        correlation_id: Uuid::new_v4(),
        key: path.key(),
        user_id: request.user_id,
        participant_id: request.participant_id,
        prompt: request.prompt,
    };

    info!(correlation_id = %command.correlation_id, "handling first_pick_popcorn command");

    let outcome =
        command_handlers::handle_first_pick_popcorn(&command, &state.collaborators()).await?;
    Ok(Json(outcome.into()))
}

/// POST /nominate
#[instrument(skip(state, path, request), fields(session_id = %path.session_id, channel_id = %path.channel_id))]
async fn advance_popcorn(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Json(request): Json<NominateRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let command = commands::AdvancePopcorn {
        correlation_id: Uuid::new_v4(),
        key: path.key(),
        user_id: request.user_id,
        nominee_id: request.nominee_id,
        prompt: request.prompt,
    };

    info!(correlation_id = %command.correlation_id, "handling advance_popcorn command");

    let outcome =
        command_handlers::handle_advance_popcorn(&command, &state.collaborators()).await?;
    Ok(Json(outcome.into()))
}

/// Returns the router for the initiative context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/sessions/{session_id}/channels/{channel_id}/initiative",
            get(get_initiative)
                .post(setup_initiative)
                .delete(clear_initiative),
        )
        .route(
            "/api/v1/sessions/{session_id}/channels/{channel_id}/initiative/participants",
            post(add_participant),
        )
        .route(
            "/api/v1/sessions/{session_id}/channels/{channel_id}/initiative/participants/{participant_id}",
            delete(remove_participant),
        )
        .route(
            "/api/v1/sessions/{session_id}/channels/{channel_id}/initiative/start",
            post(start_round_robin),
        )
        .route(
            "/api/v1/sessions/{session_id}/channels/{channel_id}/initiative/advance",
            post(advance_round_robin),
        )
        .route(
            "/api/v1/sessions/{session_id}/channels/{channel_id}/initiative/first-pick",
            post(first_pick_popcorn),
        )
        .route(
            "/api/v1/sessions/{session_id}/channels/{channel_id}/initiative/nominate",
            post(advance_popcorn),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use chrono::TimeDelta;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;
    use turnkeeper_core::repository::StateRepository;
    use turnkeeper_initiative::domain::participant::Participant;
    use turnkeeper_initiative::domain::state::InitiativeState;
    use turnkeeper_test_support::{
        FailingStateRepository, FixedClock, InMemoryParticipantDirectory,
        InMemoryStateRepository, StaticPermissionOracle, fixed_now,
    };

    const BASE: &str = "/api/v1/sessions/s-1/channels/c-1/initiative";

    fn app_state_with(repo: Arc<dyn StateRepository>) -> AppState {
        AppState::new(
            Arc::new(FixedClock(fixed_now())),
            repo,
            Arc::new(StaticPermissionOracle::new().with_gm("s-1", "u-gm")),
            Arc::new(
                InMemoryParticipantDirectory::new()
                    .with_entry("s-1", "a", "Aria", Some("u-a"))
                    .with_entry("s-1", "b", "Bram", Some("u-b")),
            ),
            TimeDelta::seconds(180),
        )
    }

    fn seeded_repo(kind: InitiativeKind) -> Arc<InMemoryStateRepository> {
        let state = InitiativeState::new(
            kind,
            vec![
                Participant::new("a", "Aria", Some("u-a")),
                Participant::new("b", "Bram", Some("u-b")),
            ],
        );
        Arc::new(InMemoryStateRepository::new().with_record(
            &ChannelKey::new("s-1", "c-1"),
            state.to_payload().unwrap(),
            1,
        ))
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_setup_returns_201_with_awaiting_gm_broadcast() {
        // Arrange
        let repo = Arc::new(InMemoryStateRepository::new());
        let app = router().with_state(app_state_with(repo.clone()));
        let body = serde_json::json!({
            "user_id": "u-gm",
            "kind": "popcorn",
            "participant_ids": ["a", "b"]
        });

        // Act
        let response = app.oneshot(json_request("POST", BASE, &body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["kind"], "popcorn");
        assert_eq!(json["version"], 1);
        assert_eq!(json["broadcast"]["message"], "GM: Pick who goes first.");
        assert_eq!(json["broadcast"]["prompt"]["kind"], "first_pick");
        assert_eq!(repo.saves().len(), 1);
    }

    #[tokio::test]
    async fn test_start_returns_200_with_turn_and_prompt() {
        // Arrange
        let app = router().with_state(app_state_with(seeded_repo(InitiativeKind::RoundRobin)));
        let body = serde_json::json!({ "user_id": "u-gm" });

        // Act
        let response = app
            .oneshot(json_request("POST", &format!("{BASE}/start"), &body))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["is_started"], true);
        assert_eq!(json["current"], "a");
        assert_eq!(json["events"][0]["type"], "initiative_started");
        assert_eq!(
            json["broadcast"]["message"],
            "🔔 It's now **Aria**'s turn! (Round 1)"
        );
        assert_eq!(json["broadcast"]["prompt"]["state_version"], 2);
    }

    #[tokio::test]
    async fn test_advance_by_non_owner_returns_403() {
        // Arrange
        let state = app_state_with(seeded_repo(InitiativeKind::RoundRobin));
        router()
            .with_state(state.clone())
            .oneshot(json_request(
                "POST",
                &format!("{BASE}/start"),
                &serde_json::json!({ "user_id": "u-gm" }),
            ))
            .await
            .unwrap();
        let app = router().with_state(state);

        // Act
        let response = app
            .oneshot(json_request(
                "POST",
                &format!("{BASE}/advance"),
                &serde_json::json!({ "user_id": "u-b" }),
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["error"], "not_authorized");
    }

    #[tokio::test]
    async fn test_advance_before_start_returns_409() {
        // Arrange
        let app = router().with_state(app_state_with(seeded_repo(InitiativeKind::RoundRobin)));

        // Act
        let response = app
            .oneshot(json_request(
                "POST",
                &format!("{BASE}/advance"),
                &serde_json::json!({ "user_id": "u-gm" }),
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"], "not_yet_started");
    }

    #[tokio::test]
    async fn test_nominate_outside_roster_returns_422_with_legal_set() {
        // Arrange
        let state = app_state_with(seeded_repo(InitiativeKind::Popcorn));
        router()
            .with_state(state.clone())
            .oneshot(json_request(
                "POST",
                &format!("{BASE}/first-pick"),
                &serde_json::json!({ "user_id": "u-gm", "participant_id": "a" }),
            ))
            .await
            .unwrap();
        let app = router().with_state(state);

        // Act
        let response = app
            .oneshot(json_request(
                "POST",
                &format!("{BASE}/nominate"),
                &serde_json::json!({ "user_id": "u-a", "nominee_id": "zed" }),
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_nominee");
        assert_eq!(json["legal"], serde_json::json!(["b"]));
    }

    #[tokio::test]
    async fn test_expired_prompt_returns_410() {
        // Arrange
        let app = router().with_state(app_state_with(seeded_repo(InitiativeKind::RoundRobin)));
        let issued_at = fixed_now() - TimeDelta::minutes(10);
        let body = serde_json::json!({
            "user_id": "u-gm",
            "prompt": {
                "encounter_id": Uuid::nil(),
                "state_version": 1,
                "issued_at": issued_at
            }
        });

        // Act
        let response = app
            .oneshot(json_request("POST", &format!("{BASE}/advance"), &body))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(body_json(response).await["error"], "prompt_expired");
    }

    #[tokio::test]
    async fn test_get_returns_view_for_viewer() {
        // Arrange
        let app = router().with_state(app_state_with(seeded_repo(InitiativeKind::RoundRobin)));
        let request = Request::builder()
            .uri(format!("{BASE}?viewer_id=u-gm"))
            .body(Body::empty())
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["session_id"], "s-1");
        assert_eq!(json["channel_id"], "c-1");
        assert_eq!(json["viewer_may_act"], true);
        assert_eq!(json["participants"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_unknown_channel_returns_404() {
        // Arrange
        let app = router().with_state(app_state_with(Arc::new(InMemoryStateRepository::new())));
        let request = Request::builder()
            .uri(format!("{BASE}?viewer_id=u-gm"))
            .body(Body::empty())
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "initiative_not_found");
    }

    #[tokio::test]
    async fn test_add_and_remove_participant() {
        // Arrange
        let state = app_state_with(seeded_repo(InitiativeKind::RoundRobin));
        let remove = Request::builder()
            .method("DELETE")
            .uri(format!("{BASE}/participants/a?user_id=u-gm"))
            .body(Body::empty())
            .unwrap();

        // Act
        let duplicate = router()
            .with_state(state.clone())
            .oneshot(json_request(
                "POST",
                &format!("{BASE}/participants"),
                &serde_json::json!({ "user_id": "u-gm", "participant_id": "a" }),
            ))
            .await
            .unwrap();
        let removed = router().with_state(state).oneshot(remove).await.unwrap();

        // Assert
        assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
        assert_eq!(removed.status(), StatusCode::OK);
        let json = body_json(removed).await;
        assert_eq!(json["participants"].as_array().unwrap().len(), 1);
        assert_eq!(json["events"][0]["type"], "participant_removed");
    }

    #[tokio::test]
    async fn test_clear_returns_204_then_404() {
        // Arrange
        let state = app_state_with(seeded_repo(InitiativeKind::Popcorn));
        let clear = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("{BASE}?user_id=u-gm"))
                .body(Body::empty())
                .unwrap()
        };

        // Act
        let first = router()
            .with_state(state.clone())
            .oneshot(clear())
            .await
            .unwrap();
        let second = router().with_state(state).oneshot(clear()).await.unwrap();

        // Assert
        assert_eq!(first.status(), StatusCode::NO_CONTENT);
        assert_eq!(second.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_setup_with_unknown_kind_returns_422() {
        // Arrange
        let app = router().with_state(app_state_with(Arc::new(InMemoryStateRepository::new())));
        let body = serde_json::json!({ "user_id": "u-gm", "kind": "side_initiative" });

        // Act
        let response = app.oneshot(json_request("POST", BASE, &body)).await.unwrap();

        // Assert: Axum returns 422 for deserialization failures.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_start_returns_500_when_repository_fails() {
        // Arrange
        let app = router().with_state(app_state_with(Arc::new(FailingStateRepository)));

        // Act
        let response = app
            .oneshot(json_request(
                "POST",
                &format!("{BASE}/start"),
                &serde_json::json!({ "user_id": "u-gm" }),
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "infrastructure_error");
    }
}
