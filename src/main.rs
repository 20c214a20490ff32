//! CloudOffice 실시간 조정 서버

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use cloudoffice_realtime_rs::config::Config;
use cloudoffice_realtime_rs::error::{CoreError, CoreResult};
use cloudoffice_realtime_rs::handlers::{self, api};
use cloudoffice_realtime_rs::model::{ConnectionId, UserId};
use cloudoffice_realtime_rs::protocol::{ClientMessage, ServerMessage};
use cloudoffice_realtime_rs::state::AppState;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = Arc::new(AppState::new(config.clone()));

    // 유휴 프레즌스 정리 스케줄러
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let interval_secs = sweep_state.config.presence.sweep_interval_secs;
        let away_after =
            chrono::Duration::seconds(sweep_state.config.presence.away_timeout_secs as i64);
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let swept = sweep_state.presence.sweep_idle(away_after);
            if swept > 0 {
                tracing::info!(swept = swept, "Marked idle users as away");
            }
        }
    });

    // CORS 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/api/users", post(api::create_user))
        .route("/api/spaces", post(api::create_space))
        .route("/api/zones", post(api::create_zone))
        .route("/api/spaces/:space_id/zones", get(api::list_space_zones))
        .route("/api/spaces/:space_id/rooms", get(api::list_space_rooms))
        .route("/api/rooms", post(api::create_room))
        .route(
            "/api/rooms/:room_id",
            get(api::get_room).put(api::update_room).delete(api::delete_room),
        )
        .route("/api/sessions", post(api::create_session))
        .route("/api/sessions/:session_id", get(api::get_session))
        .route("/api/sessions/:session_id/start", post(api::start_session))
        .route("/api/sessions/:session_id/end", post(api::end_session))
        .route("/api/sessions/:session_id/cancel", post(api::cancel_session))
        .route(
            "/api/sessions/:session_id/participants",
            get(api::list_participants),
        )
        .route(
            "/api/sessions/:session_id/recordings",
            get(api::list_recordings).post(api::start_recording),
        )
        .route("/api/recordings/:recording_id/stop", post(api::stop_recording))
        .route("/api/recordings/:recording_id/share", post(api::share_recording))
        .layer(cors)
        .with_state(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 CloudOffice Realtime Server started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html("<h1>CloudOffice Realtime Server</h1><p>WebSocket endpoint: /ws</p>")
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": "cloudoffice-realtime-rs",
        "timestamp": chrono::Utc::now().timestamp()
    }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // 연결 처리
    let connection_id = handlers::handle_connection(&tx);

    // 송신 태스크
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    // 수신 처리
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Ok(msg) = serde_json::from_str::<ClientMessage>(&text) {
                    handle_client_message(&state, connection_id, &tx, msg).await;
                }
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    // 연결 해제
    handlers::handle_disconnect(&state, connection_id);
    send_task.abort();
}

async fn handle_client_message(
    state: &Arc<AppState>,
    connection_id: ConnectionId,
    sender: &mpsc::UnboundedSender<ServerMessage>,
    msg: ClientMessage,
) {
    if let Err(err) = dispatch(state, connection_id, sender, msg).await {
        // 실패한 변경은 상태를 건드리지 않고 호출자에게만 알린다
        let _ = sender.send(ServerMessage::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        });
    }
}

async fn dispatch(
    state: &Arc<AppState>,
    connection_id: ConnectionId,
    sender: &mpsc::UnboundedSender<ServerMessage>,
    msg: ClientMessage,
) -> CoreResult<()> {
    match msg {
        ClientMessage::Heartbeat => {
            handlers::handle_heartbeat(sender);
            Ok(())
        }
        ClientMessage::Connect { user_id } => {
            handlers::handle_connect(state, connection_id, user_id, sender)
        }
        ClientMessage::SpaceJoin { space_id } => {
            let user_id = bound_user(state, connection_id)?;
            handlers::handle_space_join(state, user_id, space_id);
            Ok(())
        }
        ClientMessage::SpaceLeave { space_id } => {
            let user_id = bound_user(state, connection_id)?;
            handlers::handle_space_leave(state, user_id, space_id);
            Ok(())
        }
        ClientMessage::PositionUpdate {
            space_id,
            zone_id,
            x,
            y,
        } => {
            let user_id = bound_user(state, connection_id)?;
            handlers::handle_position_update(state, user_id, space_id, zone_id, x, y)
        }
        ClientMessage::SessionJoin {
            session_id,
            display_name,
            role,
            audio_on,
            video_on,
        } => {
            let user_id = bound_user(state, connection_id)?;
            handlers::handle_session_join(
                state,
                user_id,
                session_id,
                display_name,
                role,
                audio_on,
                video_on,
            )
            .await
        }
        ClientMessage::SessionLeave { session_id } => {
            let user_id = bound_user(state, connection_id)?;
            handlers::handle_session_leave(state, user_id, session_id).await
        }
        ClientMessage::ParticipantStatus {
            session_id,
            audio_on,
            video_on,
        } => {
            let user_id = bound_user(state, connection_id)?;
            handlers::handle_participant_status(state, user_id, session_id, audio_on, video_on)
                .await
        }
        ClientMessage::HostAction {
            session_id,
            action,
            target_user_id,
        } => {
            let user_id = bound_user(state, connection_id)?;
            handlers::handle_host_action(state, user_id, session_id, action, target_user_id).await
        }
        ClientMessage::ChatMessage { session_id, text } => {
            let user_id = bound_user(state, connection_id)?;
            handlers::handle_chat(state, user_id, session_id, text).await
        }
        ClientMessage::HandRaise {
            session_id,
            is_raised,
        } => {
            let user_id = bound_user(state, connection_id)?;
            handlers::handle_hand_raise(state, user_id, session_id, is_raised).await
        }
    }
}

/// 연결에 바인딩된 사용자 조회. connect 이전의 이벤트는 거부된다
fn bound_user(state: &Arc<AppState>, connection_id: ConnectionId) -> CoreResult<UserId> {
    state
        .connections
        .user_of(connection_id)
        .ok_or_else(|| CoreError::PermissionDenied("connection is not bound to a user".to_string()))
}
