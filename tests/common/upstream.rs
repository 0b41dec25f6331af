//! MockUpstream - in-process stand-in for Spotify, Supabase Storage,
//! Telegram and image hosting

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Bot token the mock Telegram API accepts
pub const BOT_TOKEN: &str = "TEST_TOKEN";

/// Refresh token issued by the authorization code exchange
pub const ISSUED_REFRESH_TOKEN: &str = "issued-refresh-token";

/// File id that getFile does not know
pub const MISSING_FILE_ID: &str = "gone";

/// File id whose download link no longer works
pub const EXPIRED_FILE_ID: &str = "expired";

/// Idle getUpdates calls return after this long
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Shared mock state, inspectable from tests
#[derive(Clone, Default)]
pub struct UpstreamState {
    pub playing: Arc<Mutex<Option<Value>>>,
    pub token_requests: Arc<AtomicUsize>,
    pub reject_tokens: Arc<AtomicBool>,
    /// Extra milliseconds the token endpoint takes
    pub token_delay_ms: Arc<AtomicU64>,
    pub bucket: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    pub reject_uploads: Arc<AtomicBool>,
    pub sent_messages: Arc<Mutex<Vec<(i64, String)>>>,
    /// Batches handed out by getUpdates, one per call
    pub update_batches: Arc<Mutex<VecDeque<Value>>>,
    /// `offset` of every getUpdates call, in order
    pub update_offsets: Arc<Mutex<Vec<i64>>>,
}

impl UpstreamState {
    /// Make the player report a track with the given cover image path
    pub fn play(&self, track_id: &str, cover_url: &str) {
        *self.playing.lock() = Some(json!({
            "is_playing": true,
            "item": {
                "id": track_id,
                "album": { "images": [{ "url": cover_url, "width": 640, "height": 640 }] }
            }
        }));
    }

    pub fn stop(&self) {
        *self.playing.lock() = None;
    }

    /// Queue an array of updates for the next getUpdates call
    pub fn queue_updates(&self, updates: Value) {
        self.update_batches.lock().push_back(updates);
    }
}

/// Running mock server
pub struct MockUpstream {
    pub base_url: String,
    pub state: UpstreamState,
}

impl MockUpstream {
    pub async fn start() -> anyhow::Result<Self> {
        let state = UpstreamState::default();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let router = Router::new()
            .route("/api/token", post(token))
            .route("/v1/me/player/currently-playing", get(currently_playing))
            .route("/v1/me", get(profile))
            .route("/images/{name}", get(image))
            .route("/storage/v1/object/list/{bucket}", post(list_objects))
            .route(
                "/storage/v1/object/public/{bucket}/{*name}",
                get(public_object),
            )
            .route("/storage/v1/object/{bucket}/{*name}", post(upload_object))
            .route(&format!("/bot{}/getUpdates", BOT_TOKEN), post(get_updates))
            .route(&format!("/bot{}/getFile", BOT_TOKEN), post(get_file))
            .route(&format!("/bot{}/sendMessage", BOT_TOKEN), post(send_message))
            .route(
                &format!("/file/bot{}/photos/{{name}}", BOT_TOKEN),
                get(download_file),
            )
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Ok(Self { base_url, state })
    }

    /// URL of a hosted test image
    pub fn image_url(&self, name: &str) -> String {
        format!("{}/images/{}", self.base_url, name)
    }
}

/// Encode an image as PNG
pub fn png(image: RgbImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("PNG encoding");
    bytes.into_inner()
}

/// Solid red square
pub fn red_cover() -> Vec<u8> {
    png(RgbImage::from_pixel(640, 640, Rgb([255, 0, 0])))
}

/// 100x50, blue in the middle 50 columns and red on both sides
pub fn wide_photo() -> Vec<u8> {
    png(RgbImage::from_fn(100, 50, |x, _| {
        if (25..75).contains(&x) {
            Rgb([0, 0, 255])
        } else {
            Rgb([255, 0, 0])
        }
    }))
}

async fn token(
    State(state): State<UpstreamState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = state.token_requests.fetch_add(1, Ordering::SeqCst) + 1;

    // Widen the window for concurrent refreshes
    let delay = 100 + state.token_delay_ms.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(delay)).await;

    if state.reject_tokens.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }

    let mut body = json!({
        "access_token": format!("access-{}", n),
        "token_type": "Bearer",
        "expires_in": 3600,
    });
    if form.get("grant_type").map(String::as_str) == Some("authorization_code") {
        body["refresh_token"] = json!(ISSUED_REFRESH_TOKEN);
    }
    Json(body).into_response()
}

async fn currently_playing(State(state): State<UpstreamState>) -> Response {
    match state.playing.lock().clone() {
        Some(body) => Json(body).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn profile() -> Json<Value> {
    Json(json!({
        "display_name": "Ana",
        "email": "ana@example.com",
        "country": "ES",
        "id": "ana"
    }))
}

async fn image(Path(name): Path<String>) -> Response {
    let bytes = match name.as_str() {
        "cover.png" => red_cover(),
        "wide.png" => wide_photo(),
        "broken.png" => b"definitely not an image".to_vec(),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}

async fn list_objects(
    State(state): State<UpstreamState>,
    Path(_bucket): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let search = body["search"].as_str().unwrap_or("").to_string();
    let offset = body["offset"].as_u64().unwrap_or(0) as usize;
    let limit = body["limit"].as_u64().unwrap_or(100) as usize;

    let bucket = state.bucket.lock();
    let mut names: Vec<&String> = bucket
        .keys()
        .filter(|name| name.contains(&search))
        .collect();
    names.sort();

    let entries: Vec<Value> = names
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|name| (name, &bucket[name]))
        .map(|(name, data)| {
            json!({
                "name": name,
                "created_at": "2024-01-01T00:00:00Z",
                "metadata": { "size": data.len(), "mimetype": "image/jpeg" }
            })
        })
        .collect();
    Json(Value::Array(entries))
}

async fn upload_object(
    State(state): State<UpstreamState>,
    Path((_bucket, name)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    if state.reject_uploads.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "storage unavailable" })),
        )
            .into_response();
    }

    state.bucket.lock().insert(name.clone(), body.to_vec());
    Json(json!({ "Key": name })).into_response()
}

async fn public_object(
    State(state): State<UpstreamState>,
    Path((_bucket, name)): Path<(String, String)>,
) -> Response {
    match state.bucket.lock().get(&name).cloned() {
        Some(data) => data.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_updates(State(state): State<UpstreamState>, Json(body): Json<Value>) -> Json<Value> {
    let offset = body["offset"].as_i64().unwrap_or_default();
    state.update_offsets.lock().push(offset);

    let batch = state.update_batches.lock().pop_front();
    let updates = match batch {
        Some(updates) => updates,
        None => {
            tokio::time::sleep(IDLE_POLL).await;
            json!([])
        }
    };
    Json(json!({ "ok": true, "result": updates }))
}

async fn get_file(Json(body): Json<Value>) -> Response {
    let file_id = body["file_id"].as_str().unwrap_or_default();
    if file_id == MISSING_FILE_ID {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: invalid file_id"
            })),
        )
            .into_response();
    }

    Json(json!({
        "ok": true,
        "result": { "file_id": file_id, "file_path": format!("photos/{}.png", file_id) }
    }))
    .into_response()
}

async fn download_file(Path(name): Path<String>) -> Response {
    if name == format!("{}.png", EXPIRED_FILE_ID) {
        return StatusCode::NOT_FOUND.into_response();
    }
    wide_photo().into_response()
}

async fn send_message(State(state): State<UpstreamState>, Json(body): Json<Value>) -> Json<Value> {
    let chat_id = body["chat_id"].as_i64().unwrap_or_default();
    let text = body["text"].as_str().unwrap_or_default().to_string();
    state.sent_messages.lock().push((chat_id, text.clone()));
    Json(json!({
        "ok": true,
        "result": { "message_id": 1, "chat": { "id": chat_id }, "text": text }
    }))
}
