use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;
use url::{Url, form_urlencoded};

use pressline_core::VerifyError;
use pressline_model::{ItemId, ScanAdvance};

use crate::AppState;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ScanUrlQuery {
    #[serde(rename = "itemId")]
    item_id: Option<String>,
}

/// `GET /api/scan-url` — mint a signed scan URL for a board item, ready
/// to be rendered into a printed barcode/QR label.
pub async fn mint_scan_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ScanUrlQuery>,
) -> AppResult<Json<Value>> {
    let item = query
        .item_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("itemId required"))?;
    let item = ItemId::from(item.trim());

    let token = state.signer.issue(&item);
    let base = match &state.config.server.public_base_url {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| AppError::bad_request("missing Host header"))?;
            format!("https://{host}")
        }
    };

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("i", item.as_str())
        .append_pair("ts", &token.timestamp_ms.to_string())
        .append_pair("sig", &token.signature)
        .finish();

    Ok(Json(json!({ "url": format!("{base}/scan?{query}") })))
}

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    i: Option<String>,
    ts: Option<String>,
    sig: Option<String>,
    json: Option<String>,
}

/// `GET /scan` — the endpoint a scanned barcode lands on.
///
/// Verifies the token, advances the scan state, projects the new state
/// onto the board, and answers with an HTML confirmation page (or JSON
/// for the dashboard's fetch path). A downstream board failure reports
/// 500 but the advance is already committed at that point.
pub async fn handle_scan(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
) -> Response {
    let wants_json = query
        .json
        .as_deref()
        .is_some_and(|flag| !flag.is_empty() && flag != "0");

    let (Some(item), Some(ts), Some(sig)) = (query.i, query.ts, query.sig) else {
        return scan_failure(wants_json, StatusCode::BAD_REQUEST, "Invalid scan URL");
    };
    let item = ItemId::from(item);

    match state.signer.verify(&item, &ts, &sig) {
        Ok(()) => {}
        Err(VerifyError::Expired) => {
            return scan_failure(wants_json, StatusCode::FORBIDDEN, "Scan link expired");
        }
        Err(VerifyError::BadSignature) => {
            return scan_failure(wants_json, StatusCode::FORBIDDEN, "Signature check failed");
        }
    }

    if !state.credentials.is_authenticated() {
        return scan_failure(wants_json, StatusCode::UNAUTHORIZED, "Not authenticated");
    }

    let advance = match state.store.advance(&item).await {
        Ok(advance) => advance,
        Err(err) => {
            error!(error = %err, item = %item, "scan advance failed");
            return scan_failure(
                wants_json,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update",
            );
        }
    };

    if let Err(err) = state.column_updater.project(&item, advance.scan_count).await {
        // The advance is committed; only the mirror write failed.
        error!(error = %err, item = %item, "board column update failed after committed advance");
        return scan_failure(
            wants_json,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to update",
        );
    }

    if wants_json {
        Json(json!({
            "ok": true,
            "scan_count": advance.scan_count,
            "status": advance.status,
        }))
        .into_response()
    } else {
        Html(confirmation_page(&advance)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ScannerRequest {
    scan: Option<String>,
}

/// `POST /api/scanner` — raw payloads from a serial scanner device.
///
/// Accepts either the full scan URL or a bare query fragment. A payload
/// without timestamp/signature comes from the trusted floor device and
/// has them re-derived server-side before the usual advance sequence.
pub async fn scanner_device(
    State(state): State<AppState>,
    Json(body): Json<ScannerRequest>,
) -> AppResult<Json<Value>> {
    let raw = body
        .scan
        .as_deref()
        .map(str::trim)
        .filter(|scan| !scan.is_empty())
        .ok_or_else(|| AppError::bad_request("No scan data"))?;

    let params = parse_scan_payload(raw);
    let item = params
        .item
        .filter(|id| !id.is_empty())
        .map(ItemId::from)
        .ok_or_else(|| AppError::bad_request("Invalid scan string - no item id"))?;

    let ts = params
        .ts
        .unwrap_or_else(|| Utc::now().timestamp_millis().to_string());
    let sig = params
        .sig
        .unwrap_or_else(|| state.signer.signature(&item, &ts));

    state.signer.verify(&item, &ts, &sig).map_err(|err| match err {
        VerifyError::Expired => AppError::forbidden("Scan link expired"),
        VerifyError::BadSignature => AppError::forbidden("Signature check failed"),
    })?;

    if !state.credentials.is_authenticated() {
        return Err(AppError::unauthorized(
            "Not authenticated with the board provider",
        ));
    }

    let advance = state.store.advance(&item).await?;

    if let Err(err) = state.column_updater.project(&item, advance.scan_count).await {
        error!(error = %err, item = %item, "board column update failed after committed advance");
        return Err(err.into());
    }

    Ok(Json(json!({
        "ok": true,
        "item": item,
        "scan_count": advance.scan_count,
        "status": advance.status,
    })))
}

/// `GET /api/scan-states` — bulk read used to paint progress pips.
pub async fn scan_states(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let records = state.store.states().await?;
    let mut map = serde_json::Map::new();
    for record in records {
        map.insert(
            record.item_id.into_string(),
            json!({ "scan_count": record.scan_count, "status": record.status }),
        );
    }
    Ok(Json(json!({ "ok": true, "map": map })))
}

#[derive(Debug, Default)]
struct ScanParams {
    item: Option<String>,
    ts: Option<String>,
    sig: Option<String>,
}

fn parse_scan_payload(raw: &str) -> ScanParams {
    fn collect<'a>(pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>) -> ScanParams {
        let mut params = ScanParams::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "i" => params.item = Some(value.into_owned()),
                "ts" => params.ts = Some(value.into_owned()),
                "sig" => params.sig = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    if let Ok(url) = Url::parse(raw) {
        collect(url.query_pairs())
    } else {
        // Bare fragment, possibly still carrying a path prefix.
        let fragment = raw.rsplit_once('?').map(|(_, query)| query).unwrap_or(raw);
        collect(form_urlencoded::parse(fragment.as_bytes()))
    }
}

fn scan_failure(wants_json: bool, status: StatusCode, message: &'static str) -> Response {
    if wants_json {
        (status, Json(json!({ "ok": false, "error": message }))).into_response()
    } else {
        (status, message).into_response()
    }
}

fn confirmation_page(advance: &ScanAdvance) -> String {
    format!(
        "<html><body style=\"font-family:Arial;padding:20px\">\
         <div>Scan recorded</div>\
         <div>Count: {} &mdash; Status: <b>{}</b></div>\
         <script>setTimeout(()=>{{ try{{window.close()}}catch(e){{}} }}, 1200)</script>\
         </body></html>",
        advance.scan_count, advance.status
    )
}
