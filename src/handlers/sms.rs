//! Guest SMS notifications

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::notify::{render, Delivery, Language, MessageKind};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsRequest {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub guest_name: String,
    pub day: Option<String>,
    /// Display text for the service, e.g. "12:45"
    pub service: Option<String>,
    pub language: Option<String>,
    pub message_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsTemplates {
    pub languages: Vec<Language>,
    pub types: Vec<MessageKind>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsStatus {
    pub configured: bool,
    pub templates: SmsTemplates,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsSent {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub body: String,
}

/// GET /api/sms
pub async fn sms_status(State(state): State<AppState>) -> Json<ApiResponse<SmsStatus>> {
    Json(ApiResponse::success(SmsStatus {
        configured: state.notifier.is_live(),
        templates: SmsTemplates {
            languages: Language::ALL.to_vec(),
            types: MessageKind::ALL.to_vec(),
        },
    }))
}

/// POST /api/sms
pub async fn send_sms(
    State(state): State<AppState>,
    Json(req): Json<SendSmsRequest>,
) -> AppResult<Json<ApiResponse<SmsSent>>> {
    let to = req.phone_number.trim();
    if to.is_empty() {
        return Err(AppError::Validation("Phone number is required".to_string()));
    }
    let name = req.guest_name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Guest name is required".to_string()));
    }

    let body = render(
        req.language.as_deref().map_or_else(Language::default, Language::parse),
        req.message_type
            .as_deref()
            .map_or_else(MessageKind::default, MessageKind::parse),
        name,
        req.day.as_deref(),
        req.service.as_deref(),
    );

    let delivery = state
        .notifier
        .send(to, &body)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    let message = if delivery.mock {
        "SMS would be sent (provider not configured)"
    } else {
        "SMS sent successfully"
    };
    Ok(Json(ApiResponse {
        code: true,
        message: message.to_string(),
        data: Some(SmsSent { delivery, body }),
    }))
}
