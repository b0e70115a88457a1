//! Request handlers module

pub mod assignments;
pub mod chairs;
pub mod groups;
pub mod guests;
pub mod presence;
pub mod seating;
pub mod sms;
pub mod sync;
pub mod tables;

use serde::Deserialize;

use crate::ledger::ServiceId;

/// `?id=` on delete routes
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: i32,
}

/// `?day=&serviceId=` naming one slot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub day: String,
    pub service_id: ServiceId,
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    /// Send one request through the router and decode the JSON body
    pub async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}
