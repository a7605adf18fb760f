//! Request extractors whose rejections use the action error envelope instead of
//! axum's plain-text bodies.
use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ActionError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ActionError))]
pub struct Json<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ActionError))]
pub struct Path<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ActionError))]
pub struct Query<T>(pub T);

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::IntoResponse,
    };
    use serde_json::Value;

    use super::*;
    use crate::workflow::{payload::BatchPayload, queue::QueueQuery};

    async fn body_of(err: ActionError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/registrations/batches")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn a_bad_attendee_field_is_reported_against_its_path() {
        let body = r#"{"attendees":[
            {"fullName":"Ana Reyes","age":16,"gender":"FEMALE","personType":"DELEGATE"},
            {"fullName":"Ben Cruz","age":17,"gender":"OTHER","personType":"DELEGATE"}
        ]}"#;
        let err = Json::<BatchPayload>::from_request(json_request(body), &())
            .await
            .expect_err("unknown gender");

        let (status, json) = body_of(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["success"], false);
        let message = json["fields"]["attendees[1].gender"][0]
            .as_str()
            .expect("message for the gender field");
        assert!(message.contains("unknown variant"), "{message}");
    }

    #[tokio::test]
    async fn malformed_json_still_gets_the_envelope() {
        let err = Json::<BatchPayload>::from_request(json_request("{\"attendees\": ["), &())
            .await
            .expect_err("truncated body");

        let (status, json) = body_of(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["success"], false);
        assert!(json["fields"]["body"].is_array(), "{json}");
    }

    #[tokio::test]
    async fn unreadable_paging_is_an_invalid_filter() {
        let request = Request::builder()
            .uri("/review/queue?page=x")
            .body(Body::empty())
            .expect("request");
        let (mut parts, _) = request.into_parts();
        let err = Query::<QueueQuery>::from_request_parts(&mut parts, &())
            .await
            .expect_err("page is not a number");

        let (status, json) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(
            json["error"].as_str().is_some_and(|e| e.starts_with("Invalid filter")),
            "{json}"
        );
    }
}
