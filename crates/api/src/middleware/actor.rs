//! Acting user extraction.
//!
//! Authentication happens at the gateway, which forwards the user and the
//! location they work at as headers. Requests without them are rejected.

use axum::{extract::FromRequestParts, http::request::Parts};
use tuition_core::ActorContext;
use tuition_shared::types::{LocationId, UserId};

use crate::error::ApiError;

/// Header carrying the acting user id.
pub const ACTOR_HEADER: &str = "x-actor-id";
/// Header carrying the location id.
pub const LOCATION_HEADER: &str = "x-location-id";
/// Optional header carrying a display name for audit messages.
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// Extractor for the acting user.
///
/// ```ignore
/// async fn handler(Actor(actor): Actor) -> impl IntoResponse {
///     let user_id = actor.user_id;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Actor(pub ActorContext);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id: UserId = header(parts, ACTOR_HEADER)
            .ok_or_else(|| ApiError::unauthorized(format!("{ACTOR_HEADER} header is required")))?
            .parse()
            .map_err(|_| ApiError::unauthorized(format!("{ACTOR_HEADER} is not a valid id")))?;
        let location_id: LocationId = header(parts, LOCATION_HEADER)
            .ok_or_else(|| {
                ApiError::unauthorized(format!("{LOCATION_HEADER} header is required"))
            })?
            .parse()
            .map_err(|_| ApiError::unauthorized(format!("{LOCATION_HEADER} is not a valid id")))?;

        let mut actor = ActorContext::new(user_id, location_id);
        actor.name = header(parts, ACTOR_NAME_HEADER).map(str::to_string);
        Ok(Self(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use uuid::Uuid;

    async fn extract(builder: axum::http::request::Builder) -> Result<Actor, ApiError> {
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_actor_and_location() {
        let user = Uuid::now_v7();
        let location = Uuid::now_v7();
        let Actor(actor) = extract(
            Request::builder()
                .header(ACTOR_HEADER, user.to_string())
                .header(LOCATION_HEADER, location.to_string())
                .header(ACTOR_NAME_HEADER, "Front desk"),
        )
        .await
        .unwrap();

        assert_eq!(actor.user_id.into_inner(), user);
        assert_eq!(actor.location_id.into_inner(), location);
        assert_eq!(actor.name.as_deref(), Some("Front desk"));
    }

    #[tokio::test]
    async fn test_missing_location_is_unauthorized() {
        let err = extract(Request::builder().header(ACTOR_HEADER, Uuid::now_v7().to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_actor_is_unauthorized() {
        let err = extract(
            Request::builder()
                .header(ACTOR_HEADER, "front-desk")
                .header(LOCATION_HEADER, Uuid::now_v7().to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
