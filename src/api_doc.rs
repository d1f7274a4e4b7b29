use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Security scheme configuration for OpenAPI
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// API documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Realtime Social Backend API",
        version = "0.1.0",
        description = "Notification and realtime fan-out API for the social backend"
    ),
    paths(
        // Health check endpoints
        crate::routes::health::health_check,
        crate::routes::health::protected_health_check,
        // Notification endpoints
        crate::notification::controller::list_notifications,
        crate::notification::controller::unread_count,
        crate::notification::controller::mark_as_read,
        crate::notification::controller::mark_all_as_read,
        // Social write endpoints
        crate::social::controller::create_micropost,
        crate::social::controller::create_comment,
        crate::social::controller::react,
        crate::social::controller::share,
        crate::social::controller::follow,
        crate::social::controller::unfollow
    ),
    components(
        schemas(
            // Health schemas
            crate::routes::health::HealthResponse,
            // Notification schemas
            crate::notification::model::Notification,
            crate::notification::model::NotificationResponse,
            crate::notification::model::NotificationsListResponse,
            crate::notification::model::UnreadCountResponse,
            crate::notification::model::MarkReadResponse,
            crate::notification::model::MarkAllReadResponse,
            crate::notification::model::ActorSummary,
            crate::notification::model::NotifiableBrief,
            crate::notification::model::ReadFilter,
            crate::notification::model::NotificationErrorResponse,
            // Social schemas
            crate::social::model::Micropost,
            crate::social::model::Comment,
            crate::social::model::Reaction,
            crate::social::model::Follow,
            crate::social::model::Share,
            crate::social::model::CreateMicropostRequest,
            crate::social::model::CreateCommentRequest,
            crate::social::model::ReactionRequest,
            crate::social::model::SocialErrorResponse,
            // External type schemas
            crate::schema_ext::DateTimeWrapper,
            crate::schema_ext::UuidWrapper
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "notifications", description = "Notification store and realtime endpoints"),
        (name = "social", description = "Notification-worthy social write endpoints")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;
