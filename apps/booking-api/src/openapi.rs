use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers the `bearer_auth` scheme referenced by protected operations.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Booking API",
        version = "0.1.0",
        description = "Capacity-limited event booking with payment reconciliation"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    modifiers(&BearerAuth)
)]
struct BaseDoc;

/// Booking routes are mounted directly under `/api`, so their documented
/// paths merge in without a nest prefix.
pub struct ApiDoc;

impl OpenApi for ApiDoc {
    fn openapi() -> utoipa::openapi::OpenApi {
        let mut doc = BaseDoc::openapi();
        doc.merge(domain_bookings::ApiDoc::openapi());
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_includes_booking_paths_and_security() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/events/{id}/book"));
        assert!(doc.paths.paths.contains_key("/payments/callback"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("ErrorResponse"));
        assert!(components.schemas.contains_key("Booking"));
    }
}
