use super::handlers::{access, filter, health};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Router that also drives the `OpenAPI` document.
///
/// Register endpoints here via `.routes(routes!(...))` so they are served and
/// documented at the same time.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(access::check_password))
        .routes(routes!(access::check_cookie))
        .routes(routes!(access::check_share))
        .routes(routes!(filter::filter));

    let mut gate_tag = Tag::new("gate");
    gate_tag.description = Some("Password challenge, access cookie and content filter".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service health".to_string());

    router.get_openapi_mut().tags = Some(vec![gate_tag, health_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match (author.find('<'), author.rfind('>')) {
        (Some(start), Some(end)) if start < end => {
            let name = optional_str(author[..start].trim());
            let email = optional_str(author[start + 1..end].trim());
            (name, email)
        }
        _ => (optional_str(author), None),
    }
}

fn optional_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_author_splits_name_and_email() {
        assert_eq!(
            parse_author("Team Blogpass <team@blogpass.dev>"),
            (Some("Team Blogpass"), Some("team@blogpass.dev"))
        );
        assert_eq!(parse_author("Solo"), (Some("Solo"), None));
    }

    #[test]
    fn openapi_documents_gate_endpoints() {
        let doc = openapi();
        for path in [
            "/check_password",
            "/check_cookie",
            "/check_share",
            "/v1/filter",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
    }
}
