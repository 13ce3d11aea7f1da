/// Content-Type returned when no rule in the table matches.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Default extension-to-MIME rules, in match priority order.
///
/// Note `.json` comes before `.js`: matching is by substring, so the
/// order decides which rule wins for names containing both.
pub const DEFAULT_CONTENT_TYPES: &[(&str, &str)] = &[
    (".html", "text/html"),
    (".css", "text/css"),
    (".json", "application/json"),
    (".js", "application/x-javascript"),
    (".png", "image/png"),
    (".jpg", "image/jpg"),
    (".svg", "image/svg+xml"),
];

/// Resolve the Content-Type for a file name.
///
/// Case-insensitive substring match against the ordered rule table;
/// the first matching rule wins. Unknown names fall back to
/// [`DEFAULT_CONTENT_TYPE`].
pub fn resolve_content_type<'a>(file_name: &str, table: &[(&'a str, &'a str)]) -> &'a str {
    let name = file_name.to_lowercase();
    table
        .iter()
        .find(|(ext, _)| name.contains(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(name: &str) -> &str {
        resolve_content_type(name, DEFAULT_CONTENT_TYPES)
    }

    #[test]
    fn test_resolve_known_types() {
        assert_eq!(resolve("index.html"), "text/html");
        assert_eq!(resolve("styles/main.css"), "text/css");
        assert_eq!(resolve("bundle.js"), "application/x-javascript");
        assert_eq!(resolve("logo.png"), "image/png");
        assert_eq!(resolve("photo.jpg"), "image/jpg");
        assert_eq!(resolve("icon.svg"), "image/svg+xml");
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(resolve("report.HTML"), "text/html");
        assert_eq!(resolve("DATA.Json"), "application/json");
    }

    #[test]
    fn test_resolve_unknown_falls_back_to_binary() {
        assert_eq!(resolve("archive.tar"), DEFAULT_CONTENT_TYPE);
        assert_eq!(resolve("no_extension"), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_resolve_first_matching_rule_wins() {
        // Name contains both ".json" and ".js"; the .json rule is listed first.
        assert_eq!(resolve("manifest.json.js"), "application/json");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        assert_eq!(resolve("app.js"), resolve("app.js"));
    }
}
