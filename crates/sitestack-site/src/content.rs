//! Pages uploaded to the website bucket.

/// Body of the index page.
pub const INDEX_HTML: &str = r"<!DOCTYPE html>
<html>
<head><title>My Static Site</title></head>
<body><h1>Welcome to my SiteStack-deployed website!</h1></body>
</html>
";

/// Body of the error page.
pub const ERROR_HTML: &str = r"<!DOCTYPE html>
<html>
<head><title>Error</title></head>
<body><h1>404 Not Found</h1></body>
</html>
";

/// The two pages of the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContent {
    /// Served for `/` and any directory path.
    pub index: String,
    /// Served with 404 for missing keys.
    pub error: String,
}

impl Default for SiteContent {
    fn default() -> Self {
        Self {
            index: INDEX_HTML.to_owned(),
            error: ERROR_HTML.to_owned(),
        }
    }
}
