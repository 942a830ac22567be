//! HTML pages served to browsers.
//!
//! The checking page carries the in-browser redirector: it fetches the check
//! endpoint once the document has loaded and navigates to the returned URL,
//! or to the fallback path on any failure.

use crate::config::RedirectPaths;

/// Pre-rendered pages for the configured paths.
#[derive(Debug, Clone)]
pub struct Pages {
    pub checking: String,
    pub error: String,
}

impl Pages {
    pub fn render(paths: &RedirectPaths) -> Self {
        Self {
            checking: checking_page(paths),
            error: ERROR_PAGE.to_string(),
        }
    }
}

/// Encode a path as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("</", "<\\/")
}

fn checking_page(paths: &RedirectPaths) -> String {
    let check = js_string(&paths.check_path);
    let fallback = js_string(&paths.fallback_path);
    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Checking mirrors…</title>
</head>
<body>
<p>Looking for an available mirror…</p>
<script>
async function runCheck() {{
    let target = {fallback};
    try {{
        const res = await fetch({check});
        const data = await res.json();
        if (data.ok && typeof data.url === "string" && data.url.trim() !== "") {{
            target = data.url;
        }}
    }} catch (e) {{}}
    window.location.href = target;
}}
window.addEventListener("DOMContentLoaded", runCheck, {{ once: true }});
</script>
</body>
</html>
"#
    )
}

const ERROR_PAGE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>No mirror available</title>
</head>
<body>
<h1>No mirror available</h1>
<p>None of the recent mirrors responded. Try again later.</p>
</body>
</html>
"#;
