//! HTML pages served by the server.

use serde_json::{json, Value};

use crate::util::{escape_html, script_safe_json};

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <link rel="stylesheet" href="/assets/styles.css">
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
    )
}

fn error_banner(error: Option<&str>) -> String {
    match error {
        Some(message) if !message.is_empty() => {
            format!(r#"    <p class="error">{}</p>"#, escape_html(message))
        }
        _ => String::new(),
    }
}

/// Landing page at `/`.
pub fn landing(logged_in: bool) -> String {
    let actions = if logged_in {
        r#"<a href="/home">Go to your world</a> · <a href="/signout">Sign out</a>"#
    } else {
        r#"<a href="/signup">Create your VibeVerse</a> · <a href="/signin">Sign in</a>"#
    };
    page(
        "VibeVerse",
        &format!(
            r#"    <h1>VibeVerse</h1>
    <p>Build and share your own 3D world in the browser.</p>
    <p>{actions}</p>"#
        ),
    )
}

pub fn signup(error: Option<&str>) -> String {
    page(
        "Sign up · VibeVerse",
        &format!(
            r#"    <h1>Create your VibeVerse</h1>
{banner}
    <form action="/signup" method="POST">
        <label for="email">Email</label>
        <input type="email" id="email" name="email" required>
        <label for="password">Password</label>
        <input type="password" id="password" name="password" required>
        <label for="confirmPassword">Confirm password</label>
        <input type="password" id="confirmPassword" name="confirmPassword" required>
        <label for="worldName">World name (lowercase, numbers, dashes)</label>
        <input type="text" id="worldName" name="worldName" pattern="[a-z0-9-]+" required>
        <button type="submit">Sign up</button>
    </form>
    <p>Already have an account? <a href="/signin">Sign in</a></p>"#,
            banner = error_banner(error),
        ),
    )
}

pub fn signin(error: Option<&str>) -> String {
    page(
        "Sign in · VibeVerse",
        &format!(
            r#"    <h1>Sign in</h1>
{banner}
    <form action="/signin" method="POST">
        <label for="email">Email</label>
        <input type="email" id="email" name="email" required>
        <label for="password">Password</label>
        <input type="password" id="password" name="password" required>
        <button type="submit">Sign in</button>
    </form>
    <p>New here? <a href="/signup">Create an account</a></p>"#,
            banner = error_banner(error),
        ),
    )
}

pub struct HomePage<'a> {
    pub email: &'a str,
    pub world_id: Option<&'a str>,
    pub subscribed: bool,
    pub member_since: String,
}

pub fn home(data: &HomePage<'_>) -> String {
    let world = match data.world_id {
        Some(id) => {
            let id = escape_html(id);
            format!(r#"<a href="/world/{id}/web">Open world {id}</a>"#)
        }
        None => "No world yet".to_string(),
    };
    let subscription = if data.subscribed {
        "<p>Subscribed ✓</p>".to_string()
    } else {
        r#"<p><a href="/subscribe">Subscribe</a></p>"#.to_string()
    };
    page(
        "Home · VibeVerse",
        &format!(
            r#"    <h1>Welcome, {email}</h1>
    <p>{world}</p>
    {subscription}
    <p>Member since {since}</p>
    <form action="/signout" method="POST"><button type="submit">Sign out</button></form>"#,
            email = escape_html(data.email),
            since = escape_html(&data.member_since),
        ),
    )
}

pub fn subscribe() -> String {
    page(
        "Subscribe · VibeVerse",
        r#"    <h1>Subscribe</h1>
    <p>Unlock persistent worlds and more placement slots.</p>
    <form action="/subscribe" method="POST">
        <button type="submit">Subscribe</button>
    </form>
    <p><a href="/home">Back</a></p>"#,
    )
}

/// Admin listing; `worlds` is `None` when the hosting API could not be reached.
pub fn admin(base_url: &str, worlds: Option<&[String]>) -> String {
    let base_url = escape_html(base_url);
    let items = match worlds {
        Some(ids) => ids
            .iter()
            .map(|id| {
                let id = escape_html(id);
                format!(r#"<li><a href="{base_url}/world/{id}/web">{id}</a></li>"#)
            })
            .collect::<String>(),
        None => "<li>Failed to load worlds from API</li>".to_string(),
    };
    page(
        "VibeVerse Admin",
        &format!(
            r#"    <h1>VibeVerse Admin</h1>

    <h2>Existing VibeVerses</h2>
    <ul>
        {items}
    </ul>

    <h2>Create New VibeVerse</h2>
    <form action="/admin/create" method="POST">
        <label for="worldName">World Name:</label>
        <input type="text" id="worldName" name="name" required>
        <button type="submit">Create</button>
    </form>"#
        ),
    )
}

/// Substitution fields for the hydrated world page.
pub struct WorldPage<'a> {
    pub world_id: &'a str,
    pub session_token: &'a str,
    pub network_url: &'a str,
    /// Sanitized world config from the hosting API.
    pub world: &'a Value,
    /// Config object extracted from the hosted page, passed through as-is.
    pub page: &'a Value,
}

pub fn world_page(data: &WorldPage<'_>) -> String {
    let bootstrap = json!({
        "worldId": data.world_id,
        "sessionToken": data.session_token,
        "networkUrl": data.network_url,
        "world": data.world,
        "page": data.page,
    });
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>VibeVerse · {title}</title>
    <style>html, body {{ margin: 0; height: 100%; overflow: hidden; }}</style>
</head>
<body>
    <script>window.VIBEVERSE_BOOTSTRAP = {bootstrap};</script>
    <script type="module" src="/web-client/index.js"></script>
</body>
</html>
"#,
        title = escape_html(data.world_id),
        bootstrap = script_safe_json(&bootstrap),
    )
}

/// Markup document that places a single model.
pub fn model_document(glb_url: &str) -> String {
    format!(r#"<m-model src="{}"></m-model>"#, escape_html(glb_url))
}
