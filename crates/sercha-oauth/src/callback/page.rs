//! HTML pages returned to the browser after the redirect

use sercha_core::branding;

use crate::error::OAuthError;

pub(super) fn render(outcome: &Result<String, OAuthError>) -> String {
    match outcome {
        Ok(_) => page(
            "Authorization successful!",
            &format!(
                "You can close this window and return to {}.",
                branding::DISPLAY_NAME
            ),
        ),
        Err(OAuthError::ProviderDenied { description, error }) => {
            let detail = if description.is_empty() { error } else { description };
            page(&format!("Authorization failed: {}", escape_html(detail)), "")
        }
        Err(OAuthError::StateMismatch) => page("Authorization failed: invalid state parameter", ""),
        Err(OAuthError::MissingCode) => page("Authorization failed: no code received", ""),
        Err(e) => page(&format!("Authorization failed: {}", escape_html(&e.to_string())), ""),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, message: &str) -> String {
    let app_name = branding::DISPLAY_NAME;
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{app_name} - OAuth Callback</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            background: #FAFAFA;
        }}
        .container {{
            text-align: center;
            background: white;
            padding: 48px 64px;
            border-radius: 16px;
            border: 1px solid #C7C8CC;
            box-shadow: 0 4px 24px rgba(0,0,0,0.08);
        }}
        h1 {{
            color: #333F50;
            margin: 0 0 8px 0;
            font-size: 24px;
            font-weight: 600;
        }}
        p {{
            color: #7B8088;
            margin: 0;
            font-size: 16px;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
        <p>{message}</p>
    </div>
</body>
</html>"##
    )
}
