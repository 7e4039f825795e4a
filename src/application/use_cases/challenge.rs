//! Challenge presenter.
//!
//! Turns the gateway's base64 issuer page into a host document that embeds it
//! in a sandboxed frame. The issuer HTML is never inlined into the host page.
//! Rendering is the presenter's whole job: it does not learn the challenge
//! outcome, the observers do.

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE},
};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::ThreeDsChallenge,
};

/// Policy for the host page. The sandboxed frame has an opaque origin, so the
/// inline scripts the issuer needs to auto-submit cannot reach the host.
pub const CHALLENGE_CONTENT_SECURITY_POLICY: &str = "default-src 'none'; \
     script-src 'unsafe-inline'; style-src 'unsafe-inline'; img-src https: data:; \
     frame-src https:; form-action https:; base-uri 'none'";

const FRAME_SANDBOX: &str = "allow-forms allow-scripts allow-top-navigation-by-user-activation";

/// Decodes the gateway's challenge payload into issuer HTML.
///
/// Tries the standard base64 alphabet first, then URL-safe; some issuers
/// hand back either. Anything that is not base64 of UTF-8 text is a
/// `ChallengeRender` error, which callers treat as "still pending".
pub fn decode_challenge(payload: &str) -> AppResult<String> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(AppError::ChallengeRender("empty challenge payload".into()));
    }

    let bytes = STANDARD
        .decode(trimmed)
        .or_else(|_| URL_SAFE.decode(trimmed))
        .map_err(|e| AppError::ChallengeRender(format!("payload is not base64: {e}")))?;

    String::from_utf8(bytes)
        .map_err(|_| AppError::ChallengeRender("payload is not UTF-8 HTML".into()))
}

/// Builds the host page for a pending challenge.
///
/// SECURITY: the issuer HTML only ever appears HTML-escaped inside the
/// frame's `srcdoc`. Serve the result with [`CHALLENGE_CONTENT_SECURITY_POLICY`].
pub fn render_challenge_page(reference: &str, challenge: &ThreeDsChallenge) -> AppResult<String> {
    let issuer_html = decode_challenge(&challenge.iframe_content)?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Verificación de pago</title>
<style>
  body {{ margin: 0; font-family: system-ui, sans-serif; background: #f6f6f8; }}
  main {{ max-width: 520px; margin: 0 auto; padding: 16px; }}
  iframe {{ width: 100%; min-height: 480px; border: 0; background: #fff; }}
</style>
</head>
<body>
<main data-reference="{reference}">
<p>Tu banco necesita confirmar este pago. Completa la verificación para continuar.</p>
<iframe title="3-D Secure" sandbox="{sandbox}" referrerpolicy="no-referrer" srcdoc="{srcdoc}"></iframe>
</main>
</body>
</html>
"#,
        reference = escape_html_attribute(reference),
        sandbox = FRAME_SANDBOX,
        srcdoc = escape_html_attribute(&issuer_html),
    ))
}

fn escape_html_attribute(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 8);
    for c in raw.chars() {
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
