//! Request, response, and credential types for the PAC REST API.
//!
//! ## Wire format
//!
//! | Method | Path | Request | Response |
//! |--------|------|---------|----------|
//! | POST | `/api/Autenticacion` | `{usuario, clave}` | `{codigo, mensaje, token, expiracion}` |
//! | POST | `/api/Enviar` | document JSON, bearer token | `{codigo, resultado, mensaje, cufe, qr}` |
//!
//! `codigo` arrives as a number from some PAC deployments and as a string
//! from others; [`PacCode`] accepts both. `200` is the only success code.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const REDACTED: &str = "[REDACTED]";

// -- Credentials ---------------------------------------------------------------

/// Credential pair a company uses to authenticate against the PAC.
///
/// `nit` is the PAC username (the issuer's tax id), `token` the PAC
/// password. The secret is zeroed on drop and never printed.
#[derive(Clone)]
pub struct PacCredentials {
    pub nit: String,
    pub token: Zeroizing<String>,
}

impl PacCredentials {
    pub fn new(nit: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            nit: nit.into(),
            token: Zeroizing::new(token.into()),
        }
    }
}

impl std::fmt::Debug for PacCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacCredentials")
            .field("nit", &self.nit)
            .field("token", &REDACTED)
            .finish()
    }
}

/// Session token issued by `/api/Autenticacion`.
#[derive(Clone)]
pub struct AuthToken {
    pub token: Zeroizing<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
            expires_at,
        }
    }

    pub fn as_str(&self) -> &str {
        self.token.as_str()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &REDACTED)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Outcome of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Fiscal code the PAC assigned to the document.
    pub cufe: String,
    pub message: String,
    /// QR payload for the printed representation, when the PAC returns one.
    pub qr: Option<String>,
}

// -- Wire types ----------------------------------------------------------------

/// Result code carried in every PAC response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PacCode {
    Number(i64),
    Text(String),
}

impl PacCode {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Number(n) => *n == 200,
            Self::Text(s) => s.trim() == "200",
        }
    }
}

impl std::fmt::Display for PacCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct AuthRequest<'a> {
    pub usuario: &'a str,
    pub clave: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    #[serde(default)]
    pub codigo: Option<PacCode>,
    #[serde(default)]
    pub mensaje: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expiracion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    #[serde(default)]
    pub codigo: Option<PacCode>,
    #[serde(default)]
    pub resultado: Option<String>,
    #[serde(default)]
    pub mensaje: Option<String>,
    #[serde(default)]
    pub cufe: Option<String>,
    #[serde(default)]
    pub qr: Option<String>,
}

/// Render an optional code for error messages.
pub(crate) fn code_label(code: Option<&PacCode>) -> String {
    code.map_or_else(|| "missing".to_string(), ToString::to_string)
}

/// Parse the `expiracion` field. The PAC sends either RFC 3339 or a naive
/// local timestamp; naive values are read as UTC. Unparseable values are
/// dropped rather than failing the authentication.
pub(crate) fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// First non-blank string among the candidates.
pub(crate) fn first_text(candidates: &[Option<&String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_secret() {
        let creds = PacCredentials::new("155596713-2-2015", "s3cret-pac-password");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("155596713-2-2015"));
        assert!(!dbg.contains("s3cret"));
    }

    #[test]
    fn auth_token_debug_redacts_token() {
        let token = AuthToken::new("eyJhbGciOi.session", None);
        assert!(!format!("{token:?}").contains("eyJhbGciOi"));
        assert_eq!(token.as_str(), "eyJhbGciOi.session");
    }

    #[test]
    fn code_accepts_number_and_string() {
        let n: PacCode = serde_json::from_str("200").unwrap();
        let s: PacCode = serde_json::from_str("\"200\"").unwrap();
        let bad: PacCode = serde_json::from_str("\"102\"").unwrap();
        assert!(n.is_success());
        assert!(s.is_success());
        assert!(!bad.is_success());
        assert_eq!(bad.to_string(), "102");
    }

    #[test]
    fn submit_response_tolerates_missing_fields() {
        let resp: SubmitResponse = serde_json::from_str(r#"{"codigo": 200}"#).unwrap();
        assert!(resp.cufe.is_none());
        assert!(resp.codigo.unwrap().is_success());
    }

    #[test]
    fn expiration_formats() {
        assert!(parse_expiration("2026-10-16T12:00:00Z").is_some());
        assert!(parse_expiration("2026-10-16T12:00:00.123").is_some());
        assert!(parse_expiration("2026-10-16 12:00:00").is_some());
        assert!(parse_expiration("tomorrow").is_none());
    }

    #[test]
    fn first_text_skips_blank_values() {
        let blank = " ".to_string();
        let msg = "Documento recibido".to_string();
        assert_eq!(
            first_text(&[None, Some(&blank), Some(&msg)]).as_deref(),
            Some("Documento recibido")
        );
        assert_eq!(first_text(&[None, Some(&blank)]), None);
    }

    #[test]
    fn code_label_for_missing_code() {
        assert_eq!(code_label(None), "missing");
        assert_eq!(code_label(Some(&PacCode::Number(500))), "500");
    }
}
