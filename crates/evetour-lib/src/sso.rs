//! PKCE login against the game's single-sign-on service.
//!
//! The flow is the standard authorization-code dance for a native app: spin
//! up a loopback listener, send the pilot's browser to the authorize page
//! with an S256 challenge, catch the redirect, and trade the code for an
//! access token. The character id rides in the token's `sub` claim.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::Command;

use base64::Engine;
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{Error, Result};
use crate::universe::UniverseClient;

const CLIENT_ID: &str = "bac8e360dacc4dad85a1cc7173e78cb3";
const LOGIN_BASE: &str = "https://login.eveonline.com";
const REDIRECT_ADDR: &str = "localhost:13377";
const REDIRECT_URI: &str = "http://localhost:13377/";
const SCOPES: &[&str] = &["esi-ui.write_waypoint.v1", "esi-location.read_location.v1"];

const CLOSE_TAB_PAGE: &str = "<!doctype html><title>evetour</title>\
<p>You can close this tab now.</p><script>window.close()</script>";

/// An authenticated pilot.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub character_id: u32,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    sub: String,
}

/// Run the browser login and return an authenticated session.
pub fn login(client: &UniverseClient) -> Result<Session> {
    let listener = TcpListener::bind(REDIRECT_ADDR)?;

    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let mut entropy = [0u8; 64];
    rand::rng().fill_bytes(&mut entropy);
    let state = engine.encode(&entropy[..32]);
    let verifier = engine.encode(&entropy[32..]);
    let challenge = engine.encode(Sha256::digest(verifier.as_bytes()));

    let scope = SCOPES.join(" ");
    let authorize_url = reqwest::Url::parse_with_params(
        &format!("{LOGIN_BASE}/v2/oauth/authorize/"),
        &[
            ("response_type", "code"),
            ("redirect_uri", REDIRECT_URI),
            ("client_id", CLIENT_ID),
            ("scope", scope.as_str()),
            ("code_challenge_method", "S256"),
            ("code_challenge", challenge.as_str()),
            ("state", state.as_str()),
        ],
    )
    .map_err(|error| Error::AuthFailed {
        detail: format!("building authorize url: {error}"),
    })?;

    open_browser(authorize_url.as_str())?;
    info!("waiting for the login redirect on {REDIRECT_ADDR}");
    let code = wait_for_code(&listener, &state)?;

    let response = client
        .http()
        .post(format!("{LOGIN_BASE}/v2/oauth/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", CLIENT_ID),
            ("code", code.as_str()),
            ("code_verifier", verifier.as_str()),
        ])
        .send()?;
    if !response.status().is_success() {
        return Err(Error::AuthFailed {
            detail: format!("token exchange returned {}", response.status()),
        });
    }
    let token: TokenResponse = response.json()?;

    let character_id = character_id_from_token(&token.access_token)?;
    info!(character_id, "logged in");
    Ok(Session {
        access_token: token.access_token,
        character_id,
    })
}

fn open_browser(url: &str) -> Result<()> {
    let status = Command::new("xdg-open").arg(url).status()?;
    if !status.success() {
        return Err(Error::AuthFailed {
            detail: format!("browser launcher exited with {status}"),
        });
    }
    Ok(())
}

/// Accept loopback connections until one carries the expected `state` and a
/// code. Mismatched states are answered with a 400 and the wait continues.
fn wait_for_code(listener: &TcpListener, expected_state: &str) -> Result<String> {
    for stream in listener.incoming() {
        let mut stream = stream?;
        let mut buffer = [0u8; 4096];
        let read = stream.read(&mut buffer)?;
        let request = String::from_utf8_lossy(&buffer[..read]);

        let (state, code) = match redirect_params(&request) {
            Some(params) => params,
            None => {
                respond(&mut stream, "400 Bad Request", "missing code")?;
                continue;
            }
        };
        if state != expected_state {
            respond(&mut stream, "400 Bad Request", "invalid state")?;
            continue;
        }

        respond(&mut stream, "200 OK", CLOSE_TAB_PAGE)?;
        return Ok(code);
    }

    Err(Error::AuthFailed {
        detail: "redirect listener closed before a code arrived".to_string(),
    })
}

/// Pull `state` and `code` out of the request line of the redirect.
fn redirect_params(request: &str) -> Option<(String, String)> {
    let request_line = request.lines().next()?;
    let target = request_line.split_whitespace().nth(1)?;
    let (_, query) = target.split_once('?')?;

    let mut state = None;
    let mut code = None;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=')?;
        match key {
            "state" => state = Some(percent_decode(value)),
            "code" => code = Some(percent_decode(value)),
            _ => {}
        }
    }
    Some((state?, code?))
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn respond(stream: &mut TcpStream, status: &str, body: &str) -> Result<()> {
    write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;
    Ok(())
}

/// Extract the numeric character id from the token's `sub` claim
/// (`CHARACTER:EVE:<id>`).
fn character_id_from_token(token: &str) -> Result<u32> {
    let payload = token.split('.').nth(1).ok_or_else(|| Error::AuthFailed {
        detail: "access token is not a JWT".to_string(),
    })?;

    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let decoded = engine.decode(payload).map_err(|error| Error::AuthFailed {
        detail: format!("decoding token payload: {error}"),
    })?;
    let claims: JwtClaims = serde_json::from_slice(&decoded)?;

    let id = claims
        .sub
        .strip_prefix("CHARACTER:EVE:")
        .ok_or_else(|| Error::AuthFailed {
            detail: format!("unexpected subject claim {:?}", claims.sub),
        })?;
    id.parse().map_err(|_| Error::AuthFailed {
        detail: format!("unexpected subject claim {:?}", claims.sub),
    })
}

#[cfg(test)]
mod tests {
    use super::{character_id_from_token, percent_decode, redirect_params};
    use base64::Engine;

    fn fake_jwt(sub: &str) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let header = engine.encode(b"{\"alg\":\"none\"}");
        let payload = engine.encode(format!("{{\"sub\":\"{sub}\"}}"));
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn character_id_comes_from_the_subject_claim() {
        let token = fake_jwt("CHARACTER:EVE:91337");
        assert_eq!(character_id_from_token(&token).unwrap(), 91_337);
    }

    #[test]
    fn foreign_subject_claims_are_rejected() {
        let token = fake_jwt("AGENT:OTHER:1");
        assert!(character_id_from_token(&token).is_err());
    }

    #[test]
    fn redirect_params_parse_the_request_line() {
        let request = "GET /?code=abc%2B1&state=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (state, code) = redirect_params(request).unwrap();
        assert_eq!(state, "xyz");
        assert_eq!(code, "abc+1");
    }

    #[test]
    fn percent_decode_handles_plus_and_escapes() {
        assert_eq!(percent_decode("a%20b+c"), "a b c");
        assert_eq!(percent_decode("plain"), "plain");
    }
}
