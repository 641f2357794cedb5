//! Repository authentication from server credentials.
//!
//! Credentials are looked up by repository (or mirror) id through the
//! settings collaborator and applied per request:
//!
//! ```toml
//! [servers.corp-releases]
//! username = "ci"
//! password = "secret"
//! ```
//!
//! A password without a username is sent as a bearer token.

use reqwest::RequestBuilder;

use pomgraph_core::settings::Credentials;

/// Apply authentication to a request if credentials are configured.
pub fn apply_auth(request: RequestBuilder, credentials: Option<&Credentials>) -> RequestBuilder {
    let Some(credentials) = credentials else {
        return request;
    };
    match (&credentials.username, &credentials.password) {
        (Some(user), Some(pass)) => request.basic_auth(user, Some(pass)),
        (Some(user), None) => request.basic_auth(user, None::<&str>),
        (None, Some(token)) => request.bearer_auth(token),
        (None, None) => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorization(credentials: Option<&Credentials>) -> Option<String> {
        let client = reqwest::Client::new();
        let request = apply_auth(client.get("https://repo.example.com/x"), credentials)
            .build()
            .unwrap();
        request
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn basic_auth_with_username_and_password() {
        let creds = Credentials {
            username: Some("ci".into()),
            password: Some("secret".into()),
        };
        let header = authorization(Some(&creds)).unwrap();
        assert!(header.starts_with("Basic "), "{header}");
    }

    #[test]
    fn bearer_with_password_only() {
        let creds = Credentials {
            username: None,
            password: Some("token-123".into()),
        };
        assert_eq!(authorization(Some(&creds)).as_deref(), Some("Bearer token-123"));
    }

    #[test]
    fn no_credentials_no_header() {
        assert!(authorization(None).is_none());
    }
}
