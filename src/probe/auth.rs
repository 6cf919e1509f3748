//! Best-effort login to the PON terminal's web interface.

use std::time::Duration;

use super::ProbeError;

/// Upper bound on a login attempt so it can never stall a tick.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts the terminal's login form before its pages are scraped.
///
/// The terminal serves a self-signed certificate, so verification is off.
pub struct DeviceLogin {
    client: reqwest::Client,
    login_url: String,
    username: String,
    password: String,
}

impl DeviceLogin {
    pub fn new(login_url: &str, username: &str, password: &str) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(LOGIN_TIMEOUT)
            .no_proxy()
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self {
            client,
            login_url: login_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Submit the login form, discarding the response.
    ///
    /// A failure is logged and otherwise ignored; the probe that follows
    /// reports whether the page was reachable.
    pub async fn attempt(&self) {
        let form = [
            ("challenge", ""),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("save", "Login"),
            ("submit-url", "/admin/login.asp"),
        ];

        match self.client.post(&self.login_url).form(&form).send().await {
            Ok(response) => {
                tracing::debug!("Device login at {} answered {}", self.login_url, response.status());
            }
            Err(e) => {
                tracing::warn!("Device login at {} failed: {}", self.login_url, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{closed_port, serve};
    use axum::{routing::post, Router};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_login_posts_form() {
        let received = Arc::new(Mutex::new(None));
        let store = received.clone();
        let router = Router::new().route(
            "/boaform/admin/formLogin",
            post(move |body: String| {
                let store = store.clone();
                async move {
                    *store.lock().unwrap() = Some(body);
                    "ok"
                }
            }),
        );
        let addr = serve(router).await;

        let login = DeviceLogin::new(
            &format!("http://{}/boaform/admin/formLogin", addr),
            "admin",
            "secret",
        )
        .unwrap();
        login.attempt().await;

        let body = received.lock().unwrap().clone().unwrap();
        assert_eq!(
            body,
            "challenge=&username=admin&password=secret&save=Login&submit-url=%2Fadmin%2Flogin.asp"
        );
    }

    #[tokio::test]
    async fn test_login_failure_is_swallowed() {
        let addr = closed_port().await;
        let login = DeviceLogin::new(&format!("http://{}/login", addr), "admin", "admin").unwrap();
        login.attempt().await;
    }
}
