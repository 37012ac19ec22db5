//! [`PaginationDriver`] backed by a W3C WebDriver server such as chromedriver.
//!
//! Only the handful of endpoints the pagination loop needs are spoken:
//! session creation and deletion, navigation, page source, element lookup,
//! script execution (to scroll an element into view) and pointer actions.
//!
//! The load-more trigger mirrors how a reader reaches the control: hover the
//! page footer so the lazy-loading script notices the scroll position, pause,
//! then move onto the button and click it.

use super::driver::{DriverError, PaginationDriver};
use crate::config::DelayRange;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, info, instrument};

/// Key under which W3C WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a5ec-4a6d4c2e4e4e";

#[derive(Debug)]
pub struct WebDriver {
    client: Client,
    endpoint: String,
    session: Option<String>,
    footer: String,
    load_more: String,
    hover: DelayRange,
}

impl WebDriver {
    /// Open a new browser session on the WebDriver server at `endpoint`.
    #[instrument(level = "info", skip(footer, load_more, hover))]
    pub async fn connect(
        endpoint: &str,
        headless: bool,
        footer: &str,
        load_more: &str,
        hover: DelayRange,
    ) -> Result<Self, DriverError> {
        let mut driver = Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            session: None,
            footer: footer.to_string(),
            load_more: load_more.to_string(),
            hover,
        };

        let mut args = vec!["--window-size=1280,2000"];
        if headless {
            args.push("--headless=new");
        }
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });
        let value = driver.command(Method::POST, "/session", Some(body)).await?;
        let session = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Malformed(format!("no sessionId in {value}")))?;
        info!(session, "Browser session started");
        driver.session = Some(session.to_string());
        Ok(driver)
    }

    fn session_path(&self, suffix: &str) -> Result<String, DriverError> {
        let session = self.session.as_deref().ok_or(DriverError::NoSession)?;
        Ok(format!("/session/{session}{suffix}"))
    }

    /// Send one WebDriver command and unwrap the `value` member of the reply.
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let url = format!("{}{}", self.endpoint, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let mut reply: Value = response.json().await?;
        let value = reply.get_mut("value").map(Value::take).unwrap_or(Value::Null);

        if !status.is_success() {
            let code = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(DriverError::Protocol { code, message });
        }
        Ok(value)
    }

    /// Find an element by CSS selector; `None` when it is not on the page.
    async fn find(&self, css: &str) -> Result<Option<Value>, DriverError> {
        let path = self.session_path("/element")?;
        let body = json!({ "using": "css selector", "value": css });
        match self.command(Method::POST, &path, Some(body)).await {
            Ok(element) if element.get(ELEMENT_KEY).is_some() => Ok(Some(element)),
            Ok(other) => Err(DriverError::Malformed(format!("not an element: {other}"))),
            Err(e) if e.is_missing_element() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn scroll_into_view(&self, element: &Value) -> Result<(), DriverError> {
        let path = self.session_path("/execute/sync")?;
        let body = json!({
            "script": "arguments[0].scrollIntoView({block: 'center'});",
            "args": [element]
        });
        self.command(Method::POST, &path, Some(body)).await?;
        Ok(())
    }

    async fn pointer(&self, element: &Value, click: bool) -> Result<(), DriverError> {
        let path = self.session_path("/actions")?;
        let mut steps = vec![json!({
            "type": "pointerMove",
            "duration": 250,
            "origin": element,
            "x": 0,
            "y": 0
        })];
        if click {
            steps.push(json!({ "type": "pointerDown", "button": 0 }));
            steps.push(json!({ "type": "pointerUp", "button": 0 }));
        }
        let body = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": steps
            }]
        });
        self.command(Method::POST, &path, Some(body)).await?;
        Ok(())
    }
}

impl PaginationDriver for WebDriver {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let path = self.session_path("/url")?;
        self.command(Method::POST, &path, Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_markup(&mut self) -> Result<String, DriverError> {
        let path = self.session_path("/source")?;
        match self.command(Method::GET, &path, None).await? {
            Value::String(markup) => Ok(markup),
            other => Err(DriverError::Malformed(format!("page source is not a string: {other}"))),
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn trigger_load_more(&mut self) -> Result<bool, DriverError> {
        let Some(footer) = self.find(&self.footer).await? else {
            debug!(selector = %self.footer, "Footer not found");
            return Ok(false);
        };
        debug!("Moving to footer");
        self.scroll_into_view(&footer).await?;
        self.pointer(&footer, false).await?;
        sleep(self.hover.sample()).await;

        let Some(button) = self.find(&self.load_more).await? else {
            debug!(selector = %self.load_more, "Load-more button not found");
            return Ok(false);
        };
        debug!("Moving to load more button");
        self.scroll_into_view(&button).await?;
        self.pointer(&button, true).await?;
        debug!("Performed button hover/click");
        Ok(true)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        let path = self.session_path("")?;
        self.command(Method::DELETE, &path, None).await?;
        self.session = None;
        info!("Browser session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use tiny_http::{Header, Response, Server};

    /// A minimal WebDriver server with a footer and a load-more button that
    /// disappears after `clicks` clicks.
    fn fake_webdriver(clicks: usize) -> (String, Arc<Mutex<Vec<String>>>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", server.server_addr().to_ip().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        thread::spawn(move || {
            let mut remaining = clicks;
            for mut request in server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let route = format!("{} {}", request.method(), request.url());
                log.lock().unwrap().push(route.clone());

                let (status, value) = match route.as_str() {
                    "POST /session" => (200, json!({ "sessionId": "s1", "capabilities": {} })),
                    "POST /session/s1/url" => (200, Value::Null),
                    "GET /session/s1/source" => (200, json!("<html><body>listing</body></html>")),
                    "POST /session/s1/element" => {
                        if body.contains("alm-load-more-btn") && remaining == 0 {
                            (404, json!({ "error": "no such element", "message": "gone" }))
                        } else {
                            (200, json!({ (ELEMENT_KEY): "e1" }))
                        }
                    }
                    "POST /session/s1/actions" => {
                        if body.contains("pointerDown") {
                            remaining = remaining.saturating_sub(1);
                        }
                        (200, Value::Null)
                    }
                    "POST /session/s1/execute/sync" => (200, Value::Null),
                    "DELETE /session/s1" => (200, Value::Null),
                    _ => (404, json!({ "error": "unknown command", "message": route })),
                };
                let response = Response::from_string(json!({ "value": value }).to_string())
                    .with_status_code(status)
                    .with_header(
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
                    );
                let _ = request.respond(response);
            }
        });
        (endpoint, seen)
    }

    async fn connect(endpoint: &str) -> WebDriver {
        WebDriver::connect(
            endpoint,
            true,
            ".body--footer",
            ".alm-load-more-btn",
            DelayRange::ZERO,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_session_lifecycle_and_source() {
        let (endpoint, seen) = fake_webdriver(0);
        let mut driver = connect(&endpoint).await;

        driver.navigate("https://site.example/topic/x").await.unwrap();
        let markup = driver.current_markup().await.unwrap();
        assert!(markup.contains("listing"));
        driver.close().await.unwrap();

        assert!(matches!(driver.current_markup().await, Err(DriverError::NoSession)));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.first().unwrap(), "POST /session");
        assert_eq!(seen.last().unwrap(), "DELETE /session/s1");
    }

    #[tokio::test]
    async fn test_load_more_clicks_until_button_disappears() {
        let (endpoint, _) = fake_webdriver(2);
        let mut driver = connect(&endpoint).await;

        assert!(driver.trigger_load_more().await.unwrap());
        assert!(driver.trigger_load_more().await.unwrap());
        assert!(!driver.trigger_load_more().await.unwrap());
    }
}
