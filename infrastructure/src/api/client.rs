//! REST client for the chat, order, payment and review services.
//!
//! Every request carries `Authorization: Bearer <credential>`. A 401 forces a
//! credential refresh and the request is retried once; a second 401 is
//! returned to the caller.

use super::dto::{
    CreateOrderRequest, MessageDto, OneOrMany, OrderDto, PaymentDto, ReviewRequest, RoomDto,
    unwrap_data,
};
use super::error::{HttpError, Result};
use async_trait::async_trait;
use horo_application::{ApiError, ChatApi, CredentialProvider, OrderApi};
use horo_domain::{
    ChatMessage, ChatRoom, CourseId, OrderId, OrderSummary, PaymentId, Review, RoomId, UserId,
};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

/// Name sent with reviews when no display name is configured.
const ANONYMOUS: &str = "Anonymous";

/// HTTP adapter implementing both [`ChatApi`] and [`OrderApi`].
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
    display_name: Option<String>,
}

impl HttpApiClient {
    /// Create a client rooted at `base_url` (e.g. `https://host/api`).
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| HttpError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(HttpError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            credentials,
            display_name: None,
        })
    }

    /// Name to submit reviews under.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HttpError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
        force_refresh: bool,
    ) -> Result<reqwest::Response> {
        let credential = self.credentials.token(force_refresh).await?;
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(credential.token());
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Send a request, retrying once with a refreshed credential on 401.
    async fn execute(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value> {
        debug!("{} {}", method, url.path());
        let mut response = self.send_once(&method, &url, body.as_ref(), false).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("401 from {}; retrying with a refreshed credential", url.path());
            response = self.send_once(&method, &url, body.as_ref(), true).await?;
        }

        let status = response.status();
        let text = response.text().await?;
        trace!("{} {} -> {} {}", method, url.path(), status, text);

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }
        Err(match status {
            StatusCode::UNAUTHORIZED => HttpError::Unauthorized,
            StatusCode::NOT_FOUND => HttpError::NotFound(url.path().to_string()),
            _ => HttpError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            },
        })
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let value = self.execute(Method::GET, self.endpoint(segments)?, None).await?;
        Ok(serde_json::from_value(unwrap_data(value))?)
    }

    async fn send_json(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&impl Serialize>,
    ) -> Result<Value> {
        let body = body.map(serde_json::to_value).transpose()?;
        let value = self.execute(method, self.endpoint(segments)?, body).await?;
        Ok(unwrap_data(value))
    }

    async fn fetch_order(&self, room_id: &RoomId) -> Result<Option<OrderSummary>> {
        let payload: Option<OneOrMany<OrderDto>> =
            match self.get(&["orders", "room", room_id.as_str()]).await {
                Ok(payload) => payload,
                Err(HttpError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
        payload
            .and_then(OneOrMany::into_first)
            .map(|dto| dto.into_summary(room_id).map_err(HttpError::Unexpected))
            .transpose()
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ChatApi for HttpApiClient {
    async fn fetch_history(&self, room_id: &RoomId) -> std::result::Result<Vec<ChatMessage>, ApiError> {
        let rows: Option<Vec<MessageDto>> =
            self.get(&["chat", room_id.as_str(), "messages"]).await?;
        let rows = rows.unwrap_or_default();
        let total = rows.len();
        let messages: Vec<ChatMessage> = rows
            .into_iter()
            .filter_map(|row| row.into_message(room_id))
            .collect();
        if messages.len() < total {
            debug!(
                "Dropped {} of {} history rows for room {}",
                total - messages.len(),
                total,
                room_id
            );
        }
        Ok(messages)
    }

    async fn list_rooms(&self) -> std::result::Result<Vec<ChatRoom>, ApiError> {
        let rooms: Option<Vec<RoomDto>> = self.get(&["chat", "user", "rooms"]).await?;
        Ok(rooms
            .unwrap_or_default()
            .into_iter()
            .map(ChatRoom::from)
            .collect())
    }
}

#[async_trait]
impl OrderApi for HttpApiClient {
    async fn fetch_by_room(
        &self,
        room_id: &RoomId,
    ) -> std::result::Result<Option<OrderSummary>, ApiError> {
        Ok(self.fetch_order(room_id).await?)
    }

    async fn create(
        &self,
        course_id: &CourseId,
        room_id: &RoomId,
    ) -> std::result::Result<OrderSummary, ApiError> {
        let request = CreateOrderRequest {
            course_id: course_id.as_str(),
            room_id: room_id.as_str(),
        };
        let created = self
            .send_json(Method::POST, &["orders"], Some(&request))
            .await?;
        match serde_json::from_value::<OrderDto>(created) {
            Ok(dto) => Ok(dto.into_summary(room_id).map_err(HttpError::Unexpected)?),
            Err(e) => {
                // Some deployments answer with only a message; read it back.
                debug!("Create response carried no order ({}); fetching", e);
                self.fetch_order(room_id).await?.ok_or_else(|| {
                    ApiError::InvalidResponse(format!("order for room {room_id} not found after create"))
                })
            }
        }
    }

    async fn find_payment_for_order(
        &self,
        order_id: &OrderId,
    ) -> std::result::Result<Option<PaymentId>, ApiError> {
        let payment: Option<OneOrMany<PaymentDto>> =
            match self.get(&["payments", "order", order_id.as_str()]).await {
                Ok(payment) => payment,
                Err(HttpError::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            };
        Ok(payment
            .and_then(OneOrMany::into_first)
            .map(|p| p.payment_id)
            .filter(|id| !id.is_empty())
            .map(PaymentId::from))
    }

    async fn complete_payment(&self, payment_id: &PaymentId) -> std::result::Result<(), ApiError> {
        self.send_json(
            Method::PUT,
            &["payments", payment_id.as_str(), "complete"],
            None::<&Value>,
        )
        .await?;
        Ok(())
    }

    async fn mark_customer_completed(&self, order_id: &OrderId) -> std::result::Result<(), ApiError> {
        self.send_json(
            Method::PATCH,
            &["orders", "customer", order_id.as_str()],
            None::<&Value>,
        )
        .await?;
        Ok(())
    }

    async fn mark_prophet_completed(&self, order_id: &OrderId) -> std::result::Result<(), ApiError> {
        self.send_json(
            Method::PATCH,
            &["orders", "prophet", order_id.as_str()],
            None::<&Value>,
        )
        .await?;
        Ok(())
    }

    async fn submit_review(
        &self,
        course_id: &CourseId,
        customer_id: &UserId,
        review: &Review,
    ) -> std::result::Result<(), ApiError> {
        let name = self.display_name.as_deref().unwrap_or(ANONYMOUS);
        let request = ReviewRequest::new(customer_id.as_str(), name, review);
        if let Err(e) = self
            .send_json(
                Method::POST,
                &["courses", course_id.as_str(), "review"],
                Some(&request),
            )
            .await
        {
            warn!("Review for course {} failed: {}", course_id, e);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentialProvider;
    use horo_application::CredentialError;
    use horo_domain::{Credential, OrderStatus};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::watch;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// A request as seen by [`ScriptedServer`].
    #[derive(Debug, Clone)]
    struct Seen {
        line: String,
        authorization: Option<String>,
        body: String,
    }

    /// Minimal HTTP/1.1 server answering with scripted `(status, body)`
    /// pairs in order.
    struct ScriptedServer {
        base_url: String,
        seen: Arc<Mutex<Vec<Seen>>>,
    }

    impl ScriptedServer {
        async fn start(responses: Vec<(u16, &str)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let seen = Arc::new(Mutex::new(Vec::new()));
            let script: Arc<Mutex<VecDeque<(u16, String)>>> = Arc::new(Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| (status, body.to_string()))
                    .collect(),
            ));

            let seen_by_server = Arc::clone(&seen);
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let Some(request) = read_request(&mut socket).await else {
                        continue;
                    };
                    seen_by_server.lock().unwrap().push(request);
                    let (status, body) = script
                        .lock()
                        .unwrap()
                        .pop_front()
                        .unwrap_or((500, "{\"message\":\"unscripted\"}".into()));
                    let response = format!(
                        "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });

            Self {
                base_url: format!("http://{addr}/api"),
                seen,
            }
        }

        fn seen(&self) -> Vec<Seen> {
            self.seen.lock().unwrap().clone()
        }
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<Seen> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.lines();
        let line = lines.next()?.to_string();
        let mut authorization = None;
        let mut content_length = 0usize;
        for header in lines {
            if let Some((name, value)) = header.split_once(':') {
                match name.trim().to_ascii_lowercase().as_str() {
                    "authorization" => authorization = Some(value.trim().to_string()),
                    "content-length" => content_length = value.trim().parse().unwrap_or(0),
                    _ => {}
                }
            }
        }
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
        Some(Seen {
            line,
            authorization,
            body,
        })
    }

    /// Hands out the next token on every forced refresh.
    struct RotatingCredentials {
        tokens: Mutex<VecDeque<Credential>>,
        changes: watch::Sender<Option<Credential>>,
    }

    #[async_trait]
    impl CredentialProvider for RotatingCredentials {
        async fn token(&self, force_refresh: bool) -> std::result::Result<Credential, CredentialError> {
            let mut tokens = self.tokens.lock().unwrap();
            if force_refresh && tokens.len() > 1 {
                tokens.pop_front();
            }
            tokens.front().cloned().ok_or(CredentialError::Unavailable)
        }

        fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
            self.changes.subscribe()
        }
    }

    fn client(server: &ScriptedServer, tokens: &[&str]) -> HttpApiClient {
        let credentials = Arc::new(RotatingCredentials {
            tokens: Mutex::new(tokens.iter().map(|t| Credential::new(*t)).collect()),
            changes: watch::channel(None).0,
        });
        HttpApiClient::new(&server.base_url, Duration::from_secs(5), credentials).unwrap()
    }

    const ORDER: &str = r#"{"data":[{"order_id":"o1","room_id":"r1","course_id":"C1","customer_id":"c1","is_customer_completed":false,"is_prophet_completed":false,"order_date":"2024-01-01T00:00:00Z","status":"CONFIRMED","amount":250}],"message":"ok"}"#;

    #[test]
    fn test_rejects_non_http_base() {
        let credentials = Arc::new(StaticCredentialProvider::new(Credential::new("t")));
        assert!(matches!(
            HttpApiClient::new("ws://host/api", Duration::from_secs(1), credentials),
            Err(HttpError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_by_room_sends_bearer_and_unwraps() {
        let server = ScriptedServer::start(vec![(200, ORDER)]).await;
        let api = client(&server, &["tok"]);

        let order = api.fetch_by_room(&"r1".into()).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.amount, 250.0);

        let seen = server.seen();
        assert_eq!(seen[0].line, "GET /api/orders/room/r1 HTTP/1.1");
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_empty_order_payload_is_none() {
        let server = ScriptedServer::start(vec![
            (200, r#"{"data":[],"message":"no order"}"#),
            (404, r#"{"message":"not found"}"#),
        ])
        .await;
        let api = client(&server, &["tok"]);

        assert_eq!(api.fetch_by_room(&"r1".into()).await.unwrap(), None);
        assert_eq!(api.fetch_by_room(&"r1".into()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unauthorized_retries_once_with_fresh_credential() {
        let server = ScriptedServer::start(vec![(401, ""), (200, ORDER)]).await;
        let api = client(&server, &["old", "new"]);

        assert!(api.fetch_by_room(&"r1".into()).await.unwrap().is_some());
        let auth: Vec<_> = server
            .seen()
            .into_iter()
            .map(|s| s.authorization.unwrap_or_default())
            .collect();
        assert_eq!(auth, vec!["Bearer old", "Bearer new"]);
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_returned() {
        let server = ScriptedServer::start(vec![(401, ""), (401, "")]).await;
        let api = client(&server, &["old", "new"]);

        assert_eq!(
            api.list_rooms().await.unwrap_err(),
            ApiError::Unauthorized
        );
        assert_eq!(server.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_message_is_extracted() {
        let server =
            ScriptedServer::start(vec![(500, r#"{"message":"database down"}"#)]).await;
        let api = client(&server, &["tok"]);

        assert_eq!(
            api.mark_prophet_completed(&"o1".into()).await.unwrap_err(),
            ApiError::Status {
                status: 500,
                message: "database down".into()
            }
        );
        assert_eq!(server.seen()[0].line, "PATCH /api/orders/prophet/o1 HTTP/1.1");
    }

    #[tokio::test]
    async fn test_create_posts_course_and_room() {
        let created = r#"{"data":{"order_id":"o9","room_id":"r1","course_id":"C1","customer_id":"c1","status":"PENDING","amount":0},"message":"created"}"#;
        let server = ScriptedServer::start(vec![(201, created)]).await;
        let api = client(&server, &["tok"]);

        let order = api.create(&"C1".into(), &"r1".into()).await.unwrap();
        assert_eq!(order.order_id.as_str(), "o9");
        assert_eq!(order.status, OrderStatus::Pending);

        let seen = server.seen();
        assert_eq!(seen[0].line, "POST /api/orders HTTP/1.1");
        let body: Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body, serde_json::json!({"courseId": "C1", "roomId": "r1"}));
    }

    #[tokio::test]
    async fn test_create_without_order_in_response_reads_back() {
        let server =
            ScriptedServer::start(vec![(201, r#"{"message":"created"}"#), (200, ORDER)]).await;
        let api = client(&server, &["tok"]);

        let order = api.create(&"C1".into(), &"r1".into()).await.unwrap();
        assert_eq!(order.order_id.as_str(), "o1");
        assert_eq!(server.seen()[1].line, "GET /api/orders/room/r1 HTTP/1.1");
    }

    #[tokio::test]
    async fn test_payment_lookup_and_completion() {
        let server = ScriptedServer::start(vec![
            (200, r#"{"data":{"payment_id":"p1"}}"#),
            (200, r#"{"message":"ok"}"#),
        ])
        .await;
        let api = client(&server, &["tok"]);

        let payment = api.find_payment_for_order(&"o1".into()).await.unwrap();
        assert_eq!(payment, Some(PaymentId::from("p1")));
        api.complete_payment(&"p1".into()).await.unwrap();

        let lines: Vec<_> = server.seen().into_iter().map(|s| s.line).collect();
        assert_eq!(
            lines,
            vec![
                "GET /api/payments/order/o1 HTTP/1.1",
                "PUT /api/payments/p1/complete HTTP/1.1"
            ]
        );
    }

    #[tokio::test]
    async fn test_history_and_rooms() {
        let server = ScriptedServer::start(vec![
            (
                200,
                r#"{"data":[{"ID":"m1","RoomID":"r1","SenderID":"u1","Content":"hi","Type":"text","CreatedAt":"2024-01-01T00:00:00Z"}]}"#,
            ),
            (
                200,
                r#"{"data":[{"ID":"r1","ProphetID":"p1","CustomerID":"c1","CourseID":"C1","CreatedAt":"2024-01-01T00:00:00Z","LastMessage":"","IsDone":false}]}"#,
            ),
        ])
        .await;
        let api = client(&server, &["tok"]);

        let history = api.fetch_history(&"r1".into()).await.unwrap();
        assert_eq!(history.len(), 1);
        let rooms = api.list_rooms().await.unwrap();
        assert_eq!(rooms[0].course_id.as_str(), "C1");

        assert_eq!(server.seen()[0].line, "GET /api/chat/r1/messages HTTP/1.1");
        assert_eq!(server.seen()[1].line, "GET /api/chat/user/rooms HTTP/1.1");
    }

    #[tokio::test]
    async fn test_submit_review_body() {
        let server = ScriptedServer::start(vec![(201, r#"{"message":"ok"}"#)]).await;
        let api = client(&server, &["tok"]).with_display_name("Alice");
        let review = Review::new(4, "Insightful", "Would book again").unwrap();

        api.submit_review(&"C1".into(), &"c1".into(), &review)
            .await
            .unwrap();

        let seen = server.seen();
        assert_eq!(seen[0].line, "POST /api/courses/C1/review HTTP/1.1");
        let body: Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["customername"], "Alice");
        assert_eq!(body["score"], 4);
    }
}
