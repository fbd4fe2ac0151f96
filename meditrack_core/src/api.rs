//! REST surface of the MediTracker backend.
//!
//! Every call is first described as an [`ApiRequest`] (method, path,
//! query, JSON body) and then handed to a [`Backend`]. The HTTP
//! implementation adds the bearer token and maps error statuses onto
//! [`Error`] variants.

use crate::{Error, LoginRequest, Medicine, PrescriptionRequest, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Largest page the medicine listing accepts
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A backend call described as data
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Whether the bearer token must be attached
    pub authenticated: bool,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            authenticated: true,
        }
    }

    fn with_body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn login(credentials: &LoginRequest) -> Result<Self> {
        let mut request = Self::new(Method::Post, "/auth/login").with_body(credentials)?;
        request.authenticated = false;
        Ok(request)
    }

    pub fn list_medicines() -> Self {
        Self::new(Method::Get, "/medicine")
    }

    pub fn medicines_paged(query: &MedicineQuery) -> Self {
        let mut request = Self::new(Method::Get, "/medicine/paged")
            .with_query("page", query.page)
            .with_query("size", query.size);
        if let Some(q) = &query.q {
            request = request.with_query("q", q);
        }
        request
    }

    pub fn get_medicine(id: i64) -> Self {
        Self::new(Method::Get, format!("/medicine/{}", id))
    }

    pub fn create_medicine(medicine: &Medicine) -> Result<Self> {
        Self::new(Method::Post, "/medicine").with_body(medicine)
    }

    pub fn update_medicine(id: i64, medicine: &Medicine) -> Result<Self> {
        Self::new(Method::Put, format!("/medicine/{}", id)).with_body(medicine)
    }

    pub fn delete_medicine(id: i64) -> Self {
        Self::new(Method::Delete, format!("/medicine/{}", id))
    }

    pub fn create_prescription(request: &PrescriptionRequest) -> Result<Self> {
        Self::new(Method::Post, "/prescriptions").with_body(request)
    }

    pub fn list_my_prescriptions() -> Self {
        Self::new(Method::Get, "/prescriptions/me")
    }

    pub fn list_users(role: Option<&str>, only: bool) -> Self {
        let request = Self::new(Method::Get, "/admin/users");
        match role.map(str::trim).filter(|r| !r.is_empty()) {
            Some(role) => request.with_query("role", role).with_query("only", only),
            None => request,
        }
    }

    pub fn list_roles() -> Self {
        Self::new(Method::Get, "/admin/roles")
    }

    pub fn update_user_roles(user_id: i64, roles: &[String]) -> Result<Self> {
        Self::new(Method::Put, format!("/admin/users/{}/roles", user_id))
            .with_body(&serde_json::json!({ "roles": roles }))
    }

    pub fn delete_user(user_id: i64) -> Self {
        Self::new(Method::Delete, format!("/admin/users/{}", user_id))
    }
}

/// Paging and search parameters for the medicine catalog
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MedicineQuery {
    /// Zero-based page index
    pub page: u32,
    pub size: u32,
    pub q: Option<String>,
}

impl MedicineQuery {
    /// Build a query, dropping a blank search term
    pub fn new(page: u32, size: u32, q: Option<&str>) -> Result<Self> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(Error::Validation(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let q = q.map(str::trim).filter(|q| !q.is_empty()).map(String::from);
        Ok(Self { page, size, q })
    }
}

/// Executes described requests against a backend
pub trait Backend {
    /// Send the request and return the decoded JSON body (`Null` when empty)
    fn execute(&self, request: &ApiRequest, token: Option<&str>) -> Result<Value>;
}

/// Blocking HTTP backend
pub struct HttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl Backend for HttpBackend {
    fn execute(&self, request: &ApiRequest, token: Option<&str>) -> Result<Value> {
        let url = self.url(&request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &url).query(&request.query);
        if request.authenticated {
            let token = token.ok_or(Error::NotAuthenticated)?;
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!("{} {}", request.method, url);

        let response = builder.send().map_err(|e| {
            if e.is_connect() {
                Error::Http(format!("Cannot reach backend at {}", self.base_url))
            } else if e.is_timeout() {
                Error::Http(format!("Request timed out after {}s", self.timeout_secs))
            } else {
                Error::Http(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().map_err(|e| Error::Http(e.to_string()))?;
        decode_response(status, &text)
    }
}

/// Map a status and raw body onto a JSON value or an error
pub fn decode_response(status: u16, body: &str) -> Result<Value> {
    if (200..300).contains(&status) {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(body)?);
    }

    let message = error_message(body).unwrap_or_else(|| format!("Request failed with status {}", status));
    tracing::warn!("Backend returned {}: {}", status, message);

    match status {
        401 => Err(Error::Unauthorized(message)),
        403 => Err(Error::Forbidden(message)),
        _ => Err(Error::Api { status, message }),
    }
}

/// The `error` field of a JSON error body, or the body text itself
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(json) => json
            .get("error")
            .or_else(|| json.get("message"))
            .and_then(Value::as_str)
            .map(String::from),
        Err(_) => Some(body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_is_unauthenticated_post() {
        let request = ApiRequest::login(&LoginRequest {
            email: "pat@example.org".into(),
            password: "secret".into(),
        })
        .unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/auth/login");
        assert!(!request.authenticated);
        assert_eq!(request.body.unwrap()["email"], "pat@example.org");
    }

    #[test]
    fn test_paged_query_omits_blank_search() {
        let query = MedicineQuery::new(2, 20, Some("   ")).unwrap();
        let request = ApiRequest::medicines_paged(&query);
        assert_eq!(request.path, "/medicine/paged");
        assert_eq!(
            request.query,
            vec![("page".into(), "2".into()), ("size".into(), "20".into())]
        );

        let query = MedicineQuery::new(0, 10, Some(" aspirin ")).unwrap();
        let request = ApiRequest::medicines_paged(&query);
        assert_eq!(request.query[2], ("q".into(), "aspirin".into()));
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(MedicineQuery::new(0, 0, None).is_err());
        assert!(MedicineQuery::new(0, MAX_PAGE_SIZE + 1, None).is_err());
        assert!(MedicineQuery::new(0, MAX_PAGE_SIZE, None).is_ok());
    }

    #[test]
    fn test_user_filters() {
        assert!(ApiRequest::list_users(None, true).query.is_empty());
        assert!(ApiRequest::list_users(Some(""), true).query.is_empty());
        assert_eq!(
            ApiRequest::list_users(Some("DOCTOR"), true).query,
            vec![("role".into(), "DOCTOR".into()), ("only".into(), "true".into())]
        );
    }

    #[test]
    fn test_mutation_paths() {
        assert_eq!(ApiRequest::delete_medicine(4).path, "/medicine/4");
        assert_eq!(ApiRequest::delete_user(9).method, Method::Delete);

        let request = ApiRequest::update_user_roles(9, &["ADMIN".to_string()]).unwrap();
        assert_eq!(request.path, "/admin/users/9/roles");
        assert_eq!(request.body.unwrap()["roles"][0], "ADMIN");
    }

    #[test]
    fn test_decode_success_and_empty_body() {
        assert_eq!(decode_response(200, "[1,2]").unwrap(), serde_json::json!([1, 2]));
        assert_eq!(decode_response(204, "").unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_error_statuses() {
        match decode_response(401, r#"{"error":"Invalid or expired token"}"#) {
            Err(Error::Unauthorized(msg)) => assert_eq!(msg, "Invalid or expired token"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            decode_response(403, r#"{"error":"Forbidden: Admin access required"}"#),
            Err(Error::Forbidden(_))
        ));
        match decode_response(400, "") {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Request failed with status 400");
            }
            other => panic!("unexpected: {:?}", other),
        }
        match decode_response(500, "boom") {
            Err(Error::Api { message, .. }) => assert_eq!(message, "boom"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_http_backend_trims_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8080/api/", 5).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8080/api");
        assert_eq!(backend.url("/medicine"), "http://localhost:8080/api/medicine");
        assert_eq!(backend.url("medicine"), "http://localhost:8080/api/medicine");
    }
}
