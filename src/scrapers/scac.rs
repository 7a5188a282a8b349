//! Stanford Securities Class Action Clearinghouse (SCAC) client.
//!
//! The site exposes a few semi-documented JSON endpoints behind its search
//! UI:
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `index.html` | GET | primes session cookies |
//! | `login.json` | POST | form login |
//! | `filings.json` | POST/GET | paged filings listing (`page`, `ajax=true`) |
//! | `filings-case.json` | GET | one case as JSON (`id`) |
//! | `filings-case.php` | GET | one case as HTML (`id`) |
//!
//! Without a login the listing serves the first page only, so callers walk
//! it in first-page-only mode unless [`ScacClient::is_authenticated`].

use crate::config::HttpConfig;
use crate::error::{Result, ScrapeError};
use crate::models::{CaseDetails, LoginResult, PageResult, Record, RECORD_ID_FIELD};
use crate::utils::truncate_for_log;
use crate::walker::PageSource;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Response;
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, info, instrument};
use url::Url;

static COURT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<strong>COURT:</strong>\s*([^<]+)").expect("static regex is valid")
});
static MARKET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<strong>Company Market:</strong>\s*([^<]+)").expect("static regex is valid")
});
static TICKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<strong>Ticker Symbol:</strong>\s*([^<]+)").expect("static regex is valid")
});

/// Account credentials. The password never shows up in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Both halves present and non-empty, or nothing.
    pub fn from_parts(email: Option<String>, password: Option<String>) -> Option<Self> {
        match (email, password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(Self { email, password })
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How the listing endpoint is queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FetchMethod {
    /// Form POST; required for pagination when logged in.
    #[default]
    Post,
    Get,
}

/// Session-holding client for the SCAC endpoints.
#[derive(Debug)]
pub struct ScacClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
    authenticated: bool,
    filters: Vec<(String, String)>,
    method: FetchMethod,
}

impl ScacClient {
    pub fn new(config: &HttpConfig, credentials: Option<Credentials>) -> Result<Self> {
        let base_url = Url::parse(&config.normalized_base_url())
            .map_err(|e| ScrapeError::Config(format!("invalid SCAC base URL: {e}")))?;
        Ok(Self {
            http: config.build_client()?,
            base_url,
            credentials,
            authenticated: false,
            filters: Vec::new(),
            method: FetchMethod::Post,
        })
    }

    /// Extra form fields sent with every listing request (search filters).
    pub fn with_filters(mut self, filters: Vec<(String, String)>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_method(mut self, method: FetchMethod) -> Self {
        self.method = method;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ScrapeError::Config(format!("cannot join {path:?} onto base URL: {e}")))
    }

    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<(Url, Response)> {
        let url = self.url(path)?;
        let response = self
            .http
            .get(url.clone())
            .query(query)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| ScrapeError::transport(url.as_str(), e))?;
        Ok((url, response))
    }

    async fn post_form(&self, path: &str, form: &[(String, String)]) -> Result<(Url, Response)> {
        let url = self.url(path)?;
        let response = self
            .http
            .post(url.clone())
            .form(form)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| ScrapeError::transport(url.as_str(), e))?;
        Ok((url, response))
    }

    /// Prime the session with initial cookies.
    #[instrument(level = "debug", skip_all)]
    pub async fn bootstrap(&self) -> Result<()> {
        self.get("index.html", &[]).await?;
        debug!("Session bootstrapped");
        Ok(())
    }

    /// Bootstrap, then log in with the stored credentials.
    #[instrument(level = "info", skip_all)]
    pub async fn login(&mut self) -> Result<LoginResult> {
        let Some(credentials) = self.credentials.clone() else {
            return Err(ScrapeError::Authentication(
                "email and password must be provided for login".to_string(),
            ));
        };

        self.bootstrap().await?;
        let form = vec![
            ("email".to_string(), credentials.email),
            ("pass".to_string(), credentials.password),
            ("remember".to_string(), "0".to_string()),
            ("referer".to_string(), "index".to_string()),
            ("returnTo".to_string(), String::new()),
        ];
        let (url, response) = self.post_form("login.json", &form).await?;
        let body = read_json(&url, response).await?;

        let redirect = body.get("redirect").and_then(Value::as_str).map(str::to_string);
        let result = LoginResult {
            success: truthy(body.get("success")) || truthy(body.get("redirect")),
            errors: body.get("errors").cloned(),
            redirect,
        };

        if !result.success {
            let detail = match &result.errors {
                Some(errors) if truthy(Some(errors)) => errors.to_string(),
                _ => body.to_string(),
            };
            error!(detail = %truncate_for_log(&detail, 300), "Login failed");
            return Err(ScrapeError::Authentication(format!("SCAC login failed: {detail}")));
        }

        self.authenticated = true;
        info!("Logged in");
        Ok(result)
    }

    /// Retrieve one page of `filings.json`.
    #[instrument(level = "debug", skip(self, params))]
    pub async fn fetch_filings_page(
        &self,
        page: i64,
        params: &[(String, String)],
        method: FetchMethod,
    ) -> Result<PageResult> {
        let mut form = vec![
            ("page".to_string(), page.to_string()),
            ("ajax".to_string(), "true".to_string()),
        ];
        merge_params(&mut form, params);

        let (url, response) = match method {
            FetchMethod::Post => self.post_form("filings.json", &form).await?,
            FetchMethod::Get => self.get("filings.json", &form).await?,
        };
        let body = read_json(&url, response).await?;
        PageResult::from_value(url.as_str(), body)
    }

    /// Fetch one case from `filings-case.json`.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_case_detail(&self, cld_id: &str) -> Result<Record> {
        let query = [("id".to_string(), cld_id.to_string())];
        let (url, response) = self.get("filings-case.json", &query).await?;
        let mut body = read_json(&url, response).await?;
        match body.get_mut("record").map(Value::take) {
            Some(Value::Object(record)) if !record.is_empty() => Ok(record),
            _ => Err(ScrapeError::malformed(
                url.as_str(),
                format!("case detail not returned for cld_id={cld_id}"),
            )),
        }
    }

    /// Scrape court, exchange, and ticker from the HTML case page.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_case_details_from_html(&self, cld_id: &str) -> Result<CaseDetails> {
        let query = [("id".to_string(), cld_id.to_string())];
        let (url, response) = self.get("filings-case.php", &query).await?;
        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::transport(url.as_str(), e))?;
        Ok(parse_case_details(&html))
    }

    /// One-shot advanced search: page 1 of `filings.json` via GET.
    #[instrument(level = "info", skip(self))]
    pub async fn perform_advanced_search(&self, params: &[(String, String)]) -> Result<PageResult> {
        let mut query = vec![
            ("ajax".to_string(), "true".to_string()),
            ("page".to_string(), "1".to_string()),
        ];
        merge_params(&mut query, params);
        let (url, response) = self.get("filings.json", &query).await?;
        let body = read_json(&url, response).await?;
        let page = PageResult::from_value(url.as_str(), body)?;
        if let Some(first) = page.records.first() {
            let sample = Value::Object(first.clone()).to_string();
            debug!(sample = %truncate_for_log(&sample, 500), "Sample record");
        }
        Ok(page)
    }
}

impl PageSource for ScacClient {
    async fn fetch_page(&self, page: i64) -> Result<PageResult> {
        self.fetch_filings_page(page, &self.filters, self.method).await
    }
}

/// Later values replace earlier keys; new keys are appended.
fn merge_params(base: &mut Vec<(String, String)>, extra: &[(String, String)]) {
    for (key, value) in extra {
        match base.iter_mut().find(|(k, _)| k == key) {
            Some(slot) if !key.ends_with("[]") => slot.1 = value.clone(),
            _ => base.push((key.clone(), value.clone())),
        }
    }
}

async fn read_json(url: &Url, response: Response) -> Result<Value> {
    let text = response
        .text()
        .await
        .map_err(|e| ScrapeError::transport(url.as_str(), e))?;
    serde_json::from_str(&text).map_err(|e| {
        ScrapeError::malformed(
            url.as_str(),
            format!("invalid JSON ({e}): {}", truncate_for_log(&text, 200)),
        )
    })
}

/// JSON truthiness as the login endpoint uses it.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// The record's `cld_id` as a query parameter, if it has a usable one.
pub fn cld_id_param(record: &Record) -> Option<String> {
    match record.get(RECORD_ID_FIELD)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract the labelled fields from a case page. Missing fields stay empty.
pub fn parse_case_details(html: &str) -> CaseDetails {
    let grab = |re: &Regex| {
        re.captures(html)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default()
    };
    CaseDetails {
        court: grab(&COURT),
        exchange: grab(&MARKET),
        ticker: grab(&TICKER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::{FilingsWalker, StopReason, WalkerOptions};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CASE_HTML: &str = r#"
        <div class="panel">
          <p><strong>COURT:</strong> S.D. New York </p>
          <p><strong>Company Market:</strong>
             NASDAQ</p>
          <p><strong>ticker symbol:</strong> ACME</p>
        </div>"#;

    fn client_for(server: &MockServer, credentials: Option<Credentials>) -> ScacClient {
        let mut config = HttpConfig::scac();
        config.base_url = server.uri();
        ScacClient::new(&config, credentials).unwrap()
    }

    fn creds() -> Option<Credentials> {
        Credentials::from_parts(Some("a@b.edu".into()), Some("hunter2".into()))
    }

    #[test]
    fn test_parse_case_details() {
        let details = parse_case_details(CASE_HTML);
        assert_eq!(
            details,
            CaseDetails {
                court: "S.D. New York".into(),
                exchange: "NASDAQ".into(),
                ticker: "ACME".into(),
            }
        );
    }

    #[test]
    fn test_parse_case_details_missing_fields() {
        let details = parse_case_details("<html><strong>COURT:</strong> D. Del.</html>");
        assert_eq!(details.court, "D. Del.");
        assert_eq!(details.exchange, "");
        assert_eq!(details.ticker, "");
    }

    #[test]
    fn test_credentials_require_both_parts() {
        assert!(Credentials::from_parts(Some("a".into()), None).is_none());
        assert!(Credentials::from_parts(Some("".into()), Some("p".into())).is_none());
        let c = Credentials::from_parts(Some("a".into()), Some("secret".into())).unwrap();
        assert!(!format!("{c:?}").contains("secret"));
    }

    #[test]
    fn test_cld_id_param() {
        let rec = |v: Value| -> Record { serde_json::from_value(v).unwrap() };
        assert_eq!(cld_id_param(&rec(json!({"cld_id": 108640}))).as_deref(), Some("108640"));
        assert_eq!(cld_id_param(&rec(json!({"cld_id": " 42 "}))).as_deref(), Some("42"));
        assert_eq!(cld_id_param(&rec(json!({"cld_id": 0}))), None);
        assert_eq!(cld_id_param(&rec(json!({"cld_id": ""}))), None);
        assert_eq!(cld_id_param(&rec(json!({}))), None);
    }

    #[test]
    fn test_merge_params() {
        let mut base = vec![("page".to_string(), "1".to_string())];
        merge_params(
            &mut base,
            &[
                ("page".into(), "3".into()),
                ("claims[]".into(), "a".into()),
                ("claims[]".into(), "b".into()),
            ],
        );
        assert_eq!(base[0].1, "3");
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn test_truthy() {
        assert!(truthy(Some(&json!(true))));
        assert!(truthy(Some(&json!("/members"))));
        assert!(truthy(Some(&json!(1))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(""))));
        assert!(!truthy(Some(&json!({}))));
        assert!(!truthy(None));
    }

    #[tokio::test]
    async fn test_login_success_via_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login.json"))
            .and(body_string_contains("email=a%40b.edu"))
            .and(body_string_contains("pass=hunter2"))
            .and(body_string_contains("referer=index"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"redirect": "/members"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server, creds());
        let result = client.login().await.unwrap();
        assert!(result.success);
        assert_eq!(result.redirect.as_deref(), Some("/members"));
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "errors": {"pass": "wrong"}})),
            )
            .mount(&server)
            .await;

        let mut client = client_for(&server, creds());
        let err = client.login().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Authentication(_)));
        assert!(err.to_string().contains("wrong"));
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_without_credentials() {
        let server = MockServer::start().await;
        let mut client = client_for(&server, None);
        assert!(!client.has_credentials());
        let err = client.login().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_fetch_filings_page_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/filings.json"))
            .and(body_string_contains("page=2"))
            .and(body_string_contains("ajax=true"))
            .and(body_string_contains("yearFrom=2001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "foundset": [{"cld_id": 5, "filed": "new Date(0)"}],
                "pagination": {"current": 2, "last": 3}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let page = client
            .fetch_filings_page(2, &[("yearFrom".into(), "2001".into())], FetchMethod::Post)
            .await
            .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.pagination.current_index(), Some(2));
    }

    #[tokio::test]
    async fn test_fetch_filings_page_via_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/filings.json"))
            .and(query_param("page", "1"))
            .and(query_param("ajax", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"foundset": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let page = client.fetch_filings_page(1, &[], FetchMethod::Get).await.unwrap();
        assert!(page.records.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/filings.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client.fetch_filings_page(1, &[], FetchMethod::Post).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_non_json_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/filings.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login required</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client.fetch_filings_page(1, &[], FetchMethod::Post).await.unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_case_detail_json_and_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/filings-case.json"))
            .and(query_param("id", "108640"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "record": {"cld_id": 108640, "court": "SDNY"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/filings-case.json"))
            .and(query_param("id", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"record": null})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/filings-case.php"))
            .and(query_param("id", "108640"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CASE_HTML))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let detail = client.fetch_case_detail("108640").await.unwrap();
        assert_eq!(detail["court"], json!("SDNY"));

        let err = client.fetch_case_detail("1").await.unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedResponse { .. }));

        let details = client.fetch_case_details_from_html("108640").await.unwrap();
        assert_eq!(details.ticker, "ACME");
    }

    #[tokio::test]
    async fn test_advanced_search_uses_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/filings.json"))
            .and(query_param("page", "1"))
            .and(query_param("claims[]", "1934 act claims - section 10b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "foundset": [{"cld_id": 9}],
                "pagination": {"current": 1, "last": 40}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let page = client
            .perform_advanced_search(&[("claims[]".into(), "1934 act claims - section 10b".into())])
            .await
            .unwrap();
        assert_eq!(page.pagination.last_index(), Some(40));
    }

    #[tokio::test]
    async fn test_walker_over_client() {
        let server = MockServer::start().await;
        for (page, ids, last) in [(1, vec![1, 2], 2), (2, vec![2, 3], 2)] {
            let foundset: Vec<Value> = ids.iter().map(|id| json!({"cld_id": id})).collect();
            Mock::given(method("POST"))
                .and(path("/filings.json"))
                .and(body_string_contains(format!("page={page}&")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "foundset": foundset,
                    "pagination": {"current": page, "last": last}
                })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = client_for(&server, None);
        let mut walker = FilingsWalker::new(&client, WalkerOptions::default());
        let mut seen = Vec::new();
        while let Some(record) = walker.next().await.unwrap() {
            seen.push(record["cld_id"].clone());
        }
        assert_eq!(seen, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(walker.stop_reason(), Some(StopReason::LastPage { page: 2, last: 2 }));
    }
}
