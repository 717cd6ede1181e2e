#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use student_dashboard::controller::DashboardSettings;
use student_dashboard::{
    AccessToken, Account, AdapterError, AdapterResult, ContainerKind, DashboardController,
    GraphClient, HostContext, HostContextProvider, HttpClient, HttpRequest, HttpResponse,
    Language, TokenProvider, WellbeingScores,
};

pub const GRAPH_BASE: &str = "https://graph.test/v1.0";

#[derive(Clone)]
pub enum Reply {
    Json(u16, Value),
    Raw(u16, &'static str),
    Pending,
    Transport(&'static str),
}

/// Graph stand-in: per-route canned replies plus a log of every request.
#[derive(Default)]
pub struct MockGraph {
    routes: Mutex<HashMap<(String, String), Reply>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl MockGraph {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: &str, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), reply);
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_posts(&self) -> Vec<HttpRequest> {
        self.sent()
            .into_iter()
            .filter(|req| req.method == "POST")
            .collect()
    }

    pub fn sent_paths(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|req| req.url.trim_start_matches(GRAPH_BASE).to_string())
            .collect()
    }
}

#[async_trait]
impl HttpClient for MockGraph {
    async fn send(&self, request: HttpRequest) -> AdapterResult<HttpResponse> {
        let path = request.url.trim_start_matches(GRAPH_BASE).to_string();
        let key = (request.method.clone(), path);
        self.sent.lock().unwrap().push(request);
        let reply = self.routes.lock().unwrap().get(&key).cloned();
        match reply {
            Some(Reply::Json(status, body)) => Ok(HttpResponse {
                status,
                body: serde_json::to_vec(&body).unwrap(),
            }),
            Some(Reply::Raw(status, body)) => Ok(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            }),
            Some(Reply::Pending) => std::future::pending().await,
            Some(Reply::Transport(message)) => Err(AdapterError::Transport(message.to_string())),
            None => Ok(HttpResponse {
                status: 404,
                body: br#"{"error":{"code":"NotFound","message":"no route"}}"#.to_vec(),
            }),
        }
    }
}

/// Token provider returning a fixed outcome and recording requested scopes.
pub struct MockTokens {
    accounts: Vec<Account>,
    outcome: Result<String, AdapterError>,
    calls: AtomicUsize,
    scopes: Mutex<Vec<Vec<String>>>,
}

impl MockTokens {
    pub fn signed_in(token: &str) -> Arc<Self> {
        Arc::new(Self {
            accounts: vec![Account {
                home_account_id: "uid.tid".into(),
                username: "jane@school.example".into(),
                refresh_token: None,
            }],
            outcome: Ok(token.to_string()),
            calls: AtomicUsize::new(0),
            scopes: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(err: AdapterError) -> Arc<Self> {
        Arc::new(Self {
            accounts: vec![Account {
                home_account_id: "uid.tid".into(),
                username: "jane@school.example".into(),
                refresh_token: None,
            }],
            outcome: Err(err),
            calls: AtomicUsize::new(0),
            scopes: Mutex::new(Vec::new()),
        })
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self {
            accounts: Vec::new(),
            outcome: Err(AdapterError::NoSession),
            calls: AtomicUsize::new(0),
            scopes: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_scopes(&self) -> Vec<Vec<String>> {
        self.scopes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenProvider for MockTokens {
    fn accounts(&self) -> Vec<Account> {
        self.accounts.clone()
    }

    async fn acquire_token_silent(
        &self,
        scopes: &[&str],
        _account: &Account,
    ) -> AdapterResult<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scopes
            .lock()
            .unwrap()
            .push(scopes.iter().map(|s| s.to_string()).collect());
        self.outcome
            .clone()
            .map(|secret| AccessToken::new(secret, Utc::now() + Duration::hours(1)))
    }
}

/// Host that either yields a fixed context or fails, counting calls.
pub struct MockHost {
    context: Option<HostContext>,
    calls: AtomicUsize,
}

impl MockHost {
    pub fn with(context: Value) -> Arc<Self> {
        Arc::new(Self {
            context: Some(serde_json::from_value(context).unwrap()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            context: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostContextProvider for MockHost {
    async fn initialize(&self) -> AdapterResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.context {
            Some(_) => Ok(()),
            None => Err(AdapterError::HostUnavailable(
                "not running inside Teams".into(),
            )),
        }
    }

    async fn get_context(&self) -> AdapterResult<HostContext> {
        self.context
            .clone()
            .ok_or_else(|| AdapterError::HostUnavailable("no context".into()))
    }
}

pub fn settings(container: ContainerKind) -> DashboardSettings {
    DashboardSettings {
        container,
        language: Language::En,
        course_label: "DTI 301 - Professional Ethics".into(),
        scores: WellbeingScores::default(),
    }
}

pub fn controller(
    host: Arc<MockHost>,
    tokens: Arc<MockTokens>,
    graph: Arc<MockGraph>,
    container: ContainerKind,
) -> DashboardController {
    DashboardController::new(
        host,
        tokens,
        GraphClient::new(graph, GRAPH_BASE),
        settings(container),
    )
}
