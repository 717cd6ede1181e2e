//! Student well-being dashboard for a Microsoft Teams tab.
//!
//! The crate is split into an integration adapter (host context, identity,
//! Graph REST calls) and a controller that sequences those calls on mount and
//! produces a localized view model.

pub mod card;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod graph;
pub mod http;
pub mod model;
pub mod token;
pub mod view;

pub use config::{ContainerKind, DashboardConfig};
pub use context::{HostContextProvider, StaticHostContext, get_host_context};
pub use controller::{DashboardController, DashboardData, DashboardState};
pub use error::{AdapterError, AdapterResult, ConfigError, ErrorKind};
pub use graph::GraphClient;
pub use http::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
pub use model::{
    Assignment, CardFacts, Container, EducationClass, HostContext, Profile, ReflectionDraft,
    Submission, WellbeingScores,
};
pub use token::{Account, AccessToken, SilentTokenClient, TokenProvider};
pub use view::{DashboardView, Language};

pub const DEFAULT_GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_AUTH_BASE: &str = "https://login.microsoftonline.com";
pub const DEFAULT_COURSE_LABEL: &str = "DTI 301 - Professional Ethics";

pub const CLASS_SCOPES: &[&str] = &[
    "User.Read",
    "Team.ReadBasic.All",
    "ChannelMessage.Read.All",
    "EduAssignments.Read",
    "EduAssignments.ReadWrite",
    "EduAssignments.ReadBasic",
    "EduAssignments.ReadWriteBasic",
];

pub const TEAM_SCOPES: &[&str] = &[
    "User.Read",
    "Team.ReadBasic.All",
    "ChannelMessage.Send",
    "EduAssignments.ReadBasic",
];

const TENANT_ID_KEY: &str = "DASHBOARD_TENANT_ID";
const CLIENT_ID_KEY: &str = "DASHBOARD_CLIENT_ID";
const REDIRECT_URI_KEY: &str = "DASHBOARD_REDIRECT_URI";
const CONTAINER_KEY: &str = "DASHBOARD_CONTAINER";
const LANGUAGE_KEY: &str = "DASHBOARD_LANGUAGE";
