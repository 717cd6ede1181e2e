//! Mount-time sequencing for the dashboard.
//!
//! `Uninitialized -> ContextLoaded -> DataLoaded` on success, or
//! `Uninitialized -> ContextFailed` when the host gives no context. The
//! sequence runs once per controller; a reload means a new controller.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ContainerKind, DashboardConfig};
use crate::context::{HostContextProvider, get_host_context};
use crate::error::{AdapterError, AdapterResult};
use crate::graph::GraphClient;
use crate::model::{
    Assignment, CardFacts, Container, EducationClass, HostContext, Profile, ReflectionDraft,
    Submission, WellbeingScores,
};
use crate::token::{AccessToken, TokenProvider, acquire_for_current_account};
use crate::view::{DashboardView, Language, PageInput};

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    Uninitialized,
    ContextFailed,
    ContextLoaded(HostContext),
    DataLoaded {
        context: HostContext,
        data: DashboardData,
    },
}

/// Whatever the parallel fetches produced; `None` marks a failed fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub assignments: Option<Vec<Assignment>>,
    pub profile: Option<Profile>,
    pub class_details: Option<EducationClass>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub container: ContainerKind,
    pub language: Language,
    pub course_label: String,
    pub scores: WellbeingScores,
}

impl From<&DashboardConfig> for DashboardSettings {
    fn from(cfg: &DashboardConfig) -> Self {
        Self {
            container: cfg.container,
            language: cfg.language,
            course_label: cfg.course_label.clone(),
            scores: WellbeingScores::default(),
        }
    }
}

pub struct DashboardController {
    host: Arc<dyn HostContextProvider>,
    tokens: Arc<dyn TokenProvider>,
    graph: GraphClient,
    settings: DashboardSettings,
    state: DashboardState,
    draft: ReflectionDraft,
    cancel: CancellationToken,
    mounted: bool,
    last_error: Option<AdapterError>,
}

impl DashboardController {
    pub fn new(
        host: Arc<dyn HostContextProvider>,
        tokens: Arc<dyn TokenProvider>,
        graph: GraphClient,
        settings: DashboardSettings,
    ) -> Self {
        Self {
            host,
            tokens,
            graph,
            settings,
            state: DashboardState::Uninitialized,
            draft: ReflectionDraft::default(),
            cancel: CancellationToken::new(),
            mounted: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Most recent failure swallowed by the controller, if any.
    pub fn last_error(&self) -> Option<&AdapterError> {
        self.last_error.as_ref()
    }

    /// Handle that aborts every in-flight adapter call when cancelled.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn unmount(&mut self) {
        self.cancel.cancel();
    }

    pub async fn mount(&mut self) -> &DashboardState {
        if self.mounted {
            debug!("dashboard already mounted");
            return &self.state;
        }
        self.mounted = true;

        let context = match get_host_context(self.host.as_ref(), &self.cancel).await {
            Ok(ctx) => ctx,
            Err(AdapterError::Cancelled) => {
                self.last_error = Some(AdapterError::Cancelled);
                return &self.state;
            }
            Err(err) => {
                self.state = DashboardState::ContextFailed;
                self.last_error = Some(err);
                return &self.state;
            }
        };
        self.state = DashboardState::ContextLoaded(context.clone());
        debug!("dashboard context loaded");

        let container = match context.container(self.settings.container) {
            Ok(container) => container,
            Err(err) => {
                warn!(error = %err, "cannot resolve assignment container");
                self.last_error = Some(err);
                return &self.state;
            }
        };

        let token = match self.acquire_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "error acquiring access token");
                self.last_error = Some(err);
                return &self.state;
            }
        };

        match self.load_data(&token, &container).await {
            Ok(data) => {
                info!(
                    assignments = data.assignments.as_ref().map(Vec::len),
                    profile = data.profile.is_some(),
                    "dashboard data loaded"
                );
                self.state = DashboardState::DataLoaded { context, data };
            }
            Err(err) => {
                debug!("dashboard load cancelled");
                self.last_error = Some(err);
            }
        }
        &self.state
    }

    async fn acquire_token(&self) -> AdapterResult<AccessToken> {
        let scopes = self.settings.container.scopes();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AdapterError::Cancelled),
            result = acquire_for_current_account(self.tokens.as_ref(), scopes) => result,
        }
    }

    /// Runs the independent fetches concurrently. Individual failures degrade
    /// to `None`; only cancellation aborts the whole load.
    async fn load_data(
        &self,
        token: &AccessToken,
        container: &Container,
    ) -> AdapterResult<DashboardData> {
        let assignments = self.graph.fetch_assignments(token, container, &self.cancel);
        let profile = self
            .graph
            .fetch_profile(token, container.kind(), &self.cancel);
        let class_details = async {
            match container {
                Container::Class { class_id } => self
                    .graph
                    .fetch_class_details(token, class_id, &self.cancel)
                    .await
                    .map(Some),
                Container::Team { .. } => Ok(None),
            }
        };
        let (assignments, profile, class_details) =
            tokio::join!(assignments, profile, class_details);

        for result in [
            assignments.as_ref().err(),
            profile.as_ref().err(),
            class_details.as_ref().err(),
        ] {
            if let Some(AdapterError::Cancelled) = result {
                return Err(AdapterError::Cancelled);
            }
        }

        Ok(DashboardData {
            assignments: degrade("assignments", assignments),
            profile: degrade("profile", profile),
            class_details: degrade("class details", class_details).flatten(),
        })
    }

    /// The host context, once mount has produced one. Adapter calls outside
    /// the mount sequence are refused until then.
    pub fn context(&self) -> AdapterResult<&HostContext> {
        match &self.state {
            DashboardState::ContextLoaded(context)
            | DashboardState::DataLoaded { context, .. } => Ok(context),
            DashboardState::Uninitialized => Err(AdapterError::HostUnavailable(
                "dashboard is not mounted".to_string(),
            )),
            DashboardState::ContextFailed => Err(AdapterError::HostUnavailable(
                "host context failed to load".to_string(),
            )),
        }
    }

    pub fn draft(&self) -> &ReflectionDraft {
        &self.draft
    }

    pub fn update_reflection(&mut self, text: impl Into<String>) {
        self.draft.set_text(text);
    }

    /// Submits the current draft. Blank drafts fail validation without
    /// touching the network; an unmounted or failed controller reports
    /// `HostUnavailable`.
    pub async fn submit_reflection(
        &self,
        class_id: &str,
        assignment_id: &str,
    ) -> AdapterResult<Submission> {
        if self.draft.is_blank() {
            return Err(AdapterError::InvalidInput(
                "reflection text is empty".to_string(),
            ));
        }
        self.context()?;
        let token = self.acquire_token().await?;
        let result = self
            .graph
            .submit_reflection(&token, class_id, assignment_id, self.draft.text(), &self.cancel)
            .await;
        if let Err(err) = &result {
            warn!(error = %err, "error submitting reflection");
        }
        result
    }

    /// Posts the facts card to a channel. Failures are logged, never returned.
    pub async fn share_progress(
        &self,
        team_id: &str,
        channel_id: &str,
        facts: CardFacts,
    ) -> Option<String> {
        if let Err(err) = self.context() {
            warn!(error = %err, "channel card needs a host context");
            return None;
        }
        let token = match self.acquire_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "error acquiring token for channel card");
                return None;
            }
        };
        match self
            .graph
            .post_adaptive_card(&token, team_id, channel_id, &facts, &self.cancel)
            .await
        {
            Ok(message_id) => Some(message_id),
            Err(err) => {
                warn!(error = %err, team_id, channel_id, "error posting channel card");
                None
            }
        }
    }

    pub fn view(&self) -> DashboardView {
        let (context, data) = match &self.state {
            DashboardState::Uninitialized | DashboardState::ContextFailed => {
                return DashboardView::loading();
            }
            DashboardState::ContextLoaded(context) => (context, None),
            DashboardState::DataLoaded { context, data } => (context, Some(data)),
        };
        let language = context
            .locale()
            .and_then(Language::from_locale)
            .unwrap_or(self.settings.language);
        let student_name = data
            .and_then(|d| d.profile.as_ref())
            .and_then(|p| p.display_name.as_deref());
        let course_label = data
            .and_then(|d| d.class_details.as_ref())
            .and_then(|c| c.display_name.as_deref())
            .unwrap_or(&self.settings.course_label);
        let assignments = data
            .and_then(|d| d.assignments.as_deref())
            .unwrap_or_default();
        DashboardView::page(PageInput {
            language,
            student_name,
            course_label,
            scores: self.settings.scores,
            reflection_text: self.draft.text(),
            assignments,
        })
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn degrade<T>(what: &str, result: AdapterResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, kind = ?err.kind(), "error fetching {what}");
            None
        }
    }
}
