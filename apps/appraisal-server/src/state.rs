//! Shared application state

use std::collections::HashMap;
use std::sync::Arc;

use appraisal_core::{AppraisalSession, GeneratorConfig, ReportGenerator};
use tokio::sync::Mutex;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    /// Sessions by id; each is only touched by its own requests
    pub sessions: Arc<Mutex<HashMap<String, AppraisalSession>>>,
    pub generator: Arc<ReportGenerator>,
}

impl AppState {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            generator: Arc::new(ReportGenerator::new(config)),
        }
    }

    /// Run `f` against a session, or fail with `SessionNotFound`
    pub async fn with_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut AppraisalSession) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| ApiError::SessionNotFound(id.to_string()))?;
        f(session)
    }
}
