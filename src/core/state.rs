use std::sync::Arc;

use crate::core::config::Settings;
use crate::store::ExamStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn ExamStore>,
}

impl AppState {
    pub(crate) fn new(settings: Settings, store: Arc<dyn ExamStore>) -> Self {
        Self { inner: Arc::new(InnerState { settings, store }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &dyn ExamStore {
        self.inner.store.as_ref()
    }
}
