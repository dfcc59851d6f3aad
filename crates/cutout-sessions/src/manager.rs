use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use cutout_compose::{archive, ComposeError, Composition, Compositor, TemplateStore};

use crate::error::Result;
use crate::machine::{transition, Effect, Input, Limits};
use crate::outbound::Outbound;
use crate::store::SessionStore;
use crate::types::Stage;

/// One event from the transport, already resolved to a user identity.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Text(String),
    /// Raw bytes of a submitted photo.
    Image(Vec<u8>),
}

/// Routes events through the per-user state machine and runs compositions.
pub struct SessionManager {
    store: SessionStore,
    templates: Arc<dyn TemplateStore>,
    compositor: Compositor,
    limits: Limits,
    archive_dir: Option<PathBuf>,
}

impl SessionManager {
    pub fn new(
        store: SessionStore,
        templates: Arc<dyn TemplateStore>,
        compositor: Compositor,
        limits: Limits,
    ) -> Self {
        Self {
            store,
            templates,
            compositor,
            limits,
            archive_dir: None,
        }
    }

    /// Also write every finished composition to `dir`.
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn templates(&self) -> &dyn TemplateStore {
        self.templates.as_ref()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Current stage for `user_id`; `Stage::None` if they never started.
    pub fn stage(&self, user_id: &str) -> Result<Stage> {
        Ok(self
            .store
            .get(user_id)?
            .map(|s| s.state.stage)
            .unwrap_or_default())
    }

    /// Handle one event and return the stage the user is in afterwards.
    ///
    /// The state transition is applied atomically; a resulting composition
    /// runs after the record is released, so photos from the same user are
    /// composed in parallel against the same selection. Composition failures
    /// are reported through `out` and never change the session.
    #[instrument(skip(self, event, out), fields(user = %user_id))]
    pub async fn handle(
        &self,
        user_id: &str,
        event: InboundEvent,
        out: &dyn Outbound,
    ) -> Result<Stage> {
        let templates = match &event {
            InboundEvent::Text(_) => self.list_templates(),
            InboundEvent::Image(_) => Vec::new(),
        };
        let input = match &event {
            InboundEvent::Text(text) => Input::Text(text.as_str()),
            InboundEvent::Image(_) => Input::Image,
        };

        let (state, effect) = self
            .store
            .update(user_id, |current| transition(current, input, &templates, &self.limits))?;
        debug!(stage = %state.stage, "session advanced");

        match (effect, event) {
            (Effect::Reply(reply), _) => out.send_text(&reply.render()).await,
            (
                Effect::Compose {
                    template_name,
                    max_height,
                },
                InboundEvent::Image(bytes),
            ) => {
                self.compose_and_send(user_id, &bytes, template_name, max_height, out)
                    .await
            }
            (Effect::Compose { .. }, InboundEvent::Text(_)) => {}
        }

        Ok(state.stage)
    }

    async fn compose_and_send(
        &self,
        user_id: &str,
        product: &[u8],
        template_name: String,
        max_height: NonZeroU32,
        out: &dyn Outbound,
    ) {
        match self.compose(product, template_name, max_height).await {
            Ok(composition) => {
                info!(
                    width = composition.width,
                    height = composition.height,
                    "sending composition"
                );
                self.archive(user_id, &composition);
                out.send_image(composition.png).await;
            }
            Err(e) if e.is_retryable() => {
                warn!(code = e.code(), error = %e, "composition failed");
                out.send_text(&e.user_message()).await;
            }
            Err(e) => {
                error!(code = e.code(), error = %e, "composition failed, selection unusable");
                out.send_text(&e.user_message()).await;
            }
        }
    }

    async fn compose(
        &self,
        product: &[u8],
        template_name: String,
        max_height: NonZeroU32,
    ) -> std::result::Result<Composition, ComposeError> {
        let store = Arc::clone(&self.templates);
        let template = tokio::task::spawn_blocking(move || store.load(&template_name))
            .await
            .map_err(|e| ComposeError::Worker(e.to_string()))??;

        self.compositor.compose(product, &template, max_height).await
    }

    fn list_templates(&self) -> Vec<String> {
        self.templates.list().unwrap_or_else(|e| {
            warn!(error = %e, "cannot list templates");
            Vec::new()
        })
    }

    fn archive(&self, user_id: &str, composition: &Composition) {
        let Some(dir) = &self.archive_dir else {
            return;
        };
        match archive::save_output(dir, user_id, &composition.png) {
            Ok(path) => debug!(path = %path.display(), "composition archived"),
            Err(e) => warn!(error = %e, dir = %dir.display(), "failed to archive composition"),
        }
    }
}
