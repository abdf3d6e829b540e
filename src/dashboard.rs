use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::dispatch::{Dispatcher, ValidationError};
use crate::model::User;
use crate::notify::{Notification, Notifier, Severity};
use crate::report::{report, Report};
use crate::selection::SelectionStore;
use crate::session::Session;
use crate::webhook::{WebhookRegistry, WebhookService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Ideas,
    Content,
}

/// One user's dashboard: the session, a selection per tab and the dispatcher
/// bound to that session.
pub struct Dashboard {
    session: Session,
    ideas: SelectionStore,
    content: SelectionStore,
    dispatcher: Dispatcher,
    webhooks: Arc<dyn WebhookService>,
    registry: WebhookRegistry,
    notifier: Arc<dyn Notifier>,
    request_timeout: Duration,
}

impl Dashboard {
    pub fn new(
        session: Session,
        webhooks: Arc<dyn WebhookService>,
        registry: WebhookRegistry,
        notifier: Arc<dyn Notifier>,
        request_timeout: Duration,
    ) -> Self {
        let dispatcher = Dispatcher::new(webhooks.clone(), &session, request_timeout);
        Self {
            ideas: SelectionStore::new(notifier.clone()),
            content: SelectionStore::new(notifier.clone()),
            session,
            dispatcher,
            webhooks,
            registry,
            notifier,
            request_timeout,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &WebhookRegistry {
        &self.registry
    }

    pub fn login(&mut self, user: User) {
        let who = user.name.clone().unwrap_or_else(|| user.email.clone());
        self.replace_session(Session::for_user(user));
        self.notifier
            .notify(&Notification::new("Welcome!", format!("Signed in as {who}"), Severity::Success));
    }

    pub fn logout(&mut self) {
        self.replace_session(Session::anonymous());
        self.notifier
            .notify(&Notification::new("Goodbye!", "Successfully signed out", Severity::Info));
    }

    fn replace_session(&mut self, session: Session) {
        self.ideas.clear_all();
        self.content.clear_all();
        self.dispatcher = Dispatcher::new(self.webhooks.clone(), &session, self.request_timeout);
        self.session = session;
    }

    pub fn selection(&self, tab: Tab) -> &SelectionStore {
        match tab {
            Tab::Ideas => &self.ideas,
            Tab::Content => &self.content,
        }
    }

    pub fn selection_mut(&mut self, tab: Tab) -> &mut SelectionStore {
        match tab {
            Tab::Ideas => &mut self.ideas,
            Tab::Content => &mut self.content,
        }
    }

    /// Dispatch the tab's current selection, present the report and start a
    /// fresh batch. A validation error leaves the selection untouched.
    pub async fn dispatch(&mut self, tab: Tab) -> Result<Report, ValidationError> {
        let store = self.selection(tab);
        let selected = store.selected().clone();
        let associations = store.associations();

        let outcomes = match self.dispatcher.dispatch(&selected, &associations, &self.registry).await {
            Ok(outcomes) => outcomes,
            Err(err) => {
                let title = match err {
                    ValidationError::NothingSelected => "No items selected",
                    ValidationError::NoPlatformChosen => "No content types selected",
                };
                self.notifier
                    .notify(&Notification::new(title, capitalize(&err.to_string()), Severity::Error));
                return Err(err);
            }
        };

        let summary = report(&outcomes);
        for line in summary.notifications() {
            self.notifier.notify(line);
        }
        self.selection_mut(tab).clear_all();
        info!(?tab, "selection cleared after dispatch");
        Ok(summary)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
