mod common;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use amplifier::dashboard::{Dashboard, Tab};
use amplifier::dispatch::ValidationError;
use amplifier::model::{Platform, User};
use amplifier::session::Session;
use common::{hook, registry, RecordingNotifier, RecordingWebhooks};

fn dashboard(webhooks: &RecordingWebhooks, notifier: &Arc<RecordingNotifier>) -> Dashboard {
    Dashboard::new(
        Session::anonymous(),
        Arc::new(webhooks.clone()),
        registry(&[Platform::LinkedIn, Platform::Twitter]),
        notifier.clone(),
        Duration::from_secs(1),
    )
}

fn user(id: i64) -> User {
    User {
        id,
        created_at: Utc::now(),
        name: Some("Grace".into()),
        email: format!("user{id}@example.com"),
        domain: Some("Technology".into()),
        linkedin_url: None,
        facebook_url: None,
        instagram_url: None,
        twitter_url: None,
    }
}

#[tokio::test]
async fn dispatch_clears_selection_even_with_failures() {
    let webhooks = RecordingWebhooks::failing(&[2]);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut d = dashboard(&webhooks, &notifier);

    let ideas = d.selection_mut(Tab::Ideas);
    ideas.toggle_selected(1);
    ideas.toggle_selected(2);
    ideas.set_association(1, Platform::LinkedIn, "Article");
    ideas.set_association(2, Platform::LinkedIn, "Post");

    let report = d.dispatch(Tab::Ideas).await.unwrap();
    assert!(report.has_failures());
    assert_eq!(webhooks.ids_sent_to(&hook("linkedin")).await, vec![1, 2]);

    let ideas = d.selection(Tab::Ideas);
    assert!(ideas.is_empty());
    assert_eq!(ideas.association_for(1, Platform::LinkedIn), None);
    assert_eq!(ideas.association_for(2, Platform::LinkedIn), None);

    let titles = notifier.titles();
    assert!(titles.contains(&"LinkedIn Success".to_string()));
    assert!(titles.contains(&"LinkedIn Errors".to_string()));
    assert_eq!(titles.last().map(String::as_str), Some("Dispatch Complete"));
}

#[tokio::test]
async fn validation_error_keeps_selection() {
    let webhooks = RecordingWebhooks::default();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut d = dashboard(&webhooks, &notifier);

    d.selection_mut(Tab::Content).toggle_selected(4);
    let err = d.dispatch(Tab::Content).await.unwrap_err();
    assert_eq!(err, ValidationError::NoPlatformChosen);
    assert!(d.selection(Tab::Content).is_selected(4));
    assert!(webhooks.calls().await.is_empty());

    let last = notifier.all().pop().unwrap();
    assert_eq!(last.title, "No content types selected");
    assert_eq!(last.description, "Choose a platform for at least one item");
}

#[tokio::test]
async fn tabs_keep_separate_selections() {
    let webhooks = RecordingWebhooks::default();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut d = dashboard(&webhooks, &notifier);

    d.selection_mut(Tab::Ideas).toggle_selected(1);
    let content = d.selection_mut(Tab::Content);
    content.toggle_selected(9);
    content.assign_to_selected(Platform::Twitter, "Thread");

    d.dispatch(Tab::Content).await.unwrap();
    assert_eq!(webhooks.ids_sent_to(&hook("twitter")).await, vec![9]);
    assert!(d.selection(Tab::Ideas).is_selected(1));
    assert!(d.selection(Tab::Content).is_empty());
}

#[tokio::test]
async fn login_and_logout_replace_session_and_reset_state() {
    let webhooks = RecordingWebhooks::default();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut d = dashboard(&webhooks, &notifier);
    assert!(!d.session().is_authenticated());

    d.selection_mut(Tab::Ideas).toggle_selected(3);
    d.login(user(11));
    assert_eq!(d.session().user_id(), Some(11));
    assert!(d.selection(Tab::Ideas).is_empty());

    d.selection_mut(Tab::Ideas).set_association(5, Platform::LinkedIn, "Image");
    d.logout();
    assert!(!d.session().is_authenticated());
    assert_eq!(d.selection(Tab::Ideas).association_for(5, Platform::LinkedIn), None);

    let titles = notifier.titles();
    assert!(titles.contains(&"Welcome!".to_string()));
    assert!(titles.contains(&"Goodbye!".to_string()));
}
