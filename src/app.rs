//! Application runtime
//!
//! [`App`] owns the view states, the session and the backend. Views turn
//! events into [`Effect`]s; the app performs each effect and feeds the
//! outcome back into the view that asked for it, until nothing is left to do.

use tokio_util::sync::CancellationToken;

use crate::api::StudyBackend;
use crate::error::Result;
use crate::route::{guard, Route};
use crate::session::SessionStore;
use crate::views::{
    AuthEvent, AuthMode, AuthView, ChatEvent, ChatView, Effect, ReviseEvent, ReviseView,
};

/// Model of the whole client
pub struct App<B: StudyBackend> {
    backend: B,
    session: SessionStore,
    route: Route,
    /// Error behind the most recent failed signup or login
    auth_failure: Option<anyhow::Error>,
    pub auth: AuthView,
    pub chat: ChatView,
    pub revise: ReviseView,
}

impl<B: StudyBackend> App<B> {
    /// Create the app on the auth view; call [`App::navigate`] to move on
    pub fn new(backend: B, session: SessionStore) -> Self {
        Self {
            backend,
            session,
            route: Route::Auth,
            auth_failure: None,
            auth: AuthView::new(),
            chat: ChatView::new(),
            revise: ReviseView::new(),
        }
    }

    /// View currently shown
    pub fn route(&self) -> Route {
        self.route
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Take the backend error behind the last failed signup or login
    ///
    /// The auth view only keeps the message; this keeps the variant for
    /// callers that report it.
    pub fn take_auth_failure(&mut self) -> Option<anyhow::Error> {
        self.auth_failure.take()
    }

    /// Switch views through the route guard and run the view's entry work
    ///
    /// Entering a view starts it from fresh state; chat transcripts do not
    /// survive navigation.
    pub async fn navigate(&mut self, requested: Route, cancel: &CancellationToken) -> Result<Route> {
        let effect = self.enter(requested)?;
        self.drain(effect, cancel).await?;
        Ok(self.route)
    }

    fn enter(&mut self, requested: Route) -> Result<Option<Effect>> {
        let route = guard(requested, self.session.is_authenticated()?);
        tracing::debug!("Navigating to {} (requested {})", route, requested);
        self.route = route;
        Ok(match route {
            Route::Auth => {
                self.auth = AuthView::new();
                None
            }
            Route::Chat => {
                self.chat = ChatView::new();
                None
            }
            Route::Revise => {
                self.revise = ReviseView::new();
                self.revise.update(ReviseEvent::Entered)
            }
        })
    }

    /// Feed an event to the auth view and run what follows
    pub async fn handle_auth(&mut self, event: AuthEvent, cancel: &CancellationToken) -> Result<()> {
        if event == AuthEvent::Submit {
            self.auth_failure = None;
        }
        let effect = self.auth.update(event);
        self.drain(effect, cancel).await
    }

    /// Feed an event to the chat view and run what follows
    pub async fn handle_chat(&mut self, event: ChatEvent, cancel: &CancellationToken) -> Result<()> {
        let effect = self.chat.update(event);
        self.drain(effect, cancel).await
    }

    /// Feed an event to the revise view and run what follows
    pub async fn handle_revise(
        &mut self,
        event: ReviseEvent,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let effect = self.revise.update(event);
        self.drain(effect, cancel).await
    }

    async fn drain(&mut self, mut effect: Option<Effect>, cancel: &CancellationToken) -> Result<()> {
        while let Some(current) = effect.take() {
            effect = self.run_effect(current, cancel).await?;
        }
        Ok(())
    }

    /// Perform one effect and return whatever the receiving view asks next
    ///
    /// Backend failures are delivered to the view as events; only session
    /// storage failures are returned as errors.
    pub async fn run_effect(
        &mut self,
        effect: Effect,
        cancel: &CancellationToken,
    ) -> Result<Option<Effect>> {
        match effect {
            Effect::Authenticate {
                mode,
                email,
                password,
            } => {
                let outcome = match mode {
                    AuthMode::Login => self.backend.login(&email, &password, cancel).await,
                    AuthMode::Signup => self.backend.signup(&email, &password, cancel).await,
                };
                let event = match outcome {
                    Ok(session) => {
                        self.auth_failure = None;
                        AuthEvent::Succeeded(session)
                    }
                    Err(e) => {
                        tracing::warn!("{} failed: {}", mode, e);
                        let event = AuthEvent::Failed(e.to_string());
                        self.auth_failure = Some(e);
                        event
                    }
                };
                Ok(self.auth.update(event))
            }
            Effect::StartSession(session) => {
                self.session.save(&session.token, &session.user_id)?;
                self.enter(Route::Chat)
            }
            Effect::SendChat(message) => {
                let event = match self.backend.post_chat(&message, cancel).await {
                    Ok(reply) => {
                        tracing::debug!(
                            "Reply classified as {} (confidence {:.2})",
                            reply.topic,
                            reply.confidence
                        );
                        ChatEvent::ReplyReceived(reply)
                    }
                    Err(e) => ChatEvent::RequestFailed(e.to_string()),
                };
                Ok(self.chat.update(event))
            }
            Effect::FetchTopics => {
                let event = match self.backend.revise_topics(cancel).await {
                    Ok(topics) => ReviseEvent::TopicsLoaded(topics),
                    Err(e) => ReviseEvent::TopicsFailed(e.to_string()),
                };
                Ok(self.revise.update(event))
            }
            Effect::FetchTopicDetail(topic) => {
                let event = match self.backend.revise_topic_detail(&topic, cancel).await {
                    Ok(detail) => ReviseEvent::DetailLoaded(detail),
                    Err(e) => {
                        tracing::warn!("Failed to load detail for {}: {}", topic, e);
                        ReviseEvent::DetailFailed(e.to_string())
                    }
                };
                Ok(self.revise.update(event))
            }
            Effect::Navigate(route) => self.enter(route),
            Effect::Logout => {
                self.session.clear()?;
                tracing::info!("Logged out");
                self.enter(Route::Auth)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AuthResponse, ChatReply, TopicCard, TopicDetail};
    use crate::error::AssistantError;
    use crate::session::{KeyValueStore, MemoryStore, FALLBACK_USER_ID};
    use crate::views::chat::FALLBACK_REPLY;
    use crate::views::{ChatStatus, Role};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Backend double that records calls and answers from canned values
    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        fail_chat: bool,
    }

    impl FakeBackend {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl StudyBackend for FakeBackend {
        async fn signup(
            &self,
            email: &str,
            _password: &str,
            _cancel: &CancellationToken,
        ) -> Result<AuthResponse> {
            self.record(format!("signup {}", email));
            Err(AssistantError::Http {
                status: 400,
                message: "Email already registered".to_string(),
            }
            .into())
        }

        async fn login(
            &self,
            email: &str,
            password: &str,
            _cancel: &CancellationToken,
        ) -> Result<AuthResponse> {
            self.record(format!("login {}", email));
            if email == "a@b.com" && password == "secret1" {
                Ok(AuthResponse {
                    token: "t1".to_string(),
                    user_id: "u1".to_string(),
                })
            } else {
                Err(AssistantError::Http {
                    status: 401,
                    message: "Invalid credentials".to_string(),
                }
                .into())
            }
        }

        async fn post_chat(&self, message: &str, _cancel: &CancellationToken) -> Result<ChatReply> {
            self.record(format!("chat {}", message));
            if self.fail_chat {
                return Err(AssistantError::Http {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                }
                .into());
            }
            Ok(ChatReply {
                reply: "A heap is...".to_string(),
                topic: "heaps".to_string(),
                confidence: 0.8,
            })
        }

        async fn revise_topics(&self, _cancel: &CancellationToken) -> Result<Vec<TopicCard>> {
            self.record("topics".to_string());
            Ok(vec![TopicCard {
                topic: "heaps".to_string(),
                confidence: 0.8,
            }])
        }

        async fn revise_topic_detail(
            &self,
            topic: &str,
            _cancel: &CancellationToken,
        ) -> Result<TopicDetail> {
            self.record(format!("detail {}", topic));
            Ok(TopicDetail {
                topic: topic.to_string(),
                recents: Vec::new(),
                mistakes: Vec::new(),
            })
        }
    }

    fn app_with(backend: FakeBackend) -> (App<FakeBackend>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (App::new(backend, SessionStore::new(store.clone())), store)
    }

    async fn logged_in_app(backend: FakeBackend) -> (App<FakeBackend>, CancellationToken) {
        let (mut app, _) = app_with(backend);
        app.session().save("t1", "u1").unwrap();
        let cancel = CancellationToken::new();
        app.navigate(Route::Chat, &cancel).await.unwrap();
        (app, cancel)
    }

    #[tokio::test]
    async fn test_protected_routes_redirect_without_session() {
        let (mut app, _) = app_with(FakeBackend::default());
        let cancel = CancellationToken::new();
        assert_eq!(app.navigate(Route::Chat, &cancel).await.unwrap(), Route::Auth);
        assert_eq!(app.navigate(Route::Revise, &cancel).await.unwrap(), Route::Auth);
        assert!(app.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_login_persists_session_and_leaves_auth() {
        let (mut app, store) = app_with(FakeBackend::default());
        let cancel = CancellationToken::new();
        app.navigate(Route::Chat, &cancel).await.unwrap();

        for event in [
            AuthEvent::EmailChanged("a@b.com".to_string()),
            AuthEvent::PasswordChanged("secret1".to_string()),
            AuthEvent::Submit,
        ] {
            app.handle_auth(event, &cancel).await.unwrap();
        }

        assert_eq!(store.get("auth_token").unwrap(), Some("t1".to_string()));
        assert_eq!(store.get("user_id").unwrap(), Some("u1".to_string()));
        assert_eq!(app.route(), Route::Chat);
        assert_eq!(app.backend().calls(), vec!["login a@b.com".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_login_stays_on_auth_with_message() {
        let (mut app, store) = app_with(FakeBackend::default());
        let cancel = CancellationToken::new();

        app.handle_auth(AuthEvent::EmailChanged("a@b.com".into()), &cancel)
            .await
            .unwrap();
        app.handle_auth(AuthEvent::PasswordChanged("wrong-password".into()), &cancel)
            .await
            .unwrap();
        app.handle_auth(AuthEvent::Submit, &cancel).await.unwrap();

        assert_eq!(app.route(), Route::Auth);
        assert_eq!(app.auth.error.as_deref(), Some("Invalid credentials"));
        assert_eq!(store.get("auth_token").unwrap(), None);

        let failure = app.take_auth_failure().expect("backend error kept");
        assert_eq!(
            failure.downcast_ref::<AssistantError>().and_then(|e| e.status()),
            Some(401)
        );
        assert!(app.take_auth_failure().is_none());
    }

    #[tokio::test]
    async fn test_invalid_form_makes_no_request() {
        let (mut app, _) = app_with(FakeBackend::default());
        let cancel = CancellationToken::new();
        app.handle_auth(AuthEvent::EmailChanged("nope".into()), &cancel)
            .await
            .unwrap();
        app.handle_auth(AuthEvent::Submit, &cancel).await.unwrap();
        assert!(app.backend().calls().is_empty());
        assert_eq!(app.auth.error.as_deref(), Some("Enter a valid email"));
        assert!(app.take_auth_failure().is_none());
    }

    #[tokio::test]
    async fn test_chat_round_trip_appends_one_reply() {
        let (mut app, cancel) = logged_in_app(FakeBackend::default()).await;

        app.handle_chat(ChatEvent::InputChanged("what is a heap?".into()), &cancel)
            .await
            .unwrap();
        app.handle_chat(ChatEvent::KeyEnter { modified: false }, &cancel)
            .await
            .unwrap();

        let messages = app.chat.messages();
        assert_eq!(messages.len(), 3);
        let assistant_replies: Vec<_> = messages[1..]
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .collect();
        assert_eq!(assistant_replies.len(), 1);
        assert_eq!(assistant_replies[0].text, "A heap is...");
        assert_eq!(app.chat.status(), ChatStatus::Idle);
        assert_eq!(
            app.backend().calls(),
            vec!["chat what is a heap?".to_string()]
        );
    }

    #[tokio::test]
    async fn test_blank_chat_makes_no_request() {
        let (mut app, cancel) = logged_in_app(FakeBackend::default()).await;
        app.handle_chat(ChatEvent::InputChanged("   ".into()), &cancel)
            .await
            .unwrap();
        app.handle_chat(ChatEvent::SendClicked, &cancel).await.unwrap();
        assert!(app.backend().calls().is_empty());
        assert_eq!(app.chat.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_failure_shows_fallback() {
        let backend = FakeBackend {
            fail_chat: true,
            ..FakeBackend::default()
        };
        let (mut app, cancel) = logged_in_app(backend).await;
        app.handle_chat(ChatEvent::InputChanged("what is a heap?".into()), &cancel)
            .await
            .unwrap();
        app.handle_chat(ChatEvent::SendClicked, &cancel).await.unwrap();

        assert_eq!(app.chat.messages().last().unwrap().text, FALLBACK_REPLY);
        assert_eq!(app.chat.status(), ChatStatus::Idle);
    }

    #[tokio::test]
    async fn test_revise_selection_fetches_detail_once() {
        let (mut app, cancel) = logged_in_app(FakeBackend::default()).await;
        app.handle_chat(ChatEvent::OpenRevise, &cancel).await.unwrap();

        assert_eq!(app.route(), Route::Revise);
        assert_eq!(app.revise.topics.len(), 1);

        app.handle_revise(ReviseEvent::Select("heaps".into()), &cancel)
            .await
            .unwrap();

        assert_eq!(
            app.backend().calls(),
            vec!["topics".to_string(), "detail heaps".to_string()]
        );
        assert_eq!(app.revise.detail.as_ref().unwrap().topic, "heaps");
        assert!(!app.revise.detail_loading);
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_returns_to_auth() {
        let (mut app, cancel) = logged_in_app(FakeBackend::default()).await;
        app.handle_chat(ChatEvent::Logout, &cancel).await.unwrap();

        assert_eq!(app.route(), Route::Auth);
        assert_eq!(app.session().current_user_id().unwrap(), FALLBACK_USER_ID);
        assert!(!app.session().is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn test_navigation_resets_chat_transcript() {
        let (mut app, cancel) = logged_in_app(FakeBackend::default()).await;
        app.handle_chat(ChatEvent::InputChanged("hi".into()), &cancel)
            .await
            .unwrap();
        app.handle_chat(ChatEvent::SendClicked, &cancel).await.unwrap();
        assert_eq!(app.chat.messages().len(), 3);

        app.handle_chat(ChatEvent::OpenRevise, &cancel).await.unwrap();
        app.handle_revise(ReviseEvent::BackToChat, &cancel)
            .await
            .unwrap();
        assert_eq!(app.route(), Route::Chat);
        assert_eq!(app.chat.messages().len(), 1);
    }
}
