//! In-memory [`HelixApi`] and [`ChatNotifier`] doubles for unit tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    streamhook_helix::{
        Error, HelixApi, HelixStream, HelixUser, Result, SubscriptionCreated, SubscriptionRequest,
    },
    streamhook_notify::ChatNotifier,
};

type ErrorFn = fn() -> Error;

#[derive(Default)]
struct State {
    users: HashMap<String, HelixUser>,
    streams: HashMap<String, HelixStream>,
    games: HashMap<String, String>,
    stream_error: Option<ErrorFn>,
    game_error: Option<ErrorFn>,
    subscribe_errors: HashMap<String, ErrorFn>,
    existing: Vec<String>,
    subscriptions: Vec<SubscriptionRequest>,
    game_calls: usize,
    delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeHelix {
    state: Arc<Mutex<State>>,
}

impl FakeHelix {
    fn with(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_user(self, id: &str, login: &str, display_name: &str) -> Self {
        let user = HelixUser {
            id: id.into(),
            login: login.into(),
            display_name: display_name.into(),
        };
        self.with(|s| {
            s.users.insert(login.to_string(), user);
        })
    }

    pub fn with_stream(self, user_id: &str, stream: HelixStream) -> Self {
        self.with(|s| {
            s.streams.insert(user_id.to_string(), stream);
        })
    }

    pub fn with_game(self, id: &str, name: &str) -> Self {
        self.with(|s| {
            s.games.insert(id.to_string(), name.to_string());
        })
    }

    pub fn failing_streams(self, err: ErrorFn) -> Self {
        self.with(|s| s.stream_error = Some(err))
    }

    pub fn failing_games(self, err: ErrorFn) -> Self {
        self.with(|s| s.game_error = Some(err))
    }

    pub fn failing_subscription(self, user_id: &str, err: ErrorFn) -> Self {
        self.with(|s| {
            s.subscribe_errors.insert(user_id.to_string(), err);
        })
    }

    pub fn already_subscribed(self, user_id: &str) -> Self {
        self.with(|s| s.existing.push(user_id.to_string()))
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.with(|s| s.delay = Some(delay))
    }

    pub fn game_calls(&self) -> usize {
        self.state.lock().unwrap().game_calls
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionRequest> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    async fn pause(&self) {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl HelixApi for FakeHelix {
    async fn resolve_channel(&self, login: &str) -> Result<HelixUser> {
        self.pause().await;
        self.state
            .lock()
            .unwrap()
            .users
            .get(login)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                login: login.to_string(),
            })
    }

    async fn create_subscription(
        &self,
        request: &SubscriptionRequest,
    ) -> Result<SubscriptionCreated> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.subscriptions.push(request.clone());
        let user_id = &request.condition.broadcaster_user_id;
        if let Some(err) = state.subscribe_errors.get(user_id) {
            return Err(err());
        }
        if state.existing.contains(user_id) {
            return Ok(SubscriptionCreated::AlreadyExists);
        }
        Ok(SubscriptionCreated::Created {
            id: Some(format!("sub-{user_id}")),
        })
    }

    async fn stream_info(&self, user_id: &str) -> Result<Option<HelixStream>> {
        self.pause().await;
        let state = self.state.lock().unwrap();
        if let Some(err) = state.stream_error {
            return Err(err());
        }
        Ok(state.streams.get(user_id).cloned())
    }

    async fn game_name(&self, game_id: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.game_calls += 1;
        if let Some(err) = state.game_error {
            return Err(err());
        }
        Ok(state.games.get(game_id).cloned())
    }
}

/// Records every message; optionally fails each send.
#[derive(Clone, Default)]
pub(crate) struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatNotifier for RecordingNotifier {
    async fn send_text(&self, text: &str) -> streamhook_notify::Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(streamhook_notify::Error::Delivery {
                status: 500,
                body: "discord down".into(),
            });
        }
        Ok(())
    }
}

/// Counts sends and takes `delay` to finish each one.
#[derive(Clone)]
pub(crate) struct SlowNotifier {
    delay: Duration,
    started: Arc<Mutex<usize>>,
}

impl SlowNotifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: Arc::default(),
        }
    }

    pub fn started(&self) -> usize {
        *self.started.lock().unwrap()
    }
}

#[async_trait]
impl ChatNotifier for SlowNotifier {
    async fn send_text(&self, _text: &str) -> streamhook_notify::Result<()> {
        *self.started.lock().unwrap() += 1;
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
