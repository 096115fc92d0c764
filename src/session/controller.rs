use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::common::{ChatMessage, FetchOutcome, MessageKind, TransportEvent};
use crate::error::{AppError, Result};
use crate::network::{ApiClient, ConnectionState, Transport};
use crate::storage::MessageStore;

use super::view::{ChatView, Notice};

/// Live message held back until the history seed resolves.
struct Queued {
    message: ChatMessage,
    outgoing: bool,
}

/// Drives one conversation between `sender_id` (the local user) and
/// `receiver_id`.
///
/// The controller never blocks: inputs arrive from the fetch tasks and the
/// transport, and are applied either by [`pump`](Self::pump) from a frame
/// loop or by [`step`](Self::step) from an async loop.
pub struct SessionController {
    sender_id: i64,
    receiver_id: i64,
    store: MessageStore,
    transport: Transport,
    fetches: mpsc::UnboundedReceiver<FetchOutcome>,
    pending_fetches: usize,
    queued: Vec<Queued>,
    transport_done: bool,
    close_notified: bool,
}

impl SessionController {
    /// Kick off the history and profile fetches and open the socket, all
    /// independently of each other. Must be called inside a Tokio runtime.
    pub fn start(
        sender_id: i64,
        receiver_id: i64,
        api: &ApiClient,
        ws_endpoint: &str,
        view: &mut impl ChatView,
    ) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();

        let history_api = api.clone();
        let history_tx = fetch_tx.clone();
        tokio::spawn(async move {
            let outcome = history_api.past_messages(receiver_id).await;
            let _ = history_tx.send(FetchOutcome::History(outcome));
        });

        let profile_api = api.clone();
        tokio::spawn(async move {
            let outcome = profile_api.user_profile(receiver_id).await;
            let _ = fetch_tx.send(FetchOutcome::Profile(outcome));
        });

        let mut transport = Transport::new();
        let transport_done = match transport.connect(ws_endpoint) {
            Ok(()) => false,
            Err(err) => {
                log::warn!("Chat send disabled: {err}");
                view.render_notice(Notice::Unsupported);
                true
            }
        };

        log::info!("Chat session {sender_id} -> {receiver_id} started");
        Self {
            sender_id,
            receiver_id,
            store: MessageStore::new(),
            transport,
            fetches: fetch_rx,
            pending_fetches: 2,
            queued: Vec::new(),
            transport_done,
            close_notified: false,
        }
    }

    pub fn sender_id(&self) -> i64 {
        self.sender_id
    }

    pub fn receiver_id(&self) -> i64 {
        self.receiver_id
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn can_send(&self) -> bool {
        self.transport.state() == ConnectionState::Open
    }

    /// Apply every input that is ready right now.
    pub fn pump(&mut self, view: &mut impl ChatView) {
        while self.pending_fetches > 0 {
            match self.fetches.try_recv() {
                Ok(outcome) => {
                    self.pending_fetches -= 1;
                    self.handle_fetch(outcome, view);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.abandon_fetches(view),
            }
        }

        while let Some(event) = self.transport.try_next_event() {
            self.handle_transport(event, view);
        }
    }

    /// Wait for one input and apply it. Returns `false` once nothing more
    /// can arrive.
    pub async fn step(&mut self, view: &mut impl ChatView) -> bool {
        tokio::select! {
            outcome = self.fetches.recv(), if self.pending_fetches > 0 => match outcome {
                Some(outcome) => {
                    self.pending_fetches -= 1;
                    self.handle_fetch(outcome, view);
                }
                None => self.abandon_fetches(view),
            },
            event = self.transport.next_event(), if !self.transport_done => match event {
                Some(event) => self.handle_transport(event, view),
                None => self.transport_done = true,
            },
            else => return false,
        }
        true
    }

    /// Send the view's pending input. Failures are shown in the view and
    /// leave the log untouched.
    pub fn submit(&mut self, view: &mut impl ChatView) {
        let text = view.pending_input();
        match self.send_text(&text) {
            Ok(message) => {
                self.echo(message, view);
                view.clear_input();
            }
            Err(err) => {
                log::warn!("Message to {} not sent: {err}", self.receiver_id);
                view.show_error(&err);
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.transport.close();
        log::info!(
            "Chat session {} -> {} torn down",
            self.sender_id,
            self.receiver_id
        );
    }

    fn send_text(&mut self, text: &str) -> Result<ChatMessage> {
        if text.trim().is_empty() {
            return Err(AppError::ValidationFailed("Message is empty".to_string()));
        }
        let message = ChatMessage::text(self.sender_id, self.receiver_id, text);
        self.transport.send(&message)?;
        Ok(message)
    }

    /// Local echo; there is no server acknowledgement to wait for.
    fn echo(&mut self, message: ChatMessage, view: &mut impl ChatView) {
        if !self.store.is_seeded() {
            self.queued.push(Queued {
                message,
                outgoing: true,
            });
            return;
        }
        let index = self.store.append(message);
        self.render_entry(index, view);
        view.scroll_to_bottom();
    }

    fn receive(&mut self, message: ChatMessage, view: &mut impl ChatView) {
        match message.kind() {
            MessageKind::Location {
                latitude,
                longitude,
            } => view.render_location(&message, latitude, longitude),
            MessageKind::Chat => {
                if !self.store.is_seeded() {
                    let outgoing = message.sender_id == self.sender_id;
                    self.queued.push(Queued { message, outgoing });
                    return;
                }
                let was_at_bottom = view.is_at_bottom();
                let index = self.store.append(message);
                self.render_entry(index, view);
                if was_at_bottom {
                    view.scroll_to_bottom();
                }
            }
        }
    }

    fn handle_fetch(&mut self, outcome: FetchOutcome, view: &mut impl ChatView) {
        match outcome {
            FetchOutcome::History(Ok(history)) => self.seed(history, view),
            FetchOutcome::History(Err(err)) => {
                log::warn!("History with user {} unavailable: {err}", self.receiver_id);
                self.seed(None, view);
            }
            FetchOutcome::Profile(Ok(profile)) => {
                view.set_title(&format!("Messaging with {}", profile.display_name()));
            }
            FetchOutcome::Profile(Err(err)) => {
                log::warn!("Profile of user {} unavailable: {err}", self.receiver_id);
            }
        }
    }

    fn handle_transport(&mut self, event: TransportEvent, view: &mut impl ChatView) {
        match event {
            TransportEvent::Opened => log::info!("Chat with {} is live", self.receiver_id),
            TransportEvent::Message(message) => self.receive(message, view),
            TransportEvent::Closed => {
                self.transport_done = true;
                if !self.close_notified {
                    self.close_notified = true;
                    view.render_notice(Notice::ConnectionClosed);
                }
            }
        }
    }

    /// A fetch task went away without reporting; make sure live traffic is
    /// not held back forever.
    fn abandon_fetches(&mut self, view: &mut impl ChatView) {
        self.pending_fetches = 0;
        if !self.store.is_seeded() {
            log::warn!("History fetch dropped without a result");
            self.seed(None, view);
        }
    }

    /// Seed the log, render it, then flush what arrived in the meantime.
    fn seed(&mut self, history: Option<Vec<ChatMessage>>, view: &mut impl ChatView) {
        let seeded = self.store.seed(history);
        log::debug!("Seeded {seeded} history entries");
        for (index, message) in self.store.all().enumerate() {
            view.render_message(index, message, message.sender_id == self.sender_id);
        }

        for Queued { message, outgoing } in std::mem::take(&mut self.queued) {
            let index = self.store.append(message);
            if let Some(entry) = self.store.get(index) {
                view.render_message(index, entry, outgoing);
            }
        }
        view.scroll_to_bottom();
    }

    fn render_entry(&self, index: usize, view: &mut impl ChatView) {
        if let Some(message) = self.store.get(index) {
            view.render_message(index, message, message.sender_id == self.sender_id);
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::spawn_ws_server;

    #[derive(Default)]
    struct RecordingView {
        title: Option<String>,
        rendered: Vec<(usize, String, bool)>,
        locations: Vec<(f64, f64)>,
        notices: Vec<Notice>,
        errors: Vec<String>,
        input: String,
        at_bottom: bool,
        scrolls: usize,
    }

    impl ChatView for RecordingView {
        fn set_title(&mut self, title: &str) {
            self.title = Some(title.to_string());
        }

        fn render_message(&mut self, index: usize, message: &ChatMessage, outgoing: bool) {
            self.rendered.push((index, message.message.clone(), outgoing));
        }

        fn render_location(&mut self, _message: &ChatMessage, latitude: f64, longitude: f64) {
            self.locations.push((latitude, longitude));
        }

        fn render_notice(&mut self, notice: Notice) {
            self.notices.push(notice);
        }

        fn show_error(&mut self, error: &AppError) {
            self.errors.push(error.to_string());
        }

        fn is_at_bottom(&self) -> bool {
            self.at_bottom
        }

        fn scroll_to_bottom(&mut self) {
            self.scrolls += 1;
        }

        fn pending_input(&self) -> String {
            self.input.clone()
        }

        fn clear_input(&mut self) {
            self.input.clear();
        }
    }

    fn bodies(controller: &SessionController) -> Vec<String> {
        controller
            .store()
            .all()
            .map(|m| m.message.clone())
            .collect()
    }

    async fn backend(history: serde_json::Value, history_delay: Duration) -> (MockServer, ApiClient) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/past_messages/2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(history)
                    .set_delay(history_delay),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/2/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "first_name": "Grace",
                "last_name": "Hopper"
            })))
            .mount(&server)
            .await;
        let api = ApiClient::new(&server.uri(), "http://books.invalid/volumes").unwrap();
        (server, api)
    }

    async fn drive_until(
        controller: &mut SessionController,
        view: &mut RecordingView,
        done: impl Fn(&SessionController, &RecordingView) -> bool,
    ) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done(controller, view) {
                if !controller.step(view).await {
                    break;
                }
            }
        })
        .await
        .expect("session did not settle");
    }

    fn frame(json: serde_json::Value) -> WsMessage {
        WsMessage::text(json.to_string())
    }

    #[tokio::test]
    async fn live_messages_wait_for_history() {
        let (_server, api) = backend(
            serde_json::json!([
                {"senderId": 2, "receiverId": 1, "message": "b"},
                {"senderId": 1, "receiverId": 2, "message": "a"}
            ]),
            Duration::from_millis(300),
        )
        .await;
        let endpoint = spawn_ws_server(|mut ws| async move {
            ws.send(frame(serde_json::json!({"senderId": 2, "receiverId": 1, "message": "live"})))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut view = RecordingView::default();
        let mut controller = SessionController::start(1, 2, &api, &endpoint, &mut view);
        drive_until(&mut controller, &mut view, |c, _| c.store().len() == 3).await;

        assert_eq!(bodies(&controller), vec!["a", "b", "live"]);
        assert_eq!(
            view.rendered,
            vec![
                (0, "a".to_string(), true),
                (1, "b".to_string(), false),
                (2, "live".to_string(), false)
            ]
        );
    }

    #[tokio::test]
    async fn location_updates_bypass_the_log() {
        let (_server, api) = backend(serde_json::json!([]), Duration::ZERO).await;
        let endpoint = spawn_ws_server(|mut ws| async move {
            ws.send(frame(serde_json::json!({
                "latitude": 40.1, "longitude": -73.9, "message": "moved"
            })))
            .await
            .unwrap();
            ws.send(frame(serde_json::json!({
                "senderId": 2, "receiverId": 1, "message": "hi", "latitude": 0, "longitude": 0
            })))
            .await
            .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut view = RecordingView::default();
        let mut controller = SessionController::start(1, 2, &api, &endpoint, &mut view);
        drive_until(&mut controller, &mut view, |c, v| {
            c.store().len() == 1 && !v.locations.is_empty()
        })
        .await;

        assert_eq!(view.locations, vec![(40.1, -73.9)]);
        assert_eq!(bodies(&controller), vec!["hi"]);
    }

    #[tokio::test]
    async fn scroll_position_is_kept_when_reading_older_entries() {
        let (_server, api) = backend(serde_json::json!([]), Duration::ZERO).await;
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let endpoint = spawn_ws_server(|mut ws| async move {
            let _ = release_rx.await;
            ws.send(frame(serde_json::json!({"senderId": 2, "receiverId": 1, "message": "new"})))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut view = RecordingView::default();
        let mut controller = SessionController::start(1, 2, &api, &endpoint, &mut view);
        drive_until(&mut controller, &mut view, |c, _| {
            c.store().is_seeded() && c.can_send()
        })
        .await;

        view.at_bottom = false;
        let scrolls_before = view.scrolls;
        release_tx.send(()).unwrap();
        drive_until(&mut controller, &mut view, |c, _| c.store().len() == 1).await;

        assert_eq!(view.scrolls, scrolls_before);
    }

    #[tokio::test]
    async fn received_message_follows_a_view_at_the_bottom() {
        let (_server, api) = backend(serde_json::json!([]), Duration::ZERO).await;
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let endpoint = spawn_ws_server(|mut ws| async move {
            let _ = release_rx.await;
            ws.send(frame(serde_json::json!({"senderId": 2, "receiverId": 1, "message": "new"})))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut view = RecordingView::default();
        let mut controller = SessionController::start(1, 2, &api, &endpoint, &mut view);
        drive_until(&mut controller, &mut view, |c, _| {
            c.store().is_seeded() && c.can_send()
        })
        .await;

        view.at_bottom = true;
        let scrolls_before = view.scrolls;
        release_tx.send(()).unwrap();
        drive_until(&mut controller, &mut view, |c, _| c.store().len() == 1).await;

        assert_eq!(view.scrolls, scrolls_before + 1);
    }

    #[tokio::test]
    async fn stalled_history_times_out_and_releases_live_traffic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/past_messages/2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/2/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "first_name": "Grace",
                "last_name": "Hopper"
            })))
            .mount(&server)
            .await;
        let api = ApiClient::with_timeout(
            &server.uri(),
            "http://books.invalid/volumes",
            Duration::from_millis(300),
        )
        .unwrap();
        let endpoint = spawn_ws_server(|mut ws| async move {
            ws.send(frame(serde_json::json!({"senderId": 2, "receiverId": 1, "message": "ping"})))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut view = RecordingView::default();
        let mut controller = SessionController::start(1, 2, &api, &endpoint, &mut view);
        drive_until(&mut controller, &mut view, |c, _| {
            c.store().is_seeded() && c.can_send() && c.store().len() == 1
        })
        .await;
        assert_eq!(bodies(&controller), vec!["ping"]);

        view.input = "are you there?".to_string();
        controller.submit(&mut view);
        assert_eq!(bodies(&controller), vec!["ping", "are you there?"]);
        assert_eq!(
            view.rendered.last(),
            Some(&(1, "are you there?".to_string(), true))
        );
    }

    #[tokio::test]
    async fn submit_validates_and_echoes() {
        let (_server, api) = backend(serde_json::json!(null), Duration::ZERO).await;
        let (frames_tx, mut frames_rx) = tokio::sync::mpsc::unbounded_channel();
        let endpoint = spawn_ws_server(|mut ws| async move {
            while let Some(Ok(WsMessage::Text(text))) = ws.next().await {
                let _ = frames_tx.send(text.to_string());
            }
        })
        .await;

        let mut view = RecordingView::default();
        let mut controller = SessionController::start(1, 2, &api, &endpoint, &mut view);
        drive_until(&mut controller, &mut view, |c, v| {
            c.store().is_seeded() && c.can_send() && v.title.is_some()
        })
        .await;
        assert_eq!(view.title.as_deref(), Some("Messaging with Grace Hopper"));

        view.input = "   ".to_string();
        controller.submit(&mut view);
        assert_eq!(view.errors, vec!["Message is empty".to_string()]);
        assert!(controller.store().is_empty());

        view.input = "is the book still available?".to_string();
        controller.submit(&mut view);
        assert_eq!(bodies(&controller), vec!["is the book still available?"]);
        assert!(view.input.is_empty());
        assert_eq!(view.rendered.last().map(|r| r.2), Some(true));

        let sent = tokio::time::timeout(Duration::from_secs(5), frames_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let sent: ChatMessage = serde_json::from_str(&sent).unwrap();
        assert_eq!(sent, ChatMessage::text(1, 2, "is the book still available?"));
    }

    #[tokio::test]
    async fn closed_connection_notifies_once_and_blocks_sends() {
        let (_server, api) = backend(serde_json::json!([]), Duration::ZERO).await;
        let endpoint = spawn_ws_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut view = RecordingView::default();
        let mut controller = SessionController::start(1, 2, &api, &endpoint, &mut view);
        drive_until(&mut controller, &mut view, |c, v| {
            c.store().is_seeded() && !v.notices.is_empty()
        })
        .await;
        drive_until(&mut controller, &mut view, |_, _| false).await;

        assert_eq!(view.notices, vec![Notice::ConnectionClosed]);
        view.input = "anyone there?".to_string();
        controller.submit(&mut view);
        assert_eq!(view.errors, vec![AppError::NotConnected.to_string()]);
        assert!(controller.store().is_empty());
        assert_eq!(view.input, "anyone there?");
    }

    #[tokio::test]
    async fn unsupported_transport_still_loads_history() {
        let (_server, api) = backend(
            serde_json::json!([{"senderId": 2, "receiverId": 1, "message": "old"}]),
            Duration::ZERO,
        )
        .await;

        let mut view = RecordingView::default();
        let mut controller =
            SessionController::start(1, 2, &api, "http://localhost/ws", &mut view);
        drive_until(&mut controller, &mut view, |_, _| false).await;

        assert_eq!(view.notices, vec![Notice::Unsupported]);
        assert!(!controller.can_send());
        assert_eq!(bodies(&controller), vec!["old"]);
        assert_eq!(view.title.as_deref(), Some("Messaging with Grace Hopper"));

        view.input = "hello".to_string();
        controller.submit(&mut view);
        assert_eq!(controller.store().len(), 1);
        assert_eq!(view.errors.len(), 1);
    }

    #[tokio::test]
    async fn failed_fetches_do_not_block_live_traffic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let api = ApiClient::new(&server.uri(), "http://books.invalid/volumes").unwrap();
        let endpoint = spawn_ws_server(|mut ws| async move {
            ws.send(frame(serde_json::json!({"senderId": 2, "receiverId": 1, "message": "hey"})))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut view = RecordingView::default();
        let mut controller = SessionController::start(1, 2, &api, &endpoint, &mut view);
        drive_until(&mut controller, &mut view, |c, _| c.store().len() == 1).await;

        assert_eq!(bodies(&controller), vec!["hey"]);
        assert!(view.title.is_none());
    }

    #[tokio::test]
    async fn pump_applies_ready_inputs_without_waiting() {
        let (_server, api) = backend(serde_json::json!([]), Duration::ZERO).await;
        let mut view = RecordingView::default();
        let mut controller =
            SessionController::start(1, 2, &api, "http://localhost/ws", &mut view);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !(controller.store().is_seeded() && view.title.is_some()) {
                controller.pump(&mut view);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("fetches did not arrive");
    }
}
