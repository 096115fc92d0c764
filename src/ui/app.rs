use eframe::egui;
use tokio::sync::mpsc;

use crate::network::{ApiClient, ConnectionState};
use crate::notifications::NotificationFeed;
use crate::session::SessionController;

use super::components::{chat_area, input_bar, sidebar};
use super::state::ChatViewState;

pub struct ChatApp {
    state: ChatViewState,
    controller: SessionController,
    api: ApiClient,
    ws_endpoint: String,
    feed_receiver: mpsc::Receiver<NotificationFeed>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        api: ApiClient,
        ws_endpoint: String,
        sender_id: i64,
        receiver_id: i64,
        feed_receiver: mpsc::Receiver<NotificationFeed>,
    ) -> Self {
        let mut state = ChatViewState::new(receiver_id);
        let controller =
            SessionController::start(sender_id, receiver_id, &api, &ws_endpoint, &mut state);
        Self {
            state,
            controller,
            api,
            ws_endpoint,
            feed_receiver,
        }
    }

    fn handle_notifications(&mut self) {
        while let Ok(feed) = self.feed_receiver.try_recv() {
            self.state.notifications = feed;
        }
    }

    /// Tear down the current conversation and start one with `receiver_id`.
    fn open_chat(&mut self, receiver_id: i64) {
        if receiver_id == self.controller.receiver_id() {
            return;
        }
        let sender_id = self.controller.sender_id();
        self.controller.shutdown();

        let notifications = std::mem::take(&mut self.state.notifications);
        self.state = ChatViewState::new(receiver_id);
        self.state.notifications = notifications;
        self.controller = SessionController::start(
            sender_id,
            receiver_id,
            &self.api,
            &self.ws_endpoint,
            &mut self.state,
        );
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_notifications();
        self.controller.pump(&mut self.state);

        egui::SidePanel::left("notifications")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                if let Some(sender_id) = sidebar::render(ui, &self.state.notifications) {
                    self.open_chat(sender_id);
                }
            });

        // An unsupported transport never leaves `Unconnected`.
        let send_enabled = self.controller.connection_state() != ConnectionState::Unconnected;
        egui::TopBottomPanel::bottom("input_bar").show(ctx, |ui| {
            if let Some(error) = &self.state.error {
                ui.colored_label(egui::Color32::RED, error);
            }
            if input_bar::render(ui, &mut self.state.input_text, send_enabled) {
                self.controller.submit(&mut self.state);
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(&self.state.title);
            if let Some((latitude, longitude)) = self.state.last_location {
                ui.label(format!("Last location: {latitude:.4}, {longitude:.4}"));
            }
            ui.separator();
            chat_area::render(ui, &mut self.state);
        });

        ctx.request_repaint();
    }
}
