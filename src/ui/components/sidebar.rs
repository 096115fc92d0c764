use eframe::egui;

use crate::notifications::NotificationFeed;

/// Unread-message list. Returns the sender to open a chat with, if one was
/// clicked.
pub fn render(ui: &mut egui::Ui, feed: &NotificationFeed) -> Option<i64> {
    ui.heading(format!("Messages ({})", feed.unread_count));
    ui.separator();

    if feed.entries.is_empty() {
        ui.label("No unread messages");
        return None;
    }

    let mut open = None;
    egui::ScrollArea::vertical().show(ui, |ui| {
        for entry in &feed.entries {
            let response = ui
                .group(|ui| {
                    ui.strong(&entry.sender_name);
                    ui.label(&entry.message);
                })
                .response
                .interact(egui::Sense::click());
            if response.on_hover_text(&entry.link).clicked() {
                open = Some(entry.sender_id);
            }
        }
    });
    open
}
