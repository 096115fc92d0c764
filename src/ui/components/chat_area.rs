use eframe::egui;

use crate::ui::state::{ChatViewState, LogLine};

pub fn render(ui: &mut egui::Ui, state: &mut ChatViewState) {
    let output = egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for line in &state.lines {
                match line {
                    LogLine::Message {
                        text,
                        outgoing,
                        time,
                    } => {
                        ui.horizontal_wrapped(|ui| {
                            if let Some(time) = time {
                                ui.label(egui::RichText::new(time).weak());
                            }
                            if *outgoing {
                                ui.colored_label(egui::Color32::LIGHT_BLUE, text);
                            } else {
                                ui.label(text);
                            }
                        });
                    }
                    LogLine::Location(text) => {
                        ui.vertical_centered(|ui| {
                            ui.strong(text);
                        });
                    }
                    LogLine::Notice(text) => {
                        ui.label(egui::RichText::new(text).strong());
                    }
                }
            }

            if state.scroll_requested {
                ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
            }
        });

    state.scroll_requested = false;
    let max_offset = (output.content_size.y - output.inner_rect.height()).max(0.0);
    state.at_bottom = output.state.offset.y >= max_offset - 1.0;
}
