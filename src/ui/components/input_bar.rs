use eframe::egui;

/// Returns `true` when the user asked to send. The text is left in place;
/// the session clears it once the message went out.
pub fn render(ui: &mut egui::Ui, input_text: &mut String, enabled: bool) -> bool {
    let mut send = false;
    ui.add_enabled_ui(enabled, |ui| {
        ui.horizontal(|ui| {
            let response = ui.text_edit_singleline(input_text);
            if ui.button("Send").clicked() {
                send = true;
            }

            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                send = true;
            }
        });
    });

    send
}
