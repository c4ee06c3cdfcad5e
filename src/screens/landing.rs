use std::cell::RefCell;

use eframe::egui;
use rfd::FileDialog;
use tracing::info;

use crate::models::{INSTITUTION_ROLE, Route};
use crate::services::config_loader::{self, AppConfig};
use crate::services::session_store::SessionStore;

pub enum LandingAction {
    Stay,
    Navigate(Route),
}

#[derive(Default)]
struct LandingUiState {
    seeded: bool,
    api_base_url: String,
    token: String,
    league_id: String,
    message: Option<String>,
}

impl LandingUiState {
    fn seed(&mut self, config: &AppConfig) {
        self.api_base_url = config.api_base_url.clone();
        self.token = config.session.token.clone().unwrap_or_default();
        self.league_id = config.session.league_id.clone().unwrap_or_default();
        self.seeded = true;
    }
}

thread_local! {
    static LANDING_UI_STATE: RefCell<LandingUiState> = RefCell::new(LandingUiState::default());
}

pub fn ui(
    ui: &mut egui::Ui,
    session: &mut SessionStore,
    config: &mut AppConfig,
    notice: Option<&str>,
) -> LandingAction {
    LANDING_UI_STATE.with(|cell| {
        let mut state = cell.borrow_mut();
        if !state.seeded {
            state.seed(config);
        }

        ui.heading("Institution");
        ui.add_space(8.0);
        ui.label("Sign in with an institution access token to browse league submissions.");
        ui.add_space(12.0);

        if let Some(notice) = notice {
            ui.colored_label(egui::Color32::from_rgb(255, 220, 140), notice);
            ui.add_space(8.0);
        }

        ui.label("API base URL:");
        ui.add_sized(
            [700.0, 28.0],
            egui::TextEdit::singleline(&mut state.api_base_url)
                .hint_text("http://localhost:8000"),
        );
        ui.add_space(6.0);

        ui.label("Access token:");
        ui.add_sized(
            [700.0, 28.0],
            egui::TextEdit::singleline(&mut state.token)
                .password(true)
                .hint_text("Paste access token..."),
        );
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            let can_sign_in = !state.token.trim().is_empty() && !state.api_base_url.trim().is_empty();
            if ui
                .add_enabled(can_sign_in, egui::Button::new("Sign in"))
                .clicked()
            {
                session.set_api_base_url(&state.api_base_url);
                session.sign_in(&state.token, &config.session.role, config.session.expires_at);
                state.message = None;
            }

            if session.is_authenticated() && ui.button("Sign out").clicked() {
                session.sign_out();
            }

            if ui.button("Load session file").clicked()
                && let Some(path) = FileDialog::new()
                    .set_directory(".")
                    .add_filter("TOML", &["toml"])
                    .pick_file()
            {
                match config_loader::load_app_config(&path) {
                    Ok(loaded) => {
                        info!("Session file loaded: {}", path.display());
                        *config = loaded;
                        state.seed(config);
                        session.set_api_base_url(&config.api_base_url);
                        if let Some(token) = &config.session.token {
                            session.sign_in(token, &config.session.role, config.session.expires_at);
                        }
                        state.message = Some(format!("Loaded {}", path.display()));
                    }
                    Err(message) => {
                        state.message = Some(message);
                    }
                }
            }
        });

        if let Some(message) = &state.message {
            ui.add_space(6.0);
            ui.label(message);
        }

        ui.add_space(12.0);
        if session.is_authenticated() {
            let user = session.current_user();
            let role_color = if user.role == INSTITUTION_ROLE {
                egui::Color32::LIGHT_GREEN
            } else {
                egui::Color32::LIGHT_RED
            };
            ui.horizontal(|ui| {
                ui.label(format!(
                    "Signed in as {}",
                    if user.name.is_empty() { "(unnamed)" } else { user.name.as_str() }
                ));
                ui.colored_label(role_color, format!("role: {}", user.role));
            });
            if let Some(expires_at) = session.expires_at() {
                ui.label(format!("Token expires at {}", expires_at.format("%Y-%m-%d %H:%M UTC")));
            }
        } else {
            ui.colored_label(egui::Color32::GRAY, "Not signed in");
        }

        ui.add_space(12.0);
        ui.label("League ID:");
        ui.add_sized(
            [300.0, 28.0],
            egui::TextEdit::singleline(&mut state.league_id).hint_text("e.g. 42"),
        );
        ui.add_space(8.0);

        let league_id = state.league_id.trim().to_string();
        let can_open = session.is_authenticated() && !league_id.is_empty();
        if ui
            .add_enabled(can_open, egui::Button::new("Open submissions"))
            .clicked()
        {
            return LandingAction::Navigate(Route::LeagueSubmissions { league_id });
        }

        LandingAction::Stay
    })
}
