use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use eframe::egui;
use tracing::{info, warn};

use crate::models::Route;
use crate::services::access_guard::{GuardDecision, evaluate_access};
use crate::services::config_loader::AppConfig;
use crate::services::session_store::SessionStore;
use crate::services::submission_client::{
    FETCH_FAILED_MESSAGE, FetchRequest, LoaderEvent, spawn_submission_fetch,
};
use crate::services::submission_state::{
    ApplyResult, FetchOutcome, FetchTicket, SubmissionsView, ViewerContent,
};

const TOKEN_REJECTED_NOTICE: &str = "The server rejected your access token. Sign in again.";

pub enum SubmissionsAction {
    Stay,
    Navigate { to: Route, notice: Option<String> },
}

/// Lives while the league submissions route is active and is dropped on leave.
pub struct SubmissionsScreen {
    league_id: String,
    view: SubmissionsView,
    pending: Vec<(FetchTicket, Receiver<LoaderEvent>)>,
}

impl SubmissionsScreen {
    pub fn new(league_id: impl Into<String>) -> Self {
        Self {
            league_id: league_id.into(),
            view: SubmissionsView::new(),
            pending: Vec::new(),
        }
    }

    pub fn league_id(&self) -> &str {
        &self.league_id
    }

    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        session: &mut SessionStore,
        config: &AppConfig,
    ) -> SubmissionsAction {
        let snapshot = session.snapshot();
        let token_expired = session.check_token_expiry();
        if let GuardDecision::Redirect { to, reason } = evaluate_access(&snapshot, token_expired) {
            info!("Access denied to {}: {:?}", self.league_id, reason);
            return SubmissionsAction::Navigate {
                to,
                notice: Some(reason.describe()),
            };
        }

        if let Some(ticket) = self.view.trigger(&self.league_id, &snapshot.token) {
            let request = FetchRequest {
                api_base_url: snapshot.api_base_url.clone(),
                league_id: self.league_id.clone(),
                token: snapshot.token.clone(),
                timeout: Duration::from_secs(config.request_timeout_seconds.max(1)),
                user_agent: config.user_agent.clone(),
            };
            self.pending
                .push((ticket, spawn_submission_fetch(ticket, request)));
        }

        if let Some(action) = self.settle_fetches(session) {
            return action;
        }
        if self.view.is_loading() || !self.pending.is_empty() {
            ui.ctx().request_repaint_after(Duration::from_millis(50));
        }

        let mut action = SubmissionsAction::Stay;
        ui.horizontal(|ui| {
            if ui.button("← Back").clicked() {
                action = SubmissionsAction::Navigate {
                    to: Route::Institution,
                    notice: None,
                };
            }
            ui.heading("League Submissions");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(egui::RichText::new(&self.league_id).monospace());
                ui.label("League ID:");
            });
        });
        ui.add_space(8.0);

        match self.view.content() {
            ViewerContent::Loading => {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new());
                    ui.label("Loading submissions…");
                });
            }
            ViewerContent::Error(message) => {
                egui::Frame::group(ui.style())
                    .fill(egui::Color32::from_rgb(58, 22, 22))
                    .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(180, 60, 60)))
                    .show(ui, |ui| {
                        ui.colored_label(egui::Color32::from_rgb(255, 170, 170), message);
                    });
            }
            ViewerContent::Empty => {
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.label("No submissions found for this league.");
                });
            }
            ViewerContent::Browse => {
                if let Some(team) = browse_ui(ui, &self.view, config) {
                    self.view.select(&team);
                }
            }
        }

        action
    }

    /// Applies finished fetches. A rejected token signs the session out and
    /// leaves the route.
    fn settle_fetches(&mut self, session: &mut SessionStore) -> Option<SubmissionsAction> {
        let route = self.pump_pending()?;
        session.sign_out();
        Some(SubmissionsAction::Navigate {
            to: route,
            notice: Some(TOKEN_REJECTED_NOTICE.to_string()),
        })
    }

    fn pump_pending(&mut self) -> Option<Route> {
        let mut navigate = None;
        let mut still_pending = Vec::with_capacity(self.pending.len());

        for (ticket, rx) in self.pending.drain(..) {
            let outcome = match rx.try_recv() {
                Ok(LoaderEvent::Finished { ticket, outcome }) => (ticket, outcome),
                Err(TryRecvError::Empty) => {
                    still_pending.push((ticket, rx));
                    continue;
                }
                Err(TryRecvError::Disconnected) => {
                    warn!("Fetch worker {} disconnected", ticket.value());
                    (ticket, FetchOutcome::Failed(FETCH_FAILED_MESSAGE.to_string()))
                }
            };

            if let ApplyResult::Navigate(route) = self.view.apply(outcome.0, outcome.1) {
                navigate = Some(route);
            }
        }

        self.pending = still_pending;
        navigate
    }
}

/// Code pane on the left, team grid on the right. Returns the clicked team.
fn browse_ui(ui: &mut egui::Ui, view: &SubmissionsView, config: &AppConfig) -> Option<String> {
    let mut clicked = None;
    let pane_height = ui.available_height();
    let code_font = egui::FontId::monospace(config.viewer.code_font_size);
    let wrap_mode = if config.viewer.wrap_lines {
        egui::TextWrapMode::Wrap
    } else {
        egui::TextWrapMode::Extend
    };

    ui.columns(2, |columns| {
        egui::Frame::group(columns[0].style())
            .fill(egui::Color32::from_gray(24))
            .show(&mut columns[0], |ui| {
                ui.label(egui::RichText::new(view.selected_team()).strong());
                ui.separator();
                egui::ScrollArea::both()
                    .id_salt("submission_code")
                    .max_height(pane_height)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        ui.add(
                            egui::Label::new(
                                egui::RichText::new(view.selected_code())
                                    .font(code_font.clone())
                                    .color(egui::Color32::from_gray(220)),
                            )
                            .wrap_mode(wrap_mode)
                            .selectable(true),
                        );
                    });
            });

        let ui = &mut columns[1];
        ui.label(egui::RichText::new(format!("Teams ({})", view.team_list().len())).strong());
        ui.add_space(4.0);
        egui::ScrollArea::vertical()
            .id_salt("team_grid")
            .max_height(pane_height)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let columns = config.viewer.team_columns.max(1);
                let cell_width =
                    (ui.available_width() - 8.0 * (columns as f32 - 1.0)) / columns as f32;
                egui::Grid::new("team_grid_cells")
                    .num_columns(columns)
                    .spacing([8.0, 8.0])
                    .show(ui, |ui| {
                        for (index, entry) in view.team_entries().enumerate() {
                            let text = egui::RichText::new(format!(
                                "{}\n{}",
                                entry.name, entry.summary
                            ));
                            let button = egui::Button::new(text)
                                .selected(entry.selected)
                                .min_size(egui::vec2(cell_width.max(80.0), 44.0));
                            if ui
                                .add(button)
                                .on_hover_text("View latest submission")
                                .clicked()
                            {
                                clicked = Some(entry.name.to_string());
                            }
                            if (index + 1) % columns == 0 {
                                ui.end_row();
                            }
                        }
                    });
            });
    });

    clicked
}
