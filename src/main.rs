mod models;
mod screens;
mod services;

use anyhow::Context;
use eframe::egui;
use models::Route;
use screens::landing::LandingAction;
use screens::submissions::{SubmissionsAction, SubmissionsScreen};
use services::config_loader::{self, AppConfig};
use services::session_store::SessionStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

struct ViewerApp {
    route: Route,
    session: SessionStore,
    config: AppConfig,
    submissions: Option<SubmissionsScreen>,
    notice: Option<String>,
}

impl ViewerApp {
    fn new(config: AppConfig, notice: Option<String>) -> Self {
        let mut session = SessionStore::new(config.api_base_url.clone());
        if let Some(token) = &config.session.token {
            session.sign_in(token, &config.session.role, config.session.expires_at);
        }

        let mut app = Self {
            route: Route::Institution,
            session,
            config,
            submissions: None,
            notice,
        };
        if app.session.is_authenticated()
            && let Some(league_id) = app.config.session.league_id.clone()
            && !league_id.trim().is_empty()
        {
            app.navigate(Route::LeagueSubmissions {
                league_id: league_id.trim().to_string(),
            });
        }
        app
    }

    fn navigate(&mut self, route: Route) {
        if route == self.route {
            return;
        }
        info!("Transition: {} -> {}", self.route.path(), route.path());
        self.submissions = match &route {
            Route::LeagueSubmissions { league_id } => Some(SubmissionsScreen::new(league_id.clone())),
            Route::Institution => None,
        };
        self.route = route;
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            match self.route {
                Route::Institution => {
                    if let LandingAction::Navigate(route) = screens::landing::ui(
                        ui,
                        &mut self.session,
                        &mut self.config,
                        self.notice.as_deref(),
                    ) {
                        self.notice = None;
                        self.navigate(route);
                    }
                }
                Route::LeagueSubmissions { .. } => {
                    let action = match self.submissions.as_mut() {
                        Some(screen) => screen.ui(ui, &mut self.session, &self.config),
                        None => {
                            warn!("Submissions route active without screen state");
                            SubmissionsAction::Navigate {
                                to: Route::Institution,
                                notice: None,
                            }
                        }
                    };
                    if let SubmissionsAction::Navigate { to, notice } = action {
                        if let Some(screen) = &self.submissions {
                            info!("Leaving submissions of league {}", screen.league_id());
                        }
                        self.notice = notice;
                        self.navigate(to);
                    }
                }
            }
        });
    }
}

const LOG_DIR_ENV: &str = "LEAGUE_SUBMISSIONS_LOG_DIR";
const DEFAULT_LOG_FILTER: &str = "info,wgpu=warn,eframe=warn";

/// Console plus a daily rolling file under `log_dir`. Fetch workers log from
/// their own threads, so thread names are kept on every line.
fn init_tracing(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("invalid log filter")?;

    fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("league-submissions")
        .filename_suffix("log")
        .max_log_files(14)
        .build(log_dir)
        .context("cannot open log file")?;
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_thread_names(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_writer(file_writer),
        )
        .try_init()
        .context("tracing subscriber already set")?;

    Ok(file_guard)
}

fn load_startup_config() -> (AppConfig, Option<String>) {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(config_loader::DEFAULT_CONFIG_FILE));

    match config_loader::load_app_config(&config_path) {
        Ok(config) => (config, None),
        Err(message) => {
            warn!("{message}; falling back to defaults");
            (AppConfig::default(), Some(message))
        }
    }
}

fn main() -> eframe::Result<()> {
    let log_dir = std::env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs"));
    let _log_guard = match init_tracing(&log_dir) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("logging disabled: {err:#}");
            None
        }
    };
    info!("Starting league submissions viewer");

    let (config, notice) = load_startup_config();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 860.0])
            .with_min_inner_size([900.0, 560.0]),
        ..Default::default()
    };

    eframe::run_native(
        "League Submissions",
        options,
        Box::new(|cc| {
            let mut style = (*cc.egui_ctx.style()).clone();
            style
                .text_styles
                .insert(egui::TextStyle::Heading, egui::FontId::proportional(26.0));
            style
                .text_styles
                .insert(egui::TextStyle::Body, egui::FontId::proportional(16.0));
            style
                .text_styles
                .insert(egui::TextStyle::Button, egui::FontId::proportional(15.0));
            style.spacing.button_padding = egui::vec2(10.0, 6.0);
            cc.egui_ctx.set_style(style);

            Ok(Box::new(ViewerApp::new(config, notice)))
        }),
    )
}
