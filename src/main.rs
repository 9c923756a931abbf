mod error;
mod models;
mod screens;
mod services;

use eframe::egui;
use screens::contest_detail::{DetailAction, DetailScreen};
use screens::open_contest::{OpenAction, OpenForm};
use std::fs;
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_unwrap::ResultExt;

enum ContestViewState {
    Open,
    Detail,
}

struct ContestViewApp {
    state: ContestViewState,
    runtime: Runtime,
    open_form: OpenForm,
    detail: Option<DetailScreen>,
}

impl ContestViewApp {
    fn new(runtime: Runtime, open_form: OpenForm) -> Self {
        Self {
            state: ContestViewState::Open,
            runtime,
            open_form,
            detail: None,
        }
    }
}

impl eframe::App for ContestViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            match self.state {
                ContestViewState::Open => {
                    ui.vertical_centered(|ui| {
                        if let OpenAction::Open(request) = screens::open_contest::ui(ui, &mut self.open_form) {
                            self.detail = Some(DetailScreen::open(
                                ctx,
                                self.runtime.handle().clone(),
                                request,
                            ));
                            info!("Transition: Open -> Detail");
                            self.state = ContestViewState::Detail;
                        }
                    });
                }
                ContestViewState::Detail => {
                    if let Some(detail) = self.detail.as_mut() {
                        match screens::contest_detail::ui(ui, detail) {
                            DetailAction::Back => {
                                info!("Transition: Detail -> Open");
                                // dropping the screen unmounts the page
                                self.detail = None;
                                self.state = ContestViewState::Open;
                            }
                            DetailAction::Stay => {}
                        }
                    } else {
                        warn!("Detail state without a contest page, returning to Open");
                        self.state = ContestViewState::Open;
                    }
                }
            }
        });
    }
}

fn init_tracing() -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true);

    let _ = fs::create_dir_all("logs");
    let file_appender = tracing_appender::rolling::daily("logs", "contest-view.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_target(true);

    let init_result = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = init_result {
        eprintln!("tracing init failed: {err}");
        return None;
    }

    Some(file_guard)
}

/// All fetches share one worker thread.
fn build_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("contest-view-io")
        .enable_all()
        .build()
}

fn main() -> eframe::Result<()> {
    let _log_guard = init_tracing();
    info!("Starting Contest View");

    // usage: contest-view [route-segment] [data-folder]
    let mut args = std::env::args().skip(1);
    let route_segment = args.next();
    let data_path = args.next();

    let runtime = build_runtime().expect_or_log("Failed to start async runtime");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Contest View",
        options,
        Box::new(move |cc| {
            let mut style = (*cc.egui_ctx.style()).clone();
            style
                .text_styles
                .insert(egui::TextStyle::Heading, egui::FontId::proportional(30.0));
            style
                .text_styles
                .insert(egui::TextStyle::Body, egui::FontId::proportional(18.0));
            style.spacing.button_padding = egui::vec2(14.0, 9.0);
            cc.egui_ctx.set_style(style);

            Ok(Box::new(ContestViewApp::new(
                runtime,
                OpenForm::new(data_path, route_segment),
            )))
        }),
    )
}
