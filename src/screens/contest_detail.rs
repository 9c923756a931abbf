use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use eframe::egui;
use rfd::FileDialog;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::error::SubmissionError;
use crate::models::{ContestView, ContestantView};
use crate::services::coordinator::{ContestPage, ContestantsPane, NO_CONTESTANTS, PageView};
use crate::services::lifecycle::Status;
use crate::services::normalizer::Normalizer;
use crate::services::photo::PhotoBackend;
use crate::services::photo_textures::TexturePhotoBackend;
use crate::services::store::Services;
use crate::services::submission::{Notice, SelectedPhoto, SubmissionFlow};
use crate::screens::open_contest::OpenRequest;

const CARD_PHOTO_SIZE: egui::Vec2 = egui::vec2(224.0, 208.0);

pub enum DetailAction {
    Stay,
    Back,
}

pub struct DetailScreen {
    page: ContestPage,
    textures: Rc<TexturePhotoBackend>,
    runtime: Handle,
    submission: SubmissionFlow,
    selected: SelectedPhoto,
    submit_rx: Option<Receiver<Result<(), SubmissionError>>>,
    notice: Option<Notice>,
    grid_columns: usize,
}

impl DetailScreen {
    pub fn open(ctx: &egui::Context, runtime: Handle, request: OpenRequest) -> Self {
        let OpenRequest { key, config, store } = request;
        let services = Services::from_backend(store);
        let textures = Rc::new(TexturePhotoBackend::new(ctx.clone()));
        let photos: Rc<dyn PhotoBackend> = textures.clone();

        let mut page = ContestPage::new(
            key,
            services.clone(),
            runtime.clone(),
            photos,
            Normalizer::new(config.timestamp_unit),
        )
        .with_max_photo_dimension(config.presentation.max_photo_dimension);
        page.mount();

        Self {
            page,
            textures,
            runtime,
            submission: SubmissionFlow::new(services.contestants),
            selected: SelectedPhoto::default(),
            submit_rx: None,
            notice: None,
            grid_columns: config.presentation.grid_columns.max(1),
        }
    }

    fn poll_submission(&mut self) {
        let Some(rx) = &self.submit_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(outcome) => {
                self.notice = Some(Notice::from_outcome(&outcome));
                self.submit_rx = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                warn!("Submission task ended without reporting");
                self.notice = Some(Notice {
                    success: false,
                    message: "Submission failed".to_string(),
                });
                self.submit_rx = None;
            }
        }
    }

    fn start_submission(&mut self, ctx: &egui::Context) {
        let Some(identity) = self.page.principal().cloned() else {
            warn!("Submit pressed before identity resolved");
            return;
        };
        let (tx, rx) = mpsc::channel();
        let flow = self.submission.clone();
        let key = self.page.contest_key().clone();
        let path = self.selected.path.clone();
        let ctx = ctx.clone();

        info!("Starting submission for contest {key}");
        self.runtime.spawn(async move {
            let outcome = flow.submit(&identity, &key, path.as_deref()).await;
            let _ = tx.send(outcome);
            ctx.request_repaint();
        });
        self.submit_rx = Some(rx);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinPanel {
    Locked,
    Open,
}

/// Entries stay open from the start onwards; only a contest that has not started is locked.
fn join_panel(status: Status) -> JoinPanel {
    match status {
        Status::NotStarted => JoinPanel::Locked,
        Status::Ongoing | Status::WinnerSelection | Status::Completed => JoinPanel::Open,
    }
}

fn accent(status: Status) -> egui::Color32 {
    let [r, g, b] = status.accent_rgb();
    egui::Color32::from_rgb(r, g, b)
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn skeleton_block(ui: &mut egui::Ui, size: egui::Vec2) {
    let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
    ui.painter()
        .rect_filled(rect, 8.0, egui::Color32::from_gray(70));
}

fn loading_ui(ui: &mut egui::Ui, grid_columns: usize) {
    ui.horizontal(|ui| {
        ui.add(egui::Spinner::new());
        ui.label("Loading contest...");
    });
    ui.add_space(8.0);
    ui.columns(2, |cols| {
        let left = &mut cols[0];
        skeleton_block(left, egui::vec2(left.available_width(), 48.0));
        skeleton_block(left, egui::vec2(left.available_width() / 3.0, 32.0));
        left.add_space(12.0);
        skeleton_block(left, egui::vec2(left.available_width(), 120.0));
        left.add_space(12.0);
        skeleton_block(left, egui::vec2(left.available_width(), 96.0));

        let right = &mut cols[1];
        egui::Grid::new("contestant-skeleton")
            .spacing([12.0, 12.0])
            .show(right, |ui| {
                for idx in 0..6 {
                    skeleton_block(ui, egui::vec2(120.0, 110.0));
                    if (idx + 1) % grid_columns == 0 {
                        ui.end_row();
                    }
                }
            });
    });
}

fn contest_summary_ui(ui: &mut egui::Ui, contest: &ContestView) {
    ui.heading(&contest.name);
    ui.label(&contest.category);
    ui.add_space(8.0);

    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.label(egui::RichText::new(format!("{} reward", contest.reward)).strong());
        let deadline = contest
            .deadline
            .map(format_instant)
            .unwrap_or_else(|| "Ended".to_string());
        ui.label(format!("Deadline: {deadline}"));
        ui.label(format!("Ends: {}", format_instant(contest.end_date)));
        ui.horizontal(|ui| {
            ui.label("Status:");
            ui.colored_label(accent(contest.status), contest.status.label());
        });
    });

    ui.add_space(8.0);
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.label(egui::RichText::new("Description :").strong());
        ui.label(contest.description_or_default());
    });
}

fn contestant_card(
    ui: &mut egui::Ui,
    textures: &TexturePhotoBackend,
    contestant: &ContestantView,
    status: Option<Status>,
) {
    ui.vertical(|ui| {
        let texture = contestant
            .photo
            .as_ref()
            .and_then(|photo| textures.texture(photo.key()));
        match texture {
            Some(texture) => {
                ui.add(
                    egui::Image::from_texture(egui::load::SizedTexture::from_handle(&texture))
                        .fit_to_exact_size(CARD_PHOTO_SIZE),
                );
            }
            None => skeleton_block(ui, CARD_PHOTO_SIZE),
        }
        let fill = status.map(accent).unwrap_or(egui::Color32::from_gray(40));
        egui::Frame::new()
            .fill(fill)
            .inner_margin(egui::Margin::symmetric(8, 4))
            .show(ui, |ui| {
                ui.set_width(CARD_PHOTO_SIZE.x - 16.0);
                ui.label(egui::RichText::new(&contestant.display_name).strong())
                    .on_hover_text(contestant.principal.as_str());
                ui.small(format!("#{}", contestant.contestant_id));
            });
    });
}

pub fn ui(ui: &mut egui::Ui, screen: &mut DetailScreen) -> DetailAction {
    let ctx = ui.ctx().clone();
    screen.page.poll();
    screen.poll_submission();
    if screen.page.has_pending_sources() || screen.submit_rx.is_some() {
        ctx.request_repaint_after(Duration::from_millis(100));
    }

    let mut action = DetailAction::Stay;
    let mut submit_clicked = false;
    let mut refresh_clicked = false;
    let grid_columns = screen.grid_columns;

    ui.add_enabled_ui(screen.notice.is_none(), |ui| {
        ui.horizontal(|ui| {
            if ui.button("Back").clicked() {
                action = DetailAction::Back;
            }
            if ui.button("Refresh").clicked() {
                refresh_clicked = true;
            }
        });
        ui.add_space(8.0);

        let view = screen.page.view();
        let ready = match view {
            PageView::Loading => {
                loading_ui(ui, grid_columns);
                return;
            }
            PageView::Ready(ready) => ready,
        };

        let status = ready.contest.as_ref().map(|contest| contest.status);
        ui.label(format!("Signed in as {}", ready.profile.username));
        ui.add_space(4.0);

        ui.columns(2, |cols| {
            let left = &mut cols[0];
            match &ready.contest {
                Some(contest) => contest_summary_ui(left, contest),
                None => {
                    left.heading("Contest unavailable");
                    left.label(format!(
                        "Contest {} could not be loaded.",
                        screen.page.contest_key()
                    ));
                    if let Some(err) = screen.page.contest_failure() {
                        left.small(err.to_string());
                    }
                }
            }

            left.add_space(8.0);
            match &ready.contest {
                Some(contest) if join_panel(contest.status) == JoinPanel::Locked => {
                    egui::Frame::group(left.style())
                        .fill(egui::Color32::from_black_alpha(100))
                        .show(left, |ui| {
                            ui.set_width(ui.available_width());
                            ui.vertical_centered(|ui| {
                                ui.colored_label(egui::Color32::GRAY, "Not started yet");
                            });
                        });
                }
                Some(contest) => {
                    left.horizontal(|ui| {
                        if ui.button("Choose photo").clicked()
                            && let Some(path) = FileDialog::new()
                                .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp"])
                                .pick_file()
                        {
                            screen.selected.path = Some(path);
                        }
                        ui.label(
                            screen
                                .selected
                                .file_name()
                                .unwrap_or_else(|| "No file selected".to_string()),
                        );
                    });
                    let can_submit =
                        screen.submit_rx.is_none() && screen.page.principal().is_some();
                    let join = egui::Button::new("Join").fill(accent(contest.status));
                    if left.add_enabled(can_submit, join).clicked() {
                        submit_clicked = true;
                    }
                    if screen.submit_rx.is_some() {
                        left.horizontal(|ui| {
                            ui.add(egui::Spinner::new());
                            ui.label("Submitting...");
                        });
                    }
                }
                None => {}
            }

            let right = &mut cols[1];
            egui::ScrollArea::vertical().show(right, |ui| match &ready.contestants {
                ContestantsPane::Placeholder => {
                    ui.label(NO_CONTESTANTS);
                }
                ContestantsPane::Entries(entries) => {
                    egui::Grid::new("contestants")
                        .spacing([12.0, 12.0])
                        .show(ui, |ui| {
                            for (idx, contestant) in entries.iter().enumerate() {
                                contestant_card(ui, &screen.textures, contestant, status);
                                if (idx + 1) % grid_columns == 0 {
                                    ui.end_row();
                                }
                            }
                        });
                }
            });
        });
    });

    if let Some(notice) = &screen.notice {
        let mut dismissed = false;
        let title = if notice.success { "Success" } else { "Error" };
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(&ctx, |ui| {
                ui.label(&notice.message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            screen.notice = None;
        }
    }

    if refresh_clicked {
        screen.page.refresh();
    }
    if submit_clicked {
        screen.start_submission(&ctx);
    }

    action
}
