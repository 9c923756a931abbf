use std::path::{Path, PathBuf};
use std::sync::Arc;

use eframe::egui;
use rfd::FileDialog;
use tracing::{info, warn};

use crate::models::{ContestKey, Principal};
use crate::services::config_loader::{self, ContestViewConfig};
use crate::services::snapshot_store::SnapshotStore;

pub enum OpenAction {
    Stay,
    Open(OpenRequest),
}

pub struct OpenRequest {
    pub key: ContestKey,
    pub config: ContestViewConfig,
    pub store: Arc<SnapshotStore>,
}

#[derive(Default)]
pub struct OpenForm {
    pub data_path: Option<String>,
    pub route_segment: String,
    errors: Vec<String>,
}

impl OpenForm {
    pub fn new(data_path: Option<String>, route_segment: Option<String>) -> Self {
        Self {
            data_path,
            route_segment: route_segment.unwrap_or_default(),
            errors: Vec::new(),
        }
    }
}

/// Checks the folder layout and returns the snapshot path on success.
fn validate_data_folder(folder_path: &str, snapshot_file: &str) -> Result<PathBuf, Vec<String>> {
    let mut errors = Vec::new();
    let folder = Path::new(folder_path);

    if !folder.exists() {
        errors.push(format!("Data folder does not exist: {}", folder.display()));
        return Err(errors);
    }

    if !folder.is_dir() {
        errors.push(format!("Path is not a folder: {}", folder.display()));
        return Err(errors);
    }

    let snapshot = folder.join(snapshot_file);
    if !snapshot.is_file() {
        errors.push(format!("Missing required file: {}", snapshot.display()));
    }

    let config_toml = folder.join("config.toml");
    if config_toml.exists() && !config_toml.is_file() {
        errors.push(format!(
            "config.toml exists but is not a file: {}",
            config_toml.display()
        ));
    }

    if errors.is_empty() {
        Ok(snapshot)
    } else {
        Err(errors)
    }
}

/// Loads config and snapshot for the chosen folder.
pub fn prepare(folder_path: &str, route_segment: &str) -> Result<OpenRequest, Vec<String>> {
    let config = config_loader::load_config(folder_path).map_err(|err| vec![err])?;
    let snapshot_path = validate_data_folder(folder_path, &config.snapshot_file)?;
    let store = SnapshotStore::load(&snapshot_path, Principal::new(config.principal.clone()))
        .map_err(|err| vec![format!("{err:#}")])?;

    Ok(OpenRequest {
        key: ContestKey::from_route_segment(route_segment),
        config,
        store: Arc::new(store),
    })
}

pub fn ui(ui: &mut egui::Ui, form: &mut OpenForm) -> OpenAction {
    ui.heading("Contest View");
    ui.add_space(8.0);
    ui.label("Select data folder and contest");
    ui.add_space(12.0);

    ui.label("Data folder:");
    let mut selected_path = form.data_path.clone().unwrap_or_default();
    let response = ui.add_sized(
        [900.0, 28.0],
        egui::TextEdit::singleline(&mut selected_path).hint_text("Enter data folder path..."),
    );
    if response.changed() {
        let trimmed = selected_path.trim().to_string();
        form.data_path = if trimmed.is_empty() { None } else { Some(trimmed) };
    }
    ui.add_space(8.0);

    if ui.button("Choose folder").clicked()
        && let Some(path) = FileDialog::new().set_directory(".").pick_folder()
    {
        form.data_path = Some(path.display().to_string());
    }

    ui.add_space(8.0);
    ui.label("Contest:");
    ui.add_sized(
        [300.0, 28.0],
        egui::TextEdit::singleline(&mut form.route_segment).hint_text("Contest id, e.g. 3"),
    );

    let current_path = form
        .data_path
        .as_deref()
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(ToOwned::to_owned);

    ui.add_space(8.0);
    let mut action = OpenAction::Stay;
    if ui
        .add_enabled(current_path.is_some(), egui::Button::new("Open"))
        .clicked()
        && let Some(folder_path) = current_path
    {
        match prepare(&folder_path, &form.route_segment) {
            Ok(request) => {
                info!("Opening contest {} from {}", request.key, folder_path);
                form.errors.clear();
                action = OpenAction::Open(request);
            }
            Err(errors) => {
                warn!("Cannot open {}: {:?}", folder_path, errors);
                form.errors = errors;
            }
        }
    }

    if !form.errors.is_empty() {
        ui.add_space(8.0);
        egui::Frame::group(ui.style())
            .fill(egui::Color32::from_rgb(58, 22, 22))
            .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(180, 60, 60)))
            .show(ui, |ui| {
                ui.label(egui::RichText::new("Cannot open contest").strong());
                for err in &form.errors {
                    ui.colored_label(egui::Color32::from_rgb(255, 170, 170), err);
                }
            });
    }

    action
}
