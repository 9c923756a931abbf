pub mod config_loader;
pub mod coordinator;
pub mod lifecycle;
pub mod normalizer;
pub mod photo;
pub mod photo_textures;
pub mod projector;
pub mod snapshot_store;
pub mod store;
pub mod submission;
