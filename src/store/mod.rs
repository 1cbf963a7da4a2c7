pub mod asset_store;
pub mod board;
pub mod shot_store;

pub use asset_store::{mime_for_path, AssetStore};
pub use board::{Board, BoardAction, BoardEvent, StoryCursor};
pub use shot_store::ShotStore;
