pub mod export_tree;
pub mod init;
pub mod score;
pub mod update_normalization;
