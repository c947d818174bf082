pub mod config;
pub mod logging;

pub mod catalog;
pub mod downloader;
pub mod fetch;
pub mod fetch_head;
pub mod player;
pub mod segmenter;
pub mod track;
