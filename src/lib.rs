//! Core library for music-file-tag-renamer
pub mod config;
pub mod models;
pub mod tags;
pub mod template;
pub mod conflict;
pub mod scan;
pub mod worker;
