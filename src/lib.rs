//! YouTube Shorts Generator
//!
//! Library shared by the web server and the worker: job lifecycle storage,
//! the download/transcribe/analyze/edit pipeline, YouTube uploads and the
//! server-rendered pages that follow a job's progress.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod views;
