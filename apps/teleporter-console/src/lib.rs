//! # Teleporter Console
//!
//! Administrative console for the Teleporter stream-processing engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                apps/teleporter-console (THE BINARY)              │
//! │                                                                  │
//! │  ┌───────────┐   ┌──────────────┐   ┌──────────────────────┐    │
//! │  │   CLI     │──▶│  Controllers │──▶│ ConfigStore /        │    │
//! │  │  (clap)   │   │ (per kind)   │   │ RuntimeStore         │    │
//! │  └───────────┘   └──────────────┘   └──────────┬───────────┘    │
//! │                                                │ KvTransport    │
//! │                        ┌───────────────────────┴──────┐         │
//! │                        ▼                              ▼         │
//! │                 HttpTransport (reqwest)      LocalTransport     │
//! │                        │                              │         │
//! │                        ▼                              │         │
//! │                 HTTP API (axum) ──▶ AppState ◀────────┘         │
//! │                                         │                       │
//! │                                 ┌───────▼────────┐              │
//! │                                 │ teleporter-core│              │
//! │                                 │ schema, forms, │              │
//! │                                 │ key space      │              │
//! │                                 └────────────────┘              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
