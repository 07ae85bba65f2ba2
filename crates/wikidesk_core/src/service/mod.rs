//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep callers (store facade, CLI) decoupled from storage details.

pub mod backup_service;
pub mod category_service;
pub mod ctf_service;
pub mod folder_service;
pub mod media_service;
pub mod page_service;
pub mod settings_service;
