//! chartwatch - Helm chart update checker for Argo CD
//!
//! This library polls the Argo CD application inventory and resolves the
//! latest version of every deployed chart from its repository:
//! - Classic chart repositories (`index.yaml`)
//! - OCI registries (tag listing)
//! - Git repositories (tags and `Chart.yaml`)
//!
//! Results are rendered as a table, JSON or markdown and can be sent to a
//! notification channel.

pub mod argocd;
pub mod cli;
pub mod config;
pub mod configure;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod http;
pub mod logging;
pub mod notification;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod registry;
pub mod version;
