// Approval surface controller (the popup window)

use crate::platform::MaybeSendSync;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PopupKind {
    SignDeploy,
    Connect,
}

impl fmt::Display for PopupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopupKind::SignDeploy => f.write_str("sign"),
            PopupKind::Connect => f.write_str("connect"),
        }
    }
}

/// Opens and closes the user-facing approval window.
///
/// Tearing the window down without a decision is expected to call
/// `SigningManager::reject` for the request it was showing.
pub trait ApprovalSurface: MaybeSendSync {
    fn open(&self, kind: PopupKind);
    fn close(&self);
}

/// Surface with no window behind it; open/close intents are only logged.
/// Decisions arrive through some other channel (HTTP, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSurface;

impl ApprovalSurface for HeadlessSurface {
    fn open(&self, kind: PopupKind) {
        info!("Approval requested: {} popup", kind);
    }

    fn close(&self) {
        info!("Approval popup closed");
    }
}
