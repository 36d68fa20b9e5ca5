// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing notification sink.

use crate::types::Notification;

/// Delivers notifications to the user (toast, banner, terminal line, sound cue).
///
/// Delivery is fire-and-forget and must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}
