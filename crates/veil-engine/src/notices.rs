// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing notice texts.
//!
//! Everything the core says to a participant lives here, so the wording
//! stays consistent between the matchmaker, relay, and drain paths. None
//! of these strings may reveal a partner's identity.

/// Sent when a search starts and no partner is available yet.
pub const SEARCHING: &str =
    "Looking for a partner... you'll be notified as soon as one is found.";

/// Sent to both sides when a match is made.
pub const PARTNER_FOUND: &str =
    "Partner found! Say hi - messages are relayed anonymously. \
     Send 'next' for a new partner or 'stop' to end the chat.";

/// Soft failure: `search` while already chatting.
pub const ALREADY_CHATTING: &str =
    "You're already in a chat. Send 'next' for a new partner or 'stop' to end it.";

/// Soft failure: `search` while already waiting.
pub const ALREADY_WAITING: &str = "Still searching for a partner, hang tight.";

/// Soft failure: `next`/`sendpp` without an active chat.
pub const NOT_CHATTING: &str =
    "You're not in a chat right now. Send 'search' to find a partner.";

/// Soft failure: `stop` from a participant the system has never seen.
pub const NOTHING_TO_STOP: &str =
    "Nothing to stop - you're not searching or chatting. Send 'search' to find a partner.";

/// Confirmation after `stop`.
pub const STOPPED: &str =
    "Chat ended. Send 'search' whenever you want a new partner.";

/// Sent to the abandoned side after the partner's `next` or `stop`.
pub const PARTNER_LEFT: &str =
    "Your partner ended the chat. Send 'search' to find a new one.";

/// Sent to the sender when an immediate delivery was queued instead.
pub const DELIVERY_DEFERRED: &str =
    "Your partner seems unreachable right now - the message was queued and will be retried.";

/// Appended to the body or caption of a late delivery.
pub const LATE_ANNOTATION: &str = "(delivered after a connection issue)";

/// Sent to the sender once a queued message finally went through.
pub const DELIVERED_LATE: &str = "A queued message was just delivered to your partner.";

/// Sent to the sender when the retry budget is exhausted.
pub const DELIVERY_FAILED_PERMANENT: &str =
    "One of your messages couldn't be delivered after several attempts and won't be retried.";

/// Content kind the relay cannot forward at all.
pub const UNSUPPORTED_CONTENT: &str = "That message type can't be forwarded.";

/// Content kind that can be sent but not queued, after a failed send.
pub const UNDELIVERABLE_CONTENT: &str =
    "That message couldn't be delivered right now - please try again.";

/// `sendpp` when the profile image cannot be fetched.
pub const PROFILE_IMAGE_UNAVAILABLE: &str =
    "Couldn't fetch your profile picture - nothing was sent.";

/// Caption attached to a forwarded profile picture.
pub const PROFILE_IMAGE_CAPTION: &str = "Your partner shared their profile picture.";

/// Fallback for content from a participant who is neither chatting nor
/// issuing a known command.
pub const IDLE_HINT: &str =
    "You're not chatting with anyone. Send 'search' to find a partner.";
