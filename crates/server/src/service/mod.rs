//! Storage-backed operations.
//!
//! Every function takes the connection of an open transaction (see
//! [`crate::storage::Db::transact`]), runs its capability check first and
//! returns a [`ServiceResult`](partyplanner_api::ServiceResult). Operations
//! that notify someone also return the mails to send after commit.

pub mod parties;
pub mod users;

use crate::mail::Mail;

/// Mails queued by an operation, sent only once the transaction commits.
pub type Outbox = Vec<Mail>;
