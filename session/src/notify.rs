//! User-visible outcome notifications.
//!
//! Every action the session performs on the user's behalf ends in exactly one
//! [`Notification`], broadcast to all subscribers (the presentation layer).
//! Sending never blocks and never fails the action: with no subscribers the
//! notification is simply dropped.

use std::fmt;

use tokio::sync::broadcast;

use crate::error::SessionError;

const CHANNEL_CAPACITY: usize = 64;

/// What the session was doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Connect,
    Bind,
    Refresh,
    Registration,
    Vote,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Connect => "wallet connection",
            Action::Bind => "contract binding",
            Action::Refresh => "candidate refresh",
            Action::Registration => "registration",
            Action::Vote => "vote",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(SessionError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub action: Action,
    pub outcome: Outcome,
}

impl Notification {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Success(msg) => write!(f, "{msg}"),
            Outcome::Failure(err) => write!(f, "{}: {err}", self.action),
        }
    }
}

/// Fan-out of notifications to any number of subscribers.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, action: Action, message: impl Into<String>) {
        let _ = self.tx.send(Notification {
            action,
            outcome: Outcome::Success(message.into()),
        });
    }

    pub fn failure(&self, action: Action, error: &SessionError) {
        let _ = self.tx.send(Notification {
            action,
            outcome: Outcome::Failure(error.clone()),
        });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_subscribers_notified() {
        let notifier = Notifier::new();
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.subscribe();
        notifier.success(Action::Vote, "Vote Cast Successfully");
        assert!(rx1.recv().await.unwrap().is_success());
        assert!(rx2.recv().await.unwrap().is_success());
    }

    #[test]
    fn sending_without_subscribers_is_fine() {
        let notifier = Notifier::new();
        notifier.failure(Action::Refresh, &SessionError::NotReady);
    }

    #[test]
    fn failure_display_names_action() {
        let n = Notification {
            action: Action::Registration,
            outcome: Outcome::Failure(SessionError::NotReady),
        };
        assert!(n.to_string().starts_with("registration: not ready"));
    }
}
