//! Tracks whether the remote service is reachable

use std::fmt::{Display, Formatter};

use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

impl Display for Connectivity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Connectivity::Online => write!(f, "online"),
            Connectivity::Offline => write!(f, "offline"),
        }
    }
}

/// An actual change of connectivity state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    WentOnline,
    WentOffline,
}

/// See [`ConnectivityMonitor::subscribe`]
pub type ConnectivityReceiver = watch::Receiver<Connectivity>;


/// Holds the current connectivity state, and notifies its subscribers when it changes
pub struct ConnectivityMonitor {
    sender: watch::Sender<Connectivity>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub fn current(&self) -> Connectivity {
        *self.sender.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    /// Set the current state.
    ///
    /// The swap is atomic: when several callers set the same state concurrently, only one of them is told about the transition.
    /// Subscribers are only notified of actual transitions.
    pub fn set(&self, new_state: Connectivity) -> Option<Transition> {
        let mut previous = new_state;
        self.sender.send_if_modified(|current| {
            previous = *current;
            *current = new_state;
            previous != new_state
        });
        match (previous, new_state) {
            (Connectivity::Offline, Connectivity::Online) => {
                log::info!("Connectivity: now online");
                Some(Transition::WentOnline)
            },
            (Connectivity::Online, Connectivity::Offline) => {
                log::warn!("Connectivity: now offline");
                Some(Transition::WentOffline)
            },
            _ => None,
        }
    }

    /// Get a receiver that is notified of every connectivity change
    pub fn subscribe(&self) -> ConnectivityReceiver {
        self.sender.subscribe()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        assert_eq!(monitor.is_online(), false);

        assert_eq!(monitor.set(Connectivity::Offline), None);
        assert_eq!(monitor.set(Connectivity::Online), Some(Transition::WentOnline));
        assert_eq!(monitor.set(Connectivity::Online), None);
        assert!(monitor.is_online());
        assert_eq!(monitor.set(Connectivity::Offline), Some(Transition::WentOffline));
        assert_eq!(monitor.current(), Connectivity::Offline);
    }

    #[tokio::test]
    async fn subscribers_are_notified() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let mut receiver = monitor.subscribe();

        monitor.set(Connectivity::Online);
        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow(), Connectivity::Online);
    }

    #[test]
    fn unchanged_state_is_not_notified() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let mut receiver = monitor.subscribe();

        monitor.set(Connectivity::Offline);
        assert_eq!(receiver.has_changed().unwrap(), false);

        monitor.set(Connectivity::Online);
        assert!(receiver.has_changed().unwrap());
        receiver.borrow_and_update();
        monitor.set(Connectivity::Online);
        assert_eq!(receiver.has_changed().unwrap(), false);
    }
}
