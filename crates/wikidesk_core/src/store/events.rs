//! Change notification types and the subscriber registry.

use super::Wiki;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Handle returned by `Wiki::subscribe`.
pub type SubscriptionId = u64;

/// Entity family touched by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Page,
    Folder,
    Media,
    Ctf,
    Category,
    Backup,
    Settings,
    /// Whole-store replacement.
    Store,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Folder => "folder",
            Self::Media => "media",
            Self::Ctf => "ctf",
            Self::Category => "category",
            Self::Backup => "backup",
            Self::Settings => "settings",
            Self::Store => "store",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    Restored,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Restored => "restored",
        }
    }
}

/// One successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub entity: EntityKind,
    pub action: ChangeAction,
    /// Affected record; `None` for settings and whole-store events.
    pub id: Option<Uuid>,
}

impl Display for ChangeEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.entity.as_str(), self.action.as_str())?;
        if let Some(id) = self.id {
            write!(f, " {id}")?;
        }
        Ok(())
    }
}

/// Receives the store after the change so views can re-read collections.
type Callback = Box<dyn FnMut(&Wiki, &ChangeEvent)>;

/// Ordered subscriber list. Callbacks run in subscription order.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: SubscriptionId,
    entries: Vec<(SubscriptionId, Callback)>,
}

impl Subscribers {
    pub(crate) fn add(&mut self, callback: Callback) -> SubscriptionId {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push((id, callback));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn notify(&mut self, wiki: &Wiki, event: &ChangeEvent) {
        for (_, callback) in &mut self.entries {
            callback(wiki, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeAction, ChangeEvent, EntityKind, Subscribers};
    use crate::store::Wiki;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn event() -> ChangeEvent {
        ChangeEvent {
            entity: EntityKind::Settings,
            action: ChangeAction::Updated,
            id: None,
        }
    }

    #[test]
    fn notify_runs_callbacks_in_subscription_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut subscribers = Subscribers::default();
        for name in ["first", "second"] {
            let calls = Rc::clone(&calls);
            subscribers.add(Box::new(move |_, _| calls.borrow_mut().push(name)));
        }

        let wiki = Wiki::open_in_memory().expect("open store");
        subscribers.notify(&wiki, &event());
        assert_eq!(*calls.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn removed_subscriber_is_not_called_and_ids_are_not_reused() {
        let calls = Rc::new(RefCell::new(0));
        let mut subscribers = Subscribers::default();
        let counter = Rc::clone(&calls);
        let id = subscribers.add(Box::new(move |_, _| *counter.borrow_mut() += 1));

        assert!(subscribers.remove(id));
        assert!(!subscribers.remove(id));
        let wiki = Wiki::open_in_memory().expect("open store");
        subscribers.notify(&wiki, &event());
        assert_eq!(*calls.borrow(), 0);

        let next = subscribers.add(Box::new(|_, _| {}));
        assert_ne!(next, id);
    }
}
