use std::{collections::HashMap, sync::Arc};

use crate::{
    alarm::{Alarm, AlarmId, AlarmRequest},
    error::Result,
    scheduler::ScheduledHandle,
};

/// The live alarms, in creation order, and the scheduled job of each one.
///
/// Not synchronised itself; [`Reminders`](crate::reminders::Reminders) keeps
/// it behind one lock so the two collections only ever change together.
#[derive(Debug, Default)]
pub struct AlarmRegistry {
    alarms: Vec<Arc<Alarm>>,
    handles: HashMap<AlarmId, ScheduledHandle>,
    next_id: u64,
}

impl AlarmRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an alarm against the current contents and add it.
    ///
    /// # Errors
    /// if the request's trigger is malformed, in which case nothing is added
    /// and no id is used up
    pub fn create(&mut self, request: &AlarmRequest) -> Result<Arc<Alarm>> {
        let alarm = Arc::new(Alarm::create(
            AlarmId(self.next_id),
            request,
            self.alarms.iter().map(|alarm| &**alarm),
        )?);
        self.add(Arc::clone(&alarm));
        Ok(alarm)
    }

    pub fn add(&mut self, alarm: Arc<Alarm>) {
        self.next_id = self.next_id.max(alarm.id().0 + 1);
        self.alarms.push(alarm);
    }

    /// Removing an unknown id does nothing.
    pub fn remove(&mut self, id: AlarmId) -> Option<Arc<Alarm>> {
        let index = self.alarms.iter().position(|alarm| alarm.id() == id)?;
        Some(self.alarms.remove(index))
    }

    #[must_use]
    pub fn lookup(&self, id: AlarmId) -> Option<Arc<Alarm>> {
        self.alarms.iter().find(|alarm| alarm.id() == id).cloned()
    }

    #[must_use]
    pub fn all(&self) -> &[Arc<Alarm>] {
        &self.alarms
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn attach(&mut self, id: AlarmId, handle: ScheduledHandle) {
        self.handles.insert(id, handle);
    }

    pub fn detach(&mut self, id: AlarmId) -> Option<ScheduledHandle> {
        self.handles.remove(&id)
    }

    #[must_use]
    pub fn handle(&self, id: AlarmId) -> Option<ScheduledHandle> {
        self.handles.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(message: &str, time: &str) -> AlarmRequest {
        AlarmRequest {
            message: message.to_string(),
            date: "2031-05-05".to_string(),
            time: time.to_string(),
            ..AlarmRequest::default()
        }
    }

    #[test]
    fn ids_follow_creation_order() {
        let mut registry = AlarmRegistry::new();
        let a = registry.create(&request("a", "10:00")).unwrap();
        let b = registry.create(&request("b", "10:00")).unwrap();
        assert_eq!((a.id(), a.priority()), (AlarmId(0), 1));
        assert_eq!((b.id(), b.priority()), (AlarmId(1), 2));
    }

    #[test]
    fn removal_never_shifts_or_reuses_ids() {
        let mut registry = AlarmRegistry::new();
        let a = registry.create(&request("a", "10:00")).unwrap();
        let b = registry.create(&request("b", "11:00")).unwrap();
        registry.remove(a.id());
        assert_eq!(registry.lookup(b.id()).unwrap().id(), AlarmId(1));
        let c = registry.create(&request("c", "12:00")).unwrap();
        assert_eq!(c.id(), AlarmId(2));
    }

    #[test]
    fn removed_alarms_no_longer_collide() {
        let mut registry = AlarmRegistry::new();
        let a = registry.create(&request("a", "10:00")).unwrap();
        registry.remove(a.id());
        let b = registry.create(&request("b", "10:00")).unwrap();
        assert_eq!(b.priority(), 1);
    }

    #[test]
    fn removing_unknown_id_changes_nothing() {
        let mut registry = AlarmRegistry::new();
        registry.create(&request("a", "10:00")).unwrap();
        assert!(registry.remove(AlarmId(42)).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn malformed_request_uses_no_id() {
        let mut registry = AlarmRegistry::new();
        assert!(registry.create(&request("a", "25:99")).is_err());
        assert!(registry.is_empty());
        assert_eq!(registry.create(&request("b", "10:00")).unwrap().id(), AlarmId(0));
    }
}
