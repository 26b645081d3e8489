//! Change feed: views subscribe per (table, optional spot) and treat every
//! matching event as a plain "re-fetch now" trigger. No delta payloads, no
//! ordering across distinct events.

use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Spots,
    Members,
    Messages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: Table,
    pub op: Op,
    pub spot_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeFilter {
    pub table: Option<Table>,
    pub spot_id: Option<Uuid>,
}

impl ChangeFilter {
    pub fn table(table: Table) -> Self {
        Self { table: Some(table), spot_id: None }
    }

    pub fn spot(table: Table, spot_id: Uuid) -> Self {
        Self { table: Some(table), spot_id: Some(spot_id) }
    }

    fn matches(&self, event: &ChangeEvent) -> bool {
        if self.table.is_some_and(|t| t != event.table) {
            return false;
        }
        match self.spot_id {
            None => true,
            Some(want) => event.spot_id == Some(want),
        }
    }
}

#[derive(Clone)]
pub struct ChangeHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeHub {
    pub fn new(buffer: usize) -> Self {
        Self { tx: broadcast::channel(buffer).0 }
    }

    /// Nobody listening is fine; the event just goes nowhere.
    pub fn publish(&self, table: Table, op: Op, spot_id: Option<Uuid>) {
        let _ = self.tx.send(ChangeEvent { table, op, spot_id });
    }

    pub fn watch(&self, filter: ChangeFilter) -> ChangeFeed {
        ChangeFeed {
            rx: self.tx.subscribe(),
            filter,
            closed: false,
        }
    }
}

pub struct ChangeFeed {
    rx: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
    closed: bool,
}

impl ChangeFeed {
    /// Waits for the next matching change. `Some(())` means "something you
    /// care about changed, re-fetch"; `None` means the feed is done. A lagged
    /// receiver yields `Some(())` too: dropped events still demand a re-fetch.
    pub async fn changed(&mut self) -> Option<()> {
        loop {
            if self.closed {
                return None;
            }
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(()),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => return Some(()),
                Err(broadcast::error::RecvError::Closed) => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    /// Idempotent; safe to call after the hub is gone.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot_id() -> Uuid {
        Uuid::now_v7()
    }

    #[tokio::test]
    async fn matching_event_triggers() {
        let hub = ChangeHub::new(8);
        let mut feed = hub.watch(ChangeFilter::table(Table::Spots));

        hub.publish(Table::Spots, Op::Insert, None);
        assert_eq!(feed.changed().await, Some(()));
    }

    #[tokio::test]
    async fn non_matching_events_are_skipped() {
        let hub = ChangeHub::new(8);
        let target = spot_id();
        let mut feed = hub.watch(ChangeFilter::spot(Table::Messages, target));

        hub.publish(Table::Members, Op::Insert, Some(target));
        hub.publish(Table::Messages, Op::Insert, Some(spot_id()));
        hub.publish(Table::Messages, Op::Insert, Some(target));

        // only the last one matches, and it arrives first
        assert_eq!(feed.changed().await, Some(()));
    }

    #[tokio::test]
    async fn unfiltered_feed_sees_everything() {
        let hub = ChangeHub::new(8);
        let mut feed = hub.watch(ChangeFilter::default());

        hub.publish(Table::Messages, Op::Delete, Some(spot_id()));
        assert_eq!(feed.changed().await, Some(()));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_final() {
        let hub = ChangeHub::new(8);
        let mut feed = hub.watch(ChangeFilter::table(Table::Spots));

        feed.close();
        feed.close();
        hub.publish(Table::Spots, Op::Insert, None);
        assert_eq!(feed.changed().await, None);
    }

    #[tokio::test]
    async fn dropped_hub_ends_the_feed() {
        let hub = ChangeHub::new(8);
        let mut feed = hub.watch(ChangeFilter::table(Table::Spots));

        drop(hub);
        assert_eq!(feed.changed().await, None);
        // and closing afterwards must not panic
        feed.close();
    }

    #[tokio::test]
    async fn lagged_receiver_still_triggers() {
        let hub = ChangeHub::new(1);
        let mut feed = hub.watch(ChangeFilter::table(Table::Spots));

        hub.publish(Table::Spots, Op::Insert, None);
        hub.publish(Table::Spots, Op::Update, None);
        hub.publish(Table::Spots, Op::Delete, None);

        assert_eq!(feed.changed().await, Some(()));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let hub = ChangeHub::new(8);
        hub.publish(Table::Spots, Op::Insert, None);
    }
}
