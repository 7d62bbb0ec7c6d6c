// src/queues.rs
//
// Latency queues. Order operations and fill notifications sit in plain
// insertion-ordered vectors until the snapshot clock passes their
// earliest-effective timestamp. The queues are small in practice and
// scanned linearly each tick.
//
// Per-tick processing order is fixed: cancels, then replaces, then new
// orders, then notifications.

use crate::types::{Fill, NewOrder, OrderId, Quantity, Ticks, TimeStamp};

/// A new order in flight to the simulated venue.
#[derive(Debug, Clone, Copy)]
pub struct PendingOrder {
    pub order: NewOrder,
    pub send_ts: TimeStamp,
    pub earliest_exec: TimeStamp,
}

/// A cancel in flight. Targets an order that may have filled by the
/// time the cancel matures, in which case it is silently dropped.
#[derive(Debug, Clone, Copy)]
pub struct PendingCancel {
    pub target: OrderId,
    pub send_ts: TimeStamp,
    pub earliest_exec: TimeStamp,
}

/// A replace in flight: new quantity and price for a resting order.
#[derive(Debug, Clone, Copy)]
pub struct PendingReplace {
    pub target: OrderId,
    pub quantity: Quantity,
    pub price: Ticks,
    pub send_ts: TimeStamp,
    pub earliest_exec: TimeStamp,
}

/// A fill waiting for its receive-latency delay before the strategy
/// hears about it.
#[derive(Debug, Clone, Copy)]
pub struct PendingNotification {
    pub fill: Fill,
    pub earliest_notify: TimeStamp,
    pub delivered: bool,
}

#[derive(Debug, Default)]
pub struct OrderQueues {
    pub orders: Vec<PendingOrder>,
    pub cancels: Vec<PendingCancel>,
    pub replaces: Vec<PendingReplace>,
    pub notifications: Vec<PendingNotification>,
}

impl OrderQueues {
    pub fn new() -> Self {
        OrderQueues::default()
    }

    pub fn contains_order(&self, id: OrderId) -> bool {
        self.orders.iter().any(|p| p.order.id == id)
    }

    pub fn push_order(&mut self, pending: PendingOrder) {
        self.orders.push(pending);
    }

    pub fn push_cancel(&mut self, cancel: PendingCancel) {
        self.cancels.push(cancel);
    }

    pub fn push_replace(&mut self, replace: PendingReplace) {
        self.replaces.push(replace);
    }

    pub fn push_notification(&mut self, fill: Fill, earliest_notify: TimeStamp) {
        self.notifications.push(PendingNotification {
            fill,
            earliest_notify,
            delivered: false,
        });
    }

    /// Remove the target of every matured cancel. A cancel whose target
    /// already filled (or was itself cancelled) is discarded.
    pub fn apply_matured_cancels(&mut self, now: TimeStamp) {
        let mut i = 0;
        while i < self.cancels.len() {
            if now >= self.cancels[i].earliest_exec {
                let target = self.cancels[i].target;
                if let Some(pos) = self.orders.iter().position(|p| p.order.id == target) {
                    self.orders.remove(pos);
                }
                self.cancels.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Apply every matured replace to its target's quantity and price.
    /// Replaces without a live target are discarded.
    pub fn apply_matured_replaces(&mut self, now: TimeStamp) {
        let mut i = 0;
        while i < self.replaces.len() {
            if now >= self.replaces[i].earliest_exec {
                let replace = self.replaces[i];
                if let Some(pending) = self
                    .orders
                    .iter_mut()
                    .find(|p| p.order.id == replace.target)
                {
                    pending.order.quantity = replace.quantity;
                    pending.order.limit_price = replace.price;
                }
                self.replaces.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Mark matured notifications delivered and hand back their fills in
    /// insertion order, compacting the queue.
    pub fn take_due_notifications(&mut self, now: TimeStamp) -> Vec<Fill> {
        let mut due = Vec::new();
        for n in self.notifications.iter_mut() {
            if !n.delivered && now >= n.earliest_notify {
                n.delivered = true;
                due.push(n.fill);
            }
        }
        self.notifications.retain(|n| !n.delivered);
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderKind, Side, SymbolIdx, TimeInForce};

    fn pending(id: u64, exec_at: u64) -> PendingOrder {
        PendingOrder {
            order: NewOrder {
                id: OrderId(id),
                symbol: SymbolIdx(0),
                side: Side::Buy,
                kind: OrderKind::Limit,
                quantity: Quantity(10),
                tif: TimeInForce::Day,
                limit_price: Ticks(100),
            },
            send_ts: TimeStamp(0),
            earliest_exec: TimeStamp(exec_at),
        }
    }

    fn cancel(target: u64, exec_at: u64) -> PendingCancel {
        PendingCancel {
            target: OrderId(target),
            send_ts: TimeStamp(0),
            earliest_exec: TimeStamp(exec_at),
        }
    }

    #[test]
    fn cancel_waits_for_its_latency() {
        let mut q = OrderQueues::new();
        q.push_order(pending(1, 5));
        q.push_cancel(cancel(1, 10));

        q.apply_matured_cancels(TimeStamp(9));
        assert!(q.contains_order(OrderId(1)));
        assert_eq!(q.cancels.len(), 1);

        q.apply_matured_cancels(TimeStamp(10));
        assert!(!q.contains_order(OrderId(1)));
        assert!(q.cancels.is_empty());
    }

    #[test]
    fn cancel_for_a_gone_order_is_discarded() {
        let mut q = OrderQueues::new();
        q.push_cancel(cancel(42, 5));
        q.apply_matured_cancels(TimeStamp(5));
        assert!(q.cancels.is_empty());
        assert!(q.orders.is_empty());
    }

    #[test]
    fn replace_mutates_quantity_and_price_in_place() {
        let mut q = OrderQueues::new();
        q.push_order(pending(1, 5));
        q.push_replace(PendingReplace {
            target: OrderId(1),
            quantity: Quantity(3),
            price: Ticks(250),
            send_ts: TimeStamp(0),
            earliest_exec: TimeStamp(7),
        });

        q.apply_matured_replaces(TimeStamp(6));
        assert_eq!(q.orders[0].order.quantity, Quantity(10));

        q.apply_matured_replaces(TimeStamp(7));
        assert_eq!(q.orders[0].order.quantity, Quantity(3));
        assert_eq!(q.orders[0].order.limit_price, Ticks(250));
        assert!(q.replaces.is_empty());
    }

    #[test]
    fn replace_without_a_target_is_discarded() {
        let mut q = OrderQueues::new();
        q.push_replace(PendingReplace {
            target: OrderId(9),
            quantity: Quantity(3),
            price: Ticks(250),
            send_ts: TimeStamp(0),
            earliest_exec: TimeStamp(1),
        });
        q.apply_matured_replaces(TimeStamp(2));
        assert!(q.replaces.is_empty());
    }

    #[test]
    fn notifications_deliver_once_in_insertion_order() {
        let mut q = OrderQueues::new();
        let fill = |id: u64| Fill {
            order_id: OrderId(id),
            symbol: SymbolIdx(0),
            side: Side::Buy,
            kind: OrderKind::Market,
            tif: TimeInForce::Day,
            quantity: Quantity(1),
            price: Ticks(100),
            limit_price: Ticks::ZERO,
            timestamp: TimeStamp(0),
        };
        q.push_notification(fill(1), TimeStamp(10));
        q.push_notification(fill(2), TimeStamp(5));
        q.push_notification(fill(3), TimeStamp(20));

        let due = q.take_due_notifications(TimeStamp(10));
        let ids: Vec<u64> = due.iter().map(|f| f.order_id.0).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(q.notifications.len(), 1);

        // Nothing is delivered twice.
        assert!(q.take_due_notifications(TimeStamp(10)).is_empty());
    }
}
