use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use canprims_frame::{Frame, Header};

use crate::listener::{Callback, Listener, ListenerRegistry};

/// Handle for a frame subscription.
pub type FrameListener = Listener<Frame>;

/// Routes received frames to catch-all and per-header listeners.
///
/// Per-header groups are keyed by [`Header::key`], so all error frames share
/// one group regardless of their identifier. A group is created on first
/// subscription and dropped by the first dispatch or subscription that finds
/// it empty.
#[derive(Debug, Default)]
pub struct FrameDispatcher {
    all: ListenerRegistry<Frame>,
    groups: RwLock<HashMap<u32, ListenerRegistry<Frame>>>,
}

impl FrameDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to every frame.
    pub fn subscribe<F>(&self, callback: F) -> FrameListener
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        self.all.subscribe(callback)
    }

    pub fn subscribe_optional(&self, callback: Option<Callback<Frame>>) -> FrameListener {
        self.all.subscribe_optional(callback)
    }

    /// Listen to frames whose header key equals `header.key()`.
    pub fn subscribe_header<F>(&self, header: Header, callback: F) -> FrameListener
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        self.subscribe_header_optional(header, Some(Box::new(callback)))
    }

    pub fn subscribe_header_optional(
        &self,
        header: Header,
        callback: Option<Callback<Frame>>,
    ) -> FrameListener {
        let key = header.key();
        // Hold the write lock so a concurrent dispatch cannot prune the group
        // between lookup and subscription.
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        // Groups whose listeners were all released may never see their key
        // again; drop them here rather than waiting for a dispatch.
        let before = groups.len();
        groups.retain(|_, group| !group.is_empty());
        if groups.len() < before {
            tracing::debug!(removed = before - groups.len(), "empty frame groups removed");
        }
        let group = groups.entry(key).or_insert_with(|| {
            tracing::debug!(key = format_args!("{key:#x}"), "frame group created");
            ListenerRegistry::new()
        });
        group.subscribe_optional(callback)
    }

    /// Deliver `frame` to the catch-all listeners, then to the group for its
    /// header key. Returns the number of callbacks invoked.
    pub fn dispatch(&self, frame: &Frame) -> usize {
        let key = frame.header.key();
        let mut delivered = self.all.broadcast(frame);

        let group = self
            .groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();

        if let Some(group) = group {
            delivered += group.broadcast(frame);
            if group.is_empty() {
                self.prune(key);
            }
        }

        tracing::trace!(key = format_args!("{key:#x}"), delivered, "frame dispatched");
        delivered
    }

    /// Number of per-header groups currently held.
    pub fn group_count(&self) -> usize {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn prune(&self, key: u32) {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        // Re-check under the write lock; a subscriber may have arrived.
        if groups.get(&key).is_some_and(ListenerRegistry::is_empty) {
            groups.remove(&key);
            tracing::debug!(key = format_args!("{key:#x}"), "frame group removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    use canprims_frame::{text_to_frame, ERROR_MASK};
    use proptest::prelude::*;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Frame) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&hits);
        (hits, move |_: &Frame| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn frame(id: u32) -> Frame {
        Frame::new(Header::standard(id, false))
    }

    #[test]
    fn catch_all_and_keyed_fan_out() {
        let dispatcher = FrameDispatcher::new();
        let (all, fa) = counter();
        let (only_42, f42) = counter();
        let _la = dispatcher.subscribe(fa);
        let _l42 = dispatcher.subscribe_header(Header::standard(0x42, false), f42);

        assert_eq!(dispatcher.dispatch(&frame(0x42)), 2);
        assert_eq!(dispatcher.dispatch(&frame(0x43)), 1);

        assert_eq!(all.load(Ordering::SeqCst), 2);
        assert_eq!(only_42.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_in_both_groups_is_called_twice() {
        let dispatcher = FrameDispatcher::new();
        let (hits, f) = counter();
        let f = Arc::new(f);
        let g = Arc::clone(&f);
        let _la = dispatcher.subscribe(move |frame| f(frame));
        let _lk = dispatcher.subscribe_header(Header::standard(0x10, false), move |frame| g(frame));

        dispatcher.dispatch(&frame(0x10));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn keyed_group_respects_flags() {
        let dispatcher = FrameDispatcher::new();
        let (hits, f) = counter();
        let _l = dispatcher.subscribe_header(Header::standard(0x42, false), f);

        dispatcher.dispatch(&Frame::new(Header::standard(0x42, true)));
        dispatcher.dispatch(&Frame::new(Header::extended(0x42, false)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        dispatcher.dispatch(&frame(0x42));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_frames_share_one_group() {
        let dispatcher = FrameDispatcher::new();
        let (hits, f) = counter();
        let _l = dispatcher.subscribe_header(Header::error(0), f);

        dispatcher.dispatch(&Frame::new(Header::error(0x4)));
        dispatcher.dispatch(&Frame::new(Header::error(0x80)));
        dispatcher.dispatch(&text_to_frame(&format!("{:08x}#", ERROR_MASK | 0x20)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn released_listener_stops_receiving_and_group_is_pruned() {
        let dispatcher = FrameDispatcher::new();
        let (hits, f) = counter();
        let listener = dispatcher.subscribe_header(Header::standard(0x42, false), f);
        assert_eq!(dispatcher.group_count(), 1);

        dispatcher.dispatch(&frame(0x42));
        drop(listener);
        assert_eq!(dispatcher.dispatch(&frame(0x42)), 0);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.group_count(), 0);
    }

    #[test]
    fn released_groups_are_pruned_without_dispatch() {
        let dispatcher = FrameDispatcher::new();
        for id in 0..1000 {
            let listener = dispatcher.subscribe_header(Header::standard(id, false), |_| {});
            drop(listener);
        }
        // Each subscription clears the groups released before it.
        assert_eq!(dispatcher.group_count(), 1);

        let _kept = dispatcher.subscribe_header(Header::standard(0x7ff, false), |_| {});
        assert_eq!(dispatcher.group_count(), 1);
    }

    #[test]
    fn empty_callback_is_never_invoked() {
        let dispatcher = FrameDispatcher::new();
        let _all = dispatcher.subscribe_optional(None);
        let _keyed = dispatcher.subscribe_header_optional(Header::standard(1, false), None);

        assert_eq!(dispatcher.dispatch(&frame(1)), 0);
        assert_eq!(dispatcher.group_count(), 1);
    }

    #[test]
    fn filtered_subscription() {
        use canprims_filter::{filtered, FilterList};

        let dispatcher = FrameDispatcher::new();
        let (hits, f) = counter();
        let _l = dispatcher.subscribe(filtered(FilterList::parse("100-1ff"), f));

        for id in [0x0ff, 0x100, 0x1ff, 0x200] {
            dispatcher.dispatch(&frame(id));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn callback_may_subscribe_to_its_own_group() {
        let dispatcher = Arc::new(FrameDispatcher::new());
        let held = Arc::new(Mutex::new(Vec::new()));
        let header = Header::standard(0x7, false);

        let _outer = {
            let dispatcher = Arc::clone(&dispatcher);
            let held = Arc::clone(&held);
            dispatcher.clone().subscribe_header(header, move |_| {
                let inner = dispatcher.subscribe_header(header, |_| {});
                held.lock().unwrap().push(inner);
            })
        };

        assert_eq!(dispatcher.dispatch(&frame(0x7)), 1);
        assert_eq!(dispatcher.dispatch(&frame(0x7)), 2);
        assert_eq!(held.lock().unwrap().len(), 2);
    }

    #[test]
    fn concurrent_dispatch_and_subscription() {
        let dispatcher = Arc::new(FrameDispatcher::new());
        let (stable, f) = counter();
        let _stable = dispatcher.subscribe_header(Header::standard(0x1, false), f);

        let producers: Vec<_> = (0..2)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || {
                    for i in 0..1000u32 {
                        dispatcher.dispatch(&frame(i % 4));
                    }
                })
            })
            .collect();

        let churners: Vec<_> = (0..4u32)
            .map(|n| {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || {
                    for _ in 0..300 {
                        let listener =
                            dispatcher.subscribe_header(Header::standard(n, false), |_| {});
                        drop(listener);
                    }
                })
            })
            .collect();

        for handle in producers.into_iter().chain(churners) {
            handle.join().unwrap();
        }

        assert_eq!(stable.load(Ordering::SeqCst), 500);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Subscribe(u32),
        Release(usize),
        Dispatch(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..4).prop_map(Op::Subscribe),
            any::<usize>().prop_map(Op::Release),
            (0u32..4).prop_map(Op::Dispatch),
        ]
    }

    proptest! {
        #[test]
        fn delivery_matches_live_subscriptions(ops in prop::collection::vec(op(), 1..64)) {
            let dispatcher = FrameDispatcher::new();
            let mut live: Vec<(u32, Arc<AtomicUsize>, FrameListener)> = Vec::new();
            let mut expected: Vec<(Arc<AtomicUsize>, usize)> = Vec::new();

            for op in ops {
                match op {
                    Op::Subscribe(id) => {
                        let (hits, f) = counter();
                        let listener = dispatcher.subscribe_header(Header::standard(id, false), f);
                        expected.push((Arc::clone(&hits), 0));
                        live.push((id, hits, listener));
                    }
                    Op::Release(index) => {
                        if !live.is_empty() {
                            live.remove(index % live.len());
                        }
                    }
                    Op::Dispatch(id) => {
                        let want = live.iter().filter(|(key, _, _)| *key == id).count();
                        prop_assert_eq!(dispatcher.dispatch(&frame(id)), want);
                        for (key, hits, _) in &live {
                            if *key == id {
                                let slot = expected
                                    .iter_mut()
                                    .find(|(counted, _)| Arc::ptr_eq(counted, hits));
                                if let Some((_, count)) = slot {
                                    *count += 1;
                                }
                            }
                        }
                    }
                }
            }

            for (hits, count) in expected {
                prop_assert_eq!(hits.load(Ordering::SeqCst), count);
            }
        }
    }
}
