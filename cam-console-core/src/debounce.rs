//! Trailing-edge debounce windows, one per settings group.
//!
//! Every edit restarts its group's window; the group dispatches only when
//! the window expires with no further edits. Groups are independent, so a
//! quality drag never delays a color drag. The engine drives this from its
//! event loop by sleeping until [`DebounceQueue::next_deadline`] and then
//! calling [`DebounceQueue::take_due`].

use std::time::Duration;

use tokio::time::Instant;

use crate::controls::SettingsGroup;

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    deadline: Option<Instant>,
    first_edit: Option<Instant>,
}

/// Per-group pending dispatch deadlines.
#[derive(Debug, Default)]
pub struct DebounceQueue {
    slots: [Slot; 3],
}

fn slot_index(group: SettingsGroup) -> usize {
    match group {
        SettingsGroup::Detection => 0,
        SettingsGroup::Flip => 1,
        SettingsGroup::Color => 2,
    }
}

impl DebounceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the window for `group`. The deadline moves to
    /// `now + delay`; when a max-wait ceiling is configured the deadline is
    /// clamped so a stream of rapid edits cannot defer dispatch forever.
    pub fn schedule(
        &mut self,
        group: SettingsGroup,
        delay: Duration,
        now: Instant,
        max_wait: Option<Duration>,
    ) {
        let slot = &mut self.slots[slot_index(group)];
        let first = *slot.first_edit.get_or_insert(now);
        let mut deadline = now + delay;
        if let Some(ceiling) = max_wait {
            deadline = deadline.min(first + ceiling);
        }
        slot.deadline = Some(deadline);
    }

    /// Disarm the window for `group`, discarding any pending dispatch.
    pub fn cancel(&mut self, group: SettingsGroup) {
        self.slots[slot_index(group)] = Slot::default();
    }

    /// True if `group` has a pending window.
    pub fn is_armed(&self, group: SettingsGroup) -> bool {
        self.slots[slot_index(group)].deadline.is_some()
    }

    /// The earliest pending deadline across all groups, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().filter_map(|s| s.deadline).min()
    }

    /// Pop every group whose window has expired as of `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<SettingsGroup> {
        let mut due = Vec::new();
        for group in SettingsGroup::ALL {
            let slot = &mut self.slots[slot_index(group)];
            if slot.deadline.is_some_and(|d| d <= now) {
                *slot = Slot::default();
                due.push(group);
            }
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rearm_moves_deadline_back() {
        let mut queue = DebounceQueue::new();
        let window = Duration::from_millis(500);

        queue.schedule(SettingsGroup::Color, window, Instant::now(), None);
        tokio::time::advance(Duration::from_millis(300)).await;
        queue.schedule(SettingsGroup::Color, window, Instant::now(), None);

        // 400ms after the second edit the first window would have expired,
        // but the re-armed one has not.
        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(queue.take_due(Instant::now()).is_empty());

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(queue.take_due(Instant::now()), vec![SettingsGroup::Color]);
        assert!(!queue.is_armed(SettingsGroup::Color));
    }

    #[tokio::test(start_paused = true)]
    async fn test_groups_expire_independently() {
        let mut queue = DebounceQueue::new();
        queue.schedule(
            SettingsGroup::Color,
            Duration::from_millis(500),
            Instant::now(),
            None,
        );
        queue.schedule(
            SettingsGroup::Detection,
            Duration::from_millis(1000),
            Instant::now(),
            None,
        );

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(queue.take_due(Instant::now()), vec![SettingsGroup::Color]);
        assert!(queue.is_armed(SettingsGroup::Detection));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(
            queue.take_due(Instant::now()),
            vec![SettingsGroup::Detection]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_caps_rearming() {
        let mut queue = DebounceQueue::new();
        let window = Duration::from_millis(500);
        let ceiling = Some(Duration::from_millis(1200));

        // Re-arm every 400ms; without the ceiling the deadline would keep
        // sliding, with it the group fires 1200ms after the first edit.
        queue.schedule(SettingsGroup::Color, window, Instant::now(), ceiling);
        for _ in 0..3 {
            tokio::time::advance(Duration::from_millis(400)).await;
            queue.schedule(SettingsGroup::Color, window, Instant::now(), ceiling);
        }

        // 1200ms elapsed since the first edit, so the window is due even
        // though the last edit was only 0ms ago.
        assert_eq!(queue.take_due(Instant::now()), vec![SettingsGroup::Color]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_window() {
        let mut queue = DebounceQueue::new();
        queue.schedule(
            SettingsGroup::Flip,
            Duration::from_millis(500),
            Instant::now(),
            None,
        );
        queue.cancel(SettingsGroup::Flip);

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(queue.take_due(Instant::now()).is_empty());
        assert_eq!(queue.next_deadline(), None);
    }
}
