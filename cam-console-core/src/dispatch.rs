//! In-flight bookkeeping for everything the engine sends to the server.
//!
//! Settings groups serialize: at most one request per group may be in
//! flight, and edits arriving while one is out are answered by a single
//! queued follow-up dispatched when the response lands. Switches and resets
//! are one-at-a-time actions; duplicates are dropped, not queued.

use crate::controls::SettingsGroup;

#[derive(Debug, Default, Clone, Copy)]
struct GateSlot {
    in_flight: bool,
    queued: bool,
}

/// Tracks which requests are outstanding.
#[derive(Debug, Default)]
pub struct DispatchGate {
    groups: [GateSlot; 3],
    switch_pending: bool,
    reset_flip_pending: bool,
    reset_color_pending: bool,
}

fn slot_index(group: SettingsGroup) -> usize {
    match group {
        SettingsGroup::Detection => 0,
        SettingsGroup::Flip => 1,
        SettingsGroup::Color => 2,
    }
}

impl DispatchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a settings dispatch for `group` as started.
    pub fn begin(&mut self, group: SettingsGroup) {
        self.groups[slot_index(group)].in_flight = true;
    }

    /// Mark the in-flight dispatch for `group` as finished.
    pub fn finish(&mut self, group: SettingsGroup) {
        self.groups[slot_index(group)].in_flight = false;
    }

    pub fn is_in_flight(&self, group: SettingsGroup) -> bool {
        self.groups[slot_index(group)].in_flight
    }

    /// Remember that `group` changed while a dispatch was out. Repeated
    /// calls collapse into the single follow-up.
    pub fn set_queued(&mut self, group: SettingsGroup) {
        self.groups[slot_index(group)].queued = true;
    }

    /// Consume the queued-follow-up flag for `group`.
    pub fn take_queued(&mut self, group: SettingsGroup) -> bool {
        let slot = &mut self.groups[slot_index(group)];
        std::mem::take(&mut slot.queued)
    }

    /// Try to start a camera switch. Returns false if one is already out.
    pub fn begin_switch(&mut self) -> bool {
        if self.switch_pending {
            return false;
        }
        self.switch_pending = true;
        true
    }

    pub fn finish_switch(&mut self) {
        self.switch_pending = false;
    }

    /// Try to start a reset for `group` (flip or color). Returns false if
    /// that reset is already out.
    pub fn begin_reset(&mut self, group: SettingsGroup) -> bool {
        let flag = match group {
            SettingsGroup::Flip => &mut self.reset_flip_pending,
            SettingsGroup::Color => &mut self.reset_color_pending,
            SettingsGroup::Detection => return false,
        };
        if *flag {
            return false;
        }
        *flag = true;
        true
    }

    pub fn finish_reset(&mut self, group: SettingsGroup) {
        match group {
            SettingsGroup::Flip => self.reset_flip_pending = false,
            SettingsGroup::Color => self.reset_color_pending = false,
            SettingsGroup::Detection => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queued_flag_collapses_and_clears() {
        let mut gate = DispatchGate::new();
        gate.begin(SettingsGroup::Color);
        gate.set_queued(SettingsGroup::Color);
        gate.set_queued(SettingsGroup::Color);

        gate.finish(SettingsGroup::Color);
        assert!(gate.take_queued(SettingsGroup::Color));
        assert!(!gate.take_queued(SettingsGroup::Color));
    }

    #[test]
    fn test_groups_do_not_share_state() {
        let mut gate = DispatchGate::new();
        gate.begin(SettingsGroup::Detection);
        assert!(gate.is_in_flight(SettingsGroup::Detection));
        assert!(!gate.is_in_flight(SettingsGroup::Flip));

        gate.set_queued(SettingsGroup::Detection);
        assert!(!gate.take_queued(SettingsGroup::Flip));
    }

    #[test]
    fn test_switch_is_single_shot() {
        let mut gate = DispatchGate::new();
        assert!(gate.begin_switch());
        assert!(!gate.begin_switch());
        gate.finish_switch();
        assert!(gate.begin_switch());
    }

    #[test]
    fn test_detection_has_no_reset() {
        let mut gate = DispatchGate::new();
        assert!(gate.begin_reset(SettingsGroup::Flip));
        assert!(!gate.begin_reset(SettingsGroup::Flip));
        assert!(!gate.begin_reset(SettingsGroup::Detection));
    }
}
