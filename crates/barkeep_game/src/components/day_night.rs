//! Round timer and day/night reactions.
//!
//! [`HasDayNightTimer`] lives on the singleton entity and is the only
//! producer of the transition flag: [`HasDayNightTimer::open_bar`] and
//! [`HasDayNightTimer::close_bar`] set it when a phase boundary is crossed.
//! Exactly one system clears it, after every transition system ran.

use barkeep_ecs::{Entity, EntityId};
use serde::{Deserialize, Serialize};

use crate::components::basic::{IsBank, IsSolid};

/// Phase timer, day counter and rent schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasDayNightTimer {
    /// Set when a phase boundary is crossed; cleared once per tick by the
    /// reset system.
    pub needs_to_process_change: bool,
    day_count: i32,
    days_until_rent_due: i32,
    rent_period: i32,
    amount_due: i32,
    day_length: f32,
    night_length: f32,
    current_length: f32,
    is_day: bool,
}

impl Default for HasDayNightTimer {
    fn default() -> Self {
        Self::new(10.0, 10.0)
    }
}

impl HasDayNightTimer {
    /// Creates a timer at the start of day zero.
    #[must_use]
    pub fn new(day_length: f32, night_length: f32) -> Self {
        Self {
            needs_to_process_change: false,
            day_count: 0,
            days_until_rent_due: 5,
            rent_period: 5,
            amount_due: 75,
            day_length,
            night_length,
            current_length: day_length,
            is_day: true,
        }
    }

    /// Sets the rent schedule.
    #[must_use]
    pub fn with_rent(mut self, every_days: i32, amount: i32) -> Self {
        self.rent_period = every_days;
        self.days_until_rent_due = every_days;
        self.amount_due = amount;
        self
    }

    /// Days the bar has opened.
    #[must_use]
    pub fn days_passed(&self) -> i32 {
        self.day_count
    }

    /// Returns `true` at night.
    #[must_use]
    pub fn is_bar_open(&self) -> bool {
        !self.is_day
    }

    /// Returns `true` during the day.
    #[must_use]
    pub fn is_bar_closed(&self) -> bool {
        self.is_day
    }

    /// Returns `true` once the current phase ran out.
    #[must_use]
    pub fn is_round_over(&self) -> bool {
        self.current_length <= 0.0
    }

    /// Counts the current phase down.
    pub fn pass_time(&mut self, dt: f32) {
        if self.current_length >= 0.0 {
            self.current_length -= dt;
        }
    }

    /// Seconds left in the current phase.
    #[must_use]
    pub fn current_length(&self) -> f32 {
        self.current_length
    }

    /// Full length of the current phase.
    #[must_use]
    pub fn total_length(&self) -> f32 {
        if self.is_bar_open() {
            self.night_length
        } else {
            self.day_length
        }
    }

    /// Fraction of the current phase remaining.
    #[must_use]
    pub fn pct(&self) -> f32 {
        let total = self.total_length();
        if total <= 0.0 {
            0.0
        } else {
            self.current_length / total
        }
    }

    /// Day ends, night begins.
    pub fn open_bar(&mut self) {
        self.is_day = false;
        self.day_count += 1;
        self.current_length += self.night_length;
        self.needs_to_process_change = true;
        self.days_until_rent_due -= 1;
    }

    /// Night ends, day begins.
    pub fn close_bar(&mut self) {
        self.is_day = true;
        self.current_length += self.day_length;
        self.needs_to_process_change = true;
    }

    /// Days until rent is charged.
    #[must_use]
    pub fn days_until(&self) -> i32 {
        self.days_until_rent_due
    }

    /// Next rent payment.
    #[must_use]
    pub fn rent_due(&self) -> i32 {
        self.amount_due
    }

    /// Restarts the rent countdown.
    pub fn reset_rent_days(&mut self) {
        self.days_until_rent_due = self.rent_period;
    }

    /// Changes the next rent payment.
    pub fn update_amount_due(&mut self, amount: i32) {
        self.amount_due = amount;
    }

    /// Charges rent to `bank` if it is due. Returns the amount charged.
    pub fn collect_rent(&mut self, bank: &mut IsBank, increase: i32) -> Option<i32> {
        if self.days_until_rent_due > 0 {
            return None;
        }
        let amount = self.amount_due;
        bank.withdraw(amount);
        self.amount_due += increase;
        self.reset_rent_days();
        Some(amount)
    }
}

/// A reaction applied to an entity when the phase changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayNightHook {
    /// Make the entity walkable.
    OpenDoor,
    /// Make the entity solid.
    CloseDoor,
    /// Clear the bank's store cart.
    ResetCart,
    /// Remove the entity.
    Cleanup,
}

impl DayNightHook {
    /// Applies the hook to `entity`.
    pub fn apply(self, entity: &mut Entity) {
        match self {
            DayNightHook::OpenDoor => {
                entity.remove::<IsSolid>();
            }
            DayNightHook::CloseDoor => {
                entity.add_if_missing(IsSolid);
            }
            DayNightHook::ResetCart => {
                if let Some(bank) = entity.try_get_mut::<IsBank>() {
                    bank.update_cart(0);
                }
            }
            DayNightHook::Cleanup => entity.cleanup = true,
        }
    }
}

/// Hooks run on the parent entity at each phase boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RespondsToDayNight {
    /// The owning entity. Re-derived after a snapshot restore.
    pub parent: EntityId,
    /// Runs when day starts.
    pub on_day_started: Option<DayNightHook>,
    /// Runs when day ends.
    pub on_day_ended: Option<DayNightHook>,
    /// Runs when night starts.
    pub on_night_started: Option<DayNightHook>,
    /// Runs when night ends.
    pub on_night_ended: Option<DayNightHook>,
}

impl RespondsToDayNight {
    /// Creates an empty set of hooks for `parent`.
    #[must_use]
    pub fn new(parent: EntityId) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }

    /// Hooks to run when the bar opens, in order.
    #[must_use]
    pub fn night_start_hooks(&self) -> Vec<DayNightHook> {
        [self.on_day_ended, self.on_night_started]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Hooks to run when the bar closes, in order.
    #[must_use]
    pub fn day_start_hooks(&self) -> Vec<DayNightHook> {
        [self.on_night_ended, self.on_day_started]
            .into_iter()
            .flatten()
            .collect()
    }
}

component!(HasDayNightTimer, RespondsToDayNight);
