//! The admin occupancy calendar: per room and month, the number of owner blocks and reservations
//! on each day, and the diff-based toggling of single-day owner blocks.

use crate::booking::{BookingEngine, EngineError};
use crate::data_store::models::{
    DateRange, NewRoomRestriction, RestrictionType, Room, RoomRestriction,
};
use crate::data_store::{RoomId, StoreError};
use chrono::{Datelike, Days, Months, NaiveDate};
use leafsite_api_types::{BlockChanges, CalendarDay, RoomCalendar};
use log::warn;
use std::collections::{BTreeMap, BTreeSet};

/// A calendar month, e.g. 2025-06
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarMonth {
    year: i32,
    month: u32,
    first_day: NaiveDate,
}

impl CalendarMonth {
    /// Returns `None` for month numbers outside 1..=12 or years out of range
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first_day| Self {
            year,
            month,
            first_day,
        })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            first_day: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// The days of the month as half-open range `[first day, first day of next month)`
    pub fn date_range(&self) -> DateRange {
        self.first_day
            .checked_add_months(Months::new(1))
            .and_then(|end| DateRange::new(self.first_day, end))
            .unwrap_or(DateRange::single_day(self.first_day))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The month before, or `None` at the lower end of the supported date range
    pub fn previous(&self) -> Option<Self> {
        self.first_day
            .checked_sub_days(Days::new(1))
            .map(Self::containing)
    }

    /// The month after, or `None` at the upper end of the supported date range
    pub fn next(&self) -> Option<Self> {
        self.first_day
            .checked_add_months(Months::new(1))
            .map(Self::containing)
    }
}

/// Day → count maps of one room's restrictions within one month. Every day of the month has an
/// entry.
///
/// These are derived from the room's restrictions and only cached in the admin's session for
/// diffing the next calendar submission against.
#[derive(Clone, Debug, PartialEq)]
pub struct CalendarMaps {
    pub month: CalendarMonth,
    pub block_map: BTreeMap<NaiveDate, u32>,
    pub reservation_map: BTreeMap<NaiveDate, u32>,
}

impl CalendarMaps {
    pub fn is_blocked(&self, date: NaiveDate) -> bool {
        self.block_map.get(&date).copied().unwrap_or(0) > 0
    }

    pub fn is_reserved(&self, date: NaiveDate) -> bool {
        self.reservation_map.get(&date).copied().unwrap_or(0) > 0
    }
}

pub fn build_calendar_maps(month: CalendarMonth, restrictions: &[RoomRestriction]) -> CalendarMaps {
    let month_range = month.date_range();
    let mut block_map: BTreeMap<NaiveDate, u32> = month_range.days().map(|d| (d, 0)).collect();
    let mut reservation_map = block_map.clone();

    for restriction in restrictions {
        let Some(dates) = DateRange::new(restriction.start_date, restriction.end_date) else {
            continue;
        };
        let map = match restriction.restriction_type {
            RestrictionType::OwnerBlock => &mut block_map,
            RestrictionType::Reservation => &mut reservation_map,
        };
        for day in dates
            .days()
            .skip_while(|d| *d < month_range.start())
            .take_while(|d| *d < month_range.end())
        {
            *map.entry(day).or_insert(0) += 1;
        }
    }

    CalendarMaps {
        month,
        block_map,
        reservation_map,
    }
}

/// Convert the calendar maps of a room into the JSON representation for the admin calendar
pub fn room_calendar_view(
    room: Room,
    maps: &CalendarMaps,
    restrictions: &[RoomRestriction],
) -> RoomCalendar {
    let days = maps
        .month
        .date_range()
        .days()
        .map(|date| CalendarDay {
            date,
            blocks: maps.block_map.get(&date).copied().unwrap_or(0),
            reservations: maps.reservation_map.get(&date).copied().unwrap_or(0),
            reservation_ids: restrictions
                .iter()
                .filter(|r| r.overlaps(&DateRange::single_day(date)))
                .filter_map(|r| r.reservation_id)
                .collect(),
        })
        .collect();
    RoomCalendar {
        room: room.into(),
        days,
    }
}

/// Extract the checked owner-block checkboxes from the submitted admin calendar form.
///
/// Checkboxes are named `block_<room id>_<yyyy-mm-dd>`. All other fields and malformed names are
/// ignored.
pub fn parse_block_checkboxes<'f>(
    fields: impl IntoIterator<Item = (&'f str, &'f str)>,
) -> BTreeMap<RoomId, BTreeSet<NaiveDate>> {
    let mut result: BTreeMap<RoomId, BTreeSet<NaiveDate>> = BTreeMap::new();
    for (name, _value) in fields {
        let Some(rest) = name.strip_prefix("block_") else {
            continue;
        };
        let Some((room_id, date)) = rest.split_once('_') else {
            continue;
        };
        match (
            room_id.parse::<RoomId>(),
            NaiveDate::parse_from_str(date, crate::booking::validation::DATE_FORMAT),
        ) {
            (Ok(room_id), Ok(date)) => {
                result.entry(room_id).or_default().insert(date);
            }
            _ => warn!("Ignoring malformed calendar field {}", name),
        }
    }
    result
}

impl<'a> BookingEngine<'a> {
    /// Read the restrictions of the room intersecting the month and build the calendar maps.
    pub fn room_calendar(
        &mut self,
        room_id: RoomId,
        month: CalendarMonth,
    ) -> Result<(CalendarMaps, Vec<RoomRestriction>), EngineError> {
        let restrictions = self.restrictions_for_room(room_id, &month.date_range())?;
        Ok((build_calendar_maps(month, &restrictions), restrictions))
    }

    /// Apply the owner blocks checked in the admin calendar, by diffing them against the calendar
    /// maps the admin has been shown.
    ///
    /// Days which are checked now, but were not blocked before, get a new single-day owner block,
    /// unless they are occupied by a reservation. Days which were blocked before and are no longer
    /// checked have their single-day owner block removed. Restrictions of reservations and
    /// multi-day blocks are never removed; such days are reported as skipped.
    ///
    /// Every change is recorded in `changes` as soon as it has been written, so on an error
    /// `changes` holds the changes applied before the failure.
    pub fn reconcile_owner_blocks(
        &mut self,
        cached: &CalendarMaps,
        checked: &BTreeSet<NaiveDate>,
        changes: &mut BlockChanges,
    ) -> Result<(), EngineError> {
        let room_id = changes.room_id;
        for date in checked.iter().filter(|d| !cached.month.contains(**d)) {
            warn!(
                "Ignoring owner block for room {} on {} outside of {}-{:02}",
                room_id,
                date,
                cached.month.year(),
                cached.month.month()
            );
        }

        for date in cached.month.date_range().days() {
            let was_blocked = cached.is_blocked(date);
            let is_checked = checked.contains(&date);
            if is_checked && !was_blocked {
                if cached.is_reserved(date) {
                    warn!(
                        "Not blocking room {} on {}, since it is reserved",
                        room_id, date
                    );
                    changes.skipped.push(date);
                    continue;
                }
                self.create_room_restriction(NewRoomRestriction::owner_block(room_id, date))?;
                changes.added.push(date);
            } else if !is_checked && was_blocked {
                match self.remove_room_restriction_by_date(room_id, date) {
                    Ok(()) => changes.removed.push(date),
                    Err(EngineError::InsertError(StoreError::NotExisting)) => {
                        warn!(
                            "Room {} has no single-day owner block on {} to remove",
                            room_id, date
                        );
                        changes.skipped.push(date);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }
}
