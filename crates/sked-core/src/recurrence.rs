use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::BTreeSet;

use crate::error::CoreError;
use crate::models::{
    Frequency, OccurrenceSlot, RecurrenceException, RecurrenceRule, RepeatSpec, Schedule,
};

/// Closed interval `[start, end]` of instants a caller asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl QueryWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[inline]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Whether `[start, end]` shares at least one instant with the window.
    #[inline]
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start <= self.end && end >= self.start
    }
}

/// Occurrence starts suppressed from expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionSet {
    instants: BTreeSet<DateTime<Utc>>,
}

impl ExceptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_exceptions(exceptions: &[RecurrenceException]) -> Self {
        exceptions.iter().map(|ex| ex.start_date).collect()
    }

    /// Inserting an instant twice is a no-op. Returns whether it was new.
    pub fn insert(&mut self, instant: DateTime<Utc>) -> bool {
        self.instants.insert(instant)
    }

    #[inline]
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.instants.contains(instant)
    }

    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.instants.iter()
    }
}

impl FromIterator<DateTime<Utc>> for ExceptionSet {
    fn from_iter<I: IntoIterator<Item = DateTime<Utc>>>(iter: I) -> Self {
        Self {
            instants: iter.into_iter().collect(),
        }
    }
}

/// A validated recurrence rule, anchored at the series start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrencePattern {
    pub anchor: DateTime<Utc>,
    pub frequency: Frequency,
    pub interval: u32,
    pub until: Option<DateTime<Utc>>,
    pub count: Option<u64>,
}

impl RecurrencePattern {
    /// Compiles a stored rule. The anchor is the owning schedule's start.
    pub fn compile(anchor: DateTime<Utc>, rule: &RecurrenceRule) -> Result<Self, CoreError> {
        let frequency = rule.frequency.parse::<Frequency>()?;
        Self::build(anchor, frequency, rule.interval, rule.until, rule.count)
    }

    pub fn from_spec(anchor: DateTime<Utc>, spec: &RepeatSpec) -> Result<Self, CoreError> {
        Self::build(anchor, spec.frequency, spec.interval, spec.until, spec.count)
    }

    fn build(
        anchor: DateTime<Utc>,
        frequency: Frequency,
        interval: Option<i64>,
        until: Option<DateTime<Utc>>,
        count: Option<i64>,
    ) -> Result<Self, CoreError> {
        let interval = match interval {
            None => 1,
            Some(i) if i <= 0 => return Err(CoreError::InvalidInterval(i)),
            Some(i) => u32::try_from(i).map_err(|_| CoreError::InvalidInterval(i))?,
        };
        let count = match count {
            None => None,
            Some(c) if c < 0 => return Err(CoreError::InvalidCount(c)),
            Some(c) => Some(c as u64),
        };

        Ok(Self {
            anchor,
            frequency,
            interval,
            until,
            count,
        })
    }

    /// Moves `cursor` forward by one cycle. `None` once the calendar runs out.
    pub fn advance(&self, cursor: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let interval = i64::from(self.interval);
        match self.frequency {
            Frequency::Daily => cursor.checked_add_signed(Duration::days(interval)),
            Frequency::Weekly => cursor.checked_add_signed(Duration::weeks(interval)),
            Frequency::Monthly => add_months_clamped(cursor, interval),
            Frequency::Yearly => add_months_clamped(cursor, interval.checked_mul(12)?),
        }
    }

    /// Whether some cycle of the rule starts exactly at `instant`.
    pub fn generates(&self, instant: DateTime<Utc>) -> bool {
        let window = QueryWindow {
            start: instant,
            end: instant,
        };
        !OccurrenceGenerator::new(*self, ExceptionSet::new())
            .occurrences_between(&window)
            .is_empty()
    }

    /// Number of cycles the rule generates strictly before `cut`.
    pub fn cycles_before(&self, cut: DateTime<Utc>) -> u64 {
        let mut cursor = self.anchor;
        let mut cycles = 0u64;
        while cursor < cut
            && self.until.map_or(true, |until| cursor <= until)
            && self.count.map_or(true, |count| cycles < count)
        {
            cycles += 1;
            match self.advance(cursor) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        cycles
    }
}

/// Adds calendar months, clamping the day to the end of a shorter target
/// month (Jan 31 + 1 month = Feb 28/29). The time of day is kept.
pub fn add_months_clamped(instant: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let date = instant.date_naive();
    let month_index = i64::from(date.year()) * 12 + i64::from(date.month0()) + months;
    let year = i32::try_from(month_index.div_euclid(12)).ok()?;
    let month = u32::try_from(month_index.rem_euclid(12)).ok()? + 1;
    let day = date.day().min(last_day_of_month(year, month)?);

    NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| d.and_time(instant.time()).and_utc())
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
}

/// Expands a recurrence pattern minus its exceptions.
///
/// Pure and restartable: the same inputs always produce the same output, and
/// nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct OccurrenceGenerator {
    pattern: RecurrencePattern,
    exceptions: ExceptionSet,
}

impl OccurrenceGenerator {
    pub fn new(pattern: RecurrencePattern, exceptions: ExceptionSet) -> Self {
        Self {
            pattern,
            exceptions,
        }
    }

    pub fn pattern(&self) -> &RecurrencePattern {
        &self.pattern
    }

    /// Occurrence starts inside `window`, strictly increasing.
    ///
    /// The cursor walks from the anchor one cycle at a time until it passes
    /// the rule's `until` (or the window end when the rule has none) or the
    /// rule's `count` of cycles is used up. `count` counts every generated
    /// cycle, including ones outside the window and ones suppressed by an
    /// exception, so it does not depend on the window asked for.
    pub fn occurrences_between(&self, window: &QueryWindow) -> Vec<DateTime<Utc>> {
        let pattern = &self.pattern;
        // Nothing past the window end can be emitted, so stop there even if
        // `until` lies further out.
        let stop = pattern.until.map_or(window.end(), |until| until.min(window.end()));

        let mut occurrences = Vec::new();
        let mut cursor = pattern.anchor;
        let mut cycles = 0u64;

        while cursor <= stop && pattern.count.map_or(true, |count| cycles < count) {
            if window.contains(cursor) && !self.exceptions.contains(&cursor) {
                occurrences.push(cursor);
            }
            cycles += 1;
            match pattern.advance(cursor) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        tracing::debug!(
            frequency = %pattern.frequency,
            interval = pattern.interval,
            cycles,
            emitted = occurrences.len(),
            "expanded recurrence"
        );
        occurrences
    }

    /// First occurrence of the series that is not suppressed, if any.
    pub fn first_occurrence(&self) -> Option<DateTime<Utc>> {
        let pattern = &self.pattern;
        let mut cursor = pattern.anchor;
        let mut cycles = 0u64;
        // Every exception can hide at most one cycle.
        let attempts = self.exceptions.len() as u64 + 1;

        while cycles < attempts
            && pattern.until.map_or(true, |until| cursor <= until)
            && pattern.count.map_or(true, |count| cycles < count)
        {
            if !self.exceptions.contains(&cursor) {
                return Some(cursor);
            }
            cycles += 1;
            cursor = pattern.advance(cursor)?;
        }
        None
    }
}

/// Expands a stored rule for one query window.
///
/// Fails with `InvalidFrequency`, `InvalidInterval`, `InvalidCount` or
/// `InvalidWindow` before producing any output.
pub fn generate(
    anchor: DateTime<Utc>,
    rule: &RecurrenceRule,
    exceptions: &ExceptionSet,
    query_start: DateTime<Utc>,
    query_end: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, CoreError> {
    let pattern = RecurrencePattern::compile(anchor, rule)?;
    let window = QueryWindow::new(query_start, query_end)?;
    Ok(OccurrenceGenerator::new(pattern, exceptions.clone()).occurrences_between(&window))
}

/// A non-recurring schedule occurs once, if its span touches the window.
pub fn single_occurrence(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    window: &QueryWindow,
) -> Option<OccurrenceSlot> {
    window
        .intersects(start, end)
        .then(|| OccurrenceSlot::new(start, end))
}

/// Concrete slots of a schedule inside `window`. Each recurring occurrence
/// lasts as long as the schedule's own span.
pub fn expand_schedule(
    schedule: &Schedule,
    rule: Option<&RecurrenceRule>,
    exceptions: &ExceptionSet,
    window: &QueryWindow,
) -> Result<Vec<OccurrenceSlot>, CoreError> {
    let Some(rule) = rule else {
        return Ok(single_occurrence(schedule.start_date, schedule.end_date, window)
            .into_iter()
            .collect());
    };

    let pattern = RecurrencePattern::compile(schedule.start_date, rule)?;
    let duration = schedule.duration();
    Ok(OccurrenceGenerator::new(pattern, exceptions.clone())
        .occurrences_between(window)
        .into_iter()
        .map(|start| OccurrenceSlot::new(start, start + duration))
        .collect())
}
