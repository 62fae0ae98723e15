//! Planning of edits to recurring schedules.
//!
//! [`ScheduleModifier::plan`] is pure: it looks at a schedule, its rule and
//! the edit payload and decides every row that has to change. The repository
//! then applies the resulting [`ModificationPlan`] inside one transaction.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{
    EditedFields, Frequency, ModifyType, NewSchedule, OccurrenceSlot, RecurrenceRule, RepeatSpec,
    Schedule,
};
use crate::recurrence::RecurrencePattern;

/// What happens to the rule of a series edited in place.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleChange {
    Keep,
    /// Overwrite the parameters of the existing rule
    Replace { rule_id: Uuid, repeat: RepeatSpec },
    /// The schedule had no rule; attach one
    Attach(RepeatSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModificationPlan {
    /// Suppress `slot` in the rule and create `schedule` in its place.
    Detach {
        rule_id: Uuid,
        slot: OccurrenceSlot,
        schedule: NewSchedule,
    },
    /// End the old rule at `truncated_until` and continue with `schedule`.
    Split {
        rule_id: Uuid,
        truncated_until: DateTime<Utc>,
        schedule: NewSchedule,
    },
    /// Rewrite the schedule and its rule in place.
    EditSeries {
        schedule: Schedule,
        rule: RuleChange,
        tags: Option<Vec<String>>,
        reminders: Option<Vec<i64>>,
    },
}

/// A schedule as it is right before an edit.
#[derive(Debug, Clone)]
pub struct ScheduleModifier<'a> {
    schedule: &'a Schedule,
    rule: Option<&'a RecurrenceRule>,
    tags: Vec<String>,
    reminders: Vec<i64>,
}

impl<'a> ScheduleModifier<'a> {
    pub fn new(schedule: &'a Schedule, rule: Option<&'a RecurrenceRule>) -> Self {
        Self {
            schedule,
            rule,
            tags: Vec::new(),
            reminders: Vec::new(),
        }
    }

    /// Tags and reminders carried over to a detached or forked schedule when
    /// the edit does not name its own.
    pub fn with_attachments(mut self, tags: Vec<String>, reminders: Vec<i64>) -> Self {
        self.tags = tags;
        self.reminders = reminders;
        self
    }

    pub fn plan(
        &self,
        modify_type: ModifyType,
        edited: &EditedFields,
    ) -> Result<ModificationPlan, CoreError> {
        if let Some(repeat) = &edited.repeat {
            // Surface bad interval/count before anything is planned.
            RecurrencePattern::from_spec(self.schedule.start_date, repeat)?;
        }

        // The cut of a split is always the edited start.
        if edited.occurrence.is_some() && modify_type != ModifyType::Only {
            return Err(CoreError::InvalidInput(format!(
                "An occurrence can only be given with the 'only' modify type, not '{}'",
                modify_type
            )));
        }

        match modify_type {
            ModifyType::Only => self.plan_detach(edited),
            ModifyType::AfterAll => self.plan_split(edited),
            ModifyType::All => self.plan_edit_series(edited),
        }
    }

    fn require_rule(&self) -> Result<&'a RecurrenceRule, CoreError> {
        self.rule
            .ok_or(CoreError::RuleNotFound(self.schedule.id))
    }

    fn plan_detach(&self, edited: &EditedFields) -> Result<ModificationPlan, CoreError> {
        let rule = self.require_rule()?;

        let slot = edited.occurrence.unwrap_or_else(|| {
            OccurrenceSlot::new(
                edited.start_date.unwrap_or(self.schedule.start_date),
                edited.end_date.unwrap_or(self.schedule.end_date),
            )
        });

        let pattern = RecurrencePattern::compile(self.schedule.start_date, rule)?;
        if !pattern.generates(slot.start) {
            tracing::warn!(
                schedule_id = %self.schedule.id,
                slot_start = %slot.start,
                "detached slot is not an occurrence of the series"
            );
        }

        let start = edited.start_date.unwrap_or(slot.start);
        let end = edited.end_date.unwrap_or(start + (slot.end - slot.start));
        let mut schedule = self.merged(edited, start, end);
        schedule.repeat = None;
        schedule.validate()?;

        Ok(ModificationPlan::Detach {
            rule_id: rule.id,
            slot,
            schedule,
        })
    }

    fn plan_split(&self, edited: &EditedFields) -> Result<ModificationPlan, CoreError> {
        let rule = self.require_rule()?;
        let cut = edited.start_date.ok_or_else(|| {
            CoreError::InvalidInput("An after_all edit needs the start of the first changed occurrence".to_string())
        })?;

        // The cut instant belongs to the new series only.
        let edge = cut - Duration::seconds(1);
        let truncated_until = rule.until.map_or(edge, |until| until.min(edge));

        let repeat = match &edited.repeat {
            Some(repeat) => repeat.clone(),
            None => self.inherited_repeat(rule, cut)?,
        };

        let end = edited.end_date.unwrap_or(cut + self.schedule.duration());
        let mut schedule = self.merged(edited, cut, end);
        schedule.repeat = Some(repeat);
        schedule.validate()?;

        Ok(ModificationPlan::Split {
            rule_id: rule.id,
            truncated_until,
            schedule,
        })
    }

    fn plan_edit_series(&self, edited: &EditedFields) -> Result<ModificationPlan, CoreError> {
        let original = self.schedule;
        let schedule = Schedule {
            title: edited.title.clone().unwrap_or_else(|| original.title.clone()),
            note: edited.note.clone().or_else(|| original.note.clone()),
            color: edited.color.unwrap_or(original.color),
            importance: edited.importance.unwrap_or(original.importance),
            start_date: edited.start_date.unwrap_or(original.start_date),
            end_date: edited.end_date.unwrap_or(original.end_date),
            updated_at: Utc::now(),
            ..original.clone()
        };

        if schedule.title.trim().is_empty() {
            return Err(CoreError::InvalidInput("Title must not be empty".to_string()));
        }
        if schedule.start_date > schedule.end_date {
            return Err(CoreError::InvalidInput(format!(
                "Start {} is after end {}",
                schedule.start_date, schedule.end_date
            )));
        }

        let rule = match (&edited.repeat, self.rule) {
            (None, _) => RuleChange::Keep,
            (Some(repeat), Some(rule)) => RuleChange::Replace {
                rule_id: rule.id,
                repeat: repeat.clone(),
            },
            (Some(repeat), None) => RuleChange::Attach(repeat.clone()),
        };

        Ok(ModificationPlan::EditSeries {
            schedule,
            rule,
            tags: edited.tags.clone(),
            reminders: edited.reminders.clone(),
        })
    }

    /// Old rule parameters continued from `cut`, with whatever is left of a
    /// cycle cap.
    fn inherited_repeat(&self, rule: &RecurrenceRule, cut: DateTime<Utc>) -> Result<RepeatSpec, CoreError> {
        let pattern = RecurrencePattern::compile(self.schedule.start_date, rule)?;
        let frequency: Frequency = pattern.frequency;
        let count = pattern.count.map(|count| {
            let used = pattern.cycles_before(cut);
            count.saturating_sub(used) as i64
        });

        Ok(RepeatSpec {
            frequency,
            interval: rule.interval,
            until: rule.until,
            count,
        })
    }

    fn merged(&self, edited: &EditedFields, start: DateTime<Utc>, end: DateTime<Utc>) -> NewSchedule {
        let original = self.schedule;
        NewSchedule {
            title: edited.title.clone().unwrap_or_else(|| original.title.clone()),
            note: edited.note.clone().or_else(|| original.note.clone()),
            color: edited.color.unwrap_or(original.color),
            importance: edited.importance.unwrap_or(original.importance),
            tags: edited.tags.clone().unwrap_or_else(|| self.tags.clone()),
            start_date: start,
            end_date: end,
            repeat: None,
            reminders: edited
                .reminders
                .clone()
                .unwrap_or_else(|| self.reminders.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Color, Importance};
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn standup() -> Schedule {
        Schedule {
            id: Uuid::now_v7(),
            owner_id: "owner".to_string(),
            title: "Standup".to_string(),
            note: Some("room 4".to_string()),
            color: Color::Green,
            importance: Importance::High,
            start_date: at(2024, 1, 1, 10),
            end_date: at(2024, 1, 1, 11),
            created_at: at(2023, 12, 1, 0),
            updated_at: at(2023, 12, 1, 0),
        }
    }

    fn weekly(schedule: &Schedule, count: Option<i64>, until: Option<DateTime<Utc>>) -> RecurrenceRule {
        RecurrenceRule {
            id: Uuid::now_v7(),
            schedule_id: schedule.id,
            frequency: "weekly".to_string(),
            interval: Some(1),
            until,
            count,
            created_at: schedule.created_at,
            updated_at: schedule.updated_at,
        }
    }

    #[test]
    fn only_detaches_the_edited_slot() {
        let schedule = standup();
        let rule = weekly(&schedule, None, None);
        let edited = EditedFields {
            title: Some("Standup (moved)".to_string()),
            start_date: Some(at(2024, 1, 15, 14)),
            end_date: Some(at(2024, 1, 15, 15)),
            occurrence: Some(OccurrenceSlot::new(at(2024, 1, 15, 10), at(2024, 1, 15, 11))),
            ..Default::default()
        };

        let plan = ScheduleModifier::new(&schedule, Some(&rule))
            .with_attachments(vec!["work".to_string()], vec![10])
            .plan(ModifyType::Only, &edited)
            .unwrap();

        match plan {
            ModificationPlan::Detach { rule_id, slot, schedule: new } => {
                assert_eq!(rule_id, rule.id);
                assert_eq!(slot.start, at(2024, 1, 15, 10));
                assert_eq!(new.title, "Standup (moved)");
                assert_eq!(new.start_date, at(2024, 1, 15, 14));
                assert_eq!(new.end_date, at(2024, 1, 15, 15));
                assert_eq!(new.color, Color::Green);
                assert_eq!(new.note.as_deref(), Some("room 4"));
                assert_eq!(new.tags, vec!["work".to_string()]);
                assert_eq!(new.reminders, vec![10]);
                assert!(new.repeat.is_none());
            }
            other => panic!("expected a detach, got {:?}", other),
        }
    }

    #[test]
    fn only_without_occurrence_uses_edited_times_as_slot() {
        let schedule = standup();
        let rule = weekly(&schedule, None, None);
        let edited = EditedFields {
            start_date: Some(at(2024, 1, 8, 10)),
            end_date: Some(at(2024, 1, 8, 11)),
            color: Some(Color::Coral),
            ..Default::default()
        };

        let plan = ScheduleModifier::new(&schedule, Some(&rule))
            .plan(ModifyType::Only, &edited)
            .unwrap();
        let ModificationPlan::Detach { slot, schedule: new, .. } = plan else {
            panic!("expected a detach");
        };
        assert_eq!(slot, OccurrenceSlot::new(at(2024, 1, 8, 10), at(2024, 1, 8, 11)));
        assert_eq!(new.start_date, slot.start);
        assert_eq!(new.color, Color::Coral);
    }

    #[rstest]
    #[case(ModifyType::Only)]
    #[case(ModifyType::AfterAll)]
    fn partial_edits_need_a_rule(#[case] modify_type: ModifyType) {
        let schedule = standup();
        let edited = EditedFields {
            start_date: Some(at(2024, 1, 8, 10)),
            ..Default::default()
        };
        let result = ScheduleModifier::new(&schedule, None).plan(modify_type, &edited);
        assert!(matches!(result, Err(CoreError::RuleNotFound(id)) if id == schedule.id));
    }

    #[test]
    fn after_all_truncates_one_second_before_the_cut() {
        let schedule = standup();
        let rule = weekly(&schedule, None, Some(at(2024, 6, 1, 0)));
        let edited = EditedFields {
            start_date: Some(at(2024, 1, 15, 10)),
            title: Some("Standup v2".to_string()),
            ..Default::default()
        };

        let plan = ScheduleModifier::new(&schedule, Some(&rule))
            .plan(ModifyType::AfterAll, &edited)
            .unwrap();
        let ModificationPlan::Split { truncated_until, schedule: new, .. } = plan else {
            panic!("expected a split");
        };

        assert_eq!(truncated_until, at(2024, 1, 15, 10) - Duration::seconds(1));
        assert_eq!(new.start_date, at(2024, 1, 15, 10));
        assert_eq!(new.end_date, at(2024, 1, 15, 11));
        let repeat = new.repeat.unwrap();
        assert_eq!(repeat.frequency, Frequency::Weekly);
        assert_eq!(repeat.until, Some(at(2024, 6, 1, 0)));
        assert_eq!(repeat.count, None);
    }

    #[test]
    fn after_all_never_extends_an_earlier_until() {
        let schedule = standup();
        let rule = weekly(&schedule, None, Some(at(2024, 1, 10, 0)));
        let edited = EditedFields {
            start_date: Some(at(2024, 2, 5, 10)),
            ..Default::default()
        };
        let plan = ScheduleModifier::new(&schedule, Some(&rule))
            .plan(ModifyType::AfterAll, &edited)
            .unwrap();
        let ModificationPlan::Split { truncated_until, .. } = plan else {
            panic!("expected a split");
        };
        assert_eq!(truncated_until, at(2024, 1, 10, 0));
    }

    #[test]
    fn after_all_carries_the_remaining_count() {
        let schedule = standup();
        let rule = weekly(&schedule, Some(10), None);
        let edited = EditedFields {
            start_date: Some(at(2024, 1, 22, 10)),
            ..Default::default()
        };
        let plan = ScheduleModifier::new(&schedule, Some(&rule))
            .plan(ModifyType::AfterAll, &edited)
            .unwrap();
        let ModificationPlan::Split { schedule: new, .. } = plan else {
            panic!("expected a split");
        };
        // Jan 1, 8, 15 happened before the cut
        assert_eq!(new.repeat.unwrap().count, Some(7));
    }

    #[test]
    fn after_all_prefers_the_edited_rule() {
        let schedule = standup();
        let rule = weekly(&schedule, Some(10), None);
        let mut repeat = RepeatSpec::new(Frequency::Daily);
        repeat.interval = Some(2);
        let edited = EditedFields {
            start_date: Some(at(2024, 1, 22, 10)),
            repeat: Some(repeat.clone()),
            ..Default::default()
        };
        let plan = ScheduleModifier::new(&schedule, Some(&rule))
            .plan(ModifyType::AfterAll, &edited)
            .unwrap();
        let ModificationPlan::Split { schedule: new, .. } = plan else {
            panic!("expected a split");
        };
        assert_eq!(new.repeat, Some(repeat));
    }

    #[rstest]
    #[case(ModifyType::AfterAll)]
    #[case(ModifyType::All)]
    fn occurrence_is_rejected_outside_only(#[case] modify_type: ModifyType) {
        let schedule = standup();
        let rule = weekly(&schedule, None, None);
        let edited = EditedFields {
            start_date: Some(at(2024, 1, 15, 14)),
            occurrence: Some(OccurrenceSlot::new(at(2024, 1, 15, 10), at(2024, 1, 15, 11))),
            ..Default::default()
        };
        let result = ScheduleModifier::new(&schedule, Some(&rule)).plan(modify_type, &edited);
        assert!(matches!(result, Err(CoreError::InvalidInput(msg)) if msg.contains("only")));
    }

    #[test]
    fn after_all_requires_a_cut_point() {
        let schedule = standup();
        let rule = weekly(&schedule, None, None);
        let result = ScheduleModifier::new(&schedule, Some(&rule))
            .plan(ModifyType::AfterAll, &EditedFields::default());
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn all_rewrites_in_place() {
        let schedule = standup();
        let rule = weekly(&schedule, None, None);
        let mut repeat = RepeatSpec::new(Frequency::Monthly);
        repeat.count = Some(3);
        let edited = EditedFields {
            title: Some("Monthly sync".to_string()),
            repeat: Some(repeat.clone()),
            ..Default::default()
        };

        let plan = ScheduleModifier::new(&schedule, Some(&rule))
            .plan(ModifyType::All, &edited)
            .unwrap();
        let ModificationPlan::EditSeries { schedule: updated, rule: change, tags, .. } = plan else {
            panic!("expected an in-place edit");
        };
        assert_eq!(updated.id, schedule.id);
        assert_eq!(updated.title, "Monthly sync");
        assert_eq!(updated.start_date, schedule.start_date);
        assert_eq!(change, RuleChange::Replace { rule_id: rule.id, repeat });
        assert!(tags.is_none());
    }

    #[test]
    fn all_attaches_a_rule_to_a_single_schedule() {
        let schedule = standup();
        let edited = EditedFields {
            repeat: Some(RepeatSpec::new(Frequency::Daily)),
            ..Default::default()
        };
        let plan = ScheduleModifier::new(&schedule, None)
            .plan(ModifyType::All, &edited)
            .unwrap();
        assert!(matches!(
            plan,
            ModificationPlan::EditSeries { rule: RuleChange::Attach(_), .. }
        ));
    }

    #[test]
    fn all_rejects_inverted_times() {
        let schedule = standup();
        let edited = EditedFields {
            end_date: Some(at(2023, 1, 1, 0)),
            ..Default::default()
        };
        let result = ScheduleModifier::new(&schedule, None).plan(ModifyType::All, &edited);
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn invalid_edited_interval_is_rejected() {
        let schedule = standup();
        let rule = weekly(&schedule, None, None);
        let mut repeat = RepeatSpec::new(Frequency::Weekly);
        repeat.interval = Some(0);
        let edited = EditedFields {
            repeat: Some(repeat),
            ..Default::default()
        };
        let result = ScheduleModifier::new(&schedule, Some(&rule)).plan(ModifyType::All, &edited);
        assert!(matches!(result, Err(CoreError::InvalidInterval(0))));
    }
}
