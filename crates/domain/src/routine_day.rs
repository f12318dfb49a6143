use std::collections::BTreeSet;

use crate::{
    DayContent, DayExercise, DayNumber, DaySlot, ExerciseID, FocusAreaID, InvalidInput, Mode,
    NotFound, UpdateError, UserID, UserRoutine,
};

/// Edits of the day slots of the active routine.
pub trait DayService {
    fn set_day_mode(&self, user_id: UserID, day: u32, mode: Mode) -> Result<DaySlot, UpdateError>;
    fn add_focus_area(
        &self,
        user_id: UserID,
        day: u32,
        focus_area_id: FocusAreaID,
    ) -> Result<DaySlot, UpdateError>;
    fn remove_focus_area(
        &self,
        user_id: UserID,
        day: u32,
        focus_area_id: FocusAreaID,
    ) -> Result<DaySlot, UpdateError>;
    fn add_exercise(
        &self,
        user_id: UserID,
        day: u32,
        exercise_id: ExerciseID,
    ) -> Result<DaySlot, UpdateError>;
    fn remove_exercise(
        &self,
        user_id: UserID,
        day: u32,
        exercise_id: ExerciseID,
    ) -> Result<DaySlot, UpdateError>;
    fn replace_day_content(
        &self,
        user_id: UserID,
        day: u32,
        content: DayContent,
    ) -> Result<DaySlot, UpdateError>;
    fn reorder_days(
        &self,
        user_id: UserID,
        source: u32,
        target: u32,
    ) -> Result<Vec<DaySlot>, UpdateError>;
    fn swap_days(&self, user_id: UserID, a: u32, b: u32) -> Result<SwapOutcome, UpdateError>;
    fn add_day(&self, user_id: UserID) -> Result<DaySlot, UpdateError>;
    fn remove_day(&self, user_id: UserID, day: u32) -> Result<Vec<DaySlot>, UpdateError>;
}

/// Content types that a swap moved between the two slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapOutcome {
    pub exchanged: BTreeSet<Mode>,
}

impl UserRoutine {
    /// Looks up a day number given by the caller. Zero is never a day number, any other
    /// number without a slot is a missing day.
    pub fn slot(&self, day: u32) -> Result<DayNumber, UpdateError> {
        let number = DayNumber::new(day).map_err(|_| InvalidInput::DayOutOfRange {
            day,
            days: self.day_count(),
        })?;
        self.day(number).ok_or(NotFound::Day(number))?;
        Ok(number)
    }

    /// Switches the mode of a slot. Changing the mode drops all content of the previous mode;
    /// setting the current mode again keeps the content.
    pub fn set_mode(&mut self, day: DayNumber, mode: Mode) -> Result<&DaySlot, UpdateError> {
        let slot = self.day_mut(day)?;
        if slot.content.mode() != mode {
            slot.content = DayContent::empty(mode);
        }
        Ok(slot)
    }

    pub fn add_focus_area(
        &mut self,
        day: DayNumber,
        focus_area_id: FocusAreaID,
    ) -> Result<&DaySlot, UpdateError> {
        let slot = self.day_mut(day)?;
        match &mut slot.content {
            DayContent::FocusAreas(focus_areas) => {
                focus_areas.insert(focus_area_id);
            }
            DayContent::Exercises(_) => {
                return Err(InvalidInput::WrongMode {
                    day,
                    mode: Mode::DirectExercises,
                }
                .into());
            }
        }
        Ok(slot)
    }

    pub fn remove_focus_area(
        &mut self,
        day: DayNumber,
        focus_area_id: FocusAreaID,
    ) -> Result<&DaySlot, UpdateError> {
        let slot = self.day_mut(day)?;
        match &mut slot.content {
            DayContent::FocusAreas(focus_areas) => {
                if !focus_areas.remove(&focus_area_id) {
                    return Err(NotFound::FocusArea(focus_area_id).into());
                }
            }
            DayContent::Exercises(_) => {
                return Err(InvalidInput::WrongMode {
                    day,
                    mode: Mode::DirectExercises,
                }
                .into());
            }
        }
        Ok(slot)
    }

    /// Appends an exercise to a slot, switching a focus area slot to direct exercises first.
    /// Adding an exercise that is already part of the slot changes nothing.
    pub fn add_exercise(
        &mut self,
        day: DayNumber,
        exercise_id: ExerciseID,
    ) -> Result<&DaySlot, UpdateError> {
        let slot = self.day_mut(day)?;
        if let DayContent::FocusAreas(_) = slot.content {
            slot.content = DayContent::empty(Mode::DirectExercises);
        }
        if let DayContent::Exercises(exercises) = &mut slot.content {
            if !exercises.iter().any(|e| e.exercise_id == exercise_id) {
                let order = exercises.iter().map(|e| e.order).max().unwrap_or(0) + 1;
                exercises.push(DayExercise { exercise_id, order });
            }
        }
        Ok(slot)
    }

    /// Removes an exercise from a slot. The orders of the remaining exercises are kept.
    pub fn remove_exercise(
        &mut self,
        day: DayNumber,
        exercise_id: ExerciseID,
    ) -> Result<&DaySlot, UpdateError> {
        let slot = self.day_mut(day)?;
        match &mut slot.content {
            DayContent::Exercises(exercises) => {
                let len = exercises.len();
                exercises.retain(|e| e.exercise_id != exercise_id);
                if exercises.len() == len {
                    return Err(NotFound::Exercise(exercise_id).into());
                }
            }
            DayContent::FocusAreas(_) => {
                return Err(InvalidInput::WrongMode {
                    day,
                    mode: Mode::FocusAreas,
                }
                .into());
            }
        }
        Ok(slot)
    }

    pub fn replace_content(
        &mut self,
        day: DayNumber,
        content: DayContent,
    ) -> Result<&DaySlot, UpdateError> {
        let content = match content {
            DayContent::Exercises(exercises) => {
                let mut exercises = exercises;
                exercises.sort_by_key(|e| e.order);
                let mut ids: Vec<ExerciseID> = Vec::with_capacity(exercises.len());
                for exercise in exercises {
                    if !ids.contains(&exercise.exercise_id) {
                        ids.push(exercise.exercise_id);
                    }
                }
                DayContent::exercises(&ids)
            }
            focus_areas @ DayContent::FocusAreas(_) => focus_areas,
        };
        let slot = self.day_mut(day)?;
        slot.content = content;
        Ok(slot)
    }

    /// Moves the content of `source` to `target`. All slots in between shift by one towards
    /// `source`. Day numbers stay with their positions, only the contents move.
    pub fn reorder(&mut self, source: DayNumber, target: DayNumber) -> Result<(), UpdateError> {
        self.day(source).ok_or(NotFound::Day(source))?;
        self.day(target).ok_or(NotFound::Day(target))?;

        let mut contents = self.take_contents();
        let moved = contents.remove(source.index());
        contents.insert(target.index(), moved);
        self.put_contents(contents);

        Ok(())
    }

    /// Exchanges the contents of two slots.
    pub fn swap(&mut self, a: DayNumber, b: DayNumber) -> Result<SwapOutcome, UpdateError> {
        let mode_a = self.day(a).ok_or(NotFound::Day(a))?.content.mode();
        let mode_b = self.day(b).ok_or(NotFound::Day(b))?.content.mode();

        if a == b {
            return Ok(SwapOutcome::default());
        }

        let mut contents = self.take_contents();
        contents.swap(a.index(), b.index());
        self.put_contents(contents);

        Ok(SwapOutcome {
            exchanged: BTreeSet::from([mode_a, mode_b]),
        })
    }

    /// Appends an empty focus area slot.
    pub fn add_day(&mut self) -> &DaySlot {
        let day = DayNumber::from_index(self.days.len());
        self.days.push(DaySlot {
            day,
            content: DayContent::empty(Mode::FocusAreas),
        });
        &self.days[day.index()]
    }

    /// Deletes a slot and closes the gap. An override of the removed slot is dropped, an
    /// override of a later slot follows its content.
    pub fn remove_day(&mut self, day: DayNumber) -> Result<(), UpdateError> {
        self.day(day).ok_or(NotFound::Day(day))?;
        if self.days.len() == 1 {
            return Err(InvalidInput::LastDay.into());
        }

        let mut contents = self.take_contents();
        contents.remove(day.index());
        self.put_contents(contents);

        self.active_day = match self.active_day {
            Some(active) if active == day => None,
            Some(active) if active > day => Some(DayNumber::from_index(active.index() - 1)),
            active => active,
        };

        Ok(())
    }

    fn take_contents(&mut self) -> Vec<DayContent> {
        self.days
            .iter_mut()
            .map(|slot| std::mem::replace(&mut slot.content, DayContent::empty(Mode::FocusAreas)))
            .collect()
    }

    fn put_contents(&mut self, contents: Vec<DayContent>) {
        self.days = contents
            .into_iter()
            .enumerate()
            .map(|(index, content)| DaySlot {
                day: DayNumber::from_index(index),
                content,
            })
            .collect();
    }
}
