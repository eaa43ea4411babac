// src/utils/booking.rs

use crate::{
    error::AppError,
    models::exam_event::{STATUS_CANCELLED, TYPE_HOMEWORK, TYPE_QUIZ},
};

pub const MAX_QUIZZES_PER_CLASS_PER_DAY: usize = 1;

/// An event already on the books for the same class and date.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookedSlot {
    pub id: i64,
    pub event_type: String,
    pub period: i64,
    pub status: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum BookingConflict {
    QuizLimit { existing_id: i64 },
    SlotTaken { existing_id: i64, period: i64 },
}

impl From<BookingConflict> for AppError {
    fn from(conflict: BookingConflict) -> Self {
        match conflict {
            BookingConflict::QuizLimit { existing_id } => AppError::Conflict(format!(
                "This class already has a quiz on that day (event #{existing_id})"
            )),
            BookingConflict::SlotTaken {
                existing_id,
                period,
            } => AppError::Conflict(format!(
                "Period {period} is already booked for this class (event #{existing_id})"
            )),
        }
    }
}

fn occupies_slot(event_type: &str) -> bool {
    event_type != TYPE_HOMEWORK
}

/// Checks a candidate booking against the class's other events on the same day.
///
/// Cancelled events and the event being edited (`exclude_id`) are ignored.
/// Homework never occupies a period.
pub fn check_booking(
    event_type: &str,
    period: i64,
    exclude_id: Option<i64>,
    same_day: &[BookedSlot],
) -> Result<(), BookingConflict> {
    let others = same_day
        .iter()
        .filter(|e| e.status != STATUS_CANCELLED && Some(e.id) != exclude_id);

    if event_type == TYPE_QUIZ {
        let quizzes: Vec<&BookedSlot> = others
            .clone()
            .filter(|e| e.event_type == TYPE_QUIZ)
            .collect();
        if quizzes.len() >= MAX_QUIZZES_PER_CLASS_PER_DAY {
            return Err(BookingConflict::QuizLimit {
                existing_id: quizzes[0].id,
            });
        }
    }

    if occupies_slot(event_type) {
        if let Some(clash) = others
            .filter(|e| occupies_slot(&e.event_type))
            .find(|e| e.period == period)
        {
            return Err(BookingConflict::SlotTaken {
                existing_id: clash.id,
                period,
            });
        }
    }

    Ok(())
}
