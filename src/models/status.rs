use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Workflow stage of a booking.
///
/// The documented path is `Pending -> Accepted -> On-Process -> Completed`, but
/// admins may assign any stage directly. The only hard rule is that a
/// `Completed` booking keeps its status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    #[default]
    Pending,
    Accepted,
    #[serde(rename = "On-Process")]
    OnProcess,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::OnProcess,
        BookingStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Accepted => "Accepted",
            BookingStatus::OnProcess => "On-Process",
            BookingStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                AppError::InvalidStatus(format!(
                    "'{s}' is not one of Pending, Accepted, On-Process, Completed"
                ))
            })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed)
    }

    /// Owners may only withdraw a booking nobody has picked up yet.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Checks an admin-requested status change.
    pub fn check_transition(&self, next: BookingStatus) -> Result<(), AppError> {
        if self.is_terminal() && *self != next {
            return Err(AppError::Forbidden(format!(
                "booking is {} and its status can no longer change",
                self.as_str()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
