use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::board::BoardId;
use crate::card::CardId;
use crate::list::ListId;

pub type ReminderId = Uuid;
pub type UserId = Uuid;

/// Display label only; `reminder_time` is authoritative for scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderType {
    #[serde(rename = "24h")]
    DayBefore,
    #[serde(rename = "1h")]
    HourBefore,
    #[serde(rename = "custom")]
    Custom,
}

impl ReminderType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DayBefore => "24h",
            Self::HourBefore => "1h",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ReminderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(Self::DayBefore),
            "1h" => Ok(Self::HourBefore),
            "custom" => Ok(Self::Custom),
            other => Err(format!(
                "unknown reminder type '{}' (expected 24h, 1h or custom)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: ReminderId,
    pub card_id: CardId,
    pub user_id: UserId,
    pub reminder_time: DateTime<Utc>,
    pub reminder_type: ReminderType,
    /// Flips false -> true exactly once, when a scanner claims it.
    #[serde(default)]
    pub sent: bool,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(
        card_id: CardId,
        user_id: UserId,
        reminder_time: DateTime<Utc>,
        reminder_type: ReminderType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            user_id,
            reminder_time,
            reminder_type,
            sent: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.sent && self.reminder_time <= now
    }

    /// Claim the reminder. Returns false if it was already claimed.
    pub fn claim(&mut self) -> bool {
        if self.sent {
            return false;
        }
        self.sent = true;
        true
    }
}

/// A claimed reminder joined with the card context its notification needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DueReminder {
    pub reminder: Reminder,
    pub card_title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub list_id: ListId,
    pub board_id: BoardId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reminder_at(offset: Duration) -> Reminder {
        Reminder::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Utc::now() + offset,
            ReminderType::HourBefore,
        )
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        assert!(reminder_at(Duration::seconds(-1)).is_due(now));
        assert!(!reminder_at(Duration::hours(1)).is_due(now));
    }

    #[test]
    fn test_claim_is_monotonic() {
        let mut reminder = reminder_at(Duration::seconds(-1));
        assert!(reminder.claim());
        assert!(reminder.sent);
        assert!(!reminder.claim());
        assert!(reminder.sent);
        assert!(!reminder.is_due(Utc::now()));
    }

    #[test]
    fn test_reminder_type_labels() {
        assert_eq!("24h".parse::<ReminderType>().unwrap(), ReminderType::DayBefore);
        assert_eq!(ReminderType::HourBefore.to_string(), "1h");
        assert!("weekly".parse::<ReminderType>().is_err());
        assert_eq!(
            serde_json::to_string(&ReminderType::Custom).unwrap(),
            "\"custom\""
        );
    }
}
