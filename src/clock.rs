use chrono::{Local, NaiveDateTime};

const FILE_NAME_FORMAT: &str = "clipboard_%Y%m%d_%H%M%S.png";

/// Source of local wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Second granularity: two calls within the same second collide.
pub fn file_name_for(timestamp: NaiveDateTime) -> String {
    timestamp.format(FILE_NAME_FORMAT).to_string()
}
