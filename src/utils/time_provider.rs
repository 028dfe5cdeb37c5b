use parking_lot::RwLock;
use chrono::{DateTime, Utc};

///
/// An overridable clock - used for tests.
///
/// It is shared (behind an Arc) by every component that needs the time, so fixing it once
/// moves the whole service.
///
#[derive(Debug, Default)]
pub struct TimeProvider {
    fixed: RwLock<Option<DateTime<Utc>>>
}

impl TimeProvider {
    pub fn fixed_at(now: DateTime<Utc>) -> Self {
        TimeProvider { fixed: RwLock::new(Some(now)) }
    }

    pub fn now(&self) -> DateTime<Utc> {
        match *self.fixed.read() {
            Some(fixed) => fixed,
            None => Utc::now()
        }
    }

    pub fn fix(&self, fixed: Option<DateTime<Utc>>) {
        *self.fixed.write() = fixed;
    }

    ///
    /// Move a fixed clock forward. A running clock is left alone.
    ///
    pub fn advance(&self, by: chrono::Duration) {
        let mut lock = self.fixed.write();
        if let Some(fixed) = *lock {
            *lock = Some(fixed + by);
        }
    }
}
