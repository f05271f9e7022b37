//! Maintenance window gate. Outside the configured weekly
//! schedule, only "emergency" callers are admitted.

use chrono::{
    DateTime,
    Datelike,
    Timelike,
    Utc,
};
use ix_config::MaintenanceWindow;

pub fn admits(window: &MaintenanceWindow, now: DateTime<Utc>, emergency: bool) -> bool {
    if emergency {
        return true;
    }
    let weekday = now.weekday().num_days_from_sunday() as u8;
    let hour = now.hour() as u8;
    window.days.contains(&weekday) && window.hours.contains(&hour)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn full_schedule_admits_any_time() {
        let window = MaintenanceWindow::default();
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 14, 0, 0).unwrap();
        assert!(admits(&window, now, false));
    }

    #[test]
    fn restricted_schedule_denies_outside_window() {
        let window = MaintenanceWindow {
            hours: vec![2, 3, 4],
            days: vec![0],
        };
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 14, 0, 0).unwrap(); // Tuesday
        assert!(!admits(&window, now, false));
    }

    #[test]
    fn emergency_always_admits() {
        let window = MaintenanceWindow {
            hours: vec![],
            days: vec![],
        };
        let now = Utc::now();
        assert!(admits(&window, now, true));
    }
}
