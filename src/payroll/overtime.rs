//! Pure overtime-premium computation. Takes a base hourly rate and a set of
//! attendance minute totals, returns the nine premium-pay components the
//! calculator folds into earning line items.

use crate::domain::AttendanceRecord;

const MONTHLY_OVERTIME_THRESHOLD_MINUTES: i64 = 3600;

const STATUTORY_OVERTIME_RATE: f64 = 1.25;
const OVER_60H_RATE: f64 = 1.50;
const NIGHT_RATE: f64 = 0.25;
const STATUTORY_HOLIDAY_RATE: f64 = 1.35;
const NIGHT_OVERTIME_RATE: f64 = 0.50;
const NIGHT_HOLIDAY_RATE: f64 = 0.60;
const NIGHT_OVERTIME_HOLIDAY_RATE: f64 = 0.85;

/// The nine premium-pay components, each independently floored to integer
/// yen before summation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OvertimeBreakdown {
    pub within_statutory_pay: i64,
    pub normal_overtime_pay: i64,
    pub over_60h_pay: i64,
    pub night_pay: i64,
    pub statutory_holiday_pay: i64,
    pub non_statutory_holiday_pay: i64,
    pub night_overtime_pay: i64,
    pub night_holiday_pay: i64,
    pub night_overtime_holiday_pay: i64,
}

impl OvertimeBreakdown {
    pub fn total(&self) -> i64 {
        self.within_statutory_pay
            + self.normal_overtime_pay
            + self.over_60h_pay
            + self.night_pay
            + self.statutory_holiday_pay
            + self.non_statutory_holiday_pay
            + self.night_overtime_pay
            + self.night_holiday_pay
            + self.night_overtime_holiday_pay
    }

    pub fn normal_overtime_minutes(statutory_overtime_minutes: i64) -> i64 {
        let over_60h = Self::over_60h_minutes(statutory_overtime_minutes);
        statutory_overtime_minutes - over_60h
    }

    pub fn over_60h_minutes(statutory_overtime_minutes: i64) -> i64 {
        (statutory_overtime_minutes - MONTHLY_OVERTIME_THRESHOLD_MINUTES).max(0)
    }
}

pub struct OvertimeEngine;

impl OvertimeEngine {
    /// `base_hourly_yen` is the employee's derived hourly rate for premium
    /// purposes (see `PayrollCalculator` step 3); minute figures come from
    /// the period's `AttendanceRecord`.
    pub fn compute(base_hourly_yen: i64, attendance: &AttendanceRecord) -> OvertimeBreakdown {
        let minute_rate = base_hourly_yen as f64 / 60.0;
        let pay = |minutes: i64, multiplier: f64| -> i64 {
            (minute_rate * minutes as f64 * multiplier).floor() as i64
        };

        let over_60h_minutes =
            OvertimeBreakdown::over_60h_minutes(attendance.statutory_overtime_minutes);
        let normal_overtime_minutes =
            attendance.statutory_overtime_minutes - over_60h_minutes;

        OvertimeBreakdown {
            within_statutory_pay: pay(attendance.overtime_within_statutory_minutes, 1.00),
            normal_overtime_pay: pay(normal_overtime_minutes, STATUTORY_OVERTIME_RATE),
            over_60h_pay: pay(over_60h_minutes, OVER_60H_RATE),
            night_pay: pay(attendance.night_minutes, NIGHT_RATE),
            statutory_holiday_pay: pay(attendance.statutory_holiday_minutes, STATUTORY_HOLIDAY_RATE),
            non_statutory_holiday_pay: pay(attendance.non_statutory_holiday_minutes, 1.00),
            night_overtime_pay: pay(attendance.night_overtime_minutes, NIGHT_OVERTIME_RATE),
            night_holiday_pay: pay(attendance.night_holiday_minutes, NIGHT_HOLIDAY_RATE),
            night_overtime_holiday_pay: pay(
                attendance.night_overtime_holiday_minutes,
                NIGHT_OVERTIME_HOLIDAY_RATE,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn attendance_with(statutory_overtime_minutes: i64) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            payroll_period_id: Uuid::new_v4(),
            work_days: 20,
            absence_days: 0,
            paid_leave_days: 0,
            total_work_minutes: 0,
            overtime_within_statutory_minutes: 0,
            statutory_overtime_minutes,
            night_minutes: 0,
            statutory_holiday_minutes: 0,
            non_statutory_holiday_minutes: 0,
            night_overtime_minutes: 0,
            night_holiday_minutes: 0,
            night_overtime_holiday_minutes: 0,
            late_count: 0,
            early_leave_count: 0,
        }
    }

    #[test]
    fn splits_at_60_hour_threshold() {
        // 2 400 yen/hour, 4 200 minutes of statutory overtime.
        let attendance = attendance_with(4200);
        let result = OvertimeEngine::compute(2400, &attendance);
        println!("{:?}", result);
        assert_eq!(result.normal_overtime_pay, 180_000);
        assert_eq!(result.over_60h_pay, 36_000);
    }

    #[test]
    fn no_overtime_minutes_means_no_overtime_pay() {
        let attendance = attendance_with(0);
        let result = OvertimeEngine::compute(2000, &attendance);
        assert_eq!(result.total(), 0);
    }
}
