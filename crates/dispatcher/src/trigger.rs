use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use cron::Schedule;
use taskfire_domain::{SchedulerError, SchedulerResult};

/// 无触发器或触发器已耗尽时的重调度哨兵间隔，约100年，
/// 避免此类任务反复回到堆顶
const FAR_FUTURE_DAYS: i64 = 36500;

/// 一个任务的全部触发器，编译后的cron调度集合
#[derive(Debug, Clone)]
pub struct TriggerSet {
    schedules: Vec<Schedule>,
}

impl TriggerSet {
    /// 编译触发表达式，任何一条语法错误都使整组编译失败
    pub fn compile(expressions: &[String]) -> SchedulerResult<Self> {
        let mut schedules = Vec::with_capacity(expressions.len());
        for expr in expressions {
            let schedule =
                Schedule::from_str(&normalize(expr)).map_err(|e| SchedulerError::InvalidCron {
                    expr: expr.clone(),
                    message: e.to_string(),
                })?;
            schedules.push(schedule);
        }
        Ok(Self { schedules })
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    /// 严格晚于after的最早触发时刻，取所有调度的最小值
    pub fn next(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        self.schedules
            .iter()
            .filter_map(|s| s.after(&after).next())
            .min()
            .unwrap_or_else(|| after + Duration::days(FAR_FUTURE_DAYS))
    }
}

/// 5字段表达式补一个秒字段，描述符与带秒的表达式原样透传
fn normalize(expr: &str) -> String {
    let expr = expr.trim();
    if !expr.starts_with('@') && expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_five_field_expression_gets_seconds() {
        let triggers = TriggerSet::compile(&["*/5 * * * *".to_string()]).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let next = triggers.next(after);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap());
    }

    #[test]
    fn test_descriptor_passes_through() {
        let triggers = TriggerSet::compile(&["@daily".to_string()]).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(
            triggers.next(after),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_is_minimum_across_triggers() {
        let triggers = TriggerSet::compile(&[
            "0 0 12 * * *".to_string(),
            "0 30 10 * * *".to_string(),
        ])
        .unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(
            triggers.next(after),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_empty_set_yields_far_future() {
        let triggers = TriggerSet::compile(&[]).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let next = triggers.next(after);
        assert!(next >= after + Duration::days(36000));
    }

    #[test]
    fn test_malformed_expression_fails() {
        let err = TriggerSet::compile(&["not a cron".to_string()]).unwrap_err();
        match err {
            SchedulerError::InvalidCron { expr, .. } => assert_eq!(expr, "not a cron"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
