use chrono::{DateTime, Local, NaiveDate};
use invite_portal::workflows::timestamp::parse_instant;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts the same forms as the window configuration.
pub(crate) fn parse_local_instant(raw: &str) -> Result<DateTime<Local>, String> {
    parse_instant(raw)
        .map(|instant| instant.with_timezone(&Local))
        .ok_or_else(|| format!("failed to parse '{raw}' as a date or date-time"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dates_and_instants() {
        assert_eq!(
            parse_date(" 2024-03-14 "),
            Ok(NaiveDate::from_ymd_opt(2024, 3, 14).expect("valid date"))
        );
        assert!(parse_date("14/03/2024").is_err());

        let instant = parse_local_instant("2024-03-14T09:30:00").expect("parses");
        assert_eq!(instant.format("%H:%M").to_string(), "09:30");
        assert!(parse_local_instant("tomorrow").is_err());
    }
}
