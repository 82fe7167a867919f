pub mod date_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize as _, Deserializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

    /// Parses RFC 3339 timestamps as well as the zone-less values html
    /// `datetime-local` inputs produce, which are taken as UTC.
    pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
            return Some(date_time.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_utc(&s).ok_or_else(|| Error::custom(format!("invalid date time `{}`", s)))
    }

    pub fn deserialize_utc_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => parse_utc(&s)
                .map(Some)
                .ok_or_else(|| Error::custom(format!("invalid date time `{}`", s))),
            None => Ok(None),
        }
    }
}

pub mod duration {
    use chrono::Duration;
    use schemars::gen::SchemaGenerator;
    use schemars::schema::{InstanceType, Schema, SchemaObject};
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(duration: &Duration) -> String {
        let total_seconds = duration.num_seconds();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }

    /// Accepts `hh:mm:ss` and `hh:mm`.
    pub fn parse(value: &str) -> Result<Duration, String> {
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(format!("expected format hh:mm:ss, got `{}`", value));
        }
        let mut numbers = [0i64; 3];
        for (number, part) in numbers.iter_mut().zip(parts.iter()) {
            *number = part
                .trim()
                .parse()
                .map_err(|_| format!("`{}` is not a number", part))?;
        }
        let [hours, minutes, seconds] = numbers;
        if hours < 0 || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
            return Err(format!("`{}` is out of range", value));
        }
        Duration::try_hours(hours)
            .and_then(|duration| duration.checked_add(&Duration::minutes(minutes)))
            .and_then(|duration| duration.checked_add(&Duration::seconds(seconds)))
            .ok_or_else(|| format!("`{}` is out of range", value))
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(D::Error::custom)
    }

    pub fn schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            format: Some("hh:mm:ss".to_owned()),
            ..Default::default()
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{date_time, duration};

    #[test]
    fn duration_round_trips_through_text() {
        let d = Duration::hours(5) + Duration::minutes(30);
        assert_eq!(duration::format(&d), "05:30:00");
        assert_eq!(duration::parse("05:30:00"), Ok(d));
    }

    #[test]
    fn duration_accepts_hours_and_minutes() {
        assert_eq!(duration::parse("12:05"), Ok(Duration::minutes(725)));
    }

    #[test]
    fn duration_rejects_bad_input() {
        assert!(duration::parse("5").is_err());
        assert!(duration::parse("01:75:00").is_err());
        assert!(duration::parse("aa:bb").is_err());
    }

    #[test]
    fn duration_rejects_hours_beyond_range() {
        assert!(duration::parse("9999999999999999:00:00").is_err());
        assert!(duration::parse("-1:00").is_err());
    }

    #[test]
    fn date_time_accepts_form_values() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        assert_eq!(date_time::parse_utc("2024-05-01T08:30"), Some(expected));
        assert_eq!(date_time::parse_utc("2024-05-01T08:30:00"), Some(expected));
        assert_eq!(
            date_time::parse_utc("2024-05-01T10:30:00+02:00"),
            Some(expected)
        );
        assert_eq!(date_time::parse_utc("01/05/2024"), None);
    }
}
