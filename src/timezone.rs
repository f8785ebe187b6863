//! Helpers for working with the configured local timezone.

use time::OffsetDateTime;
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Convert `instant` to the local time in `canonical_timezone`.
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the timezone name is not recognised.
pub fn to_local_time(
    instant: OffsetDateTime,
    canonical_timezone: &str,
) -> Result<OffsetDateTime, Error> {
    let tz = time_tz::timezones::get_by_name(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))?;

    Ok(instant.to_offset(tz.get_offset_utc(&instant).to_utc()))
}

/// The current time in `canonical_timezone`.
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the timezone name is not recognised.
pub fn local_now(canonical_timezone: &str) -> Result<OffsetDateTime, Error> {
    to_local_time(OffsetDateTime::now_utc(), canonical_timezone)
}

#[cfg(test)]
mod tests {
    use time::{UtcOffset, macros::datetime};

    use crate::{Error, timezone::to_local_time};

    #[test]
    fn converts_to_local_daylight_time() {
        let local = to_local_time(datetime!(2025-01-15 10:00 UTC), "Pacific/Auckland").unwrap();

        assert_eq!(local.offset(), UtcOffset::from_hms(13, 0, 0).unwrap());
        assert_eq!(local, datetime!(2025-01-15 23:00 +13));
    }

    #[test]
    fn rejects_unknown_timezone() {
        assert_eq!(
            to_local_time(datetime!(2025-01-15 10:00 UTC), "Mars/Olympus_Mons"),
            Err(Error::InvalidTimezoneError("Mars/Olympus_Mons".to_owned()))
        );
    }
}
