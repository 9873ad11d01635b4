//! Date helper functions

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

use crate::i18n::I18n;

/// Format a date as `dd MMM yyyy` with localized month names
///
/// # Examples
/// ```ignore
/// format_date(&date, chrono_tz::UTC, &I18n::new("pt-BR")) // -> "15 jun 2021"
/// ```
pub fn format_date(date: &DateTime<Utc>, tz: Tz, i18n: &I18n) -> String {
    let local = date.with_timezone(&tz);
    format!(
        "{:02} {} {:04}",
        local.day(),
        i18n.month_short(local.month()),
        local.year()
    )
}

/// Format just the time portion as `HH:mm`
pub fn format_time(date: &DateTime<Utc>, tz: Tz) -> String {
    date.with_timezone(&tz).format("%H:%M").to_string()
}

/// Edited notice, e.g. `* editado em 15 jun 2021, às 07:00`
pub fn format_edited(date: &DateTime<Utc>, tz: Tz, i18n: &I18n) -> String {
    i18n.get("post.edited")
        .replace("{date}", &format_date(date, tz, i18n))
        .replace("{time}", &format_time(date, tz))
}

/// Timezone plus language: everything needed to display a timestamp
#[derive(Debug, Clone)]
pub struct Localizer {
    pub tz: Tz,
    pub i18n: I18n,
}

impl Localizer {
    pub fn new(tz: Tz, i18n: I18n) -> Self {
        Self { tz, i18n }
    }

    pub fn date(&self, date: &DateTime<Utc>) -> String {
        format_date(date, self.tz, &self.i18n)
    }

    pub fn edited(&self, date: &DateTime<Utc>) -> String {
        format_edited(date, self.tz, &self.i18n)
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new(chrono_tz::America::Sao_Paulo, I18n::new("pt-BR"))
    }
}

/// Format a date in ISO 8601 for `<time datetime>` attributes
pub fn date_xml(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
