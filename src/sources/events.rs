//! EventFinda "what's on" RSS feed.
//!
//! Item descriptions are HTML ending in `Location | Date`; the date text may
//! carry several dates, of which the first is the start and the last the end.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{info, warn};
use xml::{reader::XmlEvent, EventReader};

use crate::{
    error::EtlError,
    output::{Audit, OutputTable, Value},
    reading::coerce::month_number,
    report::Report,
    reshape::classify::EVENT_CATEGORY,
};

pub const DATA_SOURCE: &str = "EventFinda RSS";
pub const FEED_URL: &str = "https://www.eventfinda.co.nz/feed/events/new-zealand/whatson/upcoming.rss";
pub const ACCEPT: &str = "application/rss+xml, application/xml, text/xml";

/// Events starting later than this many days after the load are skipped.
pub const HORIZON_DAYS: i64 = 90;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&[a-zA-Z]+;").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LOCATION_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^|\n]+)\|[ \t]*([^|\n]+)$").unwrap());
static WEEKDAY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+day),\s*(\d{1,2})\s+(\w+)\s+(\d{4})").unwrap());
static PLAIN_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})\s+(\w+)\s+(\d{4})").unwrap());
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static CITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z\s]+").unwrap());

/// Searched in order; the first city named in the location wins.
const CITY_REGIONS: [(&str, &str); 20] = [
    ("Auckland", "Auckland"),
    ("Wellington", "Wellington"),
    ("Christchurch", "Canterbury"),
    ("Hamilton", "Waikato"),
    ("Tauranga", "Bay of Plenty"),
    ("Dunedin", "Otago"),
    ("Palmerston North", "Manawatu-Whanganui"),
    ("Napier", "Hawke's Bay"),
    ("Nelson", "Nelson"),
    ("New Plymouth", "Taranaki"),
    ("Rotorua", "Bay of Plenty"),
    ("Whangarei", "Northland"),
    ("Invercargill", "Southland"),
    ("Lower Hutt", "Wellington"),
    ("Upper Hutt", "Wellington"),
    ("Gisborne", "Gisborne"),
    ("Timaru", "Canterbury"),
    ("Taupo", "Waikato"),
    ("Hastings", "Hawke's Bay"),
    ("Levin", "Manawatu-Whanganui"),
];

const COLUMNS: [&str; 13] = [
    "event_id",
    "title",
    "description",
    "location_text",
    "date_info_original",
    "start_date",
    "end_date",
    "is_recurring",
    "category",
    "event_url",
    "publication_date",
    "region",
    "city",
];

/// Description text with the trailing location and date split off.
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    pub text: String,
    pub location: Option<String>,
    pub date_info: Option<String>,
}

fn squash(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Strips markup and splits off the trailing `Location | Date` line. Tags become
/// line breaks so the pair is found within its own element.
pub fn parse_description(html: &str) -> Description {
    let text = TAG.replace_all(html, "\n");
    let text = ENTITY.replace_all(&text, " ");
    let text = text.trim();

    match LOCATION_DATE.captures(text) {
        Some(c) => Description {
            text: squash(&text[..c.get(0).map_or(0, |m| m.start())]),
            location: Some(squash(&c[1])),
            date_info: Some(squash(&c[2])),
        },
        None => Description {
            text: squash(text),
            location: None,
            date_info: None,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventDates {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub is_recurring: bool,
}

fn captured_date(c: &Captures, day: usize) -> Option<NaiveDate> {
    let month = month_number(&c[day + 1])?;
    NaiveDate::from_ymd_opt(c[day + 2].parse().ok()?, month, c[day].parse().ok()?)
}

/// Start and end dates from text such as `"Sunday, 3 August 2025 - Sunday, 31
/// August 2025"`. Weekday-prefixed dates are preferred; a single date is both
/// start and end.
pub fn parse_event_dates(date_info: &str) -> EventDates {
    let lower = date_info.to_lowercase();
    let mut dates = EventDates {
        start: None,
        end: None,
        is_recurring: lower.contains("every") || date_info.contains(" - "),
    };

    // (pattern, capture group of the day)
    for (pattern, day) in [(&*WEEKDAY_DATE, 2), (&*PLAIN_DATE, 1)] {
        let matches: Vec<Captures> = pattern.captures_iter(date_info).collect();
        let (Some(first), Some(last)) = (matches.first(), matches.last()) else {
            continue;
        };

        match (captured_date(first, day), captured_date(last, day)) {
            (Some(start), Some(end)) => {
                dates.start = Some(start);
                dates.end = Some(end);
                break;
            }
            _ => warn!("could not parse date '{}'", date_info),
        }
    }

    dates
}

/// The region of the first known city named in `location`, or `Other`.
pub fn region_of(location: &str) -> &'static str {
    let lower = location.to_lowercase();
    CITY_REGIONS
        .iter()
        .find(|(city, _)| lower.contains(&city.to_lowercase()))
        .map_or("Other", |(_, region)| *region)
}

fn city_of(location: &str) -> Option<String> {
    CITY.find(location)
        .map(|m| m.as_str().trim().to_string())
        .filter(|c| !c.is_empty())
}

/// The parts of one `<item>` that end up in the table.
#[derive(Debug, Default)]
struct FeedItem {
    title: Option<String>,
    description: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    guid: Option<String>,
}

fn read_items(xml: &str) -> Result<Vec<FeedItem>, EtlError> {
    let parser = EventReader::new(xml.as_bytes());
    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut element = String::new();

    for event in parser {
        match event.map_err(|e| EtlError::Feed(e.to_string()))? {
            XmlEvent::StartElement { name, .. } => match name.local_name.as_str() {
                "item" => current = Some(FeedItem::default()),
                other => element = other.to_string(),
            },
            XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                let Some(item) = current.as_mut() else { continue };
                let field = match element.as_str() {
                    "title" => &mut item.title,
                    "description" => &mut item.description,
                    "link" => &mut item.link,
                    "pubDate" => &mut item.pub_date,
                    "guid" => &mut item.guid,
                    _ => continue,
                };
                field.get_or_insert_with(String::new).push_str(&text);
            }
            XmlEvent::EndElement { name } => {
                if name.local_name == "item" {
                    items.extend(current.take());
                }
                element.clear();
            }
            _ => {}
        }
    }

    Ok(items)
}

/// Builds `eventfinda_events` from the feed XML. Events with no start date, or
/// starting beyond the horizon from the audit's load time, are skipped.
pub fn events_table(xml: &str, audit: &Audit, report: &mut Report) -> Result<OutputTable, EtlError> {
    let items = read_items(xml)?;
    let cutoff = audit.load_timestamp + Duration::days(HORIZON_DAYS);

    let mut table = OutputTable::new("eventfinda_events", &COLUMNS);
    let mut categories: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut regions: BTreeMap<&'static str, usize> = BTreeMap::new();

    for item in &items {
        report.rows_read += 1;
        let (Some(title), Some(html)) = (item.title.as_deref(), item.description.as_deref()) else {
            report.drop_silently("missing title or description");
            continue;
        };

        let description = parse_description(html);
        let dates = description
            .date_info
            .as_deref()
            .map(parse_event_dates)
            .unwrap_or(EventDates {
                start: None,
                end: None,
                is_recurring: false,
            });
        let Some(start) = dates.start else {
            report.drop_silently("no start date");
            continue;
        };
        if start > cutoff.date() {
            report.drop_silently("beyond horizon");
            continue;
        }

        let event_id = item
            .guid
            .as_deref()
            .and_then(|guid| DIGITS.find(guid))
            .map(|m| m.as_str());
        let category = EVENT_CATEGORY.classify(&[title, &description.text]);
        let region = description.location.as_deref().map(region_of);
        let city = description.location.as_deref().and_then(city_of);

        *categories.entry(category).or_insert(0) += 1;
        if let Some(region) = region {
            *regions.entry(region).or_insert(0) += 1;
        }

        table.push(vec![
            Value::from(event_id),
            Value::from(title),
            Value::from(description.text.as_str()),
            Value::from(description.location.as_deref()),
            Value::from(description.date_info.as_deref()),
            Value::from(start),
            Value::from(dates.end),
            Value::from(dates.is_recurring),
            Value::from(category),
            Value::from(item.link.as_deref()),
            Value::from(item.pub_date.as_deref()),
            Value::from(region),
            Value::from(city),
        ]);
    }
    report.records_emitted += table.len();

    info!(events = table.len(), "processed RSS feed");
    for (category, count) in &categories {
        info!(category, count, "events by category");
    }
    for (region, count) in &regions {
        info!(region, count, "events by region");
    }

    Ok(table.with_audit(audit))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn audit() -> Audit {
        let now = NaiveDate::from_ymd_opt(2025, 8, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Audit::new(DATA_SOURCE, now).url(FEED_URL)
    }

    fn feed(items: &str) -> String {
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Upcoming</title>{items}</channel></rss>"#)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn should_split_location_and_date_from_description() {
        let parsed = parse_description(
            "<p>Live jazz&nbsp;on the waterfront.</p> Shed 6, Wellington | Sunday, 3 August 2025",
        );

        assert_eq!(parsed.text, "Live jazz on the waterfront.");
        assert_eq!(parsed.location.as_deref(), Some("Shed 6, Wellington"));
        assert_eq!(parsed.date_info.as_deref(), Some("Sunday, 3 August 2025"));

        let plain = parse_description("No location here");
        assert_eq!(plain.location, None);
        assert_eq!(plain.text, "No location here");
    }

    #[test]
    fn should_take_first_and_last_dates() {
        let range = parse_event_dates("Sunday, 3 August 2025 - Sunday, 31 August 2025");
        assert_eq!(range.start, Some(date(2025, 8, 3)));
        assert_eq!(range.end, Some(date(2025, 8, 31)));
        assert!(range.is_recurring);

        let single = parse_event_dates("12 September 2025");
        assert_eq!(single.start, Some(date(2025, 9, 12)));
        assert_eq!(single.end, single.start);
        assert!(!single.is_recurring);

        let weekly = parse_event_dates("Every Tuesday");
        assert_eq!(weekly.start, None);
        assert!(weekly.is_recurring);
    }

    #[test]
    fn should_map_locations_to_regions() {
        assert_eq!(region_of("Town Hall, Christchurch Central"), "Canterbury");
        assert_eq!(region_of("Somewhere, Upper Hutt"), "Wellington");
        assert_eq!(region_of("Queenstown"), "Other");
        assert_eq!(city_of("Shed 6, Wellington"), Some("Shed".to_string()));
    }

    #[test]
    fn should_build_events_within_horizon() {
        let xml = feed(
            r#"<item>
                 <title>Jazz by the Sea</title>
                 <link>https://www.eventfinda.co.nz/2025/jazz/wellington</link>
                 <description>&lt;p&gt;An evening concert.&lt;/p&gt; Shed 6, Wellington | Sunday, 3 August 2025</description>
                 <pubDate>Mon, 28 Jul 2025 10:00:00 +1200</pubDate>
                 <guid>https://www.eventfinda.co.nz/events/2841234</guid>
               </item>
               <item>
                 <title>Next Year Expo</title>
                 <description>Expo. Hamilton | 1 March 2026</description>
               </item>
               <item>
                 <title>Untimed</title>
                 <description>Something | whenever</description>
               </item>"#,
        );
        let mut report = Report::new("test");

        let table = events_table(&xml, &audit(), &mut report).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "event_id"), Some(&Value::from("2841234")));
        assert_eq!(table.value(0, "description"), Some(&Value::from("An evening concert.")));
        assert_eq!(table.value(0, "start_date"), Some(&Value::Date(date(2025, 8, 3))));
        assert_eq!(table.value(0, "category"), Some(&Value::from("Music & Performance")));
        assert_eq!(table.value(0, "region"), Some(&Value::from("Wellington")));
        assert_eq!(table.value(0, "is_recurring"), Some(&Value::Bool(false)));
        assert_eq!(table.value(0, "source_url"), Some(&Value::from(FEED_URL)));
        assert_eq!(report.dropped("beyond horizon"), 1);
        assert_eq!(report.dropped("no start date"), 1);
    }

    #[test]
    fn should_reject_malformed_xml() {
        let mut report = Report::new("test");
        let audit = Audit::new(DATA_SOURCE, NaiveDateTime::default());
        let result = events_table("<rss><channel>", &audit, &mut report);
        assert!(matches!(result, Err(EtlError::Feed(_))));
    }
}
