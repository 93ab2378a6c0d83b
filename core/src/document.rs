use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use time::macros::format_description;
use time::{Date, Month};

/// One row of paper metadata as it arrives from the corpus loader.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub publish_time: Option<String>,
    #[serde(default, alias = "has_text", deserialize_with = "flag")]
    pub has_full_text: bool,
    #[serde(default)]
    pub full_text_file: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default, deserialize_with = "joined_text")]
    pub authors: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,
}

/// Derived boolean labels. `sars` and `covid_related` are never both set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tags {
    pub covid_related: bool,
    pub virus: bool,
    pub coronavirus: bool,
    pub sars: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    CovidRelated,
    Virus,
    Coronavirus,
    Sars,
}

impl Tag {
    pub const ALL: [Tag; 4] = [Tag::CovidRelated, Tag::Virus, Tag::Coronavirus, Tag::Sars];
}

impl Tags {
    pub fn get(&self, tag: Tag) -> bool {
        match tag {
            Tag::CovidRelated => self.covid_related,
            Tag::Virus => self.virus,
            Tag::Coronavirus => self.coronavirus,
            Tag::Sars => self.sars,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::CovidRelated => "covid_related",
            Tag::Virus => "virus",
            Tag::Coronavirus => "coronavirus",
            Tag::Sars => "sars",
        };
        f.write_str(name)
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "covid" | "covid_related" | "covid-related" => Ok(Tag::CovidRelated),
            "virus" => Ok(Tag::Virus),
            "coronavirus" | "corona" => Ok(Tag::Coronavirus),
            "sars" => Ok(Tag::Sars),
            other => Err(format!("unknown tag: {other}")),
        }
    }
}

/// A cleaned, tagged and tokenized paper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Source file identifier(s). Several may be bundled, separated by `;`.
    pub sha: Option<String>,
    pub title: Option<String>,
    /// Never absent: empty means the paper has no usable abstract.
    pub abstract_text: String,
    /// `None` means the date is unknown.
    pub published: Option<Date>,
    pub has_text: bool,
    pub full_text_file: Option<String>,
    pub doi: String,
    pub authors: String,
    pub journal: String,
    pub tokens: Vec<String>,
    pub tags: Tags,
    /// Comma-separated antiviral-looking terms, empty when none.
    pub antivirals: String,
}

impl Document {
    /// Every identifier bundled in `sha`, trimmed.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sha
            .as_deref()
            .into_iter()
            .flat_map(|s| s.split(';'))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.ids().any(|i| i == id)
    }

    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

/// Parse a `publish_time` value. Accepts `2020-03-14`, `2020-03`, `2020 Mar 14` and `2020`;
/// partial dates fall on the first of the month or year. Anything else is unknown.
pub fn parse_date(raw: &str) -> Option<Date> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = Date::parse(s, format_description!("[year]-[month]-[day padding:none]")) {
        return Some(d);
    }
    if let Ok(d) = Date::parse(s, format_description!("[year] [month repr:short case_sensitive:false] [day padding:none]")) {
        return Some(d);
    }
    let mut parts = s.split(|c: char| c == '-' || c == ' ');
    let year: i32 = parts.next()?.parse().ok()?;
    let month = match parts.next() {
        None => Month::January,
        Some(m) => month_from(m)?,
    };
    if parts.next().is_some() {
        return None;
    }
    Date::from_calendar_date(year, month, 1).ok()
}

fn month_from(s: &str) -> Option<Month> {
    if let Ok(n) = s.parse::<u8>() {
        return Month::try_from(n).ok();
    }
    let lower = s.to_lowercase();
    let months = [
        Month::January, Month::February, Month::March, Month::April, Month::May, Month::June,
        Month::July, Month::August, Month::September, Month::October, Month::November, Month::December,
    ];
    months.into_iter().find(|m| m.to_string().to_lowercase().starts_with(&lower) && lower.len() >= 3)
}

// Loaders disagree on booleans: JSON true, "True", 1.
fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    })
}

fn joined_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        ),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}
