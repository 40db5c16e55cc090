//! Sequence metadata filtering for US human samples

use chrono::NaiveDate;
use cladetime_core::{CladetimeError, CladetimeResult};
use std::fmt;
use std::str::FromStr;

use crate::table::{quote_ident, quote_literal, LazyTable};

/// How `location` is rendered for a US state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateFormat {
    #[default]
    Abbr,
    Name,
    Fips,
}

impl FromStr for StateFormat {
    type Err = CladetimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abbr" => Ok(StateFormat::Abbr),
            "name" => Ok(StateFormat::Name),
            "fips" => Ok(StateFormat::Fips),
            other => Err(CladetimeError::InvalidInput(format!(
                "unknown state format {:?}; expected abbr, name or fips",
                other
            ))),
        }
    }
}

impl fmt::Display for StateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateFormat::Abbr => write!(f, "abbr"),
            StateFormat::Name => write!(f, "name"),
            StateFormat::Fips => write!(f, "fips"),
        }
    }
}

/// (name, abbreviation, FIPS code)
const STATES: &[(&str, &str, &str)] = &[
    ("Alabama", "AL", "01"),
    ("Alaska", "AK", "02"),
    ("Arizona", "AZ", "04"),
    ("Arkansas", "AR", "05"),
    ("California", "CA", "06"),
    ("Colorado", "CO", "08"),
    ("Connecticut", "CT", "09"),
    ("Delaware", "DE", "10"),
    ("District of Columbia", "DC", "11"),
    ("Florida", "FL", "12"),
    ("Georgia", "GA", "13"),
    ("Hawaii", "HI", "15"),
    ("Idaho", "ID", "16"),
    ("Illinois", "IL", "17"),
    ("Indiana", "IN", "18"),
    ("Iowa", "IA", "19"),
    ("Kansas", "KS", "20"),
    ("Kentucky", "KY", "21"),
    ("Louisiana", "LA", "22"),
    ("Maine", "ME", "23"),
    ("Maryland", "MD", "24"),
    ("Massachusetts", "MA", "25"),
    ("Michigan", "MI", "26"),
    ("Minnesota", "MN", "27"),
    ("Mississippi", "MS", "28"),
    ("Missouri", "MO", "29"),
    ("Montana", "MT", "30"),
    ("Nebraska", "NE", "31"),
    ("Nevada", "NV", "32"),
    ("New Hampshire", "NH", "33"),
    ("New Jersey", "NJ", "34"),
    ("New Mexico", "NM", "35"),
    ("New York", "NY", "36"),
    ("North Carolina", "NC", "37"),
    ("North Dakota", "ND", "38"),
    ("Ohio", "OH", "39"),
    ("Oklahoma", "OK", "40"),
    ("Oregon", "OR", "41"),
    ("Pennsylvania", "PA", "42"),
    ("Rhode Island", "RI", "44"),
    ("South Carolina", "SC", "45"),
    ("South Dakota", "SD", "46"),
    ("Tennessee", "TN", "47"),
    ("Texas", "TX", "48"),
    ("Utah", "UT", "49"),
    ("Vermont", "VT", "50"),
    ("Virginia", "VA", "51"),
    ("Washington", "WA", "53"),
    ("West Virginia", "WV", "54"),
    ("Wisconsin", "WI", "55"),
    ("Wyoming", "WY", "56"),
    ("Puerto Rico", "PR", "72"),
];

/// Nextstrain's spelling of the District of Columbia
const DC_ALIAS: &str = "Washington DC";

/// `(division, location)` pairs for every accepted division
pub fn state_locations(format: StateFormat) -> Vec<(&'static str, &'static str)> {
    let mut pairs: Vec<(&str, &str)> = STATES
        .iter()
        .map(|&(name, abbr, fips)| {
            let location = match format {
                StateFormat::Abbr => abbr,
                StateFormat::Name => name,
                StateFormat::Fips => fips,
            };
            (name, location)
        })
        .collect();
    let dc = match format {
        StateFormat::Abbr => "DC",
        StateFormat::Name => DC_ALIAS,
        StateFormat::Fips => "11",
    };
    pairs.push((DC_ALIAS, dc));
    pairs
}

pub const DEFAULT_FILTER_COLUMNS: &[&str] = &[
    "clade_nextstrain",
    "country",
    "date",
    "division",
    "genbank_accession",
    "genbank_accession_rev",
    "host",
];

const REQUIRED_COLUMNS: &[&str] = &["country", "date", "division", "host"];

/// Keep human samples from US states, DC and Puerto Rico.
///
/// `clade_nextstrain` is renamed to `clade`, `date` becomes a date (rows
/// whose date does not parse are dropped) and `division` is replaced by
/// `location`, rendered per `format`.
pub fn filter_sequence_metadata(
    metadata: &LazyTable,
    columns: Option<&[&str]>,
    format: StateFormat,
) -> CladetimeResult<LazyTable> {
    let columns = columns.unwrap_or(DEFAULT_FILTER_COLUMNS);
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !columns.contains(*c)) {
        return Err(CladetimeError::MissingColumn(format!(
            "{} is required to filter sequence metadata",
            missing
        )));
    }
    let selected = metadata.select_columns(columns)?;

    let engine = metadata.engine();
    let pairs = state_locations(format);
    let divisions: Vec<Option<&str>> = pairs.iter().map(|(d, _)| Some(*d)).collect();
    let locations: Vec<Option<&str>> = pairs.iter().map(|(_, l)| Some(*l)).collect();
    let states = engine.from_string_columns(&[("division", divisions), ("location", locations)])?;

    let date = format!("TRY_CAST(m.{} AS DATE)", quote_ident("date"));

    let mut select = Vec::new();
    for column in columns {
        match *column {
            "division" => {}
            "clade_nextstrain" => select.push(format!("m.{} AS {}", quote_ident(column), quote_ident("clade"))),
            "date" => select.push(format!("{} AS {}", date, quote_ident("date"))),
            other => select.push(format!("m.{}", quote_ident(other))),
        }
    }
    select.push(format!("s.{}", quote_ident("location")));

    engine.query(&[&selected, &states], |names| {
        format!(
            "SELECT {} FROM {} m JOIN {} s ON m.{} = s.{} \
             WHERE m.{} = {} AND m.{} = {} AND {} IS NOT NULL",
            select.join(", "),
            names[0],
            names[1],
            quote_ident("division"),
            quote_ident("division"),
            quote_ident("country"),
            quote_literal("USA"),
            quote_ident("host"),
            quote_literal("Homo sapiens"),
            date
        )
    })
}

/// Sequence counts by location, date and clade of filtered metadata
pub fn clade_counts(filtered: &LazyTable) -> CladetimeResult<LazyTable> {
    let grouped = filtered.select_columns(&["clade", "country", "date", "location", "host"])?;
    let engine = filtered.engine();
    engine.query(&[&grouped], |names| {
        format!(
            "SELECT \"location\", \"date\", \"clade\", COUNT(*) AS \"count\" FROM {} \
             GROUP BY \"location\", \"date\", \"clade\" ORDER BY \"location\", \"date\", \"clade\"",
            names[0]
        )
    })
}

/// Keep rows whose collection `date` falls within `[min, max]`; either
/// bound may be open
pub fn filter_collection_dates(
    filtered: &LazyTable,
    min: Option<NaiveDate>,
    max: Option<NaiveDate>,
) -> CladetimeResult<LazyTable> {
    if !filtered.has_column("date") {
        return Err(CladetimeError::MissingColumn("date".to_string()));
    }
    let mut conditions = Vec::new();
    if let Some(min) = min {
        conditions.push(format!("\"date\" >= DATE {}", quote_literal(&min.to_string())));
    }
    if let Some(max) = max {
        conditions.push(format!("\"date\" <= DATE {}", quote_literal(&max.to_string())));
    }
    if conditions.is_empty() {
        return Ok(filtered.clone());
    }
    let engine = filtered.engine();
    engine.query(&[filtered], |names| {
        format!("SELECT * FROM {} WHERE {}", names[0], conditions.join(" AND "))
    })
}
