//! Walk the XML item directory and decode the data segment.
//!
//! The directory is a flat list of
//! `<item name="..." type="..." size="N"/>` elements. There
//! are no offsets in it: the value of an item lives at the
//! sum of the sizes of all items before it. The walker
//! therefore threads a single [`FieldCursor`] through the
//! entries and advances it by every entry's declared size,
//! whether or not the entry is understood.
use chrono::{DateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::bytes::{CaptureMatches, Regex};
use tracing::{debug, trace, warn};

use crate::{
    container::Segments,
    error::Result,
    parse::{read_le_at, read_le_seq},
    temperature::kelvin_to_celsius,
};

/// Bytes of uninterpreted header ahead of `Ir` readings.
pub const IR_HEADER_SIZE: usize = 24;

/// Accepted range for `DateTime`, in Unix seconds.
pub const DATE_TIME_WINDOW: std::ops::Range<u32> = 946_684_800..2_000_000_000;

/// One `<item>` of the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub ty: String,
    pub size: usize,
}

/// Iterator over directory entries in document order.
pub struct Entries<'a> {
    matches: CaptureMatches<'static, 'a>,
}

impl<'a> Entries<'a> {
    pub fn new(xml: &'a [u8]) -> Self {
        lazy_static! {
            static ref ITEM: Regex =
                Regex::new(r#"<item name="([^"]+)" type="([^"]+)" size="(\d+)""#).unwrap();
        }
        Entries {
            matches: ITEM.captures_iter(xml),
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<DirectoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.matches.next()?;
        let text = |i: usize| String::from_utf8_lossy(&caps[i]).into_owned();

        let name = text(1);
        let size = match text(3).parse() {
            Ok(s) => s,
            Err(_) => {
                return Some(Err(crate::error::BmtError::format(format!(
                    "item `{}` has an invalid size",
                    name
                ))))
            }
        };
        Some(Ok(DirectoryEntry {
            name,
            ty: text(2),
            size,
        }))
    }
}

/// Position of the next value in the data segment.
#[derive(Debug)]
pub struct FieldCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> FieldCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        FieldCursor { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Decode `entry` at the current offset, then step past
    /// its declared size. The step happens for unknown
    /// entries too.
    pub fn next_field(&mut self, entry: &DirectoryEntry) -> Result<Field> {
        let field = Field::decode(entry, self.data, self.offset)?;
        self.offset = self.offset.saturating_add(entry.size);
        Ok(field)
    }
}

/// A decoded directory entry. Temperatures are in °C.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    TempMax(f64),
    TempMin(f64),
    Emissivity(f64),
    ReflectedTemperature(f64),
    /// A `Temp` or `Temperature` item.
    Temperature(f64),
    /// `None` if outside [`DATE_TIME_WINDOW`].
    DateTime(Option<DateTime<Utc>>),
    /// `None` if the item holds no readings.
    Ir(Option<RawStats>),
    Unknown,
}

impl Field {
    fn decode(entry: &DirectoryEntry, data: &[u8], offset: usize) -> Result<Self> {
        let name = entry.name.as_str();
        let float = || read_le_at::<f32>(data, offset, name);
        let celsius = || -> Result<f64> { Ok(kelvin_to_celsius(float()?)) };

        Ok(match name {
            "TempMax" => Field::TempMax(celsius()?),
            "TempMin" => Field::TempMin(celsius()?),
            "EmissivityValue" => Field::Emissivity(float()? as f64),
            "ReflectedTemperature" => Field::ReflectedTemperature(celsius()?),
            "Temp" | "Temperature" => Field::Temperature(celsius()?),
            "DateTime" => {
                let secs: u32 = read_le_at(data, offset, name)?;
                if DATE_TIME_WINDOW.contains(&secs) {
                    Field::DateTime(Utc.timestamp_opt(secs as i64, 0).single())
                } else {
                    warn!("ignoring DateTime outside sanity window: {}", secs);
                    Field::DateTime(None)
                }
            }
            "Ir" => {
                format_ensure!(
                    entry.size >= IR_HEADER_SIZE,
                    "Ir item declares {} bytes, shorter than its {} byte header",
                    entry.size,
                    IR_HEADER_SIZE
                );
                let count = (entry.size - IR_HEADER_SIZE) / 2;
                let start = offset.saturating_add(IR_HEADER_SIZE);
                let readings = read_le_seq::<i16>(data, start, count, name)?;
                Field::Ir(RawStats::from_readings(readings))
            }
            _ => {
                trace!("skipping `{}` ({} bytes) at {}", name, entry.size, offset);
                Field::Unknown
            }
        })
    }
}

/// Raw sensor readings with their extremes.
///
/// Indices are linear positions into `readings`; on ties
/// the first occurrence wins.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStats {
    pub min: i16,
    pub max: i16,
    pub min_index: usize,
    pub max_index: usize,
    pub readings: Vec<i16>,
}

impl RawStats {
    pub fn from_readings(readings: Vec<i16>) -> Option<Self> {
        let first = *readings.first()?;
        let mut stats = RawStats {
            min: first,
            max: first,
            min_index: 0,
            max_index: 0,
            readings: vec![],
        };
        for (i, &v) in readings.iter().enumerate() {
            if v < stats.min {
                stats.min = v;
                stats.min_index = i;
            }
            if v > stats.max {
                stats.max = v;
                stats.max_index = i;
            }
        }
        stats.readings = readings;
        Some(stats)
    }

    pub fn pixel_count(&self) -> usize {
        self.readings.len()
    }
}

/// Everything the walker recognized, in °C where
/// applicable. Absent items stay `None`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Fields {
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub center_temperature: Option<f64>,
    pub reflected_temperature: Option<f64>,
    pub emissivity: Option<f64>,
    pub date_time: Option<DateTime<Utc>>,
    pub raw: Option<RawStats>,
}

impl Fields {
    /// Walk the whole directory against the data segment.
    pub fn walk(segments: &Segments) -> Result<Self> {
        let mut cursor = FieldCursor::new(segments.data);
        let mut fields = Fields::default();
        let mut count = 0;

        for entry in Entries::new(segments.xml) {
            let entry = entry?;
            trace!("item `{}` at data offset {}", entry.name, cursor.offset());
            let field = cursor.next_field(&entry)?;
            fields.absorb(field);
            count += 1;
        }

        debug!(
            "walked {} items, {} of {} data bytes addressed",
            count,
            cursor.offset(),
            segments.data.len()
        );
        Ok(fields)
    }

    fn absorb(&mut self, field: Field) {
        match field {
            Field::TempMax(t) => self.temp_max = Some(t),
            Field::TempMin(t) => self.temp_min = Some(t),
            Field::Emissivity(e) => self.emissivity = Some(e),
            Field::ReflectedTemperature(t) => self.reflected_temperature = Some(t),
            Field::Temperature(t) => {
                self.center_temperature.get_or_insert(t);
            }
            Field::DateTime(Some(dt)) => self.date_time = Some(dt),
            Field::Ir(Some(raw)) => self.raw = Some(raw),
            Field::DateTime(None) | Field::Ir(None) | Field::Unknown => {}
        }
    }
}
