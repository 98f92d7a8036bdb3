use crate::records::{Category, ConnectionRecord, GainRecord, ModuleLabel};
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
    time::Instant,
};
use strum::IntoEnumIterator;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open {1:?}")]
    Open(#[source] io::Error, PathBuf),
    #[error("malformed input in {table} table: {reason}")]
    MalformedInput { table: &'static str, reason: String },
    #[error("gain and connections tables are not aligned: {0}")]
    Alignment(String),
    #[error("failed to read the CSV file")]
    Csv(#[from] csv::Error),
}
type Result<T> = std::result::Result<T, LoadError>;

const GAIN_TABLE: &str = "gain";
const CONNECTIONS_TABLE: &str = "connections";

/// Gain table columns (with aliases)
const GAIN_COLUMNS: [&[&str]; 6] = [
    &["Channel"],
    &["Peaks", "# Peaks"],
    &["Gain"],
    &["Error_g"],
    &["Offset"],
    &["Error_o"],
];
/// Connections table columns
const CONNECTIONS_COLUMNS: [&[&str]; 2] = [&["ACL"], &["LCM"]];

#[derive(Deserialize, Debug)]
struct GainRow {
    #[serde(rename = "Channel")]
    channel: u32,
    #[serde(rename = "Peaks", alias = "# Peaks")]
    peaks: f64,
    #[serde(rename = "Gain")]
    gain: f64,
    #[serde(rename = "Error_g")]
    gain_error: f64,
    #[serde(rename = "Offset")]
    offset: f64,
    #[serde(rename = "Error_o")]
    offset_error: f64,
}

#[derive(Deserialize, Debug)]
struct ConnectionRow {
    #[serde(rename = "Channel", default)]
    channel: Option<u32>,
    #[serde(rename = "ACL")]
    acl: ModuleLabel,
    #[serde(rename = "LCM")]
    lcm: ModuleLabel,
}

fn malformed(table: &'static str, reason: impl ToString) -> LoadError {
    LoadError::MalformedInput {
        table,
        reason: reason.to_string(),
    }
}

/// Checks that every column is present in the header, under one of its aliases
fn check_columns(
    table: &'static str,
    headers: &csv::StringRecord,
    columns: &[&[&str]],
) -> Result<()> {
    for aliases in columns {
        if !headers.iter().any(|h| aliases.contains(&h)) {
            return Err(malformed(
                table,
                format!("missing column `{}` in header {:?}", aliases[0], headers),
            ));
        }
    }
    Ok(())
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn read_gains<R: Read>(reader: R) -> Result<Vec<GainRow>> {
    let mut rdr = csv_reader(reader);
    check_columns(GAIN_TABLE, rdr.headers()?, &GAIN_COLUMNS)?;
    let mut channels = HashSet::new();
    let mut rows = vec![];
    for (k, result) in rdr.deserialize::<GainRow>().enumerate() {
        let row = result.map_err(|e| malformed(GAIN_TABLE, format!("row #{}: {}", k + 1, e)))?;
        if row.gain.is_nan() {
            return Err(malformed(
                GAIN_TABLE,
                format!("row #{}: channel {} gain is NaN", k + 1, row.channel),
            ));
        }
        if row.peaks < 0f64 || row.peaks.fract() != 0f64 {
            return Err(malformed(
                GAIN_TABLE,
                format!("row #{}: invalid # of peaks {}", k + 1, row.peaks),
            ));
        }
        if !channels.insert(row.channel) {
            return Err(malformed(
                GAIN_TABLE,
                format!("row #{}: duplicated channel {}", k + 1, row.channel),
            ));
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Connections table rows, keyed by channel if the table has a `Channel` column
enum Connections {
    Keyed(Vec<ConnectionRecord>),
    Positional(Vec<(ModuleLabel, ModuleLabel)>),
}
impl Connections {
    fn len(&self) -> usize {
        match self {
            Connections::Keyed(records) => records.len(),
            Connections::Positional(labels) => labels.len(),
        }
    }
}

/// Reads the connections table
///
/// Without a `Channel` column, row `k` maps the gain table row `k`.
fn read_connections<R: Read>(reader: R) -> Result<Connections> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers()?;
    check_columns(CONNECTIONS_TABLE, headers, &CONNECTIONS_COLUMNS)?;
    let keyed = headers.iter().any(|h| h == "Channel");
    let mut channels = HashSet::new();
    let mut records = vec![];
    let mut labels = vec![];
    for (k, result) in rdr.deserialize::<ConnectionRow>().enumerate() {
        let row = result
            .map_err(|e| malformed(CONNECTIONS_TABLE, format!("row #{}: {}", k + 1, e)))?;
        if !keyed {
            labels.push((row.acl, row.lcm));
            continue;
        }
        let channel = row
            .channel
            .ok_or_else(|| malformed(CONNECTIONS_TABLE, format!("row #{}: missing channel", k + 1)))?;
        if !channels.insert(channel) {
            return Err(malformed(
                CONNECTIONS_TABLE,
                format!("row #{}: duplicated channel {}", k + 1, channel),
            ));
        }
        records.push(ConnectionRecord {
            channel,
            acl: row.acl,
            lcm: row.lcm,
        });
    }
    Ok(if keyed {
        Connections::Keyed(records)
    } else {
        Connections::Positional(labels)
    })
}

fn gain_record(row: GainRow, acl: ModuleLabel, lcm: ModuleLabel) -> GainRecord {
    GainRecord {
        channel: row.channel,
        peaks: row.peaks as u32,
        gain: row.gain,
        gain_error: row.gain_error,
        offset: row.offset,
        offset_error: row.offset_error,
        acl,
        lcm,
    }
}

/// Joins the gain rows with the connections, on the channel number or row by row
fn join(gains: Vec<GainRow>, connections: Connections) -> Result<Vec<GainRecord>> {
    if gains.len() != connections.len() {
        return Err(LoadError::Alignment(format!(
            "{} rows in the gain table but {} rows in the connections table",
            gains.len(),
            connections.len()
        )));
    }
    match connections {
        Connections::Positional(labels) => Ok(gains
            .into_iter()
            .zip(labels)
            .map(|(row, (acl, lcm))| gain_record(row, acl, lcm))
            .collect()),
        Connections::Keyed(records) => {
            let mut lookup: HashMap<u32, ConnectionRecord> = records
                .into_iter()
                .map(|record| (record.channel, record))
                .collect();
            gains
                .into_iter()
                .map(|row| {
                    let ConnectionRecord { acl, lcm, .. } =
                        lookup.remove(&row.channel).ok_or_else(|| {
                            LoadError::Alignment(format!(
                                "channel {} is missing from the connections table",
                                row.channel
                            ))
                        })?;
                    Ok(gain_record(row, acl, lcm))
                })
                .collect()
        }
    }
}

/// Calibration results split by channel categories
#[derive(Debug, Default, Clone)]
pub struct GainTable {
    /// all the channels in file order
    pub records: Vec<GainRecord>,
    /// channels with `gain > 0`
    pub valid: Vec<GainRecord>,
    /// channels with `gain < 0`
    pub pedestal_only: Vec<GainRecord>,
    /// channels with `gain == 0`
    pub inactive: Vec<GainRecord>,
}
impl From<Vec<GainRecord>> for GainTable {
    fn from(records: Vec<GainRecord>) -> Self {
        let mut table = GainTable::default();
        for record in records.iter() {
            match record.category() {
                Category::Valid => table.valid.push(record.clone()),
                Category::PedestalOnly => table.pedestal_only.push(record.clone()),
                Category::Inactive => table.inactive.push(record.clone()),
            }
        }
        table.records = records;
        table
    }
}
impl GainTable {
    /// Loads the gain table and joins it with the connections table
    pub fn load<P, Q>(gain_path: P, connections_path: Q) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        GainLoader::default()
            .connections_path(connections_path)
            .load(gain_path)
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    /// Returns the channels of a given category
    pub fn category(&self, category: Category) -> &[GainRecord] {
        match category {
            Category::Valid => &self.valid,
            Category::PedestalOnly => &self.pedestal_only,
            Category::Inactive => &self.inactive,
        }
    }
    pub fn summary(&self) {
        let n = self.valid.len() as f64;
        let gains = || self.valid.iter().map(|r| r.gain);
        println!("SUMMARY:");
        println!(" - # of channels: {}", self.len());
        for category in Category::iter() {
            println!(" - {:17}: {}", category, self.category(category).len());
        }
        if !self.valid.is_empty() {
            let mean = gains().sum::<f64>() / n;
            let std = (gains().map(|x| x - mean).fold(0f64, |s, x| s + x * x) / n).sqrt();
            let min = gains().fold(f64::INFINITY, f64::min);
            let max = gains().fold(f64::NEG_INFINITY, f64::max);
            println!(
                "    {:^16}: ({:^12}, {:^12})  ({:^12}, {:^12})",
                "", "MEAN", "STD", "MIN", "MAX"
            );
            println!(
                "  - {:16}: {:>12.3?}  {:>12.3?}",
                "Gain [ADC/p.e.]",
                (mean, std),
                (min, max)
            );
        }
    }
}

/// Gain table loader
pub struct GainLoader {
    connections: PathBuf,
}
impl Default for GainLoader {
    fn default() -> Self {
        Self {
            connections: PathBuf::from(crate::config::CONNECTIONS),
        }
    }
}
impl GainLoader {
    pub fn connections_path<P: AsRef<Path>>(self, connections: P) -> Self {
        Self {
            connections: connections.as_ref().to_path_buf(),
        }
    }
    pub fn load<P: AsRef<Path>>(self, gain_path: P) -> Result<GainTable> {
        let gain_path = gain_path.as_ref();
        log::info!("Loading {:?}...", gain_path);
        let now = Instant::now();
        let gains = File::open(gain_path).map_err(|e| LoadError::Open(e, gain_path.into()))?;
        let connections = File::open(&self.connections)
            .map_err(|e| LoadError::Open(e, self.connections.clone()))?;
        let table = Self::from_readers(gains, connections)?;
        log::info!(
            "... loaded {} channels in {}ms",
            table.len(),
            now.elapsed().as_millis()
        );
        Ok(table)
    }
    /// Loads the gain and connections tables from any CSV readers
    pub fn from_readers<G: Read, C: Read>(gains: G, connections: C) -> Result<GainTable> {
        let gains = read_gains(gains)?;
        let connections = read_connections(connections)?;
        Ok(join(gains, connections)?.into())
    }
}
