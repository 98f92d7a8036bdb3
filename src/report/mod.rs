//! Gain plots
//!
//! Two figures are produced:
//!  - [OverviewChart]: gain of all the channels with a zoom on the valid ones (`_all_ch`)
//!  - [ModuleChart]: gain and # of peaks of the valid channels grouped by modules (`_valid_ch`)

use crate::{
    config::Config,
    loader::{GainLoader, GainTable},
    naming,
    records::{GainRecord, GroupKey, ModuleLabel},
};
use plotters::{drawing::DrawingAreaErrorKind, prelude::*};
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

mod modules;
mod overview;
pub use modules::ModuleChart;
pub use overview::OverviewChart;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("no valid channels to group by modules")]
    EmptyGroupSet,
    #[error("error from the plotters library")]
    Draw(#[from] DrawingAreaErrorKind<io::Error>),
    #[error("failed to save {1:?}")]
    Save(#[source] io::Error, PathBuf),
}
type Result<T> = std::result::Result<T, ReportError>;

/// A rendered figure
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    /// file name suffix
    pub suffix: &'static str,
    /// SVG document
    pub svg: String,
}
impl ChartArtifact {
    /// Returns the figure file name for a given stem
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}_{}.svg", stem, self.suffix)
    }
    /// Writes the figure into `dir`, creating `dir` if needed
    pub fn save<P: AsRef<Path>>(&self, dir: P, stem: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| ReportError::Save(e, dir.to_path_buf()))?;
        let path = dir.join(self.file_name(stem));
        fs::write(&path, &self.svg).map_err(|e| ReportError::Save(e, path.clone()))?;
        Ok(path)
    }
}

/// Marker shapes, drawn as filled polygons
///
/// A marker at `coord` is `EmptyElement::at(coord) + Polygon::new(marker.vertices(size), style)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Circle,
    Square,
    Diamond,
    TriangleDown,
    Cross,
    Hexagon,
    TriangleUp,
}
/// Markers cycled through by the module groups
pub const MARKERS: [Marker; 7] = [
    Marker::Circle,
    Marker::Square,
    Marker::Diamond,
    Marker::TriangleDown,
    Marker::Cross,
    Marker::Hexagon,
    Marker::TriangleUp,
];
impl Marker {
    /// Marker outline in pixels, relative to the marker position
    ///
    /// The y pixel axis points down.
    pub fn vertices(&self, size: i32) -> Vec<(i32, i32)> {
        let polygon = |n: usize, phase: f64| -> Vec<(i32, i32)> {
            (0..n)
                .map(|k| {
                    let a = phase + 2. * std::f64::consts::PI * k as f64 / n as f64;
                    (
                        (size as f64 * a.cos()).round() as i32,
                        (size as f64 * a.sin()).round() as i32,
                    )
                })
                .collect()
        };
        let arm = (size / 3).max(1);
        match self {
            Marker::Circle => polygon(16, 0.),
            Marker::Square => vec![(-size, -size), (size, -size), (size, size), (-size, size)],
            Marker::Diamond => vec![(0, -size), (size, 0), (0, size), (-size, 0)],
            Marker::TriangleDown => polygon(3, std::f64::consts::FRAC_PI_2),
            Marker::TriangleUp => polygon(3, -std::f64::consts::FRAC_PI_2),
            Marker::Hexagon => polygon(6, std::f64::consts::FRAC_PI_2),
            Marker::Cross => vec![
                (-arm, -size),
                (arm, -size),
                (arm, -arm),
                (size, -arm),
                (size, arm),
                (arm, arm),
                (arm, size),
                (-arm, size),
                (-arm, arm),
                (-size, arm),
                (-size, -arm),
                (-arm, -arm),
            ],
        }
    }
}

/// Light colors of the tab20 palette, the dark ones are `colorous::CATEGORY10`
const TAB20_LIGHT: [RGBColor; 10] = [
    RGBColor(174, 199, 232),
    RGBColor(255, 187, 120),
    RGBColor(152, 223, 138),
    RGBColor(255, 152, 150),
    RGBColor(197, 176, 213),
    RGBColor(196, 156, 148),
    RGBColor(247, 182, 210),
    RGBColor(199, 199, 199),
    RGBColor(219, 219, 141),
    RGBColor(158, 218, 229),
];
/// # of colors cycled through by the module groups
pub const N_COLORS: usize = 20;

/// Returns the color of the tab20 palette at `index`, wrapping around
pub fn palette_color(index: usize) -> RGBColor {
    let index = index % N_COLORS;
    if index % 2 == 0 {
        let color = colorous::CATEGORY10[index / 2];
        RGBColor(color.r, color.g, color.b)
    } else {
        TAB20_LIGHT[index / 2]
    }
}

/// Marker and color of the `index`th group
pub fn group_style(index: usize) -> (Marker, RGBColor) {
    (MARKERS[index % MARKERS.len()], palette_color(index))
}

/// Groups records by the module label selected with `key`, in ascending label order
pub fn group_by_module(
    records: &[GainRecord],
    key: GroupKey,
) -> BTreeMap<ModuleLabel, Vec<&GainRecord>> {
    let mut groups: BTreeMap<ModuleLabel, Vec<&GainRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.module(key).clone())
            .or_default()
            .push(record);
    }
    groups
}

/// Gain axis tick spacing of the module figure: `floor((max - min) / 5)`
pub fn gain_tick_spacing(valid: &[GainRecord]) -> Result<u64> {
    if valid.is_empty() {
        return Err(ReportError::EmptyGroupSet);
    }
    let (min, max) = min_max(valid.iter().map(|r| r.gain));
    Ok(((max - min) / 5f64).floor() as u64)
}

/// Horizontal position (axes fraction) of the valid channels inset
///
/// The inset goes left when the valid channels crowd the right side of the axes.
/// Returns `None` if there isn't any valid channel.
pub fn inset_x0(valid: &[GainRecord]) -> Option<f64> {
    let min = valid.iter().map(|r| r.channel).min()?;
    let max = valid.iter().map(|r| r.channel).max()?;
    let ratio = if max == 0 {
        0f64
    } else {
        min as f64 / max as f64
    };
    Some(if ratio > 0.5 { 0.1 } else { 0.5 })
}

pub(crate) fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    })
}

/// Expands `[lo,hi]` to multiples of `step`, returns the range and the # of ticks
pub(crate) fn tick_range(lo: f64, hi: f64, step: f64) -> (f64, f64, usize) {
    let (lo, hi) = if lo.is_finite() && hi.is_finite() {
        (lo, hi)
    } else {
        (0f64, 0f64)
    };
    let start = (lo / step).floor() * step;
    let mut end = (hi / step).ceil() * step;
    if end <= start {
        end = start + step;
    }
    (start, end, ((end - start) / step).round() as usize + 1)
}

/// Calibration report: channels table and figures
pub struct GainReport {
    pub stem: String,
    pub group_key: GroupKey,
    pub table: GainTable,
    pub charts: Vec<ChartArtifact>,
}
impl GainReport {
    /// Loads the calibration results and renders the figures
    ///
    /// The module figure is rendered only if `debug` is set. The module label
    /// follows `group_key` or, if `None`, the file name prefix.
    pub fn build<P: AsRef<Path>>(
        path: P,
        config: &Config,
        debug: bool,
        group_key: Option<GroupKey>,
    ) -> crate::Result<Self> {
        let path = path.as_ref();
        let stem = naming::derive_output_stem(path)?;
        let group_key = group_key
            .or_else(|| naming::group_key(path))
            .unwrap_or_else(|| {
                log::warn!(
                    "no module grouping for {:?}, defaulting to {}",
                    path,
                    GroupKey::Acl
                );
                GroupKey::Acl
            });
        let table = GainLoader::default()
            .connections_path(config.connections_path())
            .load(path)?;
        if debug && table.valid.is_empty() {
            return Err(ReportError::EmptyGroupSet.into());
        }
        let mut charts = vec![OverviewChart::new(config).render(
            &table.valid,
            &table.pedestal_only,
            &table.inactive,
        )?];
        if debug {
            charts.push(ModuleChart::new(config).render(&table.valid, group_key)?);
        }
        Ok(Self {
            stem,
            group_key,
            table,
            charts,
        })
    }
    /// Writes all the figures into `dir`
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> crate::Result<Vec<PathBuf>> {
        let paths = self
            .charts
            .iter()
            .map(|chart| chart.save(dir.as_ref(), &self.stem))
            .collect::<Result<Vec<PathBuf>>>()?;
        Ok(paths)
    }
}

/// Returns the rendered value, or `None` if the host has no font to lay out the text with
#[cfg(test)]
pub(crate) fn with_fonts<T, E>(result: std::result::Result<T, E>) -> Option<T>
where
    E: std::fmt::Debug,
{
    match result {
        Ok(value) => Some(value),
        Err(e) if format!("{:?}", e).contains("FontError") => {
            eprintln!("no system font available, skipping: {:?}", e);
            None
        }
        Err(e) => panic!("rendering failed: {:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::{error::Error as _, fs::File, io::Write};

    fn record(channel: u32, peaks: u32, gain: f64, acl: &str, lcm: &str) -> GainRecord {
        GainRecord {
            channel,
            peaks,
            gain,
            gain_error: 0.,
            offset: 0.,
            offset_error: 0.,
            acl: acl.into(),
            lcm: lcm.into(),
        }
    }

    #[test]
    fn tick_spacing() {
        let valid: Vec<_> = [10.0, 20.0, 30.0, 40.0, 60.0]
            .into_iter()
            .enumerate()
            .map(|(i, g)| record(i as u32, 3, g, "1", "1"))
            .collect();
        assert_eq!(gain_tick_spacing(&valid).unwrap(), 10);
        assert_eq!(gain_tick_spacing(&valid[..1]).unwrap(), 0);
        assert!(matches!(
            gain_tick_spacing(&[]),
            Err(ReportError::EmptyGroupSet)
        ));
    }

    #[test]
    fn inset_placement() {
        // valid channels on the right side: inset on the left
        let right: Vec<_> = (40..60).map(|c| record(c, 3, 1000., "1", "1")).collect();
        assert_eq!(inset_x0(&right), Some(0.1));
        // spread over all the channels: inset on the right
        let spread: Vec<_> = (5..60).map(|c| record(c, 3, 1000., "1", "1")).collect();
        assert_eq!(inset_x0(&spread), Some(0.5));
        // min/max == 0.5 exactly is not above the threshold
        let half = vec![record(30, 3, 1000., "1", "1"), record(60, 3, 1000., "1", "1")];
        assert_eq!(inset_x0(&half), Some(0.5));
        assert_eq!(inset_x0(&[record(0, 3, 1000., "1", "1")]), Some(0.5));
        assert_eq!(inset_x0(&[]), None);
    }

    #[test]
    fn groups_in_natural_order() {
        let valid = vec![
            record(0, 3, 1000., "10", "B"),
            record(1, 3, 1010., "2", "A"),
            record(2, 3, 1020., "10", "A"),
            record(3, 3, 1030., "1", "B"),
        ];
        let groups = group_by_module(&valid, GroupKey::Acl);
        let labels: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(
            labels,
            vec![
                ModuleLabel::Number(1),
                ModuleLabel::Number(2),
                ModuleLabel::Number(10)
            ]
        );
        let channels: Vec<_> = groups[&ModuleLabel::Number(10)]
            .iter()
            .map(|r| r.channel)
            .collect();
        assert_eq!(channels, vec![0, 2]);
        let groups = group_by_module(&valid, GroupKey::Lcm);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&ModuleLabel::Name("A".into())].len(), 2);
    }

    #[test]
    fn palette_wraps_around() {
        assert_eq!(group_style(0), (Marker::Circle, RGBColor(31, 119, 180)));
        assert_eq!(group_style(1).1, RGBColor(174, 199, 232));
        assert_eq!(group_style(7).0, group_style(0).0);
        assert_ne!(group_style(7).1, group_style(0).1);
        assert_eq!(group_style(20).1, group_style(0).1);
        assert_eq!(group_style(140), group_style(0));
        let colors: std::collections::HashSet<_> = (0..N_COLORS)
            .map(|i| {
                let RGBColor(r, g, b) = palette_color(i);
                (r, g, b)
            })
            .collect();
        assert_eq!(colors.len(), N_COLORS);
    }

    #[test]
    fn marker_outlines() {
        for marker in MARKERS {
            let vertices = marker.vertices(5);
            assert!(vertices.len() >= 3, "{:?}", marker);
            assert!(vertices
                .iter()
                .all(|&(x, y)| x.abs() <= 5 && y.abs() <= 5));
        }
        assert_eq!(Marker::Circle.vertices(5).len(), 16);
        assert_eq!(Marker::Cross.vertices(5).len(), 12);
        assert_ne!(
            Marker::TriangleUp.vertices(5),
            Marker::TriangleDown.vertices(5)
        );
    }

    #[test]
    fn ticks() {
        assert_eq!(tick_range(-5., 1234., 500.), (-500., 1500., 5));
        assert_eq!(tick_range(0., 0., 500.), (0., 500., 2));
        assert_eq!(tick_range(f64::INFINITY, f64::NEG_INFINITY, 1.), (0., 1., 2));
    }

    #[test]
    fn empty_group_set_aborts_the_report() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempfile::tempdir()?;
        let gain_path = dir.path().join("ACL_0cd913fb_20220207_054800.csv");
        let connections_path = dir.path().join("connections.csv");
        File::create(&gain_path)?
            .write_all(b"Channel,Peaks,Gain,Error_g,Offset,Error_o\n0,1,-1,0,0,0\n1,0,0,0,0,0\n")?;
        File::create(&connections_path)?.write_all(b"ACL,LCM\n1,1\n1,2\n")?;
        let config = Config::default()
            .connections(&connections_path)
            .output_dir(dir.path().join("plots"));
        let result = GainReport::build(&gain_path, &config, true, None);
        assert!(matches!(
            result,
            Err(Error::Report(ReportError::EmptyGroupSet))
        ));
        assert!(!dir.path().join("plots").exists());
        Ok(())
    }

    #[test]
    fn report_with_module_chart() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let gain_path = dir.path().join("LCM_0cd913fb_20220207_054800.csv");
        let connections_path = dir.path().join("connections.csv");
        File::create(&gain_path)?.write_all(
            b"Channel,Peaks,Gain,Error_g,Offset,Error_o
4,3,1200,3,10,1
5,4,1250,3,10,1
6,1,-1,0,0,0
7,0,0,0,0,0
8,5,1300,3,10,1
",
        )?;
        File::create(&connections_path)?
            .write_all(b"ACL,LCM\n1,north\n1,north\n2,south\n2,south\n3,south\n")?;
        let config = Config::default().connections(&connections_path);
        let Some(report) = with_fonts(GainReport::build(&gain_path, &config, true, None)) else {
            return Ok(());
        };
        assert_eq!(report.stem, "LCM_20220207_054800");
        assert_eq!(report.group_key, GroupKey::Lcm);
        let suffixes: Vec<_> = report.charts.iter().map(|c| c.suffix).collect();
        assert_eq!(suffixes, vec!["all_ch", "valid_ch"]);
        assert!(report.charts[1].svg.contains("north"));
        assert!(report.charts[1].svg.contains("south"));
        let paths = report.save(dir.path().join("plots"))?;
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.is_file()));
        assert!(dir
            .path()
            .join("plots/LCM_20220207_054800_valid_ch.svg")
            .is_file());
        Ok(())
    }

    #[test]
    fn invalid_file_name_aborts_the_report() {
        let result = GainReport::build("badname.csv", &Config::default(), false, None);
        match result {
            Err(err @ Error::Naming(_)) => assert!(err.source().is_some()),
            _ => panic!("expected a naming error"),
        }
    }

    #[test]
    fn save_artifact() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let artifact = ChartArtifact {
            suffix: "all_ch",
            svg: String::from("<svg></svg>"),
        };
        let path = artifact.save(dir.path().join("plots/SiPM_gain"), "ACL_20220207_054800")?;
        assert_eq!(
            path.file_name().and_then(|f| f.to_str()),
            Some("ACL_20220207_054800_all_ch.svg")
        );
        assert_eq!(std::fs::read_to_string(path)?, "<svg></svg>");
        Ok(())
    }
}
