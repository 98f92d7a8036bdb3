use super::{
    gain_tick_spacing, group_by_module, group_style,
    overview::{CHANNEL_LABEL, CHANNEL_TICK, GAIN_LABEL, MARKER_SIZE},
    tick_range, ChartArtifact, Result,
};
use crate::{
    config::Config,
    records::{GainRecord, GroupKey, ModuleLabel},
};
use plotters::{coord::Shift, drawing::DrawingAreaErrorKind, prelude::*};
use std::collections::BTreeMap;

type Groups<'a> = BTreeMap<ModuleLabel, Vec<&'a GainRecord>>;

/// Gain and # of peaks versus channel number of the valid channels grouped by modules
pub struct ModuleChart {
    size: (u32, u32),
}
impl ModuleChart {
    pub fn new(config: &Config) -> Self {
        Self {
            size: config.modules_size,
        }
    }
    pub fn render(&self, valid: &[GainRecord], group_key: GroupKey) -> Result<ChartArtifact> {
        let spacing = gain_tick_spacing(valid)?;
        let groups = group_by_module(valid, group_key);
        log::info!(
            "{} valid channels in {} {} modules",
            valid.len(),
            groups.len(),
            group_key
        );

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.size).into_drawing_area();
            root.fill(&WHITE)?;
            let (gain_panel, peaks_panel) = root.split_horizontally((self.size.0 / 2) as i32);
            draw_panel(
                &gain_panel,
                &groups,
                |r| r.gain,
                (spacing as f64).max(1f64),
                GAIN_LABEL,
                false,
            )?;
            draw_panel(
                &peaks_panel,
                &groups,
                |r| r.peaks as f64,
                1f64,
                "# fitted peaks",
                true,
            )?;
            root.present()?;
        }
        Ok(ChartArtifact {
            suffix: "valid_ch",
            svg,
        })
    }
}

/// Draws `value` versus channel number for each group
fn draw_panel<DB, F>(
    area: &DrawingArea<DB, Shift>,
    groups: &Groups<'_>,
    value: F,
    y_step: f64,
    y_desc: &str,
    legend: bool,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>>
where
    DB: DrawingBackend,
    F: Fn(&GainRecord) -> f64,
{
    let records = || groups.values().flatten();
    let (c_min, c_max) = super::min_max(records().map(|r| r.channel as f64));
    let (v_min, v_max) = super::min_max(records().map(|&r| value(r)));
    let (y_lo, y_hi, n_y) = tick_range(v_min, v_max, y_step);
    let (x_lo, x_hi, n_x) = tick_range(c_min - 1f64, c_max + 1f64, CHANNEL_TICK);

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n_x)
        .y_labels(n_y)
        .x_desc(CHANNEL_LABEL)
        .y_desc(y_desc)
        .label_style(("sans-serif", 14))
        .draw()?;

    for (index, (label, group)) in groups.iter().enumerate() {
        let (marker, color) = group_style(index);
        let points: Vec<(f64, f64)> = group
            .iter()
            .map(|&r| (r.channel as f64, value(r)))
            .collect();
        chart.draw_series(LineSeries::new(
            points.iter().cloned(),
            color.mix(0.4).stroke_width(2),
        ))?;
        let style = color.filled();
        let vertices = marker.vertices(MARKER_SIZE);
        let anno = chart.draw_series(
            points
                .iter()
                .map(|&point| EmptyElement::at(point) + Polygon::new(vertices.clone(), style)),
        )?;
        if legend {
            anno.label(label.to_string()).legend(move |coord| {
                EmptyElement::at(coord) + Polygon::new(vertices.clone(), style)
            });
        }
    }

    if legend {
        chart
            .configure_series_labels()
            .border_style(&WHITE.mix(0.0))
            .background_style(&WHITE.mix(0.8))
            .label_font(("sans-serif", 12))
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }
    Ok(())
}
