use super::{inset_x0, min_max, tick_range, ChartArtifact, Marker, Result};
use crate::{
    config::Config,
    records::{Category, GainRecord},
};
use plotters::prelude::*;

pub(super) const GAIN_LABEL: &str = "SiPM Gain [ADC / p.e.]";
pub(super) const CHANNEL_LABEL: &str = "Channel number";
/// Channel axis tick step
pub(super) const CHANNEL_TICK: f64 = 5f64;
/// Marker half width in pixels
pub(super) const MARKER_SIZE: i32 = 5;

const VALID_COLOR: RGBColor = RGBColor(0x00, 0x4C, 0x97);
const PEDESTAL_COLOR: RGBColor = RGBColor(0x4C, 0x8C, 0x2B);
const INACTIVE_COLOR: RGBColor = RGBColor(0xAF, 0x27, 0x2F);
const ZOOM_COLOR: RGBColor = RGBColor(128, 128, 128);

/// Inset `[y0, width, height]` in axes fraction, `x0` is given by [inset_x0]
const INSET_BOUNDS: [f64; 3] = [0.5, 0.4, 0.35];

fn category_style(category: Category) -> (Marker, RGBColor) {
    match category {
        Category::Valid => (Marker::Circle, VALID_COLOR),
        Category::PedestalOnly => (Marker::Square, PEDESTAL_COLOR),
        Category::Inactive => (Marker::Diamond, INACTIVE_COLOR),
    }
}

/// Gain versus channel number of all the channels
pub struct OverviewChart {
    size: (u32, u32),
    gain_tick: f64,
}
impl OverviewChart {
    pub fn new(config: &Config) -> Self {
        Self {
            size: config.overview_size,
            gain_tick: config.gain_tick,
        }
    }
    pub fn render(
        &self,
        valid: &[GainRecord],
        pedestal_only: &[GainRecord],
        inactive: &[GainRecord],
    ) -> Result<ChartArtifact> {
        let series = [
            (Category::Valid, valid),
            (Category::PedestalOnly, pedestal_only),
            (Category::Inactive, inactive),
        ];
        let all_records = || series.iter().flat_map(|(_, records)| records.iter());
        let max_channel = all_records().map(|r| r.channel).max().unwrap_or_default();
        let (x_lo, x_hi) = (-2f64, max_channel as f64 + 3f64);
        let (gain_min, gain_max) = min_max(all_records().map(|r| r.gain));
        let (y_lo, y_hi, n_y) = tick_range(gain_min, gain_max, self.gain_tick);
        let n_x = ((x_hi - x_lo) / CHANNEL_TICK).ceil() as usize + 1;
        let x0 = inset_x0(valid);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.size).into_drawing_area();
            root.fill(&WHITE)?;
            let mut chart = ChartBuilder::on(&root)
                .margin(10)
                .set_label_area_size(LabelAreaPosition::Left, 70)
                .set_label_area_size(LabelAreaPosition::Bottom, 50)
                .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
            chart
                .configure_mesh()
                .disable_mesh()
                .x_labels(n_x)
                .y_labels(n_y)
                .x_desc(CHANNEL_LABEL)
                .y_desc(GAIN_LABEL)
                .label_style(("sans-serif", 14))
                .draw()?;

            for (category, records) in series {
                let (marker, color) = category_style(category);
                let style = color.filled();
                let vertices = marker.vertices(MARKER_SIZE);
                let legend_vertices = vertices.clone();
                chart
                    .draw_series(records.iter().map(|r| {
                        EmptyElement::at((r.channel as f64, r.gain))
                            + Polygon::new(vertices.clone(), style)
                    }))?
                    .label(category.to_string())
                    .legend(move |coord| {
                        EmptyElement::at(coord) + Polygon::new(legend_vertices.clone(), style)
                    });
            }

            if let Some(x0) = x0 {
                let (c_min, c_max) = min_max(valid.iter().map(|r| r.channel as f64));
                let (g_min, g_max) = min_max(valid.iter().map(|r| r.gain));
                let pad = ((g_max - g_min) * 0.1).max(1f64);
                let (zoom_lo, zoom_hi) = ((c_min - 1f64, g_min - pad), (c_max + 1f64, g_max + pad));
                chart.draw_series(std::iter::once(Rectangle::new(
                    [zoom_lo, zoom_hi],
                    ZOOM_COLOR.stroke_width(1),
                )))?;

                let (width, height) = chart.plotting_area().dim_in_pixel();
                let [y0, w, h] = INSET_BOUNDS;
                let inset_area = chart.plotting_area().strip_coord_spec().shrink(
                    (
                        (x0 * width as f64) as i32,
                        ((1f64 - y0 - h) * height as f64) as i32,
                    ),
                    ((w * width as f64) as i32, (h * height as f64) as i32),
                );
                inset_area.fill(&WHITE)?;
                let mut inset = ChartBuilder::on(&inset_area)
                    .caption("Valid channels", ("sans-serif", 12))
                    .margin(4)
                    .set_label_area_size(LabelAreaPosition::Left, 45)
                    .set_label_area_size(LabelAreaPosition::Bottom, 20)
                    .build_cartesian_2d(zoom_lo.0..zoom_hi.0, zoom_lo.1..zoom_hi.1)?;
                inset
                    .configure_mesh()
                    .disable_x_mesh()
                    .bold_line_style(&ZOOM_COLOR.mix(0.25))
                    .light_line_style(&WHITE.mix(0.0))
                    .x_labels(5)
                    .y_labels(4)
                    .label_style(("sans-serif", 10))
                    .draw()?;
                inset.draw_series(LineSeries::new(
                    valid.iter().map(|r| (r.channel as f64, r.gain)),
                    VALID_COLOR.mix(0.4).stroke_width(2),
                ))?;
                inset.draw_series(
                    valid
                        .iter()
                        .map(|r| Circle::new((r.channel as f64, r.gain), 2, VALID_COLOR.filled())),
                )?;
            } else {
                log::warn!("no valid channels, skipping the valid channels inset");
            }

            chart
                .configure_series_labels()
                .border_style(&WHITE.mix(0.0))
                .background_style(&WHITE.mix(0.8))
                .label_font(("sans-serif", 12))
                .position(match x0 {
                    Some(x0) if x0 > 0.3 => SeriesLabelPosition::UpperLeft,
                    _ => SeriesLabelPosition::UpperRight,
                })
                .draw()?;
            root.present()?;
        }
        Ok(ChartArtifact {
            suffix: "all_ch",
            svg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::with_fonts;

    fn record(channel: u32, gain: f64) -> GainRecord {
        GainRecord {
            channel,
            peaks: if gain > 0. { 3 } else { 0 },
            gain,
            gain_error: 0.,
            offset: 0.,
            offset_error: 0.,
            acl: "1".into(),
            lcm: "1".into(),
        }
    }

    #[test]
    fn all_categories() {
        let valid: Vec<_> = (10..20).map(|c| record(c, 1000. + c as f64)).collect();
        let pedestal_only: Vec<_> = (0..5).map(|c| record(c, -1.)).collect();
        let inactive: Vec<_> = (5..10).map(|c| record(c, 0.)).collect();
        let chart = OverviewChart::new(&Config::default());
        let Some(artifact) = with_fonts(chart.render(&valid, &pedestal_only, &inactive)) else {
            return;
        };
        assert_eq!(artifact.suffix, "all_ch");
        assert!(artifact.svg.contains("<svg"));
        // legend and inset caption
        assert_eq!(artifact.svg.matches("Valid channels").count(), 2);
        assert!(artifact.svg.contains("Only pedestal"));
        assert!(artifact.svg.contains("Inactive channels"));
    }

    #[test]
    fn no_valid_channel() {
        let pedestal_only = vec![record(4, -1.), record(6, -1.)];
        let inactive = vec![record(5, 0.)];
        let chart = OverviewChart::new(&Config::default());
        let Some(artifact) = with_fonts(chart.render(&[], &pedestal_only, &inactive)) else {
            return;
        };
        assert_eq!(artifact.suffix, "all_ch");
        // legend only, no inset
        assert_eq!(artifact.svg.matches("Valid channels").count(), 1);
        assert!(artifact.svg.contains("Only pedestal"));
    }

    #[test]
    fn category_markers_are_distinct() {
        let styles: Vec<_> = [Category::Valid, Category::PedestalOnly, Category::Inactive]
            .into_iter()
            .map(category_style)
            .collect();
        for (i, a) in styles.iter().enumerate() {
            for b in styles.iter().skip(i + 1) {
                assert_ne!(a.0, b.0);
                assert_ne!(a.1, b.1);
            }
        }
    }
}
