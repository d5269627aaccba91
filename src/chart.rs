//! # SVG Line Charts
//!
//! A small time-series chart drawn with `plotters` into an in-memory SVG:
//! fixed y-range, shaded horizontal bands, a vertical "now" marker, a
//! gridline at each local midnight and one line per series. Missing
//! values (`None`) break a line into separate segments instead of being
//! drawn as zero.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use plotters::coord::types::RangedDateTime;
use plotters::coord::Shift;
use plotters::prelude::*;

const WIDTH: u32 = 900;
const HEIGHT: u32 = 320;
const Y_TICKS: usize = 5;
const X_TICKS: usize = 8;

/// One plotted series.
pub struct Line<'a> {
    pub label: &'a str,
    pub color: RGBColor,
    pub points: Vec<(DateTime<Tz>, Option<f64>)>,
}

/// A shaded horizontal band between two y values.
pub struct Band {
    pub from: f64,
    pub to: f64,
    pub color: RGBColor,
    pub opacity: f64,
}

pub struct LineChart<'a> {
    pub title: String,
    pub y_label: String,
    pub y_min: f64,
    pub y_max: f64,
    pub lines: Vec<Line<'a>>,
    pub bands: Vec<Band>,
    pub now: Option<DateTime<Tz>>,
}

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

impl LineChart<'_> {
    /// Render as a standalone `<svg>` element.
    ///
    /// A drawing failure is logged and leaves whatever was drawn so far.
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
            if let Err(e) = self.draw(&root) {
                log::warn!("Chart {:?} not fully drawn: {}", self.title, e);
            }
        }
        svg
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult<DB> {
        root.fill(&WHITE)?;

        let Some((t_min, t_max)) = self.time_bounds() else {
            root.draw(&Text::new(
                self.title.as_str(),
                (WIDTH as i32 / 2 - 80, 12),
                ("sans-serif", 16).into_font(),
            ))?;
            root.draw(&Text::new(
                "No data",
                (WIDTH as i32 / 2 - 24, HEIGHT as i32 / 2),
                ("sans-serif", 14).into_font(),
            ))?;
            return root.present();
        };
        let t_max = t_max.max(t_min + Duration::minutes(1));

        let mut chart = ChartBuilder::on(root)
            .caption(self.title.as_str(), ("sans-serif", 16))
            .margin(8)
            .x_label_area_size(28)
            .y_label_area_size(48)
            .build_cartesian_2d(RangedDateTime::from(t_min..t_max), self.y_min..self.y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(X_TICKS)
            .y_labels(Y_TICKS)
            .x_label_formatter(&|t: &DateTime<Tz>| t.format("%H:%M").to_string())
            .y_desc(self.y_label.as_str())
            .light_line_style(BLACK.mix(0.08))
            .draw()?;

        chart.draw_series(self.bands.iter().map(|band| {
            let from = band.from.max(self.y_min);
            let to = band.to.min(self.y_max);
            Rectangle::new([(t_min, from), (t_max, to)], band.color.mix(band.opacity).filled())
        }))?;

        let days = midnights(t_min, t_max);
        chart.draw_series(
            days.iter()
                .map(|m| PathElement::new(vec![(*m, self.y_min), (*m, self.y_max)], BLACK.mix(0.25))),
        )?;
        chart.draw_series(days.iter().map(|m| {
            Text::new(
                m.format("%a %-d").to_string(),
                (*m, self.y_max),
                ("sans-serif", 11).into_font(),
            )
        }))?;

        if let Some(now) = self.now.filter(|now| (t_min..=t_max).contains(now)) {
            chart.draw_series(LineSeries::new(
                vec![(now, self.y_min), (now, self.y_max)],
                BLACK.mix(0.7).stroke_width(1),
            ))?;
        }

        for line in &self.lines {
            let color = line.color;
            for (i, segment) in segments(&line.points).into_iter().enumerate() {
                let clamped = segment.into_iter().map(|(t, v)| (t, v.clamp(self.y_min, self.y_max)));
                let drawn = chart.draw_series(LineSeries::new(clamped, color.stroke_width(2)))?;
                if i == 0 {
                    drawn
                        .label(line.label)
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
                }
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK.mix(0.3))
            .draw()?;

        root.present()
    }

    fn time_bounds(&self) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
        let mut times = self
            .lines
            .iter()
            .flat_map(|line| line.points.iter().filter(|(_, v)| v.is_some()).map(|(t, _)| *t));
        let first = times.next()?;
        Some(times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }
}

/// Maximal runs of present values.
pub fn segments(points: &[(DateTime<Tz>, Option<f64>)]) -> Vec<Vec<(DateTime<Tz>, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (t, v) in points {
        match v {
            Some(v) => current.push((*t, *v)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Local midnights strictly inside `(t_min, t_max]`.
///
/// Days whose midnight does not exist on the wall clock are skipped.
pub fn midnights(t_min: DateTime<Tz>, t_max: DateTime<Tz>) -> Vec<DateTime<Tz>> {
    let zone = t_min.timezone();
    let last = t_max.date_naive();
    let mut day = t_min.date_naive() + Duration::days(1);
    let mut out = Vec::new();
    while day <= last {
        if let Some(midnight) = day
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| crate::local_time::localize(naive, zone))
            .filter(|midnight| *midnight <= t_max)
        {
            out.push(midnight);
        }
        day += Duration::days(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::US::Pacific;

    fn at(h: i64) -> DateTime<Tz> {
        Pacific.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn chart(points: Vec<(DateTime<Tz>, Option<f64>)>) -> LineChart<'static> {
        LineChart {
            title: "Tide at <Port Townsend>".to_string(),
            y_label: "ft".to_string(),
            y_min: -4.0,
            y_max: 14.0,
            lines: vec![Line {
                label: "Predicted Height",
                color: RGBColor(0x1f, 0x77, 0xb4),
                points,
            }],
            bands: vec![Band {
                from: 11.2,
                to: 12.0,
                color: YELLOW,
                opacity: 0.2,
            }],
            now: Some(at(1)),
        }
    }

    #[test]
    fn test_segments_split_on_gaps() {
        let points = vec![
            (at(0), Some(1.0)),
            (at(1), Some(2.0)),
            (at(2), None),
            (at(3), Some(3.0)),
            (at(4), None),
        ];
        let segs = segments(&points);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].len(), 2);
        assert_eq!(segs[1], vec![(at(3), 3.0)]);
    }

    #[test]
    fn test_segments_all_missing() {
        assert!(segments(&[(at(0), None), (at(1), None)]).is_empty());
    }

    #[test]
    fn test_svg_draws_lines() {
        let svg = chart(vec![(at(0), Some(1.0)), (at(1), None), (at(2), Some(2.0)), (at(3), Some(2.5))]).to_svg();
        assert!(svg.contains("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("<polyline"));
        assert!(!svg.contains("No data"));
    }

    #[test]
    fn test_svg_escapes_title() {
        let svg = chart(vec![(at(0), Some(1.0)), (at(1), Some(2.0))]).to_svg();
        assert!(svg.contains("Tide at &lt;Port Townsend&gt;"));
    }

    #[test]
    fn test_empty_chart_says_no_data() {
        let svg = chart(vec![]).to_svg();
        assert!(svg.contains("No data"));
        assert!(!svg.contains("<polyline"));
    }

    #[test]
    fn test_single_sample_still_renders() {
        let svg = chart(vec![(at(0), Some(20.0))]).to_svg();
        assert!(svg.contains("</svg>"));
    }

    #[test]
    fn test_midnights_inside_window() {
        let found = midnights(at(-6), at(50));
        assert_eq!(found, vec![at(0), at(24), at(48)]);
        // Window starting exactly at midnight does not label its left edge
        assert_eq!(midnights(at(0), at(30)), vec![at(24)]);
    }

    #[test]
    fn test_midnights_skip_missing_wall_clock_midnight() {
        // Santiago springs forward at local midnight on 2024-09-08
        let zone: Tz = "America/Santiago".parse().unwrap();
        let start = zone.with_ymd_and_hms(2024, 9, 5, 12, 0, 0).unwrap();
        let end = zone.with_ymd_and_hms(2024, 9, 10, 12, 0, 0).unwrap();
        let days: Vec<u32> = midnights(start, end)
            .iter()
            .map(|m| chrono::Datelike::day(&m.date_naive()))
            .collect();
        assert_eq!(days, vec![6, 7, 9, 10]);
    }
}
