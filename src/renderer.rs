//! # Dashboard Rendering
//!
//! This module turns a loaded [`Dashboard`] into either a self-contained
//! HTML page (for the web server) or an ASCII summary (for `--stdout`
//! development mode).
//!
//! ## Page Layout
//! 1. **Current conditions**: location, summary, temperature, wind, pressure
//! 2. **Forecast table**: one row per local day, four six-hour slots
//! 3. **Tide chart**: predicted, measured and estimated height with
//!    inundation bands
//! 4. **Pressure chart**: measured and forecast barometric pressure
//!
//! A failed load renders [`render_error_page`] instead; no chart is ever
//! drawn from partial data.

use chrono::{DateTime, NaiveDate, Timelike};
use chrono_tz::Tz;

use plotters::style::{RGBColor, RED, YELLOW};

use crate::chart::{Band, Line, LineChart};
use crate::error::DashError;
use crate::merge::UnifiedRow;
use crate::pipeline::Dashboard;
use crate::weather::{ForecastRow, ForecastTable};

/// Annual tide extremes at the reference station, feet above datum
pub const TIDE_MIN_FT: f64 = -4.0;
pub const TIDE_MAX_FT: f64 = 14.0;

/// Tide level for moderate inundation
pub const TIDE_INUNDATION_MODERATE_FT: f64 = 11.2;
/// Tide level for severe inundation
pub const TIDE_INUNDATION_SEVERE_FT: f64 = 12.0;

/// Barometric pressure extremes for the chart, hPa
pub const PRESSURE_MIN_HPA: f64 = 970.0;
pub const PRESSURE_MAX_HPA: f64 = 1050.0;

const BLUE_LINE: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const ORANGE_LINE: RGBColor = RGBColor(0xff, 0x7f, 0x0e);
const GREEN_LINE: RGBColor = RGBColor(0x2c, 0xa0, 0x2c);

const SLOT_NAMES: [&str; 4] = ["Midnight", "6 AM", "Noon", "6 PM"];

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Convert compass degrees to a 16-point cardinal direction.
pub fn deg_to_compass(deg: f64) -> &'static str {
    let index = (deg / 22.5 + 0.5).floor() as i64;
    COMPASS[index.rem_euclid(16) as usize]
}

/// Minimal HTML escaping for text and attribute values.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// One row of the forecast table.
#[derive(Debug, PartialEq)]
pub struct ForecastDay<'a> {
    pub date: NaiveDate,
    /// Midnight, 6 AM, Noon, 6 PM
    pub slots: [Option<&'a ForecastRow>; 4],
}

/// Partition forecast rows into local days and six-hour slots.
///
/// The slot is `local hour / 6`; the earliest sample inside each six-hour
/// block fills it. Rows must be ascending, which [`ForecastTable`]
/// guarantees.
pub fn forecast_days(table: &ForecastTable) -> Vec<ForecastDay<'_>> {
    let mut days: Vec<ForecastDay<'_>> = Vec::new();
    for row in &table.rows {
        let date = row.t.date_naive();
        let slot = (row.t.hour() / 6) as usize;
        match days.last_mut() {
            Some(day) if day.date == date => {
                day.slots[slot].get_or_insert(row);
            }
            _ => {
                let mut slots = [None; 4];
                slots[slot] = Some(row);
                days.push(ForecastDay { date, slots });
            }
        }
    }
    days
}

/// Text lines of one forecast cell.
pub fn forecast_cell_lines(row: &ForecastRow) -> Vec<String> {
    let speed = row.wind_mph.round();
    let mut lines = vec![
        row.description.clone(),
        format!("Temp {:.0} °F", row.temp_f),
        format!("Wind {:.0}mph from {}", speed, deg_to_compass(row.wind_deg)),
    ];
    if let Some(gust) = row.gust_mph.map(f64::round).filter(|g| *g != speed) {
        lines.push(format!("Gusting to {gust:.0}"));
    }
    let pop = (row.pop * 100.0).round();
    if pop > 0.0 {
        lines.push(format!("{pop:.0}% chance precip"));
    }
    lines
}

/// Chart of predicted, measured and estimated tide height.
pub fn tide_chart(dashboard: &Dashboard) -> LineChart<'static> {
    let rows = &dashboard.rows;
    LineChart {
        title: format!("Tide at {}", dashboard.station_name),
        y_label: format!("Height {} (ft)", dashboard.datum),
        y_min: TIDE_MIN_FT,
        y_max: TIDE_MAX_FT,
        lines: vec![
            line("Predicted Height", BLUE_LINE, rows, |r| Some(r.predicted_height)),
            line("Measured Height", ORANGE_LINE, rows, |r| r.measured_height),
            line("Estimated Height", GREEN_LINE, rows, |r| r.estimated_height),
        ],
        bands: vec![
            Band {
                from: TIDE_INUNDATION_MODERATE_FT,
                to: TIDE_INUNDATION_SEVERE_FT,
                color: YELLOW,
                opacity: 0.2,
            },
            Band {
                from: TIDE_INUNDATION_SEVERE_FT,
                to: TIDE_MAX_FT,
                color: RED,
                opacity: 0.2,
            },
        ],
        now: Some(dashboard.generated_at),
    }
}

/// Chart of measured and forecast barometric pressure.
pub fn pressure_chart(dashboard: &Dashboard) -> LineChart<'static> {
    let rows = &dashboard.rows;
    LineChart {
        title: "Barometric Pressure".to_string(),
        y_label: "mBar".to_string(),
        y_min: PRESSURE_MIN_HPA,
        y_max: PRESSURE_MAX_HPA,
        lines: vec![
            line("Measured Pressure", BLUE_LINE, rows, |r| r.measured_pressure),
            line("Forecasted Pressure", ORANGE_LINE, rows, |r| r.forecasted_pressure),
        ],
        bands: Vec::new(),
        now: Some(dashboard.generated_at),
    }
}

fn line(
    label: &'static str,
    color: RGBColor,
    rows: &[UnifiedRow],
    value: impl Fn(&UnifiedRow) -> Option<f64>,
) -> Line<'static> {
    Line {
        label,
        color,
        points: rows.iter().map(|r| (r.t, value(r))).collect(),
    }
}

const STYLE: &str = "body{font-family:sans-serif;margin:0 auto;max-width:960px;padding:1em}\
h1,.current{text-align:center}\
.current{background:#e8f4fb;border-radius:10px;display:inline-block;padding:20px;margin:10px}\
table{border-collapse:collapse;width:100%;font-size:80%;text-align:center}\
td,th{border:1px solid #ccc;padding:4px;vertical-align:top}\
.chart svg{width:100%;height:auto}\
.error{background:#fbeaea;border:1px solid #d33;padding:1em;border-radius:6px}";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title><style>{STYLE}</style></head><body>{body}</body></html>\n",
        escape(title)
    )
}

/// The full dashboard page.
pub fn render_page(dashboard: &Dashboard) -> String {
    let title = format!("{} Weather Dashboard", dashboard.title);
    let mut body = format!("<h1>{}</h1>", escape(&title));
    body.push_str(&current_section(dashboard));
    body.push_str(&forecast_section(&dashboard.forecast));
    for chart in [tide_chart(dashboard), pressure_chart(dashboard)] {
        body.push_str(&format!("<div class=\"chart\">{}</div>", chart.to_svg()));
    }
    body.push_str(&format!(
        "<p><small>Updated {}</small></p>",
        dashboard.generated_at.format("%Y-%m-%d %H:%M %Z")
    ));
    page(&title, &body)
}

/// Page shown when a load fails.
pub fn render_error_page(err: &DashError) -> String {
    let heading = match err.call() {
        Some(call) => format!("Could not load {call} data"),
        None => "Could not load dashboard".to_string(),
    };
    let body = format!(
        "<h1>Weather Dashboard</h1><div class=\"error\"><h2>{}</h2><p>{}</p><p>Reload the page to try again.</p></div>",
        escape(&heading),
        escape(&err.to_string())
    );
    page("Weather Dashboard", &body)
}

fn current_section(dashboard: &Dashboard) -> String {
    let c = &dashboard.current;
    format!(
        "<div style=\"text-align:center\"><div class=\"current\"><h3>Weather in {}: {}</h3><h2>{:.1}°F</h2><h3>Wind {} mph from {}</h3><h3>{} mbar</h3></div></div>",
        escape(&c.location),
        escape(&c.summary),
        c.temp_f,
        c.wind_mph,
        deg_to_compass(c.wind_deg),
        c.pressure_hpa
    )
}

fn forecast_section(table: &ForecastTable) -> String {
    let mut html = String::from("<table><thead><tr><th>Date</th>");
    for name in SLOT_NAMES {
        html.push_str(&format!("<th>{name}</th>"));
    }
    html.push_str("</tr></thead><tbody>");
    for day in forecast_days(table) {
        html.push_str(&format!("<tr><td>{}</td>", day.date.format("%a %-d")));
        for slot in day.slots {
            match slot {
                Some(row) => {
                    let cell: String = forecast_cell_lines(row)
                        .iter()
                        .map(|l| format!("<div>{}</div>", escape(l)))
                        .collect();
                    html.push_str(&format!("<td>{cell}</td>"));
                }
                None => html.push_str("<td></td>"),
            }
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

/// ASCII chart of the hourly predicted and estimated tide.
///
/// `•` marks the prediction, `*` the estimate where it sits on a different
/// row, and `X` the hour nearest `now`.
pub fn ascii_chart(rows: &[UnifiedRow], now: DateTime<Tz>) -> String {
    const ROWS: usize = 20;
    const Y_AXIS_WIDTH: usize = 6;

    let hourly: Vec<&UnifiedRow> = rows.iter().filter(|r| r.t.minute() == 0).collect();
    if hourly.is_empty() {
        return "(no tide data)\n".to_string();
    }

    let (min_ft, max_ft) = hourly.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        let top = r.estimated_height.unwrap_or(r.predicted_height);
        (lo.min(r.predicted_height), hi.max(top))
    });
    let range = (max_ft - min_ft).max(0.1);
    let to_row = |ft: f64| {
        let normalized = (ft - min_ft) / range;
        (((1.0 - normalized) * (ROWS as f64 - 1.0)).round() as usize).min(ROWS - 1)
    };

    let now_column = hourly
        .iter()
        .enumerate()
        .min_by_key(|(_, r)| (r.t - now).num_seconds().abs())
        .map(|(i, _)| i);

    let mut grid = vec![vec![' '; hourly.len() + Y_AXIS_WIDTH]; ROWS];
    for label_ft in [max_ft, (max_ft + min_ft) / 2.0, min_ft] {
        let row = to_row(label_ft);
        let label = format!("{:>5.1}", label_ft);
        for (j, ch) in label.chars().enumerate().take(Y_AXIS_WIDTH - 1) {
            grid[row][j] = ch;
        }
    }
    for row in grid.iter_mut() {
        row[Y_AXIS_WIDTH - 1] = '│';
    }

    for (column, r) in hourly.iter().enumerate() {
        let grid_column = column + Y_AXIS_WIDTH;
        if let Some(estimate) = r.estimated_height {
            grid[to_row(estimate)][grid_column] = '*';
        }
        let mark = if Some(column) == now_column { 'X' } else { '•' };
        grid[to_row(r.predicted_height)][grid_column] = mark;
    }

    let mut out = String::new();
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    let padding = " ".repeat(Y_AXIS_WIDTH);
    let markers: String = hourly
        .iter()
        .map(|r| if r.t.hour() == 0 { '|' } else { ' ' })
        .collect();
    out.push_str(&format!("{padding}{markers}\n"));

    let first = hourly[0].t.format("%a %-d %H:%M").to_string();
    let last = hourly[hourly.len() - 1].t.format("%a %-d %H:%M").to_string();
    let gap = hourly.len().saturating_sub(first.len() + last.len()).max(1);
    out.push_str(&format!("{padding}{first}{}{last}\n", " ".repeat(gap)));
    out
}

/// Full ASCII summary of a dashboard.
pub fn ascii_summary(dashboard: &Dashboard) -> String {
    let c = &dashboard.current;
    let mut out = format!(
        "{}\nWeather in {}: {}  {:.1}°F  Wind {} mph from {}  {} mbar\n\nTide at {}\n",
        dashboard.title,
        c.location,
        c.summary,
        c.temp_f,
        c.wind_mph,
        deg_to_compass(c.wind_deg),
        c.pressure_hpa,
        dashboard.station_name
    );
    out.push_str(&ascii_chart(&dashboard.rows, dashboard.generated_at));
    out.push('\n');
    for day in forecast_days(&dashboard.forecast) {
        out.push_str(&format!("{}\n", day.date.format("%a %-d")));
        for (name, slot) in SLOT_NAMES.iter().zip(day.slots) {
            if let Some(row) = slot {
                out.push_str(&format!("  {:<9}{}\n", name, forecast_cell_lines(row).join(", ")));
            }
        }
    }
    out
}

/// Print the ASCII summary to stdout.
pub fn draw_ascii(dashboard: &Dashboard) {
    print!("{}", ascii_summary(dashboard));
}
