//! Map and chart widgets.
//!
//! Both widgets are pure renderers: they take data already shaped by
//! [`crate::processing`] and return an HTML fragment. The interactive flavour
//! embeds a JSON payload consumed by Leaflet or Chart.js (loaded by the page
//! layout); the static flavour draws an inline SVG on the server.

use crate::processing::WidgetStyle;
use crate::processing::charts::{Chart, ChartPoint};
use crate::processing::route::Route;
use crate::templates::escape_html;
use serde::Serialize;

const SERIES_COLORS: [&str; 4] = ["#2563eb", "#dc2626", "#16a34a", "#9333ea"];
const ROUTE_COLOR: &str = "blue";

const SVG_WIDTH: f64 = 640.0;
const CHART_HEIGHT: f64 = 320.0;
const MAP_HEIGHT: f64 = 400.0;
const MARGIN: f64 = 40.0;

#[derive(Serialize)]
struct MapPayload<'a> {
    center: [f64; 2],
    zoom: u8,
    path: &'a [(f64, f64)],
    color: &'static str,
}

#[derive(Serialize)]
struct ChartPayload<'a> {
    title: &'a str,
    datasets: Vec<DatasetPayload<'a>>,
}

#[derive(Serialize)]
struct DatasetPayload<'a> {
    label: &'a str,
    color: &'static str,
    /// `[epoch millis, value]` pairs.
    data: Vec<[f64; 2]>,
}

/// JSON safe to drop inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

fn epoch_millis(point: &ChartPoint) -> f64 {
    point.time.and_utc().timestamp_millis() as f64
}

fn color(idx: usize) -> &'static str {
    SERIES_COLORS[idx % SERIES_COLORS.len()]
}

pub fn render_map(route: &Route, style: WidgetStyle, id: &str) -> String {
    match style {
        WidgetStyle::Interactive => interactive_map(route, id),
        WidgetStyle::Static => static_map(route),
    }
}

pub fn render_chart(chart: &Chart, style: WidgetStyle, id: &str) -> String {
    match style {
        WidgetStyle::Interactive => interactive_chart(chart, id),
        WidgetStyle::Static => static_chart(chart),
    }
}

fn interactive_map(route: &Route, id: &str) -> String {
    let payload = MapPayload {
        center: [route.center.0, route.center.1],
        zoom: route.zoom,
        path: &route.path,
        color: ROUTE_COLOR,
    };
    format!(
        "<div class=\"map\" id=\"{id}\"></div>\
         <script>renderRouteMap('{id}', {});</script>",
        script_json(&payload)
    )
}

fn interactive_chart(chart: &Chart, id: &str) -> String {
    let payload = ChartPayload {
        title: chart.title,
        datasets: chart
            .series
            .iter()
            .enumerate()
            .map(|(idx, series)| DatasetPayload {
                label: &series.label,
                color: color(idx),
                data: series
                    .points
                    .iter()
                    .map(|point| [epoch_millis(point), point.value])
                    .collect(),
            })
            .collect(),
    };
    format!(
        "<div class=\"chart\"><canvas id=\"{id}\"></canvas></div>\
         <script>renderTimeChart('{id}', {});</script>",
        script_json(&payload)
    )
}

/// Linear mapping of `[lo, hi]` onto `[out_lo, out_hi]`; degenerate ranges map
/// to the middle.
fn scale(value: f64, lo: f64, hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    if (hi - lo).abs() < f64::EPSILON {
        (out_lo + out_hi) / 2.0
    } else {
        out_lo + (value - lo) / (hi - lo) * (out_hi - out_lo)
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| {
        Some(acc.map_or((v, v), |(lo, hi): (f64, f64)| (lo.min(v), hi.max(v))))
    })
}

fn static_map(route: &Route) -> String {
    // Equirectangular projection around the route's latitude.
    let lon_factor = route.center.0.to_radians().cos().abs().max(1e-6);
    let projected: Vec<(f64, f64)> = route
        .path
        .iter()
        .map(|(lat, lon)| (lon * lon_factor, *lat))
        .collect();

    let (x_lo, x_hi) = bounds(projected.iter().map(|p| p.0)).unwrap_or((0.0, 0.0));
    let (y_lo, y_hi) = bounds(projected.iter().map(|p| p.1)).unwrap_or((0.0, 0.0));

    // Keep aspect ratio: use the same scale on both axes.
    let span = (x_hi - x_lo).max(y_hi - y_lo);
    let inner_w = SVG_WIDTH - 2.0 * MARGIN;
    let inner_h = MAP_HEIGHT - 2.0 * MARGIN;
    let unit = if span > 0.0 { inner_w.min(inner_h) / span } else { 0.0 };
    let x_off = MARGIN + (inner_w - (x_hi - x_lo) * unit) / 2.0;
    let y_off = MARGIN + (inner_h - (y_hi - y_lo) * unit) / 2.0;

    let points: Vec<(f64, f64)> = projected
        .iter()
        .map(|(x, y)| (x_off + (x - x_lo) * unit, MAP_HEIGHT - (y_off + (y - y_lo) * unit)))
        .collect();

    let mut svg = format!(
        "<svg class=\"static-map\" viewBox=\"0 0 {SVG_WIDTH} {MAP_HEIGHT}\" role=\"img\">\
         <rect width=\"100%\" height=\"100%\" fill=\"#eef2f7\"/>"
    );
    svg.push_str(&format!(
        "<polyline fill=\"none\" stroke=\"{ROUTE_COLOR}\" stroke-width=\"2.5\" points=\"{}\"/>",
        svg_points(&points)
    ));
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        svg.push_str(&format!(
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"5\" fill=\"#16a34a\"><title>Partenza</title></circle>",
            first.0, first.1
        ));
        svg.push_str(&format!(
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"5\" fill=\"#dc2626\"><title>Arrivo</title></circle>",
            last.0, last.1
        ));
    }
    svg.push_str(&format!(
        "<text x=\"{MARGIN}\" y=\"{}\" class=\"axis\">centro {:.5}, {:.5}</text>",
        MAP_HEIGHT - 10.0,
        route.center.0,
        route.center.1
    ));
    svg.push_str("</svg>");
    svg
}

fn svg_points(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn static_chart(chart: &Chart) -> String {
    let all_points = || chart.series.iter().flat_map(|series| series.points.iter());
    let x_bounds = bounds(all_points().map(epoch_millis));
    let y_bounds = bounds(all_points().map(|point| point.value));

    let mut svg = format!(
        "<svg class=\"static-chart\" viewBox=\"0 0 {SVG_WIDTH} {CHART_HEIGHT}\" role=\"img\">\
         <text x=\"{}\" y=\"20\" text-anchor=\"middle\" class=\"title\">{}</text>",
        SVG_WIDTH / 2.0,
        escape_html(chart.title)
    );

    let (Some((x_lo, x_hi)), Some((y_lo, y_hi))) = (x_bounds, y_bounds) else {
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\">Nessun dato da mostrare</text></svg>",
            SVG_WIDTH / 2.0,
            CHART_HEIGHT / 2.0
        ));
        return svg;
    };

    let left = MARGIN;
    let right = SVG_WIDTH - MARGIN / 2.0;
    let top = MARGIN;
    let bottom = CHART_HEIGHT - MARGIN;

    svg.push_str(&format!(
        "<line x1=\"{left}\" y1=\"{bottom}\" x2=\"{right}\" y2=\"{bottom}\" stroke=\"#444\"/>\
         <line x1=\"{left}\" y1=\"{top}\" x2=\"{left}\" y2=\"{bottom}\" stroke=\"#444\"/>"
    ));

    for (idx, series) in chart.series.iter().enumerate() {
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .map(|point| {
                (
                    scale(epoch_millis(point), x_lo, x_hi, left, right),
                    scale(point.value, y_lo, y_hi, bottom, top),
                )
            })
            .collect();
        svg.push_str(&format!(
            "<polyline fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\" points=\"{}\"><title>{}</title></polyline>",
            color(idx),
            svg_points(&points),
            escape_html(&series.label)
        ));
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" fill=\"{}\" class=\"legend\">{}</text>",
            right - 150.0,
            top + 14.0 * idx as f64,
            color(idx),
            escape_html(&series.label)
        ));
    }

    let time_label = |millis: f64| {
        chrono::DateTime::from_timestamp_millis(millis as i64)
            .map(|dt| dt.naive_utc().format("%H:%M:%S").to_string())
            .unwrap_or_default()
    };
    svg.push_str(&format!(
        "<text x=\"{left}\" y=\"{}\" class=\"axis\">{}</text>\
         <text x=\"{right}\" y=\"{}\" text-anchor=\"end\" class=\"axis\">{}</text>\
         <text x=\"4\" y=\"{top}\" class=\"axis\">{y_hi:.1}</text>\
         <text x=\"4\" y=\"{bottom}\" class=\"axis\">{y_lo:.1}</text>\
         <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" class=\"axis\">Tempo</text>",
        bottom + 16.0,
        time_label(x_lo),
        bottom + 16.0,
        time_label(x_hi),
        SVG_WIDTH / 2.0,
        CHART_HEIGHT - 4.0
    ));
    svg.push_str("</svg>");
    svg
}
