use crate::processing::charts::ChartOutcome;
use crate::processing::display::DisplayTable;
use crate::processing::summary::StatisticsReport;
use crate::processing::{
    ChartKind, Dashboard, DashboardOptions, MergePolicy, Notice, NoticeLevel, WidgetStyle,
};
use crate::widgets::{render_chart, render_map};

const LAYOUT: &str = include_str!("../templates/layout.html");
const CONTENT_SLOT: &str = "{{content}}";

/// Escape text for use in HTML element content and quoted attributes.
pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn page(content: &str) -> String {
    LAYOUT.replace(CONTENT_SLOT, content)
}

pub fn render_landing_page() -> String {
    page(&render_upload_form(&DashboardOptions::default()))
}

fn checked(on: bool) -> &'static str {
    if on { " checked" } else { "" }
}

fn radio(name: &str, value: &str, label: &str, on: bool) -> String {
    format!(
        "<label><input type=\"radio\" name=\"{name}\" value=\"{value}\"{}/> {label}</label>",
        checked(on)
    )
}

/// Upload form, pre-filled with the options of the current cycle.
pub fn render_upload_form(options: &DashboardOptions) -> String {
    let mut form = String::new();
    form.push_str(
        "<form class=\"upload-card\" method=\"post\" action=\"/dashboard\" enctype=\"multipart/form-data\">",
    );
    form.push_str(
        "<div class=\"field\"><label for=\"track\">Carica File TSV</label>\
         <input id=\"track\" name=\"track\" type=\"file\" accept=\".tsv\"/></div>",
    );
    form.push_str(
        "<div class=\"field\"><label for=\"activity\">Carica File FIT</label>\
         <input id=\"activity\" name=\"activity\" type=\"file\" accept=\".fit\"/></div>",
    );

    form.push_str("<fieldset><legend>Unione dei dati</legend>");
    form.push_str(&radio(
        "merge",
        "outer",
        MergePolicy::OuterTimeJoin.description(),
        options.merge_policy == MergePolicy::OuterTimeJoin,
    ));
    form.push_str(&radio(
        "merge",
        "concat",
        MergePolicy::Concatenate.description(),
        options.merge_policy == MergePolicy::Concatenate,
    ));
    form.push_str("</fieldset>");

    form.push_str("<fieldset><legend>Grafici</legend>");
    form.push_str(&radio(
        "chart_style",
        "interactive",
        "interattivi",
        options.chart_style == WidgetStyle::Interactive,
    ));
    form.push_str(&radio(
        "chart_style",
        "static",
        "statici",
        options.chart_style == WidgetStyle::Static,
    ));
    for (kind, value) in [
        (ChartKind::Oxygen, "oxygen"),
        (ChartKind::HeartRate, "heart_rate"),
        (ChartKind::OxygenVsHeartRate, "oxygen_vs_heart_rate"),
    ] {
        form.push_str(&format!(
            "<label><input type=\"checkbox\" name=\"charts\" value=\"{value}\"{}/> {}</label>",
            checked(options.wants(kind)),
            kind.title()
        ));
    }
    form.push_str("</fieldset>");

    form.push_str("<fieldset><legend>Mappa</legend>");
    form.push_str(&radio(
        "map_style",
        "interactive",
        "interattiva",
        options.map_style == WidgetStyle::Interactive,
    ));
    form.push_str(&radio(
        "map_style",
        "static",
        "statica",
        options.map_style == WidgetStyle::Static,
    ));
    form.push_str(&format!(
        "<label><input type=\"checkbox\" name=\"statistics\" value=\"on\"{}/> Mostra statistiche</label>",
        checked(options.show_statistics)
    ));
    form.push_str("</fieldset>");

    // Marks the submission so unchecked boxes read as "off" rather than "default".
    form.push_str("<input type=\"hidden\" name=\"submitted\" value=\"1\"/>");
    form.push_str("<button type=\"submit\">Visualizza</button></form>");
    form
}

fn render_notice(notice: &Notice) -> String {
    let class = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "success",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    format!(
        "<p class=\"notice {class}\">{}</p>",
        escape_html(&notice.message)
    )
}

fn render_statistics(report: &StatisticsReport) -> String {
    let mut body = String::from("<div class=\"summary-grid\">");
    for entry in &report.entries {
        body.push_str(&format!(
            "<div class=\"summary-card\"><p class=\"label\">{}</p><p class=\"value\">{}</p></div>",
            entry.label,
            escape_html(&entry.value)
        ));
    }
    body.push_str("</div>");
    body
}

fn render_table(table: &DisplayTable) -> String {
    let mut body = if table.rows.len() < table.total_rows {
        format!(
            "<p class=\"eyebrow\">Prime {} di {} righe</p>",
            table.rows.len(),
            table.total_rows
        )
    } else {
        format!("<p class=\"eyebrow\">{} righe</p>", table.total_rows)
    };
    body.push_str("<div class=\"table-wrapper\"><table><thead><tr>");
    for header in &table.headers {
        body.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    body.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        body.push_str("<tr>");
        for cell in row {
            body.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        body.push_str("</tr>");
    }
    body.push_str("</tbody></table></div>");
    body
}

fn render_charts(outcomes: &[ChartOutcome], style: WidgetStyle, prefix: &str) -> String {
    let mut body = String::new();
    for (idx, outcome) in outcomes.iter().enumerate() {
        match outcome {
            ChartOutcome::Rendered(chart) => {
                body.push_str(&format!("<h3>{}</h3>", chart.title));
                body.push_str(&render_chart(chart, style, &format!("{prefix}-chart-{idx}")));
            }
            ChartOutcome::MissingColumn { message, .. } => {
                body.push_str(&render_notice(&Notice {
                    level: NoticeLevel::Warning,
                    message: message.clone(),
                }));
            }
        }
    }
    body
}

fn section_header(eyebrow: &str, title: &str) -> String {
    format!(
        "<div class=\"results-header\"><div><p class=\"eyebrow\">{}</p><h2>{}</h2></div></div>",
        escape_html(eyebrow),
        escape_html(title)
    )
}

/// Full dashboard page: the upload form followed by every produced artifact.
pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let options = &dashboard.options;
    let mut body = render_upload_form(options);

    for notice in &dashboard.notices {
        body.push_str(&render_notice(notice));
    }

    if let Some(track) = &dashboard.track {
        body.push_str("<section class=\"results-card\">");
        body.push_str(&section_header("Percorso GPS", &track.file_name));
        match &track.map {
            Ok(route) => body.push_str(&render_map(route, options.map_style, "track-map")),
            Err(err) => body.push_str(&render_notice(&Notice {
                level: NoticeLevel::Error,
                message: err.to_string(),
            })),
        }
        if let Some(report) = &track.statistics {
            body.push_str("<h3>Statistiche del percorso</h3>");
            body.push_str(&render_statistics(report));
        }
        body.push_str(&render_charts(&track.charts, options.chart_style, "track"));
        body.push_str(&render_table(&track.table));
        body.push_str("</section>");
    }

    if let Some(activity) = &dashboard.activity {
        body.push_str("<section class=\"results-card\">");
        body.push_str(&section_header("Dati FIT", &activity.file_name));
        body.push_str(&render_table(&activity.table));
        body.push_str(&render_charts(
            &activity.charts,
            options.chart_style,
            "activity",
        ));
        body.push_str("</section>");
    }

    if let Some(combined) = &dashboard.combined {
        body.push_str("<section class=\"results-card\">");
        body.push_str(&section_header("Dati combinati", "GPS + FIT"));
        body.push_str(&format!(
            "<p class=\"policy\">Modalità di unione: {}</p>",
            combined.policy.description()
        ));
        body.push_str(&render_table(&combined.table));
        body.push_str(&render_charts(
            &combined.charts,
            options.chart_style,
            "combined",
        ));
        body.push_str("</section>");
    }

    body.push_str(&format!(
        "<p class=\"cycle\">Elaborazione {}</p>",
        dashboard.cycle_id
    ));
    page(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::summary::derive_trip_statistics;
    use crate::processing::{RecordTable, Source};

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"O2\" & 'HR'</b>"),
            "&lt;b&gt;&quot;O2&quot; &amp; &#39;HR&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn landing_page_has_both_uploads() {
        let html = render_landing_page();
        assert!(html.contains("name=\"track\""));
        assert!(html.contains("name=\"activity\""));
        assert!(!html.contains(CONTENT_SLOT));
    }

    #[test]
    fn form_reflects_selected_options() {
        let options = DashboardOptions {
            merge_policy: MergePolicy::Concatenate,
            show_statistics: false,
            charts: vec![ChartKind::HeartRate],
            ..Default::default()
        };
        let form = render_upload_form(&options);
        assert!(form.contains("value=\"concat\" checked"));
        assert!(form.contains("value=\"heart_rate\" checked"));
        assert!(!form.contains("value=\"oxygen\" checked"));
        assert!(!form.contains("name=\"statistics\" value=\"on\" checked"));
    }

    #[test]
    fn table_caption_counts_rows() {
        let full = DisplayTable {
            headers: vec!["Datetime".into()],
            rows: vec![vec!["—".into()]; 3],
            total_rows: 3,
        };
        assert!(render_table(&full).contains(">3 righe<"));

        let capped = DisplayTable {
            total_rows: 30,
            ..full
        };
        assert!(render_table(&capped).contains("Prime 3 di 30 righe"));
    }

    #[test]
    fn statistics_render_every_metric() {
        let report = derive_trip_statistics(&RecordTable::new(Source::Track, Vec::new())).report();
        let html = render_statistics(&report);
        assert_eq!(html.matches("summary-card").count(), 6);
        assert!(html.contains("N/A"));
    }
}
