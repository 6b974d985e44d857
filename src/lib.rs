pub mod config;
pub mod processing;
pub mod templates;
pub mod widgets;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, multipart::MultipartRejection},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use config::AppConfig;
use processing::{
    ChartKind, DashboardOptions, MergePolicy, Session, Upload, WidgetStyle, build_dashboard,
};
use templates::{render_dashboard, render_landing_page};

pub fn build_app() -> Router {
    build_app_with_config(&AppConfig::default())
}

pub fn build_app_with_config(config: &AppConfig) -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/dashboard", post(handle_dashboard))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
}

async fn landing_page() -> Html<String> {
    Html(render_landing_page())
}

/// Raw form values before they are resolved into [`DashboardOptions`].
#[derive(Debug, Default)]
struct DashboardForm {
    submitted: bool,
    merge: Option<String>,
    chart_style: Option<String>,
    map_style: Option<String>,
    statistics: bool,
    charts: Vec<String>,
}

impl DashboardForm {
    /// Unchecked checkboxes are only meaningful when the HTML form was used;
    /// bare API uploads fall back to the defaults.
    fn into_options(self) -> DashboardOptions {
        let defaults = DashboardOptions::default();
        DashboardOptions {
            merge_policy: self
                .merge
                .as_deref()
                .and_then(MergePolicy::from_form)
                .unwrap_or(defaults.merge_policy),
            chart_style: self
                .chart_style
                .as_deref()
                .and_then(WidgetStyle::from_form)
                .unwrap_or(defaults.chart_style),
            map_style: self
                .map_style
                .as_deref()
                .and_then(WidgetStyle::from_form)
                .unwrap_or(defaults.map_style),
            show_statistics: if self.submitted {
                self.statistics
            } else {
                defaults.show_statistics
            },
            charts: if self.submitted {
                ChartKind::ALL
                    .into_iter()
                    .filter(|kind| {
                        self.charts
                            .iter()
                            .any(|value| ChartKind::from_form(value) == Some(*kind))
                    })
                    .collect()
            } else {
                defaults.charts
            },
        }
    }
}

#[tracing::instrument(skip_all)]
async fn handle_dashboard(
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "request is not a multipart upload");
            return (
                StatusCode::BAD_REQUEST,
                "Richiesta non valida: invia i file come multipart/form-data".to_string(),
            )
                .into_response();
        }
    };
    let mut session = Session::default();
    let mut form = DashboardForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "malformed upload");
                return (
                    StatusCode::BAD_REQUEST,
                    format!("Caricamento non leggibile: {err}"),
                )
                    .into_response();
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "track" | "activity" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            format!("Impossibile leggere il file caricato: {err}"),
                        )
                            .into_response();
                    }
                };
                // Browsers send an empty part when no file was chosen.
                if bytes.is_empty() && file_name.is_empty() {
                    continue;
                }
                let upload = Some(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
                if name == "track" {
                    session.track = upload;
                } else {
                    session.activity = upload;
                }
            }
            _ => {
                let value = match field.text().await {
                    Ok(value) => value,
                    Err(err) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            format!("Impossibile leggere il campo del modulo: {err}"),
                        )
                            .into_response();
                    }
                };
                match name.as_str() {
                    "submitted" => form.submitted = true,
                    "merge" => form.merge = Some(value),
                    "chart_style" => form.chart_style = Some(value),
                    "map_style" => form.map_style = Some(value),
                    "statistics" => form.statistics = value == "true" || value == "on",
                    "charts" => form.charts.push(value),
                    _ => {}
                }
            }
        }
    }

    let options = form.into_options();
    tracing::debug!(
        track = session.track.is_some(),
        activity = session.activity.is_some(),
        ?options,
        "dashboard request"
    );

    let dashboard = build_dashboard(&session, &options);
    Html(render_dashboard(&dashboard)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_uploads_use_default_options() {
        let options = DashboardForm::default().into_options();
        assert_eq!(options, DashboardOptions::default());
    }

    #[test]
    fn submitted_form_honours_unchecked_boxes() {
        let form = DashboardForm {
            submitted: true,
            merge: Some("concat".into()),
            chart_style: Some("static".into()),
            map_style: Some("bogus".into()),
            statistics: false,
            charts: vec!["heart_rate".into()],
        };
        let options = form.into_options();
        assert_eq!(options.merge_policy, MergePolicy::Concatenate);
        assert_eq!(options.chart_style, WidgetStyle::Static);
        assert_eq!(options.map_style, WidgetStyle::Interactive);
        assert!(!options.show_statistics);
        assert_eq!(options.charts, vec![ChartKind::HeartRate]);
    }
}
