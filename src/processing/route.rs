use crate::processing::types::{ProcessError, RecordTable};

/// Initial zoom of the route map.
pub const DEFAULT_ZOOM: u8 = 13;

/// Ordered path handed to the map widget.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// `(lat, lon)` of the first positioned sample.
    pub center: (f64, f64),
    pub zoom: u8,
    /// Vertices in file order; this order defines the drawn polyline.
    pub path: Vec<(f64, f64)>,
}

/// Extract the route of a GPS table, centred on its first point.
pub fn build_route(table: &RecordTable) -> Result<Route, ProcessError> {
    if table.is_empty() {
        return Err(ProcessError::EmptyInput(
            "la tabella GPS è vuota, impossibile disegnare la mappa".into(),
        ));
    }

    let path = table.positions();
    let center = *path.first().ok_or_else(|| {
        ProcessError::EmptyInput("nessuna riga con Latitude e Longitude valide".into())
    })?;

    Ok(Route {
        center,
        zoom: DEFAULT_ZOOM,
        path,
    })
}
