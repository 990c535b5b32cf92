// src/pipeline/geofence.rs

//! Community boundary containment.
//!
//! Boundaries arrive as GeoJSON. Polygons and multipolygons are accepted
//! directly or wrapped in a Feature, FeatureCollection or
//! GeometryCollection; everything areal is merged into one multipolygon.
//!
//! Containment is boundary-exclusive: a point exactly on an edge or vertex
//! (of the shell or of a hole) is not inside.

use geo::{Contains, LineString, MultiPolygon, Point, Polygon};
use geojson::{GeoJson, Geometry, LineStringType, PolygonType};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::Coordinate;

fn collect_geometry(geometry: Geometry, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    match geometry.value {
        geojson::Value::Polygon(rings) => out.push(polygon(rings)?),
        geojson::Value::MultiPolygon(polygons) => {
            for rings in polygons {
                out.push(polygon(rings)?);
            }
        }
        geojson::Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_geometry(geometry, out)?;
            }
        }
        _ => {
            return Err(AppError::geometry(
                "boundary must be a Polygon or MultiPolygon",
            ));
        }
    }
    Ok(())
}

/// Positions may carry an altitude, which is dropped.
fn line_string(ring: LineStringType) -> Result<LineString<f64>> {
    if ring.len() < 3 {
        return Err(AppError::geometry(format!(
            "ring has {} positions, need at least 3",
            ring.len()
        )));
    }

    let coords = ring
        .into_iter()
        .map(|position| match position.as_slice() {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Ok((*lon, *lat)),
            _ => Err(AppError::geometry(format!(
                "invalid position {position:?}"
            ))),
        })
        .collect::<Result<Vec<(f64, f64)>>>()?;

    Ok(LineString::from(coords))
}

fn polygon(rings: PolygonType) -> Result<Polygon<f64>> {
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| AppError::geometry("polygon has no exterior ring"))?;
    let interiors = rings.map(line_string).collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(line_string(exterior)?, interiors))
}

/// A community's area, ready for point containment checks.
#[derive(Debug, Clone)]
pub struct Geofence {
    area: MultiPolygon<f64>,
}

impl Geofence {
    /// Parse a GeoJSON boundary.
    pub fn from_geojson(value: &Value) -> Result<Self> {
        let geojson = GeoJson::from_json_value(value.clone())
            .map_err(|e| AppError::geometry(format!("unreadable GeoJSON: {e}")))?;

        let mut polygons = Vec::new();
        match geojson {
            GeoJson::Geometry(geometry) => collect_geometry(geometry, &mut polygons)?,
            GeoJson::Feature(feature) => {
                if let Some(geometry) = feature.geometry {
                    collect_geometry(geometry, &mut polygons)?;
                }
            }
            GeoJson::FeatureCollection(collection) => {
                for feature in collection.features {
                    if let Some(geometry) = feature.geometry {
                        collect_geometry(geometry, &mut polygons)?;
                    }
                }
            }
        }
        if polygons.is_empty() {
            return Err(AppError::geometry("boundary contains no polygons"));
        }

        Ok(Self {
            area: MultiPolygon::new(polygons),
        })
    }

    /// Number of polygons making up the area.
    pub fn polygon_count(&self) -> usize {
        self.area.0.len()
    }

    /// Whether the coordinate lies strictly inside the area.
    pub fn contains(&self, location: &Coordinate) -> bool {
        self.area.contains(&Point::new(location.lon, location.lat))
    }
}
