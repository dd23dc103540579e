//! WKT geometries for nodes and ways.

use std::collections::HashMap;

use geo::{Coord, LineString, Point, Polygon};

/// Caches node locations and assembles WKT geometries from them.
#[derive(Debug, Default)]
pub struct WktGeometryBuilder {
    nodes: HashMap<i64, Coord<f64>>,
}

impl WktGeometryBuilder {
    /// Remember a node location. Returns `None` when the coordinate is not a
    /// valid WGS84 position; such nodes are not cached.
    pub fn add_node(&mut self, id: i64, lon: f64, lat: f64) -> Option<Coord<f64>> {
        let location = validated_coord(lon, lat)?;
        self.nodes.insert(id, location);
        Some(location)
    }

    /// Number of cached node locations.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// `POINT(x y)` for a node location.
    #[must_use]
    pub fn point_wkt(location: Coord<f64>) -> String {
        let point = Point::from(location);
        format!("POINT({} {})", point.x(), point.y())
    }

    /// Geometry of a way from its node references.
    ///
    /// References without a cached location are dropped. A closed ring of at
    /// least four nodes is a polygon, anything else with two or more nodes
    /// a line string.
    #[must_use]
    pub fn way_wkt(&self, refs: &[i64]) -> Option<String> {
        let coords: Vec<Coord<f64>> = refs
            .iter()
            .filter_map(|id| self.nodes.get(id).copied())
            .collect();
        if coords.len() < 2 {
            return None;
        }
        let line = LineString::new(coords);
        if line.is_closed() && line.0.len() >= 4 {
            let polygon = Polygon::new(line, Vec::new());
            let mut wkt = String::from("POLYGON((");
            write_coords(&mut wkt, polygon.exterior());
            wkt.push_str("))");
            Some(wkt)
        } else {
            let mut wkt = String::from("LINESTRING(");
            write_coords(&mut wkt, &line);
            wkt.push(')');
            Some(wkt)
        }
    }
}

fn write_coords(wkt: &mut String, line: &LineString<f64>) {
    for (index, coord) in line.coords().enumerate() {
        if index > 0 {
            wkt.push(',');
        }
        wkt.push_str(&format!("{} {}", coord.x, coord.y));
    }
}

pub(super) fn validated_coord(lon: f64, lat: f64) -> Option<Coord<f64>> {
    (lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat))
    .then_some(Coord { x: lon, y: lat })
}
