use geo::{
    Area, BooleanOps, BoundingRect, Geometry, Intersects, LineString, MultiPolygon, Polygon, Relate,
};

/// Polygon/feature intersection, boundaries included.
pub fn intersects(polygon: &Polygon<f64>, geometry: &Geometry<f64>) -> bool {
    match geometry {
        Geometry::Point(p) => polygon.intersects(p),
        Geometry::Line(l) => polygon.intersects(&LineString::from(vec![l.start, l.end])),
        Geometry::LineString(ls) => polygon.intersects(ls),
        Geometry::Polygon(p) => polygon.intersects(p),
        Geometry::MultiPoint(mp) => mp.iter().any(|p| polygon.intersects(p)),
        Geometry::MultiLineString(mls) => mls.iter().any(|ls| polygon.intersects(ls)),
        Geometry::MultiPolygon(mp) => mp.iter().any(|p| polygon.intersects(p)),
        Geometry::Rect(r) => polygon.intersects(&r.to_polygon()),
        Geometry::Triangle(t) => polygon.intersects(&t.to_polygon()),
        Geometry::GeometryCollection(gc) => gc.iter().any(|g| intersects(polygon, g)),
    }
}

/// True when the polygons share boundary points but no interior.
pub fn touches(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    match (a.bounding_rect(), b.bounding_rect()) {
        (Some(ra), Some(rb)) if ra.intersects(&rb) => a.relate(b).is_touches(),
        _ => false,
    }
}

/// Part of `polygon` inside `area`; `None` when nothing with area remains.
pub fn clip(polygon: &Polygon<f64>, area: &Polygon<f64>) -> Option<MultiPolygon<f64>> {
    match (polygon.bounding_rect(), area.bounding_rect()) {
        (Some(rp), Some(ra)) if rp.intersects(&ra) => {}
        _ => return None,
    }
    let clipped = polygon.intersection(area);
    if clipped.unsigned_area() > 0.0 {
        Some(clipped)
    } else {
        None
    }
}

/// Union of polygons into one geometry.
pub fn dissolve<'a>(polygons: impl IntoIterator<Item = &'a Polygon<f64>>) -> MultiPolygon<f64> {
    polygons
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, polygon| {
            acc.union(&MultiPolygon::new(vec![polygon.clone()]))
        })
}
