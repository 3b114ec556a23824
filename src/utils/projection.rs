//! Coordinate conversions between WGS84 and the planar references used for
//! metric work: UTM zone 36N (EPSG:32636) for geometry predicates and Web
//! Mercator (EPSG:3857) for clustering features.
//!
//! UTM uses the third-order Krüger series, accurate to well under a millimetre
//! inside the zone.

use geo::{Coord, MapCoords};

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;

pub const UTM_ZONE: u8 = 36;

struct Krueger {
    a_hat: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
    e_factor: f64,
}

fn series() -> Krueger {
    let n = WGS84_F / (2.0 - WGS84_F);
    let n2 = n * n;
    let n3 = n2 * n;
    Krueger {
        a_hat: WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
        alpha: [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
            61.0 * n3 / 240.0,
        ],
        beta: [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
            n2 / 48.0 + n3 / 15.0,
            17.0 * n3 / 480.0,
        ],
        delta: [
            2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
            7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
            56.0 * n3 / 15.0,
        ],
        e_factor: 2.0 * n.sqrt() / (1.0 + n),
    }
}

fn central_meridian() -> f64 {
    (f64::from(UTM_ZONE) * 6.0 - 183.0).to_radians()
}

/// (lon, lat) degrees to (easting, northing) metres in UTM 36N.
pub fn wgs84_to_utm(c: Coord<f64>) -> Coord<f64> {
    let k = series();
    let phi = c.y.to_radians();
    let dl = c.x.to_radians() - central_meridian();

    let sin_phi = phi.sin();
    let t = (sin_phi.atanh() - k.e_factor * (k.e_factor * sin_phi).atanh()).sinh();
    let xi_p = t.atan2(dl.cos());
    let eta_p = (dl.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut easting = eta_p;
    let mut northing = xi_p;
    for (j, alpha) in k.alpha.iter().enumerate() {
        let m = 2.0 * (j as f64 + 1.0);
        easting += alpha * (m * xi_p).cos() * (m * eta_p).sinh();
        northing += alpha * (m * xi_p).sin() * (m * eta_p).cosh();
    }

    Coord {
        x: UTM_FALSE_EASTING + UTM_K0 * k.a_hat * easting,
        y: UTM_K0 * k.a_hat * northing,
    }
}

/// Inverse of [`wgs84_to_utm`].
pub fn utm_to_wgs84(c: Coord<f64>) -> Coord<f64> {
    let k = series();
    let xi = c.y / (UTM_K0 * k.a_hat);
    let eta = (c.x - UTM_FALSE_EASTING) / (UTM_K0 * k.a_hat);

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, beta) in k.beta.iter().enumerate() {
        let m = 2.0 * (j as f64 + 1.0);
        xi_p -= beta * (m * xi).sin() * (m * eta).cosh();
        eta_p -= beta * (m * xi).cos() * (m * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut phi = chi;
    for (j, delta) in k.delta.iter().enumerate() {
        let m = 2.0 * (j as f64 + 1.0);
        phi += delta * (m * chi).sin();
    }
    let lambda = central_meridian() + eta_p.sinh().atan2(xi_p.cos());

    Coord {
        x: lambda.to_degrees(),
        y: phi.to_degrees(),
    }
}

/// (lon, lat) degrees to EPSG:3857 metres.
pub fn wgs84_to_web_mercator(c: Coord<f64>) -> Coord<f64> {
    let lat = c.y.clamp(-85.051_128_78, 85.051_128_78).to_radians();
    Coord {
        x: WGS84_A * c.x.to_radians(),
        y: WGS84_A * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

pub fn utm_to_web_mercator(c: Coord<f64>) -> Coord<f64> {
    wgs84_to_web_mercator(utm_to_wgs84(c))
}

pub fn to_planar<G: MapCoords<f64, f64, Output = G>>(geometry: &G) -> G {
    geometry.map_coords(wgs84_to_utm)
}

pub fn to_geographic<G: MapCoords<f64, f64, Output = G>>(geometry: &G) -> G {
    geometry.map_coords(utm_to_wgs84)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_central_meridian_on_equator() {
        let projected = wgs84_to_utm(Coord { x: 33.0, y: 0.0 });
        assert_abs_diff_eq!(projected.x, 500_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(projected.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_saint_petersburg_goes_there_and_back() {
        let spb = Coord { x: 30.3158, y: 59.9391 };
        let projected = wgs84_to_utm(spb);
        // West of the central meridian, roughly 6.65e6 m north.
        assert!(projected.x < UTM_FALSE_EASTING);
        assert!((6_600_000.0..6_700_000.0).contains(&projected.y));

        let back = utm_to_wgs84(projected);
        assert_abs_diff_eq!(back.x, spb.x, epsilon = 1e-8);
        assert_abs_diff_eq!(back.y, spb.y, epsilon = 1e-8);
    }

    #[test]
    fn test_web_mercator_origin() {
        let origin = wgs84_to_web_mercator(Coord { x: 0.0, y: 0.0 });
        assert_abs_diff_eq!(origin.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(origin.y, 0.0, epsilon = 1e-9);

        let east = wgs84_to_web_mercator(Coord { x: 180.0, y: 0.0 });
        assert_abs_diff_eq!(east.x, 20_037_508.342_789_244, epsilon = 1e-6);
    }
}
