//! NOAA low-order solar position model.
//!
//! Closed-form expressions for equation of time and declination from the
//! fractional year, plus the zenith/azimuth spherical triangle. Angles in
//! and out are degrees; azimuth is measured clockwise from north. Local
//! civil time converts to UTC through the site's fixed offset (no DST).

use glam::DVec3;

use crate::config::{Date, SamplingWindow, SiteConfig};

/// Solar position at one instant. All angles in degrees.
#[derive(Debug, Clone, Copy)]
pub struct SolarPosition {
    /// True geometric elevation above the horizon.
    pub geometric_elevation_deg: f64,
    /// Elevation including atmospheric refraction (equals the geometric
    /// value when refraction is disabled or the sun is far below horizon).
    pub apparent_elevation_deg: f64,
    /// Clockwise from north, in [0, 360).
    pub azimuth_deg: f64,
    pub declination_deg: f64,
    pub hour_angle_deg: f64,
    pub equation_of_time_min: f64,
    /// Local solar noon, minutes after local midnight.
    pub solar_noon_min: f64,
}

/// Fractional year in radians for the NOAA closed forms.
fn fractional_year_rad(day_of_year: u32, hour_utc: f64) -> f64 {
    std::f64::consts::TAU / 365.0 * (day_of_year as f64 - 1.0 + (hour_utc - 12.0) / 24.0)
}

/// Equation of time in minutes.
fn equation_of_time_min(gamma: f64) -> f64 {
    229.18
        * (0.000075 + 0.001868 * gamma.cos() - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin())
}

/// Solar declination in radians.
fn declination_rad(gamma: f64) -> f64 {
    0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin() - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin()
}

/// NOAA atmospheric refraction correction in degrees. Zero at or below
/// -0.575 degrees geometric elevation.
fn refraction_deg(elev_deg: f64) -> f64 {
    if elev_deg > 85.0 {
        return 0.0;
    }
    if elev_deg <= -0.575 {
        return 0.0;
    }
    let te = elev_deg.to_radians().tan();
    let arcsec = if elev_deg > 5.0 {
        58.1 / te - 0.07 / te.powi(3) + 0.000086 / te.powi(5)
    } else {
        1735.0
            + elev_deg
                * (-518.2 + elev_deg * (103.4 + elev_deg * (-12.79 + elev_deg * 0.711)))
    };
    arcsec / 3600.0
}

/// Compute the solar position for wall-clock hour `local_hour` (fractional
/// hours after local midnight) on `date` at the given site.
pub fn solar_position(
    date: Date,
    local_hour: f64,
    site: &SiteConfig,
    apply_refraction: bool,
) -> SolarPosition {
    let doy = date.day_of_year();
    let hour_utc = local_hour - site.timezone_hours;
    let gamma = fractional_year_rad(doy, hour_utc);
    let eot = equation_of_time_min(gamma);
    let decl = declination_rad(gamma);

    // True solar time in minutes, then the hour angle (0 at solar noon,
    // 15 degrees per hour)
    let time_offset = eot + 4.0 * site.longitude_deg - 60.0 * site.timezone_hours;
    let true_solar_min = local_hour * 60.0 + time_offset;
    let hour_angle_deg = true_solar_min / 4.0 - 180.0;
    let ha = hour_angle_deg.to_radians();

    let lat = site.latitude_deg.to_radians();
    let cos_zenith =
        (lat.sin() * decl.sin() + lat.cos() * decl.cos() * ha.cos()).clamp(-1.0, 1.0);
    let geometric = 90.0 - cos_zenith.acos().to_degrees();
    let apparent = if apply_refraction {
        geometric + refraction_deg(geometric)
    } else {
        geometric
    };

    // atan2 form measures from south; shift to clockwise-from-north
    let az = ha.sin().atan2(ha.cos() * lat.sin() - decl.tan() * lat.cos());
    let azimuth_deg = (az.to_degrees() + 180.0).rem_euclid(360.0);

    // Two fixed-point passes of the noon estimator, refining the equation
    // of time at the estimated instant
    let mut noon =
        720.0 - 4.0 * site.longitude_deg - eot + 60.0 * site.timezone_hours;
    let gamma_noon = fractional_year_rad(doy, noon / 60.0 - site.timezone_hours);
    noon = 720.0 - 4.0 * site.longitude_deg - equation_of_time_min(gamma_noon)
        + 60.0 * site.timezone_hours;

    SolarPosition {
        geometric_elevation_deg: geometric,
        apparent_elevation_deg: apparent,
        azimuth_deg,
        declination_deg: decl.to_degrees(),
        hour_angle_deg,
        equation_of_time_min: eot,
        solar_noon_min: noon,
    }
}

/// Unit vector from the scene toward the sun, given elevation and azimuth
/// in degrees. The basis is right-handed with `east = north x up`.
pub fn direction_to_sun(elevation_deg: f64, azimuth_deg: f64, up: DVec3, north: DVec3) -> DVec3 {
    let east = north.cross(up);
    let e = elevation_deg.to_radians();
    let a = azimuth_deg.to_radians();
    (north * (e.cos() * a.cos()) + east * (e.cos() * a.sin()) + up * e.sin()).normalize()
}

/// Sample sun direction vectors across a daily window. Instants whose
/// apparent elevation is at or below the site minimum produce no vector.
pub fn sample_sun_vectors(window: &SamplingWindow, site: &SiteConfig) -> Vec<DVec3> {
    let mut out = Vec::new();
    if window.interval_hours <= 0.0 {
        return out;
    }
    let mut hour = window.start_hour;
    while hour <= window.end_hour + 1e-9 {
        let pos = solar_position(window.date, hour, site, true);
        if pos.apparent_elevation_deg > site.min_elevation_deg {
            out.push(direction_to_sun(
                pos.apparent_elevation_deg,
                pos.azimuth_deg,
                site.up,
                site.north,
            ));
        }
        hour += window.interval_hours;
    }
    out
}
