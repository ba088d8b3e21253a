//! Great-circle distance and the closest emergency-ready provider lookup.

use crate::models::{ClosestProvider, ServiceProvider, SpState, SpStatus};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two `(latitude, longitude)` points in degrees.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

fn is_emergency_candidate(sp: &ServiceProvider, service: Option<&str>) -> bool {
    sp.status == SpStatus::Validated
        && sp.state == SpState::EmergencyReady
        && service.is_none_or(|s| sp.offers(s))
}

/// closest
///
/// Picks the validated, emergency-ready provider nearest to `origin`, optionally
/// restricted to those offering `service`. Providers without a location are skipped.
/// Equal distances go to the provider registered first.
pub fn closest<'a, I>(origin: (f64, f64), providers: I, service: Option<&str>) -> Option<ClosestProvider>
where
    I: IntoIterator<Item = &'a ServiceProvider>,
{
    providers
        .into_iter()
        .filter(|sp| is_emergency_candidate(sp, service))
        .filter_map(|sp| sp.location().map(|loc| (sp, haversine_km(origin, loc))))
        .min_by(|(a, da), (b, db)| da.total_cmp(db).then_with(|| a.created_at.cmp(&b.created_at)))
        .map(|(sp, distance_km)| ClosestProvider {
            service_provider: sp.clone(),
            distance_km,
        })
}
