mod geolocation_provider;
mod geolocation_store;

pub use geolocation_provider::GeolocationProvider;
pub use geolocation_store::GeolocationStore;
