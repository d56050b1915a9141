// Endpoint methods, grouped by console area. Each file adds inherent
// methods to `ApiClient`.

mod admins;
mod auth;
mod dashboard;
mod devices;
mod system;
mod topology;

pub use auth::Credentials;
