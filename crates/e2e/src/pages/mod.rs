//! Page objects
//!
//! One struct per application screen, each wrapping the test's [`Page`]
//! handle and exposing intention-revealing operations. Shared navigation and
//! language controls come from the [`BasePage`] trait.
//!
//! Page objects never retry: a missing element surfaces as a timeout naming
//! the locator.
//!
//! [`Page`]: crate::page::Page

mod base;
mod error;
mod home;
mod owner;
mod pet;
mod vet;
mod visit;

pub use base::BasePage;
pub use error::ErrorPage;
pub use home::HomePage;
pub use owner::{OwnerForm, OwnerPage, OwnerSearch};
pub use pet::PetPage;
pub use vet::VetPage;
pub use visit::{UpcomingVisitsPage, VisitPage};
