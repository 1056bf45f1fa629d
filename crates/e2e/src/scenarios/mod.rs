//! The scenario catalogue
//!
//! Each submodule registers the tests of one feature area. Tests tagged
//! `seed-data` depend on records the application ships with (Betty Davis,
//! owner 1, the six vets) and fail against an empty database.

use crate::runner::Scenario;

mod a11y;
mod branding;
mod chat;
mod language;
mod navigation;
mod not_found;
mod owners;
mod vets;
mod visits;

/// Every scenario, in catalogue order
pub fn all() -> Vec<Scenario> {
    let mut scenarios = Vec::new();
    scenarios.extend(navigation::scenarios());
    scenarios.extend(owners::scenarios());
    scenarios.extend(vets::scenarios());
    scenarios.extend(visits::scenarios());
    scenarios.extend(chat::scenarios());
    scenarios.extend(language::scenarios());
    scenarios.extend(branding::scenarios());
    scenarios.extend(not_found::scenarios());
    scenarios.extend(a11y::scenarios());
    scenarios
}
