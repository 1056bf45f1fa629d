//! Synthetic test data
//!
//! Scenarios share one backing database, possibly with other runs in
//! parallel, so every generated value embeds the current time in
//! milliseconds plus independent random digits.

use chrono::Utc;
use rand::Rng;

use crate::pages::OwnerForm;

/// Field-level replacements for [`create_owner`]
#[derive(Debug, Clone, Default)]
pub struct OwnerOverrides {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub telephone: Option<String>,
}

impl OwnerOverrides {
    pub fn first_name(mut self, value: impl Into<String>) -> Self {
        self.first_name = Some(value.into());
        self
    }

    pub fn last_name(mut self, value: impl Into<String>) -> Self {
        self.last_name = Some(value.into());
        self
    }

    pub fn address(mut self, value: impl Into<String>) -> Self {
        self.address = Some(value.into());
        self
    }

    pub fn city(mut self, value: impl Into<String>) -> Self {
        self.city = Some(value.into());
        self
    }

    pub fn telephone(mut self, value: impl Into<String>) -> Self {
        self.telephone = Some(value.into());
        self
    }
}

/// A random number with exactly `len` digits and no leading zero.
/// `len == 0` yields an empty string; any length is accepted.
pub fn random_digits(len: u32) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|i| {
            let low = if i == 0 { 1 } else { 0 };
            char::from(b'0' + rng.gen_range(low..=9u8))
        })
        .collect()
}

fn epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Build a complete owner. Fields set in `overrides` replace the generated
/// ones; nothing is validated here.
pub fn create_owner(overrides: OwnerOverrides) -> OwnerForm {
    OwnerForm {
        first_name: overrides
            .first_name
            .unwrap_or_else(|| format!("E2E{}-{}", epoch_ms(), random_digits(3))),
        last_name: overrides
            .last_name
            .unwrap_or_else(|| format!("Owner{}", random_digits(4))),
        address: overrides.address.unwrap_or_else(|| "123 Main St".to_string()),
        city: overrides.city.unwrap_or_else(|| "Testville".to_string()),
        telephone: overrides.telephone.unwrap_or_else(|| random_digits(10)),
    }
}

/// City name unlikely to match anything else in the database
pub fn unique_city() -> String {
    format!("CityTest{}{}", epoch_ms(), rand::thread_rng().gen_range(0..100_000))
}

/// `<stem><epoch-ms>`, for grouping records under a searchable prefix
pub fn unique_prefix(stem: &str) -> String {
    format!("{}{}", stem, epoch_ms())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    #[test]
    fn test_thousand_owners_have_distinct_telephones() {
        let phones: HashSet<String> = (0..1000)
            .map(|_| create_owner(OwnerOverrides::default()).telephone)
            .collect();
        assert_eq!(phones.len(), 1000);
        for phone in &phones {
            assert_eq!(phone.len(), 10);
            assert!(phone.chars().all(|c| c.is_ascii_digit()));
            assert!(!phone.starts_with('0'));
        }
    }

    #[test]
    fn test_default_shape() {
        let owner = create_owner(OwnerOverrides::default());
        let re = regex::Regex::new(r"^E2E\d{13,}-\d{3}$").unwrap();
        assert!(re.is_match(&owner.first_name), "{}", owner.first_name);
        assert!(regex::Regex::new(r"^Owner\d{4}$").unwrap().is_match(&owner.last_name));
        assert_eq!(owner.address, "123 Main St");
        assert_eq!(owner.city, "Testville");
    }

    #[test]
    fn test_names_differ_within_same_millisecond() {
        let a = create_owner(OwnerOverrides::default());
        let b = create_owner(OwnerOverrides::default());
        assert_ne!((a.first_name, a.telephone), (b.first_name, b.telephone));
    }

    #[test]
    fn test_overrides_are_shallow() {
        let owner = create_owner(
            OwnerOverrides::default()
                .first_name("Duplicate")
                .last_name("DetectionTest"),
        );
        assert_eq!(owner.first_name, "Duplicate");
        assert_eq!(owner.last_name, "DetectionTest");
        assert_eq!(owner.city, "Testville");
        assert_eq!(owner.telephone.len(), 10);
    }

    #[test]
    fn test_invalid_override_passes_through() {
        let owner = create_owner(OwnerOverrides::default().telephone("123"));
        assert_eq!(owner.telephone, "123");
    }

    #[test_case(1 ; "one digit")]
    #[test_case(3 ; "three digits")]
    #[test_case(10 ; "ten digits")]
    #[test_case(25 ; "longer than u64")]
    fn test_random_digits_length(len: u32) {
        for _ in 0..50 {
            let digits = random_digits(len);
            assert_eq!(digits.len() as u32, len);
            assert!(digits.chars().all(|c| c.is_ascii_digit()));
            assert!(!digits.starts_with('0'));
        }
    }

    #[test]
    fn test_random_digits_zero_length() {
        assert_eq!(random_digits(0), "");
    }

    #[test]
    fn test_unique_city_and_prefix() {
        let city = unique_city();
        assert!(city.starts_with("CityTest"));
        // city searches slice a strict prefix off the end
        assert!(city.is_ascii());
        assert!(city.len() > "CityTest".len() + 2);
        let prefix = unique_prefix("PageTest");
        assert!(prefix.starts_with("PageTest"));
        assert!(prefix["PageTest".len()..].chars().all(|c| c.is_ascii_digit()));
    }
}
