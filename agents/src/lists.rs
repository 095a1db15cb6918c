//! Static screening lists.

/// Countries under comprehensive sanctions.
pub const SANCTIONED_COUNTRIES: &[&str] = &["North Korea", "Iran", "Syria", "Cuba"];

pub const DISPOSABLE_EMAIL_DOMAINS: &[&str] = &[
    "tempmail.com",
    "throwaway.com",
    "fakeemail.com",
    "mailinator.com",
    "guerrillamail.com",
];

pub const BANNED_BUSINESS_TYPES: &[&str] = &[
    "gambling",
    "cryptocurrency_exchange",
    "adult_content",
    "weapons",
];

pub const BANNED_INDUSTRIES: &[&str] = &[
    "gambling",
    "adult_entertainment",
    "weapons_manufacturing",
    "cryptocurrency",
];

/// Document classes the identity provider may report that we accept.
pub const ACCEPTED_ID_CLASSES: &[&str] = &[
    "drivers_license",
    "passport",
    "state_id",
    "national_id",
    "residence_permit",
];

pub fn contains_ignore_case(list: &[&str], value: &str) -> bool {
    let value = value.trim();
    list.iter().any(|item| item.eq_ignore_ascii_case(value))
}
