use crate::domain::model::{
    CanonicalAddress, COUNTRY_CODE, GROUP_SUFFIX, INDIVIDUAL_SUFFIX, LEGACY_INDIVIDUAL_SUFFIX,
};

/// Normalize a caller-supplied identifier into a canonical transport address.
///
/// Group ids (`...@g.us`) are returned untouched. Everything else is treated as a
/// phone number: a legacy `@s.whatsapp.net` suffix is dropped, a single leading `0`
/// becomes the `62` country code and `@c.us` is appended.
///
/// Input is expected to be raw; feeding a canonical `@c.us` address back in
/// yields a doubled suffix.
pub fn resolve(raw: &str) -> CanonicalAddress {
    if raw.ends_with(GROUP_SUFFIX) {
        return CanonicalAddress::Group(raw.to_string());
    }

    let number = raw.strip_suffix(LEGACY_INDIVIDUAL_SUFFIX).unwrap_or(raw);

    let number = match number.strip_prefix('0') {
        Some(rest) => format!("{}{}", COUNTRY_CODE, rest),
        None => number.to_string(),
    };

    CanonicalAddress::Individual(format!("{}{}", number, INDIVIDUAL_SUFFIX))
}
